use crate::{has_carbon, heavy_atom_count, parse_smiles, remove_stereochemistry, write_smiles};
use thiserror::Error;

/// Why a row was rejected. The display strings match the sentinel texts the
/// pipeline has always logged, but callers branch on the variant, never on
/// the text.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("Error: too many reactants")]
    TooManyReactants,
    #[error("Error: invalid product")]
    InvalidProduct,
    #[error("Error: too many products")]
    TooManyProducts,
    #[error("Error: product smiles error")]
    ProductSmiles,
    #[error("Error: no organic product")]
    NoOrganicProduct,
    #[error("Error: product in reactants")]
    ProductInReactants,
    #[error("Error: smarts")]
    Smarts,
    #[error("Error: during canonicalisation")]
    Canonicalisation,
    #[error("Error: mapping")]
    Mapping,
}

/// Accept reactions with one to four reactant compounds.
pub fn reactant_count_filter(rxn: &str) -> Result<String, Rejection> {
    let Some((reactants, _)) = rxn.split_once(">>") else {
        return Ok(rxn.to_string());
    };
    let count = reactants.split('.').filter(|c| !c.is_empty()).count();
    if (1..=4).contains(&count) {
        Ok(rxn.to_string())
    } else {
        Err(Rejection::TooManyReactants)
    }
}

/// Reduce multi-product reactions to their single significant product.
///
/// A lone product only has to parse. With several products, the ones with
/// more than five heavy atoms are kept; the reaction survives only if
/// exactly one remains, and the kept product keeps its original spelling.
pub fn multiproduct_fixer(rxn: &str) -> Result<String, Rejection> {
    let Some((reactants, product)) = rxn.split_once(">>") else {
        return Ok(rxn.to_string());
    };
    let compounds: Vec<&str> = product.split('.').collect();
    if compounds.len() == 1 {
        return match parse_smiles(product) {
            Ok(_) => Ok(rxn.to_string()),
            Err(_) => Err(Rejection::InvalidProduct),
        };
    }
    let mut survivors: Vec<&str> = Vec::new();
    for compound in compounds {
        let graph = parse_smiles(compound).map_err(|_| Rejection::ProductSmiles)?;
        if heavy_atom_count(&graph) > 5 {
            survivors.push(compound);
        }
    }
    // Zero survivors reports the same way as several: the row had more
    // products than the pipeline can attribute.
    match survivors.len() {
        1 => Ok(format!("{}>>{}", reactants, survivors[0])),
        _ => Err(Rejection::TooManyProducts),
    }
}

/// Reject reactions whose product side contains no carbon atom.
pub fn no_carbon(rxn: &str) -> Result<String, Rejection> {
    let Some((_, product)) = rxn.split_once(">>") else {
        return Ok(rxn.to_string());
    };
    let organic = product
        .split('.')
        .filter_map(|compound| parse_smiles(compound).ok())
        .any(|graph| has_carbon(&graph));
    if organic {
        Ok(rxn.to_string())
    } else {
        Err(Rejection::NoOrganicProduct)
    }
}

/// Strip stereochemistry the mapping tool hallucinated: when the product
/// carries `@` markers but no reactant does, the markers cannot have come
/// from the inputs, so they are removed.
pub fn remove_stereoalchemy(rxn: &str) -> String {
    let Some((reactants, product)) = rxn.split_once(">>") else {
        return rxn.to_string();
    };
    if !product.contains('@') || reactants.contains('@') {
        return rxn.to_string();
    }
    let rewritten: Vec<String> = product
        .split('.')
        .map(|compound| match parse_smiles(compound) {
            Ok(mut graph) => {
                remove_stereochemistry(&mut graph);
                write_smiles(&graph)
            }
            Err(_) => compound.replace('@', ""),
        })
        .collect();
    format!("{}>>{}", reactants, rewritten.join("."))
}

/// Reject no-op reactions whose product already appears verbatim among the
/// reactant compounds.
pub fn product_in_reactants(rxn: &str) -> Result<String, Rejection> {
    let Some((reactants, product)) = rxn.split_once(">>") else {
        return Ok(rxn.to_string());
    };
    if reactants.split('.').any(|compound| compound == product) {
        Err(Rejection::ProductInReactants)
    } else {
        Ok(rxn.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_texts_match_the_historic_sentinels() {
        assert_eq!(
            Rejection::TooManyReactants.to_string(),
            "Error: too many reactants"
        );
        assert_eq!(
            Rejection::Canonicalisation.to_string(),
            "Error: during canonicalisation"
        );
        assert_eq!(Rejection::Mapping.to_string(), "Error: mapping");
    }

    #[test]
    fn reactant_count_bounds() {
        assert!(reactant_count_filter("CCO>>CC").is_ok());
        assert!(reactant_count_filter("C.C.C.C>>CC").is_ok());
        assert_eq!(
            reactant_count_filter("C.C.C.C.C>>CC"),
            Err(Rejection::TooManyReactants)
        );
        assert_eq!(
            reactant_count_filter(">>CC"),
            Err(Rejection::TooManyReactants)
        );
    }

    #[test]
    fn multiproduct_keeps_the_large_product() {
        let out = multiproduct_fixer("CC.O>>CC.CCCCCC").expect("filter rejected");
        assert_eq!(out, "CC.O>>CCCCCC");
    }

    #[test]
    fn multiproduct_rejects_ties_and_empties() {
        assert_eq!(
            multiproduct_fixer("C>>CCCCCC.CCCCCCC"),
            Err(Rejection::TooManyProducts)
        );
        assert_eq!(
            multiproduct_fixer("C>>CC.CC"),
            Err(Rejection::TooManyProducts)
        );
        assert_eq!(
            multiproduct_fixer("C>>CC.C(C"),
            Err(Rejection::ProductSmiles)
        );
        assert_eq!(multiproduct_fixer("C>>C(C"), Err(Rejection::InvalidProduct));
    }

    #[test]
    fn single_product_passes_through() {
        assert_eq!(
            multiproduct_fixer("CC>>CCO").expect("filter rejected"),
            "CC>>CCO"
        );
    }

    #[test]
    fn inorganic_products_are_rejected() {
        assert_eq!(
            no_carbon("C>>[Na+].[Cl-]"),
            Err(Rejection::NoOrganicProduct)
        );
        assert!(no_carbon("[Na+].[Cl-]>>CC").is_ok());
    }

    #[test]
    fn stereo_is_stripped_only_when_hallucinated() {
        let out = remove_stereoalchemy("NCC(=O)O>>N[C@@H](C)C(=O)O");
        assert!(!out.contains('@'));
        let kept = remove_stereoalchemy("N[C@@H](C)O>>N[C@@H](C)C(=O)O");
        assert!(kept.contains("@@"));
        assert_eq!(remove_stereoalchemy("CC>>CCO"), "CC>>CCO");
    }

    #[test]
    fn stereo_removal_leaves_reactants_alone() {
        let out = remove_stereoalchemy("NCC(=O)O>>N[C@@H](C)C(=O)O");
        let (reactants, _) = out.split_once(">>").expect("merged form");
        assert_eq!(reactants, "NCC(=O)O");
    }

    #[test]
    fn identity_reactions_are_rejected() {
        assert_eq!(
            product_in_reactants("CCO.CC>>CCO"),
            Err(Rejection::ProductInReactants)
        );
        assert!(product_in_reactants("CCO.CC>>CCN").is_ok());
    }
}
