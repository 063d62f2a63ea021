use crate::{fragment_on_unspecified, parse_smiles, write_smiles};
use std::collections::HashSet;

/// Rewrite `~`-joined fragment groups as plain `.`-separated compounds, role
/// by role. Compounds that fail to parse fall back to a textual `~` to `.`
/// substitution so malformed rows still reach the filters that will judge
/// them.
pub fn untangle_tildes(rxn: &str) -> String {
    rxn.split('>')
        .map(untangle_segment)
        .collect::<Vec<_>>()
        .join(">")
}

fn untangle_segment(segment: &str) -> String {
    if !segment.contains('~') {
        return segment.to_string();
    }
    segment
        .split('.')
        .map(|compound| {
            if !compound.contains('~') {
                return compound.to_string();
            }
            match parse_smiles(compound) {
                Ok(graph) => fragment_on_unspecified(&graph)
                    .iter()
                    .map(write_smiles)
                    .collect::<Vec<_>>()
                    .join("."),
                Err(_) => compound.replace('~', "."),
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Merge the reagent role into the reactants, producing `reactants>>product`.
/// Already-merged strings pass through unchanged.
pub fn join_reactants_reagents(rxn: &str) -> String {
    if rxn.contains(">>") {
        return rxn.to_string();
    }
    let roles: Vec<&str> = rxn.split('>').collect();
    if roles.len() != 3 {
        return rxn.to_string();
    }
    let left: Vec<&str> = roles[..2].iter().copied().filter(|s| !s.is_empty()).collect();
    format!("{}>>{}", left.join("."), roles[2])
}

/// Drop trailing annotations: everything from the first space onward.
pub fn remove_fragment_info(rxn: &str) -> String {
    rxn.split(' ').next().unwrap_or_default().to_string()
}

/// Atom-map indices mentioned in a reaction segment, harvested textually so
/// even unparseable compounds contribute.
fn map_indices(segment: &str) -> HashSet<u32> {
    let mut out = HashSet::new();
    let bytes = segment.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start && end < bytes.len() && bytes[end] == b']' {
                if let Ok(n) = segment[start..end].parse() {
                    out.insert(n);
                }
            }
            i = end;
        } else {
            i += 1;
        }
    }
    out
}

/// Remove reactant compounds that contribute no mapped atom to the product,
/// and demap reactant atoms whose map index the product does not use.
/// Unparseable reactant compounds are dropped. The product side is returned
/// untouched.
pub fn remove_reagents(rxn: &str) -> String {
    let Some((reactants, product)) = rxn.split_once(">>") else {
        return rxn.to_string();
    };
    let used = map_indices(product);

    let mut kept: Vec<String> = Vec::new();
    for compound in reactants.split('.') {
        let Ok(mut graph) = parse_smiles(compound) else {
            continue;
        };
        let mut contributes = false;
        for node in graph.node_indices() {
            match graph[node].map {
                Some(m) if used.contains(&m) => contributes = true,
                Some(_) => graph[node].map = None,
                None => {}
            }
        }
        if contributes {
            kept.push(write_smiles(&graph));
        }
    }
    format!("{}>>{}", kept.join("."), product)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untangle_splits_fragment_groups() {
        let out = untangle_tildes("CCO~[Na+].CN>>CC");
        assert!(!out.contains('~'));
        assert_eq!(out.matches('.').count(), 2);
        assert!(out.contains("[Na+]"));
    }

    #[test]
    fn untangle_leaves_plain_strings_alone() {
        assert_eq!(untangle_tildes("CCO.CN>>CC"), "CCO.CN>>CC");
    }

    #[test]
    fn untangle_falls_back_textually() {
        let out = untangle_tildes("C(~[Na+]>>CC");
        assert_eq!(out, "C(.[Na+]>>CC");
    }

    #[test]
    fn join_merges_reagents_into_reactants() {
        assert_eq!(join_reactants_reagents("CCO>CN>CC"), "CCO.CN>>CC");
        assert_eq!(join_reactants_reagents("CCO>>CC"), "CCO>>CC");
        assert_eq!(join_reactants_reagents("CCO.O>>CC"), "CCO.O>>CC");
    }

    #[test]
    fn join_skips_empty_reagent_segment() {
        assert_eq!(join_reactants_reagents("CCO>>CC"), "CCO>>CC");
        let merged = join_reactants_reagents("CCO>C(=O)O>CC");
        assert_eq!(merged, "CCO.C(=O)O>>CC");
    }

    #[test]
    fn fragment_info_is_truncated() {
        assert_eq!(remove_fragment_info("CCO>>CC |f:0.1|"), "CCO>>CC");
        assert_eq!(remove_fragment_info("CCO>>CC"), "CCO>>CC");
    }

    #[test]
    fn remove_reagents_drops_unmapped_compounds() {
        let out = remove_reagents("[CH3:1][OH:2].[Cl:3][H:4].O>>[CH3:1][Cl:3]");
        let (reactants, product) = out.split_once(">>").expect("merged form");
        assert_eq!(product, "[CH3:1][Cl:3]");
        // Water contributed nothing and is gone.
        assert_eq!(reactants.matches('.').count(), 1);
        assert!(reactants.contains(":1]"));
        assert!(reactants.contains(":3]"));
        // Maps 2 and 4 are absent from the product, so they are demapped.
        assert!(!reactants.contains(":2]"));
        assert!(!reactants.contains(":4]"));
    }

    #[test]
    fn remove_reagents_is_idempotent() {
        let once = remove_reagents("[CH3:1][OH:2].[Cl:3][H:4]>>[CH3:1][Cl:3]");
        assert_eq!(remove_reagents(&once), once);
    }

    #[test]
    fn remove_reagents_drops_unparseable_compounds() {
        let out = remove_reagents("C(.[CH3:1]O>>[CH3:1]Cl");
        let (reactants, _) = out.split_once(">>").expect("merged form");
        assert!(!reactants.contains('('));
        assert!(reactants.contains(":1]"));
    }
}
