use crate::{
    fold_explicit_hydrogens, parse_smiles, remove_atom_maps, write_smiles, MoleculeGraph,
    Rejection, SmilesError,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReactionError {
    #[error("expected 3 roles separated by '>', found {0}")]
    RoleCount(usize),
    #[error("empty compound in reaction string")]
    EmptyCompound,
    #[error(transparent)]
    Smiles(#[from] SmilesError),
}

/// One compound of a reaction role. Salts and other multi-piece species are
/// kept together as a list of fragments, rendered with `~` between them.
#[derive(Debug, Clone)]
pub struct Compound {
    pub fragments: Vec<MoleculeGraph>,
}

impl Compound {
    fn parse(text: &str) -> Result<Self, ReactionError> {
        if text.is_empty() {
            return Err(ReactionError::EmptyCompound);
        }
        let fragments = text
            .split('~')
            .map(parse_smiles)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Compound { fragments })
    }

    /// Canonical serialisation: fragments written canonically, sorted and
    /// joined with `~`.
    fn to_smiles(&self) -> String {
        let mut parts: Vec<String> = self.fragments.iter().map(write_smiles).collect();
        parts.sort();
        parts.join("~")
    }
}

/// A reaction equation in extended reaction-SMILES form:
/// `reactants>agents>products`, compounds joined with `.` inside each role.
#[derive(Debug, Clone)]
pub struct ReactionEquation {
    pub reactants: Vec<Compound>,
    pub agents: Vec<Compound>,
    pub products: Vec<Compound>,
}

impl ReactionEquation {
    pub fn parse(text: &str) -> Result<Self, ReactionError> {
        let roles: Vec<&str> = text.split('>').collect();
        if roles.len() != 3 {
            return Err(ReactionError::RoleCount(roles.len()));
        }
        Ok(ReactionEquation {
            reactants: parse_role(roles[0])?,
            agents: parse_role(roles[1])?,
            products: parse_role(roles[2])?,
        })
    }

    /// Strip atom maps from every atom and fold the explicit hydrogens the
    /// stripping leaves behind.
    pub fn remove_maps(&mut self) {
        for compound in self
            .reactants
            .iter_mut()
            .chain(self.agents.iter_mut())
            .chain(self.products.iter_mut())
        {
            for fragment in compound.fragments.iter_mut() {
                remove_atom_maps(fragment);
                *fragment = fold_explicit_hydrogens(fragment);
            }
        }
    }

    /// Canonical serialisation: compounds canonicalised and sorted within
    /// each role, roles joined with `>`. An empty agent role collapses the
    /// separator to `>>`.
    pub fn to_smiles(&self) -> String {
        let render = |compounds: &[Compound]| {
            let mut parts: Vec<String> = compounds.iter().map(Compound::to_smiles).collect();
            parts.sort();
            parts.join(".")
        };
        format!(
            "{}>{}>{}",
            render(&self.reactants),
            render(&self.agents),
            render(&self.products)
        )
    }
}

fn parse_role(text: &str) -> Result<Vec<Compound>, ReactionError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split('.').map(Compound::parse).collect()
}

/// Check that a serialised reaction parses back cleanly.
pub fn validate_reaction(text: &str) -> bool {
    ReactionEquation::parse(text).is_ok()
}

/// Canonicalise a mapped reaction string: every fragment rewritten in
/// canonical form, fragments and compounds sorted, atom maps preserved.
pub fn canonicalise(text: &str) -> Result<String, Rejection> {
    let equation = ReactionEquation::parse(text).map_err(|_| Rejection::Canonicalisation)?;
    let out = equation.to_smiles();
    if !validate_reaction(&out) {
        return Err(Rejection::Smarts);
    }
    Ok(out)
}

/// Produce the canonical unmapped form of a reaction string.
pub fn remove_mapping(text: &str) -> Result<String, Rejection> {
    let mut equation = ReactionEquation::parse(text).map_err(|_| Rejection::Mapping)?;
    equation.remove_maps();
    let out = equation.to_smiles();
    if !validate_reaction(&out) {
        return Err(Rejection::Mapping);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_requires_two_separators() {
        assert!(ReactionEquation::parse("CCO>>CC").is_ok());
        assert!(ReactionEquation::parse("CCO>CC").is_err());
        assert!(ReactionEquation::parse("CCO>>CC>N").is_err());
    }

    #[test]
    fn empty_agent_role_is_fine() {
        let eq = ReactionEquation::parse("CCO.CN>>CC").expect("parse failed");
        assert_eq!(eq.reactants.len(), 2);
        assert!(eq.agents.is_empty());
        assert_eq!(eq.products.len(), 1);
        let out = eq.to_smiles();
        assert!(out.contains(">>"));
        assert_eq!(out.matches('>').count(), 2);
        assert_eq!(out, canonicalise(&out).expect("canonicalise failed"));
    }

    #[test]
    fn empty_compound_is_rejected() {
        assert!(ReactionEquation::parse("CCO..CN>>CC").is_err());
    }

    #[test]
    fn tilde_groups_fragments_within_a_compound() {
        let eq = ReactionEquation::parse("CCO~[Na+]>>CC").expect("parse failed");
        assert_eq!(eq.reactants.len(), 1);
        assert_eq!(eq.reactants[0].fragments.len(), 2);
        assert!(eq.to_smiles().contains('~'));
    }

    #[test]
    fn canonicalise_sorts_and_normalises() {
        let a = canonicalise("OCC.CN>>CC").expect("canonicalise failed");
        let b = canonicalise("CN.CCO>>CC").expect("canonicalise failed");
        assert_eq!(a, b);
    }

    #[test]
    fn canonicalise_keeps_maps() {
        let out = canonicalise("[CH3:1][OH:2]>>[CH3:1]Cl").expect("canonicalise failed");
        assert!(out.contains(":1]"));
        assert!(out.contains(":2]"));
    }

    #[test]
    fn canonicalise_rejects_garbage() {
        assert_eq!(canonicalise("C(>>CC"), Err(Rejection::Canonicalisation));
        assert_eq!(canonicalise("CCO>CC"), Err(Rejection::Canonicalisation));
    }

    #[test]
    fn remove_mapping_strips_maps_and_hydrogens() {
        let out = remove_mapping("[CH3:1][OH:2]>>[CH3:1][Cl:3]").expect("remove_mapping failed");
        assert!(!out.contains(':'));
        assert_eq!(out, canonicalise("CO>>CCl").expect("canonicalise failed"));
    }

    #[test]
    fn remove_mapping_rejects_garbage() {
        assert_eq!(remove_mapping("][>>CC"), Err(Rejection::Mapping));
    }

    #[test]
    fn unmapped_equation_is_unchanged_by_map_removal() {
        let a = remove_mapping("CCO>>CC").expect("remove_mapping failed");
        let b = canonicalise("CCO>>CC").expect("canonicalise failed");
        assert_eq!(a, b);
    }
}
