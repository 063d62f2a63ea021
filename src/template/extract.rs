use super::{change_digit, chiral_digit, EditType, ExtractorSettings, Site, TemplateLabel};
use crate::{
    implicit_hydrogens, parse_smiles, subgraph, write_smarts, Bond, Chirality, MoleculeGraph,
    SmilesError,
};
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error(transparent)]
    Smiles(#[from] SmilesError),
    #[error("{0} unmapped product atoms exceed the limit of {1}")]
    TooManyUnmapped(usize, usize),
    #[error("no mapped change between reactants and products")]
    NoChange,
}

/// Result of extracting one reaction's template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub label: TemplateLabel,
    /// Edit sites in template-local numbering, by edit type. Only types
    /// with at least one site appear.
    pub edits: BTreeMap<EditType, Vec<Site>>,
}

/// One side of a mapped reaction, indexed by atom-map number.
struct SideView {
    compounds: Vec<MoleculeGraph>,
    atoms: BTreeMap<u32, (usize, NodeIndex)>,
    bonds: BTreeMap<(u32, u32), Bond>,
    unmapped: usize,
}

impl SideView {
    fn parse(text: &str) -> Result<Self, SmilesError> {
        let compounds = text
            .split('.')
            .map(parse_smiles)
            .collect::<Result<Vec<_>, _>>()?;
        let mut atoms = BTreeMap::new();
        let mut bonds = BTreeMap::new();
        let mut unmapped = 0;
        for (ci, graph) in compounds.iter().enumerate() {
            for node in graph.node_indices() {
                match graph[node].map {
                    Some(m) => {
                        atoms.insert(m, (ci, node));
                    }
                    None => unmapped += 1,
                }
            }
            for edge in graph.edge_indices() {
                let Some((a, b)) = graph.edge_endpoints(edge) else {
                    continue;
                };
                let (Some(ma), Some(mb)) = (graph[a].map, graph[b].map) else {
                    continue;
                };
                let Some(&bond) = graph.edge_weight(edge) else {
                    continue;
                };
                bonds.insert(bond_key(ma, mb), bond);
            }
        }
        Ok(SideView {
            compounds,
            atoms,
            bonds,
            unmapped,
        })
    }

    fn hydrogens(&self, map: u32) -> Option<u8> {
        self.atoms
            .get(&map)
            .map(|&(ci, node)| implicit_hydrogens(&self.compounds[ci], node))
    }

    fn charge(&self, map: u32) -> Option<i8> {
        self.atoms
            .get(&map)
            .map(|&(ci, node)| self.compounds[ci][node].charge)
    }

    fn chirality(&self, map: u32) -> Option<Chirality> {
        self.atoms
            .get(&map)
            .map(|&(ci, node)| self.compounds[ci][node].chirality)
    }

    /// Mapped neighbours of a mapped atom, ascending by map number.
    fn mapped_neighbors(&self, map: u32) -> Vec<u32> {
        let Some(&(ci, node)) = self.atoms.get(&map) else {
            return Vec::new();
        };
        let graph = &self.compounds[ci];
        let mut out: Vec<u32> = graph
            .neighbors(node)
            .filter_map(|n| graph[n].map)
            .collect();
        out.sort_unstable();
        out
    }
}

fn bond_key(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Extract the minimal reaction template of one mapped
/// `reactants>>product` pair.
///
/// The mapped bond sets of the two sides are compared to find formed,
/// broken and order-changed bonds; atoms whose hydrogen count, charge or
/// (with `use_stereo`) chirality changed away from any edited bond become
/// atom edits. Each edit site is grown along mapped neighbours until it
/// covers `least_atom_num` atoms, the covered atoms are renumbered `1..=N`
/// in map order, and both sides are serialised as SMARTS over the induced
/// subgraphs.
pub fn extract_from_reaction(
    reactants: &str,
    product: &str,
    settings: &ExtractorSettings,
) -> Result<Extraction, ExtractError> {
    let settings = settings.resolved();
    let reactant_side = SideView::parse(reactants)?;
    let product_side = SideView::parse(product)?;

    if product_side.unmapped > settings.max_unmap {
        return Err(ExtractError::TooManyUnmapped(
            product_side.unmapped,
            settings.max_unmap,
        ));
    }

    let mut edits: BTreeMap<EditType, Vec<(u32, u32)>> = BTreeMap::new();
    let mut bonded_atoms: BTreeSet<u32> = BTreeSet::new();

    // Bonds in the product with no counterpart among the reactants, and the
    // reverse. A bond whose atoms are all absent from the other side sits in
    // an unreacted compound and is ignored.
    for &key in product_side.bonds.keys() {
        if reactant_side.bonds.contains_key(&key) {
            continue;
        }
        let touches_reactants =
            reactant_side.atoms.contains_key(&key.0) || reactant_side.atoms.contains_key(&key.1);
        if touches_reactants {
            edits.entry(EditType::B).or_default().push(key);
            bonded_atoms.insert(key.0);
            bonded_atoms.insert(key.1);
        }
    }
    for (&key, &bond) in &reactant_side.bonds {
        match product_side.bonds.get(&key) {
            None => {
                let touches_product =
                    product_side.atoms.contains_key(&key.0) || product_side.atoms.contains_key(&key.1);
                if touches_product {
                    edits.entry(EditType::R).or_default().push(key);
                    bonded_atoms.insert(key.0);
                    bonded_atoms.insert(key.1);
                }
            }
            Some(&product_bond) if product_bond != bond => {
                edits.entry(EditType::C).or_default().push(key);
                bonded_atoms.insert(key.0);
                bonded_atoms.insert(key.1);
            }
            Some(_) => {}
        }
    }

    // Atom-only edits: property changes away from every edited bond.
    let mut atom_edits: Vec<u32> = Vec::new();
    for &map in reactant_side.atoms.keys() {
        if bonded_atoms.contains(&map) || !product_side.atoms.contains_key(&map) {
            continue;
        }
        let h_changed = reactant_side.hydrogens(map) != product_side.hydrogens(map);
        let charge_changed = reactant_side.charge(map) != product_side.charge(map);
        let stereo_changed = settings.use_stereo
            && reactant_side.chirality(map) != product_side.chirality(map);
        if h_changed || charge_changed || stereo_changed {
            atom_edits.push(map);
        }
    }

    if edits.is_empty() && atom_edits.is_empty() {
        return Err(ExtractError::NoChange);
    }

    // Grow every edit site until it covers enough atoms. Formed bonds grow
    // on the product side, everything else on the reactant side.
    let mut core: BTreeSet<u32> = BTreeSet::new();
    for (&edit_type, sites) in &edits {
        let side = if edit_type == EditType::B {
            &product_side
        } else {
            &reactant_side
        };
        for &(a, b) in sites {
            let mut seed: BTreeSet<u32> = [a, b]
                .into_iter()
                .filter(|m| side.atoms.contains_key(m))
                .collect();
            grow_site(&mut seed, side, settings.least_atom_num);
            core.insert(a);
            core.insert(b);
            core.extend(seed);
        }
    }
    for &map in &atom_edits {
        let mut seed: BTreeSet<u32> = [map].into_iter().collect();
        grow_site(&mut seed, &reactant_side, settings.least_atom_num);
        core.extend(seed);
    }

    // Template-local numbering follows ascending map order.
    let renumber: BTreeMap<u32, u32> = core
        .iter()
        .enumerate()
        .map(|(i, &m)| (m, i as u32 + 1))
        .collect();

    let reactant_smarts = side_smarts(&reactant_side, &renumber, &settings);
    let product_smarts = side_smarts(&product_side, &renumber, &settings);
    let smarts = if settings.retro {
        format!("{product_smarts}>>{reactant_smarts}")
    } else {
        format!("{reactant_smarts}>>{product_smarts}")
    };

    let mut h_code = String::new();
    let mut charge_code = String::new();
    let mut chiral_code = String::new();
    for &map in core.iter() {
        let h_delta = match (reactant_side.hydrogens(map), product_side.hydrogens(map)) {
            (Some(before), Some(after)) => after as i32 - before as i32,
            _ => 0,
        };
        h_code.push(change_digit(h_delta));
        let charge_delta = match (reactant_side.charge(map), product_side.charge(map)) {
            (Some(before), Some(after)) => after as i32 - before as i32,
            _ => 0,
        };
        charge_code.push(change_digit(charge_delta));
        if settings.use_stereo {
            let before = reactant_side.chirality(map);
            let after = product_side.chirality(map);
            let had = matches!(before, Some(c) if c != Chirality::None);
            let has = matches!(after, Some(c) if c != Chirality::None);
            let inverted = had && has && before != after;
            chiral_code.push(chiral_digit(had, has, inverted));
        }
    }

    let label = TemplateLabel {
        smarts,
        h_code,
        charge_code,
        chiral_code: settings.use_stereo.then_some(chiral_code),
    };

    let mut renumbered_edits: BTreeMap<EditType, Vec<Site>> = BTreeMap::new();
    for (edit_type, sites) in edits {
        let mut out: Vec<Site> = sites
            .into_iter()
            .filter_map(|(a, b)| {
                let (na, nb) = (renumber.get(&a)?, renumber.get(&b)?);
                Some(Site::Bond(*na.min(nb), *na.max(nb)))
            })
            .collect();
        out.sort_unstable();
        renumbered_edits.insert(edit_type, out);
    }
    if !atom_edits.is_empty() {
        let mut out: Vec<Site> = atom_edits
            .iter()
            .filter_map(|m| renumber.get(m).map(|&n| Site::Atom(n)))
            .collect();
        out.sort_unstable();
        renumbered_edits.insert(EditType::A, out);
    }

    Ok(Extraction {
        label,
        edits: renumbered_edits,
    })
}

/// Expand a seed set along mapped neighbours, smallest map first, until it
/// reaches the requested size or runs out of neighbours.
fn grow_site(seed: &mut BTreeSet<u32>, side: &SideView, least_atom_num: usize) {
    while seed.len() < least_atom_num {
        let mut frontier: Vec<u32> = seed
            .iter()
            .flat_map(|&m| side.mapped_neighbors(m))
            .filter(|m| !seed.contains(m))
            .collect();
        if frontier.is_empty() {
            break;
        }
        frontier.sort_unstable();
        seed.insert(frontier[0]);
    }
}

/// Induced template subgraph of one side, renumbered and serialised.
fn side_smarts(
    side: &SideView,
    renumber: &BTreeMap<u32, u32>,
    settings: &ExtractorSettings,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    for graph in &side.compounds {
        let nodes: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|&n| graph[n].map.map_or(false, |m| renumber.contains_key(&m)))
            .collect();
        if nodes.is_empty() {
            continue;
        }
        let mut template = subgraph(graph, &nodes);
        // Freeze hydrogen counts from the full molecule before bonds are
        // cut away, and renumber into template-local maps.
        for (position, &original) in nodes.iter().enumerate() {
            let frozen = implicit_hydrogens(graph, original);
            let atom = &mut template[NodeIndex::new(position)];
            atom.hydrogens = Some(frozen);
            atom.map = atom.map.and_then(|m| renumber.get(&m).copied());
            if !settings.use_stereo {
                atom.chirality = Chirality::None;
            }
        }
        parts.push(write_smarts(&template, settings.use_symbol));
    }
    parts.sort();
    parts.join(".")
}
