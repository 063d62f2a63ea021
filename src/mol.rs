use crate::{default_valences, Bond, Chirality, MoleculeGraph};
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

/// Hydrogen count the default-valence rules would assign, ignoring any
/// explicit count stored on the atom. The bond-order sum uses twice-order
/// arithmetic so aromatic bonds contribute 1.5 without floats.
pub fn implied_hydrogens(graph: &MoleculeGraph, node: NodeIndex) -> u8 {
    let valences = default_valences(graph[node].element);
    if valences.is_empty() {
        return 0;
    }
    let order_sum_x2: u32 = graph
        .edges(node)
        .map(|e| e.weight().order_times_two())
        .sum();
    let bonds = order_sum_x2 / 2;
    for &valence in valences {
        if valence >= bonds {
            return (valence - bonds) as u8;
        }
    }
    0
}

/// Effective hydrogen count: the explicit bracket count when present,
/// otherwise the default-valence count.
pub fn implicit_hydrogens(graph: &MoleculeGraph, node: NodeIndex) -> u8 {
    graph[node]
        .hydrogens
        .unwrap_or_else(|| implied_hydrogens(graph, node))
}

pub fn heavy_atom_count(graph: &MoleculeGraph) -> usize {
    graph
        .node_indices()
        .filter(|&n| !graph[n].is_hydrogen())
        .count()
}

pub fn has_carbon(graph: &MoleculeGraph) -> bool {
    graph.node_indices().any(|n| graph[n].is_carbon())
}

pub fn remove_atom_maps(graph: &mut MoleculeGraph) {
    for node in graph.node_indices() {
        graph[node].map = None;
    }
}

pub fn remove_stereochemistry(graph: &mut MoleculeGraph) {
    for node in graph.node_indices() {
        graph[node].chirality = Chirality::None;
    }
}

/// Induced subgraph over a node subset, preserving atom and bond weights.
pub fn subgraph(graph: &MoleculeGraph, nodes: &[NodeIndex]) -> MoleculeGraph {
    let mut out = MoleculeGraph::new_undirected();
    let mut remap: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    for &node in nodes {
        remap.insert(node, out.add_node(graph[node].clone()));
    }
    for edge in graph.edge_indices() {
        if let Some((a, b)) = graph.edge_endpoints(edge) {
            if let (Some(&na), Some(&nb)) = (remap.get(&a), remap.get(&b)) {
                if let Some(weight) = graph.edge_weight(edge) {
                    out.add_edge(na, nb, *weight);
                }
            }
        }
    }
    out
}

/// Split a graph into its connected components, each as its own graph.
pub fn connected_components(graph: &MoleculeGraph) -> Vec<MoleculeGraph> {
    let mut component_of: Vec<Option<usize>> = vec![None; graph.node_count()];
    let mut count = 0;
    for start in graph.node_indices() {
        if component_of[start.index()].is_some() {
            continue;
        }
        let id = count;
        count += 1;
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if component_of[node.index()].is_some() {
                continue;
            }
            component_of[node.index()] = Some(id);
            stack.extend(graph.neighbors(node));
        }
    }
    let mut members: Vec<Vec<NodeIndex>> = vec![Vec::new(); count];
    for node in graph.node_indices() {
        if let Some(id) = component_of[node.index()] {
            members[id].push(node);
        }
    }
    members
        .into_iter()
        .map(|nodes| subgraph(graph, &nodes))
        .collect()
}

/// Break every unspecified (`~`) bond and return the resulting pieces.
/// A graph with no such bonds comes back as a single piece.
pub fn fragment_on_unspecified(graph: &MoleculeGraph) -> Vec<MoleculeGraph> {
    let mut cut = graph.clone();
    cut.retain_edges(|g, e| {
        g.edge_weight(e)
            .map(|w| *w != Bond::Unspecified)
            .unwrap_or(false)
    });
    connected_components(&cut)
}

/// Fold explicit hydrogen atoms into their neighbour's hydrogen count, so
/// `[H]OC` and `OC` serialise the same way. Only plain terminal hydrogens
/// are folded; deuterium and friends keep their node.
pub fn fold_explicit_hydrogens(graph: &MoleculeGraph) -> MoleculeGraph {
    let mut extra_h: HashMap<NodeIndex, u8> = HashMap::new();
    let mut removed: Vec<bool> = vec![false; graph.node_count()];

    for node in graph.node_indices() {
        let atom = &graph[node];
        if !atom.is_hydrogen()
            || atom.isotope.is_some()
            || atom.charge != 0
            || atom.map.is_some()
        {
            continue;
        }
        let neighbors: Vec<NodeIndex> = graph.neighbors(node).collect();
        if neighbors.len() != 1 {
            continue;
        }
        let neighbor = neighbors[0];
        if graph[neighbor].is_hydrogen() {
            continue;
        }
        let edge = graph
            .find_edge(node, neighbor)
            .and_then(|e| graph.edge_weight(e).copied());
        if edge != Some(Bond::Single) {
            continue;
        }
        removed[node.index()] = true;
        *extra_h.entry(neighbor).or_insert(0) += 1;
    }

    let keep: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|n| !removed[n.index()])
        .collect();
    let mut out = subgraph(graph, &keep);
    // subgraph preserves the order of `keep`, so positions line up.
    for (position, &original) in keep.iter().enumerate() {
        if let Some(&extra) = extra_h.get(&original) {
            let atom = &mut out[NodeIndex::new(position)];
            if let Some(h) = atom.hydrogens {
                atom.hydrogens = Some(h + extra);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_smiles, write_smiles};

    #[test]
    fn implied_hydrogen_counts() {
        let g = parse_smiles("CCO").expect("Failed to parse SMILES");
        assert_eq!(implied_hydrogens(&g, NodeIndex::new(0)), 3);
        assert_eq!(implied_hydrogens(&g, NodeIndex::new(1)), 2);
        assert_eq!(implied_hydrogens(&g, NodeIndex::new(2)), 1);
    }

    #[test]
    fn aromatic_carbon_has_one_hydrogen() {
        let g = parse_smiles("c1ccccc1").expect("Failed to parse SMILES");
        for n in g.node_indices() {
            assert_eq!(implied_hydrogens(&g, n), 1);
        }
    }

    #[test]
    fn explicit_count_wins() {
        let g = parse_smiles("[CH2]").expect("Failed to parse SMILES");
        assert_eq!(implicit_hydrogens(&g, NodeIndex::new(0)), 2);
    }

    #[test]
    fn heavy_atoms_exclude_hydrogen() {
        let g = parse_smiles("[H]OC").expect("Failed to parse SMILES");
        assert_eq!(heavy_atom_count(&g), 2);
        assert!(has_carbon(&g));
        let salt = parse_smiles("[Na+].[Cl-]").expect("Failed to parse SMILES");
        assert!(!has_carbon(&salt));
    }

    #[test]
    fn unspecified_bonds_split_compounds() {
        let g = parse_smiles("C~N").expect("Failed to parse SMILES");
        let pieces = fragment_on_unspecified(&g);
        assert_eq!(pieces.len(), 2);
        let g = parse_smiles("CN").expect("Failed to parse SMILES");
        assert_eq!(fragment_on_unspecified(&g).len(), 1);
    }

    #[test]
    fn folding_explicit_hydrogens_matches_implicit_form() {
        let explicit = parse_smiles("[H]OC").expect("Failed to parse SMILES");
        let folded = fold_explicit_hydrogens(&explicit);
        assert_eq!(folded.node_count(), 2);
        let implicit = parse_smiles("OC").expect("Failed to parse SMILES");
        assert_eq!(write_smiles(&folded), write_smiles(&implicit));
    }

    #[test]
    fn mapped_hydrogens_are_kept() {
        let g = parse_smiles("[H:4][Cl:3]").expect("Failed to parse SMILES");
        let folded = fold_explicit_hydrogens(&g);
        assert_eq!(folded.node_count(), 2);
    }

    #[test]
    fn map_and_stereo_removal() {
        let mut g = parse_smiles("[C@@H](N)(O)[CH3:5]").expect("Failed to parse SMILES");
        remove_atom_maps(&mut g);
        remove_stereochemistry(&mut g);
        for n in g.node_indices() {
            assert_eq!(g[n].map, None);
            assert_eq!(g[n].chirality, Chirality::None);
        }
    }
}
