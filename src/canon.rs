use crate::MoleculeGraph;
use petgraph::graph::NodeIndex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Canonical atom ranks computed with the Morgan algorithm.
///
/// Every atom starts from an invariant of its local properties, then the
/// labels are iteratively refined by hashing each atom's label together with
/// its sorted neighbour labels until the number of distinct labels stops
/// growing. Ranks are dense, `0..k`, and identical graphs always produce
/// identical rankings regardless of input atom order.
pub fn morgan_ranks(graph: &MoleculeGraph) -> Vec<u64> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }

    let mut labels: Vec<u64> = graph
        .node_indices()
        .map(|node| initial_label(graph, node))
        .collect();
    let mut distinct = count_distinct(&labels);

    // Refinement can only split classes, so it converges in <= n rounds.
    for _ in 0..n {
        let next: Vec<u64> = graph
            .node_indices()
            .map(|node| {
                let mut neighbor_labels: Vec<u64> = graph
                    .neighbors(node)
                    .map(|m| labels[m.index()])
                    .collect();
                neighbor_labels.sort_unstable();
                let mut hasher = DefaultHasher::new();
                labels[node.index()].hash(&mut hasher);
                neighbor_labels.hash(&mut hasher);
                hasher.finish()
            })
            .collect();
        let next_distinct = count_distinct(&next);
        if next_distinct <= distinct {
            break;
        }
        labels = next;
        distinct = next_distinct;
    }

    compress_to_ranks(&labels)
}

/// Invariant seed: everything structural about the atom except its map
/// number, so that mapped and unmapped copies of a molecule rank alike.
fn initial_label(graph: &MoleculeGraph, node: NodeIndex) -> u64 {
    let atom = &graph[node];
    let mut degree = 0u32;
    let mut bond_orders: Vec<u32> = graph
        .edges(node)
        .map(|e| {
            degree += 1;
            e.weight().order_times_two()
        })
        .collect();
    bond_orders.sort_unstable();

    let mut hasher = DefaultHasher::new();
    atom.element.hash(&mut hasher);
    atom.aromatic.hash(&mut hasher);
    atom.charge.hash(&mut hasher);
    atom.isotope.hash(&mut hasher);
    atom.hydrogens.hash(&mut hasher);
    degree.hash(&mut hasher);
    bond_orders.hash(&mut hasher);
    hasher.finish()
}

fn count_distinct(labels: &[u64]) -> usize {
    let mut sorted = labels.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

/// Map arbitrary hash labels to dense ranks by sorted order. Symmetric atoms
/// share a rank; ties are broken later by the writer's traversal order.
fn compress_to_ranks(labels: &[u64]) -> Vec<u64> {
    let mut sorted = labels.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    labels
        .iter()
        .map(|label| {
            sorted
                .binary_search(label)
                .map(|i| i as u64)
                .unwrap_or(u64::MAX)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_smiles;

    #[test]
    fn symmetric_atoms_share_ranks() {
        let propane = parse_smiles("CCC").expect("Failed to parse SMILES");
        let ranks = morgan_ranks(&propane);
        assert_eq!(ranks[0], ranks[2]);
        assert_ne!(ranks[0], ranks[1]);
    }

    #[test]
    fn ranks_are_input_order_independent() {
        let a = parse_smiles("CCO").expect("Failed to parse SMILES");
        let b = parse_smiles("OCC").expect("Failed to parse SMILES");
        let ranks_a = morgan_ranks(&a);
        let ranks_b = morgan_ranks(&b);
        // Same multiset of ranks, oxygen gets the same rank in both.
        let mut sa = ranks_a.clone();
        let mut sb = ranks_b.clone();
        sa.sort_unstable();
        sb.sort_unstable();
        assert_eq!(sa, sb);
        assert_eq!(ranks_a[2], ranks_b[0]);
    }

    #[test]
    fn benzene_is_fully_symmetric() {
        let benzene = parse_smiles("c1ccccc1").expect("Failed to parse SMILES");
        let ranks = morgan_ranks(&benzene);
        assert!(ranks.iter().all(|&r| r == ranks[0]));
    }

    #[test]
    fn charge_breaks_symmetry() {
        let g = parse_smiles("[O-]C[O-]").expect("Failed to parse SMILES");
        let h = parse_smiles("OC[O-]").expect("Failed to parse SMILES");
        assert_eq!(morgan_ranks(&g)[0], morgan_ranks(&g)[2]);
        assert_ne!(morgan_ranks(&h)[0], morgan_ranks(&h)[2]);
    }

    #[test]
    fn empty_graph_has_no_ranks() {
        let graph = MoleculeGraph::new_undirected();
        assert!(morgan_ranks(&graph).is_empty());
    }
}
