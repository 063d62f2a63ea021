use crate::{implied_hydrogens, is_organic_subset, morgan_ranks, Bond, Chirality, MoleculeGraph};
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Smiles,
    /// Query-atom emission for reaction templates. `symbols: false` writes
    /// generic `[#6:1]` atoms instead of `[CH3:1]`.
    Smarts { symbols: bool },
}

/// Serialise a molecule graph as canonical SMILES.
///
/// Atoms are visited in Morgan-rank order from a rank-minimal root, so the
/// output is deterministic for isomorphic graphs. Disconnected fragments are
/// serialised separately, sorted lexicographically and joined with `.`.
pub fn write_smiles(graph: &MoleculeGraph) -> String {
    write_with_style(graph, Style::Smiles)
}

/// Serialise a template graph as reaction SMARTS. Every atom is bracketed;
/// single bonds are written explicitly so the pattern is unambiguous.
pub fn write_smarts(graph: &MoleculeGraph, use_symbol: bool) -> String {
    write_with_style(graph, Style::Smarts { symbols: use_symbol })
}

fn write_with_style(graph: &MoleculeGraph, style: Style) -> String {
    let ranks = morgan_ranks(graph);
    let mut seen: HashSet<NodeIndex> = HashSet::new();
    let mut fragments: Vec<String> = Vec::new();

    // Scan roots in (rank, index) order so each component is entered at its
    // rank-minimal atom.
    let mut roots: Vec<NodeIndex> = graph.node_indices().collect();
    roots.sort_by_key(|&n| (ranks[n.index()], n.index()));

    for root in roots {
        if seen.contains(&root) {
            continue;
        }
        let tree = SpanningTree::build(graph, &ranks, root);
        for node in tree.visited() {
            seen.insert(node);
        }
        fragments.push(tree.emit(graph, style));
    }

    fragments.sort();
    fragments.join(".")
}

/// Spanning tree of one connected component, with ring-closure bookkeeping.
struct SpanningTree {
    root: NodeIndex,
    children: BTreeMap<NodeIndex, Vec<NodeIndex>>,
    parent_bond: BTreeMap<NodeIndex, Bond>,
    /// Closure digits per node, in discovery order. The bool marks the
    /// closing end, which carries the bond symbol; the last field is the
    /// peer atom on the other side of the ring bond.
    closures: BTreeMap<NodeIndex, Vec<(u16, Bond, bool, NodeIndex)>>,
    order: Vec<NodeIndex>,
}

impl SpanningTree {
    fn build(graph: &MoleculeGraph, ranks: &[u64], root: NodeIndex) -> Self {
        let mut tree = SpanningTree {
            root,
            children: BTreeMap::new(),
            parent_bond: BTreeMap::new(),
            closures: BTreeMap::new(),
            order: Vec::new(),
        };
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut closed_edges: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
        let mut next_closure: u16 = 1;
        tree.visit(
            graph,
            ranks,
            root,
            None,
            &mut visited,
            &mut closed_edges,
            &mut next_closure,
        );
        tree
    }

    #[allow(clippy::too_many_arguments)]
    fn visit(
        &mut self,
        graph: &MoleculeGraph,
        ranks: &[u64],
        node: NodeIndex,
        parent: Option<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
        closed_edges: &mut HashSet<(NodeIndex, NodeIndex)>,
        next_closure: &mut u16,
    ) {
        visited.insert(node);
        self.order.push(node);

        let mut neighbors: Vec<NodeIndex> = graph.neighbors(node).collect();
        neighbors.sort_by_key(|&n| (ranks[n.index()], n.index()));

        for neighbor in neighbors {
            if Some(neighbor) == parent {
                continue;
            }
            let edge = graph
                .find_edge(node, neighbor)
                .and_then(|e| graph.edge_weight(e).copied())
                .unwrap_or(Bond::Single);
            if visited.contains(&neighbor) {
                let key = ordered_pair(node, neighbor);
                if closed_edges.insert(key) {
                    let digit = *next_closure;
                    *next_closure += 1;
                    // The already-visited endpoint opened the ring.
                    self.closures
                        .entry(neighbor)
                        .or_default()
                        .push((digit, edge, false, node));
                    self.closures
                        .entry(node)
                        .or_default()
                        .push((digit, edge, true, neighbor));
                }
            } else {
                self.children.entry(node).or_default().push(neighbor);
                self.parent_bond.insert(neighbor, edge);
                self.visit(
                    graph,
                    ranks,
                    neighbor,
                    Some(node),
                    visited,
                    closed_edges,
                    next_closure,
                );
            }
        }
    }

    fn visited(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.order.iter().copied()
    }

    fn emit(&self, graph: &MoleculeGraph, style: Style) -> String {
        let mut out = String::new();
        self.emit_node(graph, style, self.root, &mut out);
        out
    }

    fn emit_node(&self, graph: &MoleculeGraph, style: Style, node: NodeIndex, out: &mut String) {
        out.push_str(&atom_token(graph, node, style));
        if let Some(closures) = self.closures.get(&node) {
            for &(digit, bond, closing, peer) in closures {
                if closing {
                    out.push_str(&bond_symbol(graph, node, peer, bond, style));
                }
                if digit > 9 {
                    out.push('%');
                    out.push_str(&format!("{digit:02}"));
                } else {
                    out.push_str(&digit.to_string());
                }
            }
        }
        let children = match self.children.get(&node) {
            Some(c) => c.as_slice(),
            None => return,
        };
        for (i, &child) in children.iter().enumerate() {
            let bond = self.parent_bond.get(&child).copied().unwrap_or(Bond::Single);
            let symbol = bond_symbol(graph, node, child, bond, style);
            if i + 1 < children.len() {
                out.push('(');
                out.push_str(&symbol);
                self.emit_node(graph, style, child, out);
                out.push(')');
            } else {
                out.push_str(&symbol);
                self.emit_node(graph, style, child, out);
            }
        }
    }
}

fn ordered_pair(a: NodeIndex, b: NodeIndex) -> (NodeIndex, NodeIndex) {
    if a.index() <= b.index() {
        (a, b)
    } else {
        (b, a)
    }
}

fn bond_symbol(
    graph: &MoleculeGraph,
    a: NodeIndex,
    b: NodeIndex,
    bond: Bond,
    style: Style,
) -> String {
    match style {
        Style::Smiles => match bond {
            // An implicit bond between two aromatic atoms reads back as
            // aromatic, so a genuine single bond there must be written `-`.
            Bond::Single if graph[a].aromatic && graph[b].aromatic => "-".to_string(),
            Bond::Single | Bond::Aromatic => String::new(),
            Bond::Double => "=".to_string(),
            Bond::Triple => "#".to_string(),
            Bond::Unspecified => "~".to_string(),
        },
        Style::Smarts { .. } => match bond {
            Bond::Single => "-".to_string(),
            Bond::Double => "=".to_string(),
            Bond::Triple => "#".to_string(),
            Bond::Aromatic => ":".to_string(),
            Bond::Unspecified => "~".to_string(),
        },
    }
}

fn atom_token(graph: &MoleculeGraph, node: NodeIndex, style: Style) -> String {
    let atom = &graph[node];
    match style {
        Style::Smiles => {
            if can_write_bare(graph, node) {
                let symbol = atom.symbol();
                if atom.aromatic {
                    symbol.to_ascii_lowercase()
                } else {
                    symbol.to_string()
                }
            } else {
                bracket_token(graph, node)
            }
        }
        Style::Smarts { symbols: true } => bracket_token(graph, node),
        Style::Smarts { symbols: false } => {
            let mut out = String::from("[#");
            out.push_str(&atom.element.to_string());
            out.push_str(&charge_suffix(atom.charge));
            if let Some(map) = atom.map {
                out.push(':');
                out.push_str(&map.to_string());
            }
            out.push(']');
            out
        }
    }
}

fn can_write_bare(graph: &MoleculeGraph, node: NodeIndex) -> bool {
    let atom = &graph[node];
    if !is_organic_subset(atom.element)
        || atom.charge != 0
        || atom.isotope.is_some()
        || atom.map.is_some()
        || atom.chirality != Chirality::None
    {
        return false;
    }
    match atom.hydrogens {
        None => true,
        // Only writable bare if the default-valence rules would put the same
        // hydrogen count back.
        Some(h) => h == implied_hydrogens(graph, node),
    }
}

fn bracket_token(graph: &MoleculeGraph, node: NodeIndex) -> String {
    let atom = &graph[node];
    let mut out = String::from("[");
    if let Some(isotope) = atom.isotope {
        out.push_str(&isotope.to_string());
    }
    let symbol = atom.symbol();
    if atom.aromatic {
        out.push_str(&symbol.to_ascii_lowercase());
    } else {
        out.push_str(symbol);
    }
    match atom.chirality {
        Chirality::None => {}
        Chirality::Anticlockwise => out.push('@'),
        Chirality::Clockwise => out.push_str("@@"),
    }
    let h = atom
        .hydrogens
        .unwrap_or_else(|| implied_hydrogens(graph, node));
    if h == 1 {
        out.push('H');
    } else if h > 1 {
        out.push('H');
        out.push_str(&h.to_string());
    }
    out.push_str(&charge_suffix(atom.charge));
    if let Some(map) = atom.map {
        out.push(':');
        out.push_str(&map.to_string());
    }
    out.push(']');
    out
}

fn charge_suffix(charge: i8) -> String {
    match charge {
        0 => String::new(),
        1 => "+".to_string(),
        -1 => "-".to_string(),
        c if c > 1 => format!("+{c}"),
        c => format!("-{}", -(c as i16)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_smiles;

    fn canonical(smiles: &str) -> String {
        write_smiles(&parse_smiles(smiles).expect("Failed to parse SMILES"))
    }

    #[test]
    fn equivalent_inputs_serialize_identically() {
        assert_eq!(canonical("CCO"), canonical("OCC"));
        assert_eq!(canonical("C(C)O"), canonical("OCC"));
        assert_eq!(canonical("c1ccccc1"), canonical("c1ccc(cc1)"));
    }

    #[test]
    fn fragments_are_sorted() {
        let a = canonical("CCO.[Na+]");
        let b = canonical("[Na+].CCO");
        assert_eq!(a, b);
    }

    #[test]
    fn bare_atoms_stay_bare() {
        let out = canonical("CCO");
        assert!(!out.contains('['));
    }

    #[test]
    fn charges_and_maps_force_brackets() {
        let out = canonical("[CH3:7][O-]");
        assert!(out.contains(":7]"));
        assert!(out.contains("[O-]"));
    }

    #[test]
    fn double_and_triple_bonds_survive() {
        let out = canonical("CC#N");
        assert!(out.contains('#'));
        let out = canonical("C=O");
        assert!(out.contains('='));
    }

    #[test]
    fn rings_roundtrip() {
        let out = canonical("C1CCCCC1");
        let reparsed = parse_smiles(&out).expect("Failed to parse SMILES");
        assert_eq!(reparsed.node_count(), 6);
        assert_eq!(reparsed.edge_count(), 6);
    }

    #[test]
    fn idempotent_on_own_output() {
        for s in ["CC(=O)OC1=CC=CC=C1C(=O)O", "c1ccccc1O", "[NH4+].[Cl-]"] {
            let once = canonical(s);
            assert_eq!(once, canonical(&once));
        }
    }

    #[test]
    fn smarts_brackets_every_atom_and_bond() {
        let g = parse_smiles("[CH3:1][OH:2]").expect("Failed to parse SMILES");
        let out = write_smarts(&g, true);
        assert!(out == "[CH3:1]-[OH:2]" || out == "[OH:2]-[CH3:1]", "{out}");
        let generic = write_smarts(&g, false);
        assert!(
            generic == "[#6:1]-[#8:2]" || generic == "[#8:2]-[#6:1]",
            "{generic}"
        );
    }
}
