use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::str::FromStr;

mod parse;
pub use parse::*;

mod canon;
pub use canon::*;

mod write;
pub use write::*;

mod mol;
pub use mol::*;

mod equation;
pub use equation::*;

mod normalize;
pub use normalize::*;

mod filters;
pub use filters::*;

mod dataset;
pub use dataset::*;

mod cleaning;
pub use cleaning::*;

pub mod template;

/// Tetrahedral chirality marker on an atom, as written in a bracket atom
/// (`@` = anticlockwise, `@@` = clockwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Chirality {
    #[default]
    None,
    Anticlockwise,
    Clockwise,
}

/// A single atom in a molecule graph.
///
/// `hydrogens` is `Some` only for bracket atoms, where SMILES semantics make
/// the hydrogen count explicit (absent `H` in a bracket means zero). Bare
/// organic-subset atoms carry `None` and get their hydrogen count from the
/// default-valence rules in [`implicit_hydrogens`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    /// Atomic number; 0 is the `*` dummy atom.
    pub element: u8,
    pub aromatic: bool,
    pub isotope: Option<u16>,
    pub charge: i8,
    pub hydrogens: Option<u8>,
    pub chirality: Chirality,
    /// Atom-map index (`[CH3:7]` carries map 7).
    pub map: Option<u32>,
}

impl Atom {
    pub fn new(element: u8) -> Self {
        Atom {
            element,
            aromatic: false,
            isotope: None,
            charge: 0,
            hydrogens: None,
            chirality: Chirality::None,
            map: None,
        }
    }

    pub fn is_carbon(&self) -> bool {
        self.element == 6
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element == 1
    }

    pub fn symbol(&self) -> &'static str {
        element_symbol(self.element)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bond {
    Single,
    Double,
    Triple,
    Aromatic,
    /// The `~` coordinate/unspecified bond found in fragment-annotated
    /// reaction strings. Compounds are split apart on these.
    Unspecified,
}

impl Bond {
    /// Twice the bond order, so aromatic bonds (1.5) stay integral.
    pub fn order_times_two(&self) -> u32 {
        match self {
            Bond::Single | Bond::Unspecified => 2,
            Bond::Double => 4,
            Bond::Triple => 6,
            Bond::Aromatic => 3,
        }
    }
}

pub type MoleculeGraph = petgraph::graph::UnGraph<Atom, Bond>;

lazy_static! {
    static ref SYMBOL_TO_NUMBER: BTreeMap<&'static str, u8> = {
        let mut m = BTreeMap::new();
        for (num, sym) in ELEMENTS {
            m.insert(*sym, *num);
        }
        m
    };
    static ref NUMBER_TO_SYMBOL: BTreeMap<u8, &'static str> = {
        let mut m = BTreeMap::new();
        for (num, sym) in ELEMENTS {
            m.insert(*num, *sym);
        }
        m
    };
}

const ELEMENTS: &[(u8, &str)] = &[
    (0, "*"),
    (1, "H"),
    (3, "Li"),
    (5, "B"),
    (6, "C"),
    (7, "N"),
    (8, "O"),
    (9, "F"),
    (11, "Na"),
    (12, "Mg"),
    (13, "Al"),
    (14, "Si"),
    (15, "P"),
    (16, "S"),
    (17, "Cl"),
    (19, "K"),
    (20, "Ca"),
    (22, "Ti"),
    (24, "Cr"),
    (25, "Mn"),
    (26, "Fe"),
    (27, "Co"),
    (28, "Ni"),
    (29, "Cu"),
    (30, "Zn"),
    (32, "Ge"),
    (33, "As"),
    (34, "Se"),
    (35, "Br"),
    (44, "Ru"),
    (45, "Rh"),
    (46, "Pd"),
    (47, "Ag"),
    (50, "Sn"),
    (51, "Sb"),
    (52, "Te"),
    (53, "I"),
    (55, "Cs"),
    (56, "Ba"),
    (74, "W"),
    (77, "Ir"),
    (78, "Pt"),
    (79, "Au"),
    (80, "Hg"),
    (82, "Pb"),
    (83, "Bi"),
];

/// Look up an element symbol, case sensitively.
pub fn element_number(symbol: &str) -> Option<u8> {
    SYMBOL_TO_NUMBER.get(symbol).copied()
}

pub fn element_symbol(number: u8) -> &'static str {
    NUMBER_TO_SYMBOL.get(&number).copied().unwrap_or("*")
}

/// Elements writable without brackets when uncharged, unmapped and at
/// default valence.
pub fn is_organic_subset(element: u8) -> bool {
    matches!(element, 5 | 6 | 7 | 8 | 9 | 15 | 16 | 17 | 35 | 53)
}

/// Allowed valences for the organic-subset elements, lowest first.
/// Elements outside the subset have no default valence.
pub fn default_valences(element: u8) -> &'static [u32] {
    match element {
        1 => &[1],
        5 => &[3],
        6 => &[4],
        7 => &[3, 5],
        8 => &[2],
        9 => &[1],
        15 => &[3, 5],
        16 => &[2, 4, 6],
        17 => &[1],
        35 => &[1],
        53 => &[1],
        _ => &[],
    }
}

/// Initialise a global tracing subscriber at the given level ("trace",
/// "debug", "info", "warn", "error"). Safe to call more than once.
pub fn init_logging(level: &str) {
    let level = tracing::Level::from_str(level).unwrap_or(tracing::Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_lookup_roundtrip() {
        assert_eq!(element_number("C"), Some(6));
        assert_eq!(element_number("Cl"), Some(17));
        assert_eq!(element_symbol(35), "Br");
        assert_eq!(element_number("Xx"), None);
    }

    #[test]
    fn organic_subset_membership() {
        assert!(is_organic_subset(6));
        assert!(is_organic_subset(35));
        assert!(!is_organic_subset(11)); // Na
        assert!(!is_organic_subset(1)); // H is always bracketed
    }

    #[test]
    fn aromatic_bond_order() {
        assert_eq!(Bond::Aromatic.order_times_two(), 3);
        assert_eq!(Bond::Triple.order_times_two(), 6);
    }
}
