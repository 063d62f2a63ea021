use crate::{element_number, Atom, Bond, Chirality, MoleculeGraph};
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char as nom_char, digit0, digit1, one_of};
use nom::combinator::{all_consuming, map_res, opt};
use nom::sequence::preceded;
use nom::IResult;
use petgraph::graph::NodeIndex;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmilesError {
    #[error("empty SMILES input")]
    Empty,
    #[error("branch start '(' at position {0} without a current atom")]
    BranchNoCurrentAtom(usize),
    #[error("branch end ')' at position {0} without a matching '('")]
    BranchEndNoStart(usize),
    #[error("{0} branch(es) left unclosed")]
    UnclosedBranch(usize),
    #[error("ring closure at position {0} without a current atom")]
    RingClosureNoCurrentAtom(usize),
    #[error("incomplete ring closure at position {0}")]
    IncompleteRingClosure(usize),
    #[error("unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("invalid bracket atom '[{0}]'")]
    BadBracketAtom(String),
    #[error("unknown element '{0}' at position {1}")]
    UnknownElement(String, usize),
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    #[error("ring bond {0} left unclosed")]
    UnclosedRingBond(u16),
}

// --- bracket-atom grammar -------------------------------------------------
//
// [isotope? symbol chirality? Hcount? charge? (:map)?]
// e.g. [13CH3+:45], [O-], [nH], [Pd], [C@@H], [*]

fn element_sym(input: &str) -> IResult<&str, (u8, bool)> {
    // Aromatic two-letter symbols come before the single-letter fallback.
    for (sym, num) in [("se", 34u8), ("as", 33), ("te", 52)] {
        if let Some(rest) = input.strip_prefix(sym) {
            return Ok((rest, (num, true)));
        }
    }
    let mut chars = input.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {
            // Prefer a two-letter symbol when the table knows it.
            if let Some(d) = chars.next() {
                if d.is_ascii_lowercase() {
                    let two: String = [c, d].iter().collect();
                    if let Some(num) = element_number(&two) {
                        return Ok((&input[2..], (num, false)));
                    }
                }
            }
            match element_number(&c.to_string()) {
                Some(num) => Ok((&input[1..], (num, false))),
                None => Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Tag,
                ))),
            }
        }
        Some(c) if "bcnops".contains(c) => {
            let upper = c.to_ascii_uppercase().to_string();
            match element_number(&upper) {
                Some(num) => Ok((&input[1..], (num, true))),
                None => Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Tag,
                ))),
            }
        }
        Some('*') => Ok((&input[1..], (0, false))),
        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        ))),
    }
}

fn chirality(input: &str) -> IResult<&str, Chirality> {
    let (input, tagv) = opt(alt((tag("@@"), tag("@"))))(input)?;
    let chir = match tagv {
        Some("@@") => Chirality::Clockwise,
        Some("@") => Chirality::Anticlockwise,
        _ => Chirality::None,
    };
    Ok((input, chir))
}

fn hydrogen_count(input: &str) -> IResult<&str, u8> {
    let (input, h) = opt(preceded(nom_char('H'), digit0))(input)?;
    let count = match h {
        None => 0,
        Some("") => 1,
        Some(d) => d.parse().unwrap_or(1),
    };
    Ok((input, count))
}

fn charge(input: &str) -> IResult<&str, i8> {
    let (input, sign) = opt(one_of("+-"))(input)?;
    let Some(sign_char) = sign else {
        return Ok((input, 0));
    };
    let sign = if sign_char == '+' { 1i8 } else { -1 };
    let (input, digits) = digit0(input)?;
    if !digits.is_empty() {
        let n: i8 = digits.parse().unwrap_or(1);
        return Ok((input, sign * n));
    }
    // Repeated signs: "++" is +2, "---" is -3.
    let mut n = 1i8;
    let mut rest = input;
    while let Some(r) = rest.strip_prefix(sign_char) {
        n += 1;
        rest = r;
    }
    Ok((rest, sign * n))
}

fn bracket_body(input: &str) -> IResult<&str, Atom> {
    let (input, isotope) = opt(map_res(digit1, str::parse::<u16>))(input)?;
    let (input, (element, aromatic)) = element_sym(input)?;
    let (input, chir) = chirality(input)?;
    let (input, hcount) = hydrogen_count(input)?;
    let (input, chg) = charge(input)?;
    let (input, map_num) = opt(preceded(nom_char(':'), map_res(digit1, str::parse::<u32>)))(input)?;
    Ok((
        input,
        Atom {
            element,
            aromatic,
            isotope,
            charge: chg,
            // In a bracket the hydrogen count is always explicit; absent means 0.
            hydrogens: Some(hcount),
            chirality: chir,
            map: map_num,
        },
    ))
}

fn parse_bracket_atom(content: &str) -> Result<Atom, SmilesError> {
    all_consuming(bracket_body)(content)
        .map(|(_, atom)| atom)
        .map_err(|_| SmilesError::BadBracketAtom(content.to_string()))
}

// --- SMILES body ----------------------------------------------------------

/// Parses a SMILES string into a [`MoleculeGraph`].
///
/// Atom maps, charges, isotopes and chirality markers are preserved on the
/// atoms; directional bond markers (`/`, `\`) are read as plain single bonds.
/// The `~` unspecified bond is kept as [`Bond::Unspecified`] so callers can
/// split compounds on it.
pub fn parse_smiles(smiles: &str) -> Result<MoleculeGraph, SmilesError> {
    if smiles.is_empty() {
        return Err(SmilesError::Empty);
    }
    let mut graph = MoleculeGraph::new_undirected();
    let mut current_atom: Option<NodeIndex> = None;
    let mut pending_bond: Option<Bond> = None;
    let mut branch_stack: Vec<NodeIndex> = Vec::new();
    let mut ring_map: BTreeMap<u16, (NodeIndex, Option<Bond>)> = BTreeMap::new();

    let chars: Vec<char> = smiles.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => {
                let atom = current_atom.ok_or(SmilesError::BranchNoCurrentAtom(i))?;
                branch_stack.push(atom);
                i += 1;
            }
            ')' => {
                current_atom = Some(branch_stack.pop().ok_or(SmilesError::BranchEndNoStart(i))?);
                i += 1;
            }
            '-' | '/' | '\\' => {
                pending_bond = Some(Bond::Single);
                i += 1;
            }
            '=' => {
                pending_bond = Some(Bond::Double);
                i += 1;
            }
            '#' => {
                pending_bond = Some(Bond::Triple);
                i += 1;
            }
            ':' => {
                pending_bond = Some(Bond::Aromatic);
                i += 1;
            }
            '~' => {
                pending_bond = Some(Bond::Unspecified);
                i += 1;
            }
            '.' => {
                // Disconnected fragment: restart with no current atom.
                current_atom = None;
                pending_bond = None;
                branch_stack.clear();
                i += 1;
            }
            '%' => {
                if i + 2 >= chars.len() {
                    return Err(SmilesError::IncompleteRingClosure(i));
                }
                let digits: String = chars[i + 1..i + 3].iter().collect();
                let ring_number: u16 = digits
                    .parse()
                    .map_err(|_| SmilesError::IncompleteRingClosure(i))?;
                close_or_open_ring(
                    &mut graph,
                    &mut ring_map,
                    ring_number,
                    current_atom.ok_or(SmilesError::RingClosureNoCurrentAtom(i))?,
                    pending_bond.take(),
                );
                i += 3;
            }
            '0'..='9' => {
                let ring_number = c.to_digit(10).unwrap_or(0) as u16;
                close_or_open_ring(
                    &mut graph,
                    &mut ring_map,
                    ring_number,
                    current_atom.ok_or(SmilesError::RingClosureNoCurrentAtom(i))?,
                    pending_bond.take(),
                );
                i += 1;
            }
            '[' => {
                let end_relative = chars[i..]
                    .iter()
                    .position(|&x| x == ']')
                    .ok_or(SmilesError::UnclosedBracket(i))?;
                let end = i + end_relative;
                let content: String = chars[i + 1..end].iter().collect();
                let atom = parse_bracket_atom(&content)?;
                attach_atom(&mut graph, &mut current_atom, &mut pending_bond, atom);
                i = end + 1;
            }
            '@' => {
                // Stray chirality marker outside a bracket; skip like the
                // directional markers.
                i += 1;
            }
            _ => {
                let (atom, advance) = parse_bare_atom(&chars, i)?;
                attach_atom(&mut graph, &mut current_atom, &mut pending_bond, atom);
                i += advance;
            }
        }
    }

    if !branch_stack.is_empty() {
        return Err(SmilesError::UnclosedBranch(branch_stack.len()));
    }
    if let Some((&ring, _)) = ring_map.iter().next() {
        return Err(SmilesError::UnclosedRingBond(ring));
    }
    if graph.node_count() == 0 {
        return Err(SmilesError::Empty);
    }
    Ok(graph)
}

/// Bare (unbracketed) atom: the organic subset, `Cl`/`Br` two-letter forms,
/// aromatic lowercase atoms, or `*`.
fn parse_bare_atom(chars: &[char], i: usize) -> Result<(Atom, usize), SmilesError> {
    let c = chars[i];
    if c == '*' {
        return Ok((Atom::new(0), 1));
    }
    if c.is_ascii_uppercase() {
        // The only bare two-letter symbols SMILES allows.
        if i + 1 < chars.len() {
            let candidate: String = [c, chars[i + 1]].iter().collect();
            if candidate == "Cl" || candidate == "Br" {
                let element = element_number(&candidate)
                    .ok_or_else(|| SmilesError::UnknownElement(candidate.clone(), i))?;
                return Ok((Atom::new(element), 2));
            }
        }
        let symbol = c.to_string();
        let element = element_number(&symbol)
            .ok_or(SmilesError::UnknownElement(symbol, i))?;
        return Ok((Atom::new(element), 1));
    }
    if "bcnops".contains(c) {
        let symbol = c.to_ascii_uppercase().to_string();
        let element = element_number(&symbol)
            .ok_or(SmilesError::UnknownElement(symbol, i))?;
        let mut atom = Atom::new(element);
        atom.aromatic = true;
        return Ok((atom, 1));
    }
    Err(SmilesError::UnexpectedChar(c, i))
}

fn attach_atom(
    graph: &mut MoleculeGraph,
    current_atom: &mut Option<NodeIndex>,
    pending_bond: &mut Option<Bond>,
    atom: Atom,
) {
    let new_atom = graph.add_node(atom);
    if let Some(prev) = *current_atom {
        let bond = resolve_bond(pending_bond.take(), graph, prev, new_atom);
        graph.add_edge(prev, new_atom, bond);
    } else {
        *pending_bond = None;
    }
    *current_atom = Some(new_atom);
}

/// An unannotated bond between two aromatic atoms is aromatic; otherwise
/// single. Explicit markers always win (so biphenyl's `-` stays single).
fn resolve_bond(
    pending: Option<Bond>,
    graph: &MoleculeGraph,
    a: NodeIndex,
    b: NodeIndex,
) -> Bond {
    match pending {
        Some(bond) => bond,
        None => {
            if graph[a].aromatic && graph[b].aromatic {
                Bond::Aromatic
            } else {
                Bond::Single
            }
        }
    }
}

fn close_or_open_ring(
    graph: &mut MoleculeGraph,
    ring_map: &mut BTreeMap<u16, (NodeIndex, Option<Bond>)>,
    ring_number: u16,
    current: NodeIndex,
    pending: Option<Bond>,
) {
    if let Some((start_atom, open_bond)) = ring_map.remove(&ring_number) {
        let bond = resolve_bond(pending.or(open_bond), graph, start_atom, current);
        graph.add_edge(current, start_atom, bond);
    } else {
        ring_map.insert(ring_number, (current, pending));
    }
}
