mod extract;
mod filter;
mod scan;

pub use extract::{extract_from_reaction, ExtractError, Extraction};
pub use filter::filter_by_frequency;
pub use scan::{extract_templates, ScanOutput};

use crate::Table;
use std::collections::HashMap;
use std::fmt;

/// Knobs of the template extractor. `use_symbol` is forced on under `retro`
/// because retrosynthesis templates must keep element symbols to be
/// applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorSettings {
    pub verbose: bool,
    pub use_stereo: bool,
    pub use_symbol: bool,
    /// Maximum number of unmapped product atoms before the record is
    /// abandoned.
    pub max_unmap: usize,
    pub retro: bool,
    pub remote: bool,
    /// Minimum atoms each edit site is grown to cover.
    pub least_atom_num: usize,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        ExtractorSettings {
            verbose: false,
            use_stereo: false,
            use_symbol: false,
            max_unmap: 5,
            retro: false,
            remote: true,
            least_atom_num: 2,
        }
    }
}

impl ExtractorSettings {
    pub fn resolved(mut self) -> Self {
        if self.retro {
            self.use_symbol = true;
        }
        self
    }
}

/// Kind of change a template site encodes: atom-only edit, bond formed,
/// bond order changed, bond broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EditType {
    A,
    B,
    C,
    R,
}

impl EditType {
    pub const ALL: [EditType; 4] = [EditType::A, EditType::B, EditType::C, EditType::R];

    pub fn as_str(&self) -> &'static str {
        match self {
            EditType::A => "A",
            EditType::B => "B",
            EditType::C => "C",
            EditType::R => "R",
        }
    }

    /// Whether this edit is located on an atom rather than a bond.
    pub fn is_atom_edit(&self) -> bool {
        matches!(self, EditType::A)
    }
}

impl fmt::Display for EditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An edit location in template-local atom numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Site {
    Atom(u32),
    Bond(u32, u32),
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Atom(a) => write!(f, "{a}"),
            Site::Bond(a, b) => write!(f, "({a}, {b})"),
        }
    }
}

pub fn render_sites(sites: &[Site]) -> String {
    let inner: Vec<String> = sites.iter().map(Site::to_string).collect();
    format!("[{}]", inner.join(", "))
}

/// Offset-encode a property delta as one digit: no change is `'4'`, and the
/// delta saturates at the digit range on either side.
pub fn change_digit(delta: i32) -> char {
    let clamped = (delta + 4).clamp(0, 9) as u8;
    (b'0' + clamped) as char
}

/// Chirality transition code: unchanged, gained, inverted, lost.
pub fn chiral_digit(before: bool, after: bool, inverted: bool) -> char {
    match (before, after) {
        _ if inverted => '2',
        (false, true) => '1',
        (true, false) => '3',
        _ => '0',
    }
}

/// A template label: reaction SMARTS plus per-atom change code strings.
/// Serialised as 3 underscore-joined fields, or 4 when a chirality code is
/// carried.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateLabel {
    pub smarts: String,
    pub h_code: String,
    pub charge_code: String,
    pub chiral_code: Option<String>,
}

impl fmt::Display for TemplateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.smarts, self.h_code, self.charge_code)?;
        match &self.chiral_code {
            Some(code) if !code.is_empty() => write!(f, "_{code}"),
            _ => Ok(()),
        }
    }
}

/// One registry row: a template and the site/change details captured from
/// its first occurrence, plus how often it was seen overall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRecord {
    pub template: String,
    pub edit_sites: String,
    pub change_h: String,
    pub change_c: String,
    pub change_s: String,
    pub frequency: u64,
}

/// Insertion-ordered template registry. The first reaction to produce a
/// label defines its sites and change codes; later occurrences only bump the
/// frequency.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    records: Vec<TemplateRecord>,
    index: HashMap<String, usize>,
}

impl TemplateRegistry {
    /// Record one sighting of a template. `details` is only evaluated for a
    /// label seen for the first time. Returns the template's registry index.
    pub fn observe<F>(&mut self, template: &str, details: F) -> usize
    where
        F: FnOnce() -> (String, String, String, String),
    {
        if let Some(&i) = self.index.get(template) {
            self.records[i].frequency += 1;
            return i;
        }
        let (edit_sites, change_h, change_c, change_s) = details();
        let i = self.records.len();
        self.records.push(TemplateRecord {
            template: template.to_string(),
            edit_sites,
            change_h,
            change_c,
            change_s,
            frequency: 1,
        });
        self.index.insert(template.to_string(), i);
        i
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateRecord> {
        self.records.iter()
    }

    pub fn get(&self, template: &str) -> Option<&TemplateRecord> {
        self.index.get(template).map(|&i| &self.records[i])
    }

    pub fn to_table(&self) -> Table {
        Table {
            headers: vec![
                "Template".to_string(),
                "edit_site".to_string(),
                "change_H".to_string(),
                "change_C".to_string(),
                "change_S".to_string(),
                "Frequency".to_string(),
            ],
            rows: self
                .records
                .iter()
                .map(|r| {
                    vec![
                        r.template.clone(),
                        r.edit_sites.clone(),
                        r.change_h.clone(),
                        r.change_c.clone(),
                        r.change_s.clone(),
                        r.frequency.to_string(),
                    ]
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retro_forces_symbols() {
        let settings = ExtractorSettings {
            retro: true,
            ..Default::default()
        };
        assert!(!settings.use_symbol);
        assert!(settings.resolved().use_symbol);
    }

    #[test]
    fn label_joins_three_or_four_fields() {
        let mut label = TemplateLabel {
            smarts: "[#6:1]-[#8:2]>>[#6:1]".to_string(),
            h_code: "44".to_string(),
            charge_code: "44".to_string(),
            chiral_code: None,
        };
        assert_eq!(label.to_string(), "[#6:1]-[#8:2]>>[#6:1]_44_44");
        label.chiral_code = Some("00".to_string());
        assert_eq!(label.to_string(), "[#6:1]-[#8:2]>>[#6:1]_44_44_00");
    }

    #[test]
    fn change_digits_saturate() {
        assert_eq!(change_digit(0), '4');
        assert_eq!(change_digit(1), '5');
        assert_eq!(change_digit(-2), '2');
        assert_eq!(change_digit(40), '9');
        assert_eq!(change_digit(-40), '0');
    }

    #[test]
    fn registry_is_first_occurrence_wins() {
        let mut registry = TemplateRegistry::default();
        let details = |s: &str| {
            let s = s.to_string();
            move || (s, "4".to_string(), "4".to_string(), String::new())
        };
        registry.observe("t1", details("[1]"));
        registry.observe("t1", details("[999]"));
        registry.observe("t2", details("[2]"));
        assert_eq!(registry.len(), 2);
        let first = registry.get("t1").expect("registered");
        assert_eq!(first.edit_sites, "[1]");
        assert_eq!(first.frequency, 2);
        let order: Vec<&str> = registry.iter().map(|r| r.template.as_str()).collect();
        assert_eq!(order, vec!["t1", "t2"]);
    }

    #[test]
    fn sites_render_like_tuples() {
        assert_eq!(
            render_sites(&[Site::Bond(1, 2), Site::Atom(3)]),
            "[(1, 2), 3]"
        );
    }
}
