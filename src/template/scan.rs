use super::{
    extract_from_reaction, render_sites, EditType, Extraction, ExtractorSettings, Site,
    TemplateRegistry,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Label used for records whose template could not be extracted.
pub const NO_TEMPLATE: &str = "NaN";

#[derive(Debug)]
pub struct ScanOutput {
    /// One label per input record, in input order. Failed records carry
    /// [`NO_TEMPLATE`].
    pub labels: Vec<String>,
    pub registry: TemplateRegistry,
}

/// Scan a sequence of merged reaction strings and build the template
/// registry.
///
/// The scan is sequential so registry order is reproducible. A record that
/// lacks a `>>` separator or defeats the extractor is labelled
/// [`NO_TEMPLATE`] and the scan moves on; only I/O-level problems abort a
/// run, and those happen before this function is reached.
pub fn extract_templates<'a, I>(rxns: I, settings: &ExtractorSettings) -> ScanOutput
where
    I: IntoIterator<Item = &'a str>,
{
    let settings = settings.resolved();
    let mut labels: Vec<String> = Vec::new();
    let mut registry = TemplateRegistry::default();
    let mut atom_templates: HashMap<String, u64> = HashMap::new();
    let mut bond_templates: HashMap<String, u64> = HashMap::new();

    for (i, rxn) in rxns.into_iter().enumerate() {
        if i > 0 && i % 10_000 == 0 {
            info!("processed {i} records, {} templates so far", registry.len());
        }
        let label = match rxn.split_once(">>") {
            Some((reactants, product)) => {
                match extract_from_reaction(reactants, product, &settings) {
                    Ok(extraction) => {
                        let label = extraction.label.to_string();
                        count_edit_kinds(
                            &extraction,
                            &label,
                            &settings,
                            &mut atom_templates,
                            &mut bond_templates,
                        );
                        registry.observe(&label, || first_occurrence_details(&extraction));
                        label
                    }
                    Err(err) => {
                        if settings.verbose {
                            debug!("record {i}: {err}");
                        }
                        NO_TEMPLATE.to_string()
                    }
                }
            }
            None => {
                if settings.verbose {
                    debug!("record {i}: not a merged reaction string");
                }
                NO_TEMPLATE.to_string()
            }
        };
        labels.push(label);
    }

    info!(
        "{} records scanned, {} templates ({} atom-centred, {} bond-centred)",
        labels.len(),
        registry.len(),
        atom_templates.len(),
        bond_templates.len()
    );
    ScanOutput { labels, registry }
}

/// Diagnostic split of templates by where their edits live. Retro templates
/// are counted whole (broken bonds and atom edits are atom-centred sites for
/// a retro model); forward templates are counted per edit type under a
/// suffixed key.
fn count_edit_kinds(
    extraction: &Extraction,
    label: &str,
    settings: &ExtractorSettings,
    atom_templates: &mut HashMap<String, u64>,
    bond_templates: &mut HashMap<String, u64>,
) {
    for (&edit_type, sites) in &extraction.edits {
        if sites.is_empty() {
            continue;
        }
        if settings.retro {
            let counter = match edit_type {
                EditType::A | EditType::R => &mut *atom_templates,
                EditType::B | EditType::C => &mut *bond_templates,
            };
            *counter.entry(label.to_string()).or_insert(0) += 1;
        } else {
            let key = format!("{label}_{edit_type}");
            let counter = if edit_type.is_atom_edit() {
                &mut *atom_templates
            } else {
                &mut *bond_templates
            };
            *counter.entry(key).or_insert(0) += 1;
        }
    }
}

fn first_occurrence_details(extraction: &Extraction) -> (String, String, String, String) {
    let mut sites: Vec<Site> = Vec::new();
    for edit_type in EditType::ALL {
        if let Some(s) = extraction.edits.get(&edit_type) {
            sites.extend(s.iter().copied());
        }
    }
    (
        render_sites(&sites),
        extraction.label.h_code.clone(),
        extraction.label.charge_code.clone(),
        extraction.label.chiral_code.clone().unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESTER: &str = "[C:1](=[O:2])[OH:3].[CH3:4][OH:5]>>[C:1](=[O:2])[O:5][CH3:4]";
    const DEPROTONATION: &str = "[CH3:1][OH:2]>>[CH3:1][O-:2]";

    #[test]
    fn labels_line_up_with_input_order() {
        let rxns = [ESTER, "not a reaction", DEPROTONATION, ESTER];
        let out = extract_templates(rxns, &ExtractorSettings::default());
        assert_eq!(out.labels.len(), 4);
        assert_eq!(out.labels[1], NO_TEMPLATE);
        assert_eq!(out.labels[0], out.labels[3]);
        assert_ne!(out.labels[0], out.labels[2]);
    }

    #[test]
    fn frequencies_sum_to_successful_records() {
        let rxns = [ESTER, ESTER, DEPROTONATION, "garbage"];
        let out = extract_templates(rxns, &ExtractorSettings::default());
        let total: u64 = out.registry.iter().map(|r| r.frequency).sum();
        let successes = out.labels.iter().filter(|l| *l != NO_TEMPLATE).count() as u64;
        assert_eq!(total, successes);
        assert_eq!(out.registry.len(), 2);
    }

    #[test]
    fn unparseable_reactions_do_not_stop_the_scan() {
        let rxns = ["C(>>CC", ESTER];
        let out = extract_templates(rxns, &ExtractorSettings::default());
        assert_eq!(out.labels[0], NO_TEMPLATE);
        assert_ne!(out.labels[1], NO_TEMPLATE);
    }

    #[test]
    fn unchanged_reactions_get_no_template() {
        let out = extract_templates(
            ["[CH3:1][OH:2]>>[CH3:1][OH:2]"],
            &ExtractorSettings::default(),
        );
        assert_eq!(out.labels[0], NO_TEMPLATE);
        assert!(out.registry.is_empty());
    }

    #[test]
    fn registry_table_has_the_expected_columns() {
        let out = extract_templates([ESTER], &ExtractorSettings::default());
        let table = out.registry.to_table();
        assert_eq!(
            table.headers,
            vec![
                "Template",
                "edit_site",
                "change_H",
                "change_C",
                "change_S",
                "Frequency"
            ]
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][5], "1");
        // Formed bond then broken bond, in edit-type order.
        assert_eq!(table.rows[0][1], "[(1, 3), (1, 2)]");
    }

    #[test]
    fn retro_and_forward_labels_differ() {
        let forward = extract_templates([ESTER], &ExtractorSettings::default());
        let retro = extract_templates(
            [ESTER],
            &ExtractorSettings {
                retro: true,
                ..Default::default()
            },
        );
        assert_ne!(forward.labels[0], retro.labels[0]);
    }
}
