//! Tab-separated process files, one reaction template per row:
//!
//! ```text
//! process	reaction	reference	rate_equation	parameters	conserved_for
//! # comment
//! growth	[1/Y_H]S_S + [?]S_O + [?]S_NH -> X_BH	X_BH	mu_H*S_S/(K_S + S_S)*X_BH	Y_H, mu_H, K_S	COD, N
//! ```
//!
//! Parameters and conserved quantities are comma separated. Empty cells mean
//! "no reference", "no rate law", "infer the parameters" and "use the collection
//! default" respectively.
use crate::Components::component::ConservedQuantity;
use crate::Kinetics::kinetics_errors::KineticsError;
use crate::Kinetics::reaction_template::ReactionTemplate;
use log::info;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const HEADER: [&str; 6] = [
    "process",
    "reaction",
    "reference",
    "rate_equation",
    "parameters",
    "conserved_for",
];

fn format_error(line: usize, reason: String) -> KineticsError {
    KineticsError::TemplateFormat { line, reason }
}

fn parse_row(line: usize, row: &str) -> Result<ReactionTemplate, KineticsError> {
    let mut cells: Vec<&str> = row.split('\t').map(str::trim).collect();
    if cells.len() < 2 || cells.len() > HEADER.len() {
        return Err(format_error(
            line,
            format!("expected 2 to {} tab-separated columns, found {}", HEADER.len(), cells.len()),
        ));
    }
    cells.resize(HEADER.len(), "");
    let (id, reaction, reference, rate, parameters, conserved) =
        (cells[0], cells[1], cells[2], cells[3], cells[4], cells[5]);
    if id.is_empty() {
        return Err(format_error(line, "empty process name".to_string()));
    }
    let mut template =
        ReactionTemplate::new(id, reaction).map_err(|e| format_error(line, e.to_string()))?;
    if !reference.is_empty() {
        template = template.with_reference(reference);
    }
    if !rate.is_empty() {
        template = template
            .with_rate(rate)
            .map_err(|e| format_error(line, e.to_string()))?;
    }
    if !parameters.is_empty() {
        let names: Vec<&str> = parameters
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        template = template.with_parameters(&names);
    }
    if !conserved.is_empty() {
        let quantities =
            ConservedQuantity::parse_list(conserved).map_err(|e| format_error(line, e.to_string()))?;
        template = template.with_conserved_for(&quantities);
    }
    Ok(template)
}

/// Parses the text of a process file. Line numbers in errors are 1-based.
pub fn parse_templates(text: &str) -> Result<Vec<ReactionTemplate>, KineticsError> {
    let mut templates = Vec::new();
    let mut seen = HashSet::new();
    let mut header_found = false;
    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let row = raw.trim_end_matches('\r');
        if row.trim().is_empty() || row.trim_start().starts_with('#') {
            continue;
        }
        if !header_found {
            let columns: Vec<&str> = row.split('\t').map(str::trim).collect();
            if columns != HEADER {
                return Err(format_error(
                    line,
                    format!("header must be '{}', found '{}'", HEADER.join("\\t"), row),
                ));
            }
            header_found = true;
            continue;
        }
        let template = parse_row(line, row)?;
        if !seen.insert(template.id.clone()) {
            return Err(KineticsError::DuplicateProcess(template.id));
        }
        templates.push(template);
    }
    if !header_found {
        return Err(format_error(0, "missing header line".to_string()));
    }
    Ok(templates)
}

/// Renders templates in the file format; parsing the result gives back the same
/// templates.
pub fn render_templates(templates: &[ReactionTemplate]) -> String {
    let mut out = HEADER.join("\t");
    out.push('\n');
    for t in templates {
        let conserved = t
            .conserved_for
            .as_ref()
            .map(|qs| qs.iter().map(|q| q.to_string()).collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        let cells = [
            t.id.clone(),
            t.reaction_string(),
            t.reference.clone().unwrap_or_default(),
            t.rate_equation.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            t.parameters.join(", "),
            conserved,
        ];
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

pub fn load_templates(path: &Path) -> Result<Vec<ReactionTemplate>, KineticsError> {
    let text = fs::read_to_string(path)?;
    let templates = parse_templates(&text)?;
    info!("loaded {} templates from {}", templates.len(), path.display());
    Ok(templates)
}

pub fn save_templates(path: &Path, templates: &[ReactionTemplate]) -> Result<(), KineticsError> {
    fs::write(path, render_templates(templates))?;
    info!("saved {} templates to {}", templates.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kinetics::processes::ProcessCompiler;
    use crate::Models::asm1::{
        ASM1_CONSERVED, Asm1Options, asm1, asm1_components, asm1_parameters, build_asm1_templates,
    };
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    const FILE: &str = "process\treaction\treference\trate_equation\tparameters\tconserved_for
# heterotrophs
growth\t[1/Y_H]S_S + [?]S_O + [?]S_NH -> X_BH\tX_BH\tmu_H*S_S/(K_S + S_S)*X_BH\tY_H, mu_H, K_S\tCOD, N

decay\tX_BH -> [?]X_S\tX_BH\tb_H*X_BH
";

    #[test]
    fn test_parse_templates() {
        let templates = parse_templates(FILE).unwrap();
        assert_eq!(templates.len(), 2);
        let growth = &templates[0];
        assert_eq!(growth.id, "growth");
        assert_eq!(growth.reference.as_deref(), Some("X_BH"));
        assert_eq!(growth.parameters, vec!["Y_H", "mu_H", "K_S"]);
        assert_eq!(
            growth.conserved_for,
            Some(vec![ConservedQuantity::COD, ConservedQuantity::N])
        );
        assert_eq!(growth.unknowns(), vec!["S_O", "S_NH"]);
        let decay = &templates[1];
        assert!(decay.parameters.is_empty());
        assert!(decay.conserved_for.is_none());
        assert!(decay.rate_equation.is_some());
    }

    #[test]
    fn test_format_errors_carry_line() {
        let missing_header = "growth\tS_S -> X_BH\n";
        assert!(matches!(
            parse_templates(missing_header),
            Err(KineticsError::TemplateFormat { line: 1, .. })
        ));
        let bad_reaction = format!("{}\n# c\nbroken\tS_S -> -> X_BH\n", HEADER.join("\t"));
        assert!(matches!(
            parse_templates(&bad_reaction),
            Err(KineticsError::TemplateFormat { line: 3, .. })
        ));
        let bad_quantity = format!("{}\ng\tS_S -> X_BH\t\t\t\tCOD, Zn\n", HEADER.join("\t"));
        assert!(matches!(
            parse_templates(&bad_quantity),
            Err(KineticsError::TemplateFormat { line: 2, .. })
        ));
        let duplicate = format!("{}\ng\tS_S -> X_BH\ng\tX_BH -> X_S\n", HEADER.join("\t"));
        assert!(matches!(
            parse_templates(&duplicate),
            Err(KineticsError::DuplicateProcess(_))
        ));
        assert!(parse_templates("# only comments\n").is_err());
    }

    #[test]
    fn test_render_parses_back() {
        let templates = parse_templates(FILE).unwrap();
        let again = parse_templates(&render_templates(&templates)).unwrap();
        assert_eq!(templates.len(), again.len());
        for (a, b) in templates.iter().zip(again.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.reaction_string(), b.reaction_string());
            assert_eq!(a.reference, b.reference);
            assert_eq!(a.parameters, b.parameters);
            assert_eq!(a.conserved_for, b.conserved_for);
            assert_eq!(
                a.rate_equation.as_ref().map(|e| e.to_string()),
                b.rate_equation.as_ref().map(|e| e.to_string())
            );
        }
    }

    #[test]
    fn test_asm1_file_round_trip_compiles_to_same_matrix() {
        let registry = Arc::new(asm1_components(&Asm1Options::default()).unwrap());
        let reference = asm1(&registry).unwrap();

        let file = NamedTempFile::new().unwrap();
        save_templates(file.path(), &build_asm1_templates().unwrap()).unwrap();
        let loaded = load_templates(file.path()).unwrap();
        let compiled = ProcessCompiler::new(Arc::clone(&registry))
            .parameters(&asm1_parameters())
            .conserved_for(&ASM1_CONSERVED)
            .add_templates(loaded)
            .compile()
            .unwrap();

        assert_eq!(compiled.ids(), reference.ids());
        let (a, b) = (compiled.stoichiometry(), reference.stoichiometry());
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
        let c = vec![10.0; registry.len()];
        assert_relative_eq!(
            compiled.rates(&c).unwrap(),
            reference.rates(&c).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_collection_templates_round_trip() {
        let registry = Arc::new(asm1_components(&Asm1Options::default()).unwrap());
        let reference = asm1(&registry).unwrap();
        let text = render_templates(&reference.templates());
        let recompiled = ProcessCompiler::new(Arc::clone(&registry))
            .parameters(&asm1_parameters())
            .conserved_for(&ASM1_CONSERVED)
            .add_templates(parse_templates(&text).unwrap())
            .compile()
            .unwrap();
        for (x, y) in recompiled
            .stoichiometry()
            .iter()
            .zip(reference.stoichiometry().iter())
        {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
    }
}
