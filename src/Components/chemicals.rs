/// Built-in chemical reference table used by `Component::from_chemical`.
/// A reference resolves by common name (case-insensitive), synonym or formula.
pub struct Chemical {
    pub name: &'static str,
    pub formula: &'static str,
    pub synonyms: &'static [&'static str],
}

const CHEMICALS: &[Chemical] = &[
    Chemical {
        name: "water",
        formula: "H2O",
        synonyms: &[],
    },
    Chemical {
        name: "hydrogen",
        formula: "H2",
        synonyms: &["dihydrogen"],
    },
    Chemical {
        name: "methane",
        formula: "CH4",
        synonyms: &[],
    },
    Chemical {
        name: "methanol",
        formula: "CH4O",
        synonyms: &["CH3OH", "methyl alcohol"],
    },
    Chemical {
        name: "ethanol",
        formula: "C2H6O",
        synonyms: &["C2H5OH"],
    },
    Chemical {
        name: "acetate",
        formula: "C2H3O2-",
        synonyms: &["CH3COO-"],
    },
    Chemical {
        name: "propionate",
        formula: "C3H5O2-",
        synonyms: &[],
    },
    Chemical {
        name: "butyrate",
        formula: "C4H7O2-",
        synonyms: &[],
    },
    Chemical {
        name: "glucose",
        formula: "C6H12O6",
        synonyms: &["dextrose"],
    },
    Chemical {
        name: "polyhydroxybutyrate",
        formula: "C4H6O2",
        synonyms: &["PHB", "PHA"],
    },
    Chemical {
        name: "ammonium",
        formula: "NH4+",
        synonyms: &[],
    },
    Chemical {
        name: "ammonia",
        formula: "NH3",
        synonyms: &[],
    },
    Chemical {
        name: "nitrite",
        formula: "NO2-",
        synonyms: &[],
    },
    Chemical {
        name: "nitrate",
        formula: "NO3-",
        synonyms: &[],
    },
    Chemical {
        name: "nitric oxide",
        formula: "NO",
        synonyms: &["nitrogen monoxide"],
    },
    Chemical {
        name: "nitrous oxide",
        formula: "N2O",
        synonyms: &["dinitrogen oxide"],
    },
    Chemical {
        name: "nitrogen",
        formula: "N2",
        synonyms: &["dinitrogen"],
    },
    Chemical {
        name: "oxygen",
        formula: "O2",
        synonyms: &["dioxygen"],
    },
    Chemical {
        name: "phosphate",
        formula: "PO4-3",
        synonyms: &["orthophosphate"],
    },
    Chemical {
        name: "hydrogen phosphate",
        formula: "HPO4-2",
        synonyms: &[],
    },
    Chemical {
        name: "carbonate",
        formula: "CO3-2",
        synonyms: &[],
    },
    Chemical {
        name: "bicarbonate",
        formula: "HCO3-",
        synonyms: &["hydrogen carbonate"],
    },
    Chemical {
        name: "carbon dioxide",
        formula: "CO2",
        synonyms: &[],
    },
    Chemical {
        name: "sulfate",
        formula: "SO4-2",
        synonyms: &["sulphate"],
    },
    Chemical {
        name: "hydrogen sulfide",
        formula: "H2S",
        synonyms: &[],
    },
    Chemical {
        name: "potassium",
        formula: "K+",
        synonyms: &[],
    },
    Chemical {
        name: "sodium",
        formula: "Na+",
        synonyms: &[],
    },
    Chemical {
        name: "calcium",
        formula: "Ca+2",
        synonyms: &[],
    },
    Chemical {
        name: "magnesium",
        formula: "Mg+2",
        synonyms: &[],
    },
    Chemical {
        name: "chloride",
        formula: "Cl-",
        synonyms: &[],
    },
    Chemical {
        name: "struvite",
        formula: "MgNH4PO4",
        synonyms: &[],
    },
];

pub fn resolve_chemical(reference: &str) -> Option<&'static Chemical> {
    let key = reference.trim();
    let lowered = key.to_lowercase();
    CHEMICALS.iter().find(|c| {
        c.name == lowered || c.formula == key || c.synonyms.iter().any(|s| *s == key || s.to_lowercase() == lowered)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Components::molmass::Formula;

    #[test]
    fn resolves_names_synonyms_and_formulas() {
        assert_eq!(resolve_chemical("Methanol").unwrap().formula, "CH4O");
        assert_eq!(resolve_chemical("CH3OH").unwrap().name, "methanol");
        assert_eq!(resolve_chemical("NO3-").unwrap().name, "nitrate");
        assert!(resolve_chemical("kryptonite").is_none());
    }

    #[test]
    fn every_formula_parses() {
        for c in CHEMICALS {
            assert!(Formula::parse(c.formula).is_ok(), "{}", c.formula);
        }
    }
}
