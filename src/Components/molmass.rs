/// Atomic composition, charge and molar mass of chemical formulas.
///
/// Formulas may carry fractional counts (`K0.33Mg0.33PO3`), bracketed groups
/// (`Ca3(PO4)2`) and a trailing charge written sign first (`NO3-`, `PO4-3`, `Ca+2`).
use crate::Components::component_errors::ComponentError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Element data: atomic mass and the oxidation state the element takes in the
/// oxygen-demand reference products (CO2, H2O, NH4+, PO4-3, SO4-2, free ions)
pub struct Element {
    pub name: &'static str,
    pub atomic_mass: f64,
    pub valence: i32,
}

const ELEMENTS: &[Element] = &[
    Element {
        name: "H",
        atomic_mass: 1.008,
        valence: 1,
    },
    Element {
        name: "C",
        atomic_mass: 12.011,
        valence: 4,
    },
    Element {
        name: "N",
        atomic_mass: 14.007,
        valence: -3,
    },
    Element {
        name: "O",
        atomic_mass: 15.999,
        valence: -2,
    },
    Element {
        name: "F",
        atomic_mass: 18.998,
        valence: -1,
    },
    Element {
        name: "Na",
        atomic_mass: 22.99,
        valence: 1,
    },
    Element {
        name: "Mg",
        atomic_mass: 24.305,
        valence: 2,
    },
    Element {
        name: "Al",
        atomic_mass: 26.982,
        valence: 3,
    },
    Element {
        name: "Si",
        atomic_mass: 28.085,
        valence: 4,
    },
    Element {
        name: "P",
        atomic_mass: 30.974,
        valence: 5,
    },
    Element {
        name: "S",
        atomic_mass: 32.065,
        valence: 6,
    },
    Element {
        name: "Cl",
        atomic_mass: 35.45,
        valence: -1,
    },
    Element {
        name: "K",
        atomic_mass: 39.098,
        valence: 1,
    },
    Element {
        name: "Ca",
        atomic_mass: 40.078,
        valence: 2,
    },
    Element {
        name: "Mn",
        atomic_mass: 54.938,
        valence: 2,
    },
    Element {
        name: "Fe",
        atomic_mass: 55.845,
        valence: 3,
    },
    Element {
        name: "Cu",
        atomic_mass: 63.546,
        valence: 2,
    },
    Element {
        name: "Zn",
        atomic_mass: 65.38,
        valence: 2,
    },
];

pub fn element(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.name == symbol)
}

pub fn atomic_mass(symbol: &str) -> Option<f64> {
    element(symbol).map(|e| e.atomic_mass)
}

/// Parsed chemical formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub formula: String,
    pub composition: BTreeMap<String, f64>,
    pub charge: i32,
}

impl Formula {
    pub fn parse(formula: &str) -> Result<Self, ComponentError> {
        let fail = |reason: &str| ComponentError::FormulaParse {
            formula: formula.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = formula.trim();
        if trimmed.is_empty() {
            return Err(fail("empty formula"));
        }
        let (body, charge) = split_charge(trimmed).ok_or_else(|| fail("malformed charge"))?;
        let chars: Vec<char> = body.chars().collect();
        let mut pos = 0;
        let composition = parse_group(&chars, &mut pos, formula)?;
        if pos != chars.len() {
            return Err(fail("unbalanced parentheses"));
        }
        if composition.is_empty() {
            return Err(fail("no elements found"));
        }
        Ok(Formula {
            formula: trimmed.to_string(),
            composition,
            charge,
        })
    }

    /// number of atoms of `symbol` per formula unit
    pub fn count(&self, symbol: &str) -> f64 {
        self.composition.get(symbol).copied().unwrap_or(0.0)
    }

    /// g/mol
    pub fn molar_mass(&self) -> f64 {
        self.composition
            .iter()
            .map(|(el, n)| atomic_mass(el).unwrap_or(0.0) * n)
            .sum()
    }

    /// mass of `symbol` in one mole of the formula, g
    pub fn element_mass(&self, symbol: &str) -> f64 {
        self.count(symbol) * atomic_mass(symbol).unwrap_or(0.0)
    }

    /// electrons released per formula unit when every element is brought to its reference state
    pub fn electrons_to_reference(&self) -> f64 {
        let balance: f64 = self
            .composition
            .iter()
            .map(|(el, n)| element(el).map(|e| e.valence as f64).unwrap_or(0.0) * n)
            .sum();
        balance - self.charge as f64
    }

    fn has_exactly(&self, atoms: &[(&str, f64)]) -> bool {
        self.composition.len() == atoms.len()
            && atoms
                .iter()
                .all(|(el, n)| (self.count(el) - n).abs() < 1e-12)
    }

    pub fn is_ammonium(&self) -> bool {
        (self.has_exactly(&[("N", 1.0), ("H", 4.0)]) && self.charge == 1)
            || (self.has_exactly(&[("N", 1.0), ("H", 3.0)]) && self.charge == 0)
    }

    pub fn is_nitrite(&self) -> bool {
        self.has_exactly(&[("N", 1.0), ("O", 2.0)]) && self.charge == -1
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.formula)
    }
}

/// splits "PO4-3" into ("PO4", -3); a formula without trailing sign has charge 0
fn split_charge(formula: &str) -> Option<(&str, i32)> {
    let sign_pos = formula.rfind(|c| c == '+' || c == '-');
    let Some(pos) = sign_pos else {
        return Some((formula, 0));
    };
    let digits = &formula[pos + 1..];
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let magnitude: i32 = if digits.is_empty() {
        1
    } else {
        digits.parse().ok()?
    };
    let sign = if formula[pos..].starts_with('+') { 1 } else { -1 };
    Some((&formula[..pos], sign * magnitude))
}

fn parse_number(chars: &[char], pos: &mut usize) -> Option<f64> {
    let start = *pos;
    while *pos < chars.len() && (chars[*pos].is_ascii_digit() || chars[*pos] == '.') {
        *pos += 1;
    }
    if start == *pos {
        return None;
    }
    chars[start..*pos].iter().collect::<String>().parse().ok()
}

fn parse_group(
    chars: &[char],
    pos: &mut usize,
    formula: &str,
) -> Result<BTreeMap<String, f64>, ComponentError> {
    let fail = |reason: String| ComponentError::FormulaParse {
        formula: formula.to_string(),
        reason,
    };
    let mut composition: BTreeMap<String, f64> = BTreeMap::new();
    while *pos < chars.len() {
        let c = chars[*pos];
        if c == '(' {
            *pos += 1;
            let inner = parse_group(chars, pos, formula)?;
            if *pos >= chars.len() || chars[*pos] != ')' {
                return Err(fail("missing closing parenthesis".to_string()));
            }
            *pos += 1;
            let multiplier = parse_number(chars, pos).unwrap_or(1.0);
            for (el, n) in inner {
                *composition.entry(el).or_insert(0.0) += n * multiplier;
            }
        } else if c == ')' {
            break;
        } else if c.is_ascii_uppercase() {
            let mut symbol = c.to_string();
            *pos += 1;
            if *pos < chars.len() && chars[*pos].is_ascii_lowercase() {
                symbol.push(chars[*pos]);
                *pos += 1;
            }
            if element(&symbol).is_none() {
                return Err(fail(format!("unknown element '{}'", symbol)));
            }
            let n = parse_number(chars, pos).unwrap_or(1.0);
            *composition.entry(symbol).or_insert(0.0) += n;
        } else {
            return Err(fail(format!("unexpected character '{}'", c)));
        }
    }
    Ok(composition)
}

/// molar mass and composition of a formula in one call
pub fn calculate_molar_mass(formula: &str) -> Result<(f64, BTreeMap<String, f64>), ComponentError> {
    let parsed = Formula::parse(formula)?;
    Ok((parsed.molar_mass(), parsed.composition))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_molar_mass() {
        let (m, composition) = calculate_molar_mass("C6H8O6").unwrap();
        assert!((m - 176.124).abs() < 1e-2);
        assert_eq!(composition["C"], 6.0);
        let (m, _) = calculate_molar_mass("H2O").unwrap();
        assert!((m - 18.015).abs() < 1e-2);
    }

    #[test]
    fn test_charge_and_groups() {
        let nitrate = Formula::parse("NO3-").unwrap();
        assert_eq!(nitrate.charge, -1);
        assert_eq!(nitrate.count("O"), 3.0);
        let phosphate = Formula::parse("PO4-3").unwrap();
        assert_eq!(phosphate.charge, -3);
        let calcium = Formula::parse("Ca+2").unwrap();
        assert_eq!(calcium.charge, 2);
        let apatite = Formula::parse("Ca3(PO4)2").unwrap();
        assert_eq!(apatite.count("O"), 8.0);
        assert_eq!(apatite.count("Ca"), 3.0);
        let pp = Formula::parse("K0.33Mg0.33PO3").unwrap();
        assert!((pp.count("K") - 0.33).abs() < 1e-12);
    }

    #[test]
    fn test_electrons_to_reference() {
        // oxidised or reference species carry no electrons
        for f in ["CO2", "H2O", "NH4+", "PO4-3", "HCO3-", "CO3-2", "SO4-2"] {
            let parsed = Formula::parse(f).unwrap();
            assert!(parsed.electrons_to_reference().abs() < 1e-12, "{}", f);
        }
        assert_eq!(Formula::parse("CH4").unwrap().electrons_to_reference(), 8.0);
        assert_eq!(Formula::parse("NO3-").unwrap().electrons_to_reference(), -8.0);
        assert_eq!(Formula::parse("O2").unwrap().electrons_to_reference(), -4.0);
    }

    #[test]
    fn test_bad_formulas() {
        assert!(Formula::parse("Xy2").is_err());
        assert!(Formula::parse("Ca3(PO4").is_err());
        assert!(Formula::parse("").is_err());
        assert!(Formula::parse("NO3-a").is_err());
    }

    #[test]
    fn test_ammonium_and_nitrite() {
        assert!(Formula::parse("NH4+").unwrap().is_ammonium());
        assert!(Formula::parse("NH3").unwrap().is_ammonium());
        assert!(!Formula::parse("NO3-").unwrap().is_ammonium());
        assert!(Formula::parse("NO2-").unwrap().is_nitrite());
    }
}
