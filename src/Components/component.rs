//! # Component
//!
//! ## Aim
//! A `Component` is one modelled species of a waste stream: a chemical with a formula
//! (nitrate, acetate, methane) or a lumped pool without one (biomass, slowly
//! biodegradable substrate). Its concentration is expressed on a *measured-as* basis
//! (g COD, g N, g P or the component's own mass) and it carries the conversion factors
//! used by every mass balance of the crate.
//!
//! ## Main Data Structures
//! - `Component`: the property record.
//! - `ParticleSize`, `Degradability`, `MeasuredAs`: classification enums.
//! - `ConservedQuantity`: the balances a reaction can be required to close.
//!
//! ## Conversion factors
//! | factor      | meaning                                         |
//! |-------------|-------------------------------------------------|
//! | `i_C`..`i_Ca` | g element per g measured unit                 |
//! | `i_mass`    | g component per g measured unit                 |
//! | `i_COD`     | g O2 per g measured unit (negative for acceptors) |
//! | `i_charge`  | mol charge per g measured unit                  |
//! | `i_NOD`     | g O2 to nitrify the nitrogen, per g measured unit |
//!
//! ## Usage
//! ```rust, ignore
//! let nitrate = Component::from_formula("S_NO3", "NO3-", MeasuredAs::Element("N".into()),
//!     ParticleSize::Soluble, Degradability::Undegradable, false)?;
//! let biomass = Component::new("X_H", MeasuredAs::COD, ParticleSize::Particulate,
//!     Degradability::Readily, true).with_i_N(0.07).with_i_P(0.02).with_biomass(true);
//! ```
use crate::Components::chemicals::resolve_chemical;
use crate::Components::component_errors::ComponentError;
use crate::Components::molmass::Formula;
use crate::Components::oxygen_demand::{cod_per_mol, nod_ammonium, nod_nitrite};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// first-order BOD exertion rate, 1/d
const BOD_RATE: f64 = 0.23;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleSize {
    DissolvedGas,
    Soluble,
    Colloidal,
    Particulate,
}

impl FromStr for ParticleSize {
    type Err = ComponentError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dissolved gas" | "dissolvedgas" | "gas" => Ok(ParticleSize::DissolvedGas),
            "soluble" => Ok(ParticleSize::Soluble),
            "colloidal" => Ok(ParticleSize::Colloidal),
            "particulate" => Ok(ParticleSize::Particulate),
            other => Err(ComponentError::InvalidProperty {
                id: String::new(),
                reason: format!("unknown particle size '{}'", other),
            }),
        }
    }
}

impl fmt::Display for ParticleSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ParticleSize::DissolvedGas => "Dissolved gas",
            ParticleSize::Soluble => "Soluble",
            ParticleSize::Colloidal => "Colloidal",
            ParticleSize::Particulate => "Particulate",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Degradability {
    Readily,
    Slowly,
    Undegradable,
}

impl Degradability {
    pub fn is_degradable(&self) -> bool {
        !matches!(self, Degradability::Undegradable)
    }
}

impl FromStr for Degradability {
    type Err = ComponentError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "readily" => Ok(Degradability::Readily),
            "slowly" => Ok(Degradability::Slowly),
            "undegradable" => Ok(Degradability::Undegradable),
            other => Err(ComponentError::InvalidProperty {
                id: String::new(),
                reason: format!("unknown degradability '{}'", other),
            }),
        }
    }
}

impl fmt::Display for Degradability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Basis on which concentrations of a component are expressed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasuredAs {
    /// mass of the component itself
    Itself,
    COD,
    /// mass of one element of the formula, e.g. "N" for nitrate
    Element(String),
}

impl FromStr for MeasuredAs {
    type Err = ComponentError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "None" | "none" | "itself" => Ok(MeasuredAs::Itself),
            "COD" => Ok(MeasuredAs::COD),
            el if crate::Components::molmass::element(el).is_some() => {
                Ok(MeasuredAs::Element(el.to_string()))
            }
            other => Err(ComponentError::InvalidProperty {
                id: String::new(),
                reason: format!("unknown measured-as basis '{}'", other),
            }),
        }
    }
}

impl fmt::Display for MeasuredAs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MeasuredAs::Itself => write!(f, "-"),
            MeasuredAs::COD => write!(f, "COD"),
            MeasuredAs::Element(el) => write!(f, "{}", el),
        }
    }
}

/// Quantities a reaction can be required to conserve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConservedQuantity {
    COD,
    N,
    P,
    C,
    K,
    Mg,
    Ca,
    Charge,
    Mass,
    NOD,
}

impl ConservedQuantity {
    pub const ALL: [ConservedQuantity; 10] = [
        ConservedQuantity::COD,
        ConservedQuantity::N,
        ConservedQuantity::P,
        ConservedQuantity::C,
        ConservedQuantity::K,
        ConservedQuantity::Mg,
        ConservedQuantity::Ca,
        ConservedQuantity::Charge,
        ConservedQuantity::Mass,
        ConservedQuantity::NOD,
    ];

    /// parses a comma separated list such as "COD, N, charge"
    pub fn parse_list(s: &str) -> Result<Vec<ConservedQuantity>, ComponentError> {
        s.split(',')
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for ConservedQuantity {
    type Err = ComponentError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "COD" => Ok(ConservedQuantity::COD),
            "N" => Ok(ConservedQuantity::N),
            "P" => Ok(ConservedQuantity::P),
            "C" => Ok(ConservedQuantity::C),
            "K" => Ok(ConservedQuantity::K),
            "Mg" => Ok(ConservedQuantity::Mg),
            "Ca" => Ok(ConservedQuantity::Ca),
            "charge" | "Charge" => Ok(ConservedQuantity::Charge),
            "mass" | "Mass" => Ok(ConservedQuantity::Mass),
            "NOD" => Ok(ConservedQuantity::NOD),
            other => Err(ComponentError::UnknownQuantity(other.to_string())),
        }
    }
}

impl fmt::Display for ConservedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ConservedQuantity::Charge => "charge",
            ConservedQuantity::Mass => "mass",
            other => return write!(f, "{:?}", other),
        };
        write!(f, "{}", s)
    }
}

/// Property record of one species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub description: String,
    pub formula: Option<Formula>,
    pub measured_as: MeasuredAs,
    pub particle_size: ParticleSize,
    pub degradability: Degradability,
    pub organic: bool,
    pub biomass: bool,
    /// g/mol, known only for components with a formula
    pub molar_mass: Option<f64>,
    pub i_C: f64,
    pub i_N: f64,
    pub i_P: f64,
    pub i_K: f64,
    pub i_Mg: f64,
    pub i_Ca: f64,
    pub i_mass: f64,
    pub i_COD: f64,
    pub i_charge: f64,
    pub i_NOD: f64,
    pub f_BOD5_COD: f64,
    pub f_uBOD_COD: f64,
    pub f_Vmass_Totmass: f64,
}

impl Component {
    /// Lumped component without a formula. All conversion factors start at zero except
    /// `i_mass` (1) and `i_COD` (1 when measured as COD).
    pub fn new(
        id: &str,
        measured_as: MeasuredAs,
        particle_size: ParticleSize,
        degradability: Degradability,
        organic: bool,
    ) -> Self {
        let i_COD = if measured_as == MeasuredAs::COD {
            1.0
        } else {
            0.0
        };
        let mut component = Component {
            id: id.to_string(),
            description: String::new(),
            formula: None,
            measured_as,
            particle_size,
            degradability,
            organic,
            biomass: false,
            molar_mass: None,
            i_C: 0.0,
            i_N: 0.0,
            i_P: 0.0,
            i_K: 0.0,
            i_Mg: 0.0,
            i_Ca: 0.0,
            i_mass: 1.0,
            i_COD,
            i_charge: 0.0,
            i_NOD: 0.0,
            f_BOD5_COD: 0.0,
            f_uBOD_COD: 0.0,
            f_Vmass_Totmass: 0.0,
        };
        component.refresh_derived();
        component
    }

    /// Component with a chemical formula; all conversion factors are derived from it.
    pub fn from_formula(
        id: &str,
        formula: &str,
        measured_as: MeasuredAs,
        particle_size: ParticleSize,
        degradability: Degradability,
        organic: bool,
    ) -> Result<Self, ComponentError> {
        let parsed = Formula::parse(formula)?;
        let mw = parsed.molar_mass();
        let cod_mol = cod_per_mol(&parsed);
        let invalid = |reason: String| ComponentError::InvalidProperty {
            id: id.to_string(),
            reason,
        };
        // g of measured unit per mol
        let basis = match &measured_as {
            MeasuredAs::Itself => mw,
            MeasuredAs::COD => {
                if cod_mol <= 0.0 {
                    return Err(invalid(format!(
                        "'{}' has no positive COD and cannot be measured as COD",
                        formula
                    )));
                }
                cod_mol
            }
            MeasuredAs::Element(el) => {
                let m = parsed.element_mass(el);
                if m <= 0.0 {
                    return Err(invalid(format!(
                        "measured as {} but '{}' contains no {}",
                        el, formula, el
                    )));
                }
                m
            }
        };
        let per_basis = |grams_per_mol: f64| grams_per_mol / basis;
        let mut component = Component::new(id, measured_as, particle_size, degradability, organic);
        component.i_C = per_basis(parsed.element_mass("C"));
        component.i_N = per_basis(parsed.element_mass("N"));
        component.i_P = per_basis(parsed.element_mass("P"));
        component.i_K = per_basis(parsed.element_mass("K"));
        component.i_Mg = per_basis(parsed.element_mass("Mg"));
        component.i_Ca = per_basis(parsed.element_mass("Ca"));
        component.i_mass = per_basis(mw);
        component.i_COD = per_basis(cod_mol);
        component.i_charge = per_basis(parsed.charge as f64);
        component.molar_mass = Some(mw);
        component.formula = Some(parsed);
        component.refresh_derived();
        Ok(component)
    }

    /// Component built from a chemical reference (common name or formula) resolved
    /// through the built-in chemical table.
    pub fn from_chemical(
        id: &str,
        chemical_ref: &str,
        measured_as: MeasuredAs,
        particle_size: ParticleSize,
        organic: bool,
        degradability: Degradability,
    ) -> Result<Self, ComponentError> {
        let chemical = resolve_chemical(chemical_ref).ok_or_else(|| {
            ComponentError::UnknownChemical {
                id: id.to_string(),
                reference: chemical_ref.to_string(),
            }
        })?;
        let component = Component::from_formula(
            id,
            chemical.formula,
            measured_as,
            particle_size,
            degradability,
            organic,
        )?;
        Ok(component.with_description(chemical.name))
    }

    /// Deep copy under a new id; the description is cleared.
    pub fn copy(&self, new_id: &str) -> Component {
        let mut copied = self.clone();
        copied.id = new_id.to_string();
        copied.description = String::new();
        copied
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_i_C(mut self, value: f64) -> Self {
        self.i_C = value;
        self
    }

    pub fn with_i_N(mut self, value: f64) -> Self {
        self.i_N = value;
        self.refresh_derived();
        self
    }

    pub fn with_i_P(mut self, value: f64) -> Self {
        self.i_P = value;
        self
    }

    pub fn with_i_mass(mut self, value: f64) -> Self {
        self.i_mass = value;
        self
    }

    pub fn with_biomass(mut self, biomass: bool) -> Self {
        self.biomass = biomass;
        self
    }

    pub fn with_degradability(mut self, degradability: Degradability) -> Self {
        self.degradability = degradability;
        self.refresh_derived();
        self
    }

    /// Sets a numeric property by name (`i_N`, `i_COD`, `f_BOD5_COD`, ...).
    pub fn set_property(&mut self, name: &str, value: f64) -> Result<(), ComponentError> {
        if !value.is_finite() {
            return Err(ComponentError::InvalidProperty {
                id: self.id.clone(),
                reason: format!("{} must be finite, got {}", name, value),
            });
        }
        let slot = match name {
            "i_C" => &mut self.i_C,
            "i_N" => &mut self.i_N,
            "i_P" => &mut self.i_P,
            "i_K" => &mut self.i_K,
            "i_Mg" => &mut self.i_Mg,
            "i_Ca" => &mut self.i_Ca,
            "i_mass" => &mut self.i_mass,
            "i_COD" => &mut self.i_COD,
            "i_charge" => &mut self.i_charge,
            "f_BOD5_COD" => &mut self.f_BOD5_COD,
            "f_uBOD_COD" => &mut self.f_uBOD_COD,
            "f_Vmass_Totmass" => &mut self.f_Vmass_Totmass,
            other => {
                return Err(ComponentError::InvalidProperty {
                    id: self.id.clone(),
                    reason: format!("'{}' is not a settable property", other),
                });
            }
        };
        *slot = value;
        if name == "i_N" {
            self.refresh_derived();
        }
        Ok(())
    }

    pub fn with_property(mut self, name: &str, value: f64) -> Result<Self, ComponentError> {
        self.set_property(name, value)?;
        Ok(self)
    }

    /// Recomputes the nitrogenous oxygen demand and the default BOD/volatile fractions.
    fn refresh_derived(&mut self) {
        let ammonium = self.formula.as_ref().is_some_and(|f| f.is_ammonium());
        let nitrite = self.formula.as_ref().is_some_and(|f| f.is_nitrite());
        self.i_NOD = if self.degradability.is_degradable() || ammonium {
            self.i_N * nod_ammonium()
        } else if nitrite {
            self.i_N * nod_nitrite()
        } else {
            0.0
        };
        if self.organic && self.degradability.is_degradable() {
            self.f_uBOD_COD = 1.0;
            self.f_BOD5_COD = 1.0 - (-BOD_RATE * 5.0_f64).exp();
        } else {
            self.f_uBOD_COD = 0.0;
            self.f_BOD5_COD = 0.0;
        }
        self.f_Vmass_Totmass = if self.organic { 1.0 } else { 0.0 };
    }

    /// conversion factor of this component for a conserved quantity
    pub fn factor(&self, quantity: ConservedQuantity) -> f64 {
        match quantity {
            ConservedQuantity::COD => self.i_COD,
            ConservedQuantity::N => self.i_N,
            ConservedQuantity::P => self.i_P,
            ConservedQuantity::C => self.i_C,
            ConservedQuantity::K => self.i_K,
            ConservedQuantity::Mg => self.i_Mg,
            ConservedQuantity::Ca => self.i_Ca,
            ConservedQuantity::Charge => self.i_charge,
            ConservedQuantity::Mass => self.i_mass,
            ConservedQuantity::NOD => self.i_NOD,
        }
    }

    pub fn is_gas(&self) -> bool {
        self.particle_size == ParticleSize::DissolvedGas
    }

    pub fn is_particulate(&self) -> bool {
        self.particle_size == ParticleSize::Particulate
    }

    /// Checks the property record before the component enters a compiled registry.
    pub fn validate(&self) -> Result<(), ComponentError> {
        let invalid = |reason: String| ComponentError::InvalidProperty {
            id: self.id.clone(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("empty component id".to_string()));
        }
        if !self.organic && self.degradability.is_degradable() {
            return Err(invalid(
                "inorganic components cannot be degradable".to_string(),
            ));
        }
        if !(self.i_mass > 0.0 && self.i_mass.is_finite()) {
            return Err(invalid(format!("i_mass must be positive, got {}", self.i_mass)));
        }
        for q in ConservedQuantity::ALL {
            let v = self.factor(q);
            if !v.is_finite() {
                return Err(invalid(format!("conversion factor for {} is {}", q, v)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn nitrate() -> Component {
        Component::from_formula(
            "S_NO3",
            "NO3-",
            MeasuredAs::Element("N".to_string()),
            ParticleSize::Soluble,
            Degradability::Undegradable,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_nitrate_factors() {
        let c = nitrate();
        assert_relative_eq!(c.i_N, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.i_COD, -64.0 / 14.007, epsilon = 1e-9);
        assert_relative_eq!(c.i_charge, -1.0 / 14.007, epsilon = 1e-12);
        assert_relative_eq!(c.i_mass, 62.004 / 14.007, epsilon = 1e-3);
        assert_eq!(c.i_NOD, 0.0);
    }

    #[test]
    fn test_cod_basis() {
        let acetate = Component::from_formula(
            "S_Ac",
            "C2H3O2-",
            MeasuredAs::COD,
            ParticleSize::Soluble,
            Degradability::Readily,
            true,
        )
        .unwrap();
        assert_relative_eq!(acetate.i_COD, 1.0, epsilon = 1e-12);
        assert_relative_eq!(acetate.i_charge, -1.0 / 64.0, epsilon = 1e-12);
        assert_relative_eq!(acetate.i_C, 24.022 / 64.0, epsilon = 1e-9);
        assert!(acetate.f_BOD5_COD > 0.6 && acetate.f_BOD5_COD < 0.7);
    }

    #[test]
    fn test_invalid_bases() {
        let no_cod = Component::from_formula(
            "S_CO2",
            "CO2",
            MeasuredAs::COD,
            ParticleSize::DissolvedGas,
            Degradability::Undegradable,
            false,
        );
        assert!(matches!(no_cod, Err(ComponentError::InvalidProperty { .. })));
        let no_p = Component::from_formula(
            "S_NH4",
            "NH4+",
            MeasuredAs::Element("P".to_string()),
            ParticleSize::Soluble,
            Degradability::Undegradable,
            false,
        );
        assert!(no_p.is_err());
    }

    #[test]
    fn test_from_chemical() {
        let methanol = Component::from_chemical(
            "S_MeOH",
            "methanol",
            MeasuredAs::COD,
            ParticleSize::Soluble,
            true,
            Degradability::Readily,
        )
        .unwrap();
        assert_relative_eq!(methanol.i_COD, 1.0, epsilon = 1e-12);
        let unknown = Component::from_chemical(
            "S_X",
            "unobtainium",
            MeasuredAs::Itself,
            ParticleSize::Soluble,
            false,
            Degradability::Undegradable,
        );
        assert!(matches!(unknown, Err(ComponentError::UnknownChemical { .. })));
    }

    #[test]
    fn test_copy_is_deep() {
        let original = nitrate().with_description("nitrate");
        let mut copied = original.copy("S_NOx");
        copied.set_property("i_N", 0.5).unwrap();
        assert_eq!(copied.id, "S_NOx");
        assert_eq!(copied.description, "");
        assert_eq!(original.i_N, 1.0);
        assert_eq!(copied.i_N, 0.5);
    }

    #[test]
    fn test_nod_and_validation() {
        let biomass = Component::new(
            "X_H",
            MeasuredAs::COD,
            ParticleSize::Particulate,
            Degradability::Readily,
            true,
        )
        .with_i_N(0.07);
        assert_relative_eq!(biomass.i_NOD, 0.07 * nod_ammonium(), epsilon = 1e-12);
        assert!(biomass.validate().is_ok());
        let bad = Component::new(
            "S_bad",
            MeasuredAs::Itself,
            ParticleSize::Soluble,
            Degradability::Readily,
            false,
        );
        assert!(bad.validate().is_err());
        let mut c = nitrate();
        assert!(c.set_property("i_unknown", 1.0).is_err());
        assert!(c.set_property("i_N", f64::NAN).is_err());
    }

    #[test]
    fn test_quantity_parsing() {
        let qs = ConservedQuantity::parse_list("COD, N,charge").unwrap();
        assert_eq!(
            qs,
            vec![
                ConservedQuantity::COD,
                ConservedQuantity::N,
                ConservedQuantity::Charge
            ]
        );
        assert!("entropy".parse::<ConservedQuantity>().is_err());
        assert_eq!(ConservedQuantity::Charge.to_string(), "charge");
        assert_eq!(ConservedQuantity::COD.to_string(), "COD");
    }
}
