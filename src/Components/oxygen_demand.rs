//! Theoretical oxygen demand of chemical species.
//!
//! COD is counted as the electrons a species releases when oxidised to CO2, H2O,
//! NH4+, PO4-3 and SO4-2; every electron is worth a quarter of an O2 molecule.
//! Electron acceptors (O2, NO3-, NO2-, N2) therefore have a negative COD.
use crate::Components::molmass::{Formula, atomic_mass};

/// g O2 per mole of electrons: one O2 molecule accepts four electrons
pub fn o2_per_electron() -> f64 {
    2.0 * mass("O") / 4.0
}

/// g O2 per mole of the species
pub fn cod_per_mol(formula: &Formula) -> f64 {
    formula.electrons_to_reference() * o2_per_electron()
}

/// g O2 per g of the species
pub fn cod_per_gram(formula: &Formula) -> f64 {
    let mw = formula.molar_mass();
    if mw > 0.0 { cod_per_mol(formula) / mw } else { 0.0 }
}

fn mass(symbol: &str) -> f64 {
    atomic_mass(symbol).unwrap_or(f64::NAN)
}

/// g O2 needed to nitrify one g of ammonium nitrogen to nitrate
pub fn nod_ammonium() -> f64 {
    4.0 * mass("O") / mass("N")
}

/// g O2 needed to oxidise one g of nitrite nitrogen to nitrate
pub fn nod_nitrite() -> f64 {
    mass("O") / mass("N")
}
