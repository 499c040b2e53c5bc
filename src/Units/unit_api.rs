//! # Unit operation contract
//!
//! Every unit reads its inlet streams and writes its outlet streams in `run`. The
//! number of inlets and outlets is fixed per unit type and checked at construction.
//! Across a run, the flow of every element the unit accounts for (C, N, P) entering
//! through the inlets leaves through the outlets, gas outlets included.
//!
//! `SanUnit` is the closed set of units; calls are dispatched statically through
//! `enum_dispatch`.
use crate::Components::component::ConservedQuantity;
use crate::Components::registry::same_registry;
use crate::Units::anaerobic_reactor::AnaerobicReactor;
use crate::Units::electrochemical_cell::ElectroChemCell;
use crate::Units::kinetic_reactor::KineticReactor;
use crate::Units::unit_errors::UnitError;
use crate::Units::waste_stream::WasteStream;
use enum_dispatch::enum_dispatch;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

#[enum_dispatch]
pub trait UnitOperation {
    fn id(&self) -> &str;
    /// fixed number of inlets
    fn n_ins(&self) -> usize;
    /// fixed number of outlets
    fn n_outs(&self) -> usize;
    fn ins(&self) -> &[WasteStream];
    /// inlets may be changed between runs; the arity stays fixed
    fn ins_mut(&mut self) -> &mut [WasteStream];
    fn outs(&self) -> &[WasteStream];
    /// computes the outlets from the current inlets
    fn run(&mut self) -> Result<(), UnitError>;
}

#[derive(Debug, Clone)]
#[enum_dispatch(UnitOperation)]
pub enum SanUnit {
    AnaerobicReactor(AnaerobicReactor),
    ElectroChemCell(ElectroChemCell),
    KineticReactor(KineticReactor),
}

/// Fails fast when a unit receives the wrong number of streams, or streams built on
/// different registries.
pub fn check_streams(
    unit: &str,
    ins: &[WasteStream],
    outs: &[WasteStream],
    n_ins: usize,
    n_outs: usize,
) -> Result<(), UnitError> {
    if ins.len() != n_ins || outs.len() != n_outs {
        return Err(UnitError::Arity {
            unit: unit.to_string(),
            expected_ins: n_ins,
            expected_outs: n_outs,
            found_ins: ins.len(),
            found_outs: outs.len(),
        });
    }
    if let Some(first) = ins.first() {
        for stream in ins.iter().chain(outs.iter()) {
            if !same_registry(first.registry(), stream.registry()) {
                return Err(UnitError::RegistryMismatch {
                    context: format!("unit '{}', stream '{}'", unit, stream.id),
                });
            }
        }
    }
    Ok(())
}

/// inlet minus outlet flow of `quantity`, kg/hr
pub fn quantity_residual<U: UnitOperation>(unit: &U, quantity: ConservedQuantity) -> f64 {
    let inflow: f64 = unit.ins().iter().map(|s| s.quantity_flow(quantity)).sum();
    let outflow: f64 = unit.outs().iter().map(|s| s.quantity_flow(quantity)).sum();
    inflow - outflow
}

/// Typed unit configuration, validated on construction and on load.
pub trait UnitConfig: Sized + DeserializeOwned {
    fn validate(&self) -> Result<(), UnitError>;

    fn from_json(json: &str) -> Result<Self, UnitError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn load(path: &Path) -> Result<Self, UnitError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// `value` must be a fraction in [0, 1]
pub(crate) fn check_fraction(unit: &str, name: &str, value: f64) -> Result<(), UnitError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(UnitError::InvalidConfig {
            unit: unit.to_string(),
            reason: format!("{} must lie in [0, 1], got {}", name, value),
        })
    }
}
