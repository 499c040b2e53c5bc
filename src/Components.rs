/// Element table, formula parsing and molar mass of species with a known formula
pub mod molmass;
/// Theoretical (COD) and nitrogenous (NOD) oxygen demand derived from formulas
pub mod oxygen_demand;
/// Built-in chemical reference table: resolves common names and formulas for
/// `Component::from_chemical`
pub mod chemicals;
/// The `Component` property record, classification enums and conserved quantities.
///
/// Every component carries the conversion factors (g COD, g N, g P, mol charge ... per g
/// of its measured-as basis) that conservation balances and stream aggregates read.
pub mod component;
pub mod component_errors;
/// Ordered, compile-once collection of components shared by processes and units,
/// with group queries and a JSON snapshot cache
pub mod registry;
/// Universally reused default components (`ComponentRegistry::load_default`)
pub mod default_components;
#[cfg(test)]
mod registry_tests;
