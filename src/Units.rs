/// Error type of waste streams and unit operations
pub mod unit_errors;
/// eng
/// Multi-component waste stream over a shared compiled registry: component mass flows,
/// volumetric flow, concentrations and composite measures (COD, BOD5, TN, TP, TC, TSS),
/// mixing, splitting and degassing
pub mod waste_stream;
/// The `UnitOperation` contract, the `SanUnit` dispatch enum, arity checks and typed
/// JSON configuration
pub mod unit_api;
/// First-order decay and ammonia-first nitrogen allocation
pub mod decay;
/// eng
/// Lumped anaerobic treatment: COD decay to methane and CO2, nutrient release,
/// nitrogen removal to N2O and N2. One inlet, four outlets.
pub mod anaerobic_reactor;
/// Per-component recovery and removal from mixed influent and cleaning agent
pub mod electrochemical_cell;
/// Plug-flow batch integration of a compiled process collection over the residence time
pub mod kinetic_reactor;
#[cfg(test)]
mod units_tests;
