/// eng
/// Activated Sludge Model No. 1: heterotrophic and autotrophic growth, decay,
/// ammonification and hydrolysis over 15 components; conserved COD, N, charge.
/// Parameter profiles "20C" and "10C".
pub mod asm1;
/// Denitrifying PAO model: stepwise NO3 -> NO2 -> NO -> N2O -> N2 reduction driven by
/// stored PHA, polyphosphate storage and lysis
pub mod cando;
/// Heterotrophic four-step denitrification with PAO metabolism, extended with two
/// hand-written anoxic PAO processes
pub mod cando3;
/// Shortcut nitrification/denitrification (SHARON) with methanol as electron donor
pub mod sharon;

use crate::Components::component::Component;
use crate::Components::component_errors::ComponentError;
use crate::Components::registry::ComponentRegistry;

/// Copy of a default component under the model's own name.
pub(crate) fn derive(
    defaults: &ComponentRegistry,
    source: &str,
    id: &str,
    description: &str,
) -> Result<Component, ComponentError> {
    Ok(defaults.copy(source, id)?.with_description(description))
}
