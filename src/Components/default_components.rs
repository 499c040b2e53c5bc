//! Universally reused species. Model builders copy and rename these instead of
//! defining their components from scratch.
//!
//! | id          | basis | size          | notes                          |
//! |-------------|-------|---------------|--------------------------------|
//! | S_H2 .. S_Prop | COD | soluble/gas  | fermentation products, methane |
//! | S_F, S_U_Inf | COD  | soluble       | fermentable / inert organics   |
//! | C_B_Subst, X_B_Subst | COD | colloidal/particulate | slowly biodegradable |
//! | X_OHO .. X_PAO | COD | particulate  | biomass groups                 |
//! | X_PAO_PP    | P     | particulate   | polyphosphate K0.33Mg0.33PO3   |
//! | S_NH4 .. S_N2 | N   | soluble/gas   | nitrogen from NH4+ to N2       |
//! | S_PO4, S_CO3, S_CO2, S_O2, cations, H2O | element/own mass | |
use crate::Components::component::{Component, Degradability, MeasuredAs, ParticleSize};
use crate::Components::component_errors::ComponentError;
use crate::Components::registry::ComponentRegistry;

fn as_element(el: &str) -> MeasuredAs {
    MeasuredAs::Element(el.to_string())
}

fn lumped_organic(
    id: &str,
    size: ParticleSize,
    degradability: Degradability,
    i_C: f64,
    i_N: f64,
    i_P: f64,
    i_mass: f64,
) -> Component {
    Component::new(id, MeasuredAs::COD, size, degradability, true)
        .with_i_C(i_C)
        .with_i_N(i_N)
        .with_i_P(i_P)
        .with_i_mass(i_mass)
}

fn biomass(id: &str, description: &str) -> Component {
    lumped_organic(
        id,
        ParticleSize::Particulate,
        Degradability::Readily,
        0.367,
        0.07,
        0.02,
        0.9,
    )
    .with_biomass(true)
    .with_description(description)
}

fn inorganic(id: &str, formula: &str, basis: MeasuredAs, size: ParticleSize) -> Result<Component, ComponentError> {
    Component::from_formula(id, formula, basis, size, Degradability::Undegradable, false)
}

pub fn default_components() -> Result<Vec<Component>, ComponentError> {
    use Degradability::*;
    use ParticleSize::*;
    let organic = |id: &str, formula: &str, size: ParticleSize, description: &str| {
        Component::from_formula(id, formula, MeasuredAs::COD, size, Readily, true)
            .map(|c| c.with_description(description))
    };
    let polyphosphate = Component::new(
        "X_PAO_PP",
        as_element("P"),
        Particulate,
        Undegradable,
        false,
    )
    .with_i_P(1.0)
    .with_i_mass(3.22)
    .with_property("i_K", 0.416)?
    .with_property("i_Mg", 0.259)?
    .with_description("polyphosphate stored by PAO");

    let components = vec![
        inorganic("S_H2", "H2", MeasuredAs::COD, DissolvedGas)?.with_description("hydrogen"),
        organic("S_CH4", "CH4", DissolvedGas, "methane")?,
        organic("S_CH3OH", "CH4O", Soluble, "methanol")?,
        organic("S_Ac", "C2H3O2-", Soluble, "acetate")?,
        organic("S_Prop", "C3H5O2-", Soluble, "propionate")?,
        lumped_organic("S_F", Soluble, Readily, 0.318, 0.03, 0.01, 0.75)
            .with_description("fermentable substrate"),
        lumped_organic("S_U_Inf", Soluble, Undegradable, 0.318, 0.01, 0.0, 0.75)
            .with_description("soluble inert organics from influent"),
        lumped_organic("C_B_Subst", Colloidal, Slowly, 0.318, 0.04, 0.01, 0.75)
            .with_description("colloidal slowly biodegradable substrate"),
        lumped_organic("X_B_Subst", Particulate, Slowly, 0.318, 0.04, 0.01, 0.75)
            .with_description("particulate slowly biodegradable substrate"),
        organic("X_OHO_PHA", "C4H6O2", Particulate, "PHA stored by OHO")?,
        organic("X_PAO_PHA", "C4H6O2", Particulate, "PHA stored by PAO")?,
        biomass("X_OHO", "ordinary heterotrophic organisms"),
        biomass("X_AOO", "ammonia oxidizing organisms"),
        biomass("X_NOO", "nitrite oxidizing organisms"),
        biomass("X_PAO", "phosphorus accumulating organisms"),
        lumped_organic("X_U_Inf", Particulate, Undegradable, 0.367, 0.06, 0.01, 0.75)
            .with_description("particulate inert organics"),
        polyphosphate,
        inorganic("S_NH4", "NH4+", as_element("N"), Soluble)?.with_description("ammonium"),
        inorganic("S_NO2", "NO2-", as_element("N"), Soluble)?.with_description("nitrite"),
        inorganic("S_NO3", "NO3-", as_element("N"), Soluble)?.with_description("nitrate"),
        inorganic("S_NO", "NO", as_element("N"), DissolvedGas)?.with_description("nitric oxide"),
        inorganic("S_N2O", "N2O", as_element("N"), DissolvedGas)?
            .with_description("nitrous oxide"),
        inorganic("S_N2", "N2", as_element("N"), DissolvedGas)?.with_description("dinitrogen"),
        inorganic("S_PO4", "PO4-3", as_element("P"), Soluble)?.with_description("phosphate"),
        inorganic("S_CO3", "CO3-2", as_element("C"), Soluble)?.with_description("carbonate"),
        inorganic("S_CO2", "CO2", as_element("C"), DissolvedGas)?
            .with_description("carbon dioxide"),
        inorganic("S_O2", "O2", MeasuredAs::Itself, DissolvedGas)?.with_description("oxygen"),
        inorganic("S_K", "K+", MeasuredAs::Itself, Soluble)?.with_description("potassium"),
        inorganic("S_Ca", "Ca+2", MeasuredAs::Itself, Soluble)?.with_description("calcium"),
        inorganic("S_Mg", "Mg+2", MeasuredAs::Itself, Soluble)?.with_description("magnesium"),
        inorganic("H2O", "H2O", MeasuredAs::Itself, Soluble)?.with_description("water"),
    ];
    Ok(components)
}

impl ComponentRegistry {
    /// Compiled registry of the default components.
    pub fn load_default() -> Result<ComponentRegistry, ComponentError> {
        ComponentRegistry::from_components(default_components()?)?.compiled()
    }
}
