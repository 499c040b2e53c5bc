//! SHARON: single reactor high-activity ammonia removal over nitrite.
//!
//! Ammonium is oxidised to nitrite by AOB and further to nitrate by NOB; heterotrophs
//! denitrify nitrite and nitrate with methanol and also oxidise methanol aerobically.
//! Conserved COD and N.
use crate::Components::component::ConservedQuantity;
use crate::Components::component_errors::ComponentError;
use crate::Components::registry::ComponentRegistry;
use crate::Kinetics::kinetics_errors::KineticsError;
use crate::Kinetics::parameters::{ParameterSpec, specs};
use crate::Kinetics::processes::{ProcessCollection, ProcessCompiler};
use crate::Kinetics::reaction_template::ReactionTemplate;
use crate::Models::derive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SHARON_CONSERVED: [ConservedQuantity; 2] =
    [ConservedQuantity::COD, ConservedQuantity::N];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharonOptions {
    /// nitrogen content of the three biomass groups, g N/g COD
    pub i_N_biomass: f64,
}

impl Default for SharonOptions {
    fn default() -> Self {
        SharonOptions { i_N_biomass: 0.07 }
    }
}

pub fn sharon_components(options: &SharonOptions) -> Result<ComponentRegistry, ComponentError> {
    let defaults = ComponentRegistry::load_default()?;
    let biomass = |source: &str, id: &str, description: &str| {
        derive(&defaults, source, id, description).map(|c| c.with_i_N(options.i_N_biomass))
    };
    let components = vec![
        derive(&defaults, "S_NH4", "S_NH", "ammonium")?,
        derive(&defaults, "S_NO2", "S_NO2", "nitrite")?,
        derive(&defaults, "S_NO3", "S_NO3", "nitrate")?,
        derive(&defaults, "S_N2", "S_N2", "dinitrogen")?,
        derive(&defaults, "S_O2", "S_O", "dissolved oxygen")?,
        derive(&defaults, "S_CH3OH", "CH3OH", "methanol")?,
        biomass("X_AOO", "X_AOB", "ammonia oxidizing bacteria")?,
        biomass("X_NOO", "X_NOB", "nitrite oxidizing bacteria")?,
        biomass("X_OHO", "X_HET", "heterotrophic bacteria")?,
        defaults.get("H2O")?.clone(),
    ];
    ComponentRegistry::from_components(components)?.compiled()
}

pub fn sharon_parameters() -> Vec<ParameterSpec> {
    specs(&[
        ("Y_1", 0.15, "g COD/g N", "AOB yield"),
        ("Y_2", 0.041, "g COD/g N", "NOB yield"),
        ("Y_3", 0.123, "g COD/g COD", "heterotrophic yield on nitrite"),
        ("Y_4", 0.131, "g COD/g COD", "heterotrophic yield on nitrate"),
        ("Y_5", 0.223, "g COD/g COD", "heterotrophic yield on oxygen"),
        ("mu_amm_max", 2.1, "1/d", "AOB maximum growth rate"),
        ("mu_nit_max", 1.05, "1/d", "NOB maximum growth rate"),
        ("mu_dNO2_max", 1.5, "1/d", "maximum growth rate on nitrite"),
        ("mu_dNO3_max", 1.5, "1/d", "maximum growth rate on nitrate"),
        ("mu_met_max", 2.5, "1/d", "maximum aerobic growth rate on methanol"),
        ("K_amm_nh3", 0.972, "g N/m3", "ammonium half saturation, AOB"),
        ("K_I_amm_HNO2", 8.862, "g N/m3", "nitrite inhibition of AOB"),
        ("K_amm_O2", 0.4704, "g O2/m3", "oxygen half saturation, AOB"),
        ("K_nit_HNO2", 0.893, "g N/m3", "nitrite half saturation, NOB"),
        ("K_nit_O2", 0.544, "g O2/m3", "oxygen half saturation, NOB"),
        ("K_dNO2_NO2", 0.391, "g N/m3", "nitrite half saturation, denitrification"),
        ("K_hetan_CH3OH", 16.672, "g COD/m3", "methanol half saturation, anoxic"),
        ("K_I_O2", 0.1008, "g O2/m3", "oxygen inhibition of denitrification"),
        ("K_dNO3_NO3", 0.62, "g N/m3", "nitrate half saturation, denitrification"),
        ("K_hetox_CH3OH", 66.656, "g COD/m3", "methanol half saturation, aerobic"),
        ("K_het_O2", 0.04, "g O2/m3", "oxygen half saturation, heterotrophs"),
    ])
}

pub fn build_sharon_templates() -> Result<Vec<ReactionTemplate>, KineticsError> {
    Ok(vec![
        ReactionTemplate::new("amm_ox", "[?]S_NH + [?]S_O -> X_AOB + [1/Y_1]S_NO2")?
            .with_reference("X_AOB")
            .with_rate(
                "mu_amm_max*S_NH/(K_amm_nh3 + S_NH)*K_I_amm_HNO2/(K_I_amm_HNO2 + S_NO2)*S_O/(K_amm_O2 + S_O)*X_AOB",
            )?,
        ReactionTemplate::new(
            "nit_ox",
            "[1/Y_2]S_NO2 + [?]S_O + [?]S_NH -> X_NOB + [1/Y_2]S_NO3",
        )?
        .with_reference("X_NOB")
        .with_rate("mu_nit_max*S_NO2/(K_nit_HNO2 + S_NO2)*S_O/(K_nit_O2 + S_O)*X_NOB")?,
        ReactionTemplate::new(
            "denit_NO2",
            "[1/Y_3]CH3OH + [(1-Y_3)/(1.71*Y_3)]S_NO2 + [?]S_NH -> X_HET + [?]S_N2",
        )?
        .with_reference("X_HET")
        .with_rate(
            "mu_dNO2_max*CH3OH/(K_hetan_CH3OH + CH3OH)*S_NO2/(K_dNO2_NO2 + S_NO2)*K_I_O2/(K_I_O2 + S_O)*X_HET",
        )?,
        ReactionTemplate::new(
            "denit_NO3",
            "[1/Y_4]CH3OH + [(1-Y_4)/(2.86*Y_4)]S_NO3 + [?]S_NH -> X_HET + [?]S_N2",
        )?
        .with_reference("X_HET")
        .with_rate(
            "mu_dNO3_max*CH3OH/(K_hetan_CH3OH + CH3OH)*S_NO3/(K_dNO3_NO3 + S_NO3)*K_I_O2/(K_I_O2 + S_O)*X_HET",
        )?,
        ReactionTemplate::new("met_ox", "[1/Y_5]CH3OH + [?]S_O + [?]S_NH -> X_HET")?
            .with_reference("X_HET")
            .with_rate("mu_met_max*CH3OH/(K_hetox_CH3OH + CH3OH)*S_O/(K_het_O2 + S_O)*X_HET")?,
    ])
}

pub fn sharon(registry: &Arc<ComponentRegistry>) -> Result<ProcessCollection, KineticsError> {
    ProcessCompiler::new(Arc::clone(registry))
        .parameters(&sharon_parameters())
        .conserved_for(&SHARON_CONSERVED)
        .add_templates(build_sharon_templates()?)
        .compile()
}
