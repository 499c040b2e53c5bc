//! CANDO: coupled aerobic-anoxic nitrous decomposition operation.
//!
//! Denitrifying PAO (X_DPAO) store PHA from fermentable substrate while releasing
//! phosphate, then reduce nitrate stepwise to N2 on the stored PHA. Nitrous oxide is an
//! explicit intermediate so that its accumulation can be followed. Conserved COD, N, P.
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

pub const CANDO_CONSERVED: [ConservedQuantity; 3] = [
    ConservedQuantity::COD,
    ConservedQuantity::N,
    ConservedQuantity::P,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandoOptions {
    /// phosphorus content of DPAO biomass, g P/g COD
    pub i_P_BM: f64,
    /// phosphorus content of inert residue, g P/g COD
    pub i_P_XI: f64,
    /// TSS/COD ratio of the inert residue
    pub fr_SS_COD: f64,
}

impl Default for CandoOptions {
    fn default() -> Self {
        CandoOptions {
            i_P_BM: 0.02,
            i_P_XI: 0.01,
            fr_SS_COD: 0.75,
        }
    }
}

pub fn cando_components(options: &CandoOptions) -> Result<ComponentRegistry, ComponentError> {
    let defaults = ComponentRegistry::load_default()?;
    let components = vec![
        derive(&defaults, "S_NO3", "S_NO3", "nitrate")?,
        derive(&defaults, "S_NO2", "S_NO2", "nitrite")?,
        derive(&defaults, "S_NO", "S_NO", "nitric oxide")?,
        derive(&defaults, "S_N2O", "S_N2O", "nitrous oxide")?,
        derive(&defaults, "S_N2", "S_N2", "dinitrogen")?,
        derive(&defaults, "S_F", "S_F", "readily degradable substrate")?.with_i_N(0.0),
        derive(&defaults, "S_PO4", "S_PO4", "phosphate")?,
        derive(
            &defaults,
            "X_PAO",
            "X_DPAO",
            "denitrifying phosphorus accumulating organisms",
        )?
        .with_i_N(0.0)
        .with_i_P(options.i_P_BM),
        derive(&defaults, "X_PAO_PHA", "X_PHA", "polyhydroxyalkanoates")?,
        derive(&defaults, "X_PAO_PP", "X_PP", "polyphosphate")?,
        derive(&defaults, "X_U_Inf", "X_I", "residual inert biomass")?
            .with_i_N(0.0)
            .with_i_P(options.i_P_XI)
            .with_i_mass(options.fr_SS_COD),
        defaults.get("H2O")?.clone(),
    ];
    ComponentRegistry::from_components(components)?.compiled()
}

pub fn cando_parameters() -> Vec<ParameterSpec> {
    specs(&[
        ("Y_PO4", 0.4, "g P/g COD", "phosphate released per PHA stored"),
        ("Y_PHA", 0.2, "g COD/g P", "PHA consumed per polyphosphate stored"),
        ("Y_DPAO_NOx", 0.6, "g COD/g COD", "anoxic DPAO yield"),
        ("f_1", 0.1, "-", "inert fraction of lysed DPAO"),
        ("q_PHA", 0.53, "1/d", "PHA storage rate constant"),
        ("K_S_DPAO", 10.0, "g COD/m3", "substrate half saturation"),
        ("K_PP_DPAO", 0.05, "g P/g COD", "polyphosphate half saturation"),
        ("q_PP", 0.0375, "1/d", "polyphosphate storage rate constant"),
        ("K_PO4_PP", 0.2, "g P/m3", "phosphate half saturation for storage"),
        ("K_PHA", 0.1, "g COD/g COD", "PHA half saturation"),
        ("K_max_DPAO", 0.2, "g P/g COD", "maximum polyphosphate content"),
        ("K_iPP_DPAO", 0.05, "g P/g COD", "polyphosphate storage inhibition"),
        ("K_DPAO_PO4", 0.05, "g P/m3", "phosphate half saturation for growth"),
        ("mu_DPAO1", 0.07, "1/d", "growth rate on nitrate"),
        ("mu_DPAO2", 0.019, "1/d", "growth rate on nitrite"),
        ("mu_DPAO3", 0.142, "1/d", "growth rate on nitric oxide"),
        ("mu_DPAO4", 0.142, "1/d", "growth rate on nitrous oxide"),
        ("K_NO3", 0.251, "g N/m3", "nitrate half saturation"),
        ("K_NO2", 0.81, "g N/m3", "nitrite half saturation"),
        ("K_NO", 0.0021, "g N/m3", "nitric oxide half saturation"),
        ("K_N2O", 0.0052, "g N/m3", "nitrous oxide half saturation"),
        ("b_DPAO", 0.005, "1/d", "DPAO lysis rate"),
        ("b_PP", 0.005, "1/d", "polyphosphate lysis rate"),
        ("b_PHA", 0.005, "1/d", "PHA lysis rate"),
        ("K_NOx", 0.5, "g N/m3", "nitrate half saturation for polyphosphate storage"),
    ])
}

fn reduction(id: &str, oxidant: &str, product: &str, mu: &str, k: &str) -> Result<ReactionTemplate, KineticsError> {
    ReactionTemplate::new(
        id,
        &format!(
            "[1/Y_DPAO_NOx]X_PHA + [?]{ox} + [?]S_PO4 -> X_DPAO + [?]{product}",
            ox = oxidant,
            product = product
        ),
    )?
    .with_reference("X_DPAO")
    .with_rate(&format!(
        "{mu}*{ox}/({k} + {ox})*X_PHA/(K_PHA*X_DPAO + X_PHA)*S_PO4/(K_DPAO_PO4 + S_PO4)*X_DPAO",
        mu = mu,
        ox = oxidant,
        k = k
    ))
}

pub fn build_cando_templates() -> Result<Vec<ReactionTemplate>, KineticsError> {
    Ok(vec![
        ReactionTemplate::new("storage_PHA", "S_F + [Y_PO4]X_PP -> [?]X_PHA + [?]S_PO4")?
            .with_reference("S_F")
            .with_rate("q_PHA*S_F/(K_S_DPAO + S_F)*X_PP/(K_PP_DPAO*X_DPAO + X_PP)*X_DPAO")?,
        reduction("reduction_NO3", "S_NO3", "S_NO2", "mu_DPAO1", "K_NO3")?,
        reduction("reduction_NO2", "S_NO2", "S_NO", "mu_DPAO2", "K_NO2")?,
        reduction("reduction_NO", "S_NO", "S_N2O", "mu_DPAO3", "K_NO")?,
        reduction("reduction_N2O", "S_N2O", "S_N2", "mu_DPAO4", "K_N2O")?,
        ReactionTemplate::new("storage_PP", "[Y_PHA]X_PHA + S_PO4 + [?]S_NO3 -> X_PP + [?]S_N2")?
            .with_reference("X_PP")
            .with_rate(
                "q_PP*S_PO4/(K_PO4_PP + S_PO4)*S_NO3/(K_NOx + S_NO3)*X_PHA/(K_PHA*X_DPAO + X_PHA)*(K_max_DPAO*X_DPAO - X_PP)/(K_iPP_DPAO*X_DPAO + K_max_DPAO*X_DPAO - X_PP)*X_DPAO",
            )?,
        ReactionTemplate::new("lysis_DPAO", "X_DPAO -> [f_1]X_I + [?]S_F + [?]S_PO4")?
            .with_reference("X_DPAO")
            .with_rate("b_DPAO*X_DPAO")?,
        ReactionTemplate::new("lysis_PP", "X_PP -> S_PO4")?
            .with_reference("S_PO4")
            .with_rate("b_PP*X_PP")?,
        ReactionTemplate::new("lysis_PHA", "X_PHA -> S_F + [?]S_PO4")?
            .with_reference("S_F")
            .with_rate("b_PHA*X_PHA")?,
    ])
}

pub fn cando(registry: &Arc<ComponentRegistry>) -> Result<ProcessCollection, KineticsError> {
    ProcessCompiler::new(Arc::clone(registry))
        .parameters(&cando_parameters())
        .conserved_for(&CANDO_CONSERVED)
        .add_templates(build_cando_templates()?)
        .compile()
}
