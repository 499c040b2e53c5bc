//! # CANDO3
//!
//! Heterotrophic denitrification in four one-electron-pair steps
//! (NO3 -> NO2 -> NO -> N2O -> N2) with NO inhibition, hydrolysis and decay, plus
//! the aerobic PAO metabolism (PHA storage, polyphosphate storage, growth, lysis).
//! Conserved COD, N, P and charge.
//!
//! Two anoxic PAO processes do not fit the template rate grammar cleanly (their oxygen
//! switch is the product of an activation and an inverse term) and are added with
//! hand-written rate laws through `ProcessCompiler::extend`. Their stoichiometry is
//! still solved from the template, over COD, N, P, NOD and charge.
use crate::Components::component::ConservedQuantity;
use crate::Components::component_errors::ComponentError;
use crate::Components::registry::ComponentRegistry;
use crate::Kinetics::kinetics_errors::{KineticsError, NumericDomainError};
use crate::Kinetics::parameters::{ParameterSpec, specs};
use crate::Kinetics::process::{CustomRate, Process};
use crate::Kinetics::processes::{ProcessCollection, ProcessCompiler};
use crate::Kinetics::reaction_template::ReactionTemplate;
use crate::Models::derive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const CANDO3_CONSERVED: [ConservedQuantity; 4] = [
    ConservedQuantity::COD,
    ConservedQuantity::N,
    ConservedQuantity::P,
    ConservedQuantity::Charge,
];

/// quantities of the two hand-written anoxic PAO processes
pub const ANOXIC_PAO_CONSERVED: [ConservedQuantity; 5] = [
    ConservedQuantity::COD,
    ConservedQuantity::N,
    ConservedQuantity::P,
    ConservedQuantity::NOD,
    ConservedQuantity::Charge,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cando3Options {
    /// nitrogen content of heterotrophs and PAO, g N/g COD
    pub i_NBM: f64,
    /// phosphorus content of heterotrophs and PAO, g P/g COD
    pub i_PBM: f64,
    /// nitrogen content of inerts, g N/g COD
    pub i_NXI: f64,
    /// nitrogen content of slowly biodegradable substrate, g N/g COD
    pub i_NXS: f64,
    /// TSS/COD ratio of inerts
    pub fr_SS_COD: f64,
}

impl Default for Cando3Options {
    fn default() -> Self {
        Cando3Options {
            i_NBM: 0.07,
            i_PBM: 0.02,
            i_NXI: 0.02,
            i_NXS: 0.04,
            fr_SS_COD: 0.75,
        }
    }
}

pub fn cando3_components(options: &Cando3Options) -> Result<ComponentRegistry, ComponentError> {
    let defaults = ComponentRegistry::load_default()?;
    let same = |id: &str, description: &str| derive(&defaults, id, id, description);
    let components = vec![
        same("S_NO3", "nitrate")?,
        same("S_NO2", "nitrite")?,
        same("S_NH4", "ammonium")?,
        same("S_O2", "dissolved oxygen")?,
        same("S_NO", "nitric oxide")?,
        same("S_N2O", "nitrous oxide")?,
        same("S_N2", "dinitrogen")?,
        same("S_F", "fermentable substrate")?,
        same("S_PO4", "phosphate")?,
        same("S_Ac", "acetate")?,
        derive(&defaults, "S_CO3", "S_ALK", "alkalinity")?,
        derive(&defaults, "X_PAO_PHA", "X_PHA", "polyhydroxyalkanoates")?,
        derive(&defaults, "X_PAO_PP", "X_PP", "polyphosphate")?,
        derive(&defaults, "X_U_Inf", "X_I", "residual inert biomass")?
            .with_i_N(options.i_NXI)
            .with_i_mass(options.fr_SS_COD),
        derive(&defaults, "X_OHO", "X_H", "heterotrophic biomass")?
            .with_i_N(options.i_NBM)
            .with_i_P(options.i_PBM),
        same("X_PAO", "phosphorus accumulating organisms")?
            .with_i_N(options.i_NBM)
            .with_i_P(options.i_PBM),
        derive(&defaults, "X_B_Subst", "X_S", "slowly biodegradable substrate")?
            .with_i_N(options.i_NXS),
        defaults.get("H2O")?.clone(),
    ];
    ComponentRegistry::from_components(components)?.compiled()
}

pub fn cando3_parameters() -> Vec<ParameterSpec> {
    specs(&[
        ("k_H", 0.125, "1/d", "hydrolysis rate constant"),
        ("k_X", 1.0, "g COD/g COD", "hydrolysis half saturation"),
        ("mu_H", 0.26, "1/d", "heterotrophic maximum growth rate"),
        ("b_H", 0.017, "1/d", "heterotrophic decay rate"),
        ("nu_H1", 0.28, "-", "anoxic reduction factor, NO3 step"),
        ("nu_H2", 0.16, "-", "anoxic reduction factor, NO2 step"),
        ("nu_H3", 0.35, "-", "anoxic reduction factor, NO step"),
        ("nu_H4", 0.35, "-", "anoxic reduction factor, N2O step"),
        ("k_OH1", 0.1, "g O2/m3", "oxygen half saturation, aerobic growth"),
        ("k_OH2", 0.1, "g O2/m3", "oxygen inhibition, NO3 step"),
        ("k_OH3", 0.1, "g O2/m3", "oxygen inhibition, NO2 step"),
        ("k_OH4", 0.1, "g O2/m3", "oxygen inhibition, NO step"),
        ("k_OH5", 0.1, "g O2/m3", "oxygen inhibition, N2O step"),
        ("k_S1", 20.0, "g COD/m3", "substrate half saturation, aerobic growth"),
        ("k_S2", 20.0, "g COD/m3", "substrate half saturation, NO3 step"),
        ("k_S3", 20.0, "g COD/m3", "substrate half saturation, NO2 step"),
        ("k_S4", 20.0, "g COD/m3", "substrate half saturation, NO step"),
        ("k_S5", 40.0, "g COD/m3", "substrate half saturation, N2O step"),
        ("k_HB_NO3", 0.2, "g N/m3", "nitrate half saturation"),
        ("k_HB_NO2", 0.2, "g N/m3", "nitrite half saturation"),
        ("k_HB_NO", 0.05, "g N/m3", "nitric oxide half saturation"),
        ("k_HB_N2O", 0.05, "g N/m3", "nitrous oxide half saturation"),
        ("k_HB_I1_NO", 0.5, "g N/m3", "NO inhibition of the NO2 step"),
        ("k_HB_I2_NO", 0.3, "g N/m3", "NO self-inhibition of the NO step"),
        ("k_HB_I3_NO", 0.075, "g N/m3", "NO inhibition of the N2O step"),
        ("Y_PHA", 0.2, "g COD/g P", "PHA consumed per polyphosphate stored"),
        ("Y_PAO", 0.625, "g COD/g COD", "PAO yield on PHA"),
        ("Y_PO4", 0.4, "g P/g COD", "phosphate released per PHA stored"),
        ("f_XI", 0.1, "-", "inert fraction of decayed biomass"),
        ("Y_H", 0.6, "g COD/g COD", "heterotrophic yield"),
        ("b_PAO", 0.2, "1/d", "PAO lysis rate"),
        ("b_PP", 0.2, "1/d", "polyphosphate lysis rate"),
        ("b_PHA", 0.2, "1/d", "PHA lysis rate"),
        ("k_PP", 0.01, "g P/g COD", "polyphosphate half saturation"),
        ("q_PHA", 3.0, "1/d", "PHA storage rate constant"),
        ("k_A", 4.0, "g COD/m3", "acetate half saturation"),
        ("k_ALK", 0.1, "mol/m3", "alkalinity half saturation"),
        ("q_PP", 1.5, "1/d", "polyphosphate storage rate constant"),
        ("k_PS", 0.2, "g P/m3", "phosphate half saturation for storage"),
        ("k_MAX", 0.34, "g P/g COD", "maximum polyphosphate content"),
        ("k_P", 0.01, "g P/m3", "phosphate half saturation for growth"),
        ("k_IPP", 0.02, "g P/g COD", "polyphosphate storage inhibition"),
        ("k_O2", 0.2, "g O2/m3", "oxygen half saturation, PAO"),
        ("k_NO3", 0.5, "g N/m3", "nitrate half saturation, PAO"),
        ("k_PHA", 0.01, "g COD/g COD", "PHA half saturation"),
        ("n_NO3", 0.6, "-", "anoxic reduction factor, PAO"),
        ("mu_PAO", 1.0, "1/d", "PAO maximum growth rate"),
        ("k_NH4", 0.05, "g N/m3", "ammonium half saturation, PAO"),
    ])
}

fn anoxic_growth(
    id: &str,
    oxidant: &str,
    product: &str,
    electrons: f64,
    step: usize,
    nitric_oxide: &str,
) -> Result<ReactionTemplate, KineticsError> {
    ReactionTemplate::new(
        id,
        &format!(
            "[1/Y_H]S_F + [?]{ox} + [?]S_NH4 + [?]S_PO4 -> X_H + [(1-Y_H)/({e}*Y_H)]{product} + [?]S_ALK",
            ox = oxidant,
            e = electrons,
            product = product
        ),
    )?
    .with_reference("X_H")
    .with_rate(&format!(
        "mu_H*nu_H{step}*S_F/(k_S{s} + S_F)*k_OH{s}/(k_OH{s} + S_O2)*{no}*X_H",
        step = step,
        s = step + 1,
        no = nitric_oxide
    ))
}

pub fn build_cando3_templates() -> Result<Vec<ReactionTemplate>, KineticsError> {
    Ok(vec![
        ReactionTemplate::new("hydrolysis", "X_S -> [?]S_F + [?]S_NH4 + [?]S_PO4 + [?]S_ALK")?
            .with_reference("X_S")
            .with_rate("k_H*X_S/(k_X*X_H + X_S)*X_H")?,
        ReactionTemplate::new(
            "aero_growth_H",
            "[1/Y_H]S_F + [?]S_O2 + [?]S_NH4 + [?]S_PO4 -> X_H + [?]S_ALK",
        )?
        .with_reference("X_H")
        .with_rate("mu_H*S_F/(k_S1 + S_F)*S_O2/(k_OH1 + S_O2)*X_H")?,
        anoxic_growth(
            "anox_growth_NO3",
            "S_NO3",
            "S_NO2",
            1.14,
            1,
            "S_NO3/(k_HB_NO3 + S_NO3)",
        )?,
        anoxic_growth(
            "anox_growth_NO2",
            "S_NO2",
            "S_NO",
            0.57,
            2,
            "S_NO2/(k_HB_NO2 + S_NO2)*k_HB_I1_NO/(k_HB_I1_NO + S_NO)",
        )?,
        anoxic_growth(
            "anox_growth_NO",
            "S_NO",
            "S_N2O",
            0.57,
            3,
            "S_NO/(k_HB_NO + S_NO + S_NO^2/k_HB_I2_NO)",
        )?,
        anoxic_growth(
            "anox_growth_N2O",
            "S_N2O",
            "S_N2",
            0.57,
            4,
            "S_N2O/(k_HB_N2O + S_N2O)*k_HB_I3_NO/(k_HB_I3_NO + S_NO)",
        )?,
        ReactionTemplate::new(
            "decay_H",
            "X_H -> [f_XI]X_I + [?]X_S + [?]S_NH4 + [?]S_PO4 + [?]S_ALK",
        )?
        .with_reference("X_H")
        .with_rate("b_H*X_H")?,
        ReactionTemplate::new("storage_PHA", "S_Ac + [Y_PO4]X_PP -> X_PHA + [?]S_PO4 + [?]S_ALK")?
            .with_reference("X_PHA")
            .with_rate(
                "q_PHA*S_Ac/(k_A + S_Ac)*S_ALK/(k_ALK + S_ALK)*X_PP/(k_PP*X_PAO + X_PP)*X_PAO",
            )?,
        ReactionTemplate::new(
            "aero_storage_PP",
            "S_PO4 + [Y_PHA]X_PHA + [?]S_O2 -> X_PP + [?]S_ALK",
        )?
        .with_reference("X_PP")
        .with_rate(
            "q_PP*S_O2/(k_O2 + S_O2)*S_PO4/(k_PS + S_PO4)*S_ALK/(k_ALK + S_ALK)*X_PHA/(k_PHA*X_PAO + X_PHA)*(k_MAX*X_PAO - X_PP)/(k_IPP*X_PAO + k_MAX*X_PAO - X_PP)*X_PAO",
        )?,
        ReactionTemplate::new(
            "aero_growth_PAO",
            "[1/Y_PAO]X_PHA + [?]S_O2 + [?]S_NH4 + [?]S_PO4 -> X_PAO + [?]S_ALK",
        )?
        .with_reference("X_PAO")
        .with_rate(
            "mu_PAO*S_O2/(k_O2 + S_O2)*S_NH4/(k_NH4 + S_NH4)*S_PO4/(k_P + S_PO4)*S_ALK/(k_ALK + S_ALK)*X_PHA/(k_PHA*X_PAO + X_PHA)*X_PAO",
        )?,
        ReactionTemplate::new(
            "lysis_PAO",
            "X_PAO -> [f_XI]X_I + [?]X_S + [?]S_NH4 + [?]S_PO4 + [?]S_ALK",
        )?
        .with_reference("X_PAO")
        .with_rate("b_PAO*X_PAO")?,
        ReactionTemplate::new("lysis_PP", "X_PP -> S_PO4 + [?]S_ALK")?
            .with_reference("S_PO4")
            .with_rate("b_PP*X_PP")?,
        ReactionTemplate::new("lysis_PHA", "X_PHA -> S_Ac + [?]S_ALK")?
            .with_reference("S_Ac")
            .with_rate("b_PHA*X_PHA")?,
    ])
}

fn ratio(numerator: f64, denominator: f64) -> Result<f64, NumericDomainError> {
    if denominator == 0.0 {
        return Err(NumericDomainError::DivisionByZero { numerator });
    }
    Ok(numerator / denominator)
}

fn select(names: &[&str]) -> Result<Vec<ParameterSpec>, KineticsError> {
    let all = cando3_parameters();
    names
        .iter()
        .map(|name| {
            all.iter()
                .find(|p| p.name == *name)
                .cloned()
                .ok_or_else(|| KineticsError::UnknownParameter(name.to_string()))
        })
        .collect()
}

/// Anoxic polyphosphate storage on nitrate.
pub fn anox_storage_PP(registry: &Arc<ComponentRegistry>) -> Result<Process, KineticsError> {
    let template = ReactionTemplate::new(
        "anox_storage_PP",
        "S_PO4 + [Y_PHA]X_PHA + [?]S_NO3 -> X_PP + [?]S_N2 + [?]S_NH4 + [?]S_ALK",
    )?
    .with_reference("X_PP");
    let parameters = select(&[
        "Y_PHA", "q_PP", "k_O2", "k_PS", "k_ALK", "k_PHA", "n_NO3", "k_IPP", "k_NO3", "k_MAX",
    ])?;
    let at = registry.indices(&["S_O2", "S_PO4", "S_ALK", "S_NO3", "X_PHA", "X_PP", "X_PAO"])?;
    let (s_o2, s_po4, s_alk, s_no3, x_pha, x_pp, x_pao) =
        (at[0], at[1], at[2], at[3], at[4], at[5], at[6]);
    let rate = CustomRate::new("anoxic PP storage", move |c: &[f64], p: &[f64]| {
        let (q_pp, k_o2, k_ps, k_alk, k_pha, n_no3, k_ipp, k_no3, k_max) =
            (p[1], p[2], p[3], p[4], p[5], p[6], p[7], p[8], p[9]);
        let capacity = k_max * c[x_pao] - c[x_pp];
        Ok(q_pp
            * ratio(k_o2, k_o2 + c[s_o2])?
            * ratio(c[s_po4], k_ps + c[s_po4])?
            * ratio(c[s_alk], k_alk + c[s_alk])?
            * ratio(c[x_pha], k_pha * c[x_pao] + c[x_pha])?
            * ratio(capacity, k_ipp * c[x_pao] + capacity)?
            * c[x_pao]
            * n_no3
            * ratio(c[s_no3], k_no3 + c[s_no3])?)
    });
    Process::custom(&template, registry, &parameters, &ANOXIC_PAO_CONSERVED, rate)
}

/// Anoxic PAO growth on stored PHA with nitrate as electron acceptor.
pub fn anox_growth_PAO(registry: &Arc<ComponentRegistry>) -> Result<Process, KineticsError> {
    let template = ReactionTemplate::new(
        "anox_growth_PAO",
        "[1/Y_PAO]X_PHA + [?]S_NO3 + [?]S_PO4 -> X_PAO + [?]S_N2 + [?]S_NH4 + [?]S_ALK",
    )?
    .with_reference("X_PAO");
    let parameters = select(&[
        "Y_PAO", "mu_PAO", "k_O2", "k_NH4", "k_P", "k_ALK", "k_PHA", "n_NO3", "k_NO3",
    ])?;
    let at = registry.indices(&["S_O2", "S_NH4", "S_PO4", "S_ALK", "S_NO3", "X_PHA", "X_PAO"])?;
    let (s_o2, s_nh4, s_po4, s_alk, s_no3, x_pha, x_pao) =
        (at[0], at[1], at[2], at[3], at[4], at[5], at[6]);
    let rate = CustomRate::new("anoxic PAO growth", move |c: &[f64], p: &[f64]| {
        let (mu_pao, k_o2, k_nh4, k_p, k_alk, k_pha, n_no3, k_no3) =
            (p[1], p[2], p[3], p[4], p[5], p[6], p[7], p[8]);
        Ok(mu_pao
            * ratio(k_o2, k_o2 + c[s_o2])?
            * ratio(c[s_nh4], k_nh4 + c[s_nh4])?
            * ratio(c[s_po4], k_p + c[s_po4])?
            * ratio(c[s_alk], k_alk + c[s_alk])?
            * ratio(c[x_pha], k_pha * c[x_pao] + c[x_pha])?
            * c[x_pao]
            * n_no3
            * ratio(c[s_no3], k_no3 + c[s_no3])?)
    });
    Process::custom(&template, registry, &parameters, &ANOXIC_PAO_CONSERVED, rate)
}

pub fn cando3(registry: &Arc<ComponentRegistry>) -> Result<ProcessCollection, KineticsError> {
    ProcessCompiler::new(Arc::clone(registry))
        .parameters(&cando3_parameters())
        .conserved_for(&CANDO3_CONSERVED)
        .add_templates(build_cando3_templates()?)
        .extend(vec![anox_storage_PP(registry)?, anox_growth_PAO(registry)?])?
        .compile()
}
