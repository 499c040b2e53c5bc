//! # Activated Sludge Model No. 1
//!
//! Henze et al. (2000) in the original notation. Eight processes over fifteen
//! components:
//!
//! | process            | reference | rate                                          |
//! |--------------------|-----------|-----------------------------------------------|
//! | aero_growth_hetero | X_BH      | mu_H M(S_S) M(S_O) X_BH                       |
//! | anox_growth_hetero | X_BH      | mu_H M(S_S) I(S_O) M(S_NO) eta_g X_BH         |
//! | aero_growth_auto   | X_BA      | mu_A M(S_NH) M(S_O) X_BA                      |
//! | hetero_decay       | X_BH      | b_H X_BH                                      |
//! | auto_decay         | X_BA      | b_A X_BA                                      |
//! | ammonification     | S_NH      | k_a S_ND X_BH                                 |
//! | hydrolysis         | S_S       | k_h X_S/(K_X X_BH + X_S) (M(S_O) + eta_h I(S_O) M(S_NO)) X_BH |
//! | hydrolysis_N       | S_ND      | hydrolysis rate times X_ND/X_S                |
//!
//! Oxygen, ammonia and alkalinity demands are left as `[?]` and solved from COD, N and
//! charge balances. The nitrogen content of biomass (`i_XB`) and of its inert residue
//! (`i_XP`) shape the component set and are therefore build options, not parameters.
use crate::Components::component::{
    Component, ConservedQuantity, Degradability, MeasuredAs, ParticleSize,
};
use crate::Components::component_errors::ComponentError;
use crate::Components::registry::ComponentRegistry;
use crate::Kinetics::kinetics_errors::KineticsError;
use crate::Kinetics::parameters::{ParameterProfile, ParameterSpec, specs};
use crate::Kinetics::processes::{ProcessCollection, ProcessCompiler};
use crate::Kinetics::reaction_template::ReactionTemplate;
use crate::Models::derive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const ASM1_CONSERVED: [ConservedQuantity; 3] = [
    ConservedQuantity::COD,
    ConservedQuantity::N,
    ConservedQuantity::Charge,
];

/// Component-shaping options of ASM1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Asm1Options {
    /// nitrogen content of active biomass, g N/g COD
    pub i_XB: f64,
    /// nitrogen content of products from biomass decay, g N/g COD
    pub i_XP: f64,
    /// TSS/COD ratio of particulate inerts
    pub fr_SS_COD: f64,
}

impl Default for Asm1Options {
    fn default() -> Self {
        Asm1Options {
            i_XB: 0.08,
            i_XP: 0.06,
            fr_SS_COD: 0.75,
        }
    }
}

/// organic nitrogen carried without COD (S_ND, X_ND)
fn organic_nitrogen(id: &str, size: ParticleSize, description: &str) -> Component {
    Component::new(
        id,
        MeasuredAs::Element("N".to_string()),
        size,
        Degradability::Readily,
        true,
    )
    .with_i_N(1.0)
    .with_description(description)
}

pub fn asm1_components(options: &Asm1Options) -> Result<ComponentRegistry, ComponentError> {
    let defaults = ComponentRegistry::load_default()?;
    let components = vec![
        derive(&defaults, "S_U_Inf", "S_I", "soluble inert organic matter")?
            .with_i_N(0.0)
            .with_i_P(0.0),
        derive(&defaults, "S_F", "S_S", "readily biodegradable substrate")?
            .with_i_N(0.0)
            .with_i_P(0.0),
        derive(&defaults, "X_U_Inf", "X_I", "particulate inert organic matter")?
            .with_i_N(options.i_XP)
            .with_i_P(0.0)
            .with_i_mass(options.fr_SS_COD),
        derive(&defaults, "X_B_Subst", "X_S", "slowly biodegradable substrate")?
            .with_i_N(0.0)
            .with_i_P(0.0),
        derive(&defaults, "X_OHO", "X_BH", "active heterotrophic biomass")?
            .with_i_N(options.i_XB)
            .with_i_P(0.0),
        derive(&defaults, "X_AOO", "X_BA", "active autotrophic biomass")?
            .with_i_N(options.i_XB)
            .with_i_P(0.0),
        derive(&defaults, "X_U_Inf", "X_P", "particulate products from biomass decay")?
            .with_i_N(options.i_XP)
            .with_i_P(0.0)
            .with_i_mass(options.fr_SS_COD),
        derive(&defaults, "S_O2", "S_O", "dissolved oxygen")?,
        derive(&defaults, "S_NO3", "S_NO", "nitrate and nitrite nitrogen")?,
        derive(&defaults, "S_NH4", "S_NH", "ammonium and ammonia nitrogen")?,
        organic_nitrogen("S_ND", ParticleSize::Soluble, "soluble biodegradable organic nitrogen"),
        organic_nitrogen(
            "X_ND",
            ParticleSize::Particulate,
            "particulate biodegradable organic nitrogen",
        ),
        derive(&defaults, "S_CO3", "S_ALK", "alkalinity")?,
        derive(&defaults, "S_N2", "S_N2", "dissolved dinitrogen")?,
        defaults.get("H2O")?.clone(),
    ];
    ComponentRegistry::from_components(components)?.compiled()
}

pub fn asm1_parameters() -> Vec<ParameterSpec> {
    specs(&[
        ("Y_A", 0.24, "g COD/g N", "autotrophic yield"),
        ("Y_H", 0.67, "g COD/g COD", "heterotrophic yield"),
        ("f_P", 0.08, "-", "fraction of biomass yielding particulate products"),
        ("mu_H", 4.0, "1/d", "heterotrophic maximum specific growth rate"),
        ("K_S", 10.0, "g COD/m3", "readily biodegradable substrate half saturation"),
        ("K_O_H", 0.2, "g O2/m3", "oxygen half saturation, heterotrophs"),
        ("K_NO", 0.5, "g N/m3", "nitrate half saturation"),
        ("b_H", 0.3, "1/d", "heterotrophic decay rate"),
        ("eta_g", 0.8, "-", "anoxic growth reduction factor"),
        ("eta_h", 0.8, "-", "anoxic hydrolysis reduction factor"),
        ("k_h", 3.0, "1/d", "hydrolysis rate constant"),
        ("K_X", 0.1, "g COD/g COD", "slowly biodegradable substrate half saturation"),
        ("mu_A", 0.5, "1/d", "autotrophic maximum specific growth rate"),
        ("K_NH", 1.0, "g N/m3", "ammonium half saturation"),
        ("b_A", 0.05, "1/d", "autotrophic decay rate"),
        ("K_O_A", 0.4, "g O2/m3", "oxygen half saturation, autotrophs"),
        ("k_a", 0.05, "m3/g COD/d", "ammonification rate constant"),
    ])
}

/// Temperature profiles. Both carry every kinetic parameter so switching between them
/// leaves nothing from the other behind.
pub fn asm1_profiles() -> Vec<ParameterProfile> {
    let common = [
        ("Y_A", 0.24),
        ("Y_H", 0.67),
        ("f_P", 0.08),
        ("K_O_H", 0.2),
        ("K_NO", 0.5),
        ("eta_g", 0.8),
        ("K_NH", 1.0),
        ("K_O_A", 0.4),
        ("b_A", 0.05),
    ];
    let profile = |name: &str, own: &[(&str, f64)]| {
        let mut values = common.to_vec();
        values.extend_from_slice(own);
        ParameterProfile::new(name, &values)
    };
    vec![
        profile(
            "20C",
            &[
                ("mu_H", 6.0),
                ("K_S", 20.0),
                ("b_H", 0.62),
                ("eta_h", 0.4),
                ("k_h", 3.0),
                ("K_X", 0.03),
                ("mu_A", 0.8),
                ("k_a", 0.08),
            ],
        ),
        profile(
            "10C",
            &[
                ("mu_H", 3.0),
                ("K_S", 20.0),
                ("b_H", 0.2),
                ("eta_h", 0.4),
                ("k_h", 1.0),
                ("K_X", 0.01),
                ("mu_A", 0.3),
                ("k_a", 0.04),
            ],
        ),
    ]
}

const HYDROLYSIS_SWITCH: &str =
    "(S_O/(K_O_H + S_O) + eta_h*K_O_H/(K_O_H + S_O)*S_NO/(K_NO + S_NO))";

pub fn build_asm1_templates() -> Result<Vec<ReactionTemplate>, KineticsError> {
    Ok(vec![
        ReactionTemplate::new(
            "aero_growth_hetero",
            "[1/Y_H]S_S + [?]S_O + [?]S_NH + [?]S_ALK -> X_BH",
        )?
        .with_reference("X_BH")
        .with_rate("mu_H*S_S/(K_S + S_S)*S_O/(K_O_H + S_O)*X_BH")?,
        ReactionTemplate::new(
            "anox_growth_hetero",
            "[1/Y_H]S_S + [?]S_NO + [?]S_NH + [?]S_ALK -> X_BH + [(1-Y_H)/(2.86*Y_H)]S_N2",
        )?
        .with_reference("X_BH")
        .with_rate(
            "mu_H*S_S/(K_S + S_S)*K_O_H/(K_O_H + S_O)*S_NO/(K_NO + S_NO)*eta_g*X_BH",
        )?,
        ReactionTemplate::new(
            "aero_growth_auto",
            "[?]S_NH + [?]S_O + [?]S_ALK -> X_BA + [1/Y_A]S_NO",
        )?
        .with_reference("X_BA")
        .with_rate("mu_A*S_NH/(K_NH + S_NH)*S_O/(K_O_A + S_O)*X_BA")?,
        ReactionTemplate::new("hetero_decay", "X_BH -> [1-f_P]X_S + [f_P]X_P + [?]X_ND")?
            .with_reference("X_BH")
            .with_rate("b_H*X_BH")?,
        ReactionTemplate::new("auto_decay", "X_BA -> [1-f_P]X_S + [f_P]X_P + [?]X_ND")?
            .with_reference("X_BA")
            .with_rate("b_A*X_BA")?,
        ReactionTemplate::new("ammonification", "S_ND + [?]S_ALK -> S_NH")?
            .with_reference("S_NH")
            .with_rate("k_a*S_ND*X_BH")?,
        ReactionTemplate::new("hydrolysis", "X_S -> S_S")?
            .with_reference("S_S")
            .with_rate(&format!(
                "k_h*X_S/(K_X*X_BH + X_S)*{}*X_BH",
                HYDROLYSIS_SWITCH
            ))?,
        ReactionTemplate::new("hydrolysis_N", "X_ND -> S_ND")?
            .with_reference("S_ND")
            .with_rate(&format!(
                "k_h*X_ND/(K_X*X_BH + X_S)*{}*X_BH",
                HYDROLYSIS_SWITCH
            ))?,
    ])
}

/// Compiles ASM1 against `registry`, which must hold every ASM1 component.
pub fn asm1(registry: &Arc<ComponentRegistry>) -> Result<ProcessCollection, KineticsError> {
    ProcessCompiler::new(Arc::clone(registry))
        .parameters(&asm1_parameters())
        .conserved_for(&ASM1_CONSERVED)
        .add_templates(build_asm1_templates()?)
        .profiles(asm1_profiles())
        .compile()
}
