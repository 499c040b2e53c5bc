//! # Anaerobic reactor
//!
//! Lumped anaerobic treatment with biogas production, e.g. a baffled reactor or a
//! digestion pond. One inlet (waste) and four outlets: treated liquid, captured biogas,
//! fugitive methane and fugitive nitrous oxide.
//!
//! A fraction `COD_removal` of every degraded component is broken down. Of the degraded
//! COD, `MCF_decay * max_CH4_emission` kg CH4 per kg COD become methane; the degraded
//! carbon not found in methane leaves as CO2 in the biogas. Organic nitrogen and
//! phosphorus of the degraded matter are released as ammonia and phosphate.
//! Nitrogen removal is then drawn from ammonia first and from the other nitrogen
//! species proportionally; the removed nitrogen leaves as N2O (fugitive) and N2
//! (biogas). Carbon, nitrogen and phosphorus are closed over the unit.
use crate::Components::component::{ConservedQuantity, MeasuredAs};
use crate::Components::registry::ComponentRegistry;
use crate::Units::decay::{allocate_N_removal, first_order_decay};
use crate::Units::unit_api::{UnitConfig, UnitOperation, check_fraction, check_streams};
use crate::Units::unit_errors::UnitError;
use crate::Units::waste_stream::WasteStream;
use log::{info, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

const N_INS: usize = 1;
const N_OUTS: usize = 4;
const UNIT: &str = "anaerobic reactor";
/// kg CH4 per kg COD when all COD ends up in methane
const CH4_PER_COD: f64 = 16.043 / 64.0;

/// First-order decay of nitrogen over the residence time, scaling `N_removal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NitrogenDecay {
    /// 1/yr
    pub k: f64,
    /// residence time, yr
    pub t: f64,
    pub max_decay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnaerobicReactorConfig {
    pub COD_removal: f64,
    /// methane correction factor of the decay
    pub MCF_decay: f64,
    /// kg CH4/kg COD degraded
    pub max_CH4_emission: f64,
    /// fraction of produced methane captured in the biogas, the rest is fugitive
    pub CH4_capture: f64,
    /// fraction of the treated total nitrogen removed
    pub N_removal: f64,
    /// fraction of the removed nitrogen emitted as N2O
    pub N2O_EF_decay: f64,
    pub N_decay: Option<NitrogenDecay>,
    /// empty: every degradable organic component of the registry except dissolved gases
    pub degraded_components: Vec<String>,
    pub ammonia_component: String,
    pub methane_component: String,
    pub carbon_dioxide_component: String,
    pub nitrous_oxide_component: String,
    pub nitrogen_gas_component: String,
    pub phosphate_component: String,
}

impl Default for AnaerobicReactorConfig {
    fn default() -> Self {
        AnaerobicReactorConfig {
            COD_removal: 0.8,
            MCF_decay: 0.8,
            max_CH4_emission: 0.25,
            CH4_capture: 1.0,
            N_removal: 0.0,
            N2O_EF_decay: 0.005,
            N_decay: None,
            degraded_components: Vec::new(),
            ammonia_component: "S_NH4".to_string(),
            methane_component: "S_CH4".to_string(),
            carbon_dioxide_component: "S_CO2".to_string(),
            nitrous_oxide_component: "S_N2O".to_string(),
            nitrogen_gas_component: "S_N2".to_string(),
            phosphate_component: "S_PO4".to_string(),
        }
    }
}

impl UnitConfig for AnaerobicReactorConfig {
    fn validate(&self) -> Result<(), UnitError> {
        for (name, value) in [
            ("COD_removal", self.COD_removal),
            ("MCF_decay", self.MCF_decay),
            ("CH4_capture", self.CH4_capture),
            ("N_removal", self.N_removal),
            ("N2O_EF_decay", self.N2O_EF_decay),
        ] {
            check_fraction(UNIT, name, value)?;
        }
        if !(0.0..=CH4_PER_COD).contains(&self.max_CH4_emission) {
            return Err(UnitError::InvalidConfig {
                unit: UNIT.to_string(),
                reason: format!(
                    "max_CH4_emission must lie in [0, {:.4}] kg CH4/kg COD, got {}",
                    CH4_PER_COD, self.max_CH4_emission
                ),
            });
        }
        if let Some(decay) = &self.N_decay {
            if !(decay.k >= 0.0 && decay.t >= 0.0) {
                return Err(UnitError::InvalidConfig {
                    unit: UNIT.to_string(),
                    reason: format!("decay constant and time must be non-negative: {:?}", decay),
                });
            }
            check_fraction(UNIT, "N_decay.max_decay", decay.max_decay)?;
        }
        Ok(())
    }
}

/// Flows of the last run, kg/hr.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnaerobicResults {
    pub COD_degraded: f64,
    /// kg CH4/hr
    pub CH4_produced: f64,
    pub CH4_captured: f64,
    pub CH4_fugitive: f64,
    /// kg C/hr
    pub CO2_C: f64,
    /// kg N/hr
    pub N_removed: f64,
    pub N2O_N: f64,
    pub N2_N: f64,
}

/// registry positions of the components the reactor writes
#[derive(Debug, Clone)]
struct Targets {
    degraded: Vec<usize>,
    ammonia: usize,
    methane: usize,
    carbon_dioxide: usize,
    nitrous_oxide: usize,
    nitrogen_gas: usize,
    phosphate: usize,
    /// nitrogen species other than ammonia that removal may draw from
    nitrogen_pool: Vec<usize>,
}

impl Targets {
    fn resolve(
        unit: &str,
        registry: &ComponentRegistry,
        config: &AnaerobicReactorConfig,
    ) -> Result<Targets, UnitError> {
        let find = |id: &str| {
            registry.index(id).map_err(|_| UnitError::MissingComponent {
                unit: unit.to_string(),
                component: id.to_string(),
            })
        };
        let degraded = if config.degraded_components.is_empty() {
            registry
                .iter()
                .enumerate()
                .filter(|(_, c)| c.organic && c.degradability.is_degradable() && !c.is_gas())
                .map(|(i, _)| i)
                .collect()
        } else {
            config
                .degraded_components
                .iter()
                .map(|id| find(id))
                .collect::<Result<Vec<usize>, UnitError>>()?
        };
        let targets = Targets {
            ammonia: find(&config.ammonia_component)?,
            methane: find(&config.methane_component)?,
            carbon_dioxide: find(&config.carbon_dioxide_component)?,
            nitrous_oxide: find(&config.nitrous_oxide_component)?,
            nitrogen_gas: find(&config.nitrogen_gas_component)?,
            phosphate: find(&config.phosphate_component)?,
            nitrogen_pool: Vec::new(),
            degraded,
        };
        let components = registry.components();
        for (i, quantity) in [
            (targets.ammonia, ConservedQuantity::N),
            (targets.nitrous_oxide, ConservedQuantity::N),
            (targets.nitrogen_gas, ConservedQuantity::N),
            (targets.phosphate, ConservedQuantity::P),
            (targets.carbon_dioxide, ConservedQuantity::C),
            (targets.methane, ConservedQuantity::C),
            (targets.methane, ConservedQuantity::Mass),
        ] {
            if components[i].factor(quantity) <= 0.0 {
                return Err(UnitError::InvalidConfig {
                    unit: unit.to_string(),
                    reason: format!("component {} carries no {}", components[i].id, quantity),
                });
            }
        }
        let excluded = [targets.ammonia, targets.nitrous_oxide, targets.nitrogen_gas];
        let nitrogen_pool = components
            .iter()
            .enumerate()
            .filter(|(i, c)| {
                !excluded.contains(i)
                    && c.i_N > 0.0
                    && matches!(&c.measured_as, MeasuredAs::Element(e) if e == "N")
            })
            .map(|(i, _)| i)
            .collect();
        Ok(Targets {
            nitrogen_pool,
            ..targets
        })
    }
}

#[derive(Debug, Clone)]
pub struct AnaerobicReactor {
    id: String,
    config: AnaerobicReactorConfig,
    targets: Targets,
    ins: Vec<WasteStream>,
    outs: Vec<WasteStream>,
    results: AnaerobicResults,
}

impl AnaerobicReactor {
    /// Unit with explicit inlet (waste) and outlets (treated, biogas, fugitive CH4,
    /// fugitive N2O).
    pub fn new(
        id: &str,
        ins: Vec<WasteStream>,
        outs: Vec<WasteStream>,
        config: AnaerobicReactorConfig,
    ) -> Result<Self, UnitError> {
        check_streams(id, &ins, &outs, N_INS, N_OUTS)?;
        config.validate()?;
        let targets = Targets::resolve(id, ins[0].registry(), &config)?;
        Ok(AnaerobicReactor {
            id: id.to_string(),
            config,
            targets,
            ins,
            outs,
            results: AnaerobicResults::default(),
        })
    }

    /// Unit with empty outlets named after the unit.
    pub fn from_inlet(
        id: &str,
        waste: WasteStream,
        config: AnaerobicReactorConfig,
    ) -> Result<Self, UnitError> {
        let registry = waste.registry().clone();
        let outs = ["treated", "biogas", "CH4", "N2O"]
            .iter()
            .map(|suffix| WasteStream::empty(&format!("{}_{}", id, suffix), &registry))
            .collect::<Result<Vec<_>, _>>()?;
        AnaerobicReactor::new(id, vec![waste], outs, config)
    }

    pub fn config(&self) -> &AnaerobicReactorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AnaerobicReactorConfig) -> Result<(), UnitError> {
        config.validate()?;
        self.targets = Targets::resolve(&self.id, self.ins[0].registry(), &config)?;
        self.config = config;
        Ok(())
    }

    pub fn results(&self) -> &AnaerobicResults {
        &self.results
    }

    pub fn treated(&self) -> &WasteStream {
        &self.outs[0]
    }

    pub fn biogas(&self) -> &WasteStream {
        &self.outs[1]
    }

    pub fn fugitive_CH4(&self) -> &WasteStream {
        &self.outs[2]
    }

    pub fn fugitive_N2O(&self) -> &WasteStream {
        &self.outs[3]
    }

    fn N_removal_fraction(&self) -> f64 {
        match &self.config.N_decay {
            Some(decay) => {
                self.config.N_removal * first_order_decay(decay.k, decay.t, decay.max_decay, 1.0)
            }
            None => self.config.N_removal,
        }
    }
}

impl UnitOperation for AnaerobicReactor {
    fn id(&self) -> &str {
        &self.id
    }

    fn n_ins(&self) -> usize {
        N_INS
    }

    fn n_outs(&self) -> usize {
        N_OUTS
    }

    fn ins(&self) -> &[WasteStream] {
        &self.ins
    }

    fn ins_mut(&mut self) -> &mut [WasteStream] {
        &mut self.ins
    }

    fn outs(&self) -> &[WasteStream] {
        &self.outs
    }

    fn run(&mut self) -> Result<(), UnitError> {
        check_streams(&self.id, &self.ins, &self.outs, N_INS, N_OUTS)?;
        let N_fraction = self.N_removal_fraction();
        let config = &self.config;
        let t = &self.targets;
        let waste = &self.ins[0];
        let registry = waste.registry().clone();
        let components = registry.components();
        let mut treated = waste.masses().clone();

        // decay of the degraded matter
        let (mut COD, mut C, mut N, mut P) = (0.0, 0.0, 0.0, 0.0);
        for &i in &t.degraded {
            let degraded = treated[i] * config.COD_removal;
            let c = &components[i];
            COD += degraded * c.i_COD;
            C += degraded * c.i_C;
            N += degraded * c.i_N;
            P += degraded * c.i_P;
            treated[i] -= degraded;
        }

        let methane = &components[t.methane];
        let CH4_produced = COD.max(0.0) * config.MCF_decay * config.max_CH4_emission;
        let CH4_measured = CH4_produced / methane.i_mass;
        let CO2_C = C - CH4_measured * methane.i_C;
        if CO2_C < -1e-12 {
            return Err(UnitError::InvalidConfig {
                unit: self.id.clone(),
                reason: format!(
                    "methane carries more carbon ({} kg/hr) than the degraded matter ({} kg/hr)",
                    CH4_measured * methane.i_C,
                    C
                ),
            });
        }
        let CO2_C = CO2_C.max(0.0);
        treated[t.ammonia] += N / components[t.ammonia].i_N;
        treated[t.phosphate] += P / components[t.phosphate].i_P;

        // nitrogen removal, ammonia first
        let N_total = registry.conversion_factors(ConservedQuantity::N).dot(&treated);
        let target = N_total * N_fraction;
        let i_N_NH4 = components[t.ammonia].i_N;
        let (from_ammonia, rest) = allocate_N_removal(target, treated[t.ammonia] * i_N_NH4);
        let pool_N: f64 = t
            .nitrogen_pool
            .iter()
            .map(|&j| treated[j] * components[j].i_N)
            .sum();
        let from_others = if rest > pool_N {
            warn!(
                "{}: {:.4} kg N/hr of the requested removal is not held by nitrogen species and is kept",
                self.id,
                rest - pool_N
            );
            pool_N
        } else {
            rest
        };
        treated[t.ammonia] = (treated[t.ammonia] - from_ammonia / i_N_NH4).max(0.0);
        if pool_N > 0.0 {
            let keep = 1.0 - from_others / pool_N;
            for &j in &t.nitrogen_pool {
                treated[j] *= keep;
            }
        }
        let N_removed = from_ammonia + from_others;
        let N2O_N = N_removed * config.N2O_EF_decay;
        let N2_N = N_removed - N2O_N;

        let F_vol = waste.F_vol();
        let n = registry.len();
        let mut biogas = DVector::zeros(n);
        let mut fugitive_CH4 = DVector::zeros(n);
        let mut fugitive_N2O = DVector::zeros(n);
        biogas[t.methane] = CH4_measured * config.CH4_capture;
        biogas[t.carbon_dioxide] = CO2_C / components[t.carbon_dioxide].i_C;
        biogas[t.nitrogen_gas] = N2_N / components[t.nitrogen_gas].i_N;
        fugitive_CH4[t.methane] = CH4_measured * (1.0 - config.CH4_capture);
        fugitive_N2O[t.nitrous_oxide] = N2O_N / components[t.nitrous_oxide].i_N;

        self.results = AnaerobicResults {
            COD_degraded: COD,
            CH4_produced,
            CH4_captured: CH4_produced * config.CH4_capture,
            CH4_fugitive: CH4_produced * (1.0 - config.CH4_capture),
            CO2_C,
            N_removed,
            N2O_N,
            N2_N,
        };
        for (out, masses) in self
            .outs
            .iter_mut()
            .zip([treated, biogas, fugitive_CH4, fugitive_N2O])
        {
            out.set_masses(masses)?;
            out.set_F_vol(0.0)?;
        }
        self.outs[0].set_F_vol(F_vol)?;
        info!(
            "{}: {:.4} kg COD/hr degraded, {:.4} kg CH4/hr, {:.4} kg N/hr removed",
            self.id, self.results.COD_degraded, self.results.CH4_produced, self.results.N_removed
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Units::unit_api::quantity_residual;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn registry() -> Arc<ComponentRegistry> {
        let defaults = ComponentRegistry::load_default().unwrap();
        Arc::new(
            defaults
                .subgroup(&[
                    "S_F", "X_B_Subst", "S_U_Inf", "S_NH4", "S_NO3", "S_CH4", "S_CO2", "S_N2O",
                    "S_N2", "S_PO4", "H2O",
                ])
                .unwrap(),
        )
    }

    fn waste(registry: &Arc<ComponentRegistry>) -> WasteStream {
        WasteStream::from_concentrations(
            "waste",
            registry,
            &[("X_B_Subst", 1000.0), ("S_NH4", 30.0), ("S_NO3", 10.0), ("H2O", 1e6)],
            10.0,
        )
        .unwrap()
    }

    fn reactor(config: AnaerobicReactorConfig) -> AnaerobicReactor {
        let registry = registry();
        let config = AnaerobicReactorConfig {
            degraded_components: vec!["X_B_Subst".to_string()],
            ..config
        };
        AnaerobicReactor::from_inlet("ABR", waste(&registry), config).unwrap()
    }

    #[test]
    fn test_COD_removal_and_methane() {
        let mut unit = reactor(AnaerobicReactorConfig::default());
        unit.run().unwrap();
        let treated = unit.treated();
        assert_relative_eq!(treated.F_vol(), 10.0);
        assert_relative_eq!(treated.concentration("X_B_Subst").unwrap(), 200.0, epsilon = 1e-9);
        // 1000 g/m3 * 10 m3/hr * 0.8 removal
        assert_relative_eq!(unit.results().COD_degraded, 8.0, epsilon = 1e-9);
        assert_relative_eq!(unit.results().CH4_produced, 8.0 * 0.8 * 0.25, epsilon = 1e-9);
        let i_mass = treated.registry().get("S_CH4").unwrap().i_mass;
        assert_relative_eq!(
            unit.biogas().mass("S_CH4").unwrap(),
            1.6 / i_mass,
            epsilon = 1e-9
        );
        assert_eq!(unit.fugitive_CH4().mass("S_CH4").unwrap(), 0.0);
        assert_eq!(unit.biogas().F_vol(), 0.0);
    }

    #[test]
    fn test_elements_are_closed() {
        let mut unit = reactor(AnaerobicReactorConfig {
            N_removal: 0.3,
            CH4_capture: 0.7,
            ..AnaerobicReactorConfig::default()
        });
        unit.run().unwrap();
        for quantity in [ConservedQuantity::C, ConservedQuantity::N, ConservedQuantity::P] {
            assert_relative_eq!(quantity_residual(&unit, quantity), 0.0, epsilon = 1e-9);
        }
        assert!(unit.fugitive_CH4().mass("S_CH4").unwrap() > 0.0);
        assert!(unit.fugitive_N2O().mass("S_N2O").unwrap() > 0.0);
    }

    #[test]
    fn test_N_removal_draws_ammonia_first() {
        let mut unit = reactor(AnaerobicReactorConfig {
            N_removal: 0.1,
            ..AnaerobicReactorConfig::default()
        });
        unit.run().unwrap();
        let results = unit.results().clone();
        assert!(results.N_removed > 0.0);
        // nitrate untouched while ammonia covers the removal
        assert_relative_eq!(unit.treated().concentration("S_NO3").unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(results.N2O_N, results.N_removed * 0.005, epsilon = 1e-12);
        assert_relative_eq!(
            unit.biogas().mass("S_N2").unwrap(),
            results.N_removed - results.N2O_N,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_N_removal_beyond_ammonia() {
        let mut unit = reactor(AnaerobicReactorConfig {
            N_removal: 1.0,
            ..AnaerobicReactorConfig::default()
        });
        unit.run().unwrap();
        let treated = unit.treated();
        assert_relative_eq!(treated.mass("S_NH4").unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(treated.mass("S_NO3").unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(quantity_residual(&unit, ConservedQuantity::N), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_N_decay_scales_removal() {
        let decay = NitrogenDecay {
            k: 3.0,
            t: 0.1,
            max_decay: 0.8,
        };
        let fraction = first_order_decay(decay.k, decay.t, decay.max_decay, 1.0);
        let mut plain = reactor(AnaerobicReactorConfig {
            N_removal: 0.2,
            ..AnaerobicReactorConfig::default()
        });
        let mut decayed = reactor(AnaerobicReactorConfig {
            N_removal: 0.2,
            N_decay: Some(decay),
            ..AnaerobicReactorConfig::default()
        });
        plain.run().unwrap();
        decayed.run().unwrap();
        assert_relative_eq!(
            decayed.results().N_removed,
            plain.results().N_removed * fraction,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_arity_and_config_errors() {
        let registry = registry();
        let outs = vec![WasteStream::empty("treated", &registry).unwrap()];
        let err = AnaerobicReactor::new(
            "ABR",
            vec![waste(&registry)],
            outs,
            AnaerobicReactorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            UnitError::Arity {
                found_outs: 1,
                expected_outs: 4,
                ..
            }
        ));
        let bad = AnaerobicReactorConfig {
            max_CH4_emission: 0.4,
            ..AnaerobicReactorConfig::default()
        };
        assert!(matches!(bad.validate(), Err(UnitError::InvalidConfig { .. })));
        let missing = AnaerobicReactorConfig {
            ammonia_component: "S_NH3".to_string(),
            ..AnaerobicReactorConfig::default()
        };
        let err = AnaerobicReactor::from_inlet("ABR", waste(&registry), missing).unwrap_err();
        assert!(matches!(err, UnitError::MissingComponent { .. }));
    }

    #[test]
    fn test_default_degraded_components_are_degradable_organics() {
        let registry = registry();
        let unit = AnaerobicReactor::from_inlet(
            "ABR",
            waste(&registry),
            AnaerobicReactorConfig::default(),
        )
        .unwrap();
        let ids: Vec<&str> = unit
            .targets
            .degraded
            .iter()
            .map(|&i| registry.components()[i].id.as_str())
            .collect();
        assert!(ids.contains(&"S_F"));
        assert!(ids.contains(&"X_B_Subst"));
        assert!(!ids.contains(&"S_CH4"));
        assert!(!ids.contains(&"S_U_Inf"));
    }
}
