//! # Kinetic reactor
//!
//! Plug-flow reactor treated as a batch over the hydraulic residence time. The inlet
//! concentrations are integrated with the production rates of a compiled
//! `ProcessCollection`; the outlet carries the final concentrations at the inlet
//! volumetric flow.
//!
//! Integration goes through RustedSciThe's `UniversalODESolver` (BDF by default) on the
//! symbolic production rates of the collection. `Integrator::RK4` takes fixed classical
//! Runge-Kutta steps on the numeric rates instead; it is the one integrator that also
//! handles hand-written rate laws.
//!
//! Negative concentrations within `negative_tolerance` are set to zero. The mass this
//! adds is logged and kept in `clipped_mass()`.
use crate::Components::registry::same_registry;
use crate::Kinetics::processes::ProcessCollection;
use crate::Units::unit_api::{UnitConfig, UnitOperation, check_streams};
use crate::Units::unit_errors::UnitError;
use crate::Units::waste_stream::WasteStream;
use RustedSciThe::numerical::ODE_api2::{SolverParam, SolverType, UniversalODESolver};
use RustedSciThe::numerical::Radau::Radau_main::RadauOrder;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const N_INS: usize = 1;
const N_OUTS: usize = 1;
const UNIT: &str = "kinetic reactor";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Integrator {
    /// fixed-step classical Runge-Kutta on the numeric rates
    RK4,
    #[default]
    BDF,
    BackwardEuler,
    /// explicit adaptive Runge-Kutta 4(5)
    RK45,
    Radau3,
    Radau7,
}

impl Integrator {
    /// `None` for the built-in RK4
    fn solver_type(&self) -> Option<SolverType> {
        match self {
            Integrator::RK4 => None,
            Integrator::BDF => Some(SolverType::BDF),
            Integrator::BackwardEuler => Some(SolverType::BackwardEuler),
            Integrator::RK45 => Some(SolverType::NonStiff("RK45".to_owned())),
            Integrator::Radau3 => Some(SolverType::Radau(RadauOrder::Order3)),
            Integrator::Radau7 => Some(SolverType::Radau(RadauOrder::Order7)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KineticReactorConfig {
    /// hydraulic residence time, d
    pub residence_time: f64,
    /// RK4 steps over the residence time; for the other integrators the residence time
    /// divided by `steps` is the largest step
    pub steps: usize,
    /// negative concentrations above `-negative_tolerance` (g/m3) are clipped to zero
    pub negative_tolerance: f64,
    pub integrator: Integrator,
    /// relative and absolute tolerances of the adaptive integrators
    pub rtol: f64,
    pub atol: f64,
}

impl Default for KineticReactorConfig {
    fn default() -> Self {
        KineticReactorConfig {
            residence_time: 0.25,
            steps: 200,
            negative_tolerance: 1e-6,
            integrator: Integrator::default(),
            rtol: 1e-6,
            atol: 1e-8,
        }
    }
}

impl UnitConfig for KineticReactorConfig {
    fn validate(&self) -> Result<(), UnitError> {
        let invalid = |reason: String| UnitError::InvalidConfig {
            unit: UNIT.to_string(),
            reason,
        };
        if !(self.residence_time >= 0.0 && self.residence_time.is_finite()) {
            return Err(invalid(format!(
                "residence time must be non-negative, got {}",
                self.residence_time
            )));
        }
        if self.steps == 0 {
            return Err(invalid("at least one integration step is needed".to_string()));
        }
        if !(self.negative_tolerance >= 0.0) {
            return Err(invalid(format!(
                "negative tolerance must be non-negative, got {}",
                self.negative_tolerance
            )));
        }
        if !(self.rtol > 0.0 && self.atol > 0.0) {
            return Err(invalid(format!(
                "tolerances must be positive, got rtol {} and atol {}",
                self.rtol, self.atol
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct KineticReactor {
    id: String,
    config: KineticReactorConfig,
    collection: ProcessCollection,
    ins: Vec<WasteStream>,
    outs: Vec<WasteStream>,
    /// mass flow added by clipping during the last run, per component
    clipped: DVector<f64>,
}

/// Last state of a solver result whose orientation is not fixed: one row per time
/// point (matched against the time vector) or one column per time point.
fn final_state(times: Option<&DVector<f64>>, y: &DMatrix<f64>, n: usize) -> Option<DVector<f64>> {
    let points = times.map(|t| t.len());
    let by_rows = y.ncols() == n && (y.nrows() != n || points == Some(y.nrows()));
    if by_rows && y.nrows() > 0 {
        Some(y.row(y.nrows() - 1).transpose())
    } else if y.nrows() == n && y.ncols() > 0 {
        Some(y.column(y.ncols() - 1).into_owned())
    } else {
        None
    }
}

impl KineticReactor {
    pub fn new(
        id: &str,
        ins: Vec<WasteStream>,
        outs: Vec<WasteStream>,
        collection: ProcessCollection,
        config: KineticReactorConfig,
    ) -> Result<Self, UnitError> {
        check_streams(id, &ins, &outs, N_INS, N_OUTS)?;
        config.validate()?;
        if !same_registry(ins[0].registry(), collection.registry()) {
            return Err(UnitError::RegistryMismatch {
                context: format!("unit '{}' and its process collection", id),
            });
        }
        let n = collection.registry().len();
        Ok(KineticReactor {
            id: id.to_string(),
            config,
            collection,
            ins,
            outs,
            clipped: DVector::zeros(n),
        })
    }

    pub fn from_inlet(
        id: &str,
        influent: WasteStream,
        collection: ProcessCollection,
        config: KineticReactorConfig,
    ) -> Result<Self, UnitError> {
        let effluent = WasteStream::empty(&format!("{}_effluent", id), influent.registry())?;
        KineticReactor::new(id, vec![influent], vec![effluent], collection, config)
    }

    pub fn config(&self) -> &KineticReactorConfig {
        &self.config
    }

    pub fn collection(&self) -> &ProcessCollection {
        &self.collection
    }

    /// Parameter changes take effect on the next run.
    pub fn collection_mut(&mut self) -> &mut ProcessCollection {
        &mut self.collection
    }

    pub fn effluent(&self) -> &WasteStream {
        &self.outs[0]
    }

    /// Mass flow per component (units of the stream masses) that clipping added to the
    /// outlet in the last run. The outlet exceeds the inlet balance by exactly this.
    pub fn clipped_mass(&self) -> &DVector<f64> {
        &self.clipped
    }

    fn derivative(&self, c: &DVector<f64>) -> Result<DVector<f64>, UnitError> {
        Ok(self.collection.production_rates(c.as_slice())?)
    }

    /// Clips round-off negatives and adds what was clipped (g/m3) to `clipped`;
    /// fails on real negatives and on non-finite values.
    fn clip(&self, c: &mut DVector<f64>, clipped: &mut DVector<f64>) -> Result<(), UnitError> {
        for (i, value) in c.iter_mut().enumerate() {
            if !value.is_finite() || *value < -self.config.negative_tolerance {
                return Err(UnitError::NegativeConcentration {
                    unit: self.id.clone(),
                    component: self.collection.registry().components()[i].id.clone(),
                    value: *value,
                });
            }
            if *value < 0.0 {
                debug!(
                    "{}: clipping {} from {:e} g/m3 to zero",
                    self.id,
                    self.collection.registry().components()[i].id,
                    value
                );
                clipped[i] -= *value;
                *value = 0.0;
            }
        }
        Ok(())
    }

    /// Concentrations (g/m3) after the residence time, starting from `c0`, and the
    /// concentration clipping added to each component.
    pub fn integrate(&self, c0: DVector<f64>) -> Result<(DVector<f64>, DVector<f64>), UnitError> {
        let mut clipped = DVector::zeros(c0.len());
        if self.config.residence_time == 0.0 {
            return Ok((c0, clipped));
        }
        let mut c = match self.config.integrator.solver_type() {
            None => self.integrate_rk4(c0, &mut clipped)?,
            Some(solver_type) => self.integrate_with_solver(c0, solver_type)?,
        };
        self.clip(&mut c, &mut clipped)?;
        Ok((c, clipped))
    }

    fn integrate_rk4(
        &self,
        c0: DVector<f64>,
        clipped: &mut DVector<f64>,
    ) -> Result<DVector<f64>, UnitError> {
        let h = self.config.residence_time / self.config.steps as f64;
        let mut c = c0;
        for step in 0..self.config.steps {
            let k1 = self.derivative(&c)?;
            let k2 = self.derivative(&(&c + &k1 * (h / 2.0)))?;
            let k3 = self.derivative(&(&c + &k2 * (h / 2.0)))?;
            let k4 = self.derivative(&(&c + &k3 * h))?;
            c += (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0);
            self.clip(&mut c, clipped)?;
            if step % 50 == 0 {
                debug!("{}: step {} of {}", self.id, step, self.config.steps);
            }
        }
        Ok(c)
    }

    fn solver_params(&self) -> HashMap<String, SolverParam> {
        let h = self.config.residence_time / self.config.steps as f64;
        HashMap::from([
            ("step_size".to_owned(), SolverParam::Float(h)),
            ("tolerance".to_owned(), SolverParam::Float(self.config.atol)),
            ("max_iterations".to_owned(), SolverParam::Int(100000)),
            ("rtol".to_owned(), SolverParam::Float(self.config.rtol)),
            ("atol".to_owned(), SolverParam::Float(self.config.atol)),
            ("max_step".to_owned(), SolverParam::Float(h)),
            ("first_step".to_owned(), SolverParam::OptionalFloat(None)),
            ("vectorized".to_owned(), SolverParam::Bool(false)),
            ("jac_sparsity".to_owned(), SolverParam::OptionalMatrix(None)),
            ("parallel".to_owned(), SolverParam::Bool(true)),
        ])
    }

    fn integrate_with_solver(
        &self,
        c0: DVector<f64>,
        solver_type: SolverType,
    ) -> Result<DVector<f64>, UnitError> {
        let equations = self.collection.symbolic_production_rates()?;
        let values: Vec<String> = self
            .collection
            .registry()
            .ids()
            .iter()
            .map(|id| id.to_string())
            .collect();
        let n = values.len();
        debug!(
            "{}: {:?} over {} d, {} equations",
            self.id, self.config.integrator, self.config.residence_time, n
        );
        let mut ode = UniversalODESolver::new(
            equations,
            values,
            "t".to_owned(),
            solver_type,
            0.0,
            c0,
            self.config.residence_time,
        );
        ode.set_parameters(self.solver_params());
        ode.initialize();
        ode.solve();
        let (t, y) = ode.get_result();
        let failed = |reason: &str| UnitError::Integration {
            unit: self.id.clone(),
            reason: reason.to_string(),
        };
        let y = y.ok_or_else(|| failed("the solver returned no solution"))?;
        final_state(t.as_ref(), &y, n).ok_or_else(|| failed("solution has an unexpected shape"))
    }
}

impl UnitOperation for KineticReactor {
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
        let influent = &self.ins[0];
        if !same_registry(influent.registry(), self.collection.registry()) {
            return Err(UnitError::RegistryMismatch {
                context: format!("unit '{}', stream '{}'", self.id, influent.id),
            });
        }
        let F_vol = influent.F_vol();
        if F_vol == 0.0 {
            self.outs[0].clear();
            self.clipped.fill(0.0);
            return Ok(());
        }
        let (c_out, clipped) = self.integrate(influent.concentrations())?;
        let masses = c_out * (F_vol / 1e3);
        self.outs[0].set_masses(masses)?;
        self.outs[0].set_F_vol(F_vol)?;
        self.clipped = clipped * (F_vol / 1e3);
        if self.clipped.iter().any(|m| *m > 0.0) {
            debug!("{}: clipping added {:e} in total", self.id, self.clipped.sum());
        }
        info!(
            "{}: COD {:.2} -> {:.2} g/m3, TN {:.2} -> {:.2} g/m3",
            self.id,
            self.ins[0].COD(),
            self.outs[0].COD(),
            self.ins[0].TN(),
            self.outs[0].TN()
        );
        Ok(())
    }
}
