//! # Process matrix compiler
//!
//! ## Aim
//! Turns an ordered list of reaction templates (plus already-built processes) into a
//! `ProcessCollection`: the dense Gujer matrix (processes x components, column order =
//! registry order), the merged parameter table and one rate law per process.
//!
//! ## Usage
//! ```text
//! let collection = ProcessCompiler::new(registry)
//!     .parameters(&specs)
//!     .conserved_for(&[COD, N, P])
//!     .add_templates(templates)
//!     .extend(vec![custom_process])?
//!     .compile()?;
//! ```
//!
//! ## Invariants
//! - every process was compiled against the collection's registry
//! - process ids are unique
//! - the numeric matrix always matches the current parameter values; the only
//!   post-compile mutation is `set_parameters` (and `apply_profile`, `reset_defaults`),
//!   which either fully succeeds or leaves the collection untouched
use crate::Components::component::ConservedQuantity;
use crate::Components::component_errors::ComponentError;
use crate::Components::registry::{ComponentRegistry, same_registry};
use crate::Kinetics::kinetics_errors::KineticsError;
use crate::Kinetics::parameters::{ParameterProfile, ParameterSpec, ParameterTable};
use crate::Kinetics::process::{Process, RateFunction};
use crate::Kinetics::rate_evaluator::RateEvaluator;
use crate::Kinetics::reaction_template::ReactionTemplate;
use crate::Kinetics::symbolic::Expr;
use log::info;
use nalgebra::{DMatrix, DVector};
use prettytable::{Cell, Row, Table};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    registry: Arc<ComponentRegistry>,
    parameters: Vec<ParameterSpec>,
    conserved_for: Vec<ConservedQuantity>,
    templates: Vec<ReactionTemplate>,
    extra: Vec<Process>,
    profiles: Vec<ParameterProfile>,
}

impl ProcessCompiler {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        ProcessCompiler {
            registry,
            parameters: Vec::new(),
            conserved_for: Vec::new(),
            templates: Vec::new(),
            extra: Vec::new(),
            profiles: Vec::new(),
        }
    }

    pub fn parameters(mut self, specs: &[ParameterSpec]) -> Self {
        self.parameters.extend_from_slice(specs);
        self
    }

    /// default conserved quantities of templates that do not name their own
    pub fn conserved_for(mut self, quantities: &[ConservedQuantity]) -> Self {
        self.conserved_for = quantities.to_vec();
        self
    }

    pub fn add_template(mut self, template: ReactionTemplate) -> Self {
        self.templates.push(template);
        self
    }

    pub fn add_templates(mut self, templates: Vec<ReactionTemplate>) -> Self {
        self.templates.extend(templates);
        self
    }

    /// Appends already-built processes after the template rows.
    pub fn extend(mut self, processes: Vec<Process>) -> Result<Self, KineticsError> {
        for process in processes {
            if !same_registry(process.registry(), &self.registry) {
                return Err(KineticsError::RegistryMismatch {
                    process: process.id.clone(),
                });
            }
            self.extra.push(process);
        }
        Ok(self)
    }

    pub fn profiles(mut self, profiles: Vec<ParameterProfile>) -> Self {
        self.profiles.extend(profiles);
        self
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Compiles every template, appends the extra processes and merges their
    /// parameters. Calling it again on the same builder yields an identical collection.
    pub fn compile(&self) -> Result<ProcessCollection, KineticsError> {
        if !self.registry.is_compiled() {
            return Err(ComponentError::NotCompiled("process compilation").into());
        }
        let mut table = ParameterTable::from_specs(&self.parameters)?;
        let mut processes: Vec<Process> =
            Vec::with_capacity(self.templates.len() + self.extra.len());
        let mut index = HashMap::new();
        for template in &self.templates {
            if index.contains_key(&template.id) {
                return Err(KineticsError::DuplicateProcess(template.id.clone()));
            }
            let process =
                Process::build(template, &self.registry, &self.parameters, &self.conserved_for)?;
            index.insert(process.id.clone(), processes.len());
            processes.push(process);
        }
        for process in &self.extra {
            if !same_registry(process.registry(), &self.registry) {
                return Err(KineticsError::RegistryMismatch {
                    process: process.id.clone(),
                });
            }
            if index.contains_key(&process.id) {
                return Err(KineticsError::DuplicateProcess(process.id.clone()));
            }
            for spec in process.parameters() {
                table.insert(spec.clone())?;
            }
            index.insert(process.id.clone(), processes.len());
            processes.push(process.clone());
        }
        let mut param_slots = Vec::with_capacity(processes.len());
        for process in &processes {
            let slots = process
                .parameters()
                .iter()
                .map(|p| table.index(&p.name))
                .collect::<Result<Vec<usize>, KineticsError>>()?;
            param_slots.push(slots);
        }
        for profile in &self.profiles {
            let updates: Vec<(&str, f64)> = profile
                .values
                .iter()
                .map(|(n, v)| (n.as_str(), *v))
                .collect();
            table.validate_updates(&updates)?;
        }
        let mut collection = ProcessCollection {
            registry: Arc::clone(&self.registry),
            processes,
            index,
            parameters: table,
            param_slots,
            profiles: self.profiles.clone(),
            conserved_for: self.conserved_for.clone(),
            matrix: DMatrix::zeros(0, 0),
        };
        collection.matrix = collection.numeric_matrix(collection.parameters.values())?;
        info!(
            "compiled {} processes x {} components, {} parameters",
            collection.len(),
            collection.registry.len(),
            collection.parameters.len()
        );
        Ok(collection)
    }
}

/// Compiled, immutable-structure process model. Cloning gives an independent
/// parameter table.
#[derive(Debug, Clone)]
pub struct ProcessCollection {
    registry: Arc<ComponentRegistry>,
    processes: Vec<Process>,
    index: HashMap<String, usize>,
    parameters: ParameterTable,
    /// per process: collection slot of each of its local parameters
    param_slots: Vec<Vec<usize>>,
    profiles: Vec<ParameterProfile>,
    conserved_for: Vec<ConservedQuantity>,
    matrix: DMatrix<f64>,
}

impl ProcessCollection {
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.processes.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn process(&self, id: &str) -> Option<&Process> {
        self.index(id).map(|i| &self.processes[i])
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn parameters(&self) -> &ParameterTable {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Result<f64, KineticsError> {
        self.parameters.get(name)
    }

    pub fn profiles(&self) -> &[ParameterProfile] {
        &self.profiles
    }

    /// collection-wide conserved quantities
    pub fn conserved_for(&self) -> &[ConservedQuantity] {
        &self.conserved_for
    }

    /// numeric stoichiometry at the current parameter values
    pub fn stoichiometry(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn symbolic_stoichiometry(&self) -> Vec<&[Expr]> {
        self.processes.iter().map(|p| p.stoichiometry()).collect()
    }

    /// Values of process `i`'s own parameters taken from a collection-wide vector.
    pub(crate) fn local_parameters(&self, i: usize, values: &[f64]) -> Vec<f64> {
        self.param_slots[i].iter().map(|&slot| values[slot]).collect()
    }

    pub(crate) fn check_parameter_len(&self, values: &[f64]) -> Result<(), KineticsError> {
        if values.len() != self.parameters.len() {
            return Err(KineticsError::DimensionMismatch {
                expected: self.parameters.len(),
                found: values.len(),
            });
        }
        Ok(())
    }

    /// Gujer matrix at arbitrary collection-wide parameter values.
    pub fn numeric_matrix(&self, values: &[f64]) -> Result<DMatrix<f64>, KineticsError> {
        self.check_parameter_len(values)?;
        let mut matrix = DMatrix::zeros(self.processes.len(), self.registry.len());
        for (i, process) in self.processes.iter().enumerate() {
            let row = process.numeric_stoichiometry(&self.local_parameters(i, values))?;
            for (j, value) in row.into_iter().enumerate() {
                matrix[(i, j)] = value;
            }
        }
        Ok(matrix)
    }

    /// Updates named parameters. Unknown names, non-finite values and values that make
    /// a coefficient undefined are rejected and leave the collection unchanged.
    pub fn set_parameters<S: AsRef<str>>(&mut self, updates: &[(S, f64)]) -> Result<(), KineticsError> {
        let updates: Vec<(&str, f64)> = updates.iter().map(|(n, v)| (n.as_ref(), *v)).collect();
        let mut table = self.parameters.clone();
        table.set_parameters(&updates)?;
        let matrix = self.numeric_matrix(table.values())?;
        self.parameters = table;
        self.matrix = matrix;
        Ok(())
    }

    pub fn apply_profile(&mut self, name: &str) -> Result<(), KineticsError> {
        let profile = self
            .profiles
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| KineticsError::UnknownProfile(name.to_string()))?;
        info!("applying parameter profile {}", name);
        self.set_parameters(&profile.values)
    }

    pub fn reset_defaults(&mut self) -> Result<(), KineticsError> {
        let mut table = self.parameters.clone();
        table.reset_defaults();
        let matrix = self.numeric_matrix(table.values())?;
        self.parameters = table;
        self.matrix = matrix;
        Ok(())
    }

    pub fn rates(&self, concentrations: &[f64]) -> Result<DVector<f64>, KineticsError> {
        RateEvaluator::rates(self, concentrations)
    }

    pub fn production_rates(&self, concentrations: &[f64]) -> Result<DVector<f64>, KineticsError> {
        RateEvaluator::production_rates(self, concentrations)
    }

    /// Net production of every component as an expression of the concentrations
    /// (registry order), at the current parameter values: `sum_i S_ij * r_i`. The
    /// variables are the component ids. Fails with `NotSymbolic` when a process has a
    /// hand-written rate law.
    pub fn symbolic_production_rates(&self) -> Result<Vec<Expr>, KineticsError> {
        let values = self.parameters.values();
        let mut rates = Vec::with_capacity(self.processes.len());
        for (i, process) in self.processes.iter().enumerate() {
            rates.push(process.symbolic_rate(&self.local_parameters(i, values))?);
        }
        let mut production = Vec::with_capacity(self.registry.len());
        for j in 0..self.registry.len() {
            let mut sum: Option<Expr> = None;
            for (i, rate) in rates.iter().enumerate() {
                let s = self.matrix[(i, j)];
                if s == 0.0 {
                    continue;
                }
                let term = Expr::Const(s) * rate.clone();
                sum = Some(match sum {
                    None => term,
                    Some(acc) => acc + term,
                });
            }
            production.push(match sum {
                None => Expr::Const(0.0),
                Some(expr) => expr.symplify(),
            });
        }
        Ok(production)
    }

    /// Re-verifies every row at the current parameter values over its own quantities.
    pub fn check_conservation(&self, tolerance: f64) -> Result<(), KineticsError> {
        let values = self.parameters.values();
        for (i, process) in self.processes.iter().enumerate() {
            process.check_conservation(
                process.conserved_for(),
                &self.local_parameters(i, values),
                tolerance,
            )?;
        }
        Ok(())
    }

    /// Source templates of every process that has one, in row order.
    pub fn templates(&self) -> Vec<ReactionTemplate> {
        self.processes
            .iter()
            .filter_map(|p| p.template().cloned())
            .collect()
    }

    pub fn pretty_print(&self) {
        let mut table = Table::new();
        let mut header = vec![Cell::new("process")];
        header.extend(self.registry.ids().into_iter().map(Cell::new));
        header.push(Cell::new("rate"));
        table.add_row(Row::new(header));
        for (i, process) in self.processes.iter().enumerate() {
            let mut cells = vec![Cell::new(&process.id)];
            for j in 0..self.registry.len() {
                let value = self.matrix[(i, j)];
                let text = if value == 0.0 {
                    String::new()
                } else {
                    format!("{:.4}", value)
                };
                cells.push(Cell::new(&text));
            }
            cells.push(Cell::new(&process.rate().describe()));
            table.add_row(Row::new(cells));
        }
        table.printstd();
    }
}
