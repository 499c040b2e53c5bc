//! Stateless evaluation of process rates for an external mass-balance integrator.
//!
//! Concentrations are in registry order. Every call is a pure function of its inputs;
//! a `NumericDomainError` of any rate law is returned with the id of its process and
//! left to the caller to handle (e.g. by retrying with a smaller step).
use crate::Kinetics::kinetics_errors::KineticsError;
use crate::Kinetics::processes::ProcessCollection;
use nalgebra::DVector;

pub struct RateEvaluator;

impl RateEvaluator {
    /// process rates at the collection's current parameter values
    pub fn rates(
        collection: &ProcessCollection,
        concentrations: &[f64],
    ) -> Result<DVector<f64>, KineticsError> {
        Self::rates_with(collection, concentrations, collection.parameters().values())
    }

    /// process rates at explicit collection-wide parameter values
    pub fn rates_with(
        collection: &ProcessCollection,
        concentrations: &[f64],
        parameters: &[f64],
    ) -> Result<DVector<f64>, KineticsError> {
        let n = collection.registry().len();
        if concentrations.len() != n {
            return Err(KineticsError::DimensionMismatch {
                expected: n,
                found: concentrations.len(),
            });
        }
        collection.check_parameter_len(parameters)?;
        let mut rates = DVector::zeros(collection.len());
        for (i, process) in collection.processes().iter().enumerate() {
            let local = collection.local_parameters(i, parameters);
            rates[i] = process.evaluate_rate(concentrations, &local)?;
        }
        Ok(rates)
    }

    /// net production of every component, S^T r
    pub fn production_rates(
        collection: &ProcessCollection,
        concentrations: &[f64],
    ) -> Result<DVector<f64>, KineticsError> {
        let r = Self::rates(collection, concentrations)?;
        Ok(collection.stoichiometry().transpose() * r)
    }

    pub fn production_rates_with(
        collection: &ProcessCollection,
        concentrations: &[f64],
        parameters: &[f64],
    ) -> Result<DVector<f64>, KineticsError> {
        let r = Self::rates_with(collection, concentrations, parameters)?;
        Ok(collection.numeric_matrix(parameters)?.transpose() * r)
    }
}
