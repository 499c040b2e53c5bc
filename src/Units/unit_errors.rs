use crate::Components::component_errors::ComponentError;
use crate::Kinetics::kinetics_errors::KineticsError;
use thiserror::Error;

/// Errors of waste streams and unit operations
#[derive(Debug, Error)]
pub enum UnitError {
    #[error(
        "Unit '{unit}' takes {expected_ins} inlet(s) and {expected_outs} outlet(s), got {found_ins} and {found_outs}"
    )]
    Arity {
        unit: String,
        expected_ins: usize,
        expected_outs: usize,
        found_ins: usize,
        found_outs: usize,
    },
    #[error("Invalid configuration of unit '{unit}': {reason}")]
    InvalidConfig { unit: String, reason: String },
    #[error("Invalid flow in stream '{stream}': {reason}")]
    InvalidFlow { stream: String, reason: String },
    #[error("{context}: streams were built on different component registries")]
    RegistryMismatch { context: String },
    #[error("Unit '{unit}' needs component '{component}', which is not in the registry")]
    MissingComponent { unit: String, component: String },
    #[error("Unit '{unit}': concentration of {component} became negative ({value})")]
    NegativeConcentration {
        unit: String,
        component: String,
        value: f64,
    },
    #[error("Unit '{unit}': integration failed: {reason}")]
    Integration { unit: String, reason: String },
    #[error(transparent)]
    Component(#[from] ComponentError),
    #[error(transparent)]
    Kinetics(#[from] KineticsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
