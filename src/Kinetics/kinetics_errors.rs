use crate::Components::component_errors::ComponentError;
use thiserror::Error;

/// Undefined arithmetic met while evaluating a rate law or a coefficient
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericDomainError {
    #[error("division by zero (numerator {numerator})")]
    DivisionByZero { numerator: f64 },
    #[error("negative base {base} raised to fractional power {exponent}")]
    NegativeFractionalPower { base: f64, exponent: f64 },
    #[error("logarithm of non-positive value {value}")]
    LogOfNonPositive { value: f64 },
    #[error("non-finite result {value}")]
    NonFinite { value: f64 },
    #[error("no value bound to '{name}'")]
    UnboundVariable { name: String },
    #[error("cannot evaluate '{expression}'")]
    Unsupported { expression: String },
}

/// Errors of reaction parsing, conservation solving, process compilation and rate evaluation
#[derive(Debug, Error)]
pub enum KineticsError {
    #[error(
        "Process '{process}': unknown coefficients {unknowns:?} exceed the {independent} independent conservation equation(s)"
    )]
    UnderdeterminedStoichiometry {
        process: String,
        unknowns: Vec<String>,
        independent: usize,
    },
    #[error("Process '{process}': no stoichiometry satisfies the {quantity} balance")]
    OverdeterminedStoichiometry { process: String, quantity: String },
    #[error("Process '{process}' violates the {quantity} balance by {residual}")]
    ConservationViolated {
        process: String,
        quantity: String,
        residual: f64,
    },
    #[error("Process '{process}' was built against a different component registry")]
    RegistryMismatch { process: String },
    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("Parameter '{name}' cannot take the value {value}")]
    InvalidParameterValue { name: String, value: f64 },
    #[error("Numeric domain error in '{process}': {source}")]
    NumericDomain {
        process: String,
        #[source]
        source: NumericDomainError,
    },
    #[error("Cannot parse reaction '{reaction}': {reason}")]
    ReactionParse { reaction: String, reason: String },
    #[error("Cannot parse expression '{expression}': {reason}")]
    ExpressionParse { expression: String, reason: String },
    #[error("Process '{process}': '{symbol}' is neither a component nor a declared parameter")]
    UnknownSymbol { process: String, symbol: String },
    #[error("Process '{process}': invalid reference component '{component}': {reason}")]
    InvalidReference {
        process: String,
        component: String,
        reason: String,
    },
    #[error("Expected {expected} values, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Duplicate process id '{0}'")]
    DuplicateProcess(String),
    #[error("Template file, line {line}: {reason}")]
    TemplateFormat { line: usize, reason: String },
    #[error("Process '{process}' has a hand-written rate law with no symbolic form")]
    NotSymbolic { process: String },
    #[error("Unknown parameter profile '{0}'")]
    UnknownProfile(String),
    #[error(transparent)]
    Component(#[from] ComponentError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
