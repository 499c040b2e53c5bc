use thiserror::Error;

/// Errors raised while building, compiling or persisting components and registries
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Unknown chemical '{reference}' requested for component '{id}'")]
    UnknownChemical { id: String, reference: String },
    #[error("Component registry is compiled, cannot {operation} '{id}'")]
    ImmutableRegistry { operation: &'static str, id: String },
    #[error("Component '{0}' is already present in the registry")]
    DuplicateComponent(String),
    #[error("Component '{0}' is not defined in the registry")]
    UndefinedComponent(String),
    #[error("Invalid property of component '{id}': {reason}")]
    InvalidProperty { id: String, reason: String },
    #[error("Cannot parse formula '{formula}': {reason}")]
    FormulaParse { formula: String, reason: String },
    #[error("Unknown conserved quantity '{0}'")]
    UnknownQuantity(String),
    #[error("Component registry must be compiled before {0}")]
    NotCompiled(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
