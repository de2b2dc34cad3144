//! Error types for the FEA engine

use thiserror::Error;

/// Main error type for FEA operations
#[derive(Error, Debug)]
pub enum FEAError {
    #[error("Node {0} not found in structure")]
    NodeNotFound(usize),

    #[error("Element {0} not found in structure")]
    ElementNotFound(usize),

    #[error("Material {0} not found in structure")]
    MaterialNotFound(usize),

    #[error("Section {0} not found in structure")]
    SectionNotFound(usize),

    #[error("Property {0} not found in structure")]
    PropertyNotFound(usize),

    #[error("Analysis step {0} not found in structure")]
    StepNotFound(usize),

    #[error("Model {0} not found in registry")]
    ModelNotFound(usize),

    #[error("Duplicate id {id} in {collection}")]
    DuplicateId { collection: &'static str, id: usize },

    #[error("No structure associated with the solver")]
    NoStructure,

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Singular stiffness matrix - model may be unstable or have insufficient constraints")]
    SingularMatrix,

    #[error("Matrix factorization failed: {0}")]
    FactorizationFailed(String),

    #[error("Acceleration solve did not converge after {0} iterations")]
    AccelerationNotConverged(usize),

    #[error("Time integration diverged at t = {time} (dt = {dt})")]
    IntegrationDiverged { time: f64, dt: f64 },

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for FEA operations
pub type FEAResult<T> = Result<T, FEAError>;
