/// Errors reported by sketch construction and typed item operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SketchError {
    /// Constructor parameters are out of range. No instance is created.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The item has no stable byte representation. The sketch is left untouched.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T, E = SketchError> = std::result::Result<T, E>;
