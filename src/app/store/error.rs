use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("no such element: {0}")]
    NotFound(String),
    #[error("persistence rejected the change: {0}")]
    Rejected(String),
}

pub type GraphResult<T> = Result<T, GraphError>;
