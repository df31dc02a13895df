use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExperimentError {
    // file errors
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("Unexpected results header: {0}")]
    UnexpectedHeader(String),

    // block construction errors
    #[error("Coherence must be a finite value in (0, 1], got {0}")]
    InvalidCoherence(f64),
    #[error("At least one {0} is required to build a block")]
    EmptyConditions(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = ExperimentError> = std::result::Result<T, E>;
