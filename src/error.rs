use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid record for agent {agent_id}: {reason}")]
    InvalidRecord { agent_id: i64, reason: String },

    #[error("Cannot forecast an empty revenue series")]
    EmptySeries,

    #[error("Invalid weight table: {0}")]
    InvalidWeights(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid category ladder: {0}")]
    InvalidLadder(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
