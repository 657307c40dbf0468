pub mod achievement;
pub mod content;
pub mod engine;
pub mod graph;
pub mod mastery;
pub mod profile;
pub mod progression;
pub mod random;
pub mod recommend;

use thiserror::Error;

use crate::store::StoreError;

pub use engine::LearningEngine;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("graph store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("prerequisite cycle detected after visiting {visited} of {node_count} concepts")]
    CycleDetected { visited: usize, node_count: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Rejected(why) => Self::InvalidInput(why),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}
