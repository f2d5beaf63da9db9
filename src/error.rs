use thiserror::Error;

use crate::shared_data::{IntersectionId, StreetId};

/// Errors surfaced by the junction and its demo driver.
///
/// Contract violations (departing an empty intersection, granting from an
/// empty queue) are not represented here; they panic.
#[derive(Error, Debug)]
pub enum JunctionError {
    /// The intersection or traffic light was shut down while the caller waited.
    #[error("intersection has been shut down")]
    Closed,

    #[error("unknown street: {0}")]
    UnknownStreet(StreetId),

    #[error("unknown intersection: {0}")]
    UnknownIntersection(IntersectionId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type JunctionResult<T> = Result<T, JunctionError>;
