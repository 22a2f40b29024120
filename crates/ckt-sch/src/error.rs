use thiserror::Error;

use crate::diagram::ComponentId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown part type '{0}'")]
    UnknownPart(String),

    #[error("no component with id {0}")]
    NoSuchComponent(ComponentId),

    #[error("malformed diagram: {0}")]
    MalformedDiagram(String),

    #[error("malformed diagram entry {entry}: {reason}")]
    MalformedEntry { entry: usize, reason: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection points are not labeled; run the labeling pass first")]
    Unlabeled,

    #[error("{part} is missing property '{property}'")]
    MissingProperty { part: String, property: String },

    #[error("invalid source descriptor '{descriptor}': {reason}")]
    InvalidSource { descriptor: String, reason: String },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("invalid location '{0}', expected 'x,y'")]
    InvalidLocation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
