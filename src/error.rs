use std::convert::Infallible;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading events or selecting across array and events.
#[derive(Debug, Error)]
pub enum EventsError {
    #[error("Unexpected type '{received}'. Expected {expected} instead.")]
    InvalidSourceType {
        received: String,
        expected: &'static str,
    },

    #[error("Unsupported file format '.{extension}' for {}", path.display())]
    UnsupportedFileFormat { extension: String, path: PathBuf },

    #[error("Failed to load events from {}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("No events loaded, cannot apply constraints on {names:?}")]
    MissingEventTable { names: Vec<String> },

    #[error("Constraints {names:?} match neither a dimension nor an event column")]
    UnknownConstraint { names: Vec<String> },

    #[error("Constraint '{name}' names both a dimension and an event column")]
    AmbiguousConstraint { name: String },

    #[error("Event table has no column '{column}'")]
    UnknownColumn { column: String },

    #[error("Array has no dimension '{dim}'")]
    UnknownDimension { dim: String },

    #[error("Label {label} not found along dimension '{dim}'")]
    LabelNotFound { dim: String, label: String },

    #[error("No label along '{dim}' within {tolerance} of {label}")]
    NoMatchWithinTolerance {
        dim: String,
        label: String,
        tolerance: f64,
    },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid event table: {0}")]
    InvalidTable(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid configuration")]
    Config(#[source] anyhow::Error),
}

impl From<Infallible> for EventsError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T> = std::result::Result<T, EventsError>;
