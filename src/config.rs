use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::{EventsError, Result};

/// What to do with a constraint name that is both a dimension and an event
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Route it to the array only.
    #[default]
    DimsOnly,
    /// Route it to the array and the event table.
    Both,
    /// Fail with [`EventsError::AmbiguousConstraint`].
    Reject,
}

/// What to do with a constraint name that is neither a dimension nor an
/// event column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Fail with [`EventsError::MissingEventTable`] when no events are
    /// loaded, otherwise [`EventsError::UnknownConstraint`].
    #[default]
    Error,
    /// Log a warning and skip the constraint.
    Ignore,
}

/// Selection behavior, loadable from JSON:
///
/// ```json
/// { "overlap": "dims_only", "unknown": "ignore" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectConfig {
    pub overlap: OverlapPolicy,
    pub unknown: UnknownPolicy,
}

impl SelectConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .context("parsing selection config")
            .map_err(EventsError::Config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))
            .map_err(EventsError::Config)?;
        Self::from_json_str(&text)
    }
}
