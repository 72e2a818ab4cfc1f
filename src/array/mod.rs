/// Array layer: the labeled container that events are attached to.
///
/// ```text
///   Dataset (dims + coords + f64 variables)
///        │
///        ▼
///   ┌────────────────┐
///   │  LabeledArray   │  dims() / select(indexers, options)
///   └────────────────┘
/// ```
///
/// Anything implementing [`LabeledArray`] can be wrapped by
/// [`crate::events::Events`]; [`Dataset`] is the in-crate implementation.
pub mod dataset;

pub use dataset::Dataset;

use serde::Deserialize;

use crate::data::filter::ConstraintSet;
use crate::error::Result;

/// How labels that are not present exactly are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Closest label.
    Nearest,
    /// Closest label at or below the requested one.
    #[serde(alias = "ffill")]
    Pad,
    /// Closest label at or above the requested one.
    #[serde(alias = "bfill")]
    Backfill,
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Method::Nearest),
            "pad" | "ffill" => Ok(Method::Pad),
            "backfill" | "bfill" => Ok(Method::Backfill),
            other => Err(format!("unknown method '{other}'")),
        }
    }
}

/// Options forwarded untouched to [`LabeledArray::select`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SelectOptions {
    pub method: Option<Method>,
    /// Maximum distance between requested and matched label.
    pub tolerance: Option<f64>,
    /// Discard coordinates of dimensions collapsed by scalar selection.
    pub drop: bool,
}

/// A multi-dimensional container with named dimensions that supports
/// label-based selection.
pub trait LabeledArray: Sized {
    /// Names of the container's dimensions.
    fn dims(&self) -> Vec<String>;

    /// A new container narrowed by dimension-keyed constraints.
    fn select(&self, indexers: &ConstraintSet, options: &SelectOptions) -> Result<Self>;
}
