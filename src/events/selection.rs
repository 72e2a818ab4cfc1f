use log::warn;

use crate::array::{Method, SelectOptions};
use crate::data::filter::{Constraint, ConstraintSet};

/// Arguments of one [`crate::events::Events::sel`] call.
///
/// Constraints can be given as a whole mapping (`indexers`) or one at a time
/// (`with`); when the same name appears in both, the one given with `with`
/// wins.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    indexers: ConstraintSet,
    named: ConstraintSet,
    options: SelectOptions,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indexers(mut self, indexers: ConstraintSet) -> Self {
        self.indexers = indexers;
        self
    }

    pub fn with(mut self, name: impl Into<String>, constraint: impl Into<Constraint>) -> Self {
        self.named.insert(name, constraint);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.options.method = Some(method);
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.options.tolerance = Some(tolerance);
        self
    }

    pub fn drop(mut self, drop: bool) -> Self {
        self.options.drop = drop;
        self
    }

    /// Merge both conventions into one set and hand back the options.
    pub fn into_parts(self) -> (ConstraintSet, SelectOptions) {
        let mut merged = self.indexers;
        let collisions = merged.merge(self.named);
        if !collisions.is_empty() {
            warn!("constraints given twice, keeping the named ones: {collisions:?}");
        }
        (merged, self.options)
    }
}
