use std::collections::BTreeSet;

use crate::config::OverlapPolicy;
use crate::data::filter::ConstraintSet;
use crate::error::{EventsError, Result};

/// Constraints split by target namespace. Each half keeps input order.
#[derive(Debug, Default)]
pub struct Partition {
    /// Bound for the array's native selection.
    pub dims: ConstraintSet,
    /// Bound for the event filter.
    pub events: ConstraintSet,
    /// Names found in neither namespace.
    pub unmatched: Vec<String>,
}

/// Split `constraints` by name membership in `dims` and `columns`.
pub fn partition(
    constraints: ConstraintSet,
    dims: &BTreeSet<String>,
    columns: &BTreeSet<String>,
    overlap: OverlapPolicy,
) -> Result<Partition> {
    let mut out = Partition::default();
    for (name, constraint) in constraints {
        match (dims.contains(&name), columns.contains(&name)) {
            (true, true) => match overlap {
                OverlapPolicy::DimsOnly => {
                    out.dims.insert(name, constraint);
                }
                OverlapPolicy::Both => {
                    out.events.insert(name.clone(), constraint.clone());
                    out.dims.insert(name, constraint);
                }
                OverlapPolicy::Reject => {
                    return Err(EventsError::AmbiguousConstraint { name });
                }
            },
            (true, false) => {
                out.dims.insert(name, constraint);
            }
            (false, true) => {
                out.events.insert(name, constraint);
            }
            (false, false) => out.unmatched.push(name),
        }
    }
    Ok(out)
}
