//! # rusty-events
//!
//! Attach a table of discrete events to a labeled multi-dimensional array and
//! narrow both with one set of named constraints.
//!
//! ```no_run
//! use rusty_events::{Constraint, Dataset, Events, Selection, Value};
//!
//! fn main() -> anyhow::Result<()> {
//!     let ds = Dataset::new()
//!         .with_coord("time", (0..10).map(Value::from).collect())?
//!         .with_variable("signal", &["time"], vec![0.0; 10])?;
//!
//!     let mut events = Events::new(ds);
//!     events
//!         .load("events.csv")?
//!         .sel(
//!             Selection::new()
//!                 .with("time", vec![2, 3, 4])
//!                 .with("label", "spike")
//!                 .with("amplitude", Constraint::predicate(|v| v.as_f64() > Some(0.5))),
//!         )?;
//!
//!     println!("{} events left", events.events().map_or(0, |t| t.len()));
//!     Ok(())
//! }
//! ```
//!
//! Constraint names that match a dimension are handed to the array's own
//! selection ([`LabeledArray::select`]); names that match an event column
//! filter the table by membership, predicate or equality depending on the
//! [`Constraint`] variant.

pub mod array;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod query;

pub use array::{Dataset, LabeledArray, Method, SelectOptions};
pub use config::{OverlapPolicy, SelectConfig, UnknownPolicy};
pub use data::filter::{filter_events, Constraint, ConstraintSet};
pub use data::model::{EventTable, Value};
pub use error::{EventsError, Result};
pub use events::{EventSource, Events, Selection};
