/// Events layer: an array container with an attached event table.
///
/// ```text
///   load(source) ──► EventTable ──► Events { array, events }
///
///   sel(selection)
///        │  merge indexers + named constraints
///        ▼
///   ┌────────────┐   dims    ┌──────────────────────┐
///   │ partition   │ ───────► │ LabeledArray::select  │ ─┐
///   └────────────┘           └──────────────────────┘  │ staged,
///        │ columns                                     │ committed
///        ▼                                             │ together
///   ┌───────────────┐                                  │
///   │ filter_events  │ ────────────────────────────────┘
///   └───────────────┘
/// ```
pub mod partition;
pub mod selection;
pub mod source;

pub use partition::{partition, Partition};
pub use selection::Selection;
pub use source::EventSource;

use std::collections::BTreeSet;

use log::{debug, info, warn};

use crate::array::LabeledArray;
use crate::config::{SelectConfig, UnknownPolicy};
use crate::data::filter::filter_events;
use crate::data::model::EventTable;
use crate::error::{EventsError, Result};

/// An array container together with an optional event table.
#[derive(Debug, Clone)]
pub struct Events<A> {
    array: A,
    events: Option<EventTable>,
    config: SelectConfig,
}

impl<A: LabeledArray> Events<A> {
    /// Wrap `array` with no events attached.
    pub fn new(array: A) -> Self {
        Self::with_config(array, SelectConfig::default())
    }

    pub fn with_config(array: A, config: SelectConfig) -> Self {
        Events {
            array,
            events: None,
            config,
        }
    }

    pub fn array(&self) -> &A {
        &self.array
    }

    pub fn events(&self) -> Option<&EventTable> {
        self.events.as_ref()
    }

    pub fn into_parts(self) -> (A, Option<EventTable>) {
        (self.array, self.events)
    }

    /// Attach events, replacing any previously loaded table.
    ///
    /// Accepts an [`EventTable`], a path (`&str`, `String`, `&Path`,
    /// `PathBuf`), or a `serde_json::Value`. On error the previous table is
    /// kept.
    pub fn load<S>(&mut self, source: S) -> Result<&mut Self>
    where
        S: TryInto<EventSource>,
        EventsError: From<S::Error>,
    {
        let table = source.try_into()?.into_table()?;
        if self.events.is_some() {
            info!("replacing loaded events with {} new events", table.len());
        }
        self.events = Some(table);
        Ok(self)
    }

    /// Narrow the array and the events with one set of named constraints.
    ///
    /// Names matching a dimension go to [`LabeledArray::select`] together with
    /// the selection's options; names matching an event column filter the
    /// table. Both results are computed before either is stored, so on error
    /// nothing changes.
    pub fn sel(&mut self, selection: Selection) -> Result<&mut Self> {
        let (constraints, options) = selection.into_parts();
        if constraints.is_empty() {
            return Ok(self);
        }

        let dims: BTreeSet<String> = self.array.dims().into_iter().collect();
        let columns: BTreeSet<String> = self
            .events
            .iter()
            .flat_map(|t| t.column_names().iter().cloned())
            .collect();

        let part = partition(constraints, &dims, &columns, self.config.overlap)?;
        if !part.unmatched.is_empty() {
            match (self.config.unknown, &self.events) {
                (UnknownPolicy::Ignore, _) => {
                    warn!("ignoring constraints on unknown names {:?}", part.unmatched);
                }
                (UnknownPolicy::Error, None) => {
                    return Err(EventsError::MissingEventTable {
                        names: part.unmatched,
                    });
                }
                (UnknownPolicy::Error, Some(_)) => {
                    return Err(EventsError::UnknownConstraint {
                        names: part.unmatched,
                    });
                }
            }
        }

        let array = if part.dims.is_empty() {
            None
        } else {
            debug!("selecting dims {:?}", part.dims.names().collect::<Vec<_>>());
            Some(self.array.select(&part.dims, &options)?)
        };
        let events = match &self.events {
            Some(table) if !part.events.is_empty() => Some(filter_events(table, &part.events)?),
            _ => None,
        };

        if let Some(array) = array {
            self.array = array;
        }
        if let Some(events) = events {
            self.events = Some(events);
        }
        Ok(self)
    }
}
