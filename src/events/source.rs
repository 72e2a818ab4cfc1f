use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::data::loader::{json_to_value, load_file, table_from_json};
use crate::data::model::EventTable;
use crate::error::{EventsError, Result};

const EXPECTED: &str = "EventTable, str or Path";

/// Where events come from.
#[derive(Debug, Clone)]
pub enum EventSource {
    /// Already tabular; attached as-is.
    Table(EventTable),
    /// A file whose extension picks the parser.
    Path(PathBuf),
}

impl EventSource {
    /// Materialize the table.
    pub fn into_table(self) -> Result<EventTable> {
        match self {
            EventSource::Table(table) => Ok(table),
            EventSource::Path(path) => load_file(&path),
        }
    }
}

impl From<EventTable> for EventSource {
    fn from(table: EventTable) -> Self {
        EventSource::Table(table)
    }
}

impl From<PathBuf> for EventSource {
    fn from(path: PathBuf) -> Self {
        EventSource::Path(path)
    }
}

impl From<&Path> for EventSource {
    fn from(path: &Path) -> Self {
        EventSource::Path(path.to_path_buf())
    }
}

impl From<&str> for EventSource {
    fn from(path: &str) -> Self {
        EventSource::Path(PathBuf::from(path))
    }
}

impl From<String> for EventSource {
    fn from(path: String) -> Self {
        EventSource::Path(PathBuf::from(path))
    }
}

/// Dynamically typed sources: strings are paths, arrays are records,
/// objects are columns. Anything else is rejected with its type name.
impl TryFrom<JsonValue> for EventSource {
    type Error = EventsError;

    fn try_from(value: JsonValue) -> Result<Self> {
        match &value {
            JsonValue::String(path) => Ok(EventSource::Path(PathBuf::from(path))),
            JsonValue::Array(_) | JsonValue::Object(_) => {
                let table = table_from_json(&value).map_err(|source| EventsError::Load {
                    path: PathBuf::from("<json>"),
                    source,
                })?;
                Ok(EventSource::Table(table))
            }
            scalar => Err(EventsError::InvalidSourceType {
                received: json_to_value(scalar).type_name().to_string(),
                expected: EXPECTED,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_number_with_type_name() {
        let err = EventSource::try_from(json!(42)).unwrap_err();
        assert!(matches!(err, EventsError::InvalidSourceType { .. }));
        assert!(err.to_string().contains("'int'"));

        let err = EventSource::try_from(json!(0.5)).unwrap_err();
        assert!(err.to_string().contains("'float'"));
        let err = EventSource::try_from(json!(true)).unwrap_err();
        assert!(err.to_string().contains("'bool'"));
        let err = EventSource::try_from(JsonValue::Null).unwrap_err();
        assert!(err.to_string().contains("'null'"));
    }

    #[test]
    fn test_string_is_a_path() {
        let source = EventSource::try_from(json!("events.csv")).unwrap();
        assert!(matches!(source, EventSource::Path(p) if p == Path::new("events.csv")));
    }

    #[test]
    fn test_records_become_a_table() {
        let source = EventSource::try_from(json!([{ "label": "A" }])).unwrap();
        let table = source.into_table().unwrap();
        assert_eq!(table.len(), 1);
    }
}
