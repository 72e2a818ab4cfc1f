use std::path::Path;

use anyhow::{bail, Context};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int32Type, Int64Type,
};
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{EventTable, Value};
use crate::error::{EventsError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an event table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with column names, one event per line
/// * `.json`    – `[{ "col": v, ... }, ...]` or `{ "col": [v, ...], ... }`
/// * `.parquet` – flat table of scalar columns
pub fn load_file(path: &Path) -> Result<EventTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let loaded = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        _ => {
            return Err(EventsError::UnsupportedFileFormat {
                extension: ext,
                path: path.to_path_buf(),
            })
        }
    };

    let table = loaded.map_err(|source| EventsError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "loaded {} events with columns {:?} from {}",
        table.len(),
        table.column_names(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema, either records-oriented (`df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "time": 0.5, "label": "spike", "channel": "a" },
///   ...
/// ]
/// ```
///
/// or columns-oriented: `{ "time": [0.5, ...], "label": ["spike", ...] }`.
fn load_json(path: &Path) -> anyhow::Result<EventTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    table_from_json(&root)
}

/// Build a table from an in-memory JSON document (records or columns).
pub(crate) fn table_from_json(root: &JsonValue) -> anyhow::Result<EventTable> {
    match root {
        JsonValue::Array(records) => {
            let mut rows = Vec::with_capacity(records.len());
            for (i, rec) in records.iter().enumerate() {
                let obj = rec
                    .as_object()
                    .with_context(|| format!("Row {i} is not a JSON object"))?;
                rows.push(
                    obj.iter()
                        .map(|(key, val)| (key.clone(), json_to_value(val)))
                        .collect(),
                );
            }
            Ok(EventTable::from_records(rows)?)
        }
        JsonValue::Object(columns) => {
            let mut cols = Vec::with_capacity(columns.len());
            for (name, values) in columns {
                let values = values
                    .as_array()
                    .with_context(|| format!("Column '{name}' is not a JSON array"))?;
                cols.push((name.clone(), values.iter().map(json_to_value).collect()));
            }
            Ok(EventTable::from_columns(cols)?)
        }
        _ => bail!("Expected a JSON array of records or an object of columns"),
    }
}

pub(crate) fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names, one event per record.
/// Cell types are inferred per cell (see [`Value::guess`]).
fn load_csv(path: &Path) -> anyhow::Result<EventTable> {
    // Ragged rows are reported below with the column count.
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut table = EventTable::new(headers.clone())?;

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: {} fields but {} columns",
                record.len(),
                headers.len()
            );
        }
        table.push_row(record.iter().map(Value::guess).collect())?;
    }

    Ok(table)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of events.
///
/// Every column must be scalar (strings, ints, floats, bools, dates).
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> anyhow::Result<EventTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut table = EventTable::new(columns)?;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| arrow_to_value(col, row))
                .collect::<anyhow::Result<Vec<_>>>()
                .with_context(|| format!("Row {row}"))?;
            table.push_row(cells)?;
        }
    }

    Ok(table)
}

// -- Arrow helpers --

/// Extract a single cell from an Arrow column at a given row.
fn arrow_to_value(col: &ArrayRef, row: usize) -> anyhow::Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        DataType::Date32 => {
            let date = col
                .as_primitive::<Date32Type>()
                .value_as_date(row)
                .context("date out of range")?;
            Value::Date(date.to_string())
        }
        other => bail!("Unsupported column type {other:?}"),
    };
    Ok(value)
}
