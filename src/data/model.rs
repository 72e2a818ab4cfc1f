use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::{EventsError, Result};

// ---------------------------------------------------------------------------
// Value – a single cell in an event column or a coordinate label
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common dataframe dtypes.
/// Using `BTreeMap` / `BTreeSet` downstream so `Value` must be `Ord`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text for simplicity.
    Date(String),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --
//
// Equality goes through `cmp` and hashing folds floats the same way, so a
// `BTreeSet`, a `HashSet` and `==` agree on every pair of cells. Floats
// compare with `total_cmp` after folding `-0.0` onto `0.0` and every NaN
// onto one NaN.

fn canonical(f: f64) -> f64 {
    if f == 0.0 {
        0.0
    } else if f.is_nan() {
        f64::NAN
    } else {
        f
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) | Value::Date(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => canonical(*f).to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Infer a typed value from a text cell (CSV fields, CLI arguments).
    pub fn guess(s: &str) -> Value {
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
        Value::String(s.to_string())
    }

    /// Try to interpret the value as an `f64` for numeric matching.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Date(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Equality with integers and integral floats treated as the same number.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            _ => self == other,
        }
    }

    /// The same number under the other numeric variant, used for set lookups.
    pub(crate) fn numeric_twin(&self) -> Option<Value> {
        match self {
            Value::Integer(i) => Some(Value::Float(*i as f64)),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(Value::Integer(*f as i64))
            }
            _ => None,
        }
    }

    /// Short dtype name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "str",
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Null => "null",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// EventTable – one row per event occurrence
// ---------------------------------------------------------------------------

/// A tabular set of events with ordered columns.
///
/// Every row carries the id it had when the table was built, so narrowed
/// tables can be traced back to the original events.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    ids: Vec<usize>,
}

impl EventTable {
    /// An empty table with the given columns.
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = BTreeSet::new();
        for col in &columns {
            if !seen.insert(col.as_str()) {
                return Err(EventsError::InvalidTable(format!(
                    "duplicate column '{col}'"
                )));
            }
        }
        Ok(EventTable {
            columns,
            rows: Vec::new(),
            ids: Vec::new(),
        })
    }

    /// Build a table from column names and row-major cells.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = EventTable::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Build a table from `(column, values)` pairs of equal length.
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<Value>)>) -> Result<Self> {
        let (names, values): (Vec<String>, Vec<Vec<Value>>) = columns
            .into_iter()
            .map(|(name, vals)| (name.into(), vals))
            .unzip();
        let n_rows = values.first().map_or(0, Vec::len);
        if let Some((name, vals)) = names.iter().zip(&values).find(|(_, v)| v.len() != n_rows) {
            return Err(EventsError::InvalidTable(format!(
                "column '{name}' has {} values, expected {n_rows}",
                vals.len()
            )));
        }
        let mut iters: Vec<_> = values.into_iter().map(Vec::into_iter).collect();
        let rows = (0..n_rows)
            .map(|_| iters.iter_mut().filter_map(Iterator::next).collect())
            .collect();
        EventTable::from_rows(names, rows)
    }

    /// Build a table from keyed records. Columns are the union of all keys,
    /// in order of first appearance; missing keys become `Null`.
    pub fn from_records(records: Vec<Vec<(String, Value)>>) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        for rec in &records {
            for (key, _) in rec {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        let rows = records
            .into_iter()
            .map(|rec| {
                let mut by_key: BTreeMap<String, Value> = rec.into_iter().collect();
                columns
                    .iter()
                    .map(|c| by_key.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        EventTable::from_rows(columns, rows)
    }

    /// Append one event. The row gets the next id.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(EventsError::InvalidTable(format!(
                "row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        let id = self.ids.last().map_or(0, |last| last + 1);
        self.rows.push(row);
        self.ids.push(id);
        Ok(())
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// The sorted set of distinct values in a column.
    pub fn unique_values(&self, name: &str) -> Option<BTreeSet<Value>> {
        self.column(name).map(|cells| cells.cloned().collect())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Original event ids of the rows still present.
    pub fn event_ids(&self) -> &[usize] {
        &self.ids
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A new table holding the given row positions, in the order given.
    /// Out-of-range positions are skipped.
    pub fn take(&self, positions: &[usize]) -> EventTable {
        let (rows, ids) = positions
            .iter()
            .filter_map(|&i| Some((self.rows.get(i)?.clone(), self.ids[i])))
            .unzip();
        EventTable {
            columns: self.columns.clone(),
            rows,
            ids,
        }
    }

    /// Rows as column → value maps, for JSON output.
    pub fn to_records(&self) -> Vec<BTreeMap<&str, &Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter())
                    .collect()
            })
            .collect()
    }
}
