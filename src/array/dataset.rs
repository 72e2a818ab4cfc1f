use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{LabeledArray, Method, SelectOptions};
use crate::data::filter::{Constraint, ConstraintSet};
use crate::data::loader::json_to_value;
use crate::data::model::Value;
use crate::error::{EventsError, Result};

// ---------------------------------------------------------------------------
// Variable – f64 data laid out row-major over some of the dataset's dims
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub dims: Vec<String>,
    pub data: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Dataset – labeled dimensions plus data variables
// ---------------------------------------------------------------------------

/// A labeled multi-dimensional container.
///
/// Each dimension has one coordinate label per position. Variables span any
/// subset of the dimensions in any order. Scalar selections collapse a
/// dimension and, unless dropped, leave the chosen label behind as a scalar
/// coordinate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    dims: Vec<String>,
    coords: BTreeMap<String, Vec<Value>>,
    variables: BTreeMap<String, Variable>,
    scalar_coords: BTreeMap<String, Value>,
}

/// On-disk JSON layout.
#[derive(Debug, Serialize, Deserialize)]
struct DatasetFile {
    coords: Vec<CoordFile>,
    #[serde(default)]
    data_vars: BTreeMap<String, Variable>,
    #[serde(default)]
    scalar_coords: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CoordFile {
    name: String,
    labels: Vec<JsonValue>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dimension with its coordinate labels.
    pub fn with_coord(mut self, name: impl Into<String>, labels: Vec<Value>) -> Result<Self> {
        let name = name.into();
        if self.coords.contains_key(&name) {
            return Err(EventsError::InvalidDataset(format!(
                "dimension '{name}' defined twice"
            )));
        }
        self.dims.push(name.clone());
        self.coords.insert(name, labels);
        Ok(self)
    }

    /// Add a data variable. `data.len()` must equal the product of the sizes
    /// of `dims`.
    pub fn with_variable(
        mut self,
        name: impl Into<String>,
        dims: &[&str],
        data: Vec<f64>,
    ) -> Result<Self> {
        let name = name.into();
        let var = Variable {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
        };
        self.check_variable(&name, &var)?;
        self.variables.insert(name, var);
        Ok(self)
    }

    fn check_variable(&self, name: &str, var: &Variable) -> Result<()> {
        let mut expected = 1usize;
        for dim in &var.dims {
            let labels = self.coords.get(dim).ok_or_else(|| {
                EventsError::InvalidDataset(format!(
                    "variable '{name}' uses unknown dimension '{dim}'"
                ))
            })?;
            expected *= labels.len();
        }
        if var.data.len() != expected {
            return Err(EventsError::InvalidDataset(format!(
                "variable '{name}' has {} values, expected {expected}",
                var.data.len()
            )));
        }
        Ok(())
    }

    pub fn coord(&self, dim: &str) -> Option<&[Value]> {
        self.coords.get(dim).map(Vec::as_slice)
    }

    /// `(dimension, length)` in dimension order.
    pub fn sizes(&self) -> Vec<(&str, usize)> {
        self.dims
            .iter()
            .map(|d| (d.as_str(), self.coords.get(d).map_or(0, Vec::len)))
            .collect()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.variables.keys().map(String::as_str)
    }

    pub fn scalar_coord(&self, name: &str) -> Option<&Value> {
        self.scalar_coords.get(name)
    }

    // -- JSON --

    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: DatasetFile = serde_json::from_str(text)
            .context("parsing dataset JSON")
            .map_err(|e| EventsError::InvalidDataset(format!("{e:#}")))?;
        let mut ds = Dataset::new();
        for coord in file.coords {
            let labels = coord.labels.iter().map(json_to_value).collect();
            ds = ds.with_coord(coord.name, labels)?;
        }
        for (name, var) in file.data_vars {
            ds.check_variable(&name, &var)?;
            ds.variables.insert(name, var);
        }
        ds.scalar_coords = file
            .scalar_coords
            .iter()
            .map(|(k, v)| (k.clone(), json_to_value(v)))
            .collect();
        Ok(ds)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))
            .map_err(|e| EventsError::InvalidDataset(format!("{e:#}")))?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        let to_json = |v: &Value| serde_json::to_value(v).unwrap_or(JsonValue::Null);
        let file = DatasetFile {
            coords: self
                .dims
                .iter()
                .map(|d| CoordFile {
                    name: d.clone(),
                    labels: self.coords.get(d).into_iter().flatten().map(to_json).collect(),
                })
                .collect(),
            data_vars: self.variables.clone(),
            scalar_coords: self
                .scalar_coords
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        };
        serde_json::to_string_pretty(&file).context("serializing dataset")
    }

    // -- Selection helpers --

    /// Keep `positions` along `dim` in every variable. With `collapse` the
    /// dimension disappears (exactly one position expected).
    fn take_along(&self, dim: &str, positions: &[usize], collapse: bool) -> Dataset {
        let mut out = self.clone();
        for var in out.variables.values_mut() {
            let Some(axis) = var.dims.iter().position(|d| d == dim) else {
                continue;
            };
            let shape: Vec<usize> = var
                .dims
                .iter()
                .map(|d| self.coords.get(d).map_or(0, Vec::len))
                .collect();
            let size = shape[axis];
            let outer: usize = shape[..axis].iter().product();
            let inner: usize = shape[axis + 1..].iter().product();

            let mut data = Vec::with_capacity(outer * positions.len() * inner);
            for o in 0..outer {
                for &p in positions {
                    let start = (o * size + p) * inner;
                    data.extend_from_slice(&var.data[start..start + inner]);
                }
            }
            var.data = data;
            if collapse {
                var.dims.remove(axis);
            }
        }

        if collapse {
            out.dims.retain(|d| d != dim);
            out.coords.remove(dim);
        } else if let Some(labels) = self.coords.get(dim) {
            let kept = positions.iter().map(|&p| labels[p].clone()).collect();
            out.coords.insert(dim.to_string(), kept);
        }
        out
    }
}

/// Position of the label matching `target`, exactly or by `options.method`.
fn locate(dim: &str, labels: &[Value], target: &Value, options: &SelectOptions) -> Result<usize> {
    if let Some(pos) = labels.iter().position(|l| l.same(target)) {
        return Ok(pos);
    }
    let not_found = || EventsError::LabelNotFound {
        dim: dim.to_string(),
        label: target.to_string(),
    };
    let Some(method) = options.method else {
        return Err(not_found());
    };
    let t = target.as_f64().ok_or_else(not_found)?;
    let candidates = labels
        .iter()
        .enumerate()
        .filter_map(|(i, l)| l.as_f64().map(|x| (i, x)));
    let by_distance = |a: &(usize, f64), b: &(usize, f64)| (a.1 - t).abs().total_cmp(&(b.1 - t).abs());
    let best = match method {
        Method::Nearest => candidates.min_by(by_distance),
        Method::Pad => candidates.filter(|&(_, x)| x <= t).min_by(by_distance),
        Method::Backfill => candidates.filter(|&(_, x)| x >= t).min_by(by_distance),
    };
    let (pos, x) = best.ok_or_else(not_found)?;
    if let Some(tolerance) = options.tolerance {
        if (x - t).abs() > tolerance {
            return Err(EventsError::NoMatchWithinTolerance {
                dim: dim.to_string(),
                label: target.to_string(),
                tolerance,
            });
        }
    }
    Ok(pos)
}

impl LabeledArray for Dataset {
    fn dims(&self) -> Vec<String> {
        self.dims.clone()
    }

    fn select(&self, indexers: &ConstraintSet, options: &SelectOptions) -> Result<Self> {
        if options.tolerance.is_some() && options.method.is_none() {
            return Err(EventsError::InvalidSelection(
                "tolerance requires a matching method".into(),
            ));
        }

        let mut out = self.clone();
        for (dim, constraint) in indexers.iter() {
            let labels = out
                .coords
                .get(dim)
                .ok_or_else(|| EventsError::UnknownDimension {
                    dim: dim.to_string(),
                })?;

            match constraint {
                Constraint::Scalar(target) => {
                    let pos = locate(dim, labels, target, options)?;
                    let label = labels[pos].clone();
                    out = out.take_along(dim, &[pos], true);
                    if !options.drop {
                        out.scalar_coords.insert(dim.to_string(), label);
                    }
                }
                Constraint::Membership(wanted) => {
                    let positions: Vec<usize> = if options.method.is_some() {
                        let mut found = wanted
                            .iter()
                            .map(|w| locate(dim, labels, w, options))
                            .collect::<Result<Vec<_>>>()?;
                        // Coordinate order; several targets may land on one label.
                        found.sort_unstable();
                        found.dedup();
                        found
                    } else {
                        if let Some(missing) =
                            wanted.iter().find(|w| !labels.iter().any(|l| l.same(w)))
                        {
                            return Err(EventsError::LabelNotFound {
                                dim: dim.to_string(),
                                label: missing.to_string(),
                            });
                        }
                        (0..labels.len())
                            .filter(|&i| constraint.matches(&labels[i]))
                            .collect()
                    };
                    out = out.take_along(dim, &positions, false);
                }
                Constraint::Predicate(p) => {
                    let positions: Vec<usize> = (0..labels.len())
                        .filter(|&i| p.test(&labels[i]))
                        .collect();
                    out = out.take_along(dim, &positions, false);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// time = [0, 1, 2, 3], channel = [a, b, c], signal[t][c] = 3t + c
    fn grid() -> Dataset {
        Dataset::new()
            .with_coord("time", (0..4).map(Value::from).collect())
            .unwrap()
            .with_coord("channel", vec!["a".into(), "b".into(), "c".into()])
            .unwrap()
            .with_variable("signal", &["time", "channel"], (0..12).map(f64::from).collect())
            .unwrap()
            .with_variable("gain", &["channel"], vec![0.5, 1.0, 2.0])
            .unwrap()
    }

    fn select(ds: &Dataset, set: ConstraintSet, options: SelectOptions) -> Result<Dataset> {
        ds.select(&set, &options)
    }

    #[test]
    fn test_scalar_collapses_dimension() {
        let out = select(&grid(), ConstraintSet::new().with("channel", "b"), SelectOptions::default()).unwrap();
        assert_eq!(out.dims(), vec!["time".to_string()]);
        assert_eq!(out.variable_names().collect::<Vec<_>>(), vec!["gain", "signal"]);
        assert_eq!(out.variable("signal").unwrap().data, vec![1.0, 4.0, 7.0, 10.0]);
        assert!(out.variable("gain").unwrap().dims.is_empty());
        assert_eq!(out.variable("gain").unwrap().data, vec![1.0]);
        assert_eq!(out.scalar_coord("channel"), Some(&Value::from("b")));
    }

    #[test]
    fn test_drop_discards_scalar_coord() {
        let options = SelectOptions {
            drop: true,
            ..Default::default()
        };
        let out = select(&grid(), ConstraintSet::new().with("time", 2), options).unwrap();
        assert!(out.scalar_coord("time").is_none());
        assert_eq!(out.variable("signal").unwrap().data, vec![6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_membership_keeps_coordinate_order() {
        let out = select(&grid(), ConstraintSet::new().with("time", vec![3, 1]), SelectOptions::default()).unwrap();
        assert_eq!(out.coord("time").unwrap(), &[Value::Integer(1), Value::Integer(3)]);
        assert_eq!(
            out.variable("signal").unwrap().data,
            vec![3.0, 4.0, 5.0, 9.0, 10.0, 11.0]
        );
    }

    #[test]
    fn test_approximate_membership_merges_shared_labels() {
        let nearest = SelectOptions {
            method: Some(Method::Nearest),
            ..Default::default()
        };
        let set = ConstraintSet::new().with("time", vec![2.9, 0.2, 3.1]);
        let out = select(&grid(), set, nearest).unwrap();
        assert_eq!(out.coord("time").unwrap(), &[Value::Integer(0), Value::Integer(3)]);
        assert_eq!(
            out.variable("signal").unwrap().data,
            vec![0.0, 1.0, 2.0, 9.0, 10.0, 11.0]
        );
    }

    #[test]
    fn test_missing_label_is_an_error() {
        let result = select(&grid(), ConstraintSet::new().with("time", vec![1, 9]), SelectOptions::default());
        assert!(matches!(result, Err(EventsError::LabelNotFound { .. })));
        let result = select(&grid(), ConstraintSet::new().with("channel", "z"), SelectOptions::default());
        assert!(matches!(result, Err(EventsError::LabelNotFound { .. })));
    }

    #[test]
    fn test_nearest_with_tolerance() {
        let nearest = SelectOptions {
            method: Some(Method::Nearest),
            ..Default::default()
        };
        let out = select(&grid(), ConstraintSet::new().with("time", 2.4), nearest).unwrap();
        assert_eq!(out.scalar_coord("time"), Some(&Value::Integer(2)));

        let tight = SelectOptions {
            tolerance: Some(0.3),
            ..nearest
        };
        let result = select(&grid(), ConstraintSet::new().with("time", 2.4), tight);
        assert!(matches!(result, Err(EventsError::NoMatchWithinTolerance { .. })));
    }

    #[test]
    fn test_pad_and_backfill() {
        let pad = SelectOptions {
            method: Some(Method::Pad),
            ..Default::default()
        };
        let out = select(&grid(), ConstraintSet::new().with("time", 2.7), pad).unwrap();
        assert_eq!(out.scalar_coord("time"), Some(&Value::Integer(2)));

        let backfill = SelectOptions {
            method: Some(Method::Backfill),
            ..Default::default()
        };
        let out = select(&grid(), ConstraintSet::new().with("time", 2.2), backfill).unwrap();
        assert_eq!(out.scalar_coord("time"), Some(&Value::Integer(3)));

        let result = select(&grid(), ConstraintSet::new().with("time", 7), backfill);
        assert!(matches!(result, Err(EventsError::LabelNotFound { .. })));
    }

    #[test]
    fn test_predicate_on_dimension() {
        let set = ConstraintSet::new().with("time", Constraint::predicate(|v| v.as_i64() >= Some(2)));
        let out = select(&grid(), set, SelectOptions::default()).unwrap();
        assert_eq!(out.sizes(), vec![("time", 2), ("channel", 3)]);
    }

    #[test]
    fn test_tolerance_requires_method() {
        let options = SelectOptions {
            tolerance: Some(1.0),
            ..Default::default()
        };
        let result = select(&grid(), ConstraintSet::new().with("time", 1), options);
        assert!(matches!(result, Err(EventsError::InvalidSelection(_))));
    }

    #[test]
    fn test_unknown_dimension() {
        let result = select(&grid(), ConstraintSet::new().with("depth", 1), SelectOptions::default());
        assert!(matches!(result, Err(EventsError::UnknownDimension { .. })));
    }

    #[test]
    fn test_bad_variable_shape() {
        let result = Dataset::new()
            .with_coord("time", vec![1.into(), 2.into()])
            .unwrap()
            .with_variable("v", &["time"], vec![1.0]);
        assert!(matches!(result, Err(EventsError::InvalidDataset(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let ds = select(&grid(), ConstraintSet::new().with("channel", "a"), SelectOptions::default()).unwrap();
        let text = ds.to_json_string().unwrap();
        let back = Dataset::from_json_str(&text).unwrap();
        assert_eq!(back, ds);
    }
}
