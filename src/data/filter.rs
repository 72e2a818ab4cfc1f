use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::ops::{Range, RangeInclusive};
use std::sync::Arc;

use log::{debug, trace};

use super::model::{EventTable, Value};
use crate::error::{EventsError, Result};

// ---------------------------------------------------------------------------
// Constraint: how one named column (or dimension) is narrowed
// ---------------------------------------------------------------------------

type PredicateFn = dyn Fn(&Value) -> anyhow::Result<bool> + Send + Sync;

/// A boolean test over a single cell.
#[derive(Clone)]
pub struct Predicate(Arc<PredicateFn>);

impl Predicate {
    /// Evaluate on one cell. An error counts as "no match".
    pub fn test(&self, value: &Value) -> bool {
        match (self.0)(value) {
            Ok(keep) => keep,
            Err(err) => {
                trace!("predicate failed on {value}: {err:#}");
                false
            }
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// The value bound to a constraint name.
///
/// * `Membership` – keep entries whose value is one of the set
/// * `Predicate`  – keep entries for which the function returns `true`
/// * `Scalar`     – keep entries equal to the value
#[derive(Debug, Clone)]
pub enum Constraint {
    Membership(BTreeSet<Value>),
    Predicate(Predicate),
    Scalar(Value),
}

impl Constraint {
    /// Membership over any collection of candidate values.
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Constraint::Membership(values.into_iter().map(Into::into).collect())
    }

    /// Predicate from an infallible test.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Constraint::Predicate(Predicate(Arc::new(move |v| Ok(f(v)))))
    }

    /// Predicate from a fallible test; rows where it errors are excluded.
    pub fn try_predicate<F>(f: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Constraint::Predicate(Predicate(Arc::new(f)))
    }

    /// Equality with a single value.
    pub fn equals<V: Into<Value>>(value: V) -> Self {
        Constraint::Scalar(value.into())
    }

    /// Whether a cell satisfies this constraint.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Constraint::Membership(set) => {
                set.contains(value)
                    || value
                        .numeric_twin()
                        .is_some_and(|twin| set.contains(&twin))
            }
            Constraint::Predicate(p) => p.test(value),
            Constraint::Scalar(expected) => value.same(expected),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::Membership(_) => "membership",
            Constraint::Predicate(_) => "predicate",
            Constraint::Scalar(_) => "scalar",
        }
    }
}

macro_rules! scalar_constraint_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Constraint {
                fn from(v: $t) -> Self {
                    Constraint::Scalar(v.into())
                }
            }
        )*
    };
}

scalar_constraint_from!(Value, &str, String, i64, i32, u32, f64, bool);

impl<T: Into<Value>> From<Vec<T>> for Constraint {
    fn from(values: Vec<T>) -> Self {
        Constraint::one_of(values)
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Constraint {
    fn from(values: [T; N]) -> Self {
        Constraint::one_of(values)
    }
}

impl From<BTreeSet<Value>> for Constraint {
    fn from(values: BTreeSet<Value>) -> Self {
        Constraint::Membership(values)
    }
}

impl From<HashSet<Value>> for Constraint {
    fn from(values: HashSet<Value>) -> Self {
        Constraint::one_of(values)
    }
}

impl From<Range<i64>> for Constraint {
    fn from(values: Range<i64>) -> Self {
        Constraint::one_of(values)
    }
}

impl From<RangeInclusive<i64>> for Constraint {
    fn from(values: RangeInclusive<i64>) -> Self {
        Constraint::one_of(values)
    }
}

// ---------------------------------------------------------------------------
// ConstraintSet: ordered name → constraint mapping
// ---------------------------------------------------------------------------

/// Named constraints in insertion order. Inserting a name that is already
/// present replaces its constraint in place.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    entries: Vec<(String, Constraint)>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ConstraintSet::insert`].
    pub fn with(mut self, name: impl Into<String>, constraint: impl Into<Constraint>) -> Self {
        self.insert(name, constraint);
        self
    }

    /// Insert or replace. Returns the replaced constraint, if any.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        constraint: impl Into<Constraint>,
    ) -> Option<Constraint> {
        let name = name.into();
        let constraint = constraint.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, constraint)),
            None => {
                self.entries.push((name, constraint));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Constraint> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> + '_ {
        self.entries.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` into `self`; `other` wins on name collisions.
    /// Returns the names that collided.
    pub fn merge(&mut self, other: ConstraintSet) -> Vec<String> {
        let mut collisions = Vec::new();
        for (name, constraint) in other {
            if self.insert(name.clone(), constraint).is_some() {
                collisions.push(name);
            }
        }
        collisions
    }
}

impl IntoIterator for ConstraintSet {
    type Item = (String, Constraint);
    type IntoIter = std::vec::IntoIter<(String, Constraint)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<S: Into<String>, C: Into<Constraint>> FromIterator<(S, C)> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = (S, C)>>(iter: I) -> Self {
        let mut set = ConstraintSet::new();
        for (name, constraint) in iter {
            set.insert(name, constraint);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Return positions of rows whose `column` cell satisfies `constraint`.
pub fn matching_rows(
    table: &EventTable,
    column: &str,
    constraint: &Constraint,
) -> Result<Vec<usize>> {
    let cells = table.column(column).ok_or_else(|| EventsError::UnknownColumn {
        column: column.to_string(),
    })?;
    Ok(cells
        .enumerate()
        .filter(|(_, cell)| constraint.matches(cell))
        .map(|(i, _)| i)
        .collect())
}

/// Narrow `table` by every constraint, in order.
///
/// Each constraint is applied to the result of the previous one, so the row
/// count can only stay the same or shrink. An empty set returns an identical
/// table.
pub fn filter_events(table: &EventTable, constraints: &ConstraintSet) -> Result<EventTable> {
    let mut current = table.clone();
    for (column, constraint) in constraints.iter() {
        let before = current.len();
        let keep = matching_rows(&current, column, constraint)?;
        if keep.len() != before {
            current = current.take(&keep);
        }
        debug!(
            "filter {column} ({}): {before} -> {} events",
            constraint.kind(),
            current.len()
        );
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xs() -> EventTable {
        EventTable::from_rows(
            ["x", "label"],
            vec![
                vec![1.into(), "A".into()],
                vec![2.into(), "B".into()],
                vec![3.into(), "A".into()],
                vec![4.into(), "C".into()],
            ],
        )
        .unwrap()
    }

    fn column_x(table: &EventTable) -> Vec<i64> {
        table
            .column("x")
            .unwrap()
            .filter_map(Value::as_i64)
            .collect()
    }

    #[test]
    fn test_membership_keeps_listed_values() {
        let set = ConstraintSet::new().with("x", vec![2, 4]);
        let out = filter_events(&xs(), &set).unwrap();
        assert_eq!(column_x(&out), vec![2, 4]);
    }

    #[test]
    fn test_predicate_keeps_true_rows() {
        let set = ConstraintSet::new().with(
            "x",
            Constraint::predicate(|v| v.as_f64().is_some_and(|x| x > 2.0)),
        );
        let out = filter_events(&xs(), &set).unwrap();
        assert_eq!(column_x(&out), vec![3, 4]);
    }

    #[test]
    fn test_scalar_keeps_equal_rows() {
        let set = ConstraintSet::new().with("x", Constraint::equals(3));
        let out = filter_events(&xs(), &set).unwrap();
        assert_eq!(column_x(&out), vec![3]);
        assert_eq!(out.event_ids(), &[2]);
    }

    #[test]
    fn test_predicate_errors_exclude_row() {
        let set = ConstraintSet::new().with(
            "x",
            Constraint::try_predicate(|v| {
                let x = v.as_i64().ok_or_else(|| anyhow::anyhow!("not an int"))?;
                anyhow::ensure!(x != 2, "two is unsupported");
                Ok(true)
            }),
        );
        let out = filter_events(&xs(), &set).unwrap();
        assert_eq!(column_x(&out), vec![1, 3, 4]);
    }

    #[test]
    fn test_membership_from_ranges_and_sets() {
        let by_range = filter_events(&xs(), &ConstraintSet::new().with("x", 2_i64..4)).unwrap();
        assert_eq!(column_x(&by_range), vec![2, 3]);

        let set: HashSet<Value> = [Value::Integer(1), Value::Integer(4)].into_iter().collect();
        let by_set = filter_events(&xs(), &ConstraintSet::new().with("x", set)).unwrap();
        assert_eq!(column_x(&by_set), vec![1, 4]);
    }

    #[test]
    fn test_membership_matches_integral_floats() {
        let set = ConstraintSet::new().with("x", vec![2.0, 3.5]);
        let out = filter_events(&xs(), &set).unwrap();
        assert_eq!(column_x(&out), vec![2]);
    }

    #[test]
    fn test_constraints_apply_sequentially() {
        let set = ConstraintSet::new()
            .with("label", "A")
            .with("x", Constraint::predicate(|v| v.as_i64() > Some(1)));
        let out = filter_events(&xs(), &set).unwrap();
        assert_eq!(column_x(&out), vec![3]);
    }

    #[test]
    fn test_empty_set_returns_identical_table() {
        let table = xs();
        assert_eq!(filter_events(&table, &ConstraintSet::new()).unwrap(), table);
    }

    #[test]
    fn test_unknown_column_is_an_error() {
        let set = ConstraintSet::new().with("nope", 1);
        let result = filter_events(&xs(), &set);
        assert!(matches!(result, Err(EventsError::UnknownColumn { .. })));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let set = ConstraintSet::new().with("label", vec!["A", "C"]);
        let once = filter_events(&xs(), &set).unwrap();
        let twice = filter_events(&once, &set).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_membership_and_scalar_agree_on_signed_zero_and_nan() {
        let table = EventTable::from_rows(
            ["x"],
            vec![vec![0.0.into()], vec![(-0.0).into()], vec![f64::NAN.into()], vec![1.5.into()]],
        )
        .unwrap();

        for needle in [0.0, -0.0, f64::NAN] {
            let by_scalar =
                filter_events(&table, &ConstraintSet::new().with("x", Constraint::equals(needle)))
                    .unwrap();
            let by_set =
                filter_events(&table, &ConstraintSet::new().with("x", vec![needle])).unwrap();
            assert_eq!(by_scalar.event_ids(), by_set.event_ids(), "needle {needle}");
        }

        let negative_zero = ConstraintSet::new().with("x", Constraint::equals(-0.0));
        let zeros = filter_events(&table, &negative_zero).unwrap();
        assert_eq!(zeros.event_ids(), &[0, 1]);

        let hashed: HashSet<Value> = [Value::Float(0.0), Value::Float(-0.0)].into_iter().collect();
        assert_eq!(hashed.len(), 1);
        let by_hash_set = filter_events(&table, &ConstraintSet::new().with("x", hashed)).unwrap();
        assert_eq!(by_hash_set.event_ids(), &[0, 1]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut set = ConstraintSet::new().with("a", 1).with("b", 2);
        let old = set.insert("a", 3);
        assert!(matches!(old, Some(Constraint::Scalar(Value::Integer(1)))));
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b"]);

        let collisions = set.merge(ConstraintSet::new().with("b", 5).with("c", 6));
        assert_eq!(collisions, vec!["b".to_string()]);
        assert!(matches!(set.get("b"), Some(Constraint::Scalar(Value::Integer(5)))));
        assert_eq!(set.len(), 3);
    }
}
