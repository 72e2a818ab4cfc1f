//! Text form of a single constraint, as typed on the command line.
//!
//! | Expression      | Constraint                      |
//! |-----------------|---------------------------------|
//! | `label=spike`   | scalar equality                 |
//! | `channel=a,b,c` | membership                      |
//! | `time>2.5`      | predicate (also `>=`, `<`, `<=`) |
//! | `label!=noise`  | predicate                       |

use std::cmp::Ordering;

use crate::data::filter::Constraint;
use crate::data::model::Value;
use crate::error::{EventsError, Result};

// Longest operators first so `>=` is not read as `>`.
const OPERATORS: [&str; 6] = ["!=", ">=", "<=", "=", ">", "<"];

/// Parse `name<op>value` into a named constraint.
pub fn parse_constraint(expr: &str) -> Result<(String, Constraint)> {
    let invalid = |why: &str| EventsError::InvalidSelection(format!("'{expr}': {why}"));

    let (at, op) = OPERATORS
        .iter()
        .filter_map(|op| expr.find(op).map(|at| (at, *op)))
        .min_by_key(|&(at, op)| (at, std::cmp::Reverse(op.len())))
        .ok_or_else(|| invalid("expected name=value, name>value, ..."))?;

    let name = expr[..at].trim();
    let raw = expr[at + op.len()..].trim();
    if name.is_empty() {
        return Err(invalid("missing name"));
    }
    if raw.is_empty() {
        return Err(invalid("missing value"));
    }

    let constraint = match op {
        "=" if raw.contains(',') => Constraint::one_of(raw.split(',').map(|s| Value::guess(s.trim()))),
        "=" => Constraint::Scalar(Value::guess(raw)),
        "!=" => {
            let rhs = Value::guess(raw);
            Constraint::predicate(move |v| !v.same(&rhs))
        }
        _ => {
            let rhs = Value::guess(raw);
            let accept: fn(Ordering) -> bool = match op {
                ">" => Ordering::is_gt,
                ">=" => Ordering::is_ge,
                "<" => Ordering::is_lt,
                _ => Ordering::is_le,
            };
            Constraint::predicate(move |v| compare(v, &rhs).is_some_and(accept))
        }
    };
    Ok((name.to_string(), constraint))
}

/// Order two cells numerically when both are numbers, textually when both
/// are text. Mixed kinds are incomparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Some(x.cmp(y));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(expr: &str, cell: Value) -> bool {
        let (_, c) = parse_constraint(expr).unwrap();
        c.matches(&cell)
    }

    #[test]
    fn test_scalar_and_membership() {
        let (name, c) = parse_constraint("label = spike").unwrap();
        assert_eq!(name, "label");
        assert!(matches!(c, Constraint::Scalar(Value::String(ref s)) if s == "spike"));

        let (_, c) = parse_constraint("channel=a, b").unwrap();
        match c {
            Constraint::Membership(set) => assert_eq!(set.len(), 2),
            other => panic!("Expected membership, got {other:?}"),
        }
    }

    #[test]
    fn test_comparisons() {
        assert!(check("time>2", Value::Float(2.5)));
        assert!(!check("time>2", Value::Integer(2)));
        assert!(check("time>=2", Value::Integer(2)));
        assert!(check("time<2", Value::Integer(1)));
        assert!(check("time<=2", Value::Float(2.0)));
        assert!(!check("time<2", Value::String("x".into())));
        assert!(check("label!=noise", Value::from("spike")));
        assert!(!check("label!=noise", Value::from("noise")));
    }

    #[test]
    fn test_malformed() {
        assert!(parse_constraint("label").is_err());
        assert!(parse_constraint("=3").is_err());
        assert!(parse_constraint("x>").is_err());
    }
}
