//! Runtime value types

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Runtime value type
///
/// An absent value ("undefined") is modelled as `Option<Value>::None` at every
/// boundary that can carry one, so there is no `Undefined` variant here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
}

impl Value {
    /// Check if value is truthy (for hat predicates and conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    /// Boolean view used by conditionals: the strings "", "0" and "false"
    /// (any case) read as false
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::String(s) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
            other => other.is_truthy(),
        }
    }

    /// Numeric view of the value. Anything that doesn't parse is 0.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) if n.is_nan() => 0.0,
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return 0.0;
                }
                match trimmed.parse::<f64>() {
                    Ok(n) if !n.is_nan() => n,
                    _ => 0.0,
                }
            }
        }
    }

    /// Whether the value reads as a number (strings included)
    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
            }
            _ => None,
        }
    }

    /// Compare two values: numerically when both read as numbers,
    /// otherwise as case-insensitive text.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => {
                let a = self.to_string().to_lowercase();
                let b = other.to_string().to_lowercase();
                a.cmp(&b)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Number(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    write!(f, "{}", if *n > 0.0 { "Infinity" } else { "-Infinity" })
                } else if *n == n.trunc() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(Value::Number(-2.0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        // Non-empty strings are truthy even when they spell a falsy number
        assert!(Value::String("0".to_string()).is_truthy());
    }

    #[test]
    fn test_to_boolean_reads_falsy_strings() {
        assert!(!Value::from("false").to_boolean());
        assert!(!Value::from("FALSE").to_boolean());
        assert!(!Value::from("0").to_boolean());
        assert!(Value::from("no").to_boolean());
        assert!(Value::Number(1.0).to_boolean());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::from(" 12.5 ").to_number(), 12.5);
        assert_eq!(Value::from("apple").to_number(), 0.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert_eq!(Value::Bool(true).to_number(), 1.0);
    }

    #[test]
    fn test_display_drops_integer_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }

    #[test]
    fn test_compare_mixed() {
        assert_eq!(Value::from("10").compare(&Value::Number(9.0)), Ordering::Greater);
        assert_eq!(Value::from("Apple").compare(&Value::from("apple")), Ordering::Equal);
        assert_eq!(Value::from("a").compare(&Value::from("b")), Ordering::Less);
    }

    #[test]
    fn test_untagged_json() {
        let values: Vec<Value> = serde_json::from_str(r#"[true, 4, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![Value::Bool(true), Value::Number(4.0), Value::String("x".to_string())]
        );
    }
}
