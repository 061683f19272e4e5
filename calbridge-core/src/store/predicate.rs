//! Row selection predicates.

use std::fmt;

use serde_json::Value;

use super::Row;

/// A selection over store rows. Column comparisons against missing or
/// mistyped fields never match.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Always,
    Never,
    And(Vec<Predicate>),
    /// Column is an integer strictly greater than the value.
    Gt(String, i64),
    Ge(String, i64),
    /// Column is an integer strictly less than the value.
    Lt(String, i64),
    Le(String, i64),
    Eq(String, Value),
    /// Column is `true` or a non-zero integer.
    Flag(String),
    /// Column is a string containing the pattern (case-sensitive).
    Contains(String, String),
}

impl Predicate {
    pub fn gt(column: &str, value: i64) -> Self {
        Predicate::Gt(column.to_string(), value)
    }

    pub fn ge(column: &str, value: i64) -> Self {
        Predicate::Ge(column.to_string(), value)
    }

    pub fn lt(column: &str, value: i64) -> Self {
        Predicate::Lt(column.to_string(), value)
    }

    pub fn le(column: &str, value: i64) -> Self {
        Predicate::Le(column.to_string(), value)
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Predicate::Eq(column.to_string(), value.into())
    }

    pub fn flag(column: &str) -> Self {
        Predicate::Flag(column.to_string())
    }

    pub fn contains(column: &str, pattern: &str) -> Self {
        Predicate::Contains(column.to_string(), pattern.to_string())
    }

    /// Conjunction that collapses trivial cases.
    pub fn and(parts: Vec<Predicate>) -> Self {
        if parts.contains(&Predicate::Never) {
            return Predicate::Never;
        }

        let mut parts: Vec<Predicate> = parts
            .into_iter()
            .filter(|p| *p != Predicate::Always)
            .collect();

        match parts.len() {
            0 => Predicate::Always,
            1 => parts.remove(0),
            _ => Predicate::And(parts),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Never => false,
            Predicate::And(parts) => parts.iter().all(|p| p.matches(row)),
            Predicate::Gt(column, value) => int_field(row, column).is_some_and(|v| v > *value),
            Predicate::Ge(column, value) => int_field(row, column).is_some_and(|v| v >= *value),
            Predicate::Lt(column, value) => int_field(row, column).is_some_and(|v| v < *value),
            Predicate::Le(column, value) => int_field(row, column).is_some_and(|v| v <= *value),
            Predicate::Eq(column, value) => row.get(column) == Some(value),
            Predicate::Flag(column) => match row.get(column) {
                Some(Value::Bool(set)) => *set,
                Some(value) => value.as_i64().is_some_and(|n| n != 0),
                None => false,
            },
            Predicate::Contains(column, pattern) => row
                .get(column)
                .and_then(Value::as_str)
                .is_some_and(|s| s.contains(pattern.as_str())),
        }
    }
}

fn int_field(row: &Row, column: &str) -> Option<i64> {
    row.get(column).and_then(Value::as_i64)
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Predicate::Always => write!(f, "1"),
            Predicate::Never => write!(f, "0"),
            Predicate::And(parts) => {
                let rendered: Vec<String> = parts.iter().map(ToString::to_string).collect();
                write!(f, "({})", rendered.join(" AND "))
            }
            Predicate::Gt(column, value) => write!(f, "{} > {}", column, value),
            Predicate::Ge(column, value) => write!(f, "{} >= {}", column, value),
            Predicate::Lt(column, value) => write!(f, "{} < {}", column, value),
            Predicate::Le(column, value) => write!(f, "{} <= {}", column, value),
            Predicate::Eq(column, value) => write!(f, "{} = {}", column, value),
            Predicate::Flag(column) => write!(f, "{} != 0", column),
            Predicate::Contains(column, pattern) => write!(f, "{} LIKE '%{}%'", column, pattern),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_flag_accepts_bool_and_integer() {
        let active = Predicate::flag("visible");

        assert!(active.matches(&row(json!({"visible": 1}))));
        assert!(active.matches(&row(json!({"visible": true}))));
        assert!(!active.matches(&row(json!({"visible": 0}))));
        assert!(!active.matches(&row(json!({"visible": false}))));
        assert!(!active.matches(&row(json!({"visible": "1"}))));
        assert!(!active.matches(&row(json!({}))));
        assert_eq!(active.to_string(), "visible != 0");
    }

    #[test]
    fn test_and_collapses_trivial_parts() {
        assert_eq!(Predicate::and(vec![]), Predicate::Always);
        assert_eq!(
            Predicate::and(vec![Predicate::Always, Predicate::gt("a", 1)]),
            Predicate::gt("a", 1)
        );
        assert_eq!(
            Predicate::and(vec![Predicate::gt("a", 1), Predicate::Never]),
            Predicate::Never
        );
    }

    #[test]
    fn test_comparisons_are_strict() {
        let r = row(json!({"dtstart": 100}));
        assert!(Predicate::gt("dtstart", 99).matches(&r));
        assert!(!Predicate::gt("dtstart", 100).matches(&r));
        assert!(Predicate::lt("dtstart", 101).matches(&r));
        assert!(!Predicate::lt("dtstart", 100).matches(&r));
        assert!(Predicate::ge("dtstart", 100).matches(&r));
        assert!(Predicate::le("dtstart", 100).matches(&r));
        assert!(!Predicate::le("dtstart", 99).matches(&r));
    }

    #[test]
    fn test_missing_or_mistyped_fields_never_match() {
        let r = row(json!({"dtstart": "100", "title": 5}));
        assert!(!Predicate::gt("dtstart", 0).matches(&r));
        assert!(!Predicate::lt("dtend", i64::MAX).matches(&r));
        assert!(!Predicate::contains("title", "5").matches(&r));
    }

    #[test]
    fn test_contains_is_case_sensitive_substring() {
        let r = row(json!({"title": "Daily Standup"}));
        assert!(Predicate::contains("title", "Stand").matches(&r));
        assert!(!Predicate::contains("title", "stand").matches(&r));
    }

    #[test]
    fn test_display_renders_selection() {
        let p = Predicate::and(vec![Predicate::gt("dtstart", 1), Predicate::lt("dtend", 2)]);
        assert_eq!(p.to_string(), "(dtstart > 1 AND dtend < 2)");
    }
}
