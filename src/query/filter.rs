//! Structured filter predicates evaluated over opaque resource records.
//!
//! Callers submit filters as JSON, e.g.
//! `{"site": {"eq": "UCSD"}, "cores_available": {"gte": 64}}` or
//! `{"or": [{"name": {"icontains": "ucsd"}}, {"layer": "L2"}]}`.
//! A bare value is shorthand for `eq`. Field names may use dotted paths to
//! reach into nested objects (`"labels.region"`). Expressions are parsed once
//! and interpreted safely; no caller-supplied code is ever evaluated.

use crate::error::{Error, Result};
use crate::fabric::Record;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

const OPERATOR_NAMES: [&str; 10] = [
    "eq", "ne", "lt", "lte", "gt", "gte", "in", "contains", "icontains", "regex",
];

#[derive(Debug, Clone)]
pub enum FilterExpr {
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
    Cmp { field: String, op: FilterOp },
}

#[derive(Debug, Clone)]
pub enum FilterOp {
    Eq(Value),
    Ne(Value),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    /// Field value is a member of the given set.
    In(Vec<Value>),
    /// Substring for strings, membership for arrays, key presence for objects.
    Contains(Value),
    /// Case-insensitive substring match.
    IContains(String),
    /// Regular expression match, compiled at parse time.
    Regex(Regex),
}

impl FilterExpr {
    /// Parse a filter expression from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFilter` on non-object filters, unknown operator
    /// shapes, or unparseable regexes.
    pub fn parse(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidFilter("filter must be a JSON object".to_string()))?;

        let mut clauses = Vec::with_capacity(obj.len());
        for (key, val) in obj {
            match key.as_str() {
                "and" => clauses.push(Self::And(Self::parse_list(val, "and")?)),
                "or" => clauses.push(Self::Or(Self::parse_list(val, "or")?)),
                "not" => clauses.push(Self::Not(Box::new(Self::parse(val)?))),
                field => clauses.push(Self::parse_field(field, val)?),
            }
        }

        if clauses.is_empty() {
            return Err(Error::InvalidFilter("empty filter object".to_string()));
        }
        if clauses.len() == 1 {
            return Ok(clauses.remove(0));
        }
        Ok(Self::And(clauses))
    }

    fn parse_list(value: &Value, combinator: &str) -> Result<Vec<Self>> {
        let items = value.as_array().ok_or_else(|| {
            Error::InvalidFilter(format!("'{combinator}' expects an array of filters"))
        })?;
        items.iter().map(Self::parse).collect()
    }

    fn parse_field(field: &str, value: &Value) -> Result<Self> {
        // An object whose keys are all operator names is an operator map;
        // anything else is shorthand for equality against the literal value.
        let Some(ops) = value
            .as_object()
            .filter(|m| !m.is_empty() && m.keys().all(|k| OPERATOR_NAMES.contains(&k.as_str())))
        else {
            return Ok(Self::Cmp {
                field: field.to_string(),
                op: FilterOp::Eq(value.clone()),
            });
        };

        let mut clauses = Vec::with_capacity(ops.len());
        for (name, operand) in ops {
            clauses.push(Self::Cmp {
                field: field.to_string(),
                op: FilterOp::parse(name, operand)?,
            });
        }
        if clauses.len() == 1 {
            return Ok(clauses.remove(0));
        }
        Ok(Self::And(clauses))
    }

    /// Evaluate the expression against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::And(clauses) => clauses.iter().all(|c| c.matches(record)),
            Self::Or(clauses) => clauses.iter().any(|c| c.matches(record)),
            Self::Not(inner) => !inner.matches(record),
            Self::Cmp { field, op } => op.matches(lookup(record, field)),
        }
    }
}

impl FilterOp {
    fn parse(name: &str, operand: &Value) -> Result<Self> {
        let op = match name {
            "eq" => Self::Eq(operand.clone()),
            "ne" => Self::Ne(operand.clone()),
            "lt" => Self::Lt(operand.clone()),
            "lte" => Self::Lte(operand.clone()),
            "gt" => Self::Gt(operand.clone()),
            "gte" => Self::Gte(operand.clone()),
            "in" => {
                let set = operand.as_array().ok_or_else(|| {
                    Error::InvalidFilter("'in' expects an array operand".to_string())
                })?;
                Self::In(set.clone())
            }
            "contains" => Self::Contains(operand.clone()),
            "icontains" => {
                let needle = operand.as_str().ok_or_else(|| {
                    Error::InvalidFilter("'icontains' expects a string operand".to_string())
                })?;
                Self::IContains(needle.to_lowercase())
            }
            "regex" => {
                let pattern = operand.as_str().ok_or_else(|| {
                    Error::InvalidFilter("'regex' expects a string operand".to_string())
                })?;
                Self::Regex(Regex::new(pattern).map_err(|e| {
                    Error::InvalidFilter(format!("invalid regex '{pattern}': {e}"))
                })?)
            }
            other => {
                return Err(Error::InvalidFilter(format!("unknown operator '{other}'")));
            }
        };
        Ok(op)
    }

    fn matches(&self, actual: Option<&Value>) -> bool {
        match self {
            Self::Eq(expected) => actual.unwrap_or(&Value::Null) == expected,
            Self::Ne(expected) => actual.unwrap_or(&Value::Null) != expected,
            Self::Lt(v) => ordered(actual, v).is_some_and(|o| o == Ordering::Less),
            Self::Lte(v) => ordered(actual, v).is_some_and(|o| o != Ordering::Greater),
            Self::Gt(v) => ordered(actual, v).is_some_and(|o| o == Ordering::Greater),
            Self::Gte(v) => ordered(actual, v).is_some_and(|o| o != Ordering::Less),
            Self::In(set) => actual.is_some_and(|a| set.contains(a)),
            Self::Contains(needle) => actual.is_some_and(|a| contains(a, needle)),
            Self::IContains(needle) => actual.is_some_and(|a| icontains(a, needle)),
            Self::Regex(re) => actual.and_then(Value::as_str).is_some_and(|s| re.is_match(s)),
        }
    }
}

/// Resolve a possibly dotted field path inside a record.
fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn ordered(actual: Option<&Value>, expected: &Value) -> Option<Ordering> {
    let actual = actual?;
    if let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (actual.as_str(), expected.as_str()) {
        return Some(a.cmp(b));
    }
    None
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => needle.as_str().is_some_and(|n| s.contains(n)),
        Value::Array(items) => items.contains(needle),
        Value::Object(map) => needle.as_str().is_some_and(|n| map.contains_key(n)),
        _ => false,
    }
}

fn icontains(haystack: &Value, lowered_needle: &str) -> bool {
    match haystack {
        Value::String(s) => s.to_lowercase().contains(lowered_needle),
        Value::Array(items) => items.iter().any(|v| icontains(v, lowered_needle)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn parses(value: Value) -> FilterExpr {
        FilterExpr::parse(&value).unwrap()
    }

    #[test]
    fn test_implicit_eq_and_operator_map() {
        let site = record(json!({"site": "UCSD", "cores_available": 64}));

        assert!(parses(json!({"site": "UCSD"})).matches(&site));
        assert!(!parses(json!({"site": "RENC"})).matches(&site));
        assert!(parses(json!({"cores_available": {"gte": 64}})).matches(&site));
        assert!(!parses(json!({"cores_available": {"gt": 64}})).matches(&site));
        assert!(parses(json!({"cores_available": {"lt": 100}})).matches(&site));
    }

    #[test]
    fn test_multi_field_is_conjunction() {
        let expr = parses(json!({"site": "UCSD", "cores_available": {"gte": 32}}));
        assert!(expr.matches(&record(json!({"site": "UCSD", "cores_available": 32}))));
        assert!(!expr.matches(&record(json!({"site": "UCSD", "cores_available": 16}))));
        assert!(!expr.matches(&record(json!({"site": "RENC", "cores_available": 64}))));
    }

    #[test]
    fn test_logical_combinators() {
        let expr = parses(json!({
            "or": [
                {"layer": "L1"},
                {"and": [{"layer": "L2"}, {"bandwidth": {"gte": 100}}]}
            ]
        }));
        assert!(expr.matches(&record(json!({"layer": "L1", "bandwidth": 10}))));
        assert!(expr.matches(&record(json!({"layer": "L2", "bandwidth": 100}))));
        assert!(!expr.matches(&record(json!({"layer": "L2", "bandwidth": 40}))));

        let negated = parses(json!({"not": {"state": "Dead"}}));
        assert!(negated.matches(&record(json!({"state": "StableOK"}))));
        assert!(!negated.matches(&record(json!({"state": "Dead"}))));
    }

    #[test]
    fn test_in_contains_icontains_regex() {
        let port = record(json!({
            "site": "STAR",
            "name": "StarLight-400G-1-STAR",
            "labels": {"vlan_range": ["3110-3119"], "region": "sjc-zone2"},
            "components": {"GPU-Tesla T4": {"capacity": 2}}
        }));

        assert!(parses(json!({"site": {"in": ["UCSD", "STAR"]}})).matches(&port));
        assert!(!parses(json!({"site": {"in": ["UCSD", "RENC"]}})).matches(&port));
        assert!(parses(json!({"name": {"contains": "400G"}})).matches(&port));
        assert!(parses(json!({"components": {"contains": "GPU-Tesla T4"}})).matches(&port));
        assert!(parses(json!({"labels.vlan_range": {"contains": "3110-3119"}})).matches(&port));
        assert!(parses(json!({"name": {"icontains": "starlight"}})).matches(&port));
        assert!(parses(json!({"name": {"regex": "^StarLight-\\d+G"}})).matches(&port));
        assert!(!parses(json!({"name": {"regex": "^ESnet"}})).matches(&port));
    }

    #[test]
    fn test_dotted_paths_and_missing_fields() {
        let host = record(json!({"labels": {"region": "us-west"}}));
        assert!(parses(json!({"labels.region": "us-west"})).matches(&host));
        assert!(!parses(json!({"labels.zone": "a"})).matches(&host));
        // Missing field never satisfies an ordered comparison.
        assert!(!parses(json!({"cores_available": {"gte": 1}})).matches(&host));
        // Missing field equals null.
        assert!(parses(json!({"state": null})).matches(&host));
    }

    #[test]
    fn test_parse_errors() {
        assert!(FilterExpr::parse(&json!("lambda r: True")).is_err());
        assert!(FilterExpr::parse(&json!({})).is_err());
        assert!(FilterExpr::parse(&json!({"or": {"a": 1}})).is_err());
        assert!(FilterExpr::parse(&json!({"name": {"regex": "("}})).is_err());
        assert!(FilterExpr::parse(&json!({"site": {"in": "UCSD"}})).is_err());
    }
}
