//! Sorting and pagination applied after filtering.

use crate::fabric::Record;
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Stable sort by a record field. Records missing the field (or with a null
/// value) sort last regardless of direction.
pub fn apply_sort(items: &mut [Record], sort: Option<&SortSpec>) {
    let Some(sort) = sort else { return };

    items.sort_by(|a, b| {
        let left = a.get(&sort.field).filter(|v| !v.is_null());
        let right = b.get(&sort.field).filter(|v| !v.is_null());
        match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(l), Some(r)) => {
                let ord = compare_values(l, r);
                match sort.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            }
        }
    });
}

/// Slice out one page of results. `limit: None` means everything after `offset`.
#[must_use]
pub fn paginate(items: Vec<Record>, limit: Option<usize>, offset: usize) -> Vec<Record> {
    items
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return x.cmp(y);
    }
    if let (Some(x), Some(y)) = (a.as_bool(), b.as_bool()) {
        return x.cmp(&y);
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: &[Value]) -> Vec<Record> {
        values.iter().map(|v| v.as_object().cloned().unwrap()).collect()
    }

    fn names(items: &[Record]) -> Vec<&str> {
        items.iter().map(|r| r["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_sort_asc_and_desc() {
        let mut items = records(&[
            json!({"name": "b", "cores": 32}),
            json!({"name": "a", "cores": 8}),
            json!({"name": "c", "cores": 64}),
        ]);

        let spec: SortSpec = serde_json::from_value(json!({"field": "cores"})).unwrap();
        apply_sort(&mut items, Some(&spec));
        assert_eq!(names(&items), ["a", "b", "c"]);

        let spec: SortSpec =
            serde_json::from_value(json!({"field": "cores", "direction": "desc"})).unwrap();
        apply_sort(&mut items, Some(&spec));
        assert_eq!(names(&items), ["c", "b", "a"]);
    }

    #[test]
    fn test_missing_field_sorts_last_both_directions() {
        for direction in ["asc", "desc"] {
            let mut items = records(&[
                json!({"name": "x"}),
                json!({"name": "y", "cores": 1}),
                json!({"name": "z", "cores": null}),
            ]);
            let spec: SortSpec =
                serde_json::from_value(json!({"field": "cores", "direction": direction}))
                    .unwrap();
            apply_sort(&mut items, Some(&spec));
            assert_eq!(items[0]["name"], "y", "direction={direction}");
        }
    }

    #[test]
    fn test_paginate_bounds() {
        let items = records(&[
            json!({"name": "a"}),
            json!({"name": "b"}),
            json!({"name": "c"}),
        ]);

        assert_eq!(names(&paginate(items.clone(), Some(2), 0)), ["a", "b"]);
        assert_eq!(names(&paginate(items.clone(), Some(2), 2)), ["c"]);
        assert_eq!(names(&paginate(items.clone(), None, 1)), ["b", "c"]);
        assert!(paginate(items, Some(5), 10).is_empty());
    }
}
