//! MongoDB-style filter matching and sorting over JSON records.
//!
//! Supported operators: `$and`, `$or`, `$nor` at document level and `$eq`,
//! `$ne`, `$in`, `$nin`, `$gt`, `$gte`, `$lt`, `$lte`, `$exists` per field.
//! Field keys may be dotted paths into nested objects. An unknown operator
//! never matches.

use std::cmp::Ordering;

use modelql_storage::{SortDirection, SortParam};
use serde_json::Value;

/// Returns `true` if `record` satisfies `filter`.
///
/// A `null` filter matches everything; any other non-object filter matches
/// nothing.
pub fn matches(filter: &Value, record: &Value) -> bool {
    let conditions = match filter {
        Value::Null => return true,
        Value::Object(conditions) => conditions,
        _ => return false,
    };

    conditions.iter().all(|(key, condition)| match key.as_str() {
        "$and" => condition
            .as_array()
            .is_some_and(|filters| filters.iter().all(|f| matches(f, record))),
        "$or" => condition
            .as_array()
            .is_some_and(|filters| filters.iter().any(|f| matches(f, record))),
        "$nor" => condition
            .as_array()
            .is_some_and(|filters| !filters.iter().any(|f| matches(f, record))),
        path => match_field(lookup(record, path), condition),
    })
}

/// Resolves a dotted path inside a record.
pub fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |current, segment| current.get(segment))
}

fn match_field(value: Option<&Value>, condition: &Value) -> bool {
    match condition {
        Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => ops
            .iter()
            .all(|(op, argument)| apply_operator(value, op, argument)),
        expected => equals(value, expected),
    }
}

fn apply_operator(value: Option<&Value>, op: &str, argument: &Value) -> bool {
    match op {
        "$eq" => equals(value, argument),
        "$ne" => !equals(value, argument),
        "$in" => argument
            .as_array()
            .is_some_and(|candidates| candidates.iter().any(|c| equals(value, c))),
        "$nin" => argument
            .as_array()
            .is_some_and(|candidates| !candidates.iter().any(|c| equals(value, c))),
        "$gt" => compare_to(value, argument) == Some(Ordering::Greater),
        "$gte" => matches!(
            compare_to(value, argument),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        "$lt" => compare_to(value, argument) == Some(Ordering::Less),
        "$lte" => matches!(
            compare_to(value, argument),
            Some(Ordering::Less | Ordering::Equal)
        ),
        "$exists" => {
            let present = value.is_some_and(|v| !v.is_null());
            argument.as_bool() == Some(present)
        }
        _ => false,
    }
}

// Arrays match a scalar when any element equals it.
fn equals(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(actual) => actual == expected,
    }
}

fn compare_to(value: Option<&Value>, argument: &Value) -> Option<Ordering> {
    compare_values(value?, argument)
}

/// Orders two JSON scalars of the same kind; mixed kinds are incomparable.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

/// Sorts records in place by the given keys.
///
/// Records missing a key sort before records that have it.
pub fn sort_records(records: &mut [Value], sort: &[SortParam]) {
    if sort.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for param in sort {
            let ordering = match (lookup(a, &param.field), lookup(b, &param.field)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(l), Some(r)) => compare_values(l, r).unwrap_or(Ordering::Equal),
            };
            let ordering = match param.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Value {
        json!({
            "id": "1",
            "owner": "u1",
            "name": "Ann",
            "age": 31,
            "tags": ["a", "b"],
            "address": {"city": "Oslo"}
        })
    }

    #[test]
    fn test_equality_and_paths() {
        assert!(matches(&json!({"name": "Ann"}), &record()));
        assert!(matches(&json!({"address.city": "Oslo"}), &record()));
        assert!(!matches(&json!({"address.city": "Rome"}), &record()));
        assert!(matches(&json!({"tags": "b"}), &record()));
        assert!(matches(&json!({"missing": null}), &record()));
    }

    #[test]
    fn test_operators() {
        assert!(matches(&json!({"owner": {"$ne": "u2"}}), &record()));
        assert!(!matches(&json!({"owner": {"$ne": "u1"}}), &record()));
        assert!(matches(&json!({"age": {"$gte": 31, "$lt": 40}}), &record()));
        assert!(!matches(&json!({"age": {"$gt": 31}}), &record()));
        assert!(matches(&json!({"name": {"$in": ["Bob", "Ann"]}}), &record()));
        assert!(matches(&json!({"name": {"$nin": ["Bob"]}}), &record()));
        assert!(matches(&json!({"age": {"$exists": true}}), &record()));
        assert!(matches(&json!({"nope": {"$exists": false}}), &record()));
        assert!(!matches(&json!({"age": {"$unknown": 1}}), &record()));
    }

    #[test]
    fn test_logical_combinators() {
        let filter = json!({"$and": [{"owner": "u1"}, {"$or": [{"age": 1}, {"name": "Ann"}]}]});
        assert!(matches(&filter, &record()));
        assert!(!matches(&json!({"$nor": [{"name": "Ann"}]}), &record()));
        assert!(matches(&Value::Null, &record()));
        assert!(matches(&json!({}), &record()));
    }

    #[test]
    fn test_sort_records() {
        let mut records = vec![
            json!({"name": "b", "age": 2}),
            json!({"name": "a", "age": 2}),
            json!({"age": 9}),
            json!({"name": "c", "age": 1}),
        ];
        sort_records(
            &mut records,
            &[SortParam::desc("age"), SortParam::asc("name")],
        );
        let names: Vec<_> = records
            .iter()
            .map(|r| r.get("name").and_then(Value::as_str).unwrap_or("-"))
            .collect();
        assert_eq!(names, vec!["-", "a", "b", "c"]);
    }
}
