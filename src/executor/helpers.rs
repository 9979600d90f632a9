use std::cmp::Ordering;

use serde_json::{Map, Value};

pub struct Helpers;

impl Helpers {
    /// Hashable group key for a tuple of values. serde_json objects are
    /// key-sorted, so equal values always render the same text.
    pub fn canonical_tuple(vals: &[Value]) -> String {
        Value::Array(vals.to_vec()).to_string()
    }

    /// Value of a top-level column, `Null` when absent.
    pub fn column(row: &Map<String, Value>, name: &str) -> Value {
        row.get(name).cloned().unwrap_or(Value::Null)
    }

    /// Ascending order over group key tuples, element by element, nulls last.
    pub fn cmp_tuples(a: &[Value], b: &[Value]) -> Ordering {
        a.iter()
            .zip(b)
            .map(|(x, y)| Self::cmp_json_for_sort(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len()))
    }

    // NULLS LAST, ascending
    pub fn cmp_json_for_sort(a: &Value, b: &Value) -> Ordering {
        use serde_json::Value::*;
        match (a, b) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Greater,
            (_, Null) => Ordering::Less,
            (Bool(x), Bool(y)) => x.cmp(y),
            (Number(x), Number(y)) => match (x.as_f64(), y.as_f64()) {
                (Some(fx), Some(fy)) => fx.total_cmp(&fy),
                _ => x.to_string().cmp(&y.to_string()),
            },
            (String(x), String(y)) => x.cmp(y),
            (Array(_), Array(_)) | (Object(_), Object(_)) => a.to_string().cmp(&b.to_string()),
            (lhs, rhs) => Self::type_rank(lhs).cmp(&Self::type_rank(rhs)),
        }
    }

    fn type_rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0, Value::Bool(_) => 1, Value::Number(_) => 2, Value::String(_) => 3,
            Value::Array(_) => 4, Value::Object(_) => 5
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Helpers;
    use serde_json::{json, Value};
    use std::cmp::Ordering::*;

    // ---------- canonical_tuple ----------

    #[test]
    fn canonical_tuple_is_deterministic_for_same_values() {
        let a = vec![json!(1), json!("x"), json!(true)];
        let b = vec![json!(1), json!("x"), json!(true)];
        assert_eq!(Helpers::canonical_tuple(&a), Helpers::canonical_tuple(&b));
    }

    #[test]
    fn canonical_tuple_differs_for_different_values() {
        let a = vec![json!(1), json!("x")];
        let b = vec![json!(1), json!("y")];
        assert_ne!(Helpers::canonical_tuple(&a), Helpers::canonical_tuple(&b));
        // a string "1" is not the number 1
        assert_ne!(Helpers::canonical_tuple(&[json!(1)]), Helpers::canonical_tuple(&[json!("1")]));
    }

    #[test]
    fn canonical_tuple_ignores_object_insertion_order() {
        let mut m1 = serde_json::Map::new();
        m1.insert("b".into(), json!(2));
        m1.insert("a".into(), json!(1));
        let a = vec![Value::Object(m1)];
        let b = vec![json!({"a": 1, "b": 2})];
        assert_eq!(Helpers::canonical_tuple(&a), Helpers::canonical_tuple(&b));
    }

    #[test]
    fn missing_column_is_null() {
        let row = json!({"k": 1});
        let row = row.as_object().unwrap();
        assert_eq!(Helpers::column(row, "k"), json!(1));
        assert_eq!(Helpers::column(row, "nope"), Value::Null);
    }

    // ---------- ordering ----------

    #[test]
    fn nulls_sort_last() {
        let n = Value::Null;
        assert_eq!(Helpers::cmp_json_for_sort(&json!(0), &n), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&n, &json!("s")), Greater);
        assert_eq!(Helpers::cmp_json_for_sort(&n, &n), Equal);
    }

    #[test]
    fn same_kind_values_compare_naturally() {
        assert_eq!(Helpers::cmp_json_for_sort(&json!(1.5), &json!(2)), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&json!("Alice"), &json!("Bob")), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&json!(false), &json!(true)), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&json!([1, 2, 3]), &json!([1, 2, 4])), Less);
    }

    #[test]
    fn cross_type_order_uses_type_rank() {
        assert_eq!(Helpers::cmp_json_for_sort(&json!(true), &json!(0)), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&json!(0), &json!("s")), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&json!({"a": 1}), &json!([1])), Greater);
    }

    #[test]
    fn tuples_compare_lexicographically() {
        assert_eq!(Helpers::cmp_tuples(&[json!("a"), json!(2)], &[json!("a"), json!(10)]), Less);
        assert_eq!(Helpers::cmp_tuples(&[json!("b")], &[json!("a"), json!(1)]), Greater);
        assert_eq!(Helpers::cmp_tuples(&[], &[]), Equal);
    }
}
