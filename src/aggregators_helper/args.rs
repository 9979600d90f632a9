//! Argument coercion helpers for the JSON row layer.
//!
//! `Null` is the null sentinel everywhere. A value of the wrong JSON kind is a
//! host contract violation and is reported, never skipped.

use serde_json::{Map, Value};

use crate::aggregators_helper::{AggregateError, Result};

/// Borrow `args` as a fixed-size array or fail with the expected signature.
pub fn unpack<'a, const N: usize>(name: &str, signature: &str, args: &'a [Value]) -> Result<&'a [Value; N]> {
    <&[Value; N]>::try_from(args)
        .map_err(|_| AggregateError::arg_mismatch(name, signature, format!("{} args", args.len())))
}

/// JSON kind name used in mismatch messages.
pub fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn opt_f64(name: &str, v: &Value) -> Result<Option<f64>> {
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| AggregateError::arg_mismatch(name, "number", n.to_string())),
        other => Err(AggregateError::arg_mismatch(name, "number", kind(other))),
    }
}

pub fn opt_i64(name: &str, v: &Value) -> Result<Option<i64>> {
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| AggregateError::arg_mismatch(name, "integer", n.to_string())),
        other => Err(AggregateError::arg_mismatch(name, "integer", kind(other))),
    }
}

pub fn opt_bool(name: &str, v: &Value) -> Result<Option<bool>> {
    match v {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(AggregateError::arg_mismatch(name, "bool", kind(other))),
    }
}

pub fn opt_str(name: &str, v: &Value) -> Result<Option<String>> {
    match v {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(AggregateError::arg_mismatch(name, "string", kind(other))),
    }
}

pub fn opt_array(name: &str, v: &Value) -> Result<Option<Vec<Value>>> {
    match v {
        Value::Null => Ok(None),
        Value::Array(items) => Ok(Some(items.clone())),
        other => Err(AggregateError::arg_mismatch(name, "array", kind(other))),
    }
}

pub fn opt_object(name: &str, v: &Value) -> Result<Option<Map<String, Value>>> {
    match v {
        Value::Null => Ok(None),
        Value::Object(m) => Ok(Some(m.clone())),
        other => Err(AggregateError::arg_mismatch(name, "object", kind(other))),
    }
}

/// An array of numbers; null elements are rejected.
pub fn f64_list(name: &str, v: &Value) -> Result<Vec<f64>> {
    let Value::Array(items) = v else {
        return Err(AggregateError::arg_mismatch(name, "array<number>", kind(v)));
    };
    items
        .iter()
        .map(|item| opt_f64(name, item)?.ok_or_else(|| AggregateError::arg_mismatch(name, "array<number>", "null element")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unpack_checks_arity() {
        let args = vec![json!(1), json!(2)];
        let [a, b] = unpack::<2>("f", "f(a, b)", &args).unwrap();
        assert_eq!((a, b), (&json!(1), &json!(2)));

        let err = unpack::<3>("f", "f(a, b, c)", &args).unwrap_err();
        assert_eq!(err.to_string(), "f: expected f(a, b, c), got 2 args");
    }

    #[test]
    fn scalars_accept_null_and_reject_wrong_kind() {
        assert_eq!(opt_f64("f", &json!(2)).unwrap(), Some(2.0));
        assert_eq!(opt_f64("f", &Value::Null).unwrap(), None);
        assert!(opt_f64("f", &json!("2")).is_err());

        assert_eq!(opt_i64("f", &json!(3)).unwrap(), Some(3));
        assert!(opt_i64("f", &json!(3.5)).is_err());

        assert_eq!(opt_bool("f", &json!(true)).unwrap(), Some(true));
        assert!(opt_bool("f", &json!(1)).is_err());

        assert_eq!(opt_str("f", &json!("x")).unwrap(), Some("x".to_string()));
        assert!(opt_array("f", &json!({})).is_err());
        assert!(opt_object("f", &json!([])).is_err());
    }

    #[test]
    fn f64_list_rejects_null_elements() {
        assert_eq!(f64_list("p", &json!([0.25, 1])).unwrap(), vec![0.25, 1.0]);
        assert!(f64_list("p", &json!([0.5, null])).is_err());
        assert!(f64_list("p", &json!(0.5)).is_err());
    }
}
