//! Runtime argument values supplied at call time.

/// One call argument. Scalars render to a canonical string; lists and maps
/// are only accepted by slots whose role or repeat policy allows them.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    List(Vec<ArgValue>),
    /// Ordered name/value entries.
    Map(Vec<(String, ArgValue)>),
}

impl ArgValue {
    pub fn list<T: Into<ArgValue>>(items: impl IntoIterator<Item = T>) -> Self {
        ArgValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<K: Into<String>, V: Into<ArgValue>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        ArgValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ArgValue::Null)
    }

    /// Canonical string form of a scalar; `None` for null, lists and maps.
    pub fn canonical(&self) -> Option<String> {
        match self {
            ArgValue::Bool(b) => Some(b.to_string()),
            ArgValue::Int(i) => Some(i.to_string()),
            ArgValue::UInt(u) => Some(u.to_string()),
            ArgValue::Float(f) => Some(f.to_string()),
            ArgValue::Str(s) => Some(s.clone()),
            ArgValue::Null | ArgValue::List(_) | ArgValue::Map(_) => None,
        }
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

macro_rules! from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ArgValue {
            fn from(value: $ty) -> Self {
                ArgValue::Int(i64::from(value))
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ArgValue {
            fn from(value: $ty) -> Self {
                ArgValue::UInt(u64::from(value))
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64);
from_unsigned!(u8, u16, u32, u64);

impl From<usize> for ArgValue {
    fn from(value: usize) -> Self {
        ArgValue::UInt(value as u64)
    }
}

impl From<f32> for ArgValue {
    fn from(value: f32) -> Self {
        ArgValue::Float(f64::from(value))
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ArgValue::Null, Into::into)
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(items: Vec<T>) -> Self {
        ArgValue::list(items)
    }
}

impl From<serde_json::Value> for ArgValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => ArgValue::Null,
            Value::Bool(b) => ArgValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ArgValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    ArgValue::UInt(u)
                } else {
                    ArgValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => ArgValue::Str(s),
            Value::Array(items) => ArgValue::List(items.into_iter().map(ArgValue::from).collect()),
            Value::Object(entries) => ArgValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, ArgValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Build a `Vec<ArgValue>` from heterogeneous expressions.
///
/// ```
/// use reqplan_core::{args, ArgValue};
/// let a = args!["kingg22", 3, None::<String>];
/// assert_eq!(a[1], ArgValue::Int(3));
/// ```
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::ArgValue::from($value)),*]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_render_canonically() {
        assert_eq!(ArgValue::from(true).canonical().as_deref(), Some("true"));
        assert_eq!(ArgValue::from(-42).canonical().as_deref(), Some("-42"));
        assert_eq!(ArgValue::from(7u64).canonical().as_deref(), Some("7"));
        assert_eq!(ArgValue::from(1.5).canonical().as_deref(), Some("1.5"));
        assert_eq!(ArgValue::from(3.0).canonical().as_deref(), Some("3"));
        assert_eq!(ArgValue::from("x").canonical().as_deref(), Some("x"));
    }

    #[test]
    fn collections_and_null_have_no_canonical_form() {
        assert_eq!(ArgValue::Null.canonical(), None);
        assert_eq!(ArgValue::list(["a"]).canonical(), None);
        assert_eq!(ArgValue::map([("k", "v")]).canonical(), None);
    }

    #[test]
    fn option_maps_none_to_null() {
        assert!(ArgValue::from(None::<i32>).is_null());
        assert_eq!(ArgValue::from(Some("v")), ArgValue::Str("v".to_string()));
    }

    #[test]
    fn json_values_convert() {
        let value: serde_json::Value =
            serde_json::from_str(r#"[1, -2, 18446744073709551615, 0.5, "s", null, {"k": true}]"#).unwrap();
        assert_eq!(
            ArgValue::from(value),
            ArgValue::List(vec![
                ArgValue::Int(1),
                ArgValue::Int(-2),
                ArgValue::UInt(u64::MAX),
                ArgValue::Float(0.5),
                ArgValue::Str("s".to_string()),
                ArgValue::Null,
                ArgValue::Map(vec![("k".to_string(), ArgValue::Bool(true))]),
            ])
        );
    }

    #[test]
    fn args_macro_mixes_types() {
        let a = args!["owner", 2u8, vec!["x", "y"]];
        assert_eq!(a.len(), 3);
        assert_eq!(a[1], ArgValue::UInt(2));
        assert_eq!(a[2], ArgValue::list(["x", "y"]));
    }
}
