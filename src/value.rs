//! Value tree for template data and render arguments
//!
//! Everything that flows through the engine is a [`Value`]: raw template
//! data before compilation, argument values supplied at render time, and
//! the plain trees produced by [`RenderCollection::resolve`].
//!
//! [`RenderCollection::resolve`]: crate::collection::RenderCollection::resolve

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::collection::RenderContext;
use crate::error::RenderError;

/// Argument map passed to a deferred renderer, keyed by placeholder name.
///
/// Insertion order is significant: it determines the positional slot each
/// key is assigned during substitution.
pub type Args = IndexMap<String, Value>;

/// A deferred rendering function, invoked with the namespace context and an
/// argument map
pub type RenderFn = Rc<dyn Fn(&RenderContext<'_>, &Args) -> Result<String, RenderError>>;

/// A value in the template data model
#[derive(Clone)]
pub enum Value {
    /// Absent value (also the sentinel passed to custom parameter callbacks)
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Ordered list; compiles into a sub-collection keyed "0", "1", ...
    List(Vec<Value>),
    /// Ordered map; compiles into a sub-collection
    Map(IndexMap<String, Value>),
    /// A caller-supplied rendering function, preserved as-is by compilation
    Deferred(RenderFn),
}

impl Value {
    /// Build a map value from key/value pairs, preserving order
    pub fn map<K, V, I>(pairs: I) -> Value
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Build a list value
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::List(items.into_iter().collect())
    }

    /// Wrap a rendering function as a deferred value
    pub fn deferred<F>(f: F) -> Value
    where
        F: Fn(&RenderContext<'_>, &Args) -> Result<String, RenderError> + 'static,
    {
        Value::Deferred(Rc::new(f))
    }

    /// Canonical text form of a value
    ///
    /// Scalars stringify directly (`Null` is empty), lists join their items
    /// with `", "`, and maps join `key: value` pairs with `", "`. Deferred
    /// values have no standalone text form and stringify to the empty
    /// string; the engine resolves them before this is consulted.
    pub fn canonical_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Float(x) => x.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::List(items) => items
                .iter()
                .map(Value::canonical_text)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v.canonical_text()))
                .collect::<Vec<_>>()
                .join(", "),
            Value::Deferred(_) => String::new(),
        }
    }
}

/// Build an argument map from key/value pairs, preserving order
pub fn args<K, V, I>(pairs: I) -> Args
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<toml::Value> for Value {
    fn from(v: toml::Value) -> Self {
        match v {
            toml::Value::String(s) => Value::Str(s),
            toml::Value::Integer(n) => Value::Int(n),
            toml::Value::Float(x) => Value::Float(x),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(d) => Value::Str(d.to_string()),
            toml::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            toml::Value::Table(table) => {
                Value::Map(table.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::Deferred(_) => f.write_str("Deferred(<render fn>)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Deferred(a), Value::Deferred(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_text_scalars() {
        assert_eq!(Value::Null.canonical_text(), "");
        assert_eq!(Value::from("hi").canonical_text(), "hi");
        assert_eq!(Value::from(42i64).canonical_text(), "42");
        assert_eq!(Value::from(true).canonical_text(), "true");
    }

    #[test]
    fn test_canonical_text_list() {
        let list = Value::list([Value::from("a"), Value::from(1i64)]);
        assert_eq!(list.canonical_text(), "a, 1");
    }

    #[test]
    fn test_canonical_text_map() {
        let map = Value::map([("x", Value::from("1")), ("y", Value::from("2"))]);
        assert_eq!(map.canonical_text(), "x: 1, y: 2");
    }

    #[test]
    fn test_from_toml_value() {
        let table: toml::Table = toml::from_str(
            r#"
            title = "hello"
            count = 3
            [nested]
            flag = true
        "#,
        )
        .expect("Should parse");

        let value = Value::from(toml::Value::Table(table));
        match value {
            Value::Map(map) => {
                assert_eq!(map.get("title"), Some(&Value::from("hello")));
                assert_eq!(map.get("count"), Some(&Value::from(3i64)));
                match map.get("nested") {
                    Some(Value::Map(nested)) => {
                        assert_eq!(nested.get("flag"), Some(&Value::from(true)));
                    }
                    other => panic!("Expected nested map, got {:?}", other),
                }
            }
            other => panic!("Expected Map, got {:?}", other),
        }
    }

    #[test]
    fn test_from_toml_datetime_stringifies() {
        let table: toml::Table =
            toml::from_str("when = 2024-01-15T10:30:00Z").expect("Should parse");
        let value = Value::from(toml::Value::Table(table));
        match value {
            Value::Map(map) => {
                assert_eq!(map.get("when"), Some(&Value::from("2024-01-15T10:30:00Z")));
            }
            other => panic!("Expected Map, got {:?}", other),
        }
    }

    #[test]
    fn test_args_preserves_order() {
        let a = args([("b", "1"), ("a", "2"), ("c", "3")]);
        let keys: Vec<&str> = a.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }
}
