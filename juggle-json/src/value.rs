//! The generic value tree produced by parsing.

/// A parsed JSON value.
///
/// Numbers keep their literal text verbatim so that integer coercion can
/// reject precision loss instead of rounding through a binary float.
/// Objects keep their pairs in source order, duplicates included; lookups
/// are last-wins, matching how the engine consumes them.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Numeric literal, verbatim from the source text.
    Number(String),
    /// String with escapes resolved.
    String(String),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Key/value pairs in source order; duplicate keys allowed, last wins.
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Short name of the value's kind, used in type-mismatch diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Look up a key in an object value, last occurrence winning.
    /// Returns `None` for non-objects.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(pairs) => pairs.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Build a number value from literal text.
    pub fn number(literal: impl Into<String>) -> Value {
        Value::Number(literal.into())
    }

    /// Build a string value.
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        let mut buf = itoa::Buffer::new();
        Value::Number(buf.format(n).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_lookup_is_last_wins() {
        let v = Value::Object(vec![
            ("a".into(), Value::from(1)),
            ("a".into(), Value::from(2)),
        ]);
        assert_eq!(v.get("a"), Some(&Value::Number("2".into())));
        assert_eq!(v.get("b"), None);
    }
}
