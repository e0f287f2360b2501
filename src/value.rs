//! Values produced by the reference document parser.

use std::collections::HashMap;

/// A single parsed value (field or record).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    /// A `list(T)` field or the items of a repeated field.
    List(Vec<Value>),
    /// An instance of a class, keyed by field name.
    Record(HashMap<String, Value>),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(x) => Some(*x as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Record(m) => Some(m),
            _ => None,
        }
    }

    /// Field of a record; `None` for any other value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_record().and_then(|m| m.get(field))
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Int(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_access() {
        let mut m = HashMap::new();
        m.insert("age".to_string(), Value::Int(30));
        m.insert("name".to_string(), Value::from("Alice"));
        let v = Value::Record(m);
        assert_eq!(v.get("age").and_then(Value::as_i64), Some(30));
        assert_eq!(v.get("name").and_then(Value::as_str), Some("Alice"));
        assert_eq!(v.get("missing"), None);
        assert_eq!(Value::Int(3).get("x"), None);
    }
}
