use std::fmt;

/// A single column value of a flattened row.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// SQLite type affinity used when a column is first declared with this value.
    pub fn sql_type(&self) -> Option<&'static str> {
        match self {
            Scalar::Null => None,
            Scalar::Integer(_) => Some("INTEGER"),
            Scalar::Float(_) => Some("REAL"),
            Scalar::Text(_) => Some("TEXT"),
        }
    }
}

impl From<&serde_json::Value> for Scalar {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(flag) => Scalar::Integer(i64::from(*flag)),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => Scalar::Integer(integer),
                None => number
                    .as_f64()
                    .map(Scalar::Float)
                    .unwrap_or(Scalar::Null),
            },
            Value::String(text) => Scalar::Text(text.clone()),
            // Nested values have no column representation, keep their JSON text.
            Value::Array(_) | Value::Object(_) => Scalar::Text(value.to_string()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<usize> for Scalar {
    fn from(value: usize) -> Self {
        Scalar::Integer(value as i64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "NULL"),
            Scalar::Integer(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Text(value) => write!(f, "{value}"),
        }
    }
}
