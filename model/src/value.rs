use serde_json::Value as JsonValue;

/// One field of a query extract. Extracts only carry text, so every value
/// goes through the same coercion: integer parse, then finite float parse,
/// then fall back to the original text.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn parse(raw: &str) -> Value {
        if let Ok(x) = raw.parse::<i64>() {
            return Value::Int(x);
        }
        if let Ok(x) = raw.parse::<f64>() {
            // "NaN" and "inf" parse as floats, but they can't be JSON
            // numbers and they certainly aren't coordinates.
            if x.is_finite() {
                return Value::Float(x);
            }
        }
        Value::Text(raw.to_string())
    }

    /// The value as a coordinate, if it's usable as one.
    pub fn as_finite_f64(&self) -> Option<f64> {
        match self {
            Value::Int(x) => Some(*x as f64),
            Value::Float(x) => Some(*x),
            Value::Text(_) => None,
        }
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> JsonValue {
        match value {
            Value::Int(x) => x.into(),
            Value::Float(x) => x.into(),
            Value::Text(x) => x.into(),
        }
    }
}
