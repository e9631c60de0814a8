//! Partition key values and their header serialization.

use std::fmt;

use serde_json::Value;

use crate::error::Error;

/// A partition key value.
///
/// Only null, string and integer values are permitted. Floats are rejected
/// because they are not exact values and therefore an ill-founded equality
/// key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PartitionKeyValue {
    Null,
    String(String),
    Integer(i64),
}

impl PartitionKeyValue {
    /// The JSON value of the key itself, e.g. `"alice"` or `1` or `null`.
    pub fn to_value(&self) -> Value {
        match self {
            PartitionKeyValue::Null => Value::Null,
            PartitionKeyValue::String(s) => Value::String(s.clone()),
            PartitionKeyValue::Integer(i) => Value::from(*i),
        }
    }

    /// Converts a JSON value into a partition key, enforcing the type gate.
    pub fn from_value(value: &Value) -> Result<PartitionKeyValue, Error> {
        match value {
            Value::Null => Ok(PartitionKeyValue::Null),
            Value::String(s) => Ok(PartitionKeyValue::String(s.clone())),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(PartitionKeyValue::Integer(i)),
                None => Err(Error::InvalidPartitionKeyType),
            },
            _ => Err(Error::InvalidPartitionKeyType),
        }
    }

    /// The value of the `x-ms-documentdb-partitionkey` header: a JSON array
    /// of exactly one element, e.g. `["alice"]`, `[1]` or `[null]`.
    pub fn header_value(&self) -> String {
        Value::Array(vec![self.to_value()]).to_string()
    }
}

impl fmt::Display for PartitionKeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionKeyValue::Null => f.write_str("null"),
            PartitionKeyValue::String(s) => f.write_str(s),
            PartitionKeyValue::Integer(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PartitionKeyValue {
    fn from(value: &str) -> Self {
        PartitionKeyValue::String(value.to_string())
    }
}

impl From<String> for PartitionKeyValue {
    fn from(value: String) -> Self {
        PartitionKeyValue::String(value)
    }
}

impl From<&String> for PartitionKeyValue {
    fn from(value: &String) -> Self {
        PartitionKeyValue::String(value.clone())
    }
}

impl From<i64> for PartitionKeyValue {
    fn from(value: i64) -> Self {
        PartitionKeyValue::Integer(value)
    }
}

impl From<i32> for PartitionKeyValue {
    fn from(value: i32) -> Self {
        PartitionKeyValue::Integer(value.into())
    }
}

impl From<u32> for PartitionKeyValue {
    fn from(value: u32) -> Self {
        PartitionKeyValue::Integer(value.into())
    }
}

impl From<()> for PartitionKeyValue {
    fn from(_: ()) -> Self {
        PartitionKeyValue::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn header_serialization() {
        assert_eq!(PartitionKeyValue::Null.header_value(), "[null]");
        assert_eq!(PartitionKeyValue::from("foo").header_value(), r#"["foo"]"#);
        assert_eq!(PartitionKeyValue::from(1i64).header_value(), "[1]");
        // beyond 2^32
        assert_eq!(PartitionKeyValue::from(17179869184i64).header_value(), "[17179869184]");
    }

    #[test]
    fn type_gate() {
        assert_eq!(
            PartitionKeyValue::from_value(&json!(1234.0)).unwrap_err().kind(),
            ErrorKind::InvalidPartitionKeyType
        );
        assert_eq!(
            PartitionKeyValue::from_value(&json!({})).unwrap_err().kind(),
            ErrorKind::InvalidPartitionKeyType
        );
        assert_eq!(
            PartitionKeyValue::from_value(&json!([1.5])).unwrap_err().kind(),
            ErrorKind::InvalidPartitionKeyType
        );
        assert_eq!(
            PartitionKeyValue::from_value(&json!("ok")).unwrap(),
            PartitionKeyValue::from("ok")
        );
        assert_eq!(
            PartitionKeyValue::from_value(&json!(null)).unwrap(),
            PartitionKeyValue::Null
        );
    }
}
