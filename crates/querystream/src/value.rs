use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, eval_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Null,
    Boolean,
    Int64,
    Float64,
    Utf8,
    Tuple,
    Struct,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Int64 => write!(f, "Int64"),
            Self::Float64 => write!(f, "Float64"),
            Self::Utf8 => write!(f, "Utf8"),
            Self::Tuple => write!(f, "Tuple"),
            Self::Struct => write!(f, "Struct"),
        }
    }
}

/// A single value flowing through a query, either as an element of a stream
/// or as a constant inside an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    /// Anonymous positional values, e.g. the output of a join combiner.
    Tuple(Vec<ScalarValue>),
    /// Named values, e.g. a row read from a table.
    Struct(StructValue),
}

impl ScalarValue {
    pub fn datatype(&self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
            Self::Tuple(_) => DataType::Tuple,
            Self::Struct(_) => DataType::Struct,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn try_as_bool(&self) -> Result<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            other => Err(eval_error!("Expected a Boolean, got {}", other.datatype())),
        }
    }

    pub fn try_as_i64(&self) -> Result<i64> {
        match self {
            Self::Int64(i) => Ok(*i),
            other => Err(eval_error!("Expected an Int64, got {}", other.datatype())),
        }
    }

    pub fn try_as_str(&self) -> Result<&str> {
        match self {
            Self::Utf8(s) => Ok(s.as_str()),
            other => Err(eval_error!("Expected a Utf8, got {}", other.datatype())),
        }
    }

    /// Look up a named member of this value.
    ///
    /// Structs are accessed by field name, tuples by their position
    /// rendered as a string ("0", "1", ...).
    pub fn member(&self, name: &str) -> Result<&ScalarValue> {
        match self {
            Self::Struct(s) => s
                .get(name)
                .ok_or_else(|| eval_error!("Struct has no member named '{name}'")),
            Self::Tuple(values) => name
                .parse::<usize>()
                .ok()
                .and_then(|idx| values.get(idx))
                .ok_or_else(|| {
                    eval_error!("Tuple of {} values has no member '{name}'", values.len())
                }),
            other => Err(eval_error!(
                "Cannot access member '{name}' of a {}",
                other.datatype()
            )),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::Tuple(values) => {
                write!(f, "(")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            Self::Struct(s) => write!(f, "{s}"),
        }
    }
}

/// Ordered set of named values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructValue {
    fields: Vec<(String, ScalarValue)>,
}

impl StructValue {
    pub fn new() -> Self {
        StructValue { fields: Vec::new() }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Take a field out of the struct by name, leaving a null in its place.
    pub fn take(&mut self, name: &str) -> Option<ScalarValue> {
        self.fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, value)| std::mem::replace(value, ScalarValue::Null))
    }
}

impl FromIterator<(String, ScalarValue)> for StructValue {
    fn from_iter<T: IntoIterator<Item = (String, ScalarValue)>>(iter: T) -> Self {
        StructValue {
            fields: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for StructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, (name, value)) in self.fields.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int64(value as i64)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(value)
    }
}

impl From<StructValue> for ScalarValue {
    fn from(value: StructValue) -> Self {
        ScalarValue::Struct(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => ScalarValue::Null,
        }
    }
}

impl<A: Into<ScalarValue>, B: Into<ScalarValue>> From<(A, B)> for ScalarValue {
    fn from((a, b): (A, B)) -> Self {
        ScalarValue::Tuple(vec![a.into(), b.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_member_lookup() {
        let row = ScalarValue::Struct(StructValue::new().with_field("a", 1).with_field("b", "x"));
        assert_eq!(&ScalarValue::Int64(1), row.member("a").unwrap());
        assert_eq!(&ScalarValue::from("x"), row.member("b").unwrap());
        assert!(row.member("c").is_err());
    }

    #[test]
    fn tuple_member_lookup() {
        let pair = ScalarValue::from((3, 4));
        assert_eq!(&ScalarValue::Int64(4), pair.member("1").unwrap());
        assert!(pair.member("2").is_err());
        assert!(pair.member("first").is_err());
    }

    #[test]
    fn member_of_scalar_errors() {
        let err = ScalarValue::Int64(1).member("a").unwrap_err();
        assert!(err.to_string().contains("Int64"), "{err}");
    }

    #[test]
    fn display() {
        let row = StructValue::new().with_field("id", 7).with_field("name", Option::<&str>::None);
        assert_eq!("{id: 7, name: NULL}", ScalarValue::from(row).to_string());
        assert_eq!("(1, true)", ScalarValue::from((1, true)).to_string());
    }

    #[test]
    fn serde_roundtrip_of_row() {
        let row = ScalarValue::from(StructValue::new().with_field("id", 7));
        let json = serde_json::to_string(&row).unwrap();
        let back: ScalarValue = serde_json::from_str(&json).unwrap();
        assert_eq!(row, back);
    }
}
