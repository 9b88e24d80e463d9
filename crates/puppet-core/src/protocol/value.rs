//! Variant payload carried by property and information containers

use super::error::DecodeError;
use super::stream::{WireFormat, WireReader, WireWriter};
use bytes::Bytes;
use std::fmt;

const TAG_INVALID: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_DOUBLE: u8 = 3;
const TAG_STRING: u8 = 4;
const TAG_BYTES: u8 = 5;
const TAG_COLOR: u8 = 6;
const TAG_INSTANCE: u8 = 7;

/// A dynamically typed property value.
///
/// `Double` compares by bit pattern so that values decoded from the wire are
/// always equal to the value that was encoded, NaN included.
#[derive(Debug, Clone, Default)]
pub enum PropertyValue {
    #[default]
    Invalid,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Bytes),
    /// ARGB packed color
    Color(u32),
    /// Reference to another node instance
    InstanceRef(i32),
}

impl PropertyValue {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in debug output
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Color(_) => "color",
            Self::InstanceRef(_) => "instance",
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Invalid, Self::Invalid) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Color(a), Self::Color(b)) => a == b,
            (Self::InstanceRef(a), Self::InstanceRef(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "<invalid>"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{:?}", v),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Color(v) => write!(f, "#{:08x}", v),
            Self::InstanceRef(v) => write!(f, "instance({})", v),
        }
    }
}

impl WireFormat for PropertyValue {
    const NAME: &'static str = "PropertyValue";

    fn write_to(&self, out: &mut WireWriter) {
        match self {
            Self::Invalid => out.put_u8(TAG_INVALID),
            Self::Bool(v) => {
                out.put_u8(TAG_BOOL);
                out.put_bool(*v);
            }
            Self::Int(v) => {
                out.put_u8(TAG_INT);
                out.put_i64(*v);
            }
            Self::Double(v) => {
                out.put_u8(TAG_DOUBLE);
                out.put_f64(*v);
            }
            Self::String(v) => {
                out.put_u8(TAG_STRING);
                out.put_str(v);
            }
            Self::Bytes(v) => {
                out.put_u8(TAG_BYTES);
                out.put_blob(v);
            }
            Self::Color(v) => {
                out.put_u8(TAG_COLOR);
                out.put_u32(*v);
            }
            Self::InstanceRef(v) => {
                out.put_u8(TAG_INSTANCE);
                out.put_i32(*v);
            }
        }
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        let tag = input.get_u8("valueType")?;
        let value = match tag {
            TAG_INVALID => Self::Invalid,
            TAG_BOOL => Self::Bool(input.get_bool("value")?),
            TAG_INT => Self::Int(input.get_i64("value")?),
            TAG_DOUBLE => Self::Double(input.get_f64("value")?),
            TAG_STRING => Self::String(input.get_string("value")?),
            TAG_BYTES => Self::Bytes(input.get_blob("value")?),
            TAG_COLOR => Self::Color(input.get_u32("value")?),
            TAG_INSTANCE => Self::InstanceRef(input.get_i32("value")?),
            other => {
                return Err(DecodeError::InvalidEnum {
                    field: "valueType",
                    value: u32::from(other),
                });
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_round_trips_equal() {
        let value = PropertyValue::Double(f64::NAN);
        let decoded = PropertyValue::from_bytes(value.to_bytes()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = PropertyValue::from_bytes(Bytes::from_static(&[42])).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidEnum {
                field: "valueType",
                value: 42
            }
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(PropertyValue::from("x").to_string(), "\"x\"");
        assert_eq!(PropertyValue::Color(0xff00ff00).to_string(), "#ff00ff00");
        assert_eq!(PropertyValue::Invalid.to_string(), "<invalid>");
    }
}
