//! Typed value converters
//!
//! Integers always travel little-endian, whatever the host byte order.
//! Strings travel as UTF-8; fitting them to a slot is the variable's job.

use crate::{GxError, GxResult, VariableType};

/// Bidirectional conversion between a typed value and its wire bytes
pub trait DataConverter {
    type Value;

    /// Wire bytes for a value
    fn to_bytes(&self, value: &Self::Value) -> Vec<u8>;

    /// Value from wire bytes
    fn from_bytes(&self, bytes: &[u8]) -> GxResult<Self::Value>;
}

/// UTF-8 string converter
#[derive(Clone, Copy, Debug, Default)]
pub struct StringConverter;

impl DataConverter for StringConverter {
    type Value = String;

    fn to_bytes(&self, value: &String) -> Vec<u8> {
        value.as_bytes().to_vec()
    }

    /// Truncated slots may split a code point; those bytes decode as U+FFFD.
    fn from_bytes(&self, bytes: &[u8]) -> GxResult<String> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// 32-bit signed integer converter
#[derive(Clone, Copy, Debug, Default)]
pub struct Int32Converter;

impl DataConverter for Int32Converter {
    type Value = i32;

    fn to_bytes(&self, value: &i32) -> Vec<u8> {
        value.to_le_bytes().to_vec()
    }

    fn from_bytes(&self, bytes: &[u8]) -> GxResult<i32> {
        let raw: [u8; 4] = bytes.try_into().map_err(|_| GxError::InvalidLength {
            expected: 4,
            actual: bytes.len(),
        })?;
        Ok(i32::from_le_bytes(raw))
    }
}

/// 64-bit signed integer converter
#[derive(Clone, Copy, Debug, Default)]
pub struct Int64Converter;

impl DataConverter for Int64Converter {
    type Value = i64;

    fn to_bytes(&self, value: &i64) -> Vec<u8> {
        value.to_le_bytes().to_vec()
    }

    fn from_bytes(&self, bytes: &[u8]) -> GxResult<i64> {
        let raw: [u8; 8] = bytes.try_into().map_err(|_| GxError::InvalidLength {
            expected: 8,
            actual: bytes.len(),
        })?;
        Ok(i64::from_le_bytes(raw))
    }
}

/// A value of one of the exchangeable types
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypedValue {
    Str(String),
    Int32(i32),
    Int64(i64),
}

impl TypedValue {
    /// Type tag of this value
    pub fn var_type(&self) -> VariableType {
        match self {
            TypedValue::Str(_) => VariableType::String,
            TypedValue::Int32(_) => VariableType::Int32,
            TypedValue::Int64(_) => VariableType::Int64,
        }
    }

    /// Wire bytes through the converter matching the tag
    pub fn encode(&self) -> Vec<u8> {
        match self {
            TypedValue::Str(s) => StringConverter.to_bytes(s),
            TypedValue::Int32(v) => Int32Converter.to_bytes(v),
            TypedValue::Int64(v) => Int64Converter.to_bytes(v),
        }
    }

    /// Decode wire bytes with the converter for `var_type`
    pub fn decode(var_type: VariableType, bytes: &[u8]) -> GxResult<Self> {
        match var_type {
            VariableType::String => StringConverter.from_bytes(bytes).map(TypedValue::Str),
            VariableType::Int32 => Int32Converter.from_bytes(bytes).map(TypedValue::Int32),
            VariableType::Int64 => Int64Converter.from_bytes(bytes).map(TypedValue::Int64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            TypedValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::Str(value.to_owned())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::Str(value)
    }
}

impl From<i32> for TypedValue {
    fn from(value: i32) -> Self {
        TypedValue::Int32(value)
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        TypedValue::Int64(value)
    }
}
