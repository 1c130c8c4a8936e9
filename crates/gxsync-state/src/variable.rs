//! Variable - a named, typed, status-tracked value

use bytes::Bytes;
use gxsync_core::{
    size_matters, DataStatus, GxError, GxResult, Registry, Trigger, TypedValue, VariableAttributes,
    VariableType,
};

use crate::StatusMachine;

/// Padding byte for short strings
pub const PAD_BYTE: u8 = 0x20;

/// One exchanged value
///
/// The raw bytes are already fitted to the registry slot: strings are
/// truncated or space padded to `length`, integers are fixed width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    name: String,
    var_type: VariableType,
    raw: Bytes,
    machine: StatusMachine,
}

impl Variable {
    /// Create a variable, checking the value type against the registry
    pub fn new(
        registry: &Registry,
        name: &str,
        status: DataStatus,
        value: impl Into<TypedValue>,
    ) -> GxResult<Self> {
        let attrs = registry.find(name)?;
        let value = value.into();
        let raw = normalize(attrs, &value)?;

        Ok(Variable {
            name: attrs.name.clone(),
            var_type: attrs.var_type,
            raw,
            machine: StatusMachine::new(status, attrs.user_is_boss),
        })
    }

    /// Create a variable from slot bytes as received, keeping them verbatim
    ///
    /// A string cut mid code point by the sender keeps its raw tail, so an
    /// echoed value still compares equal to the one that was sent.
    pub fn from_slot(
        registry: &Registry,
        name: &str,
        status: DataStatus,
        bytes: &[u8],
    ) -> GxResult<Self> {
        let attrs = registry.find(name)?;
        if bytes.len() != attrs.length {
            return Err(GxError::InvalidLength {
                expected: attrs.length,
                actual: bytes.len(),
            });
        }
        TypedValue::decode(attrs.var_type, bytes)?;

        Ok(Variable {
            name: attrs.name.clone(),
            var_type: attrs.var_type,
            raw: Bytes::copy_from_slice(bytes),
            machine: StatusMachine::new(status, attrs.user_is_boss),
        })
    }

    pub fn string(registry: &Registry, name: &str, status: DataStatus, value: &str) -> GxResult<Self> {
        Self::new(registry, name, status, TypedValue::from(value))
    }

    pub fn int32(registry: &Registry, name: &str, status: DataStatus, value: i32) -> GxResult<Self> {
        Self::new(registry, name, status, TypedValue::Int32(value))
    }

    pub fn int64(registry: &Registry, name: &str, status: DataStatus, value: i64) -> GxResult<Self> {
        Self::new(registry, name, status, TypedValue::Int64(value))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn var_type(&self) -> VariableType {
        self.var_type
    }

    /// Decoded value of the stored bytes
    pub fn value(&self) -> GxResult<TypedValue> {
        TypedValue::decode(self.var_type, &self.raw)
    }

    /// Replace the value, keeping name and status
    pub fn set_value(&mut self, registry: &Registry, value: impl Into<TypedValue>) -> GxResult<()> {
        let attrs = registry.find(&self.name)?;
        self.raw = normalize(attrs, &value.into())?;
        Ok(())
    }

    /// Stored bytes, exactly as they go on the wire
    #[inline]
    pub fn value_as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Same value bytes as `other`
    pub fn same_value(&self, other: &Variable) -> bool {
        self.raw == other.raw
    }

    #[inline]
    pub fn status(&self) -> DataStatus {
        self.machine.status()
    }

    /// Trigger armed for the next status change
    #[inline]
    pub fn trigger(&self) -> Trigger {
        self.machine.pending()
    }

    pub fn legal_triggers(&self) -> Vec<Trigger> {
        self.machine.legal_triggers()
    }

    pub fn set_trigger(&mut self, trigger: Trigger) -> GxResult<()> {
        self.machine.set_trigger(trigger)
    }

    /// Fire the armed trigger, arm `next`, return the new status
    pub fn change_status(&mut self, next: Trigger) -> GxResult<DataStatus> {
        self.machine.fire(next)
    }

    /// Whether the armed trigger can fire
    pub fn store_is_ok(&self) -> bool {
        self.machine.can_fire(self.machine.pending())
    }

    pub fn user_is_boss(&self) -> bool {
        self.machine.user_is_boss()
    }
}

/// Encode `value` and fit it to the slot described by `attrs`
fn normalize(attrs: &VariableAttributes, value: &TypedValue) -> GxResult<Bytes> {
    if value.var_type() != attrs.var_type {
        return Err(GxError::TypeMismatch {
            name: attrs.name.clone(),
            expected: attrs.var_type,
            actual: value.var_type(),
        });
    }

    let mut bytes = value.encode();
    if size_matters(attrs.var_type) {
        bytes.resize(attrs.length, PAD_BYTE);
    }
    Ok(Bytes::from(bytes))
}
