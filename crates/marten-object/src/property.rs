//! Property keys, attribute bits and slots

use std::fmt;
use std::sync::Arc;

use crate::convert;
use crate::error::{VmError, VmResult};
use crate::object::ObjectRef;
use crate::value::Value;

/// Largest valid array index (2^32 - 2).
pub const MAX_ARRAY_INDEX: u32 = u32::MAX - 1;

/// Property key.
///
/// Canonical numeric strings (`"0"`, `"17"`, but not `"01"` or `"-1"`) in the
/// array-index range are normalized to [`PropertyKey::Index`], so `"3"` and `3`
/// name the same property.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String-named property
    Name(Arc<str>),
    /// Array index
    Index(u32),
}

impl PropertyKey {
    /// Create a key from a name, normalizing array indices.
    pub fn name(s: impl Into<Arc<str>>) -> Self {
        let s: Arc<str> = s.into();
        match parse_array_index(&s) {
            Some(index) => PropertyKey::Index(index),
            None => PropertyKey::Name(s),
        }
    }

    /// Create an index key
    pub fn index(i: u32) -> Self {
        PropertyKey::Index(i)
    }

    /// Convert a value to a key (ToPropertyKey).
    pub fn from_value(value: &Value) -> VmResult<Self> {
        if let Value::Number(n) = value {
            if *n >= 0.0 && *n <= MAX_ARRAY_INDEX as f64 && n.fract() == 0.0 {
                return Ok(PropertyKey::Index(*n as u32));
            }
        }
        Ok(PropertyKey::name(convert::to_string(value)?))
    }

    /// Index payload, if any
    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            PropertyKey::Name(_) => None,
        }
    }

    /// Name payload, if any
    pub fn as_name(&self) -> Option<&Arc<str>> {
        match self {
            PropertyKey::Name(s) => Some(s),
            PropertyKey::Index(_) => None,
        }
    }

    /// The key as a string value, as reported by key enumeration.
    pub fn to_value(&self) -> Value {
        match self {
            PropertyKey::Name(s) => Value::String(s.clone()),
            PropertyKey::Index(i) => Value::string(itoa::Buffer::new().format(*i)),
        }
    }
}

/// Parse a canonical array index (no leading zeros, no sign, at most 2^32 - 2).
pub fn parse_array_index(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    let n: u64 = s.parse().ok()?;
    (n <= MAX_ARRAY_INDEX as u64).then_some(n as u32)
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::name(s)
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::name(s)
    }
}

impl From<Arc<str>> for PropertyKey {
    fn from(s: Arc<str>) -> Self {
        PropertyKey::name(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        PropertyKey::Index(i)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Name(s) => f.write_str(s),
            PropertyKey::Index(i) => write!(f, "{}", i),
        }
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Name(s) => write!(f, "{:?}", s),
            PropertyKey::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Property attribute bits.
///
/// The bits are negative flags: an empty set means writable, enumerable and
/// configurable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Attributes(u8);

impl Attributes {
    /// No attributes: writable, enumerable, configurable
    pub const EMPTY: Attributes = Attributes(0);
    /// Value cannot be changed by assignment
    pub const READONLY: Attributes = Attributes(1);
    /// Skipped by enumeration
    pub const DONTENUM: Attributes = Attributes(2);
    /// Cannot be deleted or reconfigured
    pub const PERMANENT: Attributes = Attributes(4);

    const ALL: u8 = 1 | 2 | 4;

    /// Build from raw bits. Unknown bits are an engine bug.
    pub fn from_bits(bits: u32) -> VmResult<Self> {
        if bits & !(Self::ALL as u32) != 0 {
            return Err(VmError::internal(format!(
                "invalid property attributes: {bits:#x}"
            )));
        }
        Ok(Attributes(bits as u8))
    }

    /// Raw bits
    pub const fn bits(self) -> u32 {
        self.0 as u32
    }

    /// Whether all bits of `other` are set
    pub const fn contains(self, other: Attributes) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set union
    pub const fn union(self, other: Attributes) -> Attributes {
        Attributes(self.0 | other.0)
    }

    /// Set difference
    pub const fn without(self, other: Attributes) -> Attributes {
        Attributes(self.0 & !other.0)
    }

    /// Set or clear `flag` depending on `on`
    pub const fn with(self, flag: Attributes, on: bool) -> Attributes {
        if on { self.union(flag) } else { self.without(flag) }
    }

    /// `[[Writable]]`
    pub fn is_writable(self) -> bool {
        !self.contains(Self::READONLY)
    }

    /// `[[Enumerable]]`
    pub fn is_enumerable(self) -> bool {
        !self.contains(Self::DONTENUM)
    }

    /// `[[Configurable]]`
    pub fn is_configurable(self) -> bool {
        !self.contains(Self::PERMANENT)
    }
}

impl std::ops::BitOr for Attributes {
    type Output = Attributes;

    fn bitor(self, rhs: Attributes) -> Attributes {
        self.union(rhs)
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(Self::READONLY) {
            parts.push("READONLY");
        }
        if self.contains(Self::DONTENUM) {
            parts.push("DONTENUM");
        }
        if self.contains(Self::PERMANENT) {
            parts.push("PERMANENT");
        }
        if parts.is_empty() {
            f.write_str("EMPTY")
        } else {
            f.write_str(&parts.join("|"))
        }
    }
}

/// Contents of a property slot.
#[derive(Clone, Debug)]
pub enum SlotValue {
    /// Plain value
    Data(Value),
    /// Getter/setter pair. A missing half behaves as `undefined`.
    Accessor {
        /// Getter function
        getter: Option<ObjectRef>,
        /// Setter function
        setter: Option<ObjectRef>,
    },
}

impl SlotValue {
    /// Is this an accessor slot
    pub fn is_accessor(&self) -> bool {
        matches!(self, SlotValue::Accessor { .. })
    }
}

/// A stored property: value (or accessor pair) plus attribute bits.
///
/// For accessor slots the READONLY bit carries no meaning.
#[derive(Clone, Debug)]
pub struct Slot {
    /// Stored value
    pub value: SlotValue,
    /// Attribute bits
    pub attributes: Attributes,
}

impl Slot {
    /// Data slot
    pub fn data(value: Value, attributes: Attributes) -> Self {
        Self {
            value: SlotValue::Data(value),
            attributes,
        }
    }

    /// Accessor slot
    pub fn accessor(
        getter: Option<ObjectRef>,
        setter: Option<ObjectRef>,
        attributes: Attributes,
    ) -> Self {
        Self {
            value: SlotValue::Accessor { getter, setter },
            attributes,
        }
    }

    /// Data payload, if this is a data slot
    pub fn data_value(&self) -> Option<&Value> {
        match &self.value {
            SlotValue::Data(v) => Some(v),
            SlotValue::Accessor { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_normalization() {
        assert_eq!(PropertyKey::name("3"), PropertyKey::Index(3));
        assert_eq!(PropertyKey::name("03"), PropertyKey::Name(Arc::from("03")));
        assert_eq!(PropertyKey::name("-1"), PropertyKey::Name(Arc::from("-1")));
        assert_eq!(
            PropertyKey::name("4294967295"),
            PropertyKey::Name(Arc::from("4294967295"))
        );
        assert_eq!(
            PropertyKey::name("4294967294"),
            PropertyKey::Index(4_294_967_294)
        );
    }

    #[test]
    fn test_key_from_number_value() {
        assert_eq!(
            PropertyKey::from_value(&Value::Number(2.0)).ok(),
            Some(PropertyKey::Index(2))
        );
        assert_eq!(
            PropertyKey::from_value(&Value::Number(1.5)).ok(),
            Some(PropertyKey::name("1.5"))
        );
        assert_eq!(
            PropertyKey::from_value(&Value::Number(-0.0)).ok(),
            Some(PropertyKey::Index(0))
        );
    }

    #[test]
    fn test_attribute_bits() {
        let attrs = Attributes::READONLY | Attributes::PERMANENT;
        assert!(!attrs.is_writable());
        assert!(attrs.is_enumerable());
        assert!(!attrs.is_configurable());
        assert_eq!(attrs.bits(), 5);
        assert_eq!(attrs.with(Attributes::READONLY, false), Attributes::PERMANENT);
        assert!(Attributes::from_bits(8).is_err());
        assert!(!Attributes::from_bits(8).unwrap_err().is_catchable());
        assert_eq!(Attributes::from_bits(7).unwrap(), attrs | Attributes::DONTENUM);
    }
}
