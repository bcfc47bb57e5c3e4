//! String wrapper objects, the `String` constructor and `String.prototype`
//!
//! ## Constructor statics:
//! - `String.fromCharCode()`
//!
//! ## Prototype methods:
//! - toString, valueOf, charAt, charCodeAt, indexOf, slice, substring,
//!   toUpperCase, toLowerCase, trim
//!
//! Positions are UTF-16 code units, as in the language.

use std::any::Any;
use std::sync::Arc;

use marten_object::convert::{to_integer, to_number, to_string, to_uint32};
use marten_object::descriptor::check_property_change;
use marten_object::{
    Attributes, JsObject, ObjectCore, ObjectRef, PropertyDescriptor, PropertyKey, Slot, Value,
    VmError, VmResult, WriteOutcome, WriteRejection, arg, ordinary,
};

use crate::builtin_builder::BuiltInBuilder;
use crate::helpers::{length_key, relative_index};
use crate::intrinsics::Intrinsics;

const CHAR_ATTRIBUTES: Attributes = Attributes::READONLY.union(Attributes::PERMANENT);
const LENGTH_ATTRIBUTES: Attributes = CHAR_ATTRIBUTES.union(Attributes::DONTENUM);

/// A `String` wrapper: read-only indexed characters and `length` over an
/// immutable string value.
pub struct StringObject {
    core: ObjectCore,
    value: Arc<str>,
    units: Arc<[u16]>,
}

impl StringObject {
    /// Wrap `value`.
    pub fn create(value: Arc<str>, prototype: Option<ObjectRef>) -> ObjectRef {
        let units = value.encode_utf16().collect();
        ObjectRef::new(Self {
            core: ObjectCore::new("String", prototype),
            value,
            units,
        })
    }

    /// The wrapped string
    pub fn value(&self) -> &Arc<str> {
        &self.value
    }

    fn len(&self) -> u32 {
        self.units.len() as u32
    }

    /// The synthesized slot for a character index or `length`
    fn own_string_slot(&self, key: &PropertyKey) -> Option<Slot> {
        if let Some(i) = key.as_index() {
            let unit = *self.units.get(i as usize)?;
            return Some(Slot::data(Value::string(unit_string(unit)), CHAR_ATTRIBUTES));
        }
        if key == &length_key() {
            return Some(Slot::data(Value::from(self.len()), LENGTH_ATTRIBUTES));
        }
        None
    }
}

fn unit_string(unit: u16) -> String {
    String::from_utf16_lossy(&[unit])
}

impl JsObject for StringObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn has_own(&self, key: &PropertyKey) -> bool {
        self.own_string_slot(key).is_some() || ordinary::has_own(&self.core, key)
    }

    fn get_own(&self, key: &PropertyKey, receiver: &ObjectRef) -> VmResult<Option<Value>> {
        match self.own_string_slot(key) {
            Some(slot) => Ok(slot.data_value().cloned()),
            None => ordinary::get_own(&self.core, key, receiver),
        }
    }

    fn put_own(
        &self,
        key: &PropertyKey,
        receiver: &ObjectRef,
        value: Value,
    ) -> VmResult<WriteOutcome> {
        if self.own_string_slot(key).is_some() {
            return Ok(WriteOutcome::Rejected(WriteRejection::ReadOnly));
        }
        ordinary::put_own(&self.core, key, receiver, value)
    }

    fn delete_own(&self, key: &PropertyKey) -> VmResult<bool> {
        if self.own_string_slot(key).is_some() {
            return Ok(false);
        }
        ordinary::delete_own(&self.core, key)
    }

    fn own_keys(&self, include_non_enumerable: bool) -> VmResult<Vec<PropertyKey>> {
        let mut keys: Vec<PropertyKey> = (0..self.len()).map(PropertyKey::Index).collect();
        let mut names = Vec::new();
        for key in ordinary::own_keys(&self.core, include_non_enumerable)? {
            match key {
                PropertyKey::Index(_) => keys.push(key),
                name => names.push(name),
            }
        }
        if include_non_enumerable {
            keys.push(length_key());
        }
        keys.extend(names);
        Ok(keys)
    }

    fn get_own_property(&self, key: &PropertyKey) -> VmResult<Option<PropertyDescriptor>> {
        match self.own_string_slot(key) {
            Some(slot) => Ok(Some(PropertyDescriptor::from_slot(&slot))),
            None => ordinary::get_own_property(&self.core, key),
        }
    }

    fn define_own_property(
        &self,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        check_valid: bool,
    ) -> VmResult<()> {
        let Some(current) = self.own_string_slot(key) else {
            return ordinary::define_own_property(&self.core, key, desc, check_valid);
        };
        // Nothing about a character can change; a valid redefinition is a no-op.
        if check_valid {
            check_property_change(key, Some(&current), desc, self.core.is_extensible())?;
        }
        Ok(())
    }
}

/// `this` as a string for `toString`/`valueOf`: only strings and wrappers.
fn this_string_value(this: &Value, method: &str) -> VmResult<Arc<str>> {
    match this {
        Value::String(s) => Ok(s.clone()),
        Value::Object(obj) => match obj.downcast_ref::<StringObject>() {
            Some(wrapper) => Ok(wrapper.value().clone()),
            None => Err(not_a_string(method)),
        },
        _ => Err(not_a_string(method)),
    }
}

fn not_a_string(method: &str) -> VmError {
    VmError::type_error(format!(
        "String.prototype.{method} requires that 'this' be a String"
    ))
}

/// `this` coerced to a string for the generic methods.
fn coerce_this(this: &Value, method: &str) -> VmResult<Vec<u16>> {
    if this.is_nullish() {
        return Err(VmError::type_error(format!(
            "String.prototype.{method} called on null or undefined"
        )));
    }
    Ok(to_string(this)?.encode_utf16().collect())
}

fn units_value(units: &[u16]) -> Value {
    Value::string(String::from_utf16_lossy(units))
}

/// Position of `needle` in `haystack` at or after `from`.
fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..].starts_with(needle))
}

/// Install `String` and return the constructor.
pub fn init(intrinsics: &Intrinsics, eager: bool) -> VmResult<ObjectRef> {
    BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.string_prototype,
        "String",
    )
    .inherits(&intrinsics.object_prototype)
    .constructor_fn(
        |_this, args| match args.first() {
            None => Ok(Value::string("")),
            Some(v) => Ok(Value::String(to_string(v)?)),
        },
        1,
    )
    .static_method(
        "fromCharCode",
        |_this, args| {
            let units = args
                .iter()
                .map(|v| Ok(to_uint32(to_number(v)?) as u16))
                .collect::<VmResult<Vec<u16>>>()?;
            Ok(units_value(&units))
        },
        1,
    )
    .method(
        "toString",
        |this, _args| Ok(Value::String(this_string_value(this, "toString")?)),
        0,
    )
    .method(
        "valueOf",
        |this, _args| Ok(Value::String(this_string_value(this, "valueOf")?)),
        0,
    )
    .method(
        "charAt",
        |this, args| {
            let units = coerce_this(this, "charAt")?;
            let pos = to_integer(&arg(args, 0))?;
            if pos < 0.0 || pos >= units.len() as f64 {
                return Ok(Value::string(""));
            }
            Ok(Value::string(unit_string(units[pos as usize])))
        },
        1,
    )
    .method(
        "charCodeAt",
        |this, args| {
            let units = coerce_this(this, "charCodeAt")?;
            let pos = to_integer(&arg(args, 0))?;
            if pos < 0.0 || pos >= units.len() as f64 {
                return Ok(Value::Number(f64::NAN));
            }
            Ok(Value::from(units[pos as usize] as u32))
        },
        1,
    )
    .method(
        "indexOf",
        |this, args| {
            let units = coerce_this(this, "indexOf")?;
            let needle: Vec<u16> = to_string(&arg(args, 0))?.encode_utf16().collect();
            let from = to_integer(&arg(args, 1))?.clamp(0.0, units.len() as f64) as usize;
            Ok(match find_units(&units, &needle, from) {
                Some(i) => Value::from(i as u32),
                None => Value::from(-1),
            })
        },
        1,
    )
    .method(
        "slice",
        |this, args| {
            let units = coerce_this(this, "slice")?;
            let len = units.len() as u32;
            let start = relative_index(&arg(args, 0), len, 0)? as usize;
            let end = relative_index(&arg(args, 1), len, len)? as usize;
            Ok(units_value(&units[start..end.max(start)]))
        },
        2,
    )
    .method(
        "substring",
        |this, args| {
            let units = coerce_this(this, "substring")?;
            let len = units.len() as f64;
            let clamp = |v: &Value, default: f64| -> VmResult<usize> {
                if v.is_undefined() {
                    return Ok(default as usize);
                }
                Ok(to_integer(v)?.clamp(0.0, len) as usize)
            };
            let start = clamp(&arg(args, 0), 0.0)?;
            let end = clamp(&arg(args, 1), len)?;
            let (from, to) = if start <= end { (start, end) } else { (end, start) };
            Ok(units_value(&units[from..to]))
        },
        2,
    )
    .method(
        "toUpperCase",
        |this, _args| {
            let units = coerce_this(this, "toUpperCase")?;
            Ok(Value::string(String::from_utf16_lossy(&units).to_uppercase()))
        },
        0,
    )
    .method(
        "toLowerCase",
        |this, _args| {
            let units = coerce_this(this, "toLowerCase")?;
            Ok(Value::string(String::from_utf16_lossy(&units).to_lowercase()))
        },
        0,
    )
    .method(
        "trim",
        |this, _args| {
            let units = coerce_this(this, "trim")?;
            let s = String::from_utf16_lossy(&units);
            Ok(Value::string(
                s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}'),
            ))
        },
        0,
    )
    .eager(eager)
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_characters_are_read_only_and_permanent() {
        let s = StringObject::create(Arc::from("hey"), None);
        assert_eq!(
            s.get_value(&PropertyKey::Index(1)).unwrap(),
            Value::from("e")
        );
        assert!(!s.put(&PropertyKey::Index(1), Value::from("x")).unwrap());
        assert!(!s.delete(&PropertyKey::Index(1)).unwrap());
        assert!(!s.delete(&length_key()).unwrap());
        assert_eq!(s.get_value(&length_key()).unwrap(), Value::from(3));

        let desc = s.get_own_property(&PropertyKey::Index(0)).unwrap().unwrap();
        assert_eq!(desc.enumerable, Some(true));
        assert_eq!(desc.writable, Some(false));
        assert_eq!(desc.configurable, Some(false));
    }

    #[test]
    fn test_keys_and_expando() {
        let s = StringObject::create(Arc::from("ab"), None);
        s.put(&PropertyKey::name("extra"), Value::from(1)).unwrap();
        assert_eq!(
            s.get_ids(false).unwrap(),
            vec![
                PropertyKey::Index(0),
                PropertyKey::Index(1),
                PropertyKey::name("extra")
            ]
        );
        assert!(s.get_ids(true).unwrap().contains(&length_key()));
    }

    #[test]
    fn test_character_redefinition() {
        let s = StringObject::create(Arc::from("ab"), None);
        let same = PropertyDescriptor::value_only(Value::from("a"));
        s.define_own_property(&PropertyKey::Index(0), &same).unwrap();
        let different = PropertyDescriptor::value_only(Value::from("z"));
        assert!(
            s.define_own_property(&PropertyKey::Index(0), &different)
                .is_err()
        );
    }

    #[test]
    fn test_utf16_positions() {
        let s = StringObject::create(Arc::from("a\u{1F600}"), None);
        assert_eq!(s.get_value(&length_key()).unwrap(), Value::from(3));
    }

    #[test]
    fn test_find_units() {
        let hay: Vec<u16> = "hello".encode_utf16().collect();
        let needle: Vec<u16> = "l".encode_utf16().collect();
        assert_eq!(find_units(&hay, &needle, 0), Some(2));
        assert_eq!(find_units(&hay, &needle, 3), Some(3));
        assert_eq!(find_units(&hay, &needle, 4), None);
        assert_eq!(find_units(&hay, &[], 9), Some(5));
    }
}
