//! Array objects, the `Array` constructor and `Array.prototype`
//!
//! ## Constructor statics:
//! - `Array.isArray()`
//!
//! ## Prototype methods:
//! - push, pop, join, toString, indexOf, slice, reverse
//!
//! Prototype methods are generic: they work on any object through `length`
//! and indexed properties, not only on [`ArrayObject`]s.

use std::any::Any;

use marten_object::convert::{to_integer, to_string};
use marten_object::descriptor::check_property_change;
use marten_object::{
    Attributes, JsObject, ObjectCore, ObjectRef, PropertyDescriptor, PropertyKey, Slot,
    Strictness, Value, VmError, VmResult, WriteOutcome, WriteRejection, arg, ordinary,
    strict_equals,
};

use crate::builtin_builder::BuiltInBuilder;
use crate::helpers::{array_length, length_key, length_of, relative_index};
use crate::intrinsics::Intrinsics;

/// An array: an ordinary object whose `length` tracks its indexed properties.
///
/// `length` lives in the property table as a non-enumerable, permanent data
/// property. Index writes at or past it grow it; writes to it truncate.
pub struct ArrayObject {
    core: ObjectCore,
}

impl ArrayObject {
    /// A dense array holding `elements`.
    pub fn create(elements: Vec<Value>, prototype: Option<ObjectRef>) -> VmResult<ObjectRef> {
        let len = u32::try_from(elements.len())
            .map_err(|_| VmError::range_error("Invalid array length"))?;
        let obj = ObjectRef::new(Self {
            core: ObjectCore::new("Array", prototype),
        });
        obj.core().with_table_mut(|t| {
            for (i, value) in elements.into_iter().enumerate() {
                t.insert(PropertyKey::Index(i as u32), Slot::data(value, Attributes::EMPTY));
            }
            t.insert(length_key(), Slot::data(Value::from(len), Self::length_attributes()));
        });
        Ok(obj)
    }

    /// An empty array with `length` preset (all holes).
    pub fn with_length(len: u32, prototype: Option<ObjectRef>) -> ObjectRef {
        let obj = ObjectRef::new(Self {
            core: ObjectCore::new("Array", prototype),
        });
        obj.core().with_table_mut(|t| {
            t.insert(length_key(), Slot::data(Value::from(len), Self::length_attributes()));
        });
        obj
    }

    fn length_attributes() -> Attributes {
        Attributes::DONTENUM | Attributes::PERMANENT
    }

    /// Current `length`
    pub fn length(&self) -> u32 {
        self.length_slot()
            .and_then(|slot| slot.data_value().and_then(Value::as_number))
            .map_or(0, |n| n as u32)
    }

    fn length_slot(&self) -> Option<Slot> {
        self.core
            .with_table(|t| t.get(&length_key()).cloned())
            .flatten()
    }

    fn length_writable(&self) -> bool {
        self.length_slot()
            .is_none_or(|slot| slot.attributes.is_writable())
    }

    /// Store `len` without touching elements, keeping the attribute bits.
    fn store_length(&self, len: u32) {
        self.core.with_table_mut(|t| {
            let attributes = t
                .get_attributes(&length_key())
                .unwrap_or_else(Self::length_attributes);
            t.set_value(length_key(), Value::from(len), attributes);
        });
    }

    /// Delete indexed properties from the end down to `new_len`. Stops at the
    /// first permanent element and returns the length actually reached.
    fn truncate(&self, new_len: u32) -> u32 {
        let doomed: Vec<u32> = self
            .core
            .with_table(|t| {
                t.get_ids(true)
                    .into_iter()
                    .filter_map(|k| k.as_index())
                    .filter(|&i| i >= new_len)
                    .collect()
            })
            .unwrap_or_default();
        let reached = self
            .core
            .with_existing_table_mut(|t| {
                for &i in doomed.iter().rev() {
                    if !t.delete(&PropertyKey::Index(i)) {
                        return i + 1;
                    }
                }
                new_len
            })
            .unwrap_or(new_len);
        if reached != new_len {
            tracing::trace!(
                target: "marten::object",
                requested = new_len,
                reached,
                "array truncation stopped at permanent element"
            );
        }
        reached
    }

    fn is_length(key: &PropertyKey) -> bool {
        key.as_name().is_some_and(|n| n.as_ref() == "length")
    }
}

impl JsObject for ArrayObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn put_own(
        &self,
        key: &PropertyKey,
        receiver: &ObjectRef,
        value: Value,
    ) -> VmResult<WriteOutcome> {
        if !self.core.is_same(receiver) {
            return ordinary::put_own(&self.core, key, receiver, value);
        }
        if Self::is_length(key) {
            let new_len = array_length(&value)?;
            if !self.length_writable() {
                return Ok(WriteOutcome::Rejected(WriteRejection::ReadOnly));
            }
            let reached = self.truncate(new_len);
            self.store_length(reached);
            if reached != new_len {
                return Ok(WriteOutcome::Rejected(WriteRejection::ReadOnly));
            }
            return Ok(WriteOutcome::Written);
        }
        let Some(index) = key.as_index() else {
            return ordinary::put_own(&self.core, key, receiver, value);
        };
        let len = self.length();
        if index >= len && !self.length_writable() {
            return Ok(WriteOutcome::Rejected(WriteRejection::ReadOnly));
        }
        let outcome = ordinary::put_own(&self.core, key, receiver, value)?;
        if matches!(outcome, WriteOutcome::Written) && index >= len {
            self.store_length(index + 1);
        }
        Ok(outcome)
    }

    fn define_own_property(
        &self,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        check_valid: bool,
    ) -> VmResult<()> {
        if Self::is_length(key) {
            let Some(value) = &desc.value else {
                return ordinary::define_own_property(&self.core, key, desc, check_valid);
            };
            let new_len = array_length(value)?;
            let old_len = self.length();
            let mut desc = desc.clone();
            desc.value = Some(Value::from(new_len));
            if new_len >= old_len {
                return ordinary::define_own_property(&self.core, key, &desc, check_valid);
            }
            if check_valid {
                let current = self.length_slot();
                check_property_change(key, current.as_ref(), &desc, self.core.is_extensible())?;
            }
            let reached = self.truncate(new_len);
            desc.value = Some(Value::from(reached));
            ordinary::define_own_property(&self.core, key, &desc, false)?;
            if reached != new_len && check_valid {
                return Err(VmError::type_error(format!(
                    "Cannot delete array element {}",
                    reached - 1
                )));
            }
            return Ok(());
        }
        let Some(index) = key.as_index() else {
            return ordinary::define_own_property(&self.core, key, desc, check_valid);
        };
        let len = self.length();
        if index >= len && !self.length_writable() {
            if check_valid {
                return Err(VmError::type_error(format!(
                    "Cannot add property {index}, array length is not writable"
                )));
            }
            return Ok(());
        }
        ordinary::define_own_property(&self.core, key, desc, check_valid)?;
        if index >= len {
            self.store_length(index + 1);
        }
        Ok(())
    }
}

/// Install `Array` and return the constructor.
pub fn init(intrinsics: &Intrinsics, eager: bool) -> VmResult<ObjectRef> {
    let ctor_intrinsics = intrinsics.clone();
    let slice_intrinsics = intrinsics.clone();
    let to_string_intrinsics = intrinsics.clone();
    let push_intrinsics = intrinsics.clone();
    let pop_intrinsics = intrinsics.clone();
    let join_intrinsics = intrinsics.clone();
    let index_of_intrinsics = intrinsics.clone();
    let reverse_intrinsics = intrinsics.clone();

    BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.array_prototype,
        "Array",
    )
    .inherits(&intrinsics.object_prototype)
    .constructor_fn(
        move |_this, args| {
            let proto = Some(ctor_intrinsics.array_prototype.clone());
            if let [Value::Number(_)] = args {
                let len = array_length(&args[0])?;
                return Ok(Value::Object(ArrayObject::with_length(len, proto)));
            }
            Ok(Value::Object(ArrayObject::create(args.to_vec(), proto)?))
        },
        1,
    )
    .static_method(
        "isArray",
        |_this, args| {
            Ok(Value::Boolean(matches!(
                args.first(),
                Some(Value::Object(o)) if o.downcast_ref::<ArrayObject>().is_some()
            )))
        },
        1,
    )
    .method(
        "push",
        move |this, args| {
            let obj = push_intrinsics.to_object(this)?;
            let mut len = length_of(&obj)? as f64;
            for item in args {
                let key = index_key(len)?;
                obj.put_checked(&key, item.clone(), Strictness::Strict)?;
                len += 1.0;
            }
            obj.put_checked(&length_key(), Value::Number(len), Strictness::Strict)?;
            Ok(Value::Number(len))
        },
        1,
    )
    .method(
        "pop",
        move |this, _args| {
            let obj = pop_intrinsics.to_object(this)?;
            let len = length_of(&obj)?;
            if len == 0 {
                obj.put_checked(&length_key(), Value::from(0), Strictness::Strict)?;
                return Ok(Value::Undefined);
            }
            let key = PropertyKey::Index(len - 1);
            let element = obj.get_value(&key)?;
            obj.delete_checked(&key, Strictness::Strict)?;
            obj.put_checked(&length_key(), Value::from(len - 1), Strictness::Strict)?;
            Ok(element)
        },
        0,
    )
    .method(
        "join",
        move |this, args| {
            let obj = join_intrinsics.to_object(this)?;
            let separator = match arg(args, 0) {
                Value::Undefined => None,
                sep => Some(to_string(&sep)?),
            };
            join(&obj, separator.as_deref().unwrap_or(","))
        },
        1,
    )
    .method(
        "toString",
        move |this, _args| {
            let obj = to_string_intrinsics.to_object(this)?;
            match obj.get_value(&PropertyKey::name("join"))? {
                Value::Object(f) if f.is_callable() => f.call(&Value::Object(obj), &[]),
                _ => Ok(Value::string(format!("[object {}]", obj.class_name()))),
            }
        },
        0,
    )
    .method(
        "indexOf",
        move |this, args| {
            let obj = index_of_intrinsics.to_object(this)?;
            let len = length_of(&obj)?;
            if len == 0 {
                return Ok(Value::from(-1));
            }
            let target = arg(args, 0);
            let from = match args.get(1) {
                Some(v) => to_integer(v)?,
                None => 0.0,
            };
            if from >= len as f64 {
                return Ok(Value::from(-1));
            }
            let start = if from < 0.0 {
                (len as f64 + from).max(0.0) as u32
            } else {
                from as u32
            };
            for i in start..len {
                let key = PropertyKey::Index(i);
                if obj.has(&key) && strict_equals(&obj.get_value(&key)?, &target) {
                    return Ok(Value::from(i));
                }
            }
            Ok(Value::from(-1))
        },
        1,
    )
    .method(
        "slice",
        move |this, args| {
            let obj = slice_intrinsics.to_object(this)?;
            let len = length_of(&obj)?;
            let start = relative_index(&arg(args, 0), len, 0)?;
            let end = relative_index(&arg(args, 1), len, len)?;
            let result = ArrayObject::with_length(0, Some(slice_intrinsics.array_prototype.clone()));
            let mut n = 0u32;
            for k in start..end.max(start) {
                let key = PropertyKey::Index(k);
                if obj.has(&key) {
                    result.define_value(PropertyKey::Index(n), obj.get_value(&key)?, Attributes::EMPTY)?;
                }
                n += 1;
            }
            result.put(&length_key(), Value::from(n))?;
            Ok(Value::Object(result))
        },
        2,
    )
    .method(
        "reverse",
        move |this, _args| {
            let obj = reverse_intrinsics.to_object(this)?;
            let len = length_of(&obj)?;
            let middle = len / 2;
            for lower in 0..middle {
                let upper = len - lower - 1;
                let (lower_key, upper_key) = (PropertyKey::Index(lower), PropertyKey::Index(upper));
                let lower_value = obj.has(&lower_key).then(|| obj.get_value(&lower_key)).transpose()?;
                let upper_value = obj.has(&upper_key).then(|| obj.get_value(&upper_key)).transpose()?;
                match (lower_value, upper_value) {
                    (Some(l), Some(u)) => {
                        obj.put_checked(&lower_key, u, Strictness::Strict)?;
                        obj.put_checked(&upper_key, l, Strictness::Strict)?;
                    }
                    (None, Some(u)) => {
                        obj.put_checked(&lower_key, u, Strictness::Strict)?;
                        obj.delete_checked(&upper_key, Strictness::Strict)?;
                    }
                    (Some(l), None) => {
                        obj.delete_checked(&lower_key, Strictness::Strict)?;
                        obj.put_checked(&upper_key, l, Strictness::Strict)?;
                    }
                    (None, None) => {}
                }
            }
            Ok(Value::Object(obj))
        },
        0,
    )
    .eager(eager)
    .build()
}

/// Index key for position `n`; pushing past the index range is an error.
fn index_key(n: f64) -> VmResult<PropertyKey> {
    if n < u32::MAX as f64 {
        Ok(PropertyKey::Index(n as u32))
    } else {
        Err(VmError::type_error("Pushing past the maximum array length"))
    }
}

fn join(obj: &ObjectRef, separator: &str) -> VmResult<Value> {
    let len = length_of(obj)?;
    let mut out = String::new();
    for i in 0..len {
        if i > 0 {
            out.push_str(separator);
        }
        match obj.get_value(&PropertyKey::Index(i))? {
            Value::Undefined | Value::Null => {}
            element => out.push_str(&to_string(&element)?),
        }
    }
    Ok(Value::string(out))
}
