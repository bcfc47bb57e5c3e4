//! Ordinary own-property behavior
//!
//! Layer order for a key: the object's property table, then its class map.
//! A table slot always wins over the class map entry of the same name.
//! These functions back the default methods of [`JsObject`](crate::JsObject);
//! exotic objects call them for the keys they do not handle themselves.

use crate::class_map::ClassValueMap;
use crate::descriptor::{PropertyDescriptor, check_property_change};
use crate::error::{VmError, VmResult};
use crate::object::{ClassMapBinding, ObjectCore, ObjectRef, WriteOutcome, WriteRejection};
use crate::property::{Attributes, PropertyKey, Slot, SlotValue};
use crate::value::{PreferredType, Value};

/// Where an own slot was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLocation {
    /// Property table
    Table,
    /// Class map entry with this id
    ClassMap(u32),
}

fn class_map_entry<'a>(core: &'a ObjectCore, key: &PropertyKey) -> Option<(&'a ClassMapBinding, u32)> {
    let binding = core.class_map()?;
    let id = binding.map.find_key(key)?;
    if !binding.owner && core.is_masked(id) {
        return None;
    }
    binding.map.has(id).then_some((binding, id))
}

/// Own-property check. Never materializes class map entries.
pub fn has_own(core: &ObjectCore, key: &PropertyKey) -> bool {
    core.with_table(|t| t.has(key)).unwrap_or(false) || class_map_entry(core, key).is_some()
}

/// The own slot for `key` and where it lives.
pub fn own_slot(core: &ObjectCore, key: &PropertyKey) -> VmResult<Option<(Slot, SlotLocation)>> {
    if let Some(slot) = core.with_table(|t| t.get(key).cloned()).flatten() {
        return Ok(Some((slot, SlotLocation::Table)));
    }
    if let Some((binding, id)) = class_map_entry(core, key) {
        if let Some(slot) = binding.map.slot(id)? {
            return Ok(Some((slot, SlotLocation::ClassMap(id))));
        }
    }
    Ok(None)
}

/// Read a slot, invoking a getter with `receiver` as `this`.
pub fn read_slot(slot: &Slot, receiver: &ObjectRef) -> VmResult<Value> {
    match &slot.value {
        SlotValue::Data(value) => Ok(value.clone()),
        SlotValue::Accessor {
            getter: Some(getter),
            ..
        } => getter.call(&Value::Object(receiver.clone()), &[]),
        SlotValue::Accessor { getter: None, .. } => Ok(Value::Undefined),
    }
}

/// Ordinary own get
pub fn get_own(
    core: &ObjectCore,
    key: &PropertyKey,
    receiver: &ObjectRef,
) -> VmResult<Option<Value>> {
    match own_slot(core, key)? {
        Some((slot, _)) => Ok(Some(read_slot(&slot, receiver)?)),
        None => Ok(None),
    }
}

/// Ordinary own put.
///
/// Setters run on the receiver; getter-only accessors and read-only slots
/// refuse the write wherever they are found. A writable data slot accepts the
/// write only when this object is the receiver, otherwise the write is handed
/// back as [`WriteOutcome::Inherited`].
pub fn put_own(
    core: &ObjectCore,
    key: &PropertyKey,
    receiver: &ObjectRef,
    value: Value,
) -> VmResult<WriteOutcome> {
    let is_receiver = core.is_same(receiver);
    let Some((slot, location)) = own_slot(core, key)? else {
        if !is_receiver {
            return Ok(WriteOutcome::Inherited);
        }
        if !core.is_extensible() {
            return Ok(WriteOutcome::Rejected(WriteRejection::NotExtensible));
        }
        core.with_table_mut(|t| t.insert(key.clone(), Slot::data(value, Attributes::EMPTY)));
        return Ok(WriteOutcome::Written);
    };

    match &slot.value {
        SlotValue::Accessor {
            setter: Some(setter),
            ..
        } => {
            setter.call(&Value::Object(receiver.clone()), &[value])?;
            return Ok(WriteOutcome::Written);
        }
        SlotValue::Accessor { setter: None, .. } => {
            return Ok(WriteOutcome::Rejected(WriteRejection::GetterOnly));
        }
        SlotValue::Data(_) => {}
    }
    if !slot.attributes.is_writable() {
        return Ok(WriteOutcome::Rejected(WriteRejection::ReadOnly));
    }
    if !is_receiver {
        return Ok(WriteOutcome::Inherited);
    }

    match location {
        SlotLocation::Table => {
            core.with_table_mut(|t| t.set_value(key.clone(), value, slot.attributes));
        }
        SlotLocation::ClassMap(id) => {
            let Some(binding) = core.class_map() else {
                return Err(VmError::internal("class map detached during write"));
            };
            if binding.owner {
                if !binding.map.set(id, value)? {
                    return Ok(WriteOutcome::Rejected(WriteRejection::ReadOnly));
                }
            } else {
                // Shadow the shared default on this instance only.
                core.with_table_mut(|t| t.insert(key.clone(), Slot::data(value, slot.attributes)));
            }
        }
    }
    Ok(WriteOutcome::Written)
}

/// Ordinary own delete. False for permanent properties.
pub fn delete_own(core: &ObjectCore, key: &PropertyKey) -> VmResult<bool> {
    let table_result = core
        .with_existing_table_mut(|t| t.has(key).then(|| t.delete(key)))
        .flatten();
    let shared = core.class_map().filter(|b| !b.owner);

    if let Some(deleted) = table_result {
        if !deleted {
            return Ok(false);
        }
        // A deleted shadow must not resurrect the shared default.
        if let Some(id) = shared.and_then(|b| b.map.find_key(key)) {
            core.mask_id(id);
        }
        return Ok(true);
    }

    let Some((binding, id)) = class_map_entry(core, key) else {
        return Ok(true);
    };
    if binding.owner {
        return binding.map.delete(id);
    }
    if binding
        .map
        .get_attributes(id)?
        .is_some_and(|a| !a.is_configurable())
    {
        return Ok(false);
    }
    core.mask_id(id);
    Ok(true)
}

/// Ordinary own keys: table keys first, then class map names.
pub fn own_keys(core: &ObjectCore, include_non_enumerable: bool) -> VmResult<Vec<PropertyKey>> {
    let table_keys = core
        .with_table(|t| t.get_ids(include_non_enumerable))
        .unwrap_or_default();
    let Some(binding) = core.class_map() else {
        return Ok(table_keys);
    };
    let shadowed: Vec<u32> = core
        .with_table(|t| {
            t.get_ids(true)
                .iter()
                .filter_map(|k| binding.map.find_key(k))
                .collect()
        })
        .unwrap_or_default();
    binding
        .map
        .get_names_filtered(include_non_enumerable, table_keys, |id| {
            !shadowed.contains(&id) && (binding.owner || !core.is_masked(id))
        })
}

/// Ordinary `[[GetOwnProperty]]`
pub fn get_own_property(
    core: &ObjectCore,
    key: &PropertyKey,
) -> VmResult<Option<PropertyDescriptor>> {
    Ok(own_slot(core, key)?.map(|(slot, _)| PropertyDescriptor::from_slot(&slot)))
}

/// Ordinary `[[DefineOwnProperty]]`.
///
/// Owned class map entries are redefined in place; everything else lands in
/// the property table, where a kind change (data to accessor or back)
/// replaces the old slot.
pub fn define_own_property(
    core: &ObjectCore,
    key: &PropertyKey,
    desc: &PropertyDescriptor,
    check_valid: bool,
) -> VmResult<()> {
    desc.validate_shape()?;
    let current = own_slot(core, key)?;
    let current_slot = current.as_ref().map(|(slot, _)| slot);
    if check_valid {
        check_property_change(key, current_slot, desc, core.is_extensible())?;
    }
    let new_slot = desc.apply_to(current_slot);

    if let Some((_, SlotLocation::ClassMap(id))) = current {
        if let Some(binding) = core.class_map().filter(|b| b.owner) {
            binding.map.replace(id, new_slot)?;
            return Ok(());
        }
    }
    core.with_table_mut(|t| t.insert(key.clone(), new_slot));
    Ok(())
}

/// Ordinary `[[DefaultValue]]`: `valueOf`/`toString` in hint order.
pub fn default_value(this: &ObjectRef, hint: Option<PreferredType>) -> VmResult<Value> {
    let order = match hint {
        Some(PreferredType::String) => ["toString", "valueOf"],
        _ => ["valueOf", "toString"],
    };
    for name in order {
        if let Value::Object(method) = this.get_value(&PropertyKey::name(name))? {
            if method.is_callable() {
                let result = method.call(&Value::Object(this.clone()), &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
    }
    Err(VmError::type_error("Cannot convert object to primitive value"))
}

/// Ordinary `instanceof`: is `this.prototype` on the value's prototype chain.
pub fn has_instance(this: &ObjectRef, value: &Value) -> VmResult<bool> {
    let Value::Object(obj) = value else {
        return Ok(false);
    };
    let Value::Object(proto) = this.get_value(&PropertyKey::name("prototype"))? else {
        return Err(VmError::type_error(
            "Function has non-object prototype in instanceof check",
        ));
    };
    let mut cursor = obj.prototype();
    while let Some(o) = cursor {
        if o.ptr_eq(&proto) {
            return Ok(true);
        }
        cursor = o.prototype();
    }
    Ok(false)
}

/// Shared class map of a class, or `None` for objects without one.
pub fn class_map_of(core: &ObjectCore) -> Option<&ClassValueMap> {
    core.class_map().map(|b| b.map.as_ref())
}
