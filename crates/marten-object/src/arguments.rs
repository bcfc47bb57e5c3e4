//! Activations and the arguments object
//!
//! An [`Activation`] holds one call's parameters as permanent own properties.
//! Its [`ArgumentsObject`] exposes the passed values by index; an index that
//! is *shared* reads and writes the activation's parameter binding instead of
//! its own copy. Each index moves through a small state machine:
//!
//! ```text
//! Shared ──(delete / accessor or read-only redefinition)──> Deleted
//! Unshared ──(delete / accessor or read-only redefinition)──> Deleted
//! ```
//!
//! Nothing returns from `Deleted`: later writes to that index are ordinary
//! own properties of the arguments object.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::descriptor::{PropertyDescriptor, check_property_change};
use crate::error::{VmError, VmResult};
use crate::object::{JsObject, ObjectCore, ObjectRef, WeakObjectRef, WriteOutcome};
use crate::ordinary;
use crate::property::{Attributes, PropertyKey, Slot};
use crate::value::Value;

/// A function call's variable object.
pub struct Activation {
    core: ObjectCore,
    params: Arc<[Arc<str>]>,
}

impl Activation {
    /// Create an activation for a call of a function with `params`, binding
    /// each parameter to its argument (`undefined` when missing; the last of
    /// several same-named parameters wins) and defining `arguments`.
    pub fn create(
        params: &[&str],
        args: Vec<Value>,
        callee: Option<ObjectRef>,
        parent_scope: Option<ObjectRef>,
        arguments_proto: Option<ObjectRef>,
    ) -> VmResult<ObjectRef> {
        let params: Arc<[Arc<str>]> = params.iter().map(|p| Arc::from(*p)).collect();
        let activation = ObjectRef::new(Self {
            core: ObjectCore::new("Call", None),
            params: params.clone(),
        });
        activation.set_parent_scope(parent_scope);

        for (i, name) in params.iter().enumerate() {
            let value = args.get(i).cloned().unwrap_or_default();
            activation.define_value(PropertyKey::name(name.clone()), value, Attributes::PERMANENT)?;
        }

        let arguments = ArgumentsObject::create(&activation, params, args, callee, arguments_proto)?;
        activation.define_value("arguments", Value::Object(arguments), Attributes::PERMANENT)?;
        Ok(activation)
    }

    /// Declared parameter names
    pub fn params(&self) -> &[Arc<str>] {
        &self.params
    }
}

impl JsObject for Activation {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Per-index state of an arguments object.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgState {
    /// Aliases the activation's parameter; carries the last value written
    /// through the arguments object
    Shared(Value),
    /// Independent copy
    Unshared(Value),
    /// Deleted or redefined; the index is now an ordinary property
    Deleted,
}

#[derive(Debug, Clone)]
struct ArgEntry {
    state: ArgState,
    attributes: Attributes,
}

/// The `arguments` object of one activation.
pub struct ArgumentsObject {
    core: ObjectCore,
    activation: WeakObjectRef,
    params: Arc<[Arc<str>]>,
    /// The values as passed; never mutated
    original: Arc<[Value]>,
    /// `None` until the first mutation, then a private copy
    entries: Mutex<Option<Vec<ArgEntry>>>,
}

impl ArgumentsObject {
    /// Create the arguments object for `activation`.
    pub fn create(
        activation: &ObjectRef,
        params: Arc<[Arc<str>]>,
        args: Vec<Value>,
        callee: Option<ObjectRef>,
        prototype: Option<ObjectRef>,
    ) -> VmResult<ObjectRef> {
        let len = args.len();
        let obj = ObjectRef::new(Self {
            core: ObjectCore::new("Arguments", prototype),
            activation: activation.downgrade(),
            params,
            original: args.into(),
            entries: Mutex::new(None),
        });
        obj.define_value("length", Value::from(len as u32), Attributes::DONTENUM)?;
        if let Some(callee) = callee {
            obj.define_value("callee", Value::Object(callee), Attributes::DONTENUM)?;
        }
        Ok(obj)
    }

    /// Number of arguments passed
    pub fn len(&self) -> usize {
        self.original.len()
    }

    /// True when the call passed no arguments
    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// The snapshot value of index `i`; `None` (NOT_FOUND) when out of range
    /// or deleted.
    pub fn arg(&self, i: usize) -> Option<Value> {
        match self.entry(i)?.state {
            ArgState::Shared(v) | ArgState::Unshared(v) => Some(v),
            ArgState::Deleted => None,
        }
    }

    /// Whether index `i` aliases a parameter: it must be a declared parameter
    /// and no later parameter may have the same name.
    pub fn shared_with_activation(&self, i: usize) -> bool {
        let Some(name) = self.params.get(i) else {
            return false;
        };
        i < self.original.len() && !self.params[i + 1..].contains(name)
    }

    /// Current state of index `i`
    pub fn state(&self, i: usize) -> Option<ArgState> {
        self.entry(i).map(|e| e.state)
    }

    fn initial_entry(&self, i: usize) -> ArgEntry {
        let value = self.original[i].clone();
        let state = if self.shared_with_activation(i) {
            ArgState::Shared(value)
        } else {
            ArgState::Unshared(value)
        };
        ArgEntry {
            state,
            attributes: Attributes::EMPTY,
        }
    }

    fn entry(&self, i: usize) -> Option<ArgEntry> {
        if i >= self.original.len() {
            return None;
        }
        match self.entries.lock().as_ref() {
            Some(entries) => Some(entries[i].clone()),
            None => Some(self.initial_entry(i)),
        }
    }

    /// Mutate entry `i`, copying the snapshot first if this is the first
    /// mutation.
    fn update_entry<R>(&self, i: usize, f: impl FnOnce(&mut ArgEntry) -> R) -> R {
        let mut guard = self.entries.lock();
        let entries = guard.get_or_insert_with(|| {
            (0..self.original.len())
                .map(|j| self.initial_entry(j))
                .collect()
        });
        f(&mut entries[i])
    }

    /// Index handled by this object's aliasing logic (in range, not deleted)
    fn live_index(&self, key: &PropertyKey) -> Option<(usize, ArgEntry)> {
        let i = key.as_index()? as usize;
        let entry = self.entry(i)?;
        (entry.state != ArgState::Deleted).then_some((i, entry))
    }

    fn param_key(&self, i: usize) -> PropertyKey {
        PropertyKey::name(self.params[i].clone())
    }

    fn activation(&self) -> Option<ObjectRef> {
        self.activation.upgrade()
    }

    /// Current value of a live entry; shared entries read the activation.
    fn current_value(&self, i: usize, entry: &ArgEntry) -> VmResult<Value> {
        match &entry.state {
            ArgState::Shared(snapshot) => match self.activation() {
                Some(activation) => Ok(activation
                    .get(&self.param_key(i))?
                    .unwrap_or_else(|| snapshot.clone())),
                None => Ok(snapshot.clone()),
            },
            ArgState::Unshared(v) => Ok(v.clone()),
            ArgState::Deleted => Ok(Value::Undefined),
        }
    }

    /// Store `value` at a live index, writing through when shared.
    fn write_value(&self, i: usize, shared: bool, value: Value) -> VmResult<()> {
        if shared {
            if let Some(activation) = self.activation() {
                activation.put(&self.param_key(i), value.clone())?;
            }
        }
        self.update_entry(i, |entry| {
            entry.state = match entry.state {
                ArgState::Shared(_) => ArgState::Shared(value),
                ArgState::Unshared(_) => ArgState::Unshared(value),
                ArgState::Deleted => ArgState::Deleted,
            };
        });
        Ok(())
    }
}

impl JsObject for ArgumentsObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn has_own(&self, key: &PropertyKey) -> bool {
        self.live_index(key).is_some() || ordinary::has_own(&self.core, key)
    }

    fn get_own(&self, key: &PropertyKey, receiver: &ObjectRef) -> VmResult<Option<Value>> {
        match self.live_index(key) {
            Some((i, entry)) => Ok(Some(self.current_value(i, &entry)?)),
            None => ordinary::get_own(&self.core, key, receiver),
        }
    }

    fn put_own(
        &self,
        key: &PropertyKey,
        receiver: &ObjectRef,
        value: Value,
    ) -> VmResult<WriteOutcome> {
        let Some((i, entry)) = self.live_index(key) else {
            return ordinary::put_own(&self.core, key, receiver, value);
        };
        if !self.core.is_same(receiver) {
            return Ok(WriteOutcome::Inherited);
        }
        let shared = matches!(entry.state, ArgState::Shared(_));
        self.write_value(i, shared, value)?;
        Ok(WriteOutcome::Written)
    }

    fn delete_own(&self, key: &PropertyKey) -> VmResult<bool> {
        let Some((i, entry)) = self.live_index(key) else {
            return ordinary::delete_own(&self.core, key);
        };
        if !entry.attributes.is_configurable() {
            return Ok(false);
        }
        self.update_entry(i, |e| e.state = ArgState::Deleted);
        tracing::trace!(target: "marten::arguments", index = i, "argument deleted");
        Ok(true)
    }

    fn own_keys(&self, include_non_enumerable: bool) -> VmResult<Vec<PropertyKey>> {
        let mut indices: Vec<u32> = Vec::new();
        for i in 0..self.original.len() {
            if let Some(entry) = self.entry(i) {
                if entry.state != ArgState::Deleted
                    && (include_non_enumerable || entry.attributes.is_enumerable())
                {
                    indices.push(i as u32);
                }
            }
        }
        let mut names = Vec::new();
        for key in ordinary::own_keys(&self.core, include_non_enumerable)? {
            match key {
                PropertyKey::Index(i) => indices.push(i),
                name => names.push(name),
            }
        }
        indices.sort_unstable();
        indices.dedup();
        let mut keys: Vec<PropertyKey> = indices.into_iter().map(PropertyKey::Index).collect();
        keys.extend(names);
        Ok(keys)
    }

    fn get_own_property(&self, key: &PropertyKey) -> VmResult<Option<PropertyDescriptor>> {
        match self.live_index(key) {
            Some((i, entry)) => {
                let value = self.current_value(i, &entry)?;
                Ok(Some(PropertyDescriptor::with_attributes(value, entry.attributes)))
            }
            None => ordinary::get_own_property(&self.core, key),
        }
    }

    fn define_own_property(
        &self,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        check_valid: bool,
    ) -> VmResult<()> {
        let Some((i, entry)) = self.live_index(key) else {
            return ordinary::define_own_property(&self.core, key, desc, check_valid);
        };
        desc.validate_shape()?;
        let current = Slot::data(self.current_value(i, &entry)?, entry.attributes);
        if check_valid {
            check_property_change(key, Some(&current), desc, self.core.is_extensible())?;
        }
        let shared = matches!(entry.state, ArgState::Shared(_));
        if let Some(value) = &desc.value {
            self.write_value(i, shared, value.clone())?;
        }

        let updated = desc.apply_to(Some(&current));
        if desc.is_accessor() || desc.writable == Some(false) {
            // Sever the alias: the index becomes an ordinary own property.
            self.update_entry(i, |e| e.state = ArgState::Deleted);
            self.core
                .with_table_mut(|t| t.insert(key.clone(), updated));
            tracing::debug!(
                target: "marten::arguments",
                index = i,
                shared,
                "argument alias severed by redefinition"
            );
            return Ok(());
        }
        if updated.value.is_accessor() {
            return Err(VmError::internal("argument redefinition produced an accessor"));
        }
        self.update_entry(i, |e| e.attributes = updated.attributes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(activation: &ObjectRef) -> ObjectRef {
        match activation.get_value(&PropertyKey::name("arguments")).unwrap() {
            Value::Object(o) => o,
            other => panic!("arguments is not an object: {other:?}"),
        }
    }

    #[test]
    fn test_snapshot_is_copied_on_first_write() {
        let activation =
            Activation::create(&["a"], vec![Value::from(1), Value::from(2)], None, None, None)
                .unwrap();
        let args = args_of(&activation);
        let obj = args.downcast_ref::<ArgumentsObject>().unwrap();
        assert!(obj.entries.lock().is_none());
        args.put(&PropertyKey::index(1), Value::from(7)).unwrap();
        assert!(obj.entries.lock().is_some());
        assert_eq!(obj.original[1], Value::from(2));
        assert_eq!(obj.arg(1), Some(Value::from(7)));
    }

    #[test]
    fn test_extra_arguments_are_unshared() {
        let activation =
            Activation::create(&["a"], vec![Value::from(1), Value::from(2)], None, None, None)
                .unwrap();
        let args = args_of(&activation);
        let obj = args.downcast_ref::<ArgumentsObject>().unwrap();
        assert!(obj.shared_with_activation(0));
        assert!(!obj.shared_with_activation(1));
        assert!(!obj.shared_with_activation(2));
        assert_eq!(obj.arg(2), None);
    }

    #[test]
    fn test_missing_argument_is_not_aliased() {
        let activation = Activation::create(&["a", "b"], vec![Value::from(1)], None, None, None)
            .unwrap();
        let args = args_of(&activation);
        let obj = args.downcast_ref::<ArgumentsObject>().unwrap();
        assert!(!obj.shared_with_activation(1));
        activation
            .put(&PropertyKey::name("b"), Value::from(5))
            .unwrap();
        assert!(!args.has_own(&PropertyKey::index(1)));
    }
}
