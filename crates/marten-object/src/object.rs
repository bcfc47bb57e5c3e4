//! The object capability contract
//!
//! Every object implements [`JsObject`]. The trait's defaults implement the
//! ordinary algorithm (own property table, then the class map, see
//! [`crate::ordinary`]); exotic objects override the hooks they need and
//! delegate the rest. [`ObjectRef`] is the shared handle and owns the
//! prototype-chain walk, so resolution lives in one place.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use crate::class_map::ClassValueMap;
use crate::descriptor::PropertyDescriptor;
use crate::error::{VmError, VmResult};
use crate::ordinary;
use crate::property::{Attributes, PropertyKey};
use crate::property_table::PropertyTable;
use crate::value::{PreferredType, Value};

/// Whether rejected writes throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Rejected writes and deletes are silently ignored
    #[default]
    Sloppy,
    /// Rejected writes and deletes throw a TypeError
    Strict,
}

/// Why a write was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRejection {
    /// The data property is read-only
    ReadOnly,
    /// The accessor has a getter but no setter
    GetterOnly,
    /// The object is not extensible and the property does not exist
    NotExtensible,
}

/// Result of a single-object write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The value was stored (or a setter ran)
    Written,
    /// The property lives here but the write belongs on the receiver
    Inherited,
    /// The write was refused
    Rejected(WriteRejection),
}

/// The capability contract every object implements.
pub trait JsObject: Send + Sync + 'static {
    /// Shared object state
    fn core(&self) -> &ObjectCore;

    /// Downcasting support
    fn as_any(&self) -> &dyn Any;

    /// Class name, as reported by `Object.prototype.toString`
    fn class_name(&self) -> &str {
        self.core().class_name()
    }

    /// Whether `key` is an own property. Must not materialize class maps.
    fn has_own(&self, key: &PropertyKey) -> bool {
        ordinary::has_own(self.core(), key)
    }

    /// Own property value, with getters invoked on `receiver`.
    /// `None` means not found.
    fn get_own(&self, key: &PropertyKey, receiver: &ObjectRef) -> VmResult<Option<Value>> {
        ordinary::get_own(self.core(), key, receiver)
    }

    /// Write an own property on behalf of `receiver`.
    fn put_own(
        &self,
        key: &PropertyKey,
        receiver: &ObjectRef,
        value: Value,
    ) -> VmResult<WriteOutcome> {
        ordinary::put_own(self.core(), key, receiver, value)
    }

    /// Delete an own property. Returns false for permanent properties.
    fn delete_own(&self, key: &PropertyKey) -> VmResult<bool> {
        ordinary::delete_own(self.core(), key)
    }

    /// Own keys in enumeration order (GetIds)
    fn own_keys(&self, include_non_enumerable: bool) -> VmResult<Vec<PropertyKey>> {
        ordinary::own_keys(self.core(), include_non_enumerable)
    }

    /// `[[GetOwnProperty]]`
    fn get_own_property(&self, key: &PropertyKey) -> VmResult<Option<PropertyDescriptor>> {
        ordinary::get_own_property(self.core(), key)
    }

    /// `[[DefineOwnProperty]]`. With `check_valid` false the change is applied
    /// without validation (used by seal/freeze and bootstrap code).
    fn define_own_property(
        &self,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        check_valid: bool,
    ) -> VmResult<()> {
        ordinary::define_own_property(self.core(), key, desc, check_valid)
    }

    /// `[[Extensible]]`
    fn is_extensible(&self) -> bool {
        self.core().is_extensible()
    }

    /// `[[PreventExtensions]]`
    fn prevent_extensions(&self) {
        self.core().prevent_extensions();
    }

    /// Whether `call` is supported
    fn is_callable(&self) -> bool {
        false
    }

    /// `[[Call]]`
    fn call(&self, _this: &Value, _args: &[Value]) -> VmResult<Value> {
        Err(VmError::type_error(format!(
            "{} is not a function",
            self.class_name()
        )))
    }

    /// `instanceof` hook; `this_obj` is the handle of `self`.
    fn has_instance(&self, _this_obj: &ObjectRef, _value: &Value) -> VmResult<bool> {
        Err(VmError::type_error(
            "Right-hand side of 'instanceof' is not callable",
        ))
    }

    /// `[[DefaultValue]]` (ToPrimitive on objects)
    fn default_value(&self, this_obj: &ObjectRef, hint: Option<PreferredType>) -> VmResult<Value> {
        ordinary::default_value(this_obj, hint)
    }
}

/// A class map attached to an object.
#[derive(Debug, Clone)]
pub struct ClassMapBinding {
    /// The map
    pub map: Arc<ClassValueMap>,
    /// Whether writes land in the map. Owners are the class's own singleton
    /// (prototype, `Math`); sharing instances shadow entries in their table.
    pub owner: bool,
}

/// State common to every object.
pub struct ObjectCore {
    class_name: Arc<str>,
    /// Created on first write that the class map cannot absorb
    table: RwLock<Option<PropertyTable>>,
    class_map: OnceLock<ClassMapBinding>,
    /// Class-map ids deleted on a sharing instance
    masked_ids: Mutex<SmallVec<[u32; 4]>>,
    prototype: RwLock<Option<ObjectRef>>,
    parent_scope: RwLock<Option<ObjectRef>>,
    extensible: AtomicBool,
}

impl ObjectCore {
    /// Create object state
    pub fn new(class_name: impl Into<Arc<str>>, prototype: Option<ObjectRef>) -> Self {
        Self {
            class_name: class_name.into(),
            table: RwLock::new(None),
            class_map: OnceLock::new(),
            masked_ids: Mutex::new(SmallVec::new()),
            prototype: RwLock::new(prototype),
            parent_scope: RwLock::new(None),
            extensible: AtomicBool::new(true),
        }
    }

    /// Class name
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Whether the property table has been created
    pub fn has_table(&self) -> bool {
        self.table.read().is_some()
    }

    /// Read the property table, if it exists.
    pub fn with_table<R>(&self, f: impl FnOnce(&PropertyTable) -> R) -> Option<R> {
        self.table.read().as_ref().map(f)
    }

    /// Mutate the property table, creating it on first use.
    ///
    /// The closure runs under the table lock and must not call back into
    /// script.
    pub fn with_table_mut<R>(&self, f: impl FnOnce(&mut PropertyTable) -> R) -> R {
        let mut guard = self.table.write();
        f(guard.get_or_insert_with(PropertyTable::new))
    }

    /// Mutate the property table only if it already exists.
    pub fn with_existing_table_mut<R>(&self, f: impl FnOnce(&mut PropertyTable) -> R) -> Option<R> {
        self.table.write().as_mut().map(f)
    }

    /// Attach `map` as the class map this object owns.
    pub fn attach_class_map(&self, map: Arc<ClassValueMap>) -> VmResult<()> {
        self.bind_class_map(ClassMapBinding { map, owner: true })
    }

    /// Attach `map` as a class map shared with other instances.
    pub fn share_class_map(&self, map: Arc<ClassValueMap>) -> VmResult<()> {
        self.bind_class_map(ClassMapBinding { map, owner: false })
    }

    fn bind_class_map(&self, binding: ClassMapBinding) -> VmResult<()> {
        let class = binding.map.class_name().to_string();
        self.class_map.set(binding).map_err(|_| {
            VmError::internal(format!(
                "{}: class map {class} attached twice",
                self.class_name
            ))
        })
    }

    /// The attached class map
    pub fn class_map(&self) -> Option<&ClassMapBinding> {
        self.class_map.get()
    }

    pub(crate) fn is_masked(&self, id: u32) -> bool {
        self.masked_ids.lock().contains(&id)
    }

    pub(crate) fn mask_id(&self, id: u32) {
        let mut masked = self.masked_ids.lock();
        if !masked.contains(&id) {
            masked.push(id);
        }
    }

    /// Prototype link
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.prototype.read().clone()
    }

    pub(crate) fn set_prototype_unchecked(&self, proto: Option<ObjectRef>) {
        *self.prototype.write() = proto;
    }

    /// Parent scope link
    pub fn parent_scope(&self) -> Option<ObjectRef> {
        self.parent_scope.read().clone()
    }

    /// Replace the parent scope link
    pub fn set_parent_scope(&self, scope: Option<ObjectRef>) {
        *self.parent_scope.write() = scope;
    }

    /// Extensible flag
    pub fn is_extensible(&self) -> bool {
        self.extensible.load(Ordering::Acquire)
    }

    /// Clear the extensible flag (irreversible)
    pub fn prevent_extensions(&self) {
        self.extensible.store(false, Ordering::Release);
    }

    /// Whether `other` is the object owning this core
    pub fn is_same(&self, other: &ObjectRef) -> bool {
        std::ptr::eq(self, other.core())
    }
}

/// A plain object with only the ordinary behavior.
pub struct OrdinaryObject {
    core: ObjectCore,
}

impl OrdinaryObject {
    /// Create an ordinary object of class `class_name`
    pub fn new(class_name: impl Into<Arc<str>>, prototype: Option<ObjectRef>) -> Self {
        Self {
            core: ObjectCore::new(class_name, prototype),
        }
    }

    /// Create and wrap a plain `Object`
    pub fn create(prototype: Option<ObjectRef>) -> ObjectRef {
        ObjectRef::new(Self::new("Object", prototype))
    }
}

impl JsObject for OrdinaryObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shared handle to an object.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn JsObject>);

impl ObjectRef {
    /// Wrap an object
    pub fn new(obj: impl JsObject) -> Self {
        Self(Arc::new(obj))
    }

    /// Wrap an already shared object
    pub fn from_arc(obj: Arc<dyn JsObject>) -> Self {
        Self(obj)
    }

    /// Non-owning handle
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Arc::downgrade(&self.0))
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        std::ptr::eq(self.core(), other.core())
    }

    /// The object behind the handle
    pub fn inner(&self) -> &dyn JsObject {
        self.0.as_ref()
    }

    /// Downcast to a concrete object type
    pub fn downcast_ref<T: JsObject>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Shared object state
    pub fn core(&self) -> &ObjectCore {
        self.0.core()
    }

    /// Class name
    pub fn class_name(&self) -> &str {
        self.0.class_name()
    }

    /// Prototype link
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.core().prototype()
    }

    /// Replace the prototype link. Cycles are a TypeError.
    pub fn set_prototype(&self, proto: Option<ObjectRef>) -> VmResult<()> {
        let mut cursor = proto.clone();
        while let Some(obj) = cursor {
            if obj.ptr_eq(self) {
                return Err(VmError::type_error("Cyclic __proto__ value"));
            }
            cursor = obj.prototype();
        }
        self.core().set_prototype_unchecked(proto);
        Ok(())
    }

    /// Parent scope link
    pub fn parent_scope(&self) -> Option<ObjectRef> {
        self.core().parent_scope()
    }

    /// Replace the parent scope link
    pub fn set_parent_scope(&self, scope: Option<ObjectRef>) {
        self.core().set_parent_scope(scope);
    }

    /// Outermost object on the parent scope chain (the global object).
    pub fn top_level_scope(&self) -> ObjectRef {
        let mut top = self.clone();
        while let Some(parent) = top.parent_scope() {
            top = parent;
        }
        top
    }

    // ---- resolution over the prototype chain ----

    /// Own property check
    pub fn has_own(&self, key: &PropertyKey) -> bool {
        self.0.has_own(key)
    }

    /// Property check including the prototype chain
    pub fn has(&self, key: &PropertyKey) -> bool {
        let mut cursor = Some(self.clone());
        while let Some(obj) = cursor {
            if obj.has_own(key) {
                return true;
            }
            cursor = obj.prototype();
        }
        false
    }

    /// Get with `self` as receiver. `None` is NOT_FOUND.
    pub fn get(&self, key: &PropertyKey) -> VmResult<Option<Value>> {
        self.get_with_receiver(key, self)
    }

    /// Get starting at `self`, holding `receiver` fixed for getters.
    pub fn get_with_receiver(
        &self,
        key: &PropertyKey,
        receiver: &ObjectRef,
    ) -> VmResult<Option<Value>> {
        let mut cursor = Some(self.clone());
        while let Some(obj) = cursor {
            if let Some(value) = obj.0.get_own(key, receiver)? {
                return Ok(Some(value));
            }
            cursor = obj.prototype();
        }
        Ok(None)
    }

    /// Get, mapping NOT_FOUND to `undefined`
    pub fn get_value(&self, key: &PropertyKey) -> VmResult<Value> {
        Ok(self.get(key)?.unwrap_or_default())
    }

    /// Put with `self` as receiver. Returns false if the write was refused.
    pub fn put(&self, key: &PropertyKey, value: Value) -> VmResult<bool> {
        Ok(matches!(
            self.put_with_receiver(key, value, self)?,
            WriteOutcome::Written
        ))
    }

    /// Put starting at `self` on behalf of `receiver`.
    ///
    /// The chain is walked only to find the layer that already owns `key`: an
    /// inherited read-only slot or accessor decides the write there; an
    /// inherited writable data slot lets the write fall through to the
    /// receiver. New properties are always created on the receiver.
    pub fn put_with_receiver(
        &self,
        key: &PropertyKey,
        value: Value,
        receiver: &ObjectRef,
    ) -> VmResult<WriteOutcome> {
        let mut cursor = Some(self.clone());
        while let Some(obj) = cursor {
            if obj.has_own(key) {
                match obj.0.put_own(key, receiver, value.clone())? {
                    WriteOutcome::Inherited => break,
                    outcome => return Ok(outcome),
                }
            }
            cursor = obj.prototype();
        }
        match receiver.0.put_own(key, receiver, value)? {
            // The receiver never owned the key; nothing left to inherit from.
            WriteOutcome::Inherited => Ok(WriteOutcome::Written),
            outcome => Ok(outcome),
        }
    }

    /// Put, throwing on refusal in strict code.
    pub fn put_checked(
        &self,
        key: &PropertyKey,
        value: Value,
        strictness: Strictness,
    ) -> VmResult<()> {
        let outcome = self.put_with_receiver(key, value, self)?;
        let WriteOutcome::Rejected(reason) = outcome else {
            return Ok(());
        };
        tracing::trace!(target: "marten::object", key = %key, ?reason, "write rejected");
        if strictness == Strictness::Sloppy {
            return Ok(());
        }
        Err(VmError::type_error(match reason {
            WriteRejection::ReadOnly => format!(
                "Cannot assign to read only property '{key}' of object '[object {}]'",
                self.class_name()
            ),
            WriteRejection::GetterOnly => {
                format!("Cannot set property {key} which has only a getter")
            }
            WriteRejection::NotExtensible => {
                format!("Cannot add property {key}, object is not extensible")
            }
        }))
    }

    /// Delete an own property. False if it is permanent.
    pub fn delete(&self, key: &PropertyKey) -> VmResult<bool> {
        self.0.delete_own(key)
    }

    /// Delete, throwing for permanent properties in strict code.
    pub fn delete_checked(&self, key: &PropertyKey, strictness: Strictness) -> VmResult<bool> {
        let deleted = self.delete(key)?;
        if !deleted && strictness == Strictness::Strict {
            return Err(VmError::type_error(format!(
                "Cannot delete property '{key}' of [object {}]",
                self.class_name()
            )));
        }
        Ok(deleted)
    }

    /// Own keys (GetIds)
    pub fn get_ids(&self, include_non_enumerable: bool) -> VmResult<Vec<PropertyKey>> {
        self.0.own_keys(include_non_enumerable)
    }

    /// Enumerable keys along the whole chain, first occurrence wins
    /// (`for-in` order).
    pub fn enumerate_all(&self) -> VmResult<Vec<PropertyKey>> {
        let mut seen: Vec<PropertyKey> = Vec::new();
        let mut keys = Vec::new();
        let mut cursor = Some(self.clone());
        while let Some(obj) = cursor {
            for key in obj.get_ids(true)? {
                if seen.contains(&key) {
                    continue;
                }
                let enumerable = obj
                    .get_own_property(&key)?
                    .is_some_and(|d| d.enumerable == Some(true));
                if enumerable {
                    keys.push(key.clone());
                }
                seen.push(key);
            }
            cursor = obj.prototype();
        }
        Ok(keys)
    }

    /// `[[GetOwnProperty]]`
    pub fn get_own_property(&self, key: &PropertyKey) -> VmResult<Option<PropertyDescriptor>> {
        self.0.get_own_property(key)
    }

    /// `[[DefineOwnProperty]]` with validation
    pub fn define_own_property(
        &self,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
    ) -> VmResult<()> {
        self.0.define_own_property(key, desc, true)
    }

    /// `[[DefineOwnProperty]]` with explicit validation flag
    pub fn define_own_property_with(
        &self,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        check_valid: bool,
    ) -> VmResult<()> {
        self.0.define_own_property(key, desc, check_valid)
    }

    /// Define (or overwrite) a data property with the given attributes,
    /// bypassing validation.
    pub fn define_value(
        &self,
        key: impl Into<PropertyKey>,
        value: Value,
        attributes: Attributes,
    ) -> VmResult<()> {
        let desc = PropertyDescriptor::with_attributes(value, attributes);
        self.0.define_own_property(&key.into(), &desc, false)
    }

    /// Define (or overwrite) an accessor property, bypassing validation.
    pub fn define_accessor(
        &self,
        key: impl Into<PropertyKey>,
        getter: Option<ObjectRef>,
        setter: Option<ObjectRef>,
        attributes: Attributes,
    ) -> VmResult<()> {
        let desc = PropertyDescriptor::accessor(
            getter,
            setter,
            attributes.is_enumerable(),
            attributes.is_configurable(),
        );
        self.0.define_own_property(&key.into(), &desc, false)
    }

    /// `[[Extensible]]`
    pub fn is_extensible(&self) -> bool {
        self.0.is_extensible()
    }

    /// `[[PreventExtensions]]`
    pub fn prevent_extensions(&self) {
        self.0.prevent_extensions();
    }

    /// Whether the object is callable
    pub fn is_callable(&self) -> bool {
        self.0.is_callable()
    }

    /// Call the object
    pub fn call(&self, this: &Value, args: &[Value]) -> VmResult<Value> {
        self.0.call(this, args)
    }

    /// `value instanceof self`
    pub fn has_instance(&self, value: &Value) -> VmResult<bool> {
        self.0.has_instance(self, value)
    }

    /// ToPrimitive
    pub fn default_value(&self, hint: Option<PreferredType>) -> VmResult<Value> {
        self.0.default_value(self, hint)
    }
}

/// Non-owning object handle, for back-references that must not keep their
/// target alive.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<dyn JsObject>);

impl WeakObjectRef {
    /// The object, if still alive
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object {}]", self.class_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> PropertyKey {
        PropertyKey::name(s)
    }

    #[test]
    fn test_object_get_put() {
        let obj = OrdinaryObject::create(None);
        assert!(obj.put(&key("foo"), Value::Number(42.0)).unwrap());
        assert_eq!(obj.get(&key("foo")).unwrap(), Some(Value::Number(42.0)));
        assert_eq!(obj.get(&key("bar")).unwrap(), None);
    }

    #[test]
    fn test_null_is_not_not_found() {
        let obj = OrdinaryObject::create(None);
        obj.put(&key("n"), Value::Null).unwrap();
        assert_eq!(obj.get(&key("n")).unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_table_is_lazy() {
        let obj = OrdinaryObject::create(None);
        assert!(!obj.core().has_table());
        assert!(!obj.has(&key("x")));
        assert!(!obj.core().has_table());
        obj.put(&key("x"), Value::Undefined).unwrap();
        assert!(obj.core().has_table());
    }

    #[test]
    fn test_prototype_cycle_rejected() {
        let a = OrdinaryObject::create(None);
        let b = OrdinaryObject::create(Some(a.clone()));
        assert!(a.set_prototype(Some(b)).is_err());
        assert!(a.set_prototype(None).is_ok());
    }

    #[test]
    fn test_strict_put_on_non_extensible_throws() {
        let obj = OrdinaryObject::create(None);
        obj.prevent_extensions();
        assert!(
            obj.put_checked(&key("x"), Value::Null, Strictness::Sloppy)
                .is_ok()
        );
        let err = obj
            .put_checked(&key("x"), Value::Null, Strictness::Strict)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: Cannot add property x, object is not extensible"
        );
        assert!(!obj.has(&key("x")));
    }

    #[test]
    fn test_parent_scope_is_not_inheritance() {
        let global = OrdinaryObject::create(None);
        global.put(&key("g"), Value::Boolean(true)).unwrap();
        let inner = OrdinaryObject::create(None);
        inner.set_parent_scope(Some(global.clone()));
        assert!(!inner.has(&key("g")));
        assert!(inner.top_level_scope().ptr_eq(&global));
    }

    #[test]
    fn test_object_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ObjectRef>();
    }
}
