//! Realms and the realm registry.
//!
//! A realm owns its intrinsics and global object. Realms never share objects;
//! the registry only hands out ids and keeps realms alive.

use parking_lot::RwLock;
use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use marten_object::{
    Activation, NativeFunction, ObjectRef, OrdinaryObject, PropertyKey, Strictness, Value,
    VmResult,
};

use crate::global;
use crate::intrinsics::Intrinsics;

/// Unique realm identifier.
pub type RealmId = u32;

/// Realm bootstrap options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RealmConfig {
    /// Rejected writes and deletes through [`Realm::put`] / [`Realm::delete`]
    /// throw instead of being ignored
    pub strict: bool,
    /// Seal every standard object after bootstrap
    pub seal_builtins: bool,
    /// Materialize every catalog entry at bootstrap instead of on first use
    pub eager_catalogs: bool,
}

/// One independent set of standard objects plus a global object.
pub struct Realm {
    id: RealmId,
    config: RealmConfig,
    intrinsics: Intrinsics,
    global: ObjectRef,
}

impl Realm {
    /// Bootstrap a realm with id 0.
    pub fn new(config: RealmConfig) -> VmResult<Self> {
        Self::with_id(0, config)
    }

    /// Bootstrap a realm: allocate, wire, populate, then optionally seal.
    pub fn with_id(id: RealmId, config: RealmConfig) -> VmResult<Self> {
        let intrinsics = Intrinsics::allocate()?;
        intrinsics.wire_prototype_chains()?;

        let global = ObjectRef::new(OrdinaryObject::new(
            "global",
            Some(intrinsics.object_prototype.clone()),
        ));
        global::install(&global, &intrinsics, config.eager_catalogs)?;

        if config.seal_builtins {
            intrinsics.seal_all()?;
        }
        tracing::debug!(
            target: "marten::realm",
            realm = id,
            strict = config.strict,
            sealed = config.seal_builtins,
            eager = config.eager_catalogs,
            "realm created"
        );
        Ok(Self {
            id,
            config,
            intrinsics,
            global,
        })
    }

    /// Realm id
    pub fn id(&self) -> RealmId {
        self.id
    }

    /// Bootstrap options
    pub fn config(&self) -> RealmConfig {
        self.config
    }

    /// Standard objects
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// The global object
    pub fn global(&self) -> &ObjectRef {
        &self.global
    }

    /// The global object as a value
    pub fn global_value(&self) -> Value {
        Value::Object(self.global.clone())
    }

    /// Write policy selected by [`RealmConfig::strict`]
    pub fn strictness(&self) -> Strictness {
        if self.config.strict {
            Strictness::Strict
        } else {
            Strictness::Sloppy
        }
    }

    /// A global binding that holds an object, e.g. `constructor("Array")`.
    pub fn constructor(&self, name: &str) -> VmResult<Option<ObjectRef>> {
        match self.global.get_value(&PropertyKey::name(name))? {
            Value::Object(obj) => Ok(Some(obj)),
            _ => Ok(None),
        }
    }

    /// `{}`
    pub fn new_object(&self) -> ObjectRef {
        self.intrinsics.new_object()
    }

    /// `[...elements]`
    pub fn new_array(&self, elements: Vec<Value>) -> VmResult<ObjectRef> {
        self.intrinsics.new_array(elements)
    }

    /// A native function inheriting from this realm's `Function.prototype`.
    pub fn new_function(
        &self,
        name: &str,
        length: u32,
        f: impl Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    ) -> VmResult<ObjectRef> {
        NativeFunction::from_fn(
            name,
            length,
            Some(self.intrinsics.function_prototype.clone()),
            f,
        )
    }

    /// An activation for calling `callee` with `params` bound to `args`,
    /// scoped under the global object.
    pub fn new_activation(
        &self,
        params: &[&str],
        args: Vec<Value>,
        callee: Option<ObjectRef>,
    ) -> VmResult<ObjectRef> {
        Activation::create(
            params,
            args,
            callee,
            Some(self.global.clone()),
            Some(self.intrinsics.object_prototype.clone()),
        )
    }

    /// ToObject with this realm's wrappers
    pub fn to_object(&self, value: &Value) -> VmResult<ObjectRef> {
        self.intrinsics.to_object(value)
    }

    /// `obj[key] = value` under the realm's write policy.
    pub fn put(&self, obj: &ObjectRef, key: &PropertyKey, value: Value) -> VmResult<()> {
        obj.put_checked(key, value, self.strictness())
    }

    /// `delete obj[key]` under the realm's write policy.
    pub fn delete(&self, obj: &ObjectRef, key: &PropertyKey) -> VmResult<bool> {
        obj.delete_checked(key, self.strictness())
    }

    /// Call `func` with `this` and `args`.
    pub fn call(&self, func: &Value, this: &Value, args: &[Value]) -> VmResult<Value> {
        crate::helpers::require_callable(func, "call")?.call(this, args)
    }
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Registry of every realm created by an embedder.
pub struct RealmRegistry {
    realms: RwLock<Vec<Arc<Realm>>>,
    next_id: AtomicU32,
}

impl RealmRegistry {
    /// Empty registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            realms: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(0),
        })
    }

    /// Allocate a new realm id.
    pub fn allocate_id(&self) -> RealmId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Bootstrap and register a realm.
    pub fn create(&self, config: RealmConfig) -> VmResult<Arc<Realm>> {
        let realm = Arc::new(Realm::with_id(self.allocate_id(), config)?);
        self.realms.write().push(realm.clone());
        Ok(realm)
    }

    /// Lookup a realm by id.
    pub fn get(&self, id: RealmId) -> Option<Arc<Realm>> {
        self.realms.read().iter().find(|r| r.id == id).cloned()
    }

    /// Remove a realm by id.
    pub fn remove(&self, id: RealmId) -> Option<Arc<Realm>> {
        let mut realms = self.realms.write();
        let pos = realms.iter().position(|r| r.id == id)?;
        Some(realms.swap_remove(pos))
    }

    /// Number of live realms
    pub fn len(&self) -> usize {
        self.realms.read().len()
    }

    /// True if no realm is registered
    pub fn is_empty(&self) -> bool {
        self.realms.read().is_empty()
    }
}
