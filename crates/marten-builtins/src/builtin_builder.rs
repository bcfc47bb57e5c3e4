//! Builder for built-in constructors, prototypes and namespace objects.
//!
//! Methods and constants are not defined on the objects directly: they are
//! collected into [`BuiltinCatalog`]s and attached as class value maps, so
//! every entry gets the right attributes and is materialized on first use.
//!
//! ## Usage
//!
//! ```ignore
//! let ctor = BuiltInBuilder::new(&intrinsics.function_prototype, &intrinsics.array_prototype, "Array")
//!     .inherits(&intrinsics.object_prototype)
//!     .constructor_fn(array_constructor, 1)
//!     .method("push", array_push, 1)
//!     .static_method("isArray", array_is_array, 1)
//!     .build()?;
//! ```

use std::sync::Arc;

use marten_object::{
    Attributes, ClassValueMap, NativeFn, NativeFunction, ObjectRef, Value, VmResult,
};

use crate::catalog::{BuiltinCatalog, CONSTRUCTOR, CatalogEntry};

/// Attributes of `Constructor.prototype`
const PROTOTYPE_LINK: Attributes = Attributes::READONLY
    .union(Attributes::DONTENUM)
    .union(Attributes::PERMANENT);

/// Builder for a constructor + prototype pair.
pub struct BuiltInBuilder {
    function_prototype: ObjectRef,
    prototype: ObjectRef,
    name: String,
    /// The prototype's `[[Prototype]]`; left untouched when `None`
    parent_proto: Option<ObjectRef>,
    ctor_fn: Option<NativeFn>,
    ctor_length: u32,
    methods: BuiltinCatalog,
    statics: BuiltinCatalog,
    eager: bool,
}

impl BuiltInBuilder {
    /// Create a builder over a pre-allocated prototype object.
    ///
    /// - `function_prototype`: `[[Prototype]]` of every function created
    /// - `prototype`: the (possibly still empty) prototype object
    /// - `name`: constructor name, e.g. `"Array"`
    pub fn new(function_prototype: &ObjectRef, prototype: &ObjectRef, name: &str) -> Self {
        Self {
            function_prototype: function_prototype.clone(),
            prototype: prototype.clone(),
            name: name.to_string(),
            parent_proto: None,
            ctor_fn: None,
            ctor_length: 0,
            methods: BuiltinCatalog::new(name, Some(function_prototype)),
            statics: BuiltinCatalog::new(name, Some(function_prototype)),
            eager: false,
        }
    }

    /// Set the prototype's `[[Prototype]]`.
    pub fn inherits(mut self, parent_proto: &ObjectRef) -> Self {
        self.parent_proto = Some(parent_proto.clone());
        self
    }

    /// Constructor body and arity.
    pub fn constructor_fn<F>(mut self, f: F, length: u32) -> Self
    where
        F: Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        self.ctor_fn = Some(Arc::new(f));
        self.ctor_length = length;
        self
    }

    /// Add a prototype method (writable, non-enumerable, configurable).
    pub fn method<F>(mut self, name: &str, f: F, length: u32) -> Self
    where
        F: Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        self.methods.push(
            name,
            CatalogEntry::Method {
                func: Arc::new(f),
                length,
            },
        );
        self
    }

    /// Add a prototype data property.
    pub fn property(mut self, name: &str, value: Value, attributes: Attributes) -> Self {
        self.methods
            .push(name, CatalogEntry::Value { value, attributes });
        self
    }

    /// Add a static method on the constructor.
    pub fn static_method<F>(mut self, name: &str, f: F, length: u32) -> Self
    where
        F: Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        self.statics.push(
            name,
            CatalogEntry::Method {
                func: Arc::new(f),
                length,
            },
        );
        self
    }

    /// Add a static data property on the constructor.
    pub fn static_property(mut self, name: &str, value: Value, attributes: Attributes) -> Self {
        self.statics
            .push(name, CatalogEntry::Value { value, attributes });
        self
    }

    /// Materialize every catalog entry at build time.
    pub fn eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }

    /// Build the pair and return the constructor.
    ///
    /// 1. Sets the prototype's `[[Prototype]]` (if given)
    /// 2. Attaches the method catalog to the prototype, with a `constructor` slot
    /// 3. Creates the constructor function and attaches the static catalog
    /// 4. Wires `constructor.prototype` (read-only, non-enumerable, permanent)
    /// 5. Closing pass: fills `prototype.constructor`
    pub fn build(self) -> VmResult<ObjectRef> {
        let BuiltInBuilder {
            function_prototype,
            prototype,
            name,
            parent_proto,
            ctor_fn,
            ctor_length,
            mut methods,
            statics,
            eager,
        } = self;

        if let Some(parent) = parent_proto {
            prototype.set_prototype(Some(parent))?;
        }

        let constructor_id = methods.push(CONSTRUCTOR, CatalogEntry::Constructor);
        let method_map = Arc::new(ClassValueMap::new(Arc::new(methods)));
        prototype.core().attach_class_map(method_map.clone())?;

        let func = ctor_fn.unwrap_or_else(|| Arc::new(no_op_constructor) as NativeFn);
        let constructor = NativeFunction::create(&name, ctor_length, func, Some(function_prototype))?;
        let static_map = (!statics.is_empty())
            .then(|| Arc::new(ClassValueMap::new(Arc::new(statics))));
        if let Some(map) = &static_map {
            constructor.core().attach_class_map(map.clone())?;
        }
        constructor.define_value("prototype", Value::Object(prototype), PROTOTYPE_LINK)?;

        method_map.init_value(
            constructor_id,
            CONSTRUCTOR,
            Value::Object(constructor.clone()),
            Attributes::DONTENUM,
        )?;

        if eager {
            method_map.ensure_all()?;
            if let Some(map) = &static_map {
                map.ensure_all()?;
            }
        }
        tracing::debug!(
            target: "marten::realm",
            class = %name,
            eager,
            "built-in class installed"
        );
        Ok(constructor)
    }
}

fn no_op_constructor(_this: &Value, _args: &[Value]) -> VmResult<Value> {
    Ok(Value::Undefined)
}

/// Builder for namespace objects (`Math`, `JSON`): plain objects with
/// methods and constants, not constructors.
pub struct NamespaceBuilder {
    object: ObjectRef,
    catalog: BuiltinCatalog,
    eager: bool,
}

impl NamespaceBuilder {
    /// Create a builder over a pre-allocated namespace object.
    pub fn new(function_prototype: &ObjectRef, object: &ObjectRef, name: &str) -> Self {
        Self {
            object: object.clone(),
            catalog: BuiltinCatalog::new(name, Some(function_prototype)),
            eager: false,
        }
    }

    /// Add a method.
    pub fn method<F>(mut self, name: &str, f: F, length: u32) -> Self
    where
        F: Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        self.catalog.push(
            name,
            CatalogEntry::Method {
                func: Arc::new(f),
                length,
            },
        );
        self
    }

    /// Add a data property.
    pub fn property(mut self, name: &str, value: Value, attributes: Attributes) -> Self {
        self.catalog
            .push(name, CatalogEntry::Value { value, attributes });
        self
    }

    /// Materialize every entry at build time.
    pub fn eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }

    /// Attach the catalog and return the namespace object.
    pub fn build(self) -> VmResult<ObjectRef> {
        let map = Arc::new(ClassValueMap::new(Arc::new(self.catalog)));
        self.object.core().attach_class_map(map.clone())?;
        if self.eager {
            map.ensure_all()?;
        }
        tracing::debug!(
            target: "marten::realm",
            namespace = self.object.class_name(),
            "namespace installed"
        );
        Ok(self.object)
    }
}
