//! Intrinsics registry for a realm's standard objects.
//!
//! Initialization follows a two-stage pattern:
//! 1. **Stage 1** ([`Intrinsics::allocate`]): allocate empty prototype and
//!    namespace objects, so later stages can refer to each other freely
//! 2. **Stage 2** ([`Intrinsics::wire_prototype_chains`]): set `[[Prototype]]`
//!    links in dependency order
//!
//! Populating the objects (stage 3) is driven by [`crate::global::install`],
//! which runs each built-in module's builder and binds the results.

use marten_object::{
    NativeFunction, ObjectRef, OrdinaryObject, PropertyKey, Value, VmError, VmResult,
};

use crate::array::ArrayObject;
use crate::primitive::PrimitiveObject;
use crate::string::StringObject;

/// The standard objects of one realm.
///
/// Cloning is cheap (reference-counted handles). Native method bodies that
/// create objects hold a clone.
#[derive(Clone)]
pub struct Intrinsics {
    // ========================================================================
    // Core prototypes
    // ========================================================================
    /// `Object.prototype`, `[[Prototype]]` is `null`
    pub object_prototype: ObjectRef,
    /// `Function.prototype`, `[[Prototype]]` is `Object.prototype`. Callable:
    /// accepts any arguments and returns `undefined`.
    pub function_prototype: ObjectRef,

    // ========================================================================
    // Wrapper and collection prototypes
    // ========================================================================
    /// `Array.prototype`
    pub array_prototype: ObjectRef,
    /// `String.prototype`
    pub string_prototype: ObjectRef,
    /// `Number.prototype`
    pub number_prototype: ObjectRef,
    /// `Boolean.prototype`
    pub boolean_prototype: ObjectRef,

    // ========================================================================
    // Namespaces
    // ========================================================================
    /// `Math`
    pub math: ObjectRef,
    /// `JSON`
    pub json: ObjectRef,
}

impl Intrinsics {
    /// Stage 1: every object allocated, nothing linked or populated.
    pub fn allocate() -> VmResult<Self> {
        let alloc = |class: &str| ObjectRef::new(OrdinaryObject::new(class, None));
        let function_prototype = NativeFunction::from_fn("", 0, None, |_this, _args| {
            Ok(Value::Undefined)
        })?;
        Ok(Self {
            object_prototype: alloc("Object"),
            function_prototype,
            array_prototype: alloc("Array"),
            string_prototype: alloc("String"),
            number_prototype: alloc("Number"),
            boolean_prototype: alloc("Boolean"),
            math: alloc("Math"),
            json: alloc("JSON"),
        })
    }

    /// Stage 2: wire `[[Prototype]]` links.
    pub fn wire_prototype_chains(&self) -> VmResult<()> {
        // Object.prototype.[[Prototype]] stays null.
        let to_object = [
            &self.function_prototype,
            &self.array_prototype,
            &self.string_prototype,
            &self.number_prototype,
            &self.boolean_prototype,
            &self.math,
            &self.json,
        ];
        for obj in to_object {
            obj.set_prototype(Some(self.object_prototype.clone()))?;
        }
        Ok(())
    }

    /// The prototype objects, in bootstrap order
    pub fn prototypes(&self) -> [&ObjectRef; 6] {
        [
            &self.object_prototype,
            &self.function_prototype,
            &self.array_prototype,
            &self.string_prototype,
            &self.number_prototype,
            &self.boolean_prototype,
        ]
    }

    /// Every standard object: prototypes, their constructors (found through
    /// the `constructor` back-link) and the namespaces.
    pub fn standard_objects(&self) -> VmResult<Vec<ObjectRef>> {
        let mut objects = Vec::with_capacity(14);
        for proto in self.prototypes() {
            objects.push(proto.clone());
            if let Value::Object(ctor) = proto.get_value(&PropertyKey::name("constructor"))? {
                objects.push(ctor);
            }
        }
        objects.push(self.math.clone());
        objects.push(self.json.clone());
        Ok(objects)
    }

    /// Seal every standard object.
    pub fn seal_all(&self) -> VmResult<()> {
        let objects = self.standard_objects()?;
        for obj in &objects {
            obj.seal()?;
        }
        tracing::debug!(target: "marten::realm", count = objects.len(), "standard objects sealed");
        Ok(())
    }

    /// A fresh ordinary object inheriting from `Object.prototype`
    pub fn new_object(&self) -> ObjectRef {
        OrdinaryObject::create(Some(self.object_prototype.clone()))
    }

    /// A fresh array holding `elements`
    pub fn new_array(&self, elements: Vec<Value>) -> VmResult<ObjectRef> {
        ArrayObject::create(elements, Some(self.array_prototype.clone()))
    }

    /// ToObject: wrap primitives, reject `undefined` and `null`.
    pub fn to_object(&self, value: &Value) -> VmResult<ObjectRef> {
        match value {
            Value::Undefined | Value::Null => Err(VmError::type_error(
                "Cannot convert undefined or null to object",
            )),
            Value::Boolean(_) => Ok(PrimitiveObject::create(
                "Boolean",
                value.clone(),
                Some(self.boolean_prototype.clone()),
            )),
            Value::Number(_) => Ok(PrimitiveObject::create(
                "Number",
                value.clone(),
                Some(self.number_prototype.clone()),
            )),
            Value::String(s) => Ok(StringObject::create(
                s.clone(),
                Some(self.string_prototype.clone()),
            )),
            Value::Object(obj) => Ok(obj.clone()),
        }
    }
}

impl std::fmt::Debug for Intrinsics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Intrinsics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wiring_links_everything_to_object_prototype() {
        let intrinsics = Intrinsics::allocate().unwrap();
        intrinsics.wire_prototype_chains().unwrap();
        assert!(intrinsics.object_prototype.prototype().is_none());
        for proto in &intrinsics.prototypes()[1..] {
            assert!(
                proto
                    .prototype()
                    .is_some_and(|p| p.ptr_eq(&intrinsics.object_prototype))
            );
        }
    }

    #[test]
    fn test_function_prototype_is_a_no_op_function() {
        let intrinsics = Intrinsics::allocate().unwrap();
        let proto = &intrinsics.function_prototype;
        assert!(proto.is_callable());
        assert_eq!(proto.class_name(), "Function");
        assert_eq!(
            proto.call(&Value::Undefined, &[Value::from(1), Value::from("x")]).unwrap(),
            Value::Undefined
        );
        assert_eq!(
            proto.get_value(&PropertyKey::name("length")).unwrap(),
            Value::from(0)
        );
        assert_eq!(
            proto.get_value(&PropertyKey::name("name")).unwrap(),
            Value::from("")
        );
    }

    #[test]
    fn test_to_object_wraps_primitives() {
        let intrinsics = Intrinsics::allocate().unwrap();
        assert!(intrinsics.to_object(&Value::Undefined).is_err());
        assert!(intrinsics.to_object(&Value::Null).is_err());

        let wrapped = intrinsics.to_object(&Value::from(3)).unwrap();
        assert_eq!(wrapped.class_name(), "Number");
        assert!(
            wrapped
                .prototype()
                .is_some_and(|p| p.ptr_eq(&intrinsics.number_prototype))
        );

        let s = intrinsics.to_object(&Value::from("ab")).unwrap();
        assert_eq!(s.class_name(), "String");
        assert_eq!(
            s.get_value(&PropertyKey::name("length")).unwrap(),
            Value::from(2)
        );

        let obj = intrinsics.new_object();
        assert!(intrinsics.to_object(&Value::Object(obj.clone())).unwrap().ptr_eq(&obj));
    }
}
