//! Native (host-implemented) function objects

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::VmResult;
use crate::object::{JsObject, ObjectCore, ObjectRef};
use crate::ordinary;
use crate::property::Attributes;
use crate::value::Value;

/// Native function body: `(this, args) -> result`
pub type NativeFn = Arc<dyn Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync>;

/// A callable object backed by a Rust closure.
pub struct NativeFunction {
    core: ObjectCore,
    name: Arc<str>,
    func: NativeFn,
}

impl NativeFunction {
    /// Create a function object with `length` and `name` own properties.
    pub fn create(
        name: &str,
        length: u32,
        func: NativeFn,
        prototype: Option<ObjectRef>,
    ) -> VmResult<ObjectRef> {
        let obj = ObjectRef::new(Self {
            core: ObjectCore::new("Function", prototype),
            name: Arc::from(name),
            func,
        });
        obj.define_value(
            "length",
            Value::from(length),
            Attributes::READONLY | Attributes::DONTENUM | Attributes::PERMANENT,
        )?;
        obj.define_value(
            "name",
            Value::from(name),
            Attributes::READONLY | Attributes::DONTENUM,
        )?;
        Ok(obj)
    }

    /// Convenience wrapper taking a plain closure
    pub fn from_fn(
        name: &str,
        length: u32,
        prototype: Option<ObjectRef>,
        f: impl Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    ) -> VmResult<ObjectRef> {
        Self::create(name, length, Arc::new(f), prototype)
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl JsObject for NativeFunction {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_callable(&self) -> bool {
        true
    }

    fn call(&self, this: &Value, args: &[Value]) -> VmResult<Value> {
        (self.func)(this, args)
    }

    fn has_instance(&self, this_obj: &ObjectRef, value: &Value) -> VmResult<bool> {
        ordinary::has_instance(this_obj, value)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}() {{ [native code] }}", self.name)
    }
}

/// Argument `i`, or `undefined`
pub fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::OrdinaryObject;
    use crate::property::PropertyKey;

    #[test]
    fn test_native_call_and_metadata() {
        let add = NativeFunction::from_fn("add", 2, None, |_, args| {
            let a = arg(args, 0).as_number().unwrap_or(0.0);
            let b = arg(args, 1).as_number().unwrap_or(0.0);
            Ok(Value::Number(a + b))
        })
        .unwrap();
        assert!(add.is_callable());
        assert_eq!(
            add.call(&Value::Undefined, &[Value::from(2), Value::from(3)])
                .unwrap(),
            Value::Number(5.0)
        );
        assert_eq!(
            add.get(&PropertyKey::name("length")).unwrap(),
            Some(Value::Number(2.0))
        );
        assert!(!add.delete(&PropertyKey::name("length")).unwrap());
        assert_eq!(add.downcast_ref::<NativeFunction>().map(|f| f.name()), Some("add"));
    }

    #[test]
    fn test_instanceof_uses_prototype_property() {
        let ctor = NativeFunction::from_fn("C", 0, None, |_, _| Ok(Value::Undefined)).unwrap();
        let proto = OrdinaryObject::create(None);
        ctor.define_value("prototype", Value::Object(proto.clone()), Attributes::DONTENUM)
            .unwrap();
        let instance = OrdinaryObject::create(Some(proto));
        let other = OrdinaryObject::create(None);
        assert!(ctor.has_instance(&Value::Object(instance)).unwrap());
        assert!(!ctor.has_instance(&Value::Object(other.clone())).unwrap());
        assert!(!ctor.has_instance(&Value::Number(1.0)).unwrap());
        assert!(other.has_instance(&Value::Null).is_err());
    }
}
