//! Number and Boolean wrappers
//!
//! [`PrimitiveObject`] is what ToObject produces for numbers and booleans.
//! The `Number` and `Boolean` constructors convert when called; their
//! prototypes carry `toString` and `valueOf`.

use std::any::Any;

use marten_object::convert::{number_to_string, to_boolean, to_number};
use marten_object::{Attributes, JsObject, ObjectCore, ObjectRef, Value, VmError, VmResult};

use crate::builtin_builder::BuiltInBuilder;
use crate::intrinsics::Intrinsics;

const CONSTANT: Attributes = Attributes::READONLY
    .union(Attributes::DONTENUM)
    .union(Attributes::PERMANENT);

/// Wrapper object around a number or boolean primitive.
pub struct PrimitiveObject {
    core: ObjectCore,
    value: Value,
}

impl PrimitiveObject {
    /// Wrap `value` in an object of class `class_name`.
    pub fn create(class_name: &str, value: Value, prototype: Option<ObjectRef>) -> ObjectRef {
        ObjectRef::new(Self {
            core: ObjectCore::new(class_name, prototype),
            value,
        })
    }

    /// The wrapped primitive
    pub fn primitive_value(&self) -> &Value {
        &self.value
    }
}

impl JsObject for PrimitiveObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The primitive behind `this` when it is a `kind` value or wrapper.
fn this_primitive(this: &Value, kind: &str, method: &str) -> VmResult<Value> {
    let unwrapped = match this {
        Value::Object(obj) => obj
            .downcast_ref::<PrimitiveObject>()
            .filter(|w| w.core.class_name() == kind)
            .map(|w| w.value.clone()),
        primitive if primitive.type_of().eq_ignore_ascii_case(kind) => Some(primitive.clone()),
        _ => None,
    };
    unwrapped.ok_or_else(|| {
        VmError::type_error(format!(
            "{kind}.prototype.{method} requires that 'this' be a {kind}"
        ))
    })
}

/// Install `Number` and return the constructor.
pub fn init_number(intrinsics: &Intrinsics, eager: bool) -> VmResult<ObjectRef> {
    BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.number_prototype,
        "Number",
    )
    .inherits(&intrinsics.object_prototype)
    .constructor_fn(
        |_this, args| match args.first() {
            None => Ok(Value::from(0)),
            Some(v) => Ok(Value::Number(to_number(v)?)),
        },
        1,
    )
    .static_property("MAX_VALUE", Value::Number(f64::MAX), CONSTANT)
    .static_property("MIN_VALUE", Value::Number(5e-324), CONSTANT)
    .static_property("NaN", Value::Number(f64::NAN), CONSTANT)
    .static_property("POSITIVE_INFINITY", Value::Number(f64::INFINITY), CONSTANT)
    .static_property("NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY), CONSTANT)
    .method(
        "toString",
        |this, _args| {
            let n = to_number(&this_primitive(this, "Number", "toString")?)?;
            Ok(Value::string(number_to_string(n)))
        },
        1,
    )
    .method(
        "valueOf",
        |this, _args| this_primitive(this, "Number", "valueOf"),
        0,
    )
    .eager(eager)
    .build()
}

/// Install `Boolean` and return the constructor.
pub fn init_boolean(intrinsics: &Intrinsics, eager: bool) -> VmResult<ObjectRef> {
    BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.boolean_prototype,
        "Boolean",
    )
    .inherits(&intrinsics.object_prototype)
    .constructor_fn(
        |_this, args| Ok(Value::Boolean(args.first().is_some_and(to_boolean))),
        1,
    )
    .method(
        "toString",
        |this, _args| {
            let b = to_boolean(&this_primitive(this, "Boolean", "toString")?);
            Ok(Value::string(if b { "true" } else { "false" }))
        },
        0,
    )
    .method(
        "valueOf",
        |this, _args| this_primitive(this, "Boolean", "valueOf"),
        0,
    )
    .eager(eager)
    .build()
}
