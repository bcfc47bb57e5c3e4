//! Global object population (bootstrap stage 3)
//!
//! Runs every built-in module's builder over the realm's intrinsics and binds
//! the resulting constructors and namespaces on the global object.

use marten_object::convert::to_number;
use marten_object::{Attributes, NativeFunction, ObjectRef, Value, VmResult, arg};

use crate::intrinsics::Intrinsics;
use crate::{array, function, json, math, object, primitive, string};

/// `NaN`, `Infinity`, `undefined`
const GLOBAL_CONSTANT: Attributes = Attributes::READONLY
    .union(Attributes::DONTENUM)
    .union(Attributes::PERMANENT);

/// Install every standard binding on `global`.
pub fn install(global: &ObjectRef, intrinsics: &Intrinsics, eager: bool) -> VmResult<()> {
    let bindings = [
        ("Object", object::init(intrinsics, eager)?),
        ("Function", function::init(intrinsics, eager)?),
        ("Array", array::init(intrinsics, eager)?),
        ("String", string::init(intrinsics, eager)?),
        ("Number", primitive::init_number(intrinsics, eager)?),
        ("Boolean", primitive::init_boolean(intrinsics, eager)?),
        ("Math", math::init(intrinsics, eager)?),
        ("JSON", json::init(intrinsics, eager)?),
    ];
    for (name, value) in bindings {
        global.define_value(name, Value::Object(value), Attributes::DONTENUM)?;
    }

    global.define_value("NaN", Value::Number(f64::NAN), GLOBAL_CONSTANT)?;
    global.define_value("Infinity", Value::Number(f64::INFINITY), GLOBAL_CONSTANT)?;
    global.define_value("undefined", Value::Undefined, GLOBAL_CONSTANT)?;

    let fn_proto = Some(intrinsics.function_prototype.clone());
    let is_nan = NativeFunction::from_fn("isNaN", 1, fn_proto.clone(), |_this, args| {
        Ok(Value::Boolean(to_number(&arg(args, 0))?.is_nan()))
    })?;
    let is_finite = NativeFunction::from_fn("isFinite", 1, fn_proto, |_this, args| {
        Ok(Value::Boolean(to_number(&arg(args, 0))?.is_finite()))
    })?;
    global.define_value("isNaN", Value::Object(is_nan), Attributes::DONTENUM)?;
    global.define_value("isFinite", Value::Object(is_finite), Attributes::DONTENUM)?;

    tracing::debug!(target: "marten::realm", "global object populated");
    Ok(())
}
