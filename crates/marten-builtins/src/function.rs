//! `Function` constructor and `Function.prototype` methods
//!
//! There is no compiler behind this object model, so `Function(...)` with
//! source text cannot produce a function and throws.

use marten_object::convert::to_string;
use marten_object::{NativeFunction, ObjectRef, PropertyKey, Value, VmError, VmResult, arg};

use crate::builtin_builder::BuiltInBuilder;
use crate::helpers::{length_of, require_callable};
use crate::intrinsics::Intrinsics;

/// CreateListFromArrayLike for `apply`
fn arguments_list(value: &Value) -> VmResult<Vec<Value>> {
    match value {
        Value::Undefined | Value::Null => Ok(Vec::new()),
        Value::Object(obj) => {
            let len = length_of(obj)?;
            (0..len)
                .map(|i| obj.get_value(&PropertyKey::Index(i)))
                .collect()
        }
        _ => Err(VmError::type_error(
            "CreateListFromArrayLike called on non-object",
        )),
    }
}

fn function_name(func: &ObjectRef) -> VmResult<String> {
    if let Some(native) = func.downcast_ref::<NativeFunction>() {
        return Ok(native.name().to_string());
    }
    match func.get_value(&PropertyKey::name("name"))? {
        Value::Undefined => Ok(String::new()),
        name => Ok(to_string(&name)?.to_string()),
    }
}

/// Install `Function` and return the constructor.
pub fn init(intrinsics: &Intrinsics, eager: bool) -> VmResult<ObjectRef> {
    BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.function_prototype,
        "Function",
    )
    .inherits(&intrinsics.object_prototype)
    .constructor_fn(
        |_this, _args| {
            Err(VmError::type_error(
                "Function constructor is not supported: no compiler is available",
            ))
        },
        1,
    )
    .method(
        "call",
        |this, args| {
            let func = require_callable(this, "Function.prototype.call")?;
            let rest = args.get(1..).unwrap_or_default();
            func.call(&arg(args, 0), rest)
        },
        1,
    )
    .method(
        "apply",
        |this, args| {
            let func = require_callable(this, "Function.prototype.apply")?;
            let list = arguments_list(&arg(args, 1))?;
            func.call(&arg(args, 0), &list)
        },
        2,
    )
    .method(
        "toString",
        |this, _args| {
            let func = require_callable(this, "Function.prototype.toString")?;
            Ok(Value::string(format!(
                "function {}() {{ [native code] }}",
                function_name(&func)?
            )))
        },
        0,
    )
    .eager(eager)
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use marten_object::OrdinaryObject;

    #[test]
    fn test_arguments_list() {
        assert!(arguments_list(&Value::Undefined).unwrap().is_empty());
        assert!(arguments_list(&Value::from(1)).is_err());

        let like = OrdinaryObject::create(None);
        like.put(&PropertyKey::name("length"), Value::from(2)).unwrap();
        like.put(&PropertyKey::Index(0), Value::from("a")).unwrap();
        assert_eq!(
            arguments_list(&Value::Object(like)).unwrap(),
            vec![Value::from("a"), Value::Undefined]
        );
    }
}
