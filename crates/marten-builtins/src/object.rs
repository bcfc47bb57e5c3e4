//! `Object` constructor statics and `Object.prototype` methods (ES5)
//!
//! ## Constructor statics:
//! - getPrototypeOf, keys, getOwnPropertyNames, getOwnPropertyDescriptor,
//!   defineProperty, defineProperties, create, seal, freeze,
//!   preventExtensions, isSealed, isFrozen, isExtensible
//!
//! ## Prototype methods:
//! - toString, toLocaleString, valueOf, hasOwnProperty,
//!   propertyIsEnumerable, isPrototypeOf

use marten_object::{
    ObjectRef, OrdinaryObject, PropertyDescriptor, PropertyKey, Value, VmError, VmResult, arg,
};

use crate::builtin_builder::BuiltInBuilder;
use crate::helpers::{require_callable, require_object};
use crate::intrinsics::Intrinsics;

/// `[object Class]` for any value
fn class_tag(intrinsics: &Intrinsics, this: &Value) -> VmResult<String> {
    Ok(match this {
        Value::Undefined => "[object Undefined]".to_string(),
        Value::Null => "[object Null]".to_string(),
        other => format!("[object {}]", intrinsics.to_object(other)?.class_name()),
    })
}

fn keys_array(intrinsics: &Intrinsics, keys: Vec<PropertyKey>) -> VmResult<Value> {
    let names = keys.iter().map(PropertyKey::to_value).collect();
    Ok(Value::Object(intrinsics.new_array(names)?))
}

/// ObjectDefineProperties: read every descriptor first, then define.
fn define_properties(
    intrinsics: &Intrinsics,
    target: &ObjectRef,
    properties: &Value,
) -> VmResult<()> {
    let props = intrinsics.to_object(properties)?;
    let mut descriptors = Vec::new();
    for key in props.get_ids(false)? {
        let desc = PropertyDescriptor::from_object(&props.get_value(&key)?)?;
        descriptors.push((key, desc));
    }
    for (key, desc) in &descriptors {
        target.define_own_property(key, desc)?;
    }
    Ok(())
}

/// Install `Object` and return the constructor.
pub fn init(intrinsics: &Intrinsics, eager: bool) -> VmResult<ObjectRef> {
    let ctor_intrinsics = intrinsics.clone();
    let keys_intrinsics = intrinsics.clone();
    let names_intrinsics = intrinsics.clone();
    let descriptor_intrinsics = intrinsics.clone();
    let define_intrinsics = intrinsics.clone();
    let create_intrinsics = intrinsics.clone();
    let to_string_intrinsics = intrinsics.clone();
    let to_locale_intrinsics = intrinsics.clone();
    let value_of_intrinsics = intrinsics.clone();
    let has_own_intrinsics = intrinsics.clone();
    let enumerable_intrinsics = intrinsics.clone();

    BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.object_prototype,
        "Object",
    )
    .constructor_fn(
        move |_this, args| match args.first() {
            None | Some(Value::Undefined) | Some(Value::Null) => {
                Ok(Value::Object(ctor_intrinsics.new_object()))
            }
            Some(value) => Ok(Value::Object(ctor_intrinsics.to_object(value)?)),
        },
        1,
    )
    // ====================================================================
    // Statics
    // ====================================================================
    .static_method(
        "getPrototypeOf",
        |_this, args| {
            let obj = require_object(&arg(args, 0), "Object.getPrototypeOf")?;
            Ok(obj.prototype().map(Value::Object).unwrap_or(Value::Null))
        },
        1,
    )
    .static_method(
        "keys",
        move |_this, args| {
            let obj = require_object(&arg(args, 0), "Object.keys")?;
            keys_array(&keys_intrinsics, obj.get_ids(false)?)
        },
        1,
    )
    .static_method(
        "getOwnPropertyNames",
        move |_this, args| {
            let obj = require_object(&arg(args, 0), "Object.getOwnPropertyNames")?;
            keys_array(&names_intrinsics, obj.get_ids(true)?)
        },
        1,
    )
    .static_method(
        "getOwnPropertyDescriptor",
        move |_this, args| {
            let obj = require_object(&arg(args, 0), "Object.getOwnPropertyDescriptor")?;
            let key = PropertyKey::from_value(&arg(args, 1))?;
            let Some(desc) = obj.get_own_property(&key)? else {
                return Ok(Value::Undefined);
            };
            let result = descriptor_intrinsics.new_object();
            desc.fill_object(&result)?;
            Ok(Value::Object(result))
        },
        2,
    )
    .static_method(
        "defineProperty",
        |_this, args| {
            let obj = require_object(&arg(args, 0), "Object.defineProperty")?;
            let key = PropertyKey::from_value(&arg(args, 1))?;
            let desc = PropertyDescriptor::from_object(&arg(args, 2))?;
            obj.define_own_property(&key, &desc)?;
            Ok(Value::Object(obj))
        },
        3,
    )
    .static_method(
        "defineProperties",
        move |_this, args| {
            let obj = require_object(&arg(args, 0), "Object.defineProperties")?;
            define_properties(&define_intrinsics, &obj, &arg(args, 1))?;
            Ok(Value::Object(obj))
        },
        2,
    )
    .static_method(
        "create",
        move |_this, args| {
            let proto = match arg(args, 0) {
                Value::Object(p) => Some(p),
                Value::Null => None,
                other => {
                    return Err(VmError::type_error(format!(
                        "Object prototype may only be an Object or null: {}",
                        marten_object::convert::to_string(&other)?
                    )));
                }
            };
            let obj = OrdinaryObject::create(proto);
            let properties = arg(args, 1);
            if !properties.is_undefined() {
                define_properties(&create_intrinsics, &obj, &properties)?;
            }
            Ok(Value::Object(obj))
        },
        2,
    )
    .static_method(
        "seal",
        |_this, args| {
            let obj = require_object(&arg(args, 0), "Object.seal")?;
            obj.seal()?;
            Ok(Value::Object(obj))
        },
        1,
    )
    .static_method(
        "freeze",
        |_this, args| {
            let obj = require_object(&arg(args, 0), "Object.freeze")?;
            obj.freeze()?;
            Ok(Value::Object(obj))
        },
        1,
    )
    .static_method(
        "preventExtensions",
        |_this, args| {
            let obj = require_object(&arg(args, 0), "Object.preventExtensions")?;
            obj.prevent_extensions();
            Ok(Value::Object(obj))
        },
        1,
    )
    .static_method(
        "isSealed",
        |_this, args| {
            let obj = require_object(&arg(args, 0), "Object.isSealed")?;
            Ok(Value::Boolean(obj.is_sealed()?))
        },
        1,
    )
    .static_method(
        "isFrozen",
        |_this, args| {
            let obj = require_object(&arg(args, 0), "Object.isFrozen")?;
            Ok(Value::Boolean(obj.is_frozen()?))
        },
        1,
    )
    .static_method(
        "isExtensible",
        |_this, args| {
            let obj = require_object(&arg(args, 0), "Object.isExtensible")?;
            Ok(Value::Boolean(obj.is_extensible()))
        },
        1,
    )
    // ====================================================================
    // Prototype
    // ====================================================================
    .method(
        "toString",
        move |this, _args| Ok(Value::string(class_tag(&to_string_intrinsics, this)?)),
        0,
    )
    .method(
        "toLocaleString",
        move |this, _args| {
            let obj = to_locale_intrinsics.to_object(this)?;
            let to_string = obj.get_value(&PropertyKey::name("toString"))?;
            require_callable(&to_string, "toLocaleString")?.call(this, &[])
        },
        0,
    )
    .method(
        "valueOf",
        move |this, _args| Ok(Value::Object(value_of_intrinsics.to_object(this)?)),
        0,
    )
    .method(
        "hasOwnProperty",
        move |this, args| {
            let key = PropertyKey::from_value(&arg(args, 0))?;
            let obj = has_own_intrinsics.to_object(this)?;
            Ok(Value::Boolean(obj.has_own(&key)))
        },
        1,
    )
    .method(
        "propertyIsEnumerable",
        move |this, args| {
            let key = PropertyKey::from_value(&arg(args, 0))?;
            let obj = enumerable_intrinsics.to_object(this)?;
            let enumerable = obj
                .get_own_property(&key)?
                .is_some_and(|d| d.enumerable == Some(true));
            Ok(Value::Boolean(enumerable))
        },
        1,
    )
    .method(
        "isPrototypeOf",
        |this, args| {
            let Value::Object(target) = arg(args, 0) else {
                return Ok(Value::Boolean(false));
            };
            let Value::Object(this_obj) = this else {
                return Err(VmError::type_error(
                    "Object.prototype.isPrototypeOf called on non-object",
                ));
            };
            let mut cursor = target.prototype();
            while let Some(proto) = cursor {
                if proto.ptr_eq(this_obj) {
                    return Ok(Value::Boolean(true));
                }
                cursor = proto.prototype();
            }
            Ok(Value::Boolean(false))
        },
        1,
    )
    .eager(eager)
    .build()
}
