//! JSON built-in
//!
//! - `JSON.parse(text, reviver?)` - parse JSON text into objects and arrays
//! - `JSON.stringify(value, replacer?, space?)` - serialize a value to JSON text
//!
//! Parsing goes through `serde_json` (with `preserve_order`, so object members
//! keep source order) and converts the tree into realm objects. Serializing
//! walks the object graph with the ES5 `Str`/`JO`/`JA` algorithm.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde_json::Value as JsonValue;

use marten_object::convert::{number_to_string, to_integer, to_number, to_string};
use marten_object::{ObjectRef, PropertyKey, Value, VmError, VmResult, arg};

use crate::array::ArrayObject;
use crate::builtin_builder::NamespaceBuilder;
use crate::helpers::length_of;
use crate::intrinsics::Intrinsics;
use crate::primitive::PrimitiveObject;
use crate::string::StringObject;

/// Maximum indent width taken from `space`
const MAX_GAP: usize = 10;

// =============================================================================
// Parse
// =============================================================================

fn json_to_value(intrinsics: &Intrinsics, json: &JsonValue) -> VmResult<Value> {
    Ok(match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Boolean(*b),
        JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        JsonValue::String(s) => Value::string(s.as_str()),
        JsonValue::Array(items) => {
            let elements = items
                .iter()
                .map(|item| json_to_value(intrinsics, item))
                .collect::<VmResult<Vec<_>>>()?;
            Value::Object(intrinsics.new_array(elements)?)
        }
        JsonValue::Object(members) => {
            let obj = intrinsics.new_object();
            for (name, member) in members {
                obj.put(
                    &PropertyKey::name(name.as_str()),
                    json_to_value(intrinsics, member)?,
                )?;
            }
            Value::Object(obj)
        }
    })
}

/// Walk(holder, key) from ES5 15.12.2
fn internalize(holder: &ObjectRef, key: &PropertyKey, reviver: &ObjectRef) -> VmResult<Value> {
    let value = holder.get_value(key)?;
    if let Value::Object(obj) = &value {
        let keys = if obj.downcast_ref::<ArrayObject>().is_some() {
            (0..length_of(obj)?).map(PropertyKey::Index).collect()
        } else {
            obj.get_ids(false)?
        };
        for child in keys {
            match internalize(obj, &child, reviver)? {
                Value::Undefined => {
                    obj.delete(&child)?;
                }
                revived => {
                    obj.put(&child, revived)?;
                }
            }
        }
    }
    reviver.call(&Value::Object(holder.clone()), &[key.to_value(), value])
}

/// `JSON.parse`
pub fn parse(intrinsics: &Intrinsics, text: &Value, reviver: &Value) -> VmResult<Value> {
    let text = to_string(text)?;
    let json: JsonValue = serde_json::from_str(&text)
        .map_err(|e| VmError::syntax_error(format!("JSON.parse: {e}")))?;
    let result = json_to_value(intrinsics, &json)?;

    match reviver {
        Value::Object(reviver) if reviver.is_callable() => {
            let root = intrinsics.new_object();
            let empty = PropertyKey::name("");
            root.put(&empty, result)?;
            internalize(&root, &empty, reviver)
        }
        _ => Ok(result),
    }
}

// =============================================================================
// Stringify
// =============================================================================

fn quote(s: &str) -> VmResult<String> {
    serde_json::to_string(s).map_err(|e| VmError::internal(format!("JSON quote: {e}")))
}

fn object_id(obj: &ObjectRef) -> usize {
    obj.inner() as *const _ as *const () as usize
}

struct Serializer<'a> {
    intrinsics: &'a Intrinsics,
    replacer_fn: Option<ObjectRef>,
    property_list: Option<Vec<PropertyKey>>,
    gap: String,
    indent: String,
    stack: FxHashSet<usize>,
}

impl Serializer<'_> {
    /// Str(key, holder); `None` when the value has no JSON form.
    fn property(&mut self, key: &PropertyKey, holder: &ObjectRef) -> VmResult<Option<String>> {
        let mut value = holder.get_value(key)?;

        if let Value::Object(obj) = &value {
            let to_json = obj.get_value(&PropertyKey::name("toJSON"))?;
            if let Value::Object(f) = &to_json
                && f.is_callable()
            {
                value = f.call(&value, &[key.to_value()])?;
            }
        }
        if let Some(replacer) = &self.replacer_fn {
            value = replacer.call(&Value::Object(holder.clone()), &[key.to_value(), value])?;
        }
        if let Value::Object(obj) = &value {
            if obj.downcast_ref::<StringObject>().is_some() {
                value = Value::String(to_string(&value)?);
            } else if let Some(wrapper) = obj.downcast_ref::<PrimitiveObject>() {
                value = match wrapper.primitive_value() {
                    Value::Number(_) => Value::Number(to_number(&value)?),
                    other => other.clone(),
                };
            }
        }

        Ok(match &value {
            Value::Null => Some("null".to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::String(s) => Some(quote(s)?),
            Value::Number(n) if n.is_finite() => Some(number_to_string(*n)),
            Value::Number(_) => Some("null".to_string()),
            Value::Object(obj) if !obj.is_callable() => {
                if obj.downcast_ref::<ArrayObject>().is_some() {
                    Some(self.array(obj)?)
                } else {
                    Some(self.object(obj)?)
                }
            }
            _ => None,
        })
    }

    fn enter(&mut self, obj: &ObjectRef) -> VmResult<String> {
        if !self.stack.insert(object_id(obj)) {
            return Err(VmError::type_error("Converting circular structure to JSON"));
        }
        let stepback = self.indent.clone();
        self.indent.push_str(&self.gap);
        Ok(stepback)
    }

    fn leave(&mut self, obj: &ObjectRef, stepback: String) {
        self.stack.remove(&object_id(obj));
        self.indent = stepback;
    }

    fn wrap(&self, open: char, close: char, partial: &[String], stepback: &str) -> String {
        if partial.is_empty() {
            format!("{open}{close}")
        } else if self.gap.is_empty() {
            format!("{open}{}{close}", partial.join(","))
        } else {
            let separator = format!(",\n{}", self.indent);
            format!(
                "{open}\n{}{}\n{stepback}{close}",
                self.indent,
                partial.join(&separator)
            )
        }
    }

    /// JO(value)
    fn object(&mut self, obj: &ObjectRef) -> VmResult<String> {
        let stepback = self.enter(obj)?;
        let keys = match &self.property_list {
            Some(list) => list.clone(),
            None => obj.get_ids(false)?,
        };
        let colon = if self.gap.is_empty() { ":" } else { ": " };
        let mut partial = Vec::with_capacity(keys.len());
        for key in &keys {
            if let Some(member) = self.property(key, obj)? {
                partial.push(format!("{}{colon}{member}", quote(&key.to_string())?));
            }
        }
        let out = self.wrap('{', '}', &partial, &stepback);
        self.leave(obj, stepback);
        Ok(out)
    }

    /// JA(value)
    fn array(&mut self, obj: &ObjectRef) -> VmResult<String> {
        let stepback = self.enter(obj)?;
        let len = length_of(obj)?;
        let mut partial = Vec::with_capacity(len as usize);
        for i in 0..len {
            let element = self.property(&PropertyKey::Index(i), obj)?;
            partial.push(element.unwrap_or_else(|| "null".to_string()));
        }
        let out = self.wrap('[', ']', &partial, &stepback);
        self.leave(obj, stepback);
        Ok(out)
    }
}

/// Property names from an array replacer: strings and numbers (or their
/// wrappers), first occurrence wins.
fn property_list(list: &ObjectRef) -> VmResult<Vec<PropertyKey>> {
    let mut keys: Vec<PropertyKey> = Vec::new();
    for i in 0..length_of(list)? {
        let item = list.get_value(&PropertyKey::Index(i))?;
        let name = match &item {
            Value::String(s) => Some(s.clone()),
            Value::Number(_) => Some(to_string(&item)?),
            Value::Object(obj)
                if obj.downcast_ref::<StringObject>().is_some()
                    || obj.downcast_ref::<PrimitiveObject>().is_some_and(|w| {
                        matches!(w.primitive_value(), Value::Number(_))
                    }) =>
            {
                Some(to_string(&item)?)
            }
            _ => None,
        };
        if let Some(name) = name {
            let key = PropertyKey::name(name);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    Ok(keys)
}

/// Indent string from `space`: a number of spaces or a string prefix, at
/// most ten characters either way.
fn gap_from(space: &Value) -> VmResult<String> {
    let space = match space {
        Value::Object(obj) if obj.downcast_ref::<StringObject>().is_some() => {
            Value::String(to_string(space)?)
        }
        Value::Object(obj) if obj.downcast_ref::<PrimitiveObject>().is_some() => {
            Value::Number(to_number(space)?)
        }
        other => other.clone(),
    };
    Ok(match &space {
        Value::Number(_) => {
            let n = to_integer(&space)?.clamp(0.0, MAX_GAP as f64) as usize;
            " ".repeat(n)
        }
        Value::String(s) => s.chars().take(MAX_GAP).collect(),
        _ => String::new(),
    })
}

/// `JSON.stringify`; `Undefined` when the value has no JSON form.
pub fn stringify(
    intrinsics: &Intrinsics,
    value: &Value,
    replacer: &Value,
    space: &Value,
) -> VmResult<Value> {
    let (replacer_fn, property_list) = match replacer {
        Value::Object(f) if f.is_callable() => (Some(f.clone()), None),
        Value::Object(list) if list.downcast_ref::<ArrayObject>().is_some() => {
            (None, Some(property_list(list)?))
        }
        _ => (None, None),
    };

    let mut serializer = Serializer {
        intrinsics,
        replacer_fn,
        property_list,
        gap: gap_from(space)?,
        indent: String::new(),
        stack: FxHashSet::default(),
    };

    let wrapper = serializer.intrinsics.new_object();
    let empty = PropertyKey::name("");
    wrapper.put(&empty, value.clone())?;
    Ok(match serializer.property(&empty, &wrapper)? {
        Some(text) => Value::String(Arc::from(text)),
        None => Value::Undefined,
    })
}

/// Populate the `JSON` namespace.
pub fn init(intrinsics: &Intrinsics, eager: bool) -> VmResult<ObjectRef> {
    let parse_intrinsics = intrinsics.clone();
    let stringify_intrinsics = intrinsics.clone();
    NamespaceBuilder::new(&intrinsics.function_prototype, &intrinsics.json, "JSON")
        .method(
            "parse",
            move |_this, args| parse(&parse_intrinsics, &arg(args, 0), &arg(args, 1)),
            2,
        )
        .method(
            "stringify",
            move |_this, args| {
                stringify(
                    &stringify_intrinsics,
                    &arg(args, 0),
                    &arg(args, 1),
                    &arg(args, 2),
                )
            },
            3,
        )
        .eager(eager)
        .build()
}
