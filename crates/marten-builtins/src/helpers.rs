//! Shared helpers for built-in method bodies

use marten_object::convert::{to_integer, to_number, to_uint32};
use marten_object::{ObjectRef, PropertyKey, Value, VmError, VmResult};

/// The `length` key
pub fn length_key() -> PropertyKey {
    PropertyKey::name("length")
}

/// Require an object argument, as the ES5 `Object.*` functions do.
pub fn require_object(value: &Value, method: &str) -> VmResult<ObjectRef> {
    match value {
        Value::Object(obj) => Ok(obj.clone()),
        _ => Err(VmError::type_error(format!("{method} called on non-object"))),
    }
}

/// Require a callable `this`.
pub fn require_callable(value: &Value, method: &str) -> VmResult<ObjectRef> {
    match value {
        Value::Object(obj) if obj.is_callable() => Ok(obj.clone()),
        _ => Err(VmError::type_error(format!("{method} called on non-function"))),
    }
}

/// `ToUint32(Get(obj, "length"))`
pub fn length_of(obj: &ObjectRef) -> VmResult<u32> {
    Ok(to_uint32(to_number(&obj.get_value(&length_key())?)?))
}

/// Resolve a relative index argument (`slice`, `indexOf`) against `len`:
/// negative values count from the end, the result is clamped to `0..=len`.
pub fn relative_index(value: &Value, len: u32, default: u32) -> VmResult<u32> {
    if value.is_undefined() {
        return Ok(default);
    }
    let n = to_integer(value)?;
    let len = len as f64;
    let resolved = if n < 0.0 { (len + n).max(0.0) } else { n.min(len) };
    Ok(resolved as u32)
}

/// Validate a value used as an array length.
pub fn array_length(value: &Value) -> VmResult<u32> {
    let n = to_number(value)?;
    let len = to_uint32(n);
    if len as f64 != n {
        return Err(VmError::range_error("Invalid array length"));
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_index() {
        assert_eq!(relative_index(&Value::Undefined, 5, 5).unwrap(), 5);
        assert_eq!(relative_index(&Value::from(-2), 5, 0).unwrap(), 3);
        assert_eq!(relative_index(&Value::from(-20), 5, 0).unwrap(), 0);
        assert_eq!(relative_index(&Value::from(9), 5, 0).unwrap(), 5);
        assert_eq!(relative_index(&Value::from(1.7), 5, 0).unwrap(), 1);
    }

    #[test]
    fn test_array_length_validation() {
        assert_eq!(array_length(&Value::from(3)).unwrap(), 3);
        assert_eq!(array_length(&Value::from("4")).unwrap(), 4);
        assert!(array_length(&Value::from(-1)).is_err());
        assert!(array_length(&Value::from(1.5)).is_err());
        assert!(array_length(&Value::Number(f64::NAN)).is_err());
    }
}
