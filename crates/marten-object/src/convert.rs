//! Type conversions (ToBoolean, ToNumber, ToString, ToPrimitive).
//!
//! Number formatting is simple: integral values within the safe
//! integer range print through `itoa`, everything else through `ryu`.

use std::sync::Arc;

use crate::error::VmResult;
use crate::value::{PreferredType, Value};

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// ToBoolean
pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => !(*n == 0.0 || n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Object(_) => true,
    }
}

/// ToPrimitive. Objects are coerced through their `GetDefaultValue` hook.
pub fn to_primitive(value: &Value, hint: Option<PreferredType>) -> VmResult<Value> {
    match value {
        Value::Object(obj) => obj.default_value(hint),
        other => Ok(other.clone()),
    }
}

/// ToNumber
pub fn to_number(value: &Value) -> VmResult<f64> {
    Ok(match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(s),
        Value::Object(_) => return to_number(&to_primitive(value, Some(PreferredType::Number))?),
    })
}

/// ToString
pub fn to_string(value: &Value) -> VmResult<Arc<str>> {
    Ok(match value {
        Value::Undefined => Arc::from("undefined"),
        Value::Null => Arc::from("null"),
        Value::Boolean(true) => Arc::from("true"),
        Value::Boolean(false) => Arc::from("false"),
        Value::Number(n) => Arc::from(number_to_string(*n)),
        Value::String(s) => s.clone(),
        Value::Object(_) => return to_string(&to_primitive(value, Some(PreferredType::String))?),
    })
}

/// ToInteger (truncation toward zero, NaN becomes 0)
pub fn to_integer(value: &Value) -> VmResult<f64> {
    let n = to_number(value)?;
    Ok(if n.is_nan() {
        0.0
    } else if n.is_infinite() {
        n
    } else {
        n.trunc()
    })
}

/// ToUint32 on an already-converted number
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    let modulo = n.trunc().rem_euclid(4_294_967_296.0);
    modulo as u32
}

/// ToInt32 on an already-converted number
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// Number to string conversion.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        let mut buf = itoa::Buffer::new();
        return buf.format(n as i64).to_string();
    }
    let mut buf = ryu::Buffer::new();
    let formatted = buf.format_finite(n);
    formatted.strip_suffix(".0").unwrap_or(formatted).to_string()
}

/// String to number conversion (StringNumericLiteral, decimal and hex).
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    // Rust accepts spellings ("inf", "nan") that script does not.
    if trimmed
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(5.0), "5");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1F"), 31.0);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("12px").is_nan());
    }

    #[test]
    fn test_to_uint32_wraps() {
        assert_eq!(to_uint32(-1.0), u32::MAX);
        assert_eq!(to_uint32(4_294_967_296.0), 0);
        assert_eq!(to_int32(4_294_967_295.0), -1);
    }

    #[test]
    fn test_to_boolean() {
        assert!(!to_boolean(&Value::Number(f64::NAN)));
        assert!(to_boolean(&Value::from("0")));
        assert!(!to_boolean(&Value::from("")));
    }
}
