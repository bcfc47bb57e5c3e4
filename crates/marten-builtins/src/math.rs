//! Math namespace
//!
//! - 8 constants (E, LN10, LN2, LOG10E, LOG2E, PI, SQRT1_2, SQRT2)
//! - abs, ceil, floor, max, min, pow, round, sqrt, sin, cos, exp, log, atan2

use marten_object::convert::to_number;
use marten_object::{Attributes, ObjectRef, Value, VmResult};

use crate::builtin_builder::NamespaceBuilder;
use crate::intrinsics::Intrinsics;

const CONSTANT: Attributes = Attributes::READONLY
    .union(Attributes::DONTENUM)
    .union(Attributes::PERMANENT);

fn num(args: &[Value], i: usize) -> VmResult<f64> {
    match args.get(i) {
        Some(v) => to_number(v),
        None => Ok(f64::NAN),
    }
}

fn unary(f: fn(f64) -> f64) -> impl Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync {
    move |_this: &Value, args: &[Value]| Ok(Value::Number(f(num(args, 0)?)))
}

fn round(x: f64) -> f64 {
    if x.is_nan() || x.is_infinite() || x == 0.0 {
        return x;
    }
    // [-0.5, 0) rounds to -0
    if (-0.5..0.0).contains(&x) {
        return -0.0;
    }
    let f = x.floor();
    if x - f >= 0.5 { f + 1.0 } else { f }
}

/// ES5 15.8.2.13: NaN for `(±1) ** ±Infinity`, unlike `f64::powf`
fn pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

fn max(args: &[Value]) -> VmResult<f64> {
    let mut result = f64::NEG_INFINITY;
    for i in 0..args.len() {
        let n = num(args, i)?;
        if n.is_nan() {
            result = f64::NAN;
        } else if !result.is_nan()
            && (n > result || (n == 0.0 && result == 0.0 && result.is_sign_negative()))
        {
            result = n;
        }
    }
    Ok(result)
}

fn min(args: &[Value]) -> VmResult<f64> {
    let mut result = f64::INFINITY;
    for i in 0..args.len() {
        let n = num(args, i)?;
        if n.is_nan() {
            result = f64::NAN;
        } else if !result.is_nan()
            && (n < result || (n == 0.0 && result == 0.0 && n.is_sign_negative()))
        {
            result = n;
        }
    }
    Ok(result)
}

/// Populate the `Math` namespace.
pub fn init(intrinsics: &Intrinsics, eager: bool) -> VmResult<ObjectRef> {
    NamespaceBuilder::new(&intrinsics.function_prototype, &intrinsics.math, "Math")
        .property("E", Value::Number(std::f64::consts::E), CONSTANT)
        .property("LN10", Value::Number(std::f64::consts::LN_10), CONSTANT)
        .property("LN2", Value::Number(std::f64::consts::LN_2), CONSTANT)
        .property("LOG10E", Value::Number(std::f64::consts::LOG10_E), CONSTANT)
        .property("LOG2E", Value::Number(std::f64::consts::LOG2_E), CONSTANT)
        .property("PI", Value::Number(std::f64::consts::PI), CONSTANT)
        .property("SQRT1_2", Value::Number(std::f64::consts::FRAC_1_SQRT_2), CONSTANT)
        .property("SQRT2", Value::Number(std::f64::consts::SQRT_2), CONSTANT)
        .method("abs", unary(f64::abs), 1)
        .method("ceil", unary(f64::ceil), 1)
        .method("floor", unary(f64::floor), 1)
        .method("round", unary(round), 1)
        .method("sqrt", unary(f64::sqrt), 1)
        .method("sin", unary(f64::sin), 1)
        .method("cos", unary(f64::cos), 1)
        .method("exp", unary(f64::exp), 1)
        .method("log", unary(f64::ln), 1)
        .method(
            "pow",
            |_this, args| Ok(Value::Number(pow(num(args, 0)?, num(args, 1)?))),
            2,
        )
        .method(
            "atan2",
            |_this, args| Ok(Value::Number(num(args, 0)?.atan2(num(args, 1)?))),
            2,
        )
        .method("max", |_this, args| Ok(Value::Number(max(args)?)), 2)
        .method("min", |_this, args| Ok(Value::Number(min(args)?)), 2)
        .eager(eager)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert!(round(-0.2).is_sign_negative());
        assert_eq!(round(0.49999999999999994), 0.0);
    }

    #[test]
    fn test_max_min_edge_cases() {
        assert_eq!(max(&[]).unwrap(), f64::NEG_INFINITY);
        assert_eq!(min(&[]).unwrap(), f64::INFINITY);
        assert!(max(&[Value::from(1), Value::Number(f64::NAN)]).unwrap().is_nan());
        let m = max(&[Value::Number(-0.0), Value::Number(0.0)]).unwrap();
        assert!(m == 0.0 && m.is_sign_positive());
        let m = min(&[Value::Number(0.0), Value::Number(-0.0)]).unwrap();
        assert!(m == 0.0 && m.is_sign_negative());
    }

    #[test]
    fn test_pow_unit_base_with_infinite_exponent() {
        assert!(pow(1.0, f64::INFINITY).is_nan());
        assert_eq!(pow(2.0, 10.0), 1024.0);
        assert_eq!(pow(f64::NAN, 0.0), 1.0);
    }
}
