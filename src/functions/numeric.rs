use rust_decimal::{Decimal, RoundingStrategy};

use super::{Args, Arity, Category, FunctionRegistry};
use crate::{error::EvalError, value::Value};

/// Fractional digits kept by division.
pub const DIVISION_SCALE: u32 = 10;

fn overflow(op: &str) -> EvalError {
    EvalError::Range(format!("{} overflows the decimal range", op))
}

pub(crate) fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal, EvalError> {
    a.checked_add(b).ok_or_else(|| overflow("addition"))
}

pub(crate) fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal, EvalError> {
    a.checked_sub(b).ok_or_else(|| overflow("subtraction"))
}

pub(crate) fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal, EvalError> {
    a.checked_mul(b).ok_or_else(|| overflow("multiplication"))
}

/// `a / b` rounded half-up to [`DIVISION_SCALE`] fractional digits.
pub(crate) fn divide(a: Decimal, b: Decimal) -> Result<Decimal, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivideByZero);
    }
    let quotient = a.checked_div(b).ok_or_else(|| overflow("division"))?;
    Ok(quotient.round_dp_with_strategy(DIVISION_SCALE, RoundingStrategy::MidpointAwayFromZero))
}

/// Floored modulus: the result takes the sign of `b`.
pub(crate) fn floored_mod(a: Decimal, b: Decimal) -> Result<Decimal, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivideByZero);
    }
    let r = a.checked_rem(b).ok_or_else(|| overflow("modulus"))?;
    if !r.is_zero() && r.is_sign_negative() != b.is_sign_negative() {
        checked_add(r, b)
    } else {
        Ok(r)
    }
}

/// Left fold of a binary operation over every argument as a number.
fn fold(
    args: &Args<'_>,
    op: fn(Decimal, Decimal) -> Result<Decimal, EvalError>,
) -> Result<Value, EvalError> {
    let mut acc = args.number(0)?;
    for i in 1..args.len() {
        acc = op(acc, args.number(i)?)?;
    }
    Ok(Value::Numeric(acc))
}

fn integer_operand(args: &Args<'_>, index: usize) -> Result<Decimal, EvalError> {
    let n = args.number(index)?;
    if !n.fract().is_zero() {
        return Err(EvalError::Type(format!(
            "'{}' expects integer operands, argument {} is {}",
            args.function(),
            index + 1,
            n.normalize()
        )));
    }
    Ok(n)
}

pub(super) fn register(registry: &mut FunctionRegistry) {
    let n = Category::Numeric;

    registry.add("Add", Arity::AtLeast(2), n, |_, args| fold(args, checked_add));
    registry.add("Subtract", Arity::AtLeast(2), n, |_, args| fold(args, checked_sub));
    registry.add("Multiply", Arity::AtLeast(2), n, |_, args| fold(args, checked_mul));
    registry.add("Divide", Arity::AtLeast(2), n, |_, args| fold(args, divide));
    registry.add("Mod", Arity::AtLeast(2), n, |_, args| {
        let mut acc = integer_operand(args, 0)?;
        for i in 1..args.len() {
            acc = floored_mod(acc, integer_operand(args, i)?)?;
        }
        Ok(Value::Numeric(acc))
    });
    registry.add("Abs", Arity::Exact(1), n, |_, args| {
        Ok(Value::Numeric(args.number(0)?.abs()))
    });
    registry.add("Floor", Arity::Exact(1), n, |_, args| {
        Ok(Value::Numeric(args.number(0)?.floor()))
    });
    registry.add("Ceil", Arity::Exact(1), n, |_, args| {
        Ok(Value::Numeric(args.number(0)?.ceil()))
    });
    registry.add("Round", Arity::Range(1, 2), n, |_, args| {
        let x = args.number(0)?;
        if args.len() == 1 {
            return Ok(Value::Numeric(x));
        }
        let scale = args.index(1)?;
        if scale < 0 {
            return Err(EvalError::Range(format!(
                "'Round' scale must not be negative, got {}",
                scale
            )));
        }
        let scale = u32::try_from(scale).unwrap_or(u32::MAX);
        Ok(Value::Numeric(
            x.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero),
        ))
    });
}

#[test]
fn test_floored_mod_signs() {
    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }
    assert_eq!(floored_mod(d(7), d(3)).unwrap(), d(1));
    assert_eq!(floored_mod(d(-7), d(3)).unwrap(), d(2));
    assert_eq!(floored_mod(d(7), d(-3)).unwrap(), d(-2));
    assert_eq!(floored_mod(d(-7), d(-3)).unwrap(), d(-1));
    assert_eq!(floored_mod(d(1), d(0)), Err(EvalError::DivideByZero));
}

#[test]
fn test_divide_scale() {
    let q = divide(Decimal::from(2), Decimal::from(3)).unwrap();
    assert_eq!(q.to_string(), "0.6666666667");
}
