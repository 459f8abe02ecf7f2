//! Operators with Python semantics: numeric tower, sequence arithmetic,
//! rich comparison and membership.

use crate::python::ast::{BinOp, CmpOp, UnaryOp};
use crate::sandbox::budget::Budget;
use crate::sandbox::fault::Fault;
use crate::sandbox::format::percent_format;
use crate::sandbox::value::{
    raise, type_error, unhashable, value_error, EvalResult, Table, Value,
};
use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::rc::Rc;

const MAX_COMPARE_DEPTH: usize = 64;

enum Num {
    Int(BigInt),
    Float(f64),
}

fn numeric(value: &Value<'_>) -> Option<Num> {
    match value {
        Value::Bool(b) => Some(Num::Int(BigInt::from(*b as u8))),
        Value::Int(n) => Some(Num::Int(n.clone())),
        Value::Float(f) => Some(Num::Float(*f)),
        _ => None,
    }
}

/// Convert an `int` to `float`, raising `OverflowError` when it does not fit.
pub fn int_to_f64<'a>(n: &BigInt) -> EvalResult<'a, f64> {
    match n.to_f64() {
        Some(f) if f.is_finite() => Ok(f),
        _ => raise("OverflowError", "int too large to convert to float"),
    }
}

/// `float(value)` for numeric values.
pub fn to_f64<'a>(value: &Value<'a>) -> EvalResult<'a, f64> {
    match numeric(value) {
        Some(Num::Int(n)) => int_to_f64(&n),
        Some(Num::Float(f)) => Ok(f),
        None => type_error(format!(
            "must be real number, not {}",
            value.type_name()
        )),
    }
}

fn unsupported<'a, T>(op: &str, left: &Value<'a>, right: &Value<'a>) -> EvalResult<'a, T> {
    type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        left.type_name(),
        right.type_name()
    ))
}

pub fn binary<'a>(
    budget: &Budget,
    op: BinOp,
    left: &Value<'a>,
    right: &Value<'a>,
) -> EvalResult<'a, Value<'a>> {
    if let (Value::Bool(a), Value::Bool(b)) = (left, right) {
        match op {
            BinOp::BitAnd => return Ok(Value::Bool(a & b)),
            BinOp::BitOr => return Ok(Value::Bool(a | b)),
            BinOp::BitXor => return Ok(Value::Bool(a ^ b)),
            _ => {}
        }
    }
    match (numeric(left), numeric(right)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => return int_binary(budget, op, a, b),
        (Some(a), Some(b)) => {
            if matches!(
                op,
                BinOp::LShift | BinOp::RShift | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::MatMult
            ) {
                return unsupported(op.symbol(), left, right);
            }
            let a = match a {
                Num::Int(n) => int_to_f64(&n)?,
                Num::Float(f) => f,
            };
            let b = match b {
                Num::Int(n) => int_to_f64(&n)?,
                Num::Float(f) => f,
            };
            return float_binary(op, a, b);
        }
        _ => {}
    }
    match op {
        BinOp::Add => concat(budget, left, right),
        BinOp::Mult => {
            let (seq, count) = if is_sequence(left) {
                (left, right)
            } else {
                (right, left)
            };
            match count.as_int() {
                Some(n) if is_sequence(seq) => repeat(budget, seq, &n),
                _ => unsupported("*", left, right),
            }
        }
        BinOp::Mod => match left {
            Value::Str(template) => Ok(Value::str(percent_format(budget, template, right)?)),
            _ => unsupported("%", left, right),
        },
        BinOp::BitOr | BinOp::BitAnd | BinOp::Sub | BinOp::BitXor => set_binary(op, left, right),
        _ => unsupported(op.symbol(), left, right),
    }
}

fn is_sequence(value: &Value<'_>) -> bool {
    matches!(
        value,
        Value::Str(_) | Value::Bytes(_) | Value::ByteArray(_) | Value::List(_) | Value::Tuple(_)
    )
}

fn int_binary<'a>(budget: &Budget, op: BinOp, a: BigInt, b: BigInt) -> EvalResult<'a, Value<'a>> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mult => {
            budget.check_bits(a.bits() + b.bits())?;
            a * b
        }
        BinOp::Div => {
            if b.is_zero() {
                return raise("ZeroDivisionError", "division by zero");
            }
            return int_true_div(&a, &b);
        }
        BinOp::FloorDiv => {
            if b.is_zero() {
                return raise("ZeroDivisionError", "integer division or modulo by zero");
            }
            a.div_floor(&b)
        }
        BinOp::Mod => {
            if b.is_zero() {
                return raise("ZeroDivisionError", "integer modulo by zero");
            }
            a.mod_floor(&b)
        }
        BinOp::Pow => return int_pow(budget, a, b),
        BinOp::LShift => {
            if b.is_negative() {
                return value_error("negative shift count");
            }
            if a.is_zero() {
                return Ok(Value::Int(a));
            }
            let shift = b.to_u64().unwrap_or(u64::MAX);
            budget.check_bits(a.bits().saturating_add(shift))?;
            a << (shift as usize)
        }
        BinOp::RShift => {
            if b.is_negative() {
                return value_error("negative shift count");
            }
            let shift = b.to_u64().unwrap_or(u64::MAX).min(a.bits() + 1);
            a >> (shift as usize)
        }
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::MatMult => {
            return type_error("unsupported operand type(s) for @: 'int' and 'int'");
        }
    };
    budget.check_int(&result)?;
    Ok(Value::Int(result))
}

fn int_true_div<'a>(a: &BigInt, b: &BigInt) -> EvalResult<'a, Value<'a>> {
    match (a.to_f64(), b.to_f64()) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok(Value::Float(x / y)),
        _ => raise("OverflowError", "integer division result too large for a float"),
    }
}

fn int_pow<'a>(budget: &Budget, base: BigInt, exp: BigInt) -> EvalResult<'a, Value<'a>> {
    if exp.is_negative() {
        if base.is_zero() {
            return raise("ZeroDivisionError", "0.0 cannot be raised to a negative power");
        }
        return float_binary(BinOp::Pow, int_to_f64(&base)?, int_to_f64(&exp)?);
    }
    if base.is_zero() || base.is_one() {
        return Ok(Value::Int(if exp.is_zero() { BigInt::one() } else { base }));
    }
    if base == BigInt::from(-1) {
        return Ok(Value::Int(if exp.is_even() { BigInt::one() } else { base }));
    }
    let exp = match exp.to_u32() {
        Some(e) => e,
        None => return Err(Fault::IntegerLimit(budget.limits().max_int_bits).into()),
    };
    let estimate = (base.bits().saturating_sub(1)).saturating_mul(u64::from(exp));
    budget.check_bits(estimate)?;
    let result = num_traits::Pow::pow(&base, exp);
    budget.check_int(&result)?;
    Ok(Value::Int(result))
}

fn float_binary<'a>(op: BinOp, a: f64, b: f64) -> EvalResult<'a, Value<'a>> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mult => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return raise("ZeroDivisionError", "float division by zero");
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return raise("ZeroDivisionError", "float floor division by zero");
            }
            float_divmod(a, b).0
        }
        BinOp::Mod => {
            if b == 0.0 {
                return raise("ZeroDivisionError", "float modulo");
            }
            float_divmod(a, b).1
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return raise("ZeroDivisionError", "0.0 cannot be raised to a negative power");
            }
            if a < 0.0 && b.fract() != 0.0 && b.is_finite() {
                return Err(Fault::Unsupported("complex numbers".to_string()).into());
            }
            let result = a.powf(b);
            if result.is_infinite() && a.is_finite() && b.is_finite() {
                return raise("OverflowError", "(34, 'Numerical result out of range')");
            }
            result
        }
        _ => {
            return type_error(format!(
                "unsupported operand type(s) for {}: 'float' and 'float'",
                op.symbol()
            ))
        }
    };
    Ok(Value::Float(result))
}

/// Floor quotient and remainder of two floats, sign of the remainder
/// following the divisor.
pub fn float_divmod(a: f64, b: f64) -> (f64, f64) {
    let mut rem = a % b;
    let mut div = (a - rem) / b;
    if rem != 0.0 {
        if (b < 0.0) != (rem < 0.0) {
            rem += b;
            div -= 1.0;
        }
    } else {
        rem = 0.0f64.copysign(b);
    }
    let floor = if div != 0.0 {
        let mut floor = div.floor();
        if div - floor > 0.5 {
            floor += 1.0;
        }
        floor
    } else {
        0.0f64.copysign(a / b)
    };
    (floor, rem)
}

/// `divmod(a, b)` for numbers.
pub fn divmod<'a>(budget: &Budget, a: &Value<'a>, b: &Value<'a>) -> EvalResult<'a, Value<'a>> {
    let quotient = binary(budget, BinOp::FloorDiv, a, b)?;
    let remainder = binary(budget, BinOp::Mod, a, b)?;
    Ok(Value::tuple(vec![quotient, remainder]))
}

fn concat<'a>(budget: &Budget, left: &Value<'a>, right: &Value<'a>) -> EvalResult<'a, Value<'a>> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => {
            budget.check_len(a.len() + b.len())?;
            Ok(Value::str(format!("{}{}", a, b)))
        }
        (Value::Str(_), other) => type_error(format!(
            "can only concatenate str (not \"{}\") to str",
            other.type_name()
        )),
        (Value::Bytes(_) | Value::ByteArray(_), Value::Bytes(_) | Value::ByteArray(_)) => {
            let (Some(a), Some(b)) = (left.byte_content(), right.byte_content()) else {
                return unsupported("+", left, right);
            };
            budget.check_len(a.len() + b.len())?;
            let joined: Vec<u8> = a.iter().chain(b.iter()).copied().collect();
            Ok(match left {
                Value::ByteArray(_) => Value::bytearray(joined),
                _ => Value::Bytes(joined.into()),
            })
        }
        (Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            budget.check_len(items.len())?;
            Ok(Value::list(items))
        }
        (Value::List(_), other) => type_error(format!(
            "can only concatenate list (not \"{}\") to list",
            other.type_name()
        )),
        (Value::Tuple(a), Value::Tuple(b)) => {
            let mut items = a.as_ref().clone();
            items.extend(b.iter().cloned());
            budget.check_len(items.len())?;
            Ok(Value::tuple(items))
        }
        _ => unsupported("+", left, right),
    }
}

fn repeat<'a>(budget: &Budget, seq: &Value<'a>, count: &BigInt) -> EvalResult<'a, Value<'a>> {
    let len = sequence_len(seq);
    let count = if count.is_negative() {
        0
    } else {
        match count.to_usize() {
            Some(n) => n,
            None if len == 0 => 0,
            None => return Err(Fault::MemoryLimit(budget.limits().max_collection_len).into()),
        }
    };
    budget.check_len(len.saturating_mul(count))?;
    Ok(match seq {
        Value::Str(s) => Value::str(s.repeat(count)),
        Value::Bytes(b) => Value::Bytes(b.repeat(count).into()),
        Value::ByteArray(b) => Value::bytearray(b.borrow().repeat(count)),
        Value::List(items) => {
            let items = items.borrow();
            Value::list(repeat_items(&items, count))
        }
        Value::Tuple(items) => Value::tuple(repeat_items(items, count)),
        _ => return type_error("can't multiply sequence by non-int"),
    })
}

fn sequence_len(seq: &Value<'_>) -> usize {
    match seq {
        Value::Str(s) => s.len(),
        Value::Bytes(b) => b.len(),
        Value::ByteArray(b) => b.borrow().len(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        _ => 0,
    }
}

fn repeat_items<'a>(items: &[Value<'a>], count: usize) -> Vec<Value<'a>> {
    let mut out = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        out.extend(items.iter().cloned());
    }
    out
}

fn set_binary<'a>(op: BinOp, left: &Value<'a>, right: &Value<'a>) -> EvalResult<'a, Value<'a>> {
    match (left, right) {
        (Value::Set(a) | Value::FrozenSet(a), Value::Set(b) | Value::FrozenSet(b)) => {
            match set_combine(op, &a.borrow(), &b.borrow()) {
                Ok(out) if matches!(left, Value::FrozenSet(_)) => Ok(Value::frozenset(out)),
                Ok(out) => Ok(Value::set(out)),
                Err(type_name) => unhashable(type_name),
            }
        }
        (Value::Dict(a), Value::Dict(b)) if op == BinOp::BitOr => {
            let mut merged = a.borrow().clone();
            for (k, v) in b.borrow().iter() {
                if let Err(type_name) = merged.insert(k.clone(), v.clone()) {
                    return unhashable(type_name);
                }
            }
            Ok(Value::dict(merged))
        }
        _ => unsupported(op.symbol(), left, right),
    }
}

/// Union, intersection, difference or symmetric difference of two sets.
pub fn set_combine<'a>(
    op: BinOp,
    a: &Table<'a>,
    b: &Table<'a>,
) -> Result<Table<'a>, &'static str> {
    let mut out = Table::new();
    match op {
        BinOp::BitOr => {
            for key in a.keys().chain(b.keys()) {
                out.insert(key.clone(), Value::None)?;
            }
        }
        BinOp::BitAnd => {
            for key in a.keys() {
                if b.contains(key)? {
                    out.insert(key.clone(), Value::None)?;
                }
            }
        }
        BinOp::Sub => {
            for key in a.keys() {
                if !b.contains(key)? {
                    out.insert(key.clone(), Value::None)?;
                }
            }
        }
        _ => {
            for key in a.keys() {
                if !b.contains(key)? {
                    out.insert(key.clone(), Value::None)?;
                }
            }
            for key in b.keys() {
                if !a.contains(key)? {
                    out.insert(key.clone(), Value::None)?;
                }
            }
        }
    }
    Ok(out)
}

pub fn unary<'a>(op: UnaryOp, operand: &Value<'a>) -> EvalResult<'a, Value<'a>> {
    let symbol = match op {
        UnaryOp::Not => return Ok(Value::Bool(!operand.truthy())),
        UnaryOp::USub => "-",
        UnaryOp::UAdd => "+",
        UnaryOp::Invert => "~",
    };
    match (op, numeric(operand)) {
        (UnaryOp::USub, Some(Num::Int(n))) => Ok(Value::Int(-n)),
        (UnaryOp::USub, Some(Num::Float(f))) => Ok(Value::Float(-f)),
        (UnaryOp::UAdd, Some(Num::Int(n))) => Ok(Value::Int(n)),
        (UnaryOp::UAdd, Some(Num::Float(f))) => Ok(Value::Float(f)),
        (UnaryOp::Invert, Some(Num::Int(n))) => Ok(Value::Int(!n)),
        _ => type_error(format!(
            "bad operand type for unary {}: '{}'",
            symbol,
            operand.type_name()
        )),
    }
}

fn num_cmp(a: &Num, b: &Num) -> Option<Ordering> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Some(x.cmp(y)),
        (Num::Float(x), Num::Float(y)) => x.partial_cmp(y),
        (Num::Int(x), Num::Float(y)) => int_float_cmp(x, *y),
        (Num::Float(x), Num::Int(y)) => int_float_cmp(y, *x).map(Ordering::reverse),
    }
}

fn int_float_cmp(int: &BigInt, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    if float.is_infinite() {
        return Some(if float > 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }
    let floor = float.floor();
    let floor_int = BigInt::from_f64(floor)?;
    Some(match int.cmp(&floor_int) {
        Ordering::Equal if float > floor => Ordering::Less,
        other => other,
    })
}

/// `a == b`.
pub fn py_eq<'v>(a: &Value<'v>, b: &Value<'v>) -> bool {
    eq_at(a, b, 0)
}

fn eq_at<'v>(a: &Value<'v>, b: &Value<'v>, depth: usize) -> bool {
    if depth > MAX_COMPARE_DEPTH {
        return false;
    }
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return num_cmp(&x, &y) == Some(Ordering::Equal);
    }
    match (a, b) {
        (Value::None, Value::None) | (Value::Ellipsis, Value::Ellipsis) => true,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::ByteArray(_), Value::Bytes(_) | Value::ByteArray(_))
        | (Value::Bytes(_), Value::ByteArray(_)) => a.byte_content() == b.byte_content(),
        (Value::List(x), Value::List(y)) => {
            Rc::ptr_eq(x, y) || seq_eq(&x.borrow(), &y.borrow(), depth)
        }
        (Value::Tuple(x), Value::Tuple(y)) => seq_eq(x, y, depth),
        (Value::Dict(x), Value::Dict(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter().all(|(k, v)| match y.get(k) {
                    Ok(Some(other)) => eq_at(v, other, depth + 1),
                    _ => false,
                })
        }
        (Value::Set(x) | Value::FrozenSet(x), Value::Set(y) | Value::FrozenSet(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.keys().all(|k| y.contains(k).unwrap_or(false))
        }
        (Value::Range(x), Value::Range(y)) => {
            let len = x.len();
            len == y.len()
                && (len.is_zero()
                    || (x.start == y.start && (len.is_one() || x.step == y.step)))
        }
        (Value::Type(x), Value::Type(y)) => x == y,
        (Value::Builtin(x), Value::Builtin(y)) => x == y,
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Exception(x), Value::Exception(y)) => Rc::ptr_eq(x, y),
        (Value::Iterator(x), Value::Iterator(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

fn seq_eq<'v>(x: &[Value<'v>], y: &[Value<'v>], depth: usize) -> bool {
    x.len() == y.len() && x.iter().zip(y).all(|(a, b)| eq_at(a, b, depth + 1))
}

/// Ordering used by `<` and friends, `sorted`, `min` and `max`.
/// `None` means the operands are unordered (NaN).
pub fn py_cmp<'a>(symbol: &str, a: &Value<'a>, b: &Value<'a>) -> EvalResult<'a, Option<Ordering>> {
    cmp_at(symbol, a, b, 0)
}

fn cmp_at<'a>(
    symbol: &str,
    a: &Value<'a>,
    b: &Value<'a>,
    depth: usize,
) -> EvalResult<'a, Option<Ordering>> {
    if depth > MAX_COMPARE_DEPTH {
        return Err(Fault::DepthLimit(MAX_COMPARE_DEPTH).into());
    }
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return Ok(num_cmp(&x, &y));
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Some(x.cmp(y))),
        (Value::Bytes(x), Value::Bytes(y)) => Ok(Some(x.cmp(y))),
        (Value::List(x), Value::List(y)) => {
            let (x, y) = (x.borrow().clone(), y.borrow().clone());
            seq_cmp(symbol, &x, &y, depth)
        }
        (Value::Tuple(x), Value::Tuple(y)) => seq_cmp(symbol, x, y, depth),
        _ => type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            symbol,
            a.type_name(),
            b.type_name()
        )),
    }
}

fn seq_cmp<'a>(
    symbol: &str,
    x: &[Value<'a>],
    y: &[Value<'a>],
    depth: usize,
) -> EvalResult<'a, Option<Ordering>> {
    for (a, b) in x.iter().zip(y) {
        if !eq_at(a, b, depth + 1) {
            return cmp_at(symbol, a, b, depth + 1);
        }
    }
    Ok(Some(x.len().cmp(&y.len())))
}

/// `a is b`. Immutable scalars compare by value.
pub fn is_same<'v>(a: &Value<'v>, b: &Value<'v>) -> bool {
    match (a, b) {
        (Value::None, Value::None) | (Value::Ellipsis, Value::Ellipsis) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y),
        (Value::Tuple(x), Value::Tuple(y)) => Rc::ptr_eq(x, y),
        (Value::Dict(x), Value::Dict(y))
        | (Value::Set(x), Value::Set(y))
        | (Value::FrozenSet(x), Value::FrozenSet(y)) => Rc::ptr_eq(x, y),
        (Value::ByteArray(x), Value::ByteArray(y)) => Rc::ptr_eq(x, y),
        (Value::Range(x), Value::Range(y)) => Rc::ptr_eq(x, y),
        (Value::Iterator(x), Value::Iterator(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Exception(x), Value::Exception(y)) => Rc::ptr_eq(x, y),
        (Value::Type(x), Value::Type(y)) => x == y,
        (Value::Builtin(x), Value::Builtin(y)) => x == y,
        _ => false,
    }
}

/// `item in container`.
pub fn contains<'a>(container: &Value<'a>, item: &Value<'a>) -> EvalResult<'a, bool> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_ref())),
            other => type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            )),
        },
        Value::Bytes(_) | Value::ByteArray(_) => {
            let Some(haystack) = container.byte_content() else {
                return Ok(false);
            };
            if let Some(needle) = item.byte_content() {
                return Ok(needle.is_empty()
                    || haystack.windows(needle.len()).any(|w| w == needle.as_ref()));
            }
            match item.as_i64() {
                Some(byte @ 0..=255) => Ok(haystack.contains(&(byte as u8))),
                Some(_) => value_error("byte must be in range(0, 256)"),
                None => type_error(format!(
                    "a bytes-like object is required, not '{}'",
                    item.type_name()
                )),
            }
        }
        Value::List(items) => Ok(items
            .borrow()
            .iter()
            .any(|v| is_same(v, item) || py_eq(v, item))),
        Value::Tuple(items) => Ok(items.iter().any(|v| is_same(v, item) || py_eq(v, item))),
        Value::Dict(table) | Value::Set(table) | Value::FrozenSet(table) => {
            match table.borrow().contains(item) {
                Ok(found) => Ok(found),
                Err(type_name) => unhashable(type_name),
            }
        }
        Value::Range(range) => match item {
            Value::Int(_) | Value::Bool(_) => {
                Ok(range.contains(&item.as_int().unwrap_or_default()))
            }
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                Ok(BigInt::from_f64(*f).is_some_and(|n| range.contains(&n)))
            }
            _ => Ok(false),
        },
        Value::Iterator(state) => {
            let mut state = state.borrow_mut();
            while let Some(value) = state.next_value() {
                if py_eq(&value, item) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        other => type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        )),
    }
}

pub fn compare<'a>(op: CmpOp, left: &Value<'a>, right: &Value<'a>) -> EvalResult<'a, bool> {
    let ordering = |expected: fn(Ordering) -> bool| -> EvalResult<'a, bool> {
        if let (Some(a), Some(b)) = (left.set_table(), right.set_table()) {
            return set_order(op, &a.borrow(), &b.borrow());
        }
        Ok(py_cmp(op.symbol(), left, right)?.is_some_and(expected))
    };
    match op {
        CmpOp::Eq => Ok(py_eq(left, right)),
        CmpOp::NotEq => Ok(!py_eq(left, right)),
        CmpOp::Lt => ordering(Ordering::is_lt),
        CmpOp::LtE => ordering(Ordering::is_le),
        CmpOp::Gt => ordering(Ordering::is_gt),
        CmpOp::GtE => ordering(Ordering::is_ge),
        CmpOp::Is => Ok(is_same(left, right)),
        CmpOp::IsNot => Ok(!is_same(left, right)),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => Ok(!contains(right, left)?),
    }
}

fn set_order<'a>(op: CmpOp, a: &Table<'a>, b: &Table<'a>) -> EvalResult<'a, bool> {
    let subset = |x: &Table<'a>, y: &Table<'a>| x.keys().all(|k| y.contains(k).unwrap_or(false));
    Ok(match op {
        CmpOp::Lt => a.len() < b.len() && subset(a, b),
        CmpOp::LtE => subset(a, b),
        CmpOp::Gt => a.len() > b.len() && subset(b, a),
        _ => subset(b, a),
    })
}

/// Python-style index normalisation for `seq[index]`.
pub fn normalize_index(index: &BigInt, len: usize) -> Option<usize> {
    let len_big = BigInt::from(len);
    let adjusted = if index.sign() == Sign::Minus {
        index + &len_big
    } else {
        index.clone()
    };
    if adjusted.is_negative() || adjusted >= len_big {
        None
    } else {
        adjusted.to_usize()
    }
}

/// Normalised `(start, stop, step)` of `seq[lower:upper:step]`, following
/// `slice.indices(len)`.
pub fn slice_bounds<'a>(
    lower: &Value<'a>,
    upper: &Value<'a>,
    step: &Value<'a>,
    len: usize,
) -> EvalResult<'a, (i128, i128, i128)> {
    let bound = |value: &Value<'a>| -> EvalResult<'a, Option<i128>> {
        match value {
            Value::None => Ok(None),
            other => match other.as_int() {
                Some(n) => Ok(Some(n.to_i128().unwrap_or(if n.is_negative() {
                    i128::MIN / 2
                } else {
                    i128::MAX / 2
                }))),
                None => type_error(
                    "slice indices must be integers or None or have an __index__ method",
                ),
            },
        }
    };
    let step = bound(step)?.unwrap_or(1);
    if step == 0 {
        return value_error("slice step cannot be zero");
    }
    let len = len as i128;
    let clamp = |value: Option<i128>, default: i128| -> i128 {
        match value {
            None => default,
            Some(v) => {
                let v = if v < 0 { v + len } else { v };
                if step > 0 {
                    v.clamp(0, len)
                } else {
                    v.clamp(-1, len - 1)
                }
            }
        }
    };
    Ok(if step > 0 {
        (clamp(bound(lower)?, 0), clamp(bound(upper)?, len), step)
    } else {
        (clamp(bound(lower)?, len - 1), clamp(bound(upper)?, -1), step)
    })
}

/// Number of elements a normalised slice selects.
pub fn slice_len(start: i128, stop: i128, step: i128) -> i128 {
    if step > 0 && start < stop {
        (stop - start - 1) / step + 1
    } else if step < 0 && start > stop {
        (start - stop - 1) / (-step) + 1
    } else {
        0
    }
}

/// Indices selected by `seq[lower:upper:step]`.
pub fn slice_indices<'a>(
    lower: &Value<'a>,
    upper: &Value<'a>,
    step: &Value<'a>,
    len: usize,
) -> EvalResult<'a, Vec<usize>> {
    let (start, stop, step) = slice_bounds(lower, upper, step, len)?;
    let count = slice_len(start, stop, step);
    Ok((0..count).map(|i| (start + i * step) as usize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::budget::SandboxLimits;
    use crate::sandbox::value::Signal;

    fn budget() -> Budget {
        Budget::start(SandboxLimits::default())
    }

    fn eval_binary<'a>(op: BinOp, a: Value<'a>, b: Value<'a>) -> String {
        match binary(&budget(), op, &a, &b) {
            Ok(value) => value.repr(),
            Err(Signal::Raise(exc)) => format!("raise {}", exc.repr()),
            Err(Signal::Abort(fault)) => format!("abort {}", fault),
        }
    }

    #[test]
    fn test_floor_division_rounds_down() {
        assert_eq!(eval_binary(BinOp::FloorDiv, Value::int(-7), Value::int(2)), "-4");
        assert_eq!(eval_binary(BinOp::Mod, Value::int(-7), Value::int(2)), "1");
        assert_eq!(eval_binary(BinOp::Mod, Value::int(7), Value::int(-2)), "-1");
        assert_eq!(eval_binary(BinOp::FloorDiv, Value::Float(-7.0), Value::int(2)), "-4.0");
        assert_eq!(eval_binary(BinOp::Mod, Value::Float(-7.5), Value::int(2)), "0.5");
    }

    #[test]
    fn test_true_division_yields_float() {
        assert_eq!(eval_binary(BinOp::Div, Value::int(6), Value::int(3)), "2.0");
        assert_eq!(
            eval_binary(BinOp::Div, Value::int(1), Value::int(0)),
            "raise ZeroDivisionError('division by zero')"
        );
    }

    #[test]
    fn test_bool_arithmetic() {
        assert_eq!(eval_binary(BinOp::Add, Value::Bool(true), Value::Bool(true)), "2");
        assert_eq!(eval_binary(BinOp::BitAnd, Value::Bool(true), Value::Bool(false)), "False");
    }

    #[test]
    fn test_power_limits() {
        assert_eq!(eval_binary(BinOp::Pow, Value::int(2), Value::int(10)), "1024");
        assert_eq!(eval_binary(BinOp::Pow, Value::int(2), Value::int(-1)), "0.5");
        assert_eq!(
            eval_binary(BinOp::Pow, Value::int(10), Value::int(100_000)),
            "abort integer result wider than 4096 bits"
        );
    }

    #[test]
    fn test_sequence_arithmetic() {
        assert_eq!(eval_binary(BinOp::Mult, Value::str("ab"), Value::int(3)), "'ababab'");
        assert_eq!(eval_binary(BinOp::Mult, Value::int(2), Value::list(vec![Value::int(1)])), "[1, 1]");
        assert_eq!(
            eval_binary(BinOp::Add, Value::str("a"), Value::int(1)),
            "raise TypeError('can only concatenate str (not \"int\") to str')"
        );
    }

    #[test]
    fn test_mixed_equality_and_ordering() {
        assert!(py_eq(&Value::int(1), &Value::Float(1.0)));
        assert!(py_eq(&Value::Bool(true), &Value::int(1)));
        assert!(!py_eq(&Value::int(1), &Value::str("1")));
        assert!(compare(CmpOp::Lt, &Value::int(2), &Value::Float(2.5)).unwrap_or(false));
        assert!(!compare(CmpOp::Lt, &Value::Float(f64::NAN), &Value::int(1)).unwrap_or(true));
        assert!(matches!(
            compare(CmpOp::Lt, &Value::int(1), &Value::str("a")),
            Err(Signal::Raise(_))
        ));
    }

    #[test]
    fn test_equality_across_borrowed_values() {
        let items = vec![Value::int(1), Value::str("a")];
        let left = Value::tuple(items.clone());
        let right = Value::tuple(items);
        assert!(py_eq(&left, &right));
        assert!(!is_same(&left, &right));
        assert!(is_same(&left, &left.clone()));
    }

    fn table_of(values: &[i64]) -> Table<'static> {
        let mut table = Table::new();
        for &n in values {
            table.insert(Value::int(n), Value::None).unwrap();
        }
        table
    }

    #[test]
    fn test_frozenset_operators_keep_left_type() {
        let frozen = Value::frozenset(table_of(&[1, 2, 3]));
        let plain = Value::set(table_of(&[3, 4]));
        assert_eq!(eval_binary(BinOp::BitAnd, frozen.clone(), plain.clone()), "frozenset({3})");
        assert_eq!(eval_binary(BinOp::Sub, plain.clone(), frozen.clone()), "{4}");
        assert!(py_eq(&Value::frozenset(table_of(&[3, 4])), &plain));
        assert!(compare(CmpOp::LtE, &Value::frozenset(table_of(&[3])), &plain).unwrap_or(false));
        assert!(contains(&frozen, &Value::int(2)).unwrap_or(false));
    }

    #[test]
    fn test_bytearray_mixes_with_bytes() {
        let data = Value::bytearray(b"ab".to_vec());
        let bytes = Value::Bytes(b"ab".to_vec().into());
        assert!(py_eq(&data, &bytes));
        assert_eq!(eval_binary(BinOp::Add, data.clone(), bytes.clone()), "bytearray(b'abab')");
        assert_eq!(eval_binary(BinOp::Add, bytes.clone(), data.clone()), "b'abab'");
        assert_eq!(eval_binary(BinOp::Mult, data.clone(), Value::int(2)), "bytearray(b'abab')");
        assert!(contains(&data, &Value::int(98)).unwrap_or(false));
        assert!(contains(&data, &Value::Bytes(b"b".to_vec().into())).unwrap_or(false));
    }

    #[test]
    fn test_slice_indices() {
        let none = Value::None;
        assert_eq!(slice_indices(&none, &none, &Value::int(-1), 3).unwrap_or_default(), vec![2, 1, 0]);
        assert_eq!(
            slice_indices(&Value::int(-2), &none, &none, 5).unwrap_or_default(),
            vec![3, 4]
        );
        assert_eq!(normalize_index(&BigInt::from(-1), 3), Some(2));
        assert_eq!(normalize_index(&BigInt::from(3), 3), None);
    }
}
