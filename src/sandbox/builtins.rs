//! The restricted builtin namespace: pure functions, type constructors and
//! the methods of built-in types. Nothing here touches the filesystem, the
//! network, the clock or the interpreter's own namespaces.

use crate::python::ast::BinOp;
use crate::sandbox::eval::Interpreter;
use crate::sandbox::fault::Fault;
use crate::sandbox::format::{format_value, str_format};
use crate::sandbox::ops::{self, int_to_f64, normalize_index, py_cmp, py_eq};
use crate::sandbox::value::{
    exception_kind, key_error, raise, type_error, unhashable, value_error, EvalResult, ExceptionValue,
    IterState, RangeValue, SliceValue, Table, TypeKind, Value,
};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};
use once_cell::sync::Lazy;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Abs,
    All,
    Any,
    Bin,
    Callable,
    Chr,
    Divmod,
    Enumerate,
    Filter,
    Format,
    Hash,
    Hex,
    Id,
    Isinstance,
    Issubclass,
    Iter,
    Len,
    Map,
    Max,
    Min,
    Next,
    Oct,
    Ord,
    Pow,
    Print,
    Repr,
    Reversed,
    Round,
    Sorted,
    Sum,
    Zip,
}

static FUNCTIONS: Lazy<HashMap<&'static str, Builtin>> = Lazy::new(|| {
    use Builtin::*;
    [
        ("abs", Abs),
        ("all", All),
        ("any", Any),
        ("bin", Bin),
        ("callable", Callable),
        ("chr", Chr),
        ("divmod", Divmod),
        ("enumerate", Enumerate),
        ("filter", Filter),
        ("format", Format),
        ("hash", Hash),
        ("hex", Hex),
        ("id", Id),
        ("isinstance", Isinstance),
        ("issubclass", Issubclass),
        ("iter", Iter),
        ("len", Len),
        ("map", Map),
        ("max", Max),
        ("min", Min),
        ("next", Next),
        ("oct", Oct),
        ("ord", Ord),
        ("pow", Pow),
        ("print", Print),
        ("repr", Repr),
        ("reversed", Reversed),
        ("round", Round),
        ("sorted", Sorted),
        ("sum", Sum),
        ("zip", Zip),
    ]
    .into_iter()
    .collect()
});

static TYPES: Lazy<HashMap<&'static str, TypeKind>> = Lazy::new(|| {
    [
        ("int", TypeKind::Int),
        ("float", TypeKind::Float),
        ("str", TypeKind::Str),
        ("bool", TypeKind::Bool),
        ("bytes", TypeKind::Bytes),
        ("bytearray", TypeKind::ByteArray),
        ("list", TypeKind::List),
        ("tuple", TypeKind::Tuple),
        ("dict", TypeKind::Dict),
        ("set", TypeKind::Set),
        ("frozenset", TypeKind::FrozenSet),
        ("range", TypeKind::Range),
        ("slice", TypeKind::Slice),
        ("object", TypeKind::Object),
        ("type", TypeKind::Type),
    ]
    .into_iter()
    .collect()
});

/// Builtins that exist in CPython but are withheld from probed code.
const WITHHELD: &[&str] = &[
    "open",
    "input",
    "eval",
    "exec",
    "compile",
    "__import__",
    "globals",
    "locals",
    "vars",
    "dir",
    "getattr",
    "setattr",
    "delattr",
    "hasattr",
    "breakpoint",
    "exit",
    "quit",
    "help",
    "memoryview",
    "super",
    "property",
    "staticmethod",
    "classmethod",
    "aiter",
    "anext",
    "complex",
];

impl Builtin {
    pub fn name(self) -> &'static str {
        FUNCTIONS
            .iter()
            .find(|(_, b)| **b == self)
            .map(|(name, _)| *name)
            .unwrap_or("<builtin>")
    }
}

/// Resolve a name in the builtin namespace. `None` means the name is not a
/// builtin at all.
pub fn lookup<'a>(name: &str) -> Option<Result<Value<'a>, Fault>> {
    if let Some(builtin) = FUNCTIONS.get(name) {
        return Some(Ok(Value::Builtin(*builtin)));
    }
    if let Some(kind) = TYPES.get(name) {
        return Some(Ok(Value::Type(*kind)));
    }
    if let Some(kind) = exception_kind(name) {
        return Some(Ok(Value::Type(TypeKind::Exception(kind))));
    }
    if WITHHELD.contains(&name) {
        return Some(Err(Fault::Unsupported(format!(
            "builtin `{}` is not available to probed code",
            name
        ))));
    }
    None
}

/// Positional and keyword arguments of one call.
pub struct Args<'a> {
    pub name: String,
    pub positional: Vec<Value<'a>>,
    pub keywords: Vec<(String, Value<'a>)>,
}

impl<'a> Args<'a> {
    pub fn new(
        name: impl Into<String>,
        positional: Vec<Value<'a>>,
        keywords: Vec<(String, Value<'a>)>,
    ) -> Self {
        Self {
            name: name.into(),
            positional,
            keywords,
        }
    }

    fn expect(&self, min: usize, max: usize) -> EvalResult<'a, ()> {
        let given = self.positional.len();
        if given >= min && given <= max {
            return Ok(());
        }
        if min == max {
            type_error(format!(
                "{}() takes exactly {} argument{} ({} given)",
                self.name,
                min,
                if min == 1 { "" } else { "s" },
                given
            ))
        } else if given < min {
            type_error(format!(
                "{}() expected at least {} argument{}, got {}",
                self.name,
                min,
                if min == 1 { "" } else { "s" },
                given
            ))
        } else {
            type_error(format!(
                "{}() expected at most {} argument{}, got {}",
                self.name,
                max,
                if max == 1 { "" } else { "s" },
                given
            ))
        }
    }

    fn take_keyword(&mut self, name: &str) -> Option<Value<'a>> {
        let pos = self.keywords.iter().position(|(k, _)| k == name)?;
        Some(self.keywords.remove(pos).1)
    }

    fn no_keywords(&self) -> EvalResult<'a, ()> {
        match self.keywords.first() {
            None => Ok(()),
            Some((key, _)) => type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                self.name, key
            )),
        }
    }

    fn get(&self, index: usize) -> Option<&Value<'a>> {
        self.positional.get(index)
    }

    fn first(&self) -> &Value<'a> {
        self.positional.first().unwrap_or(&Value::None)
    }

    fn int_arg(&self, index: usize) -> EvalResult<'a, BigInt> {
        match self.get(index) {
            Some(v) => match v.as_int() {
                Some(n) => Ok(n),
                None => type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    v.type_name()
                )),
            },
            None => type_error(format!("{}() missing required argument", self.name)),
        }
    }
}

fn int_index<'a>(value: &Value<'a>) -> EvalResult<'a, BigInt> {
    match value.as_int() {
        Some(n) => Ok(n),
        None => type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        )),
    }
}

pub fn call_builtin<'a>(
    interp: &mut Interpreter<'a>,
    builtin: Builtin,
    mut args: Args<'a>,
) -> EvalResult<'a, Value<'a>> {
    use Builtin::*;
    match builtin {
        Print => return Ok(Value::None),
        Max | Min => return min_max(interp, builtin == Max, args),
        Sorted => {
            let key = args.take_keyword("key");
            let reverse = args.take_keyword("reverse").is_some_and(|v| v.truthy());
            args.no_keywords()?;
            args.expect(1, 1)?;
            let items = interp.collect(args.first())?;
            return Ok(Value::list(sort_values(interp, items, key, reverse)?));
        }
        Enumerate => {
            let start = args.take_keyword("start");
            args.no_keywords()?;
            args.expect(1, 2)?;
            let start = match start.as_ref().or(args.get(1)) {
                Some(v) => int_index(v)?,
                None => BigInt::zero(),
            };
            let items = interp.collect(args.first())?;
            let pairs = items
                .into_iter()
                .enumerate()
                .map(|(i, v)| Value::tuple(vec![Value::Int(&start + i), v]))
                .collect();
            return Ok(Value::iterator(IterState::items(pairs)));
        }
        Sum => {
            let start = args.take_keyword("start");
            args.no_keywords()?;
            args.expect(1, 2)?;
            let mut total = start.or_else(|| args.get(1).cloned()).unwrap_or(Value::int(0));
            if matches!(total, Value::Str(_)) {
                return type_error("sum() can't sum strings [use ''.join(seq) instead]");
            }
            let mut iter = interp.iter_handle(args.first())?;
            while let Some(item) = iter.next_value() {
                interp.tick()?;
                total = ops::binary(interp.budget(), BinOp::Add, &total, &item)?;
            }
            return Ok(total);
        }
        Next => {
            args.no_keywords()?;
            args.expect(1, 2)?;
            return match args.first() {
                Value::Iterator(state) => {
                    let next = state.borrow_mut().next_value();
                    match (next, args.get(1)) {
                        (Some(v), _) => Ok(v),
                        (None, Some(default)) => Ok(default.clone()),
                        (None, None) => raise("StopIteration", ""),
                    }
                }
                other => type_error(format!(
                    "'{}' object is not an iterator",
                    other.type_name()
                )),
            };
        }
        _ => {}
    }
    args.no_keywords()?;
    match builtin {
        Abs => {
            args.expect(1, 1)?;
            match args.first() {
                Value::Int(n) => Ok(Value::Int(n.abs())),
                Value::Bool(b) => Ok(Value::int(*b as u8)),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => type_error(format!(
                    "bad operand type for abs(): '{}'",
                    other.type_name()
                )),
            }
        }
        All | Any => {
            args.expect(1, 1)?;
            let want = builtin == Any;
            let mut iter = interp.iter_handle(args.first())?;
            while let Some(item) = iter.next_value() {
                interp.tick()?;
                if item.truthy() == want {
                    return Ok(Value::Bool(want));
                }
            }
            Ok(Value::Bool(!want))
        }
        Bin | Oct | Hex => {
            args.expect(1, 1)?;
            let n = args.int_arg(0)?;
            let (radix, prefix) = match builtin {
                Bin => (2, "0b"),
                Oct => (8, "0o"),
                _ => (16, "0x"),
            };
            let sign = if n.is_negative() { "-" } else { "" };
            Ok(Value::str(format!(
                "{}{}{}",
                sign,
                prefix,
                n.abs().to_str_radix(radix)
            )))
        }
        Callable => {
            args.expect(1, 1)?;
            Ok(Value::Bool(matches!(
                args.first(),
                Value::Function(_) | Value::Builtin(_) | Value::Method(_) | Value::Type(_)
            )))
        }
        Chr => {
            args.expect(1, 1)?;
            let n = args.int_arg(0)?;
            match n.to_u32().and_then(char::from_u32) {
                Some(c) => Ok(Value::str(c.to_string())),
                None => value_error("chr() arg not in range(0x110000)"),
            }
        }
        Divmod => {
            args.expect(2, 2)?;
            ops::divmod(interp.budget(), &args.positional[0], &args.positional[1])
        }
        Filter => {
            args.expect(2, 2)?;
            let predicate = args.positional[0].clone();
            let items = interp.collect(&args.positional[1])?;
            let mut kept = Vec::new();
            for item in items {
                let keep = match predicate {
                    Value::None => item.truthy(),
                    _ => interp.call(&predicate, vec![item.clone()], Vec::new())?.truthy(),
                };
                if keep {
                    kept.push(item);
                }
            }
            Ok(Value::iterator(IterState::items(kept)))
        }
        Format => {
            args.expect(1, 2)?;
            let spec = match args.get(1) {
                Some(Value::Str(s)) => s.to_string(),
                Some(other) => {
                    return type_error(format!(
                        "format() argument 2 must be str, not {}",
                        other.type_name()
                    ))
                }
                None => String::new(),
            };
            Ok(Value::str(format_value(interp.budget(), args.first(), &spec)?))
        }
        Hash => {
            args.expect(1, 1)?;
            Ok(Value::Int(hash_value(args.first())?))
        }
        Id => {
            args.expect(1, 1)?;
            Ok(Value::int(identity(args.first())))
        }
        Isinstance | Issubclass => {
            args.expect(2, 2)?;
            let subject = match (builtin, &args.positional[0]) {
                (Isinstance, value) => value.type_of(),
                (_, Value::Type(kind)) => *kind,
                (_, _) => return type_error("issubclass() arg 1 must be a class"),
            };
            Ok(Value::Bool(matches_class(subject, &args.positional[1], builtin.name())?))
        }
        Iter => {
            args.expect(1, 1)?;
            match args.first() {
                Value::Iterator(_) => Ok(args.first().clone()),
                other => {
                    let items = interp.collect(other)?;
                    Ok(Value::iterator(IterState::items(items)))
                }
            }
        }
        Len => {
            args.expect(1, 1)?;
            Ok(Value::int(len_of(args.first())?))
        }
        Map => {
            if args.positional.len() < 2 {
                return type_error("map() must have at least two arguments.");
            }
            let func = args.positional[0].clone();
            let mut columns = Vec::new();
            for iterable in &args.positional[1..] {
                columns.push(interp.collect(iterable)?);
            }
            let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
            let mut out = Vec::with_capacity(rows);
            for row in 0..rows {
                let call_args = columns.iter().map(|col| col[row].clone()).collect();
                out.push(interp.call(&func, call_args, Vec::new())?);
            }
            Ok(Value::iterator(IterState::items(out)))
        }
        Ord => {
            args.expect(1, 1)?;
            match args.first() {
                Value::Str(s) if s.chars().count() == 1 => {
                    Ok(Value::int(s.chars().next().map(u32::from).unwrap_or(0)))
                }
                Value::Str(s) => type_error(format!(
                    "ord() expected a character, but string of length {} found",
                    s.chars().count()
                )),
                other => type_error(format!(
                    "ord() expected string of length 1, but {} found",
                    other.type_name()
                )),
            }
        }
        Pow => {
            args.expect(2, 3)?;
            match args.get(2) {
                None | Some(Value::None) => ops::binary(
                    interp.budget(),
                    BinOp::Pow,
                    &args.positional[0],
                    &args.positional[1],
                ),
                Some(modulus) => {
                    let (base, exp, modulus) =
                        (args.int_arg(0)?, args.int_arg(1)?, int_index(modulus)?);
                    if modulus.is_zero() {
                        return value_error("pow() 3rd argument cannot be 0");
                    }
                    if exp.is_negative() {
                        return value_error("base is not invertible for the given modulus");
                    }
                    let result = base.modpow(&exp, &modulus);
                    let result = if !result.is_zero() && result.is_negative() != modulus.is_negative() {
                        result + &modulus
                    } else {
                        result
                    };
                    Ok(Value::Int(result))
                }
            }
        }
        Repr => {
            args.expect(1, 1)?;
            Ok(Value::str(args.first().repr()))
        }
        Reversed => {
            args.expect(1, 1)?;
            match args.first() {
                Value::Set(_) | Value::FrozenSet(_) | Value::Iterator(_) => type_error(format!(
                    "'{}' object is not reversible",
                    args.first().type_name()
                )),
                Value::Range(r) => {
                    let len = r.len();
                    if len.is_zero() {
                        return Ok(Value::iterator(IterState::items(Vec::new())));
                    }
                    Ok(Value::iterator(IterState::Range {
                        next: r.get(&(len - 1u32)),
                        stop: &r.start - &r.step,
                        step: -r.step.clone(),
                    }))
                }
                other => {
                    let mut items = interp.collect(other)?;
                    items.reverse();
                    Ok(Value::iterator(IterState::items(items)))
                }
            }
        }
        Round => {
            args.expect(1, 2)?;
            round(&args.positional[0], args.get(1))
        }
        Zip => {
            let mut columns = Vec::new();
            for iterable in &args.positional {
                columns.push(interp.collect(iterable)?);
            }
            let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
            let out = (0..rows)
                .map(|row| Value::tuple(columns.iter().map(|col| col[row].clone()).collect()))
                .collect();
            Ok(Value::iterator(IterState::items(out)))
        }
        Print | Max | Min | Sorted | Enumerate | Sum | Next => Ok(Value::None),
    }
}

fn matches_class<'a>(subject: TypeKind, class: &Value<'a>, func: &str) -> EvalResult<'a, bool> {
    match class {
        Value::Type(kind) => Ok(subject.is_subtype_of(*kind)),
        Value::Tuple(options) => {
            for option in options.iter() {
                if matches_class(subject, option, func)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => type_error(format!(
            "{}() arg 2 must be a type, a tuple of types, or a union",
            func
        )),
    }
}

pub fn len_of<'a>(value: &Value<'a>) -> EvalResult<'a, usize> {
    Ok(match value {
        Value::Str(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::ByteArray(b) => b.borrow().len(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        Value::Dict(t) | Value::Set(t) | Value::FrozenSet(t) => t.borrow().len(),
        Value::Range(r) => match r.len().to_usize() {
            Some(n) => n,
            None => return raise("OverflowError", "Python int too large to convert to C ssize_t"),
        },
        other => {
            return type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            ))
        }
    })
}

/// Modulus CPython uses for numeric hashes.
const HASH_MODULUS: u64 = (1 << 61) - 1;

fn hash_value<'a>(value: &Value<'a>) -> EvalResult<'a, BigInt> {
    if let Some(n) = value.as_int() {
        let modulus = BigInt::from(HASH_MODULUS);
        let reduced = n.abs().mod_floor(&modulus);
        let reduced = if n.is_negative() { -reduced } else { reduced };
        return Ok(if reduced == BigInt::from(-1) {
            BigInt::from(-2)
        } else {
            reduced
        });
    }
    match value.hash_key() {
        Ok(key) => {
            let mut hasher = DefaultHasher::new();
            key.hash(&mut hasher);
            Ok(BigInt::from(hasher.finish() as i64))
        }
        Err(type_name) => unhashable(type_name),
    }
}

fn identity(value: &Value<'_>) -> usize {
    match value {
        Value::List(rc) => Rc::as_ptr(rc) as *const u8 as usize,
        Value::Dict(rc) | Value::Set(rc) | Value::FrozenSet(rc) => {
            Rc::as_ptr(rc) as *const u8 as usize
        }
        Value::ByteArray(rc) => Rc::as_ptr(rc) as *const u8 as usize,
        Value::Tuple(rc) => Rc::as_ptr(rc) as *const u8 as usize,
        Value::Function(rc) => Rc::as_ptr(rc) as *const u8 as usize,
        Value::Exception(rc) => Rc::as_ptr(rc) as *const u8 as usize,
        Value::Iterator(rc) => Rc::as_ptr(rc) as *const u8 as usize,
        other => {
            let mut hasher = DefaultHasher::new();
            other.repr().hash(&mut hasher);
            hasher.finish() as usize
        }
    }
}

fn round<'a>(value: &Value<'a>, ndigits: Option<&Value<'a>>) -> EvalResult<'a, Value<'a>> {
    let ndigits = match ndigits {
        None | Some(Value::None) => None,
        Some(v) => Some(int_index(v)?),
    };
    match (value, ndigits) {
        (Value::Int(_) | Value::Bool(_), None) => Ok(Value::Int(value.as_int().unwrap_or_default())),
        (Value::Int(_) | Value::Bool(_), Some(digits)) => {
            let n = value.as_int().unwrap_or_default();
            if !digits.is_negative() {
                return Ok(Value::Int(n));
            }
            let exponent = (-digits).to_u32().unwrap_or(u32::MAX).min(4096);
            let unit = num_traits::Pow::pow(BigInt::from(10), exponent);
            let (quotient, remainder) = n.div_mod_floor(&unit);
            let doubled = &remainder * 2u32;
            let quotient = match doubled.cmp(&unit) {
                std::cmp::Ordering::Greater => quotient + 1u32,
                std::cmp::Ordering::Equal if quotient.is_odd() => quotient + 1u32,
                _ => quotient,
            };
            Ok(Value::Int(quotient * unit))
        }
        (Value::Float(f), None) => {
            if f.is_nan() {
                return value_error("cannot convert float NaN to integer");
            }
            if f.is_infinite() {
                return raise("OverflowError", "cannot convert float infinity to integer");
            }
            Ok(Value::Int(
                BigInt::from_f64(f.round_ties_even()).unwrap_or_default(),
            ))
        }
        (Value::Float(f), Some(digits)) => {
            if !f.is_finite() {
                return Ok(Value::Float(*f));
            }
            let digits = digits.to_i32().unwrap_or(if digits.is_negative() { -400 } else { 400 });
            if digits > 308 {
                return Ok(Value::Float(*f));
            }
            if digits < -308 {
                return Ok(Value::Float(0.0f64.copysign(*f)));
            }
            let scale = 10f64.powi(digits);
            let scaled = f * scale;
            if !scaled.is_finite() {
                return Ok(Value::Float(*f));
            }
            Ok(Value::Float(scaled.round_ties_even() / scale))
        }
        (other, _) => type_error(format!(
            "type {} doesn't define __round__ method",
            other.type_name()
        )),
    }
}

fn min_max<'a>(interp: &mut Interpreter<'a>, want_max: bool, mut args: Args<'a>) -> EvalResult<'a, Value<'a>> {
    let key = args.take_keyword("key").filter(|k| !matches!(k, Value::None));
    let default = args.take_keyword("default");
    args.no_keywords()?;
    let candidates = match args.positional.len() {
        0 => {
            return type_error(format!(
                "{} expected at least 1 argument, got 0",
                args.name
            ))
        }
        1 => interp.collect(&args.positional[0])?,
        _ => {
            if default.is_some() {
                return type_error(format!(
                    "Cannot specify a default for {}() with multiple positional arguments",
                    args.name
                ));
            }
            std::mem::take(&mut args.positional)
        }
    };
    let mut best: Option<(Value<'a>, Value<'a>)> = None;
    for candidate in candidates {
        interp.tick()?;
        let score = match &key {
            Some(key) => interp.call(key, vec![candidate.clone()], Vec::new())?,
            None => candidate.clone(),
        };
        let replace = match &best {
            None => true,
            Some((best_score, _)) => {
                let symbol = if want_max { ">" } else { "<" };
                let ordering = py_cmp(symbol, &score, best_score)?;
                matches!(
                    (want_max, ordering),
                    (true, Some(std::cmp::Ordering::Greater)) | (false, Some(std::cmp::Ordering::Less))
                )
            }
        };
        if replace {
            best = Some((score, candidate));
        }
    }
    match (best, default) {
        (Some((_, value)), _) => Ok(value),
        (None, Some(default)) => Ok(default),
        (None, None) => value_error(format!("{}() iterable argument is empty", args.name)),
    }
}

/// Stable sort by Python `<`, optionally through a key function.
pub fn sort_values<'a>(
    interp: &mut Interpreter<'a>,
    items: Vec<Value<'a>>,
    key: Option<Value<'a>>,
    reverse: bool,
) -> EvalResult<'a, Vec<Value<'a>>> {
    let keys = match key {
        Some(key) if !matches!(key, Value::None) => {
            let mut keys = Vec::with_capacity(items.len());
            for item in &items {
                keys.push(interp.call(&key, vec![item.clone()], Vec::new())?);
            }
            keys
        }
        _ => items.clone(),
    };
    let mut order: Vec<usize> = (0..items.len()).collect();
    let mut less = |a: usize, b: usize| -> EvalResult<'a, bool> {
        interp.tick()?;
        let (x, y) = if reverse { (&keys[b], &keys[a]) } else { (&keys[a], &keys[b]) };
        Ok(py_cmp("<", x, y)? == Some(std::cmp::Ordering::Less))
    };
    merge_sort(&mut order, &mut less)?;
    let mut slots: Vec<Option<Value<'a>>> = items.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect())
}

fn merge_sort<'a, F>(order: &mut Vec<usize>, less: &mut F) -> EvalResult<'a, ()>
where
    F: FnMut(usize, usize) -> EvalResult<'a, bool>,
{
    if order.len() <= 1 {
        return Ok(());
    }
    let mut right = order.split_off(order.len() / 2);
    merge_sort(order, less)?;
    merge_sort(&mut right, less)?;
    let left = std::mem::take(order);
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if less(right[j], left[i])? {
            order.push(right[j]);
            j += 1;
        } else {
            order.push(left[i]);
            i += 1;
        }
    }
    order.extend_from_slice(&left[i..]);
    order.extend_from_slice(&right[j..]);
    Ok(())
}

/// Instantiate a built-in type: `int("3")`, `list(x)`, `ValueError("m")`...
pub fn construct<'a>(
    interp: &mut Interpreter<'a>,
    kind: TypeKind,
    mut args: Args<'a>,
) -> EvalResult<'a, Value<'a>> {
    if let TypeKind::Exception(name) = kind {
        args.no_keywords()?;
        return Ok(Value::Exception(Rc::new(ExceptionValue {
            kind: name,
            args: args.positional,
        })));
    }
    if kind == TypeKind::Dict {
        args.expect(0, 1)?;
        let mut table = match args.get(0) {
            None => Table::new(),
            Some(Value::Dict(source)) => source.borrow().clone(),
            Some(iterable) => {
                let mut table = Table::new();
                for pair in interp.collect(iterable)? {
                    let items = interp.collect(&pair)?;
                    if items.len() != 2 {
                        return value_error(format!(
                            "dictionary update sequence element has length {}; 2 is required",
                            items.len()
                        ));
                    }
                    let mut items = items.into_iter();
                    let (k, v) = (items.next().unwrap_or(Value::None), items.next().unwrap_or(Value::None));
                    if let Err(type_name) = table.insert(k, v) {
                        return unhashable(type_name);
                    }
                }
                table
            }
        };
        for (key, value) in std::mem::take(&mut args.keywords) {
            if let Err(type_name) = table.insert(Value::str(key), value) {
                return unhashable(type_name);
            }
        }
        return Ok(Value::dict(table));
    }
    let base = args.take_keyword("base");
    args.no_keywords()?;
    match kind {
        TypeKind::Int => {
            args.expect(0, 2)?;
            let base = match base.as_ref().or(args.get(1)) {
                Some(b) => Some(int_index(b)?),
                None => None,
            };
            match (args.get(0), base) {
                (None, _) => Ok(Value::int(0)),
                (Some(Value::Str(text)), base) => {
                    let base = base.and_then(|b| b.to_u32()).unwrap_or(10);
                    parse_int(text, base).map(Value::Int)
                }
                (Some(_), Some(_)) => type_error("int() can't convert non-string with explicit base"),
                (Some(Value::Float(f)), None) => {
                    if f.is_nan() {
                        return value_error("cannot convert float NaN to integer");
                    }
                    if f.is_infinite() {
                        return raise("OverflowError", "cannot convert float infinity to integer");
                    }
                    Ok(Value::Int(BigInt::from_f64(f.trunc()).unwrap_or_default()))
                }
                (Some(v), None) => match v.as_int() {
                    Some(n) => Ok(Value::Int(n)),
                    None => type_error(format!(
                        "int() argument must be a string, a bytes-like object or a real number, not '{}'",
                        v.type_name()
                    )),
                },
            }
        }
        TypeKind::Float => {
            args.expect(0, 1)?;
            match args.get(0) {
                None => Ok(Value::Float(0.0)),
                Some(Value::Float(f)) => Ok(Value::Float(*f)),
                Some(Value::Str(text)) => parse_float(text).map(Value::Float),
                Some(v) => match v.as_int() {
                    Some(n) => Ok(Value::Float(int_to_f64(&n)?)),
                    None => type_error(format!(
                        "float() argument must be a string or a real number, not '{}'",
                        v.type_name()
                    )),
                },
            }
        }
        TypeKind::Str => {
            args.expect(0, 3)?;
            match (args.get(0), args.get(1)) {
                (None, _) => Ok(Value::str("")),
                (Some(v @ (Value::Bytes(_) | Value::ByteArray(_))), Some(_)) => {
                    decode_utf8(&v.byte_content().unwrap_or_else(|| Rc::from(Vec::new())))
                }
                (Some(v), _) => Ok(Value::str(v.to_str())),
            }
        }
        TypeKind::Bool => {
            args.expect(0, 1)?;
            Ok(Value::Bool(args.get(0).is_some_and(Value::truthy)))
        }
        TypeKind::Bytes | TypeKind::ByteArray => {
            let data = bytes_from(interp, &args)?;
            Ok(match kind {
                TypeKind::ByteArray => Value::bytearray(data),
                _ => Value::Bytes(data.into()),
            })
        }
        TypeKind::List | TypeKind::Tuple | TypeKind::Set | TypeKind::FrozenSet => {
            args.expect(0, 1)?;
            let items = match args.get(0) {
                Some(iterable) => interp.collect(iterable)?,
                None => Vec::new(),
            };
            match kind {
                TypeKind::List => Ok(Value::list(items)),
                TypeKind::Tuple => Ok(Value::tuple(items)),
                TypeKind::Set => set_from(items),
                _ => Ok(match set_from(items)? {
                    Value::Set(table) => Value::FrozenSet(table),
                    other => other,
                }),
            }
        }
        TypeKind::Range => {
            args.expect(1, 3)?;
            let (start, stop, step) = match args.positional.len() {
                1 => (BigInt::zero(), args.int_arg(0)?, BigInt::one()),
                2 => (args.int_arg(0)?, args.int_arg(1)?, BigInt::one()),
                _ => (args.int_arg(0)?, args.int_arg(1)?, args.int_arg(2)?),
            };
            if step.is_zero() {
                return value_error("range() arg 3 must not be zero");
            }
            Ok(Value::Range(Rc::new(RangeValue { start, stop, step })))
        }
        TypeKind::Slice => {
            args.expect(1, 3)?;
            let (lower, upper, step) = match args.positional.len() {
                1 => (Value::None, args.positional[0].clone(), Value::None),
                2 => (args.positional[0].clone(), args.positional[1].clone(), Value::None),
                _ => (
                    args.positional[0].clone(),
                    args.positional[1].clone(),
                    args.positional[2].clone(),
                ),
            };
            Ok(Value::Slice(Rc::new(SliceValue { lower, upper, step })))
        }
        TypeKind::Type => {
            args.expect(1, 1)?;
            Ok(Value::Type(args.first().type_of()))
        }
        TypeKind::NoneType => Ok(Value::None),
        other => Err(Fault::Unsupported(format!("instances of `{}`", other.name())).into()),
    }
}

/// Contents for `bytes(...)` and `bytearray(...)`.
fn bytes_from<'a>(interp: &mut Interpreter<'a>, args: &Args<'a>) -> EvalResult<'a, Vec<u8>> {
    args.expect(0, 3)?;
    match args.get(0) {
        None => Ok(Vec::new()),
        Some(Value::Str(text)) => match args.get(1) {
            Some(_) => Ok(text.as_bytes().to_vec()),
            None => type_error("string argument without an encoding"),
        },
        Some(Value::Int(n)) => {
            if n.is_negative() {
                return value_error("negative count");
            }
            let len = n.to_usize().unwrap_or(usize::MAX);
            interp.budget().check_len(len)?;
            Ok(vec![0u8; len])
        }
        Some(iterable) => {
            let mut out = Vec::new();
            for item in interp.collect(iterable)? {
                out.push(byte_of(&item)?);
            }
            Ok(out)
        }
    }
}

fn byte_of<'a>(item: &Value<'a>) -> EvalResult<'a, u8> {
    match item.as_i64() {
        Some(b @ 0..=255) => Ok(b as u8),
        Some(_) => value_error("byte must be in range(0, 256)"),
        None => type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            item.type_name()
        )),
    }
}

pub fn set_from<'a>(items: Vec<Value<'a>>) -> EvalResult<'a, Value<'a>> {
    let mut table = Table::new();
    for item in items {
        if let Err(type_name) = table.insert(item, Value::None) {
            return unhashable(type_name);
        }
    }
    Ok(Value::set(table))
}

fn decode_utf8<'a>(bytes: &[u8]) -> EvalResult<'a, Value<'a>> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(Value::str(text)),
        Err(e) => raise(
            "UnicodeError",
            format!("'utf-8' codec can't decode byte at position {}", e.valid_up_to()),
        ),
    }
}

/// `int(text, base)`.
pub fn parse_int<'a>(text: &str, base: u32) -> EvalResult<'a, BigInt> {
    let invalid = || -> EvalResult<'a, BigInt> {
        value_error(format!(
            "invalid literal for int() with base {}: {}",
            base,
            Value::str(text).repr()
        ))
    };
    if base == 1 || base > 36 {
        return value_error("int() base must be >= 2 and <= 36, or 0");
    }
    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let lower = unsigned.to_ascii_lowercase();
    let (base, digits) = match base {
        0 => {
            if let Some(rest) = lower.strip_prefix("0x") {
                (16, rest)
            } else if let Some(rest) = lower.strip_prefix("0o") {
                (8, rest)
            } else if let Some(rest) = lower.strip_prefix("0b") {
                (2, rest)
            } else {
                // Decimal literals cannot carry leading zeros.
                if lower.starts_with('0') && lower.chars().any(|c| c != '0' && c != '_') {
                    return invalid();
                }
                (10, lower.as_str())
            }
        }
        16 => (16, lower.strip_prefix("0x").unwrap_or(&lower)),
        8 => (8, lower.strip_prefix("0o").unwrap_or(&lower)),
        2 => (2, lower.strip_prefix("0b").unwrap_or(&lower)),
        other => (other, lower.as_str()),
    };
    // `0x_ff` is valid: one underscore may follow a base prefix.
    let digits = if digits.len() < lower.len() {
        digits.strip_prefix('_').unwrap_or(digits)
    } else {
        digits
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__")
    {
        return invalid();
    }
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    match BigInt::parse_bytes(cleaned.as_bytes(), base) {
        Some(n) => Ok(if negative { -n } else { n }),
        None => invalid(),
    }
}

/// `float(text)`.
pub fn parse_float<'a>(text: &str) -> EvalResult<'a, f64> {
    let trimmed = text.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let unsigned = lowered.trim_start_matches(['+', '-']);
    let negative = lowered.starts_with('-');
    let special = match unsigned {
        "inf" | "infinity" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    };
    if let Some(value) = special {
        if lowered.len() - unsigned.len() <= 1 {
            return Ok(if negative { -value } else { value });
        }
    }
    let valid_underscores = !trimmed.starts_with('_')
        && !trimmed.ends_with('_')
        && !trimmed.contains("__")
        && trimmed
            .char_indices()
            .filter(|(_, c)| *c == '_')
            .all(|(i, _)| {
                let bytes = trimmed.as_bytes();
                i > 0 && bytes[i - 1].is_ascii_digit() && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)
            });
    let cleaned: String = trimmed.chars().filter(|&c| c != '_').collect();
    match cleaned.parse::<f64>() {
        Ok(value) if valid_underscores && !cleaned.is_empty() && !unsigned.starts_with(['i', 'n']) => Ok(value),
        _ => value_error(format!(
            "could not convert string to float: {}",
            Value::str(text).repr()
        )),
    }
}

const STR_METHODS: &[&str] = &[
    "upper", "lower", "casefold", "strip", "lstrip", "rstrip", "split", "rsplit", "splitlines",
    "join", "replace", "startswith", "endswith", "find", "rfind", "index", "rindex", "count",
    "isdigit", "isdecimal", "isnumeric", "isalpha", "isalnum", "isspace", "isupper", "islower",
    "title", "capitalize", "swapcase", "zfill", "center", "ljust", "rjust", "format", "encode",
    "partition", "rpartition", "removeprefix", "removesuffix",
];
const BYTES_METHODS: &[&str] = &["decode", "hex", "count", "startswith", "endswith"];
const BYTEARRAY_METHODS: &[&str] = &[
    "decode", "hex", "count", "startswith", "endswith", "append", "extend", "pop", "clear",
];
const LIST_METHODS: &[&str] = &[
    "append", "extend", "insert", "pop", "remove", "index", "count", "sort", "reverse", "copy",
    "clear",
];
const TUPLE_METHODS: &[&str] = &["index", "count"];
const DICT_METHODS: &[&str] = &[
    "get", "keys", "values", "items", "pop", "popitem", "setdefault", "update", "copy", "clear",
];
const SET_METHODS: &[&str] = &[
    "add", "discard", "remove", "pop", "union", "intersection", "difference",
    "symmetric_difference", "update", "issubset", "issuperset", "isdisjoint", "copy", "clear",
];
const FROZENSET_METHODS: &[&str] = &[
    "union", "intersection", "difference", "symmetric_difference", "issubset", "issuperset",
    "isdisjoint", "copy",
];
const INT_METHODS: &[&str] = &["bit_length", "bit_count", "conjugate"];
const FLOAT_METHODS: &[&str] = &["is_integer", "conjugate"];

/// True when `receiver.name` is a supported method.
pub fn has_method(receiver: &Value<'_>, name: &str) -> bool {
    let table = match receiver {
        Value::Str(_) => STR_METHODS,
        Value::Bytes(_) => BYTES_METHODS,
        Value::ByteArray(_) => BYTEARRAY_METHODS,
        Value::List(_) => LIST_METHODS,
        Value::Tuple(_) => TUPLE_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Set(_) => SET_METHODS,
        Value::FrozenSet(_) => FROZENSET_METHODS,
        Value::Int(_) | Value::Bool(_) => INT_METHODS,
        Value::Float(_) => FLOAT_METHODS,
        _ => return false,
    };
    table.contains(&name)
}

pub fn call_method<'a>(
    interp: &mut Interpreter<'a>,
    receiver: &Value<'a>,
    method: &str,
    mut args: Args<'a>,
) -> EvalResult<'a, Value<'a>> {
    match receiver {
        Value::Str(s) => {
            if method == "format" {
                return Ok(Value::str(str_format(interp.budget(), s, &args.positional, &args.keywords)?));
            }
            if matches!(method, "split" | "rsplit") && !args.keywords.is_empty() {
                let sep = args.take_keyword("sep");
                let maxsplit = args.take_keyword("maxsplit");
                let mut positional = std::mem::take(&mut args.positional).into_iter();
                let sep = sep.or_else(|| positional.next()).unwrap_or(Value::None);
                let maxsplit = maxsplit.or_else(|| positional.next()).unwrap_or(Value::int(-1));
                args.positional = vec![sep, maxsplit];
            }
            args.no_keywords()?;
            str_method(interp, s, method, &args)
        }
        Value::Bytes(b) => {
            args.no_keywords()?;
            bytes_method(b, method, &args)
        }
        Value::ByteArray(data) => {
            args.no_keywords()?;
            bytearray_method(interp, data, method, &args)
        }
        Value::List(items) => list_method(interp, items, method, args),
        Value::Tuple(items) => {
            args.no_keywords()?;
            sequence_search(&items[..], method, &args, "tuple")
        }
        Value::Dict(table) => dict_method(interp, table, method, args),
        Value::Set(table) | Value::FrozenSet(table) => {
            args.no_keywords()?;
            let frozen = matches!(receiver, Value::FrozenSet(_));
            set_method(interp, table, frozen, method, &args)
        }
        Value::Int(_) | Value::Bool(_) => {
            args.no_keywords()?;
            args.expect(0, 0)?;
            let n = receiver.as_int().unwrap_or_default();
            match method {
                "bit_length" => Ok(Value::int(n.bits())),
                "bit_count" => Ok(Value::int(n.magnitude().count_ones())),
                _ => Ok(Value::Int(n)),
            }
        }
        Value::Float(f) => {
            args.no_keywords()?;
            args.expect(0, 0)?;
            match method {
                "is_integer" => Ok(Value::Bool(f.is_finite() && f.fract() == 0.0)),
                _ => Ok(Value::Float(*f)),
            }
        }
        other => raise(
            "AttributeError",
            format!("'{}' object has no attribute '{}'", other.type_name(), method),
        ),
    }
}

fn str_arg<'a>(args: &Args<'a>, index: usize) -> EvalResult<'a, Option<Rc<str>>> {
    match args.get(index) {
        None | Some(Value::None) => Ok(None),
        Some(Value::Str(s)) => Ok(Some(Rc::clone(s))),
        Some(other) => type_error(format!(
            "{}() argument {} must be str or None, not {}",
            args.name,
            index + 1,
            other.type_name()
        )),
    }
}

fn char_index(s: &str, byte: usize) -> usize {
    s[..byte].chars().count()
}

/// Byte range of the characters `start..end` (Python indices, clamped).
fn char_window<'a>(s: &str, args: &Args<'a>, first: usize) -> EvalResult<'a, (usize, usize)> {
    let len = s.chars().count();
    let bound = |index: usize, default: usize| -> EvalResult<'a, usize> {
        match args.get(index) {
            None | Some(Value::None) => Ok(default),
            Some(v) => {
                let n = int_index(v)?;
                let n = n.to_i64().unwrap_or(if n.is_negative() { i64::MIN } else { i64::MAX });
                let adjusted = if n < 0 { n.saturating_add(len as i64) } else { n };
                Ok(adjusted.clamp(0, len as i64) as usize)
            }
        }
    };
    let start = bound(first, 0)?;
    let end = bound(first + 1, len)?;
    let to_byte = |chars: usize| s.char_indices().nth(chars).map(|(b, _)| b).unwrap_or(s.len());
    Ok((to_byte(start), to_byte(end.max(start))))
}

fn str_method<'a>(
    interp: &mut Interpreter<'a>,
    s: &Rc<str>,
    method: &str,
    args: &Args<'a>,
) -> EvalResult<'a, Value<'a>> {
    let text: &str = s;
    match method {
        "upper" => Ok(Value::str(text.to_uppercase())),
        "lower" | "casefold" => Ok(Value::str(text.to_lowercase())),
        "swapcase" => Ok(Value::str(
            text.chars()
                .map(|c| {
                    if c.is_uppercase() {
                        c.to_lowercase().collect::<String>()
                    } else {
                        c.to_uppercase().collect::<String>()
                    }
                })
                .collect::<String>(),
        )),
        "title" => {
            let mut out = String::new();
            let mut previous_cased = false;
            for c in text.chars() {
                if previous_cased {
                    out.extend(c.to_lowercase());
                } else {
                    out.extend(c.to_uppercase());
                }
                previous_cased = c.is_alphabetic();
            }
            Ok(Value::str(out))
        }
        "capitalize" => {
            let mut chars = text.chars();
            let out = match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            };
            Ok(Value::str(out))
        }
        "strip" | "lstrip" | "rstrip" => {
            args.expect(0, 1)?;
            let chars = str_arg(args, 0)?;
            let matcher = |c: char| match &chars {
                Some(set) => set.contains(c),
                None => c.is_whitespace(),
            };
            let out = match method {
                "strip" => text.trim_matches(matcher),
                "lstrip" => text.trim_start_matches(matcher),
                _ => text.trim_end_matches(matcher),
            };
            Ok(Value::str(out))
        }
        "split" | "rsplit" => {
            args.expect(0, 2)?;
            let sep = str_arg(args, 0)?;
            let maxsplit = match args.get(1) {
                Some(v) => int_index(v)?.to_i64().unwrap_or(-1),
                None => -1,
            };
            let parts = split(text, sep.as_deref(), maxsplit, method == "rsplit")?;
            interp.budget().check_len(parts.len())?;
            Ok(Value::list(parts.into_iter().map(Value::str).collect()))
        }
        "splitlines" => Ok(Value::list(text.lines().map(Value::str).collect())),
        "join" => {
            args.expect(1, 1)?;
            let items = interp.collect(args.first())?;
            let mut parts = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Str(part) => parts.push(part.to_string()),
                    other => {
                        return type_error(format!(
                            "sequence item {}: expected str instance, {} found",
                            i,
                            other.type_name()
                        ))
                    }
                }
            }
            let joined = parts.join(text);
            interp.budget().check_len(joined.len())?;
            Ok(Value::str(joined))
        }
        "replace" => {
            args.expect(2, 3)?;
            let (Some(old), Some(new)) = (str_arg(args, 0)?, str_arg(args, 1)?) else {
                return type_error("replace() arguments must be str");
            };
            let count = match args.get(2) {
                Some(v) => int_index(v)?.to_i64().unwrap_or(-1),
                None => -1,
            };
            let out = if count < 0 {
                text.replace(old.as_ref(), &new)
            } else {
                text.replacen(old.as_ref(), &new, count as usize)
            };
            interp.budget().check_len(out.len())?;
            Ok(Value::str(out))
        }
        "startswith" | "endswith" => {
            args.expect(1, 3)?;
            let (lo, hi) = char_window(text, args, 1)?;
            let window = &text[lo..hi];
            let candidates = match args.first() {
                Value::Str(p) => vec![Rc::clone(p)],
                Value::Tuple(items) => {
                    let mut out = Vec::new();
                    for item in items.iter() {
                        match item {
                            Value::Str(p) => out.push(Rc::clone(p)),
                            other => {
                                return type_error(format!(
                                    "tuple for {} must only contain str, not {}",
                                    method,
                                    other.type_name()
                                ))
                            }
                        }
                    }
                    out
                }
                other => {
                    return type_error(format!(
                        "{} first arg must be str or a tuple of str, not {}",
                        method,
                        other.type_name()
                    ))
                }
            };
            Ok(Value::Bool(candidates.iter().any(|p| {
                if method == "startswith" {
                    window.starts_with(p.as_ref())
                } else {
                    window.ends_with(p.as_ref())
                }
            })))
        }
        "find" | "rfind" | "index" | "rindex" | "count" => {
            args.expect(1, 3)?;
            let Some(needle) = str_arg(args, 0)? else {
                return type_error(format!("{}() argument must be str", method));
            };
            let (lo, hi) = char_window(text, args, 1)?;
            let window = &text[lo..hi];
            if method == "count" {
                let count = if needle.is_empty() {
                    window.chars().count() + 1
                } else {
                    window.matches(needle.as_ref()).count()
                };
                return Ok(Value::int(count));
            }
            let found = if method.starts_with('r') {
                window.rfind(needle.as_ref())
            } else {
                window.find(needle.as_ref())
            };
            match found {
                Some(byte) => Ok(Value::int(char_index(text, lo + byte))),
                None if method.ends_with("index") => value_error("substring not found"),
                None => Ok(Value::int(-1)),
            }
        }
        "isdigit" | "isdecimal" | "isnumeric" => Ok(Value::Bool(
            !text.is_empty() && text.chars().all(|c| c.is_ascii_digit() || c.is_numeric()),
        )),
        "isalpha" => Ok(Value::Bool(!text.is_empty() && text.chars().all(char::is_alphabetic))),
        "isalnum" => Ok(Value::Bool(!text.is_empty() && text.chars().all(char::is_alphanumeric))),
        "isspace" => Ok(Value::Bool(!text.is_empty() && text.chars().all(char::is_whitespace))),
        "isupper" | "islower" => {
            let cased: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
            let check = if method == "isupper" {
                cased.iter().all(|c| !c.is_lowercase())
            } else {
                cased.iter().all(|c| !c.is_uppercase())
            };
            Ok(Value::Bool(!cased.is_empty() && check))
        }
        "zfill" | "center" | "ljust" | "rjust" => {
            args.expect(1, 2)?;
            let width = int_index(args.first())?.to_usize().unwrap_or(0);
            interp.budget().check_len(width)?;
            let fill = match str_arg(args, 1)? {
                Some(f) if f.chars().count() == 1 => f.chars().next().unwrap_or(' '),
                Some(_) => return type_error("The fill character must be exactly one character long"),
                None => ' ',
            };
            let len = text.chars().count();
            if len >= width {
                return Ok(Value::Str(Rc::clone(s)));
            }
            let pad = width - len;
            let repeat = |n: usize| fill.to_string().repeat(n);
            let out = match method {
                "zfill" => {
                    let (sign, rest) = match text.chars().next() {
                        Some(c @ ('+' | '-')) => (c.to_string(), &text[1..]),
                        _ => (String::new(), text),
                    };
                    format!("{}{}{}", sign, "0".repeat(pad), rest)
                }
                "ljust" => format!("{}{}", text, repeat(pad)),
                "rjust" => format!("{}{}", repeat(pad), text),
                _ => {
                    let left = pad / 2 + (pad & width & 1);
                    format!("{}{}{}", repeat(left), text, repeat(pad - left))
                }
            };
            Ok(Value::str(out))
        }
        "encode" => Ok(Value::Bytes(text.as_bytes().to_vec().into())),
        "partition" | "rpartition" => {
            args.expect(1, 1)?;
            let Some(sep) = str_arg(args, 0)? else {
                return type_error("must be str");
            };
            if sep.is_empty() {
                return value_error("empty separator");
            }
            let found = if method == "partition" {
                text.find(sep.as_ref())
            } else {
                text.rfind(sep.as_ref())
            };
            let parts = match found {
                Some(at) => [&text[..at], &sep[..], &text[at + sep.len()..]],
                None if method == "partition" => [text, "", ""],
                None => ["", "", text],
            };
            Ok(Value::tuple(parts.iter().map(|p| Value::str(*p)).collect()))
        }
        "removeprefix" | "removesuffix" => {
            args.expect(1, 1)?;
            let affix = str_arg(args, 0)?.unwrap_or_else(|| Rc::from(""));
            let out = if method == "removeprefix" {
                text.strip_prefix(affix.as_ref()).unwrap_or(text)
            } else {
                text.strip_suffix(affix.as_ref()).unwrap_or(text)
            };
            Ok(Value::str(out))
        }
        other => raise(
            "AttributeError",
            format!("'str' object has no attribute '{}'", other),
        ),
    }
}

fn split<'a>(text: &str, sep: Option<&str>, maxsplit: i64, from_right: bool) -> EvalResult<'a, Vec<String>> {
    let limit = if maxsplit < 0 { usize::MAX } else { maxsplit as usize };
    match sep {
        Some("") => value_error("empty separator"),
        Some(sep) => {
            let mut parts: Vec<String> = if from_right {
                text.rsplitn(limit.saturating_add(1), sep).map(String::from).collect()
            } else {
                text.splitn(limit.saturating_add(1), sep).map(String::from).collect()
            };
            if from_right {
                parts.reverse();
            }
            Ok(parts)
        }
        None => {
            let words: Vec<&str> = text.split_whitespace().collect();
            if words.len() <= limit.saturating_add(1) || limit == usize::MAX {
                return Ok(words.into_iter().map(String::from).collect());
            }
            if from_right {
                let kept = words.len() - limit;
                let mut parts = vec![head_of(text, kept)];
                parts.extend(words[kept..].iter().map(|w| w.to_string()));
                Ok(parts)
            } else {
                let mut parts: Vec<String> = words[..limit].iter().map(|w| w.to_string()).collect();
                parts.push(tail_after(text, limit));
                Ok(parts)
            }
        }
    }
}

/// Remainder of `text` after skipping `count` whitespace-separated words.
fn tail_after(text: &str, count: usize) -> String {
    let mut rest = text.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest.to_string()
}

/// Prefix of `text` up to the end of its first `count` words.
fn head_of(text: &str, count: usize) -> String {
    let mut end = 0;
    let mut rest = text;
    for _ in 0..count {
        let trimmed = rest.trim_start();
        let word_end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        end += rest.len() - trimmed.len() + word_end;
        rest = &trimmed[word_end..];
    }
    text[..end].to_string()
}

fn bytes_method<'a>(bytes: &Rc<[u8]>, method: &str, args: &Args<'a>) -> EvalResult<'a, Value<'a>> {
    match method {
        "decode" => decode_utf8(bytes),
        "hex" => Ok(Value::str(
            bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>(),
        )),
        "count" | "startswith" | "endswith" => {
            args.expect(1, 1)?;
            let Some(needle) = args.first().byte_content() else {
                return type_error("a bytes-like object is required");
            };
            Ok(match method {
                "count" if needle.is_empty() => Value::int(bytes.len() + 1),
                "count" => Value::int(
                    bytes
                        .windows(needle.len())
                        .filter(|w| *w == needle.as_ref())
                        .count(),
                ),
                "startswith" => Value::Bool(bytes.starts_with(&needle)),
                _ => Value::Bool(bytes.ends_with(&needle)),
            })
        }
        other => raise(
            "AttributeError",
            format!("'bytes' object has no attribute '{}'", other),
        ),
    }
}

fn bytearray_method<'a>(
    interp: &mut Interpreter<'a>,
    data: &Rc<std::cell::RefCell<Vec<u8>>>,
    method: &str,
    args: &Args<'a>,
) -> EvalResult<'a, Value<'a>> {
    match method {
        "append" => {
            args.expect(1, 1)?;
            let byte = byte_of(args.first())?;
            data.borrow_mut().push(byte);
            interp.budget().check_len(data.borrow().len())?;
            Ok(Value::None)
        }
        "extend" => {
            args.expect(1, 1)?;
            let mut added = Vec::new();
            for item in interp.collect(args.first())? {
                added.push(byte_of(&item)?);
            }
            data.borrow_mut().extend(added);
            interp.budget().check_len(data.borrow().len())?;
            Ok(Value::None)
        }
        "pop" => {
            args.expect(0, 0)?;
            match data.borrow_mut().pop() {
                Some(byte) => Ok(Value::int(byte)),
                None => raise("IndexError", "pop from empty bytearray"),
            }
        }
        "clear" => {
            data.borrow_mut().clear();
            Ok(Value::None)
        }
        _ => {
            let snapshot: Rc<[u8]> = data.borrow().as_slice().into();
            bytes_method(&snapshot, method, args)
        }
    }
}

fn sequence_search<'a>(
    items: &[Value<'a>],
    method: &str,
    args: &Args<'a>,
    type_name: &str,
) -> EvalResult<'a, Value<'a>> {
    args.expect(1, 1)?;
    let needle = args.first();
    match method {
        "count" => Ok(Value::int(items.iter().filter(|v| py_eq(v, needle)).count())),
        "index" => match items.iter().position(|v| py_eq(v, needle)) {
            Some(i) => Ok(Value::int(i)),
            None => value_error(format!("{}.index(x): x not in {}", type_name, type_name)),
        },
        other => raise(
            "AttributeError",
            format!("'{}' object has no attribute '{}'", type_name, other),
        ),
    }
}

fn list_method<'a>(
    interp: &mut Interpreter<'a>,
    list: &Rc<std::cell::RefCell<Vec<Value<'a>>>>,
    method: &str,
    mut args: Args<'a>,
) -> EvalResult<'a, Value<'a>> {
    if method == "sort" {
        let key = args.take_keyword("key");
        let reverse = args.take_keyword("reverse").is_some_and(|v| v.truthy());
        args.no_keywords()?;
        args.expect(0, 0)?;
        let items = std::mem::take(&mut *list.borrow_mut());
        let sorted = sort_values(interp, items, key, reverse)?;
        *list.borrow_mut() = sorted;
        return Ok(Value::None);
    }
    args.no_keywords()?;
    match method {
        "append" => {
            args.expect(1, 1)?;
            let len = list.borrow().len();
            interp.budget().check_len(len + 1)?;
            list.borrow_mut().push(args.first().clone());
            Ok(Value::None)
        }
        "extend" => {
            args.expect(1, 1)?;
            let items = interp.collect(args.first())?;
            let len = list.borrow().len();
            interp.budget().check_len(len + items.len())?;
            list.borrow_mut().extend(items);
            Ok(Value::None)
        }
        "insert" => {
            args.expect(2, 2)?;
            let index = args.int_arg(0)?;
            let mut items = list.borrow_mut();
            let len = items.len() as i64;
            let index = index.to_i64().unwrap_or(if index.is_negative() { i64::MIN } else { i64::MAX });
            let position = if index < 0 { (index.saturating_add(len)).max(0) } else { index.min(len) };
            interp.budget().check_len(items.len() + 1)?;
            items.insert(position as usize, args.positional[1].clone());
            Ok(Value::None)
        }
        "pop" => {
            args.expect(0, 1)?;
            let mut items = list.borrow_mut();
            if items.is_empty() {
                return raise("IndexError", "pop from empty list");
            }
            let index = match args.get(0) {
                Some(v) => int_index(v)?,
                None => BigInt::from(-1),
            };
            match normalize_index(&index, items.len()) {
                Some(i) => Ok(items.remove(i)),
                None => raise("IndexError", "pop index out of range"),
            }
        }
        "remove" => {
            args.expect(1, 1)?;
            let mut items = list.borrow_mut();
            match items.iter().position(|v| py_eq(v, args.first())) {
                Some(i) => {
                    items.remove(i);
                    Ok(Value::None)
                }
                None => value_error("list.remove(x): x not in list"),
            }
        }
        "index" | "count" => {
            let items = list.borrow().clone();
            match sequence_search(&items, method, &args, "list") {
                Err(_) if method == "index" => {
                    value_error(format!("{} is not in list", args.first().repr()))
                }
                other => other,
            }
        }
        "reverse" => {
            list.borrow_mut().reverse();
            Ok(Value::None)
        }
        "copy" => Ok(Value::list(list.borrow().clone())),
        "clear" => {
            list.borrow_mut().clear();
            Ok(Value::None)
        }
        other => raise(
            "AttributeError",
            format!("'list' object has no attribute '{}'", other),
        ),
    }
}

fn dict_method<'a>(
    interp: &mut Interpreter<'a>,
    table: &Rc<std::cell::RefCell<Table<'a>>>,
    method: &str,
    mut args: Args<'a>,
) -> EvalResult<'a, Value<'a>> {
    if method == "update" {
        args.expect(0, 1)?;
        let keywords = std::mem::take(&mut args.keywords);
        let mut pairs = Vec::new();
        match args.get(0) {
            Some(Value::Dict(other)) => {
                pairs.extend(other.borrow().iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Some(iterable) => {
                for pair in interp.collect(iterable)? {
                    let items = interp.collect(&pair)?;
                    if items.len() != 2 {
                        return value_error(format!(
                            "dictionary update sequence element has length {}; 2 is required",
                            items.len()
                        ));
                    }
                    pairs.push((items[0].clone(), items[1].clone()));
                }
            }
            None => {}
        }
        pairs.extend(keywords.into_iter().map(|(k, v)| (Value::str(k), v)));
        let mut table = table.borrow_mut();
        for (k, v) in pairs {
            if let Err(type_name) = table.insert(k, v) {
                return unhashable(type_name);
            }
        }
        interp.budget().check_len(table.len())?;
        return Ok(Value::None);
    }
    args.no_keywords()?;
    let lookup_error = |type_name| unhashable::<Value<'a>>(type_name);
    match method {
        "get" => {
            args.expect(1, 2)?;
            let found = table.borrow().get(args.first()).map(|v| v.cloned());
            match found {
                Ok(Some(v)) => Ok(v),
                Ok(None) => Ok(args.get(1).cloned().unwrap_or(Value::None)),
                Err(type_name) => lookup_error(type_name),
            }
        }
        "keys" => Ok(Value::list(table.borrow().keys().cloned().collect())),
        "values" => Ok(Value::list(table.borrow().values().cloned().collect())),
        "items" => Ok(Value::list(
            table
                .borrow()
                .iter()
                .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
                .collect(),
        )),
        "pop" => {
            args.expect(1, 2)?;
            let removed = table.borrow_mut().remove(args.first());
            match removed {
                Ok(Some((_, v))) => Ok(v),
                Ok(None) => match args.get(1) {
                    Some(default) => Ok(default.clone()),
                    None => key_error(args.first().clone()),
                },
                Err(type_name) => lookup_error(type_name),
            }
        }
        "popitem" => match table.borrow_mut().pop_last() {
            Some((k, v)) => Ok(Value::tuple(vec![k, v])),
            None => raise("KeyError", "popitem(): dictionary is empty"),
        },
        "setdefault" => {
            args.expect(1, 2)?;
            let default = args.get(1).cloned().unwrap_or(Value::None);
            let existing = table.borrow().get(args.first()).map(|v| v.cloned());
            match existing {
                Ok(Some(v)) => Ok(v),
                Ok(None) => {
                    if let Err(type_name) =
                        table.borrow_mut().insert(args.first().clone(), default.clone())
                    {
                        return lookup_error(type_name);
                    }
                    Ok(default)
                }
                Err(type_name) => lookup_error(type_name),
            }
        }
        "copy" => Ok(Value::dict(table.borrow().clone())),
        "clear" => {
            table.borrow_mut().clear();
            Ok(Value::None)
        }
        other => raise(
            "AttributeError",
            format!("'dict' object has no attribute '{}'", other),
        ),
    }
}

fn set_method<'a>(
    interp: &mut Interpreter<'a>,
    table: &Rc<std::cell::RefCell<Table<'a>>>,
    frozen: bool,
    method: &str,
    args: &Args<'a>,
) -> EvalResult<'a, Value<'a>> {
    let wrap = |out: Table<'a>| {
        if frozen {
            Value::frozenset(out)
        } else {
            Value::set(out)
        }
    };
    let as_set = |interp: &mut Interpreter<'a>, value: &Value<'a>| -> EvalResult<'a, Table<'a>> {
        match value {
            Value::Set(other) | Value::FrozenSet(other) => Ok(other.borrow().clone()),
            other => match set_from(interp.collect(other)?)? {
                Value::Set(t) => Ok(t.borrow().clone()),
                _ => Ok(Table::new()),
            },
        }
    };
    let membership = |result: Result<bool, &'static str>| match result {
        Ok(found) => Ok(found),
        Err(type_name) => unhashable::<bool>(type_name),
    };
    match method {
        "add" => {
            args.expect(1, 1)?;
            if let Err(type_name) = table.borrow_mut().insert(args.first().clone(), Value::None) {
                return unhashable(type_name);
            }
            interp.budget().check_len(table.borrow().len())?;
            Ok(Value::None)
        }
        "discard" | "remove" => {
            args.expect(1, 1)?;
            let removed = table.borrow_mut().remove(args.first());
            match removed {
                Ok(Some(_)) => Ok(Value::None),
                Ok(None) if method == "remove" => key_error(args.first().clone()),
                Ok(None) => Ok(Value::None),
                Err(type_name) => unhashable(type_name),
            }
        }
        "pop" => match table.borrow_mut().pop_last() {
            Some((k, _)) => Ok(k),
            None => raise("KeyError", "pop from an empty set"),
        },
        "union" | "intersection" | "difference" | "symmetric_difference" => {
            let op = match method {
                "union" => BinOp::BitOr,
                "intersection" => BinOp::BitAnd,
                "difference" => BinOp::Sub,
                _ => BinOp::BitXor,
            };
            let mut acc = table.borrow().clone();
            for other in &args.positional {
                let other = as_set(interp, other)?;
                acc = match ops::set_combine(op, &acc, &other) {
                    Ok(t) => t,
                    Err(type_name) => return unhashable(type_name),
                };
            }
            Ok(wrap(acc))
        }
        "update" => {
            for other in &args.positional {
                for item in interp.collect(other)? {
                    if let Err(type_name) = table.borrow_mut().insert(item, Value::None) {
                        return unhashable(type_name);
                    }
                }
            }
            interp.budget().check_len(table.borrow().len())?;
            Ok(Value::None)
        }
        "issubset" | "issuperset" | "isdisjoint" => {
            args.expect(1, 1)?;
            let other = as_set(interp, args.first())?;
            let mine = table.borrow();
            let result = match method {
                "issubset" => mine.keys().all(|k| other.contains(k).unwrap_or(false)),
                "issuperset" => other.keys().all(|k| mine.contains(k).unwrap_or(false)),
                _ => {
                    let mut disjoint = true;
                    for k in mine.keys() {
                        if membership(other.contains(k))? {
                            disjoint = false;
                            break;
                        }
                    }
                    disjoint
                }
            };
            Ok(Value::Bool(result))
        }
        "copy" => Ok(wrap(table.borrow().clone())),
        "clear" => {
            table.borrow_mut().clear();
            Ok(Value::None)
        }
        other => raise(
            "AttributeError",
            format!("'set' object has no attribute '{}'", other),
        ),
    }
}
