//! Runtime values of the probe sandbox.

use crate::python::unparse::{bytes_repr, float_repr, str_repr};
use crate::sandbox::builtins::Builtin;
use crate::sandbox::eval::Closure;
use crate::sandbox::fault::Fault;
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub enum Value<'a> {
    None,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    Str(Rc<str>),
    Bytes(Rc<[u8]>),
    ByteArray(Rc<RefCell<Vec<u8>>>),
    List(Rc<RefCell<Vec<Value<'a>>>>),
    Tuple(Rc<Vec<Value<'a>>>),
    Dict(Rc<RefCell<Table<'a>>>),
    Set(Rc<RefCell<Table<'a>>>),
    FrozenSet(Rc<RefCell<Table<'a>>>),
    Range(Rc<RangeValue>),
    Iterator(Rc<RefCell<IterState<'a>>>),
    Slice(Rc<SliceValue<'a>>),
    Function(Rc<Closure<'a>>),
    Builtin(Builtin),
    Method(Rc<BoundMethod<'a>>),
    Type(TypeKind),
    Exception(Rc<ExceptionValue<'a>>),
    Ellipsis,
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

/// Built-in types visible to probed code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    ByteArray,
    List,
    Tuple,
    Dict,
    Set,
    FrozenSet,
    Range,
    Object,
    Type,
    Function,
    Iterator,
    Slice,
    Exception(&'static str),
}

impl TypeKind {
    pub fn name(self) -> &'static str {
        match self {
            TypeKind::NoneType => "NoneType",
            TypeKind::Bool => "bool",
            TypeKind::Int => "int",
            TypeKind::Float => "float",
            TypeKind::Str => "str",
            TypeKind::Bytes => "bytes",
            TypeKind::ByteArray => "bytearray",
            TypeKind::List => "list",
            TypeKind::Tuple => "tuple",
            TypeKind::Dict => "dict",
            TypeKind::Set => "set",
            TypeKind::FrozenSet => "frozenset",
            TypeKind::Range => "range",
            TypeKind::Object => "object",
            TypeKind::Type => "type",
            TypeKind::Function => "function",
            TypeKind::Iterator => "iterator",
            TypeKind::Slice => "slice",
            TypeKind::Exception(name) => name,
        }
    }

    /// True when instances of `self` are instances of `base`.
    pub fn is_subtype_of(self, base: TypeKind) -> bool {
        if self == base || base == TypeKind::Object {
            return true;
        }
        match (self, base) {
            (TypeKind::Bool, TypeKind::Int) => true,
            (TypeKind::Exception(kind), TypeKind::Exception(base)) => exception_is_subclass(kind, base),
            _ => false,
        }
    }
}

/// `(exception, parent)` pairs of the built-in exception hierarchy.
const EXCEPTION_PARENTS: &[(&str, &str)] = &[
    ("BaseException", ""),
    ("Exception", "BaseException"),
    ("SystemExit", "BaseException"),
    ("KeyboardInterrupt", "BaseException"),
    ("GeneratorExit", "BaseException"),
    ("ArithmeticError", "Exception"),
    ("ZeroDivisionError", "ArithmeticError"),
    ("OverflowError", "ArithmeticError"),
    ("FloatingPointError", "ArithmeticError"),
    ("LookupError", "Exception"),
    ("IndexError", "LookupError"),
    ("KeyError", "LookupError"),
    ("ValueError", "Exception"),
    ("UnicodeError", "ValueError"),
    ("TypeError", "Exception"),
    ("NameError", "Exception"),
    ("UnboundLocalError", "NameError"),
    ("AttributeError", "Exception"),
    ("AssertionError", "Exception"),
    ("RuntimeError", "Exception"),
    ("RecursionError", "RuntimeError"),
    ("NotImplementedError", "RuntimeError"),
    ("StopIteration", "Exception"),
    ("MemoryError", "Exception"),
    ("OSError", "Exception"),
    ("Warning", "Exception"),
    ("UserWarning", "Warning"),
    ("DeprecationWarning", "Warning"),
    ("RuntimeWarning", "Warning"),
];

/// Canonical static name of a built-in exception class.
pub fn exception_kind(name: &str) -> Option<&'static str> {
    EXCEPTION_PARENTS
        .iter()
        .find(|(kind, _)| *kind == name)
        .map(|(kind, _)| *kind)
}

fn exception_is_subclass(kind: &str, base: &str) -> bool {
    let mut current = kind;
    loop {
        if current == base {
            return true;
        }
        match EXCEPTION_PARENTS.iter().find(|(k, _)| *k == current) {
            Some((_, parent)) if !parent.is_empty() => current = parent,
            _ => return false,
        }
    }
}

pub struct ExceptionValue<'a> {
    pub kind: &'static str,
    pub args: Vec<Value<'a>>,
}

impl ExceptionValue<'_> {
    /// `str(exc)`.
    pub fn message(&self) -> String {
        match self.args.as_slice() {
            [] => String::new(),
            [key] if self.kind == "KeyError" => key.repr(),
            [only] => only.to_str(),
            many => tuple_repr(many, 0),
        }
    }
}

pub struct BoundMethod<'a> {
    pub receiver: Value<'a>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeValue {
    pub start: BigInt,
    pub stop: BigInt,
    pub step: BigInt,
}

impl RangeValue {
    pub fn len(&self) -> BigInt {
        let zero = BigInt::zero();
        let (lo, hi, step) = if self.step > zero {
            (&self.start, &self.stop, self.step.clone())
        } else {
            (&self.stop, &self.start, -self.step.clone())
        };
        if lo >= hi {
            return zero;
        }
        (hi - lo - 1u32) / step + 1u32
    }

    pub fn get(&self, index: &BigInt) -> BigInt {
        &self.start + &self.step * index
    }

    pub fn contains(&self, value: &BigInt) -> bool {
        let zero = BigInt::zero();
        let in_bounds = if self.step > zero {
            *value >= self.start && *value < self.stop
        } else {
            *value <= self.start && *value > self.stop
        };
        in_bounds && num_integer::Integer::mod_floor(&(value - &self.start), &self.step).is_zero()
    }
}

pub struct SliceValue<'a> {
    pub lower: Value<'a>,
    pub upper: Value<'a>,
    pub step: Value<'a>,
}

/// Lazy iteration state shared by iterator objects and `for` loops.
pub enum IterState<'a> {
    Range {
        next: BigInt,
        stop: BigInt,
        step: BigInt,
    },
    Items {
        items: Vec<Value<'a>>,
        pos: usize,
    },
    List {
        list: Rc<RefCell<Vec<Value<'a>>>>,
        pos: usize,
    },
}

impl<'a> IterState<'a> {
    pub fn items(items: Vec<Value<'a>>) -> Self {
        IterState::Items { items, pos: 0 }
    }

    pub fn next_value(&mut self) -> Option<Value<'a>> {
        match self {
            IterState::Range { next, stop, step } => {
                let more = if step.sign() == num_bigint::Sign::Minus {
                    *next > *stop
                } else {
                    *next < *stop
                };
                if !more {
                    return None;
                }
                let current = next.clone();
                *next += &*step;
                Some(Value::Int(current))
            }
            IterState::Items { items, pos } => {
                let value = items.get(*pos).cloned();
                *pos += 1;
                value
            }
            IterState::List { list, pos } => {
                let value = list.borrow().get(*pos).cloned();
                *pos += 1;
                value
            }
        }
    }
}

/// Hashable projection of a value. Numbers that compare equal share a key,
/// as `1`, `1.0` and `True` do in Python.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashKey {
    None,
    Int(BigInt),
    Float(u64),
    Str(Rc<str>),
    Bytes(Rc<[u8]>),
    Tuple(Vec<HashKey>),
    /// Sorted member keys, so equal frozensets hash alike.
    FrozenSet(Vec<HashKey>),
    Range(BigInt, BigInt, BigInt),
    Type(&'static str),
    Identity(usize),
    Ellipsis,
}

impl<'a> Value<'a> {
    pub fn str(text: impl Into<Rc<str>>) -> Self {
        Value::Str(text.into())
    }

    pub fn int(value: impl Into<BigInt>) -> Self {
        Value::Int(value.into())
    }

    pub fn list(items: Vec<Value<'a>>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value<'a>>) -> Self {
        Value::Tuple(Rc::new(items))
    }

    pub fn dict(table: Table<'a>) -> Self {
        Value::Dict(Rc::new(RefCell::new(table)))
    }

    pub fn set(table: Table<'a>) -> Self {
        Value::Set(Rc::new(RefCell::new(table)))
    }

    pub fn frozenset(table: Table<'a>) -> Self {
        Value::FrozenSet(Rc::new(RefCell::new(table)))
    }

    pub fn bytearray(data: Vec<u8>) -> Self {
        Value::ByteArray(Rc::new(RefCell::new(data)))
    }

    /// Member table of a `set` or `frozenset`.
    pub fn set_table(&self) -> Option<&Rc<RefCell<Table<'a>>>> {
        match self {
            Value::Set(table) | Value::FrozenSet(table) => Some(table),
            _ => None,
        }
    }

    /// Contents of a `bytes` or `bytearray`.
    pub fn byte_content(&self) -> Option<Rc<[u8]>> {
        match self {
            Value::Bytes(b) => Some(Rc::clone(b)),
            Value::ByteArray(b) => Some(b.borrow().as_slice().into()),
            _ => None,
        }
    }

    pub fn iterator(state: IterState<'a>) -> Self {
        Value::Iterator(Rc::new(RefCell::new(state)))
    }

    pub fn type_of(&self) -> TypeKind {
        match self {
            Value::None => TypeKind::NoneType,
            Value::Bool(_) => TypeKind::Bool,
            Value::Int(_) => TypeKind::Int,
            Value::Float(_) => TypeKind::Float,
            Value::Str(_) => TypeKind::Str,
            Value::Bytes(_) => TypeKind::Bytes,
            Value::ByteArray(_) => TypeKind::ByteArray,
            Value::List(_) => TypeKind::List,
            Value::Tuple(_) => TypeKind::Tuple,
            Value::Dict(_) => TypeKind::Dict,
            Value::Set(_) => TypeKind::Set,
            Value::FrozenSet(_) => TypeKind::FrozenSet,
            Value::Range(_) => TypeKind::Range,
            Value::Iterator(_) => TypeKind::Iterator,
            Value::Slice(_) => TypeKind::Slice,
            Value::Function(_) | Value::Builtin(_) | Value::Method(_) => TypeKind::Function,
            Value::Type(_) => TypeKind::Type,
            Value::Exception(exc) => TypeKind::Exception(exc.kind),
            Value::Ellipsis => TypeKind::Object,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Method(_) => "builtin_function_or_method",
            Value::Ellipsis => "ellipsis",
            other => other.type_of().name(),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => !n.is_zero(),
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::ByteArray(b) => !b.borrow().is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(table) | Value::Set(table) | Value::FrozenSet(table) => {
                table.borrow().len() > 0
            }
            Value::Range(range) => !range.len().is_zero(),
            _ => true,
        }
    }

    /// Integer view of `int` and `bool` values.
    pub fn as_int(&self) -> Option<BigInt> {
        match self {
            Value::Int(n) => Some(n.clone()),
            Value::Bool(b) => Some(BigInt::from(*b as u8)),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_int().and_then(|n| n.to_i64())
    }

    pub fn hash_key(&self) -> Result<HashKey, &'static str> {
        Ok(match self {
            Value::None => HashKey::None,
            Value::Bool(b) => HashKey::Int(BigInt::from(*b as u8)),
            Value::Int(n) => HashKey::Int(n.clone()),
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    match BigInt::from_f64(*f) {
                        Some(n) => HashKey::Int(n),
                        None => HashKey::Float(f.to_bits()),
                    }
                } else {
                    HashKey::Float(f.to_bits())
                }
            }
            Value::Str(s) => HashKey::Str(Rc::clone(s)),
            Value::Bytes(b) => HashKey::Bytes(Rc::clone(b)),
            Value::Tuple(items) => HashKey::Tuple(
                items
                    .iter()
                    .map(Value::hash_key)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Value::FrozenSet(table) => {
                let mut keys = table
                    .borrow()
                    .keys()
                    .map(Value::hash_key)
                    .collect::<Result<Vec<_>, _>>()?;
                keys.sort();
                HashKey::FrozenSet(keys)
            }
            Value::Range(r) => HashKey::Range(r.start.clone(), r.stop.clone(), r.step.clone()),
            Value::Type(kind) => HashKey::Type(kind.name()),
            Value::Function(f) => HashKey::Identity(Rc::as_ptr(f) as *const u8 as usize),
            Value::Exception(e) => HashKey::Identity(Rc::as_ptr(e) as *const u8 as usize),
            Value::Builtin(b) => HashKey::Type(b.name()),
            Value::Ellipsis => HashKey::Ellipsis,
            other => return Err(other.type_name()),
        })
    }

    /// `repr(value)`.
    pub fn repr(&self) -> String {
        self.repr_at(0)
    }

    /// `str(value)`.
    pub fn to_str(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            Value::Exception(exc) => exc.message(),
            other => other.repr(),
        }
    }

    fn repr_at(&self, depth: usize) -> String {
        if depth > MAX_REPR_DEPTH {
            return "...".to_string();
        }
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => float_repr(*f),
            Value::Str(s) => str_repr(s),
            Value::Bytes(b) => bytes_repr(b),
            Value::ByteArray(b) => format!("bytearray({})", bytes_repr(&b.borrow())),
            Value::List(items) => {
                let items = items.borrow();
                let inner: Vec<String> = items.iter().map(|v| v.repr_at(depth + 1)).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Tuple(items) => tuple_repr(items, depth),
            Value::Dict(table) => {
                let table = table.borrow();
                let inner: Vec<String> = table
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr_at(depth + 1), v.repr_at(depth + 1)))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Value::Set(table) => {
                let table = table.borrow();
                if table.len() == 0 {
                    return "set()".to_string();
                }
                let inner: Vec<String> = table.keys().map(|k| k.repr_at(depth + 1)).collect();
                format!("{{{}}}", inner.join(", "))
            }
            Value::FrozenSet(table) => {
                let table = table.borrow();
                if table.len() == 0 {
                    return "frozenset()".to_string();
                }
                let inner: Vec<String> = table.keys().map(|k| k.repr_at(depth + 1)).collect();
                format!("frozenset({{{}}})", inner.join(", "))
            }
            Value::Range(r) => {
                if r.step == BigInt::from(1) {
                    format!("range({}, {})", r.start, r.stop)
                } else {
                    format!("range({}, {}, {})", r.start, r.stop, r.step)
                }
            }
            Value::Iterator(_) => "<iterator object>".to_string(),
            Value::Slice(s) => format!(
                "slice({}, {}, {})",
                s.lower.repr_at(depth + 1),
                s.upper.repr_at(depth + 1),
                s.step.repr_at(depth + 1)
            ),
            Value::Function(f) => format!("<function {}>", f.name),
            Value::Builtin(b) => format!("<built-in function {}>", b.name()),
            Value::Method(m) => format!(
                "<built-in method {} of {} object>",
                m.name,
                m.receiver.type_name()
            ),
            Value::Type(kind) => format!("<class '{}'>", kind.name()),
            Value::Exception(exc) => {
                let args: Vec<String> = exc.args.iter().map(|a| a.repr_at(depth + 1)).collect();
                format!("{}({})", exc.kind, args.join(", "))
            }
            Value::Ellipsis => "Ellipsis".to_string(),
        }
    }
}

const MAX_REPR_DEPTH: usize = 64;

fn tuple_repr(items: &[Value<'_>], depth: usize) -> String {
    let inner: Vec<String> = items.iter().map(|v| v.repr_at(depth + 1)).collect();
    if inner.len() == 1 {
        format!("({},)", inner[0])
    } else {
        format!("({})", inner.join(", "))
    }
}

/// Insertion-ordered hash table backing `dict` and `set`.
#[derive(Clone, Default)]
pub struct Table<'a> {
    entries: Vec<(Value<'a>, Value<'a>)>,
    index: HashMap<HashKey, usize>,
}

impl<'a> Table<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value<'a>, &Value<'a>)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value<'a>> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value<'a>> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Insert or overwrite. The first-inserted key object is kept.
    pub fn insert(&mut self, key: Value<'a>, value: Value<'a>) -> Result<(), &'static str> {
        let hash = key.hash_key()?;
        match self.index.get(&hash) {
            Some(&slot) => self.entries[slot].1 = value,
            None => {
                self.index.insert(hash, self.entries.len());
                self.entries.push((key, value));
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &Value<'a>) -> Result<Option<&Value<'a>>, &'static str> {
        let hash = key.hash_key()?;
        Ok(self.index.get(&hash).map(|&slot| &self.entries[slot].1))
    }

    pub fn contains(&self, key: &Value<'a>) -> Result<bool, &'static str> {
        Ok(self.index.contains_key(&key.hash_key()?))
    }

    pub fn remove(&mut self, key: &Value<'a>) -> Result<Option<(Value<'a>, Value<'a>)>, &'static str> {
        let hash = key.hash_key()?;
        let Some(slot) = self.index.remove(&hash) else {
            return Ok(None);
        };
        let removed = self.entries.remove(slot);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        Ok(Some(removed))
    }

    pub fn pop_last(&mut self) -> Option<(Value<'a>, Value<'a>)> {
        let (key, value) = self.entries.pop()?;
        if let Ok(hash) = key.hash_key() {
            self.index.remove(&hash);
        }
        Some((key, value))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

/// Non-local exits from evaluation.
pub enum Signal<'a> {
    /// A Python exception, catchable by `try`.
    Raise(Value<'a>),
    /// A sandbox limit or unsupported construct. Never catchable.
    Abort(Fault),
}

impl From<Fault> for Signal<'_> {
    fn from(fault: Fault) -> Self {
        Signal::Abort(fault)
    }
}

impl fmt::Debug for Signal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Raise(exc) => write!(f, "Raise({})", exc.repr()),
            Signal::Abort(fault) => write!(f, "Abort({:?})", fault),
        }
    }
}

pub type EvalResult<'a, T> = Result<T, Signal<'a>>;

pub fn new_exception<'a>(kind: &'static str, message: impl Into<String>) -> Value<'a> {
    let message = message.into();
    let args = if message.is_empty() {
        Vec::new()
    } else {
        vec![Value::str(message)]
    };
    Value::Exception(Rc::new(ExceptionValue { kind, args }))
}

/// Raise a built-in exception with a message.
pub fn raise<'a, T>(kind: &'static str, message: impl Into<String>) -> EvalResult<'a, T> {
    Err(Signal::Raise(new_exception(kind, message)))
}

/// `KeyError` carrying the missing key itself, as `dict[key]` raises it.
pub fn key_error<'a, T>(key: Value<'a>) -> EvalResult<'a, T> {
    Err(Signal::Raise(Value::Exception(Rc::new(ExceptionValue {
        kind: "KeyError",
        args: vec![key],
    }))))
}

pub fn type_error<'a, T>(message: impl Into<String>) -> EvalResult<'a, T> {
    raise("TypeError", message)
}

pub fn value_error<'a, T>(message: impl Into<String>) -> EvalResult<'a, T> {
    raise("ValueError", message)
}

pub fn unhashable<'a, T>(type_name: &str) -> EvalResult<'a, T> {
    type_error(format!("unhashable type: '{}'", type_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_numbers_share_hash_key() {
        assert_eq!(Value::int(1).hash_key(), Value::Bool(true).hash_key());
        assert_eq!(Value::int(2).hash_key(), Value::Float(2.0).hash_key());
        assert_ne!(Value::int(2).hash_key(), Value::Float(2.5).hash_key());
        assert_eq!(Value::list(vec![]).hash_key(), Err("list"));
    }

    #[test]
    fn test_table_keeps_insertion_order() {
        let mut table = Table::new();
        table.insert(Value::str("b"), Value::int(1)).unwrap();
        table.insert(Value::str("a"), Value::int(2)).unwrap();
        table.insert(Value::str("b"), Value::int(3)).unwrap();
        let keys: Vec<String> = table.keys().map(Value::to_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(table.get(&Value::str("b")).unwrap().unwrap().repr(), "3");

        table.remove(&Value::str("b")).unwrap();
        assert_eq!(table.get(&Value::str("a")).unwrap().unwrap().repr(), "2");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reprs() {
        let nested = Value::list(vec![
            Value::int(1),
            Value::str("a"),
            Value::tuple(vec![Value::Float(2.0)]),
            Value::None,
        ]);
        assert_eq!(nested.repr(), "[1, 'a', (2.0,), None]");
        assert_eq!(Value::set(Table::new()).repr(), "set()");
        assert_eq!(new_exception("ValueError", "bad").repr(), "ValueError('bad')");
        assert_eq!(new_exception("ValueError", "bad").to_str(), "bad");
    }

    #[test]
    fn test_frozensets_hash_by_members() {
        let mut forward = Table::new();
        let mut backward = Table::new();
        for n in [1, 2, 3] {
            forward.insert(Value::int(n), Value::None).unwrap();
            backward.insert(Value::int(4 - n), Value::None).unwrap();
        }
        assert_eq!(
            Value::frozenset(forward.clone()).hash_key(),
            Value::frozenset(backward).hash_key()
        );
        assert_eq!(Value::set(forward).hash_key(), Err("set"));
        assert_eq!(Value::frozenset(Table::new()).repr(), "frozenset()");
    }

    #[test]
    fn test_bytearray_repr_and_type() {
        let data = Value::bytearray(b"ab".to_vec());
        assert_eq!(data.repr(), "bytearray(b'ab')");
        assert_eq!(data.type_name(), "bytearray");
        assert!(data.hash_key().is_err());
    }

    #[test]
    fn test_range_length_and_membership() {
        let r = RangeValue {
            start: BigInt::from(10),
            stop: BigInt::from(0),
            step: BigInt::from(-3),
        };
        assert_eq!(r.len(), BigInt::from(4));
        assert!(r.contains(&BigInt::from(4)));
        assert!(!r.contains(&BigInt::from(5)));
    }

    #[test]
    fn test_exception_hierarchy() {
        let zero_div = TypeKind::Exception("ZeroDivisionError");
        assert!(zero_div.is_subtype_of(TypeKind::Exception("ArithmeticError")));
        assert!(zero_div.is_subtype_of(TypeKind::Exception("Exception")));
        assert!(!zero_div.is_subtype_of(TypeKind::Exception("LookupError")));
        assert!(TypeKind::Bool.is_subtype_of(TypeKind::Int));
    }
}
