//! Runtime value type for the MSlash scripting language.
//!
//! MSlash is dynamically typed.  Numbers, strings, booleans, lists, maps,
//! instances, and the absent value (`None`) all flow through one tagged
//! union.  Textual forms follow the conventions scripts were written
//! against: `True`/`False`/`None`, floats always carry a fractional part,
//! and strings inside containers are quoted.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::error::EvalError;
use super::object::InstanceRef;

/// An MSlash runtime value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Insertion-ordered key/value pairs.  Keys are never lists or maps.
    Map(Vec<(Value, Value)>),
    Instance(InstanceRef),
}

/// Numeric view of a value (`bool` counts as an integer).
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(x) => x,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            other => f.write_str(&other.repr()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.loose_eq(other)
    }
}

impl Value {
    /// Quoted textual form, used for strings nested in lists and maps.
    pub fn repr(&self) -> String {
        match self {
            Value::Null => "None".to_owned(),
            Value::Bool(true) => "True".to_owned(),
            Value::Bool(false) => "False".to_owned(),
            Value::Int(n) => n.to_string(),
            Value::Float(x) => format_float(*x),
            Value::Str(s) => quote_str(s),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::repr).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Map(pairs) => {
                let inner: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Value::Instance(obj) => obj.borrow().to_string(),
        }
    }

    /// Falsy: `None`, `False`, zero, and empty strings, lists, and maps.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(pairs) => !pairs.is_empty(),
            Value::Instance(_) => true,
        }
    }

    /// Integer view for counts and indices (`True` is 1).
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&InstanceRef> {
        match self {
            Value::Instance(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Name of the type, as reported by `type()`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Instance(_) => "object",
        }
    }

    /// Lists and maps cannot be used as map keys.
    pub fn is_hashable(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Map(_))
    }

    fn num(&self) -> Option<Num> {
        match self {
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            Value::Int(n) => Some(Num::Int(*n)),
            Value::Float(x) => Some(Num::Float(*x)),
            _ => None,
        }
    }

    fn bad_operands(op: &'static str, lhs: &Value, rhs: &Value) -> EvalError {
        EvalError::BadOperands {
            op,
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }
    }

    // ── Arithmetic helpers ────────────────────────────────────────────────────

    pub fn arith_add(&self, rhs: &Value) -> Result<Value, EvalError> {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => match (self.num(), rhs.num()) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => {
                    a.checked_add(b).map(Value::Int).ok_or(EvalError::Overflow)
                }
                (Some(a), Some(b)) => Ok(Value::Float(a.as_f64() + b.as_f64())),
                _ => Err(Self::bad_operands("+", self, rhs)),
            },
        }
    }

    pub fn arith_sub(&self, rhs: &Value) -> Result<Value, EvalError> {
        match (self.num(), rhs.num()) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => {
                a.checked_sub(b).map(Value::Int).ok_or(EvalError::Overflow)
            }
            (Some(a), Some(b)) => Ok(Value::Float(a.as_f64() - b.as_f64())),
            _ => Err(Self::bad_operands("-", self, rhs)),
        }
    }

    pub fn arith_mul(&self, rhs: &Value) -> Result<Value, EvalError> {
        match (self, rhs) {
            (Value::Str(s), n) | (n, Value::Str(s)) if n.as_int().is_some() => {
                let times = repeat_count(s.len(), n)?;
                Ok(Value::Str(s.repeat(times)))
            }
            (Value::List(items), n) | (n, Value::List(items)) if n.as_int().is_some() => {
                let times = repeat_count(items.len(), n)?;
                let mut out = Vec::with_capacity(items.len() * times);
                for _ in 0..times {
                    out.extend(items.iter().cloned());
                }
                Ok(Value::List(out))
            }
            _ => match (self.num(), rhs.num()) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => {
                    a.checked_mul(b).map(Value::Int).ok_or(EvalError::Overflow)
                }
                (Some(a), Some(b)) => Ok(Value::Float(a.as_f64() * b.as_f64())),
                _ => Err(Self::bad_operands("*", self, rhs)),
            },
        }
    }

    /// True division: always produces a float.
    pub fn arith_div(&self, rhs: &Value) -> Result<Value, EvalError> {
        match (self.num(), rhs.num()) {
            (Some(a), Some(b)) => {
                let b = b.as_f64();
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Value::Float(a.as_f64() / b))
            }
            _ => Err(Self::bad_operands("/", self, rhs)),
        }
    }

    /// Floor division (`//`), rounding toward negative infinity.
    pub fn arith_floor_div(&self, rhs: &Value) -> Result<Value, EvalError> {
        match (self.num(), rhs.num()) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => {
                if b == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                let q = a.checked_div(b).ok_or(EvalError::Overflow)?;
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    Ok(Value::Int(q - 1))
                } else {
                    Ok(Value::Int(q))
                }
            }
            (Some(a), Some(b)) => {
                let b = b.as_f64();
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Value::Float((a.as_f64() / b).floor()))
            }
            _ => Err(Self::bad_operands("//", self, rhs)),
        }
    }

    /// Remainder whose sign follows the divisor.
    pub fn arith_rem(&self, rhs: &Value) -> Result<Value, EvalError> {
        match (self.num(), rhs.num()) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => {
                if b == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                let r = a.checked_rem(b).ok_or(EvalError::Overflow)?;
                if r != 0 && ((r < 0) != (b < 0)) {
                    Ok(Value::Int(r + b))
                } else {
                    Ok(Value::Int(r))
                }
            }
            (Some(a), Some(b)) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                let r = a % b;
                if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                    Ok(Value::Float(r + b))
                } else {
                    Ok(Value::Float(r))
                }
            }
            _ => Err(Self::bad_operands("%", self, rhs)),
        }
    }

    pub fn arith_pow(&self, rhs: &Value) -> Result<Value, EvalError> {
        match (self.num(), rhs.num()) {
            (Some(Num::Int(a)), Some(Num::Int(b))) if b >= 0 => {
                let exp = u32::try_from(b).map_err(|_| EvalError::Overflow)?;
                a.checked_pow(exp).map(Value::Int).ok_or(EvalError::Overflow)
            }
            (Some(a), Some(b)) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                if a == 0.0 && b < 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Value::Float(a.powf(b)))
            }
            _ => Err(Self::bad_operands("**", self, rhs)),
        }
    }

    pub fn arith_neg(&self) -> Result<Value, EvalError> {
        match self.num() {
            Some(Num::Int(n)) => n.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
            Some(Num::Float(x)) => Ok(Value::Float(-x)),
            None => Err(EvalError::BadOperand {
                op: "unary -",
                operand: self.type_name(),
            }),
        }
    }

    pub fn arith_pos(&self) -> Result<Value, EvalError> {
        match self.num() {
            Some(Num::Int(n)) => Ok(Value::Int(n)),
            Some(Num::Float(x)) => Ok(Value::Float(x)),
            None => Err(EvalError::BadOperand {
                op: "unary +",
                operand: self.type_name(),
            }),
        }
    }

    // ── Comparison ────────────────────────────────────────────────────────────

    /// Equality across numeric types; containers compare element-wise and
    /// instances compare by identity.  Never fails.
    pub fn loose_eq(&self, rhs: &Value) -> bool {
        match (self, rhs) {
            (Value::Null, Value::Null) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter().any(|(k2, v2)| k.loose_eq(k2) && v.loose_eq(v2))
                    })
            }
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => match (self.num(), rhs.num()) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
                (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
                _ => false,
            },
        }
    }

    /// Ordering for `<`, `<=`, `>`, `>=`.  `Ok(None)` means unordered (NaN).
    pub fn compare(&self, rhs: &Value, op: &'static str) -> Result<Option<Ordering>, EvalError> {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    if !x.loose_eq(y) {
                        return x.compare(y, op);
                    }
                }
                Ok(Some(a.len().cmp(&b.len())))
            }
            _ => match (self.num(), rhs.num()) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => Ok(Some(a.cmp(&b))),
                (Some(a), Some(b)) => Ok(a.as_f64().partial_cmp(&b.as_f64())),
                _ => Err(Self::bad_operands(op, self, rhs)),
            },
        }
    }

    /// Membership test for `in`: substring, list element, or map key.
    pub fn contains(&self, item: &Value) -> Result<bool, EvalError> {
        match (self, item) {
            (Value::Str(hay), Value::Str(needle)) => Ok(hay.contains(needle.as_str())),
            (Value::Str(_), other) => Err(EvalError::Type(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
            (Value::List(items), _) => Ok(items.iter().any(|v| v.loose_eq(item))),
            (Value::Map(pairs), _) => Ok(pairs.iter().any(|(k, _)| k.loose_eq(item))),
            _ => Err(EvalError::Type(format!(
                "argument of type '{}' is not iterable",
                self.type_name()
            ))),
        }
    }

    // ── Subscript / attribute ─────────────────────────────────────────────────

    /// `value[index]` for strings, lists (negative indices count from the
    /// end), and maps.
    pub fn index(&self, index: &Value) -> Result<Value, EvalError> {
        match self {
            Value::List(items) => {
                let i = resolve_index(index, items.len())?;
                Ok(items[i].clone())
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let i = resolve_index(index, chars.len())?;
                Ok(Value::Str(chars[i].to_string()))
            }
            Value::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| k.loose_eq(index))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| EvalError::KeyNotFound(index.repr())),
            other => Err(EvalError::Type(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    /// `value.name`: only instances carry attributes.
    pub fn attr(&self, name: &str) -> Result<Value, EvalError> {
        match self {
            Value::Instance(obj) => obj.borrow().get_attr(name),
            _ => Err(EvalError::AttributeNotFound(name.to_owned())),
        }
    }
}

/// Largest string (bytes) or list (elements) that `*` repetition may build.
pub const MAX_REPEAT_LEN: usize = 1 << 26;

/// Repetition count for a sequence of `unit` length, or `Overflow` when the
/// result would exceed [`MAX_REPEAT_LEN`].
fn repeat_count(unit: usize, n: &Value) -> Result<usize, EvalError> {
    let times = n.as_int().unwrap_or(0).max(0);
    let times = usize::try_from(times).map_err(|_| EvalError::Overflow)?;
    match unit.checked_mul(times) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(times),
        _ => Err(EvalError::Overflow),
    }
}

fn resolve_index(index: &Value, len: usize) -> Result<usize, EvalError> {
    let i = index.as_int().ok_or_else(|| {
        EvalError::Type(format!("indices must be integers, not {}", index.type_name()))
    })?;
    let len = len as i64;
    let i = if i < 0 { i + len } else { i };
    if (0..len).contains(&i) {
        Ok(i as usize)
    } else {
        Err(EvalError::IndexOutOfRange)
    }
}

/// Shortest round-trip float text with a guaranteed fractional part or
/// exponent: `2.0`, `0.1`, `1e+16`, `1.5e-05`.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_owned();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    let abs = x.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{x:e}");
        if let Some((mantissa, exp)) = sci.split_once('e') {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            return format!("{mantissa}e{sign}{:02}", exp.abs());
        }
        return sci;
    }
    let s = x.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{s}.0")
    }
}

/// Quote a string the way container displays show it: single quotes unless
/// the text contains a single quote and no double quote.
fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::object::Instance;

    #[test]
    fn display_scalars() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Null.to_string(), "None");
        assert_eq!(Value::Str("hello".into()).to_string(), "hello");
    }

    #[test]
    fn display_float() {
        assert_eq!(Value::Float(3.14).to_string(), "3.14");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Float(1e16).to_string(), "1e+16");
        assert_eq!(Value::Float(1.5e-5).to_string(), "1.5e-05");
    }

    #[test]
    fn display_containers_quote_strings() {
        let list = Value::List(vec![Value::Int(1), Value::Str("a".into())]);
        assert_eq!(list.to_string(), "[1, 'a']");
        let map = Value::Map(vec![(Value::Str("k".into()), Value::Str("v".into()))]);
        assert_eq!(map.to_string(), "{'k': 'v'}");
        assert_eq!(Value::Str("it's".into()).repr(), "\"it's\"");
    }

    #[test]
    fn display_instance() {
        let v = Value::Instance(Instance::new_ref("Point"));
        assert_eq!(v.to_string(), "<instance of Point>");
    }

    #[test]
    fn truthiness() {
        assert!(Value::Int(1).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Str("0".into()).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn arithmetic() {
        let a = Value::Int(10);
        let b = Value::Int(3);
        assert_eq!(a.arith_add(&b), Ok(Value::Int(13)));
        assert_eq!(a.arith_sub(&b), Ok(Value::Int(7)));
        assert_eq!(a.arith_mul(&b), Ok(Value::Int(30)));
        assert_eq!(a.arith_floor_div(&b), Ok(Value::Int(3)));
        assert_eq!(a.arith_rem(&b), Ok(Value::Int(1)));
        assert_eq!(Value::Int(2).arith_pow(&Value::Int(10)), Ok(Value::Int(1024)));
    }

    #[test]
    fn true_division_is_float() {
        assert_eq!(
            Value::Int(7).arith_div(&Value::Int(2)),
            Ok(Value::Float(3.5))
        );
        assert!(matches!(
            Value::Int(4).arith_div(&Value::Int(2)),
            Ok(Value::Float(_))
        ));
    }

    #[test]
    fn floor_and_rem_follow_divisor_sign() {
        assert_eq!(Value::Int(-7).arith_floor_div(&Value::Int(2)), Ok(Value::Int(-4)));
        assert_eq!(Value::Int(-7).arith_rem(&Value::Int(3)), Ok(Value::Int(2)));
        assert_eq!(Value::Int(7).arith_rem(&Value::Int(-3)), Ok(Value::Int(-2)));
    }

    #[test]
    fn div_by_zero() {
        assert_eq!(Value::Int(1).arith_div(&Value::Int(0)), Err(EvalError::DivisionByZero));
        assert_eq!(Value::Int(1).arith_rem(&Value::Int(0)), Err(EvalError::DivisionByZero));
        assert_eq!(
            Value::Int(1).arith_floor_div(&Value::Int(0)),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn string_and_list_operators() {
        let hi = Value::Str("hi".into());
        assert_eq!(hi.arith_add(&Value::Str("!".into())), Ok(Value::Str("hi!".into())));
        assert_eq!(hi.arith_mul(&Value::Int(3)), Ok(Value::Str("hihihi".into())));
        assert!(hi.arith_add(&Value::Int(1)).is_err());
        let l = Value::List(vec![Value::Int(1)]);
        assert_eq!(
            l.arith_add(&l),
            Ok(Value::List(vec![Value::Int(1), Value::Int(1)]))
        );
    }

    #[test]
    fn oversized_repetition_is_an_error() {
        let huge = Value::Int(10i64.pow(18));
        let list = Value::List(vec![Value::Int(1)]);
        assert_eq!(list.arith_mul(&huge), Err(EvalError::Overflow));
        assert_eq!(Value::Str("ab".into()).arith_mul(&huge), Err(EvalError::Overflow));
        assert_eq!(huge.arith_mul(&Value::Str("ab".into())), Err(EvalError::Overflow));
        // An empty sequence never grows.
        assert_eq!(Value::Str(String::new()).arith_mul(&huge), Ok(Value::Str(String::new())));
        assert_eq!(Value::Str("x".into()).arith_mul(&Value::Int(-3)), Ok(Value::Str(String::new())));
    }

    #[test]
    fn overflow_is_an_error() {
        assert_eq!(
            Value::Int(i64::MAX).arith_add(&Value::Int(1)),
            Err(EvalError::Overflow)
        );
    }

    #[test]
    fn mixed_numeric_equality() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Str("1".into()), Value::Int(1));
    }

    #[test]
    fn ordering_requires_compatible_types() {
        assert_eq!(
            Value::Int(1).compare(&Value::Float(2.5), "<"),
            Ok(Some(Ordering::Less))
        );
        assert!(Value::Int(1).compare(&Value::Str("a".into()), "<").is_err());
    }

    #[test]
    fn indexing() {
        let l = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(l.index(&Value::Int(-1)), Ok(Value::Int(3)));
        assert_eq!(l.index(&Value::Int(3)), Err(EvalError::IndexOutOfRange));
        let m = Value::Map(vec![(Value::Str("a".into()), Value::Int(9))]);
        assert_eq!(m.index(&Value::Str("a".into())), Ok(Value::Int(9)));
        assert!(m.index(&Value::Str("b".into())).is_err());
    }

    #[test]
    fn membership() {
        let s = Value::Str("hello".into());
        assert_eq!(s.contains(&Value::Str("ell".into())), Ok(true));
        let l = Value::List(vec![Value::Int(2)]);
        assert_eq!(l.contains(&Value::Float(2.0)), Ok(true));
        assert!(Value::Int(3).contains(&Value::Int(3)).is_err());
    }
}
