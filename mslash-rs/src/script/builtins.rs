//! Built-in conversion functions.
//!
//! Expressions may call only this fixed whitelist: `str`, `int`, `float`,
//! `list`, `dict` (alias `map`), `len` (alias `length`), and `type`.  Each
//! receives already-evaluated arguments.

use super::error::EvalError;
use super::value::Value;

/// Names callable from expressions.
pub const BUILTIN_NAMES: &[&str] = &[
    "str", "int", "float", "list", "dict", "map", "len", "length", "type",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Dispatch a built-in function call.
///
/// Returns `None` if the function name is not a built-in.
pub fn call_builtin(name: &str, args: Vec<Value>) -> Option<Result<Value, EvalError>> {
    let result = match name {
        "str" => optional_arg(name, args).map(|v| match v {
            None => Value::Str(String::new()),
            Some(v) => Value::Str(v.to_string()),
        }),
        "int" => optional_arg(name, args).and_then(|v| match v {
            None => Ok(Value::Int(0)),
            Some(v) => to_int(&v),
        }),
        "float" => optional_arg(name, args).and_then(|v| match v {
            None => Ok(Value::Float(0.0)),
            Some(v) => to_float(&v),
        }),
        "list" => optional_arg(name, args).and_then(|v| match v {
            None => Ok(Value::List(Vec::new())),
            Some(v) => to_list(v),
        }),
        "dict" | "map" => optional_arg(name, args).and_then(|v| match v {
            None => Ok(Value::Map(Vec::new())),
            Some(v) => to_map(v),
        }),
        "len" | "length" => single_arg(name, args).and_then(|v| length(&v)),
        "type" => single_arg(name, args).map(|v| {
            let class = match &v {
                Value::Instance(obj) => obj.borrow().class_name().to_owned(),
                other => other.type_name().to_owned(),
            };
            Value::Str(format!("<class '{class}'>"))
        }),
        _ => return None,
    };
    Some(result)
}

// ── Argument helpers ──────────────────────────────────────────────────────────

fn single_arg(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    let n = args.len();
    let mut it = args.into_iter();
    match (it.next(), n) {
        (Some(v), 1) => Ok(v),
        _ => Err(EvalError::Type(format!(
            "{name}() takes exactly one argument ({n} given)"
        ))),
    }
}

fn optional_arg(name: &str, args: Vec<Value>) -> Result<Option<Value>, EvalError> {
    if args.len() > 1 {
        return Err(EvalError::Type(format!(
            "{name}() takes at most 1 argument ({} given)",
            args.len()
        )));
    }
    Ok(args.into_iter().next())
}

// ── Conversions ───────────────────────────────────────────────────────────────

fn to_int(v: &Value) -> Result<Value, EvalError> {
    match v {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(x) => {
            if !x.is_finite() || x.abs() >= 9.2e18 {
                return Err(EvalError::Value(format!("cannot convert float {x} to integer")));
            }
            Ok(Value::Int(x.trunc() as i64))
        }
        Value::Str(s) => {
            let cleaned = s.trim().replace('_', "");
            cleaned.parse::<i64>().map(Value::Int).map_err(|_| {
                EvalError::Value(format!("invalid literal for int() with base 10: {}", v.repr()))
            })
        }
        other => Err(EvalError::Type(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_float(v: &Value) -> Result<Value, EvalError> {
    match v {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            EvalError::Value(format!("could not convert string to float: {}", v.repr()))
        }),
        other => Err(EvalError::Type(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_list(v: Value) -> Result<Value, EvalError> {
    match v {
        Value::List(items) => Ok(Value::List(items)),
        Value::Str(s) => Ok(Value::List(
            s.chars().map(|c| Value::Str(c.to_string())).collect(),
        )),
        Value::Map(pairs) => Ok(Value::List(pairs.into_iter().map(|(k, _)| k).collect())),
        other => Err(EvalError::Type(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

fn to_map(v: Value) -> Result<Value, EvalError> {
    match v {
        Value::Map(pairs) => Ok(Value::Map(pairs)),
        Value::List(items) => {
            let mut pairs: Vec<(Value, Value)> = Vec::with_capacity(items.len());
            for item in items {
                let Value::List(mut kv) = item else {
                    return Err(EvalError::Type(
                        "cannot convert dictionary update sequence element".into(),
                    ));
                };
                if kv.len() != 2 {
                    return Err(EvalError::Value(format!(
                        "dictionary update sequence element has length {}; 2 is required",
                        kv.len()
                    )));
                }
                let value = kv.pop().unwrap_or_default();
                let key = kv.pop().unwrap_or_default();
                insert_pair(&mut pairs, key, value)?;
            }
            Ok(Value::Map(pairs))
        }
        other => Err(EvalError::Type(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

/// Insert into an ordered pair list, overwriting an equal key in place.
pub fn insert_pair(
    pairs: &mut Vec<(Value, Value)>,
    key: Value,
    value: Value,
) -> Result<(), EvalError> {
    if !key.is_hashable() {
        return Err(EvalError::Type(format!(
            "unhashable type: '{}'",
            key.type_name()
        )));
    }
    match pairs.iter_mut().find(|(k, _)| k.loose_eq(&key)) {
        Some(slot) => slot.1 = value,
        None => pairs.push((key, value)),
    }
    Ok(())
}

fn length(v: &Value) -> Result<Value, EvalError> {
    let n = match v {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(pairs) => pairs.len(),
        other => {
            return Err(EvalError::Type(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(n as i64))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        call_builtin(name, args).expect("not a builtin")
    }

    #[test]
    fn unknown_is_none() {
        assert!(call_builtin("print", vec![]).is_none());
        assert!(call_builtin("eval", vec![]).is_none());
    }

    #[test]
    fn str_conversion() {
        assert_eq!(call("str", vec![Value::Int(5)]), Ok(Value::Str("5".into())));
        assert_eq!(call("str", vec![Value::Float(2.0)]), Ok(Value::Str("2.0".into())));
        assert_eq!(call("str", vec![]), Ok(Value::Str(String::new())));
    }

    #[test]
    fn int_conversion() {
        assert_eq!(call("int", vec![Value::Str(" 42 ".into())]), Ok(Value::Int(42)));
        assert_eq!(call("int", vec![Value::Float(-3.9)]), Ok(Value::Int(-3)));
        assert_eq!(call("int", vec![Value::Bool(true)]), Ok(Value::Int(1)));
        assert!(call("int", vec![Value::Str("3.5".into())]).is_err());
        assert!(call("int", vec![Value::List(vec![])]).is_err());
    }

    #[test]
    fn float_conversion() {
        assert_eq!(call("float", vec![Value::Str("2.5".into())]), Ok(Value::Float(2.5)));
        assert_eq!(call("float", vec![Value::Int(3)]), Ok(Value::Float(3.0)));
        assert!(call("float", vec![Value::Str("abc".into())]).is_err());
    }

    #[test]
    fn list_conversion() {
        assert_eq!(
            call("list", vec![Value::Str("ab".into())]),
            Ok(Value::List(vec![Value::Str("a".into()), Value::Str("b".into())]))
        );
        assert!(call("list", vec![Value::Int(1)]).is_err());
    }

    #[test]
    fn dict_from_pairs() {
        let pairs = Value::List(vec![Value::List(vec![Value::Str("a".into()), Value::Int(1)])]);
        assert_eq!(
            call("dict", vec![pairs]),
            Ok(Value::Map(vec![(Value::Str("a".into()), Value::Int(1))]))
        );
        assert_eq!(call("map", vec![]), Ok(Value::Map(vec![])));
    }

    #[test]
    fn len_and_alias() {
        assert_eq!(call("len", vec![Value::Str("héllo".into())]), Ok(Value::Int(5)));
        assert_eq!(
            call("length", vec![Value::List(vec![Value::Null, Value::Null])]),
            Ok(Value::Int(2))
        );
        assert!(call("len", vec![Value::Int(3)]).is_err());
        assert!(call("len", vec![]).is_err());
    }

    #[test]
    fn type_names() {
        assert_eq!(call("type", vec![Value::Int(1)]), Ok(Value::Str("<class 'int'>".into())));
        assert_eq!(
            call("type", vec![Value::Str("x".into())]),
            Ok(Value::Str("<class 'str'>".into()))
        );
    }

    #[test]
    fn unhashable_key_rejected() {
        let mut pairs = Vec::new();
        assert!(insert_pair(&mut pairs, Value::List(vec![]), Value::Null).is_err());
        insert_pair(&mut pairs, Value::Int(1), Value::Int(1)).unwrap();
        insert_pair(&mut pairs, Value::Float(1.0), Value::Int(2)).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1, Value::Int(2));
    }
}
