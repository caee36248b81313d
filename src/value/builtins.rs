//! Built-in operations on primitive values.
//!
//! Each per-type table returns `Ok(None)` for names it does not define, which
//! falls through to the operations every value supports.

use super::{expect_arity, expect_arity_range, Func, Value};
use crate::error::{ChainError, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Operations available on every value, host objects included.
const UNIVERSAL: &[&str] = &[
    "nil?", "to_s", "inspect", "to_json", "==", "!=", "<", ">", "<=", ">=",
];

/// Largest string, in bytes, that `*` will build.
const MAX_REPEAT_LEN: usize = 1 << 30;

pub(crate) fn invoke(recv: &Value, name: &str, args: &[Value], block: Option<&Func>) -> Result<Value> {
    let found = match recv {
        Value::Object(receiver) => match receiver.invoke(name, args, block) {
            Err(ChainError::OperationNotFound { .. }) if UNIVERSAL.contains(&name) => None,
            result => return result,
        },
        Value::Nil => None,
        Value::Bool(b) => boolean(*b, name, args)?,
        Value::Int(_) | Value::Float(_) => number(recv, name, args)?,
        Value::Str(s) => string(s, name, args)?,
        Value::Symbol(s) => symbol(s, name, args)?,
        Value::List(items) | Value::Tuple(items) => list(items, name, args, block)?,
        Value::Map(map) => dict(map, name, args)?,
        Value::Func(f) => match name {
            "call" => Some(f.call(args)?),
            _ => None,
        },
    };
    match found {
        Some(value) => Ok(value),
        None => universal(recv, name, args)?
            .ok_or_else(|| ChainError::operation_not_found(recv.type_name(), name)),
    }
}

fn universal(recv: &Value, name: &str, args: &[Value]) -> Result<Option<Value>> {
    let value = match name {
        "nil?" => {
            expect_arity(name, args, 0)?;
            Value::Bool(recv.is_nil())
        }
        "to_s" => Value::Str(recv.to_string()),
        "inspect" => Value::Str(recv.inspect()),
        "to_json" => {
            let json = recv.to_json().ok_or_else(|| {
                ChainError::failed(format!("{} has no JSON form", recv.type_name()))
            })?;
            Value::Str(serde_json::to_string(&json).map_err(|e| ChainError::failed(e.to_string()))?)
        }
        "==" => {
            expect_arity(name, args, 1)?;
            Value::Bool(recv == &args[0])
        }
        "!=" => {
            expect_arity(name, args, 1)?;
            Value::Bool(recv != &args[0])
        }
        "<" | ">" | "<=" | ">=" => {
            expect_arity(name, args, 1)?;
            let ordering = compare_or_fail(recv, &args[0])?;
            Value::Bool(match name {
                "<" => ordering == Ordering::Less,
                ">" => ordering == Ordering::Greater,
                "<=" => ordering != Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn compare_or_fail(a: &Value, b: &Value) -> Result<Ordering> {
    a.compare(b).ok_or_else(|| {
        ChainError::failed(format!(
            "comparison of {} with {} failed",
            a.type_name(),
            b.type_name()
        ))
    })
}

fn require_block<'a>(name: &str, block: Option<&'a Func>) -> Result<&'a Func> {
    block.ok_or_else(|| ChainError::failed(format!("no block given for `{}`", name)))
}

fn repeat_too_long() -> ChainError {
    ChainError::failed("argument too big")
}

fn no_implicit_conversion(value: &Value, into: &str) -> ChainError {
    ChainError::failed(format!(
        "no implicit conversion of {} into {}",
        value.type_name(),
        into
    ))
}

fn boolean(b: bool, name: &str, args: &[Value]) -> Result<Option<Value>> {
    let value = match name {
        "!" => Value::Bool(!b),
        "&" => {
            expect_arity(name, args, 1)?;
            Value::Bool(b && args[0].is_truthy())
        }
        "|" => {
            expect_arity(name, args, 1)?;
            Value::Bool(b || args[0].is_truthy())
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn number(recv: &Value, name: &str, args: &[Value]) -> Result<Option<Value>> {
    let value = match (name, recv) {
        ("+" | "-" | "*" | "/" | "%", _) => {
            expect_arity(name, args, 1)?;
            arithmetic(recv, name, &args[0])?
        }
        ("-@", Value::Int(i)) => Value::Int(i.checked_neg().ok_or_else(overflow)?),
        ("-@", Value::Float(f)) => Value::Float(-f),
        ("abs", Value::Int(i)) => Value::Int(i.checked_abs().ok_or_else(overflow)?),
        ("abs", Value::Float(f)) => Value::Float(f.abs()),
        ("zero?", _) => Value::Bool(recv.as_f64() == Some(0.0)),
        ("even?", Value::Int(i)) => Value::Bool(i % 2 == 0),
        ("odd?", Value::Int(i)) => Value::Bool(i % 2 != 0),
        ("succ", Value::Int(i)) => Value::Int(i.checked_add(1).ok_or_else(overflow)?),
        ("pred", Value::Int(i)) => Value::Int(i.checked_sub(1).ok_or_else(overflow)?),
        ("to_i" | "floor" | "ceil" | "round", Value::Int(i)) => Value::Int(*i),
        ("to_i", Value::Float(f)) => Value::Int(f.trunc() as i64),
        ("floor", Value::Float(f)) => Value::Int(f.floor() as i64),
        ("ceil", Value::Float(f)) => Value::Int(f.ceil() as i64),
        ("round", Value::Float(f)) => Value::Int(f.round() as i64),
        ("to_f", _) => Value::Float(recv.as_f64().unwrap_or_default()),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn overflow() -> ChainError {
    ChainError::failed("integer overflow")
}

/// Binary arithmetic with floor division and divisor-signed modulo for
/// integers; mixed operands are promoted to float.
pub(crate) fn arithmetic(lhs: &Value, op: &str, rhs: &Value) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            if matches!(op, "/" | "%") && b == 0 {
                return Err(ChainError::failed("divided by 0"));
            }
            let result = match op {
                "+" => a.checked_add(b),
                "-" => a.checked_sub(b),
                "*" => a.checked_mul(b),
                "/" => a.checked_div(b).map(|q| {
                    if a % b != 0 && (a < 0) != (b < 0) {
                        q - 1
                    } else {
                        q
                    }
                }),
                _ => a.checked_rem(b).map(|r| {
                    if r != 0 && (r < 0) != (b < 0) {
                        r + b
                    } else {
                        r
                    }
                }),
            };
            result.map(Value::Int).ok_or_else(overflow)
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let a = lhs.as_f64().unwrap_or_default();
            let b = rhs.as_f64().unwrap_or_default();
            Ok(Value::Float(match op {
                "+" => a + b,
                "-" => a - b,
                "*" => a * b,
                "/" => a / b,
                _ => a - b * (a / b).floor(),
            }))
        }
        (_, other) => Err(ChainError::failed(format!(
            "{} can't be coerced into {}",
            other.type_name(),
            lhs.type_name()
        ))),
    }
}

fn string(s: &str, name: &str, args: &[Value]) -> Result<Option<Value>> {
    let value = match name {
        "length" | "size" => Value::from(s.chars().count()),
        "empty?" => Value::Bool(s.is_empty()),
        "upcase" => Value::Str(s.to_uppercase()),
        "downcase" => Value::Str(s.to_lowercase()),
        "capitalize" => {
            let mut chars = s.chars();
            Value::Str(match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            })
        }
        "reverse" => Value::Str(s.chars().rev().collect()),
        "strip" => Value::Str(s.trim().to_string()),
        "concat" | "+" | "<<" => {
            if name != "concat" {
                expect_arity(name, args, 1)?;
            }
            let mut out = s.to_string();
            for arg in args {
                match arg {
                    Value::Str(tail) => out.push_str(tail),
                    other => return Err(no_implicit_conversion(other, "string")),
                }
            }
            Value::Str(out)
        }
        "*" => {
            expect_arity(name, args, 1)?;
            match &args[0] {
                Value::Int(n) if *n >= 0 => {
                    let count = usize::try_from(*n).map_err(|_| repeat_too_long())?;
                    match s.len().checked_mul(count) {
                        Some(total) if total <= MAX_REPEAT_LEN => Value::Str(s.repeat(count)),
                        _ => return Err(repeat_too_long()),
                    }
                }
                Value::Int(_) => return Err(ChainError::failed("negative argument")),
                other => return Err(no_implicit_conversion(other, "int")),
            }
        }
        "include?" | "start_with?" | "end_with?" => {
            expect_arity(name, args, 1)?;
            let needle = args[0]
                .as_str()
                .ok_or_else(|| no_implicit_conversion(&args[0], "string"))?;
            Value::Bool(match name {
                "include?" => s.contains(needle),
                "start_with?" => s.starts_with(needle),
                _ => s.ends_with(needle),
            })
        }
        "split" => {
            expect_arity_range(name, args, 0, 1)?;
            let parts: Vec<Value> = match args.first() {
                None => s.split_whitespace().map(Value::from).collect(),
                Some(Value::Str(sep)) => s.split(sep.as_str()).map(Value::from).collect(),
                Some(other) => return Err(no_implicit_conversion(other, "string")),
            };
            Value::List(parts)
        }
        "chars" => Value::List(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        "[]" => {
            expect_arity(name, args, 1)?;
            match &args[0] {
                Value::Int(i) => {
                    let chars: Vec<char> = s.chars().collect();
                    resolve_index(*i, chars.len())
                        .map_or(Value::Nil, |at| Value::Str(chars[at].to_string()))
                }
                Value::Str(sub) if s.contains(sub.as_str()) => Value::Str(sub.clone()),
                Value::Str(_) => Value::Nil,
                other => return Err(no_implicit_conversion(other, "int")),
            }
        }
        "to_sym" => Value::Symbol(s.to_string()),
        "to_i" => Value::Int(leading_int(s)),
        "to_f" => Value::Float(s.trim().parse().unwrap_or_default()),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let digits_start = usize::from(s.starts_with('-') || s.starts_with('+'));
    let end = s[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |at| at + digits_start);
    s[..end].parse().unwrap_or_default()
}

fn symbol(s: &str, name: &str, _args: &[Value]) -> Result<Option<Value>> {
    let value = match name {
        "to_sym" => Value::Symbol(s.to_string()),
        "length" | "size" => Value::from(s.chars().count()),
        "upcase" => Value::Symbol(s.to_uppercase()),
        "downcase" => Value::Symbol(s.to_lowercase()),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Map a possibly negative index onto `0..len`.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let at = if index < 0 { len + index } else { index };
    (0..len).contains(&at).then_some(at as usize)
}

fn list(items: &[Value], name: &str, args: &[Value], block: Option<&Func>) -> Result<Option<Value>> {
    let value = match name {
        "[]" | "at" => {
            expect_arity(name, args, 1)?;
            match &args[0] {
                Value::Int(i) => resolve_index(*i, items.len()).map_or(Value::Nil, |at| items[at].clone()),
                other => return Err(no_implicit_conversion(other, "int")),
            }
        }
        "first" | "last" => {
            expect_arity_range(name, args, 0, 1)?;
            match args.first() {
                None => {
                    let item = if name == "first" { items.first() } else { items.last() };
                    item.cloned().unwrap_or_default()
                }
                Some(Value::Int(n)) if *n >= 0 => {
                    let n = (*n as usize).min(items.len());
                    let slice = if name == "first" { &items[..n] } else { &items[items.len() - n..] };
                    Value::List(slice.to_vec())
                }
                Some(other) => return Err(no_implicit_conversion(other, "int")),
            }
        }
        "length" | "size" => Value::from(items.len()),
        "empty?" => Value::Bool(items.is_empty()),
        "to_a" => Value::List(items.to_vec()),
        "reverse" => Value::List(items.iter().rev().cloned().collect()),
        "compact" => Value::List(items.iter().filter(|v| !v.is_nil()).cloned().collect()),
        "uniq" => {
            let mut unique: Vec<Value> = Vec::new();
            for item in items {
                if !unique.contains(item) {
                    unique.push(item.clone());
                }
            }
            Value::List(unique)
        }
        "include?" => {
            expect_arity(name, args, 1)?;
            Value::Bool(items.contains(&args[0]))
        }
        "push" | "<<" => {
            let mut out = items.to_vec();
            out.extend(args.iter().cloned());
            Value::List(out)
        }
        "+" => {
            expect_arity(name, args, 1)?;
            let tail = args[0]
                .as_list()
                .ok_or_else(|| no_implicit_conversion(&args[0], "list"))?;
            Value::List(items.iter().chain(tail).cloned().collect())
        }
        "join" => {
            expect_arity_range(name, args, 0, 1)?;
            let sep = match args.first() {
                None => "",
                Some(Value::Str(sep)) => sep.as_str(),
                Some(other) => return Err(no_implicit_conversion(other, "string")),
            };
            Value::Str(items.iter().map(Value::to_string).collect::<Vec<_>>().join(sep))
        }
        "sum" => items
            .iter()
            .try_fold(Value::Int(0), |acc, item| arithmetic(&acc, "+", item))?,
        "min" | "max" => {
            let wanted = if name == "min" { Ordering::Less } else { Ordering::Greater };
            let mut best: Option<&Value> = None;
            for item in items {
                let replace = match best {
                    Some(current) => compare_or_fail(item, current)? == wanted,
                    None => true,
                };
                if replace {
                    best = Some(item);
                }
            }
            best.cloned().unwrap_or_default()
        }
        "sort" => {
            let mut sorted = items.to_vec();
            let mut failure = None;
            sorted.sort_by(|a, b| {
                compare_or_fail(a, b).unwrap_or_else(|e| {
                    if failure.is_none() {
                        failure = Some(e);
                    }
                    Ordering::Equal
                })
            });
            if let Some(e) = failure {
                return Err(e);
            }
            Value::List(sorted)
        }
        "map" | "collect" => {
            let f = require_block(name, block)?;
            Value::List(
                items
                    .iter()
                    .map(|item| f.call(std::slice::from_ref(item)))
                    .collect::<Result<_>>()?,
            )
        }
        "select" | "find_all" | "filter" | "reject" => {
            let f = require_block(name, block)?;
            let keep = name != "reject";
            let mut out = Vec::new();
            for item in items {
                if f.call(std::slice::from_ref(item))?.is_truthy() == keep {
                    out.push(item.clone());
                }
            }
            Value::List(out)
        }
        "find" | "detect" => {
            let f = require_block(name, block)?;
            let mut found = Value::Nil;
            for item in items {
                if f.call(std::slice::from_ref(item))?.is_truthy() {
                    found = item.clone();
                    break;
                }
            }
            found
        }
        "any?" | "all?" | "count" => {
            let mut hits: usize = 0;
            for item in items {
                let hit = match (block, args.first()) {
                    (Some(f), _) => f.call(std::slice::from_ref(item))?.is_truthy(),
                    (None, Some(wanted)) => item == wanted,
                    (None, None) => name == "count" || item.is_truthy(),
                };
                if hit {
                    hits += 1;
                }
            }
            match name {
                "any?" => Value::Bool(hits > 0),
                "all?" => Value::Bool(hits == items.len()),
                _ => Value::from(hits),
            }
        }
        "inject" | "reduce" => {
            expect_arity_range(name, args, 0, 1)?;
            let f = require_block(name, block)?;
            let mut rest = items.iter();
            let mut acc = match args.first() {
                Some(init) => init.clone(),
                None => match rest.next() {
                    Some(first) => first.clone(),
                    None => return Ok(Some(Value::Nil)),
                },
            };
            for item in rest {
                acc = f.call(&[acc, item.clone()])?;
            }
            acc
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn key_of(value: &Value) -> Result<String> {
    match value {
        Value::Str(s) | Value::Symbol(s) => Ok(s.clone()),
        Value::Int(i) => Ok(i.to_string()),
        other => Err(ChainError::failed(format!(
            "{} can't be used as a map key",
            other.type_name()
        ))),
    }
}

fn dict(map: &BTreeMap<String, Value>, name: &str, args: &[Value]) -> Result<Option<Value>> {
    let value = match name {
        "[]" | "lookup" => {
            expect_arity(name, args, 1)?;
            map.get(&key_of(&args[0])?).cloned().unwrap_or_default()
        }
        "fetch" => {
            expect_arity_range(name, args, 1, 2)?;
            match (map.get(&key_of(&args[0])?), args.get(1)) {
                (Some(found), _) => found.clone(),
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(ChainError::failed(format!(
                        "key not found: {}",
                        args[0].inspect()
                    )))
                }
            }
        }
        "dig" => {
            let mut current = Value::Map(map.clone());
            for key in args {
                current = match &current {
                    Value::Map(inner) => inner.get(&key_of(key)?).cloned().unwrap_or_default(),
                    Value::List(items) => match key {
                        Value::Int(i) => resolve_index(*i, items.len())
                            .map_or(Value::Nil, |at| items[at].clone()),
                        other => return Err(no_implicit_conversion(other, "int")),
                    },
                    _ => Value::Nil,
                };
                if current.is_nil() {
                    break;
                }
            }
            current
        }
        "keys" => Value::List(map.keys().map(|k| Value::Str(k.clone())).collect()),
        "values" => Value::List(map.values().cloned().collect()),
        "length" | "size" => Value::from(map.len()),
        "empty?" => Value::Bool(map.is_empty()),
        "key?" | "has_key?" | "include?" => {
            expect_arity(name, args, 1)?;
            Value::Bool(map.contains_key(&key_of(&args[0])?))
        }
        _ if args.is_empty() => match map.get(name) {
            Some(found) => found.clone(),
            None => return Ok(None),
        },
        _ => return Ok(None),
    };
    Ok(Some(value))
}
