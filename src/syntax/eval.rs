//! Expression evaluation against a receiver and an alias context.

use super::expr::Expr;
use crate::error::{ChainError, Result};
use crate::value::Value;
use std::collections::HashMap;

/// Intermediate results of one pull chain call, by name.
///
/// Created empty at the start of every call and dropped when it returns.
#[derive(Clone, Debug, Default)]
pub struct AliasContext {
    values: HashMap<String, Value>,
}

impl AliasContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Bind `name`, replacing any earlier result under the same name.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Snapshot as a map value, as handed to deferred argument producers.
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Evaluate `expr` with `receiver` as `self`.
///
/// Bare names are a zero-argument invocation on the receiver. When the
/// receiver has no such operation the name is looked up in `aliases`, so
/// aliases work the same for every kind of receiver.
pub fn evaluate(expr: &Expr, receiver: &Value, aliases: &AliasContext) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::SelfRef => Ok(receiver.clone()),
        Expr::Name(name) => match receiver.invoke(name, &[], None) {
            Err(err) if is_missing(&err, name) => match aliases.get(name) {
                Some(value) => Ok(value.clone()),
                None => Err(err),
            },
            result => result,
        },
        Expr::Call { target, name, args } => {
            let evaluated;
            let target = match target {
                Some(target) => {
                    evaluated = evaluate(target, receiver, aliases)?;
                    &evaluated
                }
                None => receiver,
            };
            let args = args
                .iter()
                .map(|arg| evaluate(arg, receiver, aliases))
                .collect::<Result<Vec<_>>>()?;
            target.invoke(name, &args, None)
        }
        Expr::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|item| evaluate(item, receiver, aliases))
                .collect::<Result<_>>()?,
        )),
    }
}

/// Whether `err` says the receiver itself lacks `name`, as opposed to an
/// operation further down failing.
fn is_missing(err: &ChainError, name: &str) -> bool {
    matches!(
        err,
        ChainError::OperationNotFound { operation, context: None, .. } if operation == name
    )
}
