//! Step specifications.

use super::relay::RelayFn;
use crate::error::{ChainError, Result};
use crate::value::{Func, Value};

/// One step as written by the caller, before it becomes a chain element.
///
/// Most steps can be written as plain values: a symbol is a name, a string is
/// a path, a list is a descriptor and a function is a callable. Anything else
/// is kept as [`Step::Other`] and rejected when inserted.
#[derive(Clone, Debug)]
pub enum Step {
    /// Operation name, written `:name`.
    Name(String),
    /// Path of one or more segments separated by the delimiter.
    Text(String),
    /// `[name, [args]]` or `[name, func]` on pull chains,
    /// `[receiver, name]` on relay chains.
    Descriptor(Vec<Value>),
    /// Bound callable whose result is relayed to the next step.
    Callable(Func),
    /// Callable that receives the relay chain and decides how to continue.
    Relay(RelayFn),
    /// A value with no step meaning.
    Other(Value),
}

impl Step {
    pub fn name(name: impl Into<String>) -> Self {
        Step::Name(name.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Step::Text(text.into())
    }

    /// Call `name` with fixed arguments. A trailing [`Value::Func`] is passed
    /// as the block.
    pub fn call(name: impl Into<String>, args: Vec<Value>) -> Self {
        Step::Descriptor(vec![Value::Symbol(name.into()), Value::List(args)])
    }

    /// Call `name` with arguments computed at call time.
    ///
    /// `producer` receives the intermediate results so far as a map from
    /// name to value. A [`Value::Tuple`] result spreads into several
    /// arguments.
    pub fn call_with(
        name: impl Into<String>,
        producer: impl Fn(&Value) -> Result<Value> + 'static,
    ) -> Self {
        let producer = Func::new(move |args| producer(args.first().unwrap_or(&Value::Nil)));
        Step::Descriptor(vec![Value::Symbol(name.into()), Value::Func(producer)])
    }

    /// Run `operation` on `receiver` instead of the chain's common receiver.
    pub fn target(receiver: impl Into<Value>, operation: impl Into<String>) -> Self {
        Step::Descriptor(vec![receiver.into(), Value::Symbol(operation.into())])
    }

    pub fn func(f: impl Fn(&[Value]) -> Result<Value> + 'static) -> Self {
        Step::Callable(Func::new(f))
    }

    pub fn relay(
        f: impl Fn(&mut super::RelayChain, Vec<Value>) -> Result<Value> + 'static,
    ) -> Self {
        Step::Relay(RelayFn::new(f))
    }

    /// Literal form shown by the chain's `Display`.
    pub(crate) fn literal(&self) -> String {
        match self {
            Step::Name(name) => Value::Symbol(name.clone()).inspect(),
            Step::Text(text) => Value::Str(text.clone()).inspect(),
            Step::Descriptor(items) => Value::List(items.clone()).inspect(),
            Step::Callable(_) => "#<Func>".to_string(),
            Step::Relay(_) => "#<RelayFn>".to_string(),
            Step::Other(value) => value.inspect(),
        }
    }

    pub(crate) fn unsupported(&self, supported: &'static str) -> ChainError {
        let found = match self {
            Step::Callable(_) => "func".to_string(),
            Step::Relay(_) => "relay function".to_string(),
            Step::Other(value) => format!("{}({})", value.inspect(), value.type_name()),
            other => other.literal(),
        };
        ChainError::UnsupportedStepType { found, supported }
    }

    pub(crate) fn malformed(items: &[Value], expected: &'static str) -> ChainError {
        ChainError::MalformedDescriptor {
            descriptor: Value::List(items.to_vec()).inspect(),
            expected,
        }
    }
}

impl From<Value> for Step {
    fn from(value: Value) -> Self {
        match value {
            Value::Symbol(name) => Step::Name(name),
            Value::Str(text) => Step::Text(text),
            Value::List(items) => Step::Descriptor(items),
            Value::Func(f) => Step::Callable(f),
            other => Step::Other(other),
        }
    }
}

impl From<&str> for Step {
    fn from(text: &str) -> Self {
        Step::Text(text.to_string())
    }
}

impl From<String> for Step {
    fn from(text: String) -> Self {
        Step::Text(text)
    }
}

impl From<Func> for Step {
    fn from(f: Func) -> Self {
        Step::Callable(f)
    }
}

impl From<RelayFn> for Step {
    fn from(f: RelayFn) -> Self {
        Step::Relay(f)
    }
}
