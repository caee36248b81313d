//! Relay chains: each step's result becomes the next step's arguments.

use super::{Chain, ChainKind, Step};
use crate::error::{ChainError, Result};
use crate::value::{Func, Value};
use std::collections::HashMap;
use std::fmt;
use std::ops::Shr;
use std::rc::Rc;
use tracing::{debug, trace};

const SUPPORTED: &str = "name, string, descriptor, func or relay function";
const DESCRIPTOR: &str = "[receiver, name]";
const TARGET: &str = "name or key.name";

/// A step that is handed the chain itself.
///
/// It continues the relay by calling the chain with new arguments, or stops
/// it by returning without doing so.
#[derive(Clone)]
pub struct RelayFn(Rc<dyn Fn(&mut RelayChain, Vec<Value>) -> Result<Value>>);

impl RelayFn {
    pub fn new(f: impl Fn(&mut RelayChain, Vec<Value>) -> Result<Value> + 'static) -> Self {
        RelayFn(Rc::new(f))
    }

    pub fn call(&self, chain: &mut RelayChain, args: Vec<Value>) -> Result<Value> {
        (self.0)(chain, args)
    }
}

impl fmt::Debug for RelayFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("#<RelayFn>")
    }
}

/// State of a relay chain.
pub struct Relay {
    receiver: Value,
    cursor: usize,
    receivers: HashMap<String, Value>,
}

/// Relays values through a sequence of transforms.
///
/// Named steps run on the common receiver, `key.name` steps on a registered
/// receiver. When a step is not the last one its result is passed on as the
/// arguments of the next; a [`Value::Tuple`] result spreads into several
/// arguments.
///
/// # Example
///
/// ```
/// use function_chain::{RelayChain, Step, Value};
///
/// let mut chain = RelayChain::new();
/// chain
///     .add(Step::func(|args| args[0].invoke("+", &[Value::Int(1)], None)))?
///     .add(Step::func(|args| args[0].invoke("*", &[Value::Int(10)], None)))?;
///
/// assert_eq!(chain.call([Value::Int(4)])?, Value::Int(50));
/// # Ok::<(), function_chain::ChainError>(())
/// ```
pub type RelayChain = Chain<Relay>;

#[derive(Clone)]
pub enum RelayOp {
    /// Operation on the common receiver.
    Common(String),
    /// Operation on a receiver looked up in the registry at call time.
    Registered { key: String, operation: String },
    Target { receiver: Value, operation: String },
    Bound(Func),
    Continuation(RelayFn),
}

impl ChainKind for Relay {
    const NAME: &'static str = "RelayChain";
    type Op = RelayOp;

    fn compile(step: Step) -> Result<RelayOp> {
        match step {
            Step::Name(name) => Ok(RelayOp::Common(name)),
            Step::Text(text) => compile_text(&text),
            Step::Descriptor(items) => match items.as_slice() {
                [receiver, Value::Symbol(operation) | Value::Str(operation)] => Ok(RelayOp::Target {
                    receiver: receiver.clone(),
                    operation: operation.clone(),
                }),
                _ => Err(Step::malformed(&items, DESCRIPTOR)),
            },
            Step::Callable(f) => Ok(RelayOp::Bound(f)),
            Step::Relay(f) => Ok(RelayOp::Continuation(f)),
            other => Err(other.unsupported(SUPPORTED)),
        }
    }
}

fn compile_text(text: &str) -> Result<RelayOp> {
    let text = text.trim();
    match text.split_once('.') {
        None if !text.is_empty() => Ok(RelayOp::Common(text.to_string())),
        Some((key, operation)) if !key.trim().is_empty() && !operation.trim().is_empty() => {
            Ok(RelayOp::Registered {
                key: key.trim().to_string(),
                operation: operation.trim().to_string(),
            })
        }
        _ => Err(Step::malformed(&[Value::from(text)], TARGET)),
    }
}

impl Chain<Relay> {
    /// Create an empty chain with no common receiver.
    pub fn new() -> Self {
        Self::with_receiver(Value::Nil)
    }

    pub fn with_receiver(receiver: impl Into<Value>) -> Self {
        Self::from_state(Relay {
            receiver: receiver.into(),
            cursor: 0,
            receivers: HashMap::new(),
        })
    }

    /// Create a chain over `receiver` and append `steps` in order.
    pub fn with_steps<I, S>(receiver: impl Into<Value>, steps: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Step>,
    {
        let mut chain = Self::with_receiver(receiver);
        chain.add_all(steps)?;
        Ok(chain)
    }

    /// Register `receiver` so `name.operation` steps can reach it.
    pub fn add_receiver(&mut self, name: impl Into<String>, receiver: impl Into<Value>) -> &mut Self {
        self.state.receivers.insert(name.into(), receiver.into());
        self
    }

    pub fn add_receiver_table<I, K, V>(&mut self, table: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, receiver) in table {
            self.add_receiver(name, receiver);
        }
        self
    }

    /// Whether every step has been consumed by the call in progress.
    pub fn is_last(&self) -> bool {
        self.state.cursor >= self.elements.len()
    }

    /// Run the next step with `args`.
    ///
    /// Called from outside, this runs the chain from the start. Called from a
    /// [`RelayFn`] step, it continues with the step after it. The cursor is
    /// back at the start when this returns, whether or not a step failed.
    pub fn call<I: IntoIterator<Item = Value>>(&mut self, args: I) -> Result<Value> {
        let result = self.advance(args.into_iter().collect());
        self.state.cursor = 0;
        result
    }

    fn advance(&mut self, args: Vec<Value>) -> Result<Value> {
        let index = self.state.cursor;
        let Some(element) = self.elements.get(index) else {
            trace!(index, "relay exhausted");
            return Ok(Value::Nil);
        };
        let op = element.op.clone();
        self.state.cursor += 1;

        let result = match &op {
            RelayOp::Continuation(f) => {
                let result = f.call(self, args);
                if self.state.cursor == index + 1 {
                    debug!(index, "relay stopped by step");
                }
                return result;
            }
            RelayOp::Common(operation) => self.state.receiver.invoke(operation, &args, None)?,
            RelayOp::Registered { key, operation } => {
                let receiver = self
                    .state
                    .receivers
                    .get(key)
                    .ok_or_else(|| ChainError::ReceiverNotRegistered(key.clone()))?;
                receiver.invoke(operation, &args, None)?
            }
            RelayOp::Target { receiver, operation } => receiver.invoke(operation, &args, None)?,
            RelayOp::Bound(f) => f.call(&args)?,
        };
        trace!(index, result = ?result, "relayed");

        if self.is_last() {
            Ok(result)
        } else {
            self.advance(result.into_args())
        }
    }
}

impl Default for Chain<Relay> {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends a step.
///
/// # Panics
///
/// Panics if the step cannot be added. Use [`Chain::add`] to handle the
/// error instead.
impl<S: Into<Step>> Shr<S> for Chain<Relay> {
    type Output = Chain<Relay>;

    fn shr(mut self, step: S) -> Self::Output {
        append(&mut self, step.into());
        self
    }
}

impl<'a, S: Into<Step>> Shr<S> for &'a mut Chain<Relay> {
    type Output = &'a mut Chain<Relay>;

    fn shr(self, step: S) -> Self::Output {
        append(self, step.into());
        self
    }
}

fn append(chain: &mut Chain<Relay>, step: Step) {
    if let Err(err) = chain.add(step) {
        panic!("cannot append to {}: {}", Relay::NAME, err);
    }
}
