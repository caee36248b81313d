//! Pull chains: a left fold of operations over a starting receiver.

use super::{Chain, ChainKind, Step};
use crate::error::Result;
use crate::syntax::{evaluate, parse, split_alias, AliasContext, Expr};
use crate::value::{Func, Value};
use std::ops::Shl;
use tracing::{debug, trace};

const SUPPORTED: &str = "name, string or descriptor";
const DESCRIPTOR: &str = "[name, [args...]] or [name, func]";
/// Longest receiver rendering put into error context.
const CONTEXT_WIDTH: usize = 64;

/// State of a pull chain.
pub struct Pull {
    start: Value,
    return_nil_at_error: bool,
}

/// Pulls a value out of a receiver by applying each step to the result of
/// the previous one.
///
/// A nil intermediate result stops the fold and becomes the result.
///
/// # Example
///
/// ```
/// use function_chain::{PullChain, Step, Value};
/// use serde_json::json;
///
/// let store = Value::from(json!({"shelves": {"mystery": ["Tragedy of X"]}}));
/// let mut chain = PullChain::new(store);
/// chain.add("shelves/lookup 'mystery'")?.add(Step::name("first"))?;
///
/// assert_eq!(chain.call()?, Value::from("Tragedy of X"));
/// # Ok::<(), function_chain::ChainError>(())
/// ```
pub type PullChain = Chain<Pull>;

#[derive(Clone)]
pub enum PullOp {
    /// Invoke `name` on the current value.
    Send { name: String, args: ArgSource },
    /// Evaluate a string step with the current value as `self`.
    Eval {
        binding: String,
        expr: Expr,
        source: String,
    },
}

#[derive(Clone)]
pub enum ArgSource {
    Fixed { args: Vec<Value>, block: Option<Func> },
    /// Called with the alias map at call time.
    Deferred(Func),
}

impl ChainKind for Pull {
    const NAME: &'static str = "PullChain";
    type Op = PullOp;

    fn compile(step: Step) -> Result<PullOp> {
        match step {
            Step::Name(name) => Ok(PullOp::Send {
                name,
                args: ArgSource::Fixed {
                    args: Vec::new(),
                    block: None,
                },
            }),
            Step::Descriptor(items) => compile_descriptor(items),
            Step::Text(segment) => compile_segment(segment),
            other => Err(other.unsupported(SUPPORTED)),
        }
    }
}

fn compile_descriptor(items: Vec<Value>) -> Result<PullOp> {
    let (name, second) = match items.as_slice() {
        [Value::Symbol(name) | Value::Str(name), second] => (name.clone(), second.clone()),
        _ => return Err(Step::malformed(&items, DESCRIPTOR)),
    };
    let args = match second {
        Value::List(mut args) => {
            let block = take_block(&mut args);
            ArgSource::Fixed { args, block }
        }
        Value::Func(producer) => ArgSource::Deferred(producer),
        _ => return Err(Step::malformed(&items, DESCRIPTOR)),
    };
    Ok(PullOp::Send { name, args })
}

fn compile_segment(segment: String) -> Result<PullOp> {
    let (alias, body) = split_alias(&segment)?;
    let expr = parse(body)?;
    let source = body.trim().to_string();
    let binding = alias.unwrap_or_else(|| segment.clone());
    Ok(PullOp::Eval {
        binding,
        expr,
        source,
    })
}

fn context_label(receiver: &Value) -> String {
    let shown = receiver.inspect();
    if shown.chars().count() <= CONTEXT_WIDTH {
        return shown;
    }
    let mut cut: String = shown.chars().take(CONTEXT_WIDTH - 3).collect();
    cut.push_str("...");
    cut
}

/// Pop a trailing callable off `args`.
fn take_block(args: &mut Vec<Value>) -> Option<Func> {
    match args.last() {
        Some(Value::Func(block)) => {
            let block = block.clone();
            args.pop();
            Some(block)
        }
        _ => None,
    }
}

impl PullOp {
    fn run(&self, receiver: &Value, aliases: &mut AliasContext) -> Result<Value> {
        match self {
            PullOp::Send { name, args } => {
                let result = match args {
                    ArgSource::Fixed { args, block } => receiver.invoke(name, args, block.as_ref())?,
                    ArgSource::Deferred(producer) => {
                        let mut args = producer.call(&[aliases.to_value()])?.into_args();
                        let block = take_block(&mut args);
                        receiver.invoke(name, &args, block.as_ref())?
                    }
                };
                aliases.bind(name.clone(), result.clone());
                Ok(result)
            }
            PullOp::Eval {
                binding,
                expr,
                source,
            } => {
                let result = evaluate(expr, receiver, aliases)
                    .map_err(|e| e.with_context(format!("{}.{}", context_label(receiver), source)))?;
                aliases.bind(binding.clone(), result.clone());
                Ok(result)
            }
        }
    }
}

impl Chain<Pull> {
    pub fn new(start: impl Into<Value>) -> Self {
        Self::from_state(Pull {
            start: start.into(),
            return_nil_at_error: false,
        })
    }

    /// Create a chain and append `steps` in order.
    pub fn with_steps<I, S>(start: impl Into<Value>, steps: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Step>,
    {
        let mut chain = Self::new(start);
        chain.add_all(steps)?;
        Ok(chain)
    }

    /// When set, an error raised by a step makes `call` return nil.
    pub fn set_return_nil_at_error(&mut self, enabled: bool) -> &mut Self {
        self.state.return_nil_at_error = enabled;
        self
    }

    pub fn return_nil_at_error(&self) -> bool {
        self.state.return_nil_at_error
    }

    /// Run every step against the starting receiver.
    ///
    /// Intermediate results are bound in a fresh alias context: named and
    /// descriptor steps under their operation name, string steps under their
    /// alias. Later string steps see those bindings as bare names the current
    /// value does not define itself.
    pub fn call(&self) -> Result<Value> {
        let mut aliases = AliasContext::new();
        let mut current = self.state.start.clone();

        for (index, element) in self.elements.iter().enumerate() {
            if current.is_nil() {
                trace!(index, "nil intermediate result, stopping");
                return Ok(Value::Nil);
            }
            match element.op.run(&current, &mut aliases) {
                Ok(value) => {
                    trace!(index, step = %element.literal, result = ?value, "pulled");
                    current = value;
                }
                Err(err) if self.state.return_nil_at_error && err.is_call_time() => {
                    debug!(index, step = %element.literal, error = %err, "step failed, returning nil");
                    return Ok(Value::Nil);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(current)
    }
}

/// Appends a step.
///
/// # Panics
///
/// Panics if the step cannot be added. Use [`Chain::add`] to handle the
/// error instead.
impl<S: Into<Step>> Shl<S> for Chain<Pull> {
    type Output = Chain<Pull>;

    fn shl(mut self, step: S) -> Self::Output {
        append(&mut self, step.into());
        self
    }
}

impl<'a, S: Into<Step>> Shl<S> for &'a mut Chain<Pull> {
    type Output = &'a mut Chain<Pull>;

    fn shl(self, step: S) -> Self::Output {
        append(self, step.into());
        self
    }
}

fn append(chain: &mut Chain<Pull>, step: Step) {
    if let Err(err) = chain.add(step) {
        panic!("cannot append to {}: {}", Pull::NAME, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;
    use crate::value::DynObject;
    use serde_json::json;

    fn bookstore() -> Value {
        Value::from(json!({
            "shelves": {
                "programing": ["The Pragmatic Programmer", "Effective Rust"],
                "mystery": ["Tragedy of X", "Tragedy of Y"]
            }
        }))
    }

    #[test]
    fn test_named_steps_fold() {
        let mut chain = PullChain::new(bookstore());
        chain
            .add_all([Step::name("shelves"), Step::call("[]", vec![Value::from("mystery")])])
            .unwrap();
        chain.add(Step::name("first")).unwrap();
        assert_eq!(chain.call().unwrap(), Value::from("Tragedy of X"));
    }

    #[test]
    fn test_nil_short_circuits() {
        let tracker = DynObject::new("Tracker")
            .with_field("missing", Value::Nil)
            .with_method("boom", |_, _, _| Err(ChainError::failed("must not run")))
            .into_value();
        let chain = PullChain::with_steps(tracker.clone(), [Step::name("missing"), Step::name("boom")]).unwrap();
        assert_eq!(chain.call().unwrap(), Value::Nil);

        let chain = PullChain::with_steps(tracker, [Step::name("boom")]).unwrap();
        assert!(chain.call().is_err());
    }

    #[test]
    fn test_false_does_not_short_circuit() {
        let chain = PullChain::with_steps(Value::Bool(false), ["nil?", "to_s"]).unwrap();
        assert_eq!(chain.call().unwrap(), Value::from("false"));
    }

    #[test]
    fn test_alias_capture() {
        let mut chain = PullChain::new(bookstore());
        chain.add("@s = shelves/keys/@k = first/s[k]/last").unwrap();
        assert_eq!(chain.call().unwrap(), Value::from("Tragedy of Y"));
    }

    #[test]
    fn test_named_step_binds_its_name() {
        let mut chain = PullChain::new(bookstore());
        chain.add(Step::name("shelves")).unwrap();
        chain.add("keys/shelves[last]/first").unwrap();
        assert_eq!(chain.call().unwrap(), Value::from("The Pragmatic Programmer"));
    }

    #[test]
    fn test_repeated_names_navigate_the_current_value() {
        let chain = PullChain::with_steps(Value::from(json!({"a": {"a": 5}})), ["a/a"]).unwrap();
        assert_eq!(chain.call().unwrap(), Value::Int(5));

        let chain = PullChain::with_steps(
            Value::from(json!({"next": {"next": {"v": 1}}})),
            ["next/next/v"],
        )
        .unwrap();
        assert_eq!(chain.call().unwrap(), Value::Int(1));

        let mut chain = PullChain::new(Value::from(json!([[1, 2], [3]])));
        chain.add(Step::name("first")).unwrap().add("first").unwrap();
        assert_eq!(chain.call().unwrap(), Value::Int(1));
    }

    #[test]
    fn test_deferred_arguments_see_aliases() {
        let mut chain = PullChain::new(bookstore());
        chain.add(Step::name("shelves")).unwrap();
        chain.add("@genre = keys.last/shelves").unwrap();
        chain
            .add(Step::call_with("[]", |aliases| {
                Ok(aliases.get("genre").cloned().unwrap_or_default())
            }))
            .unwrap();
        assert_eq!(
            chain.call().unwrap(),
            Value::from(json!(["The Pragmatic Programmer", "Effective Rust"]))
        );
    }

    #[test]
    fn test_trailing_func_is_block() {
        let doubled = Value::func(|args| args[0].invoke("*", &[Value::Int(2)], None));
        let chain = PullChain::with_steps(
            Value::from(json!([1, 2, 3])),
            [Step::call("map", vec![doubled]), Step::name("sum")],
        )
        .unwrap();
        assert_eq!(chain.call().unwrap(), Value::Int(12));
    }

    #[test]
    fn test_error_context_and_suppression() {
        let mut chain = PullChain::new(Value::from(json!({"n": 1})));
        chain.add("shelvesassss").unwrap();
        let err = chain.call().unwrap_err();
        assert!(err.to_string().contains(r#"{"n" => 1}.shelvesassss"#), "{err}");

        let mut chain = PullChain::new(bookstore());
        chain.add("shelvesassss").unwrap();
        match chain.call().unwrap_err() {
            ChainError::OperationNotFound {
                context: Some(context),
                ..
            } => {
                assert!(context.starts_with(r#"{"shelves" => "#), "{context}");
                assert!(context.ends_with("....shelvesassss"), "{context}");
                assert_eq!(context.chars().count(), CONTEXT_WIDTH + ".shelvesassss".len());
            }
            other => panic!("unexpected error: {other}"),
        }

        chain.set_return_nil_at_error(true);
        assert!(chain.return_nil_at_error());
        assert_eq!(chain.call().unwrap(), Value::Nil);
    }

    #[test]
    fn test_rejects_relay_only_steps() {
        let mut chain = PullChain::new(Value::Nil);
        assert!(matches!(
            chain.add(Step::func(|_| Ok(Value::Nil))),
            Err(ChainError::UnsupportedStepType { .. })
        ));
        assert!(matches!(
            chain.add(Step::Descriptor(vec![Value::Int(1), Value::List(vec![])])),
            Err(ChainError::MalformedDescriptor { .. })
        ));
        assert!(matches!(
            chain.add(Step::Descriptor(vec![Value::symbol("x"), Value::Int(1)])),
            Err(ChainError::MalformedDescriptor { .. })
        ));
        assert!(matches!(chain.add("self.("), Err(ChainError::InvalidExpression { .. })));
        assert!(chain.is_empty());
    }

    #[test]
    fn test_shift_operator() {
        let chain = PullChain::new(bookstore()) << "shelves" << Step::name("keys");
        assert_eq!(chain.to_string(), "PullChain[\"shelves\", :keys]");
        assert_eq!(chain.call().unwrap(), Value::from(json!(["mystery", "programing"])));
    }
}
