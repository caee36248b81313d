//! # Function Chain
//!
//! Deferred method-call chains over dynamic values.
//!
//! ## Core Concepts
//!
//! - **Pull chains**: a starting receiver and a list of steps, each applied to
//!   the result of the previous one. A nil result stops the chain.
//! - **Relay chains**: a list of transforms where each result becomes the
//!   arguments of the next. Steps can take over the relay and stop it early.
//! - **Steps**: operation names, descriptors with arguments, callables, or
//!   strings in a small expression language (`shelves[:mystery]/first`).
//! - **Receivers**: host objects implement [`Receiver`] to be invoked by name.
//!
//! ## Example
//!
//! ```
//! use function_chain::{DynObject, PullChain, RelayChain, Step, Value};
//! use serde_json::json;
//!
//! let store = Value::from(json!({
//!     "shelves": {"mystery": ["Tragedy of X", "Tragedy of Y"]}
//! }));
//! let chain = PullChain::with_steps(store, ["shelves/@books = lookup 'mystery'/books.last"])?;
//! assert_eq!(chain.call()?, Value::from("Tragedy of Y"));
//!
//! let decorator = DynObject::new("Decorator")
//!     .with_method("quote", |_, args, _| {
//!         Ok(Value::from(format!("'{}'", args[0])))
//!     })
//!     .into_value();
//! let mut relay = RelayChain::with_steps(decorator, [Step::name("quote"), Step::text("quote")])?;
//! assert_eq!(relay.call([Value::from("x")])?, Value::from("''x''"));
//! # Ok::<(), function_chain::ChainError>(())
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod syntax;
pub mod value;

// Re-exports
pub use chain::{Chain, ChainKind, Pull, PullChain, Relay, RelayChain, RelayFn, Step};
pub use config::ChainConfig;
pub use error::{ChainError, Result};
pub use syntax::{split_path, AliasContext};
pub use value::{expect_arity, expect_arity_range, DynObject, Func, Method, Receiver, Value};

/// Build a pull chain over `receiver` from `steps` and call it once.
pub fn pull<I, S>(receiver: impl Into<Value>, steps: I) -> Result<Value>
where
    I: IntoIterator<Item = S>,
    S: Into<Step>,
{
    PullChain::with_steps(receiver, steps)?.call()
}
