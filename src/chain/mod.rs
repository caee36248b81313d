//! Chains and the mutation surface they share.
//!
//! A [`Chain`] is an ordered list of elements plus the state of its kind.
//! Both kinds are assembled the same way; they only differ in how a step is
//! compiled into an element and in how `call` runs the elements.

mod pull;
mod relay;
mod step;

pub use pull::{Pull, PullChain};
pub use relay::{Relay, RelayChain, RelayFn};
pub use step::Step;

use crate::config::ChainConfig;
use crate::error::{ChainError, Result};
use crate::syntax::split_path;
use std::fmt;
use tracing::debug;

/// Behavior that distinguishes one chain kind from another.
pub trait ChainKind {
    /// Shown by `Display`.
    const NAME: &'static str;

    /// Executable form of one step.
    type Op: Clone;

    /// Compile a single step. Text steps arrive one segment at a time.
    fn compile(step: Step) -> Result<Self::Op>;
}

/// One executable step together with the literal it was built from.
#[derive(Clone)]
pub struct Element<Op> {
    literal: String,
    op: Op,
}

/// An ordered, editable sequence of steps.
///
/// Mutations happen in place and return the chain, so calls can be strung
/// together with `?`. No mutation runs a step.
pub struct Chain<K: ChainKind> {
    elements: Vec<Element<K::Op>>,
    config: ChainConfig,
    state: K,
}

impl<K: ChainKind> Chain<K> {
    fn from_state(state: K) -> Self {
        Self {
            elements: Vec::new(),
            config: ChainConfig::default(),
            state,
        }
    }

    /// Replace the configuration used for steps inserted from now on.
    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Literal specification of each element, in order.
    pub fn literals(&self) -> impl Iterator<Item = &str> + '_ {
        self.elements.iter().map(|e| e.literal.as_str())
    }

    /// Append a step. A text step may append several elements.
    pub fn add(&mut self, step: impl Into<Step>) -> Result<&mut Self> {
        let end = self.len();
        self.insert_at(end, step)
    }

    /// Append several steps in order.
    pub fn add_all<I, S>(&mut self, steps: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Step>,
    {
        let end = self.len();
        self.insert_all_at(end, steps)
    }

    /// Insert a step at `index`, shifting later elements right.
    pub fn insert_at(&mut self, index: usize, step: impl Into<Step>) -> Result<&mut Self> {
        self.splice(index, vec![step.into()])?;
        Ok(self)
    }

    /// Insert several steps starting at `index`, keeping their order.
    pub fn insert_all_at<I, S>(&mut self, index: usize, steps: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Step>,
    {
        let steps: Vec<Step> = steps.into_iter().map(Into::into).collect();
        self.splice(index, steps)?;
        Ok(self)
    }

    pub fn delete_at(&mut self, index: usize) -> Result<&mut Self> {
        if index >= self.elements.len() {
            return Err(ChainError::IndexOutOfRange {
                index,
                len: self.elements.len(),
            });
        }
        let removed = self.elements.remove(index);
        debug!(chain = K::NAME, index, step = %removed.literal, "deleted step");
        Ok(self)
    }

    pub fn clear(&mut self) -> &mut Self {
        self.elements.clear();
        self
    }

    /// Compile every step, then insert all produced elements at `index`.
    /// Returns how many elements were inserted. Nothing is inserted if any
    /// step fails to compile.
    fn splice(&mut self, index: usize, steps: Vec<Step>) -> Result<usize> {
        if index > self.elements.len() {
            return Err(ChainError::IndexOutOfRange {
                index,
                len: self.elements.len(),
            });
        }

        let mut built = Vec::with_capacity(steps.len());
        for step in steps {
            match step {
                Step::Text(text) => {
                    for segment in split_path(&text, &self.config) {
                        built.push(Self::element(Step::Text(segment))?);
                    }
                }
                step => built.push(Self::element(step)?),
            }
        }

        let count = built.len();
        self.elements.splice(index..index, built);
        debug!(chain = K::NAME, index, count, len = self.elements.len(), "inserted steps");
        Ok(count)
    }

    fn element(step: Step) -> Result<Element<K::Op>> {
        let literal = step.literal();
        let op = K::compile(step)?;
        Ok(Element { literal, op })
    }
}

impl<K: ChainKind> fmt::Display for Chain<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", K::NAME)?;
        for (i, literal) in self.literals().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(literal)?;
        }
        f.write_str("]")
    }
}

impl<K: ChainKind> fmt::Debug for Chain<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(K::NAME)
            .field("steps", &self.literals().collect::<Vec<_>>())
            .finish()
    }
}
