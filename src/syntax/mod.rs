//! The string micro-language.
//!
//! A string step is first split into segments on the path delimiter. Each
//! pull segment may carry an `@alias = ` prefix, and its body is parsed into
//! an [`Expr`] that is evaluated against the current receiver at call time.

mod eval;
mod expr;
mod path;

pub use eval::{evaluate, AliasContext};
pub use expr::{parse, Expr};
pub use path::{is_identifier, split_alias, split_path};
