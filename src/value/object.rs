//! Host objects.

use super::{expect_arity, Func, Value};
use crate::error::{ChainError, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// A host object that chains can invoke operations on by name.
///
/// This is the only capability the engine needs from the outside world.
/// Implementations return [`ChainError::OperationNotFound`] for names they do
/// not know, so pull chains can tell a missing operation from a failing one.
pub trait Receiver {
    /// Name used in diagnostics.
    fn type_name(&self) -> &str;

    /// Run the operation `name`. `block` is the trailing callable, if the
    /// step supplied one.
    fn invoke(&self, name: &str, args: &[Value], block: Option<&Func>) -> Result<Value>;

    /// Rendering used by `to_s`, `inspect` and error context.
    fn describe(&self) -> String {
        format!("#<{}>", self.type_name())
    }
}

/// Signature of a [`DynObject`] method.
pub type Method = Rc<dyn Fn(&DynObject, &[Value], Option<&Func>) -> Result<Value>>;

/// A struct-like receiver built at runtime.
///
/// Fields answer zero-argument invocations of their name; methods are
/// closures that see the object itself. Methods shadow fields of the same
/// name.
///
/// # Example
///
/// ```
/// use function_chain::{DynObject, Value};
///
/// let shelf = DynObject::new("Shelf")
///     .with_field("books", vec![Value::from("Tragedy of X")])
///     .with_method("count", |this, _, _| {
///         Ok(Value::from(this.field("books").and_then(Value::as_list).map_or(0, <[_]>::len)))
///     })
///     .into_value();
///
/// assert_eq!(shelf.invoke("count", &[], None).unwrap(), Value::Int(1));
/// ```
pub struct DynObject {
    type_name: String,
    fields: BTreeMap<String, Value>,
    methods: HashMap<String, Method>,
}

impl DynObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
            methods: HashMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&DynObject, &[Value], Option<&Func>) -> Result<Value> + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn into_value(self) -> Value {
        Value::object(self)
    }
}

impl Receiver for DynObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn invoke(&self, name: &str, args: &[Value], block: Option<&Func>) -> Result<Value> {
        if let Some(method) = self.methods.get(name) {
            return method(self, args, block);
        }
        match self.fields.get(name) {
            Some(value) => {
                expect_arity(name, args, 0)?;
                Ok(value.clone())
            }
            None => Err(ChainError::operation_not_found(&self.type_name, name)),
        }
    }

    fn describe(&self) -> String {
        if self.fields.is_empty() {
            return format!("#<{}>", self.type_name);
        }
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.inspect()))
            .collect();
        format!("#<{} {}>", self.type_name, fields.join(", "))
    }
}

impl fmt::Debug for DynObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> DynObject {
        DynObject::new("Book")
            .with_field("title", "Tragedy of X")
            .with_field("author", "Ellery Queen")
            .with_method("byline", |this, _, _| {
                let title = this.field("title").cloned().unwrap_or_default();
                let author = this.field("author").cloned().unwrap_or_default();
                Ok(Value::from(format!("{} by {}", title, author)))
            })
    }

    #[test]
    fn test_field_access() {
        let book = book();
        assert_eq!(
            book.invoke("title", &[], None).unwrap(),
            Value::from("Tragedy of X")
        );
    }

    #[test]
    fn test_field_rejects_arguments() {
        let result = book().invoke("title", &[Value::Int(1)], None);
        assert!(matches!(result, Err(ChainError::OperationFailed { .. })));
    }

    #[test]
    fn test_method_sees_fields() {
        assert_eq!(
            book().invoke("byline", &[], None).unwrap(),
            Value::from("Tragedy of X by Ellery Queen")
        );
    }

    #[test]
    fn test_unknown_name() {
        let result = book().invoke("isbn", &[], None);
        assert_eq!(
            result.unwrap_err(),
            ChainError::operation_not_found("Book", "isbn")
        );
    }

    #[test]
    fn test_describe_lists_fields() {
        assert_eq!(
            book().describe(),
            "#<Book author=\"Ellery Queen\", title=\"Tragedy of X\">"
        );
    }
}
