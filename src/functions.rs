//! Function registry and the built-in standard library.
//!
//! Functions are looked up case-insensitively. Each entry declares its
//! [`Arity`], which is checked before the body runs, so built-ins can index
//! their arguments freely.

mod datetime;
mod format;
mod numeric;
mod strings;
mod tables;

use std::{collections::HashMap, fmt};

use rust_decimal::{Decimal, prelude::ToPrimitive};

pub use datetime::{DateMask, SUPPORTED_INPUT_MASKS};
pub(crate) use numeric::{checked_add, checked_mul, checked_sub, divide, floored_mod};

use crate::{error::EvalError, evaluator::EvalContext, value::Value};

/// Accepted argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    /// Inclusive range
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::Range(lo, hi) => (lo..=hi).contains(&count),
            Arity::AtLeast(n) => count >= n,
        }
    }

    pub fn check(&self, function: &str, count: usize) -> Result<(), EvalError> {
        if self.accepts(count) {
            return Ok(());
        }
        Err(EvalError::Arity {
            function: function.to_string(),
            expected: self.to_string(),
            found: count,
        })
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::Range(lo, hi) if hi == &(lo + 1) => write!(f, "{} or {}", lo, hi),
            Arity::Range(lo, hi) => write!(f, "{}..{}", lo, hi),
            Arity::AtLeast(n) => write!(f, ">= {}", n),
        }
    }
}

/// Grouping used by `quill functions` and the docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Conditional,
    String,
    Numeric,
    Formatting,
    DateTime,
    Lookup,
    Custom,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Conditional => "Conditional",
            Category::String => "String",
            Category::Numeric => "Numeric",
            Category::Formatting => "Formatting",
            Category::DateTime => "Date/Time",
            Category::Lookup => "Lookup",
            Category::Custom => "Custom",
        }
    }
}

/// Evaluated arguments of one call, tagged with the function name for
/// error messages.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    function: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(function: &'a str, values: &'a [Value]) -> Self {
        Args { function, values }
    }

    pub fn function(&self) -> &str {
        self.function
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn get(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index)
    }

    fn missing(&self, index: usize) -> EvalError {
        EvalError::Arity {
            function: self.function.to_string(),
            expected: format!(">= {}", index + 1),
            found: self.values.len(),
        }
    }

    fn value(&self, index: usize) -> Result<&'a Value, EvalError> {
        self.values.get(index).ok_or_else(|| self.missing(index))
    }

    /// String form of argument `index`; every value has one.
    pub fn string(&self, index: usize) -> Result<String, EvalError> {
        self.value(index).map(Value::to_string)
    }

    /// Argument as a string if present.
    pub fn optional_string(&self, index: usize) -> Option<String> {
        self.get(index).map(Value::to_string)
    }

    pub fn number(&self, index: usize) -> Result<Decimal, EvalError> {
        let value = self.value(index)?;
        value.as_number().ok_or_else(|| {
            EvalError::argument(self.function, index + 1, "numeric", &describe(value))
        })
    }

    /// Exact integer argument; a fractional part is a type error.
    pub fn integer(&self, index: usize) -> Result<i64, EvalError> {
        let n = self.number(index)?;
        if !n.fract().is_zero() {
            return Err(EvalError::argument(
                self.function,
                index + 1,
                "an integer",
                &n.normalize().to_string(),
            ));
        }
        n.to_i64().ok_or_else(|| {
            EvalError::Range(format!(
                "'{}' argument {} is too large",
                self.function,
                index + 1
            ))
        })
    }

    /// Position or count argument: fractions are truncated toward zero and
    /// huge magnitudes saturate.
    pub fn index(&self, index: usize) -> Result<i64, EvalError> {
        let n = self.number(index)?.trunc();
        Ok(n.to_i64()
            .unwrap_or(if n.is_sign_negative() { i64::MIN } else { i64::MAX }))
    }

    pub fn boolean(&self, index: usize) -> Result<bool, EvalError> {
        self.value(index).map(Value::is_truthy)
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string '{}'", s),
        other => other.type_name().to_string(),
    }
}

/// Native function body.
pub type NativeFn = dyn Fn(&EvalContext<'_>, &Args<'_>) -> Result<Value, EvalError>;

/// A registered function.
pub struct Function {
    name: String,
    arity: Arity,
    category: Category,
    body: Box<NativeFn>,
}

impl Function {
    /// Name with the spelling it was registered under
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Checks arity, then runs the body.
    pub fn call(&self, ctx: &EvalContext<'_>, values: &[Value]) -> Result<Value, EvalError> {
        self.arity.check(&self.name, values.len())?;
        (self.body)(ctx, &Args::new(&self.name, values))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("category", &self.category)
            .finish()
    }
}

/// Case-insensitive name → function table.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Function>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in.
    pub fn with_builtins() -> Self {
        let mut registry = FunctionRegistry::new();
        registry.add("If", Arity::Exact(3), Category::Conditional, |_, args| {
            let chosen = if args.boolean(0)? { 1 } else { 2 };
            args.value(chosen).cloned()
        });
        strings::register(&mut registry);
        numeric::register(&mut registry);
        format::register(&mut registry);
        datetime::register(&mut registry);
        tables::register(&mut registry);
        registry
    }

    fn add<F>(&mut self, name: &str, arity: Arity, category: Category, body: F)
    where
        F: Fn(&EvalContext<'_>, &Args<'_>) -> Result<Value, EvalError> + 'static,
    {
        self.functions.insert(
            name.to_lowercase(),
            Function {
                name: name.to_string(),
                arity,
                category,
                body: Box::new(body),
            },
        );
    }

    /// Registers (or replaces) a caller-supplied function.
    ///
    /// ```
    /// use quill_lang::{Arity, Document, Evaluator, Value};
    ///
    /// let mut evaluator = Evaluator::new();
    /// evaluator.registry_mut().register("Twice", Arity::Exact(1), |_, args| {
    ///     Ok(Value::String(args.string(0)?.repeat(2)))
    /// });
    /// let result = evaluator.eval_script("twice('ab')", &Document::empty()).unwrap();
    /// assert_eq!(result, Value::String("abab".to_string()));
    /// ```
    pub fn register<F>(&mut self, name: &str, arity: Arity, body: F)
    where
        F: Fn(&EvalContext<'_>, &Args<'_>) -> Result<Value, EvalError> + 'static,
    {
        self.add(name, arity, Category::Custom, body);
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Functions sorted by category, then by name.
    pub fn functions(&self) -> Vec<&Function> {
        let mut all: Vec<&Function> = self.functions.values().collect();
        all.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.name.cmp(&b.name))
        });
        all
    }
}
