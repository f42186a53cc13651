use std::{cell::RefCell, cmp::Ordering};

use rust_decimal::Decimal;
use tracing::warn;

use crate::{
    ast::{BinOp, Expr},
    config::{EvalOptions, TypeDiscipline},
    document::Document,
    entities::decode_entities,
    error::{Error, EvalError},
    functions::{self, FunctionRegistry},
    lookup::{TableCache, TableSource},
    parser::parse_script,
    path::Path,
    value::Value,
};

/// A function failure that was turned into `""` because one of its
/// arguments was blank.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredFailure {
    pub function: String,
    pub error: EvalError,
}

/// Evaluation environment for one script.
///
/// Paths equal to the target path read the intermediate document (the
/// script sees its own earlier writes); every other path reads the output
/// snapshot.
pub struct EvalContext<'a> {
    registry: &'a FunctionRegistry,
    tables: &'a TableCache,
    options: &'a EvalOptions,
    output: &'a Document,
    intermediate: &'a Document,
    target: Option<Path>,
    recovered: RefCell<Vec<RecoveredFailure>>,
}

impl<'a> EvalContext<'a> {
    pub fn options(&self) -> &EvalOptions {
        self.options
    }

    pub fn tables(&self) -> &TableCache {
        self.tables
    }

    pub fn registry(&self) -> &FunctionRegistry {
        self.registry
    }

    pub fn target(&self) -> Option<&Path> {
        self.target.as_ref()
    }

    /// Reads a variable path from the snapshot it refers to.
    pub fn resolve(&self, path: &str) -> String {
        let path = Path::parse(path);
        let document = if self.target.as_ref() == Some(&path) {
            self.intermediate
        } else {
            self.output
        };
        document.resolve(&path, self.options.lenient_attributes)
    }

    /// Failures recovered so far, in evaluation order.
    pub fn into_recovered(self) -> Vec<RecoveredFailure> {
        self.recovered.into_inner()
    }

    /// Evaluates an expression tree.
    pub fn evaluate(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Number(n) => Ok(Value::Numeric(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Variable(path) => Ok(Value::String(self.resolve(path))),
            Expr::Negate(operand) => {
                let value = self.evaluate(operand)?;
                self.numeric_operand(&value, "negate").map(|n| Value::Numeric(-n))
            }
            Expr::BinaryOp { op, left, right } => {
                // Both sides always run; && and || do not short-circuit
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.apply_binop(*op, &left, &right)
            }
            Expr::Call { name, args } if expr.is_conditional() => self.eval_conditional(name, args),
            Expr::Call { name, args } => self.eval_call(name, args),
        }
    }

    /// `If(cond, then, else)` evaluates only the branch it selects.
    fn eval_conditional(&self, name: &str, args: &[Expr]) -> Result<Value, EvalError> {
        let [condition, then_branch, else_branch] = args else {
            return Err(EvalError::Arity {
                function: name.to_string(),
                expected: "3".to_string(),
                found: args.len(),
            });
        };

        let condition = self.evaluate(condition)?;
        let taken = match (self.options.discipline, &condition) {
            (TypeDiscipline::Strict, Value::Boolean(b)) => *b,
            (TypeDiscipline::Strict, other) => {
                return Err(EvalError::argument(name, 1, "boolean", other.type_name()));
            }
            (TypeDiscipline::Coercive, value) => value.is_truthy(),
        };
        self.evaluate(if taken { then_branch } else { else_branch })
    }

    fn eval_call(&self, name: &str, args: &[Expr]) -> Result<Value, EvalError> {
        let function = self
            .registry
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;

        let values = args
            .iter()
            .map(|arg| self.evaluate(arg))
            .collect::<Result<Vec<_>, _>>()?;

        match function.call(self, &values) {
            Err(error)
                if self.options.recover_blank_arguments
                    && !matches!(error, EvalError::UnknownFunction(_))
                    && values.iter().any(Value::is_blank) =>
            {
                warn!(function = function.name(), %error, "blank argument; returning empty string");
                self.recovered.borrow_mut().push(RecoveredFailure {
                    function: function.name().to_string(),
                    error,
                });
                Ok(Value::String(String::new()))
            }
            result => result,
        }
    }

    fn type_error(&self, op: BinOp, left: &Value, right: &Value) -> EvalError {
        EvalError::Type(format!(
            "cannot apply '{}' to {} and {}",
            op,
            left.type_name(),
            right.type_name()
        ))
    }

    fn numeric_operand(&self, value: &Value, what: &str) -> Result<Decimal, EvalError> {
        let number = match (self.options.discipline, value) {
            (_, Value::Numeric(n)) => Some(*n),
            (TypeDiscipline::Coercive, other) => other.as_number(),
            (TypeDiscipline::Strict, _) => None,
        };
        number.ok_or_else(|| {
            EvalError::Type(format!("cannot {} {}", what, value.type_name()))
        })
    }

    /// Both operands as numbers, if the discipline allows reading them so.
    fn numeric_pair(&self, left: &Value, right: &Value) -> Option<(Decimal, Decimal)> {
        match (self.options.discipline, left, right) {
            (_, Value::Numeric(a), Value::Numeric(b)) => Some((*a, *b)),
            (TypeDiscipline::Coercive, a, b) => Some((a.as_number()?, b.as_number()?)),
            (TypeDiscipline::Strict, _, _) => None,
        }
    }

    fn apply_binop(&self, op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
        let arithmetic = |f: fn(Decimal, Decimal) -> Result<Decimal, EvalError>| {
            let (a, b) = self
                .numeric_pair(left, right)
                .ok_or_else(|| self.type_error(op, left, right))?;
            f(a, b).map(Value::Numeric)
        };

        match op {
            BinOp::Add => match (self.options.discipline, left, right) {
                (TypeDiscipline::Strict, Value::String(a), Value::String(b)) => {
                    Ok(Value::String(format!("{}{}", a, b)))
                }
                (TypeDiscipline::Strict, _, _) => arithmetic(functions::checked_add),
                (TypeDiscipline::Coercive, _, _) => match self.numeric_pair(left, right) {
                    Some((a, b)) => functions::checked_add(a, b).map(Value::Numeric),
                    None => Ok(Value::String(format!("{}{}", left, right))),
                },
            },
            BinOp::Subtract => arithmetic(functions::checked_sub),
            BinOp::Multiply => arithmetic(functions::checked_mul),
            BinOp::Divide => arithmetic(functions::divide),
            BinOp::Modulo => {
                let (a, b) = self
                    .numeric_pair(left, right)
                    .ok_or_else(|| self.type_error(op, left, right))?;
                if !a.fract().is_zero() || !b.fract().is_zero() {
                    return Err(EvalError::Type(format!(
                        "'%' requires integer operands, got {} and {}",
                        a.normalize(),
                        b.normalize()
                    )));
                }
                functions::floored_mod(a, b).map(Value::Numeric)
            }
            BinOp::Equal => self.equals(op, left, right).map(Value::Boolean),
            BinOp::NotEqual => self.equals(op, left, right).map(|eq| Value::Boolean(!eq)),
            BinOp::LessThan => self.compare(op, left, right).map(|o| Value::Boolean(o.is_lt())),
            BinOp::GreaterThan => self.compare(op, left, right).map(|o| Value::Boolean(o.is_gt())),
            BinOp::LessEqual => self.compare(op, left, right).map(|o| Value::Boolean(o.is_le())),
            BinOp::GreaterEqual => self.compare(op, left, right).map(|o| Value::Boolean(o.is_ge())),
            BinOp::And | BinOp::Or => {
                let (a, b) = match (self.options.discipline, left, right) {
                    (TypeDiscipline::Strict, Value::Boolean(a), Value::Boolean(b)) => (*a, *b),
                    (TypeDiscipline::Strict, _, _) => return Err(self.type_error(op, left, right)),
                    (TypeDiscipline::Coercive, a, b) => (a.is_truthy(), b.is_truthy()),
                };
                Ok(Value::Boolean(if op == BinOp::And { a && b } else { a || b }))
            }
        }
    }

    fn equals(&self, op: BinOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
        if let Some((a, b)) = self.numeric_pair(left, right) {
            return Ok(a == b);
        }
        match (self.options.discipline, left, right) {
            (TypeDiscipline::Strict, Value::Boolean(a), Value::Boolean(b)) => Ok(a == b),
            (TypeDiscipline::Strict, Value::String(a), Value::String(b)) => Ok(a == b),
            (TypeDiscipline::Strict, _, _) => Err(self.type_error(op, left, right)),
            (TypeDiscipline::Coercive, Value::Boolean(_), _)
            | (TypeDiscipline::Coercive, _, Value::Boolean(_)) => {
                Ok(left.is_truthy() == right.is_truthy())
            }
            (TypeDiscipline::Coercive, _, _) => Ok(left.to_string() == right.to_string()),
        }
    }

    fn compare(&self, op: BinOp, left: &Value, right: &Value) -> Result<Ordering, EvalError> {
        if let Some((a, b)) = self.numeric_pair(left, right) {
            return Ok(a.cmp(&b));
        }
        match (self.options.discipline, left, right) {
            (_, Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            (TypeDiscipline::Strict, _, _) => Err(self.type_error(op, left, right)),
            (TypeDiscipline::Coercive, _, _) => Ok(left.to_string().cmp(&right.to_string())),
        }
    }
}

/// Owns the function registry, the lookup-table cache and the options;
/// one evaluator serves a whole run.
///
/// # Examples
///
/// ```
/// use quill_lang::{Document, Evaluator, Value};
///
/// let doc = Document::from_json_str(r#"{"Owner": {"First": "Ada", "Last": "Lovelace"}}"#).unwrap();
/// let evaluator = Evaluator::new();
///
/// let name = evaluator.eval_script("Concat(Owner/First, ' ', Owner/Last)", &doc).unwrap();
/// assert_eq!(name, Value::String("Ada Lovelace".to_string()));
/// ```
#[derive(Debug)]
pub struct Evaluator {
    registry: FunctionRegistry,
    tables: TableCache,
    options: EvalOptions,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Built-in functions, default options, no lookup tables.
    pub fn new() -> Self {
        Evaluator::with_options(EvalOptions::default())
    }

    pub fn with_options(options: EvalOptions) -> Self {
        Evaluator {
            registry: FunctionRegistry::with_builtins(),
            tables: TableCache::default(),
            options,
        }
    }

    /// Serves `Lookup` tables from `source`. Replaces any cached tables.
    pub fn with_table_source(mut self, source: impl TableSource + 'static) -> Self {
        self.tables = TableCache::new(source);
        self
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// For registering extra functions before evaluation starts.
    pub fn registry_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.registry
    }

    pub fn tables(&self) -> &TableCache {
        &self.tables
    }

    /// Builds the context for one instruction.
    pub fn context<'a>(
        &'a self,
        output: &'a Document,
        intermediate: &'a Document,
        target: Option<&str>,
    ) -> EvalContext<'a> {
        EvalContext {
            registry: &self.registry,
            tables: &self.tables,
            options: &self.options,
            output,
            intermediate,
            target: target.map(Path::parse),
            recovered: RefCell::new(Vec::new()),
        }
    }

    /// Evaluates `expr` against a single document, with no target path.
    pub fn eval_expression(&self, expr: &Expr, document: &Document) -> Result<Value, EvalError> {
        self.context(document, document, None).evaluate(expr)
    }

    /// Decodes entities, parses and evaluates `script` against `document`.
    pub fn eval_script(&self, script: &str, document: &Document) -> Result<Value, Error> {
        let expr = parse_script(&decode_entities(script))?;
        Ok(self.eval_expression(&expr, document)?)
    }
}
