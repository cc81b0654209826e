//! Values, scopes, and expression evaluation
//!
//! Evaluation follows the behavior a host scripting runtime would give the
//! same expressions: truthiness treats empty lists and dicts as true, `+`
//! concatenates when either side is a string, division is float division,
//! and arithmetic on unsuitable operands yields null rather than an error.
//! The one hard error is reading a field or index off null.

use crate::ast::{BinaryOp, Expr, Literal, Span, UnaryOp};
use crate::error::TypeError;
use miette::{NamedSource, Result};
use std::collections::{BTreeMap, HashMap};

/// A data value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(BTreeMap<String, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }

    /// Truthiness: null, false, zero, NaN, and the empty string are falsy;
    /// everything else (including empty lists and dicts) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Dict(_) => true,
        }
    }

    /// Null-safe display form: null prints as the empty string, lists join
    /// their elements with commas, dicts print as `[object]`.
    pub fn render_to_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::render_to_string)
                .collect::<Vec<_>>()
                .join(","),
            Value::Dict(_) => "[object]".to_string(),
        }
    }

    /// Raw display form: like [`render_to_string`](Self::render_to_string)
    /// except null prints as `null`.
    pub fn render_raw(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            other => other.render_to_string(),
        }
    }
}

/// Floats with no fractional part print as integers
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(map: BTreeMap<String, T>) -> Self {
        Value::Dict(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Variable scopes for rendering.
///
/// The root scope binds `d` to the data the template was invoked with;
/// loops and `with` push scopes on entry and pop them on exit.
#[derive(Debug, Default)]
pub struct Context {
    scopes: Vec<HashMap<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// A context whose root scope binds `d` to the given data.
    pub fn with_data(data: Value) -> Self {
        let mut ctx = Self::new();
        ctx.set("d", data);
        ctx
    }

    /// Set a variable in the innermost scope
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value);
        }
    }

    /// Look up a variable, innermost scope first
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }
}

/// Evaluates expressions against a [`Context`].
///
/// Holds the expression text so type errors can label the offending spot.
pub struct Evaluator<'a> {
    ctx: &'a Context,
    source: &'a str,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a Context, source: &'a str) -> Self {
        Self { ctx, source }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(self.eval_literal(lit)),
            Expr::Var(ident) => Ok(self.lookup(&ident.name)),
            Expr::Field(field) => {
                let base = self.eval(&field.base)?;
                self.eval_field(base, &field.field.name, field.base.span())
            }
            Expr::Index(index) => {
                let base = self.eval(&index.base)?;
                let idx = self.eval(&index.index)?;
                self.eval_index(base, idx, index.base.span())
            }
            Expr::Binary(binary) => {
                // Logical operators short-circuit and return an operand,
                // not a coerced bool
                match binary.op {
                    BinaryOp::And => {
                        let left = self.eval(&binary.left)?;
                        if left.is_truthy() {
                            self.eval(&binary.right)
                        } else {
                            Ok(left)
                        }
                    }
                    BinaryOp::Or => {
                        let left = self.eval(&binary.left)?;
                        if left.is_truthy() {
                            Ok(left)
                        } else {
                            self.eval(&binary.right)
                        }
                    }
                    op => {
                        let left = self.eval(&binary.left)?;
                        let right = self.eval(&binary.right)?;
                        Ok(eval_binary(op, left, right))
                    }
                }
            }
            Expr::Unary(unary) => {
                let value = self.eval(&unary.expr)?;
                Ok(match unary.op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => match value {
                        Value::Int(i) => Value::Int(-i),
                        Value::Float(f) => Value::Float(-f),
                        _ => Value::Null,
                    },
                })
            }
        }
    }

    fn eval_literal(&self, lit: &Literal) -> Value {
        match lit {
            Literal::String(s) => Value::Str(s.value.clone()),
            Literal::Int(i) => Value::Int(i.value),
            Literal::Float(f) => Value::Float(f.value),
            Literal::Bool(b) => Value::Bool(b.value),
            Literal::Null(_) => Value::Null,
        }
    }

    /// Bare identifiers resolve through local bindings first, then as a
    /// field of the current `d`, then to null.
    fn lookup(&self, name: &str) -> Value {
        if let Some(value) = self.ctx.get(name) {
            return value.clone();
        }
        if let Some(Value::Dict(dict)) = self.ctx.get("d") {
            if let Some(value) = dict.get(name) {
                return value.clone();
            }
        }
        Value::Null
    }

    fn eval_field(&self, base: Value, field: &str, span: Span) -> Result<Value> {
        match base {
            Value::Null => Err(TypeError {
                expected: "a value".to_string(),
                found: "null".to_string(),
                context: format!("field access `.{field}`"),
                span,
                src: NamedSource::new("expression", self.source.to_string()),
            })?,
            Value::Dict(dict) => Ok(dict.get(field).cloned().unwrap_or(Value::Null)),
            Value::List(items) if field == "length" => Ok(Value::Int(items.len() as i64)),
            Value::Str(s) if field == "length" => Ok(Value::Int(s.chars().count() as i64)),
            _ => Ok(Value::Null),
        }
    }

    fn eval_index(&self, base: Value, index: Value, span: Span) -> Result<Value> {
        match base {
            Value::Null => Err(TypeError {
                expected: "a value".to_string(),
                found: "null".to_string(),
                context: "index access".to_string(),
                span,
                src: NamedSource::new("expression", self.source.to_string()),
            })?,
            Value::List(items) => Ok(match as_index(&index) {
                Some(i) if i < items.len() => items[i].clone(),
                _ => Value::Null,
            }),
            Value::Str(s) => Ok(match as_index(&index) {
                Some(i) => s
                    .chars()
                    .nth(i)
                    .map(|c| Value::Str(c.to_string()))
                    .unwrap_or(Value::Null),
                None => Value::Null,
            }),
            Value::Dict(dict) => Ok(match index {
                Value::Str(key) => dict.get(&key).cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            }),
            _ => Ok(Value::Null),
        }
    }
}

/// Non-negative integral index, accepting whole floats
fn as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Int(i) if *i >= 0 => Some(*i as usize),
        Value::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Some(*f as usize),
        _ => None,
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Value {
    match op {
        BinaryOp::Add => binary_add(left, right),
        BinaryOp::Sub => binary_numeric(left, right, |a, b| a - b),
        BinaryOp::Mul => binary_numeric(left, right, |a, b| a * b),
        BinaryOp::Mod => match (as_number(&left), as_number(&right)) {
            (Some(a), Some(b)) if b != 0.0 => number_value(a % b, &left, &right),
            _ => Value::Null,
        },
        // Division is always float division
        BinaryOp::Div => match (as_number(&left), as_number(&right)) {
            (Some(a), Some(b)) if b != 0.0 => Value::Float(a / b),
            _ => Value::Null,
        },
        BinaryOp::Eq => Value::Bool(values_equal(&left, &right)),
        BinaryOp::Ne => Value::Bool(!values_equal(&left, &right)),
        BinaryOp::Lt => compare(left, right, |o| o == std::cmp::Ordering::Less),
        BinaryOp::Le => compare(left, right, |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Gt => compare(left, right, |o| o == std::cmp::Ordering::Greater),
        BinaryOp::Ge => compare(left, right, |o| o != std::cmp::Ordering::Less),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled in eval"),
    }
}

/// `+` concatenates when either side is a string, otherwise adds numbers.
/// Int + Int stays an int.
fn binary_add(left: Value, right: Value) -> Value {
    if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
        return Value::Str(format!("{}{}", left.render_raw(), right.render_raw()));
    }
    binary_numeric(left, right, |a, b| a + b)
}

fn binary_numeric(left: Value, right: Value, f: impl Fn(f64, f64) -> f64) -> Value {
    match (as_number(&left), as_number(&right)) {
        (Some(a), Some(b)) => number_value(f(a, b), &left, &right),
        _ => Value::Null,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Results stay integral when both operands were ints and the result is whole
fn number_value(result: f64, left: &Value, right: &Value) -> Value {
    if matches!(left, Value::Int(_)) && matches!(right, Value::Int(_)) && result.fract() == 0.0 {
        Value::Int(result as i64)
    } else {
        Value::Float(result)
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (as_number(left), as_number(right)) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

fn compare(left: Value, right: Value, f: impl Fn(std::cmp::Ordering) -> bool) -> Value {
    let ordering = match (&left, &right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match (as_number(&left), as_number(&right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    // Comparison on mixed or unordered types is false
    Value::Bool(ordering.is_some_and(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_code;

    fn eval_with(source: &str, data: Value) -> Value {
        let code = parse_code(source).unwrap();
        let ctx = Context::with_data(data);
        Evaluator::new(&ctx, &code.text).eval(&code.root).unwrap()
    }

    fn eval(source: &str) -> Value {
        eval_with(source, Value::Null)
    }

    fn dict(entries: &[(&str, Value)]) -> Value {
        Value::Dict(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval("7 % 4"), Value::Int(3));
        assert_eq!(eval("-(1 + 2)"), Value::Int(-3));
    }

    #[test]
    fn test_division_is_float() {
        assert_eq!(eval("7 / 2"), Value::Float(3.5));
        assert_eq!(eval("6 / 2"), Value::Float(3.0));
        assert_eq!(eval("1 / 0"), Value::Null);
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(eval("\"a\" + 1"), Value::Str("a1".to_string()));
        assert_eq!(eval("1 + \"a\""), Value::Str("1a".to_string()));
        assert_eq!(eval("\"a\" + null"), Value::Str("anull".to_string()));
    }

    #[test]
    fn test_arithmetic_on_bad_operands_is_null() {
        assert_eq!(eval("true - 1"), Value::Null);
        assert_eq!(eval("null * 2"), Value::Null);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        // Empty collections are truthy
        assert!(Value::List(vec![]).is_truthy());
        assert!(Value::Dict(BTreeMap::new()).is_truthy());
    }

    #[test]
    fn test_logical_ops_return_operands() {
        assert_eq!(
            eval("null || \"fallback\""),
            Value::Str("fallback".to_string())
        );
        assert_eq!(eval("\"a\" || \"b\""), Value::Str("a".to_string()));
        assert_eq!(eval("\"a\" && \"b\""), Value::Str("b".to_string()));
        assert_eq!(eval("0 && \"b\""), Value::Int(0));
    }

    #[test]
    fn test_var_resolves_through_data() {
        let data = dict(&[("name", Value::from("Alice"))]);
        assert_eq!(eval_with("name", data.clone()), Value::from("Alice"));
        assert_eq!(eval_with("d.name", data.clone()), Value::from("Alice"));
        assert_eq!(eval_with("missing", data), Value::Null);
    }

    #[test]
    fn test_field_on_null_is_error() {
        let code = parse_code("d.a.b").unwrap();
        let ctx = Context::with_data(dict(&[("a", Value::Null)]));
        assert!(Evaluator::new(&ctx, &code.text).eval(&code.root).is_err());
    }

    #[test]
    fn test_index() {
        let data = dict(&[("items", Value::from(vec![10i64, 20, 30]))]);
        assert_eq!(eval_with("items[1]", data.clone()), Value::Int(20));
        assert_eq!(eval_with("items[9]", data), Value::Null);
    }

    #[test]
    fn test_length() {
        let data = dict(&[
            ("items", Value::from(vec![1i64, 2, 3])),
            ("name", Value::from("abcd")),
        ]);
        assert_eq!(eval_with("items.length", data.clone()), Value::Int(3));
        assert_eq!(eval_with("name.length", data), Value::Int(4));
    }

    #[test]
    fn test_length_on_dict_is_member_lookup() {
        // Dicts have no implicit length; `.length` is an ordinary key
        let data = dict(&[("obj", dict(&[("a", Value::Int(1))]))]);
        assert_eq!(eval_with("obj.length", data), Value::Null);
        let data = dict(&[("obj", dict(&[("length", Value::Int(9))]))]);
        assert_eq!(eval_with("obj.length", data), Value::Int(9));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("1 < 2"), Value::Bool(true));
        assert_eq!(eval("2 <= 2"), Value::Bool(true));
        assert_eq!(eval("\"a\" < \"b\""), Value::Bool(true));
        // Mixed types never compare
        assert_eq!(eval("\"a\" < 1"), Value::Bool(false));
    }

    #[test]
    fn test_equality() {
        assert_eq!(eval("1 == 1.0"), Value::Bool(true));
        assert_eq!(eval("1 === 1"), Value::Bool(true));
        assert_eq!(eval("\"a\" != \"b\""), Value::Bool(true));
        assert_eq!(eval("null == null"), Value::Bool(true));
    }

    #[test]
    fn test_stringification() {
        assert_eq!(Value::from(vec![1i64, 2]).render_to_string(), "1,2");
        assert_eq!(Value::Float(3.0).render_to_string(), "3");
        assert_eq!(Value::Float(3.5).render_to_string(), "3.5");
        assert_eq!(Value::Null.render_to_string(), "");
        assert_eq!(Value::Null.render_raw(), "null");
        assert_eq!(dict(&[]).render_to_string(), "[object]");
    }

    #[test]
    fn test_scopes_shadow() {
        let mut ctx = Context::with_data(dict(&[("x", Value::Int(1))]));
        ctx.push_scope();
        ctx.set("x", Value::Int(2));
        let code = parse_code("x").unwrap();
        assert_eq!(
            Evaluator::new(&ctx, &code.text).eval(&code.root).unwrap(),
            Value::Int(2)
        );
        ctx.pop_scope();
        assert_eq!(
            Evaluator::new(&ctx, &code.text).eval(&code.root).unwrap(),
            Value::Int(1)
        );
    }
}
