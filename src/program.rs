//! Compiled programs
//!
//! A [`Program`] is the flat op sequence a template compiles to: collected
//! prefix ops first, then body ops. Expression operands are still raw text
//! at this stage; parsing them happens when the program is built into a
//! [`crate::Template`]. The `Display` form is a line-per-op program dump.

use crate::ast::Span;
use crate::error::TemplateSource;
use std::fmt;

/// One operation of a compiled template
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Append literal text
    Text(String),
    /// Append the null-safe stringification of an expression
    Show(String),
    /// Append an expression without null-safety
    Print(String),
    /// Append the HTML-escaped stringification of an expression
    Escape(String),
    /// Log an expression's value; no output
    Log(String),
    /// Open a conditional block
    If(String),
    /// Open a conditional block on the negation
    Unless(String),
    /// Close the current branch, open a conditional branch
    ElseIf(String),
    /// Close the current branch, open the unconditional branch
    Else,
    /// Close a conditional-family block
    End,
    /// Open an indexed loop
    For { expr: String, alias: Option<String> },
    /// Close an indexed loop
    EndFor,
    /// Open a keyed iteration
    Each { expr: String, alias: Option<String> },
    /// Close a keyed iteration
    EndEach,
    /// Open a single-value scope
    With { expr: String, alias: Option<String> },
    /// Close a single-value scope
    EndWith,
    /// Append a rendered partial
    Render { name: String, data: Option<String> },
    /// Open a conditional true on the first index of the innermost loop
    First,
    /// Open a conditional true on the last index of the innermost loop
    Last,
    /// Bind a variable in the current scope
    Set { name: String, expr: String },
    /// Evaluate an expression and discard it
    Stmt(String),
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Text(t) => write!(f, "text {t:?}"),
            Op::Show(e) => write!(f, "show {e}"),
            Op::Print(e) => write!(f, "print {e}"),
            Op::Escape(e) => write!(f, "escape {e}"),
            Op::Log(e) => write!(f, "log {e}"),
            Op::If(e) => write!(f, "if {e}"),
            Op::Unless(e) => write!(f, "unless {e}"),
            Op::ElseIf(e) => write!(f, "else if {e}"),
            Op::Else => write!(f, "else"),
            Op::End => write!(f, "end"),
            Op::For { expr, alias } => write_loop(f, "for", expr, alias),
            Op::EndFor => write!(f, "endfor"),
            Op::Each { expr, alias } => write_loop(f, "each", expr, alias),
            Op::EndEach => write!(f, "endeach"),
            Op::With { expr, alias } => write_loop(f, "with", expr, alias),
            Op::EndWith => write!(f, "endwith"),
            Op::Render { name, data } => match data {
                Some(data) => write!(f, "render {name} {data}"),
                None => write!(f, "render {name}"),
            },
            Op::First => write!(f, "first"),
            Op::Last => write!(f, "last"),
            Op::Set { name, expr } => write!(f, "set {name} = {expr}"),
            Op::Stmt(e) => write!(f, "do {e}"),
        }
    }
}

fn write_loop(f: &mut fmt::Formatter<'_>, kw: &str, expr: &str, alias: &Option<String>) -> fmt::Result {
    match alias {
        Some(alias) => write!(f, "{kw} {expr} as {alias}"),
        None => write!(f, "{kw} {expr}"),
    }
}

/// An op with the span of the tag it came from
#[derive(Debug, Clone)]
pub struct OpCode {
    pub op: Op,
    pub span: Span,
}

/// A one-time setup op contributed by a macro, keyed by the macro's name
#[derive(Debug, Clone)]
pub struct Prefix {
    pub name: String,
    pub op: Op,
}

/// A compiled template: prefix ops, body ops, and the source they point into
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) source: TemplateSource,
    pub(crate) prefix: Vec<Prefix>,
    pub(crate) body: Vec<OpCode>,
}

impl Program {
    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    pub fn prefix(&self) -> &[Prefix] {
        &self.prefix
    }

    pub fn body(&self) -> &[OpCode] {
        &self.body
    }

    /// All ops in execution order: prefix first, then body
    pub fn ops(&self) -> impl Iterator<Item = &Op> {
        self.prefix
            .iter()
            .map(|p| &p.op)
            .chain(self.body.iter().map(|c| &c.op))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in self.ops() {
            writeln!(f, "{op}")?;
        }
        Ok(())
    }
}
