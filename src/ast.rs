//! AST for embedded expressions and built templates
//!
//! Every expression node carries a [`Span`] into the expression text it was
//! parsed from, for precise error reporting. Expressions are parsed once at
//! build time and evaluated many times.

use miette::SourceSpan;

/// A span in the source (re-export from miette)
pub type Span = SourceSpan;

/// Create a span from offset and length
pub fn span(offset: usize, len: usize) -> Span {
    SourceSpan::new(offset.into(), len)
}

/// An expression together with the text it was parsed from.
///
/// The text is kept so evaluation errors can label the offending token
/// inside the expression itself.
#[derive(Debug, Clone)]
pub struct Code {
    pub text: String,
    pub root: Expr,
}

/// An expression
#[derive(Debug, Clone)]
pub enum Expr {
    /// Literal value
    Literal(Literal),
    /// Variable reference
    Var(Ident),
    /// Field access: expr.field
    Field(FieldExpr),
    /// Index access: `expr[index]`
    Index(IndexExpr),
    /// Binary operation: expr op expr
    Binary(BinaryExpr),
    /// Unary operation: op expr
    Unary(UnaryExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(l) => l.span(),
            Expr::Var(i) => i.span,
            Expr::Field(f) => f.span,
            Expr::Index(i) => i.span,
            Expr::Binary(b) => b.span,
            Expr::Unary(u) => u.span,
        }
    }
}

/// A literal value
#[derive(Debug, Clone)]
pub enum Literal {
    String(StringLit),
    Int(IntLit),
    Float(FloatLit),
    Bool(BoolLit),
    Null(NullLit),
}

impl Literal {
    pub fn span(&self) -> Span {
        match self {
            Literal::String(l) => l.span,
            Literal::Int(l) => l.span,
            Literal::Float(l) => l.span,
            Literal::Bool(l) => l.span,
            Literal::Null(l) => l.span,
        }
    }
}

/// String literal
#[derive(Debug, Clone)]
pub struct StringLit {
    pub value: String,
    pub span: Span,
}

/// Integer literal
#[derive(Debug, Clone)]
pub struct IntLit {
    pub value: i64,
    pub span: Span,
}

/// Float literal
#[derive(Debug, Clone)]
pub struct FloatLit {
    pub value: f64,
    pub span: Span,
}

/// Boolean literal
#[derive(Debug, Clone)]
pub struct BoolLit {
    pub value: bool,
    pub span: Span,
}

/// Null literal (`null` or `none`)
#[derive(Debug, Clone)]
pub struct NullLit {
    pub span: Span,
}

/// An identifier
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// Field access: expr.field
#[derive(Debug, Clone)]
pub struct FieldExpr {
    pub base: Box<Expr>,
    pub field: Ident,
    pub span: Span,
}

/// Index access: `expr[index]`
#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub base: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

/// Binary expression
#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
    pub span: Span,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
}

/// Unary expression
#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
    pub span: Span,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

// ============================================================================
// Built template nodes
// ============================================================================

/// A node in a built template
#[derive(Debug, Clone)]
pub enum Node {
    /// Literal text appended verbatim
    Text(String),
    /// Null-safe expression interpolation
    Show(Code),
    /// Raw interpolation (null prints as `null`)
    Print(Code),
    /// HTML-escaped interpolation
    Escape(Code),
    /// Log the value of an expression; contributes no output
    Log(Code),
    /// Evaluate an expression and discard the result
    Stmt(Code),
    /// Bind a variable in the current scope
    Set { name: String, value: Code },
    /// Conditional with zero or more alternative arms
    If { arms: Vec<IfArm> },
    /// Indexed loop; tracks `_i`/`_len` and a loop frame
    For {
        iter: Code,
        alias: Option<String>,
        body: Vec<Node>,
    },
    /// Keyed iteration over lists and dicts; binds `_key`
    Each {
        iter: Code,
        alias: Option<String>,
        body: Vec<Node>,
    },
    /// Scoped rebinding of a single value; binds `_key` to 0
    With {
        value: Code,
        alias: Option<String>,
        body: Vec<Node>,
    },
    /// Append a rendered partial
    Render {
        name: String,
        data: Option<Code>,
        span: Span,
    },
}

/// One arm of a conditional
#[derive(Debug, Clone)]
pub struct IfArm {
    pub cond: Cond,
    pub body: Vec<Node>,
}

/// Condition of a conditional arm
#[derive(Debug, Clone)]
pub enum Cond {
    /// Truthiness of an expression
    Expr(Code),
    /// Falsiness of an expression (`unless`)
    Not(Code),
    /// First iteration of the innermost indexed loop
    First,
    /// Last iteration of the innermost indexed loop
    Last,
    /// Unconditional (`else`)
    Always,
}
