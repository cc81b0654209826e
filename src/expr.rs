//! Expression parser for tag contents
//!
//! Tokenizes and parses the small expression language embedded in tags,
//! producing a spanned AST. Parsing happens once at build time; evaluation
//! is in [`crate::eval`].

use crate::ast::*;
use crate::error::SyntaxError;
use miette::{NamedSource, Result};

/// A token with its span
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    fn new(kind: TokenKind, offset: usize, len: usize) -> Self {
        Self {
            kind,
            span: span(offset, len),
        }
    }
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    String(String), // "string" or 'string'
    Int(i64),       // 123
    Float(f64),     // 1.23
    Ident(String),  // variable_name

    // Keywords
    True,
    False,
    Null,

    // Delimiters and operators
    Dot,      // .
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Plus,     // +
    Minus,    // -
    Star,     // *
    Slash,    // /
    Percent,  // %
    Bang,     // !
    Eq,       // == or ===
    Ne,       // != or !==
    Lt,       // <
    Le,       // <=
    Gt,       // >
    Ge,       // >=
    And,      // &&
    Or,       // ||

    // Special
    Eof,
    Error(String),
}

impl TokenKind {
    fn from_ident(s: &str) -> TokenKind {
        match s {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" | "none" | "None" => TokenKind::Null,
            _ => TokenKind::Ident(s.to_string()),
        }
    }

    /// Human-readable form for error messages
    fn describe(&self) -> String {
        match self {
            TokenKind::String(s) => format!("string {s:?}"),
            TokenKind::Int(i) => format!("`{i}`"),
            TokenKind::Float(f) => format!("`{f}`"),
            TokenKind::Ident(name) => format!("`{name}`"),
            TokenKind::Eof => "end of expression".to_string(),
            TokenKind::Error(msg) => msg.clone(),
            other => format!("{other:?}"),
        }
    }
}

/// Tokenizer over one expression string
struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let start = self.pos;

        // Longest operators first
        let rest = &self.source[self.pos..];
        for (text, kind) in [
            ("===", TokenKind::Eq),
            ("!==", TokenKind::Ne),
            ("==", TokenKind::Eq),
            ("!=", TokenKind::Ne),
            ("<=", TokenKind::Le),
            (">=", TokenKind::Ge),
            ("&&", TokenKind::And),
            ("||", TokenKind::Or),
        ] {
            if rest.starts_with(text) {
                self.pos += text.len();
                return Token::new(kind, start, text.len());
            }
        }

        match self.peek() {
            None => Token::new(TokenKind::Eof, start, 0),
            Some(c) => match c {
                '.' => self.single(TokenKind::Dot, start),
                '(' => self.single(TokenKind::LParen, start),
                ')' => self.single(TokenKind::RParen, start),
                '[' => self.single(TokenKind::LBracket, start),
                ']' => self.single(TokenKind::RBracket, start),
                '+' => self.single(TokenKind::Plus, start),
                '-' => self.single(TokenKind::Minus, start),
                '*' => self.single(TokenKind::Star, start),
                '/' => self.single(TokenKind::Slash, start),
                '%' => self.single(TokenKind::Percent, start),
                '!' => self.single(TokenKind::Bang, start),
                '<' => self.single(TokenKind::Lt, start),
                '>' => self.single(TokenKind::Gt, start),
                '"' | '\'' => self.lex_string(c),
                '0'..='9' => self.lex_number(),
                c if c.is_alphabetic() || c == '_' => self.lex_ident(),
                _ => {
                    self.advance();
                    Token::new(
                        TokenKind::Error(format!("unexpected character `{c}`")),
                        start,
                        self.pos - start,
                    )
                }
            },
        }
    }

    fn single(&mut self, kind: TokenKind, start: usize) -> Token {
        self.advance();
        Token::new(kind, start, 1)
    }

    fn lex_string(&mut self, quote: char) -> Token {
        let start = self.pos;
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            match self.advance() {
                None => {
                    return Token::new(
                        TokenKind::Error("unclosed string".to_string()),
                        start,
                        self.pos - start,
                    );
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('\\') => value.push('\\'),
                    Some(c) if c == quote => value.push(c),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => break,
                },
                Some(c) => value.push(c),
            }
        }

        Token::new(TokenKind::String(value), start, self.pos - start)
    }

    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        let mut s = String::new();
        let mut is_float = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.advance();
            } else if c == '.' && !is_float {
                // Float only when a digit follows; otherwise the dot belongs
                // to a field access like `1 .length` and ends the number
                let after_dot = self.source[self.pos + 1..].chars().next();
                if after_dot.is_some_and(|c| c.is_ascii_digit()) {
                    is_float = true;
                    s.push('.');
                    self.advance();
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        if is_float {
            match s.parse::<f64>() {
                Ok(val) => Token::new(TokenKind::Float(val), start, self.pos - start),
                Err(_) => Token::new(
                    TokenKind::Error(format!("invalid number `{s}`")),
                    start,
                    self.pos - start,
                ),
            }
        } else {
            match s.parse::<i64>() {
                Ok(val) => Token::new(TokenKind::Int(val), start, self.pos - start),
                Err(_) => Token::new(
                    TokenKind::Error(format!("invalid number `{s}`")),
                    start,
                    self.pos - start,
                ),
            }
        }
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        let mut s = String::new();

        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }

        Token::new(TokenKind::from_ident(&s), start, self.pos - start)
    }
}

/// Parser state over one expression string
struct Parser<'a> {
    lexer: Lexer<'a>,
    source: &'a str,
    current: Token,
    previous: Token,
}

/// Parse an expression string into [`Code`].
pub fn parse_code(text: &str) -> Result<Code> {
    let root = Parser::new(text).parse()?;
    Ok(Code {
        text: text.to_string(),
        root,
    })
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            source,
            current: current.clone(),
            previous: current,
        }
    }

    fn parse(mut self) -> Result<Expr> {
        let expr = self.parse_expr()?;
        if !matches!(self.current.kind, TokenKind::Eof) {
            return Err(self.error("end of expression"));
        }
        Ok(expr)
    }

    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.lexer.next_token());
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<()> {
        if self.matches(kind) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn error(&self, expected: &str) -> miette::Report {
        SyntaxError {
            found: self.current.kind.describe(),
            expected: expected.to_string(),
            span: self.current.span,
            src: NamedSource::new("expression", self.source.to_string()),
        }
        .into()
    }

    // Precedence climbing, loosest first
    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.matches(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality()?;
        while self.matches(&TokenKind::And) {
            let right = self.parse_equality()?;
            left = binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = if self.matches(&TokenKind::Eq) {
                BinaryOp::Eq
            } else if self.matches(&TokenKind::Ne) {
                BinaryOp::Ne
            } else {
                break;
            };
            let right = self.parse_comparison()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.matches(&TokenKind::Lt) {
                BinaryOp::Lt
            } else if self.matches(&TokenKind::Le) {
                BinaryOp::Le
            } else if self.matches(&TokenKind::Gt) {
                BinaryOp::Gt
            } else if self.matches(&TokenKind::Ge) {
                BinaryOp::Ge
            } else {
                break;
            };
            let right = self.parse_additive()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.matches(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.matches(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.matches(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.matches(&TokenKind::Slash) {
                BinaryOp::Div
            } else if self.matches(&TokenKind::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = if self.check(&TokenKind::Bang) {
            Some(UnaryOp::Not)
        } else if self.check(&TokenKind::Minus) {
            Some(UnaryOp::Neg)
        } else {
            None
        };

        match op {
            Some(op) => {
                let start = self.current.span;
                self.advance();
                let expr = self.parse_unary()?;
                let end = expr.span();
                Ok(Expr::Unary(UnaryExpr {
                    op,
                    expr: Box::new(expr),
                    span: join(start, end),
                }))
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.matches(&TokenKind::Dot) {
                let field = self.expect_ident()?;
                let span = join(expr.span(), field.span);
                expr = Expr::Field(FieldExpr {
                    base: Box::new(expr),
                    field,
                    span,
                });
            } else if self.matches(&TokenKind::LBracket) {
                let index = self.parse_expr()?;
                self.expect(&TokenKind::RBracket, "`]`")?;
                let span = join(expr.span(), self.previous.span);
                expr = Expr::Index(IndexExpr {
                    base: Box::new(expr),
                    index: Box::new(index),
                    span,
                });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current.clone();
        match token.kind {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(IntLit {
                    value,
                    span: token.span,
                })))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(FloatLit {
                    value,
                    span: token.span,
                })))
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(StringLit {
                    value,
                    span: token.span,
                })))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(BoolLit {
                    value: true,
                    span: token.span,
                })))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(BoolLit {
                    value: false,
                    span: token.span,
                })))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal(Literal::Null(NullLit { span: token.span })))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Var(Ident {
                    name,
                    span: token.span,
                }))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                Ok(expr)
            }
            _ => Err(self.error("an expression")),
        }
    }

    fn expect_ident(&mut self) -> Result<Ident> {
        match &self.current.kind {
            TokenKind::Ident(name) => {
                let ident = Ident {
                    name: name.clone(),
                    span: self.current.span,
                };
                self.advance();
                Ok(ident)
            }
            _ => Err(self.error("a field name")),
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    let span = join(left.span(), right.span());
    Expr::Binary(BinaryExpr {
        left: Box::new(left),
        op,
        right: Box::new(right),
        span,
    })
}

fn join(start: Span, end: Span) -> Span {
    span(start.offset(), end.offset() + end.len() - start.offset())
}
