//! Error types with rich diagnostics
//!
//! One struct per error kind; each carries a span and the source it points
//! into so miette can render a labeled snippet. Build errors label the
//! offending tag in the template; evaluation errors label the offending
//! token in the expression text.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

/// A named template source, shared between compile stages for diagnostics.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    name: String,
    text: Arc<String>,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Arc::new(text.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Build a `NamedSource` for attaching to a diagnostic.
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, self.text.as_ref().clone())
    }
}

/// Invalid syntax in an embedded expression.
#[derive(Debug, Error, Diagnostic)]
#[error("Expected {expected}, found {found}")]
#[diagnostic(code(menhir::syntax))]
pub struct SyntaxError {
    pub found: String,
    pub expected: String,
    #[label("here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// A block construct was opened but never closed.
#[derive(Debug, Error, Diagnostic)]
#[error("Unterminated `{construct}` block")]
#[diagnostic(code(menhir::unterminated), help("close it with an end tag"))]
pub struct UnterminatedBlockError {
    pub construct: String,
    #[label("opened here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// A closing construct with nothing open (stray `end`, `else`, `else if`).
#[derive(Debug, Error, Diagnostic)]
#[error("`{construct}` with no open block")]
#[diagnostic(code(menhir::stray_close))]
pub struct StrayCloseError {
    pub construct: String,
    #[label("here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// A closing op met an open construct of a different kind.
///
/// Only reachable from hand-built or macro-emitted op sequences; the
/// compiler's block stack always pairs closers with their openers.
#[derive(Debug, Error, Diagnostic)]
#[error("Expected `{expected}` to close this block, found `{found}`")]
#[diagnostic(code(menhir::mismatched_close))]
pub struct MismatchedCloseError {
    pub expected: String,
    pub found: String,
    #[label("block opened here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// `render` named a partial that is not registered.
#[derive(Debug, Error, Diagnostic)]
#[error("Partial \"{name}\" not found")]
#[diagnostic(code(menhir::unknown_partial))]
pub struct UnknownPartialError {
    pub name: String,
}

/// A value of the wrong type in an evaluation context.
#[derive(Debug, Error, Diagnostic)]
#[error("Type error in {context}: expected {expected}, found {found}")]
#[diagnostic(code(menhir::type_error))]
pub struct TypeError {
    pub expected: String,
    pub found: String,
    pub context: String,
    #[label("here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}
