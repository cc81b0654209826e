//! Template compilation
//!
//! Turns template source into a flat op [`Program`]: split into segments,
//! expand shortcuts, classify tag contents as statement or expression,
//! resolve statements against the macro registry. Compilation never fails;
//! malformed programs are rejected when they are built into a
//! [`crate::Template`].

use crate::error::TemplateSource;
use crate::lexer::{self, SegmentKind};
use crate::macros::{MacroSet, Replace, Terminator};
use crate::program::{Op, OpCode, Prefix, Program};
use regex::Regex;
use std::sync::LazyLock;

/// Compilation options
#[derive(Debug, Clone)]
pub struct Options {
    /// Tag open delimiter
    pub open_tag: String,
    /// Tag close delimiter
    pub close_tag: String,
    /// Strip leading whitespace from every line before compiling
    pub shrink_wrap: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            open_tag: "{{".to_string(),
            close_tag: "}}".to_string(),
            shrink_wrap: false,
        }
    }
}

/// Per-compilation state, created fresh for every compile call.
#[derive(Default)]
struct CompileCtx {
    /// Pending block terminators, pushed by block macros and popped by `end`
    block_stack: Vec<Op>,
    /// One-time setup ops, deduplicated by macro name, in first-use order
    prefixes: Vec<Prefix>,
}

impl CompileCtx {
    fn add_prefix(&mut self, name: &str, op: Op) {
        if !self.prefixes.iter().any(|p| p.name == name) {
            self.prefixes.push(Prefix {
                name: name.to_string(),
                op,
            });
        }
    }
}

static LEADING_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s+").expect("shrink-wrap pattern"));

fn shrink_wrap(source: &str) -> String {
    LEADING_WS.replace_all(source, "").into_owned()
}

/// Compile template source into a [`Program`].
pub fn compile(macros: &MacroSet, options: &Options, name: &str, template: &str) -> Program {
    let text = if options.shrink_wrap {
        shrink_wrap(template)
    } else {
        template.to_string()
    };
    let source = TemplateSource::new(name, text);
    let segments = lexer::split(source.text(), &options.open_tag, &options.close_tag);

    let mut ctx = CompileCtx::default();
    let mut body = Vec::new();

    for segment in segments {
        match segment.kind {
            SegmentKind::Tag(content) => {
                let content = macros.expand_shortcuts(&content);
                match content.strip_prefix('-') {
                    Some(statement) => {
                        let statement = statement.trim();
                        if statement.is_empty() {
                            continue;
                        }
                        let op = translate(macros, &mut ctx, statement);
                        body.push(OpCode {
                            op,
                            span: segment.span,
                        });
                    }
                    None => {
                        // No sigil: an expression tag
                        body.push(OpCode {
                            op: Op::Show(content.trim().to_string()),
                            span: segment.span,
                        });
                    }
                }
            }
            SegmentKind::Text(text) => {
                // Literal line breaks never reach the output
                let text = text.replace('\n', "");
                if !text.is_empty() {
                    body.push(OpCode {
                        op: Op::Text(text),
                        span: segment.span,
                    });
                }
            }
        }
    }

    Program {
        source,
        prefix: ctx.prefixes,
        body,
    }
}

/// Resolve one statement against the registry. Statements matching no macro
/// become raw expression-statements.
fn translate(macros: &MacroSet, ctx: &mut CompileCtx, statement: &str) -> Op {
    let Some(m) = macros.resolve(statement) else {
        return Op::Stmt(statement.to_string());
    };

    let op = match &m.replace {
        Replace::Emit(op) => op.clone(),
        Replace::With(f) => f(statement),
        // A stray close emits a bare conditional-family end; building the
        // program rejects it
        Replace::CloseBlock => ctx.block_stack.pop().unwrap_or(Op::End),
    };

    if let Some(terminator) = &m.terminator {
        let closer = match terminator {
            Terminator::Emit(op) => op.clone(),
            Terminator::With(f) => f(&ctx.block_stack),
        };
        ctx.block_stack.push(closer);
    }

    if let Some(prefix) = &m.prefix {
        ctx.add_prefix(&m.name, prefix.clone());
    }

    op
}
