//! Statement macros and shortcuts
//!
//! Statements (tag contents behind the `-` sigil) are dispatched against an
//! ordered registry of regex-matched macros, first match wins. A macro maps
//! the matched statement to one [`Op`], may push a block terminator for a
//! later `end` to pop, may contribute a one-time prefix op, and may carry a
//! shortcut that rewrites whole tag contents before classification.

use crate::program::Op;
use regex::Regex;
use std::sync::LazyLock;

type OpFn = Box<dyn Fn(&str) -> Op + Send + Sync>;
type CloserFn = Box<dyn Fn(&[Op]) -> Op + Send + Sync>;
type RewriteFn = Box<dyn Fn(&str) -> String + Send + Sync>;

/// How a matched statement becomes an op
pub enum Replace {
    /// Emit this op verbatim
    Emit(Op),
    /// Derive the op from the full statement text
    With(OpFn),
    /// Pop and emit the pending block terminator (the `end` construct)
    CloseBlock,
}

/// The closing op a block macro leaves pending
pub enum Terminator {
    /// A fixed closing op
    Emit(Op),
    /// Derive the closing op from the pending-terminator stack, for closers
    /// that depend on nesting depth
    With(CloserFn),
}

/// A whole-tag rewrite applied ahead of statement classification
pub struct Shortcut {
    pub pattern: Regex,
    pub rewrite: Rewrite,
}

pub enum Rewrite {
    /// Replace the entire tag content with this text
    Literal(String),
    /// Derive the replacement from the tag content
    With(RewriteFn),
}

/// One entry of the statement-macro registry
pub struct Macro {
    pub name: String,
    pub pattern: Regex,
    pub replace: Replace,
    pub terminator: Option<Terminator>,
    pub prefix: Option<Op>,
    pub shortcut: Option<Shortcut>,
}

impl Macro {
    pub fn new(name: impl Into<String>, pattern: Regex, replace: Replace) -> Self {
        Self {
            name: name.into(),
            pattern,
            replace,
            terminator: None,
            prefix: None,
            shortcut: None,
        }
    }

    pub fn with_terminator(mut self, terminator: Terminator) -> Self {
        self.terminator = Some(terminator);
        self
    }

    pub fn with_prefix(mut self, op: Op) -> Self {
        self.prefix = Some(op);
        self
    }

    pub fn with_shortcut(mut self, pattern: Regex, rewrite: Rewrite) -> Self {
        self.shortcut = Some(Shortcut { pattern, rewrite });
        self
    }
}

/// The ordered macro registry.
///
/// Registration order is match order, for both statements and shortcuts.
/// Re-registering a name replaces the descriptor in place, keeping its
/// position.
pub struct MacroSet {
    macros: Vec<Macro>,
}

impl MacroSet {
    pub fn empty() -> Self {
        Self { macros: Vec::new() }
    }

    /// The built-in constructs, in their canonical match order.
    pub fn with_builtins() -> Self {
        let mut set = Self::empty();
        for m in builtins() {
            set.insert(m);
        }
        set
    }

    /// Register a macro. A macro with the same name is replaced in place;
    /// otherwise the macro is appended.
    pub fn insert(&mut self, m: Macro) {
        match self.macros.iter_mut().find(|e| e.name == m.name) {
            Some(slot) => *slot = m,
            None => self.macros.push(m),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Macro> {
        self.macros.iter()
    }

    /// First macro whose pattern matches the statement, if any
    pub fn resolve(&self, statement: &str) -> Option<&Macro> {
        self.macros.iter().find(|m| m.pattern.is_match(statement))
    }

    /// Apply the first matching shortcut to raw tag content.
    pub fn expand_shortcuts(&self, content: &str) -> String {
        for m in &self.macros {
            if let Some(shortcut) = &m.shortcut {
                if let Some(caps) = shortcut.pattern.captures(content) {
                    return match &shortcut.rewrite {
                        Rewrite::Literal(text) => text.clone(),
                        Rewrite::With(f) => {
                            let rest = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                            f(rest)
                        }
                    };
                }
            }
        }
        content.to_string()
    }
}

impl Default for MacroSet {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern")
}

static IF_STMT: LazyLock<Regex> = LazyLock::new(|| re(r"^if\s+(.+)$"));
static UNLESS_STMT: LazyLock<Regex> = LazyLock::new(|| re(r"^unless\s+(.+)$"));
static ELSEIF_STMT: LazyLock<Regex> = LazyLock::new(|| re(r"^else\s+if\s+(.+)$"));
static LOOP_AS: LazyLock<Regex> = LazyLock::new(|| re(r"^\w+\s+(.+)\s+as\s+(\w+)$"));
static LOOP_PLAIN: LazyLock<Regex> = LazyLock::new(|| re(r"^\w+\s+(.+)$"));
static RENDER_DATA: LazyLock<Regex> = LazyLock::new(|| re(r"^render\s+(\S+)\s+(.+)$"));
static RENDER_PLAIN: LazyLock<Regex> = LazyLock::new(|| re(r"^render\s+(\S+)$"));
static KEYWORD_STMT: LazyLock<Regex> = LazyLock::new(|| re(r"^\w+\s+(.+)$"));

fn capture(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Loop-family statement: `kw expr` or `kw expr as name`
fn loop_parts(text: &str) -> (String, Option<String>) {
    if let Some(caps) = LOOP_AS.captures(text) {
        let expr = caps[1].trim().to_string();
        let alias = caps[2].to_string();
        return (expr, Some(alias));
    }
    let expr = capture(&LOOP_PLAIN, text).unwrap_or_default();
    (expr, None)
}

fn expr_of(text: &str) -> String {
    capture(&KEYWORD_STMT, text).unwrap_or_default()
}

fn builtins() -> Vec<Macro> {
    vec![
        Macro::new(
            "if",
            re(r"^if "),
            Replace::With(Box::new(|s| Op::If(capture(&IF_STMT, s).unwrap_or_default()))),
        )
        .with_terminator(Terminator::Emit(Op::End))
        .with_shortcut(
            re(r"^\?\s?(.*)$"),
            Rewrite::With(Box::new(|rest| format!("- if {rest}"))),
        ),
        Macro::new(
            "unless",
            re(r"^unless "),
            Replace::With(Box::new(|s| {
                Op::Unless(capture(&UNLESS_STMT, s).unwrap_or_default())
            })),
        )
        .with_terminator(Terminator::Emit(Op::End))
        .with_shortcut(
            re(r"^\^\s?(.*)$"),
            Rewrite::With(Box::new(|rest| format!("- unless {rest}"))),
        ),
        Macro::new(
            "elseif",
            re(r"^else if "),
            Replace::With(Box::new(|s| {
                Op::ElseIf(capture(&ELSEIF_STMT, s).unwrap_or_default())
            })),
        ),
        Macro::new("else", re(r"^else$"), Replace::Emit(Op::Else)),
        Macro::new("end", re(r"^end$"), Replace::CloseBlock).with_shortcut(
            re(r"^/$"),
            Rewrite::Literal("- end".to_string()),
        ),
        Macro::new(
            "for",
            re(r"^for "),
            Replace::With(Box::new(|s| {
                let (expr, alias) = loop_parts(s);
                Op::For { expr, alias }
            })),
        )
        .with_terminator(Terminator::Emit(Op::EndFor)),
        Macro::new(
            "each",
            re(r"^each "),
            Replace::With(Box::new(|s| {
                let (expr, alias) = loop_parts(s);
                Op::Each { expr, alias }
            })),
        )
        .with_terminator(Terminator::Emit(Op::EndEach)),
        Macro::new(
            "with",
            re(r"^with "),
            Replace::With(Box::new(|s| {
                let (expr, alias) = loop_parts(s);
                Op::With { expr, alias }
            })),
        )
        .with_terminator(Terminator::Emit(Op::EndWith)),
        Macro::new(
            "render",
            re(r"^render "),
            Replace::With(Box::new(|s| {
                if let Some(caps) = RENDER_DATA.captures(s) {
                    return Op::Render {
                        name: caps[1].to_string(),
                        data: Some(caps[2].trim().to_string()),
                    };
                }
                if let Some(caps) = RENDER_PLAIN.captures(s) {
                    return Op::Render {
                        name: caps[1].to_string(),
                        data: None,
                    };
                }
                // No partial name: leave the text as a raw statement
                Op::Stmt(s.trim().to_string())
            })),
        ),
        Macro::new(
            "print",
            re(r"^print "),
            Replace::With(Box::new(|s| Op::Print(expr_of(s)))),
        ),
        Macro::new(
            "log",
            re(r"^log "),
            Replace::With(Box::new(|s| Op::Log(expr_of(s)))),
        ),
        Macro::new(
            "escape",
            re(r"^escape "),
            Replace::With(Box::new(|s| Op::Escape(expr_of(s)))),
        ),
        Macro::new("first", re(r"^first$"), Replace::Emit(Op::First))
            .with_terminator(Terminator::Emit(Op::End)),
        Macro::new("last", re(r"^last$"), Replace::Emit(Op::Last))
            .with_terminator(Terminator::Emit(Op::End)),
    ]
}
