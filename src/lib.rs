//! menhir - a tag-based template compiler
//!
//! Templates mix literal text with tags. A tag holds either an expression,
//! interpolated null-safely, or (behind a `-` sigil) a statement dispatched
//! against an ordered, user-extensible macro registry.
//!
//! # Syntax Overview
//!
//! ```text
//! {{ expr }}                      - Expression interpolation
//! {{- if cond }}...{{- end }}     - Conditionals (else if / else / unless)
//! {{- for items as item }}...{{- end }}  - Indexed loops (_i, _len)
//! {{- each obj as v }}...{{- end }}      - Keyed iteration (_key)
//! {{- with expr as v }}...{{- end }}     - Scoped rebinding
//! {{- render name expr }}         - Partials
//! {{- escape expr }}              - HTML-escaped interpolation
//! {{? cond }}...{{/}}             - Shortcuts for if / end (^ for unless)
//! ```
//!
//! Templates compile to a flat op [`Program`] (compilation never fails),
//! which is then built into a reusable [`Template`]; unbalanced blocks and
//! malformed expressions surface at build time.
//!
//! # Example
//!
//! ```
//! use menhir::{Engine, Value};
//!
//! let engine = Engine::new();
//! let template = engine.build("greeting", "Hi {{name}}!").unwrap();
//!
//! let mut data = std::collections::BTreeMap::new();
//! data.insert("name".to_string(), Value::from("Alice"));
//!
//! let output = template.render(&engine, &Value::Dict(data)).unwrap();
//! assert_eq!(output, "Hi Alice!");
//! ```

pub mod ast;
mod compile;
pub mod error;
mod eval;
pub mod expr;
pub mod lexer;
pub mod macros;
pub mod program;
mod render;

pub use compile::Options;
pub use eval::{Context, Evaluator, Value};
pub use macros::{Macro, MacroSet, Replace, Rewrite, Shortcut, Terminator};
pub use program::{Op, OpCode, Prefix, Program};
pub use render::{Engine, Template, escape_html};
