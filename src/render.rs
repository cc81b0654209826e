//! Program building and rendering
//!
//! [`Template::build`] folds a flat op [`Program`] into a node tree,
//! parsing expression operands along the way; this is where unbalanced
//! blocks, stray branch ops, and malformed expressions surface.
//! [`Template::render`] walks the tree against the data. The [`Engine`]
//! holds the macro registry, the partial registry, and the options.

use crate::ast::{Code, Cond, IfArm, Node, Span, span};
use crate::compile::{self, Options};
use crate::error::{
    MismatchedCloseError, StrayCloseError, TemplateSource, UnknownPartialError,
    UnterminatedBlockError,
};
use crate::eval::{Context, Evaluator, Value};
use crate::expr::parse_code;
use crate::macros::{Macro, MacroSet};
use crate::program::{Op, Prefix, Program};
use miette::Result;
use std::collections::HashMap;

/// Escape HTML special characters: `&`, `<`, `>`, `'`, `"`.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&#39;")
        .replace('"', "&quot;")
}

/// A built template, ready to render any number of times.
#[derive(Debug, Clone)]
pub struct Template {
    program: Program,
    prefix: Vec<Node>,
    body: Vec<Node>,
}

impl Template {
    /// Build a program into a template, parsing expressions and folding
    /// block ops into a tree. Fails on unbalanced blocks, stray branch
    /// ops, and expression syntax errors.
    pub fn build(program: Program) -> Result<Self> {
        let prefix_ops: Vec<(Op, Span)> = program
            .prefix()
            .iter()
            .map(|Prefix { op, .. }| (op.clone(), span(0, 0)))
            .collect();
        let body_ops: Vec<(Op, Span)> = program
            .body()
            .iter()
            .map(|c| (c.op.clone(), c.span))
            .collect();

        let prefix = fold(&prefix_ops, program.source())?;
        let body = fold(&body_ops, program.source())?;

        Ok(Self {
            program,
            prefix,
            body,
        })
    }

    /// The program this template was built from
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn name(&self) -> &str {
        self.program.name()
    }

    /// Render with the given data bound to `d`.
    pub fn render(&self, engine: &Engine, data: &Value) -> Result<String> {
        let mut renderer = Renderer {
            engine,
            ctx: Context::with_data(data.clone()),
            output: String::new(),
            frames: Vec::new(),
        };
        renderer.run_nodes(&self.prefix)?;
        renderer.run_nodes(&self.body)?;
        Ok(renderer.output)
    }
}

// ============================================================================
// Folding flat ops into a node tree
// ============================================================================

/// An open block being folded
struct Frame {
    opener: Opener,
    body: Vec<Node>,
    span: Span,
}

enum Opener {
    /// Conditional: completed arms plus the arm currently being collected
    If { arms: Vec<IfArm>, cond: Cond },
    For { iter: Code, alias: Option<String> },
    Each { iter: Code, alias: Option<String> },
    With { value: Code, alias: Option<String> },
}

impl Opener {
    fn construct(&self) -> &'static str {
        match self {
            Opener::If { .. } => "if",
            Opener::For { .. } => "for",
            Opener::Each { .. } => "each",
            Opener::With { .. } => "with",
        }
    }

    fn closer(&self) -> &'static str {
        match self {
            Opener::If { .. } => "end",
            Opener::For { .. } => "endfor",
            Opener::Each { .. } => "endeach",
            Opener::With { .. } => "endwith",
        }
    }
}

struct Folder<'a> {
    source: &'a TemplateSource,
    stack: Vec<Frame>,
    root: Vec<Node>,
}

fn fold(ops: &[(Op, Span)], source: &TemplateSource) -> Result<Vec<Node>> {
    let mut folder = Folder {
        source,
        stack: Vec::new(),
        root: Vec::new(),
    };
    for (op, span) in ops {
        folder.push_op(op, *span)?;
    }

    if let Some(frame) = folder.stack.pop() {
        Err(UnterminatedBlockError {
            construct: frame.opener.construct().to_string(),
            span: frame.span,
            src: source.named_source(),
        })?;
    }

    Ok(folder.root)
}

impl Folder<'_> {
    fn out(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.body,
            None => &mut self.root,
        }
    }

    fn open(&mut self, opener: Opener, span: Span) {
        self.stack.push(Frame {
            opener,
            body: Vec::new(),
            span,
        });
    }

    fn push_op(&mut self, op: &Op, span: Span) -> Result<()> {
        match op {
            Op::Text(text) => self.out().push(Node::Text(text.clone())),
            Op::Show(expr) => {
                let code = parse_code(expr)?;
                self.out().push(Node::Show(code));
            }
            Op::Print(expr) => {
                let code = parse_code(expr)?;
                self.out().push(Node::Print(code));
            }
            Op::Escape(expr) => {
                let code = parse_code(expr)?;
                self.out().push(Node::Escape(code));
            }
            Op::Log(expr) => {
                let code = parse_code(expr)?;
                self.out().push(Node::Log(code));
            }
            Op::Stmt(expr) => {
                let code = parse_code(expr)?;
                self.out().push(Node::Stmt(code));
            }
            Op::Set { name, expr } => {
                let value = parse_code(expr)?;
                self.out().push(Node::Set {
                    name: name.clone(),
                    value,
                });
            }
            Op::Render { name, data } => {
                let data = match data {
                    Some(expr) => Some(parse_code(expr)?),
                    None => None,
                };
                self.out().push(Node::Render {
                    name: name.clone(),
                    data,
                    span,
                });
            }
            Op::If(expr) => {
                let cond = Cond::Expr(parse_code(expr)?);
                self.open(
                    Opener::If {
                        arms: Vec::new(),
                        cond,
                    },
                    span,
                );
            }
            Op::Unless(expr) => {
                let cond = Cond::Not(parse_code(expr)?);
                self.open(
                    Opener::If {
                        arms: Vec::new(),
                        cond,
                    },
                    span,
                );
            }
            Op::First => self.open(
                Opener::If {
                    arms: Vec::new(),
                    cond: Cond::First,
                },
                span,
            ),
            Op::Last => self.open(
                Opener::If {
                    arms: Vec::new(),
                    cond: Cond::Last,
                },
                span,
            ),
            Op::ElseIf(expr) => {
                let cond = Cond::Expr(parse_code(expr)?);
                self.next_arm("else if", cond, span)?;
            }
            Op::Else => self.next_arm("else", Cond::Always, span)?,
            Op::End => {
                let frame = self.close("end", span)?;
                match frame.opener {
                    Opener::If { mut arms, cond } => {
                        arms.push(IfArm {
                            cond,
                            body: frame.body,
                        });
                        self.out().push(Node::If { arms });
                    }
                    other => Err(self.mismatch(&other, "end", frame.span))?,
                }
            }
            Op::For { expr, alias } => {
                let iter = parse_code(expr)?;
                self.open(
                    Opener::For {
                        iter,
                        alias: alias.clone(),
                    },
                    span,
                );
            }
            Op::EndFor => {
                let frame = self.close("endfor", span)?;
                match frame.opener {
                    Opener::For { iter, alias } => self.out().push(Node::For {
                        iter,
                        alias,
                        body: frame.body,
                    }),
                    other => Err(self.mismatch(&other, "endfor", frame.span))?,
                }
            }
            Op::Each { expr, alias } => {
                let iter = parse_code(expr)?;
                self.open(
                    Opener::Each {
                        iter,
                        alias: alias.clone(),
                    },
                    span,
                );
            }
            Op::EndEach => {
                let frame = self.close("endeach", span)?;
                match frame.opener {
                    Opener::Each { iter, alias } => self.out().push(Node::Each {
                        iter,
                        alias,
                        body: frame.body,
                    }),
                    other => Err(self.mismatch(&other, "endeach", frame.span))?,
                }
            }
            Op::With { expr, alias } => {
                let value = parse_code(expr)?;
                self.open(
                    Opener::With {
                        value,
                        alias: alias.clone(),
                    },
                    span,
                );
            }
            Op::EndWith => {
                let frame = self.close("endwith", span)?;
                match frame.opener {
                    Opener::With { value, alias } => self.out().push(Node::With {
                        value,
                        alias,
                        body: frame.body,
                    }),
                    other => Err(self.mismatch(&other, "endwith", frame.span))?,
                }
            }
        }
        Ok(())
    }

    /// Finish the current conditional arm and start the next one
    fn next_arm(&mut self, construct: &str, cond: Cond, span: Span) -> Result<()> {
        let stray = StrayCloseError {
            construct: construct.to_string(),
            span,
            src: self.source.named_source(),
        };
        let Some(frame) = self.stack.last_mut() else {
            return Err(stray)?;
        };
        match &mut frame.opener {
            Opener::If { arms, cond: current } => {
                // A branch after the unconditional arm has nothing to attach to
                if matches!(current, Cond::Always) {
                    return Err(stray)?;
                }
                let prev = std::mem::replace(current, cond);
                arms.push(IfArm {
                    cond: prev,
                    body: std::mem::take(&mut frame.body),
                });
                Ok(())
            }
            _ => Err(stray)?,
        }
    }

    fn close(&mut self, construct: &str, span: Span) -> Result<Frame> {
        match self.stack.pop() {
            Some(frame) => Ok(frame),
            None => Err(StrayCloseError {
                construct: construct.to_string(),
                span,
                src: self.source.named_source(),
            })?,
        }
    }

    fn mismatch(&self, opener: &Opener, found: &str, span: Span) -> MismatchedCloseError {
        MismatchedCloseError {
            expected: opener.closer().to_string(),
            found: found.to_string(),
            span,
            src: self.source.named_source(),
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The template engine: macro registry, partial registry, and options.
pub struct Engine {
    macros: MacroSet,
    partials: HashMap<String, Template>,
    options: Options,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            macros: MacroSet::with_builtins(),
            partials: HashMap::new(),
            options,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Compile source into a program. Never fails; malformed templates are
    /// rejected by [`build`](Self::build).
    pub fn compile(&self, name: &str, template: &str) -> Program {
        compile::compile(&self.macros, &self.options, name, template)
    }

    /// Compile and build in one step.
    pub fn build(&self, name: &str, template: &str) -> Result<Template> {
        Template::build(self.compile(name, template))
    }

    /// Register a statement macro. A macro with the same name is replaced
    /// in place, keeping its match position.
    pub fn register_macro(&mut self, m: Macro) {
        self.macros.insert(m);
    }

    /// Compile, build, and register a partial under the given name.
    pub fn register_partial(&mut self, name: impl Into<String>, template: &str) -> Result<()> {
        let name = name.into();
        let built = self.build(&name, template)?;
        self.partials.insert(name, built);
        Ok(())
    }

    /// Register an already-built template as a partial.
    pub fn register_partial_template(&mut self, name: impl Into<String>, template: Template) {
        self.partials.insert(name.into(), template);
    }

    /// Render a registered partial with the given data.
    pub fn render_partial(&self, name: &str, data: &Value) -> Result<String> {
        let template = self.partials.get(name).ok_or(UnknownPartialError {
            name: name.to_string(),
        })?;
        template.render(self, data)
    }

    /// Build and render in one step.
    pub fn render_str(&self, name: &str, template: &str, data: &Value) -> Result<String> {
        self.build(name, template)?.render(self, data)
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Bookkeeping for one `for` loop; `first`/`last` consult the innermost frame
struct LoopFrame {
    index: usize,
    len: usize,
}

struct Renderer<'a> {
    engine: &'a Engine,
    ctx: Context,
    output: String,
    frames: Vec<LoopFrame>,
}

impl Renderer<'_> {
    fn run_nodes(&mut self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            self.run_node(node)?;
        }
        Ok(())
    }

    fn eval(&self, code: &Code) -> Result<Value> {
        Evaluator::new(&self.ctx, &code.text).eval(&code.root)
    }

    fn run_node(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Text(text) => self.output.push_str(text),
            Node::Show(code) => {
                let value = self.eval(code)?;
                self.output.push_str(&value.render_to_string());
            }
            Node::Print(code) => {
                let value = self.eval(code)?;
                self.output.push_str(&value.render_raw());
            }
            Node::Escape(code) => {
                let value = self.eval(code)?;
                self.output.push_str(&escape_html(&value.render_raw()));
            }
            Node::Log(code) => {
                let value = self.eval(code)?;
                tracing::info!(expr = %code.text, value = %value.render_raw(), "template log");
            }
            Node::Stmt(code) => {
                self.eval(code)?;
            }
            Node::Set { name, value } => {
                let value = self.eval(value)?;
                self.ctx.set(name.clone(), value);
            }
            Node::If { arms } => {
                for arm in arms {
                    if self.cond_holds(&arm.cond)? {
                        self.run_nodes(&arm.body)?;
                        break;
                    }
                }
            }
            Node::For { iter, alias, body } => {
                let items = for_items(self.eval(iter)?);
                let len = items.len();
                self.frames.push(LoopFrame { index: 0, len });
                for (i, item) in items.into_iter().enumerate() {
                    if let Some(frame) = self.frames.last_mut() {
                        frame.index = i;
                    }
                    self.ctx.push_scope();
                    self.ctx
                        .set(alias.as_deref().unwrap_or("d").to_string(), item);
                    self.ctx.set("_i", Value::Int(i as i64));
                    self.ctx.set("_len", Value::Int(len as i64));
                    let result = self.run_nodes(body);
                    self.ctx.pop_scope();
                    result?;
                }
                self.frames.pop();
            }
            Node::Each { iter, alias, body } => {
                let entries = each_entries(self.eval(iter)?);
                self.run_entries(&entries, alias, body)?;
            }
            Node::With { value, alias, body } => {
                let entries = vec![(Value::Int(0), self.eval(value)?)];
                self.run_entries(&entries, alias, body)?;
            }
            Node::Render { name, data, .. } => {
                let data = match data {
                    Some(code) => self.eval(code)?,
                    None => self.ctx.get("d").cloned().unwrap_or(Value::Null),
                };
                let rendered = self.engine.render_partial(name, &data)?;
                self.output.push_str(&rendered);
            }
        }
        Ok(())
    }

    fn cond_holds(&self, cond: &Cond) -> Result<bool> {
        Ok(match cond {
            Cond::Expr(code) => self.eval(code)?.is_truthy(),
            Cond::Not(code) => !self.eval(code)?.is_truthy(),
            Cond::First => self.frames.last().is_some_and(|f| f.index == 0),
            Cond::Last => self.frames.last().is_some_and(|f| f.index + 1 == f.len),
            Cond::Always => true,
        })
    }

    fn run_entries(
        &mut self,
        entries: &[(Value, Value)],
        alias: &Option<String>,
        body: &[Node],
    ) -> Result<()> {
        for (key, value) in entries {
            self.ctx.push_scope();
            self.ctx
                .set(alias.as_deref().unwrap_or("d").to_string(), value.clone());
            self.ctx.set("_key", key.clone());
            let result = self.run_nodes(body);
            self.ctx.pop_scope();
            result?;
        }
        Ok(())
    }
}

/// `for` iterates lists by element and strings by character;
/// anything else iterates zero times
fn for_items(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
        _ => Vec::new(),
    }
}

/// `each` iterates lists with integer keys and dicts with string keys
fn each_entries(value: Value) -> Vec<(Value, Value)> {
    match value {
        Value::List(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Value::Int(i as i64), v))
            .collect(),
        Value::Dict(dict) => dict.into_iter().map(|(k, v)| (Value::Str(k), v)).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn dict(entries: &[(&str, Value)]) -> Value {
        Value::Dict(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn render(template: &str, data: Value) -> String {
        Engine::new().render_str("test", template, &data).unwrap()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(render("hello world", Value::Null), "hello world");
    }

    #[test]
    fn test_interpolation() {
        let data = dict(&[("name", Value::from("Alice"))]);
        assert_eq!(render("Hi {{name}}!", data), "Hi Alice!");
    }

    #[test]
    fn test_d_is_whole_context() {
        assert_eq!(render("Hi {{d}}", Value::from("Bob")), "Hi Bob");
    }

    #[test]
    fn test_null_renders_empty() {
        assert_eq!(render("[{{missing}}]", dict(&[])), "[]");
    }

    #[test]
    fn test_print_renders_null() {
        assert_eq!(render("[{{- print missing}}]", dict(&[])), "[null]");
    }

    #[test]
    fn test_if_else() {
        let t = "{{- if ok}}yes{{- else}}no{{- end}}";
        assert_eq!(render(t, dict(&[("ok", Value::Bool(true))])), "yes");
        assert_eq!(render(t, dict(&[("ok", Value::Bool(false))])), "no");
    }

    #[test]
    fn test_else_if_chain() {
        let t = "{{- if n == 1}}one{{- else if n == 2}}two{{- else}}many{{- end}}";
        assert_eq!(render(t, dict(&[("n", Value::Int(1))])), "one");
        assert_eq!(render(t, dict(&[("n", Value::Int(2))])), "two");
        assert_eq!(render(t, dict(&[("n", Value::Int(5))])), "many");
    }

    #[test]
    fn test_unless() {
        let t = "{{^ ok}}fallback{{/}}";
        assert_eq!(render(t, dict(&[])), "fallback");
        assert_eq!(render(t, dict(&[("ok", Value::Bool(true))])), "");
    }

    #[test]
    fn test_for_with_alias() {
        let data = dict(&[("items", Value::from(vec!["a", "b", "c"]))]);
        assert_eq!(
            render("{{- for items as item}}{{item}} {{- end}}", data),
            "a b c "
        );
    }

    #[test]
    fn test_for_rebinds_d_without_alias() {
        let data = dict(&[("items", Value::from(vec!["a", "b"]))]);
        assert_eq!(render("{{- for items}}{{d}}{{- end}}", data), "ab");
    }

    #[test]
    fn test_for_exposes_index_and_len() {
        let data = dict(&[("items", Value::from(vec!["x", "y"]))]);
        assert_eq!(
            render("{{- for items}}{{_i}}/{{_len}} {{- end}}", data),
            "0/2 1/2 "
        );
    }

    #[test]
    fn test_for_over_string() {
        assert_eq!(
            render("{{- for d}}{{d}}.{{- end}}", Value::from("abc")),
            "a.b.c."
        );
    }

    #[test]
    fn test_for_over_non_iterable_is_empty() {
        assert_eq!(render("{{- for d}}x{{- end}}", Value::Int(42)), "");
    }

    #[test]
    fn test_first_last() {
        let data = dict(&[("items", Value::from(vec!["a", "b", "c"]))]);
        let t = "{{- for items as i}}{{- first}}<{{- end}}{{i}}{{- last}}>{{- end}}{{- end}}";
        assert_eq!(render(t, data), "<abc>");
    }

    #[test]
    fn test_first_last_track_innermost_for() {
        let data = dict(&[("rows", Value::from(vec![vec!["a", "b"], vec!["c", "d"]]))]);
        let t = "{{- for rows as row}}{{- for row as c}}{{- first}}({{- end}}{{c}}{{- last}}){{- end}}{{- end}}{{- end}}";
        assert_eq!(render(t, data), "(ab)(cd)");
    }

    #[test]
    fn test_first_last_outside_for_are_false() {
        assert_eq!(
            render("{{- first}}x{{- end}}{{- last}}y{{- end}}", Value::Null),
            ""
        );
    }

    #[test]
    fn test_each_list_binds_key() {
        let data = dict(&[("items", Value::from(vec!["a", "b"]))]);
        assert_eq!(
            render("{{- each items as item}}{{_key}}={{item}} {{- end}}", data),
            "0=a 1=b "
        );
    }

    #[test]
    fn test_each_dict_binds_key() {
        let mut map = BTreeMap::new();
        map.insert("x".to_string(), Value::Int(1));
        map.insert("y".to_string(), Value::Int(2));
        let data = dict(&[("pairs", Value::Dict(map))]);
        assert_eq!(
            render("{{- each pairs as v}}{{_key}}:{{v}} {{- end}}", data),
            "x:1 y:2 "
        );
    }

    #[test]
    fn test_each_does_not_shadow_for_frames() {
        // `first` inside `each` still answers for the enclosing `for`
        let data = dict(&[("items", Value::from(vec![vec!["a"], vec!["b"]]))]);
        let t =
            "{{- for items as row}}{{- each row as c}}{{- first}}!{{- end}}{{c}}{{- end}}{{- end}}";
        assert_eq!(render(t, data), "!ab");
    }

    #[test]
    fn test_with() {
        let data = dict(&[("user", dict(&[("name", Value::from("Ada"))]))]);
        assert_eq!(
            render("{{- with user as u}}{{u.name}}{{- end}}", data.clone()),
            "Ada"
        );
        assert_eq!(render("{{- with user}}{{d.name}}{{- end}}", data), "Ada");
    }

    #[test]
    fn test_with_binds_key_zero() {
        let data = dict(&[("user", Value::from("Ada"))]);
        assert_eq!(render("{{- with user as u}}{{_key}}{{- end}}", data), "0");
    }

    #[test]
    fn test_escape() {
        let data = dict(&[("html", Value::from("<a href=\"x\">&'</a>"))]);
        assert_eq!(
            render("{{- escape html}}", data),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_escape_html_order() {
        // `&` first, so entities are not double-escaped
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
    }

    #[test]
    fn test_partials() {
        let mut engine = Engine::new();
        engine.register_partial("item", "<li>{{d}}</li>").unwrap();
        let data = dict(&[("items", Value::from(vec!["a", "b"]))]);
        assert_eq!(
            engine
                .render_str(
                    "test",
                    "{{- for items as i}}{{- render item i}}{{- end}}",
                    &data
                )
                .unwrap(),
            "<li>a</li><li>b</li>"
        );
    }

    #[test]
    fn test_partial_default_data_is_d() {
        let mut engine = Engine::new();
        engine.register_partial("who", "{{name}}").unwrap();
        let data = dict(&[("name", Value::from("Ada"))]);
        assert_eq!(
            engine.render_str("test", "{{- render who}}", &data).unwrap(),
            "Ada"
        );
    }

    #[test]
    fn test_unknown_partial_error_names_it() {
        let engine = Engine::new();
        let err = engine
            .render_str("test", "{{- render nope}}", &Value::Null)
            .unwrap_err();
        assert!(err.to_string().contains("\"nope\""));
    }

    #[test]
    fn test_unbalanced_blocks_fail_at_build() {
        let engine = Engine::new();
        assert!(engine.build("test", "{{- if x}}a").is_err());
        assert!(engine.build("test", "a{{- end}}").is_err());
        assert!(engine.build("test", "{{- else}}").is_err());
        assert!(
            engine
                .build("test", "{{- if x}}{{- else}}{{- else}}{{- end}}")
                .is_err()
        );
    }

    #[test]
    fn test_bad_expression_fails_at_build_not_compile() {
        let engine = Engine::new();
        let program = engine.compile("test", "{{a +}}");
        assert_eq!(program.body().len(), 1);
        assert!(Template::build(program).is_err());
    }

    #[test]
    fn test_unmatched_statement_is_a_noop() {
        assert_eq!(render("a{{- d}}b", Value::Null), "ab");
    }

    #[test]
    fn test_custom_macro_with_prefix() {
        use crate::macros::{Macro, Replace};
        use regex::Regex;

        let mut engine = Engine::new();
        engine.register_macro(
            Macro::new(
                "greet",
                Regex::new(r"^greet$").unwrap(),
                Replace::Emit(Op::Show("greeting".to_string())),
            )
            .with_prefix(Op::Set {
                name: "greeting".to_string(),
                expr: "\"hi\"".to_string(),
            }),
        );
        assert_eq!(
            engine
                .render_str("test", "{{- greet}} {{- greet}}", &Value::Null)
                .unwrap(),
            "hi hi"
        );
    }

    #[test]
    fn test_field_access_on_null_is_render_error() {
        let data = dict(&[("a", Value::Null)]);
        let engine = Engine::new();
        assert!(engine.render_str("test", "{{a.b}}", &data).is_err());
    }

    #[test]
    fn test_program_dump() {
        let engine = Engine::new();
        let program = engine.compile("test", "Hi {{name}}{{- if ok}}!{{- end}}");
        assert_eq!(
            program.to_string(),
            "text \"Hi \"\nshow name\nif ok\ntext \"!\"\nend\n"
        );
    }

    #[test]
    fn test_render_reusable() {
        let engine = Engine::new();
        let template = engine.build("test", "Hi {{name}}").unwrap();
        for name in ["Ada", "Grace"] {
            let data = dict(&[("name", Value::from(name))]);
            assert_eq!(
                template.render(&engine, &data).unwrap(),
                format!("Hi {name}")
            );
        }
    }
}
