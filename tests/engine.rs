//! End-to-end engine tests: compile, build, render, and the public
//! extension points (macros, partials, options).

use menhir::macros::{Macro, Replace, Rewrite, Terminator};
use menhir::{Engine, Op, Options, Template, Value};
use regex::Regex;
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
fn plain_text_passes_through() {
    assert_eq!(render("Hello, world!", Value::Null), "Hello, world!");
}

#[test]
fn interpolation_with_fields_and_conditionals() {
    let data = dict(&[
        ("name", Value::from("Alice")),
        ("admin", Value::Bool(true)),
    ]);
    let t = "Hi {{name}}{{- if admin}} (admin){{- end}}!";
    assert_eq!(render(t, data), "Hi Alice (admin)!");
}

#[test]
fn iteration_over_list_of_dicts() {
    let users = Value::List(vec![
        dict(&[("name", Value::from("Ada"))]),
        dict(&[("name", Value::from("Grace"))]),
    ]);
    let data = dict(&[("users", users)]);
    let t = "{{- each users as user}}<p>{{user.name}}</p>{{- end}}";
    assert_eq!(render(t, data), "<p>Ada</p><p>Grace</p>");
}

#[test]
fn shortcuts_match_canonical_forms() {
    let engine = Engine::new();
    let shortcut = engine.compile("a", "{{? x}}yes{{/}}{{^ y}}no{{/}}");
    let canonical = engine.compile(
        "b",
        "{{- if x}}yes{{- end}}{{- unless y}}no{{- end}}",
    );
    let a: Vec<&Op> = shortcut.ops().collect();
    let b: Vec<&Op> = canonical.ops().collect();
    assert_eq!(a, b);
}

#[test]
fn custom_macro_via_registry() {
    let mut engine = Engine::new();
    engine.register_macro(Macro::new(
        "shout",
        Regex::new(r"^shout ").unwrap(),
        Replace::With(Box::new(|s| {
            let expr = s.trim_start_matches("shout").trim();
            Op::Show(format!("{expr} + \"!\""))
        })),
    ));
    let data = dict(&[("name", Value::from("Ada"))]);
    assert_eq!(render_with(&engine, "{{- shout name}}", data), "Ada!");
}

#[test]
fn custom_block_macro_with_terminator() {
    let mut engine = Engine::new();
    engine.register_macro(
        Macro::new(
            "hidden",
            Regex::new(r"^hidden$").unwrap(),
            Replace::Emit(Op::If("false".to_string())),
        )
        .with_terminator(Terminator::Emit(Op::End)),
    );
    assert_eq!(
        render_with(&engine, "a{{- hidden}}gone{{- end}}b", Value::Null),
        "ab"
    );
}

#[test]
fn custom_shortcut() {
    let mut engine = Engine::new();
    engine.register_macro(
        Macro::new(
            "comment",
            Regex::new(r"^comment\b").unwrap(),
            Replace::Emit(Op::If("false".to_string())),
        )
        .with_terminator(Terminator::Emit(Op::End))
        .with_shortcut(
            Regex::new(r"^!(.*)$").unwrap(),
            Rewrite::With(Box::new(|_| "- comment".to_string())),
        ),
    );
    assert_eq!(
        render_with(&engine, "a{{! ignored}}x{{/}}b", Value::Null),
        "ab"
    );
}

#[test]
fn macro_reregistration_keeps_position() {
    let mut engine = Engine::new();
    // Rewire `print` to escape instead; it must still win over later macros
    engine.register_macro(Macro::new(
        "print",
        Regex::new(r"^print ").unwrap(),
        Replace::With(Box::new(|s| {
            Op::Escape(s.trim_start_matches("print").trim().to_string())
        })),
    ));
    let data = dict(&[("html", Value::from("<b>"))]);
    assert_eq!(render_with(&engine, "{{- print html}}", data), "&lt;b&gt;");
}

#[test]
fn options_custom_delimiters() {
    let engine = Engine::with_options(Options {
        open_tag: "<%".to_string(),
        close_tag: "%>".to_string(),
        ..Options::default()
    });
    let data = dict(&[("name", Value::from("Ada"))]);
    assert_eq!(
        render_with(&engine, "Hi <%name%><%- if name%>!<%- end%>", data),
        "Hi Ada!"
    );
}

#[test]
fn options_shrink_wrap_strips_leading_whitespace() {
    let engine = Engine::with_options(Options {
        shrink_wrap: true,
        ..Options::default()
    });
    let data = dict(&[("x", Value::Int(1))]);
    let t = "  <ul>\n    <li>{{x}}</li>\n  </ul>";
    assert_eq!(render_with(&engine, t, data), "<ul><li>1</li></ul>");
}

#[test]
fn nested_partials() {
    let mut engine = Engine::new();
    engine.register_partial("leaf", "[{{d}}]").unwrap();
    engine
        .register_partial("branch", "{{- for d as x}}{{- render leaf x}}{{- end}}")
        .unwrap();
    let data = Value::from(vec![1i64, 2, 3]);
    assert_eq!(
        render_with(&engine, "{{- render branch d}}", data),
        "[1][2][3]"
    );
}

#[test]
fn prebuilt_partial_registration() {
    let mut engine = Engine::new();
    let partial = engine.build("leaf", "({{d}})").unwrap();
    engine.register_partial_template("leaf", partial);
    assert_eq!(
        engine.render_partial("leaf", &Value::Int(7)).unwrap(),
        "(7)"
    );
}

#[test]
fn render_error_inside_partial_propagates() {
    let mut engine = Engine::new();
    engine.register_partial("bad", "{{d.a.b}}").unwrap();
    let data = dict(&[("a", Value::Null)]);
    assert!(engine.render_partial("bad", &data).is_err());
}

#[test]
fn template_survives_engine_mutation() {
    let mut engine = Engine::new();
    let template = engine.build("t", "{{- render who}}").unwrap();
    engine.register_partial("who", "{{d}}").unwrap();
    assert_eq!(
        template.render(&engine, &Value::from("Ada")).unwrap(),
        "Ada"
    );
}

#[test]
fn unterminated_tag_degrades_to_text() {
    assert_eq!(render("a{{b", Value::Null), "ab");
}

#[test]
fn text_between_close_delimiters_survives() {
    assert_eq!(render("{{d}}keep}}dropped", Value::from("x")), "xkeep");
}

#[test]
fn unterminated_block_is_a_typed_diagnostic() {
    let engine = Engine::new();
    let err = engine.build("layout", "{{- if x}}").unwrap_err();
    let diag = err
        .downcast_ref::<menhir::error::UnterminatedBlockError>()
        .expect("unterminated block error");
    assert_eq!(diag.construct, "if");
}

#[test]
fn program_text_round_trips_through_build() {
    let engine = Engine::new();
    let program = engine.compile("t", "{{- for xs as x}}{{x}}{{- end}}");
    assert_eq!(program.to_string(), "for xs as x\nshow x\nendfor\n");
    let template = Template::build(program).unwrap();
    let data = dict(&[("xs", Value::from(vec!["a", "b"]))]);
    assert_eq!(template.render(&engine, &data).unwrap(), "ab");
}

fn render_with(engine: &Engine, template: &str, data: Value) -> String {
    engine.render_str("test", template, &data).unwrap()
}
