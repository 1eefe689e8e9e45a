use super::*;
use crate::config::TransformOptions;

fn rewrite(source: &str) -> String {
    let options = TransformOptions {
        seed: Some(1),
        ..TransformOptions::default()
    };
    transform_with_options(source, &options).code
}

#[test]
fn test_generator_declaration_is_bound_by_name() {
    assert_eq!(
        rewrite("function* f() { return g() }"),
        "var f = Yieldify.runGenerator(function*() { return (yield g()) });"
    );
}

#[test]
fn test_every_call_becomes_a_suspension_point() {
    let source = "function* f() {\n  a();\n  b(1);\n}";
    assert_eq!(
        rewrite(source),
        "var f = Yieldify.runGenerator(function*() {\n  (yield a());\n  (yield b(1));\n});"
    );
}

#[test]
fn test_literal_index_is_read_but_indexed_call_is_wrapped() {
    assert_eq!(
        rewrite("function* f() { obj[\"key\"] = 1; return obj[\"m\"](x) }"),
        "var f = Yieldify.runGenerator(function*() { obj[\"key\"] = 1; return (yield obj[\"m\"](x)) });"
    );
}

#[test]
fn test_regex_flags_are_not_read_as_a_callee() {
    assert_eq!(
        rewrite("function* f() { x = 1 / 2; y = /re/g.exec(s) }"),
        "var f = Yieldify.runGenerator(function*() { x = 1 / 2; y = /re/g.exec(s) });"
    );
    assert_eq!(
        rewrite("function* f() { return check(/x/gi.test(s)) }"),
        "var f = Yieldify.runGenerator(function*() { return (yield check(/x/gi.test(s))) });"
    );
}

#[test]
fn test_non_ascii_callee_is_wrapped_whole() {
    assert_eq!(
        rewrite("function* f() { var s = 'héllo'; naïve(s); 日本(); }"),
        "var f = Yieldify.runGenerator(function*() { var s = 'héllo'; (yield naïve(s)); (yield 日本()); });"
    );
}

#[test]
fn test_code_outside_suspendable_functions_is_untouched() {
    let source = "var x = load(1);\nfunction plain(a) { return a(); }\nrun(x);";
    assert_eq!(rewrite(source), source);
}

#[test]
fn test_literals_survive_unchanged() {
    let source = r#"function* f() { log("a(b)", 'c[d]'); // call(e)
  return r.test(/x(y)/) }"#;
    assert_eq!(
        rewrite(source),
        r#"var f = Yieldify.runGenerator(function*() { (yield log("a(b)", 'c[d]')); // call(e)
  return (yield r.test(/x(y)/)) });"#
    );
}

#[test]
fn test_plain_function_inside_generator_is_not_rewritten() {
    let source = "function* f() {\n  items.forEach(function (item) { save(item) });\n  return done();\n}";
    assert_eq!(
        rewrite(source),
        "var f = Yieldify.runGenerator(function*() {\n  (yield items.forEach(function (item) { save(item) }));\n  return (yield done());\n});"
    );
}

#[test]
fn test_generator_inside_plain_function_is_rewritten() {
    let source = "function outer() {\n  function* inner() { return g() }\n  return inner;\n}";
    assert_eq!(
        rewrite(source),
        "function outer() {\n  var inner = Yieldify.runGenerator(function*() { return (yield g()) });\n  return inner;\n}"
    );
}

#[test]
fn test_generator_expression_keeps_its_name() {
    assert_eq!(
        rewrite("var f = function* named(a) { return g(a) };"),
        "var f = Yieldify.runGenerator(function* named(a) { return (yield g(a)) });"
    );
}

#[test]
fn test_anonymous_generator_expression() {
    assert_eq!(
        rewrite("run(function* (a) { g(a) })"),
        "run(Yieldify.runGenerator(function*(a) { (yield g(a)) }))"
    );
}

#[test]
fn test_async_function_renames_await() {
    let source = "async function load(url) {\n  const res = await fetch(url);\n  return res.json();\n}";
    assert_eq!(
        rewrite(source),
        "var load = Yieldify.runGenerator(function*(url) {\n  const res = yield fetch(url);\n  return res.json();\n});"
    );
}

#[test]
fn test_await_in_strings_is_not_renamed() {
    assert_eq!(
        rewrite(r#"async function f() { await say("await me") }"#),
        r#"var f = Yieldify.runGenerator(function*() { yield say("await me") });"#
    );
}

#[test]
fn test_async_arrow_with_concise_body() {
    assert_eq!(
        rewrite("const f = async x => load(x);"),
        "const f = Yieldify.runGenerator(function*(x) { return (yield load(x)) }).bind(this);"
    );
}

#[test]
fn test_async_arrow_with_explicit_await() {
    assert_eq!(
        rewrite("const f = async (a) => await get(a)"),
        "const f = Yieldify.runGenerator(function*(a) { return yield get(a) }).bind(this)"
    );
}

#[test]
fn test_async_arrow_with_block_body() {
    assert_eq!(
        rewrite("on(async (e) => { handle(e) })"),
        "on(Yieldify.runGenerator(function*(e) { (yield handle(e)) }).bind(this))"
    );
}

#[test]
fn test_object_literal_methods() {
    let source = "var api = {\n  *list() { return all() },\n  async one(id) { return await get(id) }\n}";
    assert_eq!(
        rewrite(source),
        "var api = {\n  list: Yieldify.runGenerator(function*() { return (yield all()) }),\n  one: Yieldify.runGenerator(function*(id) { return yield get(id) })\n}"
    );
}

#[test]
fn test_custom_runtime_name() {
    let options = TransformOptions {
        runtime_name: "lib.rt".to_string(),
        seed: Some(3),
    };
    let out = transform_with_options("function* f() { return read(p, (0)) }", &options);
    assert_eq!(
        out.code,
        "var f = lib.rt.runGenerator(function*() { return (yield lib.rt.catchCallback(read, null, p)) });"
    );
}

#[test]
fn test_already_rewritten_code_is_not_rewritten_again() {
    let once = rewrite("run(function* () { go() })");
    assert_eq!(once, "run(Yieldify.runGenerator(function*() { (yield go()) }))");
    assert_eq!(rewrite(&once), once);
}

#[test]
fn test_seed_does_not_change_output() {
    let source = "function* f() { return a().b(\"x\") }";
    let first = transform_with_options(
        source,
        &TransformOptions {
            seed: Some(1),
            ..TransformOptions::default()
        },
    );
    let second = transform_with_options(source, &TransformOptions::default());
    assert_eq!(first.code, second.code);
}

#[test]
fn test_unbalanced_body_is_reported_not_fatal() {
    let out = transform_with_options(
        "function* f() { return g(",
        &TransformOptions {
            seed: Some(1),
            ..TransformOptions::default()
        },
    );
    assert!(!out.diagnostics.is_empty());
    assert!(out.code.starts_with("var f = Yieldify.runGenerator(function*() {"));
    assert!(out.code.contains("return g("));
}

#[test]
fn test_split_arguments_respects_nesting() {
    assert_eq!(split_arguments("a, f(b, c), [d, e]"), vec!["a", " f(b, c)", " [d, e]"]);
    assert!(split_arguments("  ").is_empty());
}

#[test]
fn test_callback_sentinel_shape() {
    assert!(is_callback_sentinel("(0)"));
    assert!(is_callback_sentinel(" ( 12 ) "));
    assert!(!is_callback_sentinel("()"));
    assert!(!is_callback_sentinel("(a)"));
    assert!(!is_callback_sentinel("0"));
}

#[test]
fn test_expression_position() {
    assert!(in_expression_position("x = function", 4));
    assert!(in_expression_position("return function", 7));
    assert!(!in_expression_position("; function", 2));
    assert!(!in_expression_position("function", 0));
}
