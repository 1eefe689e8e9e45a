use super::functions::concise_body_end;
use super::{Pass, Rewriter};
use yieldify_scanner::{KeyGen, PlaceholderMap};

fn rewriter(literals: &PlaceholderMap) -> Rewriter<'_> {
    Rewriter::new(
        KeyGen::new(1),
        "Yieldify",
        "Yieldify.runGenerator(function*(",
        literals,
    )
}

#[test]
fn test_protects_function_expressions_and_arrows() {
    let literals = PlaceholderMap::new();
    let mut rw = rewriter(&literals);
    let (text, map) = rw.protect_functions("a(function () { b() }, x => x + 1)");
    assert_eq!(text, "a(__y1f0__, __y1f1__)");
    assert_eq!(map.replacement("__y1f0__"), Some("function () { b() }"));
    assert_eq!(map.replacement("__y1f1__"), Some("x => x + 1"));
}

#[test]
fn test_protects_method_shorthand_with_modifiers() {
    let literals = PlaceholderMap::new();
    let mut rw = rewriter(&literals);
    let (text, map) =
        rw.protect_functions("class A { static get x() { return 1 } constructor(y) { this.y = y } }");
    assert_eq!(text, "class A { __y1f0__ __y1f1__ }");
    assert_eq!(map.replacement("__y1f0__"), Some("static get x() { return 1 }"));
    assert_eq!(map.replacement("__y1f1__"), Some("constructor(y) { this.y = y }"));
}

#[test]
fn test_leaves_suspendable_functions_alone() {
    let literals = PlaceholderMap::new();
    let mut rw = rewriter(&literals);
    let source = "function* g() { h() } async function k() {} async (a) => a";
    let (text, map) = rw.protect_functions(source);
    assert_eq!(text, source);
    assert!(map.is_empty());
}

#[test]
fn test_statement_heads_are_not_methods() {
    let literals = PlaceholderMap::new();
    let mut rw = rewriter(&literals);
    let source = "if (x) { y() } for (;;) { z() }";
    let (text, map) = rw.protect_functions(source);
    assert_eq!(text, source);
    assert!(map.is_empty());
}

#[test]
fn test_function_bodies_are_rewritten_as_regions() {
    let literals = PlaceholderMap::new();
    let mut rw = rewriter(&literals);
    let (text, map) = rw.protect_functions("function outer() { function* inner() { return g() } }");
    assert_eq!(text, "__y1f1__");
    assert_eq!(
        map.replacement("__y1f1__"),
        Some("function outer() { var inner = Yieldify.runGenerator(function*() { return (yield g()) }); }")
    );
}

#[test]
fn test_unclosed_body_runs_to_end_of_text() {
    let literals = PlaceholderMap::new();
    let mut rw = rewriter(&literals);
    let (text, map) = rw.protect_functions("function a() { b(");
    assert_eq!(text, "__y1f0__");
    assert_eq!(map.replacement("__y1f0__"), Some("function a() { b("));

    let diagnostics = rw.into_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].pass, Pass::Functions);
}

#[test]
fn test_concise_body_end() {
    assert_eq!(concise_body_end("a(b, c), d", 0), 7);
    assert_eq!(concise_body_end("x + 1)", 0), 5);
    assert_eq!(concise_body_end("{ a: 1 }\nnext", 0), 8);
    assert_eq!(concise_body_end("rest", 0), 4);
}
