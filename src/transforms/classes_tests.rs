use super::transform_with_options;
use crate::config::TransformOptions;

fn rewrite(source: &str) -> String {
    let options = TransformOptions {
        seed: Some(1),
        ..TransformOptions::default()
    };
    transform_with_options(source, &options).code
}

#[test]
fn test_generator_method_is_rebound_after_class() {
    assert_eq!(
        rewrite("class Greeter {\n  *greet() { return \"hi\" }\n}"),
        "class Greeter {\n  *greet() { return \"hi\" }\n};Greeter.prototype[\"greet\"] = Yieldify.runGenerator(Greeter.prototype[\"greet\"]);"
    );
}

#[test]
fn test_class_without_suspendable_methods_is_untouched() {
    let source = "class Point {\n  constructor(x) { this.x = x }\n  norm() { return abs(this.x) }\n}";
    assert_eq!(rewrite(source), source);
}

#[test]
fn test_static_and_async_methods() {
    let source = "class Repo {\n  constructor(db) { this.db = db }\n  static *open(path) { return connect(path) }\n  async find(id) { return this.db.get(id) }\n}";
    assert_eq!(
        rewrite(source),
        "class Repo {\n  constructor(db) { this.db = db }\n  static *open(path) { return (yield connect(path)) }\n  *find(id) { return (yield this.db.get(id)) }\n};Repo.prototype[\"find\"] = Yieldify.runGenerator(Repo.prototype[\"find\"]);Repo[\"open\"] = Yieldify.runGenerator(Repo[\"open\"]);"
    );
}

#[test]
fn test_quoted_method_name_is_resolved() {
    assert_eq!(
        rewrite("class A { *\"odd-name\"() { return 1 } }"),
        "class A { *\"odd-name\"() { return 1 } };A.prototype[\"odd-name\"] = Yieldify.runGenerator(A.prototype[\"odd-name\"]);"
    );
}

#[test]
fn test_class_expression_is_wrapped() {
    assert_eq!(
        rewrite("var A = class {\n  *run() { return go() }\n}"),
        "var A = ((c) => { c.prototype[\"run\"] = Yieldify.runGenerator(c.prototype[\"run\"]);return c })(class {\n  *run() { return (yield go()) }\n})"
    );
}

#[test]
fn test_exported_default_class_is_an_expression() {
    assert_eq!(
        rewrite("export default class Jobs { *next() { return pop() } }"),
        "export default ((c) => { c.prototype[\"next\"] = Yieldify.runGenerator(c.prototype[\"next\"]);return c })(class Jobs { *next() { return (yield pop()) } })"
    );
}

#[test]
fn test_extends_clause() {
    assert_eq!(
        rewrite("class B extends mix(A) { *m() { return n() } }"),
        "class B extends mix(A) { *m() { return (yield n()) } };B.prototype[\"m\"] = Yieldify.runGenerator(B.prototype[\"m\"]);"
    );
}

#[test]
fn test_class_as_property_name_is_ignored() {
    let source = "el.class = name;";
    assert_eq!(rewrite(source), source);
}

#[test]
fn test_async_arrow_in_class_field() {
    assert_eq!(
        rewrite("class C {\n  handler = async (e) => { save(e) }\n}"),
        "class C {\n  handler = Yieldify.runGenerator(function*(e) { (yield save(e)) }).bind(this)\n}"
    );
}
