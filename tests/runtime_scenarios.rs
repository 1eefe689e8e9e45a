//! Rewritten code driven through the trampoline.
//!
//! There is no JavaScript engine here, so each routine below is the hand-run
//! equivalent of the generator the rewriter emits for the source next to it:
//! one `Step::Yielded` per `(yield ...)` marker in the rewritten text.

use yieldify::runtime::{
    Deferred, EventLoop, Resume, Routine, RuntimeOptions, Step, Trampoline, Value, catch_callback,
};
use yieldify::{TransformOptions, transform_with_options};

fn rewrite(source: &str) -> String {
    let options = TransformOptions {
        seed: Some(3),
        ..TransformOptions::default()
    };
    transform_with_options(source, &options).code
}

fn setup() -> (EventLoop, Trampoline) {
    let lp = EventLoop::new();
    let trampoline = Trampoline::new(lp.clone(), RuntimeOptions::default());
    (lp, trampoline)
}

/// Yields whatever `suspend` produces once, then returns the resumed value.
fn single_suspension(mut suspend: impl FnMut() -> Value + 'static) -> Box<dyn Routine> {
    let mut started = false;
    Box::new(move |input: Resume| {
        if !started {
            started = true;
            return Step::Yielded(suspend());
        }
        match input {
            Resume::Next(value) => Step::Returned(value),
            Resume::Throw(err) => Step::Threw(err),
        }
    })
}

#[test]
fn sleep_settles_with_done() {
    assert_eq!(
        rewrite("function* fn(){ return sleep(5) }"),
        "var fn = Yieldify.runGenerator(function*(){ return (yield sleep(5)) });"
    );

    let (lp, trampoline) = setup();
    let timer = lp.clone();
    let func = trampoline.run_generator(move |_args| {
        let timer = timer.clone();
        single_suspension(move || timer.sleep(5, "done").into())
    });

    let result = func.call(vec![]);
    assert!(!result.is_settled());
    lp.run();
    assert_eq!(result.peek(), Some(Ok(Value::from("done"))));
}

#[test]
fn callback_slot_yields_value() {
    assert_eq!(
        rewrite("function* f() { return fn(arg1, arg2, (0)) }"),
        "var f = Yieldify.runGenerator(function*() { return (yield Yieldify.catchCallback(fn, null, arg1, arg2)) });"
    );

    let (_lp, trampoline) = setup();
    let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let record = std::rc::Rc::clone(&seen);
    let result = trampoline.spawn(single_suspension(move || {
        let record = std::rc::Rc::clone(&record);
        catch_callback(move |callback| {
            record.borrow_mut().push("arg1, arg2");
            callback.invoke(vec![Value::Null, Value::from("value")]);
            Ok(())
        })
        .into()
    }));

    assert_eq!(result.peek(), Some(Ok(Value::from("value"))));
    assert_eq!(*seen.borrow(), vec!["arg1, arg2"]);
}

#[test]
fn rebound_class_method_yields_hi() {
    let code = rewrite("class Greeter { * greet(){ return \"hi\" } }");
    assert!(code.contains("Greeter.prototype[\"greet\"] = Yieldify.runGenerator(Greeter.prototype[\"greet\"]);"));

    let (_lp, trampoline) = setup();
    let greet = trampoline.run_generator(|_this| -> Box<dyn Routine> {
        Box::new(|_: Resume| Step::Returned(Value::from("hi")))
    });
    assert_eq!(greet.call(vec![]).peek(), Some(Ok(Value::from("hi"))));
}

#[test]
fn thrown_rejection_reaches_catch() {
    let (_lp, trampoline) = setup();
    let mut stage = 0;
    let result = trampoline.spawn(Box::new(move |input: Resume| {
        stage += 1;
        match (stage, input) {
            (1, _) => Step::Yielded(Deferred::rejected(Value::error("nope")).into()),
            (2, Resume::Throw(err)) => Step::Returned(Value::from(format!("recovered from {err}"))),
            (_, other) => Step::Threw(Value::error(format!("unexpected {other:?}"))),
        }
    }));
    assert_eq!(
        result.peek(),
        Some(Ok(Value::from("recovered from Error: nope")))
    );
}
