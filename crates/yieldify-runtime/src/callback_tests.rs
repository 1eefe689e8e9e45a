//! Tests for callback adaptation

use crate::callback::{catch_callback, normalize_callback_args};
use crate::event_loop::EventLoop;
use crate::value::Value;

#[test]
fn test_normalisation_rules() {
    assert_eq!(normalize_callback_args(vec![]), Value::Undefined);
    assert_eq!(normalize_callback_args(vec![Value::from(4)]), Value::from(4));
    assert_eq!(
        normalize_callback_args(vec![Value::Null, Value::from("value")]),
        Value::from("value")
    );
    assert_eq!(
        normalize_callback_args(vec![Value::error("bad"), Value::from(1)]),
        Value::error("bad")
    );
    assert_eq!(
        normalize_callback_args(vec![Value::from(1), Value::from(2)]),
        Value::list(vec![Value::from(1), Value::from(2)])
    );
    assert_eq!(
        normalize_callback_args(vec![Value::Null, Value::from(1), Value::from(2)]),
        Value::list(vec![Value::Null, Value::from(1), Value::from(2)])
    );
}

#[test]
fn test_synchronous_error_first_callback() {
    let d = catch_callback(|cb| {
        cb.invoke(vec![Value::Null, Value::from("value")]);
        Ok(())
    });
    assert_eq!(d.peek(), Some(Ok(Value::from("value"))));
}

#[test]
fn test_asynchronous_callback() {
    let lp = EventLoop::new();
    let timer = lp.clone();
    let d = catch_callback(move |cb| {
        timer.set_timeout(4, move || cb.invoke(vec![Value::from(9)]));
        Ok(())
    });
    assert!(!d.is_settled());
    lp.run();
    assert_eq!(d.peek(), Some(Ok(Value::from(9))));
}

#[test]
fn test_failing_function_rejects() {
    let d = catch_callback(|_cb| Err(Value::error("threw")));
    assert_eq!(d.peek(), Some(Err(Value::error("threw"))));
}
