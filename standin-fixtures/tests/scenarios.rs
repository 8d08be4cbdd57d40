//! Generated doubles and wrappers driven against real code

use pretty_assertions::assert_eq;
use standin_fixtures::blocking::BlockingQueue;
use standin_fixtures::generated::add_double::AddDouble;
use standin_fixtures::generated::counter_double::{CounterDouble, CounterMethods};
use standin_fixtures::generated::divide_target::DivideTarget;
use standin_fixtures::generated::greeter_double::GreeterDouble;
use standin_fixtures::generated::queue_target::QueueTarget;
use standin_fixtures::generated::walker_double::WalkerDouble;
use standin_fixtures::greeter::introduce;
use standin_fixtures::queue::Queue;
use standin_fixtures::walker::Walker;
use standin_runtime::{panic_text, satisfies, RecordingReporter};
use std::thread;

#[test]
fn test_injected_result_is_returned() {
    let double = AddDouble::new();
    let imp = double.imp();
    let sum = thread::spawn(move || imp.call(1, 2));

    double.next_call().expect_args_are(1, 2).inject_result(3);
    assert_eq!(sum.join().unwrap(), 3);
    assert_eq!(double.unclaimed_calls(), 0);
}

#[test]
fn test_double_as_a_closure() {
    let double = AddDouble::new();
    let add = double.func();
    let sums = thread::spawn(move || (add(1, 1), add(2, 2)));

    double
        .next_call()
        .expect_args_should(satisfies("odd", |a: &i32| a % 2 == 1), standin_runtime::any())
        .inject_result(10);
    double.next_call().expect_args_are(2, 2).inject_result(20);
    assert_eq!(sums.join().unwrap(), (10, 20));
}

#[test]
fn test_injected_panic_reaches_the_caller() {
    let double = AddDouble::new();
    let imp = double.imp();
    let sum = thread::spawn(move || imp.call(1, 2));

    double.next_call().inject_panic("boom");
    let payload = sum.join().unwrap_err();
    assert_eq!(panic_text(&payload), Some("boom"));
}

#[test]
fn test_missing_call_times_out() {
    let reporter = RecordingReporter::new();
    let double = AddDouble::new()
        .with_reporter(reporter.clone())
        .with_timeout(std::time::Duration::from_millis(20));

    let caught = standin_runtime::catch(|| double.next_call().expect_called()).err();
    assert!(caught.is_some());
    assert!(reporter.fatal_message().unwrap().contains("`add`"));
}

#[test]
fn test_embedded_contract_methods_are_both_doubled() {
    let double = GreeterDouble::new();
    let imp = double.imp();
    let lines = thread::spawn(move || introduce(&imp, &["ada", "grace"]));

    double.name().inject_result("host".to_string());
    double
        .greet()
        .expect_args_are("ada".to_string())
        .inject_result("hello ada".to_string());
    double.greet().inject_result("hello grace".to_string());
    assert_eq!(
        lines.join().unwrap(),
        vec!["host".to_string(), "hello ada".to_string(), "hello grace".to_string()]
    );
}

#[test]
fn test_embedded_method_panics_with_the_injected_payload() {
    let double = GreeterDouble::new();
    let imp = double.imp();
    let named = thread::spawn(move || standin_fixtures::greeter::Named::name(&imp));

    double.name().inject_panic("boom");
    assert_eq!(panic_text(&named.join().unwrap_err()), Some("boom"));
}

#[test]
fn test_callbacks_are_invoked_by_the_test() {
    let double = WalkerDouble::new();
    let imp = double.imp();
    let walking = thread::spawn(move || {
        let mut seen = Vec::new();
        let kept = imp.walk("root", &mut |entry: &str| {
            seen.push(entry.to_string());
            entry.len() > 2
        });
        (kept, seen)
    });

    let call = double.walk().expect_args_are("root".to_string());
    call.invoke_visit("a").expect_returned(false);
    let visited = call.invoke_visit("abc");
    visited.expect_returned(true);
    assert_eq!(visited.returned(), Some(&true));
    call.inject_result(1);

    let (kept, seen) = walking.join().unwrap();
    assert_eq!(kept, 1);
    assert_eq!(seen, vec!["a".to_string(), "abc".to_string()]);
}

#[test]
fn test_callback_panic_is_reported_to_the_test() {
    let double = WalkerDouble::new();
    let imp = double.imp();
    let walking = thread::spawn(move || imp.walk("root", &mut |_: &str| -> bool { panic!("bad entry") }));

    let call = double.walk().expect_called();
    call.invoke_visit("x").expect_panic_with("bad entry");
    call.inject_result(0);
    assert_eq!(walking.join().unwrap(), 0);
}

#[test]
fn test_struct_double() {
    let double = CounterDouble::new();
    let mut imp = double.imp();
    let total = thread::spawn(move || {
        imp.add(2);
        imp.get()
    });

    double.add().expect_args_are(2).resolve();
    double.get().inject_result(5);
    assert_eq!(total.join().unwrap(), 5);
}

#[test]
fn test_function_target_returns_in_declared_order() {
    let mut target = DivideTarget::default();
    target.start(7, 2).expect_returns_equal(3, 1);
    let returns = target.wait_for_response().returned().unwrap();
    assert_eq!((returns.a, returns.b), (3, 1));
}

#[test]
fn test_function_target_reports_mismatches() {
    let reporter = RecordingReporter::new();
    let mut target = DivideTarget::default().with_reporter(reporter.clone());
    target.start(7, 2).expect_returns_equal(0, 0);
    let errors = reporter.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("returned 3, 1"), "{errors:?}");

    let mut target = DivideTarget::default().with_reporter(reporter.clone());
    target.start(1, 0).expect_panic_equals("division by zero");
    assert_eq!(reporter.errors().len(), 1);
}

#[test]
fn test_contract_target_runs_shared_receivers_side_by_side() {
    let target = QueueTarget::new(BlockingQueue::default());
    let mut pop = target.pop();
    pop.start();
    let mut push = target.push();
    push.start(7).expect_completes();
    pop.expect_returns_equal(7);
}

#[test]
fn test_interceptor_implements_the_contract() {
    let target = QueueTarget::new(BlockingQueue::default());
    let consumer = target.interceptor();
    let popped = thread::spawn(move || consumer.pop());
    target.interceptor().push(9);
    assert_eq!(popped.join().unwrap(), 9);
}
