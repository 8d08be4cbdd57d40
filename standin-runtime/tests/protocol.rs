//! Protocol scenarios, driven through hand-assembled doubles and wrappers
//! shaped like the generated ones.

use pretty_assertions::assert_eq;
use standin_runtime as _standin;
use standin_runtime::{Outcome, RecordingReporter, SharedReporter};
use std::panic::resume_unwind;
use std::thread;
use std::time::Duration;

trait Calculator {
    fn add(&self, a: i32, b: i32) -> i32;
    fn walk(&self, root: &str, visit: &mut dyn FnMut(&str) -> bool) -> usize;
}

enum CalculatorCall {
    Add(CalculatorAddCall),
    Walk(CalculatorWalkCall),
}

impl _standin::MethodCall for CalculatorCall {
    fn method_name(&self) -> &'static str {
        match self {
            CalculatorCall::Add(_) => "add",
            CalculatorCall::Walk(_) => "walk",
        }
    }
}

enum CalculatorAddResponse {
    Return { i: i32 },
    Panic(_standin::PanicPayload),
}

struct CalculatorAddCall {
    a: i32,
    b: i32,
    __responder: _standin::Responder<CalculatorAddResponse>,
}

impl CalculatorAddCall {
    fn inject_result(self, i: i32) {
        self.__responder.respond(CalculatorAddResponse::Return { i });
    }

    fn inject_panic(self, payload: impl std::any::Any + Send) {
        self.__responder
            .respond(CalculatorAddResponse::Panic(_standin::payload(payload)));
    }
}

struct CalculatorWalkVisitRequest {
    s: String,
    __responder: _standin::Responder<Result<bool, _standin::PanicPayload>>,
}

enum CalculatorWalkResponse {
    Return { i: usize },
    Panic(_standin::PanicPayload),
}

struct CalculatorWalkCall {
    root: String,
    __visit: _standin::CallbackInvoker<CalculatorWalkVisitRequest>,
    __reporter: SharedReporter,
    __responder: _standin::Responder<CalculatorWalkResponse>,
}

impl CalculatorWalkCall {
    fn invoke_visit(&self, s: &str) -> _standin::CallbackResult<bool> {
        let (__responder, __pending) = _standin::exchange();
        self.__visit.invoke(CalculatorWalkVisitRequest {
            s: s.to_owned(),
            __responder,
        });
        _standin::CallbackResult::new("visit", __pending.wait(), self.__reporter.clone())
    }

    fn inject_result(self, i: usize) {
        self.__responder.respond(CalculatorWalkResponse::Return { i });
    }
}

#[derive(Clone)]
struct CalculatorDoubleImpl {
    __calls: _standin::CallSender<CalculatorCall>,
    __reporter: SharedReporter,
}

impl Calculator for CalculatorDoubleImpl {
    fn add(&self, a: i32, b: i32) -> i32 {
        let (__responder, __pending) = _standin::exchange();
        self.__calls
            .send(CalculatorCall::Add(CalculatorAddCall { a, b, __responder }));
        match __pending.wait() {
            CalculatorAddResponse::Return { i } => i,
            CalculatorAddResponse::Panic(payload) => resume_unwind(payload),
        }
    }

    fn walk(&self, root: &str, visit: &mut dyn FnMut(&str) -> bool) -> usize {
        let (__responder, __pending) = _standin::exchange();
        let (__visit_invoker, __visit_requests) = _standin::callback_channel();
        self.__calls.send(CalculatorCall::Walk(CalculatorWalkCall {
            root: root.to_owned(),
            __visit: __visit_invoker,
            __reporter: self.__reporter.clone(),
            __responder,
        }));
        let mut __visit_server = _standin::CallbackServer::new(
            __visit_requests,
            |__request: CalculatorWalkVisitRequest| {
                let CalculatorWalkVisitRequest { s, __responder } = __request;
                __responder.respond(_standin::catch(|| visit(s.as_str())));
            },
        );
        let __response = _standin::wait_serving(__pending, &mut [&mut __visit_server]);
        match __response {
            CalculatorWalkResponse::Return { i } => i,
            CalculatorWalkResponse::Panic(payload) => resume_unwind(payload),
        }
    }
}

struct CalculatorDouble {
    __controller: _standin::Controller<CalculatorCall>,
}

impl CalculatorDouble {
    fn with_reporter(reporter: SharedReporter) -> Self {
        Self {
            __controller: _standin::Controller::new(reporter, Duration::from_secs(5)),
        }
    }

    fn imp(&self) -> CalculatorDoubleImpl {
        CalculatorDoubleImpl {
            __calls: self.__controller.sender(),
            __reporter: self.__controller.reporter().clone(),
        }
    }

    fn expect_add_args_are(&self, a: i32, b: i32) -> CalculatorAddCall {
        let description = format!(
            "a call to `add` with a = {}, b = {}",
            _standin::show!(a),
            _standin::show!(b)
        );
        self.__controller.next_matching(
            "add",
            &description,
            self.__controller.timeout(),
            |call| match call {
                CalculatorCall::Add(call) if call.a == a && call.b == b => Ok(call),
                other => Err(other),
            },
        )
    }

    fn expect_add_called(&self, timeout: Duration) -> CalculatorAddCall {
        self.__controller
            .next_matching("add", "a call to `add`", timeout, |call| match call {
                CalculatorCall::Add(call) => Ok(call),
                other => Err(other),
            })
    }

    fn expect_walk_called(&self) -> CalculatorWalkCall {
        self.__controller.next_matching(
            "walk",
            "a call to `walk`",
            self.__controller.timeout(),
            |call| match call {
                CalculatorCall::Walk(call) => Ok(call),
                other => Err(other),
            },
        )
    }
}

fn double() -> (CalculatorDouble, std::sync::Arc<RecordingReporter>) {
    let reporter = RecordingReporter::new();
    (CalculatorDouble::with_reporter(reporter.clone()), reporter)
}

#[test]
fn test_single_return() {
    let (double, reporter) = double();
    let calculator = double.imp();
    let caller = thread::spawn(move || calculator.add(1, 2));

    double.expect_add_args_are(1, 2).inject_result(3);

    assert_eq!(caller.join().unwrap(), 3);
    assert!(reporter.errors().is_empty());
}

#[test]
fn test_panic_propagation() {
    let (double, _) = double();
    let calculator = double.imp();
    let caller = thread::spawn(move || calculator.add(5, 6));

    double.expect_add_args_are(5, 6).inject_panic("boom");

    let payload = caller.join().unwrap_err();
    assert!(_standin::panic_matches(&payload, &"boom"));
}

#[test]
fn test_calls_are_claimed_by_arguments_in_arrival_order() {
    let (double, _) = double();
    let first = double.imp();
    let second = double.imp();
    let a = thread::spawn(move || first.add(1, 1));
    let pending = double.expect_add_called(Duration::from_secs(5));
    let b = thread::spawn(move || second.add(2, 2));

    double.expect_add_args_are(2, 2).inject_result(4);
    pending.inject_result(2);

    assert_eq!(a.join().unwrap(), 2);
    assert_eq!(b.join().unwrap(), 4);
}

#[test]
fn test_expectation_timeout_is_a_reported_failure() {
    let (double, reporter) = double();
    let caught = _standin::catch(|| double.expect_add_called(Duration::from_millis(20)));
    assert!(caught.is_err());
    assert!(reporter
        .fatal_message()
        .unwrap()
        .contains("waiting for a call to `add`"));
}

#[test]
fn test_callback_nesting() {
    let (double, reporter) = double();
    let calculator = double.imp();
    let caller = thread::spawn(move || {
        let mut seen = Vec::new();
        let count = calculator.walk("/", &mut |path: &str| {
            seen.push(path.to_string());
            path.len() > 1
        });
        (count, seen)
    });

    let walk = double.expect_walk_called();
    assert_eq!(walk.root, "/");
    walk.invoke_visit("/a")
        .check_returned(|r| *r, || "true".to_string(), |r| r.to_string());
    walk.invoke_visit("/")
        .check_returned(|r| !*r, || "false".to_string(), |r| r.to_string());
    walk.inject_result(2);

    let (count, seen) = caller.join().unwrap();
    assert_eq!(count, 2);
    assert_eq!(seen, vec!["/a".to_string(), "/".to_string()]);
    assert!(reporter.errors().is_empty());
}

#[test]
fn test_panicking_callback_is_reported_to_the_invoker() {
    let (double, reporter) = double();
    let calculator = double.imp();
    let caller = thread::spawn(move || {
        calculator.walk("/", &mut |_: &str| -> bool { panic!("bad path") })
    });

    let walk = double.expect_walk_called();
    walk.invoke_visit("/x").expect_panic_with("bad path");
    walk.inject_result(0);

    assert_eq!(caller.join().unwrap(), 0);
    assert!(reporter.errors().is_empty());
}

fn divide(a: i32, b: i32) -> (i32, i32) {
    (a / b, a % b)
}

#[test]
fn test_completion_carries_exactly_one_outcome() {
    let mut returned = _standin::launch(|| divide(7, 2));
    match returned.wait() {
        Outcome::Returned((quotient, remainder)) => assert_eq!((*quotient, *remainder), (3, 1)),
        Outcome::Panicked(payload) => panic!("unexpected {}", _standin::describe_payload(payload)),
    }

    let zero = std::hint::black_box(0);
    let mut panicked = _standin::launch(move || divide(1, zero));
    assert!(matches!(panicked.wait(), Outcome::Panicked(_)));
    assert!(panicked.is_done());
}
