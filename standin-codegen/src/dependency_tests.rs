//! Tests for dependency doubles

use crate::testing::{assert_contains, assert_lacks, generate, rendered};
use standin_core::{GenerationRequest, Mode};

const STORE: &str = r#"
    pub trait Store {
        fn get(&self, key: &str) -> Option<String>;
        fn put(&mut self, key: String, value: Vec<u8>);
    }
"#;

fn double(source: &str, name: &str) -> String {
    rendered(source, name, Mode::Dependency)
}

#[test]
fn test_trait_double_items() {
    let text = double(STORE, "Store");
    assert_contains(&text, "use ::standin_runtime as _standin;");
    assert_contains(&text, "use crate::Store;");
    assert_contains(&text, "pub struct StoreDouble { __controller: _standin::Controller<StoreCall>, }");
    assert_contains(&text, "pub struct StoreDoubleImpl {");
    assert_contains(&text, "impl Store for StoreDoubleImpl {");
    assert_contains(&text, "pub enum StoreCall { Get(StoreGetCall), Put(StorePutCall), }");
    assert_contains(&text, "StoreCall::Put(_) => \"put\"");
    assert_contains(
        &text,
        "fn __conformance(imp: StoreDoubleImpl) -> impl Store { imp }",
    );
}

#[test]
fn test_call_records_own_their_arguments() {
    let text = double(STORE, "Store");
    assert_contains(
        &text,
        "pub struct StoreGetCall { pub key: String, __responder: _standin::Responder<StoreGetResponse>, }",
    );
    assert_contains(
        &text,
        "pub struct StorePutCall { pub key: String, pub value: Vec<u8>,",
    );
    // `&str` arguments are copied before the call is queued
    assert_contains(&text, "key: ::std::borrow::ToOwned::to_owned(&*key),");
    assert_contains(&text, "fn get(&self, key: &str) -> Option<String> {");
    assert_contains(&text, "fn put(&mut self, key: String, value: Vec<u8>) {");
}

#[test]
fn test_answers_follow_the_return_shape() {
    let text = double(STORE, "Store");
    assert_contains(&text, "pub fn inject_result(self, result: Option<String>)");
    assert_contains(&text, "pub fn resolve(self)");
    assert_contains(&text, "pub fn inject_panic(self, payload: impl ::std::any::Any + ::std::marker::Send)");
    assert_contains(&text, "StorePutResponse::Resolve => {}");

    let pair = double(
        "pub trait Pair { fn split(&self, n: i32) -> (i32, i32); }",
        "Pair",
    );
    assert_contains(&pair, "pub fn inject_results(self, a: i32, b: i32)");
    assert_contains(&pair, "PairSplitResponse::Return { a, b } => (a, b)");
}

#[test]
fn test_expectations() {
    let text = double(STORE, "Store");
    assert_contains(&text, "pub fn get(&self) -> StoreGetExpectation<'_>");
    assert_contains(&text, "pub struct StoreGetExpectation<'a> {");
    assert_contains(&text, "pub fn within(mut self, timeout: _standin::Duration) -> Self");
    assert_contains(&text, "pub fn expect_called(self) -> StoreGetCall");
    assert_contains(&text, "pub fn expect_args_are(self, key: String) -> StoreGetCall");
    assert_contains(
        &text,
        "pub fn expect_args_should(self, key: impl _standin::Matcher<String>) -> StoreGetCall",
    );
    assert_contains(&text, "_standin::Duration::from_millis(1000u64)");
}

#[test]
fn test_argument_comparison_follows_comparability() {
    let text = double(
        r#"
        #[derive(PartialEq)]
        pub struct Key(u32);
        pub struct Blob(Vec<u8>);
        pub trait Cache { fn put(&self, key: Key, blob: Blob); }
        "#,
        "Cache",
    );
    assert_contains(&text, "__call.key == key");
    assert_contains(&text, "_standin::deep_equal!(__call.blob, blob)");
    assert_lacks(&text, "__call.blob == blob");
    assert_contains(
        &text,
        "if __call.key == key && _standin::deep_equal!(__call.blob, blob) =>",
    );
    assert_contains(
        &text,
        "if _standin::Matcher::matches(&key, &__call.key) && _standin::Matcher::matches(&blob, &__call.blob) =>",
    );
    assert_lacks(&text, "if true");
}

#[test]
fn test_formatted_docs_keep_their_leading_space() {
    let request = GenerationRequest::new("Store").unwrap();
    let text = generate(STORE, request).unwrap();
    assert!(text.contains("/// A captured call to any method of `Store`"), "{text}");
    assert!(text.contains("/// Expectations on calls to `get`"), "{text}");
    let squeezed: Vec<_> = text
        .lines()
        .map(str::trim_start)
        .filter(|line| line.starts_with("///") && !line.starts_with("/// ") && *line != "///")
        .collect();
    assert!(squeezed.is_empty(), "{squeezed:#?}");
}

#[test]
fn test_callbacks_are_served_while_waiting() {
    let text = double(
        "pub trait Walker { fn walk(&self, root: String, visit: &mut dyn FnMut(&str) -> bool) -> usize; }",
        "Walker",
    );
    assert_contains(&text, "pub struct WalkerWalkVisitRequest { pub s: String,");
    assert_contains(&text, "__visit: _standin::CallbackInvoker<WalkerWalkVisitRequest>,");
    assert_contains(&text, "-> WalkerWalkVisitResult {");
    assert_contains(&text, "self.__visit.invoke(WalkerWalkVisitRequest {");
    assert_contains(
        &text,
        "_standin::wait_serving(__pending, &mut [&mut __visit_server as &mut dyn _standin::Serve])",
    );
    assert_contains(&text, "pub fn expect_returned(&self, expected0: bool)");
}

#[test]
fn test_generic_contracts() {
    let repo = double(
        "pub trait Repo<T> { fn get(&self, id: u64) -> Option<T>; }",
        "Repo",
    );
    assert_contains(&repo, "pub struct RepoDouble<T> {");
    assert_contains(&repo, "pub enum RepoCall<T> { Get(RepoGetCall<T>), }");
    assert_contains(&repo, "impl<T> ::std::clone::Clone for RepoDoubleImpl<T>");
    assert_lacks(&repo, "__Phantom");

    // A type parameter no record mentions still needs a home in the union
    let sink = double("pub trait Sink<T> { fn flush(&self); }", "Sink");
    assert_contains(&sink, "__Phantom(");
    assert_contains(&sink, "::std::convert::Infallible");
    assert_contains(&sink, "pub enum SinkCall<T> {");
}

#[test]
fn test_struct_methods_become_a_contract() {
    let text = double(
        r#"
        pub struct Counter { hits: u64 }
        impl Counter {
            pub fn new() -> Self { Counter { hits: 0 } }
            pub fn get(&self) -> u64 { self.hits }
            pub fn reset(&mut self) { self.hits = 0; }
        }
        "#,
        "Counter",
    );
    assert_contains(&text, "pub trait CounterMethods {");
    assert_contains(&text, "impl CounterMethods for Counter {");
    assert_contains(&text, "<Counter>::get(self)");
    assert_contains(&text, "impl CounterMethods for CounterDoubleImpl {");
    assert_contains(&text, "-> impl CounterMethods { imp }");
    assert_lacks(&text, "CounterNewCall");
}

#[test]
fn test_embedded_methods_keep_their_trait() {
    let text = double(
        r#"
        pub trait Runner { fn run(&self); }
        pub trait Job: Runner { fn name(&self) -> String; }
        "#,
        "Job",
    );
    assert_contains(&text, "impl Job for JobDoubleImpl {");
    assert_contains(&text, "impl Runner for JobDoubleImpl {");
    assert_contains(&text, "Run(JobRunCall)");
    assert_contains(&text, "Name(JobNameCall)");
}

#[test]
fn test_clashing_embedded_methods_are_keyed_by_trait() {
    let text = double(
        r#"
        pub trait Runner { fn run(&self); }
        pub trait Job: Runner { fn run(&self, times: u32); }
        "#,
        "Job",
    );
    assert_contains(&text, "RunnerRun(JobRunnerRunCall)");
    assert_contains(&text, "pub fn runner_run(&self) -> JobRunnerRunExpectation<'_>");
    assert_contains(&text, "pub fn run(&self) -> JobRunExpectation<'_>");
}

#[test]
fn test_function_double() {
    let text = double("pub fn add(a: i32, b: i32) -> i32 { a + b }", "add");
    assert_contains(&text, "pub struct AddDouble { __controller: _standin::Controller<AddCall>, }");
    assert_contains(&text, "pub fn call(&self, a: i32, b: i32) -> i32 {");
    assert_contains(&text, "pub fn next_call(&self) -> AddExpectation<'_>");
    assert_contains(&text, "pub fn inject_result(self, result: i32)");
    assert_contains(&text, "const _: fn(i32, i32) -> i32 = crate::add;");
    assert_contains(&text, "pub fn func(&self)");
    assert_contains(&text, "move |a: i32, b: i32| imp.call(a, b)");
    assert_lacks(&text, "enum AddCall");
}

#[test]
fn test_generic_function_double_skips_conformance() {
    let text = double(
        "pub fn apply<F: Fn(u32) -> u32>(x: u32, f: F) -> u32 { f(x) }",
        "apply",
    );
    assert_contains(&text, "pub fn call<F: Fn(u32) -> u32>(&self, x: u32, f: F) -> u32");
    assert_lacks(&text, "const _: fn(");
    assert_lacks(&text, "pub fn func(");
}
