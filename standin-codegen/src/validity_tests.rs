//! Tests for validity checks

use super::*;
use pretty_assertions::assert_eq;
use standin_core::GenerationRequest;
use standin_resolver::{DeriveTypeInfo, MemoryLoader, ResolutionContext, Resolver};

fn subject_in(loader: &MemoryLoader, request: GenerationRequest) -> Subject {
    let type_info = DeriveTypeInfo::new(loader);
    let resolver = Resolver::new(ResolutionContext {
        loader,
        type_info: &type_info,
    });
    resolver.resolve_request(&request).unwrap().1
}

fn subject(source: &str, name: &str) -> Subject {
    let loader = MemoryLoader::new().with_local("crate", source).unwrap();
    subject_in(&loader, GenerationRequest::new(name).unwrap())
}

/// `(method, parameter)` of a validity error
fn culprit(result: Result<()>) -> (String, Option<String>) {
    match result {
        Err(GenerateError::Validity {
            method, parameter, ..
        }) => (method, parameter),
        other => panic!("expected a validity error, got {other:?}"),
    }
}

#[test]
fn test_plain_shapes_pass_in_both_modes() {
    let store = subject(
        r#"
        pub trait Store {
            fn get(&self, key: &str) -> Option<String>;
            fn put(&mut self, key: String, value: Vec<u8>);
            fn walk(&self, visit: &mut dyn FnMut(&str) -> bool) -> usize;
        }
        "#,
        "Store",
    );
    assert!(check(&store, Mode::Dependency).is_ok());
    assert!(check(&store, Mode::Target).is_ok());

    let add = subject("pub fn add(a: i32, b: i32) -> i32 { a + b }", "add");
    assert!(check(&add, Mode::Target).is_ok());
    assert!(check(&add, Mode::Dependency).is_ok());
}

#[test]
fn test_async_methods_are_rejected() {
    let store = subject(
        "pub trait Store { async fn load(&self) -> u8; }",
        "Store",
    );
    assert_eq!(
        culprit(check(&store, Mode::Dependency)),
        ("Store::load".to_string(), None)
    );
}

#[test]
fn test_receivers() {
    let source = r#"
        pub trait Factory {
            fn build(self) -> u8;
        }
        pub trait Versioned {
            fn version() -> u32;
        }
        pub trait Boxed {
            fn run(self: Box<Self>);
        }
    "#;
    let factory = subject(source, "Factory");
    assert!(check(&factory, Mode::Dependency).is_ok());
    assert_eq!(
        culprit(check(&factory, Mode::Target)),
        ("Factory::build".to_string(), Some("self".to_string()))
    );

    let versioned = subject(source, "Versioned");
    assert_eq!(
        culprit(check(&versioned, Mode::Dependency)),
        ("Versioned::version".to_string(), None)
    );

    let boxed = subject(source, "Boxed");
    assert_eq!(
        culprit(check(&boxed, Mode::Dependency)),
        ("Boxed::run".to_string(), Some("self".to_string()))
    );
}

#[test]
fn test_callback_shapes() {
    let source = r#"
        pub trait Pipeline {
            fn map(&self, f: fn(u8) -> u8) -> u8;
            fn finish(&self, done: &dyn FnOnce());
            fn nest(&self, outer: &dyn Fn(&dyn Fn(u8)));
            fn lend(&self, f: &dyn Fn() -> &'static str);
        }
    "#;
    let pipeline = subject(source, "Pipeline");
    let problems: Vec<(String, Option<String>)> = [Mode::Dependency, Mode::Target]
        .iter()
        .map(|mode| culprit(check(&pipeline, *mode)))
        .collect();
    // Methods are checked in declaration order; fn pointers only fail as targets
    assert_eq!(problems[1], ("Pipeline::map".to_string(), Some("f".to_string())));
    assert_eq!(
        problems[0],
        ("Pipeline::finish".to_string(), Some("done".to_string()))
    );
}

#[test]
fn test_nested_and_borrowing_callbacks() {
    let nest = subject(
        "pub trait Nest { fn nest(&self, outer: &dyn Fn(&dyn Fn(u8))); }",
        "Nest",
    );
    assert_eq!(
        culprit(check(&nest, Mode::Dependency)),
        ("Nest::nest".to_string(), Some("outer".to_string()))
    );
    let lend = subject(
        "pub trait Lend { fn lend(&self, f: &dyn Fn() -> &'static str); }",
        "Lend",
    );
    assert_eq!(
        culprit(check(&lend, Mode::Dependency)),
        ("Lend::lend".to_string(), Some("f".to_string()))
    );
}

#[test]
fn test_open_generics() {
    let id = subject("pub fn id<T: Clone>(x: T) -> T { x }", "id");
    assert_eq!(
        culprit(check(&id, Mode::Target)),
        ("id".to_string(), Some("T".to_string()))
    );

    let source = r#"
        pub trait Repo<T> { fn get(&self, id: u64) -> Option<T>; }
        pub trait Each { fn each<F: Fn(u32)>(&self, f: F); }
    "#;
    let repo = subject(source, "Repo");
    assert!(check(&repo, Mode::Dependency).is_ok());
    assert_eq!(
        culprit(check(&repo, Mode::Target)),
        ("Repo".to_string(), Some("T".to_string()))
    );
    let each = subject(source, "Each");
    assert!(check(&each, Mode::Dependency).is_ok());
    assert!(check(&each, Mode::Target).is_ok());
}

#[test]
fn test_variadic_functions_are_rejected() {
    let printf = subject(
        r#"extern "C" { pub fn printf(format: *const u8, ...) -> i32; }"#,
        "printf",
    );
    assert_eq!(
        culprit(check(&printf, Mode::Dependency)),
        ("printf".to_string(), None)
    );
}

#[test]
fn test_private_items_of_other_packages() {
    let loader = MemoryLoader::new()
        .with_local("crate::app", "")
        .unwrap()
        .with_package(
            "crate::store",
            r#"
            trait Hidden { fn get(&self) -> u8; }
            struct Secret;
            pub trait Leaky { fn get(&self) -> Secret; }
            "#,
        )
        .unwrap();
    let request = |name: &str| {
        GenerationRequest::new(name)
            .unwrap()
            .with_package("crate::store")
    };
    let hidden = subject_in(&loader, request("Hidden"));
    assert_eq!(
        culprit(check(&hidden, Mode::Dependency)),
        ("Hidden".to_string(), None)
    );
    let leaky = subject_in(&loader, request("Leaky"));
    assert_eq!(
        culprit(check(&leaky, Mode::Dependency)),
        ("Leaky::get".to_string(), Some("Secret".to_string()))
    );
}
