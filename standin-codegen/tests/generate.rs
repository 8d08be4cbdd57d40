//! End-to-end generation against in-memory packages

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use standin_codegen::{GenerateError, Generator, GeneratorOptions, GENERATED_HEADER};
use standin_core::{GenerationRequest, Mode};
use standin_resolver::{DeriveTypeInfo, MemoryLoader, ResolutionContext, ResolveError};

fn generate_with(
    loader: &MemoryLoader,
    request: &GenerationRequest,
    options: GeneratorOptions,
) -> Result<String, GenerateError> {
    let type_info = DeriveTypeInfo::new(loader);
    Generator::new(ResolutionContext {
        loader,
        type_info: &type_info,
    })
    .with_options(options)?
    .generate_request(request)
}

fn generate(loader: &MemoryLoader, request: &GenerationRequest) -> Result<String, GenerateError> {
    generate_with(loader, request, GeneratorOptions::default())
}

fn local(source: &str) -> MemoryLoader {
    MemoryLoader::new().with_local("crate", source).unwrap()
}

/// `text` without whitespace
fn squeezed(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

const STORE: &str = r#"
    pub trait Store {
        fn get(&self, key: &str) -> Option<String>;
        fn put(&mut self, key: String, value: Vec<u8>);
    }
"#;

#[test]
fn test_artifact_is_a_formatted_file_with_a_header() {
    let request = GenerationRequest::new("Store").unwrap();
    let text = generate(&local(STORE), &request).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(GENERATED_HEADER));
    assert_eq!(lines.next(), Some("// Source: dependency `Store` in ."));
    assert!(syn::parse_file(&text).is_ok());
    assert!(text.ends_with('\n'));
}

#[test]
fn test_mode_defaults_follow_the_declaration_shape() {
    let loader = local(&format!("{STORE}\npub fn add(a: i32, b: i32) -> i32 {{ a + b }}"));
    let store = generate(&loader, &GenerationRequest::new("Store").unwrap()).unwrap();
    assert!(store.contains("pub struct StoreDouble"));
    assert!(!store.contains("StoreTarget"));

    let add = generate(&loader, &GenerationRequest::new("add").unwrap()).unwrap();
    assert!(add.contains("pub struct AddTarget"));
    assert!(!add.contains("AddDouble"));

    let add_double = GenerationRequest::new("add")
        .unwrap()
        .with_mode(Mode::Dependency);
    let add_double = generate(&loader, &add_double).unwrap();
    assert!(add_double.contains("pub struct AddDouble"));
}

#[test]
fn test_artifact_and_local_names() {
    let loader = local(STORE);
    let renamed = GenerationRequest::new("Store")
        .unwrap()
        .with_artifact_name("Kv")
        .unwrap();
    let text = generate(&loader, &renamed).unwrap();
    assert!(text.contains("pub struct KvDouble"));
    assert!(text.contains("pub struct KvGetCall"));
    assert!(!text.contains("StoreDouble"));

    let local_name = GenerationRequest::new("Store")
        .unwrap()
        .with_local_name("blob_store");
    let text = generate(&loader, &local_name).unwrap();
    assert!(text.contains("pub struct BlobStoreDouble"));
}

#[test]
fn test_options_shape_the_output() {
    let options = GeneratorOptions {
        runtime_path: "::support::standin".to_string(),
        framework_alias: "_standin_rt".to_string(),
        timeout_ms: 250,
        header: false,
    };
    let request = GenerationRequest::new("Store").unwrap();
    let text = generate_with(&local(STORE), &request, options).unwrap();
    assert!(!text.starts_with("//"));
    let text = squeezed(&text);
    assert!(text.contains("use::support::standinas_standin_rt;"));
    assert!(text.contains("_standin_rt::Duration::from_millis(250u64)"));
    assert!(!text.contains("_standin::"));
}

#[test]
fn test_unusable_options_are_rejected() {
    let options = GeneratorOptions {
        framework_alias: "rt".to_string(),
        ..Default::default()
    };
    let request = GenerationRequest::new("Store").unwrap();
    assert!(matches!(
        generate_with(&local(STORE), &request, options),
        Err(GenerateError::Options { .. })
    ));
}

#[test]
fn test_errors_come_back_whole() {
    let loader = local("pub trait Store { async fn load(&self) -> u8; }");
    let err = generate(&loader, &GenerationRequest::new("Store").unwrap()).unwrap_err();
    assert!(matches!(err, GenerateError::Validity { .. }));
    assert!(err.to_string().starts_with("Cannot generate for `Store::load`"));

    let err = generate(&loader, &GenerationRequest::new("Missing").unwrap()).unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Resolve(ResolveError::NotFound { .. })
    ));
}

#[test]
fn test_generic_targets_need_type_arguments() {
    let loader = local("pub trait Repo<T> { fn get(&self, id: u64) -> Option<T>; }");
    let open = GenerationRequest::new("Repo").unwrap().with_mode(Mode::Target);
    assert!(matches!(
        generate(&loader, &open),
        Err(GenerateError::Validity { .. })
    ));

    let closed = open.clone().with_type_arguments(["u64"]);
    let text = squeezed(&generate(&loader, &closed).unwrap());
    assert!(text.contains("impl<I:Repo<u64>+::std::marker::Send+'static>RepoTarget<I>"));
    assert!(text.contains("pubstructRepoGetReturns"));
}

#[test]
fn test_colliding_imports_are_qualified() {
    let loader = MemoryLoader::new()
        .with_local(
            "crate::store",
            r#"
            use crate::base::Lifecycle;
            use crate::model::Status;
            pub trait Store: Lifecycle { fn current(&self) -> Status; }
            "#,
        )
        .unwrap()
        .with_package(
            "crate::base",
            r#"
            pub struct Status;
            pub trait Lifecycle { fn status(&self) -> Status; }
            "#,
        )
        .unwrap()
        .with_package("crate::model", "#[derive(PartialEq)] pub struct Status;")
        .unwrap();
    let text = generate(&loader, &GenerationRequest::new("Store").unwrap()).unwrap();
    assert!(text.contains("use crate::base::Status;"));
    assert!(!text.contains("use crate::model::Status;"));
    let text = squeezed(&text);
    assert!(text.contains("fncurrent(&self)->crate::model::Status"));
    assert!(text.contains("fnstatus(&self)->Status"));
}

#[test]
fn test_names_the_artifact_declares_are_never_imported() {
    let loader = MemoryLoader::new()
        .with_local("crate::app", "")
        .unwrap()
        .with_package(
            "crate::store",
            "pub struct StoreCall; pub trait Store { fn last(&self) -> StoreCall; }",
        )
        .unwrap();
    let request = GenerationRequest::new("Store")
        .unwrap()
        .with_package("crate::store");
    let text = generate(&loader, &request).unwrap();
    assert!(text.contains("use crate::store::Store;"));
    assert!(!text.contains("use crate::store::StoreCall;"));
    assert!(squeezed(&text).contains("fnlast(&self)->crate::store::StoreCall"));
}

fn method_name() -> impl Strategy<Value = String> {
    "[a-z]{3,8}".prop_filter("identifier", |name| syn::parse_str::<syn::Ident>(name).is_ok())
}

proptest! {
    #[test]
    fn generation_is_deterministic(
        names in prop::collection::btree_set(method_name(), 1..5),
        target in any::<bool>(),
    ) {
        let methods: String = names
            .iter()
            .map(|name| format!("fn {name}(&self, value: u32) -> u32;\n"))
            .collect();
        let loader = local(&format!("pub trait Subject {{\n{methods}}}"));
        let mode = if target { Mode::Target } else { Mode::Dependency };
        let request = GenerationRequest::new("Subject").unwrap().with_mode(mode);
        let first = generate(&loader, &request).unwrap();
        let second = generate(&loader, &request).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert!(syn::parse_file(&first).is_ok());
    }
}
