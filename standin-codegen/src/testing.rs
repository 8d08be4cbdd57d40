//! Fixtures for the emitter tests

use crate::{Generator, Result};
use standin_core::{GenerationRequest, Mode};
use standin_resolver::{DeriveTypeInfo, MemoryLoader, ResolutionContext};

/// Generate for `request` against a local package holding `source`
pub(crate) fn generate(source: &str, request: GenerationRequest) -> Result<String> {
    let loader = MemoryLoader::new().with_local("crate", source).unwrap();
    let type_info = DeriveTypeInfo::new(&loader);
    Generator::new(ResolutionContext {
        loader: &loader,
        type_info: &type_info,
    })
    .generate_request(&request)
}

pub(crate) fn rendered(source: &str, name: &str, mode: Mode) -> String {
    let request = GenerationRequest::new(name).unwrap().with_mode(mode);
    compact(&generate(source, request).unwrap())
}

/// `text` without whitespace or trailing separators, so assertions do not
/// depend on where the formatter breaks lines
pub(crate) fn compact(text: &str) -> String {
    let squeezed: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    squeezed
        .replace(",)", ")")
        .replace(",}", "}")
        .replace(",]", "]")
        .replace(",>", ">")
}

#[track_caller]
pub(crate) fn assert_contains(haystack: &str, needle: &str) {
    let needle = compact(needle);
    assert!(
        haystack.contains(&needle),
        "`{needle}` not found in:\n{haystack}"
    );
}

#[track_caller]
pub(crate) fn assert_lacks(haystack: &str, needle: &str) {
    let needle = compact(needle);
    assert!(
        !haystack.contains(&needle),
        "`{needle}` unexpectedly found in:\n{haystack}"
    );
}
