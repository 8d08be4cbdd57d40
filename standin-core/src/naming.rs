//! Naming policy for synthesized names
//!
//! All functions are pure lookups over `(index, class, total)`; there is no
//! table state to share between concurrent generations.

use crate::types::PrimitiveClass;

/// Sequential field names for unnamed parameters and results
pub const LETTERS: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];

/// Mnemonic for a sole value of a recognized class
pub fn mnemonic(class: PrimitiveClass) -> Option<&'static str> {
    match class {
        PrimitiveClass::Textual => Some("s"),
        PrimitiveClass::Integral => Some("i"),
        PrimitiveClass::Floating => Some("f"),
        PrimitiveClass::Other => None,
    }
}

/// Record field name for the unnamed parameter at `index` of `total`
pub fn field_name(index: usize, class: PrimitiveClass, total: usize) -> String {
    synthesized(index, class, total, "arg")
}

/// Record field name for the result at `index` of `total`
pub fn result_field_name(index: usize, class: PrimitiveClass, total: usize) -> String {
    synthesized(index, class, total, "result")
}

fn synthesized(index: usize, class: PrimitiveClass, total: usize, fallback: &str) -> String {
    if total == 1 {
        if let Some(name) = mnemonic(class) {
            return name.to_string();
        }
    }
    match LETTERS.get(index) {
        Some(letter) => (*letter).to_string(),
        None => format!("{fallback}{index}"),
    }
}

/// Name of an unnamed parameter in a generated signature
pub fn positional_param(index: usize) -> String {
    format!("arg{index}")
}

/// Name of a result in generated code that destructures a return value
pub fn positional_result(index: usize) -> String {
    format!("r{index}")
}

/// Name of the `index`-th argument of an `expect_returns_equal`-style assertion
pub fn expected_name(index: usize) -> String {
    format!("expected{index}")
}

/// Make `candidate` distinct from every name in `taken`
///
/// A clash first falls back to `arg<index>` and then gains trailing
/// underscores until it is free.
pub fn disambiguate(candidate: &str, index: usize, taken: &[String]) -> String {
    if !taken.iter().any(|name| name == candidate) {
        return candidate.to_string();
    }
    let mut name = positional_param(index);
    while taken.iter().any(|existing| *existing == name) {
        name.push('_');
    }
    name
}

/// `snake_case` or `r#raw` identifier to `UpperCamelCase`
pub fn upper_camel(name: &str) -> String {
    let name = name.strip_prefix("r#").unwrap_or(name);
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for ch in name.chars() {
        if ch == '_' {
            upper = true;
            continue;
        }
        if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// `UpperCamelCase` to `snake_case`
pub fn snake_case(name: &str) -> String {
    let name = name.strip_prefix("r#").unwrap_or(name);
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|next| next.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(*ch);
        }
    }
    out
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod naming_tests;
