//! Ordered emission and rendering of one artifact
//!
//! Generators push token trees tagged with a [`Section`]; rendering sorts
//! them by section (stable within a section), parses the whole unit back
//! with `syn` and prints it with `prettyplease`. A unit that fails to parse
//! is an assembly error and nothing is returned.

use crate::error::{GenerateError, Result};
use proc_macro2::TokenStream;
use quote::quote;
use tracing::trace;

/// Fixed order in which artifact items are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    /// `use` declarations
    Imports,
    /// The double, the wrapper, or the synthesized methods trait
    Primary,
    /// Call, response, request and returns records
    Records,
    /// Contract and record implementations
    Implementations,
    /// The call union
    Unions,
    /// Expectation builders and per-method wrappers
    Builders,
    /// Constructors and accessors
    Constructor,
}

/// An artifact under construction
#[derive(Debug)]
pub struct Artifact {
    subject: String,
    header: Option<String>,
    items: Vec<(Section, TokenStream)>,
}

impl Artifact {
    /// Start an artifact for `subject`; `header` is printed verbatim above the code
    pub fn new(subject: impl Into<String>, header: Option<String>) -> Self {
        Self {
            subject: subject.into(),
            header,
            items: Vec::new(),
        }
    }

    /// Append an item to a section
    pub fn push(&mut self, section: Section, tokens: TokenStream) {
        trace!("Emitting {:?} item for `{}`", section, self.subject);
        self.items.push((section, tokens));
    }

    /// Number of items pushed so far
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing was pushed
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parse, format and return the finished source text
    pub fn render(mut self) -> Result<String> {
        self.items.sort_by_key(|(section, _)| *section);
        let items = self.items.iter().map(|(_, tokens)| tokens);
        let tokens = quote! {
            #![allow(
                dead_code,
                unused_imports,
                unused_mut,
                unused_unsafe,
                unused_variables,
                non_snake_case,
                unreachable_patterns,
                clippy::all
            )]
            #(#items)*
        };
        let file: syn::File = syn::parse2(tokens).map_err(|err| GenerateError::Assembly {
            subject: self.subject.clone(),
            message: err.to_string(),
        })?;
        let body = prettyplease::unparse(&file);
        Ok(match self.header {
            Some(header) => format!("{header}\n\n{body}"),
            None => body,
        })
    }
}
