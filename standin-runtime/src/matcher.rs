//! Argument and result predicates

use std::fmt::Debug;

/// Decides whether a value is acceptable
pub trait Matcher<T: ?Sized> {
    /// Whether `value` is accepted
    fn matches(&self, value: &T) -> bool;

    /// What is accepted, for failure messages
    fn describe(&self) -> String;
}

/// Accepts anything
#[derive(Debug, Clone, Copy, Default)]
pub struct Anything;

impl<T: ?Sized> Matcher<T> for Anything {
    fn matches(&self, _: &T) -> bool {
        true
    }

    fn describe(&self) -> String {
        "anything".to_string()
    }
}

/// Accepts anything
pub fn any() -> Anything {
    Anything
}

/// Accepts values equal to the one it holds
#[derive(Debug, Clone)]
pub struct Equals<T>(T);

impl<T: PartialEq + Debug> Matcher<T> for Equals<T> {
    fn matches(&self, value: &T) -> bool {
        *value == self.0
    }

    fn describe(&self) -> String {
        format!("{:?}", self.0)
    }
}

/// Accepts values equal to `expected`
pub fn eq<T: PartialEq + Debug>(expected: T) -> Equals<T> {
    Equals(expected)
}

/// Accepts values a predicate accepts
pub struct Satisfies<F> {
    description: String,
    predicate: F,
}

impl<T: ?Sized, F: Fn(&T) -> bool> Matcher<T> for Satisfies<F> {
    fn matches(&self, value: &T) -> bool {
        (self.predicate)(value)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Accepts values `predicate` accepts; `description` names them
pub fn satisfies<T: ?Sized, F: Fn(&T) -> bool>(
    description: impl Into<String>,
    predicate: F,
) -> Satisfies<F> {
    Satisfies {
        description: description.into(),
        predicate,
    }
}
