//! Abnormal-termination payloads

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// What a panic carries when it unwinds
pub type PanicPayload = Box<dyn Any + Send>;

/// Run `f`, capturing an unwinding panic as its payload
pub fn catch<R>(f: impl FnOnce() -> R) -> Result<R, PanicPayload> {
    panic::catch_unwind(AssertUnwindSafe(f))
}

/// Box a value so it can be re-raised with `resume_unwind`
pub fn payload(value: impl Any + Send) -> PanicPayload {
    Box::new(value)
}

/// The message of a `panic!("...")`-style payload
pub fn panic_text(payload: &PanicPayload) -> Option<&str> {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}

/// Whether `payload` equals `expected`
///
/// A payload of the same type is compared with `==`. Textual payloads and
/// textual expectations compare by content whichever of `&str` and `String`
/// each side happens to be.
pub fn panic_matches<P: Any + PartialEq>(payload: &PanicPayload, expected: &P) -> bool {
    if let Some(actual) = payload.downcast_ref::<P>() {
        return actual == expected;
    }
    let expected: &dyn Any = expected;
    let expected_text = expected
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| expected.downcast_ref::<String>().map(String::as_str));
    match (expected_text, panic_text(payload)) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => false,
    }
}

/// Render a payload for a failure message
pub fn describe_payload(payload: &PanicPayload) -> String {
    match panic_text(payload) {
        Some(text) => format!("{text:?}"),
        None => "<non-textual panic payload>".to_string(),
    }
}
