//! Standin Runtime
//!
//! Support code for the doubles and target wrappers standin generates.
//! Generated artifacts import this crate as `_standin` and build on:
//! - **Controller**: the call queue between a double and its test
//! - **Exchange**: single-use response slots that block the caller
//! - **Callbacks**: request/response round trips for callback arguments
//! - **Launch**: running a target on its own thread with a memoized outcome
//! - **Matchers**, **reporters** and panic-payload helpers for expectations

#![warn(missing_docs)]

pub mod callback;
pub mod controller;
pub mod exchange;
pub mod launch;
pub mod matcher;
pub mod panic;
pub mod reporter;
#[doc(hidden)]
pub mod show;

pub use callback::{
    callback_channel, wait_serving, CallbackInvoker, CallbackRequests, CallbackResult,
    CallbackServer, Serve, Served,
};
pub use controller::{CallSender, Controller, MethodCall, DEFAULT_TIMEOUT};
pub use exchange::{exchange, Pending, Responder};
pub use launch::{launch, Completion, Outcome};
pub use matcher::{any, eq, satisfies, Anything, Equals, Matcher, Satisfies};
pub use panic::{catch, describe_payload, panic_matches, panic_text, payload, PanicPayload};
pub use reporter::{Fatal, PanicReporter, RecordingReporter, Reporter, SharedReporter};
#[doc(hidden)]
pub use show::{ShowDebug, ShowOpaque, Shown};

pub use parking_lot::RwLock;
pub use std::sync::Arc;
pub use std::time::Duration;
