//! Where expectation failures go

use parking_lot::Mutex;
use std::sync::Arc;

/// Receives expectation failures
///
/// `error` records a failure and lets the test continue. `fatal` ends the
/// current test immediately.
pub trait Reporter: Send + Sync {
    /// Record a non-fatal failure
    fn error(&self, message: String);

    /// Record a failure and stop
    fn fatal(&self, message: String) -> !;
}

/// Shared handle to a reporter
pub type SharedReporter = Arc<dyn Reporter>;

/// Default reporter: collects errors and fails the test when dropped
#[derive(Default)]
pub struct PanicReporter {
    errors: Mutex<Vec<String>>,
}

impl PanicReporter {
    /// A fresh reporter behind a shared handle
    pub fn shared() -> SharedReporter {
        Arc::new(Self::default())
    }
}

impl Reporter for PanicReporter {
    fn error(&self, message: String) {
        tracing::debug!("expectation failed: {}", message);
        self.errors.lock().push(message);
    }

    fn fatal(&self, message: String) -> ! {
        let mut errors = std::mem::take(&mut *self.errors.lock());
        errors.push(message);
        panic!("{}", errors.join("\n"))
    }
}

impl Drop for PanicReporter {
    fn drop(&mut self) {
        let errors = std::mem::take(self.errors.get_mut());
        if !errors.is_empty() && !std::thread::panicking() {
            panic!("{}", errors.join("\n"));
        }
    }
}

/// Payload `RecordingReporter::fatal` unwinds with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fatal(pub String);

/// Reporter that only records, for inspecting failures in tests
#[derive(Default)]
pub struct RecordingReporter {
    errors: Mutex<Vec<String>>,
    fatal: Mutex<Option<String>>,
}

impl RecordingReporter {
    /// A fresh recorder
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Non-fatal failures so far
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    /// The fatal failure, if one happened
    pub fn fatal_message(&self) -> Option<String> {
        self.fatal.lock().clone()
    }
}

impl Reporter for RecordingReporter {
    fn error(&self, message: String) {
        self.errors.lock().push(message);
    }

    fn fatal(&self, message: String) -> ! {
        *self.fatal.lock() = Some(message.clone());
        std::panic::resume_unwind(Box::new(Fatal(message)))
    }
}
