//! Call queue shared by a dependency double and its test
//!
//! Every call made on a double is sent to the controller as one record of
//! the double's call union. Tests pull records back out by method and, when
//! they constrain arguments, by predicate. Records that are skipped stay
//! queued in arrival order for later expectations.

use crate::reporter::SharedReporter;
use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::trace;

/// Per-method timeout applied when an expectation sets none
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// A record of the call union
pub trait MethodCall: Send + 'static {
    /// Name of the intercepted method
    fn method_name(&self) -> &'static str;
}

/// Sending half held by the double's implementation
#[derive(Debug)]
pub struct CallSender<C> {
    tx: Sender<C>,
}

impl<C> Clone for CallSender<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<C: MethodCall> CallSender<C> {
    /// Hand a call to the controller
    ///
    /// # Panics
    ///
    /// If the controller is gone, which means the test that owned it ended.
    pub fn send(&self, call: C) {
        let method = call.method_name();
        trace!("intercepted call to `{}`", method);
        if self.tx.send(call).is_err() {
            panic!("call to `{method}` arrived after its double was dropped");
        }
    }
}

/// Receiving half, owned by the double
pub struct Controller<C> {
    tx: Sender<C>,
    rx: Receiver<C>,
    skipped: Mutex<VecDeque<C>>,
    reporter: SharedReporter,
    timeout: Duration,
}

impl<C: MethodCall> Controller<C> {
    /// Controller reporting to `reporter`, waiting `timeout` per expectation
    pub fn new(reporter: SharedReporter, timeout: Duration) -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            skipped: Mutex::new(VecDeque::new()),
            reporter,
            timeout,
        }
    }

    /// A new sending half
    pub fn sender(&self) -> CallSender<C> {
        CallSender {
            tx: self.tx.clone(),
        }
    }

    /// Where failures go
    pub fn reporter(&self) -> &SharedReporter {
        &self.reporter
    }

    /// Replace the reporter
    pub fn set_reporter(&mut self, reporter: SharedReporter) {
        self.reporter = reporter;
    }

    /// Default per-expectation timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace the default timeout
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Number of calls received but not yet claimed
    pub fn unclaimed(&self) -> usize {
        self.skipped.lock().len() + self.rx.len()
    }

    /// Claim the oldest call to `method` that `take` accepts
    ///
    /// `take` hands a rejected record back as `Err`. Waits up to `timeout`
    /// for new calls, then reports a fatal failure naming `description`.
    pub fn next_matching<T>(
        &self,
        method: &'static str,
        description: &str,
        timeout: Duration,
        mut take: impl FnMut(C) -> Result<T, C>,
    ) -> T {
        {
            let mut skipped = self.skipped.lock();
            let mut index = 0;
            while index < skipped.len() {
                if skipped[index].method_name() == method {
                    if let Some(call) = skipped.remove(index) {
                        match take(call) {
                            Ok(found) => return found,
                            Err(call) => skipped.insert(index, call),
                        }
                    }
                }
                index += 1;
            }
        }

        let deadline = Instant::now() + timeout;
        loop {
            match self.rx.recv_deadline(deadline) {
                Ok(call) if call.method_name() == method => match take(call) {
                    Ok(found) => return found,
                    Err(call) => self.skipped.lock().push_back(call),
                },
                Ok(call) => self.skipped.lock().push_back(call),
                Err(_) => self.reporter.fatal(format!(
                    "timed out after {:?} waiting for {}",
                    timeout, description
                )),
            }
        }
    }
}
