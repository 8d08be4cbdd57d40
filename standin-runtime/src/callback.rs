//! Callback round trips between a test and the code under test
//!
//! A callback argument cannot leave the thread it was passed on, so the
//! side that holds it serves invocation requests while waiting for its own
//! response. The other side sends a request and blocks on the callback's
//! outcome.

use crate::exchange::Pending;
use crate::panic::{describe_payload, panic_matches, PanicPayload};
use crate::reporter::SharedReporter;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Select, Sender, TryRecvError};
use std::any::Any;
use std::fmt::Debug;
use std::time::Duration;

/// A rendezvous channel for invocations of one callback
pub fn callback_channel<Req>() -> (CallbackInvoker<Req>, CallbackRequests<Req>) {
    let (tx, rx) = bounded(0);
    (CallbackInvoker { tx }, CallbackRequests { rx })
}

/// Side that asks for the callback to run
#[derive(Debug)]
pub struct CallbackInvoker<Req> {
    tx: Sender<Req>,
}

impl<Req> Clone for CallbackInvoker<Req> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<Req> CallbackInvoker<Req> {
    /// Send an invocation request, blocking until it is picked up
    ///
    /// # Panics
    ///
    /// If nobody serves the callback any more: the call that received it has
    /// already returned.
    pub fn invoke(&self, request: Req) {
        if self.tx.send(request).is_err() {
            panic!("callback invoked after the call that received it returned");
        }
    }
}

/// Side that receives invocation requests
#[derive(Debug)]
pub struct CallbackRequests<Req> {
    rx: Receiver<Req>,
}

impl<Req> CallbackRequests<Req> {
    /// Next request, waiting at most `timeout`
    pub fn next(&self, timeout: Duration) -> Option<Req> {
        match self.rx.recv_timeout(timeout) {
            Ok(request) => Some(request),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Result of trying to serve one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// A request was handled
    Handled,
    /// Nothing was waiting
    Empty,
    /// Every invoker is gone
    Closed,
}

/// Something [`wait_serving`] can multiplex
pub trait Serve {
    /// Register the request receiver and return its operation index
    fn register<'a>(&'a self, select: &mut Select<'a>) -> usize;

    /// Handle one request if one is waiting
    fn try_serve(&mut self) -> Served;
}

/// Runs a local callback for every request that arrives
pub struct CallbackServer<'f, Req> {
    requests: CallbackRequests<Req>,
    handler: Box<dyn FnMut(Req) + 'f>,
}

impl<'f, Req> CallbackServer<'f, Req> {
    /// Serve `requests` with `handler`
    pub fn new(requests: CallbackRequests<Req>, handler: impl FnMut(Req) + 'f) -> Self {
        Self {
            requests,
            handler: Box::new(handler),
        }
    }
}

impl<Req> Serve for CallbackServer<'_, Req> {
    fn register<'a>(&'a self, select: &mut Select<'a>) -> usize {
        select.recv(&self.requests.rx)
    }

    fn try_serve(&mut self) -> Served {
        match self.requests.rx.try_recv() {
            Ok(request) => {
                (self.handler)(request);
                Served::Handled
            }
            Err(TryRecvError::Empty) => Served::Empty,
            Err(TryRecvError::Disconnected) => Served::Closed,
        }
    }
}

/// Wait for `pending`, serving callback requests until it is filled
pub fn wait_serving<R>(pending: Pending<R>, servers: &mut [&mut dyn Serve]) -> R {
    let mut closed = vec![false; servers.len()];
    loop {
        let ready = {
            let mut select = Select::new();
            let response = select.recv(pending.receiver());
            let operations: Vec<(usize, usize)> = servers
                .iter()
                .enumerate()
                .filter(|(index, _)| !closed[*index])
                .map(|(index, server)| (server.register(&mut select), index))
                .collect();
            let ready = select.ready();
            if ready == response {
                None
            } else {
                operations
                    .iter()
                    .find(|(operation, _)| *operation == ready)
                    .map(|(_, index)| *index)
            }
        };
        match ready {
            None => match pending.receiver().try_recv() {
                Ok(value) => return value,
                Err(TryRecvError::Empty) => continue,
                Err(TryRecvError::Disconnected) => return pending.wait(),
            },
            Some(index) => {
                if servers[index].try_serve() == Served::Closed {
                    closed[index] = true;
                }
            }
        }
    }
}

/// Outcome of one callback invocation, as seen by the test that asked for it
pub struct CallbackResult<R> {
    name: &'static str,
    outcome: Result<R, PanicPayload>,
    reporter: SharedReporter,
}

impl<R> CallbackResult<R> {
    /// Wrap the outcome of invoking callback `name`
    pub fn new(name: &'static str, outcome: Result<R, PanicPayload>, reporter: SharedReporter) -> Self {
        Self {
            name,
            outcome,
            reporter,
        }
    }

    /// What the callback returned, if it returned
    pub fn returned(&self) -> Option<&R> {
        self.outcome.as_ref().ok()
    }

    /// The raw outcome
    pub fn outcome(&self) -> &Result<R, PanicPayload> {
        &self.outcome
    }

    /// Report an error unless the callback returned a value `accept` takes
    ///
    /// `expected` describes the accepted values for the failure message and
    /// is only rendered on failure.
    pub fn check_returned(
        &self,
        accept: impl FnOnce(&R) -> bool,
        expected: impl FnOnce() -> String,
        actual: impl FnOnce(&R) -> String,
    ) {
        match &self.outcome {
            Ok(value) if accept(value) => {}
            Ok(value) => self.reporter.error(format!(
                "callback `{}` returned {}, expected {}",
                self.name,
                actual(value),
                expected()
            )),
            Err(payload) => self.reporter.error(format!(
                "callback `{}` panicked with {}, expected it to return {}",
                self.name,
                describe_payload(payload),
                expected()
            )),
        }
    }

    /// Report an error unless the callback panicked with `expected`
    pub fn expect_panic_with<P: Any + PartialEq + Debug>(&self, expected: P) {
        match &self.outcome {
            Err(payload) if panic_matches(payload, &expected) => {}
            Err(payload) => self.reporter.error(format!(
                "callback `{}` panicked with {}, expected {:?}",
                self.name,
                describe_payload(payload),
                expected
            )),
            Ok(_) => self.reporter.error(format!(
                "callback `{}` returned, expected a panic with {:?}",
                self.name, expected
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{exchange, Responder};
    use crate::panic::catch;
    use crate::reporter::RecordingReporter;
    use std::thread;

    struct Request {
        value: u32,
        responder: Responder<Result<u32, PanicPayload>>,
    }

    #[test]
    fn test_requests_are_served_while_waiting() {
        let (invoker, requests) = callback_channel::<Request>();
        let (responder, pending) = exchange::<&'static str>();

        let remote = thread::spawn(move || {
            let mut doubled = Vec::new();
            for value in [1, 2] {
                let (reply, answer) = exchange();
                invoker.invoke(Request { value, responder: reply });
                doubled.push(answer.wait().unwrap());
            }
            responder.respond("done");
            doubled
        });

        let mut seen = Vec::new();
        let mut server = CallbackServer::new(requests, |request: Request| {
            seen.push(request.value);
            request.responder.respond(catch(|| request.value * 2));
        });
        let response = wait_serving(pending, &mut [&mut server]);
        drop(server);

        assert_eq!(response, "done");
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(remote.join().unwrap(), vec![2, 4]);
    }

    #[test]
    fn test_callback_result_reports_mismatches() {
        let reporter = RecordingReporter::new();
        let returned = CallbackResult::new("visit", Ok(3u32), reporter.clone());
        returned.check_returned(|v| *v == 3, || "3".to_string(), |v| v.to_string());
        assert!(reporter.errors().is_empty());
        returned.check_returned(|v| *v == 4, || "4".to_string(), |v| v.to_string());
        returned.expect_panic_with("boom");
        assert_eq!(reporter.errors().len(), 2);
        assert!(reporter.errors()[0].contains("returned 3, expected 4"));

        let panicked = CallbackResult::<u32>::new(
            "visit",
            catch(|| panic!("boom")),
            reporter.clone(),
        );
        panicked.expect_panic_with("boom");
        assert_eq!(reporter.errors().len(), 2);
    }
}
