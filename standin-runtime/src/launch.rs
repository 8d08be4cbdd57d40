//! Running a target on its own thread

use crate::callback::{Serve, Served};
use crate::panic::{catch, describe_payload, PanicPayload};
use crossbeam::channel::{bounded, Receiver, Select, TryRecvError};
use std::thread;
use tracing::{debug, warn};

/// How a launched target finished
#[derive(Debug)]
pub enum Outcome<R> {
    /// It returned normally
    Returned(R),
    /// It panicked with this payload
    Panicked(PanicPayload),
}

impl<R> Outcome<R> {
    /// The returned value, if it returned
    pub fn returned(&self) -> Option<&R> {
        match self {
            Outcome::Returned(value) => Some(value),
            Outcome::Panicked(_) => None,
        }
    }

    /// Short description for failure messages
    pub fn describe(&self) -> String {
        match self {
            Outcome::Returned(_) => "returned".to_string(),
            Outcome::Panicked(payload) => format!("panicked with {}", describe_payload(payload)),
        }
    }
}

/// Handle on a launched target
///
/// Exactly one of the two completion channels ever carries a value. The
/// outcome is memoized on the first wait.
#[derive(Debug)]
pub struct Completion<R> {
    returned: Receiver<R>,
    panicked: Receiver<PanicPayload>,
    outcome: Option<Outcome<R>>,
}

/// Run `job` on a fresh thread
///
/// Never blocks the caller. A panic in `job` is captured as the outcome
/// instead of tearing down the test.
pub fn launch<R: Send + 'static>(job: impl FnOnce() -> R + Send + 'static) -> Completion<R> {
    let (returned_tx, returned) = bounded(1);
    let (panicked_tx, panicked) = bounded(1);
    let spawned = thread::Builder::new()
        .name("standin-target".to_string())
        .spawn(move || match catch(job) {
            Ok(value) => {
                let _ = returned_tx.send(value);
            }
            Err(payload) => {
                let _ = panicked_tx.send(payload);
            }
        });
    let outcome = match spawned {
        Ok(_) => None,
        Err(err) => {
            warn!("Failed to spawn target thread: {}", err);
            Some(Outcome::Panicked(Box::new(format!(
                "failed to spawn target thread: {err}"
            ))))
        }
    };
    Completion {
        returned,
        panicked,
        outcome,
    }
}

impl<R> Completion<R> {
    /// Whether the outcome is known without blocking
    pub fn is_done(&mut self) -> bool {
        if self.outcome.is_none() {
            self.outcome = self.poll();
        }
        self.outcome.is_some()
    }

    /// Block until the target finishes
    pub fn wait(&mut self) -> &Outcome<R> {
        let outcome = match self.outcome.take() {
            Some(outcome) => outcome,
            None => self.receive(),
        };
        self.outcome.insert(outcome)
    }

    /// Block until the target finishes, serving callback requests meanwhile
    pub fn wait_serving(&mut self, servers: &mut [&mut dyn Serve]) -> &Outcome<R> {
        let mut closed = vec![false; servers.len()];
        while self.outcome.is_none() {
            let ready = {
                let mut select = Select::new();
                let returned = select.recv(&self.returned);
                let panicked = select.recv(&self.panicked);
                let operations: Vec<(usize, usize)> = servers
                    .iter()
                    .enumerate()
                    .filter(|(index, _)| !closed[*index])
                    .map(|(index, server)| (server.register(&mut select), index))
                    .collect();
                let ready = select.ready();
                if ready == returned || ready == panicked {
                    None
                } else {
                    operations
                        .iter()
                        .find(|(operation, _)| *operation == ready)
                        .map(|(_, index)| *index)
                }
            };
            match ready {
                None => self.outcome = self.poll(),
                Some(index) => {
                    if servers[index].try_serve() == Served::Closed {
                        closed[index] = true;
                    }
                }
            }
        }
        self.wait()
    }

    /// Consume the handle, blocking for the outcome
    pub fn into_outcome(mut self) -> Outcome<R> {
        match self.outcome.take() {
            Some(outcome) => outcome,
            None => self.receive(),
        }
    }

    fn poll(&self) -> Option<Outcome<R>> {
        match self.returned.try_recv() {
            Ok(value) => return Some(Outcome::Returned(value)),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {}
        }
        match self.panicked.try_recv() {
            Ok(payload) => Some(Outcome::Panicked(payload)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if self.returned.is_empty() {
                    Some(lost())
                } else {
                    None
                }
            }
        }
    }

    fn receive(&self) -> Outcome<R> {
        let mut select = Select::new();
        let returned = select.recv(&self.returned);
        select.recv(&self.panicked);
        let operation = select.select();
        let outcome = if operation.index() == returned {
            match operation.recv(&self.returned) {
                Ok(value) => Outcome::Returned(value),
                Err(_) => match self.panicked.recv() {
                    Ok(payload) => Outcome::Panicked(payload),
                    Err(_) => lost(),
                },
            }
        } else {
            match operation.recv(&self.panicked) {
                Ok(payload) => Outcome::Panicked(payload),
                Err(_) => match self.returned.recv() {
                    Ok(value) => Outcome::Returned(value),
                    Err(_) => lost(),
                },
            }
        };
        debug!("Target {}", outcome.describe());
        outcome
    }
}

fn lost<R>() -> Outcome<R> {
    Outcome::Panicked(Box::new("target thread ended without an outcome"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panic::panic_text;

    #[test]
    fn test_returned_outcome_is_memoized() {
        let mut completion = launch(|| 40 + 2);
        assert_eq!(completion.wait().returned(), Some(&42));
        assert!(completion.is_done());
        assert_eq!(completion.wait().returned(), Some(&42));
    }

    #[test]
    fn test_panic_is_captured() {
        let completion = launch(|| -> u8 { panic!("boom") });
        match completion.into_outcome() {
            Outcome::Panicked(payload) => assert_eq!(panic_text(&payload), Some("boom")),
            Outcome::Returned(value) => panic!("unexpected return {value}"),
        }
    }
}
