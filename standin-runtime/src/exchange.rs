//! Single-use response slots

use crossbeam::channel::{bounded, Receiver, Sender};

/// Create a response slot: the responder fills it once, the pending side
/// blocks until it is filled
pub fn exchange<R>() -> (Responder<R>, Pending<R>) {
    let (tx, rx) = bounded(1);
    (Responder { tx }, Pending { rx })
}

/// Write side of a response slot
///
/// Responding consumes the responder, so a slot is filled at most once.
#[derive(Debug)]
pub struct Responder<R> {
    tx: Sender<R>,
}

impl<R> Responder<R> {
    /// Fill the slot
    ///
    /// A response nobody waits for any more is dropped.
    pub fn respond(self, value: R) {
        if self.tx.send(value).is_err() {
            tracing::trace!("response dropped: nobody is waiting");
        }
    }
}

/// Read side of a response slot
#[derive(Debug)]
pub struct Pending<R> {
    rx: Receiver<R>,
}

impl<R> Pending<R> {
    /// Block until the slot is filled
    ///
    /// # Panics
    ///
    /// If the responder is dropped without responding, for instance when a
    /// test discards an intercepted call without injecting anything.
    pub fn wait(self) -> R {
        match self.rx.recv() {
            Ok(value) => value,
            Err(_) => panic!("intercepted call was dropped without a response"),
        }
    }

    /// Take the response if it is already there
    pub fn try_take(&self) -> Option<R> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn receiver(&self) -> &Receiver<R> {
        &self.rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panic::{catch, panic_text};

    #[test]
    fn test_response_crosses_threads() {
        let (responder, pending) = exchange();
        std::thread::spawn(move || responder.respond(7u8));
        assert_eq!(pending.wait(), 7);
    }

    #[test]
    fn test_dropped_responder_panics_the_waiter() {
        let (responder, pending) = exchange::<u8>();
        assert_eq!(pending.try_take(), None);
        drop(responder);
        let caught = catch(move || pending.wait()).unwrap_err();
        assert!(panic_text(&caught).unwrap().contains("without a response"));
    }
}
