//! An implementation of [`Queue`] that blocks `pop` until a value arrives

use crate::queue::Queue;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct BlockingQueue {
    values: Mutex<VecDeque<u32>>,
    ready: Condvar,
}

impl Queue for BlockingQueue {
    fn push(&self, value: u32) {
        self.values.lock().push_back(value);
        self.ready.notify_one();
    }

    fn pop(&self) -> u32 {
        let mut values = self.values.lock();
        loop {
            if let Some(value) = values.pop_front() {
                return value;
            }
            self.ready.wait(&mut values);
        }
    }
}
