//! A contract whose methods cooperate through shared state

pub trait Queue {
    /// Append `value`
    fn push(&self, value: u32);

    /// Remove the oldest value, waiting for one if the queue is empty
    fn pop(&self) -> u32;
}
