//! A struct whose inherent methods form the contract

#[derive(Debug, Default)]
pub struct Counter {
    total: u32,
}

impl Counter {
    pub fn get(&self) -> u32 {
        self.total
    }

    pub fn add(&mut self, n: u32) {
        self.total += n;
    }
}
