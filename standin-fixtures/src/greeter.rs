//! A contract embedding another

pub trait Named {
    fn name(&self) -> String;
}

pub trait Greeter: Named {
    fn greet(&self, who: &str) -> String;
}

/// Greets everyone in order, introducing itself first
pub fn introduce(greeter: &dyn Greeter, guests: &[&str]) -> Vec<String> {
    let mut lines = vec![greeter.name()];
    lines.extend(guests.iter().map(|guest| greeter.greet(guest)));
    lines
}
