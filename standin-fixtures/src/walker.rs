//! A contract taking a callback

pub trait Walker {
    /// Walk from `root`, calling `visit` on each entry; returns how many were kept
    fn walk(&self, root: &str, visit: &mut dyn FnMut(&str) -> bool) -> usize;
}
