//! Rendering and structural comparison of values that may not be `Debug`
//!
//! Generated code cannot know whether a user type implements `Debug`, so
//! [`show!`](crate::show) and [`deep_equal!`](crate::deep_equal) pick an
//! implementation by method-resolution priority: the `Debug` path when the
//! bound holds, an opaque fallback otherwise.

use std::fmt::Debug;

/// Borrowed value awaiting rendering
pub struct Shown<'a, T: ?Sized>(pub &'a T);

/// Rendering for `Debug` values
pub trait ShowDebug {
    /// Text for failure messages
    fn show(&self) -> String;
    /// Debug rendering, used for structural comparison
    fn debug_repr(&self) -> Option<String>;
}

/// Rendering for everything else
pub trait ShowOpaque {
    /// Text for failure messages
    fn show(&self) -> String;
    /// Always `None`
    fn debug_repr(&self) -> Option<String>;
}

impl<T: ?Sized + Debug> ShowDebug for Shown<'_, T> {
    fn show(&self) -> String {
        format!("{:?}", self.0)
    }

    fn debug_repr(&self) -> Option<String> {
        Some(format!("{:#?}", self.0))
    }
}

impl<T: ?Sized> ShowOpaque for &Shown<'_, T> {
    fn show(&self) -> String {
        format!("<{}>", std::any::type_name::<T>())
    }

    fn debug_repr(&self) -> Option<String> {
        None
    }
}

/// Render a value with `Debug` when it has it, or its type name otherwise
#[macro_export]
macro_rules! show {
    ($value:expr) => {{
        #[allow(unused_imports)]
        use $crate::{ShowDebug as _, ShowOpaque as _};
        (&$crate::Shown(&$value)).show()
    }};
}

/// Structural equality for values without `PartialEq`
///
/// Compares the pretty `Debug` renderings. Values that are not `Debug`
/// never compare equal.
#[macro_export]
macro_rules! deep_equal {
    ($left:expr, $right:expr) => {{
        #[allow(unused_imports)]
        use $crate::{ShowDebug as _, ShowOpaque as _};
        match (
            (&$crate::Shown(&$left)).debug_repr(),
            (&$crate::Shown(&$right)).debug_repr(),
        ) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }};
}

#[cfg(test)]
mod tests {
    #[derive(Debug)]
    struct Point {
        x: i32,
        y: Vec<u8>,
    }

    struct Opaque;

    #[test]
    fn test_show_prefers_debug() {
        assert_eq!(crate::show!(Point { x: 1, y: vec![2] }), "Point { x: 1, y: [2] }");
        assert!(crate::show!(Opaque).contains("Opaque"));
    }

    #[test]
    fn test_deep_equal() {
        let a = Point { x: 1, y: vec![2, 3] };
        let b = Point { x: 1, y: vec![2, 3] };
        let c = Point { x: 1, y: vec![3] };
        assert!(crate::deep_equal!(a, b));
        assert!(!crate::deep_equal!(a, c));
        assert!(!crate::deep_equal!(Opaque, Opaque));
    }
}
