//! Free functions

/// Sum of `a` and `b`
pub fn add(a: i32, b: i32) -> i32 {
    a + b
}

/// Quotient and remainder of `a / b`
pub fn divide(a: i32, b: i32) -> (i32, i32) {
    if b == 0 {
        panic!("division by zero");
    }
    (a / b, a % b)
}
