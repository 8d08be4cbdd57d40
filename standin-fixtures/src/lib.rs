//! Standin Fixtures
//!
//! Small subjects compiled together with the doubles and wrappers standin
//! generates for them. `build.rs` runs the generator over each fixture and
//! the artifacts land in [`generated`], one module per fixture.

pub mod blocking;
pub mod counter;
pub mod greeter;
pub mod math;
pub mod queue;
pub mod walker;

/// Generated artifacts, regenerated on every build
pub mod generated {
    include!(concat!(env!("OUT_DIR"), "/mods.rs"));
}
