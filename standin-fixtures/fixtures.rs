//! Subjects the generator runs on when this crate builds
//!
//! Shared by `build.rs`, which writes one module per fixture into
//! `OUT_DIR`, and by the golden test, which regenerates them.

use standin_codegen::{GenerateError, Generator};
use standin_core::{GenerationRequest, Mode};
use standin_resolver::{DeriveTypeInfo, MemoryLoader, ResolutionContext, ResolveError};

/// One generated module
pub struct Fixture {
    /// Module name under `generated`, also the file stem in `OUT_DIR`
    pub module: &'static str,
    /// Module of this crate declaring the target
    pub source: &'static str,
    /// Declaration to generate for
    pub target: &'static str,
    pub mode: Mode,
}

pub const FIXTURES: &[Fixture] = &[
    Fixture {
        module: "add_double",
        source: "math",
        target: "add",
        mode: Mode::Dependency,
    },
    Fixture {
        module: "divide_target",
        source: "math",
        target: "divide",
        mode: Mode::Target,
    },
    Fixture {
        module: "greeter_double",
        source: "greeter",
        target: "Greeter",
        mode: Mode::Dependency,
    },
    Fixture {
        module: "walker_double",
        source: "walker",
        target: "Walker",
        mode: Mode::Dependency,
    },
    Fixture {
        module: "counter_double",
        source: "counter",
        target: "Counter",
        mode: Mode::Dependency,
    },
    Fixture {
        module: "queue_target",
        source: "queue",
        target: "Queue",
        mode: Mode::Target,
    },
];

impl Fixture {
    /// Path of the source file, relative to the crate root
    pub fn source_file(&self) -> String {
        format!("src/{}.rs", self.source)
    }

    /// Generate this fixture from `source`, the text of its source file
    pub fn generate(&self, source: &str) -> Result<String, GenerateError> {
        let loader = MemoryLoader::new().with_local(&format!("crate::{}", self.source), source)?;
        let type_info = DeriveTypeInfo::new(&loader);
        let request = GenerationRequest::new(self.target)
            .map_err(ResolveError::from)?
            .with_mode(self.mode);
        Generator::new(ResolutionContext {
            loader: &loader,
            type_info: &type_info,
        })
        .generate_request(&request)
    }
}
