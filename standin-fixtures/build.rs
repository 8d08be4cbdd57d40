use anyhow::Context;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::{env, fs};

#[path = "fixtures.rs"]
mod fixtures;

use fixtures::FIXTURES;

fn main() -> anyhow::Result<()> {
    println!("cargo:rerun-if-changed=fixtures.rs");
    let out_dir = PathBuf::from(env::var("OUT_DIR").context("OUT_DIR is not set")?);

    let mut mods = String::new();
    for fixture in FIXTURES {
        let source_file = fixture.source_file();
        println!("cargo:rerun-if-changed={source_file}");
        let source = fs::read_to_string(&source_file)
            .with_context(|| format!("Failed to read {source_file}"))?;
        let text = fixture
            .generate(&source)
            .with_context(|| format!("Failed to generate `{}`", fixture.module))?;

        let artifact = out_dir.join(format!("{}.rs", fixture.module));
        fs::write(&artifact, text)
            .with_context(|| format!("Failed to write {}", artifact.display()))?;
        writeln!(
            mods,
            "#[path = {:?}]\npub mod {};",
            artifact.display().to_string(),
            fixture.module
        )?;
    }
    fs::write(out_dir.join("mods.rs"), mods).context("Failed to write mods.rs")?;
    Ok(())
}
