//! Compiles `assets/` into the demo bundle served by `serveb`

use std::env;
use std::path::PathBuf;

use bundle::{Generator, GeneratorOptions, SourceOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let assets = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?).join("assets");
    let output = PathBuf::from(env::var("OUT_DIR")?).join("demo_bundle.rs");

    println!("cargo:rerun-if-changed={}", assets.display());

    let generator = Generator::new(GeneratorOptions {
        output: Some(output),
        source: SourceOptions {
            bundle_name: "DEMO_BUNDLE".to_string(),
            index_name: "demo_index".to_string(),
            // Keep the generated file reproducible
            timestamp: false,
            ..SourceOptions::default()
        },
        always: true,
        ..GeneratorOptions::default()
    })?;
    generator.run(&assets)?;
    Ok(())
}
