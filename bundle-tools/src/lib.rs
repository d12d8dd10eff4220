//! # Bundle Tools
//!
//! Binaries around the `bundle` crate:
//!
//! - **mkbundle**: turns a file or directory into Rust source declaring a
//!   static entry table (`tools/mkbundle.rs`)
//! - **serveb**: serves the entries of a bundle over HTTP, streaming each one
//!   through the decode chain (`src/main.rs`)
//!
//! The library half holds what both share with the tests: configuration,
//! the axum router and the compiled-in demo bundle.

pub mod api;
pub mod config;

/// Bundle generated by `build.rs` from `assets/`
pub mod demo {
    include!(concat!(env!("OUT_DIR"), "/demo_bundle.rs"));
}

use bundle::generate::{collect_entries, GenerateError};
use bundle::Index;
use tracing::info;

pub use config::Config;

/// Index served by `serveb`: `BUNDLE_DIR` encoded in memory when set,
/// otherwise the compiled-in demo bundle
pub fn load_index(config: &Config) -> Result<Index, GenerateError> {
    match &config.bundle_dir {
        Some(dir) => {
            info!(
                dir = %dir.display(),
                gzip = config.bundle_gzip,
                "encoding bundle directory"
            );
            let entries = collect_entries(dir, config.bundle_gzip, &[])?;
            Ok(Index::build(entries))
        }
        None => {
            info!("serving the compiled-in demo bundle");
            Ok(demo::demo_index())
        }
    }
}
