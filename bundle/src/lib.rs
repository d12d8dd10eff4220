// SPDX-License-Identifier: MIT
//! # Bundle
//!
//! Embed arbitrary files into Rust source as text records and read them
//! back at run time without touching the filesystem.
//!
//! ## Record Format
//!
//! Each embedded file becomes one [`Entry`]:
//!
//! ```text
//! name        UTF-8 path relative to the bundle root ("docs/guide.md")
//! size        length of the original file in bytes
//! compressed  whether the payload was gzipped before encoding
//! data        standard base64 (with padding) of the payload, broken into
//!             lines of at most 76 characters; every line is preceded by
//!             a newline, so the text starts with "\n" when non-empty
//! ```
//!
//! ## Key Features
//!
//! - **Immutable Index**: O(1) `has`/`lookup` and a byte-sorted prefix directory
//! - **Streaming Decode**: [`EntryReader`] yields bytes incrementally with explicit close
//! - **Composable Encode**: gzip → base64 → line breaker → buffered sink as [`Stage`]s
//! - **Generator**: [`generate::Generator`] turns a directory into Rust source
//!   (feature `generator`, on by default)
//!
//! ## Usage
//!
//! ```rust
//! use bundle::{DecodeMode, Entry, Index};
//! use std::io::Read;
//!
//! static BUNDLE: &[Entry] = &[Entry::from_static(
//!     "file1.txt",
//!     21,
//!     false,
//!     "\nVGVzdCBmaWxlIDEgY29udGVudHMK\n",
//! )];
//!
//! let index = Index::from_static(BUNDLE);
//! assert!(index.has("file1.txt"));
//!
//! let bytes = index.decode("file1.txt", DecodeMode::Decompress).unwrap();
//! assert_eq!(bytes, b"Test file 1 contents\n");
//!
//! let mut reader = index.open("file1.txt", DecodeMode::Decompress).unwrap();
//! let mut text = String::new();
//! reader.read_to_string(&mut text).unwrap();
//! reader.close().unwrap();
//! ```
//!
//! Generated bundle files declare a static table like `BUNDLE` above plus a
//! function returning its [`Index`]; see [`codegen`].

#[cfg(feature = "generator")]
pub mod codegen;
pub mod decode;
pub mod encode;
pub mod entry;
pub mod error;
#[cfg(feature = "generator")]
pub mod generate;
pub mod index;

// Re-export main types
pub use decode::{decode, EntryReader};
pub use encode::{
    encode_to_string, Base64Stage, BufferedSink, EncodeChain, EntryWriter, GzipStage,
    LineBreaker, Stage, DEFAULT_LINE_WIDTH,
};
pub use entry::{DecodeMode, Entry};
pub use error::{BundleError, BundleResult};
pub use index::Index;

#[cfg(feature = "generator")]
pub use codegen::{SourceEmitter, SourceOptions};
#[cfg(feature = "generator")]
pub use generate::{GenerateError, Generator, GeneratorOptions, Outcome, SkipPattern};
