// SPDX-License-Identifier: MIT
//! Rust source emission for bundles
//!
//! The generated file declares a static entry table and an index
//! constructor:
//!
//! ```text
//! // Bundle file
//! // Auto-generated. !! DO NOT EDIT !!
//! // Generated: 2024-01-01T00:00:00+00:00
//!
//! #[allow(dead_code)]
//! pub static BUNDLE: &[::bundle::Entry] = &[
//!     ::bundle::Entry::from_static(
//!         "file1.txt",
//!         21,
//!         false,
//!         r"
//! VGVzdCBmaWxlIDEgY29udGVudHMK
//! ",
//!     ),
//! ];
//!
//! #[allow(dead_code)]
//! pub fn bundle_index() -> ::bundle::Index {
//!     ::bundle::Index::from_static(BUNDLE)
//! }
//!
//! // End of bundle
//! ```
//!
//! Payloads are raw string literals; base64 text never contains `"`.

use std::io::{self, Read, Write};

use crate::encode::EncodeChain;
use crate::generate::GenerateError;

/// Names used in the generated source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOptions {
    /// Wrap the items in `pub mod <module> { ... }`
    pub module: Option<String>,
    /// Name of the static entry table
    pub bundle_name: String,
    /// Name of the function returning the index
    pub index_name: String,
    /// Path under which the `bundle` crate is reachable from the generated file
    pub crate_path: String,
    /// Emit the `Generated:` timestamp line
    pub timestamp: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            module: None,
            bundle_name: "BUNDLE".to_string(),
            index_name: "bundle_index".to_string(),
            crate_path: "::bundle".to_string(),
            timestamp: true,
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    s != "_" && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn is_path(s: &str) -> bool {
    let s = s.strip_prefix("::").unwrap_or(s);
    !s.is_empty() && s.split("::").all(is_identifier)
}

impl SourceOptions {
    pub fn validate(&self) -> Result<(), GenerateError> {
        let invalid = |what: &'static str, value: &str| GenerateError::InvalidIdentifier {
            what,
            value: value.to_string(),
        };

        if let Some(module) = &self.module {
            if !is_identifier(module) {
                return Err(invalid("module name", module));
            }
        }
        if !is_identifier(&self.bundle_name) {
            return Err(invalid("bundle name", &self.bundle_name));
        }
        if !is_identifier(&self.index_name) {
            return Err(invalid("index name", &self.index_name));
        }
        if !is_path(&self.crate_path) {
            return Err(invalid("crate path", &self.crate_path));
        }
        Ok(())
    }
}

/// Streams a bundle source file: header, one record per entry, footer
pub struct SourceEmitter<W: Write> {
    out: W,
    options: SourceOptions,
    pad: &'static str,
    entries: usize,
}

impl<W: Write> SourceEmitter<W> {
    pub fn new(out: W, options: SourceOptions) -> Self {
        let pad = if options.module.is_some() { "    " } else { "" };
        Self {
            out,
            options,
            pad,
            entries: 0,
        }
    }

    /// Records emitted so far
    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn header(&mut self) -> io::Result<()> {
        let pad = self.pad;
        let o = &self.options;

        writeln!(self.out, "// Bundle file")?;
        writeln!(self.out, "// Auto-generated. !! DO NOT EDIT !!")?;
        if o.timestamp {
            writeln!(self.out, "// Generated: {}", chrono::Local::now().to_rfc3339())?;
        }
        writeln!(self.out)?;
        if let Some(module) = &o.module {
            writeln!(self.out, "pub mod {module} {{")?;
        }
        writeln!(self.out, "{pad}#[allow(dead_code)]")?;
        writeln!(
            self.out,
            "{pad}pub static {}: &[{}::Entry] = &[",
            o.bundle_name, o.crate_path
        )
    }

    /// Emit one record, streaming `content` through the encode chain.
    ///
    /// Fails with `InvalidData` when `content` does not yield exactly `size`
    /// bytes.
    pub fn entry<R: Read + ?Sized>(
        &mut self,
        name: &str,
        size: u64,
        compressed: bool,
        content: &mut R,
    ) -> io::Result<u64> {
        let pad = self.pad;

        writeln!(
            self.out,
            "{pad}    {}::Entry::from_static(",
            self.options.crate_path
        )?;
        writeln!(self.out, "{pad}        {name:?},")?;
        writeln!(self.out, "{pad}        {size},")?;
        writeln!(self.out, "{pad}        {compressed},")?;
        write!(self.out, "{pad}        r\"")?;

        let mut writer = EncodeChain::new()
            .compressed(compressed)
            .writer(&mut self.out);
        let copied = io::copy(content, &mut writer)?;
        writer.finish()?;

        if copied != size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{name}: expected {size} bytes, read {copied}"),
            ));
        }

        writeln!(self.out)?;
        writeln!(self.out, "\",")?;
        writeln!(self.out, "{pad}    ),")?;
        self.entries += 1;
        Ok(copied)
    }

    pub fn footer(&mut self) -> io::Result<()> {
        let pad = self.pad;
        let o = &self.options;

        writeln!(self.out, "{pad}];")?;
        writeln!(self.out)?;
        writeln!(self.out, "{pad}#[allow(dead_code)]")?;
        writeln!(
            self.out,
            "{pad}pub fn {}() -> {}::Index {{",
            o.index_name, o.crate_path
        )?;
        writeln!(
            self.out,
            "{pad}    {}::Index::from_static({})",
            o.crate_path, o.bundle_name
        )?;
        writeln!(self.out, "{pad}}}")?;
        if o.module.is_some() {
            writeln!(self.out, "}}")?;
        }
        writeln!(self.out)?;
        writeln!(self.out, "// End of bundle")?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SourceOptions {
        SourceOptions {
            timestamp: false,
            ..SourceOptions::default()
        }
    }

    fn render(options: SourceOptions, files: &[(&str, &[u8], bool)]) -> String {
        let mut emitter = SourceEmitter::new(Vec::new(), options);
        emitter.header().unwrap();
        for (name, content, compressed) in files {
            let mut reader = *content;
            emitter
                .entry(name, content.len() as u64, *compressed, &mut reader)
                .unwrap();
        }
        emitter.footer().unwrap();
        assert_eq!(emitter.entries(), files.len());
        String::from_utf8(emitter.into_inner()).unwrap()
    }

    #[test]
    fn test_example_file_layout() {
        let source = render(
            options(),
            &[("file1.txt", &b"Test file 1 contents\n"[..], false)],
        );
        let expected = "\
// Bundle file
// Auto-generated. !! DO NOT EDIT !!

#[allow(dead_code)]
pub static BUNDLE: &[::bundle::Entry] = &[
    ::bundle::Entry::from_static(
        \"file1.txt\",
        21,
        false,
        r\"
VGVzdCBmaWxlIDEgY29udGVudHMK
\",
    ),
];

#[allow(dead_code)]
pub fn bundle_index() -> ::bundle::Index {
    ::bundle::Index::from_static(BUNDLE)
}

// End of bundle
";
        assert_eq!(source, expected);
    }

    #[test]
    fn test_module_and_names() {
        let opts = SourceOptions {
            module: Some("assets".into()),
            bundle_name: "ASSETS".into(),
            index_name: "assets_index".into(),
            crate_path: "crate::bundle".into(),
            timestamp: false,
        };
        let source = render(opts, &[("a.txt", &b"a"[..], true)]);
        assert!(source.contains("pub mod assets {\n"));
        assert!(source.contains("    pub static ASSETS: &[crate::bundle::Entry] = &[\n"));
        assert!(source.contains("        crate::bundle::Entry::from_static(\n"));
        assert!(source.contains("            true,\n"));
        assert!(source.contains("    pub fn assets_index() -> crate::bundle::Index {\n"));
        assert!(source.contains("        crate::bundle::Index::from_static(ASSETS)\n"));
        assert!(source.ends_with("}\n\n// End of bundle\n"));
    }

    #[test]
    fn test_names_are_escaped() {
        let source = render(options(), &[("quote\"and\\slash.txt", &b""[..], false)]);
        assert!(source.contains(r#""quote\"and\\slash.txt","#));
    }

    #[test]
    fn test_empty_file_record() {
        let source = render(options(), &[("empty", &b""[..], false)]);
        assert!(source.contains("        0,\n        false,\n        r\"\n\",\n"));
    }

    #[test]
    fn test_timestamp_line() {
        let source = render(SourceOptions::default(), &[]);
        assert!(source.contains("// Generated: "));
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let mut emitter = SourceEmitter::new(Vec::new(), options());
        emitter.header().unwrap();
        let mut content: &[u8] = b"abc";
        let err = emitter.entry("abc", 4, false, &mut content).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_validate() {
        assert!(SourceOptions::default().validate().is_ok());

        let bad = [
            SourceOptions {
                bundle_name: "1abc".into(),
                ..options()
            },
            SourceOptions {
                index_name: "has-dash".into(),
                ..options()
            },
            SourceOptions {
                module: Some("_".into()),
                ..options()
            },
            SourceOptions {
                crate_path: "::".into(),
                ..options()
            },
        ];
        for opts in bad {
            assert!(
                matches!(opts.validate(), Err(GenerateError::InvalidIdentifier { .. })),
                "{opts:?}"
            );
        }
    }

    #[test]
    fn test_is_path() {
        assert!(is_path("::bundle"));
        assert!(is_path("crate::vendor::bundle"));
        assert!(!is_path("bundle::"));
        assert!(!is_path("a:b"));
    }
}
