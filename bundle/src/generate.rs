// SPDX-License-Identifier: MIT
//! Bundle generation from a file or directory tree
//!
//! Walks the input, applies skip patterns, and either emits Rust source
//! through [`SourceEmitter`] or encodes entries in memory.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::codegen::{SourceEmitter, SourceOptions};
use crate::entry::Entry;
use crate::error::BundleError;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write bundle: {0}")]
    Write(#[source] io::Error),

    #[error("failed to embed {name}: {source}")]
    Embed {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{0}: not a regular file or directory")]
    NotRegular(PathBuf),

    #[error("{0:?}: file name is not valid UTF-8")]
    NonUtf8Name(PathBuf),

    #[error("invalid skip pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid {what} {value:?}: expected a Rust identifier")]
    InvalidIdentifier { what: &'static str, value: String },

    #[error(transparent)]
    Bundle(#[from] BundleError),
}

fn read_error(path: &Path) -> impl FnOnce(io::Error) -> GenerateError + '_ {
    move |source| GenerateError::Read {
        path: path.to_path_buf(),
        source,
    }
}

/// Shell-style glob matched against base names: `*`, `?`, `[abc]`,
/// `[a-z]`, `[^abc]` / `[!abc]`, and `\` to escape.
#[derive(Debug, Clone)]
pub struct SkipPattern {
    glob: String,
    regex: Regex,
}

fn push_class_char(re: &mut String, c: char) {
    if matches!(c, '\\' | ']' | '[' | '^' | '-' | '&' | '~') {
        re.push('\\');
    }
    re.push(c);
}

fn glob_to_regex(glob: &str) -> Result<String, &'static str> {
    let mut re = String::with_capacity(glob.len() * 2 + 2);
    re.push('^');

    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            '\\' => {
                let escaped = chars.next().ok_or("trailing backslash")?;
                re.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
            }
            '[' => {
                re.push('[');
                if matches!(chars.peek(), Some('^' | '!')) {
                    chars.next();
                    re.push('^');
                }
                let mut closed = false;
                let mut first = true;
                while let Some(c) = chars.next() {
                    match c {
                        ']' if !first => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            let escaped = chars.next().ok_or("trailing backslash")?;
                            push_class_char(&mut re, escaped);
                        }
                        '-' if !first && chars.peek().is_some_and(|&n| n != ']') => {
                            re.push('-')
                        }
                        c => push_class_char(&mut re, c),
                    }
                    first = false;
                }
                if !closed {
                    return Err("unterminated character class");
                }
                re.push(']');
            }
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }

    re.push('$');
    Ok(re)
}

impl SkipPattern {
    pub fn new(glob: &str) -> Result<Self, GenerateError> {
        let invalid = |reason: String| GenerateError::InvalidPattern {
            pattern: glob.to_string(),
            reason,
        };
        let source = glob_to_regex(glob).map_err(|r| invalid(r.to_string()))?;
        let regex = Regex::new(&source).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl FromStr for SkipPattern {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

fn is_skipped(name: &str, skip: &[SkipPattern]) -> bool {
    skip.iter().any(|p| p.matches(name))
}

/// A regular file selected for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Entry name: path relative to the input root, `/`-separated
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

fn relative_name(root: &Path, path: &Path) -> Result<String, GenerateError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| GenerateError::NotRegular(path.to_path_buf()))?;

    let parts = rel
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .ok_or_else(|| GenerateError::NonUtf8Name(path.to_path_buf()))
        })
        .collect::<Result<Vec<&str>, _>>()?;
    Ok(parts.join("/"))
}

/// List the files under `input` in walk order.
///
/// A regular file yields itself, named by its base name. A directory is
/// walked recursively in file-name order; directories whose base name
/// matches a skip pattern are pruned with their contents. Symbolic links
/// and other non-regular files are skipped with a warning.
pub fn discover(input: &Path, skip: &[SkipPattern]) -> Result<Vec<SourceFile>, GenerateError> {
    let meta = fs::symlink_metadata(input).map_err(read_error(input))?;

    if meta.is_file() {
        let name = input
            .file_name()
            .ok_or_else(|| GenerateError::NotRegular(input.to_path_buf()))?
            .to_str()
            .ok_or_else(|| GenerateError::NonUtf8Name(input.to_path_buf()))?
            .to_string();
        return Ok(vec![SourceFile {
            name,
            path: input.to_path_buf(),
            size: meta.len(),
        }]);
    }
    if !meta.is_dir() {
        return Err(GenerateError::NotRegular(input.to_path_buf()));
    }

    let walker = WalkDir::new(input)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped(&e.file_name().to_string_lossy(), skip));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            warn!(path = %entry.path().display(), "skipped non-regular file");
            continue;
        }

        let name = relative_name(input, entry.path())?;
        let size = entry.metadata()?.len();
        files.push(SourceFile {
            name,
            path: entry.into_path(),
            size,
        });
    }
    Ok(files)
}

/// Whether `output` exists and is strictly newer than every path under
/// `input`. Any error answers `false`.
pub fn is_up_to_date(output: &Path, input: &Path) -> bool {
    let Some(generated) = fs::metadata(output)
        .ok()
        .filter(|m| m.is_file())
        .and_then(|m| m.modified().ok())
    else {
        return false;
    };

    WalkDir::new(input).into_iter().all(|entry| {
        entry
            .ok()
            .and_then(|e| e.metadata().ok())
            .and_then(|m| m.modified().ok())
            .is_some_and(|modified| modified < generated)
    })
}

/// Encode every file under `input` in memory
pub fn collect_entries(
    input: &Path,
    compress: bool,
    skip: &[SkipPattern],
) -> Result<Vec<Entry>, GenerateError> {
    discover(input, skip)?
        .into_iter()
        .map(|file| {
            let content = fs::read(&file.path).map_err(read_error(&file.path))?;
            debug!(name = %file.name, size = content.len(), "encoding entry");
            Ok(Entry::encode(file.name, &content, compress)?)
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct GeneratorOptions {
    /// Output file; standard output when unset
    pub output: Option<PathBuf>,
    pub source: SourceOptions,
    pub compress: bool,
    pub skip: Vec<SkipPattern>,
    /// Regenerate even when the output is newer than the input
    pub always: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Generated { entries: usize, bytes: u64 },
    UpToDate,
}

/// Produces bundle source files
#[derive(Debug, Clone)]
pub struct Generator {
    options: GeneratorOptions,
}

impl Generator {
    pub fn new(options: GeneratorOptions) -> Result<Self, GenerateError> {
        options.source.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Generate the bundle for `input`.
    ///
    /// When writing to a file and any step fails, the file is removed before
    /// the error is returned.
    pub fn run(&self, input: &Path) -> Result<Outcome, GenerateError> {
        let Some(output) = &self.options.output else {
            info!("generating bundle on stdout");
            let stdout = io::stdout();
            let mut out = stdout.lock();
            return self.emit(&mut out, input);
        };

        if !self.options.always && is_up_to_date(output, input) {
            info!(
                output = %output.display(),
                input = %input.display(),
                "bundle is newer than its input, skipping"
            );
            return Ok(Outcome::UpToDate);
        }

        info!(output = %output.display(), "generating bundle");
        let result = self.write_file(output, input);
        if result.is_err() {
            if let Err(e) = fs::remove_file(output) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(output = %output.display(), error = %e, "failed to remove partial bundle");
                }
            }
        }
        result
    }

    fn write_file(&self, output: &Path, input: &Path) -> Result<Outcome, GenerateError> {
        let file = File::create(output).map_err(GenerateError::Write)?;
        let mut out = BufWriter::new(file);
        let outcome = self.emit(&mut out, input)?;
        out.flush().map_err(GenerateError::Write)?;
        Ok(outcome)
    }

    /// Emit the bundle source for `input` into `out`
    pub fn emit<W: Write>(&self, out: &mut W, input: &Path) -> Result<Outcome, GenerateError> {
        let files = discover(input, &self.options.skip)?;

        let mut emitter = SourceEmitter::new(out, self.options.source.clone());
        emitter.header().map_err(GenerateError::Write)?;

        let mut bytes = 0;
        for file in &files {
            debug!(name = %file.name, size = file.size, "+ {}", file.name);
            let mut content = File::open(&file.path).map_err(read_error(&file.path))?;
            bytes += emitter
                .entry(&file.name, file.size, self.options.compress, &mut content)
                .map_err(|source| GenerateError::Embed {
                    name: file.name.clone(),
                    source,
                })?;
        }

        emitter.footer().map_err(GenerateError::Write)?;
        info!(entries = files.len(), bytes, "bundle generated");
        Ok(Outcome::Generated {
            entries: files.len(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::DecodeMode;
    use crate::index::Index;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("file1.txt"), "Test file 1 contents\n").unwrap();
        fs::write(root.join("file2.txt"), "Test file 2 contents\n").unwrap();
        fs::create_dir_all(root.join("docs/drafts")).unwrap();
        fs::write(root.join("docs/guide.md"), "# Guide\n").unwrap();
        fs::write(root.join("docs/drafts/wip.md"), "wip\n").unwrap();
        fs::write(root.join("notes.bak"), "old\n").unwrap();
        dir
    }

    fn names(files: &[SourceFile]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    fn skip(globs: &[&str]) -> Vec<SkipPattern> {
        globs.iter().map(|g| SkipPattern::new(g).unwrap()).collect()
    }

    #[test]
    fn test_skip_pattern_globs() {
        let p = SkipPattern::new("*.bak").unwrap();
        assert!(p.matches("notes.bak"));
        assert!(!p.matches("notes.bak.txt"));

        let p = SkipPattern::new("file?.txt").unwrap();
        assert!(p.matches("file1.txt"));
        assert!(!p.matches("file10.txt"));

        let p = SkipPattern::new("[a-c]*").unwrap();
        assert!(p.matches("beta"));
        assert!(!p.matches("delta"));

        let p = SkipPattern::new("[!.]*").unwrap();
        assert!(p.matches("visible"));
        assert!(!p.matches(".hidden"));

        let p = SkipPattern::new(r"\*literal").unwrap();
        assert!(p.matches("*literal"));
        assert!(!p.matches("xliteral"));

        let p = SkipPattern::new("a.b").unwrap();
        assert!(!p.matches("axb"));
    }

    #[test]
    fn test_skip_pattern_invalid() {
        assert!(matches!(
            SkipPattern::new("[abc"),
            Err(GenerateError::InvalidPattern { .. })
        ));
        assert!(matches!(
            "trailing\\".parse::<SkipPattern>(),
            Err(GenerateError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_discover_directory_order() {
        let dir = tree();
        let files = discover(dir.path(), &[]).unwrap();
        assert_eq!(
            names(&files),
            [
                "docs/drafts/wip.md",
                "docs/guide.md",
                "file1.txt",
                "file2.txt",
                "notes.bak"
            ]
        );
        assert_eq!(files[2].size, 21);
    }

    #[test]
    fn test_discover_with_skip_patterns() {
        let dir = tree();
        let files = discover(dir.path(), &skip(&["*.bak", "drafts"])).unwrap();
        assert_eq!(
            names(&files),
            ["docs/guide.md", "file1.txt", "file2.txt"]
        );
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tree();
        let files = discover(&dir.path().join("docs/guide.md"), &[]).unwrap();
        assert_eq!(names(&files), ["guide.md"]);
    }

    #[test]
    fn test_discover_missing_input() {
        let dir = TempDir::new().unwrap();
        let err = discover(&dir.path().join("absent"), &[]).unwrap_err();
        assert!(matches!(err, GenerateError::Read { .. }));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_discover_rejects_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tree();
        let bad = dir.path().join(OsStr::from_bytes(b"bad\xff.txt"));
        fs::write(&bad, "x").unwrap();

        let err = discover(dir.path(), &[]).unwrap_err();
        assert!(matches!(err, GenerateError::NonUtf8Name(ref p) if *p == bad), "{err:?}");
        let err = discover(&bad, &[]).unwrap_err();
        assert!(matches!(err, GenerateError::NonUtf8Name(_)), "{err:?}");

        // Skipping the file lets the walk through
        assert_eq!(discover(dir.path(), &skip(&["bad*"])).unwrap().len(), 5);
    }

    #[test]
    fn test_collect_entries_round_trip() {
        let dir = tree();
        for compress in [false, true] {
            let index = Index::build(collect_entries(dir.path(), compress, &[]).unwrap());
            assert_eq!(index.len(), 5);
            let entry = index.lookup("file1.txt").unwrap();
            assert_eq!(entry.size(), 21);
            assert_eq!(entry.is_compressed(), compress);
            assert_eq!(
                entry.decode(DecodeMode::Decompress).unwrap(),
                b"Test file 1 contents\n"
            );
        }
    }

    #[test]
    fn test_generator_writes_source() {
        let dir = tree();
        let out_dir = TempDir::new().unwrap();
        let output = out_dir.path().join("bundle.rs");

        let generator = Generator::new(GeneratorOptions {
            output: Some(output.clone()),
            skip: skip(&["docs"]),
            ..GeneratorOptions::default()
        })
        .unwrap();

        let outcome = generator.run(dir.path()).unwrap();
        assert_eq!(
            outcome,
            Outcome::Generated {
                entries: 3,
                bytes: 46
            }
        );

        let source = fs::read_to_string(&output).unwrap();
        assert!(source.starts_with("// Bundle file\n"));
        assert!(source.contains("\"file1.txt\",\n        21,\n        false,\n        r\"\nVGVzdCBmaWxlIDEgY29udGVudHMK\n\",\n"));
        assert!(source.contains("\"notes.bak\""));
        assert!(!source.contains("guide.md"));
        assert!(source.ends_with("// End of bundle\n"));
    }

    #[test]
    fn test_generator_skips_fresh_output() {
        let dir = tree();
        let out_dir = TempDir::new().unwrap();
        let output = out_dir.path().join("bundle.rs");
        let options = GeneratorOptions {
            output: Some(output.clone()),
            ..GeneratorOptions::default()
        };

        // Make the output strictly newer than every input path
        fs::write(&output, "stale").unwrap();
        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(60);
        File::options()
            .write(true)
            .open(&output)
            .unwrap()
            .set_modified(later)
            .unwrap();

        let generator = Generator::new(options.clone()).unwrap();
        assert_eq!(generator.run(dir.path()).unwrap(), Outcome::UpToDate);
        assert_eq!(fs::read_to_string(&output).unwrap(), "stale");

        let always = Generator::new(GeneratorOptions {
            always: true,
            ..options
        })
        .unwrap();
        assert!(matches!(
            always.run(dir.path()).unwrap(),
            Outcome::Generated { entries: 5, .. }
        ));
    }

    #[test]
    fn test_generator_removes_output_on_failure() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("bundle.rs");
        fs::write(&output, "previous run").unwrap();

        let generator = Generator::new(GeneratorOptions {
            output: Some(output.clone()),
            ..GeneratorOptions::default()
        })
        .unwrap();

        assert!(generator.run(&dir.path().join("missing")).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_generator_rejects_bad_names() {
        let options = GeneratorOptions {
            source: SourceOptions {
                bundle_name: "not valid".into(),
                ..SourceOptions::default()
            },
            ..GeneratorOptions::default()
        };
        assert!(matches!(
            Generator::new(options),
            Err(GenerateError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_emit_compressed_into_buffer() {
        let dir = tree();
        let generator = Generator::new(GeneratorOptions {
            compress: true,
            source: SourceOptions {
                timestamp: false,
                ..SourceOptions::default()
            },
            ..GeneratorOptions::default()
        })
        .unwrap();

        let mut out = Vec::new();
        let outcome = generator
            .emit(&mut out, &dir.path().join("file1.txt"))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Generated {
                entries: 1,
                bytes: 21
            }
        );
        let source = String::from_utf8(out).unwrap();
        assert!(source.contains("\"file1.txt\",\n        21,\n        true,\n"));
    }
}
