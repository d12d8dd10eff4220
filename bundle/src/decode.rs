// SPDX-License-Identifier: MIT
//! Decode chain: line-wrapped base64 text back to the original bytes
//!
//! ```text
//! entry text -> LineJoiner -> base64 decoder -> [gzip decoder] -> bytes
//! ```
//!
//! [`decode`] drains the chain into a buffer in one call. [`EntryReader`]
//! exposes the same chain incrementally through [`std::io::Read`].

use std::io::{self, BufRead, BufReader, Read};

use base64::engine::general_purpose::STANDARD;
use base64::read::DecoderReader;
use flate2::read::MultiGzDecoder;

use crate::entry::{DecodeMode, Entry};
use crate::error::{BundleError, BundleResult};

/// Read buffer of the streaming reader
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Upper bound on the up-front allocation of [`decode`]; larger outputs grow
/// the buffer as they go.
const PREALLOC_LIMIT: u64 = 16 * 1024 * 1024;

type Layer<'a> = Box<dyn Read + Send + 'a>;

/// Source stage: yields the entry text with line breaks removed
pub(crate) struct LineJoiner<'a> {
    rest: &'a [u8],
}

impl<'a> LineJoiner<'a> {
    pub(crate) fn new(text: &'a [u8]) -> Self {
        Self { rest: text }
    }
}

#[inline]
fn is_break(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

impl Read for LineJoiner<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() && !self.rest.is_empty() {
            let skip = self.rest.iter().take_while(|b| is_break(**b)).count();
            self.rest = &self.rest[skip..];

            let run = self
                .rest
                .iter()
                .position(|b| is_break(*b))
                .unwrap_or(self.rest.len());
            let n = run.min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&self.rest[..n]);
            self.rest = &self.rest[n..];
            written += n;
        }
        Ok(written)
    }
}

/// Whether decoding `entry` in `mode` includes a decompression stage
fn decompresses(entry: &Entry, mode: DecodeMode) -> bool {
    entry.is_compressed() && mode == DecodeMode::Decompress
}

/// Stack the decode stages for `entry`, innermost first
fn decode_chain<'a>(entry: &'a Entry, decompressing: bool) -> Layer<'a> {
    let text: Layer<'a> = Box::new(LineJoiner::new(entry.data().as_bytes()));
    let mut chain: Layer<'a> = Box::new(DecoderReader::new(text, &STANDARD));
    if decompressing {
        // Concatenated members decode back to back; anything after the last
        // member that is not another gzip header is corrupt
        chain = Box::new(MultiGzDecoder::new(chain));
    }
    chain
}

fn check_size(entry: &Entry, actual: u64) -> BundleResult<()> {
    if actual != entry.size() {
        return Err(BundleError::SizeMismatch {
            name: entry.name().to_string(),
            expected: entry.size(),
            actual,
        });
    }
    Ok(())
}

fn capacity_hint(entry: &Entry, mode: DecodeMode) -> usize {
    let estimate = if entry.yields_original(mode) {
        entry.size()
    } else {
        // Four base64 characters carry three bytes
        entry.data().len() as u64 / 4 * 3
    };
    estimate.min(PREALLOC_LIMIT) as usize
}

/// Decode a whole entry into a fresh buffer.
///
/// With [`DecodeMode::Raw`] a compressed entry yields its gzip payload, whose
/// length is unrelated to [`Entry::size`]. Otherwise the result must be
/// exactly `size` bytes long. Nothing is returned on failure.
pub fn decode(entry: &Entry, mode: DecodeMode) -> BundleResult<Vec<u8>> {
    let decompressing = decompresses(entry, mode);
    let mut chain = decode_chain(entry, decompressing);

    let mut buf = Vec::with_capacity(capacity_hint(entry, mode));
    chain
        .read_to_end(&mut buf)
        .map_err(|e| BundleError::classify(e, decompressing))?;

    if entry.yields_original(mode) {
        check_size(entry, buf.len() as u64)?;
    }
    Ok(buf)
}

enum State<'a> {
    Open(BufReader<Layer<'a>>),
    Closed,
}

/// Streaming reader over one entry.
///
/// Construction primes the chain, so a malformed leading block (bad base64
/// or a bad gzip header) is reported by [`EntryReader::new`] rather than by
/// the first read. Read errors are `io::Error`s wrapping a [`BundleError`].
///
/// Call [`EntryReader::close`] when done. For compressed streams it checks
/// the gzip trailer, consuming whatever was left unread. Reading after close
/// fails. Dropping the reader without closing it skips the trailer check.
pub struct EntryReader<'a> {
    entry: &'a Entry,
    mode: DecodeMode,
    decompressing: bool,
    produced: u64,
    state: State<'a>,
}

impl<'a> EntryReader<'a> {
    pub fn new(entry: &'a Entry, mode: DecodeMode) -> BundleResult<Self> {
        let decompressing = decompresses(entry, mode);
        let mut inner =
            BufReader::with_capacity(READ_BUFFER_SIZE, decode_chain(entry, decompressing));
        inner
            .fill_buf()
            .map_err(|e| BundleError::classify(e, decompressing))?;

        Ok(Self {
            entry,
            mode,
            decompressing,
            produced: 0,
            state: State::Open(inner),
        })
    }

    pub fn entry(&self) -> &'a Entry {
        self.entry
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Bytes handed out so far
    pub fn produced(&self) -> u64 {
        self.produced
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    fn at_end(&self) -> BundleResult<()> {
        if self.entry.yields_original(self.mode) {
            check_size(self.entry, self.produced)?;
        }
        Ok(())
    }

    /// Release the chain. Safe to call more than once; only the first call
    /// can fail.
    pub fn close(&mut self) -> BundleResult<()> {
        let State::Open(mut inner) = std::mem::replace(&mut self.state, State::Closed) else {
            return Ok(());
        };
        if !self.decompressing {
            return Ok(());
        }

        let rest = io::copy(&mut inner, &mut io::sink())
            .map_err(|e| BundleError::classify(e, true))?;
        self.produced += rest;
        self.at_end()
    }
}

impl Read for EntryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let State::Open(inner) = &mut self.state else {
            return Err(io::Error::other("read from a closed bundle entry reader"));
        };

        match inner.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.at_end()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(0)
            }
            Ok(n) => {
                self.produced += n as u64;
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(e),
            Err(e) => {
                let kind = e.kind();
                Err(io::Error::new(
                    kind,
                    BundleError::classify(e, self.decompressing),
                ))
            }
        }
    }
}

impl std::fmt::Debug for EntryReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryReader")
            .field("entry", &self.entry.name())
            .field("mode", &self.mode)
            .field("produced", &self.produced)
            .field("closed", &self.is_closed())
            .finish()
    }
}
