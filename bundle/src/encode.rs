// SPDX-License-Identifier: MIT
//! Encode chain: raw bytes to line-wrapped base64 text
//!
//! ```text
//! bytes -> [GzipStage] -> Base64Stage -> LineBreaker -> BufferedSink -> &mut W
//! ```
//!
//! Every layer is a [`Stage`]: a writer that owns the layer beneath it and
//! has to be closed explicitly so trailing output (gzip trailer, base64
//! padding, buffered bytes) reaches the sink. [`EncodeChain`] assembles the
//! layers as boxed stages, so adding a layer does not change callers.

use std::io::{self, BufWriter, Write};

use base64::engine::general_purpose::{GeneralPurpose, STANDARD};
use base64::write::EncoderWriter;
use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};

/// Default encoded line width, in characters
pub const DEFAULT_LINE_WIDTH: usize = 76;

/// Default line terminator
pub const DEFAULT_NEWLINE: &str = "\n";

/// A writer layer with a scoped close.
///
/// `close` flushes this layer's pending output into the layer below and then
/// closes that layer, even when the first step failed. The first error wins.
/// Closing an already closed stage succeeds without doing anything.
pub trait Stage: Write {
    fn close(&mut self) -> io::Result<()>;
}

impl<S: Stage + ?Sized> Stage for Box<S> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

fn closed_stage() -> io::Error {
    io::Error::other("write to a closed encoder stage")
}

/// Bottom layer: buffers writes to the caller's sink
pub struct BufferedSink<'a, W: Write> {
    inner: BufWriter<&'a mut W>,
}

impl<'a, W: Write> BufferedSink<'a, W> {
    pub fn new(sink: &'a mut W) -> Self {
        Self {
            inner: BufWriter::new(sink),
        }
    }
}

impl<W: Write> Write for BufferedSink<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> Stage for BufferedSink<'_, W> {
    fn close(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Byte accounting for [`LineBreaker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineState {
    width: usize,
    remaining: usize,
}

impl LineState {
    /// A zero width is treated as one.
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            remaining: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// A terminator is due before the next byte
    pub fn needs_break(&self) -> bool {
        self.remaining == 0
    }

    pub fn start_line(&mut self) {
        self.remaining = self.width;
    }

    /// How many of `available` bytes still fit on the current line
    pub fn fit(&self, available: usize) -> usize {
        available.min(self.remaining)
    }

    pub fn advance(&mut self, written: usize) {
        self.remaining -= written;
    }
}

/// Writes a line terminator before every `width` bytes.
///
/// Output therefore starts with a terminator (unless nothing is written at
/// all) and does not end with one.
pub struct LineBreaker<S> {
    inner: S,
    newline: &'static [u8],
    state: LineState,
}

impl<S: Write> LineBreaker<S> {
    pub fn new(inner: S, width: usize, newline: &'static str) -> Self {
        Self {
            inner,
            newline: newline.as_bytes(),
            state: LineState::new(width),
        }
    }

    pub fn state(&self) -> LineState {
        self.state
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Write> Write for LineBreaker<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut done = 0;
        while done < buf.len() {
            if self.state.needs_break() {
                if let Err(e) = self.inner.write_all(self.newline) {
                    return if done == 0 { Err(e) } else { Ok(done) };
                }
                self.state.start_line();
            }

            let n = self.state.fit(buf.len() - done);
            match self.inner.write(&buf[done..done + n]) {
                Ok(0) if done == 0 => return Err(io::ErrorKind::WriteZero.into()),
                Ok(0) => return Ok(done),
                Ok(written) => {
                    self.state.advance(written);
                    done += written;
                }
                Err(e) if done == 0 => return Err(e),
                // Report what was accepted; the error recurs on the next call
                Err(_) => return Ok(done),
            }
        }
        Ok(done)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<S: Stage> Stage for LineBreaker<S> {
    fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }
}

/// Standard-alphabet, padded base64 encoding
pub struct Base64Stage<S: Write> {
    encoder: Option<EncoderWriter<'static, GeneralPurpose, S>>,
}

impl<S: Write> Base64Stage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            encoder: Some(EncoderWriter::new(inner, &STANDARD)),
        }
    }
}

impl<S: Write> Write for Base64Stage<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.as_mut().ok_or_else(closed_stage)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.flush(),
            None => Ok(()),
        }
    }
}

impl<S: Stage> Stage for Base64Stage<S> {
    fn close(&mut self) -> io::Result<()> {
        let Some(mut encoder) = self.encoder.take() else {
            return Ok(());
        };
        match encoder.finish() {
            Ok(mut inner) => inner.close(),
            Err(err) => {
                // Still release the layers below
                let _ = encoder.into_inner().close();
                Err(err)
            }
        }
    }
}

/// gzip compression with a zero modification time, so identical input
/// always encodes to identical text
pub struct GzipStage<S: Write> {
    encoder: GzEncoder<S>,
}

impl<S: Write> GzipStage<S> {
    pub fn new(inner: S, level: Compression) -> Self {
        Self {
            encoder: GzBuilder::new().mtime(0).write(inner, level),
        }
    }
}

impl<S: Write> Write for GzipStage<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}

impl<S: Stage> Stage for GzipStage<S> {
    fn close(&mut self) -> io::Result<()> {
        let finished = self.encoder.try_finish();
        let below = self.encoder.get_mut().close();
        finished.and(below)
    }
}

/// Builder for the encode chain
#[derive(Debug, Clone, Copy)]
pub struct EncodeChain {
    compression: Option<Compression>,
    line_width: usize,
    newline: &'static str,
}

impl Default for EncodeChain {
    fn default() -> Self {
        Self {
            compression: None,
            line_width: DEFAULT_LINE_WIDTH,
            newline: DEFAULT_NEWLINE,
        }
    }
}

impl EncodeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable gzip compression at the default level
    pub fn compressed(mut self, on: bool) -> Self {
        self.compression = match (on, self.compression) {
            (false, _) => None,
            (true, Some(level)) => Some(level),
            (true, None) => Some(Compression::default()),
        };
        self
    }

    /// Enable gzip compression at `level`
    pub fn level(mut self, level: Compression) -> Self {
        self.compression = Some(level);
        self
    }

    pub fn line_width(mut self, width: usize) -> Self {
        self.line_width = width;
        self
    }

    pub fn newline(mut self, newline: &'static str) -> Self {
        self.newline = newline;
        self
    }

    pub fn is_compressed(&self) -> bool {
        self.compression.is_some()
    }

    /// Stack the stages over `sink`
    pub fn writer<'a, W: Write + 'a>(&self, sink: &'a mut W) -> EntryWriter<'a> {
        let mut stage: Box<dyn Stage + 'a> = Box::new(BufferedSink::new(sink));
        stage = Box::new(LineBreaker::new(stage, self.line_width, self.newline));
        stage = Box::new(Base64Stage::new(stage));
        if let Some(level) = self.compression {
            stage = Box::new(GzipStage::new(stage, level));
        }
        EntryWriter { stage, raw_len: 0 }
    }
}

/// Head of an encode chain. Counts the raw bytes fed into it.
pub struct EntryWriter<'a> {
    stage: Box<dyn Stage + 'a>,
    raw_len: u64,
}

impl EntryWriter<'_> {
    /// Raw bytes accepted so far
    pub fn raw_len(&self) -> u64 {
        self.raw_len
    }

    /// Close every stage, outermost first, and return the raw byte count
    pub fn finish(mut self) -> io::Result<u64> {
        self.stage.close()?;
        Ok(self.raw_len)
    }
}

impl Write for EntryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.stage.write(buf)?;
        self.raw_len += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stage.flush()
    }
}

impl Stage for EntryWriter<'_> {
    fn close(&mut self) -> io::Result<()> {
        self.stage.close()
    }
}

/// Encode `content` in memory with the default chain settings
pub fn encode_to_string(content: &[u8], compressed: bool) -> io::Result<String> {
    // 4/3 expansion plus one terminator per line
    let estimate = content.len() / 3 * 4 + content.len() / 57 + 8;
    let mut out = Vec::with_capacity(estimate);

    let mut writer = EncodeChain::new().compressed(compressed).writer(&mut out);
    writer.write_all(content)?;
    writer.finish()?;

    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
