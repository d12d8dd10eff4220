// SPDX-License-Identifier: MIT
//! Bundle entry: one embedded file

use std::borrow::Cow;

use crate::decode::{self, EntryReader};
use crate::encode::encode_to_string;
use crate::error::BundleResult;

/// How far the decode chain should go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DecodeMode {
    /// Decode and, for compressed entries, decompress
    #[default]
    Decompress,
    /// Only undo the text encoding; compressed entries yield their gzip payload
    Raw,
}

/// One embedded file.
///
/// `size` is the length of the original content, before compression and
/// encoding. `data` holds the base64 text (of the gzip stream when
/// `compressed` is set) with line breaks that decoding ignores.
///
/// Entries produced by generated source borrow `'static` text; entries
/// encoded at run time own it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: Cow<'static, str>,
    size: u64,
    compressed: bool,
    data: Cow<'static, str>,
}

impl Entry {
    /// Entry over static text, usable in `static` initializers
    pub const fn from_static(
        name: &'static str,
        size: u64,
        compressed: bool,
        data: &'static str,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            size,
            compressed,
            data: Cow::Borrowed(data),
        }
    }

    pub fn new(
        name: impl Into<Cow<'static, str>>,
        size: u64,
        compressed: bool,
        data: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            compressed,
            data: data.into(),
        }
    }

    /// Encode `content` in memory with the same chain the generator uses
    pub fn encode(
        name: impl Into<Cow<'static, str>>,
        content: &[u8],
        compressed: bool,
    ) -> BundleResult<Self> {
        let data = encode_to_string(content, compressed)?;
        Ok(Self::new(name, content.len() as u64, compressed, data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_cow(&self) -> &Cow<'static, str> {
        &self.name
    }

    /// Original content length in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Encoded payload text, line breaks included
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Whether `mode` yields the original content for this entry
    pub fn yields_original(&self, mode: DecodeMode) -> bool {
        !self.compressed || mode == DecodeMode::Decompress
    }

    /// Decode the whole entry into a buffer
    pub fn decode(&self, mode: DecodeMode) -> BundleResult<Vec<u8>> {
        decode::decode(self, mode)
    }

    /// Open a streaming reader over the entry
    pub fn open(&self, mode: DecodeMode) -> BundleResult<EntryReader<'_>> {
        EntryReader::new(self, mode)
    }
}
