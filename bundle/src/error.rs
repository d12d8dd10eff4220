// SPDX-License-Identifier: MIT
//! Errors raised while looking up and decoding bundle entries

use std::io;

/// Errors that can occur while accessing a bundle
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("no such entry: {0}")]
    NotFound(String),

    #[error("malformed base64 payload: {0}")]
    MalformedEncoding(#[source] io::Error),

    #[error("corrupt compressed stream: {0}")]
    CorruptCompressedStream(#[source] io::Error),

    #[error("size mismatch for {name}: expected {expected} bytes, decoded {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type BundleResult<T> = Result<T, BundleError>;

impl BundleError {
    /// Sort an I/O error raised somewhere in the decode chain into the
    /// taxonomy above.
    ///
    /// Errors produced by the base64 stage carry a `base64::DecodeError`
    /// payload and are recognised by it. Any other data error raised while a
    /// decompression stage is part of the chain is attributed to that stage.
    pub(crate) fn classify(err: io::Error, decompressing: bool) -> Self {
        // Errors we raised ourselves travel through `io::Read` wrapped in an
        // `io::Error`; unwrap them first.
        if err
            .get_ref()
            .is_some_and(|inner| inner.is::<BundleError>())
        {
            if let Some(inner) = err.into_inner() {
                if let Ok(own) = inner.downcast::<BundleError>() {
                    return *own;
                }
            }
            return BundleError::Io(io::Error::other("bundle error lost while unwrapping"));
        }

        if err
            .get_ref()
            .is_some_and(|inner| inner.is::<base64::DecodeError>())
        {
            return BundleError::MalformedEncoding(err);
        }

        match err.kind() {
            io::ErrorKind::InvalidData
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::UnexpectedEof
                if decompressing =>
            {
                BundleError::CorruptCompressedStream(err)
            }
            _ => BundleError::Io(err),
        }
    }

    /// Whether this error reports a missing entry
    pub fn is_not_found(&self) -> bool {
        matches!(self, BundleError::NotFound(_))
    }
}
