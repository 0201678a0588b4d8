// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Local framing / codec errors
//!
//! These are detected on the host before (or instead of) any device exchange,
//! device-reported failures are described by [ErrorKind][crate::status::ErrorKind].

use core::fmt::{Display, Formatter};

/// APDU codec error type
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ApduError {
    /// Path component is not a decimal integer fitting in 31 bits,
    /// or encoded path length is not a multiple of 4
    MalformedPath,

    /// Frame payload exceeds 255 bytes
    PayloadTooLarge,

    /// Response shorter than declared / required
    TruncatedResponse,

    /// Response carries bytes beyond the expected fields
    TrailingData,

    /// Configuration response is not `[0x00][major][minor][patch]`
    UnexpectedConfigurationFormat,

    /// Chunk size is zero, exceeds a frame, or cannot hold the chunk prefix
    InvalidChunkSize,

    /// Buffer too short for encode / decode
    InvalidLength,

    /// Invalid field encoding
    InvalidEncoding,

    /// Invalid UTF-8 in string field
    InvalidUtf8,
}

impl Display for ApduError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ApduError::MalformedPath => "malformed derivation path",
            ApduError::PayloadTooLarge => "payload exceeds maximum frame size",
            ApduError::TruncatedResponse => "truncated response",
            ApduError::TrailingData => "unexpected trailing data in response",
            ApduError::UnexpectedConfigurationFormat => "unexpected configuration format",
            ApduError::InvalidChunkSize => "invalid chunk size",
            ApduError::InvalidLength => "invalid buffer length",
            ApduError::InvalidEncoding => "invalid encoding",
            ApduError::InvalidUtf8 => "invalid utf-8",
        };
        f.write_str(s)
    }
}

impl From<encdec::Error> for ApduError {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => ApduError::InvalidLength,
            #[allow(unreachable_patterns)]
            _ => ApduError::InvalidEncoding,
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ApduError {}
