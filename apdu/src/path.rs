// Copyright (c) 2022-2023 The MobileCoin Foundation

//! BIP32 derivation paths
//!
//! Paths are written as slash-separated decimal components, each optionally
//! suffixed with `'` to mark hardened derivation (eg. `44'/144'/0'/0'/0`).
//!
//! ## Encoding
//!
//! Each component is a big-endian `u32`, with the top bit set for hardened
//! components. When sent to the device the path is preceded by a component
//! count:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     COUNT     |              COMPONENT[0] (u32 BE)            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |               |              COMPONENT[1] (u32 BE)            /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                              ...                              /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use alloc::vec::Vec;
use core::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use encdec::{DecodeOwned, Encode};

use crate::ApduError;

/// Hardened derivation bit
pub const HARDENED: u32 = 0x8000_0000;

/// Default XRP account path
pub const DEFAULT_PATH: &str = "44'/144'/0'/0'/0";

/// Single derivation path component
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ChildNumber {
    /// Index (31 bits)
    pub index: u32,
    /// Hardened derivation
    pub hardened: bool,
}

impl ChildNumber {
    /// Create a normal (non-hardened) component
    pub const fn normal(index: u32) -> Self {
        Self {
            index,
            hardened: false,
        }
    }

    /// Create a hardened component
    pub const fn hardened(index: u32) -> Self {
        Self {
            index,
            hardened: true,
        }
    }

    /// Fetch encoded u32 value (with hardened bit applied)
    pub const fn value(&self) -> u32 {
        match self.hardened {
            true => self.index | HARDENED,
            false => self.index,
        }
    }
}

impl From<u32> for ChildNumber {
    fn from(v: u32) -> Self {
        Self {
            index: v & !HARDENED,
            hardened: v & HARDENED != 0,
        }
    }
}

impl FromStr for ChildNumber {
    type Err = ApduError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digits, hardened) = match s.strip_suffix('\'') {
            Some(d) => (d, true),
            None => (s, false),
        };

        // `u32::from_str` accepts a leading `+`, the path grammar does not
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ApduError::MalformedPath);
        }

        let index = u32::from_str(digits).map_err(|_| ApduError::MalformedPath)?;
        if index & HARDENED != 0 {
            return Err(ApduError::MalformedPath);
        }

        Ok(Self { index, hardened })
    }
}

impl Display for ChildNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self.hardened {
            true => write!(f, "{}'", self.index),
            false => write!(f, "{}", self.index),
        }
    }
}

/// BIP32 derivation path
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    /// Create a derivation path from components
    pub fn new(components: Vec<ChildNumber>) -> Self {
        Self(components)
    }

    /// Path components
    pub fn components(&self) -> &[ChildNumber] {
        &self.0
    }

    /// Number of path components
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the path is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode components as big-endian u32 values (4 bytes per component)
    pub fn encode(&self) -> Vec<u8> {
        self.0.iter().flat_map(|c| c.value().to_be_bytes()).collect()
    }

    /// Decode a path from big-endian u32 values
    pub fn decode(buff: &[u8]) -> Result<Self, ApduError> {
        if buff.len() % 4 != 0 {
            return Err(ApduError::MalformedPath);
        }

        let components = buff
            .chunks_exact(4)
            .map(|c| ChildNumber::from(u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
            .collect();

        Ok(Self(components))
    }

    /// Encode the path with the leading component count expected by the device
    pub fn to_prefixed_bytes(&self) -> Result<Vec<u8>, ApduError> {
        let mut buff = alloc::vec![0u8; self.encode_len()?];
        let n = Encode::encode(self, &mut buff)?;
        buff.truncate(n);
        Ok(buff)
    }
}

/// Path depth is forwarded as-is, the device rejects paths that are too deep
impl FromStr for DerivationPath {
    type Err = ApduError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::default());
        }

        let components = s
            .split('/')
            .map(ChildNumber::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(components))
    }
}

impl Display for DerivationPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl From<Vec<ChildNumber>> for DerivationPath {
    fn from(components: Vec<ChildNumber>) -> Self {
        Self(components)
    }
}

/// Count-prefixed encoding, as placed in request payloads
impl Encode for DerivationPath {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        if self.0.len() > u8::MAX as usize {
            return Err(ApduError::PayloadTooLarge);
        }

        Ok(1 + self.0.len() * 4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.0.len() as u8;
        for (i, c) in self.0.iter().enumerate() {
            buff[1 + i * 4..][..4].copy_from_slice(&c.value().to_be_bytes());
        }

        Ok(n)
    }
}

impl DecodeOwned for DerivationPath {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let n = 1 + buff[0] as usize * 4;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        let p = Self::decode(&buff[1..n])?;

        Ok((p, n))
    }
}
