// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Public key / address APDUs

use alloc::{string::String, vec::Vec};

use encdec::{DecodeOwned, Encode};

use crate::{path::DerivationPath, ApduError, Command, Instruction};

/// `P1` requesting on-device confirmation of the returned address
pub const P1_CONFIRM: u8 = 0x01;

/// `P1` returning the key without user interaction
pub const P1_NON_CONFIRM: u8 = 0x00;

/// Chain code length
pub const CHAIN_CODE_LEN: usize = 32;

bitflags::bitflags! {
    /// Public key / sign `P2` flags
    pub struct P2Flags: u8 {
        /// Return the BIP32 chain code with the key
        const CHAIN_CODE = 0x01;

        /// Derive on secp256k1
        const SECP256K1 = 0x40;

        /// Derive on ed25519
        const ED25519 = 0x80;
    }
}

/// Key derivation curve
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Default, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Curve {
    #[default]
    Secp256k1,
    Ed25519,
}

impl Curve {
    /// Fetch `P2` flags for this curve
    pub const fn flags(&self) -> P2Flags {
        match self {
            Curve::Secp256k1 => P2Flags::SECP256K1,
            Curve::Ed25519 => P2Flags::ED25519,
        }
    }
}

/// Fetch public key request APDU
///
/// ## Encoding
///
/// Payload is the count-prefixed derivation path, see [crate::path].
/// Confirmation is requested via `P1`, curve and chain code via `P2`.
#[derive(Clone, PartialEq, Debug)]
pub struct PublicKeyReq {
    /// Derivation path
    pub path: DerivationPath,

    /// Display and request confirmation of the address on the device
    pub confirm: bool,

    /// Derivation curve
    pub curve: Curve,

    /// Request chain code
    pub chain_code: bool,
}

impl PublicKeyReq {
    /// Create a new public key request
    pub fn new(path: DerivationPath, confirm: bool, curve: Curve, chain_code: bool) -> Self {
        Self {
            path,
            confirm,
            curve,
            chain_code,
        }
    }

    /// Compute `P2` flags
    pub fn flags(&self) -> P2Flags {
        let mut f = self.curve.flags();
        if self.chain_code {
            f |= P2Flags::CHAIN_CODE;
        }
        f
    }
}

impl Command for PublicKeyReq {
    const INS: Instruction = Instruction::GetPublicKey;

    fn p1(&self) -> u8 {
        match self.confirm {
            true => P1_CONFIRM,
            false => P1_NON_CONFIRM,
        }
    }

    fn p2(&self) -> u8 {
        self.flags().bits()
    }
}

impl Encode for PublicKeyReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        self.path.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        Encode::encode(&self.path, buff)
    }
}

/// Public key response APDU
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    KEY_LEN    |                  PUBLIC_KEY...                /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   ADDR_LEN    |               ADDRESS (base58)...             /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /               CHAIN_CODE (32 bytes, when requested)           /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PublicKeyResp {
    /// Public key (33 bytes, compressed secp256k1 or `0xED` prefixed ed25519)
    pub public_key: Vec<u8>,

    /// Account address
    pub address: String,

    /// BIP32 chain code
    pub chain_code: Option<[u8; CHAIN_CODE_LEN]>,
}

impl PublicKeyResp {
    /// Create a new public key response
    pub fn new(
        public_key: Vec<u8>,
        address: String,
        chain_code: Option<[u8; CHAIN_CODE_LEN]>,
    ) -> Self {
        Self {
            public_key,
            address,
            chain_code,
        }
    }
}

/// Read a single length-prefixed field
fn read_field(buff: &[u8]) -> Result<(&[u8], usize), ApduError> {
    let n = *buff.first().ok_or(ApduError::TruncatedResponse)? as usize;
    let d = buff.get(1..1 + n).ok_or(ApduError::TruncatedResponse)?;
    Ok((d, 1 + n))
}

impl Encode for PublicKeyResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        if self.public_key.len() > u8::MAX as usize || self.address.len() > u8::MAX as usize {
            return Err(ApduError::PayloadTooLarge);
        }

        let mut n = 2 + self.public_key.len() + self.address.len();
        if self.chain_code.is_some() {
            n += CHAIN_CODE_LEN;
        }

        Ok(n)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;

        // Write key
        buff[index] = self.public_key.len() as u8;
        buff[index + 1..][..self.public_key.len()].copy_from_slice(&self.public_key);
        index += 1 + self.public_key.len();

        // Write address
        buff[index] = self.address.len() as u8;
        buff[index + 1..][..self.address.len()].copy_from_slice(self.address.as_bytes());
        index += 1 + self.address.len();

        // Write chain code if present
        if let Some(c) = &self.chain_code {
            buff[index..][..CHAIN_CODE_LEN].copy_from_slice(c);
            index += CHAIN_CODE_LEN;
        }

        Ok(index)
    }
}

impl DecodeOwned for PublicKeyResp {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let mut index = 0;

        // Fetch key
        let (public_key, n) = read_field(buff)?;
        index += n;

        // Fetch address
        let (address, n) = read_field(&buff[index..])?;
        let address = core::str::from_utf8(address).map_err(|_| ApduError::InvalidUtf8)?;
        index += n;

        // Remaining bytes, if any, must be exactly one chain code
        let chain_code = match buff.len() - index {
            0 => None,
            CHAIN_CODE_LEN => {
                let mut c = [0u8; CHAIN_CODE_LEN];
                c.copy_from_slice(&buff[index..]);
                index += CHAIN_CODE_LEN;
                Some(c)
            }
            r if r < CHAIN_CODE_LEN => return Err(ApduError::TruncatedResponse),
            _ => return Err(ApduError::TrailingData),
        };

        Ok((
            Self {
                public_key: public_key.to_vec(),
                address: String::from(address),
                chain_code,
            },
            index,
        ))
    }
}
