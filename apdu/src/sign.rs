// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction signing APDUs
//!
//! Signing requests are the only requests that may exceed a single frame.
//! The payload is the count-prefixed derivation path followed by the raw
//! serialized transaction, split into a [ChunkSequence] and sent in order
//! with the chunk position in `P1` and the curve in `P2`.
//!
//! The final response carries the signature: DER encoded ECDSA for
//! secp256k1 keys, 64 raw bytes for ed25519 keys.

use alloc::vec::Vec;

use crate::{
    chunk::{ChunkSequence, MarkerScheme},
    frame::Frame,
    path::DerivationPath,
    public_key::Curve,
    ApduError, Instruction, XRP_APDU_CLA,
};

/// Transaction sign request
#[derive(Clone, PartialEq, Debug)]
pub struct SignReq<'a> {
    /// Derivation path of the signing key
    pub path: DerivationPath,

    /// Signing curve
    pub curve: Curve,

    /// Serialized transaction
    pub tx: &'a [u8],
}

impl<'a> SignReq<'a> {
    /// Create a new sign request
    pub fn new(path: DerivationPath, curve: Curve, tx: &'a [u8]) -> Self {
        Self { path, curve, tx }
    }

    /// `P2` value, carried on every chunk
    pub fn p2(&self) -> u8 {
        self.curve.flags().bits()
    }

    /// Split the request payload into chunks
    pub fn chunks(&self, max_chunk_size: usize) -> Result<ChunkSequence, ApduError> {
        let prefix = self.path.to_prefixed_bytes()?;
        ChunkSequence::split(&prefix, self.tx, max_chunk_size)
    }

    /// Build the frames for this request
    pub fn frames<S: MarkerScheme + ?Sized>(
        &self,
        scheme: &S,
        max_chunk_size: usize,
    ) -> Result<Vec<Frame>, ApduError> {
        self.chunks(max_chunk_size)?
            .frames(XRP_APDU_CLA, Instruction::Sign as u8, self.p2(), scheme)
    }
}
