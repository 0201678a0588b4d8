// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Post-signing signature verification
//!
//! The device signs a hash prefix followed by the serialized transaction.
//! Multi-signing additionally appends the signer's account ID, so the same
//! transaction can carry signatures from several accounts.
//!
//! - secp256k1 keys sign the first half of SHA-512 over the message (DER
//!   encoded ECDSA)
//! - ed25519 keys (33 bytes, `0xED` prefix) sign the message itself

use ed25519_dalek::Verifier;
use k256::ecdsa::{signature::hazmat::PrehashVerifier, Signature, VerifyingKey};
use log::debug;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};

/// Single signer hash prefix (`STX\0`)
pub const SINGLE_SIGN_PREFIX: [u8; 4] = *b"STX\0";

/// Multi signer hash prefix (`SMT\0`)
pub const MULTI_SIGN_PREFIX: [u8; 4] = *b"SMT\0";

/// Ed25519 public key marker byte
pub const ED25519_KEY_PREFIX: u8 = 0xed;

/// Transaction signing mode
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, strum::Display)]
pub enum SigningMode {
    /// Single signer
    #[default]
    Single,
    /// One of several signers
    Multi,
}

impl SigningMode {
    /// Select signing mode from the transaction `SigningPubKey` field,
    /// an empty (present) value indicates multi-signing
    pub fn from_signing_pub_key(v: Option<&str>) -> Self {
        match v {
            Some("") => SigningMode::Multi,
            _ => SigningMode::Single,
        }
    }

    /// Hash prefix for this mode
    pub fn prefix(&self) -> &'static [u8; 4] {
        match self {
            SigningMode::Single => &SINGLE_SIGN_PREFIX,
            SigningMode::Multi => &MULTI_SIGN_PREFIX,
        }
    }
}

/// Parsed public key
enum Key {
    Secp256k1(VerifyingKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl Key {
    fn parse(public_key: &[u8]) -> Option<Self> {
        match public_key {
            [ED25519_KEY_PREFIX, k @ ..] if k.len() == 32 => {
                let mut b = [0u8; 32];
                b.copy_from_slice(k);
                ed25519_dalek::VerifyingKey::from_bytes(&b)
                    .ok()
                    .map(Key::Ed25519)
            }
            _ => VerifyingKey::from_sec1_bytes(public_key)
                .ok()
                .map(Key::Secp256k1),
        }
    }

    /// Canonical 33-byte key encoding
    fn to_bytes(&self) -> Vec<u8> {
        match self {
            Key::Secp256k1(k) => k.to_encoded_point(true).as_bytes().to_vec(),
            Key::Ed25519(k) => {
                let mut b = vec![ED25519_KEY_PREFIX];
                b.extend_from_slice(k.as_bytes());
                b
            }
        }
    }
}

/// Compute the account ID (`RIPEMD160(SHA256(key))`) for a canonical public key
pub fn account_id(public_key: &[u8]) -> [u8; 20] {
    let h = Ripemd160::digest(Sha256::digest(public_key));

    let mut id = [0u8; 20];
    id.copy_from_slice(&h);
    id
}

/// Compute the signing digest (first 32 bytes of SHA-512)
pub fn signing_digest(message: &[u8]) -> [u8; 32] {
    let h = Sha512::digest(message);

    let mut d = [0u8; 32];
    d.copy_from_slice(&h[..32]);
    d
}

/// Build the message signed by the device
///
/// Returns `None` if the public key cannot be parsed.
pub fn signing_message(tx: &[u8], public_key: &[u8], mode: SigningMode) -> Option<Vec<u8>> {
    let key = Key::parse(public_key)?;
    Some(build_message(tx, &key, mode))
}

fn build_message(tx: &[u8], key: &Key, mode: SigningMode) -> Vec<u8> {
    let mut m = Vec::with_capacity(4 + tx.len() + 20);

    m.extend_from_slice(mode.prefix());
    m.extend_from_slice(tx);
    if mode == SigningMode::Multi {
        m.extend_from_slice(&account_id(&key.to_bytes()));
    }

    m
}

/// Verify a device signature over a transaction
///
/// Malformed keys or signatures fail verification.
pub fn verify(tx: &[u8], signature: &[u8], public_key: &[u8], mode: SigningMode) -> bool {
    let key = match Key::parse(public_key) {
        Some(k) => k,
        None => {
            debug!("Invalid public key: {:02x?}", public_key);
            return false;
        }
    };

    let message = build_message(tx, &key, mode);

    match key {
        Key::Secp256k1(k) => {
            let sig = match Signature::from_der(signature) {
                Ok(s) => s,
                Err(_) => {
                    debug!("Invalid DER signature: {:02x?}", signature);
                    return false;
                }
            };
            let sig = sig.normalize_s().unwrap_or(sig);

            k.verify_prehash(&signing_digest(&message), &sig).is_ok()
        }
        Key::Ed25519(k) => {
            let sig = match ed25519_dalek::Signature::from_slice(signature) {
                Ok(s) => s,
                Err(_) => {
                    debug!("Invalid ed25519 signature: {:02x?}", signature);
                    return false;
                }
            };

            k.verify(&message, &sig).is_ok()
        }
    }
}

/// Inputs for verifying a completed signing operation
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationContext<'a> {
    /// Public key derived from the signing path
    pub public_key: &'a [u8],
    /// Signing mode used for the transaction
    pub mode: SigningMode,
    /// Serialized transaction
    pub tx: &'a [u8],
    /// Signature returned by the device
    pub signature: &'a [u8],
}

impl<'a> VerificationContext<'a> {
    /// Create a new verification context
    pub fn new(public_key: &'a [u8], mode: SigningMode, tx: &'a [u8], signature: &'a [u8]) -> Self {
        Self {
            public_key,
            mode,
            tx,
            signature,
        }
    }

    /// Verify the signature
    pub fn verify(self) -> bool {
        verify(self.tx, self.signature, self.public_key, self.mode)
    }
}
