// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / APDU definitions for XRP Ledger app communication
//!
//! This module provides the host side of the XRP hardware wallet protocol:
//! derivation path encoding, single frame construction and response parsing,
//! splitting of oversized signing payloads into chained frames, and the
//! status word taxonomy used by current and legacy firmware.
//!
//! Frames follow the usual APDU layout `[CLA][INS][P1][P2][LEN][DATA]` with a
//! single length byte, so payloads are limited to 255 bytes. Unlike the
//! field encodings of many ledger apps, all multi-byte integers here are
//! big-endian to match the device firmware.
//!
//! Payload types implement [encdec::Encode] (and [encdec::DecodeOwned] where
//! a response needs decoding) and declare their header through [Command].

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod app_config;
pub mod chunk;
pub mod frame;
pub mod path;
pub mod prelude;
pub mod public_key;
pub mod sign;
pub mod status;

mod error;
pub use error::ApduError;

/// XRP APDU Class
pub const XRP_APDU_CLA: u8 = 0xe0;

/// XRP APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[repr(u8)]
pub enum Instruction {
    /// Derive and fetch a public key and address
    GetPublicKey = 0x02,

    /// Sign a (possibly chunked) transaction
    Sign = 0x04,

    /// Fetch application version
    GetConfiguration = 0x06,
}

/// Firmware protocol generation, selects the chunk marker scheme and status table
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Default, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ProtocolVersion {
    /// Current firmware, bit-flag chunk markers
    #[default]
    Current,
    /// Legacy firmware, enumerated chunk markers
    Legacy,
}

impl ProtocolVersion {
    /// Fetch the chunk marker scheme for this protocol version
    pub fn marker_scheme(&self) -> &'static dyn chunk::MarkerScheme {
        match self {
            ProtocolVersion::Current => &chunk::BitFlagScheme,
            ProtocolVersion::Legacy => &chunk::EnumeratedScheme,
        }
    }

    /// Fetch the status word table for this protocol version
    pub fn status_table(&self) -> status::StatusTable {
        match self {
            ProtocolVersion::Current => status::StatusTable::Current,
            ProtocolVersion::Legacy => status::StatusTable::Legacy,
        }
    }
}

/// Static command header information for request payloads
pub trait Command {
    /// Command class
    const CLA: u8 = XRP_APDU_CLA;

    /// Command instruction
    const INS: Instruction;

    /// First parameter byte
    fn p1(&self) -> u8 {
        0x00
    }

    /// Second parameter byte
    fn p2(&self) -> u8 {
        0x00
    }
}

#[cfg(test)]
pub(crate) mod test {
    use alloc::vec;

    use encdec::Encode;

    use super::*;
    use crate::frame::Frame;

    /// Helper for request encode tests, returns the full encoded frame
    pub fn encode_command<C: Command + Encode<Error = ApduError>>(cmd: &C) -> alloc::vec::Vec<u8> {
        // Check encoded length matches expected length
        let expected_n = cmd.encode_len().expect("get length failed");
        let mut buff = vec![0u8; expected_n];
        let n = cmd.encode(&mut buff).expect("encode failed");
        assert_eq!(n, expected_n, "encode length mismatch");

        // Ensure encoded data fits a single frame
        assert!(n <= 255, "encoded length {n} exceeds maximum APDU payload");

        let f = Frame::from_command(cmd).expect("frame build failed");
        assert_eq!(f.data, buff);

        f.encode()
    }

    #[test]
    fn instruction_codes() {
        use core::convert::TryFrom;

        assert_eq!(Instruction::try_from(0x02), Ok(Instruction::GetPublicKey));
        assert_eq!(Instruction::try_from(0x04), Ok(Instruction::Sign));
        assert_eq!(Instruction::try_from(0x06), Ok(Instruction::GetConfiguration));
        assert!(Instruction::try_from(0x00).is_err());
    }

    #[test]
    fn protocol_versions() {
        use core::str::FromStr;

        use crate::chunk::ChunkMarker;

        assert_eq!(ProtocolVersion::from_str("legacy"), Ok(ProtocolVersion::Legacy));
        assert_eq!(ProtocolVersion::default(), ProtocolVersion::Current);

        let v = ProtocolVersion::Legacy;
        assert_eq!(v.marker_scheme().p1(ChunkMarker::Last), 0x03);
        assert_eq!(v.status_table(), status::StatusTable::Legacy);
    }
}
