// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Single command / response frames
//!
//! ## Command encoding
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      CLA      |      INS      |      P1       |      P2       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      LEN      |               DATA (LEN bytes)...             /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! ## Response encoding
//!
//! ```text
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                            DATA...                            /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |       SW (u16 BE)             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use alloc::vec::Vec;

use encdec::Encode;

use crate::{
    status::{Status, StatusTable, SW_SUCCESS},
    ApduError, Command,
};

/// Maximum frame payload length
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// Frame header length
pub const HEADER_LEN: usize = 5;

/// Command frame
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Frame {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a new frame, failing if the payload exceeds [MAX_PAYLOAD_LEN]
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Result<Self, ApduError> {
        if data.len() > MAX_PAYLOAD_LEN {
            return Err(ApduError::PayloadTooLarge);
        }

        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            data,
        })
    }

    /// Build a frame from an encodable [Command]
    pub fn from_command<C>(cmd: &C) -> Result<Self, ApduError>
    where
        C: Command + Encode<Error = ApduError>,
    {
        let n = cmd.encode_len()?;
        if n > MAX_PAYLOAD_LEN {
            return Err(ApduError::PayloadTooLarge);
        }

        let mut data = alloc::vec![0u8; n];
        let n = cmd.encode(&mut data)?;
        data.truncate(n);

        Self::new(C::CLA, C::INS as u8, cmd.p1(), cmd.p2(), data)
    }

    /// Encode frame to bytes for transmission
    pub fn encode(&self) -> Vec<u8> {
        let mut buff = Vec::with_capacity(HEADER_LEN + self.data.len());

        buff.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2, self.data.len() as u8]);
        buff.extend_from_slice(&self.data);

        buff
    }

    /// Parse an encoded frame, the inverse of [Frame::encode]
    pub fn parse(buff: &[u8]) -> Result<Self, ApduError> {
        if buff.len() < HEADER_LEN {
            return Err(ApduError::InvalidLength);
        }

        let n = buff[4] as usize;
        match buff.len() - HEADER_LEN {
            l if l < n => return Err(ApduError::InvalidLength),
            l if l > n => return Err(ApduError::TrailingData),
            _ => (),
        }

        Ok(Self {
            cla: buff[0],
            ins: buff[1],
            p1: buff[2],
            p2: buff[3],
            data: buff[HEADER_LEN..].to_vec(),
        })
    }
}

/// Response frame
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Response {
    /// Response payload
    pub data: Vec<u8>,
    /// Status word
    pub status: u16,
}

impl Response {
    /// Create a new response
    pub fn new(data: Vec<u8>, status: u16) -> Self {
        Self { data, status }
    }

    /// Split response bytes into payload and trailing big-endian status word
    pub fn parse(buff: &[u8]) -> Result<Self, ApduError> {
        if buff.len() < 2 {
            return Err(ApduError::TruncatedResponse);
        }

        let (data, sw) = buff.split_at(buff.len() - 2);

        Ok(Self {
            data: data.to_vec(),
            status: u16::from_be_bytes([sw[0], sw[1]]),
        })
    }

    /// Encode response to bytes (used by simulated devices)
    pub fn encode(&self) -> Vec<u8> {
        let mut buff = Vec::with_capacity(self.data.len() + 2);
        buff.extend_from_slice(&self.data);
        buff.extend_from_slice(&self.status.to_be_bytes());
        buff
    }

    /// Check whether the response carries the success status word
    pub fn is_success(&self) -> bool {
        self.status == SW_SUCCESS
    }

    /// Decode the status word with the provided table
    pub fn status(&self, table: StatusTable) -> Status {
        table.decode(self.status)
    }
}

#[cfg(test)]
mod test {
    use alloc::vec;

    use super::*;
    use crate::status::ErrorKind;

    #[test]
    fn build_frame() {
        let f = Frame::new(0xe0, 0x02, 0x01, 0x40, vec![0xaa, 0xbb]).unwrap();
        assert_eq!(f.encode(), vec![0xe0, 0x02, 0x01, 0x40, 0x02, 0xaa, 0xbb]);
        assert_eq!(Frame::parse(&f.encode()), Ok(f));
    }

    #[test]
    fn build_empty_frame() {
        let f = Frame::new(0xe0, 0x06, 0x00, 0x00, vec![]).unwrap();
        assert_eq!(f.encode(), vec![0xe0, 0x06, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn frame_payload_limit() {
        assert!(Frame::new(0xe0, 0x04, 0, 0, vec![0u8; 255]).is_ok());
        assert_eq!(
            Frame::new(0xe0, 0x04, 0, 0, vec![0u8; 256]),
            Err(ApduError::PayloadTooLarge)
        );
    }

    #[test]
    fn parse_frame_length_mismatch() {
        assert_eq!(
            Frame::parse(&[0xe0, 0x04, 0, 0, 3, 1, 2]),
            Err(ApduError::InvalidLength)
        );
        assert_eq!(
            Frame::parse(&[0xe0, 0x04, 0, 0, 1, 1, 2]),
            Err(ApduError::TrailingData)
        );
    }

    #[test]
    fn parse_response() {
        let r = Response::parse(&[0x01, 0x02, 0x90, 0x00]).unwrap();
        assert_eq!(r.data, vec![0x01, 0x02]);
        assert_eq!(r.status, 0x9000);
        assert!(r.is_success());

        let r = Response::parse(&[0x69, 0x85]).unwrap();
        assert!(r.data.is_empty());
        assert_eq!(
            r.status(StatusTable::Current),
            Status::Failure(ErrorKind::UserRejected)
        );
    }

    #[test]
    fn parse_truncated_response() {
        assert_eq!(Response::parse(&[]), Err(ApduError::TruncatedResponse));
        assert_eq!(Response::parse(&[0x90]), Err(ApduError::TruncatedResponse));
    }
}
