// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Application configuration APDUs

use core::fmt::{Display, Formatter};

use encdec::{DecodeOwned, Encode};

use crate::{ApduError, Command, Instruction};

/// Fetch application configuration APDU
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct AppConfigReq {}

impl Command for AppConfigReq {
    const INS: Instruction = Instruction::GetConfiguration;
}

impl Encode for AppConfigReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

/// Application configuration response APDU
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  TEST (0x00)  |     MAJOR     |     MINOR     |     PATCH     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AppConfigResp {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl AppConfigResp {
    /// Create a new configuration response
    pub fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Display for AppConfigResp {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Encode for AppConfigResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        buff[..4].copy_from_slice(&[0x00, self.major, self.minor, self.patch]);

        Ok(4)
    }
}

impl DecodeOwned for AppConfigResp {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        match buff {
            [0x00, major, minor, patch] => Ok((Self::new(*major, *minor, *patch), 4)),
            _ => Err(ApduError::UnexpectedConfigurationFormat),
        }
    }
}

#[cfg(test)]
mod test {
    use alloc::string::ToString;

    use super::*;
    use crate::test::encode_command;

    #[test]
    fn app_config_req_apdu() {
        assert_eq!(encode_command(&AppConfigReq::default()), [0xe0, 0x06, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn decode_app_config_resp() {
        let (v, n) = AppConfigResp::decode_owned(&[0, 1, 2, 3]).unwrap();

        assert_eq!(n, 4);
        assert_eq!(v, AppConfigResp::new(1, 2, 3));
        assert_eq!(v.to_string(), "1.2.3");
    }

    #[test]
    fn decode_app_config_resp_invalid() {
        let bad: [&[u8]; 4] = [&[1, 1, 2, 3], &[0, 1, 2], &[0, 1, 2, 3, 4], &[]];

        for b in bad {
            assert_eq!(
                AppConfigResp::decode_owned(b),
                Err(ApduError::UnexpectedConfigurationFormat),
                "expected {b:02x?} to be rejected"
            );
        }
    }

    #[test]
    fn encode_app_config_resp() {
        let mut buff = [0u8; 4];
        AppConfigResp::new(1, 0, 7).encode(&mut buff).unwrap();
        assert_eq!(buff, [0, 1, 0, 7]);
    }
}
