// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Status words and error kinds
//!
//! Every response ends in a two-byte status word. `0x9000` signals success,
//! all other values are mapped to an [ErrorKind] through a [StatusTable]
//! selected for the protocol generation in use. The literal codes differ
//! between generations, the [ErrorKind] set does not.

use strum::{Display, EnumIter};

/// Success status word
pub const SW_SUCCESS: u16 = 0x9000;

/// Device reported error kinds
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter)]
pub enum ErrorKind {
    /// Payload or transaction length rejected
    WrongLength,
    /// Required parameter missing
    MissingParameter,
    /// Transaction parser failed (stage given by the status word)
    InternalParsingError,
    /// Device locked / security conditions not met
    SecurityStatusNotSatisfied,
    /// Operation rejected by the user
    UserRejected,
    /// Derivation path rejected
    InvalidPath,
    /// Data rejected
    InvalidData,
    /// P1 / P2 rejected
    InvalidParameters,
    /// Instruction not supported by the application
    InstructionNotSupported,
    /// Class not supported by the application
    ClassNotSupported,
    /// Device side signature check failed
    SignatureVerifyError,
    /// Unrecognised status word
    Unknown,
}

/// Decoded status word
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Status {
    Success,
    Failure(ErrorKind),
}

impl Status {
    /// Convert to a result, for `?` use
    pub fn into_result(self) -> Result<(), ErrorKind> {
        match self {
            Status::Success => Ok(()),
            Status::Failure(k) => Err(k),
        }
    }
}

/// Versioned status word lookup table
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum StatusTable {
    /// Current firmware
    Current,
    /// Legacy firmware, fewer distinguished kinds
    Legacy,
}

const CURRENT: &[(u16, ErrorKind)] = &[
    (0x6700, ErrorKind::WrongLength),
    (0x6800, ErrorKind::MissingParameter),
    (0x6803, ErrorKind::InternalParsingError),
    (0x6807, ErrorKind::InternalParsingError),
    (0x6813, ErrorKind::InternalParsingError),
    (0x6982, ErrorKind::SecurityStatusNotSatisfied),
    (0x6985, ErrorKind::UserRejected),
    (0x6A80, ErrorKind::InvalidPath),
    (0x6A81, ErrorKind::InvalidData),
    (0x6B00, ErrorKind::InvalidParameters),
    (0x6D00, ErrorKind::InstructionNotSupported),
    (0x6E00, ErrorKind::ClassNotSupported),
    (0x6F00, ErrorKind::Unknown),
    (0x6F01, ErrorKind::SignatureVerifyError),
];

const LEGACY: &[(u16, ErrorKind)] = &[
    (0x6700, ErrorKind::WrongLength),
    (0x6982, ErrorKind::SecurityStatusNotSatisfied),
    (0x6985, ErrorKind::UserRejected),
    (0x6A80, ErrorKind::InvalidData),
    (0x6A81, ErrorKind::InvalidPath),
    (0x6B00, ErrorKind::InvalidParameters),
    (0x6D00, ErrorKind::InstructionNotSupported),
    (0x6E00, ErrorKind::ClassNotSupported),
    (0x6F00, ErrorKind::Unknown),
];

impl StatusTable {
    fn entries(&self) -> &'static [(u16, ErrorKind)] {
        match self {
            StatusTable::Current => CURRENT,
            StatusTable::Legacy => LEGACY,
        }
    }

    /// Decode a status word, total over all `u16` values
    pub fn decode(&self, sw: u16) -> Status {
        if sw == SW_SUCCESS {
            return Status::Success;
        }

        let kind = self
            .entries()
            .iter()
            .find(|(code, _)| *code == sw)
            .map(|(_, k)| *k)
            .unwrap_or(ErrorKind::Unknown);

        Status::Failure(kind)
    }

    /// Fetch the status word reported for an error kind (first match)
    pub fn status_word(&self, kind: ErrorKind) -> Option<u16> {
        self.entries()
            .iter()
            .find(|(_, k)| *k == kind)
            .map(|(code, _)| *code)
    }
}

impl Default for StatusTable {
    fn default() -> Self {
        StatusTable::Current
    }
}

#[cfg(test)]
mod test {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn current_table() {
        let t = StatusTable::Current;

        let expected = [
            (0x9000, Status::Success),
            (0x6700, Status::Failure(ErrorKind::WrongLength)),
            (0x6800, Status::Failure(ErrorKind::MissingParameter)),
            (0x6803, Status::Failure(ErrorKind::InternalParsingError)),
            (0x6807, Status::Failure(ErrorKind::InternalParsingError)),
            (0x6813, Status::Failure(ErrorKind::InternalParsingError)),
            (0x6982, Status::Failure(ErrorKind::SecurityStatusNotSatisfied)),
            (0x6985, Status::Failure(ErrorKind::UserRejected)),
            (0x6A80, Status::Failure(ErrorKind::InvalidPath)),
            (0x6A81, Status::Failure(ErrorKind::InvalidData)),
            (0x6B00, Status::Failure(ErrorKind::InvalidParameters)),
            (0x6F00, Status::Failure(ErrorKind::Unknown)),
            (0x6F01, Status::Failure(ErrorKind::SignatureVerifyError)),
        ];

        for (sw, s) in expected {
            assert_eq!(t.decode(sw), s, "status word {sw:04x}");
        }
    }

    #[test]
    fn legacy_table() {
        let t = StatusTable::Legacy;

        assert_eq!(t.decode(0x6A81), Status::Failure(ErrorKind::InvalidPath));
        assert_eq!(t.decode(0x6A80), Status::Failure(ErrorKind::InvalidData));
        assert_eq!(t.decode(0x6803), Status::Failure(ErrorKind::Unknown));
        assert_eq!(t.decode(0x6F01), Status::Failure(ErrorKind::Unknown));
        assert_eq!(t.decode(0x9000), Status::Success);
    }

    #[test]
    fn decode_is_total() {
        for t in [StatusTable::Current, StatusTable::Legacy] {
            for sw in 0..=u16::MAX {
                match t.decode(sw) {
                    Status::Success => assert_eq!(sw, SW_SUCCESS),
                    Status::Failure(k) => {
                        if t.entries().iter().all(|(c, _)| *c != sw) {
                            assert_eq!(k, ErrorKind::Unknown);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn status_word_lookup() {
        let t = StatusTable::Current;

        for k in ErrorKind::iter() {
            let sw = t.status_word(k).expect("every kind has a current status word");
            assert_eq!(t.decode(sw), Status::Failure(k));
        }

        assert_eq!(StatusTable::Legacy.status_word(ErrorKind::MissingParameter), None);
    }
}
