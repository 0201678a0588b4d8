// Copyright (c) 2022-2023 The MobileCoin Foundation

use ledger_xrp_apdu::{status::ErrorKind, ApduError};
use tokio::time::error::Elapsed;

/// Ledger XRP API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport error
    #[error("Transport error: {0}")]
    Transport(ledger_lib::Error),

    /// Local framing / encoding error
    #[error("APDU error: {0}")]
    Apdu(ApduError),

    /// Device returned an error status word
    #[error("Device error: {kind} (status: 0x{status:04x})")]
    Device { kind: ErrorKind, status: u16 },

    /// Request timeout
    #[error("Timeout waiting for device response")]
    RequestTimeout,

    /// Timeout waiting for user
    #[error("Timeout waiting for user interaction")]
    UserTimeout,

    /// Unexpected APDU response
    #[error("Unexpected APDU response")]
    UnexpectedResponse,

    /// Pending operation was dropped before completion
    #[error("Pending operation aborted")]
    Aborted,

    /// No matching device
    #[error("No device found")]
    NoDevice,
}

impl Error {
    /// Fetch the device error kind, if this error was reported by the device
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Device { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Check whether the user rejected the operation on the device
    pub fn is_rejected(&self) -> bool {
        self.kind() == Some(ErrorKind::UserRejected)
    }
}

impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        Error::Apdu(e)
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}

impl From<ledger_lib::Error> for Error {
    fn from(e: ledger_lib::Error) -> Self {
        match e {
            ledger_lib::Error::Timeout => Error::RequestTimeout,
            ledger_lib::Error::NoDevices => Error::NoDevice,
            _ => Error::Transport(e),
        }
    }
}
