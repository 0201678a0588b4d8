// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Ledger XRP API Library (and CLI)
//!
//! Provides a [DeviceHandle] driving the XRP application protocol (public
//! keys, configuration, chunked transaction signing) over any
//! [ledger_lib::Exchange] transport, and post-signing signature verification.
//!
//! Device discovery and transports (USB/HID, BLE, Speculos TCP) are provided
//! by [ledger_lib], see [GenericHandle::connect].

/// Re-export `ledger-lib` transports and discovery for consumers
pub use ledger_lib::{
    self, transport, Exchange, Filters, LedgerHandle, LedgerInfo, LedgerProvider, Transport,
};

/// Re-export `ledger-xrp-apdu` for consumers
pub use ledger_xrp_apdu::{self as apdu};

mod handle;
pub use handle::{DeviceHandle, DEFAULT_REQUEST_TIMEOUT};

mod error;
pub use error::Error;

pub mod sign;
pub use sign::{Pending, PendingSignature, SignResult, SignState};

pub mod verify;
pub use verify::{SigningMode, VerificationContext};

/// Generic ledger device handle, backed by a [LedgerProvider] connection
pub type GenericHandle = DeviceHandle<LedgerHandle>;

impl GenericHandle {
    /// Connect to a device listed by [LedgerProvider]
    pub async fn connect(p: &mut LedgerProvider, info: LedgerInfo) -> Result<Self, Error> {
        log::debug!("Connecting to device: {}", info);

        let d = p.connect(info).await?;

        Ok(Self::from(d))
    }
}
