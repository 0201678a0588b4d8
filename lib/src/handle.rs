// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handle for connected ledger devices
//!
//! This provides methods for interacting with the XRP application
//! and is generic over [ledger_lib::Exchange] transports

use std::{sync::Arc, time::Duration};

use encdec::DecodeOwned;
use ledger_lib::Exchange;
use log::{debug, trace, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};

use ledger_xrp_apdu::{
    chunk::DEFAULT_CHUNK_SIZE,
    frame::{Frame, Response},
    path::DerivationPath,
    prelude::{AppConfigReq, AppConfigResp, PublicKeyReq, PublicKeyResp, SignReq},
    public_key::Curve,
    status::{Status, StatusTable, SW_SUCCESS},
    ProtocolVersion,
};

use crate::{
    sign::{Pending, PendingSignature, SignMachine, SignResult, SignState},
    Error,
};

/// Default timeout for requests not requiring user interaction
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeout passed to the transport for each exchange
///
/// Exchanges are never cut short, request and user timeouts bound how long
/// the caller waits for the response instead.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// XRP handle for a connected ledger device.
///
/// This is generic over [Exchange] types to support different
/// underlying transports. Frames are strictly sequential, the transport is
/// locked for the duration of each operation (including any pending
/// on-device confirmation or late response).
pub struct DeviceHandle<T: Exchange> {
    /// Transport for communication
    t: Arc<Mutex<T>>,
    /// Protocol version (chunk markers and status table)
    protocol: ProtocolVersion,
    /// Timeout for APDU requests
    request_timeout: Duration,
    /// Maximum payload per chunk
    max_chunk_size: usize,
}

/// Create a [DeviceHandle] wrapper from a type implementing [Exchange]
impl<T: Exchange> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
            protocol: ProtocolVersion::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl<T: Exchange> Clone for DeviceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            t: self.t.clone(),
            protocol: self.protocol,
            request_timeout: self.request_timeout,
            max_chunk_size: self.max_chunk_size,
        }
    }
}

impl<T: Exchange + Send + 'static> DeviceHandle<T> {
    /// Set the protocol version for this session
    pub fn with_protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the timeout for requests not requiring user interaction
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the maximum payload per chunk for signing requests
    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    /// Fetch the session protocol version
    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    /// Fetch application configuration (version)
    pub async fn get_configuration(&self) -> Result<AppConfigResp, Error> {
        debug!("Requesting app configuration");

        let f = Frame::from_command(&AppConfigReq {})?;

        let t = self.t.clone().lock_owned().await;
        let (_, r) = exchange(t, f, self.request_timeout).await?;
        let data = check_status(self.protocol.status_table(), r)?;

        let (v, _) = AppConfigResp::decode_owned(&data)?;

        Ok(v)
    }

    /// Fetch the public key and address for a derivation path
    ///
    /// With `confirm` set this waits (without timeout) for the user to
    /// approve the address on the device, see [DeviceHandle::request_public_key]
    /// to drive this in two phases.
    pub async fn get_public_key(
        &self,
        path: &DerivationPath,
        confirm: bool,
        curve: Curve,
        chain_code: bool,
    ) -> Result<PublicKeyResp, Error> {
        if !confirm {
            debug!("Requesting public key for path: {}", path);

            let f = Frame::from_command(&PublicKeyReq::new(path.clone(), false, curve, chain_code))?;

            let t = self.t.clone().lock_owned().await;
            let (_, r) = exchange(t, f, self.request_timeout).await?;
            let data = check_status(self.protocol.status_table(), r)?;

            return decode_public_key(&data);
        }

        self.request_public_key(path, curve, chain_code)
            .await?
            .wait()
            .await
    }

    /// Submit a public key request requiring on-device confirmation,
    /// returning a [Pending] handle resolved once the user responds
    pub async fn request_public_key(
        &self,
        path: &DerivationPath,
        curve: Curve,
        chain_code: bool,
    ) -> Result<Pending<PublicKeyResp>, Error> {
        debug!("Requesting confirmed public key for path: {}", path);

        if self.protocol == ProtocolVersion::Legacy && chain_code {
            warn!("Combining confirm and chain code is deprecated on legacy firmware");
        }

        let f = Frame::from_command(&PublicKeyReq::new(path.clone(), true, curve, chain_code))?;
        let table = self.protocol.status_table();

        let t = self.t.clone().lock_owned().await;
        let handle = tokio::spawn(async move {
            let (_, r) = transfer(t, f).await;
            let data = check_status(table, r?)?;
            decode_public_key(&data)
        });

        Ok(Pending::new(handle))
    }

    /// Sign a serialized transaction
    ///
    /// All chunks but the last are sent immediately, each must succeed
    /// before the next is sent. The last chunk is submitted and a
    /// [PendingSignature] returned without waiting for the user.
    pub async fn sign(
        &self,
        path: &DerivationPath,
        curve: Curve,
        tx: &[u8],
    ) -> Result<PendingSignature, Error> {
        let (machine, state) = SignMachine::new();

        // Build all frames before touching the transport
        let req = SignReq::new(path.clone(), curve, tx);
        let mut frames = match req.frames(self.protocol.marker_scheme(), self.max_chunk_size) {
            Ok(v) => v,
            Err(e) => {
                machine.set(SignState::Error);
                return Err(e.into());
            }
        };

        let last = match frames.pop() {
            Some(f) => f,
            None => {
                machine.set(SignState::Error);
                return Err(Error::UnexpectedResponse);
            }
        };

        debug!(
            "Signing {} byte transaction for path: {} ({} chunks)",
            tx.len(),
            path,
            frames.len() + 1
        );

        let table = self.protocol.status_table();
        let mut t = self.t.clone().lock_owned().await;

        // Send leading chunks, aborting on the first failure
        machine.set(SignState::SendingChunks);
        for (i, f) in frames.into_iter().enumerate() {
            trace!("Sending chunk {} (p1: 0x{:02x})", i, f.p1);

            let r = exchange(t, f, self.request_timeout)
                .await
                .and_then(|(t, r)| check_status(table, r).map(|_| t));

            t = match r {
                Ok(t) => t,
                Err(e) => {
                    debug!("Chunk {} failed: {}", i, e);
                    machine.fail(&e);
                    return Err(e);
                }
            };
        }

        // Submit final chunk and await confirmation in the background
        machine.set(SignState::AwaitingConfirmation);
        let handle = tokio::spawn(async move {
            let (_, r) = transfer(t, last).await;

            match r.and_then(|r| check_status(table, r)) {
                Ok(signature) if !signature.is_empty() => {
                    machine.set(SignState::Complete);
                    Ok(SignResult {
                        status: SW_SUCCESS,
                        signature,
                    })
                }
                Ok(_) => {
                    machine.set(SignState::Error);
                    Err(Error::UnexpectedResponse)
                }
                Err(e) => {
                    machine.fail(&e);
                    Err(e)
                }
            }
        });

        Ok(PendingSignature {
            pending: Pending::new(handle),
            state,
        })
    }
}

/// Exchange a frame in a background task holding the transport lock,
/// returning the transport with the response
///
/// When `timeout` elapses the caller receives [Error::RequestTimeout] while
/// the exchange runs on, so the late response is consumed before the lock
/// is released and never read in reply to a later frame.
async fn exchange<T: Exchange + Send + 'static>(
    t: OwnedMutexGuard<T>,
    f: Frame,
    timeout: Duration,
) -> Result<(OwnedMutexGuard<T>, Response), Error> {
    let handle = tokio::spawn(transfer(t, f));

    let (t, r) = match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => {
            debug!("Exchange task failed: {}", e);
            return Err(Error::Aborted);
        }
        Err(e) => {
            warn!("Request timeout, transport held until the device responds");
            return Err(e.into());
        }
    };

    Ok((t, r?))
}

/// Exchange a single frame with the locked transport
async fn transfer<T: Exchange + Send>(
    mut t: OwnedMutexGuard<T>,
    f: Frame,
) -> (OwnedMutexGuard<T>, Result<Response, Error>) {
    let req = f.encode();
    trace!("TX: {:02x?}", req);

    let r = match t.exchange(&req, EXCHANGE_TIMEOUT).await {
        Ok(resp) => {
            trace!("RX: {:02x?}", resp);
            Response::parse(&resp).map_err(Error::from)
        }
        Err(e) => Err(e.into()),
    };

    (t, r)
}

/// Check response status, returning response data on success
fn check_status(table: StatusTable, r: Response) -> Result<Vec<u8>, Error> {
    match table.decode(r.status) {
        Status::Success => Ok(r.data),
        Status::Failure(kind) => Err(Error::Device {
            kind,
            status: r.status,
        }),
    }
}

fn decode_public_key(data: &[u8]) -> Result<PublicKeyResp, Error> {
    let (k, _) = PublicKeyResp::decode_owned(data)?;
    Ok(k)
}
