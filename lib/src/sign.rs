// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Pending operations and the signing state machine
//!
//! Operations requiring user interaction are split into two phases: the
//! request is submitted and a [Pending] handle returned immediately, the
//! caller may then drive any UI before resolving the handle with
//! [Pending::wait] or [Pending::wait_timeout].
//!
//! The device channel stays locked until the pending response resolves.

use std::time::Duration;

use log::{debug, warn};
use tokio::{sync::watch, task::JoinHandle};

use crate::Error;

/// Handle to an in-flight device operation
pub struct Pending<R> {
    handle: JoinHandle<Result<R, Error>>,
}

impl<R> Pending<R> {
    pub(crate) fn new(handle: JoinHandle<Result<R, Error>>) -> Self {
        Self { handle }
    }

    /// Check whether the device has responded
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the device to respond
    pub async fn wait(self) -> Result<R, Error> {
        match self.handle.await {
            Ok(r) => r,
            Err(e) => {
                debug!("Pending operation failed: {}", e);
                Err(Error::Aborted)
            }
        }
    }

    /// Wait for the device to respond, failing with [Error::UserTimeout]
    /// if no response arrives within `timeout`
    ///
    /// On timeout the exchange is left running (and the device locked)
    /// until the device responds.
    pub async fn wait_timeout(self, timeout: Duration) -> Result<R, Error> {
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(r) => r,
            Err(_) => Err(Error::UserTimeout),
        }
    }
}

/// Signing operation state
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum SignState {
    /// Request built, nothing sent
    Init,
    /// Sending non-final chunks
    SendingChunks,
    /// Final chunk sent, awaiting on-device confirmation
    AwaitingConfirmation,
    /// Signature returned
    Complete,
    /// User rejected the transaction
    Rejected,
    /// Device or transport error
    Error,
}

impl SignState {
    /// Check whether this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SignState::Complete | SignState::Rejected | SignState::Error
        )
    }
}

/// Signing state tracker, shared between the handle and the pending exchange
pub(crate) struct SignMachine {
    tx: watch::Sender<SignState>,
}

impl SignMachine {
    /// Create a new state machine in [SignState::Init]
    pub fn new() -> (Self, watch::Receiver<SignState>) {
        let (tx, rx) = watch::channel(SignState::Init);
        (Self { tx }, rx)
    }

    /// Move to the next state, terminal states are never left
    pub fn set(&self, next: SignState) {
        let current = *self.tx.borrow();
        if current.is_terminal() {
            warn!("Ignoring sign state transition {} -> {}", current, next);
            return;
        }

        debug!("Sign state: {} -> {}", current, next);
        self.tx.send_replace(next);
    }

    /// Move to the terminal state matching an error
    pub fn fail(&self, e: &Error) {
        match e.is_rejected() {
            true => self.set(SignState::Rejected),
            false => self.set(SignState::Error),
        }
    }
}

/// Result of a completed signing operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignResult {
    /// Final status word
    pub status: u16,
    /// Signature, DER encoded for secp256k1 or 64 bytes for ed25519
    pub signature: Vec<u8>,
}

/// Handle to a signing operation awaiting on-device confirmation
pub struct PendingSignature {
    pub(crate) pending: Pending<SignResult>,
    pub(crate) state: watch::Receiver<SignState>,
}

impl PendingSignature {
    /// Fetch the current signing state
    pub fn state(&self) -> SignState {
        *self.state.borrow()
    }

    /// Subscribe to signing state changes
    pub fn watch(&self) -> watch::Receiver<SignState> {
        self.state.clone()
    }

    /// Check whether the device has responded
    pub fn is_finished(&self) -> bool {
        self.pending.is_finished()
    }

    /// Wait for the user to approve or reject the transaction
    pub async fn wait(self) -> Result<SignResult, Error> {
        self.pending.wait().await
    }

    /// Wait for the user with a timeout, see [Pending::wait_timeout]
    pub async fn wait_timeout(self, timeout: Duration) -> Result<SignResult, Error> {
        self.pending.wait_timeout(timeout).await
    }
}
