// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for interacting with the Ledger XRP app

use std::{net::SocketAddr, time::Duration};

use clap::Parser;
use log::{debug, error, info, LevelFilter};

use ledger_xrp::{
    apdu::{
        path::{DerivationPath, DEFAULT_PATH},
        public_key::Curve,
        ProtocolVersion,
    },
    transport::{TcpInfo, TcpTransport},
    verify::VerificationContext,
    DeviceHandle, Error, Exchange, Filters, GenericHandle, LedgerProvider, SigningMode, Transport,
};

mod helpers;
use helpers::*;

/// Ledger XRP command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Supported transports for ledger discovery
    #[clap(long, value_enum, env = "LEDGER_TARGET", default_value = "any")]
    target: Filters,

    /// Device index (where more than one device is available)
    #[clap(long, env = "LEDGER_DEVICE_INDEX", default_value = "0")]
    device_index: usize,

    /// Connect directly to a Speculos APDU socket, skipping discovery
    #[clap(long, env = "LEDGER_TCP_ADDR")]
    tcp_addr: Option<SocketAddr>,

    /// Firmware protocol version (current, legacy)
    #[clap(long, env = "LEDGER_PROTOCOL", default_value = "current")]
    protocol: ProtocolVersion,

    /// Timeout for requests not requiring user interaction
    #[clap(long, env = "LEDGER_REQUEST_TIMEOUT_MS", default_value = "2000")]
    request_timeout_ms: u64,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// List available devices
    List,

    /// Fetch application configuration
    AppConfig,

    /// Fetch public key and address
    PublicKey {
        /// BIP32 derivation path
        #[clap(long, default_value = DEFAULT_PATH)]
        path: DerivationPath,

        /// Display address on the device and wait for approval
        #[clap(long)]
        confirm: bool,

        /// Request BIP32 chain code
        #[clap(long)]
        chain_code: bool,

        /// Use ed25519 derivation
        #[clap(long)]
        ed25519: bool,
    },

    /// Sign a serialized transaction
    Sign {
        /// BIP32 derivation path
        #[clap(long, default_value = DEFAULT_PATH)]
        path: DerivationPath,

        /// Hex encoded transaction
        #[clap(long, conflicts_with = "tx_file", required_unless_present = "tx_file")]
        tx: Option<HexData>,

        /// File containing hex encoded transaction
        #[clap(long)]
        tx_file: Option<String>,

        /// JSON transaction metadata (`SigningPubKey: ""` selects multi-signing)
        #[clap(long)]
        metadata: Option<String>,

        /// Use ed25519 key
        #[clap(long)]
        ed25519: bool,

        /// Verify the returned signature against the derived public key
        #[clap(long)]
        verify: bool,

        /// Timeout for user approval
        #[clap(long, default_value = "60")]
        user_timeout_s: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    let _ = simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default());

    let request_timeout = Duration::from_millis(args.request_timeout_ms);

    // Connect directly where a speculos socket is specified
    if let Some(addr) = args.tcp_addr {
        debug!("Connecting to speculos at: {}", addr);

        let d = TcpTransport::new()?.connect(TcpInfo { addr }).await?;
        let t = DeviceHandle::from(d)
            .with_protocol(args.protocol)
            .with_request_timeout(request_timeout);

        return execute(t, args.cmd).await;
    }

    // Connect to ledger provider
    let mut p = LedgerProvider::init().await;

    debug!("Using transport: {:?}", args.target);

    // List available devices
    let devices = p.list(args.target).await?;
    if devices.is_empty() {
        return Err(Error::NoDevice.into());
    }

    // Handle list command
    if args.cmd == Actions::List {
        info!("Devices:");
        for (i, d) in devices.iter().enumerate() {
            info!("  {}: {}", i, d);
        }

        return Ok(());
    }

    // Select device by index
    if args.device_index >= devices.len() {
        return Err(anyhow::anyhow!(
            "Invalid device index: {} (max: {})",
            args.device_index,
            devices.len() - 1
        ));
    }

    let info = devices[args.device_index].clone();

    debug!("Using device {}: {}", args.device_index, info);

    // Connect to device
    let t = match GenericHandle::connect(&mut p, info.clone()).await {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to connect to device: {}", info);
            return Err(e.into());
        }
    };

    let t = t
        .with_protocol(args.protocol)
        .with_request_timeout(request_timeout);

    // Execute command
    execute(t, args.cmd).await?;

    Ok(())
}

/// Execute a command with the provided handle
async fn execute<T>(t: DeviceHandle<T>, cmd: Actions) -> anyhow::Result<()>
where
    T: Exchange + Send + 'static,
{
    debug!("Executing command: {:?}", cmd);

    let curve = |ed25519: bool| match ed25519 {
        true => Curve::Ed25519,
        false => Curve::Secp256k1,
    };

    match cmd {
        Actions::AppConfig => {
            let v = t.get_configuration().await?;

            info!("app version: {}", v);
        }
        Actions::PublicKey {
            path,
            confirm,
            chain_code,
            ed25519,
        } => {
            info!("requesting public key for path: {}", path);

            if confirm {
                info!("approve the address on the device to continue");
            }

            let r = t
                .get_public_key(&path, confirm, curve(ed25519), chain_code)
                .await?;

            info!("public key: {}", hex::encode(&r.public_key));
            info!("address: {}", r.address);
            if let Some(c) = r.chain_code {
                info!("chain code: {}", hex::encode(c));
            }
        }
        Actions::Sign {
            path,
            tx,
            tx_file,
            metadata,
            ed25519,
            verify,
            user_timeout_s,
        } => {
            // Load transaction
            let tx = match (tx, tx_file) {
                (Some(d), _) => d.0,
                (None, Some(f)) => read_tx(&f).await?,
                (None, None) => return Err(anyhow::anyhow!("--tx or --tx-file required")),
            };

            // Determine signing mode from metadata
            let meta = match &metadata {
                Some(f) => read_input::<TxMetadata>(f).await?,
                None => TxMetadata::default(),
            };
            let mode = SigningMode::from_signing_pub_key(meta.signing_pub_key.as_deref());

            info!(
                "signing {} byte transaction with path: {} (mode: {})",
                tx.len(),
                path,
                mode
            );

            // Fetch public key prior to signing for verification
            let public_key = match verify {
                true => Some(t.get_public_key(&path, false, curve(ed25519), false).await?),
                false => None,
            };

            // Submit transaction and wait for approval
            let pending = t.sign(&path, curve(ed25519), &tx).await?;

            info!("approve the transaction on the device to continue");

            let r = pending
                .wait_timeout(Duration::from_secs(user_timeout_s))
                .await?;

            info!("signature: {}", hex::encode(&r.signature));

            if let Some(k) = public_key {
                let ctx = VerificationContext::new(&k.public_key, mode, &tx, &r.signature);
                match ctx.verify() {
                    true => info!("signature verified for address: {}", k.address),
                    false => return Err(anyhow::anyhow!("signature verification failed")),
                }
            }
        }
        Actions::List => {
            return Err(anyhow::anyhow!("device listing requires discovery (omit --tcp-addr)"))
        }
    }

    Ok(())
}
