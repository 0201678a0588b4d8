use std::{str::FromStr, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::Notify,
};

use ledger_xrp::{
    apdu::{
        path::{ChildNumber, DerivationPath, DEFAULT_PATH},
        public_key::Curve,
        status::ErrorKind,
        ApduError, ProtocolVersion,
    },
    transport::{TcpInfo, TcpTransport},
    DeviceHandle, Error, Transport,
};

mod helpers;
use helpers::*;

const KEY: &str = "02e2fb4d24ca3c7a57328ebd2d8b4f31fd3e7ac41b2fb73a0c1b6d9bc29ecb2cde";
const ADDRESS: &str = "rHsMGQEkVNJmpGWs8XUBoTBiAAbwxZN5v3";

fn public_key_resp(chain_code: Option<[u8; 32]>) -> Vec<u8> {
    let key = hex::decode(KEY).unwrap();

    let mut r = vec![key.len() as u8];
    r.extend_from_slice(&key);
    r.push(ADDRESS.len() as u8);
    r.extend_from_slice(ADDRESS.as_bytes());
    if let Some(c) = chain_code {
        r.extend_from_slice(&c);
    }

    r
}

#[tokio::test]
async fn app_configuration() -> anyhow::Result<()> {
    let (h, log) = setup(vec![ok(&[0x00, 0x01, 0x02, 0x03])]);

    let v = h.get_configuration().await?;
    assert_eq!(v.to_string(), "1.2.3");

    let f = log.frames();
    assert_eq!(f.len(), 1);
    assert_eq!(f[0].encode(), vec![0xe0, 0x06, 0x00, 0x00, 0x00]);

    Ok(())
}

#[tokio::test]
async fn app_configuration_invalid() {
    let (h, _log) = setup(vec![ok(&[0x01, 0x01, 0x02, 0x03])]);

    assert!(matches!(
        h.get_configuration().await,
        Err(Error::Apdu(ApduError::UnexpectedConfigurationFormat))
    ));
}

#[tokio::test]
async fn public_key() -> anyhow::Result<()> {
    let (h, log) = setup(vec![ok(&public_key_resp(None))]);
    let path = DerivationPath::from_str(DEFAULT_PATH)?;

    let r = h
        .get_public_key(&path, false, Curve::Secp256k1, false)
        .await?;

    assert_eq!(hex::encode(&r.public_key), KEY);
    assert_eq!(r.address, ADDRESS);
    assert_eq!(r.chain_code, None);

    assert_eq!(
        hex::encode(log.frames()[0].encode()),
        "e002004015058000002c80000090800000008000000000000000"
    );

    Ok(())
}

#[tokio::test]
async fn public_key_confirm_two_phase() -> anyhow::Result<()> {
    let user = Arc::new(Notify::new());
    let (h, log) = setup(vec![gated(&user, &public_key_resp(Some([0xcc; 32])), 0x9000)]);
    let path = DerivationPath::from_str("44'/144'/1'/0/0")?;

    let pending = h.request_public_key(&path, Curve::Ed25519, true).await?;

    // Request is submitted, response pending user approval
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());

    let f = log.frames();
    assert_eq!(f[0].p1, 0x01);
    assert_eq!(f[0].p2, 0x81);

    user.notify_one();

    let r = pending.wait().await?;
    assert_eq!(r.chain_code, Some([0xcc; 32]));

    Ok(())
}

#[tokio::test]
async fn public_key_device_errors() {
    let path = DerivationPath::from_str(DEFAULT_PATH).unwrap();

    let (h, _log) = setup(vec![reply_kind(ErrorKind::InvalidPath)]);
    let e = h
        .get_public_key(&path, false, Curve::Secp256k1, false)
        .await
        .unwrap_err();
    assert_eq!(e.kind(), Some(ErrorKind::InvalidPath));
    assert!(matches!(e, Error::Device { status: 0x6a80, .. }));

    // Legacy firmware swaps invalid path and data codes
    let (h, _log) = setup(vec![reply(&[], 0x6a80)]);
    let e = h
        .with_protocol(ProtocolVersion::Legacy)
        .get_public_key(&path, false, Curve::Secp256k1, false)
        .await
        .unwrap_err();
    assert_eq!(e.kind(), Some(ErrorKind::InvalidData));

    let (h, _log) = setup(vec![reply(&[], 0x1234)]);
    let e = h
        .get_public_key(&path, false, Curve::Secp256k1, false)
        .await
        .unwrap_err();
    assert!(matches!(
        e,
        Error::Device {
            kind: ErrorKind::Unknown,
            status: 0x1234
        }
    ));
}

#[tokio::test]
async fn public_key_truncated() {
    let path = DerivationPath::from_str(DEFAULT_PATH).unwrap();

    let (h, _log) = setup(vec![ok(&[33, 0x02, 0x03])]);
    assert!(matches!(
        h.get_public_key(&path, false, Curve::Secp256k1, false).await,
        Err(Error::Apdu(ApduError::TruncatedResponse))
    ));

    let (h, _log) = setup(vec![Step::Reply(vec![0x90])]);
    assert!(matches!(
        h.get_public_key(&path, false, Curve::Secp256k1, false).await,
        Err(Error::Apdu(ApduError::TruncatedResponse))
    ));
}

#[tokio::test]
async fn request_timeout() {
    let (h, _log) = setup(vec![Step::Hang]);

    let r = h
        .with_request_timeout(Duration::from_millis(50))
        .get_configuration()
        .await;

    assert!(matches!(r, Err(Error::RequestTimeout)));
}

#[tokio::test]
async fn transport_error() {
    let (h, _log) = setup(vec![]);

    assert!(matches!(
        h.get_configuration().await,
        Err(Error::Transport(_))
    ));
}

#[tokio::test]
async fn public_key_path_too_deep() {
    let (h, log) = setup(vec![]);
    let path = DerivationPath::new(vec![ChildNumber::hardened(44); 256]);

    // Rejected locally, nothing reaches the device
    assert!(matches!(
        h.get_public_key(&path, false, Curve::Secp256k1, false).await,
        Err(Error::Apdu(ApduError::PayloadTooLarge))
    ));
    assert_eq!(log.len(), 0);
}

#[tokio::test]
async fn late_response_not_returned_to_next_request() -> anyhow::Result<()> {
    let (h, log) = setup(vec![
        delayed(Duration::from_millis(200), &[0x00, 0x09, 0x09, 0x09]),
        ok(&[0x00, 0x01, 0x02, 0x03]),
    ]);
    let h = h.with_request_timeout(Duration::from_millis(50));

    assert!(matches!(
        h.get_configuration().await,
        Err(Error::RequestTimeout)
    ));

    // Next request is held until the late response is consumed
    let v = h.get_configuration().await?;
    assert_eq!(v.to_string(), "1.2.3");
    assert_eq!(log.len(), 2);

    Ok(())
}

#[tokio::test]
async fn late_tcp_response_not_returned_to_next_request() -> anyhow::Result<()> {
    let l = TcpListener::bind("127.0.0.1:0").await?;
    let addr = l.local_addr()?;

    // Speculos-style APDU socket, the first response arrives late
    let server = tokio::spawn(async move {
        let (mut s, _) = l.accept().await?;

        for (delay_ms, data) in [(200, [0x00, 0x09, 0x09, 0x09]), (0, [0x00, 0x01, 0x02, 0x03])] {
            let mut len = [0u8; 4];
            s.read_exact(&mut len).await?;
            let mut req = vec![0u8; u32::from_be_bytes(len) as usize];
            s.read_exact(&mut req).await?;
            assert_eq!(req, vec![0xe0, 0x06, 0x00, 0x00, 0x00]);

            tokio::time::sleep(Duration::from_millis(delay_ms)).await;

            let mut resp = (data.len() as u32).to_be_bytes().to_vec();
            resp.extend_from_slice(&data);
            resp.extend_from_slice(&[0x90, 0x00]);
            s.write_all(&resp).await?;
        }

        Ok::<_, std::io::Error>(())
    });

    let d = TcpTransport::new()?.connect(TcpInfo { addr }).await?;
    let h = DeviceHandle::from(d).with_request_timeout(Duration::from_millis(50));

    assert!(matches!(
        h.get_configuration().await,
        Err(Error::RequestTimeout)
    ));

    let v = h.get_configuration().await?;
    assert_eq!(v.to_string(), "1.2.3");

    server.await??;

    Ok(())
}
