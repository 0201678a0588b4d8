// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::path::Path;

use log::debug;
use serde::{de::DeserializeOwned, Deserialize};

/// Variable length hex encoded data
#[derive(Clone, PartialEq, Debug)]
pub struct HexData(pub Vec<u8>);

impl std::str::FromStr for HexData {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);

        hex::decode(s).map(HexData)
    }
}

impl AsRef<[u8]> for HexData {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for HexData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Transaction metadata, used to select the signing mode
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
pub struct TxMetadata {
    /// Signing public key, empty for multi-signed transactions
    #[serde(rename = "SigningPubKey")]
    pub signing_pub_key: Option<String>,
}

/// Helper to read input files where required
pub async fn read_input<T: DeserializeOwned>(file_name: &str) -> anyhow::Result<T> {
    debug!("Reading input from '{}'", file_name);

    let s = tokio::fs::read_to_string(file_name).await?;

    // Determine format from file name
    let p = Path::new(file_name);

    // Decode based on input extension
    let v = match p.extension().and_then(|e| e.to_str()) {
        // Decode JSON for `.json` files
        Some("json") => serde_json::from_str(&s)?,
        _ => return Err(anyhow::anyhow!("unsupported input file format")),
    };

    Ok(v)
}

/// Helper to read a hex encoded transaction file
pub async fn read_tx(file_name: &str) -> anyhow::Result<Vec<u8>> {
    debug!("Reading transaction from '{}'", file_name);

    let s = tokio::fs::read_to_string(file_name).await?;
    let d: HexData = s.parse()?;

    Ok(d.0)
}
