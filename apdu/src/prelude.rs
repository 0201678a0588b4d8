// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    app_config::{AppConfigReq, AppConfigResp},
    chunk::{
        BitFlagScheme, Chunk, ChunkMarker, ChunkSequence, EnumeratedScheme, MarkerScheme,
        DEFAULT_CHUNK_SIZE,
    },
    frame::{Frame, Response},
    path::{ChildNumber, DerivationPath, DEFAULT_PATH},
    public_key::{Curve, P2Flags, PublicKeyReq, PublicKeyResp},
    sign::SignReq,
    status::{ErrorKind, Status, StatusTable, SW_SUCCESS},
    ApduError, Command, Instruction, ProtocolVersion, XRP_APDU_CLA,
};
