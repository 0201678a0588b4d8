// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Chunking of payloads that exceed a single frame
//!
//! A signing payload (count-prefixed derivation path followed by the
//! transaction bytes) is split into an ordered [ChunkSequence]. The first
//! chunk carries the prefix plus as much of the body as fits, later chunks
//! carry body bytes only. Each chunk is tagged with a [ChunkMarker] which is
//! written to `P1` using the [MarkerScheme] of the firmware generation in use.

use alloc::vec::Vec;

use crate::{frame::Frame, frame::MAX_PAYLOAD_LEN, ApduError};

/// Default maximum chunk size
pub const DEFAULT_CHUNK_SIZE: usize = MAX_PAYLOAD_LEN;

/// Position of a chunk within a sequence
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum ChunkMarker {
    /// Whole payload in a single chunk
    Only,
    /// First of several chunks
    First,
    /// Neither first nor last
    Intermediate,
    /// Last of several chunks
    Last,
}

/// Encoding of [ChunkMarker]s into `P1`
pub trait MarkerScheme {
    /// Fetch the `P1` value for a marker
    fn p1(&self, marker: ChunkMarker) -> u8;

    /// Recover a marker from a `P1` value
    fn marker(&self, p1: u8) -> Option<ChunkMarker>;
}

/// Bit-flag marker scheme (current firmware)
///
/// `P1_MASK_MORE` is set while more chunks follow, `P1_MASK_ORDER` is set on
/// every chunk after the first.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct BitFlagScheme;

impl BitFlagScheme {
    /// Set on all chunks but the first
    pub const P1_MASK_ORDER: u8 = 0x01;
    /// Set on all chunks but the last
    pub const P1_MASK_MORE: u8 = 0x80;
}

impl MarkerScheme for BitFlagScheme {
    fn p1(&self, marker: ChunkMarker) -> u8 {
        match marker {
            ChunkMarker::Only => 0x00,
            ChunkMarker::First => Self::P1_MASK_MORE,
            ChunkMarker::Intermediate => Self::P1_MASK_MORE | Self::P1_MASK_ORDER,
            ChunkMarker::Last => Self::P1_MASK_ORDER,
        }
    }

    fn marker(&self, p1: u8) -> Option<ChunkMarker> {
        let more = p1 & Self::P1_MASK_MORE != 0;
        let order = p1 & Self::P1_MASK_ORDER != 0;

        if p1 & !(Self::P1_MASK_MORE | Self::P1_MASK_ORDER) != 0 {
            return None;
        }

        let m = match (more, order) {
            (false, false) => ChunkMarker::Only,
            (true, false) => ChunkMarker::First,
            (true, true) => ChunkMarker::Intermediate,
            (false, true) => ChunkMarker::Last,
        };

        Some(m)
    }
}

/// Enumerated marker scheme (legacy firmware)
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct EnumeratedScheme;

impl MarkerScheme for EnumeratedScheme {
    fn p1(&self, marker: ChunkMarker) -> u8 {
        match marker {
            ChunkMarker::Only => 0x00,
            ChunkMarker::First => 0x01,
            ChunkMarker::Intermediate => 0x02,
            ChunkMarker::Last => 0x03,
        }
    }

    fn marker(&self, p1: u8) -> Option<ChunkMarker> {
        match p1 {
            0x00 => Some(ChunkMarker::Only),
            0x01 => Some(ChunkMarker::First),
            0x02 => Some(ChunkMarker::Intermediate),
            0x03 => Some(ChunkMarker::Last),
            _ => None,
        }
    }
}

/// Single chunk of a [ChunkSequence]
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Chunk {
    pub marker: ChunkMarker,
    pub payload: Vec<u8>,
}

/// Ordered chunks for one logical payload
///
/// Always holds at least one chunk: either a single [ChunkMarker::Only], or a
/// [ChunkMarker::First], zero or more [ChunkMarker::Intermediate] and a
/// [ChunkMarker::Last].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChunkSequence(Vec<Chunk>);

impl ChunkSequence {
    /// Split `prefix ++ body` into chunks of at most `max_chunk_size` bytes,
    /// with the whole prefix in the first chunk
    pub fn split(prefix: &[u8], body: &[u8], max_chunk_size: usize) -> Result<Self, ApduError> {
        if max_chunk_size == 0
            || max_chunk_size > MAX_PAYLOAD_LEN
            || prefix.len() > max_chunk_size
        {
            return Err(ApduError::InvalidChunkSize);
        }

        // First chunk takes the prefix and as much body as fits
        let n = body.len().min(max_chunk_size - prefix.len());
        let mut first = Vec::with_capacity(prefix.len() + n);
        first.extend_from_slice(prefix);
        first.extend_from_slice(&body[..n]);

        let mut payloads = alloc::vec![first];
        payloads.extend(body[n..].chunks(max_chunk_size).map(|c| c.to_vec()));

        let count = payloads.len();
        let chunks = payloads
            .into_iter()
            .enumerate()
            .map(|(i, payload)| {
                let marker = match (i, count) {
                    (_, 1) => ChunkMarker::Only,
                    (0, _) => ChunkMarker::First,
                    (i, c) if i == c - 1 => ChunkMarker::Last,
                    _ => ChunkMarker::Intermediate,
                };
                Chunk { marker, payload }
            })
            .collect();

        Ok(Self(chunks))
    }

    /// Fetch chunks in order
    pub fn chunks(&self) -> &[Chunk] {
        &self.0
    }

    /// Number of chunks
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the sequence is empty (never true for a split result)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenate chunk payloads, reproducing `prefix ++ body`
    pub fn concat(&self) -> Vec<u8> {
        self.0.iter().flat_map(|c| c.payload.iter().copied()).collect()
    }

    /// Render chunks into frames using the provided marker scheme
    pub fn frames<S: MarkerScheme + ?Sized>(
        &self,
        cla: u8,
        ins: u8,
        p2: u8,
        scheme: &S,
    ) -> Result<Vec<Frame>, ApduError> {
        self.0
            .iter()
            .map(|c| Frame::new(cla, ins, scheme.p1(c.marker), p2, c.payload.clone()))
            .collect()
    }
}

impl IntoIterator for ChunkSequence {
    type Item = Chunk;
    type IntoIter = alloc::vec::IntoIter<Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
