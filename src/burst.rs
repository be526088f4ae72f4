// Copyright 2021 Locha Mesh Developers <contact@locha.io>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Chunks and bursts
//!
//! Firmware travels to the watch in two reshaping steps:
//!
//! 1. A [`Chunk`] (address + data) is cut into [`Burst`]s of at most the
//!    burst length negotiated with the base module. The address goes in front
//!    of the first burst.
//! 2. Each burst gets a `[kind | len]` header and is cut into payload
//!    fragments that fit a single command frame.
//!
//! The base module reassembles a burst by concatenating the fragments it
//! receives, so the fragments of a burst must be sent back to back.

use crate::constants::{BURST_CONTINUATION, BURST_FIRST, MAX_PAYLOAD_LEN};

/// Position of a burst inside its chunk.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BurstKind {
    /// Carries the chunk address in its first two bytes.
    First,
    Continuation,
}

impl BurstKind {
    /// Type byte sent in the burst header.
    pub fn as_byte(self) -> u8 {
        match self {
            BurstKind::First => BURST_FIRST,
            BurstKind::Continuation => BURST_CONTINUATION,
        }
    }
}

/// A burst of firmware data.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Burst {
    pub kind: BurstKind,
    pub data: Vec<u8>,
}

impl Burst {
    /// Length of the burst on the wire, header included.
    pub fn len(&self) -> usize {
        self.data.len() + 2
    }

    /// Cut the burst into command payloads.
    pub fn to_payloads(&self) -> Vec<Vec<u8>> {
        split_into_payloads(self.kind.as_byte(), &self.data)
    }
}

/// An address tagged region of a firmware image.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Chunk {
    pub address: u16,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(address: u16, data: Vec<u8>) -> Chunk {
        Chunk { address, data }
    }

    /// Cut the chunk into bursts of at most `max_burst_len` bytes.
    ///
    /// See [`split_into_bursts`].
    pub fn to_bursts(&self, max_burst_len: usize) -> Vec<Burst> {
        split_into_bursts(self, max_burst_len)
    }
}

/// Prepend the `[type_byte | len]` header to `data` and cut the result into
/// fragments of at most [`MAX_PAYLOAD_LEN`] bytes.
pub fn split_into_payloads(type_byte: u8, data: &[u8]) -> Vec<Vec<u8>> {
    let mut stream = Vec::with_capacity(data.len() + 2);
    stream.push(type_byte);
    stream.push((data.len() & 0xFF) as u8);
    stream.extend_from_slice(data);

    stream
        .chunks(MAX_PAYLOAD_LEN)
        .map(|fragment| fragment.to_vec())
        .collect()
}

/// Prepend the big endian address to the chunk data and cut the result into
/// bursts of at most `max_burst_len` bytes.
///
/// The first burst is always [`BurstKind::First`], even for an empty chunk,
/// which yields a single burst holding only the address.
///
/// # Panics
///
/// This function panics if `max_burst_len` is zero.
pub fn split_into_bursts(chunk: &Chunk, max_burst_len: usize) -> Vec<Burst> {
    assert!(max_burst_len > 0, "burst length can't be zero");

    let mut stream = Vec::with_capacity(chunk.data.len() + 2);
    stream.extend_from_slice(&chunk.address.to_be_bytes());
    stream.extend_from_slice(&chunk.data);

    stream
        .chunks(max_burst_len)
        .enumerate()
        .map(|(i, data)| Burst {
            kind: if i == 0 {
                BurstKind::First
            } else {
                BurstKind::Continuation
            },
            data: data.to_vec(),
        })
        .collect()
}
