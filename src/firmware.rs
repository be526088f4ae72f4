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

//! # Firmware images
//!
//! Images are read from the TI text format used by the watch toolchain:
//!
//! ```text
//! @1D30
//! 31 40 FE 2B 3C 40 88 29
//! @FFFE
//! 30 1D
//! q
//! ```
//!
//! Every `@` opens a record with a 4 digit hexadecimal address followed by the
//! record bytes. The file ends with `q`. Whitespace is not significant.

use std::{fs, path::Path, str::FromStr};

use crate::{burst::Burst, Chunk, Error, Result};

/// RAM based updater uploaded to the watch before any firmware image.
pub const RAM_BASED_UPDATER: &str = include_str!("ram_based_updater.txt");

/// Where to read a firmware image from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// Firmware text.
    Text(&'a str),
    /// Path to a file holding the firmware text.
    Path(&'a Path),
    /// Raw bytes of the firmware text.
    Bytes(&'a [u8]),
}

/// An ordered list of chunks.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FirmwareImage {
    chunks: Vec<Chunk>,
}

impl FirmwareImage {
    /// Load an image from any of the supported sources.
    pub fn load(source: Source<'_>) -> Result<FirmwareImage> {
        match source {
            Source::Text(text) => FirmwareImage::parse(text),
            Source::Path(path) => {
                let bytes = fs::read(path)?;
                FirmwareImage::load(Source::Bytes(&bytes))
            }
            Source::Bytes(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    Error::Format(format!("firmware text is not valid UTF-8: {}", e))
                })?;
                FirmwareImage::parse(text)
            }
        }
    }

    /// Parse the firmware text.
    pub fn parse(text: &str) -> Result<FirmwareImage> {
        let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();

        if !text.starts_with('@') || !text.ends_with('q') || text.len() < 2 {
            return Err(Error::Format(
                "firmware text must start with `@` and end with `q`".into(),
            ));
        }

        let chunks = text[1..text.len() - 1]
            .split('@')
            .map(parse_record)
            .collect::<Result<Vec<_>>>()?;

        for chunk in &chunks {
            log::debug!(
                "Chunk at address {:#06X}, length {}",
                chunk.address,
                chunk.data.len()
            );
        }

        Ok(FirmwareImage { chunks })
    }

    /// The RAM based updater that has to run on the watch before a new
    /// firmware can be written.
    pub fn updater() -> Result<FirmwareImage> {
        FirmwareImage::parse(RAM_BASED_UPDATER)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Flatten the image into the burst queue, keeping the chunk order.
    pub fn to_bursts(&self, max_burst_len: usize) -> Vec<Burst> {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.to_bursts(max_burst_len))
            .collect()
    }
}

impl FromStr for FirmwareImage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FirmwareImage::parse(s)
    }
}

fn parse_record(record: &str) -> Result<Chunk> {
    let (address, data) = match (record.get(..4), record.get(4..)) {
        (Some(address), Some(data)) => (address, data),
        _ => {
            return Err(Error::Format(format!(
                "record `@{}` is missing its address",
                record
            )))
        }
    };

    let address = u16::from_str_radix(address, 16).map_err(|_| {
        Error::Format(format!("invalid record address `{}`", address))
    })?;
    let data = hex::decode(data).map_err(|e| {
        Error::Format(format!("invalid data at address {:#06X}: {}", address, e))
    })?;

    Ok(Chunk::new(address, data))
}
