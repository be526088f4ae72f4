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

//! Error types.

use std::io;

use thiserror::Error;

/// Result type of the base module operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type of the base module operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the serial link or a firmware file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The serial port couldn't be opened or configured.
    #[error("serial port error: {0}")]
    Serial(#[from] serial::Error),

    /// The base module didn't answer a command before the read timeout.
    #[error("no response from the base module to command {0:#04X}")]
    NoResponse(u8),

    /// The response frame is inconsistent with its header.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The firmware text couldn't be parsed.
    #[error("malformed firmware image: {0}")]
    Format(String),

    /// The bootloader reported a packet status outside the known set.
    #[error("unrecognized WBSL packet status {0:#04X}")]
    UnrecognizedStatus(u8),

    /// A value doesn't fit the encoding expected by the watch.
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// The operator declined a confirmation.
    #[error("operation cancelled by the operator")]
    Cancelled,
}
