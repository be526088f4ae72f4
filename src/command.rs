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

//! # Command frames
//!
//! Every request to the base module and every response from it is a frame
//! with the same layout:
//!
//! ```text
//! [0xFF | opcode | len | payload...]
//! ```
//!
//! where `len` counts the whole frame, header included.

use std::fmt;

use crate::{
    constants::{FRAME_HEADER_LEN, FRAME_START, MAX_PAYLOAD_LEN},
    Error, Result,
};

/// Base module opcodes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum Opcode {
    GetStatus = 0x00,
    Reset = 0x01,
    /// Stop the background radio (`BR_Stop`).
    StopStreaming = 0x06,
    /// Start the SimpliciTI link (`SPL_Start`).
    StartStreaming = 0x07,
    GetStreamData = 0x08,
    /// Stop the SimpliciTI link (`SPL_Stop`).
    StopStreaming2 = 0x09,
    SyncStart = 0x30,
    SyncSendCommand = 0x31,
    SyncGetBufferStatus = 0x32,
    SyncReadBuffer = 0x33,
    WbslStart = 0x40,
    WbslGetStatus = 0x41,
    WbslStop = 0x46,
    WbslSendData = 0x47,
    WbslGetPacketStatus = 0x48,
    WbslGetMaxPayload = 0x49,
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> u8 {
        opcode as u8
    }
}

/// A single request or response frame.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Command {
    pub opcode: u8,
    pub payload: Vec<u8>,
}

impl Command {
    /// Create a new command.
    ///
    /// # Panics
    ///
    /// This function panics if `payload` is longer than
    /// [`MAX_PAYLOAD_LEN`] bytes.
    pub fn new<O, D>(opcode: O, payload: D) -> Command
    where
        O: Into<u8>,
        D: Into<Vec<u8>>,
    {
        let payload = payload.into();
        assert!(
            payload.len() <= MAX_PAYLOAD_LEN,
            "command payload too big ({} bytes)",
            payload.len()
        );

        Command {
            opcode: opcode.into(),
            payload,
        }
    }

    /// Total frame length, as written in the `len` byte.
    pub fn len(&self) -> usize {
        FRAME_HEADER_LEN + self.payload.len()
    }

    /// Encode the frame for the wire.
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.len());

        frame.push(FRAME_START);
        frame.push(self.opcode);
        frame.push(self.len() as u8);
        frame.extend_from_slice(&self.payload);

        frame
    }

    /// Decode a complete frame.
    pub fn decode(frame: &[u8]) -> Result<Command> {
        if frame.len() < FRAME_HEADER_LEN {
            return Err(Error::MalformedResponse(format!(
                "frame too short ({} bytes)",
                frame.len()
            )));
        }

        let len = payload_len(&[frame[0], frame[1], frame[2]])?;
        let payload = &frame[FRAME_HEADER_LEN..];
        if payload.len() != len {
            return Err(Error::MalformedResponse(format!(
                "header announces {} payload bytes, found {}",
                len,
                payload.len()
            )));
        }

        Ok(Command {
            opcode: frame[1],
            payload: payload.to_vec(),
        })
    }
}

/// Validate a frame header and return the number of payload bytes that
/// follow it.
pub(crate) fn payload_len(header: &[u8; FRAME_HEADER_LEN]) -> Result<usize> {
    if header[0] != FRAME_START {
        return Err(Error::MalformedResponse(format!(
            "invalid start byte {:#04X}",
            header[0]
        )));
    }

    let len = usize::from(header[2]);
    if len < FRAME_HEADER_LEN {
        return Err(Error::MalformedResponse(format!(
            "invalid frame length {}",
            len
        )));
    }

    Ok(len - FRAME_HEADER_LEN)
}

impl fmt::Display for Command {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", hex::encode(self.encode()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let cmd = Command::new(Opcode::GetStatus, vec![0x00]);
        assert_eq!(cmd.encode(), [0xFF, 0x00, 0x04, 0x00]);

        let cmd = Command::new(Opcode::WbslStart, Vec::new());
        assert_eq!(cmd.encode(), [0xFF, 0x40, 0x03]);
    }

    #[test]
    fn test_decode_encoded() {
        for len in 0..=MAX_PAYLOAD_LEN {
            let payload: Vec<u8> = (0..len as u8).map(|b| b ^ 0xA5).collect();
            let cmd = Command::new(Opcode::WbslSendData, payload.clone());
            let decoded = Command::decode(&cmd.encode()).unwrap();
            assert_eq!(decoded.opcode, 0x47);
            assert_eq!(decoded.payload, payload);
        }
    }

    #[test]
    #[should_panic(expected = "command payload too big")]
    fn test_oversized_payload() {
        Command::new(Opcode::WbslSendData, vec![0u8; MAX_PAYLOAD_LEN + 1]);
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            Command::decode(&[0xFF, 0x00]),
            Err(Error::MalformedResponse(_))
        ));
        assert!(matches!(
            Command::decode(&[0xFE, 0x00, 0x03]),
            Err(Error::MalformedResponse(_))
        ));
        assert!(matches!(
            Command::decode(&[0xFF, 0x00, 0x02]),
            Err(Error::MalformedResponse(_))
        ));
        // Header announces two payload bytes but only one follows.
        assert!(matches!(
            Command::decode(&[0xFF, 0x48, 0x05, 0x08]),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_display_hex() {
        let cmd = Command::new(Opcode::WbslGetMaxPayload, vec![0x00]);
        assert_eq!(cmd.to_string(), "ff490400");
    }
}
