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

//! # Wireless bootloader
//!
//! During an upload the host polls the packet status of the base module and
//! reacts to it:
//!
//! | Status        | Host action                                 |
//! |---------------|---------------------------------------------|
//! | `DISABLED`    | wait, poll again                            |
//! | `PROCESSING`  | wait, poll again                            |
//! | `WAITFORSIZE` | send the number of bursts                   |
//! | `WAITFORDATA` | send the next burst, fragment by fragment   |
//! | `COMPLETE`    | stop                                        |

use std::{convert::TryFrom, fmt, time::Duration};

use crate::{
    constants::{
        WBSL_COMPLETE, WBSL_DISABLED, WBSL_PROCESSING, WBSL_WAITFORDATA,
        WBSL_WAITFORSIZE,
    },
    Error, Timing,
};

/// Packet status reported by `WBSL_GET_PACKET_STATUS`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PacketStatus {
    /// The watch is not connected yet.
    Disabled,
    /// The previous burst is being processed.
    Processing,
    /// The watch expects the burst count.
    WaitForSize,
    /// The watch expects the next burst.
    WaitForData,
    Complete,
}

impl TryFrom<u8> for PacketStatus {
    type Error = Error;

    fn try_from(status: u8) -> Result<Self, Self::Error> {
        match status {
            WBSL_DISABLED => Ok(PacketStatus::Disabled),
            WBSL_PROCESSING => Ok(PacketStatus::Processing),
            WBSL_WAITFORSIZE => Ok(PacketStatus::WaitForSize),
            WBSL_WAITFORDATA => Ok(PacketStatus::WaitForData),
            WBSL_COMPLETE => Ok(PacketStatus::Complete),
            other => Err(Error::UnrecognizedStatus(other)),
        }
    }
}

/// Next host action of the upload loop.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Step {
    Wait(Duration),
    SendSize,
    SendBurst,
    /// `WAITFORDATA` with nothing left to send.
    Underflow(Duration),
    Finish,
}

impl PacketStatus {
    pub(crate) fn step(self, queue_empty: bool, timing: &Timing) -> Step {
        match (self, queue_empty) {
            (PacketStatus::Disabled, _) => Step::Wait(timing.disabled_poll),
            (PacketStatus::Processing, _) => Step::Wait(timing.processing_poll),
            (PacketStatus::WaitForSize, _) => Step::SendSize,
            (PacketStatus::WaitForData, false) => Step::SendBurst,
            (PacketStatus::WaitForData, true) => Step::Underflow(timing.underflow_poll),
            (PacketStatus::Complete, _) => Step::Finish,
        }
    }
}

/// Image being uploaded by [`Session::firmware_update`](crate::Session::firmware_update).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Stage {
    /// The RAM based updater.
    Updater,
    /// The firmware image.
    Firmware,
}

impl fmt::Display for Stage {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Updater => write!(fmt, "updater"),
            Stage::Firmware => write!(fmt, "firmware"),
        }
    }
}

/// Burst count header, `[0x00 | count (LE)]`.
pub(crate) fn size_header(count: u16) -> [u8; 3] {
    let count = count.to_le_bytes();
    [crate::constants::BURST_COUNT_HEADER, count[0], count[1]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_byte() {
        assert_eq!(PacketStatus::try_from(1).unwrap(), PacketStatus::Disabled);
        assert_eq!(PacketStatus::try_from(2).unwrap(), PacketStatus::Processing);
        assert_eq!(PacketStatus::try_from(4).unwrap(), PacketStatus::WaitForSize);
        assert_eq!(PacketStatus::try_from(8).unwrap(), PacketStatus::WaitForData);
        assert_eq!(PacketStatus::try_from(16).unwrap(), PacketStatus::Complete);
        for status in [0u8, 3, 5, 0x20, 0xFF] {
            assert!(matches!(
                PacketStatus::try_from(status),
                Err(Error::UnrecognizedStatus(s)) if s == status
            ));
        }
    }

    #[test]
    fn test_transitions() {
        let timing = Timing::default();
        assert_eq!(
            PacketStatus::Disabled.step(false, &timing),
            Step::Wait(Duration::from_millis(200))
        );
        assert_eq!(
            PacketStatus::Processing.step(true, &timing),
            Step::Wait(Duration::from_millis(100))
        );
        assert_eq!(PacketStatus::WaitForSize.step(false, &timing), Step::SendSize);
        assert_eq!(PacketStatus::WaitForData.step(false, &timing), Step::SendBurst);
        assert_eq!(
            PacketStatus::WaitForData.step(true, &timing),
            Step::Underflow(Duration::from_millis(50))
        );
        assert_eq!(PacketStatus::Complete.step(false, &timing), Step::Finish);
    }

    #[test]
    fn test_size_header() {
        assert_eq!(size_header(13), [0x00, 13, 0]);
        assert_eq!(size_header(0x0102), [0x00, 0x02, 0x01]);
    }
}
