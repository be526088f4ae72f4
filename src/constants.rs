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

/// First byte of every frame, in both directions.
pub const FRAME_START: u8               = 0xFF;
/// `[start | opcode | len]`
pub const FRAME_HEADER_LEN: usize       = 3;
/// Maximum frame length, header included.
pub const MAX_FRAME_LEN: usize          = 28;
/// Maximum payload bytes carried by a single command.
pub const MAX_PAYLOAD_LEN: usize        = MAX_FRAME_LEN - FRAME_HEADER_LEN;

/// Burst length used until the base module reports its own.
pub const DEFAULT_MAX_BURST_LEN: usize  = 0xF7;

pub const BURST_FIRST: u8               = 0x01;
pub const BURST_CONTINUATION: u8        = 0x02;
/// Leading byte of the burst count header sent on `WAITFORSIZE`.
pub const BURST_COUNT_HEADER: u8        = 0x00;

pub const WBSL_DISABLED: u8             = 0x01;
pub const WBSL_PROCESSING: u8           = 0x02;
pub const WBSL_WAITFORSIZE: u8          = 0x04;
pub const WBSL_WAITFORDATA: u8          = 0x08;
pub const WBSL_COMPLETE: u8             = 0x10;

/// Marker in byte 0 of `GET_STREAM_DATA` responses carrying a fresh sample.
pub const ACCEL_SAMPLE_VALID: u8        = 0x01;

/// Size of the `SYNC_SEND_COMMAND` payload.
pub const SYNC_PAYLOAD_LEN: usize       = 0x13;
pub const SYNC_SET_TIME: u8             = 0x03;
/// Hour flag selecting the 24h clock.
pub const SYNC_24H: u8                  = 0x80;
pub const SYNC_YEAR_BASE: i32           = 0x700;

/// USB IDs of the eZ430-Chronos RF access point.
pub const CBM_USB_VID: u16              = 0x0451;
pub const CBM_USB_PID: u16              = 0x16A6;

pub const BAUD_RATE: usize              = 115_200;
