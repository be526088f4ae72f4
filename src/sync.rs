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

//! Time synchronization payload.

use std::convert::TryFrom;

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::{
    constants::{SYNC_24H, SYNC_PAYLOAD_LEN, SYNC_SET_TIME, SYNC_YEAR_BASE},
    Error, Result,
};

/// Values written to the watch by a sync.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncData {
    pub datetime: NaiveDateTime,
    /// Temperature in degrees Celsius.
    pub temperature: i16,
    /// Altitude in meters.
    pub altitude: i16,
}

impl SyncData {
    /// Encode the `SYNC_SEND_COMMAND` payload.
    pub fn encode(&self) -> Result<[u8; SYNC_PAYLOAD_LEN]> {
        let dt = &self.datetime;

        let year = u8::try_from(dt.year() - SYNC_YEAR_BASE).map_err(|_| {
            Error::OutOfRange(format!(
                "year {} can't be set on the watch (1792-2047)",
                dt.year()
            ))
        })?;
        let tenths = self.temperature.checked_mul(10).ok_or_else(|| {
            Error::OutOfRange(format!("temperature {} C", self.temperature))
        })?;

        let mut payload = [0u8; SYNC_PAYLOAD_LEN];
        payload[0x00] = SYNC_SET_TIME;
        payload[0x01] = dt.hour() as u8 | SYNC_24H;
        payload[0x02] = dt.minute() as u8;
        payload[0x03] = dt.second() as u8;
        payload[0x04] = 0x07;
        payload[0x05] = year;
        payload[0x06] = dt.month() as u8;
        payload[0x07] = dt.day() as u8;
        payload[0x08] = 0x06;
        payload[0x09] = 0x1E;
        (&mut payload[0x0A..0x0C]).copy_from_slice(&tenths.to_be_bytes());
        (&mut payload[0x0C..0x0E]).copy_from_slice(&self.altitude.to_be_bytes());

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(year: i32, month: u32, day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    #[test]
    fn test_encode() {
        let data = SyncData {
            datetime: at(2011, 6, 30, 13, 45, 7),
            temperature: 23,
            altitude: 430,
        };

        assert_eq!(
            data.encode().unwrap(),
            [
                0x03, 13 | 0x80, 45, 7, 0x07, 0xDB, 6, 30, 0x06, 0x1E, 0x00, 0xE6,
                0x01, 0xAE, 0, 0, 0, 0, 0,
            ]
        );
    }

    #[test]
    fn test_encode_negative_values() {
        let data = SyncData {
            datetime: at(2024, 1, 2, 0, 0, 0),
            temperature: -5,
            altitude: -20,
        };

        let payload = data.encode().unwrap();
        assert_eq!(payload[0x01], 0x80);
        assert_eq!(&payload[0x0A..0x0E], &[0xFF, 0xCE, 0xFF, 0xEC]);
    }

    #[test]
    fn test_encode_out_of_range() {
        let data = SyncData {
            datetime: at(2048, 1, 1, 0, 0, 0),
            temperature: 0,
            altitude: 0,
        };
        assert!(matches!(data.encode(), Err(Error::OutOfRange(_))));

        let data = SyncData {
            datetime: at(2020, 1, 1, 0, 0, 0),
            temperature: 4000,
            altitude: 0,
        };
        assert!(matches!(data.encode(), Err(Error::OutOfRange(_))));
    }
}
