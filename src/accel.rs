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

//! Accelerometer samples streamed by the watch.

use std::fmt;

use crate::constants::ACCEL_SAMPLE_VALID;

/// Milli-g per bit of the sensor output, least significant bit first
/// (CMA3000-D0x datasheet, table 4).
const MGRAV_PER_BIT: [u32; 7] = [18, 36, 71, 143, 286, 571, 1142];

/// Offset added to the Z axis to compensate for the sensor mounting.
const Z_OFFSET: f64 = 0.42;

/// Units of the reported accelerometer axes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Units {
    /// Signed sensor counts.
    Raw,
    /// Acceleration in g.
    Gravity,
}

impl Default for Units {
    fn default() -> Self {
        Units::Gravity
    }
}

/// Axis readings of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Axes {
    Raw([i8; 3]),
    Gravity([f64; 3]),
}

impl fmt::Display for Axes {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axes::Raw([x, y, z]) => write!(fmt, "{} {} {}", x, y, z),
            Axes::Gravity([x, y, z]) => write!(fmt, "{} {} {}", x, y, z),
        }
    }
}

/// A sample read from the stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// `false` when the watch had no new data, the axes are zero then.
    pub valid: bool,
    pub axes: Axes,
}

impl Sample {
    /// Decode a `GET_STREAM_DATA` response payload.
    pub fn decode(payload: &[u8], units: Units) -> Sample {
        match payload {
            [ACCEL_SAMPLE_VALID, x, y, z, ..] => {
                let raw = [*x as i8, *y as i8, *z as i8];
                let axes = match units {
                    Units::Raw => Axes::Raw(raw),
                    Units::Gravity => Axes::Gravity([
                        to_gravity(raw[0]),
                        to_gravity(raw[1]),
                        to_gravity(raw[2]) + Z_OFFSET,
                    ]),
                };

                Sample { valid: true, axes }
            }
            _ => Sample {
                valid: false,
                axes: match units {
                    Units::Raw => Axes::Raw([0; 3]),
                    Units::Gravity => Axes::Gravity([0.0; 3]),
                },
            },
        }
    }
}

/// Convert a signed sensor reading to g.
pub fn to_gravity(raw: i8) -> f64 {
    let magnitude = raw.unsigned_abs();
    let mgrav: u32 = MGRAV_PER_BIT
        .iter()
        .enumerate()
        .filter(|(bit, _)| (magnitude >> bit) & 1 == 1)
        .map(|(_, mgrav)| mgrav)
        .sum();

    let g = f64::from(mgrav) / 1000.0;
    if raw < 0 {
        -g
    } else {
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_sign() {
        let sample = Sample::decode(&[0x01, 200, 5, 128], Units::Raw);
        assert!(sample.valid);
        assert_eq!(sample.axes, Axes::Raw([-56, 5, -128]));
    }

    #[test]
    fn test_gravity() {
        assert_eq!(to_gravity(0), 0.0);
        assert_eq!(to_gravity(127), 2267.0 / 1000.0);
        assert_eq!(to_gravity(-127), -2.267);
        // 200 is -56, 0b011_1000
        assert_eq!(to_gravity(200u8 as i8), -1.0);
    }

    #[test]
    fn test_gravity_z_offset() {
        let sample = Sample::decode(&[0x01, 0, 0, 0], Units::Gravity);
        assert_eq!(sample.axes, Axes::Gravity([0.0, 0.0, 0.42]));
    }

    #[test]
    fn test_no_new_data() {
        let sample = Sample::decode(&[0xFF, 1, 2, 3], Units::Gravity);
        assert!(!sample.valid);
        assert_eq!(sample.axes, Axes::Gravity([0.0; 3]));

        let sample = Sample::decode(&[], Units::Raw);
        assert!(!sample.valid);
        assert_eq!(sample.axes, Axes::Raw([0; 3]));
    }

    #[test]
    fn test_display() {
        assert_eq!(Axes::Raw([-56, 0, 12]).to_string(), "-56 0 12");
        assert_eq!(Axes::Gravity([-1.0, 0.5, 0.42]).to_string(), "-1 0.5 0.42");
    }
}
