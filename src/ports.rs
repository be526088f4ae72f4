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

//! Serial port discovery.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::constants::{CBM_USB_PID, CBM_USB_VID};

#[cfg(target_os = "linux")]
mod list_linux;

/// Paths where the base module usually shows up, tried in order.
pub const DEVICE_GUESSES: &[&str] = &[
    "/dev/ttyACM0",
    "/dev/ttyUSB0",
    "/dev/cu.usbmodem001",
];

/// Information about an available serial port.
#[derive(Debug)]
pub struct PortInfo {
    pub port: OsString,
    pub name: OsString,
    pub usb_info: Option<PortUsbInfo>,
}

impl PortInfo {
    /// List all serial ports on the system.
    #[cfg(target_os = "linux")]
    pub fn list_all() -> Vec<PortInfo> {
        self::list_linux::list_all()
    }

    /// Port listing is only supported on Linux.
    #[cfg(not(target_os = "linux"))]
    pub fn list_all() -> Vec<PortInfo> {
        Vec::new()
    }

    /// Whether the port belongs to a Chronos Base Module.
    pub fn is_base_module(&self) -> bool {
        self.usb_info
            .as_ref()
            .map(|usb| usb.vid == CBM_USB_VID && usb.pid == CBM_USB_PID)
            .unwrap_or(false)
    }
}

/// Information about USB serial ports.
#[derive(Debug)]
pub struct PortUsbInfo {
    /// USB Vendor ID.
    pub vid: u16,
    /// USB Product ID.
    pub pid: u16,
    /// Serial number string.
    pub serial: Option<String>,
    /// Device manufacturer.
    pub manufacturer: Option<String>,
    /// Device product description.
    pub product: Option<String>,
}

/// Guess the device path of the base module.
///
/// The common device paths are tried first, then any listed port with the
/// base module USB IDs.
pub fn guess_device() -> Option<PathBuf> {
    guess_from(&PortInfo::list_all(), |path| path.exists())
}

fn guess_from<F>(ports: &[PortInfo], exists: F) -> Option<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    DEVICE_GUESSES
        .iter()
        .map(PathBuf::from)
        .find(|path| exists(path))
        .or_else(|| {
            ports
                .iter()
                .find(|port| port.is_base_module())
                .map(|port| PathBuf::from(&port.port))
        })
}
