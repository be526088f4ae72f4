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

use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use super::{PortInfo, PortUsbInfo};

/// Device nodes the base module can be bound to.
const PATTERNS: &[&str] = &[
    "/dev/ttyACM*", // CDC-ACM, the base module default
    "/dev/ttyUSB*", // usb-serial with own driver
    "/dev/ttyS*",
];

fn read_line<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let mut file = BufReader::new(File::open(path)?);

    let mut line = String::new();
    file.read_line(&mut line)?;

    Ok(line.trim().to_owned())
}

fn read_id(path: PathBuf) -> Option<u16> {
    read_line(path)
        .ok()
        .and_then(|id| u16::from_str_radix(&id, 16).ok())
}

fn read_usb_info(usb_dev: &Path) -> Option<PortUsbInfo> {
    Some(PortUsbInfo {
        vid: read_id(usb_dev.join("idVendor"))?,
        pid: read_id(usb_dev.join("idProduct"))?,
        serial: read_line(usb_dev.join("serial")).ok(),
        manufacturer: read_line(usb_dev.join("manufacturer")).ok(),
        product: read_line(usb_dev.join("product")).ok(),
    })
}

fn port_info(port: &Path) -> io::Result<Option<PortInfo>> {
    let name = match port.file_name() {
        Some(name) => name.to_owned(),
        None => return Ok(None),
    };

    let device_path = Path::new("/sys/class/tty").join(&name).join("device");
    if !device_path.exists() {
        // Legacy ttyS nodes without hardware behind them.
        return Ok(None);
    }

    let device = fs::canonicalize(&device_path)?;
    let subsystem = fs::canonicalize(device.join("subsystem"))?;

    let usb_int = match subsystem.file_name().and_then(|s| s.to_str()) {
        Some("platform") => return Ok(None),
        Some("usb-serial") => device.parent().map(Path::to_path_buf),
        Some("usb") => Some(device),
        _ => None,
    };

    let usb_info = usb_int
        .as_deref()
        .and_then(Path::parent)
        .and_then(read_usb_info);

    Ok(Some(PortInfo {
        port: OsString::from(port),
        name,
        usb_info,
    }))
}

pub fn list_all() -> Vec<PortInfo> {
    let mut available = Vec::new();

    for pattern in PATTERNS {
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                log::debug!("Invalid pattern `{}`: {}", pattern, e);
                continue;
            }
        };

        for path in paths.flatten() {
            match port_info(&path) {
                Ok(Some(info)) => available.push(info),
                Ok(None) => (),
                Err(e) => log::debug!("Skipping `{}`: {}", path.display(), e),
            }
        }
    }

    available
}
