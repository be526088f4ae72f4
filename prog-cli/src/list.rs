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

use chronos_cbm::ports::PortInfo;

use anyhow::Result;

pub fn list() -> Result<()> {
    let ports = PortInfo::list_all();
    if ports.is_empty() {
        println!("No serial ports found");
    }

    for port in ports {
        let marker = if port.is_base_module() {
            " (Chronos Base Module)"
        } else {
            ""
        };

        match port.usb_info {
            Some(usb_info) => {
                let description: Vec<String> = usb_info
                    .manufacturer
                    .into_iter()
                    .chain(usb_info.product)
                    .collect();

                println!(
                    "- `{}` {:04X}:{:04X} {}{}",
                    port.port.to_string_lossy(),
                    usb_info.vid,
                    usb_info.pid,
                    description.join(" "),
                    marker
                );
            }
            None => println!("- `{}`{}", port.port.to_string_lossy(), marker),
        }
    }

    Ok(())
}
