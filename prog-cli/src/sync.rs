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

use chronos_cbm::Session;
use serial::SystemPort;

use anyhow::{Context, Result};
use clap::ArgMatches;

pub struct SyncArgs {
    temperature: i16,
    altitude: i16,
}

impl SyncArgs {
    pub fn from_matches(matches: &ArgMatches<'_>) -> Result<SyncArgs> {
        Ok(SyncArgs {
            temperature: matches
                .value_of("TEMP")
                .unwrap_or("0")
                .parse()
                .context("Invalid temperature, must be an integer in degrees Celsius")?,
            altitude: matches
                .value_of("ALTITUDE")
                .unwrap_or("0")
                .parse()
                .context("Invalid altitude, must be an integer in meters")?,
        })
    }
}

/// Sync subcommand entry point, the watch gets the local time.
pub fn sync(session: &mut Session<SystemPort>, args: &SyncArgs) -> Result<()> {
    session
        .sync(None, args.temperature, args.altitude, crate::confirm)
        .context("Couldn't synchronize the watch")?;

    log::info!("Watch synchronized");

    Ok(())
}
