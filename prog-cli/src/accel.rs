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
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chronos_cbm::Session;
use serial::SystemPort;

use anyhow::{Context, Result};

/// Print samples until Ctrl-C, then stop the stream.
pub fn accel(session: &mut Session<SystemPort>) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let handler_running = Arc::clone(&running);
    ctrlc::set_handler(move || handler_running.store(false, Ordering::SeqCst))
        .context("Couldn't install the Ctrl-C handler")?;

    session
        .start_streaming()
        .context("Couldn't start streaming")?;
    log::info!("Streaming, press Ctrl-C to stop");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    while running.load(Ordering::SeqCst) {
        let sample = session
            .read_acceleration()
            .context("Couldn't read acceleration")?;

        if sample.valid {
            writeln!(out, "{}", sample.axes)?;
            out.flush()?;
        }
    }

    log::info!("Stopping stream");
    session.stop_streaming().context("Couldn't stop streaming")?;

    Ok(())
}
