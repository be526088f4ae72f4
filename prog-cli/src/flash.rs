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

use std::path::{Path, PathBuf};

use chronos_cbm::{FirmwareImage, Session, Source, Stage};
use serial::SystemPort;

use anyhow::{Context, Result};
use clap::ArgMatches;
use indicatif::{ProgressBar, ProgressStyle};

use crate::Failure;

/// Path given in the `FILE` argument of `rfbsl` and `prg`.
pub fn file_arg(matches: &ArgMatches<'_>) -> Result<PathBuf> {
    Ok(matches
        .value_of("FILE")
        .map(PathBuf::from)
        .ok_or(Failure::MissingFile)?)
}

/// Read a firmware file, after the device has been opened.
pub fn load_image(path: &Path) -> Result<FirmwareImage> {
    let image = FirmwareImage::load(Source::Path(path))
        .map_err(|e| anyhow::Error::new(e).context(Failure::File(path.to_owned())))?;

    let size: usize = image.chunks().iter().map(|c| c.data.len()).sum();
    log::info!(
        "Firmware file: `{}`, {} chunks, {} bytes",
        path.display(),
        image.chunks().len(),
        size
    );

    Ok(image)
}

/// Upload the updater and the firmware image.
pub fn flash(session: &mut Session<SystemPort>, image: &FirmwareImage) -> Result<()> {
    let mut progress = UploadProgress::default();

    session
        .firmware_update(image, crate::confirm, |stage, sent, total| {
            progress.update(stage, sent, total)
        })
        .context("Couldn't upload firmware")?;

    progress.finish();
    log::info!("Firmware uploaded");

    Ok(())
}

/// One progress bar per upload stage.
#[derive(Default)]
struct UploadProgress {
    stage: Option<Stage>,
    bar: Option<ProgressBar>,
}

impl UploadProgress {
    fn update(&mut self, stage: Stage, sent: usize, total: usize) {
        if self.stage != Some(stage) {
            self.finish();

            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg:>9} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} bursts")
                    .progress_chars("#>-"),
            );
            bar.set_message(&stage.to_string());

            self.stage = Some(stage);
            self.bar = Some(bar);
        }

        if let Some(bar) = &self.bar {
            bar.set_position(sent as u64);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}
