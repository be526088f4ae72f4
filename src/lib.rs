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

//! # Chronos Base Module library
//!
//! This a library to talk with the Chronos Base Module (CBM), the USB RF
//! access point shipped with the TI eZ430-Chronos watch.
//!
//! The base module is used to:
//!
//! - Stream accelerometer samples from the watch.
//! - Synchronize the watch time, temperature and altitude.
//! - Upload a new firmware to the watch through the wireless bootloader
//!   (WBSL).
//!
//! # Example
//!
//! ```rust,no_run
//! use chronos_cbm::{FirmwareImage, Options, Session, Source};
//! use std::path::Path;
//!
//! fn main() -> chronos_cbm::Result<()> {
//!     let port = chronos_cbm::open_port(Path::new("/dev/ttyACM0"))?;
//!     let mut session = Session::new(port, Options::default())?;
//!
//!     let image = FirmwareImage::load(Source::Path(Path::new("openchronos.txt")))?;
//!     session.firmware_update(&image, |_prompt| true, |_stage, _sent, _total| ())?;
//!
//!     Ok(())
//! }
//! ```

use std::{
    collections::VecDeque,
    convert::TryFrom,
    fmt,
    io,
    path::Path,
    thread,
    time::Duration,
};

use chrono::{Local, NaiveDateTime};
use serial::SerialPort;

pub mod accel;
pub mod burst;
pub mod command;
#[rustfmt::skip]
pub mod constants;
pub mod firmware;
pub mod ports;
pub mod sync;
pub mod wbsl;

mod error;
#[cfg(test)]
mod mock;

pub use self::{
    accel::{Axes, Sample, Units},
    burst::{Burst, BurstKind, Chunk},
    command::{Command, Opcode},
    error::{Error, Result},
    firmware::{FirmwareImage, Source},
    sync::SyncData,
    wbsl::{PacketStatus, Stage},
};

use self::{
    constants::{DEFAULT_MAX_BURST_LEN, FRAME_HEADER_LEN},
    wbsl::Step,
};

/// Delays required by the base module and the watch.
///
/// The defaults are the values known to work with the eZ430-Chronos access
/// point.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Timing {
    /// Wait between writing a command and reading its response.
    pub command_delay: Duration,
    /// Poll interval while the bootloader is `DISABLED`.
    pub disabled_poll: Duration,
    /// Poll interval while the bootloader is `PROCESSING`.
    pub processing_poll: Duration,
    /// Poll interval when the watch wants data but none is left.
    pub underflow_poll: Duration,
    /// Wait after `WBSL_START`.
    pub wbsl_start_settle: Duration,
    /// Wait before polling the first packet status of an upload.
    pub transmit_settle: Duration,
    /// Wait before and after the sync command.
    pub sync_settle: Duration,
    /// Wait after a firmware update.
    pub update_settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            command_delay: Duration::from_millis(15),
            disabled_poll: Duration::from_millis(200),
            processing_poll: Duration::from_millis(100),
            underflow_poll: Duration::from_millis(50),
            wbsl_start_settle: Duration::from_millis(100),
            transmit_settle: Duration::from_millis(500),
            sync_settle: Duration::from_secs(2),
            update_settle: Duration::from_secs(1),
        }
    }
}

/// Session options.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Options {
    /// Reset the base module when the session starts. Disable it to resume
    /// a running stream.
    pub reset: bool,
    /// Units of the accelerometer samples.
    pub units: Units,
    pub timing: Timing,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            reset: true,
            units: Units::default(),
            timing: Timing::default(),
        }
    }
}

/// Raw status payloads of the base module.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Status {
    /// `GET_STATUS`
    pub base: Vec<u8>,
    /// `WBSL_GET_STATUS`
    pub wbsl: Vec<u8>,
    /// `WBSL_GET_PACKET_STATUS`
    pub packet: Vec<u8>,
}

/// A session with a Chronos Base Module.
pub struct Session<P> {
    port: P,
    options: Options,
    max_burst_len: usize,
}

impl<P> Session<P>
where
    P: SerialPort,
{
    /// Create a new `Session` from an already opened port.
    ///
    /// This queries the base module status, resets it (unless
    /// [`Options::reset`] is `false`) and negotiates the maximum burst
    /// length.
    pub fn new(port: P, options: Options) -> Result<Self> {
        let mut session = Session {
            port,
            options,
            max_burst_len: DEFAULT_MAX_BURST_LEN,
        };

        log::debug!("Querying base module status");
        session.all_status()?;

        if session.options.reset {
            log::debug!("Resetting base module");
            session.reset()?;
            session.all_status()?;
        }

        // The first answer after opening the port can be stale, only the
        // second one is trusted.
        session.max_payload()?;
        let max_burst_len = session.max_payload()?;
        if max_burst_len == 0 {
            return Err(Error::MalformedResponse(
                "base module reported a zero burst length".into(),
            ));
        }
        session.max_burst_len = usize::from(max_burst_len);
        log::debug!("Maximum burst length set to {:#X}", max_burst_len);

        let status = session.all_status()?;
        log::debug!("Base module status: {:?}", status);

        Ok(session)
    }

    /// Burst length negotiated with the base module.
    pub fn max_burst_len(&self) -> usize {
        self.max_burst_len
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Send a command and wait for its response.
    pub fn send(&mut self, cmd: &Command) -> Result<Command> {
        self.port.write_all(&cmd.encode())?;
        self.port.flush()?;
        log::trace!("SENT: {}", cmd);

        thread::sleep(self.options.timing.command_delay);

        let mut header = [0u8; FRAME_HEADER_LEN];
        self.read_exact(&mut header, cmd.opcode)?;

        let mut payload = vec![0u8; command::payload_len(&header)?];
        self.read_exact(&mut payload, cmd.opcode)?;

        let response = Command {
            opcode: header[1],
            payload,
        };
        log::trace!("RECV: {}", response);

        Ok(response)
    }

    fn read_exact(&mut self, buf: &mut [u8], opcode: u8) -> Result<()> {
        match self.port.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::UnexpectedEof =>
            {
                Err(Error::NoResponse(opcode))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn command<D>(&mut self, opcode: Opcode, payload: D) -> Result<Vec<u8>>
    where
        D: Into<Vec<u8>>,
    {
        let response = self.send(&Command::new(opcode, payload))?;
        Ok(response.payload)
    }

    /// Reset the base module and return its status.
    pub fn reset(&mut self) -> Result<Vec<u8>> {
        self.command(Opcode::Reset, Vec::new())?;
        self.status()
    }

    /// Base module status.
    pub fn status(&mut self) -> Result<Vec<u8>> {
        self.command(Opcode::GetStatus, vec![0x00])
    }

    /// Wireless bootloader status.
    pub fn wbsl_status(&mut self) -> Result<Vec<u8>> {
        self.command(Opcode::WbslGetStatus, vec![0x00])
    }

    /// Raw `WBSL_GET_PACKET_STATUS` payload.
    pub fn wbsl_packet_status(&mut self) -> Result<Vec<u8>> {
        self.command(Opcode::WbslGetPacketStatus, vec![0x00])
    }

    /// Query every status of the base module.
    pub fn all_status(&mut self) -> Result<Status> {
        Ok(Status {
            base: self.status()?,
            wbsl: self.wbsl_status()?,
            packet: self.wbsl_packet_status()?,
        })
    }

    fn max_payload(&mut self) -> Result<u8> {
        let payload = self.command(Opcode::WbslGetMaxPayload, vec![0x00])?;
        payload.first().copied().ok_or_else(|| {
            Error::MalformedResponse("empty WBSL_GET_MAX_PAYLOAD response".into())
        })
    }

    fn packet_status(&mut self) -> Result<PacketStatus> {
        let payload = self.wbsl_packet_status()?;
        let status = payload.first().copied().ok_or_else(|| {
            Error::MalformedResponse("empty WBSL_GET_PACKET_STATUS response".into())
        })?;

        PacketStatus::try_from(status)
    }

    /// Stop the background radio.
    pub fn stop_radio(&mut self) -> Result<Vec<u8>> {
        self.command(Opcode::StopStreaming, Vec::new())
    }

    /// Start streaming data from the watch.
    pub fn start_streaming(&mut self) -> Result<Vec<u8>> {
        self.command(Opcode::StartStreaming, Vec::new())
    }

    /// Stop streaming data from the watch.
    ///
    /// The link is started again before being stopped, the base module
    /// doesn't always stop a running stream otherwise.
    pub fn stop_streaming(&mut self) -> Result<Vec<u8>> {
        self.start_streaming()?;
        self.command(Opcode::StopStreaming2, Vec::new())
    }

    /// Read the next accelerometer sample.
    ///
    /// A sample with [`Sample::valid`] set to `false` means the watch had
    /// no new data yet, poll again.
    pub fn read_acceleration(&mut self) -> Result<Sample> {
        let payload = self.command(Opcode::GetStreamData, vec![0x00; 4])?;
        Ok(Sample::decode(&payload, self.options.units))
    }

    pub fn sync_start(&mut self) -> Result<Vec<u8>> {
        self.command(Opcode::SyncStart, Vec::new())
    }

    pub fn sync_buffer_status(&mut self) -> Result<Vec<u8>> {
        self.command(Opcode::SyncGetBufferStatus, vec![0x00])
    }

    pub fn sync_read_buffer(&mut self) -> Result<Vec<u8>> {
        self.command(Opcode::SyncReadBuffer, vec![0x00])
    }

    /// Synchronize the time, temperature and altitude of the watch.
    ///
    /// `confirm` is called once the link is up and must return `true` when
    /// the watch has been set in sync mode. Without `datetime` the local
    /// time is read after the confirmation.
    pub fn sync<C>(
        &mut self,
        datetime: Option<NaiveDateTime>,
        temperature: i16,
        altitude: i16,
        mut confirm: C,
    ) -> Result<()>
    where
        C: FnMut(&str) -> bool,
    {
        self.start_streaming()?;
        if !confirm("Ready to sync. Is the watch in sync mode?") {
            return Err(Error::Cancelled);
        }
        thread::sleep(self.options.timing.sync_settle);

        let data = SyncData {
            datetime: datetime.unwrap_or_else(|| Local::now().naive_local()),
            temperature,
            altitude,
        };
        log::info!(
            "Syncing time {}, temperature {} C, altitude {} m",
            data.datetime,
            data.temperature,
            data.altitude
        );

        let payload = data.encode()?;
        self.command(Opcode::SyncSendCommand, payload.to_vec())?;
        thread::sleep(self.options.timing.sync_settle);
        self.stop_streaming()?;

        Ok(())
    }

    fn wbsl_start(&mut self) -> Result<Vec<u8>> {
        let payload = self.command(Opcode::WbslStart, Vec::new())?;
        thread::sleep(self.options.timing.wbsl_start_settle);
        Ok(payload)
    }

    fn wbsl_stop(&mut self) -> Result<Vec<u8>> {
        self.command(Opcode::WbslStop, Vec::new())
    }

    fn send_burst(&mut self, burst: &Burst) -> Result<()> {
        for payload in burst.to_payloads() {
            self.command(Opcode::WbslSendData, payload)?;
        }

        Ok(())
    }

    /// Upload an image through the wireless bootloader.
    ///
    /// `progress` is called with the number of bursts sent and the total
    /// after every burst.
    pub fn transmit<F>(&mut self, image: &FirmwareImage, mut progress: F) -> Result<()>
    where
        F: FnMut(usize, usize),
    {
        let mut queue: VecDeque<Burst> = image.to_bursts(self.max_burst_len).into();
        let total = queue.len();
        let count = u16::try_from(total)
            .map_err(|_| Error::OutOfRange(format!("{} bursts in a single upload", total)))?;
        log::info!("{} chunks, {} bursts", image.chunks().len(), total);

        self.wbsl_start()?;
        thread::sleep(self.options.timing.transmit_settle);

        loop {
            let status = self.packet_status()?;
            match status.step(queue.is_empty(), &self.options.timing) {
                Step::Wait(delay) => thread::sleep(delay),
                Step::SendSize => {
                    log::debug!("Sending burst count ({})", count);
                    self.command(Opcode::WbslSendData, wbsl::size_header(count).to_vec())?;
                }
                Step::SendBurst => {
                    if let Some(burst) = queue.pop_front() {
                        self.send_burst(&burst)?;
                        progress(total - queue.len(), total);
                    }
                }
                Step::Underflow(delay) => {
                    log::warn!("Burst queue underflow, waiting for the watch");
                    thread::sleep(delay);
                }
                Step::Finish => break,
            }
        }

        if !queue.is_empty() {
            log::warn!("Upload completed with {} bursts left", queue.len());
        }

        self.wbsl_stop()?;

        Ok(())
    }

    /// Write a new firmware to the watch.
    ///
    /// The RAM based updater is uploaded first, then `image`. `confirm` is
    /// called once before anything is sent.
    pub fn firmware_update<C, F>(
        &mut self,
        image: &FirmwareImage,
        mut confirm: C,
        mut progress: F,
    ) -> Result<()>
    where
        C: FnMut(&str) -> bool,
        F: FnMut(Stage, usize, usize),
    {
        let updater = FirmwareImage::updater()?;

        if !confirm("Start the update? The watch must be in rfbsl \"open\" mode.") {
            return Err(Error::Cancelled);
        }

        log::info!("Sending updater");
        self.transmit(&updater, |sent, total| progress(Stage::Updater, sent, total))?;

        log::info!("Sending new firmware");
        self.transmit(image, |sent, total| progress(Stage::Firmware, sent, total))?;

        thread::sleep(self.options.timing.update_settle);

        Ok(())
    }
}

impl<P> Drop for Session<P> {
    fn drop(&mut self) {
        log::debug!("Closing Chronos Base Module");
    }
}

impl<P> fmt::Debug for Session<P>
where
    P: SerialPort,
{
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Session")
            .field("options", &self.options)
            .field("max_burst_len", &self.max_burst_len)
            .finish()
    }
}

/// Default serial port settings of the base module.
pub fn port_settings() -> serial::PortSettings {
    serial::PortSettings {
        baud_rate: serial::BaudRate::from_speed(constants::BAUD_RATE),
        char_size: serial::CharSize::Bits8,
        parity: serial::Parity::ParityNone,
        stop_bits: serial::StopBits::Stop1,
        flow_control: serial::FlowControl::FlowNone,
    }
}

/// Read timeout of the base module responses.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Open and configure the serial port of a base module.
pub fn open_port(path: &Path) -> Result<serial::SystemPort> {
    let mut port = serial::open(path)?;
    port.set_timeout(READ_TIMEOUT)?;
    port.configure(&port_settings())?;

    Ok(port)
}
