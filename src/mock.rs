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

//! Scripted base module used by the session tests.

use std::{
    collections::VecDeque,
    io,
    time::Duration,
};

use serial::SerialPort;

use crate::{
    command::{self, Command},
    constants::FRAME_HEADER_LEN,
};

/// A serial port that decodes every written frame and queues the reply
/// returned by `respond`. A `None` reply leaves the port silent.
pub struct BaseModule<F> {
    pending: Vec<u8>,
    output: VecDeque<u8>,
    pub received: Vec<Command>,
    respond: F,
}

impl<F> BaseModule<F>
where
    F: FnMut(&Command) -> Option<Vec<u8>>,
{
    pub fn new(respond: F) -> Self {
        BaseModule {
            pending: Vec::new(),
            output: VecDeque::new(),
            received: Vec::new(),
            respond,
        }
    }

    pub fn opcodes(&self) -> Vec<u8> {
        self.received.iter().map(|cmd| cmd.opcode).collect()
    }

    fn process(&mut self) {
        while self.pending.len() >= FRAME_HEADER_LEN {
            let header = [self.pending[0], self.pending[1], self.pending[2]];
            let len = command::payload_len(&header).expect("host sent a bad frame");
            if self.pending.len() < FRAME_HEADER_LEN + len {
                return;
            }

            let frame: Vec<u8> = self.pending.drain(..FRAME_HEADER_LEN + len).collect();
            let cmd = Command::decode(&frame).unwrap();
            if let Some(reply) = (self.respond)(&cmd) {
                let reply = Command {
                    opcode: cmd.opcode,
                    payload: reply,
                };
                self.output.extend(reply.encode());
            }
            self.received.push(cmd);
        }
    }
}

impl<F> io::Read for BaseModule<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.output.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
        }

        let n = buf.len().min(self.output.len());
        for (dst, src) in buf.iter_mut().zip(self.output.drain(..n)) {
            *dst = src;
        }

        Ok(n)
    }
}

impl<F> io::Write for BaseModule<F>
where
    F: FnMut(&Command) -> Option<Vec<u8>>,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.process();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<F> SerialPort for BaseModule<F>
where
    F: FnMut(&Command) -> Option<Vec<u8>>,
{
    fn timeout(&self) -> Duration {
        unreachable!()
    }
    fn set_timeout(&mut self, _timeout: Duration) -> serial::Result<()> {
        unreachable!()
    }
    fn configure(&mut self, _settings: &serial::PortSettings) -> serial::Result<()> {
        unreachable!()
    }
    fn reconfigure(
        &mut self,
        _setup: &dyn Fn(&mut dyn serial::SerialPortSettings) -> serial::Result<()>,
    ) -> serial::Result<()> {
        unreachable!()
    }
    fn set_rts(&mut self, _level: bool) -> serial::Result<()> {
        unreachable!()
    }
    fn set_dtr(&mut self, _level: bool) -> serial::Result<()> {
        unreachable!()
    }
    fn read_cts(&mut self) -> serial::Result<bool> {
        unreachable!()
    }
    fn read_dsr(&mut self) -> serial::Result<bool> {
        unreachable!()
    }
    fn read_ri(&mut self) -> serial::Result<bool> {
        unreachable!()
    }
    fn read_cd(&mut self) -> serial::Result<bool> {
        unreachable!()
    }
}
