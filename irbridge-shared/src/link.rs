//! Serial link to the transceiver. Commands and replies travel as
//! postcard frames behind a two-byte little endian length header, so a
//! frame is only decoded once all of it has arrived.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use postcard::from_bytes;
use serialport::{SerialPort, SerialPortInfo};

use crate::protocol::{Command, Reply};

const BAUD_RATE: u32 = 115_200;
/// Per-read timeout, which is also the poll granularity callers see.
const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// How long to wait for a command acknowledgement.
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);
/// Upper bound on one frame; a bigger header means we lost framing.
const FRAME_MAX: usize = 8192;

pub struct SerialLink {
    port: Option<Box<dyn SerialPort>>,
    rxbuf: Vec<u8>,
    /// Replies that arrived while waiting for a different one.
    stashed: VecDeque<Reply>,
}

impl SerialLink {
    pub fn new() -> Self {
        SerialLink {
            port: None,
            rxbuf: Vec::new(),
            stashed: VecDeque::new(),
        }
    }

    pub fn list_ports() -> Result<Vec<SerialPortInfo>, serialport::Error> {
        serialport::available_ports()
    }

    pub fn connect<P: AsRef<Path>>(&mut self, path: P) -> Result<(), serialport::Error> {
        let path = path.as_ref().to_string_lossy();
        let port = serialport::new(path, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()?;
        self.port.replace(port);
        Ok(())
    }

    /// Send one command as a length-prefixed postcard frame.
    pub fn send_command(&mut self, cmd: &Command) -> io::Result<()> {
        let payload = postcard::to_stdvec(cmd)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        if payload.len() > FRAME_MAX {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "command frame too large",
            ));
        }
        let port = self.port.as_mut().ok_or(io::ErrorKind::NotConnected)?;
        let header = (payload.len() as u16).to_le_bytes();
        port.write_all(&header)?;
        port.write_all(&payload)?;
        Ok(())
    }

    /// Wait for an `Ok` acknowledgement. Captures that arrive in the
    /// meantime are stashed for the next poll rather than dropped.
    pub fn reply_ok(&mut self) -> io::Result<()> {
        let deadline = Instant::now() + REPLY_TIMEOUT;
        loop {
            if let Some(reply) = self.next_reply()? {
                match reply {
                    Reply::Ok => return Ok(()),
                    Reply::Capture { .. } => self.stashed.push_back(reply),
                    other => {
                        log::warn!("expected ack, got {:?}", other);
                        return Err(io::ErrorKind::InvalidData.into());
                    }
                }
            }
            if Instant::now() >= deadline {
                return Err(io::ErrorKind::TimedOut.into());
            }
        }
    }

    /// Block until some reply arrives.
    pub fn read_reply(&mut self) -> io::Result<Reply> {
        if let Some(reply) = self.stashed.pop_front() {
            return Ok(reply);
        }
        let deadline = Instant::now() + REPLY_TIMEOUT;
        loop {
            if let Some(reply) = self.next_reply()? {
                return Ok(reply);
            }
            if Instant::now() >= deadline {
                return Err(io::ErrorKind::TimedOut.into());
            }
        }
    }

    /// Single poll: the next reply if one is buffered or arrives within
    /// the read timeout, `None` otherwise.
    pub fn poll_reply(&mut self) -> io::Result<Option<Reply>> {
        if let Some(reply) = self.stashed.pop_front() {
            return Ok(Some(reply));
        }
        self.next_reply()
    }

    fn next_reply(&mut self) -> io::Result<Option<Reply>> {
        if let Some(reply) = self.try_decode()? {
            return Ok(Some(reply));
        }
        if self.fill_rx()? {
            return self.try_decode();
        }
        Ok(None)
    }

    /// One read from the port into the accumulator. `false` on timeout.
    fn fill_rx(&mut self) -> io::Result<bool> {
        let port = self.port.as_mut().ok_or(io::ErrorKind::NotConnected)?;
        let mut chunk = [0u8; 1024];
        match port.read(&mut chunk) {
            Ok(0) => Ok(false),
            Ok(n) => {
                self.rxbuf.extend_from_slice(&chunk[..n]);
                Ok(true)
            }
            Err(ref err) if err.kind() == io::ErrorKind::TimedOut => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Try to pop one complete frame off the accumulator.
    fn try_decode(&mut self) -> io::Result<Option<Reply>> {
        if self.rxbuf.len() < 2 {
            return Ok(None);
        }
        let need = u16::from_le_bytes([self.rxbuf[0], self.rxbuf[1]]) as usize;
        if need > FRAME_MAX {
            // Lost framing.
            self.rxbuf.clear();
            return Err(io::ErrorKind::InvalidData.into());
        }
        if self.rxbuf.len() < 2 + need {
            return Ok(None);
        }
        let reply = from_bytes::<Reply>(&self.rxbuf[2..2 + need])
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err));
        self.rxbuf.drain(..2 + need);
        reply.map(Some)
    }
}

impl Default for SerialLink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postcard::to_stdvec;

    fn frame(reply: &Reply) -> Vec<u8> {
        let payload = to_stdvec(reply).unwrap();
        let mut out = (payload.len() as u16).to_le_bytes().to_vec();
        out.extend_from_slice(&payload);
        out
    }

    #[test]
    fn decodes_a_buffered_frame() {
        let mut link = SerialLink::new();
        link.rxbuf = frame(&Reply::Ok);
        assert_eq!(link.try_decode().unwrap(), Some(Reply::Ok));
        assert!(link.rxbuf.is_empty());
    }

    #[test]
    fn waits_for_the_rest_of_a_partial_frame() {
        let mut link = SerialLink::new();
        let bytes = frame(&Reply::Ok);
        link.rxbuf.extend_from_slice(&bytes[..1]);
        assert_eq!(link.try_decode().unwrap(), None);
        link.rxbuf.extend_from_slice(&bytes[1..]);
        assert_eq!(link.try_decode().unwrap(), Some(Reply::Ok));
    }

    #[test]
    fn back_to_back_frames_decode_in_order() {
        let mut link = SerialLink::new();
        let info = Reply::Info {
            info: crate::protocol::Info {
                version: 1,
                samplerate: 500_000,
            },
        };
        link.rxbuf = frame(&info);
        link.rxbuf.extend_from_slice(&frame(&Reply::Ok));
        assert_eq!(link.try_decode().unwrap(), Some(info));
        assert_eq!(link.try_decode().unwrap(), Some(Reply::Ok));
    }

    #[test]
    fn a_wild_length_header_resets_the_accumulator() {
        let mut link = SerialLink::new();
        link.rxbuf = vec![0xFF, 0xFF, 0x00];
        assert!(link.try_decode().is_err());
        assert!(link.rxbuf.is_empty());
    }
}
