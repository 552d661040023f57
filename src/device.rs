//! Serial-attached transceiver: the production implementation of the
//! bridge's device-facing seams.

use std::io;

use irbridge_shared::protocol::{AcCommand, CaptureData, Command, Info, RawFrame, Reply};
use irbridge_shared::SerialLink;

use crate::bridge::{AcCodec, AcObservation, Transceiver};

pub struct SerialTransceiver {
    link: SerialLink,
}

impl SerialTransceiver {
    pub fn new(link: SerialLink) -> Self {
        SerialTransceiver { link }
    }

    /// Query firmware version and samplerate.
    pub fn info(&mut self) -> io::Result<Info> {
        self.link.send_command(&Command::Info)?;
        loop {
            match self.link.read_reply()? {
                Reply::Info { info } => return Ok(info),
                Reply::Capture { .. } => {
                    log::debug!("skipping capture while waiting for info");
                }
                other => {
                    log::warn!("unexpected reply to info: {:?}", other);
                    return Err(io::ErrorKind::InvalidData.into());
                }
            }
        }
    }
}

impl Transceiver for SerialTransceiver {
    fn transmit_raw(&mut self, data: &[u16], carrier_khz: u8) -> io::Result<()> {
        let frame = RawFrame {
            carrier_khz,
            data: data.to_vec(),
        };
        self.link.send_command(&Command::TransmitRaw(frame))?;
        self.link.reply_ok()
    }

    fn transmit_ac(&mut self, cmd: &AcCommand) -> io::Result<()> {
        self.link.send_command(&Command::TransmitAc(cmd.clone()))?;
        self.link.reply_ok()
    }

    fn set_capture(&mut self, enabled: bool) -> io::Result<()> {
        let cmd = if enabled { Command::Capture } else { Command::Idle };
        self.link.send_command(&cmd)?;
        self.link.reply_ok()
    }

    fn poll_capture(&mut self) -> io::Result<Option<CaptureData>> {
        loop {
            match self.link.poll_reply()? {
                None => return Ok(None),
                Some(Reply::Capture { data }) => return Ok(Some(data)),
                Some(other) => log::debug!("discarding stray reply: {:?}", other),
            }
        }
    }
}

/// Codec that recognizes nothing: every capture goes out as a raw
/// report. AC interpretation belongs to an external protocol library
/// plugged in through [`AcCodec`].
pub struct NullAcCodec;

impl AcCodec for NullAcCodec {
    fn interpret(&mut self, _micros: &[u16]) -> Option<AcObservation> {
        None
    }
}
