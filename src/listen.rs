//! Standalone capture reporting, the bridge's receive half on its own.

use std::fs::File;
use std::path::PathBuf;

use crate::bridge::{Bridge, Transceiver};
use crate::bus::StdoutSink;
use crate::device::{NullAcCodec, SerialTransceiver};
use crate::vcdutils::VcdWriter;

use irbridge_shared::SerialLink;

/// Report captured signals until interrupted, optionally mirroring them
/// into a vcd file.
pub fn command_listen(link: SerialLink, capture_file: Option<PathBuf>) -> anyhow::Result<()> {
    log::info!("listening for captures");

    let mut file = match capture_file {
        Some(path) => Some(File::create(path)?),
        None => None,
    };

    let mut vcd = file.as_mut().map(|file| VcdWriter::new(file));

    if let Some(vcd) = vcd.as_mut() {
        vcd.init()?;
    }

    let mut bridge = Bridge::new(SerialTransceiver::new(link), NullAcCodec, StdoutSink);
    bridge.device_mut().set_capture(true)?;

    loop {
        if let Some(data) = bridge.device_mut().poll_capture()? {
            if let Some(vcd) = vcd.as_mut() {
                vcd.write_capture(&data.to_micros())?;
            }
            bridge.handle_capture(&data);
        }
    }
}
