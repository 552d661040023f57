//! One-shot transmissions from the command line.

use irbridge_shared::protocol::AcCommand;
use irbridge_shared::rawcode;
use irbridge_shared::staging::StagingBuffer;
use irbridge_shared::SerialLink;

use crate::bridge::Transceiver;
use crate::device::SerialTransceiver;

/// Decode a counted raw-frame message and transmit it.
pub fn send_raw(link: SerialLink, message: &str, carrier_khz: u8) -> anyhow::Result<()> {
    let mut staging = StagingBuffer::new();
    staging.load(message.as_bytes())?;
    let frame = rawcode::decode(staging.as_str())?;
    if frame.is_empty() {
        log::info!("frame declares no pulses, nothing to send");
        return Ok(());
    }

    log::info!("sending {} pulses at {} kHz", frame.len(), carrier_khz);

    let mut dev = SerialTransceiver::new(link);
    dev.transmit_raw(&frame, carrier_khz)?;
    log::info!("Got ok");

    Ok(())
}

/// Parse an AC command and hand it to the device protocol codec.
pub fn send_ac(link: SerialLink, json: &str) -> anyhow::Result<()> {
    let cmd: AcCommand = serde_json::from_str(json)?;

    log::info!("sending AC command: {:?}", cmd);

    let mut dev = SerialTransceiver::new(link);
    dev.transmit_ac(&cmd)?;
    log::info!("Got ok");

    Ok(())
}
