//! Wire protocol spoken to the transceiver over the serial link, plus the
//! structured AC command and state carried across the bus.

use serde::{Deserialize, Serialize};

use crate::MAX_RAW_ELEMS;

/// Capture samples travel in fixed chunks; 32 keeps the arrays within
/// serde's derivable sizes.
pub const CAPTURE_CHUNK: usize = 32;
pub const CAPTURE_CHUNKS: usize = MAX_RAW_ELEMS / CAPTURE_CHUNK;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stop capturing, go quiet.
    Idle,
    /// Start or resume capture mode.
    Capture,
    Info,
    /// Transmit one raw frame.
    TransmitRaw(RawFrame),
    /// Hand a structured AC command to the on-device protocol codec.
    TransmitAc(AcCommand),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    Capture { data: CaptureData },
    Info { info: Info },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub carrier_khz: u8,
    pub data: Vec<u16>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub version: u32,
    /// Capture samplerate in Hz.
    pub samplerate: u32,
}

/// One captured signal as delivered by the transceiver: `len` entries of
/// timer ticks at `samplerate`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CaptureData {
    pub samplerate: u32,
    /// Valid element count; entries beyond it are padding.
    pub len: u32,
    /// The device capture buffer filled up before the signal ended.
    pub overflow: bool,
    pub bufs: [[u16; CAPTURE_CHUNK]; CAPTURE_CHUNKS],
}

impl CaptureData {
    /// Pack a tick buffer into the chunked wire layout.
    pub fn from_ticks(samplerate: u32, ticks: &[u16], overflow: bool) -> Self {
        let mut data = CaptureData {
            samplerate,
            len: ticks.len().min(MAX_RAW_ELEMS) as u32,
            overflow,
            bufs: [[0; CAPTURE_CHUNK]; CAPTURE_CHUNKS],
        };
        for (i, tick) in ticks.iter().take(MAX_RAW_ELEMS).enumerate() {
            data.bufs[i / CAPTURE_CHUNK][i % CAPTURE_CHUNK] = *tick;
        }
        data
    }

    /// Flatten to mark/space durations in microseconds.
    ///
    /// The tick length is derived from the samplerate as whole
    /// microseconds, never below one, and durations saturate at
    /// `u16::MAX` rather than wrap.
    pub fn to_micros(&self) -> Vec<u16> {
        if self.samplerate == 0 {
            return Vec::new();
        }
        let tick_us = u64::from((1_000_000 / self.samplerate).max(1));
        let len = (self.len as usize).min(MAX_RAW_ELEMS);
        self.bufs
            .concat()
            .into_iter()
            .take(len)
            .map(|t| (u64::from(t) * tick_us).min(u64::from(u16::MAX)) as u16)
            .collect()
    }
}

/// Structured AC command as carried on the bus. Absent fields take the
/// defaults the bridge has always applied to partial payloads.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AcCommand {
    pub power: bool,
    pub temperature: i32,
    pub mode: String,
    pub fan: String,
    pub protocol: String,
    pub model: i32,
}

impl Default for AcCommand {
    fn default() -> Self {
        AcCommand {
            power: false,
            temperature: 24,
            mode: "cool".into(),
            fan: "auto".into(),
            protocol: "GREE".into(),
            model: 0,
        }
    }
}

/// Decoded AC state as published on the report channel. Field order here
/// is the published JSON order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AcState {
    pub protocol: String,
    pub model: i32,
    pub power: bool,
    pub temperature: f32,
    pub mode: String,
    pub fan: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_ticks_scale_to_micros() {
        // 500 kHz sampling, 2 µs per tick.
        let data = CaptureData::from_ticks(500_000, &[100, 200, 50], false);
        assert_eq!(data.to_micros(), vec![200, 400, 100]);
    }

    #[test]
    fn capture_durations_saturate() {
        // 40 kHz sampling, 25 µs per tick, 40000 ticks is a full second.
        let data = CaptureData::from_ticks(40_000, &[40_000], false);
        assert_eq!(data.to_micros(), vec![u16::MAX]);
    }

    #[test]
    fn capture_len_is_honored() {
        let mut data = CaptureData::from_ticks(500_000, &[1, 2, 3, 4], false);
        data.len = 2;
        assert_eq!(data.to_micros(), vec![2, 4]);
    }

    #[test]
    fn dead_samplerate_yields_nothing() {
        let data = CaptureData::from_ticks(0, &[1, 2], false);
        assert_eq!(data.to_micros(), Vec::<u16>::new());
    }

    #[test]
    fn tick_packing_spans_chunk_boundaries() {
        let ticks: Vec<u16> = (0..100).collect();
        let data = CaptureData::from_ticks(1_000_000, &ticks, false);
        assert_eq!(data.bufs[1][1], 33);
        assert_eq!(data.to_micros(), ticks);
    }

    #[test]
    fn partial_ac_payload_gets_the_usual_defaults() {
        let cmd: AcCommand = serde_json::from_str(r#"{"power":true}"#).unwrap();
        assert!(cmd.power);
        assert_eq!(cmd.temperature, 24);
        assert_eq!(cmd.mode, "cool");
        assert_eq!(cmd.fan, "auto");
        assert_eq!(cmd.protocol, "GREE");
        assert_eq!(cmd.model, 0);
    }

    #[test]
    fn commands_survive_the_wire_format() {
        let cmd = Command::TransmitRaw(RawFrame {
            carrier_khz: 38,
            data: vec![0x0041, 0x0032, 0x0F9C],
        });
        let bytes = postcard::to_stdvec(&cmd).unwrap();
        assert_eq!(postcard::from_bytes::<Command>(&bytes).unwrap(), cmd);
    }
}
