//! Dump captured signals as a vcd waveform for inspection in a wave
//! viewer.

use std::fs::File;
use std::io;

use vcd::{self, SimulationCommand, TimescaleUnit, Value};

/// Idle gap inserted between captures on the shared timeline.
const CAPTURE_GAP_US: u64 = 100_000;

/// Writes captures as a single-wire waveform, one capture after another.
pub struct VcdWriter<'a> {
    vcd: vcd::Writer<&'a mut File>,
    timestamp: u64,
    wire_id: vcd::IdCode,
}

impl<'a> VcdWriter<'a> {
    pub fn new(file: &'a mut File) -> Self {
        let vcd = vcd::Writer::new(file);

        Self {
            vcd,
            timestamp: 0,
            wire_id: vcd::IdCode::FIRST,
        }
    }

    /// Write the header: one wire, microsecond timescale.
    pub fn init(&mut self) -> io::Result<()> {
        let writer = &mut self.vcd;

        writer.timescale(1, TimescaleUnit::US)?;
        writer.add_module("ir")?;

        let id = writer.add_wire(1, "rx")?;
        self.wire_id = id;

        writer.upscope()?;
        writer.enddefinitions()?;

        writer.begin(SimulationCommand::Dumpvars)?;
        writer.change_scalar(id, Value::V0)?;
        writer.end()?;

        Ok(())
    }

    /// Append one capture of mark/space durations, starting with a mark.
    pub fn write_capture(&mut self, micros: &[u16]) -> io::Result<()> {
        let mut ts = 0u64;
        let mut level = true;
        for duration in micros {
            self.write_value(ts, level)?;
            ts += u64::from(*duration);
            level = !level;
        }
        // Line returns to idle after the frame.
        self.write_value(ts, false)?;
        self.add_offset(ts + CAPTURE_GAP_US);

        Ok(())
    }

    fn write_value(&mut self, ts: u64, high: bool) -> io::Result<()> {
        let offseted_ts = self.timestamp + ts;

        self.vcd.timestamp(offseted_ts)?;
        let value = if high { Value::V1 } else { Value::V0 };
        self.vcd.change_scalar(self.wire_id, value)?;

        Ok(())
    }

    fn add_offset(&mut self, offset: u64) {
        self.timestamp += offset;
    }
}
