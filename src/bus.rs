//! Line-oriented bus adapter: `topic payload` lines in on stdin, report
//! lines out on stdout. Stands in for whatever message transport fronts
//! the bridge.

use std::io::{self, Write};
use std::sync::mpsc::{self, TryRecvError};
use std::thread;

use crate::bridge::{AcCodec, Bridge, ReportSink, Transceiver};

/// Split one bus line into topic and payload.
pub fn parse_line(line: &str) -> (&str, &str) {
    match line.split_once(' ') {
        Some((topic, payload)) => (topic, payload.trim_start()),
        None => (line, ""),
    }
}

/// Publishes reports as `topic payload` lines on stdout.
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn publish(&mut self, topic: &str, payload: &str) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{} {}", topic, payload)?;
        out.flush()
    }
}

/// Run the bridge loop: device captures and stdin commands, one at a
/// time, until the bus side closes.
pub fn run<D, C, S>(bridge: &mut Bridge<D, C, S>) -> anyhow::Result<()>
where
    D: Transceiver,
    C: AcCodec,
    S: ReportSink,
{
    let lines = spawn_stdin_reader();

    bridge.device_mut().set_capture(true)?;
    log::info!("bridge running, reading bus messages from stdin");

    loop {
        bridge.poll()?;
        match lines.try_recv() {
            Ok(line) => {
                if line.is_empty() {
                    continue;
                }
                let (topic, payload) = parse_line(&line);
                bridge.handle_message(topic, payload.as_bytes());
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                log::info!("bus closed, shutting down");
                return Ok(());
            }
        }
    }
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(line.trim_end().to_string()).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    log::warn!("stdin read failed: {}", err);
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::parse_line;

    #[test]
    fn splits_topic_and_payload() {
        assert_eq!(
            parse_line("raw/state 3 0041 0032"),
            ("raw/state", "3 0041 0032")
        );
        assert_eq!(
            parse_line("ac/state  {\"power\":true}"),
            ("ac/state", "{\"power\":true}")
        );
    }

    #[test]
    fn topic_only_lines_have_empty_payloads() {
        assert_eq!(parse_line("raw/state"), ("raw/state", ""));
    }
}
