//! The command dispatcher: routes inbound bus messages to the infrared
//! transceiver and turns captured signals into report publications.

use std::io;

use thiserror::Error;

use irbridge_shared::protocol::{AcCommand, AcState, CaptureData};
use irbridge_shared::rawcode::{self, RawCodeError};
use irbridge_shared::staging::{StagingBuffer, StagingError};
use irbridge_shared::DEFAULT_CARRIER_KHZ;

/// Bus topics the bridge listens and reports on.
///
/// The naming is historical: commands arrive on the `state` topics and
/// reports go out on the `command` topics.
pub struct Topics {
    pub ac_command: String,
    pub raw_command: String,
    pub ac_report: String,
    pub raw_report: String,
}

impl Default for Topics {
    fn default() -> Self {
        Topics {
            ac_command: "ac/state".into(),
            raw_command: "raw/state".into(),
            ac_report: "ac/command".into(),
            raw_report: "raw/command".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    Ac,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportKind {
    Ac,
    Raw,
}

impl Topics {
    fn classify(&self, topic: &str) -> Option<CommandKind> {
        if topic == self.ac_command {
            Some(CommandKind::Ac)
        } else if topic == self.raw_command {
            Some(CommandKind::Raw)
        } else {
            None
        }
    }

    fn report(&self, kind: ReportKind) -> &str {
        match kind {
            ReportKind::Ac => &self.ac_report,
            ReportKind::Raw => &self.raw_report,
        }
    }
}

/// The infrared transceiver as the bridge needs it.
pub trait Transceiver {
    /// Transmit one raw frame at the given carrier.
    fn transmit_raw(&mut self, data: &[u16], carrier_khz: u8) -> io::Result<()>;
    /// Hand a structured AC command to the device protocol codec.
    fn transmit_ac(&mut self, cmd: &AcCommand) -> io::Result<()>;
    /// Turn signal reception on or off.
    fn set_capture(&mut self, enabled: bool) -> io::Result<()>;
    /// Fetch the next captured signal, if one arrived.
    fn poll_capture(&mut self) -> io::Result<Option<CaptureData>>;
}

/// Receipt-side protocol interpretation: recognize an AC transmission in
/// a captured signal. The protocol logic itself lives outside the bridge.
pub trait AcCodec {
    fn interpret(&mut self, micros: &[u16]) -> Option<AcObservation>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcObservation {
    pub state: AcState,
    /// Human readable summary of the recognized transmission.
    pub description: String,
}

/// Where reports get published. Fire and forget: the bridge logs
/// failures and never retries.
pub trait ReportSink {
    fn publish(&mut self, topic: &str, payload: &str) -> io::Result<()>;
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error(transparent)]
    RawCode(#[from] RawCodeError),
    #[error("bad AC payload: {0}")]
    AcPayload(#[from] serde_json::Error),
    #[error("transceiver: {0}")]
    Device(#[from] io::Error),
}

/// Holds reception off for the duration of a command and re-enables it
/// when dropped, on every exit path.
struct CaptureGuard<'a, D: Transceiver> {
    dev: &'a mut D,
}

impl<'a, D: Transceiver> CaptureGuard<'a, D> {
    fn acquire(dev: &'a mut D) -> io::Result<Self> {
        dev.set_capture(false)?;
        Ok(CaptureGuard { dev })
    }

    fn dev(&mut self) -> &mut D {
        self.dev
    }
}

impl<'a, D: Transceiver> Drop for CaptureGuard<'a, D> {
    fn drop(&mut self) {
        if let Err(err) = self.dev.set_capture(true) {
            log::warn!("failed to re-enable capture: {}", err);
        }
    }
}

pub struct Bridge<D, C, S> {
    topics: Topics,
    staging: StagingBuffer,
    dev: D,
    codec: C,
    sink: S,
}

impl<D, C, S> Bridge<D, C, S>
where
    D: Transceiver,
    C: AcCodec,
    S: ReportSink,
{
    pub fn new(dev: D, codec: C, sink: S) -> Self {
        Self::with_topics(dev, codec, sink, Topics::default())
    }

    pub fn with_topics(dev: D, codec: C, sink: S, topics: Topics) -> Self {
        Bridge {
            topics,
            staging: StagingBuffer::new(),
            dev,
            codec,
            sink,
        }
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.dev
    }

    /// Route one inbound bus message. Failures are local: logged, the
    /// command dropped, never escalated.
    pub fn handle_message(&mut self, topic: &str, payload: &[u8]) {
        let kind = match self.topics.classify(topic) {
            Some(kind) => kind,
            None => {
                log::debug!("ignoring message on unhandled topic {:?}", topic);
                return;
            }
        };
        if let Err(err) = self.dispatch(kind, payload) {
            log::warn!("{}: command dropped: {}", topic, err);
        }
    }

    fn dispatch(&mut self, kind: CommandKind, payload: &[u8]) -> Result<(), BridgeError> {
        // Reception stays off for the whole command and comes back on
        // whichever way this returns.
        let mut rx = CaptureGuard::acquire(&mut self.dev)?;
        self.staging.load(payload)?;
        match kind {
            CommandKind::Ac => {
                let cmd: AcCommand = serde_json::from_str(self.staging.as_str())?;
                log::debug!("ac command: {:?}", cmd);
                rx.dev().transmit_ac(&cmd)?;
            }
            CommandKind::Raw => {
                let frame = rawcode::decode(self.staging.as_str())?;
                if frame.is_empty() {
                    log::debug!("empty raw frame, nothing to transmit");
                    return Ok(());
                }
                rx.dev().transmit_raw(&frame, DEFAULT_CARRIER_KHZ)?;
                log::info!("transmitted raw frame of {} pulses", frame.len());
            }
        }
        Ok(())
    }

    /// Publish one captured signal: an AC state report if the codec
    /// recognizes the transmission, a raw hex report otherwise.
    pub fn handle_capture(&mut self, data: &CaptureData) {
        if data.overflow {
            log::warn!("transceiver capture buffer overflowed");
        }
        let micros = data.to_micros();
        if micros.is_empty() {
            log::debug!("empty capture, ignoring");
            return;
        }
        match self.codec.interpret(&micros) {
            Some(obs) => {
                log::info!("captured {}", obs.description);
                match serde_json::to_string(&obs.state) {
                    Ok(json) => {
                        Self::publish(&mut self.sink, &self.topics, ReportKind::Ac, &json)
                    }
                    Err(err) => log::warn!("could not serialize AC state: {}", err),
                }
            }
            None => {
                log::info!("captured raw signal of {} pulses", micros.len());
                let payload = self.staging.render_report(&micros);
                Self::publish(&mut self.sink, &self.topics, ReportKind::Raw, payload);
            }
        }
    }

    /// Drain pending captures from the device through the report path.
    pub fn poll(&mut self) -> io::Result<()> {
        while let Some(data) = self.dev.poll_capture()? {
            self.handle_capture(&data);
        }
        Ok(())
    }

    fn publish(sink: &mut S, topics: &Topics, kind: ReportKind, payload: &str) {
        let topic = topics.report(kind);
        if let Err(err) = sink.publish(topic, payload) {
            log::warn!("publish to {} failed: {}", topic, err);
        }
    }
}
