//! The staging buffer between the bus and the codec.

use thiserror::Error;

use crate::rawcode;
use crate::STAGING_CAPACITY;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StagingError {
    /// Payload would not fit: content may use at most `STAGING_CAPACITY - 1`
    /// bytes, the last slot stays reserved.
    #[error("payload of {0} bytes does not fit the staging buffer")]
    TooLong(usize),
    #[error("payload is not text")]
    NotText,
}

/// Fixed-capacity text buffer holding one in-flight message at a time.
///
/// Inbound payloads are staged here before dispatch, and outbound raw
/// reports are rendered into the same storage. The buffer belongs to the
/// dispatcher and is only reachable through `&mut self`, which rules out
/// concurrent writers.
pub struct StagingBuffer {
    text: heapless::String<STAGING_CAPACITY>,
}

impl StagingBuffer {
    pub fn new() -> Self {
        StagingBuffer {
            text: heapless::String::new(),
        }
    }

    /// Stage one inbound payload, replacing any previous content.
    ///
    /// Too-long payloads are rejected before anything is copied, so the
    /// previous content stays intact.
    pub fn load(&mut self, payload: &[u8]) -> Result<&str, StagingError> {
        if payload.len() >= STAGING_CAPACITY {
            return Err(StagingError::TooLong(payload.len()));
        }
        let text = core::str::from_utf8(payload).map_err(|_| StagingError::NotText)?;
        self.text.clear();
        if self.text.push_str(text).is_err() {
            return Err(StagingError::TooLong(payload.len()));
        }
        Ok(self.text.as_str())
    }

    /// Render a timing array into the buffer as a raw report payload.
    pub fn render_report(&mut self, values: &[u16]) -> &str {
        self.text.clear();
        rawcode::encode(values, &mut self.text);
        self.text.as_str()
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

impl Default for StagingBuffer {
    fn default() -> Self {
        Self::new()
    }
}
