//! Shared pieces of the irbridge workspace: the hex text codec for raw
//! infrared frames, the staging buffer the bridge parks messages in, and
//! the wire protocol spoken to the transceiver.

pub mod protocol;
pub mod rawcode;
pub mod staging;

#[cfg(feature = "utils")]
mod link;
#[cfg(feature = "utils")]
pub use crate::link::SerialLink;

/// Upper bound on the number of mark/space entries in one raw frame.
pub const MAX_RAW_ELEMS: usize = 1024;

/// Staging buffer capacity: a four-digit token and separator per element,
/// plus room for the count header and a reserved terminator slot.
pub const STAGING_CAPACITY: usize = 5 * MAX_RAW_ELEMS + 8;

/// Carrier frequency for raw transmissions unless overridden.
pub const DEFAULT_CARRIER_KHZ: u8 = 38;
