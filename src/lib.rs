pub mod error;
pub mod config;
pub mod link;
pub mod position;
pub mod boat;
pub mod ffi;

#[cfg(feature = "python")]
pub mod python;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
pub use config::{RigConfig, WindSource};
pub use link::{SerialLink, CommandCodec, Command, Opcode, Response, MAX_COMMAND_LEN};
pub use position::{PositionTracker, FixSource, FixRecord, GeoFix, PollOutcome, GpsdSource};
pub use boat::{BoatDriver, RudderMapping, SailMapping};
