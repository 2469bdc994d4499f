/**
 * Boat Module
 *
 * Rig-facing layer that combines:
 * - Actuator mapping (angles to PWM microseconds)
 * - The driver facade the autopilot framework loads
 */

pub mod actuator;
pub mod driver;

pub use actuator::{RudderMapping, SailMapping};
pub use driver::{normalize_degrees, BoatDriver};
