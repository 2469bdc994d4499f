/**
 * Actuator Mapper
 *
 * Converts commanded rudder and sail angles (degrees) into the PWM
 * microsecond values the microcontroller drives the servo and winch with.
 * No I/O; every output is clamped to the device range.
 */

use serde::{Deserialize, Serialize};

/// Rudder servo calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RudderMapping {
    /// PWM value for a centred servo
    pub center: f64,
    /// Fixed offset added after scaling
    pub trim: f64,
    /// Microseconds per degree of commanded angle
    pub ratio: f64,
    pub min: i32,
    pub max: i32,
}

impl Default for RudderMapping {
    fn default() -> Self {
        Self {
            center: 1500.0,
            trim: -65.0,
            // servo throw: 1711us over 22.5 degrees, geared 8:1
            ratio: (1711.0 / 22.5) / 8.0,
            min: 1000,
            max: 2000,
        }
    }
}

impl RudderMapping {
    /// PWM value for a rudder angle; NaN steers to the trimmed centre
    pub fn pwm(&self, angle: f64) -> i32 {
        let angle = if angle.is_nan() { 0.0 } else { angle };
        let amount = self.center + angle * self.ratio + self.trim;
        to_pwm(amount, self.min, self.max)
    }
}

/// Sail winch calibration. Both curves approximate a non-linear winch;
/// expect a few degrees of error near either end of travel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SailMapping {
    /// Straight line from `full_in` at 0 degrees, falling `range` over `max_angle`
    Linear {
        full_in: f64,
        range: f64,
        max_angle: f64,
        min: i32,
        max: i32,
    },
    /// Angle measured back from the fully-eased position, scaled into the
    /// winch's usable input range
    RangeNormalized {
        max_sail_angle: f64,
        full_in: i32,
        full_out: i32,
    },
    /// Rig has no winch
    #[serde(rename = "none")]
    NoWinch,
}

impl Default for SailMapping {
    fn default() -> Self {
        SailMapping::Linear {
            full_in: 2100.0,
            range: 1000.0,
            max_angle: 70.0,
            min: 1100,
            max: 2100,
        }
    }
}

impl SailMapping {
    /// PWM value for a sail angle, or `None` if the rig cannot trim its sail.
    /// The winch cannot tell port from starboard, so only the magnitude counts.
    /// NaN is treated as zero degrees.
    pub fn pwm(&self, angle: f64) -> Option<i32> {
        let angle = if angle.is_nan() { 0.0 } else { angle.abs() };
        match *self {
            SailMapping::Linear { full_in, range, max_angle, min, max } => {
                let amount = -angle * (range / max_angle) + full_in;
                Some(to_pwm(amount, min, max))
            }
            SailMapping::RangeNormalized { max_sail_angle, full_in, full_out } => {
                let effective = max_sail_angle - angle;
                let input_range = (full_in - full_out) as f64;
                let amount = -effective * (input_range / max_sail_angle) + full_in as f64;
                Some(to_pwm(amount, full_out, full_in))
            }
            SailMapping::NoWinch => None,
        }
    }
}

// the line protocol carries integers only; truncate like the firmware expects
fn to_pwm(amount: f64, min: i32, max: i32) -> i32 {
    (amount.trunc() as i32).clamp(min, max)
}
