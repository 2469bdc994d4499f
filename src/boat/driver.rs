/**
 * Boat Driver
 *
 * The sensor/actuator surface the autopilot framework calls into:
 * 1. Sensor reads go through the command codec to the microcontroller
 * 2. Actuator angles are mapped to PWM values, then sent
 * 3. Position comes from the tracker, never failing
 *
 * Every method takes `&self`; the serial link serializes the wire.
 */

use std::sync::Arc;
use std::thread;

use crate::config::{RigConfig, WindSource};
use crate::error::{Error, Result};
use crate::link::{CommandCodec, SerialLink};
use crate::position::{GpsdSource, PositionTracker};

/// Wrap any angle into [0, 360)
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

type Parts = (CommandCodec, PositionTracker);

/// Sensor/actuator facade for one rig
pub struct BoatDriver {
    rig: RigConfig,
    codec: CommandCodec,
    tracker: PositionTracker,
}

impl BoatDriver {
    /// Assemble a driver from already-open parts
    pub fn from_parts(rig: RigConfig, codec: CommandCodec, tracker: PositionTracker) -> Self {
        Self { rig, codec, tracker }
    }

    /// Open the rig's serial port and gpsd, retrying the whole sequence
    /// after the configured settle delay.
    pub fn connect(rig: RigConfig) -> Result<Self> {
        Self::connect_with(rig, Self::open_once)
    }

    pub(crate) fn connect_with<F>(rig: RigConfig, open: F) -> Result<Self>
    where
        F: FnMut(&RigConfig) -> Result<Parts>,
    {
        let (codec, tracker) = Self::open_devices(&rig, open)?;
        Ok(Self { rig, codec, tracker })
    }

    /// Close the serial port and re-run the connection sequence on a live
    /// driver. The cached position carries over. If every attempt fails the
    /// link stays closed and serial calls fail with `Error::Io` until a
    /// later reconnect succeeds; position keeps serving the old tracker.
    pub fn reconnect(&mut self) -> Result<()> {
        self.reconnect_with(Self::open_once)
    }

    pub(crate) fn reconnect_with<F>(&mut self, open: F) -> Result<()>
    where
        F: FnMut(&RigConfig) -> Result<Parts>,
    {
        // serial ports open exclusively; the old handle must be gone first
        self.codec.link().close();

        let (codec, tracker) = Self::open_devices(&self.rig, open)?;
        self.codec = codec;
        self.tracker = tracker.with_cached(self.tracker.cached());
        Ok(())
    }

    fn open_devices<F>(rig: &RigConfig, mut open: F) -> Result<Parts>
    where
        F: FnMut(&RigConfig) -> Result<Parts>,
    {
        let attempts = rig.reconnect.attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            // devices may still be resetting after power-up
            if !rig.reconnect.settle_delay().is_zero() {
                thread::sleep(rig.reconnect.settle_delay());
            }

            match open(rig) {
                Ok(parts) => {
                    log::info!("[{}] Connected on attempt {}/{}", rig.name, attempt, attempts);
                    return Ok(parts);
                }
                Err(e) => {
                    log::warn!("[{}] Connection attempt {}/{} failed: {}", rig.name, attempt, attempts, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::connection(rig.serial.port.as_str(), "no attempts made")))
    }

    fn open_once(rig: &RigConfig) -> Result<Parts> {
        let link = SerialLink::open(&rig.serial.port, rig.serial.baud)?;

        if rig.serial.discard_banner {
            match link.read_line() {
                Ok(banner) => log::debug!("[{}] Discarded banner {:?}", rig.name, banner),
                Err(Error::Timeout) => log::debug!("[{}] No banner before timeout", rig.name),
                Err(e) => return Err(e),
            }
        }

        let source = GpsdSource::connect(&rig.gpsd.address)?;
        let tracker = PositionTracker::new(Box::new(source))
            .with_poll_timeout(rig.gpsd.poll_timeout())
            .with_retry_budget(rig.gpsd.retry_budget);

        Ok((CommandCodec::new(Arc::new(link)), tracker))
    }

    pub fn rig(&self) -> &RigConfig {
        &self.rig
    }

    pub fn codec(&self) -> &CommandCodec {
        &self.codec
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    /// Compass heading in degrees
    pub fn heading(&self) -> Result<f64> {
        self.codec.get_heading()
    }

    /// Pitch in degrees, `None` if the rig has no pitch sensor
    pub fn pitch(&self) -> Result<Option<f64>> {
        if !self.rig.sensors.pitch {
            return Ok(None);
        }
        self.codec.get_pitch().map(Some)
    }

    /// Roll in degrees, `None` if the rig has no roll sensor
    pub fn roll(&self) -> Result<Option<f64>> {
        if !self.rig.sensors.roll {
            return Ok(None);
        }
        self.codec.get_roll().map(Some)
    }

    /// Absolute (true) wind direction in [0, 360)
    pub fn wind_direction(&self) -> Result<Option<f64>> {
        match self.rig.sensors.wind {
            WindSource::Vane => {
                let heading = self.codec.get_heading()?;
                let relative = self.codec.get_wind()?;
                Ok(Some(normalize_degrees(heading + relative)))
            }
            WindSource::Fixed { absolute } => Ok(Some(normalize_degrees(absolute))),
            WindSource::Unsupported => Ok(None),
        }
    }

    /// Wind direction relative to the bow in [0, 360)
    pub fn apparent_wind_direction(&self) -> Result<Option<f64>> {
        match self.rig.sensors.wind {
            WindSource::Vane => Ok(Some(normalize_degrees(self.codec.get_wind()?))),
            WindSource::Fixed { absolute } => {
                let heading = self.codec.get_heading()?;
                Ok(Some(normalize_degrees(absolute - heading)))
            }
            WindSource::Unsupported => Ok(None),
        }
    }

    /// None of the supported rigs carry an anemometer
    pub fn wind_speed(&self) -> Option<f64> {
        None
    }

    /// Latest (latitude, longitude); stale rather than failing
    pub fn position(&self) -> (f64, f64) {
        self.tracker.position()
    }

    /// Steer to `angle` degrees; returns the PWM value the firmware applied
    pub fn rudder(&self, angle: f64) -> Result<i32> {
        let pwm = self.rig.rudder.pwm(angle);
        log::debug!("[{}] rudder {:.1} deg -> {}", self.rig.name, angle, pwm);
        self.codec.set_rudder(pwm)
    }

    /// Trim the sail to `angle` degrees; `None` if the rig has no winch
    pub fn sail(&self, angle: f64) -> Result<Option<i32>> {
        match self.rig.sail.pwm(angle) {
            Some(pwm) => {
                log::debug!("[{}] sail {:.1} deg -> {}", self.rig.name, angle, pwm);
                self.codec.set_sail(pwm).map(Some)
            }
            None => Ok(None),
        }
    }
}
