/**
 * Position Tracker
 *
 * Turns the asynchronous fix stream from the positioning daemon into a
 * position that is always answerable:
 * 1. Wait (bounded) for a fix report
 * 2. Skip non-TPV reports, up to a fixed retry budget
 * 3. On success update the cached position, otherwise fall back to it
 */

pub mod gpsd;

pub use gpsd::GpsdSource;

use std::time::Duration;
use parking_lot::Mutex;
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_RETRY_BUDGET: usize = 15;

/// Report class for a full position-velocity-time fix
pub const TPV_CLASS: &str = "TPV";

/// One report from the fix stream, as gpsd emits it
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FixRecord {
    pub class: String,
    #[serde(default)]
    pub mode: Option<u8>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl FixRecord {
    /// A TPV report carrying both coordinates; anything else is noise.
    pub fn geo_fix(&self) -> Option<GeoFix> {
        if self.class != TPV_CLASS {
            return None;
        }
        match (self.lat, self.lon) {
            (Some(latitude), Some(longitude)) => Some(GeoFix { latitude, longitude }),
            _ => None,
        }
    }
}

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
}

/// Producer of fix reports (gpsd in the field, scripted in tests)
pub trait FixSource: Send {
    /// True if a report can be read without blocking past `timeout`
    fn has_data(&mut self, timeout: Duration) -> bool;

    /// Consume the next report
    fn next_fix(&mut self) -> Result<FixRecord>;
}

/// Where one `poll` ended up
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    /// Fresh authoritative fix, now also cached
    Resolved(GeoFix),
    /// No usable fix this cycle; carries the cached position
    Exhausted(GeoFix),
}

impl PollOutcome {
    pub fn position(&self) -> GeoFix {
        match *self {
            PollOutcome::Resolved(fix) | PollOutcome::Exhausted(fix) => fix,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PollState {
    Idle,
    Polling { retries: usize },
    Done(PollOutcome),
}

/// Bounded-retry poller with a last-known-good cache
pub struct PositionTracker {
    source: Mutex<Box<dyn FixSource>>,
    cached: Mutex<GeoFix>,
    poll_timeout: Duration,
    retry_budget: usize,
}

impl PositionTracker {
    pub fn new(source: Box<dyn FixSource>) -> Self {
        Self {
            source: Mutex::new(source),
            cached: Mutex::new(GeoFix::default()),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_retry_budget(mut self, retries: usize) -> Self {
        self.retry_budget = retries;
        self
    }

    /// Start from a known position instead of (0, 0)
    pub fn with_cached(self, fix: GeoFix) -> Self {
        *self.cached.lock() = fix;
        self
    }

    /// Last accepted position, (0, 0) until the first fix
    pub fn cached(&self) -> GeoFix {
        *self.cached.lock()
    }

    /// Latest position as (latitude, longitude); never fails.
    pub fn position(&self) -> (f64, f64) {
        let fix = self.poll().position();
        (fix.latitude, fix.longitude)
    }

    /// Run one polling cycle from Idle to Resolved or Exhausted.
    pub fn poll(&self) -> PollOutcome {
        let mut source = self.source.lock();
        let mut state = PollState::Idle;

        loop {
            state = match state {
                PollState::Idle => {
                    if source.has_data(self.poll_timeout) {
                        self.consume(&mut **source, 0)
                    } else {
                        self.exhausted("no fix data before timeout")
                    }
                }
                PollState::Polling { retries } => {
                    if retries < self.retry_budget && source.has_data(self.poll_timeout) {
                        self.consume(&mut **source, retries + 1)
                    } else {
                        self.exhausted("no TPV fix within retry budget")
                    }
                }
                PollState::Done(outcome) => return outcome,
            };
        }
    }

    fn consume(&self, source: &mut dyn FixSource, retries: usize) -> PollState {
        let record = match source.next_fix() {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Dropping unreadable fix report: {}", e);
                return PollState::Polling { retries };
            }
        };

        match record.geo_fix() {
            Some(fix) => {
                *self.cached.lock() = fix;
                log::debug!("Position fix {:.6}, {:.6}", fix.latitude, fix.longitude);
                PollState::Done(PollOutcome::Resolved(fix))
            }
            None => {
                log::trace!("Skipping {} report", record.class);
                PollState::Polling { retries }
            }
        }
    }

    fn exhausted(&self, reason: &str) -> PollState {
        let cached = self.cached();
        log::warn!(
            "{}, using cached position {:.6}, {:.6}",
            reason, cached.latitude, cached.longitude
        );
        PollState::Done(PollOutcome::Exhausted(cached))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sky, tpv, ScriptedFixes};
    use std::sync::atomic::Ordering;

    fn tracker(events: Vec<Option<FixRecord>>) -> PositionTracker {
        PositionTracker::new(Box::new(ScriptedFixes::new(events)))
    }

    #[test]
    fn test_no_data_returns_initial_cache() {
        let tracker = tracker(vec![None]);
        assert_eq!(tracker.position(), (0.0, 0.0));
    }

    #[test]
    fn test_single_tpv_resolves_and_caches() {
        let tracker = tracker(vec![Some(tpv(52.41, -4.08))]);
        assert_eq!(tracker.poll(), PollOutcome::Resolved(GeoFix { latitude: 52.41, longitude: -4.08 }));
        assert_eq!(tracker.cached(), GeoFix { latitude: 52.41, longitude: -4.08 });
    }

    #[test]
    fn test_timeout_keeps_previous_fix() {
        let tracker = tracker(vec![Some(tpv(52.41, -4.08)), None]);
        assert_eq!(tracker.position(), (52.41, -4.08));
        assert_eq!(
            tracker.poll(),
            PollOutcome::Exhausted(GeoFix { latitude: 52.41, longitude: -4.08 })
        );
    }

    #[test]
    fn test_skips_non_tpv_reports() {
        let tracker = tracker(vec![Some(sky()), Some(sky()), Some(tpv(1.5, 2.5))]);
        assert_eq!(tracker.position(), (1.5, 2.5));
    }

    #[test]
    fn test_noisy_stream_then_silence_returns_cache() {
        let mut events = vec![Some(tpv(10.0, 20.0))];
        events.extend((0..15).map(|_| Some(sky())));
        events.push(None);
        let tracker = tracker(events);

        assert_eq!(tracker.position(), (10.0, 20.0));
        assert_eq!(tracker.position(), (10.0, 20.0));
    }

    #[test]
    fn test_retry_budget_is_bounded() {
        //initial report plus 15 retries, the trailing TPV is never reached
        let mut events: Vec<Option<FixRecord>> = (0..16).map(|_| Some(sky())).collect();
        events.push(Some(tpv(5.0, 5.0)));
        let source = ScriptedFixes::new(events);
        let consumed = source.consumed();
        let tracker = PositionTracker::new(Box::new(source));

        assert_eq!(tracker.poll(), PollOutcome::Exhausted(GeoFix::default()));
        assert_eq!(consumed.load(Ordering::SeqCst), 16);

        //next call starts fresh and picks the TPV up
        assert_eq!(tracker.position(), (5.0, 5.0));
    }

    #[test]
    fn test_tpv_without_coordinates_is_not_authoritative() {
        let no_fix = FixRecord { class: "TPV".to_string(), mode: Some(1), lat: None, lon: None };
        let tracker = tracker(vec![Some(no_fix), None]);
        assert_eq!(tracker.poll(), PollOutcome::Exhausted(GeoFix::default()));
    }

    #[test]
    fn test_seeded_cache() {
        let seed = GeoFix { latitude: 52.0, longitude: -4.0 };
        let tracker = tracker(vec![None]).with_cached(seed);
        assert_eq!(tracker.poll(), PollOutcome::Exhausted(seed));
    }

    #[test]
    fn test_fix_record_from_gpsd_json() {
        let record: FixRecord = serde_json::from_str(
            r#"{"class":"TPV","device":"/dev/ttyUSB0","mode":3,"lat":52.4153,"lon":-4.0829,"alt":12.1}"#,
        ).unwrap();
        assert_eq!(record.geo_fix(), Some(GeoFix { latitude: 52.4153, longitude: -4.0829 }));

        let version: FixRecord = serde_json::from_str(r#"{"class":"VERSION","release":"3.22"}"#).unwrap();
        assert_eq!(version.geo_fix(), None);
    }
}
