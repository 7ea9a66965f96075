use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use exchange_core::Timestamp;
use exchange_ports::Clock;

/// Clock frozen at a fixed instant until advanced
///
/// Stored as microseconds since the Unix epoch so reads never block.
#[derive(Debug)]
pub struct ManualClock {
    micros: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            micros: AtomicI64::new(start.timestamp_micros()),
        }
    }

    pub fn starting_at_epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Move time forward (or backward, for a negative delta)
    pub fn advance(&self, delta: Duration) {
        let step = delta.num_microseconds().unwrap_or(i64::MAX);
        self.micros.fetch_add(step, Ordering::SeqCst);
    }

    /// Jump to an absolute instant
    pub fn set(&self, time: Timestamp) {
        self.micros.store(time.timestamp_micros(), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let micros = self.micros.load(Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp_micros(micros).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_only_moves_when_advanced() {
        let clock = ManualClock::starting_at_epoch();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);

        clock.advance(Duration::milliseconds(250));
        assert_eq!(clock.now() - t0, Duration::milliseconds(250));
    }

    #[test]
    fn test_set_jumps_to_instant() {
        let clock = ManualClock::starting_at_epoch();
        let target = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        clock.set(target);
        assert_eq!(clock.now(), target);
        assert_eq!(clock.name(), "ManualClock");
    }
}
