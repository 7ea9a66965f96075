use chrono::Utc;
use exchange_core::Timestamp;
use exchange_ports::Clock;

/// Wall-clock time source used by live engines
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn name(&self) -> &str {
        "SystemClock"
    }
}
