//! Exchange Clock Infrastructure
//!
//! Time sources behind the `Clock` port:
//!
//! - [`SystemClock`]: wall-clock time for live runs
//! - [`ManualClock`]: time that only moves when told to, for tests and
//!   order replays where timestamps decide priority
//!
//! ```ignore
//! use exchange_clock::{Clock, ManualClock};
//! use chrono::Duration;
//!
//! let clock = ManualClock::starting_at_epoch();
//! let t0 = clock.now();
//! clock.advance(Duration::milliseconds(5));
//! assert!(clock.now() > t0);
//! ```

mod manual;
mod system;

pub use manual::ManualClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use exchange_ports::Clock;
