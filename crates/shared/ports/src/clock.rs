use exchange_core::Timestamp;

/// Source of "now" for order, trade and book timestamps
///
/// Replays and tests swap in a clock that only moves when advanced, so
/// time priority in the book is reproducible.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Label used in startup logs
    fn name(&self) -> &str {
        "Clock"
    }
}
