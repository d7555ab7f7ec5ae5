use std::time::Duration;

/// Exponential backoff: attempt `n` (starting at 1) waits `2 + 2^n` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub unit: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self { Self { unit: Duration::from_secs(1) } }
}

impl BackoffPolicy {
    pub fn new(unit: Duration) -> Self { Self { unit } }

    /// Saturates instead of overflowing for very large attempts.
    pub fn delay(&self, attempt: u32) -> Duration {
        let units = 2u32.checked_pow(attempt).map_or(u32::MAX, |p| p.saturating_add(2));
        self.unit.saturating_mul(units)
    }
}
