use serde::Serialize;

/// Inputs of the throttle decision.
///
/// `enabled` and `interval_seconds` come from the user configuration, only
/// `last_check` is owned by the updater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckState {
    /// Epoch seconds of the last completed check, `None` on first run
    pub last_check: Option<i64>,
    /// Minimum seconds between checks
    pub interval_seconds: u64,
    /// Whether checks are enabled at all
    pub enabled: bool,
}

impl CheckState {
    /// Epoch seconds at which the next check becomes due, `None` when one is
    /// due immediately or checks are disabled.
    #[must_use]
    pub fn next_due(&self) -> Option<i64> {
        if !self.enabled {
            return None;
        }
        let interval = i64::try_from(self.interval_seconds).unwrap_or(i64::MAX);
        self.last_check.map(|last| last.saturating_add(interval))
    }
}

/// Decide whether a check is due at `now` (epoch seconds).
///
/// - Disabled configuration: never due.
/// - No recorded check: due.
/// - Otherwise due once `now - last_check >= interval_seconds`.
///
/// A `last_check` in the future (clock moved backwards) is not due until the
/// clock catches up.
#[must_use]
pub fn should_check(state: &CheckState, now: i64) -> bool {
    if !state.enabled {
        return false;
    }

    let Some(last_check) = state.last_check else {
        return true;
    };

    let elapsed = i128::from(now) - i128::from(last_check);
    elapsed >= i128::from(state.interval_seconds)
}
