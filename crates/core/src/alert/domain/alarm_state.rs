use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "alarm currently sounding" flag.
///
/// Cloning shares the same flag. The capture loop only moves it
/// false -> true (via [`AlarmState::try_activate`]) and the alarm task only
/// moves it true -> false (via [`AlarmState::reset`]).
#[derive(Clone, Debug, Default)]
pub struct AlarmState {
    active: Arc<AtomicBool>,
}

impl AlarmState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Atomically flips idle -> active. Returns `false` if already active.
    pub fn try_activate(&self) -> bool {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn reset(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Resets the flag when dropped, so an alarm task that errors or panics
/// still returns the state to idle.
pub struct ResetOnDrop {
    state: AlarmState,
}

impl ResetOnDrop {
    pub fn new(state: AlarmState) -> Self {
        Self { state }
    }
}

impl Drop for ResetOnDrop {
    fn drop(&mut self) {
        self.state.reset();
    }
}
