use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::alert::domain::alarm_sound::AlarmSound;
use crate::alert::domain::alarm_state::{AlarmState, ResetOnDrop};

/// How one alarm playback ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AlarmOutcome {
    Played,
    Failed(String),
}

/// Completion side of a triggered alarm.
///
/// Dropping the handle detaches the task; it still runs to completion and
/// still resets the alarm state.
pub struct AlarmHandle {
    done_rx: crossbeam_channel::Receiver<AlarmOutcome>,
    thread: JoinHandle<()>,
}

impl AlarmHandle {
    /// Waits up to `timeout` for the task to report. `None` on timeout or
    /// if the task died without reporting.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<AlarmOutcome> {
        self.done_rx.recv_timeout(timeout).ok()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

/// Plays the alarm sound on its own thread and returns the shared
/// [`AlarmState`] to idle when playback ends, whether it succeeded, failed
/// or panicked.
pub struct AlarmPlayer {
    state: AlarmState,
    sound: Arc<dyn AlarmSound>,
    sound_path: PathBuf,
}

impl AlarmPlayer {
    pub fn new(state: AlarmState, sound: Arc<dyn AlarmSound>, sound_path: PathBuf) -> Self {
        Self {
            state,
            sound,
            sound_path,
        }
    }

    pub fn state(&self) -> &AlarmState {
        &self.state
    }

    /// Starts playback without blocking the caller.
    ///
    /// The caller is expected to have moved the state to active (see
    /// [`AlarmState::try_activate`]). If the task cannot be spawned the state
    /// is reset before the error is returned.
    pub fn trigger(&self) -> std::io::Result<AlarmHandle> {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let state = self.state.clone();
        let sound = Arc::clone(&self.sound);
        let path = self.sound_path.clone();

        let spawned = std::thread::Builder::new()
            .name("alarm".to_string())
            .spawn(move || {
                let reset = ResetOnDrop::new(state);
                let outcome = match sound.play(&path) {
                    Ok(()) => {
                        log::debug!("Alarm playback finished: {}", path.display());
                        AlarmOutcome::Played
                    }
                    Err(e) => {
                        log::error!("Error playing sound: {e}");
                        AlarmOutcome::Failed(e.to_string())
                    }
                };
                // Idle before anyone observes completion.
                drop(reset);
                let _ = done_tx.send(outcome);
            });

        match spawned {
            Ok(thread) => Ok(AlarmHandle { done_rx, thread }),
            Err(e) => {
                self.state.reset();
                Err(e)
            }
        }
    }
}
