use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::shared::annotation::AnnotatedFrame;
use crate::video::domain::display_surface::DisplaySurface;

/// Discards frames and tags. The operator quits by typing `q` and Enter.
pub struct HeadlessDisplay {
    quit: Arc<AtomicBool>,
    frames_shown: usize,
}

impl HeadlessDisplay {
    /// Watches the process's stdin for the quit command.
    pub fn new() -> Self {
        Self::with_input(std::io::BufReader::new(std::io::stdin()))
    }

    /// Watches `input` line by line on a background thread.
    pub fn with_input<R: BufRead + Send + 'static>(input: R) -> Self {
        let quit = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&quit);
        let spawned = std::thread::Builder::new()
            .name("quit-watch".to_string())
            .spawn(move || {
                for line in input.lines() {
                    let Ok(line) = line else { break };
                    if is_quit_command(&line) {
                        flag.store(true, Ordering::Release);
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            log::warn!("Cannot watch stdin for the quit command: {e}");
        }
        Self {
            quit,
            frames_shown: 0,
        }
    }

}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

fn is_quit_command(line: &str) -> bool {
    matches!(line.trim(), "q" | "Q" | "quit" | "exit")
}

impl DisplaySurface for HeadlessDisplay {
    fn show(&mut self, _annotated: &AnnotatedFrame) -> Result<(), Box<dyn std::error::Error>> {
        self.frames_shown += 1;
        Ok(())
    }

    fn exit_requested(&mut self) -> bool {
        self.quit.load(Ordering::Acquire)
    }

    fn close(&mut self) {
        log::debug!("Headless display closed after {} frames", self.frames_shown);
    }
}
