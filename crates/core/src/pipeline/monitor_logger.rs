use std::collections::HashMap;
use std::time::Instant;

/// Operator-facing events from the capture loop.
///
/// Keeps the loop free of any particular output mechanism; the CLI logs
/// through `log`, tests record or discard.
pub trait MonitorLogger: Send {
    /// An alarm was raised. `labels` are every label seen in that frame,
    /// `matched` the ones on the watch-list.
    fn alert(&mut self, labels: &[String], matched: &[String]);

    /// How long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A frame finished its full cycle.
    fn frame_done(&mut self, index: usize);

    fn info(&mut self, message: &str);

    /// Something went wrong but the session continues.
    fn warn(&mut self, message: &str);

    /// End-of-session report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullMonitorLogger;

impl MonitorLogger for NullMonitorLogger {
    fn alert(&mut self, _labels: &[String], _matched: &[String]) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn frame_done(&mut self, _index: usize) {}
    fn info(&mut self, _message: &str) {}
    fn warn(&mut self, _message: &str) {}
}

/// Logs events through the `log` facade and keeps per-stage timings, frame
/// and alert counts for the shutdown summary.
pub struct StdoutMonitorLogger {
    timings: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames: usize,
    alerts: usize,
    warnings: usize,
}

impl StdoutMonitorLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
            alerts: 0,
            warnings: 0,
        }
    }

    /// Formatted session report, `None` if no frame was processed.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }
        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Session summary ({} frames, {} alerts, {:.1}s):",
            self.frames, self.alerts, elapsed_s
        )];

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, durations) in stages {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!("  {stage:8}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"));
        }

        if self.warnings > 0 {
            lines.push(format!("  Warnings: {}", self.warnings));
        }
        if elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.frames as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for StdoutMonitorLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorLogger for StdoutMonitorLogger {
    fn alert(&mut self, labels: &[String], matched: &[String]) {
        self.alerts += 1;
        log::warn!(
            "ALERT! Weapon detected: [{}] (matched {})",
            labels.join(", "),
            matched.join(", ")
        );
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn frame_done(&mut self, index: usize) {
        self.frames += 1;
        log::trace!("Frame {index} done");
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn warn(&mut self, message: &str) {
        self.warnings += 1;
        log::warn!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullMonitorLogger;
        logger.alert(&["knife".to_string()], &["knife".to_string()]);
        logger.timing("detect", 5.0);
        logger.frame_done(0);
        logger.info("hello");
        logger.warn("careful");
        logger.summary();
    }

    #[test]
    fn test_counts_frames_and_alerts() {
        let mut logger = StdoutMonitorLogger::new();
        logger.frame_done(0);
        logger.frame_done(1);
        logger.alert(
            &["knife".to_string(), "person".to_string()],
            &["knife".to_string()],
        );
        assert_eq!(logger.frames, 2);
        assert_eq!(logger.alerts, 1);
    }

    #[test]
    fn test_timing_records_per_stage() {
        let mut logger = StdoutMonitorLogger::new();
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("render", 2.0);

        let detect = &logger.timings["detect"];
        assert_eq!(detect.len(), 2);
        assert_relative_eq!(detect.iter().sum::<f64>() / 2.0, 25.0);
        assert_eq!(logger.timings["render"].len(), 1);
        assert!(!logger.timings.contains_key("capture"));
    }

    #[test]
    fn test_summary_lists_stages_and_counts() {
        let mut logger = StdoutMonitorLogger::new();
        logger.timing("render", 2.0);
        logger.timing("detect", 20.0);
        logger.frame_done(0);
        logger.alert(&["gun".to_string()], &["gun".to_string()]);
        logger.warn("detector hiccup");

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("1 frames, 1 alerts"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("render"));
        assert!(summary.contains("Warnings: 1"));
        assert!(summary.find("detect").unwrap() < summary.find("render").unwrap());
    }

    #[test]
    fn test_empty_session_has_no_summary() {
        let logger = StdoutMonitorLogger::new();
        assert!(logger.summary_string().is_none());
    }
}
