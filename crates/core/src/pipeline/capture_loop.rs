use std::time::Instant;

use thiserror::Error;

use crate::alert::alarm_player::AlarmPlayer;
use crate::alert::domain::alert_evaluator::{matched_labels, should_trigger};
use crate::alert::domain::target_set::TargetSet;
use crate::detection::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::detection::Detection;
use crate::video::domain::display_surface::DisplaySurface;
use crate::video::domain::frame_source::{CaptureError, FrameSource};

use super::monitor_logger::MonitorLogger;

/// Errors that end a monitoring session.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("failed to capture frame: {0}")]
    FrameAcquisition(#[from] CaptureError),
    #[error("failed to display frame: {0}")]
    Display(String),
}

/// What a session did before the operator stopped it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub frames: usize,
    pub alerts: usize,
}

/// The monitoring session: capture, detect, alert, render, repeat.
///
/// Frames are handled strictly one at a time in capture order. The only
/// concurrent work is the alarm playback task, which [`AlarmPlayer`] runs
/// detached. Single-use: `run` consumes the loop.
pub struct CaptureLoop {
    source: Box<dyn FrameSource>,
    detector: Box<dyn ObjectDetector>,
    annotator: FrameAnnotator,
    display: Box<dyn DisplaySurface>,
    targets: TargetSet,
    alarm: AlarmPlayer,
    logger: Box<dyn MonitorLogger>,
}

impl CaptureLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn ObjectDetector>,
        annotator: FrameAnnotator,
        display: Box<dyn DisplaySurface>,
        targets: TargetSet,
        alarm: AlarmPlayer,
        logger: Box<dyn MonitorLogger>,
    ) -> Self {
        Self {
            source,
            detector,
            annotator,
            display,
            targets,
            alarm,
            logger,
        }
    }

    /// Runs until the operator asks to stop (`Ok`) or a frame cannot be
    /// captured or shown (`Err`). The source is released and the display
    /// closed exactly once on every path, including panics.
    pub fn run(self) -> Result<SessionReport, MonitorError> {
        let CaptureLoop {
            source,
            mut detector,
            annotator,
            display,
            targets,
            alarm,
            mut logger,
        } = self;
        let mut devices = Devices::new(source, display);
        let mut report = SessionReport::default();

        let result = loop {
            // 1. capture
            let t = Instant::now();
            let frame = match devices.source.read() {
                Ok(frame) => frame,
                Err(e) => break Err(MonitorError::from(e)),
            };
            logger.timing("capture", ms_since(t));

            // 2. detect; a failing detector costs one frame's annotations
            let t = Instant::now();
            let detections = match detector.detect(&frame) {
                Ok(dets) => dets,
                Err(e) => {
                    logger.warn(&format!("Detection failed on frame {}: {e}", frame.index()));
                    Vec::new()
                }
            };
            logger.timing("detect", ms_since(t));

            // 3-5. evaluate and maybe raise the alarm
            let labels = Detection::labels(&detections);
            if should_trigger(&labels, &targets, alarm.state().is_active())
                && alarm.state().try_activate()
            {
                report.alerts += 1;
                logger.alert(&labels, &matched_labels(&labels, &targets));
                if let Err(e) = alarm.trigger() {
                    logger.warn(&format!("Could not start alarm playback: {e}"));
                }
            }

            // 6. render
            let t = Instant::now();
            let annotated = annotator.annotate(&frame, &detections);
            if let Err(e) = devices.display.show(&annotated) {
                break Err(MonitorError::Display(e.to_string()));
            }
            logger.timing("render", ms_since(t));

            report.frames += 1;
            logger.frame_done(frame.index());

            // 7. exit request
            if devices.display.exit_requested() {
                logger.info("Exit requested by operator");
                break Ok(report);
            }
        };

        devices.shutdown();
        if let Err(e) = &result {
            logger.warn(&e.to_string());
        }
        logger.summary();
        result
    }
}

fn ms_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Owns the capture source and display for the session and gives them back
/// exactly once, either through `shutdown` or on drop.
struct Devices {
    source: Box<dyn FrameSource>,
    display: Box<dyn DisplaySurface>,
    released: bool,
}

impl Devices {
    fn new(source: Box<dyn FrameSource>, display: Box<dyn DisplaySurface>) -> Self {
        Self {
            source,
            display,
            released: false,
        }
    }

    fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.source.release();
        self.display.close();
    }
}

impl Drop for Devices {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::domain::alarm_sound::{AlarmSound, PlaybackError};
    use crate::alert::domain::alarm_state::AlarmState;
    use crate::pipeline::monitor_logger::NullMonitorLogger;
    use crate::shared::annotation::AnnotatedFrame;
    use crate::shared::detection::BoundingBox;
    use crate::shared::frame::Frame;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    // --- Stubs ---

    #[derive(Default)]
    struct Counters {
        reads: AtomicUsize,
        releases: AtomicUsize,
        closes: AtomicUsize,
        plays: AtomicUsize,
        shown: Mutex<Vec<AnnotatedFrame>>,
        alerts: Mutex<Vec<Vec<String>>>,
        warnings: Mutex<Vec<String>>,
    }

    /// Yields `frames` 16x16 black frames, then fails. Sleeps before the
    /// frames listed in `delays`.
    struct ScriptedSource {
        counters: Arc<Counters>,
        frames: usize,
        delays: HashMap<usize, Duration>,
        next: usize,
    }

    impl FrameSource for ScriptedSource {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            self.counters.reads.fetch_add(1, Ordering::SeqCst);
            if self.next >= self.frames {
                return Err(CaptureError::FrameAcquisition("camera unplugged".to_string()));
            }
            if let Some(d) = self.delays.get(&self.next) {
                std::thread::sleep(*d);
            }
            let frame = Frame::filled(16, 16, [0, 0, 0], self.next);
            self.next += 1;
            Ok(frame)
        }

        fn release(&mut self) {
            self.counters.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Returns the scripted labels for each frame index; `None` means
    /// inference fails on that frame.
    struct ScriptedDetector {
        script: HashMap<usize, Option<Vec<&'static str>>>,
    }

    impl ObjectDetector for ScriptedDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            match self.script.get(&frame.index()) {
                Some(None) => Err("inference failed".into()),
                Some(Some(labels)) => Ok(labels
                    .iter()
                    .map(|l| Detection {
                        label: l.to_string(),
                        class_id: 0,
                        confidence: 0.9,
                        bbox: BoundingBox::new(2.0, 2.0, 12.0, 12.0),
                    })
                    .collect()),
                None => Ok(Vec::new()),
            }
        }
    }

    struct RecordingDisplay {
        counters: Arc<Counters>,
        exit_after: Option<usize>,
    }

    impl DisplaySurface for RecordingDisplay {
        fn show(&mut self, annotated: &AnnotatedFrame) -> Result<(), Box<dyn std::error::Error>> {
            self.counters.shown.lock().unwrap().push(annotated.clone());
            Ok(())
        }

        fn exit_requested(&mut self) -> bool {
            let shown = self.counters.shown.lock().unwrap().len();
            self.exit_after.is_some_and(|n| shown >= n)
        }

        fn close(&mut self) {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct BrokenDisplay;

    impl DisplaySurface for BrokenDisplay {
        fn show(&mut self, _annotated: &AnnotatedFrame) -> Result<(), Box<dyn std::error::Error>> {
            Err("window system gone".into())
        }
        fn exit_requested(&mut self) -> bool {
            false
        }
        fn close(&mut self) {}
    }

    struct TimedSound {
        counters: Arc<Counters>,
        duration: Duration,
    }

    impl AlarmSound for TimedSound {
        fn play(&self, _path: &Path) -> Result<(), PlaybackError> {
            self.counters.plays.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.duration);
            Ok(())
        }
    }

    struct RecordingLogger {
        counters: Arc<Counters>,
    }

    impl MonitorLogger for RecordingLogger {
        fn alert(&mut self, labels: &[String], _matched: &[String]) {
            self.counters.alerts.lock().unwrap().push(labels.to_vec());
        }
        fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
        fn frame_done(&mut self, _index: usize) {}
        fn info(&mut self, _message: &str) {}
        fn warn(&mut self, message: &str) {
            self.counters.warnings.lock().unwrap().push(message.to_string());
        }
    }

    // --- Helpers ---

    struct Harness {
        counters: Arc<Counters>,
        state: AlarmState,
        frames: usize,
        delays: HashMap<usize, Duration>,
        script: HashMap<usize, Option<Vec<&'static str>>>,
        exit_after: Option<usize>,
        sound_duration: Duration,
    }

    impl Harness {
        fn new(frames: usize) -> Self {
            Self {
                counters: Arc::new(Counters::default()),
                state: AlarmState::new(),
                frames,
                delays: HashMap::new(),
                script: HashMap::new(),
                exit_after: None,
                sound_duration: Duration::from_millis(1),
            }
        }

        fn labels(mut self, index: usize, labels: Vec<&'static str>) -> Self {
            self.script.insert(index, Some(labels));
            self
        }

        fn failing_detection(mut self, index: usize) -> Self {
            self.script.insert(index, None);
            self
        }

        fn build(&self) -> CaptureLoop {
            let sound = TimedSound {
                counters: Arc::clone(&self.counters),
                duration: self.sound_duration,
            };
            CaptureLoop::new(
                Box::new(ScriptedSource {
                    counters: Arc::clone(&self.counters),
                    frames: self.frames,
                    delays: self.delays.clone(),
                    next: 0,
                }),
                Box::new(ScriptedDetector {
                    script: self.script.clone(),
                }),
                FrameAnnotator::with_line_width(1),
                Box::new(RecordingDisplay {
                    counters: Arc::clone(&self.counters),
                    exit_after: self.exit_after,
                }),
                TargetSet::default(),
                AlarmPlayer::new(self.state.clone(), Arc::new(sound), PathBuf::from("enemy.mp3")),
                Box::new(RecordingLogger {
                    counters: Arc::clone(&self.counters),
                }),
            )
        }

        fn wait_until_idle(&self) -> bool {
            let start = Instant::now();
            while start.elapsed() < TIMEOUT {
                if !self.state.is_active() {
                    return true;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            false
        }

        fn shown_indices(&self) -> Vec<usize> {
            self.counters
                .shown
                .lock()
                .unwrap()
                .iter()
                .map(|a| a.frame.index())
                .collect()
        }
    }

    // --- Tests ---

    #[test]
    fn test_capture_failure_on_fifth_read_releases_once() {
        let h = Harness::new(4);
        let result = h.build().run();

        assert!(matches!(
            result,
            Err(MonitorError::FrameAcquisition(CaptureError::FrameAcquisition(_)))
        ));
        assert_eq!(h.counters.reads.load(Ordering::SeqCst), 5);
        assert_eq!(h.counters.releases.load(Ordering::SeqCst), 1);
        assert_eq!(h.counters.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_operator_exit_stops_loop_and_releases() {
        let mut h = Harness::new(100);
        h.exit_after = Some(3);
        let report = h.build().run().unwrap();

        assert_eq!(report.frames, 3);
        assert_eq!(h.counters.reads.load(Ordering::SeqCst), 3);
        assert_eq!(h.counters.releases.load(Ordering::SeqCst), 1);
        assert_eq!(h.counters.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_frames_rendered_in_capture_order() {
        let h = Harness::new(6);
        let _ = h.build().run();
        assert_eq!(h.shown_indices(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_no_alert_without_target_labels() {
        let h = Harness::new(3).labels(0, vec!["person", "chair"]);
        let _ = h.build().run();
        assert!(h.counters.alerts.lock().unwrap().is_empty());
        assert_eq!(h.counters.plays.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_alert_lists_every_label_in_frame() {
        let h = Harness::new(2).labels(1, vec!["person", "Knife"]);
        let _ = h.build().run();

        let alerts = h.counters.alerts.lock().unwrap();
        assert_eq!(*alerts, vec![vec!["person".to_string(), "Knife".to_string()]]);
    }

    #[test]
    fn test_sounding_alarm_suppresses_further_triggers() {
        let mut h = Harness::new(5);
        for i in 0..5 {
            h = h.labels(i, vec!["knife"]);
        }
        h.sound_duration = Duration::from_millis(500);
        let report = h.build().run().unwrap_err();
        assert!(matches!(report, MonitorError::FrameAcquisition(_)));

        assert_eq!(h.counters.alerts.lock().unwrap().len(), 1);
        assert!(h.wait_until_idle());
        assert_eq!(h.counters.plays.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_alarm_can_fire_again_after_it_finishes() {
        let mut h = Harness::new(4)
            .labels(0, vec!["knife"])
            .labels(3, vec!["gun"]);
        h.delays.insert(3, Duration::from_millis(300));
        let _ = h.build().run();

        assert!(h.wait_until_idle());
        assert_eq!(h.counters.alerts.lock().unwrap().len(), 2);
        assert_eq!(h.counters.plays.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_detector_failure_skips_annotations_but_keeps_running() {
        let h = Harness::new(3)
            .failing_detection(1)
            .labels(2, vec!["rifle"]);
        let _ = h.build().run();

        assert_eq!(h.shown_indices(), vec![0, 1, 2]);
        let shown = h.counters.shown.lock().unwrap();
        assert!(shown[1].frame.data().iter().all(|&b| b == 0));
        assert!(shown[1].tags.is_empty());
        assert!(shown[2].frame.data().iter().any(|&b| b != 0));
        assert_eq!(shown[2].tags[0].text, "rifle 0.90");
        drop(shown);

        let warnings = h.counters.warnings.lock().unwrap();
        assert!(warnings.iter().any(|w| w.contains("frame 1")));
        assert_eq!(h.counters.alerts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_display_failure_ends_session_and_releases() {
        let counters = Arc::new(Counters::default());
        let session = CaptureLoop::new(
            Box::new(ScriptedSource {
                counters: Arc::clone(&counters),
                frames: 10,
                delays: HashMap::new(),
                next: 0,
            }),
            Box::new(ScriptedDetector {
                script: HashMap::new(),
            }),
            FrameAnnotator::new(),
            Box::new(BrokenDisplay),
            TargetSet::default(),
            AlarmPlayer::new(
                AlarmState::new(),
                Arc::new(TimedSound {
                    counters: Arc::clone(&counters),
                    duration: Duration::ZERO,
                }),
                PathBuf::from("enemy.mp3"),
            ),
            Box::new(NullMonitorLogger),
        );

        assert!(matches!(session.run(), Err(MonitorError::Display(_))));
        assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_devices_release_on_drop_only_once() {
        let counters = Arc::new(Counters::default());
        let mut devices = Devices::new(
            Box::new(ScriptedSource {
                counters: Arc::clone(&counters),
                frames: 0,
                delays: HashMap::new(),
                next: 0,
            }),
            Box::new(RecordingDisplay {
                counters: Arc::clone(&counters),
                exit_after: None,
            }),
        );
        devices.shutdown();
        drop(devices);
        assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }
}
