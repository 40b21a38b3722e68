use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use tripwire_core::alert::alarm_player::AlarmPlayer;
use tripwire_core::alert::domain::alarm_state::AlarmState;
use tripwire_core::alert::domain::target_set::TargetSet;
use tripwire_core::audio::infrastructure::cpal_alarm_sound::CpalAlarmSound;
use tripwire_core::detection::domain::frame_annotator::FrameAnnotator;
use tripwire_core::detection::domain::object_detector::ObjectDetector;
use tripwire_core::detection::infrastructure::execution_provider::accelerator_name;
use tripwire_core::detection::infrastructure::model_resolver;
use tripwire_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloDetector, DEFAULT_CONFIDENCE,
};
use tripwire_core::pipeline::capture_loop::{CaptureLoop, MonitorError, SessionReport};
use tripwire_core::pipeline::monitor_logger::StdoutMonitorLogger;
use tripwire_core::shared::constants::{
    DEFAULT_ALARM_SOUND, DEFAULT_CAMERA_INDEX, DEFAULT_MODEL_NAME, DEFAULT_TARGET_LABELS,
    WINDOW_TITLE,
};
use tripwire_core::video::domain::display_surface::DisplaySurface;
use tripwire_core::video::infrastructure::ffmpeg_camera::{CaptureInput, FfmpegCamera};
use tripwire_core::video::infrastructure::headless_display::HeadlessDisplay;

/// Watches a camera and sounds an alarm when a target object is detected.
#[derive(Parser, Debug)]
#[command(name = "tripwire")]
struct Cli {
    /// YOLOv8 ONNX model. Looked up in the model cache if not found here.
    #[arg(long, default_value = DEFAULT_MODEL_NAME)]
    model: PathBuf,

    /// Download URL for the model when it is not present locally.
    #[arg(long)]
    model_url: Option<String>,

    /// Labels that raise the alarm (comma-separated, case-insensitive).
    #[arg(long, value_delimiter = ',', default_values = DEFAULT_TARGET_LABELS)]
    targets: Vec<String>,

    /// Sound file played when the alarm fires.
    #[arg(long, default_value = DEFAULT_ALARM_SOUND)]
    alarm_sound: PathBuf,

    /// Camera index.
    #[arg(long, default_value_t = DEFAULT_CAMERA_INDEX)]
    device: usize,

    /// Read from a video file or stream URL instead of the camera.
    #[arg(long)]
    source: Option<String>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f32,

    /// Run without a window; type `q` and Enter to quit.
    #[arg(long)]
    headless: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let targets = TargetSet::new(&cli.targets);

    let input = match &cli.source {
        Some(url) => CaptureInput::Url(url.clone()),
        None => CaptureInput::Device(cli.device),
    };
    let camera = FfmpegCamera::open(input)?;
    if let Some((width, height)) = camera.frame_size() {
        log::info!("Capturing {width}x{height} frames");
    }
    let detector = build_detector(&cli)?;
    let display = build_display(cli.headless);

    if !cli.alarm_sound.is_file() {
        log::warn!(
            "Alarm sound {} not found; alerts will be logged only",
            cli.alarm_sound.display()
        );
    }
    let alarm = AlarmPlayer::new(
        AlarmState::new(),
        Arc::new(CpalAlarmSound::new()),
        cli.alarm_sound.clone(),
    );

    log::info!("Weapon Detection Alarm System Running...");
    log::info!(
        "Alarm will trigger on: {}",
        targets.iter().collect::<Vec<_>>().join(", ")
    );
    if cli.headless {
        log::info!("Type 'q' and Enter to quit.");
    } else {
        log::info!("Press 'q' to quit.");
    }

    let session = CaptureLoop::new(
        Box::new(camera),
        detector,
        FrameAnnotator::new(),
        display,
        targets,
        alarm,
        Box::new(StdoutMonitorLogger::new()),
    );
    let result = session.run();
    log::info!("{}", stop_message(&result));
    result?;
    Ok(())
}

fn stop_message(result: &Result<SessionReport, MonitorError>) -> String {
    match result {
        Ok(report) => format!(
            "System stopped ({} frames, {} alerts).",
            report.frames, report.alerts
        ),
        Err(_) => "System stopped.".to_string(),
    }
}

fn build_detector(cli: &Cli) -> Result<Box<dyn ObjectDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {}", cli.model.display());
    let model_path = model_resolver::resolve(
        &cli.model,
        cli.model_url.as_deref(),
        Some(Box::new(download_progress)),
    )?;
    log::info!("Running inference on {}", accelerator_name());
    Ok(Box::new(OnnxYoloDetector::new(&model_path, cli.confidence)?))
}

#[cfg(feature = "window")]
fn build_display(headless: bool) -> Box<dyn DisplaySurface> {
    use tripwire_core::video::infrastructure::highgui_display::HighguiDisplay;

    if headless {
        Box::new(HeadlessDisplay::new())
    } else {
        Box::new(HighguiDisplay::new(WINDOW_TITLE))
    }
}

#[cfg(not(feature = "window"))]
fn build_display(headless: bool) -> Box<dyn DisplaySurface> {
    if !headless {
        log::warn!("Built without window support, running headless ({WINDOW_TITLE})");
    }
    Box::new(HeadlessDisplay::new())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if TargetSet::new(&cli.targets).is_empty() {
        return Err("At least one target label is required".into());
    }
    if let Some(source) = &cli.source {
        if source.trim().is_empty() {
            return Err("--source must not be empty".into());
        }
    }
    if let Some(url) = &cli.model_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("Model URL must be http(s), got '{url}'").into());
        }
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
}
