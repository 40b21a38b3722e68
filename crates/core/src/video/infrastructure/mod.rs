pub mod ffmpeg_camera;
pub mod headless_display;
#[cfg(feature = "window")]
pub mod highgui_display;
