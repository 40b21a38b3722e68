use std::time::Duration;

use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{CaptureError, FrameSource};

/// What to capture from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureInput {
    /// Local camera by index, opened through the platform capture device.
    Device(usize),
    /// Any file path or stream URL ffmpeg can probe.
    Url(String),
}

impl CaptureInput {
    /// Platform capture format and the device URL it expects.
    pub fn device_target(index: usize) -> (&'static str, String) {
        if cfg!(target_os = "macos") {
            ("avfoundation", index.to_string())
        } else if cfg!(target_os = "windows") {
            ("vfwcap", index.to_string())
        } else {
            ("v4l2", format!("/dev/video{index}"))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CaptureInput::Device(i) => {
                let (format, url) = Self::device_target(*i);
                format!("camera {i} ({format} {url})")
            }
            CaptureInput::Url(url) => url.clone(),
        }
    }
}

/// Grabs frames from a camera or stream via ffmpeg-next and converts them
/// to RGB24.
pub struct FfmpegCamera {
    input: CaptureInput,
    session: Option<Session>,
}

struct Session {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    next_index: usize,
    draining: bool,
}

// Safety: the ffmpeg contexts are owned exclusively by this value and only
// touched from whichever single thread currently owns it.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    /// Opens the input and prepares the decoder. Fails with
    /// [`CaptureError::DeviceUnavailable`] if the device cannot be opened or
    /// carries no video stream.
    pub fn open(input: CaptureInput) -> Result<Self, CaptureError> {
        let unavailable = |reason: String| CaptureError::DeviceUnavailable {
            source_name: input.describe(),
            reason,
        };

        ffmpeg_next::init().map_err(|e| unavailable(e.to_string()))?;
        let ictx = open_input(&input).map_err(|e| unavailable(e.to_string()))?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| unavailable("no video stream".to_string()))?;
        let stream_index = stream.index();
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| unavailable(e.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(unavailable("source reports an empty frame size".to_string()));
        }
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| unavailable(e.to_string()))?;

        log::info!("Opened {} at {width}x{height}", input.describe());

        Ok(Self {
            input,
            session: Some(Session {
                ictx,
                decoder,
                scaler,
                stream_index,
                width,
                height,
                next_index: 0,
                draining: false,
            }),
        })
    }

    /// `(width, height)` of delivered frames, `None` once released.
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.session.as_ref().map(|s| (s.width, s.height))
    }
}

fn open_input(
    input: &CaptureInput,
) -> Result<ffmpeg_next::format::context::Input, ffmpeg_next::Error> {
    match input {
        CaptureInput::Url(url) => ffmpeg_next::format::input(url),
        CaptureInput::Device(index) => {
            ffmpeg_next::device::register_all();
            let (format_name, url) = CaptureInput::device_target(*index);
            let format = ffmpeg_next::device::input::video()
                .find(|f| f.name() == format_name)
                .ok_or(ffmpeg_next::Error::DemuxerNotFound)?;

            let mut options = ffmpeg_next::Dictionary::new();
            options.set("framerate", "30");
            let format = ffmpeg_next::Format::Input(format);
            match ffmpeg_next::format::open_with(&url, &format, options) {
                Ok(ctx) => Ok(ctx.input()),
                Err(e) => {
                    log::debug!("{format_name} rejected 30 fps ({e}), using device default");
                    ffmpeg_next::format::open_with(&url, &format, ffmpeg_next::Dictionary::new())
                        .map(|ctx| ctx.input())
                }
            }
        }
    }
}

impl FrameSource for FfmpegCamera {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| CaptureError::FrameAcquisition("capture already released".to_string()))?;

        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        loop {
            if session.decoder.receive_frame(&mut decoded).is_ok() {
                return session.convert(&decoded);
            }
            if session.draining {
                return Err(CaptureError::EndOfStream);
            }

            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut session.ictx) {
                Ok(()) => {
                    if packet.stream() != session.stream_index {
                        continue;
                    }
                    if let Err(e) = session.decoder.send_packet(&packet) {
                        log::debug!("Dropped undecodable packet: {e}");
                    }
                }
                Err(ffmpeg_next::Error::Eof) => {
                    let _ = session.decoder.send_eof();
                    session.draining = true;
                }
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::util::error::EAGAIN => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(e) => return Err(CaptureError::FrameAcquisition(e.to_string())),
            }
        }
    }

    fn release(&mut self) {
        if self.session.take().is_some() {
            log::debug!("Released {}", self.input.describe());
        }
    }
}

impl Session {
    fn convert(
        &mut self,
        decoded: &ffmpeg_next::util::frame::video::Video,
    ) -> Result<Frame, CaptureError> {
        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler
            .run(decoded, &mut rgb)
            .map_err(|e| CaptureError::FrameAcquisition(e.to_string()))?;

        let pixels = packed_rgb(rgb.data(0), rgb.stride(0), self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, self.next_index);
        self.next_index += 1;
        Ok(frame)
    }
}

/// Copies `height` rows of `width` RGB pixels out of a buffer whose rows
/// are `stride` bytes apart.
fn packed_rgb(data: &[u8], stride: usize, width: u32, height: u32) -> Vec<u8> {
    let row_len = width as usize * 3;
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        pixels.extend_from_slice(&row[..row_len]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Encodes `frames` solid-gray MPEG-4 frames, frame `i` at level `i * 40`.
    fn write_clip(path: &Path, frames: usize, width: u32, height: u32) {
        use ffmpeg_next::format::Pixel;

        ffmpeg_next::init().unwrap();
        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);
        let mut ost = octx.add_stream(Some(codec)).unwrap();

        let mut enc = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        enc.set_width(width);
        enc.set_height(height);
        enc.set_format(Pixel::YUV420P);
        enc.set_time_base(ffmpeg_next::Rational(1, 10));
        enc.set_frame_rate(Some(ffmpeg_next::Rational(10, 1)));
        if global_header {
            enc.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = enc.open_with(ffmpeg_next::Dictionary::new()).unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_tb = octx.stream(0).unwrap().time_base();

        let mut to_yuv = ffmpeg_next::software::scaling::Context::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        let write_pending = |encoder: &mut ffmpeg_next::encoder::Video,
                                 octx: &mut ffmpeg_next::format::context::Output| {
            let mut pkt = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut pkt).is_ok() {
                pkt.set_stream(0);
                pkt.rescale_ts(ffmpeg_next::Rational(1, 10), ost_tb);
                pkt.write_interleaved(octx).unwrap();
            }
        };

        for i in 0..frames {
            let mut rgb = ffmpeg_next::util::frame::video::Video::new(Pixel::RGB24, width, height);
            let level = ((i * 40) % 256) as u8;
            rgb.data_mut(0).fill(level);
            let mut yuv = ffmpeg_next::util::frame::video::Video::empty();
            to_yuv.run(&rgb, &mut yuv).unwrap();
            yuv.set_pts(Some(i as i64));
            encoder.send_frame(&yuv).unwrap();
            write_pending(&mut encoder, &mut octx);
        }
        encoder.send_eof().unwrap();
        write_pending(&mut encoder, &mut octx);
        octx.write_trailer().unwrap();
    }

    fn open_clip(dir: &Path, frames: usize) -> FfmpegCamera {
        let path = dir.join("clip.mp4");
        write_clip(&path, frames, 64, 48);
        FfmpegCamera::open(CaptureInput::Url(path.display().to_string())).unwrap()
    }

    #[test]
    fn test_reads_frames_in_order_then_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut cam = open_clip(dir.path(), 4);
        assert_eq!(cam.frame_size(), Some((64, 48)));

        for expected in 0..4 {
            let frame = cam.read().unwrap();
            assert_eq!(frame.index(), expected);
            assert_eq!((frame.width(), frame.height()), (64, 48));
            assert_eq!(frame.data().len(), 64 * 48 * 3);
        }
        assert!(matches!(cam.read(), Err(CaptureError::EndOfStream)));
    }

    #[test]
    fn test_read_after_release_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut cam = open_clip(dir.path(), 2);
        cam.release();
        cam.release();
        assert_eq!(cam.frame_size(), None);
        assert!(matches!(cam.read(), Err(CaptureError::FrameAcquisition(_))));
    }

    #[test]
    fn test_missing_source_is_unavailable() {
        let err = FfmpegCamera::open(CaptureInput::Url("/nonexistent/clip.mp4".to_string()))
            .err()
            .unwrap();
        match err {
            CaptureError::DeviceUnavailable { source_name, .. } => {
                assert_eq!(source_name, "/nonexistent/clip.mp4")
            }
            other => panic!("expected DeviceUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_device_target_matches_platform() {
        let (format, url) = CaptureInput::device_target(2);
        if cfg!(target_os = "linux") {
            assert_eq!((format, url.as_str()), ("v4l2", "/dev/video2"));
        } else {
            assert_eq!(url, "2");
        }
    }

    #[test]
    fn test_packed_rgb_strips_row_padding() {
        // 2x2 image, rows padded to 8 bytes
        let data = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        assert_eq!(
            packed_rgb(&data, 8, 2, 2),
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
        );
    }
}
