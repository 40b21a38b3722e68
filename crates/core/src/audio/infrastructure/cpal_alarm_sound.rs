use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};

use crate::alert::domain::alarm_sound::{AlarmSound, PlaybackError};
use crate::audio::domain::audio_segment::AudioSegment;
use crate::shared::constants::PLAYBACK_POLL_MS;

use super::ffmpeg_audio_decoder::FfmpegAudioDecoder;

/// Plays the alarm file on the default output device.
///
/// The file is decoded up front with ffmpeg, then streamed to cpal; `play`
/// polls until the callback has asked for audio past the last sample frame,
/// so the final buffer has already gone out to the device.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpalAlarmSound {
    decoder: FfmpegAudioDecoder,
}

impl CpalAlarmSound {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlarmSound for CpalAlarmSound {
    fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlaybackError::NoOutputDevice)?;
        let supported = device
            .default_output_config()
            .map_err(|e| PlaybackError::Stream(e.to_string()))?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        let segment = Arc::new(self.decoder.decode(
            path,
            config.sample_rate.0,
            config.channels,
        )?);
        log::debug!(
            "Playing {} ({:.1}s, {} Hz, {} ch) as {sample_format:?}",
            path.display(),
            segment.duration(),
            config.sample_rate.0,
            config.channels
        );
        if segment.is_empty() {
            return Ok(());
        }

        let cursor = Arc::new(PlaybackCursor::default());
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, &segment, &cursor),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, &segment, &cursor),
            SampleFormat::I32 => build_stream::<i32>(&device, &config, &segment, &cursor),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, &segment, &cursor),
            other => {
                return Err(PlaybackError::Stream(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }?;
        stream
            .play()
            .map_err(|e| PlaybackError::Stream(e.to_string()))?;

        while !cursor.finished.load(Ordering::Acquire) {
            if let Some(err) = cursor.take_error() {
                return Err(PlaybackError::Stream(err));
            }
            std::thread::sleep(Duration::from_millis(PLAYBACK_POLL_MS));
        }
        Ok(())
    }
}

/// Shared progress between the audio callback and the waiting task.
#[derive(Default)]
struct PlaybackCursor {
    frame: AtomicUsize,
    finished: AtomicBool,
    error: Mutex<Option<String>>,
}

impl PlaybackCursor {
    fn take_error(&self) -> Option<String> {
        self.error.lock().ok().and_then(|mut e| e.take())
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    segment: &Arc<AudioSegment>,
    cursor: &Arc<PlaybackCursor>,
) -> Result<cpal::Stream, PlaybackError>
where
    T: SizedSample + FromSample<f32>,
{
    let out_channels = config.channels as usize;
    let data_segment = Arc::clone(segment);
    let data_cursor = Arc::clone(cursor);
    let err_cursor = Arc::clone(cursor);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                fill_buffer(data, out_channels, &data_segment, &data_cursor);
            },
            move |err| {
                log::error!("Audio output stream error: {err}");
                if let Ok(mut slot) = err_cursor.error.lock() {
                    *slot = Some(err.to_string());
                }
            },
            None,
        )
        .map_err(|e| PlaybackError::Stream(e.to_string()))
}

/// Copies the next chunk of `segment` into an interleaved device buffer,
/// padding with silence once the segment is exhausted. Playback counts as
/// finished on the first callback that starts past the end.
fn fill_buffer<T>(
    data: &mut [T],
    out_channels: usize,
    segment: &AudioSegment,
    cursor: &PlaybackCursor,
) where
    T: Copy + FromSample<f32>,
{
    let mut frame = cursor.frame.load(Ordering::Relaxed);
    let total = segment.frame_count();
    let drained = frame >= total;

    for out_frame in data.chunks_mut(out_channels.max(1)) {
        for (ch, sample) in out_frame.iter_mut().enumerate() {
            let value = if frame < total {
                segment.sample_at(frame, ch).unwrap_or(0.0)
            } else {
                0.0
            };
            *sample = T::from_sample(value);
        }
        if frame < total {
            frame += 1;
        }
    }

    cursor.frame.store(frame, Ordering::Relaxed);
    if drained {
        cursor.finished.store(true, Ordering::Release);
    }
}
