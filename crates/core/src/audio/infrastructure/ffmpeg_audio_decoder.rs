use std::path::Path;

use crate::alert::domain::alarm_sound::PlaybackError;
use crate::audio::domain::audio_segment::AudioSegment;

/// Decodes a sound file (mp3, wav, ogg, ...) into interleaved f32 PCM via
/// ffmpeg-next, resampled to the rate and channel count of the output
/// device.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegAudioDecoder;

impl FfmpegAudioDecoder {
    /// `channels` above 2 are decoded as stereo; the player fans the extra
    /// speakers out from the last channel.
    pub fn decode(
        &self,
        path: &Path,
        sample_rate: u32,
        channels: u16,
    ) -> Result<AudioSegment, PlaybackError> {
        let fail = |e: ffmpeg_next::Error| PlaybackError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        ffmpeg_next::init().map_err(fail)?;

        let mut ictx = ffmpeg_next::format::input(path).map_err(fail)?;

        let audio_stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Audio)
            .ok_or_else(|| PlaybackError::Decode {
                path: path.display().to_string(),
                reason: "no audio stream".to_string(),
            })?;
        let audio_stream_index = audio_stream.index();

        let codec_ctx =
            ffmpeg_next::codec::context::Context::from_parameters(audio_stream.parameters())
                .map_err(fail)?;
        let mut decoder = codec_ctx.decoder().audio().map_err(fail)?;

        let (out_layout, out_channels) = if channels >= 2 {
            (ffmpeg_next::ChannelLayout::STEREO, 2u16)
        } else {
            (ffmpeg_next::ChannelLayout::MONO, 1u16)
        };

        // PCM containers often leave the layout unspecified.
        let in_layout = match decoder.channel_layout() {
            layout if layout.is_empty() && decoder.channels() > 1 => {
                ffmpeg_next::ChannelLayout::STEREO
            }
            layout if layout.is_empty() => ffmpeg_next::ChannelLayout::MONO,
            layout => layout,
        };

        let mut resampler = ffmpeg_next::software::resampling::Context::get(
            decoder.format(),
            in_layout,
            decoder.rate(),
            ffmpeg_next::format::Sample::F32(ffmpeg_next::format::sample::Type::Packed),
            out_layout,
            sample_rate,
        )
        .map_err(fail)?;

        let mut samples: Vec<f32> = Vec::new();
        let mut decoded = ffmpeg_next::util::frame::audio::Audio::empty();
        let mut resampled = ffmpeg_next::util::frame::audio::Audio::empty();

        for (stream, packet) in ictx.packets() {
            if stream.index() != audio_stream_index {
                continue;
            }
            decoder.send_packet(&packet).map_err(fail)?;
            while decoder.receive_frame(&mut decoded).is_ok() {
                resampler.run(&decoded, &mut resampled).map_err(fail)?;
                extract_packed_samples(&resampled, out_channels, &mut samples);
            }
        }

        decoder.send_eof().map_err(fail)?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            resampler.run(&decoded, &mut resampled).map_err(fail)?;
            extract_packed_samples(&resampled, out_channels, &mut samples);
        }

        if let Ok(Some(delay)) = resampler.flush(&mut resampled) {
            if delay.output > 0 {
                extract_packed_samples(&resampled, out_channels, &mut samples);
            }
        }

        Ok(AudioSegment::new(samples, sample_rate, out_channels))
    }
}

/// Appends the interleaved f32 samples of a packed frame.
fn extract_packed_samples(
    frame: &ffmpeg_next::util::frame::audio::Audio,
    channels: u16,
    out: &mut Vec<f32>,
) {
    let count = frame.samples() * channels as usize;
    if count == 0 {
        return;
    }
    let data = frame.data(0);
    let floats = unsafe { std::slice::from_raw_parts(data.as_ptr() as *const f32, count) };
    out.extend_from_slice(floats);
}
