/// Decoded PCM audio: interleaved f32 samples in [-1.0, 1.0].
#[derive(Clone, Debug)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        debug_assert!(channels > 0, "an audio segment needs at least one channel");
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames (one sample per channel each).
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Sample for `channel` at `frame`; channels past the segment's own
    /// count repeat the last one, so mono fans out to every speaker.
    pub fn sample_at(&self, frame: usize, channel: usize) -> Option<f32> {
        let channels = self.channels as usize;
        let ch = channel.min(channels.saturating_sub(1));
        self.samples.get(frame * channels + ch).copied()
    }
}
