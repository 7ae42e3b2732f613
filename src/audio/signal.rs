use crate::error::{Error, Result};

/// Decoded PCM audio held as planar channels.
///
/// A signal is immutable once built; transformations such as
/// [`AudioSignal::mixdown`] return a new value.
#[derive(Clone, Debug)]
pub struct AudioSignal {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioSignal {
    /// Build a signal from planar channel data. All channels must share a length.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidConfig("sample rate must be positive".into()));
        }
        if let Some(first) = channels.first() {
            let len = first.len();
            if let Some(bad) = channels.iter().find(|c| c.len() != len) {
                return Err(Error::DimensionMismatch {
                    stage: "signal",
                    expected: len,
                    actual: bad.len(),
                });
            }
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Split interleaved frames (`L R L R ...`) into planar channels.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(Error::NoChannels);
        }
        if samples.len() % channel_count != 0 {
            return Err(Error::DimensionMismatch {
                stage: "interleaved",
                expected: samples.len() - samples.len() % channel_count,
                actual: samples.len(),
            });
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks(channel_count) {
            for (channel, &s) in channels.iter_mut().zip(frame) {
                channel.push(s);
            }
        }
        Self::new(channels, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Channel 0, the only channel the feature pipeline consumes.
    pub fn primary(&self) -> Result<&[f32]> {
        self.channel(0).ok_or(Error::NoChannels)
    }

    pub fn duration_secs(&self) -> f32 {
        self.len() as f32 / self.sample_rate as f32
    }

    /// Average all channels into a single-channel signal.
    pub fn mixdown(&self) -> AudioSignal {
        let count = self.channels.len();
        if count <= 1 {
            return self.clone();
        }
        let mono = (0..self.len())
            .map(|i| self.channels.iter().map(|c| c[i]).sum::<f32>() / count as f32)
            .collect();
        AudioSignal {
            channels: vec![mono],
            sample_rate: self.sample_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_splits_into_planar_channels() {
        let signal = AudioSignal::from_interleaved(&[1.0, -1.0, 2.0, -2.0, 3.0, -3.0], 2, 8000).unwrap();
        assert_eq!(signal.channel_count(), 2);
        assert_eq!(signal.len(), 3);
        assert_eq!(signal.channel(0).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(signal.channel(1).unwrap(), &[-1.0, -2.0, -3.0]);
    }

    #[test]
    fn mixdown_averages_channels() {
        let signal = AudioSignal::new(vec![vec![1.0, 0.5], vec![0.0, 0.5]], 44100).unwrap();
        let mono = signal.mixdown();
        assert_eq!(mono.channel_count(), 1);
        assert_eq!(mono.primary().unwrap(), &[0.5, 0.5]);
    }

    #[test]
    fn rejects_ragged_channels() {
        let err = AudioSignal::new(vec![vec![0.0; 4], vec![0.0; 3]], 44100).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn zero_channel_signal_has_no_primary() {
        let signal = AudioSignal::new(Vec::new(), 44100).unwrap();
        assert!(signal.is_empty());
        assert!(matches!(signal.primary(), Err(Error::NoChannels)));
    }

    #[test]
    fn duration_follows_sample_rate() {
        let signal = AudioSignal::from_mono(vec![0.0; 22050], 44100).unwrap();
        assert!((signal.duration_secs() - 0.5).abs() < 1e-6);
    }
}
