use ndarray::{Array2, ArrayView1};

use crate::error::{Error, Result};

/// Overlapping fixed-length frames, one per row.
#[derive(Clone, Debug)]
pub struct FrameSet {
    frames: Array2<f32>,
    hop_size: usize,
}

impl FrameSet {
    pub fn num_frames(&self) -> usize {
        self.frames.nrows()
    }

    pub fn frame_size(&self) -> usize {
        self.frames.ncols()
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn frame(&self, index: usize) -> ArrayView1<'_, f32> {
        self.frames.row(index)
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.frames
    }

    pub(crate) fn from_parts(frames: Array2<f32>, hop_size: usize) -> Self {
        Self { frames, hop_size }
    }
}

/// Number of whole frames that fit in `len` samples. The partial tail is dropped.
pub fn frame_count(len: usize, frame_size: usize, hop_size: usize) -> usize {
    if len < frame_size || hop_size == 0 {
        return 0;
    }
    (len - frame_size) / hop_size + 1
}

/// Slice a mono signal into frames of `frame_size` samples spaced `hop_size` apart.
pub fn frame(samples: &[f32], frame_size: usize, hop_size: usize) -> Result<FrameSet> {
    if frame_size == 0 {
        return Err(Error::InvalidConfig("frame size must be positive".into()));
    }
    if hop_size == 0 || hop_size > frame_size {
        return Err(Error::InvalidConfig(format!(
            "hop size must be in 1..={}, got {}",
            frame_size, hop_size
        )));
    }
    if samples.len() < frame_size {
        return Err(Error::InsufficientData {
            len: samples.len(),
            frame_size,
        });
    }

    let num_frames = frame_count(samples.len(), frame_size, hop_size);
    let frames = Array2::from_shape_fn((num_frames, frame_size), |(f, i)| {
        samples[f * hop_size + i]
    });

    Ok(FrameSet { frames, hop_size })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_matches_formula() {
        let samples = vec![0.0f32; 4096];
        let frames = frame(&samples, 2048, 512).unwrap();
        assert_eq!(frames.num_frames(), 5);
        assert_eq!(frames.frame_size(), 2048);

        for len in [2048usize, 2049, 2559, 2560, 10_000, 88_200] {
            let samples = vec![0.0f32; len];
            let frames = frame(&samples, 2048, 512).unwrap();
            assert_eq!(frames.num_frames(), (len - 2048) / 512 + 1, "len={}", len);
        }
    }

    #[test]
    fn frames_start_at_hop_offsets() {
        let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let frames = frame(&samples, 4, 3).unwrap();
        assert_eq!(frames.num_frames(), 3);
        assert_eq!(frames.frame(0).to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(frames.frame(1).to_vec(), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(frames.frame(2).to_vec(), vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn tail_is_dropped_not_padded() {
        let samples: Vec<f32> = (0..9).map(|i| i as f32).collect();
        let frames = frame(&samples, 4, 4).unwrap();
        assert_eq!(frames.num_frames(), 2);
        assert_eq!(frames.frame(1).to_vec(), vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn short_signal_is_insufficient() {
        let err = frame(&[0.0; 100], 2048, 512).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData {
                len: 100,
                frame_size: 2048
            }
        ));
    }

    #[test]
    fn rejects_bad_hop() {
        assert!(matches!(frame(&[0.0; 16], 8, 0), Err(Error::InvalidConfig(_))));
        assert!(matches!(frame(&[0.0; 16], 8, 9), Err(Error::InvalidConfig(_))));
        assert!(matches!(frame(&[0.0; 16], 0, 1), Err(Error::InvalidConfig(_))));
    }
}
