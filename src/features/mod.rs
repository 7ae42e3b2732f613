//! Log-Mel feature extraction: framing, Hann window, power spectrum,
//! Mel projection and normalization.

pub mod frame;
pub mod mel;
pub mod normalize;
pub mod pipeline;
pub mod spectrum;
pub mod window;

pub use frame::{frame, FrameSet};
pub use mel::MelFilterBank;
pub use normalize::normalize;
pub use pipeline::{FeatureConfig, FeatureExtractor};
pub use spectrum::power_spectrum;
pub use window::{apply_window, hann_window, Window};
