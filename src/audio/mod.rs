pub mod decode;
pub mod resample;
pub mod signal;

pub use decode::decode_audio;
pub use resample::resample;
pub use signal::AudioSignal;
