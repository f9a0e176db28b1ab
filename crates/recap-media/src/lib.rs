//! recap-media: temporary upload storage and ffmpeg audio normalization.

pub mod normalize;
pub mod store;

pub use normalize::{MediaError, TARGET_CHANNELS, TARGET_SAMPLE_RATE, normalize_to_wav};
pub use store::{TempFile, UploadStore};
