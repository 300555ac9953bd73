//! Audio decode layer
//!
//! All PCM enters the service through the external transcoder; nothing
//! here parses containers itself.

pub mod decode;
pub mod types;

pub use decode::FfmpegDecoder;
pub use types::PcmBuffer;
