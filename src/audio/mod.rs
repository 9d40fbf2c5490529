pub mod decoder;
pub mod resample;

pub use decoder::{decode_audio, decode_bytes};
pub use resample::resample;
