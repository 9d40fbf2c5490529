pub mod analysis;
pub mod audio;
pub mod cli;
pub mod config;
pub mod emotion;
pub mod error;
pub mod features;
pub mod inference;
pub mod pitch;
pub mod raaga;
pub mod server;
pub mod types;

pub use analysis::Analyzer;
pub use error::AnalysisError;
pub use types::{AnalysisResponse, AnalysisResult, AudioData};
