use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::{
    AppConfig, ModelConfig, ServerConfig, DEFAULT_ALLOWED_ORIGIN, DEFAULT_BIND,
    DEFAULT_MAX_UPLOAD_BYTES,
};
use crate::emotion::InputShape;
use crate::pitch::PitchBackend;

#[derive(Parser, Debug)]
#[command(
    name = "raagalyzer",
    version,
    about = "Emotion, pitch, tempo and raaga analysis for short audio clips"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the analysis API over HTTP.
    Serve(ServeArgs),
    /// Analyze a local audio file and print the JSON result.
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Optional override for the assets directory.
    #[arg(long = "assets-path", env = "RAAGALYZER_ASSETS_PATH")]
    pub assets_path: Option<PathBuf>,
    /// Emotion classifier weights (defaults to <assets>/models/emotion.onnx).
    #[arg(long = "emotion-model", env = "RAAGALYZER_EMOTION_MODEL")]
    pub emotion_model: Option<PathBuf>,
    /// CREPE weights (defaults to <assets>/models/crepe.onnx).
    #[arg(long = "crepe-model", env = "RAAGALYZER_CREPE_MODEL")]
    pub crepe_model: Option<PathBuf>,
    #[arg(
        long = "pitch-backend",
        value_enum,
        default_value_t = PitchBackend::Crepe,
        env = "RAAGALYZER_PITCH_BACKEND"
    )]
    pub pitch_backend: PitchBackend,
    /// Emotion model input as HEIGHTxWIDTH.
    #[arg(
        long = "emotion-input",
        default_value = "128x128",
        env = "RAAGALYZER_EMOTION_INPUT"
    )]
    pub emotion_input: InputShape,
}

impl ModelArgs {
    pub fn model_config(&self) -> Result<ModelConfig> {
        let assets = AppConfig::from_override(self.assets_path.clone())?;
        Ok(ModelConfig::resolve(
            &assets,
            self.emotion_model.clone(),
            self.crepe_model.clone(),
            self.emotion_input,
            self.pitch_backend,
        ))
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = DEFAULT_BIND, env = "RAAGALYZER_BIND")]
    pub bind: SocketAddr,
    /// Origin allowed to call the API with credentials. Repeatable.
    #[arg(
        long = "allowed-origin",
        default_value = DEFAULT_ALLOWED_ORIGIN,
        env = "RAAGALYZER_ALLOWED_ORIGINS",
        value_delimiter = ','
    )]
    pub allowed_origins: Vec<String>,
    /// Mirror any request origin instead of using --allowed-origin.
    #[arg(long = "mirror-origin", conflicts_with = "allowed_origins")]
    pub mirror_origin: bool,
    /// Maximum upload size in bytes.
    #[arg(
        long = "max-upload-bytes",
        default_value_t = DEFAULT_MAX_UPLOAD_BYTES,
        env = "RAAGALYZER_MAX_UPLOAD_BYTES"
    )]
    pub max_upload_bytes: usize,
    #[command(flatten)]
    pub models: ModelArgs,
}

impl ServeArgs {
    pub fn server_config(&self) -> Result<ServerConfig> {
        let origins = if self.mirror_origin {
            Vec::new()
        } else {
            self.allowed_origins.clone()
        };
        ServerConfig::new(self.bind, self.models.model_config()?)
            .with_allowed_origins(origins)
            .with_max_upload_bytes(self.max_upload_bytes)
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Audio file to analyze (WAV, MP3, FLAC, OGG, ...).
    #[arg(value_name = "FILE")]
    pub input: PathBuf,
    /// Pretty-print the JSON result.
    #[arg(long)]
    pub pretty: bool,
    #[command(flatten)]
    pub models: ModelArgs,
}
