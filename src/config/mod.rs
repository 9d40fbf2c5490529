use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, ensure, Context, Result};

use crate::emotion::InputShape;
use crate::pitch::PitchBackend;

pub const EMOTION_MODEL_FILE: &str = "emotion.onnx";
pub const CREPE_MODEL_FILE: &str = "crepe.onnx";
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub assets_root: PathBuf,
}

impl AppConfig {
    pub fn from_override(path: Option<PathBuf>) -> Result<Self> {
        let root = match path {
            Some(custom) => canonicalize_dir(&custom)?,
            None => default_assets_root()?,
        };
        Ok(Self { assets_root: root })
    }

    pub fn models_dir(&self) -> PathBuf {
        self.assets_root.join("models")
    }
}

/// Which weights to load and how to feed them.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub emotion_model: PathBuf,
    pub emotion_input: InputShape,
    pub pitch_backend: PitchBackend,
    /// Only read when `pitch_backend` is CREPE.
    pub crepe_model: PathBuf,
}

impl ModelConfig {
    /// Explicit paths win; otherwise weights are looked up in the assets
    /// `models/` directory.
    pub fn resolve(
        assets: &AppConfig,
        emotion_model: Option<PathBuf>,
        crepe_model: Option<PathBuf>,
        emotion_input: InputShape,
        pitch_backend: PitchBackend,
    ) -> Self {
        let models = assets.models_dir();
        Self {
            emotion_model: emotion_model.unwrap_or_else(|| models.join(EMOTION_MODEL_FILE)),
            emotion_input,
            pitch_backend,
            crepe_model: crepe_model.unwrap_or_else(|| models.join(CREPE_MODEL_FILE)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub models: ModelConfig,
    /// Empty means the request origin is mirrored back.
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn new(bind: SocketAddr, models: ModelConfig) -> Self {
        Self {
            bind,
            models,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Result<Self> {
        ensure!(bytes > 0, "upload limit must be positive");
        self.max_upload_bytes = bytes;
        Ok(self)
    }
}

fn canonicalize_dir(path: &Path) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to resolve assets directory at {:?}", path))?;
    if canonical.is_dir() {
        Ok(canonical)
    } else {
        Err(anyhow!("assets path {:?} is not a directory", canonical))
    }
}

fn default_assets_root() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("unable to resolve current executable path")?;
    let assets = exe
        .ancestors()
        .find_map(|dir| {
            let candidate = dir.join("assets");
            candidate.is_dir().then_some(candidate)
        })
        .ok_or_else(|| anyhow!("could not locate default assets directory alongside binary"))?;
    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_assets_root() {
        let root = default_assets_root().expect("assets directory should exist");
        assert!(root.ends_with("assets"));
    }

    #[test]
    fn accepts_override() {
        let config =
            AppConfig::from_override(Some(std::env::current_dir().unwrap().join("assets")))
                .unwrap();
        assert!(config.assets_root.ends_with("assets"));
        assert!(config.models_dir().ends_with("assets/models"));
    }

    #[test]
    fn rejects_file_as_assets_root() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(AppConfig::from_override(Some(file.path().to_path_buf())).is_err());
    }

    #[test]
    fn model_paths_default_to_assets() {
        let assets = AppConfig {
            assets_root: PathBuf::from("/srv/raagalyzer/assets"),
        };
        let models = ModelConfig::resolve(
            &assets,
            None,
            Some(PathBuf::from("/tmp/crepe-tiny.onnx")),
            InputShape::default(),
            PitchBackend::Crepe,
        );
        assert_eq!(
            models.emotion_model,
            PathBuf::from("/srv/raagalyzer/assets/models/emotion.onnx")
        );
        assert_eq!(models.crepe_model, PathBuf::from("/tmp/crepe-tiny.onnx"));
    }

    #[test]
    fn server_defaults_follow_frontend_origin() {
        let assets = AppConfig {
            assets_root: PathBuf::from("assets"),
        };
        let models = ModelConfig::resolve(
            &assets,
            None,
            None,
            InputShape::default(),
            PitchBackend::Pyin,
        );
        let config = ServerConfig::new(DEFAULT_BIND.parse().unwrap(), models);
        assert_eq!(config.allowed_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
        assert!(config.clone().with_max_upload_bytes(0).is_err());
    }
}
