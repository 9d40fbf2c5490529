//! Per-request pipeline: decode, features, emotion, pitch, raaga.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info};

use crate::audio::{decode_audio, decode_bytes};
use crate::config::ModelConfig;
use crate::emotion::{EmotionClassifier, EmotionModel, OnnxEmotionModel};
use crate::error::AnalysisError;
use crate::features::FeatureExtractor;
use crate::pitch::notes::NOTE_NAMES;
use crate::pitch::{CrepeModel, PitchBackend, PitchModel, PitchTracker, PyinModel};
use crate::raaga;
use crate::types::{AnalysisResponse, AnalysisResult, AudioData, PitchSummary};

/// Owns the loaded models and runs the full analysis for one clip at a time.
/// Shared across requests behind an `Arc`; nothing in it is mutated after
/// construction.
#[derive(Clone)]
pub struct Analyzer {
    extractor: FeatureExtractor,
    emotion: EmotionClassifier,
    pitch: PitchTracker,
}

impl Analyzer {
    pub fn new(emotion_model: Arc<dyn EmotionModel>, pitch_model: Arc<dyn PitchModel>) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            emotion: EmotionClassifier::new(emotion_model),
            pitch: PitchTracker::new(pitch_model),
        }
    }

    /// Load every model named by `config`. Missing or unreadable weights are
    /// fatal.
    pub fn from_config(config: &ModelConfig) -> anyhow::Result<Self> {
        let emotion = OnnxEmotionModel::load(&config.emotion_model, config.emotion_input)
            .context("failed to load emotion model")?;
        let pitch: Arc<dyn PitchModel> = match config.pitch_backend {
            PitchBackend::Crepe => Arc::new(
                CrepeModel::load(&config.crepe_model).context("failed to load CREPE model")?,
            ),
            PitchBackend::Pyin => Arc::new(PyinModel::new()),
        };
        info!(
            emotion_model = %config.emotion_model.display(),
            pitch_backend = %config.pitch_backend,
            "models ready"
        );
        Ok(Self::new(Arc::new(emotion), pitch))
    }

    pub fn pitch_backend(&self) -> &'static str {
        self.pitch.backend_name()
    }

    /// Analyze an uploaded file. Never panics and never returns an error
    /// value: failures come back as [`AnalysisResponse::Failure`].
    pub fn analyze(&self, bytes: &[u8], extension: Option<&str>) -> AnalysisResponse {
        respond(|| self.analyze_bytes(bytes, extension))
    }

    /// Decode and analyze a local file, using its extension as a format hint.
    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> AnalysisResponse {
        let path = path.as_ref();
        respond(|| {
            let audio = decode_audio(path).map_err(AnalysisError::Decode)?;
            log_decoded(&audio);
            self.analyze_audio(&audio)
        })
    }

    fn analyze_bytes(
        &self,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<AnalysisResult, AnalysisError> {
        if bytes.is_empty() {
            return Err(AnalysisError::EmptyClip);
        }
        let audio = decode_bytes(bytes, extension).map_err(AnalysisError::Decode)?;
        log_decoded(&audio);
        self.analyze_audio(&audio)
    }

    /// Run every analysis stage on already-decoded audio.
    pub fn analyze_audio(&self, audio: &AudioData) -> Result<AnalysisResult, AnalysisError> {
        if audio.samples.is_empty() {
            return Err(AnalysisError::EmptyClip);
        }

        let features = self
            .extractor
            .extract(audio)
            .map_err(AnalysisError::Features)?;
        if let Some(class) = features.dominant_pitch_class() {
            debug!(pitch_class = NOTE_NAMES[class], "dominant chroma");
        }
        // Truncation, not rounding; negative or NaN estimates saturate to 0.
        let tempo = features.tempo_bpm as u32;

        let emotion = self.emotion.classify(audio);
        let pitch = self.pitch.detect(audio);
        let raaga = raaga::recommend(emotion.label(), pitch.most_common_note());

        info!(
            emotion = emotion.label(),
            confidence = emotion.confidence(),
            note = pitch.most_common_note(),
            tempo,
            raaga,
            "analysis complete"
        );

        Ok(AnalysisResult {
            emotion,
            pitch: PitchSummary::from(&pitch),
            tempo,
            raaga,
        })
    }
}

fn respond<F>(run: F) -> AnalysisResponse
where
    F: FnOnce() -> Result<AnalysisResult, AnalysisError>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(run))
        .unwrap_or_else(|payload| Err(AnalysisError::from_panic(payload)));

    match outcome {
        Ok(result) => AnalysisResponse::Success(result),
        Err(err) => {
            error!(error = %err, "analysis failed");
            AnalysisResponse::error(err.to_string())
        }
    }
}

fn log_decoded(audio: &AudioData) {
    info!(
        samples = audio.samples.len(),
        sample_rate = audio.sample_rate,
        duration_secs = audio.duration_secs(),
        "decoded audio"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::InputShape;
    use crate::inference::ModelResult;
    use crate::pitch::PitchEstimate;
    use ndarray::Array4;

    struct Sad;

    impl EmotionModel for Sad {
        fn input_shape(&self) -> InputShape {
            InputShape::new(40, 32)
        }

        fn predict(&self, _input: &Array4<f32>) -> ModelResult<Vec<f32>> {
            Ok(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0])
        }
    }

    struct Panicking;

    impl PitchModel for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn estimate(&self, _samples: &[f32]) -> ModelResult<PitchEstimate> {
            panic!("estimator bug");
        }
    }

    struct Flat;

    impl PitchModel for Flat {
        fn name(&self) -> &'static str {
            "flat"
        }

        fn estimate(&self, samples: &[f32]) -> ModelResult<PitchEstimate> {
            let frames = 1 + samples.len() / 160;
            Ok(PitchEstimate {
                times: (0..frames).map(|i| i as f32 * 0.01).collect(),
                frequencies: vec![220.0; frames],
                confidences: vec![0.9; frames],
            })
        }
    }

    fn wav_bytes(audio: &AudioData) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: audio.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &sample in &audio.samples {
                writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn tone() -> AudioData {
        let samples = (0..16_000)
            .map(|i| 0.4 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 16_000.0).sin())
            .collect();
        AudioData::new(samples, 16_000)
    }

    #[test]
    fn assembles_result_from_every_stage() {
        let analyzer = Analyzer::new(Arc::new(Sad), Arc::new(Flat));
        let result = analyzer.analyze_audio(&tone()).unwrap();
        assert_eq!(result.emotion.label(), "sad");
        assert_eq!(result.raaga, "Darbari");
        assert_eq!(result.pitch.data.len(), result.pitch.labels.len());
        assert!(result.pitch.labels.iter().filter(|l| *l == "A3").count() > 90);
    }

    #[test]
    fn empty_upload_is_an_error_body() {
        let analyzer = Analyzer::new(Arc::new(Sad), Arc::new(Flat));
        let response = analyzer.analyze(&[], None);
        assert!(response.as_success().is_none());
    }

    #[test]
    fn panics_become_error_bodies() {
        let analyzer = Analyzer::new(Arc::new(Sad), Arc::new(Panicking));
        match analyzer.analyze(&wav_bytes(&tone()), Some("wav")) {
            AnalysisResponse::Failure(body) => assert!(body.error.contains("estimator bug")),
            AnalysisResponse::Success(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn decodes_wav_uploads() {
        let analyzer = Analyzer::new(Arc::new(Sad), Arc::new(Flat));
        let response = analyzer.analyze(&wav_bytes(&tone()), Some("wav"));
        let result = response.as_success().expect("wav should analyze");
        assert_eq!(result.raaga, "Darbari");
    }

    #[test]
    fn analyzes_files_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, wav_bytes(&tone())).unwrap();

        let analyzer = Analyzer::new(Arc::new(Sad), Arc::new(Flat));
        let response = analyzer.analyze_file(&path);
        let result = response.as_success().expect("file should analyze");
        assert_eq!(result.emotion.label(), "sad");
        assert_eq!(result.pitch.labels.len(), 101);
    }

    #[test]
    fn tempo_stays_within_search_range_at_low_sample_rates() {
        let samples = (0..8_000)
            .map(|i| 0.4 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8_000.0).sin())
            .collect();
        let analyzer = Analyzer::new(Arc::new(Sad), Arc::new(Flat));
        let result = analyzer
            .analyze_audio(&AudioData::new(samples, 8_000))
            .unwrap();
        assert!(result.tempo <= 300, "tempo={}", result.tempo);
    }

    #[test]
    fn missing_file_is_reported() {
        let analyzer = Analyzer::new(Arc::new(Sad), Arc::new(Flat));
        match analyzer.analyze_file("/nonexistent/clip.wav") {
            AnalysisResponse::Failure(body) => assert!(body.error.contains("clip.wav")),
            AnalysisResponse::Success(_) => panic!("expected failure"),
        }
    }
}
