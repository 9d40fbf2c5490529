//! Core types for the raagalyzer analysis pipeline

use serde::{Serialize, Serializer};

/// Raw audio data representation (mono, f32 samples)
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g., 44100)
    pub sample_rate: u32,
}

impl AudioData {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// The eight categories the emotion model was trained on, in output index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Calm,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 8] = [
        Emotion::Angry,
        Emotion::Calm,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Calm => "calm",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
        }
    }
}

/// Label reported when a component could not produce a real answer.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Result of emotion classification. A degraded outcome still yields a
/// response; it reports as `{label: "unknown", confidence: 0.0}`.
#[derive(Debug, Clone, PartialEq)]
pub enum EmotionOutcome {
    Detected { emotion: Emotion, confidence: f32 },
    Degraded { reason: String },
}

impl EmotionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            EmotionOutcome::Detected { emotion, .. } => emotion.label(),
            EmotionOutcome::Degraded { .. } => UNKNOWN_LABEL,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            EmotionOutcome::Detected { confidence, .. } => *confidence,
            EmotionOutcome::Degraded { .. } => 0.0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, EmotionOutcome::Degraded { .. })
    }
}

impl Serialize for EmotionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            label: &'a str,
            confidence: f32,
        }
        Wire {
            label: self.label(),
            confidence: self.confidence(),
        }
        .serialize(serializer)
    }
}

/// One analysis frame of the pitch track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchFrame {
    /// Frame position in seconds
    pub time: f32,
    /// Fundamental frequency in Hz, 0.0 for silence
    pub frequency: f32,
    pub confidence: f32,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PitchTrack {
    pub frames: Vec<PitchFrame>,
    pub most_common_note: String,
}

/// Result of pitch tracking. A degraded outcome has no frames and reports
/// `"unknown"` as its most common note.
#[derive(Debug, Clone, PartialEq)]
pub enum PitchOutcome {
    Tracked(PitchTrack),
    Degraded { reason: String },
}

impl PitchOutcome {
    pub fn frames(&self) -> &[PitchFrame] {
        match self {
            PitchOutcome::Tracked(track) => &track.frames,
            PitchOutcome::Degraded { .. } => &[],
        }
    }

    pub fn most_common_note(&self) -> &str {
        match self {
            PitchOutcome::Tracked(track) => &track.most_common_note,
            PitchOutcome::Degraded { .. } => UNKNOWN_LABEL,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, PitchOutcome::Degraded { .. })
    }
}

/// Pitch section of the response: parallel frequency and note arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchSummary {
    pub data: Vec<f32>,
    pub labels: Vec<String>,
}

impl From<&PitchOutcome> for PitchSummary {
    fn from(outcome: &PitchOutcome) -> Self {
        let frames = outcome.frames();
        Self {
            data: frames.iter().map(|frame| frame.frequency).collect(),
            labels: frames.iter().map(|frame| frame.note.clone()).collect(),
        }
    }
}

/// Successful analysis of one uploaded clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub emotion: EmotionOutcome,
    pub pitch: PitchSummary,
    pub tempo: u32,
    pub raaga: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body returned for every analysis request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisResponse {
    Success(AnalysisResult),
    Failure(ErrorBody),
}

impl AnalysisResponse {
    pub fn error(message: impl Into<String>) -> Self {
        AnalysisResponse::Failure(ErrorBody {
            error: message.into(),
        })
    }

    pub fn as_success(&self) -> Option<&AnalysisResult> {
        match self {
            AnalysisResponse::Success(result) => Some(result),
            AnalysisResponse::Failure(_) => None,
        }
    }
}
