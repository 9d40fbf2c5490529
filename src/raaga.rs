//! Emotion-to-raaga lookup.

/// Returned for any label missing from the table.
pub const DEFAULT_RAAGA: &str = "Bhairavi";

const RAAGA_TABLE: [(&str, &str); 8] = [
    ("happy", "Bhairavi"),
    ("sad", "Darbari"),
    ("calm", "Yaman"),
    ("angry", "Todi"),
    ("fear", "Malkauns"),
    ("surprise", "Bageshri"),
    ("disgust", "Asavari"),
    ("neutral", "Bilawal"),
];

/// Recommend a raaga for an emotion label.
///
/// The most common note is part of the interface but does not influence the
/// choice; the table is keyed by emotion alone.
pub fn recommend(emotion: &str, _note: &str) -> &'static str {
    RAAGA_TABLE
        .iter()
        .find(|(label, _)| *label == emotion)
        .map(|(_, raaga)| *raaga)
        .unwrap_or(DEFAULT_RAAGA)
}
