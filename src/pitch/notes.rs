//! Frequency to note-name conversion on the 12-tone equal-tempered scale.

use std::collections::HashMap;

pub const SILENCE: &str = "silence";

pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const A4_HZ: f64 = 440.0;

/// C0, 4.75 octaves (57 semitones) below A4.
pub fn c0_hz() -> f64 {
    A4_HZ * 2f64.powf(-4.75)
}

/// Rounded number of semitones between C0 and `frequency`. Negative below C0.
pub fn semitones_from_c0(frequency: f64) -> i64 {
    (12.0 * (frequency / c0_hz()).log2()).round() as i64
}

/// Note name with octave (`"A4"`, `"C#3"`, `"B-1"`), or `"silence"` for
/// non-positive and non-finite frequencies.
pub fn frequency_to_note(frequency: f32) -> String {
    let frequency = frequency as f64;
    if !frequency.is_finite() || frequency <= 0.0 {
        return SILENCE.to_string();
    }
    let h = semitones_from_c0(frequency);
    // Floor semantics: one semitone below C0 is B in octave -1.
    let octave = h.div_euclid(12);
    let index = h.rem_euclid(12) as usize;
    format!("{}{}", NOTE_NAMES[index], octave)
}

/// The note occurring most often. Ties go to whichever note appeared first.
pub fn most_common_note<S: AsRef<str>>(notes: &[S]) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, note) in notes.iter().enumerate() {
        let entry = counts.entry(note.as_ref()).or_insert((0, position));
        entry.0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(note, _)| note.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_reference_pitches() {
        assert_eq!(frequency_to_note(440.0), "A4");
        assert_eq!(frequency_to_note(261.63), "C4");
        assert_eq!(frequency_to_note(27.5), "A0");
        assert_eq!(frequency_to_note(466.16), "A#4");
        assert_eq!(frequency_to_note(880.0), "A5");
    }

    #[test]
    fn non_positive_frequencies_are_silence() {
        assert_eq!(frequency_to_note(0.0), SILENCE);
        assert_eq!(frequency_to_note(-12.0), SILENCE);
        assert_eq!(frequency_to_note(f32::NAN), SILENCE);
    }

    #[test]
    fn sub_c0_frequencies_use_floor_division() {
        // One semitone below C0 (~15.43 Hz).
        let below = (c0_hz() * 2f64.powf(-1.0 / 12.0)) as f32;
        assert_eq!(semitones_from_c0(below as f64), -1);
        assert_eq!(frequency_to_note(below), "B-1");
        // Thirteen semitones below C0.
        let further = (c0_hz() * 2f64.powf(-13.0 / 12.0)) as f32;
        assert_eq!(frequency_to_note(further), "B-2");
    }

    #[test]
    fn most_common_breaks_ties_by_first_occurrence() {
        let notes = ["E4", "A4", "A4", "E4", "C4"];
        assert_eq!(most_common_note(&notes).as_deref(), Some("E4"));
        let notes = ["silence", "A4", "A4"];
        assert_eq!(most_common_note(&notes).as_deref(), Some("A4"));
        assert_eq!(most_common_note::<&str>(&[]), None);
    }
}
