//! MIDI note naming helpers
//!
//! Octaves follow the convention where middle C (note 60) is C3.

/// Spelling of the five black keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accidentals {
    #[default]
    Sharps,
    Flats,
}

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Pitch class name without octave, e.g. `"F#"` for note 66.
pub fn note_name(note: u8, accidentals: Accidentals) -> &'static str {
    let names = match accidentals {
        Accidentals::Sharps => &SHARP_NAMES,
        Accidentals::Flats => &FLAT_NAMES,
    };
    names[usize::from(note % 12)]
}

/// Octave number, -2 for notes 0..=11.
pub fn note_octave(note: u8) -> i8 {
    (note / 12) as i8 - 2
}

/// Name with octave, e.g. `"C3"` for note 60 or `"Bb-1"` for note 22.
pub fn note_name_with_octave(note: u8, accidentals: Accidentals) -> String {
    format!("{}{}", note_name(note, accidentals), note_octave(note))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_c() {
        assert_eq!(note_name(60, Accidentals::Sharps), "C");
        assert_eq!(note_octave(60), 3);
        assert_eq!(note_name_with_octave(60, Accidentals::Sharps), "C3");
    }

    #[test]
    fn test_accidentals() {
        assert_eq!(note_name(61, Accidentals::Sharps), "C#");
        assert_eq!(note_name(61, Accidentals::Flats), "Db");
        assert_eq!(note_name_with_octave(22, Accidentals::Flats), "Bb-1");
    }

    #[test]
    fn test_range_ends() {
        assert_eq!(note_name_with_octave(0, Accidentals::Sharps), "C-2");
        assert_eq!(note_name_with_octave(127, Accidentals::Sharps), "G8");
    }
}
