//! Chord progression summary.

use crate::chord_detector::ChordSegment;

/// Distinct chord labels in order of first appearance.
///
/// A chord that returns later in the piece is not appended again, so
/// `C G C F` summarises to `C G F`.
pub fn build_progression(chords: &[ChordSegment]) -> Vec<String> {
    let mut progression: Vec<String> = Vec::new();
    for chord in chords {
        if !progression.contains(&chord.chord) {
            progression.push(chord.chord.clone());
        }
    }
    progression
}
