//! Chord Detector
//!
//! Template-based chord matching over averaged 12-bin chromagrams.
//!
//! Every chord candidate is a binary pitch-class template. A chroma vector is
//! scored against all 180 templates by cosine similarity, and the highest
//! score wins. Candidates are visited root first (C..B), then in the declared
//! order of [`ChordKind`], and a later candidate only replaces the current
//! best on a strictly higher score.

use crate::chromagram::{frame_to_seconds, ChromaVector, SEMITONES};
use crate::segmenter::Segment;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// Number of chord qualities
const NUM_CHORD_KINDS: usize = 15;

/// Total number of chords (root × quality)
pub const NUM_CHORDS: usize = SEMITONES * NUM_CHORD_KINDS;

/// Supported chord qualities in matching order
pub const CHORD_KINDS: [ChordKind; NUM_CHORD_KINDS] = [
    ChordKind::Major,
    ChordKind::Minor,
    ChordKind::Diminished,
    ChordKind::Augmented,
    ChordKind::SuspendedSecond,
    ChordKind::SuspendedFourth,
    ChordKind::MajorSeventh,
    ChordKind::MinorSeventh,
    ChordKind::DominantSeventh,
    ChordKind::HalfDiminishedSeventh,
    ChordKind::MajorNinth,
    ChordKind::MinorNinth,
    ChordKind::AddNinth,
    ChordKind::Sixth,
    ChordKind::MinorSixth,
];

/// Default minimum cosine score for a segment to be reported.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Read-only template bank shared by every matcher.
static TEMPLATE_BANK: [ChordTemplate; NUM_CHORDS] = make_template_bank();

/// Supported chord qualities
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChordKind {
    /// Major chord (e.g., C-E-G)
    #[serde(rename = "major")]
    Major,
    /// Minor chord (e.g., C-Eb-G)
    #[serde(rename = "minor")]
    Minor,
    /// Diminished chord (e.g., C-Eb-Gb)
    #[serde(rename = "diminished")]
    Diminished,
    /// Augmented chord (e.g., C-E-G#)
    #[serde(rename = "augmented")]
    Augmented,
    /// Suspended second chord (e.g., C-D-G)
    #[serde(rename = "sus2")]
    SuspendedSecond,
    /// Suspended fourth chord (e.g., C-F-G)
    #[serde(rename = "sus4")]
    SuspendedFourth,
    /// Major seventh chord (e.g., C-E-G-B)
    #[serde(rename = "major7")]
    MajorSeventh,
    /// Minor seventh chord (e.g., C-Eb-G-Bb)
    #[serde(rename = "minor7")]
    MinorSeventh,
    /// Dominant seventh chord (e.g., C-E-G-Bb)
    #[serde(rename = "dominant7")]
    DominantSeventh,
    /// Half-diminished seventh chord (e.g., C-Eb-Gb-Bb)
    #[serde(rename = "minor7b5")]
    HalfDiminishedSeventh,
    /// Major ninth chord (e.g., C-E-G-B-D)
    #[serde(rename = "major9")]
    MajorNinth,
    /// Minor ninth chord (e.g., C-Eb-G-Bb-D)
    #[serde(rename = "minor9")]
    MinorNinth,
    /// Added ninth chord (e.g., C-E-G-D)
    #[serde(rename = "add9")]
    AddNinth,
    /// Major sixth chord (e.g., C-E-G-A)
    #[serde(rename = "6")]
    Sixth,
    /// Minor sixth chord (e.g., C-Eb-G-A)
    #[serde(rename = "minor6")]
    MinorSixth,
}

impl ChordKind {
    /// Short name used in chord labels, e.g. `"minor7b5"`.
    pub const fn name(self) -> &'static str {
        match self {
            ChordKind::Major => "major",
            ChordKind::Minor => "minor",
            ChordKind::Diminished => "diminished",
            ChordKind::Augmented => "augmented",
            ChordKind::SuspendedSecond => "sus2",
            ChordKind::SuspendedFourth => "sus4",
            ChordKind::MajorSeventh => "major7",
            ChordKind::MinorSeventh => "minor7",
            ChordKind::DominantSeventh => "dominant7",
            ChordKind::HalfDiminishedSeventh => "minor7b5",
            ChordKind::MajorNinth => "major9",
            ChordKind::MinorNinth => "minor9",
            ChordKind::AddNinth => "add9",
            ChordKind::Sixth => "6",
            ChordKind::MinorSixth => "minor6",
        }
    }

    /// Semitone offsets above the root that belong to the chord.
    pub const fn intervals(self) -> &'static [usize] {
        match self {
            ChordKind::Major => &[0, 4, 7],
            ChordKind::Minor => &[0, 3, 7],
            ChordKind::Diminished => &[0, 3, 6],
            ChordKind::Augmented => &[0, 4, 8],
            ChordKind::SuspendedSecond => &[0, 2, 7],
            ChordKind::SuspendedFourth => &[0, 5, 7],
            ChordKind::MajorSeventh => &[0, 4, 7, 11],
            ChordKind::MinorSeventh => &[0, 3, 7, 10],
            ChordKind::DominantSeventh => &[0, 4, 7, 10],
            ChordKind::HalfDiminishedSeventh => &[0, 3, 6, 10],
            ChordKind::MajorNinth => &[0, 4, 7, 11, 2],
            ChordKind::MinorNinth => &[0, 3, 7, 10, 2],
            ChordKind::AddNinth => &[0, 4, 7, 2],
            ChordKind::Sixth => &[0, 4, 7, 9],
            ChordKind::MinorSixth => &[0, 3, 7, 9],
        }
    }
}

impl Display for ChordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChordKind {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CHORD_KINDS
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ChordError::UnknownName(s.to_string()))
    }
}

/// Twelve chromatic pitch classes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    /// C
    C,
    /// C sharp / D flat
    #[serde(rename = "C#")]
    Cs,
    /// D
    D,
    /// D sharp / E flat
    #[serde(rename = "D#")]
    Ds,
    /// E
    E,
    /// F
    F,
    /// F sharp / G flat
    #[serde(rename = "F#")]
    Fs,
    /// G
    G,
    /// G sharp / A flat
    #[serde(rename = "G#")]
    Gs,
    /// A
    A,
    /// A sharp / B flat
    #[serde(rename = "A#")]
    As,
    /// B
    B,
}

impl NoteName {
    /// All pitch classes, C first.
    pub const ALL: [NoteName; SEMITONES] = [
        NoteName::C,
        NoteName::Cs,
        NoteName::D,
        NoteName::Ds,
        NoteName::E,
        NoteName::F,
        NoteName::Fs,
        NoteName::G,
        NoteName::Gs,
        NoteName::A,
        NoteName::As,
        NoteName::B,
    ];

    /// Pitch class for `idx`, wrapping around the octave.
    pub const fn from_idx(idx: usize) -> NoteName {
        Self::ALL[idx % SEMITONES]
    }

    /// Pitch-class index, 0 for C up to 11 for B.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Sharp spelling, e.g. `"F#"`.
    pub const fn name(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::Cs => "C#",
            NoteName::D => "D",
            NoteName::Ds => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::Fs => "F#",
            NoteName::G => "G",
            NoteName::Gs => "G#",
            NoteName::A => "A",
            NoteName::As => "A#",
            NoteName::B => "B",
        }
    }
}

impl Display for NoteName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NoteName {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoteName::ALL
            .iter()
            .copied()
            .find(|note| note.name() == s)
            .ok_or_else(|| ChordError::UnknownName(s.to_string()))
    }
}

/// Binary pitch-class template of one (root, quality) pair.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ChordTemplate {
    /// Root of the chord.
    pub root: NoteName,
    /// Quality of the chord.
    pub kind: ChordKind,
    /// 1.0 on chord tones, 0.0 elsewhere.
    pub weights: ChromaVector,
    tones: usize,
}

impl ChordTemplate {
    /// Euclidean norm of `weights`.
    pub fn norm(&self) -> f32 {
        (self.tones as f32).sqrt()
    }
}

/// Look up the template for `root` and `kind` in the shared bank.
pub fn template(root: NoteName, kind: ChordKind) -> &'static ChordTemplate {
    &TEMPLATE_BANK[root.index() * NUM_CHORD_KINDS + kind as usize]
}

/// All 180 templates in matching order.
pub fn templates() -> &'static [ChordTemplate] {
    &TEMPLATE_BANK
}

/// Represents a musical chord matched against a chroma vector.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Chord {
    /// The root note of the detected chord.
    pub root: NoteName,
    /// The quality (e.g., Major, Minor) of the detected chord.
    pub quality: ChordKind,
    /// Cosine similarity with the chord template; higher is better.
    pub confidence: f32,
}

impl Chord {
    /// Display label: the bare root for major chords, `"<root> <kind>"` otherwise.
    pub fn label(&self) -> String {
        chord_label(self.root, self.quality)
    }
}

/// Build a chord label, e.g. `"G"` or `"A minor7"`.
pub fn chord_label(root: NoteName, quality: ChordKind) -> String {
    match quality {
        ChordKind::Major => root.name().to_string(),
        other => format!("{} {}", root, other),
    }
}

/// A time-stamped chord accepted for one segment of the chromagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSegment {
    /// Chord label, see [`chord_label`].
    pub chord: String,
    /// Cosine similarity of the winning template.
    pub confidence: f32,
    /// Segment start in seconds.
    pub start_time: f32,
    /// Segment end in seconds.
    pub end_time: f32,
    /// Root of the chord.
    pub root_note: NoteName,
    /// Quality of the chord.
    pub chord_type: ChordKind,
}

/// Errors when detecting chords
#[derive(Debug, Error)]
pub enum ChordError {
    /// The chromagram provided did not have the expected number of semitones.
    #[error("expected a {expected}-bin chromagram, got {got}")]
    InvalidLength {
        /// The expected number of semitones (12).
        expected: usize,
        /// The actual number of semitones provided.
        got: usize,
    },

    /// An invalid argument was provided to a detection function.
    #[error("invalid argument `{arg}`: {msg}")]
    InvalidArgument {
        /// The name of the invalid argument.
        arg: &'static str,
        /// A description of the invalid argument.
        msg: String,
    },

    /// A note or chord-type name could not be parsed.
    #[error("unknown note or chord name `{0}`")]
    UnknownName(String),
}

/// Builder for `ChordMatcher` to customize the acceptance threshold
pub struct ChordMatcherBuilder {
    confidence_threshold: f32,
}

impl ChordMatcherBuilder {
    /// Create a new builder with default threshold = 0.3
    pub fn new() -> Self {
        ChordMatcherBuilder {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    /// Set the minimum score (exclusive) for a segment to be accepted
    pub fn confidence_threshold(mut self, value: f32) -> Self {
        self.confidence_threshold = value;
        self
    }

    /// Build the `ChordMatcher`
    pub fn build(self) -> ChordMatcher {
        ChordMatcher {
            confidence_threshold: self.confidence_threshold,
        }
    }
}

impl Default for ChordMatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Matches chroma vectors against the chord template bank.
#[derive(Debug, Clone)]
pub struct ChordMatcher {
    confidence_threshold: f32,
}

impl ChordMatcher {
    /// Return a builder to customize the acceptance threshold
    pub fn builder() -> ChordMatcherBuilder {
        ChordMatcherBuilder::new()
    }

    /// Create a matcher with default threshold = 0.3
    pub fn new() -> Self {
        ChordMatcherBuilder::new().build()
    }

    /// Minimum score (exclusive) for accepting a segment.
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Find the single best chord for a chromagram slice.
    ///
    /// A zero vector scores 0.0 against every template and yields C major.
    ///
    /// Returns `Err(ChordError::InvalidLength)` if `chroma.len() != SEMITONES`.
    pub fn best_match(&self, chroma: &[f32]) -> Result<Chord, ChordError> {
        let chroma = as_chroma(chroma)?;
        let mut best = Chord {
            root: NoteName::C,
            quality: ChordKind::Major,
            confidence: 0.0,
        };
        for t in TEMPLATE_BANK.iter() {
            let score = score_chord(chroma, t);
            if score > best.confidence {
                best = Chord {
                    root: t.root,
                    quality: t.kind,
                    confidence: score,
                };
            }
        }
        Ok(best)
    }

    /// Find the `k` best chords from a chromagram slice, best first.
    ///
    /// Equal scores keep template bank order.
    ///
    /// Returns:
    /// - `Err(InvalidLength)` if `chroma.len() != SEMITONES`.
    /// - `Err(InvalidArgument)` if `k == 0`.
    pub fn top_k(&self, chroma: &[f32], k: usize) -> Result<Vec<Chord>, ChordError> {
        let chroma = as_chroma(chroma)?;
        if k == 0 {
            return Err(ChordError::InvalidArgument {
                arg: "k",
                msg: "must be >= 1".to_string(),
            });
        }

        let mut scored: Vec<Chord> = TEMPLATE_BANK
            .iter()
            .map(|t| Chord {
                root: t.root,
                quality: t.kind,
                confidence: score_chord(chroma, t),
            })
            .collect();
        // stable sort keeps bank order among ties
        scored.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        scored.truncate(k.min(NUM_CHORDS));
        Ok(scored)
    }

    /// Average the frames of `segment` and match the result.
    ///
    /// Returns `Ok(None)` when the best score does not exceed the threshold.
    pub fn match_segment(
        &self,
        frames: &[ChromaVector],
        segment: Segment,
        hop_length: usize,
        sampling_rate: usize,
    ) -> Result<Option<ChordSegment>, ChordError> {
        if segment.is_empty() || segment.end_frame > frames.len() {
            return Err(ChordError::InvalidArgument {
                arg: "segment",
                msg: format!(
                    "{}..{} is not a non-empty range within {} frames",
                    segment.start_frame,
                    segment.end_frame,
                    frames.len()
                ),
            });
        }

        let average = mean_vector(&frames[segment.start_frame..segment.end_frame]);
        let chord = self.best_match(&average)?;
        if chord.confidence <= self.confidence_threshold {
            log::trace!(
                "dropping segment {}..{}: best {} scored {:.3}",
                segment.start_frame,
                segment.end_frame,
                chord.label(),
                chord.confidence
            );
            return Ok(None);
        }

        Ok(Some(ChordSegment {
            chord: chord.label(),
            confidence: chord.confidence,
            start_time: frame_to_seconds(segment.start_frame, hop_length, sampling_rate),
            end_time: frame_to_seconds(segment.end_frame, hop_length, sampling_rate),
            root_note: chord.root,
            chord_type: chord.quality,
        }))
    }
}

impl Default for ChordMatcher {
    fn default() -> Self {
        ChordMatcher::new()
    }
}

/// Element-wise mean of a run of chroma vectors.
pub fn mean_vector(frames: &[ChromaVector]) -> ChromaVector {
    let mut acc = [0.0f32; SEMITONES];
    if frames.is_empty() {
        return acc;
    }
    for frame in frames {
        for (a, &c) in acc.iter_mut().zip(frame) {
            *a += c;
        }
    }
    let count = frames.len() as f32;
    acc.iter_mut().for_each(|a| *a /= count);
    acc
}

fn as_chroma(chroma: &[f32]) -> Result<&ChromaVector, ChordError> {
    chroma.try_into().map_err(|_| ChordError::InvalidLength {
        expected: SEMITONES,
        got: chroma.len(),
    })
}

/// Cosine similarity between a chroma vector and a chord template
#[inline(always)]
fn score_chord(chroma: &ChromaVector, t: &ChordTemplate) -> f32 {
    let chroma_norm = chroma.iter().map(|c| c * c).sum::<f32>().sqrt();
    if chroma_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = chroma.iter().zip(&t.weights).map(|(c, w)| c * w).sum();
    (dot / (chroma_norm * t.norm())).clamp(-1.0, 1.0)
}

/// Compile-time template bank, root-major.
const fn make_template_bank() -> [ChordTemplate; NUM_CHORDS] {
    let mut bank = [ChordTemplate {
        root: NoteName::C,
        kind: ChordKind::Major,
        weights: [0.0; SEMITONES],
        tones: 0,
    }; NUM_CHORDS];

    let mut root = 0;
    while root < SEMITONES {
        let mut k = 0;
        while k < NUM_CHORD_KINDS {
            let kind = CHORD_KINDS[k];
            let intervals = kind.intervals();
            let slot = root * NUM_CHORD_KINDS + k;
            bank[slot].root = NoteName::from_idx(root);
            bank[slot].kind = kind;
            bank[slot].tones = intervals.len();
            let mut i = 0;
            while i < intervals.len() {
                bank[slot].weights[(root + intervals[i]) % SEMITONES] = 1.0;
                i += 1;
            }
            k += 1;
        }
        root += 1;
    }
    bank
}
