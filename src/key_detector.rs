//! Key Detector
//!
//! Krumhansl-Schmuckler key finding: the time-averaged chroma vector is
//! correlated with the major and minor tonal profiles rotated to each of the
//! twelve tonics, and the best of the 24 correlations names the key.
//!
//! # Reference
//!
//! Krumhansl, C. L. (1990). *Cognitive Foundations of Musical Pitch*.
//! Oxford University Press.

use crate::chord_detector::{mean_vector, NoteName};
use crate::chromagram::{ChromaVector, SEMITONES};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Probe-tone ratings for a major key with tonic C.
pub const MAJOR_PROFILE: ChromaVector = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Probe-tone ratings for a minor key with tonic C.
pub const MINOR_PROFILE: ChromaVector = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Major or minor mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Major (Ionian) mode
    Major,
    /// Minor (Aeolian) mode
    Minor,
}

impl Mode {
    /// Lowercase name, `"major"` or `"minor"`.
    pub const fn name(self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
        }
    }

    /// Reference profile for this mode with tonic C.
    pub const fn profile(self) -> &'static ChromaVector {
        match self {
            Mode::Major => &MAJOR_PROFILE,
            Mode::Minor => &MINOR_PROFILE,
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Global key of a piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEstimate {
    /// Key name, e.g. `"A minor"`.
    pub key: String,
    /// Mode of the key.
    pub mode: Mode,
    /// Pearson correlation with the winning profile; may be negative.
    pub confidence: f32,
    /// Tonic of the key.
    pub tonic: NoteName,
}

impl KeyEstimate {
    fn new(tonic: NoteName, mode: Mode, confidence: f32) -> Self {
        KeyEstimate {
            key: format!("{} {}", tonic, mode),
            mode,
            confidence,
            tonic,
        }
    }
}

/// Correlation of one (tonic, mode) candidate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KeyScore {
    /// Candidate tonic.
    pub tonic: NoteName,
    /// Candidate mode.
    pub mode: Mode,
    /// Pearson correlation with the rotated profile.
    pub correlation: f32,
}

/// Stateless Krumhansl-Schmuckler key estimator.
#[derive(Debug, Clone, Default)]
pub struct KeyEstimator;

impl KeyEstimator {
    /// Create a key estimator.
    pub fn new() -> Self {
        KeyEstimator
    }

    /// Estimate the key of a whole chromagram.
    ///
    /// Returns `None` for an empty chromagram or one whose average carries no
    /// pitch-class contrast (silence, perfectly flat spectra).
    pub fn estimate(&self, frames: &[ChromaVector]) -> Option<KeyEstimate> {
        if frames.is_empty() {
            return None;
        }
        self.estimate_vector(&mean_vector(frames))
    }

    /// Estimate the key of a single averaged chroma vector.
    ///
    /// Candidates are evaluated tonic C..B, major before minor; a later one
    /// wins only with a strictly higher correlation.
    pub fn estimate_vector(&self, chroma: &ChromaVector) -> Option<KeyEstimate> {
        let mut best: Option<KeyScore> = None;
        for score in self.scores(chroma)? {
            match best {
                Some(b) if score.correlation <= b.correlation => {}
                _ => best = Some(score),
            }
        }
        best.map(|b| KeyEstimate::new(b.tonic, b.mode, b.correlation))
    }

    /// All 24 candidate correlations in evaluation order.
    ///
    /// Returns `None` when `chroma` has zero variance.
    pub fn scores(&self, chroma: &ChromaVector) -> Option<Vec<KeyScore>> {
        let mut scores = Vec::with_capacity(2 * SEMITONES);
        for root in 0..SEMITONES {
            for mode in [Mode::Major, Mode::Minor] {
                let rotated = rotate_profile(mode.profile(), root);
                scores.push(KeyScore {
                    tonic: NoteName::from_idx(root),
                    mode,
                    correlation: pearson(chroma, &rotated)?,
                });
            }
        }
        Some(scores)
    }
}

/// Rotate `profile` right by `root` semitones so that its tonic lands on `root`.
pub fn rotate_profile(profile: &ChromaVector, root: usize) -> ChromaVector {
    let mut rotated = *profile;
    rotated.rotate_right(root % SEMITONES);
    rotated
}

/// Pearson correlation coefficient of two pitch-class vectors.
///
/// Returns `None` if either vector has zero variance.
pub fn pearson(a: &ChromaVector, b: &ChromaVector) -> Option<f32> {
    let n = SEMITONES as f32;
    let mean_a = a.iter().sum::<f32>() / n;
    let mean_b = b.iter().sum::<f32>() / n;

    let mut cov = 0.0;
    let mut ss_a = 0.0;
    let mut ss_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        ss_a += dx * dx;
        ss_b += dy * dy;
    }

    if is_flat(ss_a, a) || is_flat(ss_b, b) {
        return None;
    }
    Some((cov / (ss_a.sqrt() * ss_b.sqrt())).clamp(-1.0, 1.0))
}

/// Deviations within rounding noise of the vector's own energy count as zero.
fn is_flat(sum_sq_dev: f32, v: &ChromaVector) -> bool {
    let energy = v.iter().map(|x| x * x).sum::<f32>();
    sum_sq_dev <= f32::EPSILON * energy
}
