//! Tonal Analyzer
//!
//! Entry point of the engine: waveform in, chord segments, progression and
//! key out.

use crate::chord_detector::{ChordError, ChordMatcher, ChordMatcherBuilder, ChordSegment};
use crate::chromagram::{ChromaVector, Chromagram, ChromagramBuilder, ChromagramError};
use crate::key_detector::{KeyEstimate, KeyEstimator};
use crate::progression::build_progression;
use crate::segmenter::{BoundarySegmenter, DEFAULT_MIN_SEGMENT_FRAMES};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the analyzer.
///
/// Silent or very short input is not an error; these only signal misuse.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Chromagram configuration or input was invalid.
    #[error(transparent)]
    Chromagram(#[from] ChromagramError),

    /// Chord matching was called with invalid arguments.
    #[error(transparent)]
    Chord(#[from] ChordError),

    /// A chroma frame contained a negative or non-finite value.
    #[error("chroma frame {frame} is not a finite non-negative vector")]
    InvalidChroma {
        /// Index of the offending frame.
        frame: usize,
    },

    /// The result could not be converted to or from JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Structured result of one analysis call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TonalAnalysis {
    /// Accepted chord segments in time order.
    pub chords: Vec<ChordSegment>,
    /// Global key, `None` for silent or flat input.
    pub key: Option<KeyEstimate>,
    /// Distinct chord labels in order of first appearance.
    pub progression: Vec<String>,
}

impl TonalAnalysis {
    /// Serialize to a compact JSON document.
    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to an indented JSON document.
    pub fn to_json_pretty(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document produced by [`TonalAnalysis::to_json`].
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Builder for a `TonalAnalyzer`.
pub struct TonalAnalyzerBuilder {
    chromagram: ChromagramBuilder,
    matcher: ChordMatcherBuilder,
    min_segment_frames: usize,
}

impl TonalAnalyzerBuilder {
    /// Start with default parameters:
    /// sampling_rate = 22_050, hop_length = 512, frame_size = 2048,
    /// reference_frequency = 440.0, min_segment_frames = 10,
    /// confidence_threshold = 0.3.
    pub fn new() -> Self {
        TonalAnalyzerBuilder {
            chromagram: Chromagram::builder(),
            matcher: ChordMatcher::builder(),
            min_segment_frames: DEFAULT_MIN_SEGMENT_FRAMES,
        }
    }

    /// Set the sampling rate of the waveform.
    pub fn sampling_rate(mut self, rate: usize) -> Self {
        self.chromagram = self.chromagram.sampling_rate(rate);
        self
    }

    /// Set the hop between analysis frames in samples.
    pub fn hop_length(mut self, hop: usize) -> Self {
        self.chromagram = self.chromagram.hop_length(hop);
        self
    }

    /// Set the FFT size of each analysis frame.
    pub fn frame_size(mut self, size: usize) -> Self {
        self.chromagram = self.chromagram.frame_size(size);
        self
    }

    /// Set the tuning of A4 in Hz.
    pub fn reference_frequency(mut self, hz: f32) -> Self {
        self.chromagram = self.chromagram.reference_frequency(hz);
        self
    }

    /// Set the minimum segment length in frames (exclusive).
    pub fn min_segment_frames(mut self, frames: usize) -> Self {
        self.min_segment_frames = frames;
        self
    }

    /// Set the minimum chord score (exclusive) for a segment to be reported.
    pub fn confidence_threshold(mut self, value: f32) -> Self {
        self.matcher = self.matcher.confidence_threshold(value);
        self
    }

    /// Finalize and create the analyzer.
    pub fn build(self) -> Result<TonalAnalyzer, AnalysisError> {
        Ok(TonalAnalyzer {
            chromagram: self.chromagram.build()?,
            segmenter: BoundarySegmenter::with_min_segment_frames(self.min_segment_frames),
            matcher: self.matcher.build(),
            key_estimator: KeyEstimator::new(),
        })
    }
}

impl Default for TonalAnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Chord and key analysis of whole waveforms.
///
/// Holds no per-call state: `analyze` takes `&self`, so one analyzer can
/// serve any number of threads.
pub struct TonalAnalyzer {
    chromagram: Chromagram,
    segmenter: BoundarySegmenter,
    matcher: ChordMatcher,
    key_estimator: KeyEstimator,
}

impl TonalAnalyzer {
    /// Start customizing with a builder.
    pub fn builder() -> TonalAnalyzerBuilder {
        TonalAnalyzerBuilder::new()
    }

    /// Create an analyzer with default parameters.
    pub fn new() -> Result<Self, AnalysisError> {
        Self::builder().build()
    }

    /// The chromagram stage, e.g. for frame timing.
    pub fn chromagram(&self) -> &Chromagram {
        &self.chromagram
    }

    /// Analyze a mono waveform sampled at the configured rate.
    pub fn analyze(&self, samples: &[f32]) -> Result<TonalAnalysis, AnalysisError> {
        let frames = self.chromagram.compute(samples)?;
        log::debug!(
            "computed {} chroma frames from {} samples",
            frames.len(),
            samples.len()
        );
        self.analyze_chroma(&frames)
    }

    /// Analyze a precomputed chromagram.
    ///
    /// Frames are assumed to be spaced by the configured hop length.
    pub fn analyze_chroma(&self, frames: &[ChromaVector]) -> Result<TonalAnalysis, AnalysisError> {
        if let Some(frame) = frames
            .iter()
            .position(|f| f.iter().any(|c| !c.is_finite() || *c < 0.0))
        {
            return Err(AnalysisError::InvalidChroma { frame });
        }

        let segments = self.segmenter.segment(frames);
        let mut chords = Vec::with_capacity(segments.len());
        for segment in &segments {
            if let Some(chord) = self.matcher.match_segment(
                frames,
                *segment,
                self.chromagram.hop_length(),
                self.chromagram.sampling_rate(),
            )? {
                chords.push(chord);
            }
        }

        let key = self.key_estimator.estimate(frames);
        let progression = build_progression(&chords);

        log::debug!(
            "{} segments, {} chords accepted, key {}",
            segments.len(),
            chords.len(),
            key.as_ref().map_or("none", |k| k.key.as_str())
        );

        Ok(TonalAnalysis {
            chords,
            key,
            progression,
        })
    }
}
