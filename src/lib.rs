//! # tonal_analysis
//!
//! Offline tonal analysis of decoded audio: split a mono waveform into
//! chord segments and estimate its global key.
//!
//! ## Example
//! ```rust
//! use tonal_analysis::TonalAnalyzer;
//!
//! fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1) Build an analyzer for 22.05 kHz mono input
//!     let analyzer = TonalAnalyzer::builder()
//!         .sampling_rate(22_050)
//!         .hop_length(512)
//!         .build()?;
//!
//!     // 2) Analyze the whole waveform at once
//!     let samples: Vec<f32> = vec![0.0; 22_050 * 2]; // fill with actual samples
//!     let analysis = analyzer.analyze(&samples)?;
//!
//!     for chord in &analysis.chords {
//!         println!(
//!             "{:>6.2}s - {:>6.2}s  {} ({:.3})",
//!             chord.start_time, chord.end_time, chord.chord, chord.confidence
//!         );
//!     }
//!     if let Some(key) = &analysis.key {
//!         println!("key: {}", key.key);
//!     }
//!
//!     // 3) Hand the result over as JSON
//!     println!("{}", analysis.to_json()?);
//!     Ok(())
//! }
//! # run().unwrap();
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

/// Pipeline entry point and result types.
pub use analyzer::{AnalysisError, TonalAnalysis, TonalAnalyzer, TonalAnalyzerBuilder};

/// Chord template matching.
pub use chord_detector::{
    Chord, ChordError, ChordKind, ChordMatcher, ChordMatcherBuilder, ChordSegment,
    ChordTemplate, NoteName,
};

/// Batch chromagram extractor.
pub use chromagram::{ChromaVector, Chromagram, ChromagramBuilder, ChromagramError};

/// Key estimation.
pub use key_detector::{KeyEstimate, KeyEstimator, Mode};

/// Progression summary.
pub use progression::build_progression;

/// Boundary detection.
pub use segmenter::{BoundarySegmenter, Segment};

/// Analysis pipeline module.
pub mod analyzer;

/// Chord detection module.
pub mod chord_detector;

/// Chromagram computation module.
pub mod chromagram;

/// Key detection module.
pub mod key_detector;

/// Chord progression module.
pub mod progression;

/// Chroma segmentation module.
pub mod segmenter;
