//! Boundary Segmenter
//!
//! Splits a chromagram into runs of stable tonal content.
//!
//! The change of frame `i` is the Euclidean distance between chroma vectors
//! `i` and `i - 1`. Frames whose change exceeds `mean + std` of the whole
//! change series are candidate boundaries. A candidate opens a new segment
//! only if the current one would be longer than the minimum length; the
//! trailing segment is kept under the same rule.

use crate::chromagram::ChromaVector;

/// Default minimum segment length in frames (exclusive).
pub const DEFAULT_MIN_SEGMENT_FRAMES: usize = 10;

/// Half-open frame range `[start_frame, end_frame)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    /// First frame of the segment.
    pub start_frame: usize,
    /// One past the last frame of the segment.
    pub end_frame: usize,
}

impl Segment {
    /// Create a segment covering `start_frame..end_frame`.
    pub fn new(start_frame: usize, end_frame: usize) -> Self {
        Segment {
            start_frame,
            end_frame,
        }
    }

    /// Number of frames in the segment.
    pub fn len(&self) -> usize {
        self.end_frame.saturating_sub(self.start_frame)
    }

    /// True when the segment covers no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Threshold-based tonal change segmenter.
#[derive(Debug, Clone)]
pub struct BoundarySegmenter {
    min_segment_frames: usize,
}

impl BoundarySegmenter {
    /// Create a segmenter with the default minimum length of 10 frames.
    pub fn new() -> Self {
        Self::with_min_segment_frames(DEFAULT_MIN_SEGMENT_FRAMES)
    }

    /// Create a segmenter that only keeps segments longer than `frames`.
    pub fn with_min_segment_frames(frames: usize) -> Self {
        BoundarySegmenter {
            min_segment_frames: frames,
        }
    }

    /// Minimum segment length in frames (exclusive).
    pub fn min_segment_frames(&self) -> usize {
        self.min_segment_frames
    }

    /// Partition `frames` into ordered, non-overlapping segments.
    pub fn segment(&self, frames: &[ChromaVector]) -> Vec<Segment> {
        let boundaries = candidate_boundaries(frames);

        let mut segments = Vec::new();
        let mut start = 0;
        for boundary in boundaries {
            if boundary - start > self.min_segment_frames {
                segments.push(Segment::new(start, boundary));
                start = boundary;
            }
        }

        if frames.len() - start > self.min_segment_frames {
            segments.push(Segment::new(start, frames.len()));
        }

        log::trace!(
            "segmented {} frames into {} segments",
            frames.len(),
            segments.len()
        );
        segments
    }
}

impl Default for BoundarySegmenter {
    fn default() -> Self {
        BoundarySegmenter::new()
    }
}

/// Change value of every frame after the first: `change[i - 1] = |c[i] - c[i-1]|`.
pub fn change_series(frames: &[ChromaVector]) -> Vec<f32> {
    frames
        .windows(2)
        .map(|pair| {
            pair[1]
                .iter()
                .zip(&pair[0])
                .map(|(b, a)| (b - a) * (b - a))
                .sum::<f32>()
                .sqrt()
        })
        .collect()
}

/// Frames, in increasing order, where the tonal content changes sharply.
pub fn candidate_boundaries(frames: &[ChromaVector]) -> Vec<usize> {
    let change = change_series(frames);
    if change.is_empty() {
        return Vec::new();
    }

    let n = change.len() as f32;
    let mean = change.iter().sum::<f32>() / n;
    let variance = change.iter().map(|c| (c - mean) * (c - mean)).sum::<f32>() / n;
    let threshold = mean + variance.sqrt();

    change
        .iter()
        .enumerate()
        .filter(|(_, &c)| c > threshold)
        .map(|(i, _)| i + 1)
        .collect()
}
