//! Boundary detection over chroma sequences.

mod common;

use common::{noise_chroma, repeat, template_chroma};
use tonal_analysis::segmenter::{candidate_boundaries, change_series};
use tonal_analysis::{BoundarySegmenter, ChordKind, NoteName, Segment};

fn c_major() -> [f32; 12] {
    template_chroma(NoteName::C, ChordKind::Major)
}

fn g_major() -> [f32; 12] {
    template_chroma(NoteName::G, ChordKind::Major)
}

fn f_major() -> [f32; 12] {
    template_chroma(NoteName::F, ChordKind::Major)
}

#[test]
fn sharp_change_splits_in_two() {
    let mut frames = repeat(c_major(), 50);
    frames.extend(repeat(g_major(), 50));

    assert_eq!(candidate_boundaries(&frames), vec![50]);
    assert_eq!(
        BoundarySegmenter::new().segment(&frames),
        vec![Segment::new(0, 50), Segment::new(50, 100)]
    );
}

#[test]
fn steady_input_is_one_segment() {
    let frames = repeat(c_major(), 40);
    assert!(candidate_boundaries(&frames).is_empty());
    assert_eq!(BoundarySegmenter::new().segment(&frames), vec![Segment::new(0, 40)]);
}

#[test]
fn short_input_has_no_segments() {
    let segmenter = BoundarySegmenter::new();
    assert!(segmenter.segment(&[]).is_empty());
    assert!(segmenter.segment(&repeat(c_major(), 1)).is_empty());
    assert!(segmenter.segment(&repeat(c_major(), 10)).is_empty());
    assert_eq!(segmenter.segment(&repeat(c_major(), 11)), vec![Segment::new(0, 11)]);
}

#[test]
fn rapid_boundaries_are_ignored() {
    // C for 5 frames, G until 50, F after
    let mut frames = repeat(c_major(), 5);
    frames.extend(repeat(g_major(), 45));
    frames.extend(repeat(f_major(), 50));

    assert_eq!(candidate_boundaries(&frames), vec![5, 50]);
    assert_eq!(
        BoundarySegmenter::new().segment(&frames),
        vec![Segment::new(0, 50), Segment::new(50, 100)]
    );
}

#[test]
fn minimum_length_is_exclusive() {
    let segmenter = BoundarySegmenter::new();

    let mut frames = repeat(c_major(), 10);
    frames.extend(repeat(g_major(), 30));
    assert_eq!(segmenter.segment(&frames), vec![Segment::new(0, 40)]);

    let mut frames = repeat(c_major(), 11);
    frames.extend(repeat(g_major(), 30));
    assert_eq!(
        segmenter.segment(&frames),
        vec![Segment::new(0, 11), Segment::new(11, 41)]
    );
}

#[test]
fn short_tail_is_dropped() {
    let mut frames = repeat(c_major(), 95);
    frames.extend(repeat(g_major(), 5));
    assert_eq!(BoundarySegmenter::new().segment(&frames), vec![Segment::new(0, 95)]);
}

#[test]
fn custom_minimum_length() {
    let mut frames = repeat(c_major(), 5);
    frames.extend(repeat(g_major(), 5));
    let segmenter = BoundarySegmenter::with_min_segment_frames(3);
    assert_eq!(segmenter.min_segment_frames(), 3);
    assert_eq!(
        segmenter.segment(&frames),
        vec![Segment::new(0, 5), Segment::new(5, 10)]
    );
}

#[test]
fn change_series_has_one_value_per_transition() {
    let mut frames = repeat(c_major(), 3);
    frames.extend(repeat(g_major(), 2));
    let change = change_series(&frames);
    assert_eq!(change.len(), 4);
    assert_eq!(change[0], 0.0);
    // C-E-G to G-B-D keeps G and swaps two tones each way
    assert!((change[2] - 2.0).abs() < 1e-6);
}

#[test]
fn segments_are_ordered_disjoint_and_long_enough() {
    let frames = noise_chroma(500, 7);
    let segments = BoundarySegmenter::new().segment(&frames);
    assert!(!segments.is_empty());
    for s in &segments {
        assert!(s.len() > 10, "{s:?}");
        assert!(s.end_frame <= frames.len());
    }
    for pair in segments.windows(2) {
        assert_eq!(pair[0].end_frame, pair[1].start_frame);
    }
    assert_eq!(segments[0].start_frame, 0);
}
