//! Template bank and chord matching.

mod common;

use common::{assert_close, cosine, repeat, template_chroma, HOP, SAMPLE_RATE};
use tonal_analysis::chord_detector::{chord_label, template, templates, CHORD_KINDS, NUM_CHORDS};
use tonal_analysis::{ChordError, ChordKind, ChordMatcher, NoteName, Segment};

fn ones(indices: &[usize]) -> [f32; 12] {
    let mut v = [0.0; 12];
    for &i in indices {
        v[i] = 1.0;
    }
    v
}

#[test]
fn triad_templates() {
    assert_eq!(template(NoteName::C, ChordKind::Major).weights, ones(&[0, 4, 7]));
    assert_eq!(template(NoteName::C, ChordKind::Minor).weights, ones(&[0, 3, 7]));
    assert_eq!(template(NoteName::A, ChordKind::Minor).weights, ones(&[9, 0, 4]));
    assert_eq!(
        template(NoteName::D, ChordKind::MajorNinth).weights,
        ones(&[2, 6, 9, 1, 4])
    );
    assert_close(template(NoteName::G, ChordKind::DominantSeventh).norm(), 2.0, 1e-6);
}

#[test]
fn bank_is_root_major_with_fifteen_kinds() {
    let bank = templates();
    assert_eq!(bank.len(), NUM_CHORDS);
    assert_eq!(bank.len(), 180);
    for (i, t) in bank.iter().enumerate() {
        assert_eq!(t.root, NoteName::from_idx(i / 15));
        assert_eq!(t.kind, CHORD_KINDS[i % 15]);
        let tones = t.weights.iter().filter(|&&w| w == 1.0).count();
        assert_eq!(tones, t.kind.intervals().len());
    }
    assert_eq!(CHORD_KINDS[0], ChordKind::Major);
}

#[test]
fn exact_template_is_matched_with_full_confidence() {
    let matcher = ChordMatcher::new();
    for (root, kind) in [
        (NoteName::C, ChordKind::Major),
        (NoteName::G, ChordKind::Major),
        (NoteName::Fs, ChordKind::Minor),
        (NoteName::B, ChordKind::Diminished),
        (NoteName::E, ChordKind::DominantSeventh),
        (NoteName::D, ChordKind::SuspendedFourth),
    ] {
        let chord = matcher.best_match(&template_chroma(root, kind)).unwrap();
        assert_eq!((chord.root, chord.quality), (root, kind));
        assert_close(chord.confidence, 1.0, 1e-5);
    }
}

#[test]
fn equal_pitch_sets_resolve_to_the_earliest_root() {
    let matcher = ChordMatcher::new();

    // A minor7 spells the same pitch classes as C6
    let chord = matcher
        .best_match(&template_chroma(NoteName::A, ChordKind::MinorSeventh))
        .unwrap();
    assert_eq!(chord.label(), "C 6");

    // Augmented triads are symmetric
    let chord = matcher
        .best_match(&template_chroma(NoteName::Gs, ChordKind::Augmented))
        .unwrap();
    assert_eq!(chord.label(), "C augmented");
}

#[test]
fn zero_vector_scores_nothing() {
    let chord = ChordMatcher::new().best_match(&[0.0; 12]).unwrap();
    assert_eq!(chord.root, NoteName::C);
    assert_eq!(chord.quality, ChordKind::Major);
    assert_eq!(chord.confidence, 0.0);
}

#[test]
fn noisy_chroma_keeps_the_cosine_score() {
    let mut v = template_chroma(NoteName::C, ChordKind::Major);
    v[2] = 0.2;
    v[9] = 0.1;
    let chord = ChordMatcher::new().best_match(&v).unwrap();
    assert_eq!(chord.label(), "C");
    assert_close(
        chord.confidence,
        cosine(&v, &template_chroma(NoteName::C, ChordKind::Major)),
        1e-6,
    );
}

#[test]
fn wrong_length_and_zero_k_are_errors() {
    let matcher = ChordMatcher::new();
    assert!(matches!(
        matcher.best_match(&[1.0; 11]),
        Err(ChordError::InvalidLength { expected: 12, got: 11 })
    ));
    assert!(matches!(
        matcher.top_k(&[1.0; 12], 0),
        Err(ChordError::InvalidArgument { arg: "k", .. })
    ));
}

#[test]
fn top_k_is_sorted_and_led_by_best_match() {
    let matcher = ChordMatcher::new();
    let mut v = template_chroma(NoteName::A, ChordKind::Minor);
    v[7] = 0.4;
    let best = matcher.best_match(&v).unwrap();
    let top = matcher.top_k(&v, 5).unwrap();
    assert_eq!(top.len(), 5);
    assert_eq!(top[0], best);
    assert!(top.windows(2).all(|w| w[0].confidence >= w[1].confidence));

    assert_eq!(matcher.top_k(&v, 1_000).unwrap().len(), NUM_CHORDS);
}

#[test]
fn labels_omit_major_suffix() {
    assert_eq!(chord_label(NoteName::G, ChordKind::Major), "G");
    assert_eq!(chord_label(NoteName::Cs, ChordKind::Minor), "C# minor");
    assert_eq!(chord_label(NoteName::As, ChordKind::HalfDiminishedSeventh), "A# minor7b5");
    assert_eq!(chord_label(NoteName::F, ChordKind::Sixth), "F 6");
}

#[test]
fn names_parse_back() {
    for kind in CHORD_KINDS {
        assert_eq!(kind.name().parse::<ChordKind>().unwrap(), kind);
    }
    for note in NoteName::ALL {
        assert_eq!(note.to_string().parse::<NoteName>().unwrap(), note);
    }
    assert!(matches!("H".parse::<NoteName>(), Err(ChordError::UnknownName(_))));
    assert!(matches!("major13".parse::<ChordKind>(), Err(ChordError::UnknownName(_))));
}

#[test]
fn segment_is_averaged_and_timed() {
    let matcher = ChordMatcher::new();
    let mut frames = repeat(template_chroma(NoteName::C, ChordKind::Major), 50);
    frames.extend(repeat(template_chroma(NoteName::G, ChordKind::Major), 50));

    let first = matcher
        .match_segment(&frames, Segment::new(0, 50), HOP, SAMPLE_RATE)
        .unwrap()
        .unwrap();
    assert_eq!(first.chord, "C");
    assert_eq!(first.root_note, NoteName::C);
    assert_eq!(first.chord_type, ChordKind::Major);
    assert_close(first.start_time, 0.0, 1e-9);
    assert_close(first.end_time, 1.161, 1e-3);

    let second = matcher
        .match_segment(&frames, Segment::new(50, 100), HOP, SAMPLE_RATE)
        .unwrap()
        .unwrap();
    assert_eq!(second.chord, "G");
    assert_close(second.start_time, 1.161, 1e-3);
    assert_close(second.end_time, 2.322, 1e-3);
}

#[test]
fn segments_at_or_below_threshold_are_dropped() {
    let frames = repeat([0.0; 12], 20);
    let matched = ChordMatcher::new()
        .match_segment(&frames, Segment::new(0, 20), HOP, SAMPLE_RATE)
        .unwrap();
    assert!(matched.is_none());

    let mut v = template_chroma(NoteName::C, ChordKind::Major);
    v[2] = 0.5;
    let frames = repeat(v, 20);
    let strict = ChordMatcher::builder().confidence_threshold(0.99).build();
    assert!(strict
        .match_segment(&frames, Segment::new(0, 20), HOP, SAMPLE_RATE)
        .unwrap()
        .is_none());

    let matched = ChordMatcher::new()
        .match_segment(&frames, Segment::new(0, 20), HOP, SAMPLE_RATE)
        .unwrap()
        .unwrap();
    assert!(matched.confidence > 0.3);
}

#[test]
fn out_of_range_segment_is_an_error() {
    let frames = repeat([1.0; 12], 10);
    let matcher = ChordMatcher::new();
    assert!(matches!(
        matcher.match_segment(&frames, Segment::new(5, 11), HOP, SAMPLE_RATE),
        Err(ChordError::InvalidArgument { arg: "segment", .. })
    ));
    assert!(matches!(
        matcher.match_segment(&frames, Segment::new(4, 4), HOP, SAMPLE_RATE),
        Err(ChordError::InvalidArgument { arg: "segment", .. })
    ));
}

#[test]
fn confidence_never_exceeds_one() {
    let matcher = ChordMatcher::new();
    for t in templates() {
        for scale in [1.0, 0.7, 0.3, 0.123, 3.7, 0.9, 0.333] {
            let v = t.weights.map(|w| w * scale);
            let chord = matcher.best_match(&v).unwrap();
            assert!(chord.confidence <= 1.0, "{} x{scale}: {}", chord.label(), chord.confidence);
            for c in matcher.top_k(&v, 3).unwrap() {
                assert!((-1.0..=1.0).contains(&c.confidence));
            }

            let frames = repeat(v, 12);
            let matched = matcher
                .match_segment(&frames, Segment::new(0, 12), HOP, SAMPLE_RATE)
                .unwrap()
                .unwrap();
            assert!(matched.confidence <= 1.0);
        }
    }
}
