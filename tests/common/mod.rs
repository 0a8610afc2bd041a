//! Synthetic signals and chroma shared by the integration tests.

#![allow(dead_code)]

use std::f32::consts::PI;
use tonal_analysis::chord_detector::template;
use tonal_analysis::{ChordKind, ChromaVector, NoteName};

pub const SAMPLE_RATE: usize = 22_050;
pub const HOP: usize = 512;

/// Frequency of a MIDI note in 12-TET with A4 = 440 Hz.
pub fn midi_to_hz(midi: u32) -> f32 {
    440.0 * 2f32.powf((midi as f32 - 69.0) / 12.0)
}

/// Sum of equal-amplitude sines, scaled to stay within [-1, 1].
pub fn tones(freqs: &[f32], seconds: f32) -> Vec<f32> {
    let len = (seconds * SAMPLE_RATE as f32) as usize;
    let gain = 0.8 / freqs.len() as f32;
    (0..len)
        .map(|n| {
            let t = n as f32 / SAMPLE_RATE as f32;
            freqs.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f32>() * gain
        })
        .collect()
}

/// Sine chord built from MIDI note numbers.
pub fn chord_tones(midi: &[u32], seconds: f32) -> Vec<f32> {
    let freqs: Vec<f32> = midi.iter().map(|&m| midi_to_hz(m)).collect();
    tones(&freqs, seconds)
}

/// Binary chroma vector of a chord template.
pub fn template_chroma(root: NoteName, kind: ChordKind) -> ChromaVector {
    template(root, kind).weights
}

/// `count` copies of `frame`.
pub fn repeat(frame: ChromaVector, count: usize) -> Vec<ChromaVector> {
    vec![frame; count]
}

/// Cosine similarity, for computing expected scores.
pub fn cosine(a: &ChromaVector, b: &ChromaVector) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (na * nb)
}

/// Deterministic pseudo-random chroma frames in [0, 1).
pub fn noise_chroma(count: usize, seed: u64) -> Vec<ChromaVector> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 40) as f32 / (1u64 << 24) as f32
    };
    (0..count)
        .map(|_| {
            let mut frame = [0.0; 12];
            frame.iter_mut().for_each(|c| *c = next());
            frame
        })
        .collect()
}

pub fn assert_close(actual: f32, expected: f32, tol: f32) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected} ± {tol}, got {actual}"
    );
}
