//! Chromagram
//!
//! Batch 12-bin chromagram computation over a whole mono waveform.
//!
//! Each centered analysis frame is windowed, transformed with `rustfft`, and
//! its power spectrum is folded onto the twelve pitch classes through a
//! Gaussian chroma filter bank. Frames are scaled so the loudest pitch class
//! reads 1.0.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::{f32::consts::PI, sync::Arc};
use thiserror::Error;

/// Number of pitch classes per octave.
pub const SEMITONES: usize = 12;

/// Energy for each of the 12 pitch classes in one analysis frame (C first).
pub type ChromaVector = [f32; SEMITONES];

/// Gaussian octave weighting, counted in octaves above A0.
const CENTER_OCTAVE: f32 = 5.0;
const OCTAVE_WIDTH: f32 = 2.0;

/// Errors returned by the Chromagram pipeline.
#[derive(Debug, Error)]
pub enum ChromagramError {
    /// A waveform sample was NaN or infinite.
    #[error("sample {index} is not a finite number")]
    InvalidSample {
        /// Position of the offending sample.
        index: usize,
    },

    /// An error occurred during the configuration of the Chromagram.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Builder for a Chromagram pipeline.
pub struct ChromagramBuilder {
    frame_size: usize,
    hop_length: usize,
    sampling_rate: usize,
    reference_frequency: f32,
}

impl ChromagramBuilder {
    /// Start with default parameters:
    /// frame_size = 2048, hop_length = 512,
    /// sampling_rate = 22_050, reference_frequency = 440.0.
    pub fn new() -> Self {
        ChromagramBuilder {
            frame_size: 2048,
            hop_length: 512,
            sampling_rate: 22_050,
            reference_frequency: 440.0,
        }
    }

    /// Set the FFT size of each analysis frame.
    pub fn frame_size(mut self, size: usize) -> Self {
        self.frame_size = size;
        self
    }

    /// Set the distance in samples between consecutive frames.
    pub fn hop_length(mut self, hop: usize) -> Self {
        self.hop_length = hop;
        self
    }

    /// Set the sampling rate of the audio.
    pub fn sampling_rate(mut self, rate: usize) -> Self {
        self.sampling_rate = rate;
        self
    }

    /// Set the tuning of A4 in Hz.
    pub fn reference_frequency(mut self, hz: f32) -> Self {
        self.reference_frequency = hz;
        self
    }

    /// Finalize and create the Chromagram.
    pub fn build(self) -> Result<Chromagram, ChromagramError> {
        if self.frame_size == 0 || self.frame_size % 2 != 0 {
            return Err(ChromagramError::Configuration(
                "frame_size must be a positive even number".into(),
            ));
        }
        if self.hop_length == 0 {
            return Err(ChromagramError::Configuration("hop_length cannot be zero".into()));
        }
        if self.sampling_rate == 0 {
            return Err(ChromagramError::Configuration("sampling_rate cannot be zero".into()));
        }
        if !(self.reference_frequency.is_finite() && self.reference_frequency > 0.0) {
            return Err(ChromagramError::Configuration(
                "reference_frequency must be positive".into(),
            ));
        }

        // Prepare FFT plan once
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(self.frame_size);

        Ok(Chromagram {
            window: make_hann_window(self.frame_size),
            filter_bank: make_filter_bank(
                self.sampling_rate,
                self.frame_size,
                self.reference_frequency,
            ),
            frame_size: self.frame_size,
            hop_length: self.hop_length,
            sampling_rate: self.sampling_rate,
            fft,
        })
    }
}

impl Default for ChromagramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Batch chromagram calculator.
///
/// Holds only read-only state after construction, so one instance can be
/// shared between threads and reused for any number of waveforms.
pub struct Chromagram {
    window: Vec<f32>,
    /// One row of `frame_size / 2 + 1` weights per pitch class.
    filter_bank: Vec<Vec<f32>>,
    frame_size: usize,
    hop_length: usize,
    sampling_rate: usize,
    fft: Arc<dyn Fft<f32>>,
}

impl Chromagram {
    /// Start customizing with a builder.
    pub fn builder() -> ChromagramBuilder {
        ChromagramBuilder::new()
    }

    /// FFT size of each frame.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Hop between frames in samples.
    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Sampling rate the extractor was built for.
    pub fn sampling_rate(&self) -> usize {
        self.sampling_rate
    }

    /// Number of frames produced for a waveform of `num_samples` samples.
    pub fn frame_count(&self, num_samples: usize) -> usize {
        if num_samples == 0 {
            0
        } else {
            1 + num_samples / self.hop_length
        }
    }

    /// Start time in seconds of frame `frame`.
    pub fn frame_time(&self, frame: usize) -> f32 {
        frame_to_seconds(frame, self.hop_length, self.sampling_rate)
    }

    /// Compute one chroma vector per frame for the whole waveform.
    ///
    /// Silent input yields all-zero vectors; an empty waveform yields no frames.
    pub fn compute(&self, samples: &[f32]) -> Result<Vec<ChromaVector>, ChromagramError> {
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(ChromagramError::InvalidSample { index });
        }

        let num_frames = self.frame_count(samples.len());
        let mut fft_buffer = vec![Complex { re: 0.0, im: 0.0 }; self.frame_size];
        let mut power = vec![0.0f32; self.frame_size / 2 + 1];
        let mut frames = Vec::with_capacity(num_frames);

        for frame in 0..num_frames {
            self.compute_spectrum(samples, frame, &mut fft_buffer, &mut power);
            frames.push(self.fold_chroma(&power));
        }
        Ok(frames)
    }

    #[inline]
    fn compute_spectrum(
        &self,
        samples: &[f32],
        frame: usize,
        fft_buffer: &mut [Complex<f32>],
        power: &mut [f32],
    ) {
        // Frame `frame` is centered on sample `frame * hop`; outside the
        // waveform reads as zero padding.
        let pad = self.frame_size / 2;
        let origin = (frame * self.hop_length) as isize - pad as isize;
        for (i, slot) in fft_buffer.iter_mut().enumerate() {
            let pos = origin + i as isize;
            let sample = if pos >= 0 && (pos as usize) < samples.len() {
                samples[pos as usize]
            } else {
                0.0
            };
            slot.re = sample * self.window[i];
            slot.im = 0.0;
        }

        self.fft.process(fft_buffer);

        for (i, p) in power.iter_mut().enumerate() {
            let c = &fft_buffer[i];
            *p = c.re * c.re + c.im * c.im;
        }
    }

    #[inline]
    fn fold_chroma(&self, power: &[f32]) -> ChromaVector {
        let mut chroma = [0.0; SEMITONES];
        for (n, row) in self.filter_bank.iter().enumerate() {
            chroma[n] = row
                .iter()
                .zip(power)
                .map(|(&w, &p)| w as f64 * p as f64)
                .sum::<f64>() as f32;
        }

        let peak = chroma.iter().cloned().fold(0.0_f32, f32::max);
        if peak > 0.0 {
            chroma.iter_mut().for_each(|c| *c /= peak);
        }
        chroma
    }
}

/// Convert a frame index to seconds.
pub fn frame_to_seconds(frame: usize, hop_length: usize, sampling_rate: usize) -> f32 {
    (frame * hop_length) as f32 / sampling_rate as f32
}

/// Periodic Hann window.
fn make_hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / size as f32).cos())
        .collect()
}

/// Project FFT bins onto pitch classes.
///
/// Each bin contributes to every pitch class through a Gaussian bump centred
/// on the bin's fractional pitch class, the bumps of a bin are L2-normalised,
/// and bins far from `CENTER_OCTAVE` are attenuated.
fn make_filter_bank(sampling_rate: usize, frame_size: usize, reference: f32) -> Vec<Vec<f32>> {
    let num_bins = frame_size / 2 + 1;
    let semis = SEMITONES as f32;
    // A0 of the configured tuning
    let base = reference / 16.0;

    // Fractional pitch (in semitones above A0) of every bin
    let mut pitch: Vec<f32> = (0..num_bins)
        .map(|k| {
            let freq = k as f32 * sampling_rate as f32 / frame_size as f32;
            semis * (freq / base).log2()
        })
        .collect();
    // DC has no pitch; place it 1.5 octaves below the first bin
    if num_bins > 1 {
        pitch[0] = pitch[1] - 1.5 * semis;
    }

    let widths: Vec<f32> = (0..num_bins)
        .map(|k| {
            if k + 1 < num_bins {
                (pitch[k + 1] - pitch[k]).max(1.0)
            } else {
                1.0
            }
        })
        .collect();

    let half = (semis / 2.0).round();
    let mut bank = vec![vec![0.0f32; num_bins]; SEMITONES];
    for k in 0..num_bins {
        let mut column = [0.0f32; SEMITONES];
        for (class, weight) in column.iter_mut().enumerate() {
            // Distance folded into -6..6 semitones; class 0 here is A
            let d = ((pitch[k] - class as f32 + half + 10.0 * semis) % semis) - half;
            *weight = (-0.5 * (2.0 * d / widths[k]).powi(2)).exp();
        }

        let norm = column.iter().map(|w| w * w).sum::<f32>().sqrt().max(1e-10);
        let octave = pitch[k] / semis;
        let octave_weight = (-0.5 * ((octave - CENTER_OCTAVE) / OCTAVE_WIDTH).powi(2)).exp();

        for (class, &weight) in column.iter().enumerate() {
            // Rotate so that row 0 is C (A + 3 semitones)
            let row = (class + SEMITONES - 3) % SEMITONES;
            bank[row][k] = weight / norm * octave_weight;
        }
    }
    bank
}
