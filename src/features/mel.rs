//! Log-mel spectrogram computation.
//!
//! Grounded on the teacher's Parakeet mel front-end (`rustfft` plan, Hann
//! window, triangular mel filterbank, log compression) but generalised away
//! from Parakeet's hard-coded 128-mel/400-window constants to the
//! configurable `N_FFT`/`HOP_LENGTH`/`N_MELS` spec §4.B calls for, and
//! extended with a disk-loadable filterbank path ("Filterbank may be loaded
//! from disk or computed").

use rustfft::{num_complex::Complex, FftPlanner};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::error::PipelineError;

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// HTK-style triangular mel filterbank spanning `[0, sample_rate/2]`.
/// Returns `n_mels` rows of `n_fft / 2 + 1` weights each.
pub fn build_mel_filterbank(n_mels: usize, n_fft: usize, sample_rate: f32) -> Vec<Vec<f32>> {
    let num_fft_bins = n_fft / 2 + 1;
    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(sample_rate / 2.0);

    let mel_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32)
        .collect();
    let hz_points: Vec<f32> = mel_points.iter().map(|&m| mel_to_hz(m)).collect();
    let bin_points: Vec<f32> = hz_points
        .iter()
        .map(|&hz| hz * n_fft as f32 / sample_rate)
        .collect();

    let mut filterbank = vec![vec![0.0f32; num_fft_bins]; n_mels];
    for (m, filter) in filterbank.iter_mut().enumerate() {
        let f_left = bin_points[m];
        let f_center = bin_points[m + 1];
        let f_right = bin_points[m + 2];
        for (k, weight) in filter.iter_mut().enumerate() {
            let k_f = k as f32;
            if k_f >= f_left && k_f <= f_center && f_center > f_left {
                *weight = (k_f - f_left) / (f_center - f_left);
            } else if k_f > f_center && k_f <= f_right && f_right > f_center {
                *weight = (f_right - k_f) / (f_right - f_center);
            }
        }
    }
    filterbank
}

fn build_hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * n as f32 / size as f32).cos()))
        .collect()
}

/// Stateless, immutable-after-construction mel spectrogram extractor.
/// The filterbank is the one piece of loaded data in the feature-prep
/// layer; it is computed once (or loaded from disk) and then read-only.
pub struct MelSpectrogram {
    n_fft: usize,
    hop_length: usize,
    n_mels: usize,
    hann_window: Vec<f32>,
    mel_filterbank: Vec<Vec<f32>>,
    fft: Arc<dyn rustfft::Fft<f32>>,
}

impl MelSpectrogram {
    pub fn new(n_fft: usize, hop_length: usize, n_mels: usize, sample_rate: f32) -> Self {
        let mel_filterbank = build_mel_filterbank(n_mels, n_fft, sample_rate);
        Self::with_filterbank(n_fft, hop_length, n_mels, mel_filterbank)
    }

    fn with_filterbank(n_fft: usize, hop_length: usize, n_mels: usize, mel_filterbank: Vec<Vec<f32>>) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);
        let hann_window = build_hann_window(n_fft);
        Self {
            n_fft,
            hop_length,
            n_mels,
            hann_window,
            mel_filterbank,
            fft,
        }
    }

    /// Load a precomputed filterbank from a newline-separated, whitespace
    /// delimited text matrix (`n_mels` rows of `n_fft / 2 + 1` floats).
    pub fn load(n_fft: usize, hop_length: usize, n_mels: usize, path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)?;
        let mut filterbank = Vec::with_capacity(n_mels);
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let row: Result<Vec<f32>, _> = line.split_whitespace().map(|t| t.parse::<f32>()).collect();
            filterbank.push(row.map_err(|e| PipelineError::InvalidInput {
                kind: format!("malformed mel filterbank row: {e}"),
            })?);
        }
        if filterbank.len() != n_mels {
            return Err(PipelineError::InvalidInput {
                kind: format!("mel filterbank has {} rows, expected {n_mels}", filterbank.len()),
            });
        }
        Ok(Self::with_filterbank(n_fft, hop_length, n_mels, filterbank))
    }

    /// Persist the current filterbank as a plain-text matrix, one row per line.
    pub fn save_filterbank(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let mut file = std::fs::File::create(path)?;
        for row in &self.mel_filterbank {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(file, "{}", line.join(" "))?;
        }
        Ok(())
    }

    /// Compute the log-mel spectrogram of `samples`, returning `n_mels`
    /// rows of `num_frames` columns (empty if fewer than one full window
    /// of samples is available).
    pub fn compute(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let num_frames = if samples.len() >= self.n_fft {
            (samples.len() - self.n_fft) / self.hop_length + 1
        } else {
            0
        };
        if num_frames == 0 {
            return vec![Vec::new(); self.n_mels];
        }

        let num_fft_bins = self.n_fft / 2 + 1;
        let mut mel_spec = vec![vec![0.0f32; num_frames]; self.n_mels];
        let mut fft_buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); self.n_fft];

        for frame_idx in 0..num_frames {
            let start = frame_idx * self.hop_length;
            for (i, buf) in fft_buffer.iter_mut().enumerate() {
                *buf = Complex::new(samples[start + i] * self.hann_window[i], 0.0);
            }
            self.fft.process(&mut fft_buffer);

            let power: Vec<f32> = fft_buffer[..num_fft_bins].iter().map(|c| c.norm_sqr()).collect();
            for (m, filter) in self.mel_filterbank.iter().enumerate() {
                let sum: f32 = filter.iter().zip(power.iter()).map(|(w, p)| w * p).sum();
                mel_spec[m][frame_idx] = (sum.max(1e-10)).ln();
            }
        }

        mel_spec
    }
}
