//! Low-frame-rate stacking and fixed-frame padding.
//!
//! Frames here are time-major: each element of the slice is one mel frame
//! (a vector of `N_MELS` floats). Callers transpose the freq-major output
//! of [`super::mel::MelSpectrogram::compute`] before calling [`lfr_stack`].

/// Stack `lfr_m` consecutive frames with stride `lfr_n`, producing frames
/// of dimension `frame_dim * lfr_m`. At the tail, missing frames replicate
/// the last available frame rather than shortening the output.
pub fn lfr_stack(frames: &[Vec<f32>], lfr_m: usize, lfr_n: usize) -> Vec<Vec<f32>> {
    if frames.is_empty() || lfr_m == 0 || lfr_n == 0 {
        return Vec::new();
    }
    let num_in = frames.len();
    let out_len = (num_in + lfr_n - 1) / lfr_n;
    let frame_dim = frames[0].len();

    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let start = i * lfr_n;
        let mut stacked = Vec::with_capacity(frame_dim * lfr_m);
        for j in 0..lfr_m {
            let idx = (start + j).min(num_in - 1);
            stacked.extend_from_slice(&frames[idx]);
        }
        out.push(stacked);
    }
    out
}

/// Pad or truncate `frames` to exactly `fixed_frames` rows. Truncates from
/// the tail on overflow, zero-pads (using the width of the first frame, or
/// `frame_dim` if `frames` is empty) on underflow.
pub fn pad_to_fixed_frames(frames: &[Vec<f32>], fixed_frames: usize, frame_dim: usize) -> Vec<Vec<f32>> {
    let width = frames.first().map(|f| f.len()).unwrap_or(frame_dim);
    let mut out: Vec<Vec<f32>> = frames.iter().take(fixed_frames).cloned().collect();
    while out.len() < fixed_frames {
        out.push(vec![0.0; width]);
    }
    out
}
