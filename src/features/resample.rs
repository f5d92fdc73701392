//! Linear-interpolation resampling to the pipeline's working sample rate.

use crate::error::PipelineError;

/// Linearly resample `audio` from `source_rate` to `target_rate` Hz.
///
/// Output length is `floor(len * target_rate / source_rate)`.
pub fn resample(audio: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, PipelineError> {
    if source_rate == 0 || target_rate == 0 {
        return Err(PipelineError::InvalidInput {
            kind: format!("invalid resample rate: source={source_rate} target={target_rate}"),
        });
    }
    if audio.is_empty() {
        return Ok(Vec::new());
    }
    if source_rate == target_rate {
        return Ok(audio.to_vec());
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (audio.len() as f64 * ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);

    let step = source_rate as f64 / target_rate as f64;
    for i in 0..out_len {
        let src_pos = i as f64 * step;
        let idx0 = src_pos.floor() as usize;
        let frac = (src_pos - idx0 as f64) as f32;
        let idx1 = (idx0 + 1).min(audio.len() - 1);
        let idx0 = idx0.min(audio.len() - 1);
        out.push(audio[idx0] * (1.0 - frac) + audio[idx1] * frac);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_same_rate_is_identity() {
        let audio = vec![1.0, 2.0, 3.0];
        let out = resample(&audio, 16000, 16000).unwrap();
        assert_eq!(out, audio);
    }

    #[test]
    fn resample_halves_length_when_downsampling_by_half() {
        let audio = vec![0.0; 1000];
        let out = resample(&audio, 16000, 8000).unwrap();
        assert_eq!(out.len(), 500);
    }

    #[test]
    fn resample_doubles_length_when_upsampling() {
        let audio = vec![0.0; 500];
        let out = resample(&audio, 8000, 16000).unwrap();
        assert_eq!(out.len(), 1000);
    }

    #[test]
    fn resample_zero_rate_fails() {
        let err = resample(&[1.0], 0, 16000).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput { .. }));
    }

    #[test]
    fn resample_empty_audio_is_empty() {
        let out = resample(&[], 16000, 8000).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn resample_interpolates_linearly() {
        let audio = vec![0.0, 10.0];
        // Upsample 2x: source rate 2, target rate 4 -> 4 output samples at
        // positions 0, 0.5, 1.0, 1.5 of the original index.
        let out = resample(&audio, 2, 4).unwrap();
        assert_eq!(out.len(), 4);
        assert!((out[0] - 0.0).abs() < 1e-4);
        assert!((out[1] - 5.0).abs() < 1e-4);
    }
}
