//! Welch power spectral density estimation
//!
//! Averages periodograms of overlapping, mean-detrended, Hann-windowed
//! segments. Output is a one-sided density in power per Hz.

use crate::band::Band;
use crate::error::FeatureError;
use crate::statistics::median;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// One-sided power spectral density
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Bin center frequencies (Hz), ascending from 0
    pub frequencies: Vec<f64>,
    /// Density per bin
    pub density: Vec<f64>,
}

impl Spectrum {
    /// Median density over bins whose center lies in `band`.
    ///
    /// `None` when no bin falls in the band.
    pub fn band_median(&self, band: Band) -> Option<f64> {
        let in_band: Vec<f64> = self
            .frequencies
            .iter()
            .zip(&self.density)
            .filter(|(f, _)| band.contains(**f))
            .map(|(_, p)| *p)
            .collect();
        median(&in_band)
    }

    /// Frequency of the strongest bin
    pub fn peak_frequency(&self) -> Option<f64> {
        self.density
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| self.frequencies[i])
    }
}

/// Welch estimator for a fixed segment length
pub struct WelchEstimator {
    sample_rate: f64,
    segment_len: usize,
    overlap: usize,
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    /// 1 / (fs * sum(w^2))
    scale: f64,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl WelchEstimator {
    /// Create an estimator with the default half-segment overlap
    pub fn new(sample_rate: f64, segment_len: usize) -> Result<Self, FeatureError> {
        Self::with_overlap(sample_rate, segment_len, segment_len / 2)
    }

    /// Create an estimator with an explicit overlap in samples
    pub fn with_overlap(
        sample_rate: f64,
        segment_len: usize,
        overlap: usize,
    ) -> Result<Self, FeatureError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(FeatureError::InvalidParameter(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        if segment_len == 0 {
            return Err(FeatureError::InvalidParameter(
                "segment length must be at least 1".to_string(),
            ));
        }
        if overlap >= segment_len {
            return Err(FeatureError::InvalidParameter(format!(
                "overlap {overlap} must be smaller than segment length {segment_len}"
            )));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(segment_len);
        let window = hann_window(segment_len);
        let scale = 1.0 / (sample_rate * window.iter().map(|w| w * w).sum::<f64>());

        Ok(Self {
            sample_rate,
            segment_len,
            overlap,
            buffer: vec![Complex::new(0.0, 0.0); segment_len],
            scratch: vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()],
            fft,
            window,
            scale,
        })
    }

    /// Samples per segment
    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    /// Samples shared by consecutive segments
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Frequency resolution (Hz per bin)
    pub fn frequency_resolution(&self) -> f64 {
        self.sample_rate / self.segment_len as f64
    }

    /// Bin center frequencies of the one-sided spectrum
    pub fn frequencies(&self) -> Vec<f64> {
        let resolution = self.frequency_resolution();
        (0..=self.segment_len / 2)
            .map(|k| k as f64 * resolution)
            .collect()
    }

    /// Number of segments that fit in `samples`
    pub fn segment_count(&self, samples: usize) -> usize {
        if samples < self.segment_len {
            return 0;
        }
        (samples - self.segment_len) / (self.segment_len - self.overlap) + 1
    }

    /// Ensure at least one full segment fits in `samples`
    pub fn check_fits(&self, samples: usize) -> Result<(), FeatureError> {
        if samples < self.segment_len {
            return Err(FeatureError::InsufficientSamples {
                segment_len: self.segment_len,
                available: samples,
            });
        }
        Ok(())
    }

    /// Estimate the power spectral density of `signal`
    pub fn estimate(&mut self, signal: &[f64]) -> Result<Spectrum, FeatureError> {
        self.check_fits(signal.len())?;

        let step = self.segment_len - self.overlap;
        let segments = self.segment_count(signal.len());
        let n_freqs = self.segment_len / 2 + 1;
        let mut density = vec![0.0; n_freqs];

        for start in (0..segments).map(|i| i * step) {
            let segment = &signal[start..start + self.segment_len];
            let mean = segment.iter().sum::<f64>() / self.segment_len as f64;

            for (slot, (&x, &w)) in self.buffer.iter_mut().zip(segment.iter().zip(&self.window)) {
                *slot = Complex::new((x - mean) * w, 0.0);
            }

            self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

            for (acc, c) in density.iter_mut().zip(&self.buffer[..n_freqs]) {
                *acc += c.norm_sqr();
            }
        }

        // DC and, for even lengths, Nyquist have no mirrored negative bin
        let doubled_end = if self.segment_len % 2 == 0 {
            n_freqs - 1
        } else {
            n_freqs
        };
        let norm = self.scale / segments as f64;
        for (k, p) in density.iter_mut().enumerate() {
            *p *= norm;
            if k > 0 && k < doubled_end {
                *p *= 2.0;
            }
        }

        Ok(Spectrum {
            frequencies: self.frequencies(),
            density,
        })
    }
}

/// Periodic Hann window
fn hann_window(size: usize) -> Vec<f64> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / size as f64).cos())
        .collect()
}
