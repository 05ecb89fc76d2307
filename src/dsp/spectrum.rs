//! Frequency-bin distribution and smoothing: turns one channel's FFT output
//! into bar magnitudes.

use rustfft::num_complex::Complex32;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_FREQUENCY: f32 = 20.0;
pub const DEFAULT_MAX_FREQUENCY: f32 = 20_000.0;
pub const MAX_SMOOTHING: f32 = 0.99;

/// Maps FFT output onto a caller-chosen number of bars.
///
/// The pipeline treats the value returned by [`recalculate`] as authoritative
/// and never indexes bars at or beyond it.
///
/// [`recalculate`]: SpectrumProcessor::recalculate
pub trait SpectrumProcessor: Send {
    /// Redistributes FFT bins over `requested_bars` bars and returns the bar
    /// count actually in use, which may be smaller.
    fn recalculate(&mut self, requested_bars: usize) -> usize;

    /// Magnitude of bar `bin` for `channel`, computed from that channel's FFT
    /// output. Called once per bar per channel per tick.
    fn process_bin(&mut self, channel: usize, bin: usize, fft: &[Complex32]) -> f32;

    /// Fraction (0..1) of the previous value blended into each new value.
    fn set_smoothing(&mut self, factor: f32);

    fn set_distribution(&mut self, distribution: Distribution);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    #[default]
    Logarithmic,
    Linear,
    /// Logarithmic bands with a gain that rises with frequency, offsetting the
    /// natural high-frequency roll-off of music.
    Equalized,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BinRange {
    floor: usize,
    ceil: usize,
    gain: f32,
}

/// Reference [`SpectrumProcessor`]: peak magnitude per band with exponential
/// smoothing against the previous tick's value.
#[derive(Debug, Clone)]
pub struct BinSpectrum {
    sample_rate: f32,
    sample_size: usize,
    channels: usize,
    min_frequency: f32,
    max_frequency: f32,
    distribution: Distribution,
    smoothing: f32,
    normalization: f32,
    bins: Vec<BinRange>,
    // channels * sample_size, one contiguous block like the bar buffers.
    old_values: Vec<f32>,
}

impl BinSpectrum {
    pub fn new(sample_rate: f32, sample_size: usize, channels: usize) -> Self {
        Self {
            sample_rate,
            sample_size,
            channels,
            min_frequency: DEFAULT_MIN_FREQUENCY,
            max_frequency: DEFAULT_MAX_FREQUENCY,
            distribution: Distribution::default(),
            smoothing: 0.0,
            normalization: if sample_size > 0 {
                2.0 / sample_size as f32
            } else {
                0.0
            },
            bins: Vec::new(),
            old_values: vec![0.0; channels * sample_size],
        }
    }

    pub fn with_frequency_range(mut self, min_frequency: f32, max_frequency: f32) -> Self {
        let nyquist = self.sample_rate / 2.0;
        self.min_frequency = min_frequency.clamp(1.0, nyquist);
        self.max_frequency = max_frequency.clamp(self.min_frequency, nyquist);
        self
    }

    pub fn bar_count(&self) -> usize {
        self.bins.len()
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    // Bars can never outnumber the non-DC FFT bins.
    fn max_bars(&self) -> usize {
        self.sample_size / 2
    }

    fn fft_len(&self) -> usize {
        self.sample_size / 2 + 1
    }

    fn hz_per_bin(&self) -> f32 {
        self.sample_rate / self.sample_size.max(1) as f32
    }

    fn distribute(&mut self, bars: usize) {
        self.bins.clear();
        match self.distribution {
            Distribution::Linear => self.distribute_linear(bars),
            Distribution::Logarithmic => self.distribute_log(bars, false),
            Distribution::Equalized => self.distribute_log(bars, true),
        }
    }

    fn frequency_bounds(&self) -> (usize, usize) {
        let per_bin = self.hz_per_bin();
        let lo = ((self.min_frequency / per_bin) as usize).max(1);
        let hi = ((self.max_frequency / per_bin).ceil() as usize).clamp(lo + 1, self.fft_len());
        (lo, hi)
    }

    fn distribute_linear(&mut self, bars: usize) {
        let (lo, hi) = self.frequency_bounds();
        let span = (hi - lo) as f32;
        for idx in 0..bars {
            let floor = lo + (span * idx as f32 / bars as f32) as usize;
            let ceil = (lo + (span * (idx + 1) as f32 / bars as f32) as usize).max(floor + 1);
            self.bins.push(BinRange {
                floor,
                ceil: ceil.min(self.fft_len()),
                gain: 1.0,
            });
        }
    }

    fn distribute_log(&mut self, bars: usize, equalize: bool) {
        let (lo, hi) = self.frequency_bounds();
        let ratio = hi as f32 / lo as f32;
        let edge = |idx: usize| lo as f32 * ratio.powf(idx as f32 / bars as f32);

        for idx in 0..bars {
            let floor = (edge(idx) as usize).min(self.fft_len() - 1);
            let ceil = (edge(idx + 1) as usize)
                .max(floor + 1)
                .min(self.fft_len());
            let gain = if equalize {
                let center = (floor + ceil) as f32 * 0.5;
                1.0 + (center / lo as f32).log10().max(0.0)
            } else {
                1.0
            };
            self.bins.push(BinRange { floor, ceil, gain });
        }
    }
}

impl SpectrumProcessor for BinSpectrum {
    fn recalculate(&mut self, requested_bars: usize) -> usize {
        let bars = requested_bars.min(self.max_bars());
        if bars == 0 {
            self.bins.clear();
            return 0;
        }
        if bars != self.bins.len() {
            self.distribute(bars);
        }
        self.bins.len()
    }

    fn process_bin(&mut self, channel: usize, bin: usize, fft: &[Complex32]) -> f32 {
        let Some(range) = self.bins.get(bin).copied() else {
            return 0.0;
        };

        let end = range.ceil.min(fft.len());
        let start = range.floor.min(end);
        let peak = fft[start..end]
            .iter()
            .map(|c| c.norm())
            .fold(0.0f32, f32::max);
        let mut magnitude = peak * self.normalization * range.gain;

        if self.smoothing > 0.0 {
            if let Some(old) = self.old_values.get_mut(channel * self.sample_size + bin) {
                magnitude =
                    ((1.0 - self.smoothing) * magnitude + self.smoothing * *old).max(0.0);
                *old = magnitude;
            }
        }

        if magnitude.is_finite() { magnitude } else { 0.0 }
    }

    fn set_smoothing(&mut self, factor: f32) {
        self.smoothing = if factor.is_finite() {
            factor.clamp(0.0, MAX_SMOOTHING)
        } else {
            0.0
        };
    }

    fn set_distribution(&mut self, distribution: Distribution) {
        if self.distribution != distribution {
            self.distribution = distribution;
            let bars = self.bins.len();
            if bars > 0 {
                self.distribute(bars);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_spectrum(len: usize, bin: usize, amplitude: f32) -> Vec<Complex32> {
        let mut fft = vec![Complex32::default(); len];
        fft[bin] = Complex32::new(amplitude, 0.0);
        fft
    }

    #[test]
    fn recalculate_clamps_to_available_bins() {
        let mut spectrum = BinSpectrum::new(48_000.0, 256, 1);
        assert_eq!(spectrum.recalculate(0), 0);
        assert_eq!(spectrum.recalculate(64), 64);
        assert_eq!(spectrum.recalculate(10_000), 128);
        assert_eq!(spectrum.bar_count(), 128);
    }

    #[test]
    fn ranges_are_monotonic_and_in_bounds() {
        for distribution in [
            Distribution::Linear,
            Distribution::Logarithmic,
            Distribution::Equalized,
        ] {
            let mut spectrum = BinSpectrum::new(48_000.0, 1_024, 2);
            spectrum.set_distribution(distribution);
            let bars = spectrum.recalculate(40);
            assert_eq!(bars, 40);
            let mut last_floor = 0;
            for range in &spectrum.bins {
                assert!(range.floor < range.ceil);
                assert!(range.ceil <= 513);
                assert!(range.floor >= last_floor);
                last_floor = range.floor;
            }
        }
    }

    #[test]
    fn tone_shows_up_in_its_band_only() {
        let mut spectrum = BinSpectrum::new(48_000.0, 1_024, 1);
        spectrum.set_distribution(Distribution::Linear);
        let bars = spectrum.recalculate(16);
        let fft = tone_spectrum(513, 100, 512.0);

        let values: Vec<f32> = (0..bars).map(|b| spectrum.process_bin(0, b, &fft)).collect();
        let loud: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.0)
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(loud.len(), 1);
        // 512 * 2 / 1024 = 1.0 full scale.
        assert!((values[loud[0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn smoothing_blends_with_previous_value() {
        let mut spectrum = BinSpectrum::new(48_000.0, 1_024, 2);
        spectrum.set_distribution(Distribution::Linear);
        spectrum.recalculate(16);
        spectrum.set_smoothing(0.5);

        let loud = tone_spectrum(513, 100, 512.0);
        let silent = vec![Complex32::default(); 513];
        let band = (0..16)
            .find(|&b| spectrum.clone().process_bin(0, b, &loud) > 0.0)
            .unwrap();

        assert!((spectrum.process_bin(0, band, &loud) - 0.5).abs() < 1e-6);
        assert!((spectrum.process_bin(0, band, &silent) - 0.25).abs() < 1e-6);
        // Channels keep independent history.
        assert_eq!(spectrum.process_bin(1, band, &silent), 0.0);
    }

    #[test]
    fn out_of_range_bar_is_silent() {
        let mut spectrum = BinSpectrum::new(48_000.0, 256, 1);
        spectrum.recalculate(8);
        let fft = tone_spectrum(129, 5, 1.0);
        assert_eq!(spectrum.process_bin(0, 8, &fft), 0.0);
    }

    #[test]
    fn smoothing_is_clamped() {
        let mut spectrum = BinSpectrum::new(48_000.0, 256, 1);
        spectrum.set_smoothing(4.0);
        assert_eq!(spectrum.smoothing(), MAX_SMOOTHING);
        spectrum.set_smoothing(f32::NAN);
        assert_eq!(spectrum.smoothing(), 0.0);
    }
}
