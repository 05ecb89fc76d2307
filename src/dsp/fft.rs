//! Real-input FFT used for one channel per tick.

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex32;
use std::sync::Arc;
use tracing::warn;

/// Forward transform of one channel's windowed samples.
pub trait Transform: Send {
    /// Number of real input samples per call.
    fn size(&self) -> usize;

    /// Number of complex bins produced per call.
    fn output_len(&self) -> usize {
        self.size() / 2 + 1
    }

    /// Transforms `input` into `output`. `input` may be used as scratch space
    /// and is left in an unspecified state.
    fn execute(&mut self, input: &mut [f32], output: &mut [Complex32]);
}

pub struct RealFftTransform {
    size: usize,
    fft: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
}

impl std::fmt::Debug for RealFftTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealFftTransform")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl RealFftTransform {
    pub fn new(size: usize) -> Self {
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        let scratch = fft.make_scratch_vec();
        Self { size, fft, scratch }
    }
}

impl Transform for RealFftTransform {
    fn size(&self) -> usize {
        self.size
    }

    fn execute(&mut self, input: &mut [f32], output: &mut [Complex32]) {
        if let Err(err) = self
            .fft
            .process_with_scratch(input, output, &mut self.scratch)
        {
            // Only reachable on a length mismatch, which the coordinator rules
            // out at start; emit silence rather than stale bins.
            warn!("[fft] transform failed: {err}");
            output.fill(Complex32::default());
        }
    }
}
