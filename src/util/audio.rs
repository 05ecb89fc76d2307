use std::time::Duration;

// Default sample rate (Hz) used when no configuration is available.
pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;

// Default number of samples per channel in one capture window.
pub const DEFAULT_SAMPLE_SIZE: usize = 1_024;

#[inline]
pub fn apply_window(buffer: &mut [f32], window: &[f32]) {
    debug_assert_eq!(buffer.len(), window.len());
    for (sample, coeff) in buffer.iter_mut().zip(window.iter()) {
        *sample *= *coeff;
    }
}

// Number of peak samples a moving window of `seconds` holds when one peak is
// produced per capture window. The factor of two keeps headroom for a draw
// cadence that runs faster than the capture cadence.
pub fn window_capacity(seconds: f32, sample_rate: f32, sample_size: usize) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 || sample_size == 0 {
        return 0;
    }
    ((seconds * sample_rate) as usize / sample_size) * 2
}

// Duration of one capture window: the cadence at which a backend delivers.
pub fn capture_interval(sample_rate: f32, sample_size: usize) -> Duration {
    if sample_rate <= 0.0 || !sample_rate.is_finite() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(sample_size as f64 / sample_rate as f64)
}

// Interval between draw ticks. Millisecond granularity, so 60 fps yields 16 ms.
pub fn frame_interval(frame_rate: u32) -> Duration {
    Duration::from_millis(1_000 / u64::from(frame_rate.max(1)))
}
