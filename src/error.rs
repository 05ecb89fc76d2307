use thiserror::Error;

/// Construction-time validation failures. These are caller errors and are
/// never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("channel count must be positive")]
    NoChannels,
    #[error("sample size must be positive")]
    EmptySampleWindow,
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f32),
    #[error("gain windows are empty: fast={fast}, slow={slow}")]
    EmptyGainWindow { fast: usize, slow: usize },
    #[error("fast gain window ({fast}) must be shorter than the slow window ({slow})")]
    GainWindowOrder { fast: usize, slow: usize },
    #[error("transform expects {actual} samples but the pipeline delivers {expected}")]
    TransformSize { expected: usize, actual: usize },
}
