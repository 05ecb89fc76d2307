//! Real-time audio spectrum pipeline: capture-to-bars coordination, adaptive
//! gain, and bar layout geometry.

pub mod audio;
pub mod dsp;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod settings;
pub mod util;

pub use error::ConfigError;
pub use pipeline::session::Session;
pub use pipeline::{PipelineComponents, PipelineConfig, PipelineCoordinator};
pub use settings::Settings;
