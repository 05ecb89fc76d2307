//! Sample capture: the backend boundary, buffers, and a synthetic source.

pub mod buffers;
pub mod capture;
pub mod synthetic;
