//! Window functions applied to a channel's samples before the transform.

use crate::util::audio::apply_window;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// A window function mutating one channel's samples in place.
pub type WindowFn = Box<dyn FnMut(&mut [f32]) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Rectangular,
    Hann,
    Hamming,
    Blackman,
    #[default]
    BlackmanHarris,
    BlackmanNuttall,
    Nuttall,
    FlatTop,
    Sine,
    Triangular,
    BartlettHann,
    /// Two-term cosine sum `a0 - (1 - a0) cos(2πn/N)`; `a0 = 0.5` is Hann.
    CosineSum { a0: f32 },
}

impl WindowKind {
    pub const ALL: [WindowKind; 12] = [
        WindowKind::Rectangular,
        WindowKind::Hann,
        WindowKind::Hamming,
        WindowKind::Blackman,
        WindowKind::BlackmanHarris,
        WindowKind::BlackmanNuttall,
        WindowKind::Nuttall,
        WindowKind::FlatTop,
        WindowKind::Sine,
        WindowKind::Triangular,
        WindowKind::BartlettHann,
        WindowKind::CosineSum { a0: 0.5 },
    ];

    pub fn coefficients(self, len: usize) -> Vec<f32> {
        let phase = |n: usize| (n as f32) * TAU / (len as f32);
        match self {
            WindowKind::Rectangular => vec![1.0; len],
            WindowKind::Hann => (0..len).map(|n| 0.5 * (1.0 - phase(n).cos())).collect(),
            WindowKind::Hamming => (0..len).map(|n| 0.54 - 0.46 * phase(n).cos()).collect(),
            WindowKind::Blackman => cosine_sum(len, &[0.42, 0.5, 0.08]),
            WindowKind::BlackmanHarris => cosine_sum(len, &[0.35875, 0.48829, 0.14128, 0.01168]),
            WindowKind::BlackmanNuttall => {
                cosine_sum(len, &[0.363_581_9, 0.489_177_5, 0.136_599_5, 0.010_641_1])
            }
            WindowKind::Nuttall => cosine_sum(len, &[0.355_768, 0.487_396, 0.144_232, 0.012_604]),
            WindowKind::FlatTop => cosine_sum(
                len,
                &[
                    0.215_578_95,
                    0.416_631_58,
                    0.277_263_16,
                    0.083_578_95,
                    0.006_947_37,
                ],
            ),
            WindowKind::Sine => (0..len)
                .map(|n| (PI * n as f32 / len as f32).sin())
                .collect(),
            WindowKind::Triangular => {
                let half = len as f32 / 2.0;
                (0..len)
                    .map(|n| 1.0 - ((n as f32 - half) / half).abs())
                    .collect()
            }
            WindowKind::BartlettHann => (0..len)
                .map(|n| {
                    let t = n as f32 / len as f32;
                    0.62 - 0.48 * (t - 0.5).abs() - 0.38 * phase(n).cos()
                })
                .collect(),
            WindowKind::CosineSum { a0 } => {
                let a0 = a0.clamp(0.0, 1.0);
                cosine_sum(len, &[a0, 1.0 - a0])
            }
        }
    }

    /// Builds the injected window function. Coefficients are computed on
    /// first use and recomputed only when the buffer length changes.
    pub fn into_fn(self) -> WindowFn {
        let mut coefficients: Vec<f32> = Vec::new();
        Box::new(move |buffer: &mut [f32]| {
            if coefficients.len() != buffer.len() {
                coefficients = self.coefficients(buffer.len());
            }
            apply_window(buffer, &coefficients);
        })
    }
}

impl std::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            WindowKind::Rectangular => "Rectangular",
            WindowKind::Hann => "Hann",
            WindowKind::Hamming => "Hamming",
            WindowKind::Blackman => "Blackman",
            WindowKind::BlackmanHarris => "Blackman-Harris",
            WindowKind::BlackmanNuttall => "Blackman-Nuttall",
            WindowKind::Nuttall => "Nuttall",
            WindowKind::FlatTop => "Flat Top",
            WindowKind::Sine => "Sine",
            WindowKind::Triangular => "Triangular",
            WindowKind::BartlettHann => "Bartlett-Hann",
            WindowKind::CosineSum { .. } => "Cosine-Sum",
        })
    }
}

// Generalised cosine window: a0 - a1 cos(φ) + a2 cos(2φ) - a3 cos(3φ) ...
fn cosine_sum(len: usize, terms: &[f32]) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let phase = (n as f32) * TAU / (len as f32);
            terms
                .iter()
                .enumerate()
                .map(|(k, &a)| {
                    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                    sign * a * (k as f32 * phase).cos()
                })
                .sum()
        })
        .collect()
}
