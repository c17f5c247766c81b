//! Speech scoring abstraction.
//!
//! The `SpeechScorer` trait decouples the segmentation logic from any
//! specific backend (scripted stub, Silero ONNX, ...). A scorer turns one
//! window of audio plus the previous recurrent state into a speech
//! probability, updating the state in place.
//!
//! `&mut self` on `infer` reflects that runtime sessions need exclusive
//! access while running. The recurrent state itself lives in the `Detector`,
//! not in the scorer, so `Detector::reset` can zero it without touching the
//! backend.

pub mod stub;

#[cfg(feature = "onnx")]
pub mod silero;

#[cfg(feature = "onnx")]
pub use silero::SileroScorer;

pub use stub::ScriptedScorer;

use crate::error::Result;

/// v3/v4 LSTM state size: 2 layers × 1 batch × 64 units (each of h and c).
pub const LSTM_STATE_LEN: usize = 2 * 64;
/// v5 unified state size: 2 layers × 1 batch × 128 units.
pub const UNIFIED_STATE_LEN: usize = 2 * 128;

/// Model family contract. Fixed for the lifetime of a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    /// Separate `h`/`c` state tensors, no look-back context.
    Lstm,
    /// Single `state` tensor, windows prefixed with trailing samples of the
    /// previous window.
    Unified,
}

impl ModelVariant {
    /// Look-back context length in samples for this variant at `sample_rate`.
    pub fn context_len(self, sample_rate: u32) -> usize {
        match self {
            ModelVariant::Lstm => 0,
            ModelVariant::Unified if sample_rate == 8_000 => 32,
            ModelVariant::Unified => 64,
        }
    }

    /// Total number of state elements carried between windows.
    pub fn state_len(self) -> usize {
        match self {
            ModelVariant::Lstm => 2 * LSTM_STATE_LEN,
            ModelVariant::Unified => UNIFIED_STATE_LEN,
        }
    }

    /// Fresh all-zero recurrent state of the matching shape.
    pub fn initial_state(self) -> RecurrentState {
        match self {
            ModelVariant::Lstm => RecurrentState::Paired {
                h: vec![0.0; LSTM_STATE_LEN],
                c: vec![0.0; LSTM_STATE_LEN],
            },
            ModelVariant::Unified => RecurrentState::Unified(vec![0.0; UNIFIED_STATE_LEN]),
        }
    }
}

/// Numeric memory carried between consecutive inference calls.
#[derive(Debug, Clone, PartialEq)]
pub enum RecurrentState {
    /// `[2, 1, 64]` hidden and cell tensors, row-major.
    Paired { h: Vec<f32>, c: Vec<f32> },
    /// `[2, 1, 128]` combined tensor, row-major.
    Unified(Vec<f32>),
}

impl RecurrentState {
    /// Zero every element, keeping the shape.
    pub fn reset(&mut self) {
        match self {
            RecurrentState::Paired { h, c } => {
                h.iter_mut().for_each(|v| *v = 0.0);
                c.iter_mut().for_each(|v| *v = 0.0);
            }
            RecurrentState::Unified(state) => state.iter_mut().for_each(|v| *v = 0.0),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            RecurrentState::Paired { h, c } => h.iter().chain(c.iter()).all(|v| *v == 0.0),
            RecurrentState::Unified(state) => state.iter().all(|v| *v == 0.0),
        }
    }

    pub fn variant(&self) -> ModelVariant {
        match self {
            RecurrentState::Paired { .. } => ModelVariant::Lstm,
            RecurrentState::Unified(_) => ModelVariant::Unified,
        }
    }
}

/// Contract for speech probability backends.
///
/// Implementations must be deterministic: the same window, sample rate and
/// state always yield the same probability and successor state.
pub trait SpeechScorer: Send + 'static {
    /// The state/context contract this backend expects.
    fn variant(&self) -> ModelVariant;

    /// Score one window.
    ///
    /// `window` already carries the look-back prefix when the variant needs
    /// one. `state` is replaced with the model's successor state.
    ///
    /// # Errors
    /// Any backend failure. The caller does not retry.
    fn infer(&mut self, window: &[f32], sample_rate: u32, state: &mut RecurrentState)
        -> Result<f32>;
}
