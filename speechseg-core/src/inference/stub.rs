//! `ScriptedScorer` — deterministic backend that replays a probability script.
//!
//! Used to drive the segmentation logic without a model. The position in the
//! script is stored in the recurrent state itself (element 0), so the scorer
//! is a pure function of `(window, state)`: resetting the detector's state
//! restarts the script, exactly as a real model's memory would be cleared.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, SegmenterError};
use crate::inference::{ModelVariant, RecurrentState, SpeechScorer};

/// One observed `infer` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredWindow {
    /// Samples handed to the scorer, look-back prefix included.
    pub len: usize,
    /// First sample of the (possibly prefixed) window.
    pub first_sample: f32,
    /// Whether the incoming state was all zero.
    pub fresh_state: bool,
    pub sample_rate: u32,
}

/// Shared record of every window a `ScriptedScorer` has seen.
pub type CallLog = Arc<Mutex<Vec<ScoredWindow>>>;

/// Replays `probabilities` one window at a time; 0.0 once exhausted.
pub struct ScriptedScorer {
    variant: ModelVariant,
    probabilities: Vec<f32>,
    fail_at: Option<usize>,
    calls: CallLog,
}

impl ScriptedScorer {
    pub fn new(variant: ModelVariant, probabilities: Vec<f32>) -> Self {
        Self {
            variant,
            probabilities,
            fail_at: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Build a script from `(probability, windows)` runs.
    pub fn from_runs(variant: ModelVariant, runs: &[(f32, usize)]) -> Self {
        let probabilities = runs
            .iter()
            .flat_map(|&(prob, count)| std::iter::repeat(prob).take(count))
            .collect();
        Self::new(variant, probabilities)
    }

    /// Fail with an inference error on the `index`-th window after a reset.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Handle to the call record, usable after the scorer is moved into a detector.
    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.calls)
    }
}

fn position_slot(state: &mut RecurrentState) -> Option<&mut f32> {
    match state {
        RecurrentState::Paired { h, .. } => h.first_mut(),
        RecurrentState::Unified(state) => state.first_mut(),
    }
}

impl SpeechScorer for ScriptedScorer {
    fn variant(&self) -> ModelVariant {
        self.variant
    }

    fn infer(
        &mut self,
        window: &[f32],
        sample_rate: u32,
        state: &mut RecurrentState,
    ) -> Result<f32> {
        self.calls.lock().push(ScoredWindow {
            len: window.len(),
            first_sample: window.first().copied().unwrap_or(0.0),
            fresh_state: state.is_zero(),
            sample_rate,
        });

        let slot = position_slot(state)
            .ok_or_else(|| SegmenterError::Inference("empty recurrent state".into()))?;
        let position = *slot as usize;

        if self.fail_at == Some(position) {
            debug!(position, "ScriptedScorer injected failure");
            return Err(SegmenterError::Inference(format!(
                "scripted failure at window {position}"
            )));
        }

        *slot += 1.0;
        Ok(self.probabilities.get(position).copied().unwrap_or(0.0))
    }
}
