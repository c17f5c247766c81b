//! # speechseg-core
//!
//! Speech/silence segmentation over Silero VAD probabilities.
//!
//! ## Architecture
//!
//! ```text
//! pcm ─► windows ─► ContextBuffer prefix ─► SpeechScorer::infer(state)
//!                                                    │
//!                                               probability
//!                                                    │
//!                         ┌──────────────────────────┴─────────────────────┐
//!                 HysteresisTracker (detect)                RealtimeTracker (detect_realtime)
//!                         │                                                │
//!                   Vec<Segment>                       cleaned pcm + Vec<RealtimeSegment>
//! ```
//!
//! The scorer is the only model-facing seam: `ScriptedScorer` replays fixed
//! probabilities for tests, `SileroScorer` (feature `onnx`) runs the model.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod config;
pub mod context;
pub mod detector;
pub mod error;
pub mod inference;
pub mod segment;

// Convenience re-exports for downstream crates
pub use config::{DetectorConfig, SampleCounts};
pub use context::ContextBuffer;
pub use detector::Detector;
pub use error::{Result, SegmenterError};
pub use inference::{ModelVariant, RecurrentState, ScriptedScorer, SpeechScorer};
pub use segment::{covers_contiguously, RealtimeSegment, Segment};

#[cfg(feature = "onnx")]
pub use inference::SileroScorer;
