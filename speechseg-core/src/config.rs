//! Detector configuration.
//!
//! `DetectorConfig` is immutable for the lifetime of a `Detector`. It is
//! validated once, before any inference backend is touched, and the
//! millisecond durations are converted to sample counts at the same time.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmenterError};

/// Window sizes accepted at 8 kHz.
const WINDOWS_8K: [usize; 3] = [256, 512, 768];
/// Window sizes accepted at 16 kHz.
const WINDOWS_16K: [usize; 3] = [512, 1024, 1536];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to the Silero VAD ONNX model. Opaque to the segmentation logic.
    pub model_path: PathBuf,
    /// Input sample rate in Hz. 8000 or 16000.
    pub sample_rate: u32,
    /// Samples scored per inference call.
    pub window_size: usize,
    /// Speech probability at or above which a window counts as speech.
    pub threshold: f32,
    /// Silence run required to close a speech segment.
    pub min_silence_duration_ms: i32,
    /// Speech run required to open a segment (streaming mode only).
    pub min_speech_duration_ms: i32,
    /// Padding added to both ends of each speech segment.
    pub speech_pad_ms: i32,
    /// Reserved padding for silence segments. Validated but not applied.
    pub silence_pad_ms: i32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("silero_vad.onnx"),
            sample_rate: 16_000,
            window_size: 512,
            threshold: 0.5,
            min_silence_duration_ms: 0,
            min_speech_duration_ms: 0,
            speech_pad_ms: 0,
            silence_pad_ms: 0,
        }
    }
}

impl DetectorConfig {
    /// Check every field, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.model_path.as_os_str().is_empty() {
            return Err(invalid("invalid ModelPath: should not be empty"));
        }

        if self.sample_rate != 8_000 && self.sample_rate != 16_000 {
            return Err(invalid(
                "invalid SampleRate: valid values are 8000 and 16000",
            ));
        }

        let windows: &[usize] = if self.sample_rate == 16_000 {
            &WINDOWS_16K
        } else {
            &WINDOWS_8K
        };
        if !windows.contains(&self.window_size) {
            return Err(invalid(
                "invalid WindowSize: valid values are 512, 1024, 1536 for 16000 sample rate and 256, 512, 768 for 8000 sample rate",
            ));
        }

        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(invalid("invalid Threshold: should be in range (0, 1)"));
        }

        if self.min_silence_duration_ms < 0 {
            return Err(invalid(
                "invalid MinSilenceDurationMs: should be a positive number",
            ));
        }

        if self.min_speech_duration_ms < 0 {
            return Err(invalid(
                "invalid MinSpeechDurationMs: should be a positive number",
            ));
        }

        if self.speech_pad_ms < 0 {
            return Err(invalid("invalid SpeechPadMs: should be a positive number"));
        }

        if self.silence_pad_ms < 0 {
            return Err(invalid("invalid SilencePadMs: should be a positive number"));
        }

        Ok(())
    }

    /// Parse a JSON document and validate the result.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Convert the millisecond durations to sample counts.
    ///
    /// Only meaningful on a validated config; negative durations map to 0.
    pub fn sample_counts(&self) -> SampleCounts {
        SampleCounts {
            min_silence: self.ms_to_samples(self.min_silence_duration_ms),
            min_speech: self.ms_to_samples(self.min_speech_duration_ms),
            speech_pad: self.ms_to_samples(self.speech_pad_ms),
        }
    }

    fn ms_to_samples(&self, ms: i32) -> usize {
        let ms = u64::try_from(ms).unwrap_or(0);
        (ms * u64::from(self.sample_rate) / 1000) as usize
    }
}

fn invalid(msg: &str) -> SegmenterError {
    SegmenterError::Config(msg.to_string())
}

/// Durations from `DetectorConfig`, expressed in samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleCounts {
    pub min_silence: usize,
    pub min_speech: usize,
    pub speech_pad: usize,
}
