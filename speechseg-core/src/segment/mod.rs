//! Segment types and the two segmentation state machines.
//!
//! | Mode      | Tracker            | Output                                   |
//! |-----------|--------------------|------------------------------------------|
//! | Batch     | `HysteresisTracker`| `Segment` start/end times in seconds     |
//! | Streaming | `RealtimeTracker`  | `RealtimeSegment` sample ranges + zeroed |
//!
//! Both trackers only see probabilities; scoring and window slicing are the
//! detector's job.

pub mod hysteresis;
pub mod realtime;

pub use hysteresis::{HysteresisTracker, Transition};
pub use realtime::RealtimeTracker;

use serde::{Deserialize, Serialize};

/// Fixed gap between the cut-in threshold and the cut-out threshold.
pub const HYSTERESIS_GAP: f32 = 0.15;

/// A speech segment in batch mode, in seconds from the start of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub speech_start_at: f64,
    /// `0.0` while the segment is still open at the end of the analysed audio.
    pub speech_end_at: f64,
}

impl Segment {
    pub fn open(speech_start_at: f64) -> Self {
        Self {
            speech_start_at,
            speech_end_at: 0.0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.speech_end_at == 0.0
    }
}

/// A contiguous range `[start, end)` of one `detect_realtime` buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeSegment {
    pub start: usize,
    pub end: usize,
    pub silence: bool,
}

impl RealtimeSegment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Whether `segments` tile `[0, len)` exactly, alternating speech and silence.
pub fn covers_contiguously(segments: &[RealtimeSegment], len: usize) -> bool {
    let mut cursor = 0;
    let mut previous: Option<bool> = None;
    for seg in segments {
        if seg.start != cursor || seg.is_empty() || previous == Some(seg.silence) {
            return false;
        }
        cursor = seg.end;
        previous = Some(seg.silence);
    }
    cursor == len
}

pub(crate) fn samples_to_secs(samples: usize, sample_rate: u32) -> f64 {
    samples as f64 / f64::from(sample_rate)
}
