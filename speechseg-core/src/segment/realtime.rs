//! Streaming-mode segmentation over one buffer.
//!
//! Unlike batch mode, a segment only opens after `min_speech` samples of
//! uninterrupted above-threshold windows, and the output tiles the whole
//! buffer: every sample belongs to exactly one speech or silence segment,
//! and silence segments are zeroed in the cleaned copy.
//!
//! Silence runs shorter than `min_silence` are folded into the neighbouring
//! speech segment, so speech and silence always alternate.

use tracing::debug;

use crate::config::SampleCounts;

use super::{RealtimeSegment, HYSTERESIS_GAP};

/// Per-call streaming state. Positions are indices into the buffer being
/// segmented.
#[derive(Debug, Clone)]
pub struct RealtimeTracker {
    threshold: f32,
    window_size: usize,
    counts: SampleCounts,
    len: usize,
    triggered: bool,
    temp_start: Option<usize>,
    temp_end: Option<usize>,
    curr_start_speech: usize,
    curr_start_silence: usize,
    segments: Vec<RealtimeSegment>,
}

impl RealtimeTracker {
    /// Tracker for a buffer of `len` samples.
    pub fn new(threshold: f32, window_size: usize, counts: SampleCounts, len: usize) -> Self {
        Self {
            threshold,
            window_size,
            counts,
            len,
            triggered: false,
            temp_start: None,
            temp_end: None,
            curr_start_speech: 0,
            curr_start_silence: 0,
            segments: Vec::new(),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Consume the probability of the window starting at `window_start`.
    ///
    /// Confirmed silence runs are zeroed in `cleaned` immediately.
    pub fn advance(&mut self, window_start: usize, prob: f32, cleaned: &mut [f32]) {
        let window_end = window_start + self.window_size;

        if prob >= self.threshold {
            if self.triggered {
                self.temp_end = None;
                return;
            }

            let run_start = *self.temp_start.get_or_insert(window_start);
            // Not enough speech yet to open a segment.
            if window_end - run_start < self.counts.min_speech {
                return;
            }
            self.open_speech(run_start, cleaned);
            return;
        }

        if !self.triggered {
            // A dip below the cut-in breaks the pending speech run.
            self.temp_start = None;
            return;
        }

        if prob < self.threshold - HYSTERESIS_GAP {
            let temp_end = *self.temp_end.get_or_insert(window_start);
            // Not enough silence yet to split.
            if window_end - temp_end < self.counts.min_silence {
                return;
            }
            self.close_speech(temp_end);
        }
    }

    fn open_speech(&mut self, run_start: usize, cleaned: &mut [f32]) {
        self.triggered = true;
        self.temp_end = None;

        let start = run_start
            .saturating_sub(self.counts.speech_pad)
            .max(self.curr_start_silence);
        let silence = start - self.curr_start_silence;

        if silence > 0 && silence >= self.counts.min_silence {
            cleaned[self.curr_start_silence..start].fill(0.0);
            self.segments.push(RealtimeSegment {
                start: self.curr_start_silence,
                end: start,
                silence: true,
            });
            self.curr_start_speech = start;
        } else {
            self.curr_start_speech = match self.segments.last() {
                Some(prev) if !prev.silence => {
                    let start = prev.start;
                    self.segments.pop();
                    start
                }
                _ => self.curr_start_silence,
            };
        }

        debug!(
            start = self.curr_start_speech,
            absorbed_silence = silence,
            "realtime speech start"
        );
    }

    fn close_speech(&mut self, temp_end: usize) {
        let end = (temp_end + self.counts.speech_pad).min(self.len);
        self.segments.push(RealtimeSegment {
            start: self.curr_start_speech,
            end,
            silence: false,
        });
        debug!(start = self.curr_start_speech, end, "realtime speech end");

        self.triggered = false;
        self.curr_start_silence = end;
        self.temp_start = None;
        self.temp_end = None;
    }

    /// Close coverage at the end of the buffer and return the segments.
    pub fn finish(mut self, cleaned: &mut [f32]) -> Vec<RealtimeSegment> {
        if self.triggered {
            self.segments.push(RealtimeSegment {
                start: self.curr_start_speech,
                end: self.len,
                silence: false,
            });
        } else if self.curr_start_silence < self.len {
            cleaned[self.curr_start_silence..self.len].fill(0.0);
            self.segments.push(RealtimeSegment {
                start: self.curr_start_silence,
                end: self.len,
                silence: true,
            });
        }
        self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::covers_contiguously;

    const WINDOW: usize = 512;

    fn counts(min_silence: usize, min_speech: usize, speech_pad: usize) -> SampleCounts {
        SampleCounts {
            min_silence,
            min_speech,
            speech_pad,
        }
    }

    fn run(probs: &[f32], counts: SampleCounts, tail: usize) -> (Vec<f32>, Vec<RealtimeSegment>) {
        let len = probs.len() * WINDOW + tail;
        let mut cleaned = vec![1.0f32; len];
        let mut tracker = RealtimeTracker::new(0.5, WINDOW, counts, len);
        for (i, &p) in probs.iter().enumerate() {
            tracker.advance(i * WINDOW, p, &mut cleaned);
        }
        let segments = tracker.finish(&mut cleaned);
        assert!(covers_contiguously(&segments, len), "{segments:?}");
        (cleaned, segments)
    }

    fn seg(start: usize, end: usize, silence: bool) -> RealtimeSegment {
        RealtimeSegment {
            start,
            end,
            silence,
        }
    }

    #[test]
    fn all_silence_is_one_zeroed_segment() {
        let (cleaned, segments) = run(&[0.0; 4], counts(0, 0, 0), 100);
        assert_eq!(segments, vec![seg(0, 4 * WINDOW + 100, true)]);
        assert!(cleaned.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn speech_then_silence() {
        let (cleaned, segments) = run(&[0.1, 0.1, 0.9, 0.9, 0.1, 0.1, 0.1], counts(WINDOW, 0, 0), 0);
        assert_eq!(
            segments,
            vec![
                seg(0, 2 * WINDOW, true),
                seg(2 * WINDOW, 4 * WINDOW, false),
                seg(4 * WINDOW, 7 * WINDOW, true),
            ]
        );
        assert!(cleaned[..2 * WINDOW].iter().all(|&s| s == 0.0));
        assert!(cleaned[2 * WINDOW..4 * WINDOW].iter().all(|&s| s == 1.0));
        assert!(cleaned[4 * WINDOW..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn short_blip_does_not_open_segment() {
        let (_, segments) = run(&[0.1, 0.9, 0.1, 0.1], counts(0, 2 * WINDOW, 0), 0);
        assert_eq!(segments, vec![seg(0, 4 * WINDOW, true)]);
    }

    #[test]
    fn min_speech_measured_from_first_window_of_run() {
        let (_, segments) = run(&[0.1, 0.9, 0.9, 0.9], counts(0, 2 * WINDOW, 0), 0);
        // Confirmed on the second speech window, starting at the first.
        assert_eq!(
            segments,
            vec![seg(0, WINDOW, true), seg(WINDOW, 4 * WINDOW, false)]
        );
    }

    #[test]
    fn short_leading_silence_is_absorbed() {
        let (cleaned, segments) = run(&[0.1, 0.9, 0.9], counts(2 * WINDOW, 0, 0), 0);
        assert_eq!(segments, vec![seg(0, 3 * WINDOW, false)]);
        assert!(cleaned.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn short_gap_merges_with_previous_speech() {
        // Speech ends after one quiet window (min_silence = 1 window) but the
        // following silence is shorter than the padded threshold.
        let probs = [0.9, 0.1, 0.9, 0.9];
        let (_, segments) = run(&probs, counts(WINDOW, 0, 200), 0);
        assert_eq!(segments, vec![seg(0, 4 * WINDOW, false)]);
    }

    #[test]
    fn padding_widens_speech_and_clamps_to_buffer() {
        let probs = [0.1, 0.1, 0.1, 0.9, 0.1, 0.1];
        let (_, segments) = run(&probs, counts(WINDOW, 0, 100), 0);
        assert_eq!(
            segments,
            vec![
                seg(0, 3 * WINDOW - 100, true),
                seg(3 * WINDOW - 100, 4 * WINDOW + 100, false),
                seg(4 * WINDOW + 100, 6 * WINDOW, true),
            ]
        );

        let (_, segments) = run(&[0.1, 0.1, 0.9, 0.1], counts(WINDOW, 0, 4 * WINDOW), 0);
        assert_eq!(segments, vec![seg(0, 4 * WINDOW, false)]);
    }

    #[test]
    fn trailing_speech_extends_to_buffer_end() {
        let (_, segments) = run(&[0.1, 0.1, 0.9], counts(0, 0, 0), 37);
        assert_eq!(
            segments,
            vec![seg(0, 2 * WINDOW, true), seg(2 * WINDOW, 3 * WINDOW + 37, false)]
        );
    }

    #[test]
    fn hysteresis_band_keeps_segment_open() {
        let (_, segments) = run(&[0.9, 0.4, 0.4, 0.4], counts(0, 0, 0), 0);
        assert_eq!(segments, vec![seg(0, 4 * WINDOW, false)]);
    }
}
