//! Batch-mode hysteresis state machine.
//!
//! ## Algorithm
//!
//! For every scored window (`curr_sample` advances by one window first):
//!
//! 1. `prob ≥ threshold` cancels a pending end candidate.
//! 2. `prob ≥ threshold` while untriggered opens a segment at
//!    `curr_sample - window - pad` (clamped at 0).
//! 3. `prob < threshold - 0.15` while triggered marks an end candidate at
//!    `curr_sample`; once `min_silence` samples have passed since the
//!    candidate, the segment closes at `candidate + pad`.
//!
//! Probabilities between the two thresholds change nothing.

use crate::config::SampleCounts;

use super::HYSTERESIS_GAP;

/// A confirmed state change, in absolute stream sample positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    SpeechStart(usize),
    SpeechEnd(usize),
}

#[derive(Debug, Clone)]
pub struct HysteresisTracker {
    threshold: f32,
    window_size: usize,
    counts: SampleCounts,
    curr_sample: usize,
    triggered: bool,
    temp_end: Option<usize>,
}

impl HysteresisTracker {
    pub fn new(threshold: f32, window_size: usize, counts: SampleCounts) -> Self {
        Self {
            threshold,
            window_size,
            counts,
            curr_sample: 0,
            triggered: false,
            temp_end: None,
        }
    }

    /// Samples consumed since construction or the last reset.
    pub fn current_sample(&self) -> usize {
        self.curr_sample
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Consume the probability of the next window.
    pub fn advance(&mut self, prob: f32) -> Option<Transition> {
        self.curr_sample += self.window_size;

        if prob >= self.threshold {
            // Speech resumed before the silence was confirmed.
            self.temp_end = None;

            if !self.triggered {
                self.triggered = true;
                let start = self
                    .curr_sample
                    .saturating_sub(self.window_size + self.counts.speech_pad);
                return Some(Transition::SpeechStart(start));
            }
            return None;
        }

        if prob < self.threshold - HYSTERESIS_GAP && self.triggered {
            let temp_end = *self.temp_end.get_or_insert(self.curr_sample);

            if self.curr_sample - temp_end < self.counts.min_silence {
                return None;
            }

            self.temp_end = None;
            self.triggered = false;
            return Some(Transition::SpeechEnd(temp_end + self.counts.speech_pad));
        }

        None
    }

    pub fn reset(&mut self) {
        self.curr_sample = 0;
        self.triggered = false;
        self.temp_end = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: usize = 512;

    fn tracker(min_silence: usize, speech_pad: usize) -> HysteresisTracker {
        HysteresisTracker::new(
            0.5,
            WINDOW,
            SampleCounts {
                min_silence,
                min_speech: 0,
                speech_pad,
            },
        )
    }

    fn feed(tracker: &mut HysteresisTracker, probs: &[f32]) -> Vec<Transition> {
        probs.iter().filter_map(|&p| tracker.advance(p)).collect()
    }

    #[test]
    fn opens_at_start_of_first_speech_window() {
        let mut t = tracker(0, 0);
        let events = feed(&mut t, &[0.1, 0.1, 0.9]);
        assert_eq!(events, vec![Transition::SpeechStart(2 * WINDOW)]);
        assert!(t.is_triggered());
    }

    #[test]
    fn closes_after_min_silence() {
        let mut t = tracker(2 * WINDOW, 0);
        let events = feed(&mut t, &[0.9, 0.1, 0.1, 0.1]);
        // Candidate at the end of the first quiet window (1024), confirmed
        // two windows later.
        assert_eq!(
            events,
            vec![Transition::SpeechStart(0), Transition::SpeechEnd(2 * WINDOW)]
        );
        assert!(!t.is_triggered());
    }

    #[test]
    fn speech_inside_silence_run_cancels_candidate() {
        let mut t = tracker(2 * WINDOW, 0);
        let events = feed(&mut t, &[0.9, 0.1, 0.1, 0.9, 0.1, 0.1]);
        assert_eq!(events, vec![Transition::SpeechStart(0)]);
        assert!(t.is_triggered());
    }

    #[test]
    fn hysteresis_band_neither_opens_nor_closes() {
        let mut t = tracker(0, 0);
        // 0.4 is below the cut-in but above the 0.35 cut-out.
        assert!(feed(&mut t, &[0.4, 0.4]).is_empty());
        assert_eq!(
            feed(&mut t, &[0.9, 0.4, 0.4, 0.4]),
            vec![Transition::SpeechStart(2 * WINDOW)]
        );
        assert!(t.is_triggered());
        assert_eq!(feed(&mut t, &[0.3]), vec![Transition::SpeechEnd(7 * WINDOW)]);
    }

    #[test]
    fn padding_is_applied_and_start_is_clamped() {
        let mut t = tracker(0, 160);
        let events = feed(&mut t, &[0.9, 0.1, 0.1, 0.9]);
        assert_eq!(
            events,
            vec![
                Transition::SpeechStart(0),
                Transition::SpeechEnd(2 * WINDOW + 160),
                Transition::SpeechStart(3 * WINDOW - 160),
            ]
        );
    }

    #[test]
    fn quiet_windows_before_any_speech_do_nothing() {
        let mut t = tracker(0, 0);
        assert!(feed(&mut t, &[0.0; 8]).is_empty());
        assert_eq!(t.current_sample(), 8 * WINDOW);
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut t = tracker(WINDOW * 4, 0);
        feed(&mut t, &[0.9, 0.1]);
        t.reset();
        assert_eq!(t.current_sample(), 0);
        assert!(!t.is_triggered());
        assert_eq!(feed(&mut t, &[0.9]), vec![Transition::SpeechStart(0)]);
    }
}
