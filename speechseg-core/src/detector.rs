//! `Detector` — one audio stream's segmentation session.
//!
//! ## Lifecycle
//!
//! ```text
//! Detector::new(config)          → config validated, scorer bound
//!     ├─► detect(pcm)            → batch segments (state carried across calls)
//!     ├─► detect_realtime(pcm)   → cleaned copy + contiguous segments
//!     ├─► reset()                → recurrent state, context, counters zeroed
//!     └─► destroy()              → scorer released; later calls → Destroyed
//! ```
//!
//! ## Threading
//!
//! Every operation takes `&mut self` and runs to completion on the calling
//! thread. Independent detectors share nothing and may run on separate
//! threads.

use tracing::{debug, info};

use crate::config::{DetectorConfig, SampleCounts};
use crate::context::ContextBuffer;
use crate::error::{Result, SegmenterError};
use crate::inference::{ModelVariant, RecurrentState, SpeechScorer};
use crate::segment::{
    samples_to_secs, HysteresisTracker, RealtimeSegment, RealtimeTracker, Segment, Transition,
};

pub struct Detector {
    config: DetectorConfig,
    counts: SampleCounts,
    variant: ModelVariant,
    /// `None` once destroyed.
    scorer: Option<Box<dyn SpeechScorer>>,
    state: RecurrentState,
    context: ContextBuffer,
    tracker: HysteresisTracker,
    /// Scratch space for the context-prefixed window.
    input_buf: Vec<f32>,
}

impl Detector {
    /// Validate `config` and load the Silero model it points to.
    #[cfg(feature = "onnx")]
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        let scorer = crate::inference::SileroScorer::new(&config.model_path)?;
        Self::with_scorer(config, scorer)
    }

    /// Validate `config` and bind an already-constructed scorer.
    pub fn with_scorer<S: SpeechScorer>(config: DetectorConfig, scorer: S) -> Result<Self> {
        config.validate()?;

        let counts = config.sample_counts();
        let variant = scorer.variant();
        let context_len = variant.context_len(config.sample_rate);

        info!(
            sample_rate = config.sample_rate,
            window_size = config.window_size,
            threshold = config.threshold,
            ?variant,
            context_len,
            "detector ready"
        );

        Ok(Self {
            tracker: HysteresisTracker::new(config.threshold, config.window_size, counts),
            state: variant.initial_state(),
            context: ContextBuffer::new(context_len),
            input_buf: Vec::with_capacity(config.window_size + context_len),
            scorer: Some(Box::new(scorer)),
            variant,
            counts,
            config,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn sample_counts(&self) -> SampleCounts {
        self.counts
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Whether a batch-mode segment is currently open.
    pub fn is_triggered(&self) -> bool {
        self.tracker.is_triggered()
    }

    /// Stream position reached by batch-mode detection, in samples.
    pub fn current_sample(&self) -> usize {
        self.tracker.current_sample()
    }

    pub fn is_destroyed(&self) -> bool {
        self.scorer.is_none()
    }

    /// Score one un-prefixed window, carrying context and recurrent state.
    fn score(&mut self, window: &[f32]) -> Result<f32> {
        let scorer = self.scorer.as_mut().ok_or(SegmenterError::Destroyed)?;

        self.context.prefix_into(window, &mut self.input_buf);
        let prob = scorer.infer(&self.input_buf, self.config.sample_rate, &mut self.state)?;
        self.context.update(window);

        Ok(prob)
    }

    fn check_input(&self, pcm: &[f32]) -> Result<()> {
        if self.scorer.is_none() {
            return Err(SegmenterError::Destroyed);
        }
        if pcm.len() < self.config.window_size {
            return Err(SegmenterError::NotEnoughSamples);
        }
        Ok(())
    }

    /// Batch detection: start/end times of speech segments in `pcm`.
    ///
    /// Timestamps are relative to the start of the stream, so consecutive
    /// calls continue where the previous one stopped. A trailing partial
    /// window is ignored. The last segment keeps `speech_end_at == 0.0` if
    /// the audio ends before its silence is confirmed.
    ///
    /// # Errors
    /// - `NotEnoughSamples` if `pcm` is shorter than one window.
    /// - `Inference` if the scorer fails; the detector should be discarded.
    /// - `UnexpectedSpeechEnd` if silence is confirmed with no segment open
    ///   in this call.
    pub fn detect(&mut self, pcm: &[f32]) -> Result<Vec<Segment>> {
        self.check_input(pcm)?;

        let window_size = self.config.window_size;
        let sample_rate = self.config.sample_rate;
        let stream_end = self.tracker.current_sample() + pcm.len();

        debug!(samples_len = pcm.len(), "starting speech detection");

        let mut segments: Vec<Segment> = Vec::new();
        for window in pcm.chunks_exact(window_size) {
            let prob = self.score(window)?;

            match self.tracker.advance(prob) {
                Some(Transition::SpeechStart(sample)) => {
                    let start_at = samples_to_secs(sample, sample_rate);
                    debug!(start_at, "speech start");
                    segments.push(Segment::open(start_at));
                }
                Some(Transition::SpeechEnd(sample)) => {
                    let end_at = samples_to_secs(sample.min(stream_end), sample_rate);
                    debug!(end_at, "speech end");
                    let open = segments
                        .last_mut()
                        .filter(|s| s.is_open())
                        .ok_or(SegmenterError::UnexpectedSpeechEnd)?;
                    open.speech_end_at = end_at;
                }
                None => {}
            }
        }

        debug!(
            segments_len = segments.len(),
            dropped_samples = pcm.len() % window_size,
            "speech detection done"
        );

        Ok(segments)
    }

    /// Streaming detection over one buffer.
    ///
    /// Returns a copy of `pcm` with every silence segment zeroed, and
    /// segments that tile `[0, pcm.len())` without gaps or overlaps,
    /// alternating speech and silence. Segment bookkeeping starts afresh on
    /// every call; recurrent state and context carry over.
    ///
    /// # Errors
    /// - `NotEnoughSamples` if `pcm` is shorter than one window.
    /// - `Inference` if the scorer fails; the detector should be discarded.
    pub fn detect_realtime(&mut self, pcm: &[f32]) -> Result<(Vec<f32>, Vec<RealtimeSegment>)> {
        self.check_input(pcm)?;

        let window_size = self.config.window_size;
        let mut cleaned = pcm.to_vec();
        let mut tracker =
            RealtimeTracker::new(self.config.threshold, window_size, self.counts, pcm.len());

        for (i, window) in pcm.chunks_exact(window_size).enumerate() {
            let prob = self.score(window)?;
            tracker.advance(i * window_size, prob, &mut cleaned);
        }

        let segments = tracker.finish(&mut cleaned);
        debug!(
            samples_len = pcm.len(),
            segments_len = segments.len(),
            "realtime detection done"
        );

        Ok((cleaned, segments))
    }

    /// Zero recurrent state, look-back context and all counters.
    ///
    /// The scorer stays bound; the next call behaves like the first call on
    /// a fresh detector.
    pub fn reset(&mut self) -> Result<()> {
        if self.scorer.is_none() {
            return Err(SegmenterError::Destroyed);
        }
        self.state.reset();
        self.context.clear();
        self.tracker.reset();
        debug!("detector reset");
        Ok(())
    }

    /// Release the scorer and any runtime resources it holds.
    ///
    /// # Errors
    /// `Destroyed` if called more than once.
    pub fn destroy(&mut self) -> Result<()> {
        let scorer = self.scorer.take().ok_or(SegmenterError::Destroyed)?;
        drop(scorer);
        info!("detector destroyed");
        Ok(())
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("config", &self.config)
            .field("variant", &self.variant)
            .field("tracker", &self.tracker)
            .field("destroyed", &self.scorer.is_none())
            .finish_non_exhaustive()
    }
}
