//! Look-back context carried between inference windows.
//!
//! Unified-state Silero models expect each window to be preceded by the last
//! few raw samples of the previous window. The buffer is empty (and unused)
//! until the first window of a stream has been scored.

/// Trailing samples of the previously scored window.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBuffer {
    samples: Vec<f32>,
    primed: bool,
}

impl ContextBuffer {
    /// A buffer holding `len` samples. `len == 0` disables prefixing.
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len],
            primed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether a previous window has been recorded since the last clear.
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Build the model input for `window`, prefixed with context when available.
    ///
    /// Writes into `out` so the caller can reuse one allocation per call.
    pub fn prefix_into(&self, window: &[f32], out: &mut Vec<f32>) {
        out.clear();
        if self.primed && !self.samples.is_empty() {
            out.extend_from_slice(&self.samples);
        }
        out.extend_from_slice(window);
    }

    /// Remember the tail of the un-prefixed `window` for the next call.
    pub fn update(&mut self, window: &[f32]) {
        let len = self.samples.len();
        if len == 0 {
            self.primed = true;
            return;
        }
        if window.len() >= len {
            self.samples.copy_from_slice(&window[window.len() - len..]);
        } else {
            // Shorter than the context: shift left and append.
            self.samples.rotate_left(window.len());
            self.samples[len - window.len()..].copy_from_slice(window);
        }
        self.primed = true;
    }

    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|v| *v = 0.0);
        self.primed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_window_is_not_prefixed() {
        let ctx = ContextBuffer::new(4);
        let mut out = Vec::new();
        ctx.prefix_into(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &mut out);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn later_windows_carry_previous_tail() {
        let mut ctx = ContextBuffer::new(4);
        let mut out = Vec::new();
        ctx.update(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        ctx.prefix_into(&[7.0, 8.0, 9.0, 10.0, 11.0, 12.0], &mut out);
        assert_eq!(
            out,
            vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0]
        );

        // The stored tail comes from the un-prefixed window.
        ctx.update(&[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        ctx.prefix_into(&[0.0; 2], &mut out);
        assert_eq!(&out[..4], &[9.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn zero_length_context_never_prefixes() {
        let mut ctx = ContextBuffer::new(0);
        let mut out = Vec::new();
        ctx.update(&[1.0, 2.0]);
        assert!(ctx.is_primed());
        ctx.prefix_into(&[3.0, 4.0], &mut out);
        assert_eq!(out, vec![3.0, 4.0]);
    }

    #[test]
    fn clear_forgets_history() {
        let mut ctx = ContextBuffer::new(2);
        ctx.update(&[1.0, 2.0, 3.0]);
        ctx.clear();
        assert!(!ctx.is_primed());
        let mut out = Vec::new();
        ctx.prefix_into(&[5.0], &mut out);
        assert_eq!(out, vec![5.0]);
    }
}
