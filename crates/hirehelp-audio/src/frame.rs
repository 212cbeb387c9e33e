/// Re-blocks an arbitrary stream of capture samples into fixed-size frames.
#[derive(Debug, Clone)]
pub struct CaptureFramer {
    frame_size: usize,
    pending: Vec<f32>,
}

impl CaptureFramer {
    pub fn new(frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            pending: Vec::with_capacity(frame_size),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Buffers `samples` and returns every frame completed by them.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        let mut frames = Vec::new();
        let mut rest = samples;
        while !rest.is_empty() {
            let room = self.frame_size - self.pending.len();
            let take = room.min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.pending.len() == self.frame_size {
                frames.push(std::mem::replace(
                    &mut self.pending,
                    Vec::with_capacity(self.frame_size),
                ));
            }
        }
        frames
    }

    /// Emits the partial frame, if any.
    pub fn flush(&mut self) -> Option<Vec<f32>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Default for CaptureFramer {
    fn default() -> Self {
        Self::new(crate::CAPTURE_FRAME_SAMPLES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_pushes_accumulate_until_a_frame_is_full() {
        let mut framer = CaptureFramer::new(4);
        assert!(framer.push(&[0.1, 0.2]).is_empty());
        assert_eq!(framer.pending_len(), 2);

        let frames = framer.push(&[0.3, 0.4, 0.5]);
        assert_eq!(frames, vec![vec![0.1, 0.2, 0.3, 0.4]]);
        assert_eq!(framer.pending_len(), 1);
    }

    #[test]
    fn long_push_yields_several_frames() {
        let mut framer = CaptureFramer::new(2);
        let frames = framer.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(frames.len(), 2);
        assert_eq!(framer.flush(), Some(vec![5.0]));
        assert_eq!(framer.flush(), None);
    }

    #[test]
    fn default_uses_capture_block_size() {
        let mut framer = CaptureFramer::default();
        assert_eq!(framer.frame_size(), crate::CAPTURE_FRAME_SAMPLES);
        let frames = framer.push(&vec![0.0; crate::CAPTURE_FRAME_SAMPLES]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), crate::CAPTURE_FRAME_SAMPLES);
    }

    #[test]
    fn clear_discards_partial_frame() {
        let mut framer = CaptureFramer::new(8);
        framer.push(&[0.5; 3]);
        framer.clear();
        assert_eq!(framer.pending_len(), 0);
    }
}
