// src/detector/leadin.rs

use log::warn;

/// Linear capture buffer for the frames observed while a suspected
/// track start is being confirmed. Unlike the analysis rings this is a
/// plain array: it is either flushed to the new output file in one go
/// or discarded entirely.
pub struct LeadInBuf {
    channels: usize,
    capacity_frames: usize,
    samples: Vec<f64>,
}

impl LeadInBuf {
    pub fn new(capacity_frames: usize, channels: usize) -> Self {
        LeadInBuf {
            channels,
            capacity_frames,
            samples: Vec::with_capacity(capacity_frames * channels),
        }
    }

    /// Appends one frame; frames past capacity are dropped with a
    /// warning (the state machine should have resolved by then).
    pub fn push(&mut self, frame: &[f64]) {
        if self.len_frames() < self.capacity_frames {
            self.samples.extend_from_slice(frame);
        } else {
            warn!("lead-in buffer is overflowing");
        }
    }

    pub fn len_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn frames(&self) -> impl Iterator<Item = &[f64]> {
        self.samples.chunks_exact(self.channels)
    }

    pub fn purge(&mut self) {
        self.samples.clear();
    }
}
