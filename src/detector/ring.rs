// src/detector/ring.rs

/// Two parallel circular queues of W frames x C channels: `main` holds
/// the filtered sample frames, `sq` their element-wise squares. Three
/// cursors walk them one frame per tick: head (newest admitted), tail
/// (oldest, about to be evicted) and centre (the frame under decision,
/// W/2 behind head). Cursors are frame indices into a flat buffer and
/// wrap modulo W; nothing allocates after construction.
pub struct FrameRing {
    channels: usize,
    window: usize,
    main: Vec<f64>,
    sq: Vec<f64>,
    head: usize,
    tail: usize,
    centre: usize,
}

impl FrameRing {
    /// A zero-filled ring with cursors placed for the priming phase:
    /// frames land in `[W/2, W)` before the first `advance`.
    pub fn new(window: usize, channels: usize) -> Self {
        FrameRing {
            channels,
            window,
            main: vec![0.0; window * channels],
            sq: vec![0.0; window * channels],
            head: window - 1,
            tail: 0,
            centre: window / 2,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Steps every cursor forward one frame. The old tail slot becomes
    /// the new head, ready to receive the incoming frame.
    pub fn advance(&mut self) {
        self.head = self.tail;
        self.tail = (self.tail + 1) % self.window;
        self.centre = (self.centre + 1) % self.window;
    }

    /// The head frame's sample slot, for the source to fill.
    pub fn head_main_mut(&mut self) -> &mut [f64] {
        let at = self.head * self.channels;
        &mut self.main[at..at + self.channels]
    }

    /// Head sample slot plus its parallel square slot, for the filter.
    pub fn head_pair_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        let at = self.head * self.channels;
        (&mut self.main[at..at + self.channels], &mut self.sq[at..at + self.channels])
    }

    /// The frame currently under decision.
    pub fn centre(&self) -> &[f64] {
        let at = self.centre * self.channels;
        &self.main[at..at + self.channels]
    }

    /// Slot access by absolute frame index, used only while priming
    /// fills `[W/2, W)` (no wrap can occur yet).
    pub fn prime_pair(&mut self, frame: usize) -> (&mut [f64], &mut [f64]) {
        debug_assert!(frame >= self.window / 2 && frame < self.window);
        let at = frame * self.channels;
        (&mut self.main[at..at + self.channels], &mut self.sq[at..at + self.channels])
    }

    #[cfg(test)]
    fn cursors(&self) -> (usize, usize, usize) {
        (self.head, self.tail, self.centre)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_lags_head_by_half_window() {
        let window = 10;
        let mut ring = FrameRing::new(window, 2);
        // After priming the ring is conceptually full: head at W-1,
        // tail at 0, centre halfway.
        assert_eq!(ring.cursors(), (9, 0, 5));
        for tick in 0..37 {
            ring.advance();
            let (head, tail, centre) = ring.cursors();
            assert_eq!(head, tick % window);
            assert_eq!(tail, (tick + 1) % window);
            assert_eq!(centre, (head + window / 2 + 1) % window);
            assert_eq!((tail + window / 2) % window, centre);
        }
    }

    #[test]
    fn head_slot_receives_and_centre_sees_it_half_window_later() {
        let window = 8;
        let mut ring = FrameRing::new(window, 1);
        // Admit frames 0, 1, 2, ... and confirm each shows up at the
        // centre exactly W/2 ticks after admission.
        let mut admitted = 0.0;
        let mut centre_log = Vec::new();
        for _ in 0..32 {
            ring.advance();
            ring.head_main_mut()[0] = admitted;
            admitted += 1.0;
            centre_log.push(ring.centre()[0]);
        }
        // Frame k is admitted on tick k and surfaces on tick k + W/2.
        for (tick, &v) in centre_log.iter().enumerate() {
            if tick >= window / 2 {
                assert_eq!(v, (tick - window / 2) as f64);
            }
        }
    }

    #[test]
    fn square_slot_is_parallel_to_main() {
        let mut ring = FrameRing::new(4, 2);
        ring.advance();
        {
            let (main, sq) = ring.head_pair_mut();
            main.copy_from_slice(&[0.5, -0.25]);
            sq[0] = main[0] * main[0];
            sq[1] = main[1] * main[1];
        }
        let (main, sq) = ring.head_pair_mut();
        assert_eq!(main, &[0.5, -0.25]);
        assert_eq!(sq, &[0.25, 0.0625]);
    }
}
