// src/detector/filter.rs

use crate::config::{HIGH_PASS_CORNER_HZ, MAX_CHANNELS};

/// Per-frame conditioning applied as each frame is admitted to the ring
/// head: DC offset correction, one-pole high-pass, and maintenance of
/// the per-channel running sum of squares over the RMS window.
///
/// The high-pass output is always computed so its rejection residual
/// can be accumulated for DC estimation; the audio stream itself is
/// only replaced when the filter is enabled.
pub struct FrameFilter {
    channels: usize,
    alpha: f64,
    high_pass: bool,
    dc_offset: [f64; MAX_CHANNELS],
    sum_sq: [f64; MAX_CHANNELS],
    prev_rej: [f64; MAX_CHANNELS],
    rej_total: [f64; MAX_CHANNELS],
    frames_processed: u64,
}

impl FrameFilter {
    pub fn new(
        channels: usize,
        sample_rate: u32,
        high_pass: bool,
        dc_offset: [f64; MAX_CHANNELS],
    ) -> Self {
        let tau = 1.0 / (2.0 * std::f64::consts::PI * HIGH_PASS_CORNER_HZ);
        let dt = 1.0 / sample_rate as f64;
        FrameFilter {
            channels,
            alpha: tau / (tau + dt),
            high_pass,
            dc_offset,
            sum_sq: [0.0; MAX_CHANNELS],
            prev_rej: [0.0; MAX_CHANNELS],
            rej_total: [0.0; MAX_CHANNELS],
            frames_processed: 0,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Conditions the newly admitted head frame in place. `sq` is the
    /// parallel square slot, still holding the square of the frame
    /// being evicted; it is subtracted from the running total before
    /// the slot is overwritten.
    pub fn process(&mut self, main: &mut [f64], sq: &mut [f64]) {
        for c in 0..self.channels {
            self.sum_sq[c] -= sq[c];
            main[c] += self.dc_offset[c];
            let out = self.alpha * (main[c] - self.prev_rej[c]);
            let rej = main[c] - out;
            self.prev_rej[c] = rej;
            if self.high_pass {
                main[c] = out;
            } else {
                // Low-frequency residual, kept for the offline DC estimate.
                self.rej_total[c] += rej;
            }
            sq[c] = main[c] * main[c];
            self.sum_sq[c] += sq[c];
        }
        self.frames_processed += 1;
    }

    /// True when at least one channel's windowed energy exceeds the
    /// precomputed threshold `W * x_nf^2`.
    pub fn is_signal(&self, threshold: f64) -> bool {
        self.sum_sq[..self.channels].iter().any(|&s| threshold < s)
    }

    pub fn sum_sq(&self) -> &[f64] {
        &self.sum_sq[..self.channels]
    }

    pub fn rej_total(&self) -> &[f64] {
        &self.rej_total[..self.channels]
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::ring::FrameRing;

    fn feed(filter: &mut FrameFilter, ring: &mut FrameRing, frame: &[f64]) {
        ring.advance();
        ring.head_main_mut().copy_from_slice(frame);
        let (main, sq) = ring.head_pair_mut();
        filter.process(main, sq);
    }

    #[test]
    fn running_sum_matches_window_contents() {
        let window = 16;
        let mut ring = FrameRing::new(window, 2);
        let mut filter = FrameFilter::new(2, 48000, false, [0.0; MAX_CHANNELS]);
        let mut history: Vec<[f64; 2]> = Vec::new();
        for i in 0..100u32 {
            let frame = [(i as f64 * 0.013).sin() * 0.5, (i as f64 * 0.007).cos() * 0.25];
            feed(&mut filter, &mut ring, &frame);
            history.push(frame);
            // Brute-force the sum over the last `window` admitted frames
            // (earlier slots are still zero while the window fills).
            for c in 0..2 {
                let expect: f64 = history
                    .iter()
                    .rev()
                    .take(window)
                    .map(|f| f[c] * f[c])
                    .sum();
                assert!((filter.sum_sq()[c] - expect).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn disabled_filter_with_zero_offsets_leaves_samples_untouched() {
        let mut ring = FrameRing::new(8, 1);
        let mut filter = FrameFilter::new(1, 44100, false, [0.0; MAX_CHANNELS]);
        for i in 0..20 {
            let x = (i as f64 * 0.61).sin();
            feed(&mut filter, &mut ring, &[x]);
            let (main, _) = ring.head_pair_mut();
            assert_eq!(main[0], x);
        }
    }

    #[test]
    fn enabled_filter_removes_dc_bias() {
        let rate = 8000u32;
        let mut ring = FrameRing::new(8, 1);
        let mut filter = FrameFilter::new(1, rate, true, [0.0; MAX_CHANNELS]);
        // A constant input settles to zero through a high-pass.
        for _ in 0..rate {
            feed(&mut filter, &mut ring, &[0.25]);
        }
        feed(&mut filter, &mut ring, &[0.25]);
        let (main, _) = ring.head_pair_mut();
        assert!(main[0].abs() < 0.01);
    }

    #[test]
    fn dc_offset_is_added_before_filtering() {
        let mut ring = FrameRing::new(4, 2);
        let mut dc = [0.0; MAX_CHANNELS];
        dc[0] = 0.1;
        dc[1] = -0.2;
        let mut filter = FrameFilter::new(2, 48000, false, dc);
        feed(&mut filter, &mut ring, &[0.0, 0.0]);
        let (main, _) = ring.head_pair_mut();
        assert_eq!(main[0], 0.1);
        assert_eq!(main[1], -0.2);
    }

    #[test]
    fn rejection_residual_accumulates_only_when_filter_disabled() {
        let mut ring = FrameRing::new(4, 1);
        let mut on = FrameFilter::new(1, 48000, true, [0.0; MAX_CHANNELS]);
        let mut off = FrameFilter::new(1, 48000, false, [0.0; MAX_CHANNELS]);
        for _ in 0..50 {
            feed(&mut on, &mut ring, &[0.5]);
        }
        let mut ring = FrameRing::new(4, 1);
        for _ in 0..50 {
            feed(&mut off, &mut ring, &[0.5]);
        }
        assert_eq!(on.rej_total()[0], 0.0);
        assert!(off.rej_total()[0] > 0.0);
    }

    #[test]
    fn signal_test_is_any_channel_over_threshold() {
        let mut ring = FrameRing::new(4, 2);
        let mut filter = FrameFilter::new(2, 48000, false, [0.0; MAX_CHANNELS]);
        feed(&mut filter, &mut ring, &[0.0, 0.5]);
        // One loud channel is enough.
        assert!(filter.is_signal(0.1));
        assert!(!filter.is_signal(0.5));
    }
}
