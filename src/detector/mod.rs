// src/detector/mod.rs

pub mod filter;
pub mod leadin;
pub mod machine;
pub mod ring;

pub use filter::FrameFilter;
pub use leadin::LeadInBuf;
pub use machine::{CutState, Segmenter};
pub use ring::FrameRing;

use crate::config::{Config, RMS_WINDOW_MS};

/// Detector quantities derived once the sample rate is known.
#[derive(Debug, Clone, Copy)]
pub struct Params {
    /// RMS window length W, in frames.
    pub window_len: usize,
    /// Frames the read position runs ahead of the centre (W - W/2).
    pub lookahead: usize,
    /// Frames of non-silence needed to confirm a new track.
    pub min_signal_len: u64,
    /// Frames of silence needed to conclude a track.
    pub min_silence_len: u64,
    /// Frames a track must span before silence can end it.
    pub min_track_len: u64,
    /// Windowed-energy threshold `W * x_nf^2`; comparing the running
    /// sum of squares against it spares a square root per tick.
    pub threshold: f64,
}

impl Params {
    pub fn derive(config: &Config, sample_rate: u32) -> Self {
        let rate = sample_rate as u64;
        let window_len = (rate * RMS_WINDOW_MS / 1000).max(1) as usize;
        let x_nf = 10f64.powf(config.noise_floor_dbfs / 20.0);
        Params {
            window_len,
            lookahead: window_len - window_len / 2,
            min_signal_len: rate * config.min_signal_ms / 1000,
            min_silence_len: rate * config.min_silence_ms / 1000,
            min_track_len: rate * config.min_track_secs,
            threshold: x_nf * x_nf * window_len as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn derives_windows_from_the_sample_rate() {
        let config = Config::default();
        let p = Params::derive(&config, 48000);
        assert_eq!(p.window_len, 2400);
        assert_eq!(p.lookahead, 1200);
        assert_eq!(p.min_signal_len, 4800);
        assert_eq!(p.min_silence_len, 96000);
        assert_eq!(p.min_track_len, 40 * 48000);
    }

    #[test]
    fn threshold_is_window_scaled_squared_noise_floor() {
        let mut config = Config::default();
        config.noise_floor_dbfs = -20.0;
        let p = Params::derive(&config, 1000);
        // -20 dBFS is amplitude 0.1; W = 50 frames at 1kHz.
        assert!((p.threshold - 0.01 * 50.0).abs() < 1e-12);
    }

    #[test]
    fn odd_windows_round_the_lookahead_up() {
        let config = Config::default();
        let p = Params::derive(&config, 44100);
        assert_eq!(p.window_len, 2205);
        assert_eq!(p.lookahead, 1103);
    }
}
