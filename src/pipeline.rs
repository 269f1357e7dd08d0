// src/pipeline.rs

use anyhow::Result;
use log::info;

use crate::codec::{self, StreamSpec};
use crate::config::{Config, Range};
use crate::detector::{FrameFilter, FrameRing, Params};
use crate::source::{FrameSource, FrameStatus};

/// The primed DSP front end shared by the cutter and the analyser:
/// source, conditioning filter and analysis rings, advanced together
/// one frame per tick.
pub struct Pipeline {
    spec: StreamSpec,
    params: Params,
    ring: FrameRing,
    filter: FrameFilter,
    source: FrameSource,
    centre_idx: u64,
}

impl Pipeline {
    /// Opens the configured input, seeks to the requested start, derives
    /// the window quantities and slurps the initial half-window so the
    /// running sum of squares and filter memory are populated before the
    /// first decision tick.
    pub fn open(config: &Config) -> Result<Self> {
        let mut reader = codec::open_input(config)?;
        let spec = reader.spec();
        info!("opened input file `{}'", config.input.describe());
        info!("sampling rate: {}Hz", spec.sample_rate);
        info!("number of channels: {}", spec.channels);

        let (start, end) = config.range.resolve(spec.sample_rate);
        if let Range::Time { start: s, end: e } = config.range {
            info!("translated time range {s:.5}-{e:.5} to frame indices {start}-{end}");
        }
        if start > 0 {
            reader.seek_to_frame(start)?;
            info!("repositioned input to frame {start}");
        }

        let params = Params::derive(config, spec.sample_rate);
        info!("RMS window is {} frames", params.window_len);
        info!("read-ahead period is {} frames", params.lookahead);

        let mut ring = FrameRing::new(params.window_len, spec.channels);
        let mut filter =
            FrameFilter::new(spec.channels, spec.sample_rate, config.high_pass, config.dc_offset);
        info!("HPF alpha = {}", filter.alpha());

        let mut source = FrameSource::new(reader, end.saturating_sub(start), params.lookahead as u64);

        // Priming: frames land in [W/2, W) while the queues are still
        // flat; no wrap can occur yet. Slots past a short read stay
        // zero and are filtered as silence.
        let channels = spec.channels;
        let mut scratch = vec![0.0f64; params.lookahead * channels];
        let got = source.read_initial(&mut scratch)?;
        for i in 0..params.lookahead {
            let (main, sq) = ring.prime_pair(params.window_len / 2 + i);
            if i < got {
                main.copy_from_slice(&scratch[i * channels..(i + 1) * channels]);
            }
            filter.process(main, sq);
        }

        Ok(Pipeline { spec, params, ring, filter, source, centre_idx: start })
    }

    pub fn spec(&self) -> StreamSpec {
        self.spec
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Absolute frame index of the decision point (centre cursor).
    pub fn centre_idx(&self) -> u64 {
        self.centre_idx
    }

    /// The frame under decision.
    pub fn centre(&self) -> &[f64] {
        self.ring.centre()
    }

    /// RMS verdict for the current window: does any channel exceed the
    /// noise floor?
    pub fn is_signal(&self) -> bool {
        self.filter.is_signal(self.params.threshold)
    }

    pub fn filter(&self) -> &FrameFilter {
        &self.filter
    }

    /// Real frames pulled from the codec so far, priming included.
    pub fn frames_read(&self) -> u64 {
        self.source.frames_read()
    }

    /// True when the requested range was fully drained.
    pub fn range_exhausted(&self) -> bool {
        self.source.exhausted()
    }

    /// Admits and conditions the next frame; every cursor (and the
    /// centre index) steps one frame forward.
    pub fn advance(&mut self) -> Result<FrameStatus> {
        self.ring.advance();
        let status = self.source.next_frame(self.ring.head_main_mut())?;
        let (main, sq) = self.ring.head_pair_mut();
        self.filter.process(main, sq);
        self.centre_idx += 1;
        Ok(status)
    }
}
