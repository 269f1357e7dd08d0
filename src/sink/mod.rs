// src/sink/mod.rs

pub mod cuts;
pub mod extract;

pub use cuts::CutLogSink;
pub use extract::ExtractSink;

use anyhow::Result;

/// Receiver of segmentation events. The cut-sheet and extraction paths
/// share the state machine; only what happens at each event differs.
pub trait TrackSink {
    /// A track has been confirmed starting at `start_idx`.
    fn on_begin(&mut self, track_num: u32, start_idx: u64, name: Option<&str>) -> Result<()>;

    /// One committed centre frame while inside a track (lead-in frames
    /// are replayed through here right after `on_begin`).
    fn on_frame(&mut self, frame: &[f64]) -> Result<()>;

    /// The track ended at `end_idx` (exclusive).
    fn on_end(&mut self, track_num: u32, start_idx: u64, end_idx: u64, name: Option<&str>)
    -> Result<()>;

    /// True when the sink consumes audio frames; drives whether the
    /// lead-in buffer captures anything.
    fn wants_frames(&self) -> bool {
        false
    }
}
