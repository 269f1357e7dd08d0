// src/detector/machine.rs

use anyhow::Result;
use log::info;

use crate::names::TrackNames;
use crate::sink::TrackSink;
use crate::timecode::frames_as_timecode;

use super::Params;
use super::leadin::LeadInBuf;

/// Where the detector currently believes it is in the recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutState {
    /// In a passage of prolonged silence between tracks.
    Silence,
    /// Non-silence seen; waiting out the minimum signal period before
    /// committing to a new track.
    TrackStarting,
    /// In the middle of a track.
    Track,
    /// Silence seen inside a track; waiting out the minimum silence
    /// period before concluding it.
    TrackEnding,
}

/// Four-state segmentation machine. Consumes one signal/silence verdict
/// per tick (for the centre frame) and drives the sink's begin/frame/
/// end callbacks; hysteresis on both edges plus a minimum-track-length
/// lockout keep clicks and interior rests from producing cuts.
pub struct Segmenter {
    state: CutState,
    ttl: u64,
    min_signal_len: u64,
    min_silence_len: u64,
    min_track_len: u64,
    sample_rate: u32,
    track_num: u32,
    track_start: u64,
    cur_name: Option<String>,
    names: TrackNames,
    leadin: Option<LeadInBuf>,
}

impl Segmenter {
    pub fn new(
        params: &Params,
        sample_rate: u32,
        track_num_start: u32,
        names: TrackNames,
        leadin: Option<LeadInBuf>,
    ) -> Self {
        Segmenter {
            state: CutState::Silence,
            ttl: 0,
            min_signal_len: params.min_signal_len,
            min_silence_len: params.min_silence_len,
            min_track_len: params.min_track_len,
            sample_rate,
            track_num: track_num_start,
            track_start: 0,
            cur_name: None,
            names,
            leadin,
        }
    }

    pub fn state(&self) -> CutState {
        self.state
    }

    /// Number of the track currently forming (or the next to form).
    pub fn track_num(&self) -> u32 {
        self.track_num
    }

    /// Advances the machine by one tick. `sig` is the RMS verdict for
    /// the centre frame, `centre_idx` its absolute frame index.
    pub fn tick(
        &mut self,
        sig: bool,
        centre_idx: u64,
        centre: &[f64],
        sink: &mut dyn TrackSink,
    ) -> Result<()> {
        match self.state {
            CutState::Silence => {
                if sig {
                    self.state = CutState::TrackStarting;
                    self.ttl = self.min_signal_len.saturating_sub(1);
                    self.track_start = centre_idx;
                    self.leadin_push(centre);
                }
            }
            CutState::TrackStarting => {
                if !sig {
                    // An audio glitch, not a track.
                    self.leadin_purge();
                    self.state = CutState::Silence;
                    info!(
                        "false positive of {} frames ({}ms) between frame range {}-{} ({}-{})",
                        centre_idx - self.track_start,
                        (centre_idx - self.track_start) * 1000 / self.sample_rate as u64,
                        self.track_start,
                        centre_idx,
                        frames_as_timecode(self.track_start, self.sample_rate),
                        frames_as_timecode(centre_idx, self.sample_rate)
                    );
                } else if self.ttl > 0 {
                    self.leadin_push(centre);
                    self.ttl -= 1;
                } else {
                    // The start of a real track.
                    self.state = CutState::Track;
                    self.cur_name = self.names.next_name()?;
                    sink.on_begin(self.track_num, self.track_start, self.cur_name.as_deref())?;
                    if let Some(leadin) = &mut self.leadin {
                        for frame in leadin.frames() {
                            sink.on_frame(frame)?;
                        }
                        leadin.purge();
                    }
                    sink.on_frame(centre)?;
                }
            }
            CutState::TrackEnding => {
                sink.on_frame(centre)?;
                if sig {
                    // Not the end after all; the track carries on.
                    self.state = CutState::Track;
                } else if self.ttl > 0 {
                    self.ttl -= 1;
                } else {
                    self.end_track(centre_idx, sink)?;
                    self.state = CutState::Silence;
                }
            }
            CutState::Track => {
                sink.on_frame(centre)?;
                if !sig && centre_idx >= self.track_start + self.min_track_len {
                    self.state = CutState::TrackEnding;
                    self.ttl = self.min_silence_len;
                }
            }
        }
        Ok(())
    }

    /// Concludes an in-flight track when the driver exits (end of
    /// input, track range satisfied). Keeps begin/end balanced.
    pub fn finish(&mut self, end_idx: u64, sink: &mut dyn TrackSink) -> Result<()> {
        if matches!(self.state, CutState::Track | CutState::TrackEnding) {
            self.end_track(end_idx, sink)?;
        }
        self.state = CutState::Silence;
        Ok(())
    }

    fn end_track(&mut self, end_idx: u64, sink: &mut dyn TrackSink) -> Result<()> {
        sink.on_end(self.track_num, self.track_start, end_idx, self.cur_name.as_deref())?;
        self.track_num += 1;
        self.cur_name = None;
        Ok(())
    }

    fn leadin_push(&mut self, centre: &[f64]) {
        if let Some(leadin) = &mut self.leadin {
            leadin.push(centre);
        }
    }

    fn leadin_purge(&mut self) {
        if let Some(leadin) = &mut self.leadin {
            leadin.purge();
        }
    }
}
