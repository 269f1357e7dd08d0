// src/source.rs

use anyhow::Result;

use crate::codec::AudioReader;

/// What a `next_frame` call delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A real frame from the recording.
    Ok,
    /// A zero frame padding out the look-ahead after end of input.
    EofPad,
    /// Nothing left; the caller should stop.
    End,
}

/// Pulls decoded frames one at a time, bounded by the requested frame
/// range. After the codec reports end of input, zero frames are padded
/// for as long as the look-ahead window needs so the centre cursor can
/// reach the final real frame; after that every call reports `End`.
pub struct FrameSource {
    reader: Box<dyn AudioReader>,
    frames_remaining: u64,
    lookahead: u64,
    in_eof: bool,
    frames_read: u64,
}

impl FrameSource {
    pub fn new(reader: Box<dyn AudioReader>, range_frames: u64, lookahead: u64) -> Self {
        FrameSource { reader, frames_remaining: range_frames, lookahead, in_eof: false, frames_read: 0 }
    }

    /// Bulk read used while priming the analysis window. Does not count
    /// against the requested range.
    pub fn read_initial(&mut self, out: &mut [f64]) -> Result<usize> {
        let frames = self.reader.read_frames(out)?;
        self.frames_read += frames as u64;
        Ok(frames)
    }

    pub fn next_frame(&mut self, out: &mut [f64]) -> Result<FrameStatus> {
        if !self.in_eof && self.frames_remaining > 0 {
            self.frames_remaining -= 1;
            let frames = self.reader.read_frames(out)?;
            if frames == 0 {
                // End of input; cap the remaining work at the pad the
                // look-ahead still needs, and deliver silence.
                self.in_eof = true;
                self.frames_remaining = self.frames_remaining.min(self.lookahead);
                out.fill(0.0);
                Ok(FrameStatus::EofPad)
            } else {
                self.frames_read += 1;
                Ok(FrameStatus::Ok)
            }
        } else {
            out.fill(0.0);
            if self.frames_remaining > 0 {
                self.frames_remaining -= 1;
                Ok(FrameStatus::EofPad)
            } else {
                Ok(FrameStatus::End)
            }
        }
    }

    /// True when the range was fully drained (as opposed to the run
    /// stopping early, e.g. when the track range was satisfied).
    pub fn exhausted(&self) -> bool {
        self.frames_remaining == 0
    }

    /// Real frames delivered so far, priming included.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{AudioReader, StreamSpec};

    /// Scripted reader yielding a fixed number of counting frames.
    struct FakeReader {
        frames: u64,
        pos: u64,
    }

    impl AudioReader for FakeReader {
        fn spec(&self) -> StreamSpec {
            StreamSpec { sample_rate: 1000, channels: 1, bits_per_sample: 16, float: false }
        }

        fn seek_to_frame(&mut self, frame_idx: u64) -> Result<()> {
            self.pos = frame_idx;
            Ok(())
        }

        fn read_frames(&mut self, out: &mut [f64]) -> Result<usize> {
            let mut delivered = 0;
            for slot in out.iter_mut() {
                if self.pos >= self.frames {
                    break;
                }
                *slot = self.pos as f64;
                self.pos += 1;
                delivered += 1;
            }
            Ok(delivered)
        }
    }

    fn source(frames: u64, range: u64, lookahead: u64) -> FrameSource {
        FrameSource::new(Box::new(FakeReader { frames, pos: 0 }), range, lookahead)
    }

    #[test]
    fn pads_the_lookahead_after_eof_then_ends() {
        let mut src = source(5, u64::MAX, 3);
        let mut frame = [0.0f64; 1];
        for i in 0..5 {
            assert_eq!(src.next_frame(&mut frame).unwrap(), FrameStatus::Ok);
            assert_eq!(frame[0], i as f64);
        }
        // EOF detection plus the pad budget, all silent.
        for _ in 0..4 {
            assert_eq!(src.next_frame(&mut frame).unwrap(), FrameStatus::EofPad);
            assert_eq!(frame[0], 0.0);
        }
        assert_eq!(src.next_frame(&mut frame).unwrap(), FrameStatus::End);
        assert_eq!(src.next_frame(&mut frame).unwrap(), FrameStatus::End);
        assert!(src.exhausted());
        assert_eq!(src.frames_read(), 5);
    }

    #[test]
    fn range_exhaustion_ends_without_padding() {
        let mut src = source(100, 10, 3);
        let mut frame = [0.0f64; 1];
        for _ in 0..10 {
            assert_eq!(src.next_frame(&mut frame).unwrap(), FrameStatus::Ok);
        }
        assert_eq!(src.next_frame(&mut frame).unwrap(), FrameStatus::End);
        assert!(src.exhausted());
    }

    #[test]
    fn priming_reads_do_not_consume_the_range() {
        let mut src = source(100, 10, 3);
        let mut scratch = [0.0f64; 4];
        assert_eq!(src.read_initial(&mut scratch).unwrap(), 4);
        assert_eq!(scratch, [0.0, 1.0, 2.0, 3.0]);
        let mut frame = [0.0f64; 1];
        let mut delivered = 0;
        while src.next_frame(&mut frame).unwrap() == FrameStatus::Ok {
            delivered += 1;
        }
        assert_eq!(delivered, 10);
        assert_eq!(src.frames_read(), 14);
    }
}
