// src/sink/cuts.rs

use std::fs::File;
use std::io::{self, LineWriter, Write};

use anyhow::{Context, Result};
use log::info;

use crate::config::{CutFormat, CutsTarget};
use crate::timecode::{frames_as_seconds, frames_as_timecode};

use super::TrackSink;

/// Writes one row per confirmed track to the cut sheet (a file or
/// standard output), line-buffered, in the configured index format.
pub struct CutLogSink {
    out: Box<dyn Write>,
    desc: String,
    format: CutFormat,
    sample_rate: u32,
    with_names: bool,
}

impl CutLogSink {
    pub fn create(
        target: &CutsTarget,
        format: CutFormat,
        sample_rate: u32,
        with_names: bool,
        header: bool,
    ) -> Result<Self> {
        let desc = target.describe();
        let out: Box<dyn Write> = match target {
            CutsTarget::File(path) => Box::new(LineWriter::new(
                File::create(path)
                    .with_context(|| format!("unable to create cuts file `{desc}'"))?,
            )),
            CutsTarget::Stdout => Box::new(io::stdout()),
        };
        let mut sink = CutLogSink { out, desc, format, sample_rate, with_names };
        if header {
            sink.print_header()?;
        }
        info!("opened cuts file `{}'", sink.desc);
        Ok(sink)
    }

    fn print_header(&mut self) -> Result<()> {
        let (start, end, duration) = match self.format {
            CutFormat::FrameIndex => ("start_frame", "end_frame", "duration_frames"),
            CutFormat::TimeIndex => ("start_time", "end_time", "duration_time"),
            CutFormat::SecIndex => ("start_sec", "end_sec", "duration_secs"),
        };
        let name = if self.with_names { "name" } else { "" };
        writeln!(self.out, "track_num   {start:<16}{end:<16}{duration:<20}{name}")
            .with_context(|| format!("unable to write header to cuts file `{}'", self.desc))
    }
}

fn render_index(format: CutFormat, sample_rate: u32, frame_idx: u64) -> String {
    match format {
        CutFormat::FrameIndex => frame_idx.to_string(),
        CutFormat::TimeIndex => frames_as_timecode(frame_idx, sample_rate),
        CutFormat::SecIndex => frames_as_seconds(frame_idx, sample_rate),
    }
}

fn format_row(
    format: CutFormat,
    sample_rate: u32,
    track_num: u32,
    start_idx: u64,
    end_idx: u64,
    name: &str,
) -> String {
    let start = render_index(format, sample_rate, start_idx);
    let end = render_index(format, sample_rate, end_idx);
    let duration = render_index(format, sample_rate, end_idx - start_idx);
    format!("{track_num:>10}  {start:>14}  {end:>14}  {duration:>18}  {name}")
}

impl TrackSink for CutLogSink {
    fn on_begin(&mut self, _track_num: u32, _start_idx: u64, _name: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn on_frame(&mut self, _frame: &[f64]) -> Result<()> {
        Ok(())
    }

    fn on_end(
        &mut self,
        track_num: u32,
        start_idx: u64,
        end_idx: u64,
        name: Option<&str>,
    ) -> Result<()> {
        let row = format_row(
            self.format,
            self.sample_rate,
            track_num,
            start_idx,
            end_idx,
            name.unwrap_or(""),
        );
        writeln!(self.out, "{row}")
            .with_context(|| format!("unable to write entry to cuts file `{}'", self.desc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rows_use_plain_indices() {
        let row = format_row(CutFormat::FrameIndex, 48000, 1, 0, 2880000, "");
        assert_eq!(
            row,
            "         1               0         2880000             2880000  "
        );
    }

    #[test]
    fn time_rows_use_timecodes() {
        let row = format_row(CutFormat::TimeIndex, 48000, 2, 48000, 144000, "Song");
        assert_eq!(
            row,
            "         2   0:00:01.00000   0:00:03.00000       0:00:02.00000  Song"
        );
    }

    #[test]
    fn sec_rows_use_fractional_seconds() {
        let row = format_row(CutFormat::SecIndex, 44100, 3, 22050, 44100, "");
        assert_eq!(
            row,
            "         3         0.50000         1.00000             0.50000  "
        );
    }
}
