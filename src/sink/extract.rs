// src/sink/extract.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::info;

use crate::codec::writer::TrackWriter;
use crate::codec::StreamSpec;
use crate::timecode::frames_as_timecode;

use super::TrackSink;

/// Extracts each confirmed track to its own audio file in the target
/// directory. At most one writer is open at a time; it lives from
/// `on_begin` to `on_end`.
pub struct ExtractSink {
    dir: PathBuf,
    stream: StreamSpec,
    extension: &'static str,
    writer: Option<TrackWriter>,
    cur_path: PathBuf,
}

impl ExtractSink {
    pub fn new(dir: &Path, stream: StreamSpec, extension: &'static str) -> Result<Self> {
        let meta = std::fs::metadata(dir)
            .with_context(|| format!("unable to access track directory `{}'", dir.display()))?;
        if !meta.is_dir() {
            bail!("track directory `{}' is not a directory", dir.display());
        }
        Ok(ExtractSink {
            dir: dir.to_path_buf(),
            stream,
            extension,
            writer: None,
            cur_path: PathBuf::new(),
        })
    }
}

impl TrackSink for ExtractSink {
    fn on_begin(&mut self, track_num: u32, start_idx: u64, name: Option<&str>) -> Result<()> {
        let file_name = match name {
            Some(n) if !n.is_empty() => format!("{n}.{}", self.extension),
            _ => format!("{track_num:08}.{}", self.extension),
        };
        let path = self.dir.join(file_name);
        info!(
            "creating `{}' starting @ frame index {start_idx} ({})",
            path.display(),
            frames_as_timecode(start_idx, self.stream.sample_rate)
        );
        self.writer = Some(TrackWriter::create(&path, &self.stream)?);
        self.cur_path = path;
        Ok(())
    }

    fn on_frame(&mut self, frame: &[f64]) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            bail!("no track file is open");
        };
        writer
            .write_frame(frame)
            .with_context(|| format!("unable to write to output file `{}'", self.cur_path.display()))
    }

    fn on_end(
        &mut self,
        _track_num: u32,
        start_idx: u64,
        end_idx: u64,
        _name: Option<&str>,
    ) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().with_context(|| {
                format!("unable to finish output file `{}'", self.cur_path.display())
            })?;
            info!(
                "completed `{}' ending @ frame index {end_idx} ({}), duration {} frames ({})",
                self.cur_path.display(),
                frames_as_timecode(end_idx, self.stream.sample_rate),
                end_idx - start_idx,
                frames_as_timecode(end_idx - start_idx, self.stream.sample_rate)
            );
        }
        Ok(())
    }

    fn wants_frames(&self) -> bool {
        true
    }
}
