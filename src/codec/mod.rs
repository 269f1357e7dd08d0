// src/codec/mod.rs

pub mod raw;
pub mod reader;
pub mod writer;

use anyhow::Result;

use crate::config::{Config, MAX_CHANNELS};

/// Descriptor of a decoded audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: usize,
    /// Bit depth of the source samples, best effort for compressed inputs.
    pub bits_per_sample: u16,
    /// True when the source samples are floating point.
    pub float: bool,
}

/// Read side of the codec collaborator. Samples are delivered as
/// interleaved double-precision frames in [-1.0, +1.0].
pub trait AudioReader {
    fn spec(&self) -> StreamSpec;

    /// Repositions the stream so the next read starts at `frame_idx`.
    fn seek_to_frame(&mut self, frame_idx: u64) -> Result<()>;

    /// Fills `out` (a whole number of frames) with decoded samples.
    /// Returns the number of frames delivered; 0 means end of stream.
    fn read_frames(&mut self, out: &mut [f64]) -> Result<usize>;
}

/// One entry of the writable-container table.
pub struct OutputFormat {
    pub extension: &'static str,
    pub name: &'static str,
}

/// Containers the write side can produce.
pub const OUTPUT_FORMATS: &[OutputFormat] =
    &[OutputFormat { extension: "wav", name: "Microsoft WAV (RIFF)" }];

/// Maps an extension argument onto the writable-container table.
pub fn writable_extension(ext: &str) -> Option<&'static str> {
    OUTPUT_FORMATS
        .iter()
        .find(|f| f.extension.eq_ignore_ascii_case(ext))
        .map(|f| f.extension)
}

/// Extension used for extracted tracks given the configured output
/// format (or the input's container when unset).
pub fn track_extension(config: &Config) -> &'static str {
    match config.output_format.as_deref().and_then(writable_extension) {
        Some(ext) => ext,
        // Only WAV is writable; inputs in other containers extract to it.
        None => "wav",
    }
}

/// Opens the configured input, raw or container-probed.
pub fn open_input(config: &Config) -> Result<Box<dyn AudioReader>> {
    let reader: Box<dyn AudioReader> = match &config.raw {
        Some(spec) => Box::new(raw::RawReader::open(&config.input, *spec)?),
        None => Box::new(reader::DecodeReader::open(&config.input)?),
    };
    let spec = reader.spec();
    anyhow::ensure!(
        spec.channels >= 1 && spec.channels <= MAX_CHANNELS,
        "input `{}' has {} channels; at most {} are supported",
        config.input.describe(),
        spec.channels,
        MAX_CHANNELS
    );
    anyhow::ensure!(
        spec.sample_rate > 0,
        "input `{}' reports no sample rate",
        config.input.describe()
    );
    Ok(reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_is_the_writable_container() {
        assert_eq!(writable_extension("wav"), Some("wav"));
        assert_eq!(writable_extension("WAV"), Some("wav"));
        assert_eq!(writable_extension("flac"), None);
    }
}
