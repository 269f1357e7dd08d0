// src/codec/writer.rs

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};

use super::StreamSpec;

/// WAV writer for one extracted track. Consumes interleaved `f64`
/// frames and stores them in the subtype closest to the input's.
pub struct TrackWriter {
    writer: WavWriter<BufWriter<File>>,
    spec: WavSpec,
}

/// Maps the input descriptor onto a subtype hound can store.
fn wav_spec_for(spec: &StreamSpec) -> WavSpec {
    let (bits, format) = if spec.float {
        // WAV float is 32-bit; 64-bit float inputs narrow.
        (32, SampleFormat::Float)
    } else {
        match spec.bits_per_sample {
            0..=8 => (8, SampleFormat::Int),
            9..=16 => (16, SampleFormat::Int),
            17..=24 => (24, SampleFormat::Int),
            _ => (32, SampleFormat::Int),
        }
    };
    WavSpec {
        channels: spec.channels as u16,
        sample_rate: spec.sample_rate,
        bits_per_sample: bits,
        sample_format: format,
    }
}

impl TrackWriter {
    pub fn create(path: &Path, stream: &StreamSpec) -> Result<Self> {
        let spec = wav_spec_for(stream);
        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("unable to create new track file `{}'", path.display()))?;
        Ok(TrackWriter { writer, spec })
    }

    pub fn write_frame(&mut self, frame: &[f64]) -> Result<()> {
        for &s in frame {
            let s = if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 };
            match (self.spec.sample_format, self.spec.bits_per_sample) {
                (SampleFormat::Float, _) => self.writer.write_sample(s as f32)?,
                (SampleFormat::Int, 8) => {
                    self.writer.write_sample(scale_int(s, 128.0) as i8)?
                }
                (SampleFormat::Int, 16) => {
                    self.writer.write_sample(scale_int(s, 32_768.0) as i16)?
                }
                (SampleFormat::Int, 24) => {
                    self.writer.write_sample(scale_int(s, 8_388_608.0) as i32)?
                }
                (SampleFormat::Int, _) => {
                    self.writer.write_sample(scale_int(s, 2_147_483_648.0) as i32)?
                }
            }
        }
        Ok(())
    }

    /// Writes the RIFF header sizes and closes the file.
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize().context("unable to finalize track file")?;
        Ok(())
    }
}

/// Scales a normalised sample to an integer subtype, saturating at
/// positive full scale (`+1.0` maps to `scale - 1`).
fn scale_int(s: f64, scale: f64) -> i64 {
    ((s * scale).round() as i64).clamp(-(scale as i64), scale as i64 - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_scaling_round_trips_decoder_values() {
        // A 16-bit sample decoded as k/32768 must encode back to k.
        for k in [-32768i64, -1, 0, 1, 12345, 32767] {
            let x = k as f64 / 32_768.0;
            assert_eq!(scale_int(x, 32_768.0), k);
        }
    }

    #[test]
    fn int_scaling_saturates_at_full_scale() {
        assert_eq!(scale_int(1.0, 32_768.0), 32_767);
        assert_eq!(scale_int(-1.0, 32_768.0), -32_768);
    }

    #[test]
    fn float_inputs_map_to_32_bit_float_wav() {
        let spec = StreamSpec { sample_rate: 48000, channels: 2, bits_per_sample: 64, float: true };
        let wav = wav_spec_for(&spec);
        assert_eq!(wav.bits_per_sample, 32);
        assert_eq!(wav.sample_format, SampleFormat::Float);
    }

    #[test]
    fn int_inputs_keep_their_depth() {
        let spec = StreamSpec { sample_rate: 44100, channels: 1, bits_per_sample: 24, float: false };
        let wav = wav_spec_for(&spec);
        assert_eq!(wav.bits_per_sample, 24);
        assert_eq!(wav.sample_format, SampleFormat::Int);
    }
}
