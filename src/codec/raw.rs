// src/codec/raw.rs

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};

use anyhow::{Context, Result, bail};

use crate::config::{InputSource, RawCoding, RawSpec};

use super::{AudioReader, StreamSpec};

enum RawStream {
    File(BufReader<File>),
    Stdin(io::Stdin),
}

/// Reader for headerless PCM input. All stream parameters are
/// caller-supplied; nothing is probed.
pub struct RawReader {
    stream: RawStream,
    spec: RawSpec,
    bytes: Vec<u8>,
}

impl RawReader {
    pub fn open(input: &InputSource, spec: RawSpec) -> Result<Self> {
        let stream = match input {
            InputSource::File(path) => {
                let file = File::open(path)
                    .with_context(|| format!("unable to open `{}'", path.display()))?;
                RawStream::File(BufReader::new(file))
            }
            InputSource::Stdin => RawStream::Stdin(io::stdin()),
        };
        Ok(RawReader { stream, spec, bytes: Vec::new() })
    }

    fn frame_bytes(&self) -> usize {
        self.spec.coding.bytes_per_sample() * self.spec.channels
    }

    /// Reads until `buf` is full or the stream ends; returns bytes read.
    fn read_full(&mut self, mut buf: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while !buf.is_empty() {
            let n = match &mut self.stream {
                RawStream::File(f) => f.read(buf),
                RawStream::Stdin(s) => s.read(buf),
            };
            match n {
                Ok(0) => break,
                Ok(n) => {
                    total += n;
                    buf = &mut buf[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("error while reading raw input"),
            }
        }
        Ok(total)
    }
}

impl AudioReader for RawReader {
    fn spec(&self) -> StreamSpec {
        StreamSpec {
            sample_rate: self.spec.sample_rate,
            channels: self.spec.channels,
            bits_per_sample: self.spec.coding.bits(),
            float: self.spec.coding.is_float(),
        }
    }

    fn seek_to_frame(&mut self, frame_idx: u64) -> Result<()> {
        let byte_pos = frame_idx * self.frame_bytes() as u64;
        match &mut self.stream {
            RawStream::File(f) => {
                f.seek(SeekFrom::Start(byte_pos))
                    .with_context(|| format!("unable to reposition raw input to frame {frame_idx}"))?;
            }
            RawStream::Stdin(s) => {
                // No random access on a pipe; discard up to the start point.
                let skipped = io::copy(&mut s.take(byte_pos), &mut io::sink())
                    .context("error while skipping raw input")?;
                if skipped < byte_pos {
                    bail!("unable to reposition raw input to frame {frame_idx}: stream too short");
                }
            }
        }
        Ok(())
    }

    fn read_frames(&mut self, out: &mut [f64]) -> Result<usize> {
        let frame_bytes = self.frame_bytes();
        let want_frames = out.len() / self.spec.channels;
        self.bytes.resize(want_frames * frame_bytes, 0);
        let mut scratch = std::mem::take(&mut self.bytes);
        let got = self.read_full(&mut scratch)?;
        self.bytes = scratch;
        // A trailing partial frame is dropped as end of stream.
        let frames = got / frame_bytes;
        let coding = self.spec.coding;
        let le = self.spec.little_endian;
        for (i, slot) in out[..frames * self.spec.channels].iter_mut().enumerate() {
            let at = i * coding.bytes_per_sample();
            *slot = decode_sample(coding, le, &self.bytes[at..at + coding.bytes_per_sample()]);
        }
        Ok(frames)
    }
}

fn decode_sample(coding: RawCoding, little_endian: bool, b: &[u8]) -> f64 {
    match coding {
        RawCoding::U8 => (b[0] as f64 - 128.0) / 128.0,
        RawCoding::I8 => (b[0] as i8) as f64 / 128.0,
        RawCoding::I16 => {
            let v = if little_endian {
                i16::from_le_bytes([b[0], b[1]])
            } else {
                i16::from_be_bytes([b[0], b[1]])
            };
            v as f64 / 32768.0
        }
        RawCoding::I24 => {
            // Sign-extend 24 bits through the top byte of an i32.
            let v = if little_endian {
                i32::from_le_bytes([0, b[0], b[1], b[2]])
            } else {
                i32::from_be_bytes([b[0], b[1], b[2], 0])
            } >> 8;
            v as f64 / 8_388_608.0
        }
        RawCoding::I32 => {
            let v = if little_endian {
                i32::from_le_bytes([b[0], b[1], b[2], b[3]])
            } else {
                i32::from_be_bytes([b[0], b[1], b[2], b[3]])
            };
            v as f64 / 2_147_483_648.0
        }
        RawCoding::F32 => {
            let v = if little_endian {
                f32::from_le_bytes([b[0], b[1], b[2], b[3]])
            } else {
                f32::from_be_bytes([b[0], b[1], b[2], b[3]])
            };
            v as f64
        }
        RawCoding::F64 => {
            let arr = [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]];
            if little_endian { f64::from_le_bytes(arr) } else { f64::from_be_bytes(arr) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_signed_16_bit() {
        assert_eq!(decode_sample(RawCoding::I16, true, &[0x00, 0x40]), 0.5);
        assert_eq!(decode_sample(RawCoding::I16, false, &[0x40, 0x00]), 0.5);
        assert_eq!(decode_sample(RawCoding::I16, true, &[0x00, 0x80]), -1.0);
    }

    #[test]
    fn decodes_unsigned_8_bit() {
        assert_eq!(decode_sample(RawCoding::U8, true, &[128]), 0.0);
        assert_eq!(decode_sample(RawCoding::U8, true, &[0]), -1.0);
    }

    #[test]
    fn decodes_24_bit_with_sign_extension() {
        assert_eq!(decode_sample(RawCoding::I24, true, &[0x00, 0x00, 0x40]), 0.5);
        assert_eq!(decode_sample(RawCoding::I24, true, &[0xff, 0xff, 0xff]), -1.0 / 8_388_608.0);
        assert_eq!(decode_sample(RawCoding::I24, false, &[0x40, 0x00, 0x00]), 0.5);
    }

    #[test]
    fn decodes_floats() {
        let bytes = 0.25f32.to_le_bytes();
        assert_eq!(decode_sample(RawCoding::F32, true, &bytes), 0.25);
        let bytes = (-0.125f64).to_be_bytes();
        assert_eq!(decode_sample(RawCoding::F64, false, &bytes), -0.125);
    }
}
