// src/codec/reader.rs

use std::fs::File;
use std::io;

use anyhow::{Context, Result, anyhow};
use log::warn;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::SampleFormat;
use symphonia::core::units::{Time, TimeBase};
use symphonia::default::{get_codecs, get_probe};

use crate::config::InputSource;

use super::{AudioReader, StreamSpec};

/// Container-probed reader delivering interleaved `f64` frames.
pub struct DecodeReader {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    spec: StreamSpec,
    time_base: Option<TimeBase>,
    desc: String,
    sample_buf: Option<SampleBuffer<f64>>,
    pending: Vec<f64>,
    pending_pos: usize,
    skip_frames: u64,
    eof: bool,
}

impl DecodeReader {
    pub fn open(input: &InputSource) -> Result<Self> {
        let desc = input.describe();
        let mut hint = Hint::new();
        let mss = match input {
            InputSource::File(path) => {
                if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                    hint.with_extension(ext);
                }
                let file = File::open(path)
                    .with_context(|| format!("unable to open `{}'", path.display()))?;
                MediaSourceStream::new(Box::new(file), Default::default())
            }
            InputSource::Stdin => MediaSourceStream::new(
                Box::new(ReadOnlySource::new(io::stdin())),
                Default::default(),
            ),
        };

        let probed = get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .with_context(|| format!("unable to identify file structure of `{desc}'"))?;
        let format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| anyhow!("`{desc}' contains no audio track"))?;
        let track_id = track.id;
        let params = &track.codec_params;

        let float = matches!(params.sample_format, Some(SampleFormat::F32 | SampleFormat::F64));
        let mut bits = params.bits_per_sample.unwrap_or(16) as u16;
        if float && bits < 32 {
            bits = 32;
        }
        let spec = StreamSpec {
            sample_rate: params.sample_rate.unwrap_or(0),
            channels: params.channels.map(|c| c.count()).unwrap_or(0),
            bits_per_sample: bits,
            float,
        };
        let time_base = params.time_base;

        let decoder = get_codecs()
            .make(params, &DecoderOptions::default())
            .with_context(|| format!("no decoder available for `{desc}'"))?;

        Ok(DecodeReader {
            format,
            decoder,
            track_id,
            spec,
            time_base,
            desc,
            sample_buf: None,
            pending: Vec::new(),
            pending_pos: 0,
            skip_frames: 0,
            eof: false,
        })
    }

    /// Decodes packets until samples are pending; false means end of stream.
    fn refill(&mut self) -> Result<bool> {
        let channels = self.spec.channels;
        loop {
            if self.eof {
                return Ok(false);
            }
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::ResetRequired) => {
                    self.eof = true;
                    return Ok(false);
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.eof = true;
                    return Ok(false);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("error while reading `{}'", self.desc));
                }
            };
            if packet.track_id() != self.track_id {
                continue;
            }
            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    if self.sample_buf.is_none() {
                        let capacity = decoded.capacity() as u64;
                        self.sample_buf = Some(SampleBuffer::<f64>::new(capacity, *decoded.spec()));
                    }
                    let buf = self.sample_buf.as_mut().unwrap();
                    buf.copy_interleaved_ref(decoded);
                    self.pending.clear();
                    self.pending.extend_from_slice(buf.samples());
                    self.pending_pos = 0;
                    if self.skip_frames > 0 {
                        let avail_frames = (self.pending.len() / channels) as u64;
                        if self.skip_frames >= avail_frames {
                            self.skip_frames -= avail_frames;
                            continue;
                        }
                        self.pending_pos = self.skip_frames as usize * channels;
                        self.skip_frames = 0;
                    }
                    if self.pending_pos < self.pending.len() {
                        return Ok(true);
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("skipping undecodable packet in `{}': {e}", self.desc);
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.eof = true;
                    return Ok(false);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("error while decoding `{}'", self.desc));
                }
            }
        }
    }
}

impl AudioReader for DecodeReader {
    fn spec(&self) -> StreamSpec {
        self.spec
    }

    fn seek_to_frame(&mut self, frame_idx: u64) -> Result<()> {
        let rate = self.spec.sample_rate as u64;
        let time = Time::new(frame_idx / rate, (frame_idx % rate) as f64 / rate as f64);
        let seeked = self
            .format
            .seek(SeekMode::Accurate, SeekTo::Time { time, track_id: Some(self.track_id) })
            .with_context(|| {
                format!("unable to reposition `{}' to frame {frame_idx}", self.desc)
            })?;
        self.decoder.reset();
        self.pending.clear();
        self.pending_pos = 0;
        self.eof = false;
        // Accurate seeks may land on a packet boundary before the target;
        // drop the difference so the next read starts exactly there.
        let landed = match self.time_base {
            Some(tb) => {
                let t = tb.calc_time(seeked.actual_ts);
                t.seconds * rate + (t.frac * rate as f64).round() as u64
            }
            None => seeked.actual_ts,
        };
        if landed > frame_idx {
            warn!("seek in `{}' overshot frame {frame_idx} (landed on {landed})", self.desc);
        }
        self.skip_frames = frame_idx.saturating_sub(landed);
        Ok(())
    }

    fn read_frames(&mut self, out: &mut [f64]) -> Result<usize> {
        let channels = self.spec.channels;
        let mut filled = 0;
        while filled < out.len() {
            if self.pending_pos >= self.pending.len() && !self.refill()? {
                break;
            }
            let n = (out.len() - filled).min(self.pending.len() - self.pending_pos);
            out[filled..filled + n]
                .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
            filled += n;
            self.pending_pos += n;
        }
        Ok(filled / channels)
    }
}
