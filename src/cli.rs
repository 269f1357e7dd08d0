// src/cli.rs

use std::path::PathBuf;

use anyhow::{Context, Result, bail, ensure};
use clap::Parser;

use crate::codec;
use crate::config::{
    Config, CutAction, CutFormat, CutsTarget, InputSource, MAX_CHANNELS, NamesSource, Range,
    RawCoding, RawSpec, Task,
};
use crate::timecode::{parse_boundary, parse_timecode, split_range};

/// Divides an audio recording into multiple tracks delimited by silence.
#[derive(Parser, Debug)]
#[command(name = "tracksplit", version)]
#[command(about = "Divides an audio recording into multiple tracks delimited by silence")]
pub struct Cli {
    /// Search for track delimiters (default mode)
    #[arg(short = 'C', long, group = "mode")]
    pub cut: bool,

    /// Perform statistical analysis on FILE
    #[arg(short = 'a', long, group = "mode")]
    pub analyse: bool,

    /// Write track indices/durations to FILE (`-' = standard output)
    #[arg(short = 'o', long, value_name = "FILE", group = "action")]
    pub cuts_file: Option<String>,

    /// Extract tracks to individual files in DIR
    #[arg(short = 'd', long, value_name = "DIR", group = "action")]
    pub extract_dir: Option<PathBuf>,

    /// Text file containing track names, one per line (`-' = standard input)
    #[arg(short = 'i', long, value_name = "FILE")]
    pub track_names_file: Option<String>,

    /// Minimum period of silence that delimits tracks, in milliseconds
    #[arg(short = 's', long, value_name = "N", default_value_t = 2000,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub min_silence_period: u64,

    /// Minimum period of non-silence that signifies a new track, in milliseconds
    #[arg(short = 'n', long, value_name = "N", default_value_t = 100,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub min_signal_period: u64,

    /// Minimum length of each track, in seconds
    #[arg(short = 'l', long, value_name = "N", default_value_t = 40,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub min_track_length: u64,

    /// Noise floor separating signal from silence, in dBFS (negative)
    #[arg(short = 'S', long, value_name = "N", default_value_t = -48.0,
          allow_negative_numbers = true)]
    pub noise_floor: f64,

    /// Only process the input between two timecodes, `START-END`
    #[arg(short = 't', long, value_name = "S-E", group = "range")]
    pub time_range: Option<String>,

    /// Only process the input between two frame indices, `START-END`
    #[arg(short = 'I', long, value_name = "S-E", group = "range")]
    pub frame_range: Option<String>,

    /// Number tracks starting from A and stop after track B, `A-B`
    #[arg(short = 'T', long, value_name = "A-B")]
    pub track_range: Option<String>,

    /// Input recording is raw (headerless) audio
    #[arg(short = 'r', long)]
    pub raw: bool,

    /// Sampling rate of raw input, in Hz
    #[arg(short = 'R', long, value_name = "N", requires = "raw")]
    pub rate: Option<u32>,

    /// Channel count of raw input
    #[arg(short = 'c', long, value_name = "N", requires = "raw")]
    pub channels: Option<usize>,

    /// Bits per sample of raw input (8, 16, 24, 32 or 64)
    #[arg(short = 'b', long, value_name = "N", requires = "raw")]
    pub bits: Option<u32>,

    /// Raw samples are signed integers
    #[arg(short = 'x', long, requires = "raw", group = "coding")]
    pub signed: bool,

    /// Raw samples are unsigned integers (8-bit only)
    #[arg(short = 'u', long, requires = "raw", group = "coding")]
    pub unsigned: bool,

    /// Raw samples are floating point (32 or 64-bit)
    #[arg(short = 'X', long, requires = "raw", group = "coding")]
    pub floating_point: bool,

    /// Raw sample words are big-endian
    #[arg(short = 'E', long, requires = "raw", group = "endian")]
    pub big_endian: bool,

    /// Raw sample words are little-endian
    #[arg(short = 'e', long, requires = "raw", group = "endian")]
    pub little_endian: bool,

    /// DC offset correction per channel, comma-separated, each within [-1.0, +1.0]
    #[arg(short = 'D', long, value_name = "N,N,...", allow_hyphen_values = true)]
    pub dc_offset: Option<String>,

    /// Run the signal through a 20Hz high-pass filter before processing
    #[arg(short = 'H', long)]
    pub high_pass: bool,

    /// Print cut points and durations as frame indices
    #[arg(short = 'P', long, group = "cut_format")]
    pub print_frame_indices: bool,

    /// Print cut points and durations as hrs:min:sec timecodes (default)
    #[arg(short = 'p', long, group = "cut_format")]
    pub print_time_indices: bool,

    /// Print cut points and durations as absolute seconds
    #[arg(short = 'A', long, group = "cut_format")]
    pub print_sec_indices: bool,

    /// Suppress the header row in the cuts file
    #[arg(short = 'N', long)]
    pub no_cuts_file_header: bool,

    /// Container format for extracted tracks (defaults to the input's)
    #[arg(short = 'f', long, value_name = "EXT")]
    pub output_format: Option<String>,

    /// Chatty progress diagnostics on standard error
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Input recording (`-' = standard input)
    #[arg(value_name = "FILE")]
    pub file: String,
}

impl Cli {
    /// Validates the parsed surface into the immutable run configuration.
    pub fn into_config(self) -> Result<Config> {
        let task = if self.analyse { Task::Analyse } else { Task::Cut };
        let action =
            if self.extract_dir.is_some() { CutAction::ExtractTracks } else { CutAction::LogCuts };

        let input = match self.file.as_str() {
            "-" => InputSource::Stdin,
            path => InputSource::File(PathBuf::from(path)),
        };

        let cuts_target = match self.cuts_file.as_deref() {
            None | Some("-") => CutsTarget::Stdout,
            Some(path) => CutsTarget::File(PathBuf::from(path)),
        };

        let names = match self.track_names_file.as_deref() {
            None => None,
            Some("-") => Some(NamesSource::Stdin),
            Some(path) => Some(NamesSource::File(PathBuf::from(path))),
        };
        if input == InputSource::Stdin && names == Some(NamesSource::Stdin) {
            bail!("audio data and track names cannot both come from standard input");
        }

        ensure!(
            self.noise_floor < 0.0,
            "noise floor `{}' must be a negative real number",
            self.noise_floor
        );

        let range = if let Some(arg) = &self.time_range {
            let (start, end) = split_range(arg)?;
            let start = parse_timecode(start, 0.0)?;
            let end = parse_timecode(end, f64::INFINITY)?;
            ensure!(end >= start, "time range `{arg}' has end point before start");
            Range::Time { start, end }
        } else if let Some(arg) = &self.frame_range {
            let (start, end) = split_range(arg)?;
            let start = parse_boundary(start, 0)?;
            let end = parse_boundary(end, u64::MAX)?;
            ensure!(end >= start, "frame range `{arg}' has end point before start");
            Range::Frames { start, end }
        } else {
            Range::default()
        };

        let (track_num_start, track_num_end) = match &self.track_range {
            Some(arg) => {
                let (start, end) = split_range(arg)?;
                let start = parse_boundary(start, 1)?;
                let end = parse_boundary(end, u32::MAX as u64)?;
                ensure!(start >= 1, "track range `{arg}' must start from track 1 or later");
                ensure!(end >= start, "track range `{arg}' has end point before start");
                let start = u32::try_from(start)
                    .with_context(|| format!("track range `{arg}' is out of bounds"))?;
                (start, end.min(u32::MAX as u64) as u32)
            }
            None => (1, u32::MAX),
        };

        let dc_offset = match &self.dc_offset {
            Some(arg) => parse_dc_offsets(arg)?,
            None => [0.0; MAX_CHANNELS],
        };

        let raw = if self.raw { Some(self.raw_spec()?) } else { None };

        if let Some(ext) = &self.output_format {
            ensure!(
                codec::writable_extension(ext).is_some(),
                "unrecognised output file format extension: `{ext}'"
            );
        }

        let cut_format = if self.print_frame_indices {
            CutFormat::FrameIndex
        } else if self.print_sec_indices {
            CutFormat::SecIndex
        } else {
            CutFormat::TimeIndex
        };

        Ok(Config {
            task,
            action,
            input,
            raw,
            cuts_target,
            extract_dir: self.extract_dir,
            names,
            cut_format,
            min_silence_ms: self.min_silence_period,
            min_signal_ms: self.min_signal_period,
            min_track_secs: self.min_track_length,
            noise_floor_dbfs: self.noise_floor,
            range,
            track_num_start,
            track_num_end,
            dc_offset,
            high_pass: self.high_pass,
            no_cuts_header: self.no_cuts_file_header,
            output_format: self.output_format,
        })
    }

    /// Raw parameters must be complete and one of the validated
    /// rate/bits/coding combinations; nothing is presumed.
    fn raw_spec(&self) -> Result<RawSpec> {
        let sample_rate = self.rate.context("raw input requires --rate")?;
        ensure!(sample_rate > 0, "raw sampling rate must be positive");
        let channels = self.channels.context("raw input requires --channels")?;
        ensure!(
            (1..=MAX_CHANNELS).contains(&channels),
            "raw channel count `{channels}' must be between 1 and {MAX_CHANNELS}"
        );
        let bits = self.bits.context("raw input requires --bits")?;

        let coding = if self.unsigned {
            match bits {
                8 => RawCoding::U8,
                _ => bail!("unsigned raw samples must be 8-bit"),
            }
        } else if self.signed {
            match bits {
                8 => RawCoding::I8,
                16 => RawCoding::I16,
                24 => RawCoding::I24,
                32 => RawCoding::I32,
                _ => bail!("signed raw samples must be 8, 16, 24 or 32-bit"),
            }
        } else if self.floating_point {
            match bits {
                32 => RawCoding::F32,
                64 => RawCoding::F64,
                _ => bail!("floating point raw samples must be 32 or 64-bit"),
            }
        } else {
            bail!("raw input requires one of --signed, --unsigned or --floating-point");
        };

        let little_endian = if coding.bytes_per_sample() == 1 {
            true
        } else if self.little_endian {
            true
        } else if self.big_endian {
            false
        } else {
            bail!("raw input wider than 8 bits requires --little-endian or --big-endian");
        };

        Ok(RawSpec { sample_rate, channels, coding, little_endian })
    }
}

fn parse_dc_offsets(arg: &str) -> Result<[f64; MAX_CHANNELS]> {
    let mut offsets = [0.0; MAX_CHANNELS];
    let values: Vec<&str> = arg.split(',').collect();
    ensure!(
        values.len() <= MAX_CHANNELS,
        "at most {MAX_CHANNELS} DC offset values may be given"
    );
    for (c, value) in values.iter().enumerate() {
        let v: f64 = value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("DC offset value `{value}' is non-numeric"))?;
        ensure!(
            (-1.0..=1.0).contains(&v),
            "DC offset value `{v}' is outside [-1.0, +1.0]"
        );
        offsets[c] = v;
    }
    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config> {
        let mut argv = vec!["tracksplit"];
        argv.extend(args);
        argv.push("capture.wav");
        Cli::try_parse_from(argv)
            .map_err(anyhow::Error::from)
            .and_then(Cli::into_config)
    }

    #[test]
    fn defaults_match_the_documented_surface() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.task, Task::Cut);
        assert_eq!(config.action, CutAction::LogCuts);
        assert_eq!(config.cuts_target, CutsTarget::Stdout);
        assert_eq!(config.cut_format, CutFormat::TimeIndex);
        assert_eq!(config.min_silence_ms, 2000);
        assert_eq!(config.min_signal_ms, 100);
        assert_eq!(config.min_track_secs, 40);
        assert_eq!(config.noise_floor_dbfs, -48.0);
        assert_eq!(config.track_num_start, 1);
        assert_eq!(config.track_num_end, u32::MAX);
        assert!(!config.high_pass);
    }

    #[test]
    fn rejects_non_negative_noise_floor() {
        assert!(parse(&["--noise-floor=0"]).is_err());
        assert!(parse(&["--noise-floor=6"]).is_err());
        assert!(parse(&["--noise-floor=-30.5"]).is_ok());
    }

    #[test]
    fn rejects_non_positive_periods() {
        assert!(parse(&["--min-silence-period=0"]).is_err());
        assert!(parse(&["--min-signal-period=0"]).is_err());
        assert!(parse(&["--min-track-length=0"]).is_err());
    }

    #[test]
    fn parses_time_and_frame_ranges() {
        let config = parse(&["--time-range=1:30-2:00"]).unwrap();
        assert_eq!(config.range, Range::Time { start: 90.0, end: 120.0 });
        let config = parse(&["--frame-range=1000-"]).unwrap();
        assert_eq!(config.range, Range::Frames { start: 1000, end: u64::MAX });
        assert!(parse(&["--time-range=2:00-1:30"]).is_err());
        assert!(parse(&["--frame-range=500-100"]).is_err());
    }

    #[test]
    fn time_and_frame_ranges_are_mutually_exclusive() {
        assert!(parse(&["--time-range=0-10", "--frame-range=0-10"]).is_err());
    }

    #[test]
    fn parses_track_ranges() {
        let config = parse(&["--track-range=3-7"]).unwrap();
        assert_eq!((config.track_num_start, config.track_num_end), (3, 7));
        let config = parse(&["--track-range=-5"]).unwrap();
        assert_eq!((config.track_num_start, config.track_num_end), (1, 5));
        assert!(parse(&["--track-range=0-5"]).is_err());
        assert!(parse(&["--track-range=7-3"]).is_err());
    }

    #[test]
    fn parses_dc_offsets_per_channel() {
        let config = parse(&["--dc-offset=0.01,-0.02"]).unwrap();
        assert_eq!(config.dc_offset[0], 0.01);
        assert_eq!(config.dc_offset[1], -0.02);
        assert_eq!(config.dc_offset[2], 0.0);
        assert!(parse(&["--dc-offset=1.5"]).is_err());
        assert!(parse(&["--dc-offset=abc"]).is_err());
        assert!(parse(&["--dc-offset=0,0,0,0,0,0,0,0,0"]).is_err());
    }

    #[test]
    fn raw_parameters_must_be_complete_and_valid() {
        let config = parse(&[
            "--raw", "--rate=44100", "--channels=2", "--bits=16", "--signed",
            "--little-endian",
        ])
        .unwrap();
        let raw = config.raw.unwrap();
        assert_eq!(raw.sample_rate, 44100);
        assert_eq!(raw.channels, 2);
        assert_eq!(raw.coding, RawCoding::I16);
        assert!(raw.little_endian);

        // Missing parameters and invalid combinations are rejected.
        assert!(parse(&["--raw", "--channels=2", "--bits=16", "--signed", "-e"]).is_err());
        assert!(parse(&["--raw", "--rate=44100", "--channels=2", "--bits=16"]).is_err());
        assert!(
            parse(&["--raw", "--rate=44100", "--channels=2", "--bits=16", "--unsigned", "-e"])
                .is_err()
        );
        assert!(
            parse(&["--raw", "--rate=44100", "--channels=2", "--bits=16", "--floating-point", "-e"])
                .is_err()
        );
        assert!(
            parse(&["--raw", "--rate=44100", "--channels=2", "--bits=16", "--signed"]).is_err()
        );
        assert!(parse(&["--raw", "--rate=44100", "--channels=9", "--bits=16", "--signed", "-e"])
            .is_err());
    }

    #[test]
    fn raw_flags_require_raw_mode() {
        assert!(parse(&["--rate=44100"]).is_err());
        assert!(parse(&["--signed"]).is_err());
    }

    #[test]
    fn eight_bit_raw_needs_no_endianness() {
        let config =
            parse(&["--raw", "--rate=8000", "--channels=1", "--bits=8", "--unsigned"]).unwrap();
        assert_eq!(config.raw.unwrap().coding, RawCoding::U8);
    }

    #[test]
    fn validates_output_format_against_the_writable_table() {
        assert!(parse(&["--output-format=wav"]).is_ok());
        assert!(parse(&["--output-format=xyz"]).is_err());
    }

    #[test]
    fn stdin_cannot_feed_both_audio_and_names() {
        let argv = ["tracksplit", "--track-names-file=-", "-"];
        let err = Cli::try_parse_from(argv)
            .map_err(anyhow::Error::from)
            .and_then(Cli::into_config);
        assert!(err.is_err());
    }

    #[test]
    fn cut_format_flags_select_the_rendering() {
        assert_eq!(parse(&["-P"]).unwrap().cut_format, CutFormat::FrameIndex);
        assert_eq!(parse(&["-A"]).unwrap().cut_format, CutFormat::SecIndex);
        assert_eq!(parse(&["-p"]).unwrap().cut_format, CutFormat::TimeIndex);
        assert!(parse(&["-P", "-A"]).is_err());
    }

    #[test]
    fn extraction_mode_is_selected_by_the_directory_option() {
        let config = parse(&["--extract-dir=out"]).unwrap();
        assert_eq!(config.action, CutAction::ExtractTracks);
        assert_eq!(config.extract_dir.as_deref(), Some(std::path::Path::new("out")));
        assert!(parse(&["--extract-dir=out", "--cuts-file=cuts.txt"]).is_err());
    }
}
