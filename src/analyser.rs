// src/analyser.rs

use std::io::Write;

use anyhow::{Context, Result};

use crate::config::{Config, MAX_CHANNELS};
use crate::detector::FrameFilter;
use crate::pipeline::Pipeline;
use crate::source::FrameStatus;

/// Whole-recording statistics gathered per channel while the pipeline
/// runs: windowed-RMS extremes and average, sample peaks, and the DC
/// estimate accumulated by the filter. Used to pick `--noise-floor`
/// and `--dc-offset` values for a cutting run.
struct Stats {
    channels: usize,
    window_len: usize,
    min_rms: [f64; MAX_CHANNELS],
    max_rms: [f64; MAX_CHANNELS],
    rms_sum: [f64; MAX_CHANNELS],
    pos_peak: [f64; MAX_CHANNELS],
    neg_peak: [f64; MAX_CHANNELS],
}

impl Stats {
    fn new(channels: usize, window_len: usize) -> Self {
        Stats {
            channels,
            window_len,
            min_rms: [f64::INFINITY; MAX_CHANNELS],
            max_rms: [0.0; MAX_CHANNELS],
            rms_sum: [0.0; MAX_CHANNELS],
            pos_peak: [f64::NEG_INFINITY; MAX_CHANNELS],
            neg_peak: [f64::INFINITY; MAX_CHANNELS],
        }
    }

    fn update(&mut self, filter: &FrameFilter, centre: &[f64]) {
        for c in 0..self.channels {
            let rms = (filter.sum_sq()[c] / self.window_len as f64).sqrt();
            self.rms_sum[c] += rms;
            self.min_rms[c] = self.min_rms[c].min(rms);
            self.max_rms[c] = self.max_rms[c].max(rms);
            self.pos_peak[c] = self.pos_peak[c].max(centre[c]);
            self.neg_peak[c] = self.neg_peak[c].min(centre[c]);
        }
    }
}

/// Converts a sample level into decibels full scale; zero maps to
/// negative infinity.
fn level_to_dbfs(x: f64) -> f64 {
    if x != 0.0 { 20.0 * x.abs().log10() } else { f64::NEG_INFINITY }
}

/// The analysis driver: same front end as the cutter, but every tick
/// only records statistics, and the report prints at end of input.
pub fn run(config: &Config) -> Result<()> {
    let mut pipeline = Pipeline::open(config)?;
    let spec = pipeline.spec();
    let mut stats = Stats::new(spec.channels, pipeline.params().window_len);

    loop {
        stats.update(pipeline.filter(), pipeline.centre());
        if pipeline.advance()? == FrameStatus::End {
            break;
        }
    }

    let frames_read = pipeline.frames_read().max(1);
    let frames_processed = pipeline.filter().frames_processed().max(1);
    let mut dc_offset = [0.0; MAX_CHANNELS];
    let mut avg_rms = [0.0; MAX_CHANNELS];
    for c in 0..spec.channels {
        dc_offset[c] = pipeline.filter().rej_total()[c] / frames_read as f64;
        avg_rms[c] = stats.rms_sum[c] / frames_processed as f64;
    }

    let stdout = std::io::stdout();
    print_report(&mut stdout.lock(), &stats, &dc_offset, &avg_rms)
        .context("unable to write analysis report")
}

fn print_report(
    out: &mut dyn Write,
    stats: &Stats,
    dc_offset: &[f64; MAX_CHANNELS],
    avg_rms: &[f64; MAX_CHANNELS],
) -> Result<()> {
    let channels = stats.channels;
    let map = |f: &dyn Fn(usize) -> f64| -> [f64; MAX_CHANNELS] {
        let mut out = [0.0; MAX_CHANNELS];
        for (c, slot) in out.iter_mut().enumerate().take(channels) {
            *slot = f(c);
        }
        out
    };
    let peak_dbfs = map(&|c| {
        level_to_dbfs(stats.pos_peak[c]).max(level_to_dbfs(stats.neg_peak[c]))
    });
    let min_rms_dbfs = map(&|c| level_to_dbfs(stats.min_rms[c]));
    let max_rms_dbfs = map(&|c| level_to_dbfs(stats.max_rms[c]));
    let avg_rms_dbfs = map(&|c| level_to_dbfs(avg_rms[c]));
    let dc_offset_dbfs = map(&|c| level_to_dbfs(dc_offset[c]));

    write!(out, "{:<20}", "statistic")?;
    match channels {
        1 => writeln!(out, "mono_channel")?,
        2 => writeln!(out, "{:>20}{:>20}", "left_channel", "right_channel")?,
        n => {
            for c in 0..n {
                write!(out, "channel_{c:<6}")?;
            }
            writeln!(out)?;
        }
    }

    print_row(out, channels, "positive_peak", Precision::Linear, &stats.pos_peak)?;
    print_row(out, channels, "negative_peak", Precision::Linear, &stats.neg_peak)?;
    print_row(out, channels, "peak_dbfs", Precision::Decibel, &peak_dbfs)?;
    print_row(out, channels, "min_rms", Precision::Linear, &stats.min_rms)?;
    print_row(out, channels, "max_rms", Precision::Linear, &stats.max_rms)?;
    print_row(out, channels, "avg_rms", Precision::Linear, avg_rms)?;
    print_row(out, channels, "min_rms_dbfs", Precision::Decibel, &min_rms_dbfs)?;
    print_row(out, channels, "max_rms_dbfs", Precision::Decibel, &max_rms_dbfs)?;
    print_row(out, channels, "avg_rms_dbfs", Precision::Decibel, &avg_rms_dbfs)?;
    print_row(out, channels, "dc_offset", Precision::Linear, dc_offset)?;
    print_row(out, channels, "dc_offset_dbfs", Precision::Decibel, &dc_offset_dbfs)?;

    // Ready-to-paste correction argument (negated estimates).
    let fix: Vec<String> =
        (0..channels).map(|c| format!("{:+.6}", -dc_offset[c])).collect();
    writeln!(out, "{:>20}  --dc-offset={}", "fix_dc_offset_arg", fix.join(","))?;
    Ok(())
}

enum Precision {
    Linear,
    Decibel,
}

fn print_row(
    out: &mut dyn Write,
    channels: usize,
    header: &str,
    precision: Precision,
    fields: &[f64; MAX_CHANNELS],
) -> Result<()> {
    write!(out, "{header:>20}")?;
    for &v in fields.iter().take(channels) {
        let s = match precision {
            Precision::Linear => format!("{v:+.15}"),
            Precision::Decibel => format!("{v:+.14}"),
        };
        write!(out, "{s:>20}")?;
    }
    writeln!(out)?;
    Ok(())
}
