// src/timecode.rs

use anyhow::{Result, bail};

/// Renders a frame index as `H:MM:SS.sssss`. Five fractional digits is
/// enough precision for sampling rates up to 100kHz.
pub fn frames_as_timecode(frame_idx: u64, sample_rate: u32) -> String {
    let rate = sample_rate as u64;
    let sec = (frame_idx as f64 / sample_rate as f64) % 60.0;
    let whole_sec = sec.floor() as u64;
    let frac_sec = ((sec * 100_000.0).floor() % 100_000.0) as u64;
    let min = (frame_idx / rate / 60) % 60;
    let hrs = frame_idx / rate / 3600;
    format!("{hrs}:{min:02}:{whole_sec:02}.{frac_sec:05}")
}

/// Renders a frame index as absolute seconds with five fractional digits.
pub fn frames_as_seconds(frame_idx: u64, sample_rate: u32) -> String {
    format!("{:2.5}", frame_idx as f64 / sample_rate as f64)
}

/// Parses a timecode into absolute seconds. Accepts `H:M:S.s`, `M:S.s`
/// or bare seconds; minutes and seconds may exceed 59 and carry over.
/// An empty (or all-whitespace) string yields `default`.
pub fn parse_timecode(s: &str, default: f64) -> Result<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(default);
    }
    let fields: Vec<&str> = s.split(':').collect();
    let seconds = match fields.as_slice() {
        [h, m, sec] => {
            let h: u32 = h.parse().map_err(|_| malformed(s))?;
            let m: u32 = m.parse().map_err(|_| malformed(s))?;
            let sec: f64 = parse_seconds_field(sec).ok_or_else(|| malformed(s))?;
            sec + m as f64 * 60.0 + h as f64 * 3600.0
        }
        [m, sec] => {
            let m: u32 = m.parse().map_err(|_| malformed(s))?;
            let sec: f64 = parse_seconds_field(sec).ok_or_else(|| malformed(s))?;
            sec + m as f64 * 60.0
        }
        [sec] => parse_seconds_field(sec).ok_or_else(|| malformed(s))?,
        _ => return Err(malformed(s)),
    };
    Ok(seconds)
}

fn parse_seconds_field(s: &str) -> Option<f64> {
    let v: f64 = s.parse().ok()?;
    (v >= 0.0).then_some(v)
}

fn malformed(s: &str) -> anyhow::Error {
    anyhow::anyhow!("timecode `{s}' is malformed")
}

/// Splits a range argument at its single hyphen. Omitted endpoints come
/// back as empty strings for the caller to default.
pub fn split_range(arg: &str) -> Result<(&str, &str)> {
    let Some(pos) = arg.find('-') else {
        bail!("range `{arg}' must be two bounds separated by a hyphen");
    };
    if arg.rfind('-') != Some(pos) {
        bail!("range `{arg}' must contain exactly one hyphen");
    }
    Ok((&arg[..pos], &arg[pos + 1..]))
}

/// Parses one integer range boundary; empty means `default`.
pub fn parse_boundary(s: &str, default: u64) -> Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(default);
    }
    s.parse()
        .map_err(|_| anyhow::anyhow!("range boundary `{s}' must be a non-negative integer"))
}
