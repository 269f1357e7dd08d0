// src/cutter.rs

use anyhow::{Result, bail};
use log::info;

use crate::codec;
use crate::config::{Config, CutAction};
use crate::detector::{LeadInBuf, Segmenter};
use crate::names::TrackNames;
use crate::pipeline::Pipeline;
use crate::sink::{CutLogSink, ExtractSink, TrackSink};
use crate::source::FrameStatus;
use crate::timecode::frames_as_timecode;

/// The cutting driver: primes the pipeline, then per tick feeds the
/// centre-frame verdict to the segmentation machine and admits one more
/// frame, until the input (or the requested track range) runs out.
pub fn run(config: &Config) -> Result<()> {
    let mut pipeline = Pipeline::open(config)?;
    let spec = pipeline.spec();
    let params = *pipeline.params();
    info!("minimum silence period is {} frames", params.min_silence_len);
    info!("minimum signal period is {} frames", params.min_signal_len);
    info!("minimum track length is {} frames", params.min_track_len);

    let names = match &config.names {
        Some(source) => TrackNames::open(source, config.track_num_start.saturating_sub(1))?,
        None => TrackNames::absent(),
    };

    let leadin = match config.action {
        CutAction::ExtractTracks => {
            info!("lead-in buffer is {} frames", params.min_signal_len);
            Some(LeadInBuf::new(params.min_signal_len as usize, spec.channels))
        }
        CutAction::LogCuts => None,
    };

    let mut sink: Box<dyn TrackSink> = match config.action {
        CutAction::LogCuts => Box::new(CutLogSink::create(
            &config.cuts_target,
            config.cut_format,
            spec.sample_rate,
            config.names.is_some(),
            !config.no_cuts_header,
        )?),
        CutAction::ExtractTracks => {
            let Some(dir) = &config.extract_dir else {
                bail!("extraction requested but no track directory configured");
            };
            Box::new(ExtractSink::new(dir, spec, codec::track_extension(config))?)
        }
    };

    let mut machine =
        Segmenter::new(&params, spec.sample_rate, config.track_num_start, names, leadin);

    loop {
        machine.tick(
            pipeline.is_signal(),
            pipeline.centre_idx(),
            pipeline.centre(),
            sink.as_mut(),
        )?;
        let status = pipeline.advance()?;
        if status == FrameStatus::End || machine.track_num() > config.track_num_end {
            break;
        }
    }

    if pipeline.range_exhausted() {
        info!(
            "end of input reached at frame {} ({}); exiting",
            pipeline.centre_idx(),
            frames_as_timecode(pipeline.centre_idx(), spec.sample_rate)
        );
        machine.finish(pipeline.centre_idx(), sink.as_mut())?;
    } else {
        info!("no more tracks remaining; exiting");
    }
    Ok(())
}
