// src/names.rs

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use anyhow::{Context, Result};
use log::info;

use crate::config::NamesSource;

/// Side channel supplying one name per confirmed track, read lazily
/// from a list file (or stdin), one line each. Once the list runs out
/// it stays closed: later tracks are numbered, never named.
pub struct TrackNames {
    reader: Option<Box<dyn BufRead>>,
    desc: String,
}

impl TrackNames {
    /// The no-names-file case; every fetch yields `None`.
    pub fn absent() -> Self {
        TrackNames { reader: None, desc: String::new() }
    }

    /// Opens the configured source and discards `skip` leading entries
    /// (tracks before the requested starting track number). A list
    /// exhausted during the skip is treated as absent.
    pub fn open(source: &NamesSource, skip: u32) -> Result<Self> {
        let desc = source.describe();
        let reader: Box<dyn BufRead> = match source {
            NamesSource::File(path) => Box::new(BufReader::new(
                File::open(path)
                    .with_context(|| format!("unable to open track names file `{desc}'"))?,
            )),
            NamesSource::Stdin => Box::new(BufReader::new(io::stdin())),
        };
        info!("opened track names file `{desc}'");
        Self::from_reader(reader, skip, desc)
    }

    pub fn from_reader(reader: Box<dyn BufRead>, skip: u32, desc: String) -> Result<Self> {
        let mut names = TrackNames { reader: Some(reader), desc };
        for _ in 0..skip {
            if names.next_name()?.is_none() {
                break;
            }
        }
        Ok(names)
    }

    /// The next track name, trailing whitespace (and newline) trimmed.
    /// `None` once the list is exhausted, permanently.
    pub fn next_name(&mut self) -> Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .with_context(|| format!("unable to read track names file `{}'", self.desc))?;
        if n == 0 {
            self.reader = None;
            return Ok(None);
        }
        line.truncate(line.trim_end().len());
        Ok(Some(line))
    }
}
