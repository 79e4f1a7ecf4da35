//! Parsing of prober reports and transcoder progress.

use std::collections::HashMap;
use std::time::Duration;

use regex::Regex;

use super::quality::{Bitrate, Channels, Format, Samplerate};
use crate::error::{Error, Result};

/// Arguments for a quiet probe of the first audio stream read from stdin.
pub(crate) fn probe_args() -> Vec<String> {
    crate::process::args([
        "-v",
        "quiet",
        "-select_streams",
        "a:0",
        "-show_entries",
        "format=bit_rate,duration:stream=sample_rate,channels,codec_name",
        "-",
    ])
}

/// Flat `key=value` view of a probe report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    values: HashMap<String, String>,
}

impl ProbeReport {
    /// Parse every `key=value` line; section markers are ignored and a
    /// repeated key keeps its last value.
    #[must_use]
    pub fn parse(report: &str) -> Self {
        let Ok(re) = Regex::new(r"(\w+)=(.+)") else {
            return Self::default();
        };
        let values = re
            .captures_iter(report)
            .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
            .collect();
        Self { values }
    }

    /// Raw value of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldLookup`] if the probe did not report it.
    pub fn get(&self, key: &str) -> Result<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Error::field_lookup(key))
    }

    fn number(&self, key: &str) -> Result<i64> {
        let raw = self.get(key)?;
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v as i64)
            .ok_or_else(|| Error::unexpected(key, raw))
    }

    /// Overall bitrate.
    pub fn bitrate(&self) -> Result<Bitrate> {
        Bitrate::from_bits_per_second(self.number("bit_rate")?)
    }

    /// Sample rate of the audio stream.
    pub fn samplerate(&self) -> Result<Samplerate> {
        Samplerate::new(self.number("sample_rate")?)
    }

    /// Channel layout of the audio stream.
    pub fn channels(&self) -> Result<Channels> {
        Channels::from_count(self.number("channels")?)
    }

    /// Container format derived from the stream codec.
    pub fn format(&self) -> Result<Format> {
        Format::from_codec(self.get("codec_name")?)
    }

    /// Container duration, if the prober could tell.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.get("duration")
            .ok()
            .and_then(|raw| raw.parse::<f64>().ok())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

/// Last `time=HH:MM:SS.ss` position reported by a decode pass.
#[must_use]
pub fn progress_duration(stderr: &str) -> Option<Duration> {
    let re = Regex::new(r"time=(\d+):(\d+):(\d+(?:\.\d+)?)").ok()?;
    let caps = re.captures_iter(stderr).last()?;
    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Duration::try_from_secs_f64(((hours * 60 + minutes) * 60) as f64 + seconds).ok()
}
