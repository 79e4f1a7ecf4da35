//! Validated audio parameters.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationError};

/// Target or measured bitrate in kilobits per second.
///
/// `Unbounded` means "best available" and orders above every finite rate.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Bitrate {
    /// A finite rate.
    Kbps(NonZeroU32),
    /// No limit.
    #[default]
    Unbounded,
}

impl Bitrate {
    /// Create a finite bitrate.
    ///
    /// # Errors
    ///
    /// Returns a validation error for zero, negative or oversized values.
    pub fn new(kbps: i64) -> Result<Self> {
        u32::try_from(kbps)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self::Kbps)
            .ok_or_else(|| ValidationError::Bitrate(kbps).into())
    }

    /// Convert a bits-per-second figure, truncating to whole kbps.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the result is not positive.
    pub fn from_bits_per_second(bps: i64) -> Result<Self> {
        Self::new(bps / 1000)
    }

    /// The finite rate, if any.
    #[must_use]
    pub const fn kbps(self) -> Option<u32> {
        match self {
            Self::Kbps(kbps) => Some(kbps.get()),
            Self::Unbounded => None,
        }
    }

    /// Encoder argument (`128k`).
    ///
    /// # Errors
    ///
    /// Returns a validation error for [`Bitrate::Unbounded`].
    pub fn encoder_arg(self) -> Result<String> {
        match self {
            Self::Kbps(kbps) => Ok(format!("{kbps}k")),
            Self::Unbounded => Err(ValidationError::UnboundedBitrate.into()),
        }
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kbps(kbps) => write!(f, "{kbps}k"),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Sample rate in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Samplerate(NonZeroU32);

impl Samplerate {
    /// Create a sample rate.
    ///
    /// # Errors
    ///
    /// Returns a validation error for zero, negative or oversized values.
    pub fn new(hz: i64) -> Result<Self> {
        u32::try_from(hz)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or_else(|| ValidationError::Samplerate(hz).into())
    }

    /// Rate in Hz.
    #[must_use]
    pub const fn hz(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Samplerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channels {
    /// One channel.
    Mono = 1,
    /// Two channels.
    Stereo = 2,
}

impl Channels {
    /// Map a channel count.
    ///
    /// # Errors
    ///
    /// Returns a validation error for counts other than 1 and 2.
    pub fn from_count(count: i64) -> Result<Self> {
        match count {
            1 => Ok(Self::Mono),
            2 => Ok(Self::Stereo),
            other => Err(ValidationError::Channels(other.to_string()).into()),
        }
    }

    /// Number of channels.
    #[must_use]
    pub const fn count(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count())
    }
}

/// Output container.
///
/// Only MP3 is supported. A new container needs a variant here, its name in
/// [`Format::as_str`] and a matching codec in [`Format::from_codec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// MPEG-1 Layer III.
    #[default]
    Mp3,
}

impl Format {
    /// Name understood by the transcoder and the fetcher.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
        }
    }

    /// Map a probed codec name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedValue`] for unsupported codecs.
    pub fn from_codec(codec: &str) -> Result<Self> {
        match codec.trim() {
            "mp3" | "mp3float" => Ok(Self::Mp3),
            other => Err(Error::unexpected("codec_name", other)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a split part: `current` of `total`, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartNumber {
    current: usize,
    total: usize,
}

impl PartNumber {
    /// Create a part number.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless `1 <= current <= total`.
    pub fn new(current: usize, total: usize) -> Result<Self> {
        if current == 0 || current > total {
            return Err(ValidationError::PartNumber { current, total }.into());
        }
        Ok(Self { current, total })
    }

    /// 1-based ordinal.
    #[must_use]
    pub const fn current(self) -> usize {
        self.current
    }

    /// Number of parts.
    #[must_use]
    pub const fn total(self) -> usize {
        self.total
    }
}

impl fmt::Display for PartNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.total)
    }
}

/// Which audio stream the fetcher should pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioSelector {
    /// Best audio-only stream.
    #[default]
    Best,
    /// Best stream under the bitrate, else the worst one above it.
    UnderBitrate(Bitrate),
    /// Best stream in the format, else best overall.
    OfFormat(Format),
}

impl AudioSelector {
    /// Format selection expression for the fetcher's `-f` flag.
    #[must_use]
    pub fn expression(&self) -> String {
        match self {
            Self::Best | Self::UnderBitrate(Bitrate::Unbounded) => "ba".to_string(),
            Self::UnderBitrate(Bitrate::Kbps(kbps)) => format!("ba[abr<{kbps}]/wa[abr>{kbps}]"),
            Self::OfFormat(format) => format!("ba[ext={format}]/ba"),
        }
    }
}
