//! In-memory audio and its processing pipeline.
//!
//! An [`AudioAsset`] wraps a non-empty byte buffer. Every transform
//! (`converted`, `splitted`, `tagged`, `covered`) returns new assets and
//! leaves the original untouched. Technical properties come from a single
//! probe run per asset, cached on first access.

pub mod probe;
pub mod quality;
pub mod split;
pub mod tags;

use std::fmt;
use std::io::Cursor;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::{debug, info, warn};

pub use probe::ProbeReport;
pub use quality::{AudioSelector, Bitrate, Channels, Format, PartNumber, Samplerate};
pub use split::{SplitWindow, split_windows};
pub use tags::Tags;

use crate::error::{Error, Result, UnavailableError, ValidationError};
use crate::process::{Toolchain, args};

/// Arguments shared by every encode: overwrite, quiet, read stdin.
const ENCODE_PREAMBLE: &[&str] = &["-y", "-hide_banner", "-loglevel", "error"];

/// Target parameters of one encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EncodeTarget {
    bitrate: Bitrate,
    samplerate: Samplerate,
    format: Format,
    channels: Channels,
}

impl EncodeTarget {
    /// Full transcoder argument list, optionally limited to a window.
    fn args(&self, window: Option<SplitWindow>) -> Result<Vec<String>> {
        let mut out = args(ENCODE_PREAMBLE.iter().copied());
        if let Some(window) = window {
            out.extend(args(["-ss".to_string(), window.start.to_string()]));
        }
        out.extend(args(["-i", "-"]));
        if let Some(window) = window {
            out.extend(args(["-t".to_string(), window.length.to_string()]));
        }
        out.extend(args([
            "-vn".to_string(),
            "-ar".to_string(),
            self.samplerate.to_string(),
            "-ac".to_string(),
            self.channels.to_string(),
            "-b:a".to_string(),
            self.bitrate.encoder_arg()?,
            "-f".to_string(),
            self.format.to_string(),
            "-".to_string(),
        ]));
        Ok(out)
    }
}

/// An immutable, non-empty audio buffer.
#[derive(Clone)]
pub struct AudioAsset {
    data: Arc<[u8]>,
    part: Option<PartNumber>,
    toolchain: Toolchain,
    probe: OnceLock<ProbeReport>,
    decoded_duration: OnceLock<Duration>,
    tags: OnceLock<Tags>,
    cover: OnceLock<Option<Vec<u8>>>,
}

impl fmt::Debug for AudioAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioAsset")
            .field("len", &self.data.len())
            .field("part", &self.part)
            .finish_non_exhaustive()
    }
}

impl PartialEq for AudioAsset {
    fn eq(&self, other: &Self) -> bool {
        self.part == other.part && self.data == other.data
    }
}

impl Eq for AudioAsset {}

impl AudioAsset {
    /// Wrap a buffer.
    ///
    /// # Errors
    ///
    /// Returns [`UnavailableError::EmptyAudio`] for an empty buffer.
    pub fn new(toolchain: Toolchain, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let data = data.into();
        if data.is_empty() {
            return Err(UnavailableError::EmptyAudio.into());
        }
        Ok(Self {
            data,
            part: None,
            toolchain,
            probe: OnceLock::new(),
            decoded_duration: OnceLock::new(),
            tags: OnceLock::new(),
            cover: OnceLock::new(),
        })
    }

    /// Wrap a buffer and check that it decodes cleanly.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty or the decoder reports
    /// diagnostics.
    pub fn new_verified(toolchain: Toolchain, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let asset = Self::new(toolchain, data)?;
        asset.verify()?;
        Ok(asset)
    }

    /// A verified copy of this asset.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Diagnostics`] if the decoder complains.
    pub fn verified(&self) -> Result<Self> {
        self.verify()?;
        Ok(self.clone())
    }

    fn verify(&self) -> Result<()> {
        let output = self
            .toolchain
            .transcode(&args(["-v", "error", "-i", "-", "-f", "null", "-"]), &self.data)?;
        let diagnostics = output.stderr_text();
        let diagnostics = diagnostics.trim();
        if diagnostics.is_empty() {
            debug!("Verified {} bytes of audio", self.data.len());
            Ok(())
        } else {
            warn!("Audio failed verification: {}", diagnostics);
            Err(ValidationError::Diagnostics(diagnostics.to_string()).into())
        }
    }

    /// Same buffer, stamped with `part`.
    #[must_use]
    pub fn with_part(mut self, part: PartNumber) -> Self {
        self.part = Some(part);
        self
    }

    /// Split position, if this asset is a part.
    #[must_use]
    pub const fn part(&self) -> Option<PartNumber> {
        self.part
    }

    /// The raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// A reader over the bytes.
    #[must_use]
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.as_bytes())
    }

    /// Buffer size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; assets are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Buffer size in whole mebibytes.
    #[must_use]
    pub fn megabytes(&self) -> usize {
        self.data.len() / 1024 / 1024
    }

    fn derive(&self, data: Vec<u8>) -> Result<Self> {
        Self::new(self.toolchain.clone(), data)
    }

    /// The cached probe report.
    ///
    /// # Errors
    ///
    /// Returns an error if the prober fails.
    pub fn probe(&self) -> Result<&ProbeReport> {
        if let Some(report) = self.probe.get() {
            return Ok(report);
        }
        let output = self.toolchain.probe_checked(&probe::probe_args(), &self.data)?;
        let report = ProbeReport::parse(&output.stdout_text());
        debug!("Probed {} bytes of audio", self.data.len());
        Ok(self.probe.get_or_init(|| report))
    }

    /// Overall bitrate.
    pub fn bitrate(&self) -> Result<Bitrate> {
        self.probe()?.bitrate()
    }

    /// Sample rate.
    pub fn samplerate(&self) -> Result<Samplerate> {
        self.probe()?.samplerate()
    }

    /// Channel layout.
    pub fn channels(&self) -> Result<Channels> {
        self.probe()?.channels()
    }

    /// Container format.
    pub fn format(&self) -> Result<Format> {
        self.probe()?.format()
    }

    /// Play time.
    ///
    /// Taken from the probe when it reports one, otherwise from the last
    /// progress position of a full decode pass.
    ///
    /// # Errors
    ///
    /// Returns an error if neither source yields a duration.
    pub fn duration(&self) -> Result<Duration> {
        if let Some(duration) = self.probe()?.duration() {
            return Ok(duration);
        }
        if let Some(duration) = self.decoded_duration.get() {
            return Ok(*duration);
        }

        debug!("Probe reported no duration, decoding to measure it");
        let output = self
            .toolchain
            .transcode(&args(["-i", "-", "-f", "null", "-"]), &self.data)?;
        let duration = probe::progress_duration(&output.stderr_text())
            .ok_or_else(|| Error::field_lookup("duration"))?;
        Ok(*self.decoded_duration.get_or_init(|| duration))
    }

    /// Approximate byte size after converting to `bitrate`, or `None` for
    /// an unbounded bitrate.
    ///
    /// # Errors
    ///
    /// Returns an error if the duration cannot be determined.
    pub fn estimated_converted_size(&self, bitrate: Bitrate) -> Result<Option<u64>> {
        let Some(kbps) = bitrate.kbps() else {
            return Ok(None);
        };
        let seconds = self.duration()?.as_secs_f64();
        Ok(Some((seconds * f64::from(kbps) * 1024.0 / 8.0) as u64))
    }

    /// Re-encode with explicit parameters.
    ///
    /// Tags, cover and part number are not carried over.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unbounded bitrate, or an error if
    /// the transcoder fails or produces nothing.
    pub fn converted(
        &self,
        bitrate: Bitrate,
        samplerate: Samplerate,
        format: Format,
        channels: Channels,
    ) -> Result<Self> {
        let target = EncodeTarget {
            bitrate,
            samplerate,
            format,
            channels,
        };
        let args = target.args(None)?;

        info!(
            "Converting {} bytes to {} {} Hz {}ch {}",
            self.data.len(),
            format,
            samplerate,
            channels,
            bitrate
        );
        let output = self.toolchain.transcode_checked(&args, &self.data)?;
        self.derive(output.stdout)
    }

    /// Split into `parts` consecutive parts of equal length.
    ///
    /// Each part keeps this asset's own audio parameters and tags, is
    /// stamped with its [`PartNumber`], and gets the cover only if this
    /// asset has one.
    ///
    /// # Errors
    ///
    /// Returns a validation error for zero parts (before any tool runs), or
    /// an error from probing, encoding or tagging.
    pub fn splitted(&self, parts: usize) -> Result<Vec<Self>> {
        if parts == 0 {
            return Err(ValidationError::SplitCount(parts).into());
        }

        let windows = split_windows(self.duration()?, parts)?;
        let target = EncodeTarget {
            bitrate: self.bitrate()?,
            samplerate: self.samplerate()?,
            format: self.format()?,
            channels: self.channels()?,
        };
        let tags = self.tags()?;
        let cover = self.cover()?;

        info!("Splitting {} bytes into {} parts", self.data.len(), parts);
        let mut out = Vec::with_capacity(parts);
        for (n, window) in windows.into_iter().enumerate() {
            let output = self
                .toolchain
                .transcode_checked(&target.args(Some(window))?, &self.data)?;
            let mut piece = self.derive(output.stdout)?;
            if !tags.is_empty() {
                piece = piece.tagged(tags)?;
            }
            if let Some(image) = cover {
                piece = piece.covered(image)?;
            }
            debug!("Part {}/{} starts at {}s", n + 1, parts, window.start);
            out.push(piece.with_part(PartNumber::new(n + 1, parts)?));
        }
        Ok(out)
    }

    /// Embedded tags, empty when the buffer has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is malformed.
    pub fn tags(&self) -> Result<&Tags> {
        if let Some(tags) = self.tags.get() {
            return Ok(tags);
        }
        let tags = tags::read_tags(&self.data)?;
        Ok(self.tags.get_or_init(|| tags))
    }

    /// Merge `updates` into the tags; unnamed tags are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag cannot be read or written.
    pub fn tagged(&self, updates: &Tags) -> Result<Self> {
        let data = tags::write_tags(&self.data, updates)?;
        let mut asset = self.derive(data)?;
        asset.part = self.part;
        Ok(asset)
    }

    /// First embedded picture.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is malformed.
    pub fn cover(&self) -> Result<Option<&[u8]>> {
        if let Some(cover) = self.cover.get() {
            return Ok(cover.as_deref());
        }
        let cover = tags::read_cover(&self.data)?;
        Ok(self.cover.get_or_init(|| cover).as_deref())
    }

    /// Replace all pictures with `image` as a JPEG front cover.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag cannot be read or written.
    pub fn covered(&self, image: &[u8]) -> Result<Self> {
        let data = tags::write_cover(&self.data, image)?;
        let mut asset = self.derive(data)?;
        asset.part = self.part;
        Ok(asset)
    }
}
