//! Single playable items.
//!
//! A [`Media`] fetches its metadata once, on the first accessor call, and
//! projects typed values out of it. Nothing is fetched at construction.

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audio::{AudioAsset, AudioSelector};
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::metadata::{MEDIA_FIELDS, MetadataCache, NA};
use crate::process::Toolchain;
use crate::source::SourceFamily;

/// Live-stream state of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Liveness {
    /// Scheduled but not started.
    Upcoming,
    /// Currently streaming.
    Live,
    /// Stream ended, recording still processing.
    PostLive,
    /// Recording of a past stream.
    WasLive,
    /// Never a stream.
    NotLive,
}

impl Liveness {
    /// Parse the tool's `live_status` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "is_upcoming" => Some(Self::Upcoming),
            "is_live" => Some(Self::Live),
            "post_live" => Some(Self::PostLive),
            "was_live" => Some(Self::WasLive),
            "not_live" => Some(Self::NotLive),
            _ => None,
        }
    }

    /// The tool's spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "is_upcoming",
            Self::Live => "is_live",
            Self::PostLive => "post_live",
            Self::WasLive => "was_live",
            Self::NotLive => "not_live",
        }
    }
}

/// Access restriction of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    /// Owner only.
    Private,
    /// Paid tier only.
    PremiumOnly,
    /// Channel members only.
    SubscriberOnly,
    /// Any signed-in account.
    NeedsAuth,
    /// Anyone with the link.
    Unlisted,
    /// Everyone.
    Public,
    /// The tool could not tell.
    NotAvailable,
}

impl Availability {
    /// Parse the tool's `availability` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "private" => Some(Self::Private),
            "premium_only" => Some(Self::PremiumOnly),
            "subscriber_only" => Some(Self::SubscriberOnly),
            "needs_auth" => Some(Self::NeedsAuth),
            "unlisted" => Some(Self::Unlisted),
            "public" => Some(Self::Public),
            NA => Some(Self::NotAvailable),
            _ => None,
        }
    }

    /// Whether anyone with the link can play the item.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Public | Self::Unlisted)
    }
}

/// The three title variants of an item.
#[derive(Debug, Clone, Copy)]
pub struct Title<'a> {
    media: &'a Media,
}

impl Title<'_> {
    /// Plain title.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be fetched or lacks the field.
    pub fn simple(&self) -> Result<&str> {
        self.media.field("title")
    }

    /// Full title.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be fetched or lacks the field.
    pub fn full(&self) -> Result<&str> {
        self.media.field("fulltitle")
    }

    /// Alternative title.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be fetched or lacks the field.
    pub fn alternative(&self) -> Result<&str> {
        self.media.field("alt_title")
    }
}

/// A single playable remote item.
#[derive(Debug, Clone)]
pub struct Media {
    locator: Locator,
    toolchain: Toolchain,
    info: OnceLock<MetadataCache>,
}

impl PartialEq for Media {
    fn eq(&self, other: &Self) -> bool {
        self.locator == other.locator
    }
}

impl Eq for Media {}

impl fmt::Display for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.locator)
    }
}

impl Media {
    /// Create an item; nothing is fetched yet.
    #[must_use]
    pub const fn new(toolchain: Toolchain, locator: Locator) -> Self {
        Self {
            locator,
            toolchain,
            info: OnceLock::new(),
        }
    }

    /// The item's locator.
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// All metadata, fetched on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be spawned.
    pub fn info(&self) -> Result<&MetadataCache> {
        if let Some(cache) = self.info.get() {
            return Ok(cache);
        }
        let cache = MetadataCache::fetch(&self.toolchain, &self.locator, MEDIA_FIELDS, &[])?;
        Ok(self.info.get_or_init(|| cache))
    }

    /// Raw value of any cached field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldLookup`] if the field was not reported.
    pub fn field(&self, name: &str) -> Result<&str> {
        self.info()?.get(name)
    }

    fn integer(&self, name: &str) -> Result<i64> {
        self.info()?.integer(name)
    }

    fn timestamp(&self, name: &str) -> Result<DateTime<Utc>> {
        let seconds = self.integer(name)?;
        DateTime::from_timestamp(seconds, 0).ok_or_else(|| Error::unexpected(name, seconds.to_string()))
    }

    /// Platform identifier.
    pub fn id(&self) -> Result<&str> {
        self.field("id")
    }

    /// Title variants.
    #[must_use]
    pub const fn title(&self) -> Title<'_> {
        Title { media: self }
    }

    /// Container extension of the default format.
    pub fn extension(&self) -> Result<&str> {
        self.field("ext")
    }

    /// Channel name.
    pub fn channel(&self) -> Result<&str> {
        self.field("channel")
    }

    /// Uploader name.
    pub fn uploader(&self) -> Result<&str> {
        self.field("uploader")
    }

    /// Credited creator.
    pub fn creator(&self) -> Result<&str> {
        self.field("creator")
    }

    /// Description text.
    pub fn description(&self) -> Result<&str> {
        self.field("description")
    }

    /// License text.
    pub fn license(&self) -> Result<&str> {
        self.field("license")
    }

    /// Recording location.
    pub fn location(&self) -> Result<&str> {
        self.field("location")
    }

    /// Upload time, from the Unix `timestamp` or else the `upload_date` day.
    ///
    /// # Errors
    ///
    /// Returns an error if neither field parses.
    pub fn uploaded(&self) -> Result<DateTime<Utc>> {
        match self.timestamp("timestamp") {
            Ok(time) => Ok(time),
            Err(e) => {
                debug!("No usable timestamp for {} ({}), trying upload_date", self.locator, e);
                let raw = self.field("upload_date")?;
                NaiveDate::parse_from_str(raw.trim(), "%Y%m%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
                    .ok_or_else(|| Error::unexpected("upload_date", raw))
            }
        }
    }

    /// Release time.
    pub fn released(&self) -> Result<DateTime<Utc>> {
        self.timestamp("release_timestamp")
    }

    /// Last modification time.
    pub fn modified(&self) -> Result<DateTime<Utc>> {
        self.timestamp("modified_timestamp")
    }

    /// Play time; the tool reports whole or fractional seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is absent, negative or not numeric.
    pub fn duration(&self) -> Result<Duration> {
        let seconds = self.info()?.float("duration")?;
        Duration::try_from_secs_f64(seconds)
            .map_err(|_| Error::unexpected("duration", seconds.to_string()))
    }

    /// View count.
    pub fn viewed(&self) -> Result<i64> {
        self.integer("views")
    }

    /// Concurrent viewers of a live stream.
    pub fn viewing(&self) -> Result<i64> {
        self.integer("concurrent_view_count")
    }

    /// Like count.
    pub fn likes(&self) -> Result<i64> {
        self.integer("like_count")
    }

    /// Dislike count.
    pub fn dislikes(&self) -> Result<i64> {
        self.integer("dislike_count")
    }

    /// Repost count.
    pub fn reposts(&self) -> Result<i64> {
        self.integer("repost_count")
    }

    /// Average rating.
    pub fn rating(&self) -> Result<f64> {
        self.info()?.float("average_rating")
    }

    /// Minimum viewer age.
    pub fn age(&self) -> Result<i64> {
        self.integer("age_limit")
    }

    /// Live-stream state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedValue`] for a value outside [`Liveness`].
    pub fn liveness(&self) -> Result<Liveness> {
        let raw = self.field("live_status")?;
        Liveness::parse(raw.trim()).ok_or_else(|| Error::unexpected("live_status", raw))
    }

    /// Whether the item is streaming now.
    pub fn live(&self) -> Result<bool> {
        self.info()?.boolean("is_live")
    }

    /// Whether the item was a stream.
    pub fn lived(&self) -> Result<bool> {
        self.info()?.boolean("was_live")
    }

    /// Access restriction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedValue`] for a value outside [`Availability`].
    pub fn availability(&self) -> Result<Availability> {
        let raw = self.field("availability")?;
        Availability::parse(raw.trim()).ok_or_else(|| Error::unexpected("availability", raw))
    }

    /// Whether the item can be played right now.
    ///
    /// Families without reliable metadata are always available. Otherwise
    /// the item must be public or unlisted and not an upcoming stream; any
    /// lookup failure means unavailable.
    #[must_use]
    pub fn available(&self) -> bool {
        if self
            .toolchain
            .classifier()
            .family(&self.locator)
            .is_some_and(SourceFamily::always_available)
        {
            return true;
        }
        let open = self.availability().is_ok_and(Availability::is_open);
        open && !matches!(self.liveness(), Ok(Liveness::Upcoming))
    }

    /// Download the audio stream chosen by `selector`.
    ///
    /// The asset is verified when the toolchain is configured to.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool fails or yields no bytes.
    pub fn audio(&self, selector: &AudioSelector) -> Result<AudioAsset> {
        let expression = selector.expression();
        let args = vec![
            "-f".to_string(),
            expression.clone(),
            "-o".to_string(),
            "-".to_string(),
            self.locator.to_string(),
        ];

        info!("Fetching audio for {} with selector {}", self.locator, expression);
        let output = self.toolchain.fetch_checked(&args)?;
        debug!("Received {} bytes for {}", output.stdout.len(), self.locator);

        if self.toolchain.config().verify_audio {
            AudioAsset::new_verified(self.toolchain.clone(), output.stdout)
        } else {
            AudioAsset::new(self.toolchain.clone(), output.stdout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::audio::Bitrate;
    use crate::config::ToolConfig;
    use crate::error::UnavailableError;
    use crate::process::{MockToolRunner, ToolOutput};

    fn metadata_output(overrides: &[(&str, &str)]) -> Vec<u8> {
        let defaults = [
            ("age_limit", "0"),
            ("alt_title", "NA"),
            ("availability", "public"),
            ("average_rating", "4.5"),
            ("channel", "Kane B"),
            ("concurrent_view_count", "NA"),
            ("dislike_count", "NA"),
            ("duration", "212"),
            ("ext", "webm"),
            ("fulltitle", "Full Song"),
            ("id", "abc123"),
            ("is_live", "False"),
            ("license", "NA"),
            ("like_count", "1500"),
            ("live_status", "not_live"),
            ("location", "NA"),
            ("modified_timestamp", "NA"),
            ("release_timestamp", "NA"),
            ("repost_count", "NA"),
            ("timestamp", "1700000000"),
            ("title", "Song"),
            ("uploader", "Kane B"),
            ("upload_date", "20231114"),
            ("views", "98765"),
            ("was_live", "False"),
            ("creator", "NA"),
            ("description", "A song"),
        ];
        let lines: Vec<&str> = defaults
            .iter()
            .map(|(field, value)| {
                overrides
                    .iter()
                    .find(|(f, _)| f == field)
                    .map_or(*value, |(_, v)| *v)
            })
            .collect();
        lines.join("\n").into_bytes()
    }

    fn media_with(url: &str, stdout: Vec<u8>) -> Media {
        let mut runner = MockToolRunner::new();
        runner
            .expect_run()
            .withf(|_, args, _| args[0] == "--skip-download" && args.len() == 2 + MEDIA_FIELDS.len() * 2)
            .times(1)
            .returning(move |_, _, _| Ok(ToolOutput::ok(stdout.clone())));
        let toolchain = Toolchain::with_runner(ToolConfig::default(), Arc::new(runner));
        Media::new(toolchain, Locator::parse(url).expect("valid locator"))
    }

    const VIDEO: &str = "https://www.youtube.com/watch?v=abc123";

    #[test]
    fn test_metadata_fetched_once() {
        let media = media_with(VIDEO, metadata_output(&[]));
        assert_eq!(media.id().expect("id"), "abc123");
        assert_eq!(media.title().simple().expect("title"), "Song");
        assert_eq!(media.title().full().expect("fulltitle"), "Full Song");
        assert_eq!(media.title().alternative().expect("alt"), NA);
        assert_eq!(media.extension().expect("ext"), "webm");
        assert_eq!(media.viewed().expect("views"), 98765);
        assert_eq!(media.likes().expect("likes"), 1500);
        assert_eq!(media.rating().expect("rating"), 4.5);
        assert_eq!(media.age().expect("age"), 0);
    }

    #[test]
    fn test_duration_accepts_float_seconds() {
        let media = media_with(VIDEO, metadata_output(&[("duration", "212.5")]));
        assert_eq!(media.duration().expect("duration"), Duration::from_millis(212_500));

        let media = media_with(VIDEO, metadata_output(&[]));
        assert_eq!(media.duration().expect("duration"), Duration::from_secs(212));
    }

    #[test]
    fn test_uploaded_prefers_timestamp() {
        let media = media_with(VIDEO, metadata_output(&[]));
        assert_eq!(media.uploaded().expect("uploaded").timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_uploaded_falls_back_to_upload_date() {
        let media = media_with(VIDEO, metadata_output(&[("timestamp", "NA")]));
        let uploaded = media.uploaded().expect("uploaded");
        assert_eq!(uploaded.format("%Y-%m-%d").to_string(), "2023-11-14");
    }

    #[test]
    fn test_liveness_and_availability() {
        let media = media_with(VIDEO, metadata_output(&[]));
        assert_eq!(media.liveness().expect("liveness"), Liveness::NotLive);
        assert_eq!(media.availability().expect("availability"), Availability::Public);
        assert!(!media.live().expect("live"));
        assert!(media.available());
    }

    #[test]
    fn test_unknown_liveness_fails_loudly() {
        let media = media_with(VIDEO, metadata_output(&[("live_status", "sometimes")]));
        assert!(matches!(
            media.liveness(),
            Err(Error::UnexpectedValue { .. })
        ));
    }

    #[test]
    fn test_na_availability_is_reserved_variant() {
        let media = media_with(VIDEO, metadata_output(&[("availability", "NA")]));
        assert_eq!(
            media.availability().expect("availability"),
            Availability::NotAvailable
        );
        assert!(!media.available());
    }

    #[test]
    fn test_upcoming_stream_is_unavailable() {
        let media = media_with(VIDEO, metadata_output(&[("live_status", "is_upcoming")]));
        assert!(!media.available());
    }

    #[test]
    fn test_failed_metadata_degrades_available() {
        let mut runner = MockToolRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_, _, _| Ok(ToolOutput::failed(b"ERROR: Private video".to_vec())));
        let toolchain = Toolchain::with_runner(ToolConfig::default(), Arc::new(runner));
        let media = Media::new(toolchain, Locator::parse(VIDEO).expect("valid locator"));

        assert!(!media.available());
        assert!(media.title().full().expect_err("missing").is_field_lookup());
    }

    #[test]
    fn test_bandcamp_always_available_without_fetching() {
        let toolchain = Toolchain::with_runner(ToolConfig::default(), Arc::new(MockToolRunner::new()));
        let media = Media::new(
            toolchain,
            Locator::parse("https://artist.bandcamp.com/track/song").expect("valid locator"),
        );
        assert!(media.available());
    }

    #[test]
    fn test_audio_uses_selector_expression() {
        let mut runner = MockToolRunner::new();
        runner
            .expect_run()
            .withf(|_, args, _| {
                args.len() == 5
                    && args[0] == "-f"
                    && args[1] == "ba[abr<128]/wa[abr>128]"
                    && args[2] == "-o"
                    && args[3] == "-"
            })
            .times(1)
            .returning(|_, _, _| Ok(ToolOutput::ok(b"ID3audio".to_vec())));
        let toolchain = Toolchain::with_runner(ToolConfig::default(), Arc::new(runner));
        let media = Media::new(toolchain, Locator::parse(VIDEO).expect("valid locator"));

        let selector = AudioSelector::UnderBitrate(Bitrate::new(128).expect("bitrate"));
        let asset = media.audio(&selector).expect("Should fetch audio");
        assert_eq!(asset.as_bytes(), b"ID3audio");
        assert!(asset.part().is_none());
    }

    #[test]
    fn test_audio_empty_stream_is_unavailable() {
        let mut runner = MockToolRunner::new();
        runner
            .expect_run()
            .returning(|_, _, _| Ok(ToolOutput::ok(Vec::new())));
        let toolchain = Toolchain::with_runner(ToolConfig::default(), Arc::new(runner));
        let media = Media::new(toolchain, Locator::parse(VIDEO).expect("valid locator"));

        assert!(matches!(
            media.audio(&AudioSelector::Best),
            Err(Error::Unavailable(UnavailableError::EmptyAudio))
        ));
    }
}
