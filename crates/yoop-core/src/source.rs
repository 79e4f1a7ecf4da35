//! Source families, locator classification and listing strategies.
//!
//! Whether a locator denotes a single playable item or a collection is
//! decided purely from its shape. A [`Classifier`] holds an ordered list of
//! [`ClassificationRule`]s, each tied to a [`SourceFamily`]; the first rule
//! whose host matches decides. Family-specific quirks (availability by
//! convention, listing strategy, artifact filtering) hang off the family.

use std::collections::HashSet;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, UnavailableError};
use crate::locator::Locator;
use crate::media::Media;
use crate::metadata::NA;
use crate::playlist::Playlist;
use crate::process::Toolchain;

/// Known source families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFamily {
    /// youtube.com and youtu.be.
    YouTube,
    /// bandcamp.com artist pages, albums and tracks.
    Bandcamp,
}

impl SourceFamily {
    /// Whether every resource of this family reports as available.
    ///
    /// Bandcamp exposes no reliable availability metadata.
    #[must_use]
    pub const fn always_available(self) -> bool {
        matches!(self, Self::Bandcamp)
    }

    /// Whether a listed address is a container artifact rather than a child.
    #[must_use]
    pub fn is_listing_artifact(self, address: &str) -> bool {
        matches!(self, Self::Bandcamp) && address.ends_with(".mp4")
    }

    /// Whether `locator` is listed from its page dump instead of a flat
    /// listing. Bandcamp artist roots are; albums and tracks are not.
    #[must_use]
    pub fn lists_from_page(self, locator: &Locator) -> bool {
        matches!(self, Self::Bandcamp)
            && !locator.contains("/track/")
            && !locator.contains("/album/")
    }

    /// The lister to use for `locator`.
    #[must_use]
    pub fn lister(self, locator: &Locator) -> &'static dyn Lister {
        if self.lists_from_page(locator) {
            &PageLister
        } else {
            &FlatLister
        }
    }
}

impl fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YouTube => write!(f, "YouTube"),
            Self::Bandcamp => write!(f, "Bandcamp"),
        }
    }
}

/// Whether a locator is a single item or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// A single playable item.
    Media,
    /// A collection (playlist, channel, album, artist page).
    Playlist,
}

/// One rule of the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRule {
    /// Family the matching locators belong to.
    pub family: SourceFamily,
    /// Host names (or parent domains) the rule applies to.
    pub hosts: Vec<String>,
    /// Substrings marking a single playable item; anything else on a
    /// matching host is a collection.
    pub media_markers: Vec<String>,
}

impl ClassificationRule {
    /// Create a rule.
    pub fn new<H, M>(family: SourceFamily, hosts: H, media_markers: M) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            family,
            hosts: hosts.into_iter().map(Into::into).collect(),
            media_markers: media_markers.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the rule applies to `locator`'s host.
    #[must_use]
    pub fn matches(&self, locator: &Locator) -> bool {
        let host = locator.host();
        self.hosts
            .iter()
            .any(|h| host == h.as_str() || host.ends_with(&format!(".{h}")))
    }

    /// Kind of a locator this rule applies to.
    #[must_use]
    pub fn kind(&self, locator: &Locator) -> EntryKind {
        if self.media_markers.iter().any(|m| locator.contains(m)) {
            EntryKind::Media
        } else {
            EntryKind::Playlist
        }
    }
}

/// Ordered rule registry; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            rules: vec![
                ClassificationRule::new(
                    SourceFamily::YouTube,
                    ["youtube.com"],
                    ["watch?v=", "/shorts/"],
                ),
                ClassificationRule::new(SourceFamily::YouTube, ["youtu.be"], ["youtu.be/"]),
                ClassificationRule::new(SourceFamily::Bandcamp, ["bandcamp.com"], ["/track/"]),
            ],
        }
    }
}

impl Classifier {
    /// A classifier with no rules.
    #[must_use]
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule that takes priority over the existing ones.
    #[must_use]
    pub fn with_rule(mut self, rule: ClassificationRule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    /// The registered rules in priority order.
    #[must_use]
    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    fn rule(&self, locator: &Locator) -> Option<&ClassificationRule> {
        self.rules.iter().find(|rule| rule.matches(locator))
    }

    /// Family of `locator`, if any rule matches.
    #[must_use]
    pub fn family(&self, locator: &Locator) -> Option<SourceFamily> {
        self.rule(locator).map(|rule| rule.family)
    }

    /// Kind of `locator`.
    ///
    /// # Errors
    ///
    /// Returns [`UnavailableError::Unclassifiable`] if no rule matches.
    pub fn kind(&self, locator: &Locator) -> Result<EntryKind> {
        self.rule(locator)
            .map(|rule| rule.kind(locator))
            .ok_or_else(|| UnavailableError::Unclassifiable(locator.to_string()).into())
    }
}

/// A classified child of a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A single playable item.
    Media(Media),
    /// A nested collection.
    Playlist(Playlist),
}

impl Entry {
    /// The entry's locator.
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        match self {
            Self::Media(media) => media.locator(),
            Self::Playlist(playlist) => playlist.locator(),
        }
    }

    /// The entry's kind.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        match self {
            Self::Media(_) => EntryKind::Media,
            Self::Playlist(_) => EntryKind::Playlist,
        }
    }

    /// Whether this is a single item.
    #[must_use]
    pub const fn is_media(&self) -> bool {
        matches!(self, Self::Media(_))
    }

    /// The item, if this is one.
    #[must_use]
    pub const fn as_media(&self) -> Option<&Media> {
        match self {
            Self::Media(media) => Some(media),
            Self::Playlist(_) => None,
        }
    }

    /// The nested playlist, if this is one.
    #[must_use]
    pub const fn as_playlist(&self) -> Option<&Playlist> {
        match self {
            Self::Media(_) => None,
            Self::Playlist(playlist) => Some(playlist),
        }
    }
}

/// Classify `locator` into a lazily resolved entity.
///
/// # Errors
///
/// Returns [`UnavailableError::Unclassifiable`] for unknown shapes.
pub fn classify(toolchain: &Toolchain, locator: Locator) -> Result<Entry> {
    let entry = match toolchain.classifier().kind(&locator)? {
        EntryKind::Media => Entry::Media(Media::new(toolchain.clone(), locator)),
        EntryKind::Playlist => Entry::Playlist(Playlist::new(toolchain.clone(), locator)),
    };
    Ok(entry)
}

/// Produces the complete child list of a collection.
pub trait Lister: Send + Sync + fmt::Debug {
    /// List every child locator of `locator`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool fails or its output cannot be used.
    fn list(&self, toolchain: &Toolchain, locator: &Locator) -> Result<Vec<Locator>>;
}

/// Lists children with the tool's flat listing mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatLister;

impl Lister for FlatLister {
    fn list(&self, toolchain: &Toolchain, locator: &Locator) -> Result<Vec<Locator>> {
        let output = toolchain.fetch_checked(&flat_listing_args(locator, None))?;
        parse_flat_listing(toolchain, locator, &output.stdout_text())
    }
}

/// Lists children by decoding the encoded page payload the tool dumps.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageLister;

impl Lister for PageLister {
    fn list(&self, toolchain: &Toolchain, locator: &Locator) -> Result<Vec<Locator>> {
        let page_locator = if locator.path().trim_end_matches('/').ends_with("/music") {
            locator.clone()
        } else {
            locator.join("music")?
        };

        let args = vec![
            "--flat-playlist".to_string(),
            "--skip-download".to_string(),
            "--dump-pages".to_string(),
            page_locator.to_string(),
        ];
        debug!("Dumping page for {}", page_locator);
        let output = toolchain.fetch_checked(&args)?;

        let page = decode_page_dump(&output.stdout_text())
            .ok_or_else(|| UnavailableError::PageDump(page_locator.to_string()))?;

        let mut seen = HashSet::new();
        let mut children = Vec::new();
        for path in extract_page_paths(&page) {
            let child = locator.join(&path)?;
            if seen.insert(child.clone()) {
                children.push(child);
            }
        }

        debug!("Page for {} lists {} children", locator, children.len());
        Ok(children)
    }
}

/// Arguments for a flat listing, optionally restricted to `items`.
pub(crate) fn flat_listing_args(locator: &Locator, items: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "--flat-playlist".to_string(),
        "--print".to_string(),
        "url".to_string(),
    ];
    if let Some(items) = items {
        args.push("--playlist-items".to_string());
        args.push(items.to_string());
    }
    args.push(locator.to_string());
    args
}

/// Turn flat listing output into child locators.
///
/// Blank lines and family artifacts are skipped. `NA` lines are skipped too,
/// unless the toolchain is configured for strict listings, in which case
/// they fail the whole listing.
pub(crate) fn parse_flat_listing(
    toolchain: &Toolchain,
    playlist: &Locator,
    output: &str,
) -> Result<Vec<Locator>> {
    let family = toolchain.classifier().family(playlist);
    let strict = toolchain.config().strict_listing;

    let mut children = Vec::new();
    for line in output.lines() {
        let address = line.trim();
        if address.is_empty() {
            continue;
        }
        if address == NA {
            if strict {
                return Err(UnavailableError::Entry {
                    playlist: playlist.to_string(),
                }
                .into());
            }
            debug!("Skipping unavailable entry in {}", playlist);
            continue;
        }
        if family.is_some_and(|f| f.is_listing_artifact(address)) {
            debug!("Skipping listing artifact {}", address);
            continue;
        }
        children.push(Locator::parse(address)?);
    }
    Ok(children)
}

/// Extract and decode the payload line following the first request dump.
fn decode_page_dump(output: &str) -> Option<String> {
    let re = Regex::new(r"Dumping request[^\n]*\n([^\n]*)\n?").ok()?;
    let encoded = re.captures(output)?.get(1)?.as_str().trim();
    match STANDARD.decode(encoded) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            warn!("Page dump payload is not valid base64: {}", e);
            None
        }
    }
}

/// Album and track paths referenced by a decoded page, quoted first, then
/// entity-escaped.
fn extract_page_paths(page: &str) -> Vec<String> {
    let patterns = [
        r#""(/(?:album|track)/[^"]+)""#,
        r#";(/(?:album|track)/[^&"]+)(?:&|")"#,
    ];

    let mut paths = Vec::new();
    for pattern in patterns {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        paths.extend(
            re.captures_iter(page)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string()),
        );
    }
    paths
}
