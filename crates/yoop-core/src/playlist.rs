//! Collections: playlists, channels, albums and artist pages.
//!
//! A [`Playlist`] is indexable and sliceable without materializing its
//! children. [`Playlist::at`] and [`Playlist::range`] each issue one flat
//! listing restricted to the requested slice; [`Playlist::items`] lists
//! everything once and keeps it. Children are classified by shape into
//! [`Entry::Media`] or nested [`Entry::Playlist`].
//!
//! Bandcamp artist roots have no usable flat listing, so they are always
//! resolved through [`Playlist::items`] and sliced in memory.

use std::fmt;
use std::sync::OnceLock;

use tracing::{debug, info};

use crate::avatar::Avatar;
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::metadata::{MetadataCache, PLAYLIST_FIELDS};
use crate::process::Toolchain;
use crate::range::SliceRange;
use crate::source::{
    Entry, FlatLister, Lister, SourceFamily, classify, flat_listing_args, parse_flat_listing,
};

/// A remote collection of entries.
#[derive(Debug, Clone)]
pub struct Playlist {
    locator: Locator,
    toolchain: Toolchain,
    info: OnceLock<MetadataCache>,
    items: OnceLock<Vec<Entry>>,
}

impl PartialEq for Playlist {
    fn eq(&self, other: &Self) -> bool {
        self.locator == other.locator
    }
}

impl Eq for Playlist {}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.locator)
    }
}

impl Playlist {
    /// Create a playlist; nothing is fetched yet.
    #[must_use]
    pub const fn new(toolchain: Toolchain, locator: Locator) -> Self {
        Self {
            locator,
            toolchain,
            info: OnceLock::new(),
            items: OnceLock::new(),
        }
    }

    /// The playlist's locator.
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Source family, if the locator belongs to a known one.
    #[must_use]
    pub fn family(&self) -> Option<SourceFamily> {
        self.toolchain.classifier().family(&self.locator)
    }

    fn lists_from_page(&self) -> bool {
        self.family()
            .is_some_and(|family| family.lists_from_page(&self.locator))
    }

    /// Playlist-level metadata, sampled from the first entry and fetched on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be spawned.
    pub fn info(&self) -> Result<&MetadataCache> {
        if let Some(cache) = self.info.get() {
            return Ok(cache);
        }
        let cache = MetadataCache::fetch(
            &self.toolchain,
            &self.locator,
            PLAYLIST_FIELDS,
            &["--playlist-items", "1"],
        )?;
        Ok(self.info.get_or_init(|| cache))
    }

    /// Raw value of any cached playlist field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldLookup`] if the field was not reported.
    pub fn field(&self, name: &str) -> Result<&str> {
        self.info()?.get(name)
    }

    /// Platform identifier.
    pub fn id(&self) -> Result<&str> {
        self.field("playlist_id")
    }

    /// Playlist title.
    pub fn title(&self) -> Result<&str> {
        self.field("playlist_title")
    }

    /// Reported entry count; zero when unknown.
    #[must_use]
    pub fn length(&self) -> usize {
        self.info()
            .and_then(|info| info.integer("playlist_count"))
            .ok()
            .and_then(|count| usize::try_from(count).ok())
            .unwrap_or(0)
    }

    /// Whether the playlist can be listed.
    #[must_use]
    pub fn available(&self) -> bool {
        if self.family().is_some_and(SourceFamily::always_available) {
            return true;
        }
        self.title().is_ok()
    }

    /// Who published the playlist.
    #[must_use]
    pub const fn uploader(&self) -> Uploader<'_> {
        Uploader { playlist: self }
    }

    /// Every entry, listed once and kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails or contains an unclassifiable
    /// address.
    pub fn items(&self) -> Result<&[Entry]> {
        if let Some(items) = self.items.get() {
            return Ok(items);
        }

        let lister: &dyn Lister = match self.family() {
            Some(family) => family.lister(&self.locator),
            None => &FlatLister,
        };
        info!("Listing all entries of {}", self.locator);
        let items = lister
            .list(&self.toolchain, &self.locator)?
            .into_iter()
            .map(|locator| classify(&self.toolchain, locator))
            .collect::<Result<Vec<_>>>()?;
        debug!("{} lists {} entries", self.locator, items.len());

        Ok(self.items.get_or_init(|| items))
    }

    /// Entry at `index`; negative indices count from the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if there is no such entry, or the
    /// listing error.
    pub fn at(&self, index: isize) -> Result<Entry> {
        self.slice(SliceRange::single(index)?)
            .next()
            .unwrap_or_else(|| Err(Error::IndexOutOfRange { index }))
    }

    /// Lazy `start:stop:step` selection of entries.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `step` is zero.
    pub fn range(
        &self,
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    ) -> Result<Listing<'_>> {
        Ok(self.slice(SliceRange::new(start, stop, step)?))
    }

    /// Lazy selection of entries by a prepared range.
    #[must_use]
    pub const fn slice(&self, range: SliceRange) -> Listing<'_> {
        Listing {
            playlist: self,
            range,
            state: ListingState::Pending,
        }
    }

    /// Lazy iteration over every entry, front to back.
    #[must_use]
    pub const fn iter(&self) -> Listing<'_> {
        self.slice(SliceRange::full())
    }

    fn resolve(&self, range: SliceRange) -> Result<Vec<Entry>> {
        if self.lists_from_page() {
            let items = self.items()?;
            return Ok(range
                .indices(items.len())
                .into_iter()
                .filter_map(|i| items.get(i).cloned())
                .collect());
        }

        let Some(items) = range.playlist_items() else {
            debug!("Range {} of {} is empty", range, self.locator);
            return Ok(Vec::new());
        };
        debug!("Listing {} of {}", range, self.locator);
        let output = self
            .toolchain
            .fetch_checked(&flat_listing_args(&self.locator, Some(&items)))?;
        parse_flat_listing(&self.toolchain, &self.locator, &output.stdout_text())?
            .into_iter()
            .map(|locator| classify(&self.toolchain, locator))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Playlist {
    type Item = Result<Entry>;
    type IntoIter = Listing<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug)]
enum ListingState {
    Pending,
    Ready(std::vec::IntoIter<Entry>),
    Done,
}

/// Lazily resolved selection of playlist entries.
///
/// Nothing runs until the first call to `next`. A listing failure is
/// yielded once as an error and ends the iteration.
#[derive(Debug)]
pub struct Listing<'a> {
    playlist: &'a Playlist,
    range: SliceRange,
    state: ListingState,
}

impl Listing<'_> {
    /// The selected range.
    #[must_use]
    pub const fn range(&self) -> SliceRange {
        self.range
    }
}

impl Iterator for Listing<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, ListingState::Pending) {
            match self.playlist.resolve(self.range) {
                Ok(entries) => self.state = ListingState::Ready(entries.into_iter()),
                Err(e) => {
                    self.state = ListingState::Done;
                    return Some(Err(e));
                }
            }
        }
        match &mut self.state {
            ListingState::Ready(entries) => entries.next().map(Ok),
            ListingState::Pending | ListingState::Done => None,
        }
    }
}

/// Publisher of a playlist.
#[derive(Debug, Clone, Copy)]
pub struct Uploader<'a> {
    playlist: &'a Playlist,
}

impl Uploader<'_> {
    /// Display name.
    pub fn name(&self) -> Result<&str> {
        self.playlist.field("playlist_uploader")
    }

    /// Handle or channel id.
    pub fn id(&self) -> Result<&str> {
        self.playlist.field("playlist_uploader_id")
    }

    /// Channel page.
    pub fn url(&self) -> Result<String> {
        Ok(format!("https://www.youtube.com/{}", self.id()?))
    }

    /// Channel avatar, resolved on demand.
    pub fn avatar(&self) -> Result<Avatar> {
        Ok(Avatar::new(Locator::parse(&self.url()?)?))
    }
}
