//! `Yoop` Core Library
//!
//! A lazily evaluated object model over `yt-dlp` and `ffmpeg`:
//! - Locator classification into single items and collections
//! - Indexable, sliceable playlists that list only what is asked for
//! - Typed metadata accessors for single items
//! - An audio pipeline for conversion, splitting, tags and cover art
//!
//! Nothing is fetched or decoded in-process. Every external call goes
//! through a [`ToolRunner`], which makes the whole crate testable without
//! the real tools.
//!
//! # Error Handling
//!
//! All fallible operations return [`Result`]; see the [`error`] module for
//! the error taxonomy.
//!
//! ```rust,ignore
//! use yoop_core::{Entry, Toolchain, classify, Locator};
//!
//! fn first_title() -> yoop_core::Result<()> {
//!     let toolchain = Toolchain::from_environment()?;
//!     let locator = Locator::parse("https://www.youtube.com/playlist?list=PL123")?;
//!     if let Entry::Playlist(playlist) = classify(&toolchain, locator)? {
//!         if let Entry::Media(media) = playlist.at(0)? {
//!             println!("{}", media.title().simple()?);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod avatar;
pub mod config;
pub mod error;
pub mod locator;
pub mod media;
pub mod metadata;
pub mod playlist;
pub mod process;
pub mod range;
pub mod source;

pub use audio::{
    AudioAsset, AudioSelector, Bitrate, Channels, Format, PartNumber, ProbeReport, Samplerate,
    SplitWindow, Tags, split_windows,
};
pub use avatar::{Avatar, parse_avatar_link};
pub use config::{ConfigManager, ENV_FFMPEG, ENV_FFPROBE, ENV_YT_DLP, ToolConfig};
pub use error::{Error, ErrorKind, Result, ToolError, UnavailableError, ValidationError};
pub use locator::Locator;
pub use media::{Availability, Liveness, Media, Title};
pub use metadata::{MEDIA_FIELDS, MetadataCache, NA, PLAYLIST_FIELDS};
pub use playlist::{Listing, Playlist, Uploader};
pub use process::{SystemRunner, ToolOutput, ToolRunner, Toolchain};
pub use range::SliceRange;
pub use source::{
    ClassificationRule, Classifier, Entry, EntryKind, FlatLister, Lister, PageLister,
    SourceFamily, classify,
};
