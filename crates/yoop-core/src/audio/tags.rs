//! Embedded ID3v2 tags and artwork of an MP3 buffer.
//!
//! Tags are exposed as a map from a friendly name (`title`, `artist`, ...)
//! to one or more values. Common text frames get friendly names, `TXXX`
//! frames are keyed by their description and any other text frame by its
//! frame id. Writing always produces an ID3v2.4 tag placed in front of the
//! audio payload, replacing whatever ID3v2 tag was there.

use std::collections::BTreeMap;
use std::io::Cursor;

use chrono::NaiveDate;
use id3::frame::{Comment, Content, ExtendedText, Picture, PictureType};
use id3::{Tag, TagLike, Version};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Friendly name to frame id.
const FRIENDLY_FRAMES: &[(&str, &str)] = &[
    ("title", "TIT2"),
    ("artist", "TPE1"),
    ("album", "TALB"),
    ("album_artist", "TPE2"),
    ("composer", "TCOM"),
    ("genre", "TCON"),
    ("date", "TDRC"),
    ("track", "TRCK"),
    ("disc", "TPOS"),
    ("publisher", "TPUB"),
    ("copyright", "TCOP"),
    ("language", "TLAN"),
    ("encoded_by", "TENC"),
    ("encoder", "TSSE"),
    ("lyricist", "TEXT"),
    ("conductor", "TPE3"),
    ("grouping", "TIT1"),
    ("subtitle", "TIT3"),
    ("bpm", "TBPM"),
    ("isrc", "TSRC"),
    ("mood", "TMOO"),
    ("key", "TKEY"),
];

const COMMENT: &str = "comment";
const COVER_MIME: &str = "image/jpeg";
const VALUE_SEPARATOR: char = '\0';

fn frame_for(name: &str) -> Option<&'static str> {
    FRIENDLY_FRAMES
        .iter()
        .find(|(friendly, _)| *friendly == name)
        .map(|(_, id)| *id)
}

fn name_for(frame_id: &str) -> Option<&'static str> {
    FRIENDLY_FRAMES
        .iter()
        .find(|(_, id)| *id == frame_id)
        .map(|(friendly, _)| *friendly)
}

/// A text frame id other than `TXXX`, e.g. `TYER`.
fn is_text_frame_id(name: &str) -> bool {
    name.len() == 4
        && name.starts_with('T')
        && name != "TXXX"
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn split_values(raw: &str) -> Vec<String> {
    raw.split(VALUE_SEPARATOR)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

/// Tag name to values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    values: BTreeMap<String, Vec<String>>,
}

impl Tags {
    /// An empty tag set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a single value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, vec![value.into()]);
        self
    }

    /// Builder: set several values.
    #[must_use]
    pub fn with_values<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.set(name, values.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the values of `name`.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.values.insert(name.into(), values);
    }

    /// Merge `other` into `self`; names present in both take `other`'s values.
    pub fn merge(&mut self, other: &Self) {
        for (name, values) in &other.values {
            self.values.insert(name.clone(), values.clone());
        }
    }

    /// All values of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// First value of `name`.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)?.first().map(String::as_str)
    }

    /// Iterate names and values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no tags are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First `title` value.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.first("title")
    }

    /// First `artist` value.
    #[must_use]
    pub fn artist(&self) -> Option<&str> {
        self.first("artist")
    }

    /// First `album` value.
    #[must_use]
    pub fn album(&self) -> Option<&str> {
        self.first("album")
    }

    /// Recording date; a bare year maps to January 1st.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        let raw = self.first("date")?.trim();
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok().or_else(|| {
            raw.get(..4)
                .and_then(|year| year.parse::<i32>().ok())
                .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        })
    }
}

/// The audio payload after any leading ID3v2 tag.
fn audio_payload(bytes: &[u8]) -> &[u8] {
    if bytes.len() < 10 || &bytes[..3] != b"ID3" {
        return bytes;
    }
    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | usize::from(b & 0x7f));
    let footer = if bytes[5] & 0x10 == 0 { 0 } else { 10 };
    bytes.get(10 + size + footer..).unwrap_or_default()
}

fn read_tag(bytes: &[u8]) -> Result<Option<Tag>> {
    match Tag::read_from2(Cursor::new(bytes)) {
        Ok(tag) => Ok(Some(tag)),
        Err(id3::Error {
            kind: id3::ErrorKind::NoTag,
            ..
        }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_tag(tag: &Tag, bytes: &[u8]) -> Result<Vec<u8>> {
    let payload = audio_payload(bytes);
    let mut out = Vec::with_capacity(payload.len() + 1024);
    tag.write_to(&mut out, Version::Id3v24)?;
    out.extend_from_slice(payload);
    Ok(out)
}

/// Read the tag map; a buffer without a tag yields an empty map.
///
/// # Errors
///
/// Returns an error if a tag is present but malformed.
pub fn read_tags(bytes: &[u8]) -> Result<Tags> {
    let Some(tag) = read_tag(bytes)? else {
        debug!("No ID3 tag found");
        return Ok(Tags::new());
    };

    let mut tags = Tags::new();
    for frame in tag.frames() {
        match frame.content() {
            Content::ExtendedText(text) => {
                tags.set(text.description.clone(), split_values(&text.value));
            }
            Content::Comment(comment) if frame.id() == "COMM" => {
                let mut values = tags.get(COMMENT).map(<[String]>::to_vec).unwrap_or_default();
                values.extend(split_values(&comment.text));
                tags.set(COMMENT, values);
            }
            Content::Text(text) => {
                let name = name_for(frame.id()).map_or_else(|| frame.id().to_string(), String::from);
                tags.set(name, split_values(text));
            }
            _ => {}
        }
    }
    Ok(tags)
}

/// Merge `updates` into the existing tags and return the re-tagged buffer.
///
/// # Errors
///
/// Returns an error if the existing tag is malformed or cannot be encoded.
pub fn write_tags(bytes: &[u8], updates: &Tags) -> Result<Vec<u8>> {
    let mut tag = read_tag(bytes)?.unwrap_or_else(Tag::new);

    for (name, values) in updates.iter() {
        let joined = values.join(&VALUE_SEPARATOR.to_string());
        if name == COMMENT {
            tag.remove_comment(None, None);
            let _ = tag.add_frame(Comment {
                lang: "eng".to_string(),
                description: String::new(),
                text: joined,
            });
        } else if let Some(id) = frame_for(name) {
            tag.set_text(id, joined);
        } else if is_text_frame_id(name) {
            tag.set_text(name, joined);
        } else {
            tag.remove_extended_text(Some(name), None);
            let _ = tag.add_frame(ExtendedText {
                description: name.to_string(),
                value: joined,
            });
        }
    }

    debug!("Writing {} tag updates", updates.len());
    write_tag(&tag, bytes)
}

/// First embedded picture.
///
/// # Errors
///
/// Returns an error if a tag is present but malformed.
pub fn read_cover(bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    Ok(read_tag(bytes)?.and_then(|tag| tag.pictures().next().map(|p| p.data.clone())))
}

/// Replace all embedded pictures with one JPEG front cover.
///
/// # Errors
///
/// Returns an error if the existing tag is malformed or cannot be encoded.
pub fn write_cover(bytes: &[u8], image: &[u8]) -> Result<Vec<u8>> {
    let mut tag = read_tag(bytes)?.unwrap_or_else(Tag::new);
    tag.remove_all_pictures();
    let _ = tag.add_frame(Picture {
        mime_type: COVER_MIME.to_string(),
        picture_type: PictureType::CoverFront,
        description: String::new(),
        data: image.to_vec(),
    });
    debug!("Embedding {} byte cover", image.len());
    write_tag(&tag, bytes)
}
