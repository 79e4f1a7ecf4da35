//! Batched metadata retrieval.
//!
//! The media-fetching tool prints one value per `--print <field>` flag, one
//! per line and in request order. [`MetadataCache`] zips that output back
//! with the requested field names. A short output (the tool gave up part
//! way) leaves the trailing fields absent, which surfaces as
//! [`Error::FieldLookup`] on access; the literal `NA` is a present value.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::process::Toolchain;

/// Placeholder printed for fields the tool could not resolve.
pub const NA: &str = "NA";

/// Fields requested for a single media item, in request order.
pub const MEDIA_FIELDS: &[&str] = &[
    "age_limit",
    "alt_title",
    "availability",
    "average_rating",
    "channel",
    "concurrent_view_count",
    "dislike_count",
    "duration",
    "ext",
    "fulltitle",
    "id",
    "is_live",
    "license",
    "like_count",
    "live_status",
    "location",
    "modified_timestamp",
    "release_timestamp",
    "repost_count",
    "timestamp",
    "title",
    "uploader",
    "upload_date",
    "views",
    "was_live",
    "creator",
    "description",
];

/// Fields requested for a playlist, sampled from its first entry.
pub const PLAYLIST_FIELDS: &[&str] = &[
    "playlist_id",
    "playlist_title",
    "playlist_count",
    "playlist_uploader",
    "playlist_uploader_id",
];

/// Field name to raw value mapping from one batched tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataCache {
    values: HashMap<String, String>,
}

impl MetadataCache {
    /// Zip printed output with the requested field names.
    ///
    /// Extra lines are ignored and missing trailing lines leave their fields
    /// absent.
    #[must_use]
    pub fn from_output(fields: &[&str], output: &str) -> Self {
        let values = fields
            .iter()
            .zip(output.split('\n'))
            .map(|(field, value)| ((*field).to_string(), value.trim_end_matches('\r').to_string()))
            .collect();
        Self { values }
    }

    /// Run the tool once for `locator` and cache every requested field.
    ///
    /// `extra_args` are inserted before the `--print` flags. A non-zero exit
    /// is logged but tolerated; whatever was printed is still zipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the tool cannot be spawned.
    pub fn fetch(
        toolchain: &Toolchain,
        locator: &Locator,
        fields: &[&str],
        extra_args: &[&str],
    ) -> Result<Self> {
        let mut args: Vec<String> = vec!["--skip-download".to_string()];
        args.extend(extra_args.iter().map(ToString::to_string));
        for field in fields {
            args.push("--print".to_string());
            args.push((*field).to_string());
        }
        args.push(locator.to_string());

        debug!("Fetching {} metadata fields for {}", fields.len(), locator);
        let output = toolchain.fetch(&args)?;
        if !output.success {
            warn!(
                "Metadata fetch for {} reported failure: {}",
                locator,
                output.stderr_text().trim()
            );
        }

        let cache = Self::from_output(fields, &output.stdout_text());
        debug!("Cached {} metadata values for {}", cache.len(), locator);
        Ok(cache)
    }

    /// Raw value for `field`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldLookup`] if the field was not reported.
    pub fn get(&self, field: &str) -> Result<&str> {
        self.values
            .get(field)
            .map(String::as_str)
            .ok_or_else(|| Error::field_lookup(field))
    }

    /// Value for `field`, or `None` if absent or `NA`.
    #[must_use]
    pub fn known(&self, field: &str) -> Option<&str> {
        self.values
            .get(field)
            .map(String::as_str)
            .filter(|v| *v != NA)
    }

    /// Number of cached fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse `field` as an integer.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if absent, or [`Error::UnexpectedValue`] if
    /// the value is not an integer (including `NA`).
    pub fn integer(&self, field: &str) -> Result<i64> {
        let raw = self.get(field)?;
        raw.trim()
            .parse::<i64>()
            .map_err(|_| Error::unexpected(field, raw))
    }

    /// Parse `field` as a float.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if absent, or [`Error::UnexpectedValue`] if
    /// the value is not numeric.
    pub fn float(&self, field: &str) -> Result<f64> {
        let raw = self.get(field)?;
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| Error::unexpected(field, raw))
    }

    /// Parse `field` as a boolean as printed by the tool (`True`/`False`).
    ///
    /// # Errors
    ///
    /// Returns a lookup error if absent, or [`Error::UnexpectedValue`] for
    /// anything else.
    pub fn boolean(&self, field: &str) -> Result<bool> {
        let raw = self.get(field)?;
        match raw.trim() {
            "True" | "true" => Ok(true),
            "False" | "false" => Ok(false),
            _ => Err(Error::unexpected(field, raw)),
        }
    }
}
