//! Validated references to remote resources.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result, ValidationError};

/// An immutable, validated absolute `http(s)` URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locator(Url);

impl Locator {
    /// Parse and validate a locator.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the input is empty, not a URL, not
    /// `http`/`https`, or has no host.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        let invalid = |reason: &str| -> Error {
            ValidationError::Locator {
                value: value.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        if value.is_empty() {
            return Err(invalid("locator cannot be empty"));
        }

        let url = Url::parse(value).map_err(|e| invalid(&e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }

        Ok(Self(url))
    }

    /// The full URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The host name, lowercased by the URL parser.
    #[must_use]
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// The path component.
    #[must_use]
    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// Whether the URL string contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.as_str().contains(needle)
    }

    /// Join a path onto this locator.
    ///
    /// A root-relative path (`/album/x`) replaces the whole path; anything
    /// else is appended as further segments (`music` on `https://a.b/` gives
    /// `https://a.b/music`). The base's query and fragment are dropped;
    /// those carried by `path` are kept.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the result is not a valid locator.
    pub fn join(&self, path: &str) -> Result<Self> {
        let (path, fragment) = match path.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (path, None),
        };
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };

        let mut url = self.0.clone();
        if path.starts_with('/') {
            url.set_path(path);
        } else {
            let base = url.path().trim_end_matches('/').to_string();
            url.set_path(&format!("{base}/{}", path.trim_start_matches('/')));
        }
        url.set_query(query);
        url.set_fragment(fragment);

        Self::parse(url.as_str())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Locator {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.0.into()
    }
}

impl AsRef<str> for Locator {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
