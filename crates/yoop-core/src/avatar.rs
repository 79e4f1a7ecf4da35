//! Channel avatar lookup.
//!
//! The channel page embeds its avatar as a JSON list of thumbnails; the
//! widest one is used.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::locator::Locator;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
    #[serde(default)]
    width: u64,
}

/// URL of the widest avatar thumbnail embedded in a channel page.
#[must_use]
pub fn parse_avatar_link(page: &str) -> Option<String> {
    let re = Regex::new(r#""avatar":\{.*"thumbnails":(\[[^\]]*\])"#).ok()?;
    let list = re.captures(page)?.get(1)?.as_str();
    let thumbnails: Vec<Thumbnail> = match serde_json::from_str(list) {
        Ok(thumbnails) => thumbnails,
        Err(e) => {
            warn!("Avatar thumbnails are not valid JSON: {}", e);
            return None;
        }
    };
    thumbnails
        .into_iter()
        .max_by_key(|thumbnail| thumbnail.width)
        .map(|thumbnail| thumbnail.url)
}

fn get(url: &str) -> Result<reqwest::blocking::Response> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()?;
    Ok(client.get(url).send()?.error_for_status()?)
}

/// A channel's avatar image, resolved and downloaded on demand.
#[derive(Debug, Clone)]
pub struct Avatar {
    channel: Locator,
    link: OnceLock<String>,
    data: OnceLock<Vec<u8>>,
}

impl Avatar {
    /// Avatar of the channel at `channel`.
    #[must_use]
    pub const fn new(channel: Locator) -> Self {
        Self {
            channel,
            link: OnceLock::new(),
            data: OnceLock::new(),
        }
    }

    /// The channel page.
    #[must_use]
    pub const fn channel(&self) -> &Locator {
        &self.channel
    }

    /// URL of the avatar image.
    ///
    /// # Errors
    ///
    /// Returns an HTTP error, or [`Error::FieldLookup`] if the page embeds
    /// no avatar.
    pub fn link(&self) -> Result<&str> {
        if let Some(link) = self.link.get() {
            return Ok(link);
        }
        debug!("Fetching channel page {}", self.channel);
        let page = get(self.channel.as_str())?.text()?;
        let link = parse_avatar_link(&page).ok_or_else(|| Error::field_lookup("avatar"))?;
        Ok(self.link.get_or_init(|| link))
    }

    /// The avatar image bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be resolved or fetched.
    pub fn data(&self) -> Result<&[u8]> {
        if let Some(data) = self.data.get() {
            return Ok(data);
        }
        let link = self.link()?;
        let data = get(link)?.bytes()?.to_vec();
        debug!("Fetched {} byte avatar for {}", data.len(), self.channel);
        Ok(self.data.get_or_init(|| data))
    }
}
