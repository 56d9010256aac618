//! Album cover lookup through Spotify's public oEmbed endpoint.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::catalog::extract_spotify_id;
use crate::{Error, Result};

const OEMBED_URL: &str = "https://open.spotify.com/oembed";
const FALLBACK_IMAGE_PREFIX: &str = "https://i.scdn.co/image/ab67616d0000b273";
const THUMBNAIL_300_TOKEN: &str = "ab67616d00001e02";
const THUMBNAIL_640_TOKEN: &str = "ab67616d0000b273";

/// Turns a release's Spotify link into a cover image URL.
#[async_trait]
pub trait CoverArtResolver: Send + Sync {
    /// `None` when the link does not identify an album.
    async fn resolve(&self, spotify_link: Option<&str>) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    thumbnail_url: Option<String>,
}

/// Resolver backed by the unauthenticated oEmbed API.
#[derive(Clone)]
pub struct SpotifyCoverArt {
    http_client: reqwest::Client,
    oembed_url: String,
}

impl SpotifyCoverArt {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self::with_endpoint(http_client, OEMBED_URL)
    }

    pub fn with_endpoint(http_client: reqwest::Client, oembed_url: impl Into<String>) -> Self {
        Self {
            http_client,
            oembed_url: oembed_url.into(),
        }
    }

    async fn fetch_thumbnail(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .http_client
            .get(&self.oembed_url)
            .query(&[("url", url)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::upstream(
                "Spotify oEmbed",
                format!("lookup returned {}", response.status()),
            ));
        }

        let body: OEmbedResponse = response.json().await?;
        Ok(body.thumbnail_url.filter(|u| !u.is_empty()))
    }
}

#[async_trait]
impl CoverArtResolver for SpotifyCoverArt {
    async fn resolve(&self, spotify_link: Option<&str>) -> Option<String> {
        let link = spotify_link?;
        let album_id = extract_spotify_id(link)?;
        let url = extract_url(link).unwrap_or(link);

        match self.fetch_thumbnail(url).await {
            Ok(Some(thumbnail)) => {
                debug!("Resolved cover art for album {}", album_id);
                Some(upgrade_resolution(&thumbnail))
            }
            Ok(None) => {
                debug!("No thumbnail for album {}, using fallback", album_id);
                Some(fallback_cover_url(&album_id))
            }
            Err(e) => {
                warn!("Cover art lookup failed for album {}: {}", album_id, e);
                Some(fallback_cover_url(&album_id))
            }
        }
    }
}

/// First http(s) URL inside a line of text.
pub fn extract_url(text: &str) -> Option<&str> {
    static URL: OnceLock<Regex> = OnceLock::new();
    let re = URL.get_or_init(|| Regex::new(r"https?://\S+").expect("valid url regex"));
    re.find(text).map(|m| m.as_str())
}

/// Swap the 300px image token for the 640px one.
pub fn upgrade_resolution(thumbnail_url: &str) -> String {
    thumbnail_url.replace(THUMBNAIL_300_TOKEN, THUMBNAIL_640_TOKEN)
}

/// Best-effort CDN URL for an album id. May not resolve to a real image.
pub fn fallback_cover_url(album_id: &str) -> String {
    format!("{}{}", FALLBACK_IMAGE_PREFIX, album_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_url_from_link_line() {
        assert_eq!(
            extract_url("Spotify: https://open.spotify.com/album/abc123?si=x"),
            Some("https://open.spotify.com/album/abc123?si=x")
        );
        assert_eq!(extract_url("no link here"), None);
    }

    #[test]
    fn test_upgrade_resolution() {
        assert_eq!(
            upgrade_resolution("https://i.scdn.co/image/ab67616d00001e02ffee"),
            "https://i.scdn.co/image/ab67616d0000b273ffee"
        );
        assert_eq!(upgrade_resolution("https://example.com/x.jpg"), "https://example.com/x.jpg");
    }

    #[tokio::test]
    async fn test_resolve_without_album_id_skips_network() {
        // Nothing listens on port 9.
        let resolver = SpotifyCoverArt::with_endpoint(reqwest::Client::new(), "http://127.0.0.1:9/oembed");
        assert_eq!(resolver.resolve(None).await, None);
        assert_eq!(resolver.resolve(Some("")).await, None);
        assert_eq!(
            resolver.resolve(Some("https://open.spotify.com/track/xyz")).await,
            None
        );
    }

    #[tokio::test]
    async fn test_resolve_falls_back_when_lookup_fails() {
        let resolver = SpotifyCoverArt::with_endpoint(reqwest::Client::new(), "http://127.0.0.1:9/oembed");
        let url = resolver
            .resolve(Some("https://open.spotify.com/album/4aMdysP9WyjqxeQjxLtzOQ"))
            .await;
        assert_eq!(
            url.as_deref(),
            Some("https://i.scdn.co/image/ab67616d0000b2734aMdysP9WyjqxeQjxLtzOQ")
        );
    }
}
