//! Configuration management for Lambda functions.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

/// Default lifetime of a cached catalog.
pub const DEFAULT_CATALOG_TTL_SECS: u64 = 600;

/// Default path under which Drive images are proxied.
pub const DEFAULT_IMAGE_BASE_PATH: &str = "/api/image";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google API key, when provided directly
    pub google_api_key: Option<String>,
    /// ARN of the secret holding the Google API key
    pub google_api_key_secret_arn: Option<String>,
    /// Root Drive folder containing the catalog categories
    pub music_folder_id: Option<String>,
    /// Published Google Doc holding the biography
    pub biography_doc_id: Option<String>,
    /// Calendar listing upcoming shows
    pub calendar_id: Option<String>,
    /// How long an assembled catalog stays fresh
    pub catalog_cache_ttl: Duration,
    /// Path prefix used when building image URLs
    pub image_base_path: String,
    /// AWS region
    pub aws_region: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let catalog_cache_ttl = match non_empty_var("CATALOG_CACHE_TTL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                Error::Config(format!("CATALOG_CACHE_TTL_SECS is not a number: {}", raw))
            })?,
            None => DEFAULT_CATALOG_TTL_SECS,
        };

        Ok(Self {
            google_api_key: non_empty_var("GOOGLE_API_KEY"),
            google_api_key_secret_arn: non_empty_var("GOOGLE_API_KEY_SECRET_ARN"),
            music_folder_id: non_empty_var("MUSIC_FOLDER_ID"),
            biography_doc_id: non_empty_var("BIOGRAPHY_DOC_ID"),
            calendar_id: non_empty_var("CALENDAR_ID"),
            catalog_cache_ttl: Duration::from_secs(catalog_cache_ttl),
            image_base_path: non_empty_var("IMAGE_BASE_PATH")
                .unwrap_or_else(|| DEFAULT_IMAGE_BASE_PATH.to_string()),
            aws_region: non_empty_var("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
        })
    }

    /// Root catalog folder, or a configuration error if unset.
    pub fn music_folder_id(&self) -> Result<&str> {
        required(&self.music_folder_id, "MUSIC_FOLDER_ID")
    }

    /// Biography document id, or a configuration error if unset.
    pub fn biography_doc_id(&self) -> Result<&str> {
        required(&self.biography_doc_id, "BIOGRAPHY_DOC_ID")
    }

    /// Calendar id, or a configuration error if unset.
    pub fn calendar_id(&self) -> Result<&str> {
        required(&self.calendar_id, "CALENDAR_ID")
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| Error::Config(format!("{} not set", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_config() -> Config {
        Config {
            google_api_key: None,
            google_api_key_secret_arn: None,
            music_folder_id: None,
            biography_doc_id: None,
            calendar_id: None,
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_TTL_SECS),
            image_base_path: DEFAULT_IMAGE_BASE_PATH.to_string(),
            aws_region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn test_missing_identifier_is_config_error() {
        let config = empty_config();
        let err = config.music_folder_id().unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg == "MUSIC_FOLDER_ID not set"));
        assert!(config.calendar_id().is_err());
        assert!(config.biography_doc_id().is_err());
    }

    #[test]
    fn test_present_identifier() {
        let config = Config {
            music_folder_id: Some("root-123".to_string()),
            ..empty_config()
        };
        assert_eq!(config.music_folder_id().unwrap(), "root-123");
    }
}
