//! AWS Secrets Manager integration.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{Config, Error, Result};

/// Cached secrets with lazy initialization.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Google API credentials stored as a JSON secret.
#[derive(Debug, Deserialize)]
pub struct GoogleCredentials {
    pub api_key: String,
}

/// Get a secret value from Secrets Manager with caching.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    {
        let cache = get_cache().read().await;
        if let Some(value) = cache.get(secret_arn) {
            return Ok(value.clone());
        }
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    {
        let mut cache = get_cache().write().await;
        cache.insert(secret_arn.to_string(), secret_string.clone());
    }

    Ok(secret_string)
}

/// Extract the API key from a secret that is either raw text or
/// `{"api_key": "..."}`.
pub fn parse_google_api_key(secret: &str) -> Result<String> {
    let trimmed = secret.trim();
    if trimmed.starts_with('{') {
        let creds: GoogleCredentials = serde_json::from_str(trimmed)?;
        return Ok(creds.api_key);
    }
    if trimmed.is_empty() {
        return Err(Error::Config("Google API key secret is empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Resolve the Google API key from the environment or Secrets Manager.
///
/// Fails with a configuration error before any network call when neither
/// source is configured.
pub async fn resolve_google_api_key(config: &Config) -> Result<String> {
    if let Some(key) = &config.google_api_key {
        return Ok(key.clone());
    }

    let secret_arn = config.google_api_key_secret_arn.as_deref().ok_or_else(|| {
        Error::Config("GOOGLE_API_KEY or GOOGLE_API_KEY_SECRET_ARN must be set".to_string())
    })?;

    debug!("Loading Google API key from Secrets Manager in {}", config.aws_region);
    let aws_config = load_aws_config(config).await;
    let client = SecretsClient::new(&aws_config);
    let secret = get_secret(&client, secret_arn).await?;
    parse_google_api_key(&secret)
}

/// SDK configuration pinned to the configured region.
async fn load_aws_config(config: &Config) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .load()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_json_credentials() {
        let json = r#"{"api_key":"AIza-test"}"#;
        assert_eq!(parse_google_api_key(json).unwrap(), "AIza-test");
    }

    #[test]
    fn test_parse_raw_key() {
        assert_eq!(parse_google_api_key("  AIza-raw\n").unwrap(), "AIza-raw");
        assert!(parse_google_api_key("   ").is_err());
    }

    #[tokio::test]
    async fn test_resolve_prefers_direct_key() {
        let config = Config {
            google_api_key: Some("direct".to_string()),
            google_api_key_secret_arn: Some("arn:aws:secretsmanager:unused".to_string()),
            music_folder_id: None,
            biography_doc_id: None,
            calendar_id: None,
            catalog_cache_ttl: Duration::from_secs(600),
            image_base_path: "/api/image".to_string(),
            aws_region: "us-east-1".to_string(),
        };
        assert_eq!(resolve_google_api_key(&config).await.unwrap(), "direct");
    }

    #[tokio::test]
    async fn test_aws_config_uses_configured_region() {
        let config = Config {
            google_api_key: None,
            google_api_key_secret_arn: Some("arn:aws:secretsmanager:unused".to_string()),
            music_folder_id: None,
            biography_doc_id: None,
            calendar_id: None,
            catalog_cache_ttl: Duration::from_secs(600),
            image_base_path: "/api/image".to_string(),
            aws_region: "eu-west-1".to_string(),
        };
        let sdk_config = load_aws_config(&config).await;
        assert_eq!(sdk_config.region().map(|r| r.as_ref()), Some("eu-west-1"));
    }

    #[tokio::test]
    async fn test_resolve_without_source_is_config_error() {
        let config = Config {
            google_api_key: None,
            google_api_key_secret_arn: None,
            music_folder_id: None,
            biography_doc_id: None,
            calendar_id: None,
            catalog_cache_ttl: Duration::from_secs(600),
            image_base_path: "/api/image".to_string(),
            aws_region: "us-east-1".to_string(),
        };
        let err = resolve_google_api_key(&config).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
