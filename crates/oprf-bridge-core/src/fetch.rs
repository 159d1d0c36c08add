//! Module image fetching.
//!
//! The image lives at a fixed, well-known location: either an HTTP(S) URL
//! or a filesystem path. It is fetched exactly once, at load time; every
//! failure here is a [`BridgeError::LoadFailed`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use oprf_bridge_common::BridgeError;

/// Where the module image is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLocation {
    /// Fetch over HTTP(S).
    Url(Url),
    /// Read from the local filesystem.
    Path(PathBuf),
}

impl FromStr for ImageLocation {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("http://") || s.starts_with("https://") {
            let url = Url::parse(s).map_err(|e| {
                BridgeError::invalid_config(format!("invalid module URL '{s}': {e}"))
            })?;
            Ok(Self::Url(url))
        } else {
            Ok(Self::Path(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for ImageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetch the raw image bytes from the given location.
///
/// # Errors
///
/// Returns [`BridgeError::LoadFailed`] on any transport or filesystem
/// failure; the load failure is terminal and is never retried by the
/// bridge itself.
#[instrument(skip(location), fields(location = %location))]
pub async fn fetch_image_bytes(location: &ImageLocation) -> Result<Vec<u8>, BridgeError> {
    let bytes = match location {
        ImageLocation::Url(url) => fetch_over_http(url).await?,
        ImageLocation::Path(path) => tokio::fs::read(path).await.map_err(|e| {
            BridgeError::load_failed(format!("failed to read '{}': {e}", path.display()))
        })?,
    };

    debug!(bytes_len = bytes.len(), "Module image fetched");
    Ok(bytes)
}

async fn fetch_over_http(url: &Url) -> Result<Vec<u8>, BridgeError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("oprf-bridge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| BridgeError::load_failed(format!("failed to build HTTP client: {e}")))?;

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| BridgeError::load_failed(format!("fetch from '{url}' failed: {e}")))?
        .error_for_status()
        .map_err(|e| BridgeError::load_failed(format!("fetch from '{url}' failed: {e}")))?;

    let body = response
        .bytes()
        .await
        .map_err(|e| BridgeError::load_failed(format!("reading body from '{url}' failed: {e}")))?;

    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_location() {
        let location: ImageLocation = "http://localhost:1323/static/client.wasm"
            .parse()
            .unwrap();
        assert!(matches!(location, ImageLocation::Url(_)));
        assert_eq!(
            location.to_string(),
            "http://localhost:1323/static/client.wasm"
        );
    }

    #[test]
    fn test_parse_path_location() {
        let location: ImageLocation = "./client.wasm".parse().unwrap();
        assert_eq!(location, ImageLocation::Path(PathBuf::from("./client.wasm")));
    }

    #[test]
    fn test_parse_invalid_url() {
        let result = "http://".parse::<ImageLocation>();
        assert!(matches!(result, Err(BridgeError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_load_failure() {
        let location = ImageLocation::Path(PathBuf::from("/nonexistent/client.wasm"));
        let result = fetch_image_bytes(&location).await;
        assert!(matches!(result, Err(BridgeError::LoadFailed { .. })));
    }
}
