use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::MediaResolver;
use crate::config::MediaConfig;
use crate::error::ProviderError;

static STATUS_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?(?:twitter|x)\.com/[A-Za-z0-9_]+/status/\d+")
        .expect("status link pattern is valid")
});

/// First Twitter/X status link in `text`, if any.
pub fn status_link(text: &str) -> Option<&str> {
    STATUS_LINK.find(text).map(|m| m.as_str())
}

/// Resolves status links through the RapidAPI Twitter downloader.
pub struct TwitterResolver {
    client: reqwest::Client,
    config: MediaConfig,
}

impl TwitterResolver {
    pub fn new(config: MediaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl MediaResolver for TwitterResolver {
    async fn resolve(&self, link: &str) -> Result<Option<String>, ProviderError> {
        let url = format!("https://{}/status", self.config.rapidapi_host);
        debug!("Resolving media for {}", link);

        let response = self
            .client
            .get(&url)
            .query(&[("url", link)])
            .header("x-rapidapi-key", &self.config.rapidapi_key)
            .header("x-rapidapi-host", &self.config.rapidapi_host)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(best_video_url(&data))
    }
}

/// URL of the highest-bitrate video variant.
fn best_video_url(data: &Value) -> Option<String> {
    data["media"]["video"]["videoVariants"]
        .as_array()?
        .iter()
        .filter(|variant| variant["url"].is_string())
        .max_by_key(|variant| variant["bitrate"].as_u64().unwrap_or(0))
        .and_then(|variant| variant["url"].as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_link_detection() {
        assert_eq!(
            status_link("check this https://x.com/user/status/1234567890"),
            Some("https://x.com/user/status/1234567890")
        );
        assert_eq!(
            status_link("https://www.twitter.com/some_user/status/42?s=20 wow"),
            Some("https://www.twitter.com/some_user/status/42")
        );
        assert_eq!(status_link("https://x.com/user"), None);
        assert_eq!(status_link("what is the weather like?"), None);
    }

    #[test]
    fn test_best_variant_wins() {
        let data = json!({
            "media": {"video": {"videoVariants": [
                {"url": "https://video.example/low.mp4", "bitrate": 256000},
                {"url": "https://video.example/playlist.m3u8"},
                {"url": "https://video.example/high.mp4", "bitrate": 2176000},
                {"url": "https://video.example/mid.mp4", "bitrate": 832000},
            ]}}
        });
        assert_eq!(
            best_video_url(&data).as_deref(),
            Some("https://video.example/high.mp4")
        );
    }

    #[test]
    fn test_no_video_variants() {
        assert_eq!(best_video_url(&json!({})), None);
        assert_eq!(best_video_url(&json!({"media": {"photo": []}})), None);
        assert_eq!(
            best_video_url(&json!({"media": {"video": {"videoVariants": []}}})),
            None
        );
    }
}
