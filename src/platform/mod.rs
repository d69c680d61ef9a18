pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// A file the platform resolved from a file id.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    /// Platform-side path, e.g. `voice/file_12.oga`
    pub path: String,
    /// Direct download URL
    pub url: String,
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Look up a file. `Ok(None)` when the platform answered but refused
    /// (unknown or expired file id).
    async fn get_file(&self, file_id: &str) -> Result<Option<RemoteFile>>;

    /// Fetch the file's bytes.
    async fn download(&self, file: &RemoteFile) -> Result<Vec<u8>>;

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Send OGG/Opus audio as a voice message.
    async fn send_voice(&self, chat_id: i64, audio: Vec<u8>) -> Result<()>;

    /// Register `url` as the webhook endpoint.
    async fn set_webhook(&self, url: &str) -> Result<()>;
}
