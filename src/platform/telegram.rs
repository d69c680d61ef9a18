use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};
use teloxide::RequestError;
use tracing::{debug, info, warn};

use super::{ChatPlatform, RemoteFile};
use crate::config::TelegramConfig;

/// Telegram rejects messages over 4096 chars; keep some headroom.
const MAX_MESSAGE_LEN: usize = 4000;

/// Split long messages for Telegram's 4096 char limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Bot API client backed by teloxide.
pub struct TelegramPlatform {
    bot: Bot,
    /// `{api_url}/file/bot{token}`, prefix of every download URL
    file_base: String,
}

impl TelegramPlatform {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let api_url = reqwest::Url::parse(&config.api_url)
            .with_context(|| format!("Invalid Telegram API URL: {}", config.api_url))?;
        let bot = Bot::new(&config.bot_token).set_api_url(api_url);
        let file_base = format!(
            "{}/file/bot{}",
            config.api_url.trim_end_matches('/'),
            config.bot_token
        );
        Ok(Self { bot, file_base })
    }

    fn file_url(&self, path: &str) -> String {
        format!("{}/{}", self.file_base, path)
    }
}

#[async_trait]
impl ChatPlatform for TelegramPlatform {
    async fn get_file(&self, file_id: &str) -> Result<Option<RemoteFile>> {
        match self.bot.get_file(FileId(file_id.to_string())).await {
            Ok(file) => {
                debug!("Resolved file {} -> {}", file_id, file.path);
                Ok(Some(RemoteFile {
                    url: self.file_url(&file.path),
                    path: file.path,
                }))
            }
            Err(RequestError::Api(e)) => {
                warn!("getFile refused for {}: {}", file_id, e);
                Ok(None)
            }
            Err(e) => Err(e).context("getFile request failed"),
        }
    }

    async fn download(&self, file: &RemoteFile) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .with_context(|| format!("Failed to download {}", file.path))?;
        debug!("Downloaded {} ({} bytes)", file.path, data.len());
        Ok(data)
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            self.bot
                .send_message(ChatId(chat_id), chunk)
                .await
                .context("sendMessage failed")?;
        }
        Ok(())
    }

    async fn send_voice(&self, chat_id: i64, audio: Vec<u8>) -> Result<()> {
        info!("Sending voice to chat {} ({} bytes)", chat_id, audio.len());
        let input_file = InputFile::memory(audio).file_name("reply.ogg");
        self.bot
            .send_voice(ChatId(chat_id), input_file)
            .await
            .context("sendVoice failed")?;
        Ok(())
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        let url = reqwest::Url::parse(url).with_context(|| format!("Invalid webhook URL: {url}"))?;
        self.bot
            .set_webhook(url)
            .await
            .context("setWebhook failed")?;
        Ok(())
    }
}
