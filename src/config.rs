use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Groq,
    Openrouter,
    Ollama,
    Openai,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Groq => write!(f, "groq"),
            LlmProvider::Openrouter => write!(f, "openrouter"),
            LlmProvider::Ollama => write!(f, "ollama"),
            LlmProvider::Openai => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Optional system message. When absent the prompt is sent as the only message.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl LlmConfig {
    /// Returns the effective base_url: if the stored value is empty,
    /// fall back to the canonical URL for the configured provider.
    pub fn effective_base_url(&self) -> &str {
        if !self.base_url.is_empty() {
            return &self.base_url;
        }
        match self.provider {
            LlmProvider::Groq => "https://api.groq.com/openai/v1",
            LlmProvider::Openrouter => "https://openrouter.ai/api/v1",
            LlmProvider::Ollama => "http://localhost:11434/v1",
            LlmProvider::Openai => "https://api.openai.com/v1",
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            base_url: String::new(),
            api_key: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            system_prompt: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    pub speech: Option<SpeechConfig>,
    pub media: Option<MediaConfig>,
    pub ocr: Option<OcrConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub replies: RepliesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
    /// Public URL registered with `setWebhook`.
    #[serde(default)]
    pub webhook_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptionConfig {
    #[serde(default = "default_transcription_model")]
    pub model: String,
    /// Defaults to the [llm] base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Defaults to the [llm] API key.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: default_transcription_model(),
            base_url: None,
            api_key: None,
        }
    }
}

/// Which AI replies also go out as synthesized voice messages.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VoiceReplies {
    /// Only replies to inbound voice messages.
    VoiceOnly,
    /// Every reply produced by the completion provider.
    #[default]
    All,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpeechConfig {
    /// Base URL of the TTS server, e.g. "http://localhost:8880".
    pub endpoint: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub replies: VoiceReplies,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    #[serde(default)]
    pub rapidapi_key: String,
    #[serde(default = "default_rapidapi_host")]
    pub rapidapi_host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_command")]
    pub command: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepliesConfig {
    /// Sent for content kinds the relay does not understand.
    #[serde(default = "default_fallback_link")]
    pub fallback_link: String,
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            fallback_link: default_fallback_link(),
        }
    }
}

fn default_model() -> String {
    "llama-3.2-1b-preview".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_top_p() -> f32 {
    1.0
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_transcription_model() -> String {
    "whisper-large-v3".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_rapidapi_host() -> String {
    "twitter-downloader-download-twitter-videos-gifs-and-images.p.rapidapi.com".to_string()
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("relay.db")
}

fn default_fallback_link() -> String {
    "https://blogforge.pythonanywhere.com/blogs/".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML")
    }

    /// Fill empty secrets from the environment. Values already set in the
    /// file win.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |slot: &mut String, keys: &[&str]| {
            if !slot.is_empty() {
                return;
            }
            if let Some(value) = keys.iter().find_map(|k| lookup(*k).filter(|v| !v.is_empty())) {
                *slot = value;
            }
        };

        fill(&mut self.telegram.bot_token, &["TELEGRAM_BOT_TOKEN"]);
        fill(&mut self.telegram.webhook_url, &["WEBHOOK_URL"]);
        fill(&mut self.llm.api_key, &["LLM_API_KEY", "GROQ_API_KEY"]);
        if let Some(media) = self.media.as_mut() {
            fill(&mut media.rapidapi_key, &["X_RAPIDAPI_KEY"]);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            anyhow::bail!("telegram.bot_token is required (or set TELEGRAM_BOT_TOKEN)");
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        match self.telegram.bot_token.split_once(':') {
            Some((id, secret))
                if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && !secret.is_empty() => {}
            _ => anyhow::bail!("telegram.bot_token must look like <bot_id>:<secret>"),
        }
        if self.llm.api_key.is_empty() && self.llm.provider != LlmProvider::Ollama {
            anyhow::bail!(
                "llm.api_key is required for provider '{}' (or set LLM_API_KEY)",
                self.llm.provider
            );
        }
        Ok(())
    }

    pub fn transcription_base_url(&self) -> &str {
        self.transcription
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.llm.effective_base_url())
    }

    pub fn transcription_api_key(&self) -> &str {
        self.transcription
            .api_key
            .as_deref()
            .unwrap_or(&self.llm.api_key)
    }
}
