//! Recording stubs for the provider, platform and audit seams.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::audit::{AuditRecord, AuditSink};
use crate::error::ProviderError;
use crate::platform::{ChatPlatform, RemoteFile};
use crate::providers::{
    Completion, MediaResolver, SpeechSynthesis, TextRecognition, Transcription,
};

fn unavailable() -> ProviderError {
    ProviderError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

/// Completion that records prompts and answers with a fixed reply or an error.
#[derive(Clone)]
pub struct StubCompletion {
    reply: Option<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl StubCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Arc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for StubCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or_else(unavailable)
    }
}

pub struct StubTranscription {
    text: Option<String>,
}

impl StubTranscription {
    pub fn replying(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { text: None }
    }
}

#[async_trait]
impl Transcription for StubTranscription {
    async fn transcribe(&self, _file_name: &str, _audio: Vec<u8>) -> Result<String, ProviderError> {
        self.text.clone().ok_or_else(unavailable)
    }
}

pub struct StubSpeech {
    audio: Option<Vec<u8>>,
}

impl StubSpeech {
    pub fn producing(audio: Vec<u8>) -> Self {
        Self { audio: Some(audio) }
    }

    pub fn failing() -> Self {
        Self { audio: None }
    }
}

#[async_trait]
impl SpeechSynthesis for StubSpeech {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, ProviderError> {
        self.audio
            .clone()
            .ok_or_else(|| ProviderError::Transcode("ffmpeg missing".to_string()))
    }
}

#[derive(Clone)]
pub struct StubMedia {
    url: Option<String>,
    links: Arc<Mutex<Vec<String>>>,
}

impl StubMedia {
    pub fn resolving(url: Option<&str>) -> Self {
        Self {
            url: url.map(str::to_string),
            links: Arc::default(),
        }
    }

    pub fn links(&self) -> Vec<String> {
        self.links.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaResolver for StubMedia {
    async fn resolve(&self, link: &str) -> Result<Option<String>, ProviderError> {
        self.links.lock().unwrap().push(link.to_string());
        Ok(self.url.clone())
    }
}

pub struct StubOcr {
    text: Option<String>,
}

impl StubOcr {
    pub fn recognizing(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { text: None }
    }
}

#[async_trait]
impl TextRecognition for StubOcr {
    async fn recognize(&self, _image: Vec<u8>) -> Result<String, ProviderError> {
        self.text.clone().ok_or(ProviderError::EmptyResponse)
    }
}

#[derive(Default)]
struct PlatformLog {
    texts: Vec<(i64, String)>,
    voices: Vec<(i64, Vec<u8>)>,
    attempts: usize,
    webhooks: Vec<String>,
}

/// Platform that resolves every file id to `files/{id}` and records sends.
#[derive(Clone, Default)]
pub struct StubPlatform {
    lookup_fails: bool,
    sends_fail: bool,
    download_fails: bool,
    log: Arc<Mutex<PlatformLog>>,
}

impl StubPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// `getFile` answers `ok: false` for every id.
    pub fn failing_lookup() -> Self {
        Self {
            lookup_fails: true,
            ..Self::default()
        }
    }

    /// Lookups succeed but fetching the file body errors.
    pub fn failing_download() -> Self {
        Self {
            download_fails: true,
            ..Self::default()
        }
    }

    /// Every send and `setWebhook` call errors.
    pub fn failing_sends() -> Self {
        Self {
            sends_fail: true,
            ..Self::default()
        }
    }

    pub fn sent_texts(&self) -> Vec<(i64, String)> {
        self.log.lock().unwrap().texts.clone()
    }

    pub fn sent_voices(&self) -> Vec<(i64, Vec<u8>)> {
        self.log.lock().unwrap().voices.clone()
    }

    pub fn attempted_sends(&self) -> usize {
        self.log.lock().unwrap().attempts
    }

    pub fn webhooks(&self) -> Vec<String> {
        self.log.lock().unwrap().webhooks.clone()
    }
}

#[async_trait]
impl ChatPlatform for StubPlatform {
    async fn get_file(&self, file_id: &str) -> Result<Option<RemoteFile>> {
        if self.lookup_fails {
            return Ok(None);
        }
        let path = format!("files/{file_id}");
        Ok(Some(RemoteFile {
            url: format!("https://files.example/{path}"),
            path,
        }))
    }

    async fn download(&self, file: &RemoteFile) -> Result<Vec<u8>> {
        if self.download_fails {
            bail!("Failed to download {}: 404 Not Found", file.path);
        }
        Ok(vec![0x4f, 0x67, 0x67, 0x53])
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.attempts += 1;
        if self.sends_fail {
            bail!("connection reset");
        }
        log.texts.push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_voice(&self, chat_id: i64, audio: Vec<u8>) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.attempts += 1;
        if self.sends_fail {
            bail!("connection reset");
        }
        log.voices.push((chat_id, audio));
        Ok(())
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        if self.sends_fail {
            bail!("Unauthorized");
        }
        self.log.lock().unwrap().webhooks.push(url.to_string());
        Ok(())
    }
}

/// In-memory audit sink, optionally failing every append.
#[derive(Clone, Default)]
pub struct MemorySink {
    fails: bool,
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fails: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        if self.fails {
            bail!("database is locked");
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
