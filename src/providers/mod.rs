pub mod llm;
pub mod media;
pub mod ocr;
pub mod speech;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{Config, VoiceReplies};
use crate::error::{FallbackExt, ProviderError};
use crate::event::MessageKind;

pub const COMPLETION_FALLBACK: &str = "Sorry, I'm having trouble processing your request.";
pub const TRANSCRIPTION_FALLBACK: &str = "Sorry, I'm having trouble transcribing your audio.";

/// Text completion: prompt in, reply out.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Speech-to-text.
#[async_trait]
pub trait Transcription: Send + Sync {
    async fn transcribe(&self, file_name: &str, audio: Vec<u8>) -> Result<String, ProviderError>;
}

/// Text-to-speech. Returns audio ready to send as a voice message (OGG/Opus).
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Resolves a social-media status link to a downloadable media URL.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// `Ok(None)` when the status has no downloadable media.
    async fn resolve(&self, link: &str) -> Result<Option<String>, ProviderError>;
}

/// Extracts printed text from an image.
#[async_trait]
pub trait TextRecognition: Send + Sync {
    async fn recognize(&self, image: Vec<u8>) -> Result<String, ProviderError>;
}

/// The provider set the orchestrator works with. Completion and
/// transcription are always present; the rest are optional capabilities.
#[derive(Clone)]
pub struct Capabilities {
    pub completion: Arc<dyn Completion>,
    pub transcription: Arc<dyn Transcription>,
    pub speech: Option<Arc<dyn SpeechSynthesis>>,
    pub voice_replies: VoiceReplies,
    pub media: Option<Arc<dyn MediaResolver>>,
    pub ocr: Option<Arc<dyn TextRecognition>>,
}

impl Capabilities {
    pub fn new(completion: Arc<dyn Completion>, transcription: Arc<dyn Transcription>) -> Self {
        Self {
            completion,
            transcription,
            speech: None,
            voice_replies: VoiceReplies::default(),
            media: None,
            ocr: None,
        }
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesis>, replies: VoiceReplies) -> Self {
        self.speech = Some(speech);
        self.voice_replies = replies;
        self
    }

    pub fn with_media(mut self, media: Arc<dyn MediaResolver>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn TextRecognition>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Build the real HTTP-backed providers from configuration.
    pub fn from_config(config: &Config) -> Self {
        let completion = Arc::new(llm::LlmClient::new(config.llm.clone()));
        let transcription = Arc::new(llm::TranscriptionClient::new(
            config.transcription_base_url(),
            config.transcription_api_key(),
            &config.transcription.model,
        ));
        let mut caps = Self::new(completion, transcription);

        if let Some(speech) = &config.speech {
            info!("Voice replies enabled via {} ({:?})", speech.endpoint, speech.replies);
            caps = caps.with_speech(
                Arc::new(speech::TtsClient::new(speech.clone())),
                speech.replies,
            );
        }
        if let Some(media) = &config.media {
            if media.rapidapi_key.is_empty() {
                warn!("[media] configured without rapidapi_key, status links will go to the AI");
            } else {
                caps = caps.with_media(Arc::new(media::TwitterResolver::new(media.clone())));
            }
        }
        if let Some(ocr) = &config.ocr {
            info!("OCR enabled using '{}'", ocr.command);
            caps = caps.with_ocr(Arc::new(ocr::TesseractOcr::new(ocr.command.clone())));
        }

        caps
    }

    /// Completion with the user-facing fallback applied.
    pub async fn complete(&self, prompt: &str) -> String {
        self.completion
            .complete(prompt)
            .await
            .or_fallback("Completion", COMPLETION_FALLBACK)
    }

    /// Transcription with the user-facing fallback applied.
    pub async fn transcribe(&self, file_name: &str, audio: Vec<u8>) -> String {
        self.transcription
            .transcribe(file_name, audio)
            .await
            .or_fallback("Transcription", TRANSCRIPTION_FALLBACK)
    }

    /// Speech for a reply to a message of `kind`, or `None` when voice replies
    /// are off for that kind or synthesis failed.
    pub async fn synthesize_reply(&self, kind: MessageKind, text: &str) -> Option<Vec<u8>> {
        let speech = self.speech.as_ref()?;
        if self.voice_replies == VoiceReplies::VoiceOnly && kind != MessageKind::Voice {
            return None;
        }
        match speech.synthesize(text).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!("Speech synthesis failed, skipping voice reply: {}", e);
                None
            }
        }
    }
}
