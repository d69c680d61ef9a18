//! Text-to-speech for voice replies.
//!
//! Detects the reply's language, asks the TTS server for WAV audio in that
//! language and converts it to OGG Opus, the only codec Telegram plays as a
//! voice message.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use super::SpeechSynthesis;
use crate::config::SpeechConfig;
use crate::error::ProviderError;

/// TTS client for a Fish Speech compatible `/v1/tts` endpoint.
pub struct TtsClient {
    config: SpeechConfig,
    client: reqwest::Client,
}

impl TtsClient {
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SpeechSynthesis for TtsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
        let language = detect_language(text);
        let preview: String = text.chars().take(50).collect();
        info!("TTS [{}]: \"{}\"", language, preview);

        let mut body = serde_json::json!({
            "text": text,
            "format": "wav",
            "language": language,
        });
        if let Some(voice) = &self.config.voice {
            body["reference_id"] = serde_json::Value::String(voice.clone());
        }

        let response = self
            .client
            .post(format!("{}/v1/tts", self.config.endpoint))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let wav_data = response.bytes().await?;
        if wav_data.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        debug!("Got {} bytes of WAV audio", wav_data.len());

        let ogg_data = convert_wav_to_ogg(&self.config.ffmpeg_path, &wav_data).await?;

        info!("Generated {} bytes of voice audio", ogg_data.len());
        Ok(ogg_data)
    }
}

/// ISO 639-1 code of the text's language, `en` when unsure.
pub fn detect_language(text: &str) -> &'static str {
    whatlang::detect(text)
        .filter(|info| info.is_reliable())
        .map(|info| iso639_1(info.lang().code()))
        .unwrap_or("en")
}

fn iso639_1(code: &str) -> &'static str {
    match code {
        "eng" => "en",
        "spa" => "es",
        "fra" => "fr",
        "deu" => "de",
        "ita" => "it",
        "por" => "pt",
        "nld" => "nl",
        "rus" => "ru",
        "ukr" => "uk",
        "pol" => "pl",
        "ces" => "cs",
        "tur" => "tr",
        "ara" => "ar",
        "heb" => "he",
        "hin" => "hi",
        "ben" => "bn",
        "urd" => "ur",
        "tam" => "ta",
        "tel" => "te",
        "mar" => "mr",
        "guj" => "gu",
        "pan" => "pa",
        "cmn" => "zh",
        "jpn" => "ja",
        "kor" => "ko",
        "vie" => "vi",
        "tha" => "th",
        "ind" => "id",
        "swe" => "sv",
        "dan" => "da",
        "fin" => "fi",
        "nob" => "no",
        "ell" => "el",
        "hun" => "hu",
        "ron" => "ro",
        _ => "en",
    }
}

/// Convert WAV audio to OGG Opus using ffmpeg.
async fn convert_wav_to_ogg(ffmpeg: &str, wav_data: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let temp_dir = std::env::temp_dir();
    let id = Uuid::new_v4();
    let input_path = temp_dir.join(format!("tts_input_{id}.wav"));
    let output_path = temp_dir.join(format!("tts_output_{id}.ogg"));

    tokio::fs::write(&input_path, wav_data)
        .await
        .map_err(|e| ProviderError::Transcode(format!("failed to write temp WAV: {e}")))?;

    let result = run_ffmpeg(ffmpeg, &input_path, &output_path).await;

    let _ = tokio::fs::remove_file(&input_path).await;
    let ogg_data = match result {
        Ok(()) => tokio::fs::read(&output_path)
            .await
            .map_err(|e| ProviderError::Transcode(format!("failed to read OGG output: {e}"))),
        Err(e) => Err(e),
    };
    let _ = tokio::fs::remove_file(&output_path).await;

    let ogg_data = ogg_data?;
    debug!("Converted WAV ({} bytes) to OGG ({} bytes)", wav_data.len(), ogg_data.len());
    Ok(ogg_data)
}

async fn run_ffmpeg(ffmpeg: &str, input: &Path, output: &Path) -> Result<(), ProviderError> {
    let result = Command::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-c:a", "libopus", "-b:a", "64k"])
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ProviderError::Transcode(format!("failed to run {ffmpeg}: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(ProviderError::Transcode(format!("ffmpeg conversion failed: {stderr}")));
    }
    Ok(())
}
