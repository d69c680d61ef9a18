use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

use super::TextRecognition;
use crate::error::ProviderError;

/// OCR through the `tesseract` command line tool.
pub struct TesseractOcr {
    command: String,
}

impl TesseractOcr {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

#[async_trait]
impl TextRecognition for TesseractOcr {
    async fn recognize(&self, image: Vec<u8>) -> Result<String, ProviderError> {
        // tesseract needs a seekable input file
        let input_path = std::env::temp_dir().join(format!("ocr_input_{}.img", Uuid::new_v4()));
        tokio::fs::write(&input_path, &image)
            .await
            .map_err(|e| ProviderError::Transcode(format!("failed to write temp image: {e}")))?;

        let result = Command::new(&self.command)
            .arg(&input_path)
            .arg("stdout")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let _ = tokio::fs::remove_file(&input_path).await;

        let output = result
            .map_err(|e| ProviderError::Transcode(format!("failed to run {}: {e}", self.command)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::Transcode(format!("OCR failed: {stderr}")));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("OCR extracted {} chars from {} bytes", text.len(), image.len());
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }
}
