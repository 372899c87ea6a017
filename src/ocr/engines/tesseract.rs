//! Tesseract OCR engine.

use image::GrayImage;
use tokio::process::Command;

use crate::{
    async_utils::{check_for_command_failure, spawn_blocking_propagating_panics},
    errors::OcrError,
    preprocess::encode_png,
    prelude::*,
    process_limit::ProcessLimit,
};

use super::TextExtractor;

/// OCR engine wrapping the `tesseract` CLI tool.
#[derive(Debug)]
pub struct TesseractExtractor {
    /// The executable to run.
    command: PathBuf,
    /// Value for `-l`.
    language: String,
    /// Shared cap on running `tesseract` processes.
    limit: ProcessLimit,
}

impl TesseractExtractor {
    /// Create a new `tesseract` engine.
    pub fn new(command: PathBuf, language: String, limit: ProcessLimit) -> Self {
        Self {
            command,
            language,
            limit,
        }
    }

    /// Run `tesseract` on a PNG and return its text output.
    async fn run(&self, png: Vec<u8>) -> Result<String> {
        // Tesseract wants real files, so stage everything in a private
        // directory that is removed when `tmpdir` drops.
        let tmpdir = tempfile::TempDir::with_prefix("tesseract")?;
        let input_path = tmpdir.path().join("input.png");
        let output_base = tmpdir.path().join("output");
        tokio::fs::write(&input_path, &png)
            .await
            .context("cannot write tesseract input file")?;

        let output = self
            .limit
            .run(|| async {
                Command::new(&self.command)
                    .arg(&input_path)
                    .arg(&output_base)
                    .arg("-l")
                    .arg(&self.language)
                    .output()
                    .await
                    .with_context(|| format!("cannot run {:?}", self.command.display()))
            })
            .await?;
        // Leptonica prints "Error in ..." lines for recoverable problems, so
        // only the exit status counts.
        check_for_command_failure("tesseract", &output)?;

        tokio::fs::read_to_string(output_base.with_extension("txt"))
            .await
            .context("cannot read tesseract output file")
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    #[instrument(level = "debug", skip_all, fields(language = %self.language))]
    async fn extract_text(&self, image: &GrayImage) -> Result<String, OcrError> {
        let image = image.clone();
        let png = spawn_blocking_propagating_panics(move || encode_png(&image)).await?;
        let text = self.run(png).await.map_err(OcrError::Extraction)?;
        debug!(chars = text.chars().count(), "Tesseract finished");
        Ok(text)
    }
}
