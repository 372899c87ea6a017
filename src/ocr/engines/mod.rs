//! OCR engine interface.
//!
//! We don't recognize any characters ourselves. An engine takes an image that
//! [`crate::preprocess`] has already cleaned up and hands it to something that
//! can.

use std::sync::Arc;

use clap::{Args, ValueEnum};
use image::GrayImage;

use crate::{errors::OcrError, prelude::*, process_limit::ProcessLimit};

pub mod tesseract;

/// Interface to a text recognition engine.
#[async_trait]
pub trait TextExtractor: Send + Sync + 'static {
    /// Recognize the text in a preprocessed image.
    ///
    /// The text is returned exactly as the engine produced it, including any
    /// trailing whitespace or form feeds.
    async fn extract_text(&self, image: &GrayImage) -> Result<String, OcrError>;
}

/// Our supported engines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum EngineType {
    /// The `tesseract` CLI tool, which must be on the `PATH`.
    #[default]
    Tesseract,
}

/// Engine options shared by all subcommands.
#[derive(Args, Clone, Debug)]
pub struct EngineOpts {
    /// The OCR engine to use.
    #[clap(long, value_enum, default_value_t = EngineType::default())]
    pub engine: EngineType,

    /// Language(s) for the engine to recognize, in Tesseract's `-l` format.
    #[clap(long, env = "OCR_LANGUAGE", default_value = "eng")]
    pub language: String,

    /// The `tesseract` executable to run.
    #[clap(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    pub tesseract_cmd: PathBuf,

    /// How many engine processes may run at once. Defaults to one per CPU.
    #[clap(long, env = "OCR_MAX_ENGINE_PROCESSES")]
    pub max_engine_processes: Option<usize>,
}

impl EngineOpts {
    /// Instantiate the selected engine.
    pub fn create_engine(&self) -> Arc<dyn TextExtractor> {
        let limit = self
            .max_engine_processes
            .map_or_else(ProcessLimit::per_cpu, ProcessLimit::new);
        debug!(max_processes = limit.max_processes(), "Engine process limit");
        match self.engine {
            EngineType::Tesseract => Arc::new(tesseract::TesseractExtractor::new(
                self.tesseract_cmd.clone(),
                self.language.clone(),
                limit,
            )),
        }
    }
}
