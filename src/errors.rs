//! Typed errors for the OCR pipeline.
//!
//! Most of our plumbing uses [`anyhow`], but the HTTP handlers need to tell the
//! different pipeline failures apart, so the pipeline itself returns
//! [`OcrError`].
//!
//! Messages are written to follow an `Error: ` prefix, which both the HTML
//! page and `anyhow`'s top-level reporting add.

use std::io;

use thiserror::Error as ThisError;

use crate::prelude::*;

#[derive(ThisError, Debug)]
pub enum OcrError {
    /// The image we were asked to OCR does not exist.
    #[error("File '{}' not found.", path.display())]
    MissingFile { path: PathBuf },

    /// The bytes could not be decoded as a supported image.
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The recognition engine was unavailable or failed.
    #[error("text extraction failed: {0:#}")]
    Extraction(anyhow::Error),

    /// Local file I/O failed while staging the image.
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),
}

impl OcrError {
    /// A short, stable name for the error kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OcrError::MissingFile { .. } => "missing_file",
            OcrError::Decode(_) => "decode",
            OcrError::Extraction(_) => "extraction",
            OcrError::Io(_) => "io",
        }
    }
}
