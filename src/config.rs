//! Server configuration.
//!
//! Everything is gathered once at startup into an [`AppConfig`], which the
//! handlers only ever read.

use clap::ValueEnum;

use crate::{prelude::*, upload::UploadLimits};

/// Which HTTP surface to serve.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum Variant {
    /// A browser page with an upload form.
    #[default]
    Html,
    /// A JSON API at `POST /ocr`.
    Json,
}

impl Variant {
    /// The port to use when `PORT` is not set.
    pub fn default_port(self) -> u16 {
        match self {
            Variant::Html => 5000,
            Variant::Json => 10000,
        }
    }
}

/// Immutable configuration shared by all request handlers.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Which routes to serve.
    pub variant: Variant,
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Image to OCR when no usable upload was sent.
    pub default_image: PathBuf,
    /// Where uploads are staged while we OCR them.
    pub upload_dir: PathBuf,
    /// Where the web-servable copy of the default image is kept.
    pub preview_dir: PathBuf,
    /// Limits for browser uploads.
    pub upload_limits: UploadLimits,
}

impl AppConfig {
    /// A configuration suitable for local use, for the given variant.
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            host: "0.0.0.0".to_owned(),
            port: variant.default_port(),
            default_image: PathBuf::from("image.jpg"),
            upload_dir: std::env::temp_dir(),
            preview_dir: PathBuf::from("static"),
            upload_limits: UploadLimits::default(),
        }
    }

    /// Largest request body we will read. Multipart framing needs a little
    /// room beyond the upload limit itself, so that we, and not the
    /// framework, get to decide what an oversized upload means.
    pub fn max_body_bytes(&self) -> usize {
        const MULTIPART_OVERHEAD: u64 = 64 * 1024;
        usize::try_from(self.upload_limits.max_bytes + MULTIPART_OVERHEAD)
            .unwrap_or(usize::MAX)
    }
}
