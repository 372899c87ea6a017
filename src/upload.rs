//! Receiving and validating uploaded images.
//!
//! Uploads are streamed out of the multipart body so that an oversized file is
//! rejected as soon as it crosses the ceiling, without ever reaching the
//! preprocessor. Accepted uploads are written to a randomly named temporary
//! file which is deleted when the [`TempUpload`] is dropped.

use std::io::Write as _;

use axum::extract::Multipart;
use tempfile::NamedTempFile;
use thiserror::Error as ThisError;

use crate::{
    async_utils::spawn_blocking_propagating_panics,
    data_url::{data_url, sniff_image_mime_type},
    errors::OcrError,
    prelude::*,
};

/// Image extensions we accept from browsers.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

/// Uploads must be strictly smaller than this.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// The multipart field holding the image.
pub const FILE_FIELD: &str = "file";

/// Limits applied to browser uploads.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Uploads of this many bytes or more are rejected.
    pub max_bytes: u64,
    /// Lowercase file extensions, without the dot.
    pub allowed_extensions: &'static [&'static str],
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            allowed_extensions: ALLOWED_EXTENSIONS,
        }
    }
}

impl UploadLimits {
    /// Check that a file name has an allowed extension.
    pub fn check_file_name(&self, file_name: Option<&str>) -> Result<(), UploadRejection> {
        let file_name = match file_name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(UploadRejection::NoFilename),
        };
        let extension = Path::new(file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if self.allowed_extensions.contains(&extension.as_str()) {
            Ok(())
        } else {
            Err(UploadRejection::DisallowedExtension { extension })
        }
    }

    /// Check that `size` bytes is under the ceiling.
    pub fn check_size(&self, size: u64) -> Result<(), UploadRejection> {
        if size < self.max_bytes {
            Ok(())
        } else {
            Err(UploadRejection::TooLarge {
                size,
                limit: self.max_bytes,
            })
        }
    }
}

/// What the browser told us about an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    /// The original file name, if any.
    pub file_name: Option<String>,
    /// The declared content type, if any.
    pub content_type: Option<String>,
    /// Bytes received.
    pub size: u64,
}

/// Why an upload was not accepted.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("upload has no file name")]
    NoFilename,

    #[error("file extension {extension:?} is not allowed")]
    DisallowedExtension { extension: String },

    #[error("upload of at least {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("cannot read upload: {message}")]
    Malformed { message: String },
}

/// Validate an upload's name and size.
pub fn validate_upload(
    metadata: &UploadMetadata,
    limits: &UploadLimits,
) -> Result<(), UploadRejection> {
    limits.check_file_name(metadata.file_name.as_deref())?;
    limits.check_size(metadata.size)
}

/// An accepted upload, staged on disk.
///
/// Dropping this deletes the temporary file, on success and failure alike.
#[derive(Debug)]
pub struct TempUpload {
    file: NamedTempFile,
    data: Vec<u8>,
    pub metadata: UploadMetadata,
}

impl TempUpload {
    /// Stage `data` in a uniquely named file inside `dir`.
    pub async fn create(
        dir: &Path,
        data: Vec<u8>,
        metadata: UploadMetadata,
    ) -> Result<Self, OcrError> {
        let suffix = metadata
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        let dir = dir.to_owned();
        let (file, data) = spawn_blocking_propagating_panics(move || {
            let mut file = tempfile::Builder::new()
                .prefix("upload-")
                .suffix(&suffix)
                .tempfile_in(&dir)?;
            file.write_all(&data)?;
            file.flush()?;
            Ok::<_, std::io::Error>((file, data))
        })
        .await?;
        Ok(Self {
            file,
            data,
            metadata,
        })
    }

    /// Where the upload lives on disk.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// A `data:` URL for showing the upload back to the user.
    pub fn preview_data_url(&self) -> String {
        let mime_type =
            sniff_image_mime_type(&self.data, self.metadata.file_name.as_deref());
        data_url(&mime_type, &self.data)
    }
}

/// The result of looking for an upload in a request.
#[derive(Debug)]
pub enum UploadOutcome {
    /// A file was uploaded and passed validation.
    Accepted(TempUpload),
    /// No file was uploaded.
    Missing,
    /// A file was uploaded but we won't use it.
    Rejected(UploadRejection),
}

/// Pull the `file` field out of a multipart body and stage it on disk.
///
/// With `limits`, the file name and size are validated and a field without a
/// file name counts as missing. Without `limits`, any `file` field is accepted.
/// `Err` is reserved for local I/O failures.
#[instrument(level = "debug", skip_all)]
pub async fn receive_upload(
    multipart: &mut Multipart,
    upload_dir: &Path,
    limits: Option<&UploadLimits>,
) -> Result<UploadOutcome, OcrError> {
    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(UploadOutcome::Missing),
            Err(err) => {
                return Ok(UploadOutcome::Rejected(UploadRejection::Malformed {
                    message: err.body_text(),
                }));
            }
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let mut metadata = UploadMetadata {
            file_name: field.file_name().map(str::to_owned),
            content_type: field.content_type().map(str::to_owned),
            size: 0,
        };
        if let Some(limits) = limits {
            // Browsers send an empty, nameless part when nothing was chosen.
            if metadata.file_name.as_deref().unwrap_or_default().is_empty() {
                return Ok(UploadOutcome::Missing);
            }
            if let Err(rejection) = limits.check_file_name(metadata.file_name.as_deref())
            {
                return Ok(UploadOutcome::Rejected(rejection));
            }
        }

        let mut data = Vec::new();
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(err) => {
                    return Ok(UploadOutcome::Rejected(UploadRejection::Malformed {
                        message: err.body_text(),
                    }));
                }
            };
            metadata.size += chunk.len() as u64;
            if let Some(limits) = limits {
                if let Err(rejection) = limits.check_size(metadata.size) {
                    warn!(
                        size = metadata.size,
                        limit = limits.max_bytes,
                        "Upload too large, ignoring it"
                    );
                    return Ok(UploadOutcome::Rejected(rejection));
                }
            }
            data.extend_from_slice(&chunk);
        }

        if let Some(limits) = limits {
            if let Err(rejection) = validate_upload(&metadata, limits) {
                return Ok(UploadOutcome::Rejected(rejection));
            }
        }
        debug!(
            file_name = ?metadata.file_name,
            content_type = ?metadata.content_type,
            size = metadata.size,
            "Received upload"
        );
        let upload = TempUpload::create(upload_dir, data, metadata).await?;
        return Ok(UploadOutcome::Accepted(upload));
    }
}
