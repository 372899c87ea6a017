//! Deciding which image a request should OCR.
//!
//! An upload is used if it was accepted. Otherwise we fall back to the
//! configured default image, and if that is gone too, the request fails with a
//! [`OcrError::MissingFile`] that handlers render like any other error.

use crate::{
    errors::OcrError,
    prelude::*,
    upload::{TempUpload, UploadOutcome},
};

/// Where a request's image comes from.
#[derive(Debug)]
pub enum ImageSource {
    /// OCR the uploaded file.
    UseUpload(TempUpload),
    /// OCR the default image at this path.
    UseDefault(PathBuf),
    /// There is nothing to OCR.
    Fail(OcrError),
}

impl ImageSource {
    /// Pick an image source for a request.
    pub fn resolve(upload: UploadOutcome, default_image: &Path) -> Self {
        match upload {
            UploadOutcome::Accepted(upload) => ImageSource::UseUpload(upload),
            UploadOutcome::Missing => Self::default_or_fail(default_image),
            UploadOutcome::Rejected(rejection) => {
                info!(%rejection, "Falling back to default image");
                Self::default_or_fail(default_image)
            }
        }
    }

    fn default_or_fail(default_image: &Path) -> Self {
        if default_image.is_file() {
            ImageSource::UseDefault(default_image.to_owned())
        } else {
            ImageSource::Fail(OcrError::MissingFile {
                path: default_image.to_owned(),
            })
        }
    }
}
