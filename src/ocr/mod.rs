//! The OCR pipeline: choose an image, preprocess it, extract its text.

use crate::{errors::OcrError, preprocess::preprocess_path, prelude::*};

use self::engines::TextExtractor;

pub mod engines;
pub mod source;

/// Preprocess the image at `path` and run it through `engine`.
///
/// The text is returned untrimmed.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ocr_path(engine: &dyn TextExtractor, path: &Path) -> Result<String, OcrError> {
    let image = preprocess_path(path).await?;
    engine.extract_text(&image).await
}


#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, GrayImage, ImageFormat, Luma};

    use super::{test_engine::FakeExtractor, *};

    #[tokio::test]
    async fn runs_preprocessing_then_engine() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("page.png");
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(GrayImage::from_pixel(30, 10, Luma([9])))
            .write_to(&mut buf, ImageFormat::Png)?;
        std::fs::write(&path, buf.into_inner())?;

        let engine = FakeExtractor::default();
        let text = ocr_path(&engine, &path).await?;
        assert_eq!(text, "  30x10 image\n\x0c");
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_image_never_reaches_engine() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG but not really")?;

        let engine = FakeExtractor::default();
        let err = ocr_path(&engine, &path).await.unwrap_err();
        assert!(matches!(err, OcrError::Decode(_)), "{err:?}");
        assert_eq!(engine.call_count(), 0);
        Ok(())
    }
}
