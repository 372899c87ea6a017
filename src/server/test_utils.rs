//! Helpers for HTTP handler tests.

use std::sync::Arc;

use axum_test::{
    TestServer,
    multipart::{MultipartForm, Part},
};
use image::{DynamicImage, GrayImage, Luma};
use tempfile::TempDir;

use crate::{
    config::{AppConfig, Variant},
    ocr::test_engine::FakeExtractor,
    test_images::png_bytes,
};

use super::{AppState, router};

/// Dimensions of the default image in test fixtures.
pub const DEFAULT_SIZE: (u32, u32) = (30, 10);

/// A running test server plus the directories it uses.
pub struct TestApp {
    pub server: TestServer,
    pub engine: Arc<FakeExtractor>,
    pub config: AppConfig,
    _dir: TempDir,
}

impl TestApp {
    /// Start a server for `variant`, optionally with a default image.
    pub fn start(variant: Variant, with_default_image: bool, engine: FakeExtractor) -> Self {
        Self::start_with(variant, with_default_image, engine, |_| {})
    }

    /// Like [`TestApp::start`], but lets the caller adjust the config.
    pub fn start_with(
        variant: Variant,
        with_default_image: bool,
        engine: FakeExtractor,
        tweak: impl FnOnce(&mut AppConfig),
    ) -> Self {
        let dir = tempfile::tempdir().expect("cannot create tempdir");
        let upload_dir = dir.path().join("uploads");
        std::fs::create_dir(&upload_dir).expect("cannot create upload dir");

        let mut config = AppConfig::new(variant);
        config.default_image = dir.path().join("image.png");
        config.upload_dir = upload_dir;
        config.preview_dir = dir.path().join("static");
        tweak(&mut config);

        if with_default_image {
            let (w, h) = DEFAULT_SIZE;
            std::fs::write(&config.default_image, gray_png(w, h))
                .expect("cannot write default image");
        }

        let engine = Arc::new(engine);
        let state = AppState::new(config.clone(), engine.clone())
            .expect("cannot build app state");
        let server = TestServer::new(router(state)).expect("cannot start test server");
        Self {
            server,
            engine,
            config,
            _dir: dir,
        }
    }

    /// How many files are sitting in the upload directory.
    pub fn staged_upload_count(&self) -> usize {
        std::fs::read_dir(&self.config.upload_dir)
            .expect("cannot read upload dir")
            .count()
    }
}

/// A flat gray PNG of the given size.
pub fn gray_png(width: u32, height: u32) -> Vec<u8> {
    png_bytes(&DynamicImage::ImageLuma8(GrayImage::from_pixel(
        width,
        height,
        Luma([128]),
    )))
}

/// A multipart form with `data` in the `file` field.
pub fn file_form(file_name: &str, data: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part("file", Part::bytes(data).file_name(file_name))
}

/// What [`FakeExtractor`] says about an image of this size, after trimming.
pub fn fake_text(width: u32, height: u32) -> String {
    format!("{width}x{height} image")
}

