//! The browser-facing variant: an upload form and the extracted text.
//!
//! This variant never answers with an HTTP error for OCR problems. Bad uploads
//! fall back to the default image, and pipeline failures are shown to the user
//! in place of the text.

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use handlebars::Handlebars;
use serde::Serialize;
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    ocr::{ocr_path, source::ImageSource},
    prelude::*,
    upload::{UploadOutcome, UploadRejection, receive_upload},
};

use super::{
    AppState,
    preview::{PREVIEW_ROUTE, default_preview_url},
};

/// Our page template.
const INDEX_TEMPLATE: &str = include_str!("index.html.hbs");

/// Template values for the page.
#[derive(Debug, Serialize)]
struct IndexPage {
    /// Extracted text, or an error message.
    text: String,
    /// Where the browser can load the image we OCRed.
    preview_url: Option<String>,
    /// Value for the file input's `accept` attribute.
    accept: String,
}

/// Register the templates used by this module.
pub fn register_templates(templates: &mut Handlebars<'static>) -> Result<()> {
    templates
        .register_template_string("index", INDEX_TEMPLATE)
        .context("cannot compile index template")
}

/// Routes for the HTML variant.
pub fn routes(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .route("/", get(show_default).post(show_upload))
        .nest_service(PREVIEW_ROUTE, ServeDir::new(&config.preview_dir))
        .layer(DefaultBodyLimit::max(config.max_body_bytes()))
}

/// `GET /`: OCR the default image.
#[instrument(level = "info", skip_all, fields(request_id = %Uuid::new_v4()))]
async fn show_default(State(state): State<AppState>) -> Response {
    let source = ImageSource::resolve(UploadOutcome::Missing, &state.config.default_image);
    render_page(&state, source).await
}

/// `POST /`: OCR the upload if it's usable, or the default image if not.
#[instrument(level = "info", skip_all, fields(request_id = %Uuid::new_v4()))]
async fn show_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let outcome = match multipart {
        Ok(mut multipart) => {
            receive_upload(
                &mut multipart,
                &state.config.upload_dir,
                Some(&state.config.upload_limits),
            )
            .await
        }
        Err(rejection) => Ok(UploadOutcome::Rejected(UploadRejection::Malformed {
            message: rejection.body_text(),
        })),
    };
    let source = match outcome {
        Ok(outcome) => ImageSource::resolve(outcome, &state.config.default_image),
        Err(err) => ImageSource::Fail(err),
    };
    render_page(&state, source).await
}

/// Run the pipeline on `source` and render the page.
async fn render_page(state: &AppState, source: ImageSource) -> Response {
    let (result, preview_url) = match source {
        ImageSource::UseUpload(upload) => {
            let result = ocr_path(state.engine.as_ref(), upload.path()).await;
            (result, Some(upload.preview_data_url()))
        }
        ImageSource::UseDefault(path) => {
            let preview_url = default_preview_url(&path, &state.config.preview_dir).await;
            (ocr_path(state.engine.as_ref(), &path).await, preview_url)
        }
        ImageSource::Fail(err) => (Err(err), None),
    };

    let text = match result {
        Ok(text) => text.trim().to_owned(),
        Err(err) => {
            warn!(kind = err.kind(), "OCR failed: {}", err);
            format!("Error: {err}")
        }
    };
    let page = IndexPage {
        text,
        preview_url,
        accept: state
            .config
            .upload_limits
            .allowed_extensions
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(","),
    };

    match state.templates.render("index", &page) {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!("Cannot render index page: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "cannot render page").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::multipart::MultipartForm;

    use crate::{
        config::Variant,
        ocr::test_engine::FakeExtractor,
        server::test_utils::{DEFAULT_SIZE, TestApp, fake_text, file_form, gray_png},
    };

    fn default_text() -> String {
        fake_text(DEFAULT_SIZE.0, DEFAULT_SIZE.1)
    }

    #[tokio::test]
    async fn get_shows_default_image_text_and_preview() {
        let app = TestApp::start(Variant::Html, true, FakeExtractor::default());

        let response = app.server.get("/").await;

        response.assert_status(StatusCode::OK);
        let body = response.text();
        assert!(body.contains("<h1>OCR Result</h1>"));
        // Trimmed, so no leading spaces or trailing form feed.
        assert!(body.contains(&format!(">{}</pre>", default_text())), "{body}");
        assert!(body.contains("/preview/image.png"), "{body}");
    }

    #[tokio::test]
    async fn preview_copy_is_served() {
        let app = TestApp::start(Variant::Html, true, FakeExtractor::default());
        app.server.get("/").await.assert_status(StatusCode::OK);

        let preview = app.server.get("/preview/image.png").await;

        preview.assert_status(StatusCode::OK);
        assert_eq!(preview.as_bytes().as_ref(), gray_png(30, 10).as_slice());
    }

    #[tokio::test]
    async fn missing_default_image_is_reported_inline() {
        let app = TestApp::start(Variant::Html, false, FakeExtractor::default());

        let response = app.server.get("/").await;

        response.assert_status(StatusCode::OK);
        let body = response.text();
        let path = app.config.default_image.display().to_string();
        assert!(body.contains("Error: File "), "{body}");
        assert!(body.contains(&path), "{body}");
        assert!(body.contains("not found."), "{body}");
        assert_eq!(app.engine.call_count(), 0);
    }

    #[tokio::test]
    async fn valid_upload_is_used_and_cleaned_up() {
        let app = TestApp::start(Variant::Html, true, FakeExtractor::default());

        let response = app
            .server
            .post("/")
            .multipart(file_form("scan.png", gray_png(12, 34)))
            .await;

        response.assert_status(StatusCode::OK);
        let body = response.text();
        assert!(body.contains(&fake_text(12, 34)), "{body}");
        assert!(body.contains("data:image/png;base64,"), "{body}");
        assert_eq!(app.staged_upload_count(), 0);
    }

    #[tokio::test]
    async fn failed_extraction_still_cleans_up_upload() {
        let app = TestApp::start(Variant::Html, true, FakeExtractor::failing());

        let response = app
            .server
            .post("/")
            .multipart(file_form("scan.png", gray_png(12, 34)))
            .await;

        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Error: text extraction failed"));
        assert_eq!(app.engine.call_count(), 1);
        assert_eq!(app.staged_upload_count(), 0);
    }

    #[tokio::test]
    async fn corrupt_upload_shows_decode_error() {
        let app = TestApp::start(Variant::Html, true, FakeExtractor::default());

        let response = app
            .server
            .post("/")
            .multipart(file_form("scan.png", b"not a png".to_vec()))
            .await;

        assert!(response.text().contains("Error: cannot decode image"));
        assert_eq!(app.engine.call_count(), 0);
        assert_eq!(app.staged_upload_count(), 0);
    }

    #[tokio::test]
    async fn disallowed_extension_falls_back_to_default() {
        let app = TestApp::start(Variant::Html, true, FakeExtractor::default());

        let response = app
            .server
            .post("/")
            .multipart(file_form("scan.txt", gray_png(12, 34)))
            .await;

        response.assert_status(StatusCode::OK);
        let body = response.text();
        assert!(body.contains(&default_text()), "{body}");
        assert!(!body.contains(&fake_text(12, 34)), "{body}");
        assert_eq!(app.staged_upload_count(), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_before_preprocessing() {
        let app = TestApp::start_with(Variant::Html, true, FakeExtractor::default(), |config| {
            config.upload_limits.max_bytes = 64;
        });
        let upload = gray_png(200, 200);
        assert!(upload.len() > 64);

        let response = app
            .server
            .post("/")
            .multipart(file_form("big.png", upload))
            .await;

        response.assert_status(StatusCode::OK);
        let body = response.text();
        assert!(body.contains(&default_text()), "{body}");
        // Only the default image reached the engine.
        assert_eq!(app.engine.call_count(), 1);
        assert_eq!(app.staged_upload_count(), 0);
    }

    #[tokio::test]
    async fn body_over_transport_limit_falls_back_to_default() {
        let app = TestApp::start_with(Variant::Html, true, FakeExtractor::default(), |config| {
            config.upload_limits.max_bytes = 64;
        });
        let mut upload = gray_png(12, 34);
        upload.resize(app.config.max_body_bytes() * 2, 0);

        let response = app
            .server
            .post("/")
            .multipart(file_form("huge.png", upload))
            .await;

        response.assert_status(StatusCode::OK);
        assert!(response.text().contains(&default_text()));
        assert_eq!(app.engine.call_count(), 1);
        assert_eq!(app.staged_upload_count(), 0);
    }

    #[tokio::test]
    async fn post_without_file_uses_default() {
        let app = TestApp::start(Variant::Html, true, FakeExtractor::default());

        let response = app
            .server
            .post("/")
            .multipart(MultipartForm::new().add_text("note", "hello"))
            .await;

        response.assert_status(StatusCode::OK);
        assert!(response.text().contains(&default_text()));
    }

    #[tokio::test]
    async fn post_without_multipart_body_uses_default() {
        let app = TestApp::start(Variant::Html, true, FakeExtractor::default());

        let response = app.server.post("/").text("plain body").await;

        response.assert_status(StatusCode::OK);
        assert!(response.text().contains(&default_text()));
    }

    #[tokio::test]
    async fn extracted_text_is_html_escaped() {
        let app = TestApp::start_with(Variant::Html, false, FakeExtractor::default(), |config| {
            config.default_image = config.upload_dir.join("<b>.png");
        });

        let body = app.server.get("/").await.text();

        assert!(!body.contains("<b>.png"), "{body}");
        assert!(body.contains("&lt;b&gt;.png"), "{body}");
    }
}
