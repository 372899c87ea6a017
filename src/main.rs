use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::{prelude::*, ui::Ui};

mod async_utils;
mod cmd;
mod config;
mod data_url;
mod errors;
mod ocr;
mod prelude;
mod preprocess;
mod process_limit;
mod server;
#[cfg(test)]
mod test_images;
mod ui;
mod upload;

/// Extract text from images with Tesseract, over HTTP or from the command line.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - PORT: Port for `serve` (default 5000, or 10000 with `--variant json`).
  - OCR_VARIANT, OCR_DEFAULT_IMAGE, OCR_UPLOAD_DIR, OCR_PREVIEW_DIR:
    Defaults for the matching `serve` options.
  - OCR_LANGUAGE, TESSERACT_CMD: Engine settings.
  - RUST_LOG: Log filter (default "info").

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// Serve the OCR web page or JSON API.
    Serve(cmd::serve::ServeOpts),
    /// OCR a single image and print the text.
    Ocr(cmd::ocr::OcrOpts),
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main]
async fn main() -> Result<()> {
    let ui = Ui::init();

    // Initialize tracing.
    let directive =
        Directive::from_str("info").expect("built-in directive should be valid");
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(ui.get_stderr_writer())
        .with_filter(env_filter);

    // We can stack multiple layers here if we need to.
    tracing_subscriber::registry().with(subscriber).init();

    // Call our real `main` function now that logging is set up.
    real_main(ui).await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main(ui: Ui) -> Result<()> {
    // Load environment variables from a `.env` file, if it exists.
    dotenvy::dotenv().ok();

    // Parse command-line arguments.
    let opts = Opts::parse();
    debug!("Parsed options: {:?}", opts);

    // Run the appropriate subcommand.
    match &opts.subcmd {
        Cmd::Serve(serve_opts) => {
            ui.hide_progress_bars();
            cmd::serve::cmd_serve(serve_opts).await?;
        }
        Cmd::Ocr(ocr_opts) => {
            cmd::ocr::cmd_ocr(ui, ocr_opts).await?;
        }
    }
    Ok(())
}
