//! The `ocr` subcommand.

use clap::Args;

use crate::{
    ocr::{engines::EngineOpts, ocr_path},
    prelude::*,
    ui::{ProgressConfig, Ui},
};

/// Options for `ocr`.
#[derive(Debug, Clone, Args)]
pub struct OcrOpts {
    /// The image to OCR.
    #[clap(default_value = "image.jpg")]
    pub path: PathBuf,

    #[clap(flatten)]
    pub engine: EngineOpts,
}

/// The `ocr` subcommand.
#[instrument(level = "debug", skip_all, fields(path = %opts.path.display()))]
pub async fn cmd_ocr(ui: Ui, opts: &OcrOpts) -> Result<()> {
    let engine = opts.engine.create_engine();

    let spinner = ui.new_spinner(&ProgressConfig {
        emoji: "🔎",
        msg: "Recognizing text",
        done_msg: "Recognized text",
    });
    let result = ocr_path(engine.as_ref(), &opts.path).await;
    spinner.finish_and_clear();

    let text = result?;
    println!("Extracted Text:");
    println!("{}", text);
    Ok(())
}
