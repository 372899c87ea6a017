//! The `serve` subcommand.

use clap::Args;

use crate::{
    config::{AppConfig, Variant},
    ocr::engines::EngineOpts,
    prelude::*,
    server::run_server,
};

/// Options for `serve`.
#[derive(Debug, Clone, Args)]
pub struct ServeOpts {
    /// Which HTTP surface to serve.
    #[clap(long, value_enum, env = "OCR_VARIANT", default_value_t = Variant::default())]
    pub variant: Variant,

    /// Address to bind.
    #[clap(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on. Defaults to 5000 for `html` and 10000 for `json`.
    #[clap(long, short, env = "PORT")]
    pub port: Option<u16>,

    /// Image to OCR when no usable upload is sent.
    #[clap(long, env = "OCR_DEFAULT_IMAGE", default_value = "image.jpg")]
    pub default_image: PathBuf,

    /// Directory for staging uploads. Defaults to the system temp directory.
    #[clap(long, env = "OCR_UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Directory holding the browser preview of the default image.
    #[clap(long, env = "OCR_PREVIEW_DIR", default_value = "static")]
    pub preview_dir: PathBuf,

    #[clap(flatten)]
    pub engine: EngineOpts,
}

impl ServeOpts {
    /// Turn our options into an immutable server configuration.
    pub fn to_config(&self) -> AppConfig {
        let mut config = AppConfig::new(self.variant);
        config.host = self.host.clone();
        if let Some(port) = self.port {
            config.port = port;
        }
        config.default_image = self.default_image.clone();
        if let Some(upload_dir) = &self.upload_dir {
            config.upload_dir = upload_dir.clone();
        }
        config.preview_dir = self.preview_dir.clone();
        config
    }
}

/// The `serve` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_serve(opts: &ServeOpts) -> Result<()> {
    let config = opts.to_config();
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| {
            format!("cannot create upload directory {:?}", config.upload_dir.display())
        })?;
    debug!("Server configuration: {:?}", config);
    run_server(config, opts.engine.create_engine()).await
}
