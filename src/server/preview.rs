//! A web-servable copy of the default image, for showing next to its text.
//!
//! The copy is refreshed whenever the source file is newer. Two requests may
//! race to refresh it; both write the same bytes, so the last writer winning is
//! harmless.

use crate::prelude::*;

/// URL prefix under which the preview directory is served.
pub const PREVIEW_ROUTE: &str = "/preview";

/// Make sure `preview_dir` holds an up-to-date copy of `source`, and return
/// the copy's path.
#[instrument(level = "debug", skip_all, fields(source = %source.display()))]
pub async fn refresh_preview(source: &Path, preview_dir: &Path) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .with_context(|| format!("no file name in {:?}", source.display()))?;
    let cached = preview_dir.join(file_name);

    let source_modified = tokio::fs::metadata(source)
        .await
        .with_context(|| format!("cannot stat {:?}", source.display()))?
        .modified()?;
    if let Ok(meta) = tokio::fs::metadata(&cached).await {
        if meta.modified()? >= source_modified {
            return Ok(cached);
        }
    }

    debug!(cached = %cached.display(), "Refreshing preview copy");
    tokio::fs::create_dir_all(preview_dir)
        .await
        .with_context(|| format!("cannot create {:?}", preview_dir.display()))?;
    tokio::fs::copy(source, &cached)
        .await
        .with_context(|| format!("cannot copy preview to {:?}", cached.display()))?;
    Ok(cached)
}

/// The URL of the default image's preview, or `None` if we couldn't make one.
pub async fn default_preview_url(source: &Path, preview_dir: &Path) -> Option<String> {
    match refresh_preview(source, preview_dir).await {
        Ok(cached) => cached
            .file_name()
            .map(|name| format!("{PREVIEW_ROUTE}/{}", name.to_string_lossy())),
        Err(err) => {
            warn!("Cannot prepare preview image: {:#}", err);
            None
        }
    }
}
