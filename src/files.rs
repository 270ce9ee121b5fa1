//! Static asset serving from the configured public directory.

use axum::{
    extract::State,
    http::{header, Uri},
    response::{IntoResponse, Response},
};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::state::AppState;

/// Content types by file extension; everything else is octet-stream
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("js", "application/javascript"),
    ("css", "text/css"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("mp4", "video/mp4"),
];

pub fn content_type(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    CONTENT_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}

/// True when `segment` is a single ordinary path component on this platform.
/// Drive prefixes and root markers (Windows) fail this check.
fn is_plain_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Map a request path onto `root` without touching the filesystem.
///
/// `/` maps to the index document. Parent segments and anything that could
/// name another root are rejected outright.
pub fn resolve_path(root: &Path, index_file: &str, request_path: &str) -> RelayResult<PathBuf> {
    let relative = match request_path {
        "" | "/" => index_file,
        other => other.trim_start_matches('/'),
    };

    let mut resolved = root.to_path_buf();
    for segment in relative.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(RelayError::PathTraversal(request_path.to_string())),
            s if s.contains(['\\', '\0']) || !is_plain_segment(s) => {
                return Err(RelayError::PathTraversal(request_path.to_string()))
            }
            s => resolved.push(s),
        }
    }
    Ok(resolved)
}

/// Canonicalize `candidate` and confirm it is a regular file under `root`.
/// `Ok(None)` means there is nothing there to serve.
async fn existing_file(
    root: &Path,
    candidate: &Path,
    request_path: &str,
) -> RelayResult<Option<PathBuf>> {
    let Ok(path) = tokio::fs::canonicalize(candidate).await else {
        return Ok(None);
    };
    if !path.starts_with(root) {
        return Err(RelayError::PathTraversal(request_path.to_string()));
    }
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(Some(path)),
        _ => Ok(None),
    }
}

/// Load the asset for `request_path` together with its content type
pub async fn read_asset(
    config: &RelayConfig,
    request_path: &str,
) -> RelayResult<(Vec<u8>, &'static str)> {
    let not_found = || RelayError::NotFound(request_path.to_string());

    let root = tokio::fs::canonicalize(&config.public_dir)
        .await
        .map_err(|_| not_found())?;
    let candidate = resolve_path(&root, &config.index_file, request_path)?;

    let file = match existing_file(&root, &candidate, request_path).await? {
        Some(file) => file,
        // Extensionless page names such as /mod resolve to mod.html
        None if candidate.extension().is_none() && candidate != root => {
            existing_file(&root, &candidate.with_extension("html"), request_path)
                .await?
                .ok_or_else(not_found)?
        }
        None => return Err(not_found()),
    };

    let bytes = tokio::fs::read(&file).await.map_err(|_| not_found())?;
    Ok((bytes, content_type(&file)))
}

/// Fallback handler serving files from the public directory
pub async fn serve_static(State(state): State<Arc<AppState>>, uri: Uri) -> RelayResult<Response> {
    let (body, content_type) = read_asset(&state.config, uri.path()).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}
