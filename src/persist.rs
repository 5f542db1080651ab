//! Writing response bodies and their `.meta` sidecars.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::exchange::InterceptedExchange;
use crate::sanitize::make_filepath;
use crate::{FetchError, Result};

/// Extension appended to a body path for its metadata sidecar.
pub const META_EXTENSION: &str = "meta";

/// Writes `data` for `request_url` below `output_dir` and returns the path used.
///
/// Without `overwrite` an existing file is never replaced: the path gets a
/// `.1`, `.2`, ... suffix until a free name is found. The existence check and
/// the write are separate steps, so two concurrent saves of the same URL can
/// still race for one name.
pub async fn save_response(
    request_url: &str,
    data: &[u8],
    output_dir: &str,
    overwrite: bool,
) -> Result<PathBuf> {
    let base = make_filepath(output_dir, request_url)?;

    if let Some(dir) = base.parent() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| FetchError::persistence(dir, e))?;
    }

    let path = if overwrite {
        base
    } else {
        next_free_path(base).await
    };

    fs::write(&path, data)
        .await
        .map_err(|e| FetchError::persistence(&path, e))?;

    Ok(path)
}

/// First candidate, starting at `path`, that does not exist yet.
async fn next_free_path(path: PathBuf) -> PathBuf {
    let mut candidate = path.to_string_lossy().into_owned();
    let mut n = 1u64;
    // A failed probe counts as free; the write reports the real problem.
    while matches!(fs::try_exists(&candidate).await, Ok(true)) {
        candidate = collision_candidate(&candidate, n);
        n += 1;
    }
    PathBuf::from(candidate)
}

/// Strips trailing dots and digits from `path` and appends `.<n>`.
///
/// This also eats digits that belong to the original name (`v2` becomes
/// `v.1`), not only a suffix added by an earlier probe.
pub fn collision_candidate(path: &str, n: u64) -> String {
    let stem = path.trim_end_matches(|c: char| c == '.' || c.is_ascii_digit());
    format!("{stem}.{n}")
}

/// Sidecar path for a saved body: `<path>.meta`.
pub fn meta_path(body_path: &Path) -> PathBuf {
    let mut os = body_path.as_os_str().to_os_string();
    os.push(".");
    os.push(META_EXTENSION);
    PathBuf::from(os)
}

/// Text summary of one exchange, stored next to its body.
#[derive(Debug, Clone, Copy)]
pub struct MetadataRecord<'a> {
    pub exchange: &'a InterceptedExchange,
    /// URL of the job whose page triggered the request.
    pub parent_url: &'a str,
}

impl<'a> MetadataRecord<'a> {
    pub fn new(exchange: &'a InterceptedExchange, parent_url: &'a str) -> Self {
        Self {
            exchange,
            parent_url,
        }
    }
}

impl fmt::Display for MetadataRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ex = self.exchange;
        writeln!(f, "url: {}", ex.url)?;
        writeln!(f, "parent: {}", self.parent_url)?;
        writeln!(f, "method: {}", ex.method)?;
        writeln!(f, "type: {}", ex.resource_type)?;
        writeln!(f)?;

        for h in &ex.request_headers {
            writeln!(f, "> {}: {}", h.name, h.value)?;
        }

        if let Some(body) = ex.request_body.as_deref().filter(|b| !b.is_empty()) {
            write!(f, "\n{body}\n")?;
        }

        writeln!(f)?;

        for h in &ex.response_headers {
            writeln!(f, "< {}: {}", h.name, h.value)?;
        }
        Ok(())
    }
}

/// Writes the metadata record for `exchange` to `<body_path>.meta`.
pub async fn save_meta(
    body_path: &Path,
    parent_url: &str,
    exchange: &InterceptedExchange,
) -> Result<PathBuf> {
    let path = meta_path(body_path);
    let record = MetadataRecord::new(exchange, parent_url).to_string();
    fs::write(&path, record)
        .await
        .map_err(|e| FetchError::persistence(&path, e))?;
    Ok(path)
}
