//! snapbak-fetch: download the snapshot over authenticated HTTPS
//!
//! One GET, certificate verification left at the client default, full body
//! buffered in memory before the file write. Buffering whole snapshots is
//! the inherited contract of this tool and is fine at its scale; a
//! larger-scale reimplementation would stream instead.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use snapbak_core::types::local_date_stamp;
use snapbak_core::{BackupError, BackupResult};

/// Snapshot file name for today: `<prefix>_<YYYYMMDD>`
pub fn snapshot_file_name(prefix: &str) -> String {
    format!("{prefix}_{}", local_date_stamp())
}

/// A downloaded snapshot in staging
#[derive(Debug)]
pub struct FetchedSnapshot {
    pub path: PathBuf,
    pub bytes: u64,
}

pub struct SnapshotFetcher {
    client: reqwest::Client,
}

impl SnapshotFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// GET `url` with the given headers and write the body to
    /// `<dest_dir>/<prefix>_<YYYYMMDD>`.
    ///
    /// Any HTTP-level failure (connect, TLS, non-2xx status, truncated
    /// body) is a transport error; failure to write the destination file
    /// is a local I/O error. No retries at this layer.
    pub async fn fetch(
        &self,
        url: &str,
        headers: &[(String, String)],
        dest_dir: &Path,
        file_prefix: &str,
    ) -> BackupResult<FetchedSnapshot> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        // Header values can carry the bootstrap token; log names only.
        debug!(
            url,
            headers = ?headers.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            "requesting snapshot"
        );

        let response = request
            .send()
            .await
            .map_err(|e| BackupError::Transport(format!("GET {url}: {e}")))?
            .error_for_status()
            .map_err(|e| BackupError::Transport(format!("GET {url}: {e}")))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| BackupError::Transport(format!("reading snapshot body: {e}")))?;

        let path = dest_dir.join(snapshot_file_name(file_prefix));
        std::fs::write(&path, &body)
            .map_err(|e| BackupError::LocalIo(format!("writing {}: {e}", path.display())))?;

        info!(path = %path.display(), bytes = body.len(), "snapshot downloaded");
        Ok(FetchedSnapshot {
            path,
            bytes: body.len() as u64,
        })
    }
}

impl Default for SnapshotFetcher {
    fn default() -> Self {
        Self::new()
    }
}
