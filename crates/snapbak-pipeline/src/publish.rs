//! Upload a staged chunk batch to object storage

use std::path::Path;

use opendal::Operator;
use tracing::{debug, info, warn};

use snapbak_core::{BackupError, BackupResult, BucketPath, RunId};
use snapbak_chunks::chunk_index;
use snapbak_storage::store_object;

#[derive(Debug)]
pub struct PublishReport {
    pub uploaded: usize,
    pub bytes: u64,
}

pub struct ChunkPublisher<'a> {
    op: &'a Operator,
}

impl<'a> ChunkPublisher<'a> {
    pub fn new(op: &'a Operator) -> Self {
        Self { op }
    }

    /// Upload every chunk file in `batch_dir` to
    /// `<destination.path>/<batch_id>/<chunk_filename>`.
    ///
    /// Chunks are independent objects, so upload order carries no meaning;
    /// they go up in index order anyway for predictable logs. The first
    /// failed upload aborts the publish. The run only counts as successful
    /// once every chunk of the batch is up.
    pub async fn publish(
        &self,
        batch_dir: &Path,
        batch_id: &RunId,
        destination: &BucketPath,
    ) -> BackupResult<PublishReport> {
        let entries = std::fs::read_dir(batch_dir).map_err(|e| {
            BackupError::LocalIo(format!("listing batch dir {}: {e}", batch_dir.display()))
        })?;

        let mut chunks: Vec<(u64, String)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                BackupError::LocalIo(format!("listing batch dir {}: {e}", batch_dir.display()))
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            match chunk_index(&name) {
                Some(index) => chunks.push((index, name)),
                None => warn!(file = %name, "ignoring non-chunk file in batch dir"),
            }
        }
        chunks.sort_unstable_by_key(|(index, _)| *index);

        let mut bytes: u64 = 0;
        for (_, name) in &chunks {
            let local = batch_dir.join(name);
            let body = std::fs::read(&local).map_err(|e| {
                BackupError::LocalIo(format!("reading chunk {}: {e}", local.display()))
            })?;
            bytes += body.len() as u64;

            let key = format!("{}/{batch_id}/{name}", destination.path);
            store_object(self.op, &key, body).await?;
            debug!(key, "chunk uploaded");
        }

        info!(
            uploaded = chunks.len(),
            bytes,
            destination = %destination,
            batch = %batch_id,
            "batch published"
        );
        Ok(PublishReport {
            uploaded: chunks.len(),
            bytes,
        })
    }
}
