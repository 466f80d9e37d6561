//! Split a source file into fixed-size chunks and encrypt each one

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use snapbak_core::{BackupError, BackupResult, BucketPath};
use snapbak_crypto::{EncryptionContext, KeyService};

use crate::naming::chunk_file_name;

/// Metadata of one staged chunk batch
#[derive(Debug)]
pub struct ChunkBatch {
    /// Directory holding the ciphertext chunk files
    pub dir: PathBuf,
    /// Number of chunks, indices `0..chunks` with no gaps
    pub chunks: usize,
    /// Total plaintext bytes consumed from the source
    pub plaintext_bytes: u64,
}

pub struct ChunkEncryptor<'k> {
    keys: &'k dyn KeyService,
    chunk_size: usize,
}

impl<'k> ChunkEncryptor<'k> {
    pub fn new(keys: &'k dyn KeyService, chunk_size: usize) -> Self {
        Self { keys, chunk_size }
    }

    /// Read `source` sequentially in `chunk_size` segments, encrypt each
    /// under the context bound to `destination`, and write the ciphertexts
    /// as `snapshot_chunk_<index>` into `batch_dir` (recreated if present).
    ///
    /// Every chunk of the batch shares one context, and the same context
    /// must be presented to decrypt any of them. A key-service rejection
    /// aborts the whole batch; chunks past the failing index are never
    /// produced.
    pub fn split_and_encrypt(
        &self,
        source: &Path,
        batch_dir: &Path,
        key_id: &str,
        destination: &BucketPath,
    ) -> BackupResult<ChunkBatch> {
        if batch_dir.is_dir() {
            fs::remove_dir_all(batch_dir).map_err(|e| {
                BackupError::LocalIo(format!("clearing batch dir {}: {e}", batch_dir.display()))
            })?;
        }
        fs::create_dir_all(batch_dir).map_err(|e| {
            BackupError::LocalIo(format!("creating batch dir {}: {e}", batch_dir.display()))
        })?;

        let file = fs::File::open(source)
            .map_err(|e| BackupError::LocalIo(format!("opening {}: {e}", source.display())))?;
        let mut reader = std::io::BufReader::new(file);

        let context = EncryptionContext::for_location(destination);
        let mut index: u64 = 0;
        let mut plaintext_bytes: u64 = 0;

        loop {
            let mut segment = vec![0u8; self.chunk_size];
            let mut filled = 0;
            // A single read may return short without being at EOF; keep
            // filling until the segment is full or the file ends.
            while filled < segment.len() {
                let n = reader.read(&mut segment[filled..]).map_err(|e| {
                    BackupError::LocalIo(format!("reading {}: {e}", source.display()))
                })?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            if filled == 0 {
                break;
            }
            segment.truncate(filled);

            let blob = self.keys.encrypt(key_id, &segment, &context)?;
            let chunk_path = batch_dir.join(chunk_file_name(index));
            fs::write(&chunk_path, &blob).map_err(|e| {
                BackupError::LocalIo(format!("writing {}: {e}", chunk_path.display()))
            })?;

            debug!(index, plaintext = filled, ciphertext = blob.len(), "chunk staged");
            plaintext_bytes += filled as u64;
            index += 1;

            if filled < self.chunk_size {
                break;
            }
        }

        info!(
            chunks = index,
            bytes = plaintext_bytes,
            dir = %batch_dir.display(),
            "snapshot split and encrypted"
        );
        Ok(ChunkBatch {
            dir: batch_dir.to_path_buf(),
            chunks: index as usize,
            plaintext_bytes,
        })
    }
}
