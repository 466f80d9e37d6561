//! OpenDAL Operator factory for S3-compatible object storage

use opendal::Operator;

use snapbak_core::config::StorageConfig;
use snapbak_core::{BackupError, BackupResult};

use crate::creds::StorageCredentials;

/// Build an OpenDAL Operator for one bucket of an S3-compatible endpoint.
///
/// Uses path-style addressing (default in opendal 0.55), which is what
/// MinIO/SeaweedFS-style endpoints require. An empty endpoint leaves the
/// provider default in place. The pipeline is fail-fast by contract, so no
/// retry middleware is layered on.
pub fn build_operator(
    storage: &StorageConfig,
    creds: &StorageCredentials,
    bucket: &str,
) -> BackupResult<Operator> {
    if bucket.is_empty() {
        return Err(BackupError::Config("bucket name is empty".into()));
    }

    // opendal 0.55: S3 builder uses consuming pattern (methods take `self`, return `Self`)
    let mut builder = opendal::services::S3::default()
        .region(&storage.region)
        .bucket(bucket)
        .access_key_id(&creds.access_key_id)
        .secret_access_key(&creds.secret_access_key);
    if !storage.endpoint.is_empty() {
        builder = builder.endpoint(&storage.endpoint);
    }

    let op = Operator::new(builder)
        .map_err(|e| BackupError::Config(format!("creating S3 operator for {bucket}: {e}")))?
        .layer(opendal::layers::LoggingLayer::default())
        .finish();

    Ok(op)
}
