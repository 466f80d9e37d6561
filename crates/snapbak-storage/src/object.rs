//! Whole-object get/put with pipeline error mapping

use opendal::Operator;
use tracing::debug;

use snapbak_core::{BackupError, BackupResult};

/// Read one object fully into memory.
pub async fn fetch_object(op: &Operator, path: &str) -> BackupResult<Vec<u8>> {
    let buf = op
        .read(path)
        .await
        .map_err(|e| map_storage_error("reading", path, e))?;
    let bytes = buf.to_bytes();
    debug!(path, bytes = bytes.len(), "fetched object");
    Ok(bytes.to_vec())
}

/// Write one object.
pub async fn store_object(op: &Operator, path: &str, body: Vec<u8>) -> BackupResult<()> {
    let len = body.len();
    op.write(path, body)
        .await
        .map_err(|e| map_storage_error("writing", path, e))?;
    debug!(path, bytes = len, "stored object");
    Ok(())
}

/// Auth rejections surface as credential failures; everything else the
/// remote side can do wrong is a transport failure.
pub fn map_storage_error(action: &str, path: &str, e: opendal::Error) -> BackupError {
    match e.kind() {
        opendal::ErrorKind::PermissionDenied => {
            BackupError::Credential(format!("{action} {path}: {e}"))
        }
        _ => BackupError::Transport(format!("{action} {path}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapbak_core::ErrorKind;

    fn memory_operator() -> Operator {
        Operator::new(opendal::services::Memory::default())
            .expect("memory operator")
            .finish()
    }

    #[tokio::test]
    async fn store_then_fetch() {
        let op = memory_operator();
        store_object(&op, "consul/secrets.enc", b"sealed".to_vec())
            .await
            .unwrap();
        let body = fetch_object(&op, "consul/secrets.enc").await.unwrap();
        assert_eq!(body, b"sealed");
    }

    #[tokio::test]
    async fn fetch_missing_is_transport() {
        let op = memory_operator();
        let err = fetch_object(&op, "no/such/object").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("no/such/object"));
    }
}
