//! Bootstrap secret: the sealed credential document that authenticates the
//! snapshot download

use opendal::Operator;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::info;

use snapbak_core::{BackupError, BackupResult, BucketPath};
use snapbak_chunks::ChunkDecryptor;
use snapbak_crypto::{EncryptionContext, KeyService};
use snapbak_storage::{fetch_object, store_object};

/// Decrypted bootstrap document. `token` is required; anything else the
/// document carries is kept as-is.
#[derive(Debug)]
pub struct BootstrapSecret {
    pub token: SecretString,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Wire form of the document
#[derive(Deserialize)]
struct BootstrapDocument {
    token: String,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl From<BootstrapDocument> for BootstrapSecret {
    fn from(doc: BootstrapDocument) -> Self {
        Self {
            token: SecretString::from(doc.token),
            extra: doc.extra,
        }
    }
}

/// Fetch the sealed document at `location` and unseal it.
///
/// The decryption context is bound to the document's own bucket/path (its
/// *source*), not to the backup destination. A document missing the
/// `token` field is a data error.
pub async fn resolve_bootstrap_secret(
    op: &Operator,
    keys: &dyn KeyService,
    location: &BucketPath,
) -> BackupResult<BootstrapSecret> {
    let blob = fetch_object(op, &location.path).await?;
    let plaintext = ChunkDecryptor::new(keys).decrypt_blob(&blob, location)?;

    let document: BootstrapDocument = serde_json::from_slice(&plaintext)
        .map_err(|e| BackupError::Data(format!("bootstrap secret at {location}: {e}")))?;

    info!(location = %location, "bootstrap secret resolved");
    Ok(document.into())
}

/// Seal a bootstrap document under `key_id` and store it at `location`.
///
/// The write path the retrieval side assumes: the ciphertext lands where
/// `resolve_bootstrap_secret` will look for it, bound to that location.
/// The document is validated first so an unsealable secret is caught
/// before it overwrites a good one.
pub async fn seal_bootstrap_secret(
    op: &Operator,
    keys: &dyn KeyService,
    key_id: &str,
    location: &BucketPath,
    document: &[u8],
) -> BackupResult<()> {
    serde_json::from_slice::<BootstrapDocument>(document)
        .map_err(|e| BackupError::Data(format!("bootstrap document: {e}")))?;

    let context = EncryptionContext::for_location(location);
    let blob = keys.encrypt(key_id, document, &context)?;
    store_object(op, &location.path, blob).await?;

    info!(location = %location, "bootstrap secret sealed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use snapbak_core::ErrorKind;
    use snapbak_crypto::Keyring;

    fn memory_operator() -> Operator {
        Operator::new(opendal::services::Memory::default())
            .expect("memory operator")
            .finish()
    }

    fn test_ring() -> Keyring {
        let mut ring = Keyring::new();
        ring.generate("backup");
        ring
    }

    #[tokio::test]
    async fn seal_then_resolve() {
        let op = memory_operator();
        let ring = test_ring();
        let location = BucketPath::new("config-bucket", "consul/secrets.enc");

        let document = br#"{"token": "tok-123", "datacenter": "dc1"}"#;
        seal_bootstrap_secret(&op, &ring, "backup", &location, document)
            .await
            .unwrap();

        let secret = resolve_bootstrap_secret(&op, &ring, &location)
            .await
            .unwrap();
        assert_eq!(secret.token.expose_secret(), "tok-123");
        assert_eq!(
            secret.extra.get("datacenter").and_then(|v| v.as_str()),
            Some("dc1")
        );
    }

    #[tokio::test]
    async fn missing_token_field_is_data_error() {
        let op = memory_operator();
        let ring = test_ring();
        let location = BucketPath::new("config-bucket", "consul/secrets.enc");

        // Seal bypassing validation to simulate a bad document at rest
        let context = EncryptionContext::for_location(&location);
        let blob = ring
            .encrypt("backup", br#"{"datacenter": "dc1"}"#, &context)
            .unwrap();
        store_object(&op, &location.path, blob).await.unwrap();

        let err = resolve_bootstrap_secret(&op, &ring, &location)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.to_string().contains("token"));
    }

    #[tokio::test]
    async fn seal_rejects_document_without_token() {
        let op = memory_operator();
        let ring = test_ring();
        let location = BucketPath::new("config-bucket", "consul/secrets.enc");

        let err = seal_bootstrap_secret(&op, &ring, "backup", &location, b"{}")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[tokio::test]
    async fn missing_document_is_transport_error() {
        let op = memory_operator();
        let ring = test_ring();
        let location = BucketPath::new("config-bucket", "consul/secrets.enc");

        let err = resolve_bootstrap_secret(&op, &ring, &location)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn document_sealed_elsewhere_is_rejected() {
        let op = memory_operator();
        let ring = test_ring();
        let real = BucketPath::new("config-bucket", "consul/secrets.enc");
        let elsewhere = BucketPath::new("config-bucket", "staging/secrets.enc");

        let document = br#"{"token": "tok-123"}"#;
        seal_bootstrap_secret(&op, &ring, "backup", &elsewhere, document)
            .await
            .unwrap();

        // Copy the blob to the real location; the context no longer matches
        let blob = fetch_object(&op, &elsewhere.path).await.unwrap();
        store_object(&op, &real.path, blob).await.unwrap();

        let err = resolve_bootstrap_secret(&op, &ring, &real).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyService);
    }
}
