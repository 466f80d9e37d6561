//! The key service seam: encrypt under a named key, decrypt with the
//! context supplied at encrypt time.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use snapbak_core::{BackupError, BackupResult};

use crate::context::EncryptionContext;
use crate::keyring::Keyring;
use crate::{ENVELOPE_MAGIC, NONCE_SIZE, TAG_SIZE};

/// External key service contract.
///
/// `encrypt` seals a plaintext under the key named by `key_id`, binding the
/// context. `decrypt` takes only the blob and the context: the blob itself
/// names the key it was sealed under. A context that differs in any
/// attribute from the one used at encrypt time must make `decrypt` fail.
pub trait KeyService: Send + Sync {
    fn encrypt(
        &self,
        key_id: &str,
        plaintext: &[u8],
        context: &EncryptionContext,
    ) -> BackupResult<Vec<u8>>;

    fn decrypt(&self, blob: &[u8], context: &EncryptionContext) -> BackupResult<Vec<u8>>;
}

impl KeyService for Keyring {
    fn encrypt(
        &self,
        key_id: &str,
        plaintext: &[u8],
        context: &EncryptionContext,
    ) -> BackupResult<Vec<u8>> {
        if key_id.len() > u16::MAX as usize {
            return Err(BackupError::KeyService(format!(
                "key id too long: {} bytes",
                key_id.len()
            )));
        }
        let key = self
            .get(key_id)
            .ok_or_else(|| BackupError::KeyService(format!("unknown key id: {key_id}")))?;

        let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let aad = context.to_aad();
        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|e| BackupError::KeyService(format!("encryption failed: {e}")))?;

        let id_bytes = key_id.as_bytes();
        let mut blob =
            Vec::with_capacity(ENVELOPE_MAGIC.len() + 2 + id_bytes.len() + NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(ENVELOPE_MAGIC);
        blob.extend_from_slice(&(id_bytes.len() as u16).to_be_bytes());
        blob.extend_from_slice(id_bytes);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    fn decrypt(&self, blob: &[u8], context: &EncryptionContext) -> BackupResult<Vec<u8>> {
        let (key_id, rest) = parse_envelope(blob)?;

        let key = self
            .get(&key_id)
            .ok_or_else(|| BackupError::KeyService(format!("unknown key id: {key_id}")))?;

        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);
        let nonce = XNonce::from_slice(nonce_bytes);
        let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

        let aad = context.to_aad();
        cipher
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|_| {
                BackupError::KeyService(
                    "decryption failed: context mismatch, wrong key, or corrupted ciphertext"
                        .into(),
                )
            })
    }
}

/// Split an envelope into its key id and the nonce+ciphertext remainder.
fn parse_envelope(blob: &[u8]) -> BackupResult<(String, &[u8])> {
    let header = ENVELOPE_MAGIC.len() + 2;
    if blob.len() < header {
        return Err(BackupError::KeyService(format!(
            "ciphertext blob too short: {} bytes",
            blob.len()
        )));
    }
    if &blob[..ENVELOPE_MAGIC.len()] != ENVELOPE_MAGIC {
        return Err(BackupError::KeyService(
            "ciphertext blob has no envelope magic".into(),
        ));
    }

    let id_len = u16::from_be_bytes([blob[4], blob[5]]) as usize;
    let min_len = header + id_len + NONCE_SIZE + TAG_SIZE;
    if blob.len() < min_len {
        return Err(BackupError::KeyService(format!(
            "ciphertext blob truncated: {} bytes (minimum {min_len})",
            blob.len()
        )));
    }

    let key_id = std::str::from_utf8(&blob[header..header + id_len])
        .map_err(|_| BackupError::KeyService("envelope key id is not UTF-8".into()))?
        .to_string();

    Ok((key_id, &blob[header + id_len..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use snapbak_core::{BucketPath, ErrorKind};

    fn test_ring() -> Keyring {
        let mut ring = Keyring::new();
        ring.generate("backup");
        ring
    }

    fn dest_context() -> EncryptionContext {
        EncryptionContext::for_location(&BucketPath::new("bak", "consul/snapshots"))
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let ring = test_ring();
        let ctx = dest_context();

        let blob = ring.encrypt("backup", b"snapshot bytes", &ctx).unwrap();
        let plain = ring.decrypt(&blob, &ctx).unwrap();

        assert_eq!(plain, b"snapshot bytes");
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let ring = test_ring();
        let ctx = dest_context();

        let blob = ring.encrypt("backup", b"", &ctx).unwrap();
        assert_eq!(ring.decrypt(&blob, &ctx).unwrap(), b"");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let ring = test_ring();
        let err = ring
            .encrypt("nope", b"data", &dest_context())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyService);
        assert!(err.to_string().contains("unknown key id"));
    }

    #[test]
    fn test_context_mismatch_fails() {
        let ring = test_ring();
        let encrypt_ctx = dest_context();
        let other_ctx =
            EncryptionContext::for_location(&BucketPath::new("bak", "somewhere/else"));

        let blob = ring.encrypt("backup", b"secret", &encrypt_ctx).unwrap();
        let err = ring.decrypt(&blob, &other_ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyService);
    }

    #[test]
    fn test_blob_names_its_own_key() {
        let mut ring = Keyring::new();
        ring.generate("a");
        ring.generate("b");
        let ctx = dest_context();

        let blob_a = ring.encrypt("a", b"under a", &ctx).unwrap();
        let blob_b = ring.encrypt("b", b"under b", &ctx).unwrap();

        assert_eq!(ring.decrypt(&blob_a, &ctx).unwrap(), b"under a");
        assert_eq!(ring.decrypt(&blob_b, &ctx).unwrap(), b"under b");
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let ring = test_ring();
        let ctx = dest_context();

        let mut blob = ring.encrypt("backup", b"secret", &ctx).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;

        assert!(ring.decrypt(&blob, &ctx).is_err());
    }

    #[test]
    fn test_garbage_blob_rejected() {
        let ring = test_ring();
        let err = ring.decrypt(b"not an envelope", &dest_context()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyService);
    }

    proptest! {
        #[test]
        fn roundtrip_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..8192)) {
            let ring = test_ring();
            let ctx = dest_context();
            let blob = ring.encrypt("backup", &data, &ctx).unwrap();
            prop_assert_eq!(ring.decrypt(&blob, &ctx).unwrap(), data);
        }
    }
}
