//! Decrypt one ciphertext blob under its source-bound context

use snapbak_core::{BackupResult, BucketPath};
use snapbak_crypto::{EncryptionContext, KeyService};

pub struct ChunkDecryptor<'k> {
    keys: &'k dyn KeyService,
}

impl<'k> ChunkDecryptor<'k> {
    pub fn new(keys: &'k dyn KeyService) -> Self {
        Self { keys }
    }

    /// Decrypt a blob that was sealed for `source`. The context is rebuilt
    /// from the source location, so a blob copied to (or claimed to be
    /// from) a different bucket/path fails instead of decrypting.
    pub fn decrypt_blob(&self, blob: &[u8], source: &BucketPath) -> BackupResult<Vec<u8>> {
        let context = EncryptionContext::for_location(source);
        self.keys.decrypt(blob, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapbak_core::ErrorKind;
    use snapbak_crypto::Keyring;

    #[test]
    fn decrypts_what_was_sealed_for_the_same_location() {
        let mut ring = Keyring::new();
        ring.generate("backup");
        let location = BucketPath::new("config-bucket", "consul/secrets.enc");
        let ctx = EncryptionContext::for_location(&location);
        let blob = ring.encrypt("backup", b"{\"token\":\"t\"}", &ctx).unwrap();

        let plain = ChunkDecryptor::new(&ring)
            .decrypt_blob(&blob, &location)
            .unwrap();
        assert_eq!(plain, b"{\"token\":\"t\"}");
    }

    #[test]
    fn relocated_blob_is_rejected() {
        let mut ring = Keyring::new();
        ring.generate("backup");
        let sealed_for = BucketPath::new("config-bucket", "consul/secrets.enc");
        let ctx = EncryptionContext::for_location(&sealed_for);
        let blob = ring.encrypt("backup", b"secret", &ctx).unwrap();

        let err = ChunkDecryptor::new(&ring)
            .decrypt_blob(&blob, &BucketPath::new("config-bucket", "other/file.enc"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyService);
    }
}
