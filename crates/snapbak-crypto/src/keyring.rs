//! Named 256-bit keys, persisted as a toml file with base64 key material.

use std::collections::BTreeMap;
use std::path::Path;

use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use snapbak_core::{BackupError, BackupResult};

use crate::KEY_SIZE;

/// A 256-bit encryption key. Zeroized on drop.
#[derive(Clone)]
pub struct SecretKey {
    bytes: [u8; KEY_SIZE],
}

impl SecretKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// On-disk keyring layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyringFile {
    keys: BTreeMap<String, String>,
}

/// The set of named keys the key service can encrypt and decrypt under.
#[derive(Debug, Default)]
pub struct Keyring {
    keys: BTreeMap<String, SecretKey>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, key: SecretKey) {
        self.keys.insert(id.into(), key);
    }

    /// Generate and register a fresh key under `id`, replacing any existing
    /// key with that name.
    pub fn generate(&mut self, id: impl Into<String>) -> SecretKey {
        let key = SecretKey::generate();
        self.keys.insert(id.into(), key.clone());
        key
    }

    pub fn get(&self, id: &str) -> Option<&SecretKey> {
        self.keys.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.keys.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn load(path: &Path) -> BackupResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BackupError::Credential(format!("reading keyring {}: {e}", path.display()))
        })?;
        let file: KeyringFile = toml::from_str(&content).map_err(|e| {
            BackupError::Config(format!("parsing keyring {}: {e}", path.display()))
        })?;

        let engine = base64::engine::general_purpose::STANDARD;
        let mut keys = BTreeMap::new();
        for (id, encoded) in file.keys {
            let mut raw = engine.decode(&encoded).map_err(|e| {
                BackupError::Config(format!("keyring entry {id}: invalid base64: {e}"))
            })?;
            if raw.len() != KEY_SIZE {
                raw.zeroize();
                return Err(BackupError::Config(format!(
                    "keyring entry {id}: expected {KEY_SIZE} key bytes, got {}",
                    raw.len()
                )));
            }
            let mut bytes = [0u8; KEY_SIZE];
            bytes.copy_from_slice(&raw);
            raw.zeroize();
            keys.insert(id, SecretKey::from_bytes(bytes));
        }

        tracing::debug!(path = %path.display(), keys = keys.len(), "keyring loaded");
        Ok(Self { keys })
    }

    /// Write the keyring, owner-readable only.
    pub fn save(&self, path: &Path) -> BackupResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let engine = base64::engine::general_purpose::STANDARD;
        let file = KeyringFile {
            keys: self
                .keys
                .iter()
                .map(|(id, key)| (id.clone(), engine.encode(key.as_bytes())))
                .collect(),
        };
        let content = toml::to_string(&file)
            .map_err(|e| BackupError::Config(format!("serializing keyring: {e}")))?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}
