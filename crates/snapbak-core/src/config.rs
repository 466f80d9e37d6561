use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{BackupError, BackupResult};

/// Top-level backup configuration (loaded from snapbak.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub source: SourceConfig,
    pub secret: SecretConfig,
    pub backup: TargetConfig,
    pub storage: StorageConfig,
    pub staging: StagingConfig,
    pub keyring: KeyringConfig,
}

/// Where the snapshot comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Snapshot endpoint, e.g. https://consul.internal:8501/v1/snapshot
    pub url: String,
    /// Header carrying the bootstrap token on the snapshot request
    pub token_header: String,
    /// Snapshot file name prefix; the full name is `<prefix>_<YYYYMMDD>`
    pub file_prefix: String,
}

/// Where the encrypted bootstrap secret lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretConfig {
    pub bucket: String,
    pub path: String,
}

/// Where chunks are published, and under which key they are sealed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub bucket: String,
    pub path: String,
    /// Keyring entry used to encrypt every chunk of a batch
    pub key_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// S3-compatible endpoint; empty means the provider default
    pub endpoint: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Root under which each run creates its own working directory
    pub root: PathBuf,
    /// Plaintext bytes per chunk; the final chunk may be shorter
    pub chunk_size: usize,
    /// Keep the run's staging directory when the run fails (debugging aid).
    /// The default removes staged plaintext and ciphertext on every exit path.
    pub retain_on_failure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyringConfig {
    /// Keyring file holding the named encryption keys
    pub path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token_header: "X-Consul-Token".into(),
            file_prefix: "snapshot".into(),
        }
    }
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            path: "secrets.enc".into(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            path: "consul/snapshots".into(),
            key_id: "backup".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: "us-east-1".into(),
        }
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/tmp/snapbak"),
            chunk_size: 4000,
            retain_on_failure: false,
        }
    }
}

impl Default for KeyringConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/etc/snapbak/keyring.toml"),
        }
    }
}

impl BackupConfig {
    /// Reject configurations that cannot name a source, a secret location,
    /// or a publish target. Everything else has a usable default.
    pub fn validate(&self) -> BackupResult<()> {
        if self.source.url.is_empty() {
            return Err(BackupError::Config("source.url is not set".into()));
        }
        if self.secret.bucket.is_empty() {
            return Err(BackupError::Config("secret.bucket is not set".into()));
        }
        if self.backup.bucket.is_empty() {
            return Err(BackupError::Config("backup.bucket is not set".into()));
        }
        if self.staging.chunk_size == 0 {
            return Err(BackupError::Config("staging.chunk_size must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[source]
url = "https://consul.internal:8501/v1/snapshot"
token_header = "X-Consul-Token"
file_prefix = "snapshot"

[secret]
bucket = "config-bucket"
path = "consul/secrets.enc"

[backup]
bucket = "backup-bucket"
path = "consul/snapshots"
key_id = "backup-2026"

[storage]
endpoint = "https://s3.example.com"
region = "us-west-2"

[staging]
root = "/var/lib/snapbak"
chunk_size = 8000
retain_on_failure = true
"#;
        let config: BackupConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.source.url, "https://consul.internal:8501/v1/snapshot");
        assert_eq!(config.secret.bucket, "config-bucket");
        assert_eq!(config.backup.key_id, "backup-2026");
        assert_eq!(config.storage.region, "us-west-2");
        assert_eq!(config.staging.root, PathBuf::from("/var/lib/snapbak"));
        assert_eq!(config.staging.chunk_size, 8000);
        assert!(config.staging.retain_on_failure);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_defaults() {
        let config: BackupConfig = toml::from_str("").unwrap();

        assert_eq!(config.source.token_header, "X-Consul-Token");
        assert_eq!(config.source.file_prefix, "snapshot");
        assert_eq!(config.secret.path, "secrets.enc");
        assert_eq!(config.backup.path, "consul/snapshots");
        assert_eq!(config.storage.region, "us-east-1");
        assert_eq!(config.staging.root, PathBuf::from("/tmp/snapbak"));
        assert_eq!(config.staging.chunk_size, 4000);
        assert!(!config.staging.retain_on_failure);
        assert_eq!(config.keyring.path, PathBuf::from("/etc/snapbak/keyring.toml"));
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[backup]
bucket = "prod-backups"
"#;
        let config: BackupConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.backup.bucket, "prod-backups");
        // Defaults
        assert_eq!(config.backup.path, "consul/snapshots");
        assert_eq!(config.backup.key_id, "backup");
        assert_eq!(config.staging.chunk_size, 4000);
    }

    #[test]
    fn test_validate_rejects_missing_url() {
        let config: BackupConfig = toml::from_str(
            r#"
[secret]
bucket = "cfg"
[backup]
bucket = "bak"
"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("source.url"));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = BackupConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: BackupConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.source.token_header, parsed.source.token_header);
        assert_eq!(config.staging.chunk_size, parsed.staging.chunk_size);
        assert_eq!(config.keyring.path, parsed.keyring.path);
    }
}
