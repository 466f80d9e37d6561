use snapbak_core::{BackupError, BackupResult};

/// Static S3 credentials, sourced from the standard AWS environment pair.
#[derive(Debug, Clone)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl StorageCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Read `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`. Either one
    /// missing is a credential failure, reported before any upload starts.
    pub fn from_env() -> BackupResult<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| BackupError::Credential("AWS_ACCESS_KEY_ID is not set".into()))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| BackupError::Credential("AWS_SECRET_ACCESS_KEY is not set".into()))?;
        Ok(Self {
            access_key_id,
            secret_access_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env mutation: keep every AWS_* manipulation inside one test so
    // parallel test threads never observe a half-set pair.
    #[test]
    fn from_env_requires_both_vars() {
        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
        let err = StorageCredentials::from_env().unwrap_err();
        assert_eq!(err.kind(), snapbak_core::ErrorKind::Credential);

        std::env::set_var("AWS_ACCESS_KEY_ID", "test-key");
        let err = StorageCredentials::from_env().unwrap_err();
        assert!(err.to_string().contains("AWS_SECRET_ACCESS_KEY"));

        std::env::set_var("AWS_SECRET_ACCESS_KEY", "test-secret");
        let creds = StorageCredentials::from_env().unwrap();
        assert_eq!(creds.access_key_id, "test-key");
        assert_eq!(creds.secret_access_key, "test-secret");

        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
    }
}
