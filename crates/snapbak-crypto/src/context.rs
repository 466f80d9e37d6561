use std::collections::BTreeMap;

use snapbak_core::BucketPath;

/// Application tag present in every context this tool produces
pub const APP_NAME: &str = "consul-backup";

/// Authenticated-but-not-secret attributes bound to a ciphertext.
///
/// The same attributes must be supplied verbatim at decrypt time; any
/// difference makes decryption fail. Keys are kept sorted so the AAD
/// serialization is canonical regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionContext {
    attrs: BTreeMap<String, String>,
}

impl EncryptionContext {
    pub fn new() -> Self {
        Self {
            attrs: BTreeMap::new(),
        }
    }

    /// The standard binding for this tool: `AppName` plus the `bucket/path`
    /// location the ciphertext is destined for (or was fetched from).
    pub fn for_location(location: &BucketPath) -> Self {
        Self::new()
            .with("AppName", APP_NAME)
            .with("BucketPath", location.joined())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Canonical AAD form: `key=value` pairs in key order, newline separated.
    pub fn to_aad(&self) -> Vec<u8> {
        let mut aad = Vec::new();
        for (k, v) in &self.attrs {
            aad.extend_from_slice(k.as_bytes());
            aad.push(b'=');
            aad.extend_from_slice(v.as_bytes());
            aad.push(b'\n');
        }
        aad
    }
}

impl Default for EncryptionContext {
    fn default() -> Self {
        Self::new()
    }
}
