use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a single backup run.
///
/// Staging directories and object-storage batch prefixes are keyed by the
/// RunId, so two runs on the same calendar date never collide. The date is
/// carried separately as metadata (snapshot file name, run report).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A bucket plus an object path inside it.
///
/// The joined `bucket/path` form is what gets bound into the encryption
/// context, so it must be stable across encrypt and decrypt call sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPath {
    pub bucket: String,
    pub path: String,
}

impl BucketPath {
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
        }
    }

    pub fn joined(&self) -> String {
        format!("{}/{}", self.bucket, self.path)
    }
}

impl fmt::Display for BucketPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.path)
    }
}

/// Local date as `YYYYMMDD`, the stamp used in snapshot file names and
/// carried in run reports.
pub fn local_date_stamp() -> String {
    chrono::Local::now().format("%Y%m%d").to_string()
}
