use thiserror::Error;

pub type BackupResult<T> = Result<T, BackupError>;

/// One failure kind per pipeline stage. Every error aborts the run; the
/// kind lets callers branch on cause without parsing the message.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("key service rejected the request: {0}")]
    KeyService(String),

    #[error("snapshot transport failed: {0}")]
    Transport(String),

    #[error("local I/O failed: {0}")]
    LocalIo(String),

    #[error("storage credentials rejected: {0}")]
    Credential(String),

    #[error("malformed payload: {0}")]
    Data(String),

    #[error("config error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    KeyService,
    Transport,
    LocalIo,
    Credential,
    Data,
    Config,
}

impl BackupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackupError::KeyService(_) => ErrorKind::KeyService,
            BackupError::Transport(_) => ErrorKind::Transport,
            BackupError::LocalIo(_) => ErrorKind::LocalIo,
            BackupError::Credential(_) => ErrorKind::Credential,
            BackupError::Data(_) => ErrorKind::Data,
            BackupError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<std::io::Error> for BackupError {
    fn from(e: std::io::Error) -> Self {
        BackupError::LocalIo(e.to_string())
    }
}
