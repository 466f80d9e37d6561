//! snapbak-crypto: the key service boundary
//!
//! Envelope format (binary):
//! ```text
//! [4 bytes: "SBK1"][2 bytes BE: key-id length][key-id bytes]
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! AAD = canonical serialization of the EncryptionContext
//! ```
//!
//! The context is authenticated but not secret: it binds a ciphertext to
//! the storage location it was produced for, so a blob moved to a different
//! bucket/path fails to decrypt instead of silently yielding plaintext.
//! The key id travels inside the envelope, which is why `decrypt` takes no
//! key parameter.

pub mod context;
pub mod keyring;
pub mod service;

pub use context::{EncryptionContext, APP_NAME};
pub use keyring::{Keyring, SecretKey};
pub use service::KeyService;

/// Size of a keyring key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Envelope magic, first bytes of every ciphertext blob
pub const ENVELOPE_MAGIC: &[u8; 4] = b"SBK1";
