//! snapbak-chunks: split a snapshot into fixed-size chunks, encrypt each
//! through the key service, stage ciphertext for publishing
//!
//! Chunk `i` always covers byte offset `i * chunk_size` of the source file,
//! so reassembly is concatenation in ascending index order. The final chunk
//! may be shorter; a zero-byte source produces no chunks at all.

pub mod decrypt;
pub mod encrypt;
pub mod naming;
pub mod staging;

pub use decrypt::ChunkDecryptor;
pub use encrypt::{ChunkBatch, ChunkEncryptor};
pub use naming::{chunk_file_name, chunk_index, CHUNK_PREFIX};
pub use staging::StagingDir;
