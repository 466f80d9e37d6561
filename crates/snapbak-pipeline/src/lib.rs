//! snapbak-pipeline: the backup run end to end
//!
//! Resolve the bootstrap secret, download the snapshot, split and encrypt
//! it into a staged batch, publish the batch. Strictly sequential; the
//! first failure aborts the run.

pub mod bootstrap;
pub mod orchestrator;
pub mod publish;

pub use bootstrap::{resolve_bootstrap_secret, seal_bootstrap_secret, BootstrapSecret};
pub use orchestrator::{BackupOrchestrator, BackupReport, Stage};
pub use publish::{ChunkPublisher, PublishReport};
