//! Sequences one backup run: resolve token → download → split/encrypt →
//! publish

use std::fmt;

use opendal::Operator;
use secrecy::ExposeSecret;
use tracing::{error, info, warn};

use snapbak_core::config::BackupConfig;
use snapbak_core::types::local_date_stamp;
use snapbak_core::{BackupResult, BucketPath, RunId};
use snapbak_chunks::{ChunkEncryptor, StagingDir};
use snapbak_crypto::KeyService;
use snapbak_fetch::SnapshotFetcher;

use crate::bootstrap::resolve_bootstrap_secret;
use crate::publish::ChunkPublisher;

/// Pipeline states. Transitions are strictly sequential; any failure moves
/// to the implicit terminal failed state. There is no resumption: a failed
/// run restarts from `Start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    TokenResolved,
    SnapshotDownloaded,
    ChunksEncrypted,
    ChunksPublished,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::TokenResolved => "token-resolved",
            Stage::SnapshotDownloaded => "snapshot-downloaded",
            Stage::ChunksEncrypted => "chunks-encrypted",
            Stage::ChunksPublished => "chunks-published",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a successful run produced
#[derive(Debug)]
pub struct BackupReport {
    pub run_id: RunId,
    /// Calendar date of the run (`YYYYMMDD`), metadata only
    pub date: String,
    pub snapshot_bytes: u64,
    pub chunks: usize,
    pub published: usize,
}

pub struct BackupOrchestrator<'a> {
    config: &'a BackupConfig,
    keys: &'a dyn KeyService,
    secret_store: Operator,
    backup_store: Operator,
    fetcher: SnapshotFetcher,
}

impl<'a> BackupOrchestrator<'a> {
    /// `secret_store` must be scoped to the bucket holding the bootstrap
    /// secret, `backup_store` to the destination bucket.
    pub fn new(
        config: &'a BackupConfig,
        keys: &'a dyn KeyService,
        secret_store: Operator,
        backup_store: Operator,
    ) -> Self {
        Self {
            config,
            keys,
            secret_store,
            backup_store,
            fetcher: SnapshotFetcher::new(),
        }
    }

    /// Execute one run start to finish. The staging directory is removed on
    /// every exit path unless `staging.retain_on_failure` keeps it around
    /// after a failed run.
    pub async fn run(&self) -> BackupResult<BackupReport> {
        self.config.validate()?;

        let run_id = RunId::generate();
        let date = local_date_stamp();
        info!(run_id = %run_id, date = %date, "backup run starting");

        let staging = StagingDir::create(&self.config.staging.root, run_id.as_str())?;
        let mut stage = Stage::Start;

        match self.execute(&staging, &run_id, &date, &mut stage).await {
            Ok(report) => {
                info!(
                    run_id = %run_id,
                    chunks = report.chunks,
                    bytes = report.snapshot_bytes,
                    "backup run complete"
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    run_id = %run_id,
                    stage = %stage,
                    kind = ?err.kind(),
                    error = %err,
                    "backup run failed"
                );
                if self.config.staging.retain_on_failure {
                    let kept = staging.retain();
                    warn!(path = %kept.display(), "staging directory retained for inspection");
                }
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        staging: &StagingDir,
        run_id: &RunId,
        date: &str,
        stage: &mut Stage,
    ) -> BackupResult<BackupReport> {
        let cfg = self.config;

        let secret_location = BucketPath::new(&cfg.secret.bucket, &cfg.secret.path);
        let secret =
            resolve_bootstrap_secret(&self.secret_store, self.keys, &secret_location).await?;
        self.advance(stage, Stage::TokenResolved, run_id);

        let headers = vec![(
            cfg.source.token_header.clone(),
            secret.token.expose_secret().to_string(),
        )];
        let snapshot = self
            .fetcher
            .fetch(&cfg.source.url, &headers, staging.path(), &cfg.source.file_prefix)
            .await?;
        self.advance(stage, Stage::SnapshotDownloaded, run_id);

        let destination = BucketPath::new(&cfg.backup.bucket, &cfg.backup.path);
        let batch_dir = staging.path().join("chunks");
        let batch = ChunkEncryptor::new(self.keys, cfg.staging.chunk_size).split_and_encrypt(
            &snapshot.path,
            &batch_dir,
            &cfg.backup.key_id,
            &destination,
        )?;
        self.advance(stage, Stage::ChunksEncrypted, run_id);

        let published = ChunkPublisher::new(&self.backup_store)
            .publish(&batch.dir, run_id, &destination)
            .await?;
        self.advance(stage, Stage::ChunksPublished, run_id);

        self.advance(stage, Stage::Done, run_id);
        Ok(BackupReport {
            run_id: run_id.clone(),
            date: date.to_string(),
            snapshot_bytes: snapshot.bytes,
            chunks: batch.chunks,
            published: published.uploaded,
        })
    }

    fn advance(&self, stage: &mut Stage, next: Stage, run_id: &RunId) {
        info!(run_id = %run_id, from = %stage, to = %next, "stage transition");
        *stage = next;
    }
}
