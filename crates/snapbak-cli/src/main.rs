//! snapbak: encrypted, chunked Consul snapshot backups
//!
//! Commands:
//!   run          - one full backup: resolve token, download, encrypt, publish
//!   token        - resolve the bootstrap secret and print the token
//!   seal <file>  - encrypt a bootstrap document and upload it
//!   keygen <id>  - create or rotate a named key in the keyring
//!   config show  - display the active configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use snapbak_core::config::BackupConfig;
use snapbak_core::BucketPath;
use snapbak_crypto::Keyring;
use snapbak_pipeline::{resolve_bootstrap_secret, seal_bootstrap_secret, BackupOrchestrator};
use snapbak_storage::{build_operator, StorageCredentials};

#[derive(Parser, Debug)]
#[command(
    name = "snapbak",
    version,
    about = "Encrypted, chunked Consul snapshot backups"
)]
struct Cli {
    /// Path to snapbak.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "SNAPBAK_CONFIG",
        default_value = "/etc/snapbak/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SNAPBAK_LOG", default_value = "info")]
    log: String,

    /// Log format (json, text)
    #[arg(long, env = "SNAPBAK_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

/// Per-invocation overrides of the config file, matching the environment
/// surface of the original deployment.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Bucket holding the sealed bootstrap secret
    #[arg(long, env = "CONFIG_BUCKET")]
    config_bucket: Option<String>,

    /// Object path of the sealed bootstrap secret
    #[arg(long, env = "CONFIG_PATH")]
    config_path: Option<String>,

    /// Destination bucket for chunk batches
    #[arg(long, env = "BACKUP_BUCKET")]
    backup_bucket: Option<String>,

    /// Destination path prefix for chunk batches
    #[arg(long, env = "BACKUP_PATH")]
    backup_path: Option<String>,

    /// Snapshot endpoint URL
    #[arg(long, env = "URL")]
    url: Option<String>,

    /// Keyring entry used for encryption
    #[arg(long = "key", env = "KEY")]
    key_id: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one backup end to end
    Run {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Resolve the bootstrap secret and print the token
    Token {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Seal a bootstrap document (JSON with a "token" field) and upload it
    Seal {
        /// Plaintext JSON document to seal
        document: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Create or rotate a named key in the keyring
    Keygen {
        /// Key identifier, referenced by backup.key_id
        key_id: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (defaults + file + overrides)
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log, &cli.log_format);

    let config = load_config(&cli.config).await?;

    match cli.command {
        Commands::Run { overrides } => cmd_run(config, &overrides).await,
        Commands::Token { overrides } => cmd_token(config, &overrides).await,
        Commands::Seal {
            document,
            overrides,
        } => cmd_seal(config, &document, &overrides).await,
        Commands::Keygen { key_id } => cmd_keygen(&config, &key_id),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config),
    }
}

async fn load_config(path: &PathBuf) -> Result<BackupConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    } else {
        warn!("config file not found: {}  (using defaults)", path.display());
        Ok(BackupConfig::default())
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}

fn apply_overrides(config: &mut BackupConfig, overrides: &Overrides) {
    if let Some(bucket) = &overrides.config_bucket {
        config.secret.bucket = bucket.clone();
    }
    if let Some(path) = &overrides.config_path {
        config.secret.path = path.clone();
    }
    if let Some(bucket) = &overrides.backup_bucket {
        config.backup.bucket = bucket.clone();
    }
    if let Some(path) = &overrides.backup_path {
        config.backup.path = path.clone();
    }
    if let Some(url) = &overrides.url {
        config.source.url = url.clone();
    }
    if let Some(key_id) = &overrides.key_id {
        config.backup.key_id = key_id.clone();
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn cmd_run(mut config: BackupConfig, overrides: &Overrides) -> Result<()> {
    apply_overrides(&mut config, overrides);

    let keyring = Keyring::load(&config.keyring.path)?;
    let creds = StorageCredentials::from_env()?;
    let secret_store = build_operator(&config.storage, &creds, &config.secret.bucket)?;
    let backup_store = build_operator(&config.storage, &creds, &config.backup.bucket)?;

    let report = BackupOrchestrator::new(&config, &keyring, secret_store, backup_store)
        .run()
        .await?;

    println!(
        "backup {} complete: {} chunks ({} bytes) published to {}/{}/{}",
        report.run_id,
        report.published,
        report.snapshot_bytes,
        config.backup.bucket,
        config.backup.path,
        report.run_id
    );
    Ok(())
}

async fn cmd_token(mut config: BackupConfig, overrides: &Overrides) -> Result<()> {
    apply_overrides(&mut config, overrides);
    if config.secret.bucket.is_empty() {
        anyhow::bail!("secret.bucket is not set (config file or --config-bucket)");
    }

    let keyring = Keyring::load(&config.keyring.path)?;
    let creds = StorageCredentials::from_env()?;
    let secret_store = build_operator(&config.storage, &creds, &config.secret.bucket)?;

    let location = BucketPath::new(&config.secret.bucket, &config.secret.path);
    let secret = resolve_bootstrap_secret(&secret_store, &keyring, &location).await?;

    println!("{}", secret.token.expose_secret());
    Ok(())
}

async fn cmd_seal(
    mut config: BackupConfig,
    document: &PathBuf,
    overrides: &Overrides,
) -> Result<()> {
    apply_overrides(&mut config, overrides);
    if config.secret.bucket.is_empty() {
        anyhow::bail!("secret.bucket is not set (config file or --config-bucket)");
    }

    let plaintext = tokio::fs::read(document)
        .await
        .with_context(|| format!("reading {}", document.display()))?;

    let keyring = Keyring::load(&config.keyring.path)?;
    let creds = StorageCredentials::from_env()?;
    let secret_store = build_operator(&config.storage, &creds, &config.secret.bucket)?;

    let location = BucketPath::new(&config.secret.bucket, &config.secret.path);
    seal_bootstrap_secret(
        &secret_store,
        &keyring,
        &config.backup.key_id,
        &location,
        &plaintext,
    )
    .await?;

    println!("sealed {} at {}", document.display(), location);
    Ok(())
}

fn cmd_keygen(config: &BackupConfig, key_id: &str) -> Result<()> {
    let path = &config.keyring.path;
    let mut keyring = if path.exists() {
        Keyring::load(path)?
    } else {
        Keyring::new()
    };

    let replacing = keyring.contains(key_id);
    keyring.generate(key_id);
    keyring.save(path)?;

    if replacing {
        info!(key_id, "rotated existing key");
    }
    println!("key '{key_id}' written to {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &BackupConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("serializing configuration")?;
    print!("{rendered}");
    Ok(())
}
