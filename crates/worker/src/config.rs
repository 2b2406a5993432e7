use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};

/// Where generated and uploaded artifacts are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactBackend {
    /// S3-compatible bucket, configured through `S3Config::from_env`.
    S3,
    /// Directory on local disk.
    Local { root: PathBuf },
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub artifacts: ArtifactBackend,
    /// Emit logs as JSON lines instead of the human-readable format.
    pub log_json: bool,
    /// How long shutdown waits for in-flight side effects.
    pub drain_timeout: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default       |
    /// |----------------------|---------------|
    /// | `DATABASE_URL`       | (required)    |
    /// | `DB_MAX_CONNECTIONS` | `10`          |
    /// | `ARTIFACT_BACKEND`   | `local`       |
    /// | `ARTIFACT_ROOT`      | `./artifacts` |
    /// | `LOG_FORMAT`         | `text`        |
    /// | `DRAIN_TIMEOUT_SECS` | `30`          |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let max_connections: u32 = var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".into())
            .parse()
            .context("DB_MAX_CONNECTIONS must be a valid u32")?;

        let artifacts = match var("ARTIFACT_BACKEND").as_deref().unwrap_or("local") {
            "s3" => ArtifactBackend::S3,
            "local" => ArtifactBackend::Local {
                root: var("ARTIFACT_ROOT")
                    .unwrap_or_else(|| "./artifacts".into())
                    .into(),
            },
            other => bail!("ARTIFACT_BACKEND must be 's3' or 'local', got '{other}'"),
        };

        let log_json = var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));

        let drain_timeout_secs: u64 = var("DRAIN_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("DRAIN_TIMEOUT_SECS must be a valid u64")?;

        Ok(Self {
            database_url,
            max_connections,
            artifacts,
            log_json,
            drain_timeout: Duration::from_secs(drain_timeout_secs),
        })
    }
}
