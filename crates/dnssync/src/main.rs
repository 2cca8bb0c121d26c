// # dnssync - GCE to Cloud DNS sync
//
// Runs once: reads the target name and the public IP from the instance
// metadata server, makes the A record match, and exits.
//
// This binary is a thin integration layer. All reconciliation logic lives in
// dnssync-core; configuration of the process itself is via environment
// variables only. The record to manage comes from instance metadata.
//
// ## Configuration
//
// - `DNSSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `DNSSYNC_TTL`: TTL of created records in seconds (default: 60)
// - `DNSSYNC_POLL_INTERVAL_SECS`: wait between change status polls (default: 20)
// - `DNSSYNC_MAX_POLLS`: give up on a pending change after this many polls (default: unbounded)
// - `DNSSYNC_MAX_POLL_ERRORS`: poll failures tolerated per change (default: 0)
// - `DNSSYNC_METADATA_URL`: metadata server root
// - `DNSSYNC_DNS_API_URL`: Cloud DNS API root
// - `DNSSYNC_ACCESS_TOKEN`: bearer token to use instead of the service account's
// - `DNSSYNC_MODE`: set to `dry-run` to log change batches without submitting them
//
// ## Exit Codes
//
// - 0: DNS matches the public IP
// - 1: Configuration could not be loaded (process settings or instance metadata)
// - 2: DNS provider failure
// - 130: Interrupted; a change batch may be submitted but unconfirmed

use anyhow::{Context, Result};
use dnssync_core::traits::StaticTokenSource;
use dnssync_core::{ReconcileOutcome, ReconcileSettings, SyncDriver, TokenSource};
use dnssync_metadata_gce::{DEFAULT_METADATA_URL, GceMetadata};
use dnssync_provider_clouddns::{CloudDnsFactory, DEFAULT_API_BASE};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the possible ends of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncExitCode {
    /// DNS matches the public IP
    Synced = 0,
    /// Configuration error
    ConfigError = 1,
    /// DNS provider failure
    RuntimeError = 2,
    /// Interrupted by Ctrl-C
    Interrupted = 130,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Process configuration
struct Config {
    log_level: Level,
    settings: ReconcileSettings,
    metadata_url: String,
    dns_api_url: String,
    access_token: Option<String>,
    dry_run: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("log_level", &self.log_level)
            .field("settings", &self.settings)
            .field("metadata_url", &self.metadata_url)
            .field("dns_api_url", &self.dns_api_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<REDACTED>"))
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = ReconcileSettings::default();

        let settings = ReconcileSettings {
            ttl: parse_or(&lookup, "DNSSYNC_TTL", defaults.ttl)?,
            poll_interval_secs: parse_or(
                &lookup,
                "DNSSYNC_POLL_INTERVAL_SECS",
                defaults.poll_interval_secs,
            )?,
            max_polls: parse_optional(&lookup, "DNSSYNC_MAX_POLLS")?,
            max_poll_errors: parse_or(&lookup, "DNSSYNC_MAX_POLL_ERRORS", defaults.max_poll_errors)?,
        };
        settings
            .validate()
            .context("Invalid reconcile settings")?;

        let log_level = match lookup("DNSSYNC_LOG_LEVEL") {
            Some(level) => parse_log_level(&level)?,
            None => Level::INFO,
        };

        let dry_run = match lookup("DNSSYNC_MODE") {
            None => false,
            Some(mode) => match mode.as_str() {
                "dry-run" => true,
                "" | "live" => false,
                other => anyhow::bail!(
                    "DNSSYNC_MODE '{}' is not valid. Valid modes: live, dry-run",
                    other
                ),
            },
        };

        Ok(Self {
            log_level,
            settings,
            metadata_url: url_or(&lookup, "DNSSYNC_METADATA_URL", DEFAULT_METADATA_URL)?,
            dns_api_url: url_or(&lookup, "DNSSYNC_DNS_API_URL", DEFAULT_API_BASE)?,
            access_token: lookup("DNSSYNC_ACCESS_TOKEN").filter(|t| !t.is_empty()),
            dry_run,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn parse_optional<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} '{}' is not valid: {}", key, raw, e)),
    }
}

fn url_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<String> {
    let url = lookup(key).unwrap_or_else(|| default.to_string());
    if !url.starts_with("https://") && !url.starts_with("http://") {
        anyhow::bail!("{} must use HTTP or HTTPS scheme. Got: {}", key, url);
    }
    Ok(url)
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DNSSYNC_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(config)).into()
}

/// Wire the collaborators and run one sync, racing Ctrl-C
async fn run(config: Config) -> SyncExitCode {
    let metadata = GceMetadata::with_base_url(config.metadata_url.clone());

    let tokens: Arc<dyn TokenSource> = match config.access_token {
        Some(ref token) => {
            info!("Using access token from DNSSYNC_ACCESS_TOKEN");
            Arc::new(StaticTokenSource::new(token.clone()))
        }
        None => Arc::new(metadata.clone()),
    };

    let factory = CloudDnsFactory::new(tokens, config.dry_run).with_api_base(config.dns_api_url);

    let driver = match SyncDriver::new(Box::new(metadata), Box::new(factory), config.settings) {
        Ok(driver) => driver,
        Err(e) => {
            error!("{}", e);
            return SyncExitCode::ConfigError;
        }
    };

    tokio::select! {
        result = driver.run_once() => {
            match &result {
                Ok(outcome) => report(outcome),
                Err(e) => error!("{}", e),
            }
            exit_code_for(&result)
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; a submitted change may not be confirmed yet, check the zone before rerunning");
            SyncExitCode::Interrupted
        }
    }
}

/// Map the result of a run to the process exit code
fn exit_code_for(result: &dnssync_core::Result<ReconcileOutcome>) -> SyncExitCode {
    match result {
        Ok(_) => SyncExitCode::Synced,
        Err(e) if e.is_config() => SyncExitCode::ConfigError,
        Err(_) => SyncExitCode::RuntimeError,
    }
}

fn report(outcome: &ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::AlreadyCorrect { .. } => info!("Sync complete, no changes submitted"),
        changed => info!("Sync complete, {} change batch(es) applied", changed.batches()),
    }
}
