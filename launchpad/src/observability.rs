//! Observability: tracing init and the optional JSONL audit log.
//!
//! Uses `ObservabilityConfig` for LAUNCHPAD_QUIET, LOG_LEVEL, LOG_JSON, AUDIT_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use launchpad_core::config::ObservabilityConfig;
use serde_json::{json, Value};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing. Call once at process startup; `RUST_LOG` wins over config.
/// When LAUNCHPAD_QUIET=1, only errors are logged.
pub fn init_tracing(cfg: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.effective_log_level()));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

/// Append-only JSONL record of launch steps.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        Self { path }
    }

    pub fn from_config(cfg: &ObservabilityConfig) -> Option<Self> {
        cfg.audit_log.as_deref().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one `{ts, event, stage, ...details}` line. Audit failures never
    /// interrupt the launch.
    pub fn record(&self, event: &str, stage: &str, details: Value) {
        let mut record = json!({
            "ts": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "event": event,
            "stage": stage,
        });
        if let (Some(obj), Value::Object(extra)) = (record.as_object_mut(), details) {
            obj.extend(extra);
        }
        append_jsonl(&self.path, &record);
    }
}

fn append_jsonl(path: &Path, record: &Value) {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(mut f) => {
            if let Ok(line) = serde_json::to_string(record) {
                let _ = writeln!(f, "{}", line);
            }
        }
        Err(e) => tracing::debug!(path = %path.display(), "Audit log unavailable: {}", e),
    }
}
