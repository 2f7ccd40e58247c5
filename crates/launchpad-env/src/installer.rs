//! Dependency installation into the active environment with pip.
//!
//! pip is already idempotent; the install stamp additionally skips the pip run
//! when the manifest and every file it includes are unchanged since the last
//! successful install.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use launchpad_core::manifest::DependencyManifest;
use serde::{Deserialize, Serialize};

use crate::activation::ActiveEnvironment;
use crate::environment::INSTALL_STAMP_FILE;
use crate::error::LaunchError;
use crate::process::ProcessRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// pip ran and succeeded.
    Installed { requirements: usize },
    /// The stamp matched the manifest; pip was not run. `requirements` is the
    /// count recorded by the install that wrote the stamp.
    UpToDate { requirements: usize },
    /// The manifest lists nothing.
    NothingToInstall,
}

/// Record of the last successful install, kept inside the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallStamp {
    pub manifest_fingerprint: String,
    pub requirement_count: usize,
    pub installed_at: DateTime<Utc>,
}

impl InstallStamp {
    pub fn for_manifest(manifest: &DependencyManifest) -> Self {
        Self {
            manifest_fingerprint: manifest.fingerprint().to_string(),
            requirement_count: manifest.len(),
            installed_at: Utc::now(),
        }
    }

    /// `None` when the stamp is absent or unparsable.
    pub fn read(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Serialize install stamp")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write install stamp: {}", path.display()))
    }

    pub fn matches(&self, manifest: &DependencyManifest) -> bool {
        self.manifest_fingerprint == manifest.fingerprint()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InstallOptions<'a> {
    pub index_url: Option<&'a str>,
    /// Run pip even when the stamp matches.
    pub force: bool,
    pub cwd: &'a Path,
}

/// Install everything listed in `manifest_path` into `active`.
///
/// The manifest must exist; its absence is reported before anything runs.
/// On pip failure nothing is rolled back and the stamp is left untouched.
pub fn install_dependencies(
    active: &ActiveEnvironment,
    manifest_path: &Path,
    opts: &InstallOptions<'_>,
    runner: &dyn ProcessRunner,
) -> Result<InstallOutcome, LaunchError> {
    let manifest = DependencyManifest::load(manifest_path)?;

    if manifest.is_empty() {
        tracing::info!(manifest = %manifest_path.display(), "Manifest lists no requirements");
        return Ok(InstallOutcome::NothingToInstall);
    }

    let stamp_path = active.env_dir().join(INSTALL_STAMP_FILE);
    if !opts.force {
        if let Some(stamp) = InstallStamp::read(&stamp_path) {
            if stamp.matches(&manifest) {
                tracing::info!(
                    fingerprint = %stamp.manifest_fingerprint,
                    installed_at = %stamp.installed_at,
                    "Dependencies up to date"
                );
                return Ok(InstallOutcome::UpToDate {
                    requirements: stamp.requirement_count,
                });
            }
        }
    }

    let mut spec = active
        .command(active.python())
        .args(["-m", "pip", "install", "--disable-pip-version-check", "-r"])
        .arg(manifest_path)
        .current_dir(opts.cwd);
    if let Some(url) = opts.index_url {
        spec = spec.arg("--index-url").arg(url);
    }

    let listed: Vec<String> = manifest.requirements.iter().map(ToString::to_string).collect();
    tracing::info!(
        command = %spec.display(),
        requirements = ?listed,
        "Installing dependencies"
    );
    let outcome = runner.run(&spec).map_err(|e| LaunchError::DependencyInstall {
        reason: format!("could not run pip: {}", e),
        code: None,
    })?;
    if !outcome.success() {
        return Err(LaunchError::DependencyInstall {
            reason: format!("pip install failed with {}", outcome),
            code: outcome.code(),
        });
    }

    // A missing stamp only costs a pip verification pass next run.
    if let Err(e) = InstallStamp::for_manifest(&manifest).write(&stamp_path) {
        tracing::warn!("{:#}", e);
    }

    Ok(InstallOutcome::Installed {
        requirements: manifest.len(),
    })
}
