//! Isolated environment directory: existence check and first-run creation.

use std::path::{Path, PathBuf};

use crate::error::LaunchError;
use crate::process::{ProcessRunner, ProcessSpec};

/// Interpreter locations inside a venv, Unix layout first.
const INTERPRETER_CANDIDATES: &[&[&str]] = &[
    &["bin", "python"],
    &["bin", "python3"],
    &["Scripts", "python.exe"],
];

/// Base interpreters tried on PATH when none is configured.
#[cfg(windows)]
const PYTHON_CANDIDATES: &[&str] = &["python", "py", "python3"];
#[cfg(not(windows))]
const PYTHON_CANDIDATES: &[&str] = &["python3", "python"];

/// Marker written after a successful dependency install.
pub const INSTALL_STAMP_FILE: &str = ".launchpad-install.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolatedEnvironment {
    path: PathBuf,
}

impl IsolatedEnvironment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Presence is the only thing checked; contents are trusted.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// The environment's own interpreter, if one can be found.
    pub fn interpreter(&self) -> Option<PathBuf> {
        INTERPRETER_CANDIDATES
            .iter()
            .map(|parts| parts.iter().fold(self.path.clone(), |acc, p| acc.join(p)))
            .find(|p| p.is_file())
    }
}

/// Whether `ensure_environment` built the directory or found it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    Reused,
}

/// Create the environment with `<python> -m venv <path>` unless the directory
/// already exists. `python = None` discovers a base interpreter on PATH.
pub fn ensure_environment(
    env: &IsolatedEnvironment,
    python: Option<&Path>,
    root: &Path,
    runner: &dyn ProcessRunner,
) -> Result<Provisioned, LaunchError> {
    if env.exists() {
        tracing::info!(path = %env.path().display(), "Reusing existing environment");
        return Ok(Provisioned::Reused);
    }

    let python = match python {
        Some(p) => p.to_path_buf(),
        None => discover_python()?,
    };

    let spec = ProcessSpec::new(&python)
        .args(["-m", "venv"])
        .arg(env.path())
        .current_dir(root);

    tracing::info!(command = %spec.display(), "Creating environment");
    let outcome = runner.run(&spec).map_err(|e| LaunchError::Provisioning {
        path: env.path().to_path_buf(),
        reason: format!("could not run {}: {}", python.display(), e),
        code: None,
    })?;

    if !outcome.success() {
        return Err(LaunchError::Provisioning {
            path: env.path().to_path_buf(),
            reason: format!("`{}` failed with {}", spec.display(), outcome),
            code: outcome.code(),
        });
    }

    if !env.exists() {
        return Err(LaunchError::Provisioning {
            path: env.path().to_path_buf(),
            reason: format!("`{}` succeeded but the directory was not created", spec.display()),
            code: None,
        });
    }

    Ok(Provisioned::Created)
}

/// First of the platform's usual interpreter names found on PATH.
pub fn discover_python() -> Result<PathBuf, LaunchError> {
    PYTHON_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| LaunchError::InterpreterNotFound {
            tried: PYTHON_CANDIDATES.join(", "),
        })
}
