//! Activation as a value: the environment variables and binary search order a
//! shell `activate` script would set up, applied to each child process instead
//! of to the launcher itself.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::environment::IsolatedEnvironment;
use crate::error::LaunchError;
use crate::process::ProcessSpec;

#[derive(Debug, Clone)]
pub struct ActiveEnvironment {
    env_dir: PathBuf,
    scripts_dir: PathBuf,
    python: PathBuf,
    search_path: OsString,
}

/// Enter `env`. `base_path` is the PATH the environment's script directory is
/// prepended to (normally the launcher's own `PATH`).
pub fn activate(
    env: &IsolatedEnvironment,
    base_path: Option<OsString>,
) -> Result<ActiveEnvironment, LaunchError> {
    let fail = |reason: String| LaunchError::Activation {
        path: env.path().to_path_buf(),
        reason,
    };

    if !env.path().is_dir() {
        return Err(fail("not a directory".to_string()));
    }

    let python = env.interpreter().ok_or_else(|| {
        fail("no Python interpreter inside (expected bin/python or Scripts/python.exe)".to_string())
    })?;
    let scripts_dir = python
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| fail("interpreter has no parent directory".to_string()))?;

    let mut dirs = vec![scripts_dir.clone()];
    if let Some(ref base) = base_path {
        dirs.extend(std::env::split_paths(base));
    }
    let search_path = std::env::join_paths(dirs).map_err(|e| fail(format!("cannot build PATH: {}", e)))?;

    tracing::info!(
        env = %env.path().display(),
        python = %python.display(),
        "Environment activated"
    );

    Ok(ActiveEnvironment {
        env_dir: env.path().to_path_buf(),
        scripts_dir,
        python,
        search_path,
    })
}

impl ActiveEnvironment {
    pub fn env_dir(&self) -> &Path {
        &self.env_dir
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    /// A process spec for `program` with the environment active.
    pub fn command(&self, program: impl Into<PathBuf>) -> ProcessSpec {
        ProcessSpec::new(program)
            .env("VIRTUAL_ENV", &self.env_dir)
            .env("PATH", &self.search_path)
            .env_remove("PYTHONHOME")
    }

    /// Resolve `name` the way an activated shell would: the environment's own
    /// script directory first, then the activated PATH.
    pub fn resolve_program(&self, name: &str, cwd: &Path) -> Option<PathBuf> {
        let as_path = Path::new(name);
        if as_path.is_absolute() {
            return as_path.is_file().then(|| as_path.to_path_buf());
        }
        let local = [
            self.scripts_dir.join(name),
            self.scripts_dir.join(format!("{}.exe", name)),
        ];
        if let Some(found) = local.into_iter().find(|p| p.is_file()) {
            return Some(found);
        }
        which::which_in(name, Some(&self.search_path), cwd).ok()
    }
}
