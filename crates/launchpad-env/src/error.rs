use std::path::PathBuf;

use launchpad_core::manifest::ManifestError;
use thiserror::Error;

/// Which part of the launch sequence a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Directory,
    Provisioning,
    Activation,
    DependencyInstall,
    Launch,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Directory => "directory",
            FailureKind::Provisioning => "provisioning",
            FailureKind::Activation => "activation",
            FailureKind::DependencyInstall => "dependency-install",
            FailureKind::Launch => "launch",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal errors of the launch sequence. None of them is retried.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Project directory {} is not accessible: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No Python interpreter found on PATH (tried {tried}); install Python 3 or set LAUNCHPAD_PYTHON")]
    InterpreterNotFound { tried: String },

    #[error("Failed to create isolated environment at {}: {reason}", .path.display())]
    Provisioning {
        path: PathBuf,
        reason: String,
        code: Option<i32>,
    },

    #[error("Environment at {} cannot be activated: {reason}. Delete the directory and rerun to rebuild it", .path.display())]
    Activation { path: PathBuf, reason: String },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Dependency installation failed: {reason}")]
    DependencyInstall { reason: String, code: Option<i32> },

    #[error("Application entry not found: {}", .0.display())]
    EntryMissing(PathBuf),

    #[error("Failed to launch application: {reason}")]
    Launch { reason: String, code: Option<i32> },
}

impl LaunchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            LaunchError::Directory { .. } => FailureKind::Directory,
            LaunchError::InterpreterNotFound { .. } | LaunchError::Provisioning { .. } => {
                FailureKind::Provisioning
            }
            LaunchError::Activation { .. } => FailureKind::Activation,
            LaunchError::Manifest(_) | LaunchError::DependencyInstall { .. } => {
                FailureKind::DependencyInstall
            }
            LaunchError::EntryMissing(_) | LaunchError::Launch { .. } => FailureKind::Launch,
        }
    }

    /// Process exit code for this failure: the failing child's own code when
    /// it had a non-zero one, otherwise 1.
    pub fn exit_code(&self) -> i32 {
        let child = match self {
            LaunchError::Provisioning { code, .. }
            | LaunchError::DependencyInstall { code, .. }
            | LaunchError::Launch { code, .. } => *code,
            _ => None,
        };
        child.filter(|c| *c != 0).unwrap_or(1)
    }
}
