//! Isolated environment lifecycle for the launcher.
//!
//! Each step of the launch sequence lives in its own module and returns
//! `Result<_, LaunchError>`. All child processes go through `ProcessRunner`.

pub mod activation;
pub mod environment;
pub mod error;
pub mod installer;
pub mod process;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use activation::{activate, ActiveEnvironment};
pub use environment::{ensure_environment, IsolatedEnvironment, Provisioned};
pub use error::{FailureKind, LaunchError};
pub use installer::{install_dependencies, InstallOptions, InstallOutcome, InstallStamp};
pub use process::{ExitOutcome, ProcessRunner, ProcessSpec, SystemRunner};
