//! Environment variable keys and alias definitions.
//!
//! Primary keys use the `LAUNCHPAD_*` prefix; aliases cover the generic names
//! other Python tooling already understands.

/// Project layout
pub mod paths {
    /// Project root. Defaults to the directory holding the launcher executable.
    pub const LAUNCHPAD_ROOT: &str = "LAUNCHPAD_ROOT";

    /// Isolated environment directory, relative to the root.
    pub const LAUNCHPAD_ENV_DIR: &str = "LAUNCHPAD_ENV_DIR";

    /// Dependency manifest, relative to the root.
    pub const LAUNCHPAD_MANIFEST: &str = "LAUNCHPAD_MANIFEST";

    /// Application entry file, relative to the root.
    pub const LAUNCHPAD_ENTRY: &str = "LAUNCHPAD_ENTRY";

    /// Name of the per-project dotenv file read from the root.
    pub const DOTENV_FILE: &str = ".env";
}

/// Interpreter, installer and runner
pub mod runtime {
    pub const LAUNCHPAD_PYTHON: &str = "LAUNCHPAD_PYTHON";
    pub const PYTHON_ALIASES: &[&str] = &["PYTHON"];

    pub const LAUNCHPAD_INDEX_URL: &str = "LAUNCHPAD_INDEX_URL";
    pub const INDEX_URL_ALIASES: &[&str] = &["PYPI_MIRROR_URL"];

    pub const LAUNCHPAD_FORCE_INSTALL: &str = "LAUNCHPAD_FORCE_INSTALL";

    pub const LAUNCHPAD_RUNNER: &str = "LAUNCHPAD_RUNNER";

    /// Whitespace separated; `{entry}` is replaced with the entry path.
    pub const LAUNCHPAD_RUNNER_ARGS: &str = "LAUNCHPAD_RUNNER_ARGS";
}

/// Terminal behaviour
pub mod terminal {
    pub const LAUNCHPAD_NO_PAUSE: &str = "LAUNCHPAD_NO_PAUSE";
}

/// Observability and logging
pub mod observability {
    pub const LAUNCHPAD_QUIET: &str = "LAUNCHPAD_QUIET";
    pub const LAUNCHPAD_LOG_LEVEL: &str = "LAUNCHPAD_LOG_LEVEL";
    pub const LAUNCHPAD_LOG_JSON: &str = "LAUNCHPAD_LOG_JSON";
    pub const LAUNCHPAD_AUDIT_LOG: &str = "LAUNCHPAD_AUDIT_LOG";
}
