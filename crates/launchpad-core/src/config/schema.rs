//! Typed configuration grouped by concern.
//!
//! Values are resolved as: CLI override > process env > `<root>/.env` > default.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::env_keys::{observability as obv_keys, paths, runtime, terminal};
use super::loader::EnvLookup;

pub const DEFAULT_ENV_DIR: &str = "venv";
pub const DEFAULT_MANIFEST: &str = "requirements.txt";
pub const DEFAULT_ENTRY: &str = "app.py";
pub const DEFAULT_RUNNER: &str = "streamlit";
pub const DEFAULT_RUNNER_ARGS: &str = "run {entry}";
pub const DEFAULT_LOG_LEVEL: &str = "launchpad=warn";
pub const QUIET_LOG_LEVEL: &str = "launchpad=error";

/// Placeholder in runner arguments replaced by the entry file path.
pub const ENTRY_PLACEHOLDER: &str = "{entry}";

/// Program that starts the application, resolved inside the active environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl RunnerConfig {
    /// Build from a program name and a whitespace separated argument line.
    pub fn parse(program: &str, args_line: &str) -> Self {
        Self {
            program: program.trim().to_string(),
            args: args_line.split_whitespace().map(String::from).collect(),
        }
    }

    /// Arguments with every `{entry}` occurrence substituted.
    pub fn args_for(&self, entry: &Path) -> Vec<OsString> {
        let entry = entry.to_string_lossy();
        self.args
            .iter()
            .map(|a| {
                if a.contains(ENTRY_PLACEHOLDER) {
                    OsString::from(a.replace(ENTRY_PLACEHOLDER, &entry))
                } else {
                    OsString::from(a)
                }
            })
            .collect()
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::parse(DEFAULT_RUNNER, DEFAULT_RUNNER_ARGS)
    }
}

/// Values supplied on the command line; `None`/`false` defers to env and defaults.
/// The root is not here: it is settled by `root_candidate` before `.env` is read.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub python: Option<PathBuf>,
    pub no_pause: bool,
    pub force_install: bool,
}

/// Everything the launch sequence needs, threaded explicitly through each step.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Project root; every other path below is resolved against it.
    pub root: PathBuf,
    pub env_dir: PathBuf,
    pub manifest: PathBuf,
    pub entry: PathBuf,
    pub runner: RunnerConfig,
    /// Base interpreter used to create the environment. `None` means discover on PATH.
    pub python: Option<PathBuf>,
    pub index_url: Option<String>,
    pub force_install: bool,
    pub pause: bool,
}

impl LaunchConfig {
    /// Defaults rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            env_dir: root.join(DEFAULT_ENV_DIR),
            manifest: root.join(DEFAULT_MANIFEST),
            entry: root.join(DEFAULT_ENTRY),
            runner: RunnerConfig::default(),
            python: None,
            index_url: None,
            force_install: false,
            pause: true,
            root,
        }
    }

    /// Resolve every setting for `root` from `env` and CLI `overrides`.
    pub fn from_lookup(root: &Path, env: &EnvLookup, overrides: &ConfigOverrides) -> Self {
        let rel = |key: &str, default: &str| root.join(env.env_or(key, &[], || default.to_string()));

        let runner = RunnerConfig::parse(
            &env.env_or(runtime::LAUNCHPAD_RUNNER, &[], || DEFAULT_RUNNER.to_string()),
            &env.env_or(runtime::LAUNCHPAD_RUNNER_ARGS, &[], || {
                DEFAULT_RUNNER_ARGS.to_string()
            }),
        );

        let python = overrides.python.clone().or_else(|| {
            env.env_optional(runtime::LAUNCHPAD_PYTHON, runtime::PYTHON_ALIASES)
                .map(PathBuf::from)
        });

        Self {
            root: root.to_path_buf(),
            env_dir: rel(paths::LAUNCHPAD_ENV_DIR, DEFAULT_ENV_DIR),
            manifest: rel(paths::LAUNCHPAD_MANIFEST, DEFAULT_MANIFEST),
            entry: rel(paths::LAUNCHPAD_ENTRY, DEFAULT_ENTRY),
            runner,
            python,
            index_url: env.env_optional(runtime::LAUNCHPAD_INDEX_URL, runtime::INDEX_URL_ALIASES),
            force_install: overrides.force_install
                || env.env_bool(runtime::LAUNCHPAD_FORCE_INSTALL, &[], false),
            pause: Self::pause_enabled(overrides.no_pause, env),
        }
    }

    /// Step 6 runs unless `--no-pause` or `LAUNCHPAD_NO_PAUSE` says otherwise.
    pub fn pause_enabled(no_pause_flag: bool, env: &EnvLookup) -> bool {
        !(no_pause_flag || env.env_bool(terminal::LAUNCHPAD_NO_PAUSE, &[], false))
    }

    /// Root before `.env` is read: CLI flag, then `LAUNCHPAD_ROOT`, then the
    /// directory holding the launcher executable.
    pub fn root_candidate(cli_root: Option<&Path>, env: &EnvLookup) -> std::io::Result<PathBuf> {
        if let Some(root) = cli_root {
            return Ok(root.to_path_buf());
        }
        if let Some(root) = env.env_optional(paths::LAUNCHPAD_ROOT, &[]) {
            return Ok(PathBuf::from(root));
        }
        executable_dir()
    }

    /// Same configuration re-anchored at a canonical root. Paths that were
    /// relative to the old root follow it.
    pub fn with_root(mut self, root: PathBuf) -> Self {
        let rebase = |p: PathBuf, old: &Path| match p.strip_prefix(old) {
            Ok(rel) => root.join(rel),
            Err(_) => p,
        };
        let old = self.root.clone();
        self.env_dir = rebase(self.env_dir, &old);
        self.manifest = rebase(self.manifest, &old);
        self.entry = rebase(self.entry, &old);
        self.root = root;
        self
    }
}

/// Directory containing the running executable.
pub fn executable_dir() -> std::io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("executable {} has no parent directory", exe.display()),
        )
    })
}

/// Logging configuration: quiet, log_level, log_json, audit_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_lookup(env: &EnvLookup) -> Self {
        Self {
            quiet: env.env_bool(obv_keys::LAUNCHPAD_QUIET, &[], false),
            log_level: env.env_or(obv_keys::LAUNCHPAD_LOG_LEVEL, &[], || {
                DEFAULT_LOG_LEVEL.to_string()
            }),
            log_json: env.env_bool(obv_keys::LAUNCHPAD_LOG_JSON, &[], false),
            audit_log: env.env_optional(obv_keys::LAUNCHPAD_AUDIT_LOG, &[]),
        }
    }

    /// `EnvFilter` directive to install. Quiet keeps errors only.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            QUIET_LOG_LEVEL
        } else {
            &self.log_level
        }
    }
}
