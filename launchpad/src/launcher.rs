//! The launch sequence: resolve root, ensure environment, activate, install,
//! launch, then pause for the operator.
//!
//! Each step is a fallible function; `Launcher::run` stops at the first error
//! and reports the stage it had reached.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf, Prefix};
use std::sync::Arc;

use launchpad_core::config::LaunchConfig;
use launchpad_env::{
    activate, ensure_environment, install_dependencies, ActiveEnvironment, ExitOutcome,
    InstallOptions, InstallOutcome, IsolatedEnvironment, LaunchError, ProcessRunner, Provisioned,
};
use serde_json::json;
use thiserror::Error;

use crate::info_log;
use crate::observability::AuditLog;
use crate::signals::InterruptState;

const TOTAL_STEPS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    DirectoryResolved,
    EnvironmentReady,
    EnvironmentActive,
    DependenciesInstalled,
    ApplicationRunning,
    Finished,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::DirectoryResolved => "directory_resolved",
            Stage::EnvironmentReady => "environment_ready",
            Stage::EnvironmentActive => "environment_active",
            Stage::DependenciesInstalled => "dependencies_installed",
            Stage::ApplicationRunning => "application_running",
            Stage::Finished => "finished",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A launch that stopped early: the last stage reached and the cause.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct StepFailure {
    pub stage: Stage,
    pub error: LaunchError,
}

impl StepFailure {
    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

/// What a completed sequence did.
#[derive(Debug, Clone)]
pub struct LaunchReport {
    pub root: PathBuf,
    pub environment: Provisioned,
    pub install: InstallOutcome,
    pub app_exit: ExitOutcome,
    pub interrupted: bool,
}

impl LaunchReport {
    /// The application's own exit code; 1 when it died without one.
    pub fn exit_code(&self) -> i32 {
        self.app_exit.code().unwrap_or(1)
    }
}

pub struct Launcher<'a> {
    config: LaunchConfig,
    runner: &'a dyn ProcessRunner,
    audit: Option<AuditLog>,
    interrupts: Option<Arc<InterruptState>>,
    base_path: Option<OsString>,
    quiet: bool,
}

impl<'a> Launcher<'a> {
    pub fn new(config: LaunchConfig, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            config,
            runner,
            audit: None,
            interrupts: None,
            base_path: std::env::var_os("PATH"),
            quiet: false,
        }
    }

    /// Drop the step narration from the terminal; failures are still printed.
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_audit(mut self, audit: Option<AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_interrupts(mut self, interrupts: Arc<InterruptState>) -> Self {
        self.interrupts = Some(interrupts);
        self
    }

    /// PATH the environment's script directory is prepended to on activation.
    pub fn with_base_path(mut self, base_path: Option<OsString>) -> Self {
        self.base_path = base_path;
        self
    }

    /// Run the whole sequence, report the outcome, then pause (when enabled)
    /// through `acknowledge`. Returns the process exit code.
    pub fn run_to_completion(&self, acknowledge: &mut dyn FnMut()) -> i32 {
        let code = match self.run() {
            Ok(report) => {
                info_log!(self.quiet, "");
                if report.app_exit.success() {
                    info_log!(self.quiet, "✅ Application exited normally");
                } else {
                    eprintln!("⚠ Application exited with {}", report.app_exit);
                }
                if report.interrupted {
                    eprintln!("   (interrupted by Ctrl+C)");
                }
                info_log!(self.quiet, "   Project: {}", report.root.display());
                info_log!(self.quiet, "   Dependencies: {}", describe_install(&report.install));
                report.exit_code()
            }
            Err(failure) => {
                eprintln!();
                eprintln!("❌ {}", failure.error);
                eprintln!(
                    "   Stopped at stage '{}' ({} failure)",
                    failure.stage,
                    failure.error.kind()
                );
                tracing::error!(stage = %failure.stage, kind = %failure.error.kind(), "{}", failure.error);
                failure.exit_code()
            }
        };
        if self.config.pause {
            acknowledge();
        }
        code
    }

    /// Run steps 1 to 5. The pause is left to the caller.
    pub fn run(&self) -> Result<LaunchReport, StepFailure> {
        info_log!(self.quiet, "🚀 launchpad");

        let config = self.step(Stage::Start, || self.resolve_root())?;

        let env = IsolatedEnvironment::new(&config.env_dir);
        let environment = self.step(Stage::DirectoryResolved, || self.ensure_env(&config, &env))?;

        let active = self.step(Stage::EnvironmentReady, || self.activate_env(&env))?;

        let install = self.step(Stage::EnvironmentActive, || self.install(&config, &active))?;

        let app_exit = self.step(Stage::DependenciesInstalled, || self.launch(&config, &active))?;

        let interrupted = self.interrupts.as_ref().map_or(false, |s| s.interrupted());
        self.audit_event(
            "application_exited",
            Stage::Finished,
            json!({ "exit_code": app_exit.code(), "interrupted": interrupted }),
        );

        Ok(LaunchReport {
            root: config.root,
            environment,
            install,
            app_exit,
            interrupted,
        })
    }

    /// Run one step that starts at `from`, auditing its start and outcome.
    fn step<T>(
        &self,
        from: Stage,
        f: impl FnOnce() -> Result<T, LaunchError>,
    ) -> Result<T, StepFailure> {
        self.audit_event("step_started", from, json!({}));
        match f() {
            Ok(v) => {
                self.audit_event("step_completed", from, json!({}));
                Ok(v)
            }
            Err(error) => {
                self.audit_event(
                    "step_failed",
                    from,
                    json!({ "kind": error.kind().as_str(), "error": error.to_string() }),
                );
                Err(StepFailure { stage: from, error })
            }
        }
    }

    fn audit_event(&self, event: &str, stage: Stage, details: serde_json::Value) {
        if let Some(ref audit) = self.audit {
            audit.record(event, stage.as_str(), details);
        }
    }

    fn resolve_root(&self) -> Result<LaunchConfig, LaunchError> {
        self.narrate(1, "Resolving project directory...");
        let root = &self.config.root;
        let directory_error = |source: std::io::Error| LaunchError::Directory {
            path: root.clone(),
            source,
        };
        let canonical = std::fs::canonicalize(root).map_err(directory_error)?;
        if !canonical.is_dir() {
            return Err(directory_error(std::io::Error::new(
                std::io::ErrorKind::Other,
                "not a directory",
            )));
        }
        // Children get `C:\...`, not `\\?\C:\...`; Python tooling mishandles verbatim paths.
        let canonical = strip_verbatim_prefix(&canonical);
        info_log!(self.quiet, "   ✅ {}", canonical.display());
        Ok(self.config.clone().with_root(canonical))
    }

    fn ensure_env(
        &self,
        config: &LaunchConfig,
        env: &IsolatedEnvironment,
    ) -> Result<Provisioned, LaunchError> {
        self.narrate(2, "Checking isolated environment...");
        let provisioned = ensure_environment(env, config.python.as_deref(), &config.root, self.runner)?;
        match provisioned {
            Provisioned::Created => info_log!(self.quiet, "   ✅ Created {}", env.path().display()),
            Provisioned::Reused => {
                info_log!(self.quiet, "   ✅ Using existing {}", env.path().display())
            }
        }
        Ok(provisioned)
    }

    fn activate_env(&self, env: &IsolatedEnvironment) -> Result<ActiveEnvironment, LaunchError> {
        self.narrate(3, "Activating environment...");
        let active = activate(env, self.base_path.clone())?;
        info_log!(self.quiet, "   ✅ Python: {}", active.python().display());
        Ok(active)
    }

    fn install(
        &self,
        config: &LaunchConfig,
        active: &ActiveEnvironment,
    ) -> Result<InstallOutcome, LaunchError> {
        self.narrate(4, "Installing dependencies...");
        let opts = InstallOptions {
            index_url: config.index_url.as_deref(),
            force: config.force_install,
            cwd: &config.root,
        };
        let outcome = install_dependencies(active, &config.manifest, &opts, self.runner)?;
        if outcome == InstallOutcome::NothingToInstall {
            info_log!(self.quiet, "   ✅ {} lists no requirements", config.manifest.display());
        } else {
            info_log!(self.quiet, "   ✅ {}", describe_install(&outcome));
        }
        Ok(outcome)
    }

    fn launch(
        &self,
        config: &LaunchConfig,
        active: &ActiveEnvironment,
    ) -> Result<ExitOutcome, LaunchError> {
        self.narrate(5, "Starting application...");
        if !config.entry.is_file() {
            return Err(LaunchError::EntryMissing(config.entry.clone()));
        }

        let program = active
            .resolve_program(&config.runner.program, &config.root)
            .ok_or_else(|| LaunchError::Launch {
                reason: format!(
                    "`{}` not found in {} or on PATH",
                    config.runner.program,
                    active.scripts_dir().display()
                ),
                code: None,
            })?;

        let spec = active
            .command(&program)
            .args(config.runner.args_for(&config.entry))
            .current_dir(&config.root);

        info_log!(self.quiet, "   → {}", spec.display());
        info_log!(self.quiet, "");
        tracing::info!(command = %spec.display(), "Launching application");
        self.audit_event(
            "application_started",
            Stage::ApplicationRunning,
            json!({ "command": spec.display() }),
        );

        self.runner.run(&spec).map_err(|e| LaunchError::Launch {
            reason: format!("could not start {}: {}", program.display(), e),
            code: None,
        })
    }

    fn narrate(&self, step: usize, message: &str) {
        info_log!(self.quiet, "🔍 Step {}/{}: {}", step, TOTAL_STEPS, message);
    }
}

fn describe_install(outcome: &InstallOutcome) -> String {
    match outcome {
        InstallOutcome::Installed { requirements } => {
            format!("installed {} requirement(s)", requirements)
        }
        InstallOutcome::UpToDate { requirements } => {
            format!("{} requirement(s) already up to date", requirements)
        }
        InstallOutcome::NothingToInstall => "nothing to install".to_string(),
    }
}

/// `\\?\C:\dir` becomes `C:\dir`. UNC and device paths are kept as they are.
fn strip_verbatim_prefix(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Prefix(prefix)) => match prefix.kind() {
            Prefix::VerbatimDisk(drive) => {
                let mut plain = PathBuf::from(format!("{}:\\", drive as char));
                plain.extend(components.filter(|c| !matches!(c, Component::RootDir)));
                plain
            }
            _ => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launchpad_env::testing::FakeRunner;
    use std::fs;
    use std::path::Path;

    fn project(manifest: Option<&str>, entry: bool) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        if let Some(content) = manifest {
            fs::write(tmp.path().join("requirements.txt"), content).unwrap();
        }
        if entry {
            fs::write(tmp.path().join("app.py"), "import streamlit as st\nst.title('ok')\n").unwrap();
        }
        tmp
    }

    fn config(root: &Path) -> LaunchConfig {
        let mut cfg = LaunchConfig::new(root);
        cfg.python = Some(PathBuf::from("python3"));
        cfg
    }

    fn launcher<'a>(cfg: LaunchConfig, runner: &'a FakeRunner) -> Launcher<'a> {
        Launcher::new(cfg, runner).with_base_path(None)
    }

    #[test]
    fn test_end_to_end_fresh_project() {
        let tmp = project(Some("streamlit\n"), true);
        let runner = FakeRunner::new();
        let mut pauses = 0;

        let code = launcher(config(tmp.path()), &runner).run_to_completion(&mut || pauses += 1);

        assert_eq!(code, 0);
        assert!(tmp.path().join("venv").is_dir());
        assert_eq!(runner.installed(), vec!["streamlit"]);
        assert_eq!(runner.venv_runs(), 1);
        assert_eq!(runner.pip_runs(), 1);
        assert_eq!(runner.app_runs(), 1);
        assert_eq!(pauses, 1);

        let app = runner.calls().into_iter().last().unwrap();
        assert!(app.program.ends_with("streamlit"));
        assert_eq!(app.args[0], "run");
        assert!(Path::new(&app.args[1]).ends_with("app.py"));
        assert!(app.env.iter().any(|(k, _)| k == "VIRTUAL_ENV"));
    }

    #[test]
    fn test_second_run_reuses_environment() {
        let tmp = project(Some("streamlit\n"), true);
        let runner = FakeRunner::new();

        let first = launcher(config(tmp.path()), &runner).run().unwrap();
        let second = launcher(config(tmp.path()), &runner).run().unwrap();

        assert_eq!(first.environment, Provisioned::Created);
        assert_eq!(second.environment, Provisioned::Reused);
        assert_eq!(second.install, InstallOutcome::UpToDate { requirements: 1 });
        assert_eq!(second.root, fs::canonicalize(tmp.path()).unwrap());
        assert_eq!(runner.venv_runs(), 1);
        assert_eq!(runner.pip_runs(), 1);
        assert_eq!(runner.app_runs(), 2);
    }

    #[test]
    fn test_missing_manifest_aborts_before_launch() {
        let tmp = project(None, true);
        let runner = FakeRunner::new();
        let mut pauses = 0;

        let failure = launcher(config(tmp.path()), &runner).run().unwrap_err();
        assert_eq!(failure.stage, Stage::EnvironmentActive);
        assert_eq!(failure.error.kind(), launchpad_env::FailureKind::DependencyInstall);
        assert!(failure.to_string().contains("requirements.txt"));
        assert_eq!(runner.app_runs(), 0);

        let code = launcher(config(tmp.path()), &runner).run_to_completion(&mut || pauses += 1);
        assert_eq!(code, 1);
        assert_eq!(pauses, 1);
    }

    #[test]
    fn test_missing_entry_aborts_at_launch_after_install() {
        let tmp = project(Some("streamlit\n"), false);
        let runner = FakeRunner::new();

        let failure = launcher(config(tmp.path()), &runner).run().unwrap_err();

        assert_eq!(failure.stage, Stage::DependenciesInstalled);
        assert!(matches!(failure.error, LaunchError::EntryMissing(_)));
        assert!(tmp.path().join("venv").is_dir());
        assert_eq!(runner.installed(), vec!["streamlit"]);
        assert_eq!(runner.app_runs(), 0);
    }

    #[test]
    fn test_inaccessible_root_fails_first() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();

        let failure = launcher(config(&tmp.path().join("missing")), &runner)
            .run()
            .unwrap_err();

        assert_eq!(failure.stage, Stage::Start);
        assert_eq!(failure.error.kind(), launchpad_env::FailureKind::Directory);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_provisioning_failure_propagates_code() {
        let tmp = project(Some("streamlit\n"), true);
        let runner = FakeRunner::new().fail_venv(3);

        let failure = launcher(config(tmp.path()), &runner).run().unwrap_err();

        assert_eq!(failure.stage, Stage::DirectoryResolved);
        assert_eq!(failure.exit_code(), 3);
        assert_eq!(runner.pip_runs(), 0);
    }

    #[test]
    fn test_runner_not_installed_is_launch_failure() {
        let tmp = project(Some("pandas\n"), true);
        let runner = FakeRunner::new();
        let mut cfg = config(tmp.path());
        cfg.runner = launchpad_core::config::RunnerConfig::parse("no-such-runner-launchpad", "{entry}");

        let failure = launcher(cfg, &runner).run().unwrap_err();

        assert_eq!(failure.error.kind(), launchpad_env::FailureKind::Launch);
        assert!(failure.to_string().contains("no-such-runner-launchpad"));
    }

    #[test]
    fn test_application_exit_code_is_propagated() {
        let tmp = project(Some("streamlit\n"), true);
        let runner = FakeRunner::new().app_exit(4);
        let mut cfg = config(tmp.path());
        cfg.pause = false;
        let mut pauses = 0;

        let code = launcher(cfg, &runner).run_to_completion(&mut || pauses += 1);

        assert_eq!(code, 4);
        assert_eq!(pauses, 0);
    }

    #[test]
    fn test_environment_without_interpreter_fails_activation() {
        let tmp = project(Some("streamlit\n"), true);
        fs::create_dir_all(tmp.path().join("venv")).unwrap();
        let runner = FakeRunner::new();
        let mut pauses = 0;

        let failure = launcher(config(tmp.path()), &runner).run().unwrap_err();

        assert_eq!(failure.stage, Stage::EnvironmentReady);
        assert_eq!(failure.error.kind(), launchpad_env::FailureKind::Activation);
        assert!(failure.to_string().contains("Delete the directory and rerun"));
        assert_eq!(runner.venv_runs(), 0);
        assert_eq!(runner.pip_runs(), 0);

        let code = launcher(config(tmp.path()), &runner).run_to_completion(&mut || pauses += 1);
        assert_eq!(code, 1);
        assert_eq!(pauses, 1);
    }

    #[test]
    fn test_interrupted_application_reports_signal() {
        let tmp = project(Some("streamlit\n"), true);
        let runner = FakeRunner::new().app_signalled();
        let interrupts = Arc::new(InterruptState::default());
        let mut pauses = 0;

        let report = launcher(config(tmp.path()), &runner)
            .with_interrupts(interrupts.clone())
            .run()
            .unwrap();
        assert!(!report.interrupted);

        interrupts.record_interrupt();
        let report = launcher(config(tmp.path()), &runner)
            .with_interrupts(interrupts.clone())
            .run()
            .unwrap();
        assert!(report.interrupted);
        assert_eq!(report.app_exit.code(), None);
        assert_eq!(report.exit_code(), 1);

        let code = launcher(config(tmp.path()), &runner)
            .with_interrupts(interrupts)
            .run_to_completion(&mut || pauses += 1);
        assert_eq!(code, 1);
        assert_eq!(pauses, 1);
    }

    #[test]
    fn test_quiet_launch_still_reports_outcome() {
        let tmp = project(Some("streamlit\n"), true);
        let runner = FakeRunner::new().app_exit(2);
        let mut pauses = 0;

        let code = launcher(config(tmp.path()), &runner)
            .with_quiet(true)
            .run_to_completion(&mut || pauses += 1);

        assert_eq!(code, 2);
        assert_eq!(pauses, 1);
        assert_eq!(runner.app_runs(), 1);
    }

    #[test]
    fn test_describe_install() {
        assert_eq!(
            describe_install(&InstallOutcome::Installed { requirements: 3 }),
            "installed 3 requirement(s)"
        );
        assert_eq!(
            describe_install(&InstallOutcome::UpToDate { requirements: 2 }),
            "2 requirement(s) already up to date"
        );
    }

    #[cfg(windows)]
    #[test]
    fn test_verbatim_disk_prefix_is_stripped() {
        assert_eq!(
            strip_verbatim_prefix(Path::new(r"\\?\C:\projects\cleaner")),
            PathBuf::from(r"C:\projects\cleaner")
        );
        assert_eq!(
            strip_verbatim_prefix(Path::new(r"\\?\UNC\server\share")),
            PathBuf::from(r"\\?\UNC\server\share")
        );
    }

    #[test]
    fn test_plain_paths_are_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let canonical = fs::canonicalize(tmp.path()).unwrap();
        let plain = strip_verbatim_prefix(&canonical);
        assert!(plain.is_dir());
        assert!(!plain.to_string_lossy().starts_with(r"\\?\"));
    }

    #[test]
    fn test_audit_log_records_steps() {
        let tmp = project(None, true);
        let runner = FakeRunner::new();
        let audit = AuditLog::new(tmp.path().join("audit.jsonl"));

        let _ = launcher(config(tmp.path()), &runner)
            .with_audit(Some(audit.clone()))
            .run();

        let events: Vec<serde_json::Value> = fs::read_to_string(audit.path())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let last = events.last().unwrap();
        assert_eq!(last["event"], "step_failed");
        assert_eq!(last["stage"], "environment_active");
        assert_eq!(last["kind"], "dependency-install");
        assert_eq!(
            events.iter().filter(|e| e["event"] == "step_completed").count(),
            3
        );
    }
}
