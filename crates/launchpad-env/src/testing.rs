//! In-memory `ProcessRunner` that simulates venv and pip on disk.
//!
//! `python -m venv <dir>` creates `<dir>` with an empty interpreter file,
//! `python -m pip install -r <file>` records every package in `<file>` and the
//! files it includes, and drops an empty console script for each next to the
//! interpreter. Anything else counts as the application and exits with the
//! configured code.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use launchpad_core::manifest::DependencyManifest;

use crate::process::{ExitOutcome, ProcessRunner, ProcessSpec};

#[derive(Debug, Default)]
pub struct FakeRunner {
    calls: RefCell<Vec<ProcessSpec>>,
    installed: RefCell<BTreeSet<String>>,
    fail_venv: Option<i32>,
    fail_pip: Option<i32>,
    app_exit: i32,
    app_signalled: bool,
    spawn_error_for: Option<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// `-m venv` exits with `code` and creates nothing.
    pub fn fail_venv(mut self, code: i32) -> Self {
        self.fail_venv = Some(code);
        self
    }

    /// `-m pip` exits with `code` and installs nothing.
    pub fn fail_pip(mut self, code: i32) -> Self {
        self.fail_pip = Some(code);
        self
    }

    pub fn app_exit(mut self, code: i32) -> Self {
        self.app_exit = code;
        self
    }

    /// The application dies without an exit code, as if killed by a signal.
    pub fn app_signalled(mut self) -> Self {
        self.app_signalled = true;
        self
    }

    /// Programs whose path ends with `program` fail to spawn with `NotFound`.
    pub fn spawn_error_for(mut self, program: &str) -> Self {
        self.spawn_error_for = Some(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ProcessSpec> {
        self.calls.borrow().clone()
    }

    pub fn installed(&self) -> Vec<String> {
        self.installed.borrow().iter().cloned().collect()
    }

    pub fn venv_runs(&self) -> usize {
        self.count(|c| c.has_arg_pair("-m", "venv"))
    }

    pub fn pip_runs(&self) -> usize {
        self.count(|c| c.has_arg_pair("-m", "pip"))
    }

    pub fn app_runs(&self) -> usize {
        self.count(|c| !c.has_arg_pair("-m", "venv") && !c.has_arg_pair("-m", "pip"))
    }

    fn count(&self, pred: impl Fn(&ProcessSpec) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(*c)).count()
    }

    fn create_venv(&self, spec: &ProcessSpec) -> io::Result<ExitOutcome> {
        if let Some(code) = self.fail_venv {
            return Ok(ExitOutcome::from_code(code));
        }
        let dir = spec
            .args
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "venv without target"))?;
        let dir = match spec.cwd {
            Some(ref cwd) if dir.is_relative() => cwd.join(dir),
            _ => dir,
        };
        let interpreter = if cfg!(windows) {
            dir.join("Scripts").join("python.exe")
        } else {
            dir.join("bin").join("python")
        };
        write_empty(&interpreter)?;
        Ok(ExitOutcome::from_code(0))
    }

    fn pip_install(&self, spec: &ProcessSpec) -> io::Result<ExitOutcome> {
        if let Some(code) = self.fail_pip {
            return Ok(ExitOutcome::from_code(code));
        }
        let manifest = spec
            .args
            .iter()
            .skip_while(|a| *a != "-r")
            .nth(1)
            .map(PathBuf::from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "pip without -r"))?;
        let manifest = DependencyManifest::load(&manifest)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e.to_string()))?;
        let scripts_dir = spec.program.parent().unwrap_or(Path::new("."));
        for name in manifest.package_names() {
            let script = if cfg!(windows) {
                scripts_dir.join(format!("{}.exe", name))
            } else {
                scripts_dir.join(name)
            };
            write_empty(&script)?;
            self.installed.borrow_mut().insert(name.to_string());
        }
        Ok(ExitOutcome::from_code(0))
    }
}

fn write_empty(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, "")
}

impl ProcessRunner for FakeRunner {
    fn run(&self, spec: &ProcessSpec) -> io::Result<ExitOutcome> {
        self.calls.borrow_mut().push(spec.clone());

        if let Some(ref program) = self.spawn_error_for {
            if spec.program.ends_with(program) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{}: not found", program),
                ));
            }
        }

        if spec.has_arg_pair("-m", "venv") {
            self.create_venv(spec)
        } else if spec.has_arg_pair("-m", "pip") {
            self.pip_install(spec)
        } else if self.app_signalled {
            Ok(ExitOutcome::signalled())
        } else {
            Ok(ExitOutcome::from_code(self.app_exit))
        }
    }
}
