use std::path::PathBuf;

use clap::Parser;
use launchpad_core::config::ConfigOverrides;

/// Launchpad - create the project's virtual environment, install its
/// requirements and start the application. Every flag is optional.
#[derive(Parser, Debug)]
#[command(name = "launchpad")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project root (default: LAUNCHPAD_ROOT, else the directory containing this executable)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Base Python interpreter used to create the environment (default: LAUNCHPAD_PYTHON or python3/python on PATH)
    #[arg(long, value_name = "PATH")]
    pub python: Option<PathBuf>,

    /// Exit without waiting for Enter
    #[arg(long)]
    pub no_pause: bool,

    /// Run pip even if the manifest is unchanged since the last install
    #[arg(long)]
    pub force_install: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            python: self.python.clone(),
            no_pause: self.no_pause,
            force_install: self.force_install,
        }
    }
}
