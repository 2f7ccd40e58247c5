mod cli;

use std::collections::HashMap;
use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use launchpad::launcher::Launcher;
use launchpad::observability::{self, AuditLog};
use launchpad::pause;
use launchpad::signals::{ForegroundRunner, InterruptState};
use launchpad_core::config::{EnvLookup, LaunchConfig, ObservabilityConfig};
use launchpad_env::SystemRunner;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // `.env` lives in the root, so the root itself comes from flags or the process env only.
    let process_env = EnvLookup::new(HashMap::new());
    let root = match LaunchConfig::root_candidate(cli.root.as_deref(), &process_env) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("❌ Cannot determine the launcher directory: {}", e);
            pause::pause_if_interactive(LaunchConfig::pause_enabled(cli.no_pause, &process_env));
            return ExitCode::FAILURE;
        }
    };

    let env = EnvLookup::for_root(&root);
    let obs = ObservabilityConfig::from_lookup(&env);
    observability::init_tracing(&obs);

    let config = LaunchConfig::from_lookup(&root, &env, &cli.overrides());
    tracing::debug!(?config, "Resolved launch configuration");

    let interrupts = match InterruptState::install() {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("{:#}", e);
            std::sync::Arc::new(InterruptState::default())
        }
    };
    let runner = ForegroundRunner::new(SystemRunner, interrupts.clone());

    let launcher = Launcher::new(config, &runner)
        .with_audit(AuditLog::from_config(&obs))
        .with_interrupts(interrupts)
        .with_quiet(obs.quiet);

    let code = launcher.run_to_completion(&mut || pause::pause_if_interactive(true));
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
