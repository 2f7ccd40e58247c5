//! Launchpad configuration layer.
//!
//! Every environment variable the launcher honours is read here; the rest of
//! the workspace works with the typed values from `schema`.
//!
//! - `env_keys`: key constants and alias chains
//! - `loader`: `.env` parsing and `EnvLookup` (process env over `.env`)
//! - `schema`: `LaunchConfig`, `RunnerConfig`, `ObservabilityConfig`

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{parse_dotenv, read_dotenv, EnvLookup};
pub use schema::{ConfigOverrides, LaunchConfig, ObservabilityConfig, RunnerConfig};
