//! Environment lookup with alias chains and `.env` fallback.
//!
//! The `.env` file is parsed into memory and consulted after the process
//! environment; it is never written back with `set_var`.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use super::env_keys::paths::DOTENV_FILE;

/// Parse dotenv content into ordered `(key, value)` pairs.
///
/// Blank lines and `#` comments are skipped, a trailing `# comment` is stripped
/// when the value is unquoted, and one layer of matching quotes is removed.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            pairs.push((key.to_string(), value.to_string()));
        }
    }
    pairs
}

/// Read `<dir>/.env` into a map. A missing or unreadable file yields an empty map.
pub fn read_dotenv(dir: &Path) -> HashMap<String, String> {
    let path = dir.join(DOTENV_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let map: HashMap<String, String> = parse_dotenv(&content).into_iter().collect();
            tracing::debug!(path = %path.display(), keys = map.len(), "Loaded dotenv");
            map
        }
        Err(_) => HashMap::new(),
    }
}

/// Layered key lookup: process environment first, then the `.env` map.
#[derive(Debug, Clone, Default)]
pub struct EnvLookup {
    dotenv: HashMap<String, String>,
    use_process_env: bool,
}

impl EnvLookup {
    /// Process environment layered over the given `.env` map.
    pub fn new(dotenv: HashMap<String, String>) -> Self {
        Self {
            dotenv,
            use_process_env: true,
        }
    }

    /// Lookup backed only by `values`. Used where the process environment must
    /// not leak in (tests, embedding).
    pub fn isolated(values: HashMap<String, String>) -> Self {
        Self {
            dotenv: values,
            use_process_env: false,
        }
    }

    /// Process environment layered over `<dir>/.env`.
    pub fn for_root(dir: &Path) -> Self {
        Self::new(read_dotenv(dir))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if self.use_process_env {
            if let Ok(v) = env::var(key) {
                return Some(v);
            }
        }
        self.dotenv.get(key).cloned()
    }

    fn first(&self, primary: &str, aliases: &[&str]) -> Option<String> {
        self.get(primary)
            .or_else(|| aliases.iter().find_map(|a| self.get(a)))
    }

    /// Primary key or alias chain, falling back to `default` when unset or empty.
    pub fn env_or<F>(&self, primary: &str, aliases: &[&str], default: F) -> String
    where
        F: FnOnce() -> String,
    {
        self.first(primary, aliases)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(default)
    }

    /// Primary key or alias chain; empty values count as unset.
    pub fn env_optional(&self, primary: &str, aliases: &[&str]) -> Option<String> {
        self.first(primary, aliases).and_then(|s| {
            let s = s.trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        })
    }

    /// Boolean key: 0/false/no/off are false, any other value is true.
    pub fn env_bool(&self, primary: &str, aliases: &[&str], default: bool) -> bool {
        match self.first(primary, aliases).as_deref() {
            Some(s) => !matches!(
                s.trim().to_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            ),
            None => default,
        }
    }
}
