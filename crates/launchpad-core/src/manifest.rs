//! Dependency manifest: a `requirements.txt`-style list of packages.
//!
//! The launcher hands the file itself to pip; parsing here only serves
//! diagnostics, the empty-manifest shortcut and the install fingerprint.
//! Nested `-r` / `-c` files are followed so the fingerprint covers them too.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Dependency manifest not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read dependency manifest {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One meaningful line of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// `name[extras] <version spec / markers>`
    Package {
        name: String,
        extras: Vec<String>,
        spec: String,
    },
    /// Option lines, editable installs, URLs and paths, kept verbatim.
    Directive(String),
}

impl Requirement {
    pub fn name(&self) -> Option<&str> {
        match self {
            Requirement::Package { name, .. } => Some(name),
            Requirement::Directive(_) => None,
        }
    }

    /// Target of a `-r` / `--requirement` / `-c` / `--constraint` line.
    pub fn included_file(&self) -> Option<&str> {
        let Requirement::Directive(line) = self else {
            return None;
        };
        ["--requirement", "--constraint", "-r", "-c"]
            .iter()
            .find_map(|flag| line.strip_prefix(flag))
            .map(|rest| rest.trim_start_matches('=').trim())
            .filter(|target| !target.is_empty())
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Package { name, extras, spec } => {
                f.write_str(name)?;
                if !extras.is_empty() {
                    write!(f, "[{}]", extras.join(","))?;
                }
                f.write_str(spec)
            }
            Requirement::Directive(line) => f.write_str(line),
        }
    }
}

fn package_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[([^\]]*)\])?\s*(.*)$")
            .expect("static regex")
    })
}

/// Parse one line; `None` for blanks and comments.
pub fn parse_line(line: &str) -> Option<Requirement> {
    let line = strip_comment(line).trim();
    if line.is_empty() {
        return None;
    }
    if line.starts_with('-') || line.contains("://") || line.starts_with('.') || line.starts_with('/') {
        return Some(Requirement::Directive(line.to_string()));
    }
    match package_re().captures(line) {
        Some(caps) => {
            let spec = caps.get(3).map_or("", |m| m.as_str()).trim();
            // A name followed by anything that is not a version operator or marker is not a package line.
            if !spec.is_empty() && !spec.starts_with(['=', '<', '>', '!', '~', ';', '@', ',']) {
                return Some(Requirement::Directive(line.to_string()));
            }
            Some(Requirement::Package {
                name: caps[1].to_string(),
                extras: caps
                    .get(2)
                    .map(|m| {
                        m.as_str()
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
                spec: spec.to_string(),
            })
        }
        None => Some(Requirement::Directive(line.to_string())),
    }
}

/// `#` starts a comment at line start or after whitespace (pip's rule).
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #").or_else(|| line.find("\t#")) {
        Some(pos) => &line[..pos],
        None => line,
    }
}

#[derive(Debug, Clone)]
pub struct DependencyManifest {
    pub path: PathBuf,
    pub requirements: Vec<Requirement>,
    /// Files pulled in with `-r` / `-c`, loaded recursively. Missing ones are
    /// left out here and reported by pip.
    pub includes: Vec<DependencyManifest>,
    fingerprint: String,
}

impl DependencyManifest {
    /// Read and parse the manifest at `path` and every file it includes.
    /// Absence of the top-level file is reported separately from other read
    /// failures.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let mut seen = HashSet::new();
        Self::load_nested(path, &mut seen)
    }

    fn load_nested(path: &Path, seen: &mut HashSet<PathBuf>) -> Result<Self, ManifestError> {
        if !path.is_file() {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        seen.insert(std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()));

        let mut manifest = Self::from_content(path, &content);
        let base = path.parent().unwrap_or(Path::new(""));
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());

        let targets: Vec<String> = manifest
            .requirements
            .iter()
            .filter_map(Requirement::included_file)
            .map(String::from)
            .collect();
        for target in targets {
            let nested = base.join(&target);
            hasher.update(b"\0");
            hasher.update(target.as_bytes());
            hasher.update(b"\0");
            let key = std::fs::canonicalize(&nested).unwrap_or_else(|_| nested.clone());
            if seen.contains(&key) {
                hasher.update(b"cycle");
                continue;
            }
            match Self::load_nested(&nested, seen) {
                Ok(include) => {
                    hasher.update(include.fingerprint.as_bytes());
                    manifest.includes.push(include);
                }
                Err(ManifestError::NotFound(_)) => {
                    tracing::warn!(path = %nested.display(), "Included requirements file not found");
                    hasher.update(b"missing");
                }
                Err(e) => return Err(e),
            }
        }
        manifest.fingerprint = hex::encode(hasher.finalize());
        Ok(manifest)
    }

    /// Parse `content` alone; includes are not followed.
    pub fn from_content(path: &Path, content: &str) -> Self {
        let requirements = content.lines().filter_map(parse_line).collect();
        Self {
            path: path.to_path_buf(),
            requirements,
            includes: Vec::new(),
            fingerprint: fingerprint(content),
        }
    }

    /// SHA-256 hex of the file content, chained with the fingerprints of
    /// every included file.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    /// Package names from this file and every included one, in file order.
    pub fn package_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.requirements.iter().filter_map(Requirement::name).collect();
        for include in &self.includes {
            names.extend(include.package_names());
        }
        names
    }
}

fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_line_packages() {
        assert_eq!(
            parse_line("streamlit>=1.30"),
            Some(Requirement::Package {
                name: "streamlit".to_string(),
                extras: vec![],
                spec: ">=1.30".to_string(),
            })
        );
        assert_eq!(
            parse_line("pandas[excel, performance] ==2.2.1 # pinned"),
            Some(Requirement::Package {
                name: "pandas".to_string(),
                extras: vec!["excel".to_string(), "performance".to_string()],
                spec: "==2.2.1".to_string(),
            })
        );
        assert_eq!(parse_line("openpyxl").and_then(|r| r.name().map(String::from)), Some("openpyxl".to_string()));
    }

    #[test]
    fn test_parse_line_comments_and_directives() {
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("# data cleaning deps"), None);
        assert_eq!(
            parse_line("-r base.txt"),
            Some(Requirement::Directive("-r base.txt".to_string()))
        );
        assert_eq!(
            parse_line("git+https://example.com/pkg.git"),
            Some(Requirement::Directive("git+https://example.com/pkg.git".to_string()))
        );
        assert_eq!(
            parse_line("./vendor/qrtool"),
            Some(Requirement::Directive("./vendor/qrtool".to_string()))
        );
    }

    #[test]
    fn test_load_missing_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let err = DependencyManifest::load(&tmp.path().join("requirements.txt")).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
        assert!(err.to_string().contains("requirements.txt"));
    }

    #[test]
    fn test_load_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("requirements.txt");
        fs::write(&path, "streamlit\npandas\n\n# excel\nopenpyxl>=3.1\n").unwrap();
        let manifest = DependencyManifest::load(&path).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.package_names(), vec!["streamlit", "pandas", "openpyxl"]);
        assert_eq!(manifest.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let p = Path::new("requirements.txt");
        let a = DependencyManifest::from_content(p, "streamlit\n");
        let b = DependencyManifest::from_content(p, "streamlit\n");
        let c = DependencyManifest::from_content(p, "streamlit==1.38\n");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_included_file_targets() {
        let target = |line: &str| parse_line(line).and_then(|r| r.included_file().map(String::from));
        assert_eq!(target("-r base.txt"), Some("base.txt".to_string()));
        assert_eq!(target("-rbase.txt"), Some("base.txt".to_string()));
        assert_eq!(target("--requirement=dev/base.txt"), Some("dev/base.txt".to_string()));
        assert_eq!(target("-c constraints.txt"), Some("constraints.txt".to_string()));
        assert_eq!(target("--index-url https://mirror.example/simple"), None);
        assert_eq!(target("streamlit"), None);
    }

    #[test]
    fn test_fingerprint_follows_includes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("requirements.txt");
        fs::write(&path, "-r base.txt\n-c constraints.txt\n").unwrap();
        fs::write(tmp.path().join("base.txt"), "streamlit\n").unwrap();
        fs::write(tmp.path().join("constraints.txt"), "pandas<3\n").unwrap();

        let before = DependencyManifest::load(&path).unwrap();
        assert_eq!(before.package_names(), vec!["streamlit", "pandas"]);

        fs::write(tmp.path().join("base.txt"), "streamlit\nopenpyxl\n").unwrap();
        let after = DependencyManifest::load(&path).unwrap();

        assert_ne!(before.fingerprint(), after.fingerprint());
        assert_eq!(after.package_names(), vec!["streamlit", "openpyxl", "pandas"]);
    }

    #[test]
    fn test_include_cycle_terminates() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "-r b.txt\nstreamlit\n").unwrap();
        fs::write(tmp.path().join("b.txt"), "-r a.txt\npandas\n").unwrap();

        let manifest = DependencyManifest::load(&tmp.path().join("a.txt")).unwrap();

        assert_eq!(manifest.package_names(), vec!["streamlit", "pandas"]);
    }

    #[test]
    fn test_missing_include_changes_fingerprint_when_it_appears() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("requirements.txt");
        fs::write(&path, "-r base.txt\n").unwrap();
        let without = DependencyManifest::load(&path).unwrap();

        fs::write(tmp.path().join("base.txt"), "streamlit\n").unwrap();
        let with = DependencyManifest::load(&path).unwrap();

        assert_ne!(without.fingerprint(), with.fingerprint());
    }

    #[test]
    fn test_requirement_display() {
        let req = parse_line("pandas[excel, performance]==2.2.1").unwrap();
        assert_eq!(req.to_string(), "pandas[excel,performance]==2.2.1");
        assert_eq!(parse_line("-r base.txt").unwrap().to_string(), "-r base.txt");
    }

    #[test]
    fn test_comment_only_manifest_is_empty() {
        let manifest = DependencyManifest::from_content(Path::new("r.txt"), "# nothing yet\n\n");
        assert!(manifest.is_empty());
    }
}
