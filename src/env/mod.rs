//! Environment handed to detect probes.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Variables carried over from the engine's own environment.
const ALLOWED_VARS: &[&str] = &[
    "CNB_STACK_ID",
    "HOSTNAME",
    "HOME",
    "HTTPS_PROXY",
    "https_proxy",
    "HTTP_PROXY",
    "http_proxy",
    "NO_PROXY",
    "no_proxy",
];

/// Path-list variables; platform values are prepended instead of replacing.
pub const ROOT_VARS: &[&str] = &[
    "PATH",
    "LD_LIBRARY_PATH",
    "LIBRARY_PATH",
    "CPATH",
    "PKG_CONFIG_PATH",
];

#[cfg(windows)]
const PATH_LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_LIST_SEPARATOR: char = ':';

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to read platform env {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Base build environment, filtered down to the allowed variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    vars: BTreeMap<String, String>,
}

impl BuildEnv {
    pub fn from_environ<I, K, V>(environ: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = environ
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| is_allowed(k))
            .collect();
        Self { vars }
    }

    pub fn from_process() -> Self {
        Self::from_environ(std::env::vars())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Base variables, sorted by name.
    pub fn list(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Base variables overlaid with `<platform_dir>/env/<NAME>` files.
    ///
    /// A file overrides its variable, except for path-list variables where the
    /// file contents are prepended. A missing `env` directory is not an error.
    pub fn with_platform(&self, platform_dir: &Path) -> Result<Vec<(String, String)>, EnvError> {
        let mut vars = self.vars.clone();
        let env_dir = platform_dir.join("env");

        let entries = match fs::read_dir(&env_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(self.list()),
            Err(source) => return Err(EnvError::Io { path: env_dir, source }),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| EnvError::Io {
                path: env_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push((name.to_string(), path.clone()));
            }
        }
        files.sort();

        for (name, path) in files {
            let value = fs::read_to_string(&path).map_err(|source| EnvError::Io {
                path: path.clone(),
                source,
            })?;
            let merged = if ROOT_VARS.contains(&name.as_str()) {
                match vars.get(&name) {
                    Some(existing) if !existing.is_empty() => {
                        format!("{value}{PATH_LIST_SEPARATOR}{existing}")
                    }
                    _ => value,
                }
            } else {
                value
            };
            vars.insert(name, merged);
        }

        Ok(vars.into_iter().collect())
    }
}

fn is_allowed(key: &str) -> bool {
    ALLOWED_VARS.contains(&key) || ROOT_VARS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> BuildEnv {
        BuildEnv::from_environ([
            ("HOME", "/home/cnb"),
            ("PATH", "/usr/bin"),
            ("CNB_PLATFORM_API", "0.12"),
            ("SECRET_TOKEN", "shh"),
            ("CNB_STACK_ID", "io.buildpacks.stacks.jammy"),
        ])
    }

    #[test]
    fn test_from_environ_keeps_allowed_vars() {
        let env = sample();
        assert_eq!(env.get("HOME"), Some("/home/cnb"));
        assert_eq!(env.get("PATH"), Some("/usr/bin"));
        assert_eq!(env.get("CNB_STACK_ID"), Some("io.buildpacks.stacks.jammy"));
        assert_eq!(env.get("CNB_PLATFORM_API"), None);
        assert_eq!(env.get("SECRET_TOKEN"), None);
    }

    #[test]
    fn test_list_is_sorted() {
        let names: Vec<String> = sample().list().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["CNB_STACK_ID", "HOME", "PATH"]);
    }

    #[test]
    fn test_with_platform_missing_dir() {
        let temp = TempDir::new().unwrap();
        assert_eq!(sample().with_platform(temp.path()).unwrap(), sample().list());
    }

    #[test]
    fn test_with_platform_overrides_and_prepends() {
        let temp = TempDir::new().unwrap();
        let env_dir = temp.path().join("env");
        fs::create_dir_all(&env_dir).unwrap();
        fs::write(env_dir.join("HOME"), "/platform/home").unwrap();
        fs::write(env_dir.join("PATH"), "/platform/bin").unwrap();
        fs::write(env_dir.join("CPATH"), "/platform/include").unwrap();
        fs::write(env_dir.join("BP_NODE_VERSION"), "20").unwrap();
        fs::create_dir_all(env_dir.join("ignored-dir")).unwrap();

        let vars: BTreeMap<String, String> =
            sample().with_platform(temp.path()).unwrap().into_iter().collect();

        assert_eq!(vars["HOME"], "/platform/home");
        assert_eq!(vars["PATH"], format!("/platform/bin{PATH_LIST_SEPARATOR}/usr/bin"));
        assert_eq!(vars["CPATH"], "/platform/include");
        assert_eq!(vars["BP_NODE_VERSION"], "20");
        assert!(!vars.contains_key("ignored-dir"));
    }

    #[test]
    fn test_with_platform_leaves_base_untouched() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("env")).unwrap();
        fs::write(temp.path().join("env").join("HOME"), "/other").unwrap();

        let env = sample();
        let _ = env.with_platform(temp.path()).unwrap();
        assert_eq!(env.get("HOME"), Some("/home/cnb"));
    }
}
