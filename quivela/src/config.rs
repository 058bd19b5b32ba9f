#![forbid(unsafe_code)]

//! `quivela.toml`, looked up from the checked file's directory upwards.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use quivela_verify::scheduler::default_workers;
use quivela_verify::{SchedulerConfig, DEFAULT_CACHE_FILE};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "quivela.toml";

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(quivela::config))]
pub struct ConfigError {
    pub message: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where `boogieN.bpl` files are written.
    pub work_dir: PathBuf,
    pub verifier: VerifierSection,
    pub cache: CacheSection,
    pub scheduler: SchedulerSection,
    pub imports: ImportsSection,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierSection {
    pub path: PathBuf,
    pub args: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    pub enabled: bool,
    pub file: PathBuf,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerSection {
    pub workers: usize,
    pub status_interval_ms: u64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ImportsSection {
    pub search_paths: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            verifier: VerifierSection::default(),
            cache: CacheSection::default(),
            scheduler: SchedulerSection::default(),
            imports: ImportsSection::default(),
        }
    }
}

impl Default for VerifierSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("boogie"),
            args: Vec::new(),
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            file: PathBuf::from(DEFAULT_CACHE_FILE),
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            status_interval_ms: 3000,
        }
    }
}

impl SchedulerSection {
    pub fn to_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            workers: self.workers.max(1),
            status_interval: Duration::from_millis(self.status_interval_ms),
        }
    }
}

/// A configuration together with the directory its relative paths hang off.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub path: Option<PathBuf>,
    pub root: PathBuf,
    pub config: Config,
}

impl ResolvedConfig {
    pub fn work_dir(&self) -> PathBuf {
        resolve_path(&self.root, &self.config.work_dir)
    }

    pub fn cache_file(&self) -> PathBuf {
        resolve_path(&self.work_dir(), &self.config.cache.file)
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.config
            .imports
            .search_paths
            .iter()
            .map(|p| resolve_path(&self.root, p))
            .collect()
    }
}

pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };
    loop {
        let candidate = cur.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = cur.parent()?.to_path_buf();
    }
}

/// Without a config file everything is defaulted relative to the current
/// directory.
pub fn load_config(start: &Path) -> Result<ResolvedConfig, ConfigError> {
    let Some(path) = find_config(&absolute(start)) else {
        return Ok(ResolvedConfig {
            path: None,
            root: PathBuf::from("."),
            config: Config::default(),
        });
    };
    let raw = fs::read_to_string(&path).map_err(|e| ConfigError {
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    let config: Config = toml::from_str(&raw).map_err(|e| ConfigError {
        message: format!("failed to parse {}: {e}", path.display()),
    })?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(ResolvedConfig {
        path: Some(path),
        root,
        config,
    })
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

fn resolve_path(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_take_defaults() {
        let config: Config = toml::from_str("[verifier]\nargs = [\"/nologo\"]\n").unwrap();
        assert_eq!(config.verifier.path, PathBuf::from("boogie"));
        assert_eq!(config.verifier.args, ["/nologo"]);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.file, PathBuf::from("quivela.cache.boogie"));
        assert_eq!(config.scheduler.status_interval_ms, 3000);
        assert!(config.scheduler.workers >= 1);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("[verifier]\nbinary = \"z3\"\n").is_err());
    }

    #[test]
    fn config_is_found_above_the_input() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "work_dir = \"out\"\n\n[scheduler]\nworkers = 2\n\n[imports]\nsearch_paths = [\"lib\"]\n",
        )
        .unwrap();
        let nested = dir.path().join("proofs").join("prf");
        fs::create_dir_all(&nested).unwrap();
        let input = nested.join("main.qvl");
        fs::write(&input, "const k;\n").unwrap();

        let resolved = load_config(&input).unwrap();
        assert_eq!(resolved.path, Some(dir.path().join(CONFIG_FILE)));
        assert_eq!(resolved.config.scheduler.to_config().workers, 2);
        assert_eq!(resolved.work_dir(), dir.path().join("out"));
        assert_eq!(
            resolved.cache_file(),
            dir.path().join("out").join("quivela.cache.boogie")
        );
        assert_eq!(resolved.search_paths(), [dir.path().join("lib")]);
    }

    #[test]
    fn malformed_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[cache]\nenabled = \"yes\"\n").unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.message.starts_with("failed to parse "), "{}", err.message);
        assert!(err.message.contains(CONFIG_FILE));
    }
}
