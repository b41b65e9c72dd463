use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fields::{default_fields, merge_fields, Field};
use crate::git::GitCommand;

pub const CONFIG_ENV: &str = "GIT_STAMP_CONFIG";
const DEFAULT_PROGRAM: &str = "git";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Values given on the command line; these win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub program: Option<String>,
    pub repo: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub program: String,
    pub repo: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub fields: Vec<Field>,
}

impl ResolvedConfig {
    pub fn git_command(&self) -> GitCommand {
        let git = GitCommand::new(&self.program).timeout(self.timeout);
        match &self.repo {
            Some(repo) => git.current_dir(repo),
            None => git,
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        let raw = Config {
            git: GitConfig {
                program: Some(self.program.clone()),
                repo: self.repo.clone(),
                timeout_ms: self.timeout.map(|t| t.as_millis() as u64),
            },
            fields: self.fields.clone(),
        };
        toml::to_string_pretty(&raw).context("failed to serialize config")
    }
}

/// Where the config lives: `$GIT_STAMP_CONFIG` if set, otherwise the
/// platform config directory.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let proj = directories::ProjectDirs::from("", "", "git-stamp")
        .context("could not determine config directory")?;
    Ok(proj.config_dir().join("config.toml"))
}

/// Loads the config at `path`. A missing file is only an error when the path
/// was asked for explicitly; otherwise defaults apply.
pub fn load(path: &Path, explicit: bool, overrides: &Overrides) -> Result<ResolvedConfig> {
    let raw = if path.exists() {
        load_config(path)?
    } else if explicit {
        bail!("config not found at {}", path.display());
    } else {
        Config::default()
    };
    resolve_config(raw, overrides)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<Config> {
    toml::from_str(contents).context("failed to parse config TOML")
}

pub fn resolve_config(raw: Config, overrides: &Overrides) -> Result<ResolvedConfig> {
    let program = overrides
        .program
        .clone()
        .or(raw.git.program)
        .unwrap_or_else(|| DEFAULT_PROGRAM.to_string());
    if program.trim().is_empty() {
        bail!("git program must not be empty");
    }

    let repo = match &overrides.repo {
        Some(repo) => Some(repo.clone()),
        None => raw.git.repo.as_deref().map(expand_tilde),
    };

    let timeout = match overrides.timeout_ms.or(raw.git.timeout_ms) {
        Some(0) => bail!("timeout_ms must be greater than 0"),
        Some(ms) => Some(Duration::from_millis(ms)),
        None => None,
    };

    let fields = merge_fields(default_fields(), raw.fields)?;

    Ok(ResolvedConfig {
        program,
        repo,
        timeout,
        fields,
    })
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
