use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::ResolvedConfig;

#[derive(Debug, Serialize)]
pub struct ConfigResult {
    pub path: PathBuf,
    pub exists: bool,
    pub program: String,
    pub repo: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub fields: Vec<String>,
    #[serde(skip)]
    pub toml: String,
}

pub fn cmd_config(path: &Path, config: &ResolvedConfig) -> Result<ConfigResult> {
    Ok(ConfigResult {
        path: path.to_path_buf(),
        exists: path.exists(),
        program: config.program.clone(),
        repo: config.repo.clone(),
        timeout_ms: config.timeout.map(|t| t.as_millis() as u64),
        fields: config.fields.iter().map(|f| f.key.clone()).collect(),
        toml: config.to_toml()?,
    })
}

pub fn format_config_human(result: &ConfigResult) -> String {
    let source = if result.exists {
        format!("# loaded from {}", result.path.display())
    } else {
        format!("# {} not found, showing defaults", result.path.display())
    };
    format!("{}\n{}", source, result.toml.trim_end())
}
