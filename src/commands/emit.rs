use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::fields::Field;
use crate::resolver::{Resolver, StampEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmitFormat {
    /// KEY=value lines
    Env,
    /// cargo:rustc-env directives for a build script
    Cargo,
    /// A Rust source file of string constants
    Rust,
}

#[derive(Debug, Serialize)]
pub struct EmitResult {
    pub format: EmitFormat,
    pub output: Option<PathBuf>,
    pub fields: Vec<StampEntry>,
    pub content: String,
}

pub fn cmd_emit(
    resolver: &Resolver,
    fields: &[Field],
    format: EmitFormat,
    output: Option<&Path>,
) -> Result<EmitResult> {
    let entries = resolver.stamp(fields);
    let content = render(format, &entries, resolver.git().repo());

    if let Some(path) = output {
        write_atomic(path, &content)?;
    }

    Ok(EmitResult {
        format,
        output: output.map(Path::to_path_buf),
        fields: entries,
        content,
    })
}

pub fn render(format: EmitFormat, entries: &[StampEntry], repo: Option<&Path>) -> String {
    match format {
        EmitFormat::Env => render_env(entries),
        EmitFormat::Cargo => render_cargo(entries, repo),
        EmitFormat::Rust => render_rust(entries),
    }
}

fn render_env(entries: &[StampEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}={}\n", e.key, single_line(&e.value)))
        .collect()
}

fn render_cargo(entries: &[StampEntry], repo: Option<&Path>) -> String {
    let mut out = String::new();
    if let Some(repo) = repo {
        for file in ["HEAD", "index"] {
            let watched = repo.join(".git").join(file);
            out.push_str(&format!("cargo:rerun-if-changed={}\n", watched.display()));
        }
    }
    for e in entries {
        out.push_str(&format!(
            "cargo:rustc-env={}={}\n",
            e.key,
            single_line(&e.value)
        ));
    }
    out
}

/// Line-oriented formats end a value at the newline.
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn render_rust(entries: &[StampEntry]) -> String {
    let mut out = String::from("// @generated by git-stamp. Do not edit.\n\n");
    for e in entries {
        out.push_str(&format!("pub const {}: &str = {:?};\n", e.key, e.value));
    }
    out
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }

    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);

    std::fs::write(&tmp_path, content)
        .with_context(|| format!("failed to write temp output to {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename output to {}", path.display()))?;
    Ok(())
}

pub fn format_emit_human(result: &EmitResult) -> String {
    match &result.output {
        Some(_) => String::new(),
        None => result.content.trim_end().to_string(),
    }
}
