use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One metadata query: the key it is published under, the arguments passed
/// to the version-control tool, and the placeholder used when it fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub args: Vec<String>,
    pub fallback: String,
}

struct BuiltinField {
    key: &'static str,
    alias: &'static str,
    args: &'static [&'static str],
    fallback: &'static str,
}

const BUILTIN_FIELDS: &[BuiltinField] = &[
    BuiltinField {
        key: "VERSION_NAME",
        alias: "version",
        args: &["describe", "--always", "--tags", "--dirty"],
        fallback: "No version info",
    },
    BuiltinField {
        key: "GIT_HASH",
        alias: "hash",
        args: &["show", "--no-patch", "--pretty=format:%H"],
        fallback: "No git hash info",
    },
    BuiltinField {
        key: "GIT_DATE",
        alias: "date",
        args: &["show", "--no-patch", "--pretty=format:%ai"],
        fallback: "No git date info",
    },
];

pub fn default_fields() -> Vec<Field> {
    BUILTIN_FIELDS
        .iter()
        .map(|b| Field {
            key: b.key.to_string(),
            args: b.args.iter().map(|a| a.to_string()).collect(),
            fallback: b.fallback.to_string(),
        })
        .collect()
}

/// Layers configured fields over the built-in table. A configured key that
/// matches an existing one replaces it in place; new keys are appended.
pub fn merge_fields(base: Vec<Field>, extra: Vec<Field>) -> Result<Vec<Field>> {
    let mut seen = HashSet::new();
    for field in &extra {
        validate_field(field)?;
        if !seen.insert(field.key.as_str()) {
            bail!("duplicate field key: {}", field.key);
        }
    }

    let mut merged = base;
    for field in extra {
        match merged.iter_mut().find(|f| f.key == field.key) {
            Some(existing) => *existing = field,
            None => merged.push(field),
        }
    }
    Ok(merged)
}

fn validate_field(field: &Field) -> Result<()> {
    if !is_valid_key(&field.key) {
        bail!(
            "invalid field key {:?}: use upper-case letters, digits and underscores, not starting with a digit",
            field.key
        );
    }
    if field.args.is_empty() {
        bail!("field {} has no args", field.key);
    }
    Ok(())
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Finds a field by its exact key, then by the short alias of a built-in
/// field, then by key ignoring case. A configured key that happens to equal
/// an alias (`VERSION`) still resolves to itself.
pub fn lookup<'a>(fields: &'a [Field], name: &str) -> Option<&'a Field> {
    if let Some(field) = fields.iter().find(|f| f.key == name) {
        return Some(field);
    }
    if let Some(builtin) = BUILTIN_FIELDS
        .iter()
        .find(|b| b.alias.eq_ignore_ascii_case(name))
    {
        if let Some(field) = fields.iter().find(|f| f.key == builtin.key) {
            return Some(field);
        }
    }
    fields.iter().find(|f| f.key.eq_ignore_ascii_case(name))
}
