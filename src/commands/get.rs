use anyhow::{bail, Result};

use crate::fields::{lookup, Field};
use crate::resolver::{Resolver, StampEntry};

pub fn cmd_get(resolver: &Resolver, fields: &[Field], name: &str) -> Result<StampEntry> {
    let Some(field) = lookup(fields, name) else {
        let known: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
        bail!(
            "unknown field: {}\n  hint: known fields are {}",
            name,
            known.join(", ")
        );
    };
    Ok(resolver.resolve_field(field))
}

pub fn format_get_human(entry: &StampEntry) -> String {
    entry.value.clone()
}
