use serde::Serialize;

use crate::fields::Field;
use crate::resolver::{Resolver, StampEntry};

#[derive(Debug, Serialize)]
pub struct ShowResult {
    pub fields: Vec<StampEntry>,
}

pub fn cmd_show(resolver: &Resolver, fields: &[Field]) -> ShowResult {
    ShowResult {
        fields: resolver.stamp(fields),
    }
}

pub fn format_show_human(result: &ShowResult) -> String {
    let key_width = result
        .fields
        .iter()
        .map(|e| e.key.len())
        .max()
        .unwrap_or(0);

    result
        .fields
        .iter()
        .map(|e| {
            let marker = if e.fallback_used { "  (fallback)" } else { "" };
            format!("{:<key_width$}  {}{}", e.key, e.value, marker)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
