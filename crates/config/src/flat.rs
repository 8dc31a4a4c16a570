//! Flat dotted-key maps and CLI-style token lists.
//!
//! Responsibilities:
//! - Expand flat maps (`a.b.c: 1`) into nested mappings through the merge
//!   engine, so path segments follow the same grammar as merge keys.
//! - Tokenize CLI-style argument lists (`--a.b value`, `--flag`) into flat
//!   maps with YAML-typed values.
//! - Flatten nested mappings back into dotted keys for display.
//!
//! Invariants:
//! - Path segments are never interpreted here; a segment like `+0` only
//!   acquires list-update meaning when the merge engine meets a sequence.
//! - Repeated keys resolve last-wins before expansion.

use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};
use crate::merge;
use crate::value::{key_display, parse_yaml_literal};

/// Expand a flat map with dotted keys into a nested mapping.
///
/// Each entry becomes a single-path fragment and the fragments are merged
/// in map order, so later entries can address into containers created by
/// earlier ones.
pub fn nested_from_flat(flat: Mapping) -> Result<Mapping> {
    let mut nested = Mapping::new();
    for (key, value) in flat {
        let fragment = expand_entry(key, value);
        merge::merge_mappings(&mut nested, fragment)?;
    }
    Ok(nested)
}

fn expand_entry(key: Value, value: Value) -> Mapping {
    let mut entry = Mapping::new();
    let path = match key {
        Value::String(s) if s.contains('.') => s,
        other => {
            entry.insert(other, value);
            return entry;
        }
    };
    let mut segments: Vec<String> = path.split('.').map(str::to_string).collect();
    let head = segments.remove(0);
    let mut nested = value;
    for segment in segments.into_iter().rev() {
        let mut wrapper = Mapping::new();
        wrapper.insert(Value::String(segment), nested);
        nested = Value::Mapping(wrapper);
    }
    entry.insert(Value::String(head), nested);
    entry
}

/// Flatten a nested mapping into dotted keys, with sequence positions as
/// numeric segments. Empty containers contribute no entries.
pub fn flat_from_nested(mapping: &Mapping) -> Mapping {
    let mut flat = Mapping::new();
    for (key, value) in mapping {
        flatten_value(&key_display(key), value, &mut flat);
    }
    flat
}

fn flatten_value(path: &str, value: &Value, flat: &mut Mapping) {
    match value {
        Value::Mapping(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_value(&format!("{path}.{}", key_display(key)), child, flat);
            }
        }
        Value::Sequence(seq) if !seq.is_empty() => {
            for (index, child) in seq.iter().enumerate() {
                flatten_value(&format!("{path}.{index}"), child, flat);
            }
        }
        Value::Mapping(_) | Value::Sequence(_) => {}
        leaf => {
            flat.insert(Value::String(path.to_string()), leaf.clone());
        }
    }
}

/// Build a nested mapping from CLI-style tokens.
///
/// A `--key` token followed by a non-key token takes that token as its
/// value, parsed as a YAML literal. A `--key` token followed by another
/// key (or nothing) is a boolean flag. Repeated keys resolve last-wins.
pub fn mapping_from_cli_args(args: &[String]) -> Result<Mapping> {
    let mut flat = Mapping::new();
    let mut index = 0;
    while index < args.len() {
        let token = &args[index];
        let Some(key) = option_key(token) else {
            return Err(ConfigError::InvalidSource(format!(
                "unexpected CLI token {token:?} (expected --key)"
            )));
        };
        match args.get(index + 1) {
            Some(next) if option_key(next).is_none() => {
                flat.insert(Value::String(key.to_string()), parse_yaml_literal(next));
                index += 2;
            }
            _ => {
                flat.insert(Value::String(key.to_string()), Value::Bool(true));
                index += 1;
            }
        }
    }
    nested_from_flat(flat)
}

/// Return the key part of a `--key` token, or None for anything else.
///
/// Keys start with a letter or underscore and may contain alphanumerics,
/// `_`, `.`, and the list-update characters `+`, `:`, `[`, `]`.
fn option_key(token: &str) -> Option<&str> {
    let key = token.strip_prefix("--")?;
    let mut chars = key.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() && first != '_' {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | ':' | '[' | ']')) {
        Some(key)
    } else {
        None
    }
}
