//! Recursive merge engine with list-update keys.
//!
//! Responsibilities:
//! - Merge one mapping into another, recursing wherever both sides hold a
//!   container at the same slot.
//! - Interpret list-update keys (`N`, `+`, `+N`, `+N:M`) when the target
//!   slot is a sequence.
//!
//! Does NOT handle:
//! - Flat dotted-key expansion (see flat.rs, which feeds this engine).
//! - Sources, layers, or caching (see source.rs and backend.rs).
//!
//! Invariants:
//! - Non-mapping update values overwrite their slot unconditionally.
//! - Update keys apply in the order they appear in the update mapping, and
//!   a nested merge completes before the next sibling key is processed.
//! - Errors carry the dotted key path from the merge root.

use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};
use crate::value::{key_display, path_push};

/// A parsed list-update key.
///
/// On a sequence slot, update keys select an existing element or a
/// structural edit:
///
/// ```text
/// key   := index | "+" | "+" index | "+" slice
/// slice := index? ":" index?
/// ```
///
/// `Index` addresses an existing element and is strict: out of range is an
/// error. `Append` places the update value after the last element.
/// `InsertAt` inserts at the given position, clamped to the length.
/// `ReplaceSlice` replaces the clamped `[start, end)` range wholesale; an
/// inverted range degenerates to an insertion at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKey {
    Index(usize),
    Append,
    InsertAt(usize),
    ReplaceSlice(Option<usize>, Option<usize>),
}

impl ListKey {
    fn parse(key: &Value, path: &str) -> Result<Self> {
        match key {
            Value::Number(n) => n
                .as_u64()
                .map(|i| ListKey::Index(i as usize))
                .ok_or_else(|| invalid_key(key, path)),
            Value::String(s) => Self::parse_str(s).ok_or_else(|| invalid_key(key, path)),
            _ => Err(invalid_key(key, path)),
        }
    }

    fn parse_str(s: &str) -> Option<Self> {
        let Some(body) = s.strip_prefix('+') else {
            return s.parse::<usize>().ok().map(ListKey::Index);
        };
        if body.is_empty() {
            return Some(ListKey::Append);
        }
        match body.split_once(':') {
            None => body.parse::<usize>().ok().map(ListKey::InsertAt),
            Some((start, end)) => {
                if end.contains(':') {
                    return None;
                }
                let start = parse_bound(start)?;
                let end = parse_bound(end)?;
                Some(ListKey::ReplaceSlice(start, end))
            }
        }
    }
}

fn parse_bound(s: &str) -> Option<Option<usize>> {
    if s.is_empty() {
        return Some(None);
    }
    s.parse::<usize>().ok().map(Some)
}

fn invalid_key(key: &Value, path: &str) -> ConfigError {
    ConfigError::InvalidMergeKey {
        key: key_display(key),
        path: path.to_string(),
    }
}

/// Merge `update` into `base`, consuming the update.
///
/// A non-mapping update replaces `base` wholesale. A mapping update merges
/// into a mapping or sequence base and replaces anything else.
pub fn merge_into(base: &mut Value, update: Value) -> Result<()> {
    match update {
        Value::Mapping(update) => merge_value_at(base, update, ""),
        other => {
            *base = other;
            Ok(())
        }
    }
}

/// Merge `update` into `base` key by key, recursing into shared containers.
pub fn merge_mappings(base: &mut Mapping, update: Mapping) -> Result<()> {
    merge_mapping_at(base, update, "")
}

fn merge_value_at(slot: &mut Value, update: Mapping, path: &str) -> Result<()> {
    match slot {
        Value::Mapping(map) => merge_mapping_at(map, update, path),
        Value::Sequence(seq) => merge_sequence_at(seq, update, path),
        other => {
            *other = Value::Mapping(update);
            Ok(())
        }
    }
}

fn merge_mapping_at(base: &mut Mapping, update: Mapping, path: &str) -> Result<()> {
    for (key, value) in update {
        match value {
            Value::Mapping(child) => {
                let child_path = path_push(path, &key);
                match base.get_mut(&key) {
                    Some(slot) => merge_value_at(slot, child, &child_path)?,
                    None => {
                        base.insert(key, Value::Mapping(child));
                    }
                }
            }
            other => {
                base.insert(key, other);
            }
        }
    }
    Ok(())
}

fn merge_sequence_at(seq: &mut Vec<Value>, update: Mapping, path: &str) -> Result<()> {
    for (key, value) in update {
        let child_path = path_push(path, &key);
        match ListKey::parse(&key, &child_path)? {
            ListKey::Index(index) => {
                let len = seq.len();
                let slot = seq.get_mut(index).ok_or_else(|| ConfigError::IndexOutOfRange {
                    index,
                    len,
                    path: child_path.clone(),
                })?;
                match value {
                    Value::Mapping(child) => merge_value_at(slot, child, &child_path)?,
                    other => *slot = other,
                }
            }
            ListKey::Append => {
                let mut items = update_items(value);
                seq.append(&mut items);
            }
            ListKey::InsertAt(index) => {
                let at = index.min(seq.len());
                seq.splice(at..at, update_items(value));
            }
            ListKey::ReplaceSlice(start, end) => {
                let len = seq.len();
                let start = start.unwrap_or(0).min(len);
                let end = end.unwrap_or(len).min(len).max(start);
                seq.splice(start..end, update_items(value));
            }
        }
    }
    Ok(())
}

/// Values placed by `+` keys: a sequence contributes its elements, anything
/// else contributes itself as a single element.
fn update_items(value: Value) -> Vec<Value> {
    match value {
        Value::Sequence(items) => items,
        other => vec![other],
    }
}
