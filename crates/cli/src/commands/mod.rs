//! CLI command implementations and shared argument plumbing.

pub mod check;
pub mod resolve;
pub mod snapshot;

use anyhow::Result;
use serde_yaml::{Mapping, Value};
use strata_config::{mapping_from_cli_args, parse_yaml_literal};

use crate::error::UsageError;

/// Build the raw source-list declaration from positional arguments.
///
/// A single positional that parses as a YAML list of explicitly ordered
/// source specs is the whole declaration, so `name`, `enabled`, and
/// `enable_if` are all reachable from the shell. Otherwise every
/// positional is a payload wrapped with its position as the explicit
/// order, so the shell argument order is the merge order.
pub(crate) fn sources_declaration(raw_sources: &[String]) -> Value {
    if raw_sources.is_empty() {
        return Value::Null;
    }
    if let [only] = raw_sources
        && let Ok(value) = serde_yaml::from_str::<Value>(only)
        && is_spec_list(&value)
    {
        return value;
    }
    Value::Sequence(
        raw_sources
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let mut item = Mapping::new();
                item.insert(Value::from("order"), Value::from(index as i64));
                item.insert(Value::from("source"), source_item(raw));
                Value::Mapping(item)
            })
            .collect(),
    )
}

fn is_spec_list(value: &Value) -> bool {
    let Value::Sequence(items) = value else {
        return false;
    };
    !items.is_empty()
        && items.iter().all(|item| {
            matches!(
                item,
                Value::Mapping(map)
                    if map.contains_key(&Value::from("source"))
                        && map.contains_key(&Value::from("order"))
            )
        })
}

/// Inline mappings and sequences pass through as payloads; anything else
/// is a file path.
fn source_item(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Mapping(_) | Value::Sequence(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

/// Parse `--context` pairs into the activation context, if any were given.
pub(crate) fn context_from_pairs(pairs: &[String]) -> Result<Option<Mapping>> {
    if pairs.is_empty() {
        return Ok(None);
    }
    Ok(Some(mapping_from_pairs(pairs, "--context")?))
}

/// Parse repeated KEY=VALUE flags into a flat mapping. Values go through
/// the YAML literal parser, so `count=3` is a number and `name='"3"'` is
/// how a digit string stays a string.
pub(crate) fn mapping_from_pairs(pairs: &[String], flag: &str) -> Result<Mapping> {
    let mut map = Mapping::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(UsageError(format!("{flag} {pair:?}: expected KEY=VALUE")).into());
        };
        map.insert(Value::String(key.to_string()), parse_yaml_literal(value));
    }
    Ok(map)
}

/// Parse `--set` pairs through the CLI token grammar, so dotted paths and
/// list-update keys build nested structure.
pub(crate) fn override_from_pairs(pairs: &[String]) -> Result<Mapping> {
    let mut tokens = Vec::with_capacity(pairs.len() * 2);
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(UsageError(format!("--set {pair:?}: expected KEY=VALUE")).into());
        };
        tokens.push(format!("--{key}"));
        tokens.push(value.to_string());
    }
    Ok(mapping_from_cli_args(&tokens)?)
}
