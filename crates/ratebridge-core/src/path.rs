//! Path accessor for nested JSON records
//!
//! Paths use dot notation (`policy.insured.name`) or a JSONPath-like form
//! (`$.drivers[0].age`). A leading `$.` or `$` is stripped and `name[idx]`
//! is read as `name.idx`. Reads never fail; writes create intermediate
//! objects as needed.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use serde_json::{Map, Value};

/// Split a path into its segments
pub fn segments(path: &str) -> Vec<String> {
    let trimmed = path.trim();
    let trimmed = trimmed
        .strip_prefix("$.")
        .or_else(|| trimmed.strip_prefix('$'))
        .unwrap_or(trimmed);

    let mut normalized = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        match ch {
            '[' => normalized.push('.'),
            ']' => {}
            _ => normalized.push(ch),
        }
    }

    normalized
        .split('.')
        .map(|s| s.trim_matches(|c| c == '\'' || c == '"'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the value at `path`, or `None` when any segment is missing
pub fn get<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in segments(path) {
        current = match current {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Read the value at `path`, treating JSON `null` as missing
pub fn get_present<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    get(data, path).filter(|v| !v.is_null())
}

/// Write `value` at `path`, creating intermediate objects
///
/// An empty path replaces the whole document.
pub fn set(data: &mut Value, path: &str, value: Value) {
    let parts = segments(path);
    let Some((last, parents)) = parts.split_last() else {
        *data = value;
        return;
    };

    let mut current = data;
    for part in parents {
        current = child_mut(current, part);
    }
    assign(current, last, value);
}

/// Remove the value at `path`, returning it when present
pub fn remove(data: &mut Value, path: &str) -> Option<Value> {
    let parts = segments(path);
    let (last, parents) = parts.split_last()?;

    let mut current = data;
    for part in parents {
        current = match current {
            Value::Object(map) => map.get_mut(part)?,
            Value::Array(items) => items.get_mut(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    match current {
        Value::Object(map) => map.remove(last),
        Value::Array(items) => {
            let index = last.parse::<usize>().ok()?;
            if index < items.len() {
                Some(items.remove(index))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Flatten every scalar leaf into `prefix_key` style names
///
/// Nested keys are joined with `_`; array elements use their index.
pub fn flatten_scalars(data: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(data, None, &mut out);
    out
}

fn flatten_into(value: &Value, prefix: Option<&str>, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let name = join_key(prefix, key);
                flatten_into(child, Some(&name), out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let name = join_key(prefix, &index.to_string());
                flatten_into(child, Some(&name), out);
            }
        }
        scalar => {
            if let Some(name) = prefix {
                out.push((name.to_string(), scalar.clone()));
            }
        }
    }
}

fn join_key(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(p) => format!("{}_{}", p, key),
        None => key.to_string(),
    }
}

fn child_mut<'a>(current: &'a mut Value, part: &str) -> &'a mut Value {
    let index = match current {
        Value::Array(_) => part.parse::<usize>().ok(),
        _ => None,
    };

    let slot = match (current, index) {
        (Value::Array(items), Some(index)) => {
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        (current, _) => {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            match current {
                Value::Object(map) => map
                    .entry(part.to_string())
                    .or_insert_with(|| Value::Object(Map::new())),
                other => other,
            }
        }
    };

    if !slot.is_object() && !slot.is_array() {
        *slot = Value::Object(Map::new());
    }
    slot
}

fn assign(current: &mut Value, key: &str, value: Value) {
    if let Value::Array(items) = current {
        if let Ok(index) = key.parse::<usize>() {
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            items[index] = value;
            return;
        }
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(key.to_string(), value);
    }
}

/// Deep-merge `patch` into `target`
///
/// Objects merge key by key; any other value in `patch` overwrites.
pub fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                let nested = value.is_object() && existing.get(&key).is_some_and(Value::is_object);
                if !nested {
                    existing.insert(key, value);
                } else if let Some(slot) = existing.get_mut(&key) {
                    merge(slot, value);
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
