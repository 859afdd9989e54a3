// src/config/env.rs
// Environment variable overrides - maps PREFIX_SECTION_KEY onto dot paths

use serde_json::Value;
use tracing::{debug, warn};

/// How an environment variable name was mapped onto the configuration tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResolution {
    /// Every segment matched an existing key
    Existing(Vec<String>),
    /// A leading part matched existing keys; the rest was split one underscore per level
    Extended(Vec<String>),
    /// Nothing matched; the whole remainder becomes a single top-level key
    Unresolved(String),
}

impl KeyResolution {
    /// Path segments to write the override at
    pub fn segments(&self) -> Vec<String> {
        match self {
            Self::Existing(path) | Self::Extended(path) => path.clone(),
            Self::Unresolved(key) => vec![key.clone()],
        }
    }

    /// Dot-joined path, for logging
    pub fn dotted(&self) -> String {
        self.segments().join(".")
    }
}

/// A single override collected from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct EnvOverride {
    pub var: String,
    pub resolution: KeyResolution,
    pub value: Value,
}

/// Map the lower-cased remainder of a variable name onto the tree.
///
/// At each level the longest run of underscore-joined segments naming an
/// existing key wins, so `agents_test_validation_enabled` lands on
/// `agents.test_validation.enabled` rather than `agents.test.validation.enabled`.
pub fn resolve_key_path(tree: &Value, remainder: &str) -> KeyResolution {
    let segments: Vec<&str> = remainder.split('_').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return KeyResolution::Unresolved(remainder.to_string());
    }

    let mut path: Vec<String> = Vec::new();
    let mut node = tree;
    let mut i = 0;

    while i < segments.len() {
        let Value::Object(map) = node else {
            break;
        };
        let matched = (i + 1..=segments.len()).rev().find_map(|j| {
            let key = segments[i..j].join("_");
            map.get(&key).map(|child| (j, key, child))
        });
        match matched {
            Some((next, key, child)) => {
                path.push(key);
                node = child;
                i = next;
            }
            None => break,
        }
    }

    if path.is_empty() {
        return KeyResolution::Unresolved(segments.join("_"));
    }
    if i == segments.len() {
        return KeyResolution::Existing(path);
    }
    path.extend(segments[i..].iter().map(|s| s.to_string()));
    KeyResolution::Extended(path)
}

/// Coerce a raw environment string into a typed configuration value
pub fn coerce_value(raw: &str) -> Value {
    let trimmed = raw.trim();

    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = trimmed.parse::<f64>()
        && f.is_finite()
    {
        return Value::from(f);
    }
    let looks_structured = (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.starts_with('{') && trimmed.ends_with('}'));
    if looks_structured && let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return value;
    }

    Value::String(raw.to_string())
}

/// Strip `prefix` from `name`, ignoring ASCII case
fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        name.get(prefix.len()..)
    } else {
        None
    }
}

/// Collect overrides for every variable starting with `prefix`.
///
/// All paths are resolved against `tree` as it stood before any override is
/// applied, and variables are processed in name order so the outcome does not
/// depend on the process environment's iteration order.
pub fn collect_overrides<I>(tree: &Value, prefix: &str, vars: I) -> Vec<EnvOverride>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut matching: Vec<(String, String)> = vars
        .into_iter()
        .filter(|(name, _)| {
            strip_prefix_ignore_case(name, prefix).is_some_and(|rest| !rest.is_empty())
        })
        .collect();
    matching.sort_by(|a, b| a.0.cmp(&b.0));

    matching
        .into_iter()
        .filter_map(|(var, raw)| {
            let remainder = strip_prefix_ignore_case(&var, prefix)?.to_lowercase();
            let resolution = resolve_key_path(tree, &remainder);
            let value = coerce_value(&raw);

            match &resolution {
                KeyResolution::Unresolved(key) => {
                    warn!(var = %var, key = %key, "Unresolved environment override, stored as flat key");
                }
                KeyResolution::Extended(path) => {
                    debug!(var = %var, path = %path.join("."), "Environment override extends the tree");
                }
                KeyResolution::Existing(path) => {
                    debug!(var = %var, path = %path.join("."), "Environment override");
                }
            }

            Some(EnvOverride {
                var,
                resolution,
                value,
            })
        })
        .collect()
}
