// src/config/store.rs
// ConfigStore - merged configuration tree with dot-notation access

use super::defaults::default_tree;
use super::env::collect_overrides;
use super::file::{read_config_dir, read_config_file, render_config, user_config_path};
use crate::error::{Result, ValbotError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "VALBOT_";

/// One configuration layer, merged in the order given to [`ConfigStore::load`]
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// An in-memory mapping (built-in defaults, test fixtures)
    Defaults(Map<String, Value>),
    /// A single YAML or JSON file
    File(PathBuf),
    /// Every YAML/JSON file in a directory, by filename
    Directory(PathBuf),
}

impl ConfigSource {
    /// Classify a path as a file or directory source
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::Directory(path)
        } else {
            Self::File(path)
        }
    }
}

/// Options for [`ConfigStore::resolve`]
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Explicit configuration file or directory
    pub config_path: Option<PathBuf>,
    /// Environment prefix (defaults to `VALBOT_`)
    pub env_prefix: Option<String>,
    /// Also merge ~/.valbot/config.* when present
    pub include_user_config: bool,
}

/// Merged configuration tree. The root is always a mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigStore {
    tree: Value,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Empty store with no layers
    pub fn new() -> Self {
        Self {
            tree: Value::Object(Map::new()),
        }
    }

    /// Store holding only the built-in defaults
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.merge_map(default_tree());
        store
    }

    /// Store wrapping an existing tree; non-mapping values yield an empty store
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => Self { tree: value },
            _ => Self::new(),
        }
    }

    /// Build the effective configuration: defaults, user file, explicit path, environment
    pub fn resolve(options: &ConfigOptions) -> Result<Self> {
        let mut sources = vec![ConfigSource::Defaults(default_tree())];
        if options.include_user_config
            && let Some(path) = user_config_path()
        {
            sources.push(ConfigSource::File(path));
        }
        if let Some(ref path) = options.config_path {
            sources.push(ConfigSource::from_path(path));
        }

        let mut store = Self::new();
        store.load(&sources)?;

        let prefix = options.env_prefix.as_deref().unwrap_or(ENV_PREFIX);
        store.apply_environment_overrides(prefix);
        Ok(store)
    }

    /// Deep-merge each source over the previous ones
    pub fn load(&mut self, sources: &[ConfigSource]) -> Result<()> {
        for source in sources {
            match source {
                ConfigSource::Defaults(map) => {
                    debug!(keys = map.len(), "Merging in-memory configuration");
                    self.merge_map(map.clone());
                }
                ConfigSource::File(path) => {
                    let map = read_config_file(path)?;
                    info!(path = %path.display(), "Loaded configuration file");
                    self.merge_map(map);
                }
                ConfigSource::Directory(dir) => {
                    let files = read_config_dir(dir)?;
                    info!(path = %dir.display(), files = files.len(), "Loaded configuration directory");
                    for (path, map) in files {
                        debug!(path = %path.display(), "Merging configuration file");
                        self.merge_map(map);
                    }
                }
            }
        }
        Ok(())
    }

    /// Deep-merge a mapping over the current tree
    pub fn merge_map(&mut self, map: Map<String, Value>) {
        deep_merge(&mut self.tree, Value::Object(map));
    }

    /// Apply `PREFIX_*` variables from the process environment. Returns how many were applied.
    pub fn apply_environment_overrides(&mut self, prefix: &str) -> usize {
        self.apply_overrides_from(prefix, std::env::vars())
    }

    /// Apply overrides from an explicit list of `(name, value)` pairs
    pub fn apply_overrides_from<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides = collect_overrides(&self.tree, prefix, vars);
        let count = overrides.len();
        for o in overrides {
            // Unresolved keys carry a single segment and land at the root
            set_segments(&mut self.tree, &o.resolution.segments(), o.value);
        }
        if count > 0 {
            info!(prefix = prefix, count = count, "Applied environment overrides");
        }
        count
    }

    /// Value at a dot path, if present
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut node = &self.tree;
        let mut any = false;
        for part in split_path(path) {
            node = node.as_object()?.get(part)?;
            any = true;
        }
        any.then_some(node)
    }

    /// True if the dot path exists (a present `null` counts)
    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Value at a dot path, or `default`; errors only when both are absent
    pub fn get(&self, path: &str, default: Option<Value>) -> Result<Value> {
        match self.lookup(path) {
            Some(value) => Ok(value.clone()),
            None => default.ok_or_else(|| ValbotError::ConfigKey(path.to_string())),
        }
    }

    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        self.lookup(path).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn get_f64(&self, path: &str, default: f64) -> f64 {
        self.lookup(path).and_then(Value::as_f64).unwrap_or(default)
    }

    /// Unsigned integer at a path; integral non-negative floats are accepted
    pub fn get_u64(&self, path: &str, default: u64) -> u64 {
        match self.lookup(path) {
            Some(v) => v
                .as_u64()
                .or_else(|| {
                    v.as_f64()
                        .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                        .map(|f| f as u64)
                })
                .unwrap_or(default),
            None => default,
        }
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.lookup(path).and_then(Value::as_str)
    }

    /// List of strings at a path. A comma-separated string is split.
    pub fn get_string_list(&self, path: &str) -> Option<Vec<String>> {
        match self.lookup(path)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        Value::Null => None,
                        other => Some(other.to_string()),
                    })
                    .collect(),
            ),
            Value::String(s) => Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Set a value at a dot path, creating (or replacing scalars with) intermediate mappings
    pub fn set(&mut self, path: &str, value: Value) -> Result<()> {
        let segments: Vec<String> = split_path(path).map(String::from).collect();
        if segments.is_empty() {
            return Err(ValbotError::ConfigKey(path.to_string()));
        }
        set_segments(&mut self.tree, &segments, value);
        Ok(())
    }

    /// The whole tree
    pub fn as_value(&self) -> &Value {
        &self.tree
    }

    /// Write the tree to a file (YAML for .yaml/.yml, JSON otherwise)
    pub fn save(&self, path: &Path) -> Result<()> {
        let rendered = render_config(path, &self.tree)?;
        std::fs::write(path, rendered)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|p| !p.is_empty())
}

fn set_segments(tree: &mut Value, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut node = tree;
    for part in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        let child = map
            .entry(part.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        node = child;
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.clone(), value);
    }
}

/// Recursively merge `source` into `target`: mappings merge key-by-key,
/// anything else in `source` replaces what `target` held.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value);
                    }
                    _ => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}
