//! Untyped configuration tree with dotted-path lookup.
//!
//! Paths accept two synonymous spellings. `source.password` walks nested
//! mappings, while an alternative written with `:` (`source:password`) is
//! tried both as `source.password` and as the flat key `source_password`.
//! Several alternatives can be given comma-separated; the first one that
//! resolves wins.
//!
//! The tree is also where the environment overlay is applied, once, before
//! the typed [`Config`](super::Config) is deserialized.

use serde_yaml::{Mapping, Value};

use crate::error::{DriftError, Result};

/// Top-level sections of [`Config`](super::Config), matched by the
/// environment overlay even when the file leaves them out.
const SECTIONS: &[&str] = &["source", "target", "compare"];

/// Plain configuration value tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    root: Value,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self {
            root: Value::Mapping(Mapping::new()),
        }
    }
}

impl ConfigTree {
    /// Wrap a value; the root must be a mapping.
    pub fn new(root: Value) -> Result<Self> {
        match root {
            Value::Mapping(_) => Ok(Self { root }),
            Value::Null => Ok(Self::default()),
            other => Err(DriftError::Config(format!(
                "expected a mapping at the configuration root, found {}",
                value_kind(&other)
            ))),
        }
    }

    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::new(serde_yaml::from_str(yaml)?)
    }

    /// Borrow the underlying value.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Consume the tree.
    pub fn into_value(self) -> Value {
        self.root
    }

    /// Look up a path. Null values count as absent.
    pub fn get(&self, path: &str) -> Option<&Value> {
        expand_path(path)
            .iter()
            .find_map(|candidate| self.walk(candidate))
    }

    /// Look up a string value.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// True if any of the given paths resolves.
    pub fn exists(&self, paths: &[&str]) -> bool {
        paths.iter().any(|p| self.get(p).is_some())
    }

    /// Set a value at a `.`-separated path, creating intermediate mappings.
    ///
    /// A non-mapping value sitting on the way is replaced by a mapping.
    pub fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return;
        }
        set_segments(&mut self.root, &segments, value);
    }

    /// Overlay environment variables that start with `prefix`.
    ///
    /// Matching is case-insensitive. The remainder of the variable name is
    /// lower-cased and split on `:`/`.` when present; otherwise on `_`, with
    /// segments re-joined greedily so that existing keys such as `ssl_mode`
    /// are hit. The `source`, `target` and `compare` sections are recognized
    /// even when absent from the tree. Values replacing an existing string stay strings; anything
    /// else is parsed as a YAML scalar. Returns the number of values set.
    pub fn apply_env<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return 0;
        }

        let mut applied = 0;
        for (key, raw) in vars {
            let key = key.to_lowercase();
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            let segments = self.env_segments(rest);
            if segments.is_empty() {
                continue;
            }
            let path = segments.join(".");
            let value = match self.walk(&path) {
                Some(Value::String(_)) => Value::String(raw),
                _ => parse_scalar(raw),
            };
            tracing::debug!("Environment overrides config path {}", path);
            let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
            set_segments(&mut self.root, &refs, value);
            applied += 1;
        }
        applied
    }

    fn walk(&self, dotted: &str) -> Option<&Value> {
        let mut node = &self.root;
        for attr in dotted.split('.') {
            node = node.as_mapping()?.get(attr)?;
        }
        (!node.is_null()).then_some(node)
    }

    fn env_segments(&self, rest: &str) -> Vec<String> {
        if rest.contains(':') || rest.contains('.') {
            return rest
                .split([':', '.'])
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        let parts: Vec<&str> = rest.split('_').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::new();
        let mut node = Some(&self.root);
        let mut i = 0;
        while i < parts.len() {
            let map = node.and_then(Value::as_mapping);
            let matched = map
                .and_then(|m| {
                    (i + 1..=parts.len())
                        .rev()
                        .find(|&j| m.contains_key(parts[i..j].join("_").as_str()))
                })
                .or_else(|| match i {
                    // sections left out of the file still take the override
                    0 => (1..=parts.len())
                        .rev()
                        .find(|&j| SECTIONS.contains(&parts[..j].join("_").as_str())),
                    _ => None,
                });
            match matched {
                Some(j) => {
                    let key = parts[i..j].join("_");
                    node = map.and_then(|m| m.get(key.as_str()));
                    segments.push(key);
                    i = j;
                }
                None => {
                    segments.push(parts[i..].join("_"));
                    break;
                }
            }
        }
        segments
    }
}

/// Expand a path expression into the concrete `.`-joined candidates to try.
///
/// `"a:b, c.d"` becomes `["a.b", "a_b", "c.d"]`.
pub fn expand_path(path: &str) -> Vec<String> {
    let compact: String = path.chars().filter(|c| !c.is_whitespace()).collect();
    let mut paths = Vec::new();
    for p in compact.split(',').filter(|p| !p.is_empty()) {
        if p.contains(':') {
            paths.push(p.replace(':', "."));
            paths.push(p.replace(':', "_"));
        } else {
            paths.push(p.to_string());
        }
    }
    paths
}

fn set_segments(node: &mut Value, segments: &[&str], value: Value) {
    if !node.is_mapping() {
        *node = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(map) = node else {
        return;
    };
    let key = Value::String(segments[0].to_string());
    if segments.len() == 1 {
        map.insert(key, value);
        return;
    }
    let child = map
        .entry(key)
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    set_segments(child, &segments[1..], value);
}

fn parse_scalar(raw: String) -> Value {
    match serde_yaml::from_str::<Value>(&raw) {
        Ok(v @ (Value::Bool(_) | Value::Number(_))) => v,
        _ => Value::String(raw),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
