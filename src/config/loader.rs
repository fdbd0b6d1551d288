//! YAML loading with `!join` support and value normalization.
use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::package_path::{self, PackageLocator};
use crate::error::ConfigError;

/// Load `path` and return its normalized top-level mapping.
///
/// An empty document yields an empty mapping; callers decide whether that is
/// acceptable.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if the file does not exist,
/// [`ConfigError::Io`] if it cannot be read, and the errors of
/// [`parse_yaml`] otherwise.
pub fn load_yaml(path: &Path, locator: &dyn PackageLocator) -> Result<Mapping, ConfigError> {
    let source = path.display().to_string();
    if !path.exists() {
        return Err(ConfigError::NotFound(source));
    }
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: source.clone(),
        source: e,
    })?;
    parse_yaml(&text, &source, locator)
}

/// Parse YAML text labelled `source` and return its normalized top-level mapping.
///
/// # Errors
///
/// Returns [`ConfigError::Syntax`] for malformed YAML,
/// [`ConfigError::InvalidJoin`] for a malformed `!join` node, and
/// [`ConfigError::NotAMapping`] if the document is not a mapping.
pub fn parse_yaml(
    text: &str,
    source: &str,
    locator: &dyn PackageLocator,
) -> Result<Mapping, ConfigError> {
    let raw: Value = serde_yaml::from_str(text).map_err(|e| ConfigError::Syntax {
        file: source.to_string(),
        message: e.to_string(),
    })?;
    let joined = expand_tags(raw, source)?;
    match normalize(joined, locator) {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(map) => Ok(map),
        other => Err(ConfigError::NotAMapping {
            file: source.to_string(),
            found: kind_name(&other),
        }),
    }
}

/// Human-readable name of a value's kind.
#[must_use]
pub const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Replace every `!join [..]` node with the concatenation of its elements and
/// strip any other tag.
fn expand_tags(value: Value, source: &str) -> Result<Value, ConfigError> {
    match value {
        Value::Tagged(tagged) => {
            let tagged = *tagged;
            if tagged.tag.to_string().trim_start_matches('!') == "join" {
                join(tagged.value, source).map(Value::String)
            } else {
                expand_tags(tagged.value, source)
            }
        }
        Value::Sequence(items) => items
            .into_iter()
            .map(|v| expand_tags(v, source))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        Value::Mapping(map) => map
            .into_iter()
            .map(|(k, v)| Ok((k, expand_tags(v, source)?)))
            .collect::<Result<Mapping, _>>()
            .map(Value::Mapping),
        scalar => Ok(scalar),
    }
}

fn join(value: Value, source: &str) -> Result<String, ConfigError> {
    let Value::Sequence(parts) = value else {
        return Err(ConfigError::InvalidJoin {
            file: source.to_string(),
            message: format!("expected a sequence, found a {}", kind_name(&value)),
        });
    };
    let mut out = String::new();
    for part in parts {
        match expand_tags(part, source)? {
            Value::String(s) => out.push_str(&s),
            Value::Number(n) => out.push_str(&n.to_string()),
            Value::Bool(b) => out.push_str(if b { "true" } else { "false" }),
            other => {
                return Err(ConfigError::InvalidJoin {
                    file: source.to_string(),
                    message: format!("cannot join a {}", kind_name(&other)),
                });
            }
        }
    }
    Ok(out)
}

/// Recursively normalize a YAML value.
///
/// Sequences lose duplicate elements (first occurrence wins), numbers become
/// floats, strings are run through the package-path resolver (an
/// unresolvable package becomes `null`).
pub fn normalize(value: Value, locator: &dyn PackageLocator) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, normalize(v, locator)))
                .collect(),
        ),
        Value::Sequence(items) => {
            let mut unique: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                let item = normalize(item, locator);
                if !unique.contains(&item) {
                    unique.push(item);
                }
            }
            Value::Sequence(unique)
        }
        Value::String(s) => package_path::resolve(&s, locator).map_or(Value::Null, Value::String),
        Value::Number(n) => match n.as_f64() {
            Some(f) => Value::Number(f.into()),
            None => Value::Number(n),
        },
        Value::Tagged(tagged) => normalize(tagged.value, locator),
        other => other,
    }
}
