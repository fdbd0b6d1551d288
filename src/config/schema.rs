//! Declarative field schema for task definitions.
//!
//! [`FIELDS`] is the single description of what a task may contain. Default
//! and custom configuration validation, and the backfill of missing or
//! wrongly-typed fields, are all driven from it.
use std::fmt;

use serde_yaml::{Mapping, Value};

use super::loader::kind_name;
use super::merge::DEFAULT_SENTINEL;

/// Shape a field value may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `null`.
    Null,
    /// `true` / `false`.
    Bool,
    /// Any string.
    String,
    /// A sequence whose elements are all strings.
    StringList,
    /// A nested mapping.
    Mapping,
}

impl ValueKind {
    /// Whether `value` has this shape.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Null => value.is_null(),
            Self::Bool => value.is_bool(),
            Self::String => value.is_string(),
            Self::StringList => value
                .as_sequence()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Self::Mapping => value.is_mapping(),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::String => "string",
            Self::StringList => "list of strings",
            Self::Mapping => "mapping",
        })
    }
}

/// Whether a field appears in the default configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be present (possibly via `_defaults`).
    Required,
    /// May be present; backfilled otherwise.
    Optional,
    /// Must not be present.
    Forbidden,
}

/// Schema entry for one task field.
#[derive(Debug)]
pub struct FieldSpec {
    /// Dotted path inside the task mapping, e.g. `args.allowed`.
    pub path: &'static str,
    /// Accepted value shapes.
    pub accepts: &'static [ValueKind],
    /// Presence rule in the default configuration.
    pub default_config: Presence,
    /// Whether a custom configuration may set the field.
    pub custom: bool,
    /// Value used when the field is missing or has the wrong shape.
    pub default: fn() -> Value,
}

impl FieldSpec {
    /// Whether `value` is acceptable for this field.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        self.accepts.iter().any(|kind| kind.matches(value))
    }

    fn expected(&self) -> String {
        self.accepts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

const fn null() -> Value {
    Value::Null
}

const fn empty_string() -> Value {
    Value::String(String::new())
}

const fn empty_list() -> Value {
    Value::Sequence(Vec::new())
}

fn empty_mapping() -> Value {
    Value::Mapping(Mapping::new())
}

const fn no() -> Value {
    Value::Bool(false)
}

/// Every recognised task field, parents before children.
pub static FIELDS: &[FieldSpec] = &[
    FieldSpec {
        path: "description",
        accepts: &[ValueKind::String],
        default_config: Presence::Required,
        custom: false,
        default: empty_string,
    },
    FieldSpec {
        path: "script",
        accepts: &[ValueKind::String, ValueKind::Null],
        default_config: Presence::Required,
        custom: false,
        default: null,
    },
    FieldSpec {
        path: "function",
        accepts: &[ValueKind::String, ValueKind::Null],
        default_config: Presence::Optional,
        custom: false,
        default: null,
    },
    FieldSpec {
        path: "config_file",
        accepts: &[ValueKind::String, ValueKind::Null],
        default_config: Presence::Optional,
        custom: true,
        default: null,
    },
    FieldSpec {
        path: "depends_on",
        accepts: &[ValueKind::StringList],
        default_config: Presence::Optional,
        custom: false,
        default: empty_list,
    },
    FieldSpec {
        path: "supersedes",
        accepts: &[ValueKind::StringList],
        default_config: Presence::Optional,
        custom: false,
        default: empty_list,
    },
    FieldSpec {
        path: "privileged",
        accepts: &[ValueKind::Bool],
        default_config: Presence::Optional,
        custom: false,
        default: no,
    },
    FieldSpec {
        path: "enabled",
        accepts: &[ValueKind::Bool],
        default_config: Presence::Forbidden,
        custom: true,
        default: no,
    },
    FieldSpec {
        path: "args",
        accepts: &[ValueKind::Mapping],
        default_config: Presence::Optional,
        custom: true,
        default: empty_mapping,
    },
    FieldSpec {
        path: "args.allowed",
        accepts: &[ValueKind::StringList, ValueKind::Null],
        default_config: Presence::Optional,
        custom: false,
        default: null,
    },
    FieldSpec {
        path: "args.default",
        accepts: &[ValueKind::StringList],
        default_config: Presence::Optional,
        custom: false,
        default: empty_list,
    },
    FieldSpec {
        path: "args.custom",
        accepts: &[ValueKind::StringList],
        default_config: Presence::Forbidden,
        custom: true,
        default: empty_list,
    },
    FieldSpec {
        path: "args.override_default",
        accepts: &[ValueKind::Bool],
        default_config: Presence::Forbidden,
        custom: true,
        default: no,
    },
];

/// Which configuration layer a task mapping comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// The default configuration.
    Default,
    /// A custom configuration file or inline task spec.
    Custom,
}

impl Layer {
    fn allows(self, spec: &FieldSpec) -> bool {
        match self {
            Self::Default => spec.default_config != Presence::Forbidden,
            Self::Custom => spec.custom,
        }
    }
}

/// Look up the schema entry for a dotted path.
#[must_use]
pub fn field(path: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.path == path)
}

/// Validate a task mapping against the schema.
///
/// Returns one message per problem; an empty list means the task is valid.
/// In the custom layer every field is optional and the `"default"` sentinel
/// is accepted for any allowed field.
#[must_use]
pub fn validate(task: &Mapping, layer: Layer) -> Vec<String> {
    let mut problems = Vec::new();
    check_keys(task, "", layer, &mut problems);
    if layer == Layer::Default {
        for spec in FIELDS
            .iter()
            .filter(|spec| spec.default_config == Presence::Required)
        {
            if get_path(task, spec.path).is_none() {
                problems.push(format!("missing required field '{}'", spec.path));
            }
        }
    }
    problems
}

fn check_keys(map: &Mapping, prefix: &str, layer: Layer, problems: &mut Vec<String>) {
    for (key, value) in map {
        let Some(key) = key.as_str() else {
            problems.push(format!("non-string key of type {}", kind_name(key)));
            continue;
        };
        let path = format!("{prefix}{key}");
        let Some(spec) = field(&path) else {
            problems.push(format!("unknown field '{path}'"));
            continue;
        };
        if !layer.allows(spec) {
            let which = match layer {
                Layer::Default => "default",
                Layer::Custom => "custom",
            };
            problems.push(format!("field '{path}' is not allowed in the {which} config"));
            continue;
        }
        if layer == Layer::Custom && value.as_str() == Some(DEFAULT_SENTINEL) {
            continue;
        }
        if !spec.accepts(value) {
            problems.push(format!(
                "field '{path}' must be a {}, found a {}",
                spec.expected(),
                kind_name(value)
            ));
            continue;
        }
        if let Value::Mapping(inner) = value {
            check_keys(inner, &format!("{path}."), layer, problems);
        }
    }
}

/// Fill every field selected by `select` that is missing, and replace every
/// present one whose shape is wrong, with its schema default.
///
/// Returns the paths of the fields that were replaced.
pub fn backfill(task: &mut Mapping, select: impl Fn(&FieldSpec) -> bool) -> Vec<&'static str> {
    let mut replaced = Vec::new();
    for spec in FIELDS.iter().filter(|spec| select(spec)) {
        match get_path(task, spec.path) {
            Some(value) if spec.accepts(value) => {}
            Some(_) => {
                replaced.push(spec.path);
                set_path(task, spec.path, (spec.default)());
            }
            None => set_path(task, spec.path, (spec.default)()),
        }
    }
    replaced
}

/// Copy of the custom-layer mapping `layer` in which every `"default"`
/// sentinel that `base` has no value for is replaced by the field's schema
/// default.
#[must_use]
pub fn settle_sentinels(layer: &Mapping, base: &Mapping) -> Mapping {
    let mut settled = layer.clone();
    for spec in FIELDS.iter().filter(|spec| spec.custom) {
        if get_path(layer, spec.path).and_then(Value::as_str) == Some(DEFAULT_SENTINEL)
            && get_path(base, spec.path).is_none()
        {
            set_path(&mut settled, spec.path, (spec.default)());
        }
    }
    settled
}

/// Value at a dotted path.
#[must_use]
pub fn get_path<'a>(map: &'a Mapping, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = map.get(parts.next()?)?;
    for part in parts {
        current = current.as_mapping()?.get(part)?;
    }
    Some(current)
}

/// Set the value at a dotted path, creating (or replacing non-mapping)
/// intermediate nodes.
pub fn set_path(map: &mut Mapping, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(Value::String(path.to_string()), value);
        }
        Some((head, rest)) => {
            let key = Value::String(head.to_string());
            if !map.get(&key).is_some_and(Value::is_mapping) {
                map.insert(key.clone(), Value::Mapping(Mapping::new()));
            }
            if let Some(Value::Mapping(inner)) = map.get_mut(&key) {
                set_path(inner, rest, value);
            }
        }
    }
}
