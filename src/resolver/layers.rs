//! Layer merge and field backfill.
use serde_yaml::Value;

use super::TaskSet;
use super::custom::CustomLayers;
use super::defaults::TaskMappings;
use crate::config::schema::{self, get_path, set_path};
use crate::config::{TaskDefinition, overlay_all};
use crate::logging::Log;

/// Merge default < custom file < inline for every default task, honouring
/// `"default"` sentinels. A sentinel for a field the default configuration
/// leaves unset takes the schema default. Order follows the default
/// configuration.
#[must_use]
pub fn merge_layers(defaults: &TaskMappings, custom: &CustomLayers) -> TaskMappings {
    defaults
        .iter()
        .map(|(name, base)| {
            let overlays = [custom.file.get(name), custom.inline.get(name)]
                .into_iter()
                .flatten()
                .map(|layer| schema::settle_sentinels(layer, base))
                .collect::<Vec<_>>();
            let layers = std::iter::once(base).chain(&overlays);
            (name.clone(), overlay_all(layers, true))
        })
        .collect()
}

/// Complete every merged task from the schema and build the typed task set.
///
/// A task no layer enabled or disabled starts as `enable_all`. Fields of the
/// wrong type are reset to their default with a warning.
#[must_use]
pub fn backfill_fields(merged: TaskMappings, enable_all: bool, log: &dyn Log) -> TaskSet {
    merged
        .into_iter()
        .map(|(name, mut task)| {
            if get_path(&task, "enabled").is_none() {
                set_path(&mut task, "enabled", Value::Bool(enable_all));
            }
            for field in schema::backfill(&mut task, |_| true) {
                log.warn(&format!(
                    "Task '{name}': field '{field}' has the wrong type and was reset to its default"
                ));
            }
            let def = TaskDefinition::from_mapping(&name, &task);
            (name, def)
        })
        .collect()
}
