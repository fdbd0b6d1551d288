//! Deep overlay of YAML mappings.
use serde_yaml::{Mapping, Value};

/// Value that, in an overlay, keeps whatever the base already has.
pub const DEFAULT_SENTINEL: &str = "default";

/// Overlay `top` onto `base` and return the result.
///
/// For every key of `top`: when `allow_default` is set and the value is the
/// `"default"` sentinel while `base` already has the key, the base value is
/// kept; when both sides are mappings they are merged recursively; otherwise
/// the value from `top` replaces the base value. Key order follows `base`,
/// with keys new to `base` appended in `top` order.
#[must_use]
pub fn overlay(base: &Mapping, top: &Mapping, allow_default: bool) -> Mapping {
    let mut merged = base.clone();
    for (key, value) in top {
        if allow_default && value.as_str() == Some(DEFAULT_SENTINEL) && merged.contains_key(key) {
            continue;
        }
        if let (Some(Value::Mapping(inner)), Value::Mapping(over)) = (merged.get_mut(key), value) {
            *inner = overlay(inner, over, allow_default);
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Fold [`overlay`] over `layers`, lowest precedence first.
#[must_use]
pub fn overlay_all<'a>(
    layers: impl IntoIterator<Item = &'a Mapping>,
    allow_default: bool,
) -> Mapping {
    layers
        .into_iter()
        .fold(Mapping::new(), |acc, layer| overlay(&acc, layer, allow_default))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Mapping {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn nested_mappings_merge() {
        let base = yaml("args:\n  allowed: [a]\n  default: [x]\nprivileged: false\n");
        let top = yaml("args:\n  default: [y]\nprivileged: true\n");
        let merged = overlay(&base, &top, false);
        assert_eq!(merged, yaml("args:\n  allowed: [a]\n  default: [y]\nprivileged: true\n"));
    }

    #[test]
    fn sentinel_keeps_base_value() {
        let base = yaml("config_file: base.yaml\n");
        let top = yaml("config_file: default\n");
        assert_eq!(overlay(&base, &top, true), base);
    }

    #[test]
    fn sentinel_is_literal_without_allow_default() {
        let base = yaml("config_file: base.yaml\n");
        let top = yaml("config_file: default\n");
        assert_eq!(overlay(&base, &top, false), top);
    }

    #[test]
    fn sentinel_for_missing_key_is_inserted() {
        let merged = overlay(&Mapping::new(), &yaml("args: default\n"), true);
        assert_eq!(merged, yaml("args: default\n"));
    }

    #[test]
    fn scalar_replaces_mapping() {
        let base = yaml("args:\n  default: [x]\n");
        let top = yaml("args: [z]\n");
        assert_eq!(overlay(&base, &top, true), top);
    }

    #[test]
    fn overlay_is_deterministic_and_idempotent() {
        let base = yaml("a: 1\nb:\n  c: [1, 2]\n  d: x\n");
        let top = yaml("b:\n  d: default\n  e: true\nf: g\n");
        let once = overlay(&base, &top, true);
        let again = overlay(&base, &top, true);
        assert_eq!(once, again);
        assert_eq!(overlay(&once, &top, true), once);
    }

    #[test]
    fn overlay_all_applies_layers_in_order() {
        let layers = [yaml("a: 1\nb: 1\n"), yaml("b: 2\nc: 2\n"), yaml("c: 3\n")];
        assert_eq!(overlay_all(&layers, false), yaml("a: 1\nb: 2\nc: 3\n"));
    }
}
