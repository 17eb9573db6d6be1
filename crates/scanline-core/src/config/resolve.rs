//! Deep-merge resolution of configuration trees.

use serde_json::Value;

use crate::error::ConfigError;

use super::Config;

/// Resolve a configuration from `base` and a sequence of override trees.
///
/// Overrides are applied left to right with [`merge`], so the rightmost value
/// for a leaf wins. The merged tree is then deserialized and normalized.
pub fn resolve<'a, I>(base: &Config, overrides: I) -> Result<Config, ConfigError>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut tree = base.to_value()?;
    for overlay in overrides {
        merge(&mut tree, overlay);
    }

    clamp_workers(&mut tree);
    let mut config: Config =
        serde_json::from_value(tree).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    config.normalize();
    Ok(config)
}

/// Force any numeric `numOfWorkers` in a merged tree to 0.
///
/// Runs before the tree is typed, so counts a `u32` cannot hold (negative,
/// fractional, oversized) are clamped rather than rejected.
pub fn clamp_workers(tree: &mut Value) {
    if let Some(workers) = tree.get_mut("numOfWorkers") {
        if workers.is_number() && workers.as_u64() != Some(0) {
            tracing::debug!(
                "numOfWorkers={} requested, worker execution is disabled; forcing 0",
                workers
            );
            *workers = Value::from(0);
        }
    }
}

/// Deep-merge `overlay` into `target`.
///
/// Objects merge key by key and recursively; arrays and scalars replace the
/// existing value. `null` in the overlay means "not supplied" and leaves the
/// target untouched. A non-object overlay at the root is ignored.
pub fn merge(target: &mut Value, overlay: &Value) {
    let Some(source) = overlay.as_object() else {
        if !overlay.is_null() {
            tracing::warn!("Ignoring non-object configuration override: {}", overlay);
        }
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    let Some(dest) = target.as_object_mut() else {
        return;
    };

    for (key, value) in source {
        if value.is_null() {
            continue;
        }
        match dest.get_mut(key) {
            Some(existing) if existing.is_object() && value.is_object() => merge(existing, value),
            _ => {
                let mut fresh = Value::Null;
                if value.is_object() {
                    // strips nested nulls the same way a merge would
                    merge(&mut fresh, value);
                } else {
                    fresh = value.clone();
                }
                dest.insert(key.clone(), fresh);
            }
        }
    }
}
