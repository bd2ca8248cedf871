//! Release values with deep merge support

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;

/// Values rendered into an exported chart's `values.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// The values a release was deployed with: chart defaults overlaid with user config
    ///
    /// Merge rules follow Helm:
    /// - Scalars and arrays: overlay replaces base
    /// - Objects: recursive merge
    /// - `null` in the overlay removes the key
    pub fn for_release(chart_defaults: JsonValue, config: &JsonValue) -> Self {
        let mut result = match chart_defaults {
            JsonValue::Null => JsonValue::Object(serde_json::Map::new()),
            other => other,
        };
        if !config.is_null() {
            deep_merge(&mut result, config);
        }
        Self(result)
    }

    /// Render as a YAML document
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }
}

fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                if overlay_value.is_null() {
                    base_map.remove(key);
                    continue;
                }
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}
