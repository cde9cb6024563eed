//! Host configuration exported to the embedding module as JSON

use crate::buffer::HostBuffer;
use crate::error::{BridgeError, BridgeResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Name of the JS global read by `JsGlobalConfig` by default
pub const HOST_CONFIG_GLOBAL: &str = "HostConfig";

/// Anything that can produce the current configuration as JSON text
pub trait ConfigSource {
    fn to_json(&self) -> BridgeResult<String>;
}

/// A configuration value held in Rust and serialized on every export
#[derive(Debug, Clone, PartialEq)]
pub struct StaticConfig<T>(pub T);

impl<T: Serialize> ConfigSource for StaticConfig<T> {
    fn to_json(&self) -> BridgeResult<String> {
        serde_json::to_string(&self.0).map_err(BridgeError::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// Configuration used when the host supplies none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub display: DisplayConfig,
    pub volume: f64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            volume: 0.3,
        }
    }
}

/// Reads a global object from the JS host and serializes it with `JSON.stringify`
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct JsGlobalConfig {
    name: String,
}

#[cfg(target_arch = "wasm32")]
impl JsGlobalConfig {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for JsGlobalConfig {
    fn default() -> Self {
        Self::new(HOST_CONFIG_GLOBAL)
    }
}

#[cfg(target_arch = "wasm32")]
impl ConfigSource for JsGlobalConfig {
    fn to_json(&self) -> BridgeResult<String> {
        use wasm_bindgen::JsValue;

        let value = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str(&self.name))
            .map_err(|e| BridgeError::Encoding(format!("cannot read `{}`: {:?}", self.name, e)))?;
        if value.is_undefined() {
            return Err(BridgeError::Encoding(format!(
                "global `{}` is not defined",
                self.name
            )));
        }

        let json = js_sys::JSON::stringify(&value).map_err(|e| {
            BridgeError::Encoding(format!("cannot stringify `{}`: {:?}", self.name, e))
        })?;
        // Functions and symbols stringify to `undefined`, not a string
        json.as_string()
            .ok_or_else(|| BridgeError::Encoding(format!("`{}` has no JSON form", self.name)))
    }
}

/// Serializes the current configuration for the embedding module.
///
/// Every export reads the source afresh, so changes made by the host between
/// calls are picked up.
pub struct ConfigExporter {
    source: Box<dyn ConfigSource>,
}

impl ConfigExporter {
    pub fn new<S: ConfigSource + 'static>(source: S) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// The JS global on wasm32, [`HostConfig::default`] elsewhere
    pub fn platform_default() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            Self::new(JsGlobalConfig::default())
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            Self::new(StaticConfig(HostConfig::default()))
        }
    }

    pub fn set_source<S: ConfigSource + 'static>(&mut self, source: S) {
        self.source = Box::new(source);
    }

    pub fn export_json(&self) -> BridgeResult<String> {
        let json = self.source.to_json()?;
        tracing::debug!("Exporting configuration ({} bytes)", json.len());
        Ok(json)
    }

    /// Serialize into a NUL-terminated buffer whose ownership passes to the caller
    pub fn export(&self) -> BridgeResult<HostBuffer> {
        HostBuffer::from_text(&self.export_json()?)
    }

    /// Parse the exported JSON into a typed value
    pub fn load<T: DeserializeOwned>(&self) -> BridgeResult<T> {
        Ok(serde_json::from_str(&self.export_json()?)?)
    }
}

impl std::fmt::Debug for ConfigExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigExporter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_round_trip() {
        let config = json!({
            "display": {"width": 1280, "height": 720},
            "volume": 0.75,
            "servers": ["a", "b"]
        });
        let exporter = ConfigExporter::new(StaticConfig(config.clone()));
        let buf = exporter.export().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(buf.as_str()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_defaults() {
        let exporter = ConfigExporter::new(StaticConfig(HostConfig::default()));
        let loaded: HostConfig = exporter.load().unwrap();
        assert_eq!(loaded.display.width, 640);
        assert_eq!(loaded.display.height, 480);
        assert_eq!(loaded.volume, 0.3);
    }

    #[test]
    fn test_partial_host_config() {
        let exporter = ConfigExporter::new(StaticConfig(json!({"volume": 1.0})));
        let loaded: HostConfig = exporter.load().unwrap();
        assert_eq!(loaded.volume, 1.0);
        assert_eq!(loaded.display, DisplayConfig::default());
    }

    #[test]
    fn test_unencodable_config() {
        let mut map = BTreeMap::new();
        map.insert((1u8, 2u8), "tuple keys have no JSON form");
        let exporter = ConfigExporter::new(StaticConfig(map));
        assert!(matches!(exporter.export(), Err(BridgeError::Encoding(_))));
    }

    #[test]
    fn test_set_source() {
        let mut exporter = ConfigExporter::platform_default();
        exporter.set_source(StaticConfig(json!({"volume": 0})));
        assert_eq!(exporter.export_json().unwrap(), r#"{"volume":0}"#);
    }
}
