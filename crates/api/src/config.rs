//! Types for use when configuring tilefetch modules.

use crate::*;
use std::sync::Mutex;

/// helper transcode function
fn tc<S: serde::Serialize, D: serde::de::DeserializeOwned>(
    s: &S,
) -> TfResult<D> {
    serde_json::from_str(
        &serde_json::to_string(s)
            .map_err(|e| TfError::other_src("encode", e))?,
    )
    .map_err(|e| TfError::other_src("decode", e))
}

/// Denotes a type used to configure a specific tilefetch module.
///
/// The types implementing this trait hold configuration that cannot be
/// changed at runtime, the likes of which might be found in a configuration
/// file. Each module defines a `<Mod>Config` of parameters and a
/// `<Mod>ModConfig` wrapper naming the module, so that all modules can share
/// one config map.
pub trait ModConfig:
    'static
    + Sized
    + Default
    + std::fmt::Debug
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
{
}

/// Tilefetch configuration.
///
/// A map of module-name to module-config entries. Modules place their
/// defaults here through their factories' `default_config` hooks; callers
/// can override entries any time before the relevant module is created.
#[derive(Debug, Default)]
pub struct Config(Mutex<serde_json::Map<String, serde_json::Value>>);

impl Config {
    /// Set (or overwrite) a module config entry.
    ///
    /// The wrapper type's top-level property names the module, so setting
    /// one module's config never disturbs another's.
    pub fn set_module_config<M: ModConfig>(&self, m: &M) -> TfResult<()> {
        let entries: serde_json::Map<String, serde_json::Value> = tc(m)?;
        let mut lock = self.0.lock().unwrap();
        for (k, v) in entries {
            lock.insert(k, v);
        }
        Ok(())
    }

    /// Extract a module config from the map.
    ///
    /// Note that this config may have been loaded from disk and edited by
    /// humans, so module config serialization should be tolerant of missing
    /// properties, falling back to sane defaults. A module absent from the
    /// map entirely yields its default.
    pub fn get_module_config<M: ModConfig>(&self) -> TfResult<M> {
        let lock = self.0.lock().unwrap();
        tc(&*lock)
    }
}

impl serde::Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.lock().unwrap().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let map = serde_json::Map::deserialize(deserializer)?;
        Ok(Self(Mutex::new(map)))
    }
}
