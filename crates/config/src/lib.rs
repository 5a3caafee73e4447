use core::time::Duration;
use std::collections::BTreeMap;
use std::fs::{create_dir_all, read_to_string, write};

use camino::{Utf8Path, Utf8PathBuf};
use eyre::{bail, Result as EyreResult, WrapErr};
use serde::{Deserialize, Serialize};
use storefront_cart::settings::{
    DEFAULT_BUS_CAPACITY, DEFAULT_NOTE_DEBOUNCE_MS, DEFAULT_QUANTITY_DEBOUNCE_MS, MAX_BUS_CAPACITY,
};
use storefront_cart::{CartSettings, InFlightPolicy};
use storefront_client::Routes;
use url::Url;

pub mod dirs;
pub mod hints;

#[cfg(test)]
#[path = "tests/config.rs"]
mod tests;

pub const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_SESSION_FILE: &str = "session.json";

#[derive(Clone, Debug, Deserialize, Serialize)]
#[non_exhaustive]
pub struct ConfigFile {
    pub shop: ShopConfig,

    #[serde(default)]
    pub routes: Routes,

    #[serde(default)]
    pub widgets: WidgetsConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[non_exhaustive]
pub struct ShopConfig {
    pub base_url: Url,
}

impl ShopConfig {
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self { base_url }
    }
}

#[derive(Copy, Clone, Debug, Deserialize, Serialize)]
#[non_exhaustive]
pub struct WidgetsConfig {
    #[serde(
        rename = "quantity_debounce_ms",
        with = "serde_duration",
        default = "default_quantity_debounce"
    )]
    pub quantity_debounce: Duration,

    #[serde(
        rename = "note_debounce_ms",
        with = "serde_duration",
        default = "default_note_debounce"
    )]
    pub note_debounce: Duration,

    #[serde(default)]
    pub in_flight: InFlightPolicy,

    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl Default for WidgetsConfig {
    fn default() -> Self {
        Self {
            quantity_debounce: default_quantity_debounce(),
            note_debounce: default_note_debounce(),
            in_flight: InFlightPolicy::default(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

impl From<&WidgetsConfig> for CartSettings {
    fn from(config: &WidgetsConfig) -> Self {
        Self {
            quantity_debounce: config.quantity_debounce,
            note_debounce: config.note_debounce,
            in_flight: config.in_flight,
            bus_capacity: config.bus_capacity,
        }
    }
}

const fn default_quantity_debounce() -> Duration {
    Duration::from_millis(DEFAULT_QUANTITY_DEBOUNCE_MS)
}

const fn default_note_debounce() -> Duration {
    Duration::from_millis(DEFAULT_NOTE_DEBOUNCE_MS)
}

const fn default_bus_capacity() -> usize {
    DEFAULT_BUS_CAPACITY
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[non_exhaustive]
pub struct SessionConfig {
    /// Relative paths resolve against the home directory.
    pub file: Utf8PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: DEFAULT_SESSION_FILE.into(),
        }
    }
}

impl ConfigFile {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            shop: ShopConfig::new(base_url),
            routes: Routes::default(),
            widgets: WidgetsConfig::default(),
            session: SessionConfig::default(),
        }
    }

    #[must_use]
    pub fn exists(dir: &Utf8Path) -> bool {
        dir.join(CONFIG_FILE).is_file()
    }

    pub fn load(dir: &Utf8Path) -> EyreResult<Self> {
        let path = dir.join(CONFIG_FILE);
        let content = read_to_string(&path)
            .wrap_err_with(|| format!("failed to read configuration from {path:?}"))?;

        let config: Self = toml::from_str(&content)
            .wrap_err_with(|| format!("invalid configuration in {path:?}"))?;

        config
            .validate()
            .wrap_err_with(|| format!("invalid configuration in {path:?}"))?;

        Ok(config)
    }

    pub fn validate(&self) -> EyreResult<()> {
        let capacity = self.widgets.bus_capacity;
        if !(1..=MAX_BUS_CAPACITY).contains(&capacity) {
            bail!("widgets.bus_capacity must be between 1 and {MAX_BUS_CAPACITY}, got {capacity}");
        }

        Ok(())
    }

    pub fn save(&self, dir: &Utf8Path) -> EyreResult<()> {
        let path = dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self)?;

        create_dir_all(dir)
            .wrap_err_with(|| format!("failed to create configuration directory {dir:?}"))?;

        write(&path, content)
            .wrap_err_with(|| format!("failed to write configuration to {path:?}"))?;

        Ok(())
    }

    /// Only write config file if changes are detected
    pub fn save_if_changed(&self, dir: &Utf8Path) -> EyreResult<bool> {
        let path = dir.join(CONFIG_FILE);
        let new_content = toml::to_string_pretty(self)?;

        let changed = read_to_string(&path).map_or(true, |existing| existing != new_content);

        if changed {
            create_dir_all(dir)
                .wrap_err_with(|| format!("failed to create configuration directory {dir:?}"))?;
            write(&path, new_content)
                .wrap_err_with(|| format!("failed to write configuration to {path:?}"))?;
        }

        Ok(changed)
    }

    #[must_use]
    pub fn settings(&self) -> CartSettings {
        CartSettings::from(&self.widgets)
    }

    /// Session file location for a home directory.
    #[must_use]
    pub fn session_path(&self, dir: &Utf8Path) -> Utf8PathBuf {
        if self.session.file.is_absolute() {
            return self.session.file.clone();
        }

        dir.join(&self.session.file)
    }

    /// Provide editable keys with example values
    #[must_use]
    pub fn editable_keys() -> BTreeMap<&'static str, Vec<&'static str>> {
        BTreeMap::from([
            ("shop.base_url", vec!["https://shop.example"]),
            ("routes.cart_read", vec!["/cart.js"]),
            ("routes.cart_add", vec!["/cart/add.js"]),
            ("routes.cart_change", vec!["/cart/change.js"]),
            ("routes.cart_update", vec!["/cart/update.js"]),
            ("widgets.quantity_debounce_ms", vec!["0", "150", "500"]),
            ("widgets.note_debounce_ms", vec!["0", "200", "1000"]),
            ("widgets.in_flight", vec!["supersede", "ignore"]),
            ("widgets.bus_capacity", vec!["16", "64", "256"]),
            ("session.file", vec!["session.json", "/path/to/session.json"]),
        ])
    }

    /// Get the value for a specific config key
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<String> {
        let value = match key {
            "shop.base_url" => self.shop.base_url.to_string(),
            "routes.cart_read" => self.routes.cart_read.clone(),
            "routes.cart_add" => self.routes.cart_add.clone(),
            "routes.cart_change" => self.routes.cart_change.clone(),
            "routes.cart_update" => self.routes.cart_update.clone(),
            "widgets.quantity_debounce_ms" => self.widgets.quantity_debounce.as_millis().to_string(),
            "widgets.note_debounce_ms" => self.widgets.note_debounce.as_millis().to_string(),
            "widgets.in_flight" => match self.widgets.in_flight {
                InFlightPolicy::Supersede => "supersede".to_owned(),
                InFlightPolicy::Ignore => "ignore".to_owned(),
            },
            "widgets.bus_capacity" => self.widgets.bus_capacity.to_string(),
            "session.file" => self.session.file.to_string(),
            _ => return None,
        };

        Some(value)
    }
}

mod serde_duration {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
