//! Runtime settings backed by the database.
//!
//! Settings and feature flags are loaded once at startup and cached in
//! memory. Unknown keys fall back to the hardcoded defaults, so a fresh
//! database works without seeding.

use crate::orm::{feature_flags, settings};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};

/// Represents a typed setting value
#[derive(Debug, Clone)]
pub enum SettingValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl SettingValue {
    /// Parse a string value based on the value_type
    pub fn parse(value: &str, value_type: &str) -> Option<Self> {
        match value_type {
            "string" => Some(SettingValue::String(value.to_string())),
            "int" => value.parse().ok().map(SettingValue::Int),
            "bool" => value.parse().ok().map(SettingValue::Bool),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Configuration manager with caching
pub struct Config {
    settings: DashMap<String, SettingValue>,
    feature_flags: DashMap<String, bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            settings: DashMap::new(),
            feature_flags: DashMap::new(),
        }
    }

    /// Load all settings and feature flags from the database
    pub async fn load_from_database(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        let db_settings = settings::Entity::find().all(db).await?;

        for setting in db_settings {
            if let Some(value) = SettingValue::parse(&setting.value, &setting.value_type) {
                self.settings.insert(setting.key, value);
            }
        }

        let flags = feature_flags::Entity::find().all(db).await?;

        for flag in flags {
            self.feature_flags.insert(flag.key, flag.enabled);
        }

        log::info!(
            "Loaded {} settings and {} feature flags from database",
            self.settings.len(),
            self.feature_flags.len()
        );

        Ok(())
    }

    pub fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.settings
            .get(key)
            .and_then(|v| v.as_int())
            .unwrap_or(default)
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.settings
            .get(key)
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| default.to_string())
    }

    /// Feature flags default to enabled when absent.
    pub fn is_feature_enabled(&self, key: &str) -> bool {
        self.feature_flags.get(key).map(|v| *v).unwrap_or(true)
    }

    // Convenience methods for common settings

    pub fn notifications_per_page(&self) -> i64 {
        self.get_int_or("notifications_per_page", 20)
    }

    pub fn topics_per_page(&self) -> i64 {
        self.get_int_or("topics_per_page", 20)
    }

    pub fn comments_per_page(&self) -> i64 {
        self.get_int_or("comments_per_page", 25)
    }

    pub fn polls_enabled(&self) -> bool {
        self.is_feature_enabled("polls_enabled")
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Install the global config. Safe to call more than once.
pub fn init() {
    let _ = CONFIG.set(Config::new());
}

pub fn get_config() -> &'static Config {
    CONFIG.get().expect("config::init() has not been called.")
}
