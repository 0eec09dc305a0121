//! Application configuration loading from config.toml
//!
//! All process-wide settings live in one [`AppConfig`] loaded explicitly at
//! startup and validated before use; there is no lazily-created settings
//! row in the database. [`AppConfig::reload`] re-reads the file on demand.

use crate::core::holidays::{HolidayPolicy, HolidaySeed, WeekendPolicy};
use crate::entities::MealType;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming the config file path.
pub const CONFIG_PATH_ENV: &str = "MESSBOOK_CONFIG";

fn default_database_url() -> String {
    "sqlite://data/messbook.sqlite".to_string()
}

fn default_lunch_cutoff() -> u32 {
    9
}

fn default_dinner_cutoff() -> u32 {
    17
}

fn default_low_balance_threshold() -> i64 {
    0
}

/// Same-day toggle deadlines, in hours of the day (0-23).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CutoffConfig {
    /// Lunch toggles close at this hour
    #[serde(default = "default_lunch_cutoff")]
    pub lunch_hour: u32,
    /// Dinner toggles close at this hour
    #[serde(default = "default_dinner_cutoff")]
    pub dinner_hour: u32,
}

impl Default for CutoffConfig {
    fn default() -> Self {
        Self {
            lunch_hour: default_lunch_cutoff(),
            dinner_hour: default_dinner_cutoff(),
        }
    }
}

impl CutoffConfig {
    /// The cutoff hour for a meal.
    #[must_use]
    pub fn hour_for(&self, meal_type: MealType) -> u32 {
        match meal_type {
            MealType::Lunch => self.lunch_hour,
            MealType::Dinner => self.dinner_hour,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.lunch_hour > 23 || self.dinner_hour > 23 {
            return Err(Error::validation("cutoff hours must be 0..=23"));
        }
        Ok(())
    }
}

/// Process-wide application configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Database connection string; the `DATABASE_URL` environment variable
    /// takes precedence over the file
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Same-day toggle deadlines
    pub cutoff: CutoffConfig,
    /// Weekend default-off flags
    pub weekend: WeekendPolicy,
    /// Which holiday kinds cause default-off days
    pub holidays: HolidayPolicy,
    /// Balances below this amount trigger a low-balance notification
    #[serde(default = "default_low_balance_threshold")]
    pub low_balance_threshold: i64,
    /// Holiday calendar synced into the database at startup
    pub holiday_calendar: Vec<HolidaySeed>,
}

impl AppConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
            message: format!("failed to read config file: {e}"),
        })?;

        let mut config: AppConfig = toml::from_str(&contents).map_err(|e| Error::Config {
            message: format!("failed to parse config.toml: {e}"),
        })?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `$MESSBOOK_CONFIG`, falling back to
    /// `./config.toml`. A missing file yields the validated defaults, so a
    /// bare checkout still starts.
    pub fn load_default() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
        if Path::new(&path).exists() {
            Self::load(path)
        } else {
            let mut config = Self::default();
            config.database_url = default_database_url();
            if let Ok(url) = std::env::var("DATABASE_URL") {
                config.database_url = url;
            }
            config.validate()?;
            Ok(config)
        }
    }

    /// Explicit re-read of the same sources as [`AppConfig::load_default`].
    pub fn reload(&mut self) -> Result<()> {
        *self = Self::load_default()?;
        Ok(())
    }

    /// Cross-field validation, run at every load.
    pub fn validate(&self) -> Result<()> {
        self.cutoff.validate()?;
        self.weekend.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            database_url = "sqlite::memory:"
            low_balance_threshold = -2000

            [cutoff]
            lunch_hour = 10
            dinner_hour = 18

            [weekend]
            friday_off = true
            odd_saturday_off = true

            [holidays]
            government_off = true
            optional_off = false
            religious_off = true

            [[holiday_calendar]]
            date = "2026-02-21"
            kind = "government"
            name = "Language Day"

            [[holiday_calendar]]
            recurring_month = 5
            recurring_day = 1
            kind = "government"
            name = "May Day"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.cutoff.lunch_hour, 10);
        assert_eq!(config.cutoff.dinner_hour, 18);
        assert!(config.weekend.friday_off);
        assert!(config.weekend.odd_saturday_off);
        assert_eq!(config.low_balance_threshold, -2000);
        assert_eq!(config.holiday_calendar.len(), 2);
        assert_eq!(config.holiday_calendar[1].recurring_month, Some(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_apply_when_sections_missing() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.cutoff.lunch_hour, 9);
        assert_eq!(config.cutoff.dinner_hour, 17);
        assert!(!config.weekend.friday_off);
        assert!(config.holidays.government_off);
        assert!(config.holiday_calendar.is_empty());
    }

    #[test]
    fn test_validation_rejects_bad_cutoff_and_weekend() {
        let config: AppConfig = toml::from_str(
            r#"
            [cutoff]
            lunch_hour = 24
        "#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config: AppConfig = toml::from_str(
            r#"
            [weekend]
            odd_saturday_off = true
            even_saturday_off = true
        "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
