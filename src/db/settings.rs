//! Persisted advice-provider settings.

use super::Database;
use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

/// Model name that providers no longer serve.
pub const RETIRED_MODEL: &str = "gemini-2.0-flash";

/// Credential and model chosen by the user. Takes priority over config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub updated_at: NaiveDateTime,
}

impl Database {
    /// Load the settings row, creating it with `default_model` on first use.
    pub fn get_advice_settings(&self, default_model: &str, now: NaiveDateTime) -> Result<AdviceSettings> {
        self.with_conn(|conn| {
            let existing = conn
                .query_row(
                    "SELECT api_key, model, updated_at FROM advice_settings WHERE id = 1",
                    [],
                    |row| {
                        Ok(AdviceSettings {
                            api_key: row.get(0)?,
                            model: row.get(1)?,
                            updated_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;

            if let Some(settings) = existing {
                return Ok(settings);
            }

            conn.execute(
                "INSERT INTO advice_settings (id, api_key, model, updated_at) VALUES (1, NULL, ?1, ?2)",
                params![default_model, now],
            )?;
            Ok(AdviceSettings {
                api_key: None,
                model: default_model.to_string(),
                updated_at: now,
            })
        })
    }

    /// Overwrite the key when given; the model only when given and non-blank.
    pub fn update_advice_settings(
        &self,
        api_key: Option<String>,
        model: Option<String>,
        default_model: &str,
        now: NaiveDateTime,
    ) -> Result<AdviceSettings> {
        let mut settings = self.get_advice_settings(default_model, now)?;
        if let Some(key) = api_key {
            settings.api_key = Some(key);
        }
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            settings.model = model;
        }
        settings.updated_at = now;

        self.with_conn(|conn| {
            conn.execute(
                "UPDATE advice_settings SET api_key = ?1, model = ?2, updated_at = ?3 WHERE id = 1",
                params![settings.api_key, settings.model, settings.updated_at],
            )?;
            Ok(())
        })?;

        Ok(settings)
    }

    /// Move a stored retired model over to `replacement`. Returns true if a row changed.
    pub fn migrate_retired_model(&self, replacement: &str, now: NaiveDateTime) -> Result<bool> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE advice_settings SET model = ?1, updated_at = ?2 WHERE model = ?3",
                params![replacement, now, RETIRED_MODEL],
            )?)
        })?;
        if changed > 0 {
            tracing::info!(from = RETIRED_MODEL, to = replacement, "Migrated advice model");
        }
        Ok(changed > 0)
    }
}
