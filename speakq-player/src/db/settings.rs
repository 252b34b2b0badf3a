//! Settings database access
//!
//! Read/write settings from the settings table (key-value store). All
//! settings are global/system-wide. Missing keys are initialized with
//! built-in defaults and written back.

use crate::error::{Error, Result};
use crate::state::{MAX_RATE, MIN_RATE};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

/// Get volume setting (0.0-1.0)
pub async fn get_volume(db: &Pool<Sqlite>) -> Result<f32> {
    match get_setting::<f32>(db, "volume_level").await? {
        Some(vol) => Ok(vol.clamp(0.0, 1.0)),
        None => {
            set_volume(db, 0.75).await?;
            Ok(0.75)
        }
    }
}

/// Set volume setting (0.0-1.0)
pub async fn set_volume(db: &Pool<Sqlite>, volume: f32) -> Result<()> {
    set_setting(db, "volume_level", volume.clamp(0.0, 1.0)).await
}

/// Get playback rate multiplier
pub async fn get_playback_rate(db: &Pool<Sqlite>) -> Result<f32> {
    match get_setting::<f32>(db, "playback_rate").await? {
        Some(rate) => Ok(rate.clamp(MIN_RATE, MAX_RATE)),
        None => {
            set_playback_rate(db, 1.0).await?;
            Ok(1.0)
        }
    }
}

/// Set playback rate multiplier
pub async fn set_playback_rate(db: &Pool<Sqlite>, rate: f32) -> Result<()> {
    set_setting(db, "playback_rate", rate.clamp(MIN_RATE, MAX_RATE)).await
}

/// Get selected synthesis voice
pub async fn get_voice(db: &Pool<Sqlite>) -> Result<String> {
    match get_setting::<String>(db, "voice_id").await? {
        Some(voice) => Ok(voice),
        None => {
            let default = "default".to_string();
            set_voice(db, default.clone()).await?;
            Ok(default)
        }
    }
}

/// Set selected synthesis voice
pub async fn set_voice(db: &Pool<Sqlite>, voice_id: String) -> Result<()> {
    set_setting(db, "voice_id", voice_id).await
}

/// Save the currently selected queue item id
///
/// Deleting the key when no item is selected keeps restarts clean.
pub async fn save_selected_item(db: &Pool<Sqlite>, item_id: Option<&str>) -> Result<()> {
    match item_id {
        Some(id) => set_setting(db, "selected_item_id", id.to_string()).await,
        None => {
            sqlx::query("DELETE FROM settings WHERE key = 'selected_item_id'")
                .execute(db)
                .await?;
            Ok(())
        }
    }
}

/// Load the last selected queue item id
pub async fn load_selected_item(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, "selected_item_id").await
}

/// Generic setting getter
///
/// Returns None if the key doesn't exist. Parses the value from its string
/// form using FromStr.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter (upsert)
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    let value_str = value.to_string();

    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value_str)
    .execute(db)
    .await?;

    Ok(())
}
