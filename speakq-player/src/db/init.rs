//! Database initialization
//!
//! Creates the settings table and seeds missing keys with built-in
//! defaults. All runtime-tunable configuration lives in the settings
//! table; the TOML file is bootstrap-only.

use crate::error::Result;
use sqlx::{Pool, Sqlite};
use tracing::info;

/// Create required tables if they do not exist
pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize settings table with default values for missing keys
pub async fn init_settings_defaults(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Initializing default settings");

    let defaults = vec![
        // Master volume (0.0 - 1.0)
        ("volume_level", "0.75"),
        // Playback rate multiplier
        ("playback_rate", "1.0"),
        // Synthesis voice
        ("voice_id", "default"),
    ];

    for (key, default_value) in defaults {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
                .bind(key)
                .fetch_one(pool)
                .await?;

        if !exists {
            sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(pool)
                .await?;

            info!(
                "Initialized setting '{}' with default value: {}",
                key, default_value
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        init_schema(&pool).await.unwrap();
        init_settings_defaults(&pool).await.unwrap();

        // Change a value, re-run init, value must survive
        crate::db::settings::set_setting(&pool, "volume_level", 0.25)
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        init_settings_defaults(&pool).await.unwrap();

        let volume = crate::db::settings::get_volume(&pool).await.unwrap();
        assert_eq!(volume, 0.25);
    }
}
