//! Durable "latest known location per entity" store.
//!
//! One row per vendor, keyed upsert. rusqlite is synchronous, so every
//! query runs under tokio::task::spawn_blocking with the shared
//! Arc<Mutex<Connection>> from db::init_db.

use rusqlite::{params, OptionalExtension};

use crate::db::DbPool;
use crate::error::AppError;
use crate::location::LocationUpdate;

/// Read/write interface over the `live_locations` table.
#[derive(Clone)]
pub struct LocationStore {
    db: DbPool,
}

impl LocationStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Upsert the latest location for an entity.
    /// The ingress handler stamps `updated_at` before calling this.
    pub async fn put(&self, update: &LocationUpdate) -> Result<(), AppError> {
        let db = self.db.clone();
        let update = update.clone();

        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| AppError::Storage("database lock poisoned".to_string()))?;
            conn.execute(
                "INSERT INTO live_locations (entity_id, lat, lng, accuracy, speed, heading, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(entity_id) DO UPDATE SET
                     lat = excluded.lat,
                     lng = excluded.lng,
                     accuracy = excluded.accuracy,
                     speed = excluded.speed,
                     heading = excluded.heading,
                     updated_at = excluded.updated_at",
                params![
                    update.entity_id,
                    update.lat,
                    update.lng,
                    update.accuracy,
                    update.speed,
                    update.heading,
                    // Always present by the time persistence happens
                    update.updated_at.unwrap_or_default(),
                ],
            )?;
            Ok(())
        })
        .await?
    }

    /// Latest persisted location for an entity, or None if never reported.
    pub async fn get_latest(&self, entity_id: &str) -> Result<Option<LocationUpdate>, AppError> {
        let db = self.db.clone();
        let entity_id = entity_id.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| AppError::Storage("database lock poisoned".to_string()))?;
            let row = conn
                .query_row(
                    "SELECT entity_id, lat, lng, accuracy, speed, heading, updated_at
                     FROM live_locations WHERE entity_id = ?1",
                    params![entity_id],
                    |row| {
                        Ok(LocationUpdate {
                            entity_id: row.get(0)?,
                            lat: row.get(1)?,
                            lng: row.get(2)?,
                            accuracy: row.get(3)?,
                            speed: row.get(4)?,
                            heading: row.get(5)?,
                            updated_at: Some(row.get(6)?),
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
        .await?
    }
}
