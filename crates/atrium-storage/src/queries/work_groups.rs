// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Work group directory queries.

use atrium_core::types::{WorkGroupSpec, format_timestamp};
use atrium_core::AtriumError;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

/// Register a work group, replacing its channel set.
///
/// The capacity limit is only seeded when the group has none yet, so limits
/// changed at runtime survive a restart with the same configuration.
pub async fn upsert_work_group(db: &Database, spec: &WorkGroupSpec) -> Result<(), AtriumError> {
    let spec = spec.clone();
    let now = format_timestamp(Utc::now());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO work_groups (name, created_at) VALUES (?1, ?2)
                 ON CONFLICT (name) DO NOTHING",
                params![spec.name, now],
            )?;
            tx.execute(
                "DELETE FROM work_group_channels WHERE work_group = ?1",
                params![spec.name],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO work_group_channels (work_group, channel_id) VALUES (?1, ?2)
                     ON CONFLICT DO NOTHING",
                )?;
                for channel in &spec.channels {
                    stmt.execute(params![spec.name, channel])?;
                }
            }
            tx.execute(
                "INSERT INTO capacity_limits (work_group, max_open, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (work_group) DO NOTHING",
                params![spec.name, spec.capacity, now],
            )?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Channels served by a work group, or `None` if the group is not registered.
pub async fn channels_for(
    db: &Database,
    work_group: &str,
) -> Result<Option<Vec<String>>, AtriumError> {
    let work_group = work_group.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Vec<String>>, rusqlite::Error> {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM work_groups WHERE name = ?1",
                    params![work_group],
                    |_| Ok(()),
                )
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }
            let mut stmt = conn.prepare(
                "SELECT channel_id FROM work_group_channels
                 WHERE work_group = ?1 ORDER BY channel_id",
            )?;
            let channels = stmt
                .query_map(params![work_group], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(Some(channels))
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_work_groups(db: &Database) -> Result<Vec<String>, AtriumError> {
    db.connection()
        .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT name FROM work_groups ORDER BY name")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
