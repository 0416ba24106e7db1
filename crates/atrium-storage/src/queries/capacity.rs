// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-work-group capacity limits.

use atrium_core::types::format_timestamp;
use atrium_core::AtriumError;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

/// Configured limit for a work group. `None` when no row exists.
pub async fn capacity_limit(db: &Database, work_group: &str) -> Result<Option<u32>, AtriumError> {
    let work_group = work_group.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<u32>, rusqlite::Error> {
            conn.query_row(
                "SELECT max_open FROM capacity_limits WHERE work_group = ?1",
                params![work_group],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Set the limit for a work group, creating the row if needed.
pub async fn set_capacity_limit(
    db: &Database,
    work_group: &str,
    limit: u32,
) -> Result<(), AtriumError> {
    let work_group = work_group.to_string();
    let now = format_timestamp(Utc::now());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO capacity_limits (work_group, max_open, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (work_group) DO UPDATE
                 SET max_open = excluded.max_open, updated_at = excluded.updated_at",
                params![work_group, limit, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::work_groups::upsert_work_group;
    use atrium_core::types::WorkGroupSpec;
    use tempfile::tempdir;

    #[tokio::test]
    async fn set_then_read_limit() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("cap.db").to_str().unwrap())
            .await
            .unwrap();
        upsert_work_group(
            &db,
            &WorkGroupSpec {
                name: "support".to_string(),
                channels: vec!["line-1".to_string()],
                capacity: 0,
            },
        )
        .await
        .unwrap();

        assert_eq!(capacity_limit(&db, "support").await.unwrap(), Some(0));
        set_capacity_limit(&db, "support", 2).await.unwrap();
        assert_eq!(capacity_limit(&db, "support").await.unwrap(), Some(2));
        assert_eq!(capacity_limit(&db, "billing").await.unwrap(), None);
        db.close().await.unwrap();
    }
}
