// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue membership (presence) queries.

use atrium_core::types::{AgentCode, QueueMembership, format_timestamp};
use atrium_core::AtriumError;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::timestamp_at;

fn membership_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueMembership> {
    Ok(QueueMembership {
        agent: AgentCode(row.get(0)?),
        work_group: row.get(1)?,
        joined_at: timestamp_at(row, 2)?,
    })
}

/// Insert a membership. Returns `false` if the pair already exists.
pub async fn insert_membership(
    db: &Database,
    agent: AgentCode,
    work_group: &str,
    joined_at: DateTime<Utc>,
) -> Result<bool, AtriumError> {
    let work_group = work_group.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT INTO queue_memberships (agent_code, work_group, joined_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (agent_code, work_group) DO NOTHING",
                params![agent.0, work_group, format_timestamp(joined_at)],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a membership. Returns `false` if it did not exist.
pub async fn delete_membership(
    db: &Database,
    agent: AgentCode,
    work_group: &str,
) -> Result<bool, AtriumError> {
    let work_group = work_group.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let deleted = conn.execute(
                "DELETE FROM queue_memberships WHERE agent_code = ?1 AND work_group = ?2",
                params![agent.0, work_group],
            )?;
            Ok(deleted == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_membership(
    db: &Database,
    agent: AgentCode,
    work_group: &str,
) -> Result<Option<QueueMembership>, AtriumError> {
    let work_group = work_group.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<QueueMembership>, rusqlite::Error> {
            conn.query_row(
                "SELECT agent_code, work_group, joined_at FROM queue_memberships
                 WHERE agent_code = ?1 AND work_group = ?2",
                params![agent.0, work_group],
                membership_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List memberships in join order (oldest first), optionally for one work group.
pub async fn list_memberships(
    db: &Database,
    work_group: Option<&str>,
) -> Result<Vec<QueueMembership>, AtriumError> {
    let work_group = work_group.map(|s| s.to_string());
    db.connection()
        .call(move |conn| -> Result<Vec<QueueMembership>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT agent_code, work_group, joined_at FROM queue_memberships
                 WHERE ?1 IS NULL OR work_group = ?1
                 ORDER BY joined_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![work_group], membership_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::agents::create_agent;
    use atrium_core::types::Agent;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        for code in [1, 2, 3] {
            create_agent(
                &db,
                &Agent {
                    code: AgentCode(code),
                    display_name: format!("agent-{code}"),
                    home_work_group: "support".to_string(),
                    source: "admin".to_string(),
                    created_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        }
        (db, dir)
    }

    #[tokio::test]
    async fn insert_is_rejected_when_present() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();

        assert!(insert_membership(&db, AgentCode(1), "support", now).await.unwrap());
        assert!(!insert_membership(&db, AgentCode(1), "support", now).await.unwrap());
        assert!(insert_membership(&db, AgentCode(1), "sales", now).await.unwrap());

        let m = get_membership(&db, AgentCode(1), "support").await.unwrap().unwrap();
        assert_eq!(m.work_group, "support");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_reports_absence() {
        let (db, _dir) = setup_db().await;

        insert_membership(&db, AgentCode(2), "support", Utc::now()).await.unwrap();
        assert!(delete_membership(&db, AgentCode(2), "support").await.unwrap());
        assert!(!delete_membership(&db, AgentCode(2), "support").await.unwrap());
        assert!(get_membership(&db, AgentCode(2), "support").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_is_ordered_by_join_time() {
        let (db, _dir) = setup_db().await;
        let base = Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap();

        insert_membership(&db, AgentCode(3), "support", base + Duration::minutes(2)).await.unwrap();
        insert_membership(&db, AgentCode(1), "support", base).await.unwrap();
        insert_membership(&db, AgentCode(2), "sales", base + Duration::minutes(1)).await.unwrap();

        let support = list_memberships(&db, Some("support")).await.unwrap();
        let codes: Vec<i64> = support.iter().map(|m| m.agent.0).collect();
        assert_eq!(codes, vec![1, 3]);

        let all = list_memberships(&db, None).await.unwrap();
        let codes: Vec<i64> = all.iter().map(|m| m.agent.0).collect();
        assert_eq!(codes, vec![1, 2, 3]);
        db.close().await.unwrap();
    }
}
