// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claim rows: the atomic reserve and close primitives, release, housekeeping,
//! and counts.

use atrium_core::types::{
    ActiveAssignment, AgentCode, BlockRecord, EndReason, NewReservation, OpenClaimCount,
    ReserveOutcome, format_timestamp,
};
use atrium_core::{AtriumError, ConversationKey};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::database::{map_tr_err, Database};
use crate::models::{assignment_from_row, ASSIGNMENT_COLUMNS};
use crate::queries::blocks::write_block;

/// Reserve a conversation for an agent in one immediate transaction.
///
/// The capacity count and the insert share the write lock, so two claims by
/// the same agent cannot both pass the check. The insert itself is guarded by
/// the partial unique index over open rows: a conflict leaves the table
/// untouched and yields [`ReserveOutcome::Taken`].
pub async fn reserve(
    db: &Database,
    reservation: &NewReservation,
    capacity_limit: u32,
) -> Result<ReserveOutcome, AtriumError> {
    let r = reservation.clone();
    db.connection()
        .call(move |conn| -> Result<ReserveOutcome, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if capacity_limit > 0 {
                let current: u32 = tx.query_row(
                    "SELECT COUNT(*) FROM assignments
                     WHERE agent_code = ?1 AND work_group = ?2 AND ended_at IS NULL",
                    params![r.agent.0, r.work_group],
                    |row| row.get(0),
                )?;
                if current >= capacity_limit {
                    tx.commit()?;
                    return Ok(ReserveOutcome::AtCapacity { current });
                }
            }

            let inserted = tx.execute(
                "INSERT INTO assignments
                     (phone_key, channel_id, phone_raw, work_group, agent_code, started_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (phone_key, channel_id) WHERE ended_at IS NULL DO NOTHING",
                params![
                    r.key.phone_key.as_str(),
                    r.key.channel,
                    r.phone_raw,
                    r.work_group,
                    r.agent.0,
                    format_timestamp(r.started_at),
                ],
            )?;
            if inserted == 0 {
                tx.commit()?;
                return Ok(ReserveOutcome::Taken);
            }

            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(ReserveOutcome::Reserved(ActiveAssignment {
                id,
                key: r.key,
                phone_raw: r.phone_raw,
                work_group: r.work_group,
                agent: r.agent,
                started_at: r.started_at,
                ended_at: None,
                end_reason: None,
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// The open claim on a conversation, if any.
pub async fn open_assignment(
    db: &Database,
    key: &ConversationKey,
) -> Result<Option<ActiveAssignment>, AtriumError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| -> Result<Option<ActiveAssignment>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
                     WHERE phone_key = ?1 AND channel_id = ?2 AND ended_at IS NULL"
                ),
                params![key.phone_key.as_str(), key.channel],
                assignment_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// End the open claim an agent holds on a conversation.
///
/// Returns the ended row, or `None` when the agent holds no open claim on it.
pub async fn end_assignment(
    db: &Database,
    agent: AgentCode,
    key: &ConversationKey,
    ended_at: DateTime<Utc>,
    reason: EndReason,
) -> Result<Option<ActiveAssignment>, AtriumError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| end_open_row(conn, agent, &key, ended_at, reason))
        .await
        .map_err(map_tr_err)
}

/// End the agent's open claim and write its block in one immediate
/// transaction. When the agent holds no open claim, nothing is written.
/// A failed block write rolls the claim back to open.
pub async fn close_assignment(
    db: &Database,
    block: &BlockRecord,
) -> Result<Option<ActiveAssignment>, AtriumError> {
    let block = block.clone();
    db.connection()
        .call(move |conn| -> Result<Option<ActiveAssignment>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(ended) = end_open_row(
                &tx,
                block.agent,
                &block.key,
                block.blocked_at,
                EndReason::Closed,
            )?
            else {
                return Ok(None);
            };
            write_block(&tx, &block)?;
            tx.commit()?;
            Ok(Some(ended))
        })
        .await
        .map_err(map_tr_err)
}

fn end_open_row(
    conn: &Connection,
    agent: AgentCode,
    key: &ConversationKey,
    ended_at: DateTime<Utc>,
    reason: EndReason,
) -> Result<Option<ActiveAssignment>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "UPDATE assignments SET ended_at = ?1, end_reason = ?2
         WHERE agent_code = ?3 AND phone_key = ?4 AND channel_id = ?5
           AND ended_at IS NULL
         RETURNING {ASSIGNMENT_COLUMNS}"
    ))?;
    let mut ended = stmt
        .query_map(
            params![
                format_timestamp(ended_at),
                reason.to_string(),
                agent.0,
                key.phone_key.as_str(),
                key.channel,
            ],
            assignment_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ended.pop())
}

/// Open claims held by an agent, oldest first.
pub async fn open_for_agent(
    db: &Database,
    agent: AgentCode,
    work_group: Option<&str>,
) -> Result<Vec<ActiveAssignment>, AtriumError> {
    let work_group = work_group.map(|s| s.to_string());
    db.connection()
        .call(move |conn| -> Result<Vec<ActiveAssignment>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
                 WHERE agent_code = ?1 AND ended_at IS NULL
                   AND (?2 IS NULL OR work_group = ?2)
                 ORDER BY started_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![agent.0, work_group], assignment_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_open(
    db: &Database,
    agent: AgentCode,
    work_group: &str,
) -> Result<u32, AtriumError> {
    let work_group = work_group.to_string();
    db.connection()
        .call(move |conn| -> Result<u32, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM assignments
                 WHERE agent_code = ?1 AND work_group = ?2 AND ended_at IS NULL",
                params![agent.0, work_group],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Open claim counts grouped by (agent, work group).
pub async fn open_counts(
    db: &Database,
    work_group: Option<&str>,
) -> Result<Vec<OpenClaimCount>, AtriumError> {
    let work_group = work_group.map(|s| s.to_string());
    db.connection()
        .call(move |conn| -> Result<Vec<OpenClaimCount>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT agent_code, work_group, COUNT(*) FROM assignments
                 WHERE ended_at IS NULL AND (?1 IS NULL OR work_group = ?1)
                 GROUP BY agent_code, work_group
                 ORDER BY work_group, agent_code",
            )?;
            let rows = stmt.query_map(params![work_group], |row| {
                Ok(OpenClaimCount {
                    agent: AgentCode(row.get(0)?),
                    work_group: row.get(1)?,
                    open: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// End every open claim whose holder is no longer online in its work group.
///
/// A single guarded UPDATE; running it again, or concurrently, is harmless.
pub async fn sweep_orphans(db: &Database, now: DateTime<Utc>) -> Result<u64, AtriumError> {
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let swept = conn.execute(
                "UPDATE assignments SET ended_at = ?1, end_reason = 'swept'
                 WHERE ended_at IS NULL
                   AND NOT EXISTS (
                       SELECT 1 FROM queue_memberships q
                       WHERE q.agent_code = assignments.agent_code
                         AND q.work_group = assignments.work_group
                   )",
                params![format_timestamp(now)],
            )?;
            Ok(swept as u64)
        })
        .await
        .map_err(map_tr_err)
}
