// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cooldown ledger: one block record per conversation, overwritten on re-close.

use atrium_core::types::{AgentCode, BlockRecord, CloseReason, format_timestamp};
use atrium_core::{AtriumError, ConversationKey};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::{enum_at, key_at, timestamp_at};

/// Insert or overwrite the block for a conversation.
///
/// Runs on a caller-supplied connection so it can share the transaction
/// that ends the claim (see `assignments::close_assignment`).
pub(crate) fn write_block(conn: &Connection, block: &BlockRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO blocks (phone_key, channel_id, blocked_at, reason, agent_code)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (phone_key, channel_id) DO UPDATE
         SET blocked_at = excluded.blocked_at,
             reason = excluded.reason,
             agent_code = excluded.agent_code",
        params![
            block.key.phone_key.as_str(),
            block.key.channel,
            format_timestamp(block.blocked_at),
            block.reason.to_string(),
            block.agent.0,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
pub(crate) async fn upsert_block(db: &Database, block: &BlockRecord) -> Result<(), AtriumError> {
    let block = block.clone();
    db.connection()
        .call(move |conn| write_block(conn, &block))
        .await
        .map_err(map_tr_err)
}

pub async fn get_block(
    db: &Database,
    key: &ConversationKey,
) -> Result<Option<BlockRecord>, AtriumError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| -> Result<Option<BlockRecord>, rusqlite::Error> {
            conn.query_row(
                "SELECT phone_key, channel_id, blocked_at, reason, agent_code
                 FROM blocks WHERE phone_key = ?1 AND channel_id = ?2",
                params![key.phone_key.as_str(), key.channel],
                |row| {
                    Ok(BlockRecord {
                        key: key_at(row, 0)?,
                        blocked_at: timestamp_at(row, 2)?,
                        reason: enum_at::<CloseReason>(row, 3)?,
                        agent: AgentCode(row.get(4)?),
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
