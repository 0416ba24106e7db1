// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent provisioning queries.

use atrium_core::types::{Agent, AgentCode, format_timestamp};
use atrium_core::AtriumError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::timestamp_at;

/// Insert a new agent. Returns `false` when the code is already taken.
pub async fn create_agent(db: &Database, agent: &Agent) -> Result<bool, AtriumError> {
    let agent = agent.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT INTO agents (code, display_name, home_work_group, source, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (code) DO NOTHING",
                params![
                    agent.code.0,
                    agent.display_name,
                    agent.home_work_group,
                    agent.source,
                    format_timestamp(agent.created_at),
                ],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up an agent by code.
pub async fn get_agent(db: &Database, code: AgentCode) -> Result<Option<Agent>, AtriumError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT code, display_name, home_work_group, source, created_at
                 FROM agents WHERE code = ?1",
                params![code.0],
                |row| {
                    Ok(Agent {
                        code: AgentCode(row.get(0)?),
                        display_name: row.get(1)?,
                        home_work_group: row.get(2)?,
                        source: row.get(3)?,
                        created_at: timestamp_at(row, 4)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
