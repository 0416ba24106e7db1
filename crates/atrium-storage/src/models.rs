// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row decoding helpers shared by the query modules.
//!
//! Timestamps and enum columns are stored as text; these helpers turn a bad
//! value into a `FromSqlConversionFailure` so it surfaces as a storage fault.

use std::str::FromStr;

use atrium_core::types::{ActiveAssignment, AgentCode, EndReason, parse_timestamp};
use atrium_core::{ConversationKey, PhoneKey};
use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

/// Column list matching [`assignment_from_row`].
pub const ASSIGNMENT_COLUMNS: &str =
    "id, phone_key, channel_id, phone_raw, work_group, agent_code, started_at, ended_at, end_reason";

/// Read a UTC timestamp column.
pub fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a nullable UTC timestamp column.
pub fn optional_timestamp_at(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        parse_timestamp(&value)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Read a text column holding a `strum`-parsable enum.
pub fn enum_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a (phone_key, channel_id) column pair.
pub fn key_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<ConversationKey> {
    Ok(ConversationKey::new(
        PhoneKey(row.get(idx)?),
        row.get::<_, String>(idx + 1)?,
    ))
}

/// Decode a row selected with [`ASSIGNMENT_COLUMNS`].
pub fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<ActiveAssignment> {
    let end_reason: Option<String> = row.get(8)?;
    let end_reason = end_reason
        .map(|raw| {
            EndReason::from_str(&raw)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))
        })
        .transpose()?;

    Ok(ActiveAssignment {
        id: row.get(0)?,
        key: key_at(row, 1)?,
        phone_raw: row.get(3)?,
        work_group: row.get(4)?,
        agent: AgentCode(row.get(5)?),
        started_at: timestamp_at(row, 6)?,
        ended_at: optional_timestamp_at(row, 7)?,
        end_reason,
    })
}
