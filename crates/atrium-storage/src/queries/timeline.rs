// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation timeline: the three append-only logs and the queries that
//! merge them (candidate selection, last message, history).

use atrium_core::types::{
    Candidate, CandidateQuery, Direction, LastMessage, MessageSource, NewAdhocMessage,
    NewCampaignSend, NewMessage, TimelineEntry, format_timestamp,
};
use atrium_core::{AtriumError, ConversationKey};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::{enum_at, key_at, timestamp_at};

/// Every logged message as
/// (phone_key, channel_id, phone_raw, direction, body, at, source, id).
const TIMELINE_UNION: &str = "
    SELECT phone_key, channel_id, phone_raw, 'outbound' AS direction, body, at,
           'campaign' AS source, id
    FROM campaign_sends
    UNION ALL
    SELECT phone_key, channel_id, phone_raw, direction, body, at, 'message', id
    FROM messages
    UNION ALL
    SELECT phone_key, channel_id, phone_raw, 'outbound', body, at, 'adhoc', id
    FROM adhoc_messages";

/// Newest first. Rows sharing a millisecond order inbound first, then by
/// source and id, so "latest message" is the same on every read.
const NEWEST_FIRST: &str = "at DESC, (direction = 'inbound') DESC, source DESC, id DESC";

/// Conversations eligible for claiming, best first.
///
/// One row per conversation (its most recent message across all logs),
/// restricted to the given channels and recency bound. A conversation with a
/// block record only qualifies once an inbound message is newer than the
/// block. Ranking puts conversations whose latest message is inbound ahead
/// of outbound-only ones, then newest first.
pub async fn candidates_for(
    db: &Database,
    query: &CandidateQuery,
) -> Result<Vec<Candidate>, AtriumError> {
    if query.channels.is_empty() {
        return Ok(Vec::new());
    }

    let channels = serde_json::to_string(&query.channels).map_err(|e| AtriumError::Internal(
        format!("failed to encode channel list: {e}"),
    ))?;
    let since = query.since.map(format_timestamp);
    let phone_key = query.phone_key.as_ref().map(|p| p.as_str().to_string());
    let inbound_only = query.inbound_only;
    let include_assigned = query.include_assigned;

    db.connection()
        .call(move |conn| -> Result<Vec<Candidate>, rusqlite::Error> {
            let sql = format!(
                "WITH timeline AS ({TIMELINE_UNION}),
                 latest AS (
                     SELECT t.*,
                            ROW_NUMBER() OVER (
                                PARTITION BY t.phone_key, t.channel_id
                                ORDER BY {NEWEST_FIRST}
                            ) AS rn
                     FROM timeline t
                     WHERE t.channel_id IN (SELECT value FROM json_each(?1))
                       AND (?3 IS NULL OR t.phone_key = ?3)
                 )
                 SELECT l.phone_key, l.channel_id, l.phone_raw, l.direction, l.body, l.at,
                        (SELECT m.display_name FROM messages m
                         WHERE m.phone_key = l.phone_key AND m.channel_id = l.channel_id
                           AND m.display_name IS NOT NULL AND m.display_name <> ''
                         ORDER BY m.at DESC, m.id DESC LIMIT 1) AS display_name
                 FROM latest l
                 LEFT JOIN blocks b
                        ON b.phone_key = l.phone_key AND b.channel_id = l.channel_id
                 WHERE l.rn = 1
                   AND (?2 IS NULL OR l.at >= ?2)
                   AND (?4 = 0 OR l.direction = 'inbound')
                   AND (b.phone_key IS NULL OR EXISTS (
                           SELECT 1 FROM messages mi
                           WHERE mi.phone_key = l.phone_key AND mi.channel_id = l.channel_id
                             AND mi.direction = 'inbound' AND mi.at > b.blocked_at))
                   AND (?5 = 1 OR NOT EXISTS (
                           SELECT 1 FROM assignments a
                           WHERE a.phone_key = l.phone_key AND a.channel_id = l.channel_id
                             AND a.ended_at IS NULL))
                 ORDER BY (l.direction = 'inbound') DESC, l.at DESC,
                          l.phone_key, l.channel_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![channels, since, phone_key, inbound_only, include_assigned],
                |row| {
                    Ok(Candidate {
                        key: key_at(row, 0)?,
                        phone_raw: row.get(2)?,
                        direction: enum_at::<Direction>(row, 3)?,
                        last_message: row.get(4)?,
                        last_message_at: timestamp_at(row, 5)?,
                        display_name: row.get(6)?,
                    })
                },
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent message of a conversation across all logs.
pub async fn last_message(
    db: &Database,
    key: &ConversationKey,
) -> Result<Option<LastMessage>, AtriumError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| -> Result<Option<LastMessage>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT body, at, direction FROM ({TIMELINE_UNION})
                     WHERE phone_key = ?1 AND channel_id = ?2
                     ORDER BY {NEWEST_FIRST} LIMIT 1"
                ),
                params![key.phone_key.as_str(), key.channel],
                |row| {
                    Ok(LastMessage {
                        text: row.get(0)?,
                        at: timestamp_at(row, 1)?,
                        direction: enum_at::<Direction>(row, 2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// The `limit` most recent timeline entries of a conversation, oldest first.
pub async fn history(
    db: &Database,
    key: &ConversationKey,
    limit: u32,
) -> Result<Vec<TimelineEntry>, AtriumError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<TimelineEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT at, direction, source, body, phone_raw FROM ({TIMELINE_UNION})
                 WHERE phone_key = ?1 AND channel_id = ?2
                 ORDER BY {NEWEST_FIRST} LIMIT ?3"
            ))?;
            let mut entries = stmt
                .query_map(params![key.phone_key.as_str(), key.channel, limit], |row| {
                    Ok(TimelineEntry {
                        at: timestamp_at(row, 0)?,
                        direction: enum_at::<Direction>(row, 1)?,
                        source: enum_at::<MessageSource>(row, 2)?,
                        text: row.get(3)?,
                        phone_raw: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            entries.reverse();
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent customer-provided name for a conversation.
pub async fn display_name(
    db: &Database,
    key: &ConversationKey,
) -> Result<Option<String>, AtriumError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT display_name FROM messages
                 WHERE phone_key = ?1 AND channel_id = ?2
                   AND display_name IS NOT NULL AND display_name <> ''
                 ORDER BY at DESC, id DESC LIMIT 1",
                params![key.phone_key.as_str(), key.channel],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn append_message(db: &Database, message: &NewMessage) -> Result<i64, AtriumError> {
    let m = message.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO messages
                     (phone_key, channel_id, phone_raw, direction, body, display_name,
                      provider_message_id, at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    m.key.phone_key.as_str(),
                    m.key.channel,
                    m.phone_raw,
                    m.direction.to_string(),
                    m.text,
                    m.display_name,
                    m.provider_message_id,
                    format_timestamp(m.at),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn append_campaign_send(
    db: &Database,
    send: &NewCampaignSend,
) -> Result<i64, AtriumError> {
    let s = send.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO campaign_sends
                     (campaign, work_group, phone_key, channel_id, phone_raw, status, body, at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    s.campaign,
                    s.work_group,
                    s.key.phone_key.as_str(),
                    s.key.channel,
                    s.phone_raw,
                    s.status,
                    s.text,
                    format_timestamp(s.at),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn append_adhoc(db: &Database, message: &NewAdhocMessage) -> Result<i64, AtriumError> {
    let m = message.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO adhoc_messages
                     (sender_name, phone_key, channel_id, phone_raw, body, status,
                      provider_message_id, at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    m.sender_name,
                    m.key.phone_key.as_str(),
                    m.key.channel,
                    m.phone_raw,
                    m.text,
                    m.status,
                    m.provider_message_id,
                    format_timestamp(m.at),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::blocks::upsert_block;
    use atrium_core::types::{AgentCode, BlockRecord, CloseReason};
    use atrium_core::PhoneKey;
    use chrono::{DateTime, Duration, Utc};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn key(phone: &str, channel: &str) -> ConversationKey {
        ConversationKey::new(PhoneKey(phone.to_string()), channel)
    }

    async fn message(
        db: &Database,
        key: &ConversationKey,
        direction: Direction,
        text: &str,
        name: Option<&str>,
        at: DateTime<Utc>,
    ) {
        append_message(
            db,
            &NewMessage {
                key: key.clone(),
                phone_raw: key.phone_key.to_string(),
                direction,
                text: text.to_string(),
                display_name: name.map(|n| n.to_string()),
                provider_message_id: None,
                at,
            },
        )
        .await
        .unwrap();
    }

    async fn campaign(db: &Database, key: &ConversationKey, at: DateTime<Utc>) {
        append_campaign_send(
            db,
            &NewCampaignSend {
                campaign: "spring".to_string(),
                work_group: "support".to_string(),
                key: key.clone(),
                phone_raw: key.phone_key.to_string(),
                status: "sent".to_string(),
                text: "Spring offer".to_string(),
                at,
            },
        )
        .await
        .unwrap();
    }

    fn query(channels: &[&str], since: Option<DateTime<Utc>>) -> CandidateQuery {
        CandidateQuery {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            since,
            ..CandidateQuery::default()
        }
    }

    #[tokio::test]
    async fn inbound_outranks_fresher_outbound() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        let c1 = key("551100000001", "line-1");
        let c2 = key("551100000002", "line-1");

        message(&db, &c1, Direction::Inbound, "help", Some("Carla"), now - Duration::minutes(30)).await;
        campaign(&db, &c2, now - Duration::minutes(1)).await;

        let found = candidates_for(&db, &query(&["line-1"], Some(now - Duration::hours(24))))
            .await
            .unwrap();
        let keys: Vec<_> = found.iter().map(|c| c.key.clone()).collect();
        assert_eq!(keys, vec![c1, c2]);
        assert_eq!(found[0].display_name.as_deref(), Some("Carla"));
        assert_eq!(found[1].direction, Direction::Outbound);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_millisecond_prefers_the_inbound_message() {
        let (db, _dir) = setup_db().await;
        let at = Utc::now() - Duration::minutes(3);
        let before = key("551100000001", "line-1");
        let after = key("551100000002", "line-1");

        // Insertion order must not matter.
        campaign(&db, &before, at).await;
        message(&db, &before, Direction::Inbound, "oi", None, at).await;
        message(&db, &after, Direction::Inbound, "oi", None, at).await;
        campaign(&db, &after, at).await;

        for k in [&before, &after] {
            let mut q = query(&["line-1"], None);
            q.phone_key = Some(k.phone_key.clone());
            let found = candidates_for(&db, &q).await.unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].direction, Direction::Inbound);
            assert_eq!(found[0].last_message, "oi");

            let last = last_message(&db, k).await.unwrap().unwrap();
            assert_eq!(last.direction, Direction::Inbound);
            let sources: Vec<_> = history(&db, k, 10).await.unwrap().iter().map(|e| e.source).collect();
            assert_eq!(sources, vec![MessageSource::Campaign, MessageSource::Message]);
        }
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recency_window_and_channel_filter() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();

        message(&db, &key("551100000001", "line-1"), Direction::Inbound, "old", None, now - Duration::hours(30)).await;
        message(&db, &key("551100000002", "line-2"), Direction::Inbound, "other line", None, now).await;
        message(&db, &key("551100000003", "line-1"), Direction::Inbound, "fresh", None, now).await;

        let found = candidates_for(&db, &query(&["line-1"], Some(now - Duration::hours(24))))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].last_message, "fresh");

        let unbounded = candidates_for(&db, &query(&["line-1"], None)).await.unwrap();
        assert_eq!(unbounded.len(), 2);

        assert!(candidates_for(&db, &query(&[], None)).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn block_holds_until_newer_inbound() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        let k = key("551100000001", "line-1");

        message(&db, &k, Direction::Inbound, "first", None, now - Duration::minutes(10)).await;
        upsert_block(
            &db,
            &BlockRecord {
                key: k.clone(),
                blocked_at: now - Duration::minutes(5),
                reason: CloseReason::Resolved,
                agent: AgentCode(1),
            },
        )
        .await
        .unwrap();

        // An outbound message after the block does not lift it.
        campaign(&db, &k, now - Duration::minutes(2)).await;
        assert!(candidates_for(&db, &query(&["line-1"], None)).await.unwrap().is_empty());

        message(&db, &k, Direction::Inbound, "again", None, now).await;
        let found = candidates_for(&db, &query(&["line-1"], None)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].last_message, "again");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn phone_and_direction_filters() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        let inbound = key("551100000001", "line-1");
        let outbound = key("551100000002", "line-1");
        message(&db, &inbound, Direction::Inbound, "hi", None, now).await;
        campaign(&db, &outbound, now).await;

        let mut q = query(&["line-1"], None);
        q.inbound_only = true;
        let found = candidates_for(&db, &q).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, inbound);

        let mut q = query(&["line-1"], None);
        q.phone_key = Some(outbound.phone_key.clone());
        let found = candidates_for(&db, &q).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, outbound);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn history_merges_all_logs_in_order() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        let k = key("551100000001", "line-1");

        campaign(&db, &k, now - Duration::minutes(20)).await;
        message(&db, &k, Direction::Inbound, "interested", Some("Davi"), now - Duration::minutes(10)).await;
        append_adhoc(
            &db,
            &NewAdhocMessage {
                sender_name: "Ana".to_string(),
                key: k.clone(),
                phone_raw: "5511900000001".to_string(),
                text: "Great, let me help".to_string(),
                status: "sent".to_string(),
                provider_message_id: Some("wamid.1".to_string()),
                at: now - Duration::minutes(5),
            },
        )
        .await
        .unwrap();

        let entries = history(&db, &k, 50).await.unwrap();
        let sources: Vec<_> = entries.iter().map(|e| e.source).collect();
        assert_eq!(
            sources,
            vec![MessageSource::Campaign, MessageSource::Message, MessageSource::Adhoc]
        );

        let recent = history(&db, &k, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].text, "interested");

        let last = last_message(&db, &k).await.unwrap().unwrap();
        assert_eq!(last.text, "Great, let me help");
        assert_eq!(last.direction, Direction::Outbound);

        assert_eq!(display_name(&db, &k).await.unwrap().as_deref(), Some("Davi"));
        assert!(display_name(&db, &key("551100000009", "line-1")).await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
