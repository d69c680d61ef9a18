use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{AuditSink, AuditStore};
use crate::event::ChatIdentity;
use crate::orchestrator::AuditFields;

/// One processed message as persisted in the `chats` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub message_type: String,
    pub message_content: String,
    pub reply_message: String,
    pub download_file: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Stamped with the current time; build it right before writing.
    pub fn new(identity: &ChatIdentity, fields: AuditFields) -> Self {
        Self {
            chat_id: identity.chat_id,
            username: identity.username.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            message_type: fields.message_type.as_str().to_string(),
            message_content: fields.message_content,
            reply_message: fields.reply_message,
            download_file: fields.download_file,
            timestamp: Utc::now(),
        }
    }
}

/// A record read back with its row id.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: AuditRecord,
}

impl AuditStore {
    /// Most recent records first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<StoredRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, username, first_name, last_name, message_type,
                    message_content, reply_message, download_file, timestamp
             FROM chats
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let records = stmt
            .query_map(rusqlite::params![limit as i64], parse_record_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to load audit records")?;

        Ok(records)
    }

    #[cfg(test)]
    pub async fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chats", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl AuditSink for AuditStore {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO chats (chat_id, username, first_name, last_name, message_type,
                                message_content, reply_message, download_file, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                record.chat_id,
                record.username,
                record.first_name,
                record.last_name,
                record.message_type,
                record.message_content,
                record.reply_message,
                record.download_file,
                record.timestamp,
            ],
        )
        .context("Failed to append audit record")?;
        Ok(())
    }
}

fn parse_record_row(row: &rusqlite::Row) -> rusqlite::Result<StoredRecord> {
    Ok(StoredRecord {
        id: row.get(0)?,
        record: AuditRecord {
            chat_id: row.get(1)?,
            username: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            message_type: row.get(5)?,
            message_content: row.get(6)?,
            reply_message: row.get(7)?,
            download_file: row.get(8)?,
            timestamp: row.get(9)?,
        },
    })
}
