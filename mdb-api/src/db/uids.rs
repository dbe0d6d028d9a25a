//! Free UID allocation

use mdb_common::uid_utils;
use sqlx::SqliteConnection;

use crate::error::{ApiError, ApiResult};

/// Attempts before giving up on finding a free UID
pub const MAX_UID_ATTEMPTS: usize = 100;

/// Entity tables carrying a UID column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UidTable {
    Files,
    Operations,
    ContentUnits,
    Collections,
    Sources,
    Tags,
    Persons,
}

impl UidTable {
    pub fn table_name(self) -> &'static str {
        match self {
            UidTable::Files => "files",
            UidTable::Operations => "operations",
            UidTable::ContentUnits => "content_units",
            UidTable::Collections => "collections",
            UidTable::Sources => "sources",
            UidTable::Tags => "tags",
            UidTable::Persons => "persons",
        }
    }
}

/// Check whether `uid` is already taken in `table`
pub async fn uid_exists(conn: &mut SqliteConnection, table: UidTable, uid: &str) -> ApiResult<bool> {
    let exists: bool = sqlx::query_scalar(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE uid = ?)",
        table.table_name()
    ))
    .bind(uid)
    .fetch_one(&mut *conn)
    .await?;

    Ok(exists)
}

/// Generate a UID not yet used in `table`
///
/// The check-then-insert is not atomic; a concurrent writer taking the same
/// UID surfaces as a uniqueness violation on insert.
pub async fn get_free_uid(conn: &mut SqliteConnection, table: UidTable) -> ApiResult<String> {
    for attempt in 0..MAX_UID_ATTEMPTS {
        let uid = uid_utils::generate(uid_utils::UID_LENGTH);
        if !uid_exists(conn, table, &uid).await? {
            return Ok(uid);
        }
        tracing::warn!(table = table.table_name(), attempt, "UID collision, retrying");
    }

    Err(ApiError::UidExhausted {
        table: table.table_name(),
    })
}
