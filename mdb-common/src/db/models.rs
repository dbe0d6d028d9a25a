//! Content graph row models

use crate::properties::{self, Properties};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

fn props_column(row: &SqliteRow) -> Result<Option<Properties>> {
    let raw: Option<String> = row.try_get("properties")?;
    Ok(properties::from_column(raw)?)
}

/// Physical or logical media artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
    pub id: i64,
    pub uid: String,
    pub name: String,
    /// SHA-1 content hash (20 bytes)
    pub sha1: Option<Vec<u8>>,
    pub size: i64,
    pub file_type: String,
    pub sub_type: String,
    pub mime_type: Option<String>,
    pub language: Option<String>,
    /// Creation time reported by the producing device
    pub file_created_at: Option<DateTime<Utc>>,
    pub parent_id: Option<i64>,
    pub content_unit_id: Option<i64>,
    pub published: bool,
    pub properties: Option<Properties>,
    pub created_at: DateTime<Utc>,
}

impl File {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            uid: row.try_get("uid")?,
            name: row.try_get("name")?,
            sha1: row.try_get("sha1")?,
            size: row.try_get("size")?,
            file_type: row.try_get("type")?,
            sub_type: row.try_get("sub_type")?,
            mime_type: row.try_get("mime_type")?,
            language: row.try_get("language")?,
            file_created_at: row.try_get("file_created_at")?,
            parent_id: row.try_get("parent_id")?,
            content_unit_id: row.try_get("content_unit_id")?,
            published: row.try_get("published")?,
            properties: props_column(row)?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Lowercase hex of the content hash, if any
    pub fn sha1_hex(&self) -> Option<String> {
        self.sha1
            .as_ref()
            .map(hex::encode)
    }
}

/// Recorded pipeline step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub id: i64,
    pub uid: String,
    pub type_id: i64,
    pub station: Option<String>,
    pub user_id: Option<i64>,
    pub properties: Option<Properties>,
    pub created_at: DateTime<Utc>,
}

impl Operation {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            uid: row.try_get("uid")?,
            type_id: row.try_get("type_id")?,
            station: row.try_get("station")?,
            user_id: row.try_get("user_id")?,
            properties: props_column(row)?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Cataloged unit of content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentUnit {
    pub id: i64,
    pub uid: String,
    pub type_id: i64,
    pub published: bool,
    pub properties: Option<Properties>,
    pub created_at: DateTime<Utc>,
}

impl ContentUnit {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            uid: row.try_get("uid")?,
            type_id: row.try_get("type_id")?,
            published: row.try_get("published")?,
            properties: props_column(row)?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Grouping of content units sharing a production context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    pub id: i64,
    pub uid: String,
    pub type_id: i64,
    pub published: bool,
    pub properties: Option<Properties>,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            uid: row.try_get("uid")?,
            type_id: row.try_get("type_id")?,
            published: row.try_get("published")?,
            properties: props_column(row)?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Labeled membership of a content unit in a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionsContentUnit {
    pub collection_id: i64,
    pub content_unit_id: i64,
    pub name: String,
    pub position: i64,
}

impl CollectionsContentUnit {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            collection_id: row.try_get("collection_id")?,
            content_unit_id: row.try_get("content_unit_id")?,
            name: row.try_get("name")?,
            position: row.try_get("position")?,
        })
    }
}

/// Node of the source hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub id: i64,
    pub uid: String,
    pub parent_id: Option<i64>,
    pub name: String,
}

impl Source {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            uid: row.try_get("uid")?,
            parent_id: row.try_get("parent_id")?,
            name: row.try_get("name")?,
        })
    }
}

/// Node of the tag hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: i64,
    pub uid: String,
    pub parent_id: Option<i64>,
    pub name: String,
}

impl Tag {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            uid: row.try_get("uid")?,
            parent_id: row.try_get("parent_id")?,
            name: row.try_get("name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub full_name: Option<String>,
}

impl Author {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            full_name: row.try_get("full_name")?,
        })
    }
}
