//! Fixed lookup registries
//!
//! Operation types, content types, content roles and distinguished persons
//! live in database tables seeded at initialization. They are read once at
//! startup into an immutable [`Registries`] value that is passed explicitly
//! to every component, together with the static language, media type and
//! part-type tables.

use crate::languages::LanguageTable;
use crate::media_types::MediaTypeTable;
use crate::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::fmt;

/// Pipeline operation kinds (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CaptureStart,
    CaptureStop,
    Demux,
    Trim,
    Send,
    Convert,
    Upload,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::CaptureStart,
        OperationKind::CaptureStop,
        OperationKind::Demux,
        OperationKind::Trim,
        OperationKind::Send,
        OperationKind::Convert,
        OperationKind::Upload,
    ];

    /// Registry name of this kind
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::CaptureStart => "capture_start",
            OperationKind::CaptureStop => "capture_stop",
            OperationKind::Demux => "demux",
            OperationKind::Trim => "trim",
            OperationKind::Send => "send",
            OperationKind::Convert => "convert",
            OperationKind::Upload => "upload",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Content type names
pub mod content_types {
    pub const DAILY_LESSON: &str = "DAILY_LESSON";
    pub const SATURDAY_LESSON: &str = "SATURDAY_LESSON";
    pub const SPECIAL_LESSON: &str = "SPECIAL_LESSON";
    pub const FRIENDS_GATHERINGS: &str = "FRIENDS_GATHERINGS";
    pub const VIDEO_PROGRAM: &str = "VIDEO_PROGRAM";
    pub const LECTURE_SERIES: &str = "LECTURE_SERIES";
    pub const CONGRESS: &str = "CONGRESS";
    pub const HOLIDAY: &str = "HOLIDAY";
    pub const LESSON_PART: &str = "LESSON_PART";
    pub const LECTURE: &str = "LECTURE";
    pub const CHILDREN_LESSON: &str = "CHILDREN_LESSON";
    pub const WOMEN_LESSON: &str = "WOMEN_LESSON";
    pub const VIRTUAL_LESSON: &str = "VIRTUAL_LESSON";
    pub const FRIENDS_GATHERING: &str = "FRIENDS_GATHERING";
    pub const MEAL: &str = "MEAL";
    pub const VIDEO_PROGRAM_CHAPTER: &str = "VIDEO_PROGRAM_CHAPTER";
    pub const FULL_LESSON: &str = "FULL_LESSON";
    pub const EVENT_PART: &str = "EVENT_PART";
    pub const CLIP: &str = "CLIP";
    pub const TEXT: &str = "TEXT";
    pub const UNKNOWN: &str = "UNKNOWN";

    pub const ALL: &[&str] = &[
        DAILY_LESSON,
        SATURDAY_LESSON,
        SPECIAL_LESSON,
        FRIENDS_GATHERINGS,
        VIDEO_PROGRAM,
        LECTURE_SERIES,
        CONGRESS,
        HOLIDAY,
        LESSON_PART,
        LECTURE,
        CHILDREN_LESSON,
        WOMEN_LESSON,
        VIRTUAL_LESSON,
        FRIENDS_GATHERING,
        MEAL,
        VIDEO_PROGRAM_CHAPTER,
        FULL_LESSON,
        EVENT_PART,
        CLIP,
        TEXT,
        UNKNOWN,
    ];
}

/// Content role names
pub mod content_roles {
    pub const LECTURER: &str = "LECTURER";
    pub const TRANSLATOR: &str = "TRANSLATOR";

    pub const ALL: &[&str] = &[LECTURER, TRANSLATOR];
}

/// Lecturer pattern of the distinguished person linked by metadata processing
pub const P_RAV: &str = "rav";

/// UID of the seeded distinguished person
pub const P_RAV_UID: &str = "abcdefgh";

/// Collection membership label prefixes, indexed by `part_type - 3`
pub const PART_TYPE_LABELS: &[&str] = &["ceremony_", "speech_", "reading_", "song_", "discussion_"];

/// Name ↔ id lookup over one registry table
#[derive(Debug, Clone, Default)]
pub struct NamedRegistry {
    by_name: HashMap<String, i64>,
    by_id: HashMap<i64, String>,
}

impl NamedRegistry {
    /// Load every `(id, name)` row of `table`
    pub async fn load(pool: &SqlitePool, table: &str) -> Result<Self> {
        let rows = sqlx::query(&format!("SELECT id, name FROM {} ORDER BY id", table))
            .fetch_all(pool)
            .await?;

        let mut registry = Self::default();
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let name: String = row.try_get("name")?;
            registry.insert(id, name);
        }

        Ok(registry)
    }

    pub fn insert(&mut self, id: i64, name: String) {
        self.by_id.insert(id, name.clone());
        self.by_name.insert(name, id);
    }

    pub fn id(&self, name: &str) -> Option<i64> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: i64) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// All fixed lookup tables, constructed once at startup
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub operation_types: NamedRegistry,
    pub content_types: NamedRegistry,
    pub content_roles: NamedRegistry,
    /// Person id by lecturer pattern
    pub persons: HashMap<String, i64>,
    pub languages: LanguageTable,
    pub media_types: MediaTypeTable,
    pub part_type_labels: Vec<&'static str>,
}

impl Registries {
    /// Read the registry tables from the database
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let operation_types = NamedRegistry::load(pool, "operation_types").await?;
        let content_types = NamedRegistry::load(pool, "content_types").await?;
        let content_roles = NamedRegistry::load(pool, "content_role_types").await?;

        let mut persons: HashMap<String, i64> = HashMap::new();
        let rows = sqlx::query("SELECT id, pattern FROM persons WHERE pattern IS NOT NULL")
            .fetch_all(pool)
            .await?;
        for row in rows {
            persons.insert(row.try_get::<String, _>("pattern")?, row.try_get("id")?);
        }

        tracing::info!(
            operation_types = operation_types.len(),
            content_types = content_types.len(),
            content_roles = content_roles.len(),
            persons = persons.len(),
            "Registries loaded"
        );

        Ok(Self {
            operation_types,
            content_types,
            content_roles,
            persons,
            languages: LanguageTable::default(),
            media_types: MediaTypeTable::default(),
            part_type_labels: PART_TYPE_LABELS.to_vec(),
        })
    }

    pub fn operation_type_id(&self, kind: OperationKind) -> Option<i64> {
        self.operation_types.id(kind.name())
    }
}
