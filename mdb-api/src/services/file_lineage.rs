//! File lineage tracking
//!
//! Creates and updates File nodes from producer-side descriptors:
//! validates and standardizes the language, complements type/sub_type from
//! the mime type, and wires the parent edge.

use mdb_common::db::File;
use mdb_common::languages::LANG_UNKNOWN;
use mdb_common::properties::Properties;
use mdb_common::Registries;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::db::files::{self as files_db, NewFile};
use crate::db::uids::{get_free_uid, UidTable};
use crate::error::{ApiError, ApiResult};
use crate::models::FileDescriptor;

/// Length of a SHA-1 digest in bytes
pub const SHA1_LEN: usize = 20;

/// Decode a hex content hash; an empty string means "no hash"
pub fn parse_sha1(sha1: &str) -> ApiResult<Option<Vec<u8>>> {
    if sha1.is_empty() {
        return Ok(None);
    }

    let bytes = hex::decode(sha1).map_err(|_| ApiError::InvalidSha1(sha1.to_string()))?;
    if bytes.len() != SHA1_LEN {
        return Err(ApiError::InvalidSha1(sha1.to_string()));
    }

    Ok(Some(bytes))
}

/// Standardize a descriptor's language tag
///
/// Empty stays unset. The unknown-language sentinel itself is accepted;
/// any other tag that does not standardize is rejected.
pub fn normalize_language(registries: &Registries, language: &str) -> ApiResult<Option<String>> {
    if language.is_empty() {
        return Ok(None);
    }

    let code = registries.languages.std_lang(language);
    if code == LANG_UNKNOWN && language != LANG_UNKNOWN {
        return Err(ApiError::UnknownLanguage(language.to_string()));
    }

    Ok(Some(code.to_string()))
}

/// Complement missing type and sub_type from the mime type
fn classify(
    registries: &Registries,
    file_type: &str,
    sub_type: &str,
    mime_type: Option<&str>,
) -> (String, String) {
    if file_type.is_empty() && sub_type.is_empty() {
        if let Some(mt) = mime_type.and_then(|m| registries.media_types.by_mime(m)) {
            return (mt.file_type.to_string(), mt.sub_type.to_string());
        }
    }

    (file_type.to_string(), sub_type.to_string())
}

/// Build the column values of a new file (UID not yet allocated)
pub fn make_file(
    registries: &Registries,
    parent: Option<&File>,
    descriptor: &FileDescriptor,
    properties: Option<Properties>,
) -> ApiResult<NewFile> {
    let sha1 = parse_sha1(&descriptor.sha1)?;
    let language = normalize_language(registries, &descriptor.language)?;
    let mime_type = descriptor.mime_type.clone().filter(|m| !m.is_empty());
    let (file_type, sub_type) = classify(
        registries,
        &descriptor.file_type,
        &descriptor.sub_type,
        mime_type.as_deref(),
    );

    Ok(NewFile {
        uid: String::new(),
        name: descriptor.file_name.clone(),
        sha1,
        size: descriptor.size,
        file_type,
        sub_type,
        mime_type,
        language,
        file_created_at: descriptor.created_at,
        parent_id: parent.map(|p| p.id),
        content_unit_id: parent.and_then(|p| p.content_unit_id),
        properties: properties.filter(|p| !p.is_empty()),
    })
}

/// Create a file, optionally as a child of `parent`
///
/// A child starts out owned by its parent's content unit.
pub async fn create_file(
    conn: &mut SqliteConnection,
    registries: &Registries,
    parent: Option<&File>,
    descriptor: &FileDescriptor,
    properties: Option<Properties>,
) -> ApiResult<File> {
    let mut new_file = make_file(registries, parent, descriptor, properties)?;
    new_file.uid = get_free_uid(conn, UidTable::Files).await?;

    let file = files_db::insert_file(conn, &new_file).await?;
    debug!(
        file_id = file.id,
        uid = %file.uid,
        parent_id = ?file.parent_id,
        "Created file"
    );

    Ok(file)
}

/// Re-derive the descriptor fields of an existing file, then merge properties
///
/// Name, classification and mime type are replaced. Language and producer
/// timestamp are replaced when the descriptor carries them. Parent, hash,
/// size and unit ownership are kept.
pub async fn update_file(
    conn: &mut SqliteConnection,
    registries: &Registries,
    file: &mut File,
    descriptor: &FileDescriptor,
    properties: Option<&Properties>,
) -> ApiResult<()> {
    let language = normalize_language(registries, &descriptor.language)?;
    let mime_type = descriptor.mime_type.clone().filter(|m| !m.is_empty());
    let (file_type, sub_type) = classify(
        registries,
        &descriptor.file_type,
        &descriptor.sub_type,
        mime_type.as_deref(),
    );

    file.name = descriptor.file_name.clone();
    file.file_type = file_type;
    file.sub_type = sub_type;
    file.mime_type = mime_type;
    if language.is_some() {
        file.language = language;
    }
    if descriptor.created_at.is_some() {
        file.file_created_at = descriptor.created_at;
    }

    files_db::update_file_descriptor(conn, file).await?;
    if let Some(props) = properties {
        files_db::update_file_properties(conn, file, props).await?;
    }

    debug!(file_id = file.id, name = %file.name, "Updated file");
    Ok(())
}

/// Resolve a file by its hex content hash
pub async fn find_file_by_sha1(conn: &mut SqliteConnection, sha1: &str) -> ApiResult<File> {
    debug!(sha1, "Looking up file");
    let bytes = parse_sha1(sha1)?.ok_or_else(|| ApiError::InvalidSha1(sha1.to_string()))?;

    files_db::find_file_by_sha1(conn, &bytes)
        .await?
        .ok_or_else(|| ApiError::FileNotFound {
            sha1: sha1.to_string(),
        })
}
