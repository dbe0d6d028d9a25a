//! Collection reconciliation
//!
//! Finds or creates the Collection owning a freshly identified unit and
//! computes the unit's membership label within it.
//!
//! Lesson parts and full lessons carry no explicit collection reference.
//! They are tied together through the capture id recorded on the
//! capture_stop operation that produced their original file: the first unit
//! of a capture creates the collection and stores the capture id on it, and
//! later units of the same capture find it there.

use mdb_common::db::{Collection, File};
use mdb_common::properties::Properties;
use mdb_common::registry::{content_types, OperationKind};
use mdb_common::Registries;
use serde_json::Value;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use super::up_chain::find_up_chain_operation;
use crate::db::collections as collections_db;
use crate::db::uids::{get_free_uid, UidTable};
use crate::error::{ApiError, ApiResult};
use crate::models::CITMetadata;

/// Membership label used for a full lesson inside its daily/Saturday collection
pub const FULL_LESSON_LABEL: &str = "full";

/// Registry id of a content type name
pub fn content_type_id(registries: &Registries, name: &str) -> ApiResult<i64> {
    registries
        .content_types
        .id(name)
        .ok_or_else(|| ApiError::UnknownRegistryEntry {
            registry: "content type",
            name: name.to_string(),
        })
}

/// Create a collection of the given content type
pub async fn create_collection(
    conn: &mut SqliteConnection,
    registries: &Registries,
    content_type: &str,
    props: Option<&Properties>,
) -> ApiResult<Collection> {
    let type_id = content_type_id(registries, content_type)?;
    let uid = get_free_uid(conn, UidTable::Collections).await?;

    let collection = collections_db::insert_collection(conn, &uid, type_id, props).await?;
    info!(
        collection_id = collection.id,
        uid = %collection.uid,
        content_type,
        "Created collection"
    );

    Ok(collection)
}

/// Capture id hint recorded on a capture_stop operation
///
/// Only non-empty strings and numbers are usable reconciliation keys.
fn capture_id_hint(props: Option<&Properties>) -> Option<&Value> {
    let hint = props?.get("collection_uid")?;
    match hint {
        Value::String(s) if !s.is_empty() => Some(hint),
        Value::Number(_) => Some(hint),
        _ => None,
    }
}

/// Find the collection a unit belongs to, creating or promoting it as needed
///
/// `base_props` are the unit's date properties; they are carried onto a
/// collection created or promoted here. Returns `None` when the unit has no
/// collection.
pub async fn reconcile(
    conn: &mut SqliteConnection,
    registries: &Registries,
    original: &File,
    metadata: &CITMetadata,
    base_props: &Properties,
) -> ApiResult<Option<Collection>> {
    if let Some(uid) = metadata.collection_uid.as_deref() {
        return collections_db::find_collection_by_uid(conn, uid)
            .await?
            .map(Some)
            .ok_or_else(|| ApiError::CollectionNotFound {
                uid: uid.to_string(),
            });
    }

    let ct = metadata.content_type.as_str();
    if ct != content_types::LESSON_PART && ct != content_types::FULL_LESSON {
        return Ok(None);
    }

    let capture_stop =
        match find_up_chain_operation(conn, registries, original.id, OperationKind::CaptureStop)
            .await
        {
            Ok(op) => op,
            Err(e @ ApiError::UpChainOperationNotFound { .. }) => {
                warn!(file_id = original.id, "{}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

    let capture_id = match capture_id_hint(capture_stop.properties.as_ref()) {
        Some(v) => v.clone(),
        None => {
            warn!(
                operation_id = capture_stop.id,
                "No usable collection_uid in capture_stop properties"
            );
            return Ok(None);
        }
    };

    let decided_type = if metadata.week_date.is_some() {
        content_types::SATURDAY_LESSON
    } else {
        content_types::DAILY_LESSON
    };

    let mut props = base_props.clone();
    props.insert("capture_id".to_string(), capture_id.clone());
    if let Some(number) = metadata.number {
        props.insert("number".to_string(), Value::from(number));
    }

    match collections_db::find_collection_by_capture_id(conn, &capture_id).await? {
        None => {
            let collection = create_collection(conn, registries, decided_type, Some(&props)).await?;
            Ok(Some(collection))
        }
        Some(mut collection) => {
            if ct == content_types::FULL_LESSON {
                let type_id = content_type_id(registries, decided_type)?;
                if collection.type_id != type_id {
                    info!(
                        collection_id = collection.id,
                        content_type = decided_type,
                        "Promoting collection"
                    );
                    collections_db::update_collection_type(conn, &mut collection, type_id).await?;
                }
                collections_db::update_collection_properties(conn, &mut collection, &props).await?;
            }
            Ok(Some(collection))
        }
    }
}

/// Membership label of a unit within `collection`, by the unit's content type
pub fn membership_label(
    registries: &Registries,
    metadata: &CITMetadata,
    collection: &Collection,
) -> String {
    let number = || metadata.number.map(|n| n.to_string()).unwrap_or_default();

    match metadata.content_type.as_str() {
        content_types::FULL_LESSON => {
            let lesson_types = [content_types::DAILY_LESSON, content_types::SATURDAY_LESSON];
            let is_lesson = lesson_types
                .iter()
                .any(|t| registries.content_types.id(t) == Some(collection.type_id));
            if is_lesson {
                FULL_LESSON_LABEL.to_string()
            } else {
                number()
            }
        }
        content_types::LESSON_PART => metadata.part.map(|p| p.to_string()).unwrap_or_default(),
        content_types::VIDEO_PROGRAM_CHAPTER => metadata.episode.clone().unwrap_or_default(),
        _ => {
            let label = number();
            match metadata.part_type {
                Some(pt) if pt > 2 => {
                    let prefix = usize::try_from(pt - 3)
                        .ok()
                        .and_then(|idx| registries.part_type_labels.get(idx));
                    match prefix {
                        Some(prefix) => format!("{}{}", prefix, label),
                        None => {
                            warn!(part_type = pt, "Unknown event part type");
                            label
                        }
                    }
                }
                _ => label,
            }
        }
    }
}
