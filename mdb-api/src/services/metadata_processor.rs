//! Metadata processing
//!
//! Turns the content identification metadata sent with a final
//! original/proxy pair into catalog structure: date properties, language,
//! the owning content unit, its sources/tags/persons and its collection
//! membership. Runs inside the caller's transaction.

use mdb_common::db::{ContentUnit, File};
use mdb_common::languages::{LANG_MULTI, LANG_UNKNOWN};
use mdb_common::properties::{self, Properties};
use mdb_common::registry::{content_roles, P_RAV};
use mdb_common::Registries;
use serde_json::json;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use super::collection_reconciler::{content_type_id, membership_label, reconcile};
use super::up_chain::find_file_ancestors;
use crate::db::uids::{get_free_uid, UidTable};
use crate::db::{
    catalog, collections as collections_db, content_units as units_db, files as files_db,
};
use crate::error::{ApiError, ApiResult};
use crate::models::CITMetadata;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// `capture_date` and `film_date` as a property bag
pub fn date_properties(metadata: &CITMetadata) -> Properties {
    properties::props(json!({
        "capture_date": metadata.capture_date.format(DATE_FORMAT).to_string(),
        "film_date": metadata.film_date().format(DATE_FORMAT).to_string(),
    }))
}

/// Language of the original: multi when translated, else the standardized tag
pub fn original_language(registries: &Registries, metadata: &CITMetadata) -> &'static str {
    if metadata.has_translation {
        return LANG_MULTI;
    }

    let code = registries.languages.std_lang(&metadata.language);
    if code == LANG_UNKNOWN {
        warn!(language = %metadata.language, "Unknown language in metadata");
    }
    code
}

/// Find the unit created earlier for this original/proxy pair, or create it
async fn find_or_create_unit(
    conn: &mut SqliteConnection,
    registries: &Registries,
    metadata: &CITMetadata,
    original: &File,
    proxy: &File,
    date_props: &Properties,
) -> ApiResult<ContentUnit> {
    let type_id = content_type_id(registries, &metadata.content_type)?;

    let mut props = date_props.clone();
    props.insert("original_uid".to_string(), json!(original.uid));
    props.insert("proxy_uid".to_string(), json!(proxy.uid));

    match units_db::find_content_unit_by_files(conn, &original.uid, &proxy.uid).await? {
        Some(mut unit) => {
            debug!(content_unit_id = unit.id, "Reusing content unit of file pair");
            if unit.type_id != type_id {
                units_db::update_content_unit_type(conn, &mut unit, type_id).await?;
            }
            units_db::update_content_unit_properties(conn, &mut unit, &props).await?;
            Ok(unit)
        }
        None => {
            let uid = get_free_uid(conn, UidTable::ContentUnits).await?;
            let unit = units_db::insert_content_unit(conn, &uid, type_id, Some(&props)).await?;
            info!(
                content_unit_id = unit.id,
                uid = %unit.uid,
                content_type = %metadata.content_type,
                "Created content unit"
            );
            Ok(unit)
        }
    }
}

/// Attach the files of a unit: the pair, and for main artifacts the whole
/// capture lineage above the original
async fn associate_files(
    conn: &mut SqliteConnection,
    metadata: &CITMetadata,
    unit: &ContentUnit,
    original: &mut File,
    proxy: &mut File,
) -> ApiResult<()> {
    let mut ids = vec![original.id, proxy.id];
    if metadata.is_main_artifact() {
        let ancestors = find_file_ancestors(conn, original.id).await?;
        ids.extend(ancestors.iter().map(|f| f.id));
    }

    files_db::set_content_unit(conn, &ids, unit.id).await?;
    original.content_unit_id = Some(unit.id);
    proxy.content_unit_id = Some(unit.id);

    debug!(content_unit_id = unit.id, files = ids.len(), "Associated files");
    Ok(())
}

async fn associate_sources_and_tags(
    conn: &mut SqliteConnection,
    metadata: &CITMetadata,
    unit: &ContentUnit,
) -> ApiResult<()> {
    let sources = catalog::find_sources_by_uids(conn, &metadata.sources).await?;
    for uid in &metadata.sources {
        if !sources.iter().any(|s| &s.uid == uid) {
            warn!(uid = %uid, "Unknown source");
        }
    }
    let source_ids: Vec<i64> = sources.iter().map(|s| s.id).collect();
    units_db::add_sources(conn, unit.id, &source_ids).await?;

    let tags = catalog::find_tags_by_uids(conn, &metadata.tags).await?;
    for uid in &metadata.tags {
        if !tags.iter().any(|t| &t.uid == uid) {
            warn!(uid = %uid, "Unknown tag");
        }
    }
    let tag_ids: Vec<i64> = tags.iter().map(|t| t.id).collect();
    units_db::add_tags(conn, unit.id, &tag_ids).await?;

    Ok(())
}

async fn associate_lecturer(
    conn: &mut SqliteConnection,
    registries: &Registries,
    metadata: &CITMetadata,
    unit: &ContentUnit,
) -> ApiResult<()> {
    if metadata.lecturer.to_lowercase() != P_RAV {
        return Ok(());
    }

    let person_id = registries
        .persons
        .get(P_RAV)
        .copied()
        .ok_or_else(|| ApiError::UnknownRegistryEntry {
            registry: "person",
            name: P_RAV.to_string(),
        })?;
    let role_id = registries
        .content_roles
        .id(content_roles::LECTURER)
        .ok_or_else(|| ApiError::UnknownRegistryEntry {
            registry: "content role",
            name: content_roles::LECTURER.to_string(),
        })?;

    units_db::upsert_person(conn, unit.id, person_id, role_id).await
}

/// Catalog a final original/proxy pair from its identification metadata
///
/// Returns the unit the pair now belongs to. `original` and `proxy` are
/// updated in place with the properties, language and unit written here.
pub async fn process_metadata(
    conn: &mut SqliteConnection,
    registries: &Registries,
    metadata: &CITMetadata,
    original: &mut File,
    proxy: &mut File,
) -> ApiResult<ContentUnit> {
    let date_props = date_properties(metadata);
    files_db::update_file_properties(conn, original, &date_props).await?;
    files_db::update_file_properties(conn, proxy, &date_props).await?;

    let language = original_language(registries, metadata);
    files_db::update_file_language(conn, original.id, language).await?;
    original.language = Some(language.to_string());

    let unit = find_or_create_unit(conn, registries, metadata, original, proxy, &date_props).await?;

    associate_files(conn, metadata, &unit, original, proxy).await?;
    associate_sources_and_tags(conn, metadata, &unit).await?;
    associate_lecturer(conn, registries, metadata, &unit).await?;

    if let Some(collection) = reconcile(conn, registries, original, metadata, &date_props).await? {
        if metadata.is_main_artifact() {
            let label = membership_label(registries, metadata, &collection);
            collections_db::upsert_collection_content_unit(conn, collection.id, unit.id, &label)
                .await?;
            info!(
                collection_id = collection.id,
                content_unit_id = unit.id,
                label = %label,
                "Linked unit to collection"
            );
        } else {
            debug!(
                artifact_type = ?metadata.artifact_type,
                "Derived artifact, skipping collection membership"
            );
        }
    }

    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::files::{insert_file, NewFile};
    use chrono::NaiveDate;
    use mdb_common::db::init_in_memory;
    use mdb_common::registry::content_types;

    fn metadata() -> CITMetadata {
        CITMetadata {
            content_type: content_types::LECTURE.to_string(),
            capture_date: NaiveDate::from_ymd_opt(2017, 5, 3).unwrap(),
            language: "heb".to_string(),
            lecturer: "Rav".to_string(),
            sources: vec!["src00001".to_string(), "missing0".to_string()],
            tags: vec!["tag00001".to_string()],
            ..Default::default()
        }
    }

    async fn file(conn: &mut SqliteConnection, uid: &str, parent_id: Option<i64>) -> File {
        insert_file(
            conn,
            &NewFile {
                uid: uid.to_string(),
                name: format!("{}.mp4", uid),
                parent_id,
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_date_properties_use_week_date() {
        let mut m = metadata();
        m.week_date = NaiveDate::from_ymd_opt(2017, 5, 6);

        let bag = date_properties(&m);
        assert_eq!(bag["capture_date"], json!("2017-05-03"));
        assert_eq!(bag["film_date"], json!("2017-05-06"));
    }

    #[test]
    fn test_original_language() {
        let reg = Registries::default();
        let mut m = metadata();
        assert_eq!(original_language(&reg, &m), "he");

        m.language = "klingon".to_string();
        assert_eq!(original_language(&reg, &m), LANG_UNKNOWN);

        m.has_translation = true;
        assert_eq!(original_language(&reg, &m), LANG_MULTI);
    }

    #[tokio::test]
    async fn test_process_links_catalog_entries() {
        let pool = init_in_memory().await.unwrap();
        let reg = Registries::load(&pool).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        sqlx::raw_sql(
            r#"
            INSERT INTO sources (id, uid, parent_id, name) VALUES (1, 'src00001', NULL, 'Shamati');
            INSERT INTO tags (id, uid, parent_id, name) VALUES (1, 'tag00001', NULL, 'Prayer');
            "#,
        )
        .execute(&mut *conn)
        .await
        .unwrap();

        let root = file(&mut conn, "root0000", None).await;
        let mut original = file(&mut conn, "orig0000", Some(root.id)).await;
        let mut proxy = file(&mut conn, "prox0000", Some(root.id)).await;

        let m = metadata();
        let unit = process_metadata(&mut conn, &reg, &m, &mut original, &mut proxy)
            .await
            .unwrap();

        assert_eq!(unit.type_id, reg.content_types.id(content_types::LECTURE).unwrap());
        assert_eq!(original.language.as_deref(), Some("he"));
        assert_eq!(original.content_unit_id, Some(unit.id));
        assert_eq!(
            original.properties.as_ref().unwrap()["film_date"],
            json!("2017-05-03")
        );

        let owned: Vec<i64> = files_db::find_files_by_content_unit(&mut conn, unit.id)
            .await
            .unwrap()
            .iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(owned, vec![root.id, original.id, proxy.id]);

        assert_eq!(units_db::source_ids(&mut conn, unit.id).await.unwrap(), vec![1]);
        assert_eq!(units_db::tag_ids(&mut conn, unit.id).await.unwrap(), vec![1]);

        let rav = reg.persons[P_RAV];
        let lecturer = reg.content_roles.id(content_roles::LECTURER).unwrap();
        assert_eq!(
            units_db::persons(&mut conn, unit.id).await.unwrap(),
            vec![(rav, lecturer)]
        );
    }

    #[tokio::test]
    async fn test_reprocessing_reuses_unit() {
        let pool = init_in_memory().await.unwrap();
        let reg = Registries::load(&pool).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let mut original = file(&mut conn, "orig0000", None).await;
        let mut proxy = file(&mut conn, "prox0000", None).await;

        let mut m = metadata();
        m.sources.clear();
        m.tags.clear();
        let first = process_metadata(&mut conn, &reg, &m, &mut original, &mut proxy)
            .await
            .unwrap();

        m.content_type = content_types::CLIP.to_string();
        let second = process_metadata(&mut conn, &reg, &m, &mut original, &mut proxy)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.type_id, reg.content_types.id(content_types::CLIP).unwrap());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content_units")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_derived_artifact_skips_ancestors() {
        let pool = init_in_memory().await.unwrap();
        let reg = Registries::load(&pool).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let root = file(&mut conn, "root0000", None).await;
        let mut original = file(&mut conn, "orig0000", Some(root.id)).await;
        let mut proxy = file(&mut conn, "prox0000", Some(root.id)).await;

        let mut m = metadata();
        m.sources.clear();
        m.tags.clear();
        m.artifact_type = Some("kitei_makor".to_string());
        process_metadata(&mut conn, &reg, &m, &mut original, &mut proxy)
            .await
            .unwrap();

        let root = files_db::load_file(&mut conn, root.id).await.unwrap();
        assert_eq!(root.content_unit_id, None);
    }

    #[tokio::test]
    async fn test_unknown_content_type_is_rejected() {
        let pool = init_in_memory().await.unwrap();
        let reg = Registries::load(&pool).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let mut original = file(&mut conn, "orig0000", None).await;
        let mut proxy = file(&mut conn, "prox0000", None).await;

        let mut m = metadata();
        m.content_type = "NOT_A_TYPE".to_string();
        let err = process_metadata(&mut conn, &reg, &m, &mut original, &mut proxy)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnknownRegistryEntry { .. }));
    }

    #[tokio::test]
    async fn test_explicit_missing_collection_fails() {
        let pool = init_in_memory().await.unwrap();
        let reg = Registries::load(&pool).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let mut original = file(&mut conn, "orig0000", None).await;
        let mut proxy = file(&mut conn, "prox0000", None).await;

        let mut m = metadata();
        m.sources.clear();
        m.tags.clear();
        m.collection_uid = Some("nocoll00".to_string());
        let err = process_metadata(&mut conn, &reg, &m, &mut original, &mut proxy)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::CollectionNotFound { .. }));
        assert!(err.is_bad_input());
    }

    #[tokio::test]
    async fn test_lesson_part_without_capture_has_no_collection() {
        let pool = init_in_memory().await.unwrap();
        let reg = Registries::load(&pool).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let mut original = file(&mut conn, "orig0000", None).await;
        let mut proxy = file(&mut conn, "prox0000", None).await;

        let mut m = metadata();
        m.sources.clear();
        m.tags.clear();
        m.content_type = content_types::LESSON_PART.to_string();
        m.part = Some(2);
        let unit = process_metadata(&mut conn, &reg, &m, &mut original, &mut proxy)
            .await
            .unwrap();

        assert_eq!(original.content_unit_id, Some(unit.id));
        let collections: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collections")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(collections, 0);
    }

    #[tokio::test]
    async fn test_explicit_collection_gets_membership() {
        let pool = init_in_memory().await.unwrap();
        let reg = Registries::load(&pool).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let congress = reg.content_types.id(content_types::CONGRESS).unwrap();
        let collection = collections_db::insert_collection(&mut conn, "congr000", congress, None)
            .await
            .unwrap();

        let mut original = file(&mut conn, "orig0000", None).await;
        let mut proxy = file(&mut conn, "prox0000", None).await;

        let mut m = metadata();
        m.sources.clear();
        m.tags.clear();
        m.collection_uid = Some("congr000".to_string());
        m.number = Some(5);
        let unit = process_metadata(&mut conn, &reg, &m, &mut original, &mut proxy)
            .await
            .unwrap();

        let members = collections_db::collection_content_units(&mut conn, collection.id)
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].content_unit_id, unit.id);
        assert_eq!(members[0].name, "5");

        let reloaded = collections_db::find_collection_by_id(&mut conn, collection.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.type_id, congress);
    }
}
