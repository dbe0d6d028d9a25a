//! Operation pipeline
//!
//! One handler per workflow event. Each handler records an Operation, creates
//! or updates the affected Files through the lineage tracker and links them
//! to the operation. [`handle_operation`] runs a handler inside a single
//! transaction: any error rolls back everything the event wrote.

use mdb_common::db::{File, Operation};
use mdb_common::properties::{self, Properties};
use mdb_common::registry::OperationKind;
use mdb_common::Registries;
use serde_json::{json, Value};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::file_lineage::{create_file, find_file_by_sha1, update_file};
use super::metadata_processor::process_metadata;
use super::up_chain::operation_type_id;
use crate::db::{catalog, files as files_db, operations as operations_db};
use crate::db::uids::{get_free_uid, UidTable};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    CaptureStartRequest, CaptureStopRequest, ConvertRequest, DemuxRequest, FileDescriptor,
    OperationInfo, OperationRequest, SendFile, SendRequest, TrimRequest, UploadRequest,
};

/// Record a new operation
///
/// An unknown acting user is not an error: the operation is stored without a
/// user reference. A workflow id is folded into the property bag.
pub async fn record_operation(
    conn: &mut SqliteConnection,
    registries: &Registries,
    kind: OperationKind,
    info: &OperationInfo,
    props: Option<Properties>,
) -> ApiResult<Operation> {
    let type_id = operation_type_id(registries, kind)?;
    let uid = get_free_uid(conn, UidTable::Operations).await?;

    let user_id = catalog::find_user_id_by_email(conn, &info.user).await?;
    if user_id.is_none() {
        debug!(user = %info.user, "Unknown user, skipping");
    }

    let mut props = props;
    if let Some(workflow_id) = info.workflow_id.as_deref().filter(|w| !w.is_empty()) {
        props
            .get_or_insert_with(Properties::new)
            .insert("workflow_id".to_string(), Value::from(workflow_id));
    }

    let operation =
        operations_db::insert_operation(conn, &uid, type_id, &info.station, user_id, props.as_ref())
            .await?;
    info!(
        operation_id = operation.id,
        uid = %operation.uid,
        kind = %kind,
        station = %info.station,
        "Created operation"
    );

    Ok(operation)
}

/// Associate files with an operation
pub async fn link_files(
    conn: &mut SqliteConnection,
    operation: &Operation,
    is_primary: bool,
    files: &[&File],
) -> ApiResult<()> {
    let ids: Vec<i64> = files.iter().map(|f| f.id).collect();
    operations_db::link_files(conn, operation.id, is_primary, &ids).await
}

fn duration_props(duration: f64) -> Properties {
    properties::props(json!({ "duration": duration }))
}

pub async fn handle_capture_start(
    conn: &mut SqliteConnection,
    registries: &Registries,
    req: &CaptureStartRequest,
) -> ApiResult<Operation> {
    let props = properties::props(json!({
        "capture_source": req.capture_source,
        "collection_uid": req.collection_uid,
    }));
    let operation =
        record_operation(conn, registries, OperationKind::CaptureStart, &req.operation, Some(props))
            .await?;

    let descriptor = FileDescriptor {
        file_name: req.file_name.clone(),
        ..Default::default()
    };
    let file = create_file(conn, registries, None, &descriptor, None).await?;

    link_files(conn, &operation, true, &[&file]).await?;
    Ok(operation)
}

pub async fn handle_capture_stop(
    conn: &mut SqliteConnection,
    registries: &Registries,
    req: &CaptureStopRequest,
) -> ApiResult<Operation> {
    let props = properties::props(json!({
        "capture_source": req.capture_source,
        "collection_uid": req.collection_uid,
        "part": req.part,
    }));
    let operation =
        record_operation(conn, registries, OperationKind::CaptureStop, &req.operation, Some(props))
            .await?;

    let workflow_id = req.operation.workflow_id.as_deref().unwrap_or_default();
    let start_type = operation_type_id(registries, OperationKind::CaptureStart)?;
    let parent = match operations_db::find_file_by_workflow_id(conn, start_type, workflow_id).await? {
        Some(id) => Some(files_db::load_file(conn, id).await?),
        None => {
            warn!(workflow_id, "capture_start operation not found, skipping parent");
            None
        }
    };

    let file = create_file(conn, registries, parent.as_ref(), &req.file, None).await?;

    let mut linked = vec![&file];
    if let Some(parent) = parent.as_ref() {
        linked.push(parent);
    }
    link_files(conn, &operation, false, &linked).await?;
    Ok(operation)
}

pub async fn handle_demux(
    conn: &mut SqliteConnection,
    registries: &Registries,
    req: &DemuxRequest,
) -> ApiResult<Operation> {
    let parent = find_file_by_sha1(conn, &req.sha1).await?;

    let props = properties::props(json!({ "capture_source": req.capture_source }));
    let operation =
        record_operation(conn, registries, OperationKind::Demux, &req.operation, Some(props))
            .await?;

    let original = create_file(
        conn,
        registries,
        Some(&parent),
        &req.original.file,
        Some(duration_props(req.original.duration)),
    )
    .await?;
    let proxy = create_file(
        conn,
        registries,
        Some(&parent),
        &req.proxy.file,
        Some(duration_props(req.proxy.duration)),
    )
    .await?;

    link_files(conn, &operation, false, &[&parent, &original, &proxy]).await?;
    Ok(operation)
}

pub async fn handle_trim(
    conn: &mut SqliteConnection,
    registries: &Registries,
    req: &TrimRequest,
) -> ApiResult<Operation> {
    let original = find_file_by_sha1(conn, &req.original_sha1).await?;
    let proxy = find_file_by_sha1(conn, &req.proxy_sha1).await?;

    let props = properties::props(json!({
        "capture_source": req.capture_source,
        "in": req.in_points,
        "out": req.out_points,
    }));
    let operation =
        record_operation(conn, registries, OperationKind::Trim, &req.operation, Some(props))
            .await?;

    let original_trim = create_file(
        conn,
        registries,
        Some(&original),
        &req.original.file,
        Some(duration_props(req.original.duration)),
    )
    .await?;
    let proxy_trim = create_file(
        conn,
        registries,
        Some(&proxy),
        &req.proxy.file,
        Some(duration_props(req.proxy.duration)),
    )
    .await?;

    link_files(
        conn,
        &operation,
        false,
        &[&original, &original_trim, &proxy, &proxy_trim],
    )
    .await?;
    Ok(operation)
}

/// Apply the name and optional reclassification of one send side
async fn apply_send_file(
    conn: &mut SqliteConnection,
    registries: &Registries,
    file: &mut File,
    incoming: &SendFile,
) -> ApiResult<()> {
    if incoming.reclassifies() {
        let descriptor = FileDescriptor {
            sha1: incoming.sha1.clone(),
            file_name: incoming.file_name.clone(),
            file_type: incoming
                .file_type
                .clone()
                .unwrap_or_else(|| file.file_type.clone()),
            sub_type: incoming
                .sub_type
                .clone()
                .unwrap_or_else(|| file.sub_type.clone()),
            mime_type: incoming.mime_type.clone().or_else(|| file.mime_type.clone()),
            language: incoming.language.clone().unwrap_or_default(),
            ..Default::default()
        };
        return update_file(conn, registries, file, &descriptor, None).await;
    }

    if file.name == incoming.file_name {
        debug!(file_id = file.id, "Name unchanged");
    } else {
        info!(file_id = file.id, from = %file.name, to = %incoming.file_name, "Renaming file");
        files_db::update_file_name(conn, file.id, &incoming.file_name).await?;
        file.name = incoming.file_name.clone();
    }

    Ok(())
}

pub async fn handle_send(
    conn: &mut SqliteConnection,
    registries: &Registries,
    req: &SendRequest,
) -> ApiResult<Operation> {
    let mut original = find_file_by_sha1(conn, &req.original.sha1).await?;
    apply_send_file(conn, registries, &mut original, &req.original).await?;

    let mut proxy = find_file_by_sha1(conn, &req.proxy.sha1).await?;
    apply_send_file(conn, registries, &mut proxy, &req.proxy).await?;

    let props = match &req.metadata {
        Some(metadata) => Some(properties::props(serde_json::to_value(metadata)?)),
        None => None,
    };
    let operation =
        record_operation(conn, registries, OperationKind::Send, &req.operation, props).await?;

    link_files(conn, &operation, false, &[&original, &proxy]).await?;

    if let Some(metadata) = &req.metadata {
        process_metadata(conn, registries, metadata, &mut original, &mut proxy).await?;
    }

    Ok(operation)
}

pub async fn handle_convert(
    conn: &mut SqliteConnection,
    registries: &Registries,
    req: &ConvertRequest,
) -> ApiResult<Operation> {
    let input = find_file_by_sha1(conn, &req.sha1).await?;

    let operation =
        record_operation(conn, registries, OperationKind::Convert, &req.operation, None).await?;

    let mut outputs = Vec::with_capacity(req.output.len());
    for av in &req.output {
        let file = create_file(
            conn,
            registries,
            Some(&input),
            &av.file,
            Some(duration_props(av.duration)),
        )
        .await?;
        outputs.push(file);
    }

    let mut linked = vec![&input];
    linked.extend(outputs.iter());
    link_files(conn, &operation, false, &linked).await?;
    Ok(operation)
}

pub async fn handle_upload(
    conn: &mut SqliteConnection,
    registries: &Registries,
    req: &UploadRequest,
) -> ApiResult<Operation> {
    let operation =
        record_operation(conn, registries, OperationKind::Upload, &req.operation, None).await?;

    let mut file = match find_file_by_sha1(conn, &req.file.file.sha1).await {
        Ok(file) => file,
        Err(ApiError::FileNotFound { sha1 }) => {
            info!(sha1 = %sha1, "File not found, creating new");
            create_file(conn, registries, None, &req.file.file, None).await?
        }
        Err(e) => return Err(e),
    };

    let props = properties::props(json!({
        "url": req.url,
        "duration": req.file.duration,
    }));
    files_db::update_file_properties(conn, &mut file, &props).await?;

    link_files(conn, &operation, false, &[&file]).await?;
    Ok(operation)
}

/// Run the handler matching the request's kind
pub async fn dispatch(
    conn: &mut SqliteConnection,
    registries: &Registries,
    request: &OperationRequest,
) -> ApiResult<Operation> {
    match request {
        OperationRequest::CaptureStart(r) => handle_capture_start(conn, registries, r).await,
        OperationRequest::CaptureStop(r) => handle_capture_stop(conn, registries, r).await,
        OperationRequest::Demux(r) => handle_demux(conn, registries, r).await,
        OperationRequest::Trim(r) => handle_trim(conn, registries, r).await,
        OperationRequest::Send(r) => handle_send(conn, registries, r).await,
        OperationRequest::Convert(r) => handle_convert(conn, registries, r).await,
        OperationRequest::Upload(r) => handle_upload(conn, registries, r).await,
    }
}

/// Handle one workflow event atomically
pub async fn handle_operation(
    pool: &SqlitePool,
    registries: &Registries,
    request: &OperationRequest,
) -> ApiResult<Operation> {
    let kind = request.kind();
    let mut tx = pool.begin().await?;

    match dispatch(&mut *tx, registries, request).await {
        Ok(operation) => {
            tx.commit().await?;
            Ok(operation)
        }
        Err(e) => {
            if let Err(rb) = tx.rollback().await {
                warn!(kind = %kind, error = %rb, "Rollback failed");
            }
            warn!(kind = %kind, error = %e, "Operation rolled back");
            Err(e)
        }
    }
}
