//! Up-chain resolution over the file lineage

use mdb_common::db::{File, Operation};
use mdb_common::registry::OperationKind;
use mdb_common::Registries;
use sqlx::SqliteConnection;

use crate::db::{files as files_db, operations as operations_db};
use crate::error::{ApiError, ApiResult};

/// Registry id of an operation kind
pub fn operation_type_id(registries: &Registries, kind: OperationKind) -> ApiResult<i64> {
    registries
        .operation_type_id(kind)
        .ok_or_else(|| ApiError::UnknownRegistryEntry {
            registry: "operation type",
            name: kind.name().to_string(),
        })
}

/// Nearest operation of `kind` produced somewhere up the lineage of a file
///
/// The walk starts at the file itself. Each file contributes only its
/// earliest linked operation.
pub async fn find_up_chain_operation(
    conn: &mut SqliteConnection,
    registries: &Registries,
    file_id: i64,
    kind: OperationKind,
) -> ApiResult<Operation> {
    let type_id = operation_type_id(registries, kind)?;

    operations_db::find_up_chain_operation(conn, file_id, type_id)
        .await?
        .ok_or(ApiError::UpChainOperationNotFound {
            file_id,
            op_type: kind,
        })
}

/// Every ancestor of a file, nearest first
pub async fn find_file_ancestors(conn: &mut SqliteConnection, file_id: i64) -> ApiResult<Vec<File>> {
    files_db::find_file_ancestors(conn, file_id).await
}
