use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use trafficdb_core::{CrudEngine, Record, RecordPayload, ScalarValue};

use crate::errors::ServerResult;

/// State that's passed to all handlers.
#[derive(Debug)]
pub struct ServerState {
    pub engine: CrudEngine,
}

#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    /// Primary key values in the table's key column order.
    pub key: Vec<ScalarValue>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub key: Vec<ScalarValue>,
    pub values: RecordPayload,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ColumnsResponse {
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub table: String,
    pub records: Vec<Record>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

/// Outcome of a create, update or delete. `false` covers both "no row
/// matched" and "the database rejected the statement".
#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
}

pub async fn healthz(State(_): State<Arc<ServerState>>) -> &'static str {
    "OK"
}

pub async fn list_tables(State(state): State<Arc<ServerState>>) -> Json<TablesResponse> {
    Json(TablesResponse {
        tables: state.engine.tables(),
    })
}

pub async fn list_columns(
    State(state): State<Arc<ServerState>>,
    Path(table): Path<String>,
) -> ServerResult<Json<ColumnsResponse>> {
    let columns = state.engine.columns_for(&table).await?;
    Ok(Json(ColumnsResponse { table, columns }))
}

pub async fn read_records(
    State(state): State<Arc<ServerState>>,
    Path(table): Path<String>,
) -> ServerResult<Json<RecordsResponse>> {
    let records = state.engine.read(&table).await?;
    Ok(Json(RecordsResponse { table, records }))
}

pub async fn count_records(
    State(state): State<Arc<ServerState>>,
    Path(table): Path<String>,
) -> ServerResult<Json<CountResponse>> {
    let count = state.engine.count(&table).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn create_record(
    State(state): State<Arc<ServerState>>,
    Path(table): Path<String>,
    Json(payload): Json<RecordPayload>,
) -> ServerResult<Json<MutationResponse>> {
    let success = state.engine.create(&table, &payload).await?;
    Ok(Json(MutationResponse { success }))
}

pub async fn update_record(
    State(state): State<Arc<ServerState>>,
    Path(table): Path<String>,
    Json(body): Json<UpdateRequest>,
) -> ServerResult<Json<MutationResponse>> {
    let success = state
        .engine
        .update(&table, &body.key, &body.values)
        .await?;
    Ok(Json(MutationResponse { success }))
}

pub async fn delete_record(
    State(state): State<Arc<ServerState>>,
    Path(table): Path<String>,
    Json(body): Json<KeyRequest>,
) -> ServerResult<Json<MutationResponse>> {
    let success = state.engine.delete(&table, &body.key).await?;
    Ok(Json(MutationResponse { success }))
}

pub async fn record_exists(
    State(state): State<Arc<ServerState>>,
    Path(table): Path<String>,
    Json(body): Json<KeyRequest>,
) -> ServerResult<Json<ExistsResponse>> {
    let exists = state.engine.exists(&table, &body.key).await?;
    Ok(Json(ExistsResponse { exists }))
}
