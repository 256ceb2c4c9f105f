use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::domain::Disposition;
use crate::ingest::{self, LineError, RawCallRecord};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreateCallRequest {
    pub calldate: Option<Value>,
    pub src: Option<Value>,
    pub dst: Option<Value>,
    pub duration: Option<Value>,
    pub billsec: Option<Value>,
}

/// Serialized record returned by the single-create endpoint.
#[derive(Serialize)]
pub struct CallRecordResponse {
    pub id: i64,
    pub calldate: String,
    pub src: String,
    pub dst: String,
    pub duration: i64,
    pub billsec: i64,
}

#[derive(Serialize)]
pub struct BulkCreateResponse {
    pub created: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /calls/create/
/// Create a single record. Disposition is always forced to NO ANSWER /
/// answered=false regardless of input; callers that need derived
/// dispositions use bulk ingestion.
pub async fn create_call(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCallRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let raw = RawCallRecord {
        calldate: payload.calldate,
        src: payload.src,
        dst: payload.dst,
        duration: payload.duration,
        billsec: payload.billsec,
        disposition: Some(Value::String(Disposition::NO_ANSWER.to_string())),
    };

    let records = ingest::validate_batch(&[raw], state.server_tz)
        .map_err(|errors| ApiError::validation(flatten_line_errors(&errors)))?;

    let model = state
        .store()
        .insert_call_record(&records[0])
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert call record: {e}")))?;

    Ok((
        StatusCode::CREATED,
        Json(CallRecordResponse {
            id: model.id,
            calldate: model.calldate,
            src: model.src,
            dst: model.dst,
            duration: model.duration,
            billsec: model.billsec,
        }),
    ))
}

/// POST /calls/bulk_create/
/// All-or-nothing batch ingestion: every record is validated first; any
/// line error rejects the whole batch with the full error list, otherwise
/// all rows are committed in a single transaction.
pub async fn bulk_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(records) = payload.get("records").and_then(Value::as_array) else {
        return Err(ApiError::validation("records must be a list"));
    };

    let raw_records = parse_raw_records(records);

    let validated =
        ingest::validate_batch(&raw_records, state.server_tz).map_err(ApiError::BatchRejected)?;

    let created = state
        .store()
        .insert_call_records(&validated)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to bulk insert call records: {e}")))?;

    tracing::info!("Bulk ingested {} call records", created);

    Ok((StatusCode::CREATED, Json(BulkCreateResponse { created })))
}

/// Deserialize each batch element leniently; a non-object element becomes a
/// record with every field empty, so it is reported against its own line
/// instead of failing the whole request shape.
fn parse_raw_records(records: &[Value]) -> Vec<RawCallRecord> {
    records
        .iter()
        .map(|value| {
            serde_json::from_value(value.clone()).unwrap_or(RawCallRecord {
                calldate: None,
                src: None,
                dst: None,
                duration: None,
                billsec: None,
                disposition: None,
            })
        })
        .collect()
}

fn flatten_line_errors(errors: &[LineError]) -> String {
    errors
        .iter()
        .flat_map(|e| e.errors.iter())
        .cloned()
        .collect::<Vec<_>>()
        .join("; ")
}
