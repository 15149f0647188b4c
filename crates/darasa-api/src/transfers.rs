//! Handlers for `/transfers` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/transfers` | Head teacher. Body: [`TransferBody`]; returns 201 |
//! | `GET`  | `/transfers` | Pending transfers; `?county` defaults to the admin's own |
//! | `POST` | `/transfers/{id}/approve` | County admin |
//! | `POST` | `/transfers/{id}/reject` | County admin |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use darasa_core::{
  school::Role,
  store::SchoolStore,
  transfer::{Transfer, TransferDecision, TransferSummary},
};
use serde::Deserialize;

use crate::{
  context::Actor,
  counties::{admin_county, authorize_county},
  error::ApiError,
};

// ─── Request ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TransferBody {
  pub student_id:   i64,
  pub to_school_id: i64,
}

/// `POST /transfers`. The sending school is the head teacher's own.
pub async fn create<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Json(body): Json<TransferBody>,
) -> Result<impl IntoResponse, ApiError> {
  actor.require(&[Role::HeadTeacher])?;
  let transfer = store
    .request_transfer(actor.user_id, body.student_id, body.to_school_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(transfer)))
}

// ─── Pending list ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub county: Option<String>,
}

/// `GET /transfers[?county=...]`
pub async fn list<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<TransferSummary>>, ApiError> {
  let county = match params.county.filter(|c| !c.trim().is_empty()) {
    Some(county) => county,
    None if actor.role == Role::CountyAdmin => admin_county(store.as_ref(), &actor).await?,
    None => return Err(ApiError::BadRequest("missing required parameter `county`".into())),
  };
  authorize_county(store.as_ref(), &actor, &county).await?;

  let pending = store
    .list_pending_transfers(county)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(pending))
}

// ─── Decisions ────────────────────────────────────────────────────────────────

async fn decide<S: SchoolStore>(
  store: &S,
  actor: Actor,
  transfer_id: i64,
  decision: TransferDecision,
) -> Result<Json<Transfer>, ApiError> {
  actor.require(&[Role::CountyAdmin])?;
  let transfer = store
    .decide_transfer(actor.user_id, transfer_id, decision)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(transfer))
}

/// `POST /transfers/{id}/approve`. Also moves the student.
pub async fn approve<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(transfer_id): Path<i64>,
) -> Result<Json<Transfer>, ApiError> {
  decide(store.as_ref(), actor, transfer_id, TransferDecision::Approve).await
}

/// `POST /transfers/{id}/reject`
pub async fn reject<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(transfer_id): Path<i64>,
) -> Result<Json<Transfer>, ApiError> {
  decide(store.as_ref(), actor, transfer_id, TransferDecision::Reject).await
}
