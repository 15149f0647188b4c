//! Handlers for grade transitions. Teacher only.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/transitions` | Body: `{"student_ids":[..]}`; all move or none do |
//! | `POST` | `/students/{id}/transition` | One student |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use darasa_core::{
  school::{Role, Student},
  store::SchoolStore,
};
use serde::Deserialize;

use crate::{context::Actor, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
  pub student_ids: Vec<i64>,
}

/// `POST /transitions` returns the students in their new grade.
pub async fn bulk<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Json(body): Json<TransitionBody>,
) -> Result<Json<Vec<Student>>, ApiError> {
  actor.require(&[Role::Teacher])?;
  let moved = store
    .transition_students(actor.user_id, body.student_ids)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(moved))
}

/// `POST /students/{id}/transition`
pub async fn single<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(student_id): Path<i64>,
) -> Result<Json<Student>, ApiError> {
  actor.require(&[Role::Teacher])?;
  let moved = store
    .transition_students(actor.user_id, vec![student_id])
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .next()
    .ok_or_else(|| ApiError::NotFound(format!("student {student_id} not found")))?;
  Ok(Json(moved))
}
