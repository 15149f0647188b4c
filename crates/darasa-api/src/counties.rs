//! Handlers for `/counties` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/counties/{county}/overview` | County average and sub-county breakdown |
//! | `GET` | `/counties/{county}/report` | Records in the county; optional `sub_county`, `term`, `year` |
//! | `GET` | `/counties/{county}/sub_counties` | Sub-counties with at least one school |
//!
//! County admins see only their own county; system admins see any.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use darasa_core::{
  performance::{CountyOverview, PerformanceView, Term},
  school::Role,
  store::{PerformanceFilter, SchoolStore},
};
use serde::Deserialize;

use crate::{context::Actor, error::ApiError};

/// Check that `actor` may read `county`.
pub(crate) async fn authorize_county<S: SchoolStore>(
  store: &S,
  actor: &Actor,
  county: &str,
) -> Result<(), ApiError> {
  actor.require(&[Role::CountyAdmin, Role::SystemAdmin])?;
  if actor.role == Role::SystemAdmin {
    return Ok(());
  }
  let own = admin_county(store, actor).await?;
  if own != county {
    return Err(ApiError::Forbidden(format!("county admin for {own} cannot read {county}")));
  }
  Ok(())
}

/// The county a county admin administers: that of their staff school.
pub(crate) async fn admin_county<S: SchoolStore>(
  store: &S,
  actor: &Actor,
) -> Result<String, ApiError> {
  let staff = actor.staff(store).await?;
  let school = store
    .get_school(staff.school_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("school {} not found", staff.school_id)))?;
  Ok(school.county)
}

// ─── Overview ─────────────────────────────────────────────────────────────────

/// `GET /counties/{county}/overview`
pub async fn overview<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(county): Path<String>,
) -> Result<Json<CountyOverview>, ApiError> {
  authorize_county(store.as_ref(), &actor, &county).await?;
  let overview = store
    .county_overview(county)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(overview))
}

// ─── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ReportParams {
  pub sub_county: Option<String>,
  pub term:       Option<Term>,
  pub year:       Option<i32>,
}

/// `GET /counties/{county}/report[?sub_county=...][&term=...][&year=...]`
pub async fn report<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(county): Path<String>,
  Query(params): Query<ReportParams>,
) -> Result<Json<Vec<PerformanceView>>, ApiError> {
  authorize_county(store.as_ref(), &actor, &county).await?;

  let filter = PerformanceFilter {
    county: Some(county),
    sub_county: params.sub_county.filter(|s| !s.trim().is_empty()),
    term: params.term,
    year: params.year,
    ..PerformanceFilter::default()
  };
  let rows = store
    .fetch_performance(&filter)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

// ─── Sub-counties ─────────────────────────────────────────────────────────────

/// `GET /counties/{county}/sub_counties`
pub async fn sub_counties<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(county): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
  authorize_county(store.as_ref(), &actor, &county).await?;
  let subs = store
    .list_sub_counties(county)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(subs))
}
