//! Handlers for `/performance` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/performance` | `?school_id&grade` required; optional `student_id`, `year`, `term` |
//! | `POST` | `/performance` | Teacher only. Body: [`RecordBody`]; returns 201 + stored record |
//! | `GET`  | `/performance/report` | `?student_id&term&year`; 404 when nothing was recorded |
//! | `GET`  | `/performance/summary` | `?school_id` required; optional `grade`, `year`, `term`, `subject` |
//!
//! Readers are scoped: school staff to their school, county admins to their
//! county, students to their own report card.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use darasa_core::{
  grade::Grade,
  performance::{GradeSummary, NewPerformanceRecord, PerformanceView, SubjectEntry, Term},
  school::Role,
  store::{PerformanceFilter, SchoolStore},
  subject,
};
use serde::Deserialize;

use crate::{context::Actor, counties::authorize_county, error::ApiError};

const READERS: &[Role] =
  &[Role::Teacher, Role::HeadTeacher, Role::CountyAdmin, Role::SystemAdmin];

/// School staff only read their own school, county admins only schools in
/// their county.
async fn authorize_school<S: SchoolStore>(
  store: &S,
  actor: &Actor,
  school_id: i64,
) -> Result<(), ApiError> {
  actor.require(READERS)?;
  match actor.role {
    Role::Teacher | Role::HeadTeacher => {
      let staff = actor.staff(store).await?;
      if staff.school_id != school_id {
        return Err(ApiError::Forbidden(format!(
          "user {} does not belong to school {school_id}",
          actor.user_id
        )));
      }
    }
    Role::CountyAdmin => {
      let school = store
        .get_school(school_id)
        .await
        .map_err(ApiError::from_store)?
        .ok_or_else(|| ApiError::NotFound(format!("school {school_id} not found")))?;
      authorize_county(store, actor, &school.county).await?;
    }
    _ => {}
  }
  Ok(())
}

fn required<T>(value: Option<T>, name: &str) -> Result<T, ApiError> {
  value.ok_or_else(|| ApiError::BadRequest(format!("missing required parameter `{name}`")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub school_id:  Option<i64>,
  pub grade:      Option<Grade>,
  pub student_id: Option<i64>,
  pub year:       Option<i32>,
  pub term:       Option<Term>,
}

/// `GET /performance?school_id=<id>&grade=Grade+N[&student_id=...][&year=...][&term=...]`
pub async fn list<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<PerformanceView>>, ApiError> {
  let school_id = required(params.school_id, "school_id")?;
  let grade = required(params.grade, "grade")?;
  authorize_school(store.as_ref(), &actor, school_id).await?;

  let filter = PerformanceFilter {
    student_id: params.student_id,
    year: params.year,
    term: params.term,
    ..PerformanceFilter::default().school(school_id).grade(grade)
  };
  let rows = store
    .fetch_performance(&filter)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

// ─── Record ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /performance`. The school is taken from the
/// recording teacher's assignment.
#[derive(Debug, Deserialize)]
pub struct RecordBody {
  pub student_id:      i64,
  pub term:            Term,
  pub year:            i32,
  pub subjects:        BTreeMap<String, SubjectEntry>,
  pub general_comment: Option<String>,
}

/// `POST /performance`: returns 201 + the stored
/// [`PerformanceRecord`](darasa_core::performance::PerformanceRecord). The
/// store rejects a student who is not enrolled at the teacher's school.
pub async fn create<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Json(body): Json<RecordBody>,
) -> Result<impl IntoResponse, ApiError> {
  actor.require(&[Role::Teacher])?;
  let teacher = actor.staff(store.as_ref()).await?;

  let record = store
    .record_performance(NewPerformanceRecord {
      student_id:      body.student_id,
      school_id:       teacher.school_id,
      term:            body.term,
      year:            body.year,
      subjects:        body.subjects,
      general_comment: body.general_comment,
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Report card ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReportParams {
  pub student_id: i64,
  pub term:       Term,
  pub year:       i32,
}

/// `GET /performance/report?student_id=<id>&term=Term+N&year=<yyyy>`
///
/// Students may read only their own report card; everyone else is held to
/// the student's current school.
pub async fn report<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Query(params): Query<ReportParams>,
) -> Result<Json<PerformanceView>, ApiError> {
  let student = store
    .get_student(params.student_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("student {} not found", params.student_id)))?;
  if actor.role == Role::Student {
    if student.user_id != Some(actor.user_id) {
      return Err(ApiError::Forbidden("students may only read their own report".into()));
    }
  } else {
    authorize_school(store.as_ref(), &actor, student.school_id).await?;
  }

  let view = store
    .fetch_report(params.student_id, params.term, params.year)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "no {} {} record for student {}",
        params.term, params.year, params.student_id
      ))
    })?;
  Ok(Json(view))
}

// ─── Summary ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct SummaryParams {
  pub school_id: Option<i64>,
  pub grade:     Option<Grade>,
  pub year:      Option<i32>,
  pub term:      Option<Term>,
  /// Subject key, e.g. `maths`. Restricts the averages to that subject.
  pub subject:   Option<String>,
}

/// `GET /performance/summary?school_id=<id>[&grade=...][&year=...][&term=...][&subject=...]`
pub async fn summary<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Query(params): Query<SummaryParams>,
) -> Result<Json<Vec<GradeSummary>>, ApiError> {
  let school_id = required(params.school_id, "school_id")?;
  authorize_school(store.as_ref(), &actor, school_id).await?;

  let subject = params
    .subject
    .as_deref()
    .filter(|s| !s.is_empty())
    .map(|key| {
      subject::by_key(key).ok_or_else(|| darasa_core::Error::UnknownSubject(key.to_owned()))
    })
    .transpose()?;

  let filter = PerformanceFilter {
    grade: params.grade,
    year: params.year,
    term: params.term,
    subject,
    ..PerformanceFilter::default().school(school_id)
  };
  let summary = store
    .grade_summary(&filter)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(summary))
}
