//! Handlers for the registry: users, schools, students and staff.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`   | `/users` | System admin. Body: [`NewUser`] |
//! | `PUT`    | `/users/{id}` | System admin |
//! | `DELETE` | `/users/{id}` | System admin; 409 while still linked |
//! | `POST`   | `/schools` | System admin. Body: [`NewSchool`] |
//! | `GET`    | `/schools/{id}` | Any caller |
//! | `PUT`    | `/schools/{id}` | System admin |
//! | `DELETE` | `/schools/{id}` | System admin; 409 while anything refers to it |
//! | `POST`   | `/students` | Teacher (own school and grade), head teacher (own school), system admin |
//! | `GET`    | `/students` | `?school_id`, `grade`, `name` (substring) |
//! | `GET`    | `/students/{id}` | |
//! | `PUT`    | `/students/{id}` | Teacher or head teacher at the student's school |
//! | `POST`   | `/staff` | System admin, or a head teacher adding a teacher to their school |
//! | `GET`    | `/staff` | `?user_id`, defaulting to the caller |
//! | `PUT`    | `/staff/{id}` | System admin, or a head teacher editing a teacher at their school |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use darasa_core::{
  grade::Grade,
  school::{
    NewSchool, NewStaff, NewStudent, NewUser, Role, School, Staff, StaffUpdate, Student,
    StudentQuery, StudentUpdate, User,
  },
  store::SchoolStore,
};
use serde::Deserialize;

use crate::{context::Actor, error::ApiError};

// ─── Users ────────────────────────────────────────────────────────────────────

/// `POST /users`
pub async fn create_user<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
  actor.require(&[Role::SystemAdmin])?;
  let user = store.add_user(body).await.map_err(ApiError::from_store)?;
  tracing::info!(user_id = user.user_id, role = %user.role, "user registered");
  Ok((StatusCode::CREATED, Json(user)))
}

/// `PUT /users/{id}`
pub async fn update_user<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(user_id): Path<i64>,
  Json(body): Json<NewUser>,
) -> Result<Json<User>, ApiError> {
  actor.require(&[Role::SystemAdmin])?;
  let user = store
    .update_user(user_id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(user))
}

/// `DELETE /users/{id}`
pub async fn delete_user<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  actor.require(&[Role::SystemAdmin])?;
  store.delete_user(user_id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Schools ──────────────────────────────────────────────────────────────────

/// `POST /schools`
pub async fn create_school<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Json(body): Json<NewSchool>,
) -> Result<impl IntoResponse, ApiError> {
  actor.require(&[Role::SystemAdmin])?;
  let school = store.add_school(body).await.map_err(ApiError::from_store)?;
  tracing::info!(school_id = school.school_id, county = %school.county, "school registered");
  Ok((StatusCode::CREATED, Json(school)))
}

/// `GET /schools/{id}`
pub async fn get_school<S: SchoolStore>(
  State(store): State<Arc<S>>,
  _actor: Actor,
  Path(school_id): Path<i64>,
) -> Result<Json<School>, ApiError> {
  let school = store
    .get_school(school_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("school {school_id} not found")))?;
  Ok(Json(school))
}

/// `PUT /schools/{id}`
pub async fn update_school<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(school_id): Path<i64>,
  Json(body): Json<NewSchool>,
) -> Result<Json<School>, ApiError> {
  actor.require(&[Role::SystemAdmin])?;
  let school = store
    .update_school(school_id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(school))
}

/// `DELETE /schools/{id}`
pub async fn delete_school<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(school_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  actor.require(&[Role::SystemAdmin])?;
  store.delete_school(school_id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Students ─────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /students`. A teacher enrols into their own
/// class, so `school_id` and `current_grade` come from their assignment and
/// are ignored if sent; other callers must supply both.
#[derive(Debug, Deserialize)]
pub struct StudentBody {
  pub school_id:      Option<i64>,
  pub user_id:        Option<i64>,
  pub name:           String,
  pub date_of_birth:  NaiveDate,
  pub gender:         String,
  pub current_grade:  Option<Grade>,
  pub guardian_name:  String,
  pub guardian_phone: String,
  pub guardian_email: Option<String>,
  pub nationality:    String,
  pub student_email:  Option<String>,
}

/// `POST /students`
pub async fn create_student<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Json(body): Json<StudentBody>,
) -> Result<impl IntoResponse, ApiError> {
  actor.require(&[Role::Teacher, Role::HeadTeacher, Role::SystemAdmin])?;

  let (school_id, current_grade) = match actor.role {
    Role::Teacher => {
      let teacher = actor.staff(store.as_ref()).await?;
      let grade = teacher.assigned_grade.ok_or_else(|| {
        ApiError::Forbidden(format!("teacher {} has no assigned grade", actor.user_id))
      })?;
      (teacher.school_id, grade)
    }
    role => {
      let school_id = body
        .school_id
        .ok_or_else(|| ApiError::BadRequest("missing required field `school_id`".into()))?;
      let grade = body
        .current_grade
        .ok_or_else(|| ApiError::BadRequest("missing required field `current_grade`".into()))?;
      if role == Role::HeadTeacher {
        let head = actor.staff(store.as_ref()).await?;
        if head.school_id != school_id {
          return Err(ApiError::Forbidden(format!(
            "head teacher of school {} cannot enrol students at school {school_id}",
            head.school_id
          )));
        }
      }
      (school_id, grade)
    }
  };

  let input = NewStudent {
    school_id,
    user_id:        body.user_id,
    name:           body.name,
    date_of_birth:  body.date_of_birth,
    gender:         body.gender,
    current_grade,
    guardian_name:  body.guardian_name,
    guardian_phone: body.guardian_phone,
    guardian_email: body.guardian_email,
    nationality:    body.nationality,
    student_email:  body.student_email,
  };
  let student = store.add_student(input).await.map_err(ApiError::from_store)?;
  tracing::info!(
    student_id = student.student_id,
    school_id = student.school_id,
    grade = %student.current_grade,
    "student enrolled"
  );
  Ok((StatusCode::CREATED, Json(student)))
}

#[derive(Debug, Deserialize, Default)]
pub struct StudentParams {
  pub school_id: Option<i64>,
  pub grade:     Option<Grade>,
  pub name:      Option<String>,
}

/// `GET /students[?school_id=...][&grade=...][&name=...]`
///
/// School staff are confined to their own school.
pub async fn list_students<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Query(params): Query<StudentParams>,
) -> Result<Json<Vec<Student>>, ApiError> {
  actor.require(&[Role::Teacher, Role::HeadTeacher, Role::CountyAdmin, Role::SystemAdmin])?;

  let mut query = StudentQuery {
    school_id: params.school_id,
    grade:     params.grade,
    name:      params.name,
  };
  if matches!(actor.role, Role::Teacher | Role::HeadTeacher) {
    let staff = actor.staff(store.as_ref()).await?;
    match query.school_id {
      Some(id) if id != staff.school_id => {
        return Err(ApiError::Forbidden(format!(
          "user {} does not belong to school {id}",
          actor.user_id
        )));
      }
      _ => query.school_id = Some(staff.school_id),
    }
  }

  let students = store
    .list_students(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(students))
}

/// `GET /students/{id}`
pub async fn get_student<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(student_id): Path<i64>,
) -> Result<Json<Student>, ApiError> {
  let student = store
    .get_student(student_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("student {student_id} not found")))?;
  if actor.role == Role::Student && student.user_id != Some(actor.user_id) {
    return Err(ApiError::Forbidden("students may only read their own record".into()));
  }
  Ok(Json(student))
}

/// `PUT /students/{id}`
pub async fn update_student<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(student_id): Path<i64>,
  Json(body): Json<StudentUpdate>,
) -> Result<Json<Student>, ApiError> {
  actor.require(&[Role::Teacher, Role::HeadTeacher])?;
  let staff = actor.staff(store.as_ref()).await?;
  let student = store
    .get_student(student_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("student {student_id} not found")))?;
  if student.school_id != staff.school_id {
    return Err(
      darasa_core::Error::StudentNotEnrolled { student_id, school_id: staff.school_id }.into(),
    );
  }

  let student = store
    .update_student(student_id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(student))
}

// ─── Staff ────────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /staff`. A head teacher may only add teachers,
/// and always to their own school, so `school_id` is optional for them.
#[derive(Debug, Deserialize)]
pub struct StaffBody {
  pub user_id:        i64,
  pub school_id:      Option<i64>,
  pub name:           String,
  pub email:          String,
  pub mobile_number:  String,
  pub qualification:  String,
  pub role:           Role,
  pub assigned_grade: Option<Grade>,
}

/// `POST /staff`
pub async fn create_staff<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Json(body): Json<StaffBody>,
) -> Result<impl IntoResponse, ApiError> {
  actor.require(&[Role::SystemAdmin, Role::HeadTeacher])?;

  let school_id = if actor.role == Role::HeadTeacher {
    if body.role != Role::Teacher {
      return Err(ApiError::Forbidden(format!(
        "a head teacher may only register teachers, not a {}",
        body.role
      )));
    }
    actor.staff(store.as_ref()).await?.school_id
  } else {
    body
      .school_id
      .ok_or_else(|| ApiError::BadRequest("missing required field `school_id`".into()))?
  };

  let input = NewStaff {
    user_id:        body.user_id,
    school_id,
    name:           body.name,
    email:          body.email,
    mobile_number:  body.mobile_number,
    qualification:  body.qualification,
    role:           body.role,
    assigned_grade: body.assigned_grade,
  };
  let staff = store.add_staff(input).await.map_err(ApiError::from_store)?;
  tracing::info!(
    staff_id = staff.staff_id,
    school_id = staff.school_id,
    role = %staff.role,
    "staff assigned"
  );
  Ok((StatusCode::CREATED, Json(staff)))
}

#[derive(Debug, Deserialize, Default)]
pub struct StaffParams {
  pub user_id: Option<i64>,
}

/// `GET /staff[?user_id=...]`
pub async fn get_staff<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Query(params): Query<StaffParams>,
) -> Result<Json<Staff>, ApiError> {
  let user_id = params.user_id.unwrap_or(actor.user_id);
  if user_id != actor.user_id {
    actor.require(&[Role::SystemAdmin])?;
  }
  let staff = store
    .staff_for_user(user_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {user_id} has no staff assignment")))?;
  Ok(Json(staff))
}

/// `PUT /staff/{id}`
pub async fn update_staff<S: SchoolStore>(
  State(store): State<Arc<S>>,
  actor: Actor,
  Path(staff_id): Path<i64>,
  Json(body): Json<StaffUpdate>,
) -> Result<Json<Staff>, ApiError> {
  actor.require(&[Role::SystemAdmin, Role::HeadTeacher])?;
  if actor.role == Role::HeadTeacher {
    let head = actor.staff(store.as_ref()).await?;
    let target = store
      .get_staff(staff_id)
      .await
      .map_err(ApiError::from_store)?
      .ok_or_else(|| ApiError::NotFound(format!("staff member {staff_id} not found")))?;
    if target.school_id != head.school_id || target.role != Role::Teacher {
      return Err(ApiError::Forbidden(format!(
        "head teacher of school {} may only edit its teachers",
        head.school_id
      )));
    }
  }

  let staff = store
    .update_staff(staff_id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(staff))
}
