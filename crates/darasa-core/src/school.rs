//! Registry types: users, schools, students and staff.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, grade::Grade};

// ─── Roles ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
pub enum Role {
  #[serde(rename = "System Admin")]
  #[strum(serialize = "System Admin")]
  SystemAdmin,
  #[serde(rename = "County Admin")]
  #[strum(serialize = "County Admin")]
  CountyAdmin,
  #[serde(rename = "Head Teacher")]
  #[strum(serialize = "Head Teacher")]
  HeadTeacher,
  Teacher,
  Student,
}

impl Role {
  /// Roles that are attached to a school through a `staffs` row.
  pub fn is_staff(self) -> bool {
    matches!(self, Self::CountyAdmin | Self::HeadTeacher | Self::Teacher)
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// A login identity. Credentials live with the authenticating proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:    i64,
  pub username:   String,
  pub email:      String,
  pub role:       Role,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
  pub username: String,
  pub email:    String,
  pub role:     Role,
}

// ─── Schools ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
  pub school_id:            i64,
  pub school_name:          String,
  pub county:               String,
  pub sub_county:           String,
  pub ward:                 String,
  pub registration_id:      Option<String>,
  pub date_of_registration: NaiveDate,
  pub school_level:         String,
  pub school_category:      String,
}

/// Input to [`crate::store::SchoolStore::add_school`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchool {
  pub school_name:          String,
  pub county:               String,
  pub sub_county:           String,
  pub ward:                 String,
  pub registration_id:      Option<String>,
  /// Defaults to today when absent.
  pub date_of_registration: Option<NaiveDate>,
  pub school_level:         String,
  pub school_category:      String,
}

impl NewSchool {
  pub fn validate(&self) -> Result<()> {
    require("school_name", &self.school_name)?;
    require("county", &self.county)?;
    require("sub_county", &self.sub_county)?;
    Ok(())
  }
}

// ─── Students ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
  pub student_id:     i64,
  pub school_id:      i64,
  pub user_id:        Option<i64>,
  pub name:           String,
  pub date_of_birth:  NaiveDate,
  pub gender:         String,
  pub current_grade:  Grade,
  pub guardian_name:  String,
  pub guardian_phone: String,
  pub guardian_email: Option<String>,
  pub nationality:    String,
  pub student_email:  Option<String>,
}

/// Input to [`crate::store::SchoolStore::add_student`]. The grade is already
/// typed, so an out-of-range grade never gets this far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudent {
  pub school_id:      i64,
  pub user_id:        Option<i64>,
  pub name:           String,
  pub date_of_birth:  NaiveDate,
  pub gender:         String,
  pub current_grade:  Grade,
  pub guardian_name:  String,
  pub guardian_phone: String,
  pub guardian_email: Option<String>,
  pub nationality:    String,
  pub student_email:  Option<String>,
}

impl NewStudent {
  pub fn validate(&self) -> Result<()> {
    require("name", &self.name)?;
    require("guardian_name", &self.guardian_name)?;
    require("guardian_phone", &self.guardian_phone)?;
    Ok(())
  }
}

/// Editable student details for [`crate::store::SchoolStore::update_student`].
/// The school only changes through an approved transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentUpdate {
  pub name:           String,
  pub date_of_birth:  NaiveDate,
  pub gender:         String,
  pub current_grade:  Grade,
  pub guardian_name:  String,
  pub guardian_phone: String,
  pub guardian_email: Option<String>,
  pub nationality:    String,
}

impl StudentUpdate {
  pub fn validate(&self) -> Result<()> {
    require("name", &self.name)?;
    require("gender", &self.gender)?;
    require("guardian_name", &self.guardian_name)?;
    require("guardian_phone", &self.guardian_phone)?;
    Ok(())
  }
}

/// Parameters for [`crate::store::SchoolStore::list_students`].
#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
  pub school_id: Option<i64>,
  pub grade:     Option<Grade>,
  /// Case-insensitive substring match on the student's name.
  pub name:      Option<String>,
}

// ─── Staff ───────────────────────────────────────────────────────────────────

/// Assignment of a user to a staff role at a school.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
  pub staff_id:       i64,
  pub user_id:        i64,
  pub school_id:      i64,
  pub name:           String,
  pub email:          String,
  pub mobile_number:  String,
  pub qualification:  String,
  pub role:           Role,
  /// Only Teachers carry an assigned grade.
  pub assigned_grade: Option<Grade>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStaff {
  pub user_id:        i64,
  pub school_id:      i64,
  pub name:           String,
  pub email:          String,
  pub mobile_number:  String,
  pub qualification:  String,
  pub role:           Role,
  pub assigned_grade: Option<Grade>,
}

impl NewStaff {
  pub fn validate(&self) -> Result<()> {
    validate_staff(&self.name, self.role, self.assigned_grade)
  }
}

/// Replacement details for [`crate::store::SchoolStore::update_staff`]. The
/// user and school of an assignment are fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffUpdate {
  pub name:           String,
  pub email:          String,
  pub mobile_number:  String,
  pub qualification:  String,
  pub role:           Role,
  pub assigned_grade: Option<Grade>,
}

impl StaffUpdate {
  pub fn validate(&self) -> Result<()> {
    validate_staff(&self.name, self.role, self.assigned_grade)
  }
}

fn validate_staff(name: &str, role: Role, assigned_grade: Option<Grade>) -> Result<()> {
  require("name", name)?;
  if !role.is_staff() {
    return Err(Error::Invalid(format!("{role} is not a staff role")));
  }
  match (role, assigned_grade) {
    (Role::Teacher, None) => Err(Error::Invalid("a teacher needs an assigned grade".into())),
    (Role::Teacher, Some(_)) | (_, None) => Ok(()),
    (role, Some(_)) => Err(Error::Invalid(format!("a {role} cannot have an assigned grade"))),
  }
}

fn require(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::Invalid(format!("{field} must not be empty")));
  }
  Ok(())
}
