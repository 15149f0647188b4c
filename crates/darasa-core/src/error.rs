//! Error types for `darasa-core`.

use thiserror::Error;

use crate::school::Role;

#[derive(Debug, Error)]
pub enum Error {
  // ── Validation ──────────────────────────────────────────────────────────
  #[error("score for {subject} must be between 0 and 100, got {score}")]
  ScoreOutOfRange { subject: &'static str, score: i64 },

  #[error("missing score for {0}")]
  MissingSubject(&'static str),

  #[error("unknown subject: {0:?}")]
  UnknownSubject(String),

  #[error("invalid grade: {0:?}")]
  InvalidGrade(String),

  #[error("invalid term: {0:?}")]
  InvalidTerm(String),

  #[error("year {0} is outside the accepted range")]
  InvalidYear(i32),

  #[error("invalid input: {0}")]
  Invalid(String),

  // ── Not found ───────────────────────────────────────────────────────────
  #[error("student not found: {0}")]
  StudentNotFound(i64),

  #[error("school not found: {0}")]
  SchoolNotFound(i64),

  #[error("user not found: {0}")]
  UserNotFound(i64),

  #[error("transfer not found: {0}")]
  TransferNotFound(i64),

  #[error("staff member not found: {0}")]
  StaffMemberNotFound(i64),

  // ── Conflicts ───────────────────────────────────────────────────────────
  #[error("a performance record already exists for student {student_id}, {term} {year}")]
  DuplicateRecord { student_id: i64, term: String, year: i32 },

  #[error("school {name:?} is already registered in {county}")]
  DuplicateSchool { name: String, county: String },

  #[error("username {0:?} is already taken")]
  DuplicateUsername(String),

  #[error("user {0} is already assigned to a school")]
  AlreadyStaff(i64),

  #[error("school {0} already has a head teacher")]
  HeadTeacherExists(i64),

  #[error("county {0} already has a county admin")]
  CountyAdminExists(String),

  #[error("transfer {0} has already been decided")]
  TransferAlreadyDecided(i64),

  #[error("student {0} already has a pending transfer")]
  TransferPending(i64),

  #[error("school {0} still has students, staff or records")]
  SchoolInUse(i64),

  #[error("user {0} is still linked to a staff or student record")]
  UserInUse(i64),

  // ── Authorisation / scope ───────────────────────────────────────────────
  #[error("no staff record for user {0}")]
  StaffNotFound(i64),

  #[error("user {user_id} must be a {required} for this operation")]
  WrongRole { user_id: i64, required: Role },

  #[error("student {student_id} is not in {grade} at school {school_id}")]
  StudentNotInClass { student_id: i64, school_id: i64, grade: String },

  #[error("student {student_id} is not enrolled at school {school_id}")]
  StudentNotEnrolled { student_id: i64, school_id: i64 },

  #[error("transfer {transfer_id} is outside county {county}")]
  OutsideCounty { transfer_id: i64, county: String },

  #[error("{0} is the final grade; students cannot be transitioned further")]
  GradeCeiling(String),
}

impl Error {
  /// True for errors caused by malformed or out-of-range caller input.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::ScoreOutOfRange { .. }
        | Self::MissingSubject(_)
        | Self::UnknownSubject(_)
        | Self::InvalidGrade(_)
        | Self::InvalidTerm(_)
        | Self::InvalidYear(_)
        | Self::Invalid(_)
        | Self::GradeCeiling(_)
    )
  }

  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::StudentNotFound(_)
        | Self::SchoolNotFound(_)
        | Self::UserNotFound(_)
        | Self::TransferNotFound(_)
        | Self::StaffMemberNotFound(_)
    )
  }

  pub fn is_conflict(&self) -> bool {
    matches!(
      self,
      Self::DuplicateRecord { .. }
        | Self::DuplicateSchool { .. }
        | Self::DuplicateUsername(_)
        | Self::AlreadyStaff(_)
        | Self::TransferPending(_)
        | Self::HeadTeacherExists(_)
        | Self::CountyAdminExists(_)
        | Self::TransferAlreadyDecided(_)
        | Self::SchoolInUse(_)
        | Self::UserInUse(_)
    )
  }

  /// True when the caller is known but not allowed to act on the target.
  pub fn is_forbidden(&self) -> bool {
    matches!(
      self,
      Self::WrongRole { .. }
        | Self::StaffNotFound(_)
        | Self::StudentNotInClass { .. }
        | Self::StudentNotEnrolled { .. }
        | Self::OutsideCounty { .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
