//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and calendar dates as
//! `YYYY-MM-DD`. Grades, terms, roles and statuses are stored in their display
//! form (`"Grade 4"`, `"Term 2"`, `"Head Teacher"`, `"Pending"`).

use chrono::{DateTime, NaiveDate, Utc};
use darasa_core::{
  grade::{Grade, HistoricalGrade},
  performance::{PerformanceRecord, PerformanceView, SubjectResult, Term},
  school::{Role, School, Staff, Student, User},
  subject::SUBJECTS,
  transfer::{Transfer, TransferStatus, TransferSummary},
};

use crate::{Error, Result};

// ─── DateTime<Utc> / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_grade(s: &str) -> Result<Grade> {
  s.parse().map_err(|_| Error::Decode(format!("invalid grade: {s:?}")))
}

pub fn decode_term(s: &str) -> Result<Term> {
  s.parse().map_err(|_| Error::Decode(format!("invalid term: {s:?}")))
}

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse().map_err(|_| Error::Decode(format!("invalid role: {s:?}")))
}

pub fn decode_status(s: &str) -> Result<TransferStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("invalid transfer status: {s:?}")))
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, username, email, role, created_at";

pub struct RawUser {
  pub user_id:    i64,
  pub username:   String,
  pub email:      String,
  pub role:       String,
  pub created_at: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      username:   row.get(1)?,
      email:      row.get(2)?,
      role:       row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    self.user_id,
      username:   self.username,
      email:      self.email,
      role:       decode_role(&self.role)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

// ─── Schools ─────────────────────────────────────────────────────────────────

pub const SCHOOL_COLUMNS: &str = "school_id, school_name, county, sub_county, ward, \
   registration_id, date_of_registration, school_level, school_category";

pub struct RawSchool {
  pub school_id:            i64,
  pub school_name:          String,
  pub county:               String,
  pub sub_county:           String,
  pub ward:                 String,
  pub registration_id:      Option<String>,
  pub date_of_registration: String,
  pub school_level:         String,
  pub school_category:      String,
}

impl RawSchool {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      school_id:            row.get(0)?,
      school_name:          row.get(1)?,
      county:               row.get(2)?,
      sub_county:           row.get(3)?,
      ward:                 row.get(4)?,
      registration_id:      row.get(5)?,
      date_of_registration: row.get(6)?,
      school_level:         row.get(7)?,
      school_category:      row.get(8)?,
    })
  }

  pub fn into_school(self) -> Result<School> {
    Ok(School {
      school_id:            self.school_id,
      school_name:          self.school_name,
      county:               self.county,
      sub_county:           self.sub_county,
      ward:                 self.ward,
      registration_id:      self.registration_id,
      date_of_registration: decode_date(&self.date_of_registration)?,
      school_level:         self.school_level,
      school_category:      self.school_category,
    })
  }
}

// ─── Students ────────────────────────────────────────────────────────────────

pub const STUDENT_COLUMNS: &str = "student_id, school_id, user_id, name, date_of_birth, \
   gender, current_grade, guardian_name, guardian_phone, guardian_email, \
   nationality, student_email";

pub struct RawStudent {
  pub student_id:     i64,
  pub school_id:      i64,
  pub user_id:        Option<i64>,
  pub name:           String,
  pub date_of_birth:  String,
  pub gender:         String,
  pub current_grade:  String,
  pub guardian_name:  String,
  pub guardian_phone: String,
  pub guardian_email: Option<String>,
  pub nationality:    String,
  pub student_email:  Option<String>,
}

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:     row.get(0)?,
      school_id:      row.get(1)?,
      user_id:        row.get(2)?,
      name:           row.get(3)?,
      date_of_birth:  row.get(4)?,
      gender:         row.get(5)?,
      current_grade:  row.get(6)?,
      guardian_name:  row.get(7)?,
      guardian_phone: row.get(8)?,
      guardian_email: row.get(9)?,
      nationality:    row.get(10)?,
      student_email:  row.get(11)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id:     self.student_id,
      school_id:      self.school_id,
      user_id:        self.user_id,
      name:           self.name,
      date_of_birth:  decode_date(&self.date_of_birth)?,
      gender:         self.gender,
      current_grade:  decode_grade(&self.current_grade)?,
      guardian_name:  self.guardian_name,
      guardian_phone: self.guardian_phone,
      guardian_email: self.guardian_email,
      nationality:    self.nationality,
      student_email:  self.student_email,
    })
  }
}

// ─── Staff ───────────────────────────────────────────────────────────────────

pub const STAFF_COLUMNS: &str = "staff_id, user_id, school_id, name, email, \
   mobile_number, qualification, role, assigned_grade";

pub struct RawStaff {
  pub staff_id:       i64,
  pub user_id:        i64,
  pub school_id:      i64,
  pub name:           String,
  pub email:          String,
  pub mobile_number:  String,
  pub qualification:  String,
  pub role:           String,
  pub assigned_grade: Option<String>,
}

impl RawStaff {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      staff_id:       row.get(0)?,
      user_id:        row.get(1)?,
      school_id:      row.get(2)?,
      name:           row.get(3)?,
      email:          row.get(4)?,
      mobile_number:  row.get(5)?,
      qualification:  row.get(6)?,
      role:           row.get(7)?,
      assigned_grade: row.get(8)?,
    })
  }

  pub fn into_staff(self) -> Result<Staff> {
    Ok(Staff {
      staff_id:       self.staff_id,
      user_id:        self.user_id,
      school_id:      self.school_id,
      name:           self.name,
      email:          self.email,
      mobile_number:  self.mobile_number,
      qualification:  self.qualification,
      role:           decode_role(&self.role)?,
      assigned_grade: self.assigned_grade.as_deref().map(decode_grade).transpose()?,
    })
  }
}

// ─── Transfers ───────────────────────────────────────────────────────────────

pub const TRANSFER_COLUMNS: &str = "transfer_id, student_id, from_school_id, \
   to_school_id, request_date, status, approved_date";

pub struct RawTransfer {
  pub transfer_id:    i64,
  pub student_id:     i64,
  pub from_school_id: i64,
  pub to_school_id:   i64,
  pub request_date:   String,
  pub status:         String,
  pub approved_date:  Option<String>,
}

impl RawTransfer {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      transfer_id:    row.get(0)?,
      student_id:     row.get(1)?,
      from_school_id: row.get(2)?,
      to_school_id:   row.get(3)?,
      request_date:   row.get(4)?,
      status:         row.get(5)?,
      approved_date:  row.get(6)?,
    })
  }

  pub fn into_transfer(self) -> Result<Transfer> {
    Ok(Transfer {
      transfer_id:    self.transfer_id,
      student_id:     self.student_id,
      from_school_id: self.from_school_id,
      to_school_id:   self.to_school_id,
      request_date:   decode_date(&self.request_date)?,
      status:         decode_status(&self.status)?,
      approved_date:  self.approved_date.as_deref().map(decode_date).transpose()?,
    })
  }
}

/// A transfer row followed by the three name columns of a pending listing.
pub struct RawTransferSummary {
  pub transfer:     RawTransfer,
  pub student_name: String,
  pub from_school:  String,
  pub to_school:    String,
}

impl RawTransferSummary {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      transfer:     RawTransfer::from_row(row)?,
      student_name: row.get(7)?,
      from_school:  row.get(8)?,
      to_school:    row.get(9)?,
    })
  }

  pub fn into_summary(self) -> Result<TransferSummary> {
    Ok(TransferSummary {
      transfer:     self.transfer.into_transfer()?,
      student_name: self.student_name,
      from_school:  self.from_school,
      to_school:    self.to_school,
    })
  }
}

// ─── Performance ─────────────────────────────────────────────────────────────

/// Columns leading each subject triple: id, student, school, term, year.
const RECORD_HEAD: usize = 5;

/// Raw values read from a `performance` row, in [`query::record_columns`]
/// order.
///
/// [`query::record_columns`]: crate::query::record_columns
pub struct RawPerformance {
  pub performance_id:  i64,
  pub student_id:      i64,
  pub school_id:       i64,
  pub term:            String,
  pub year:            i32,
  /// `(score, reflection, comment)` per subject, in catalog order.
  pub subjects:        Vec<(i64, String, Option<String>)>,
  pub total_score:     i64,
  pub average_score:   f64,
  pub general_comment: Option<String>,
  pub recorded_at:     String,
}

impl RawPerformance {
  /// Number of columns this row occupies.
  pub const WIDTH: usize = RECORD_HEAD + SUBJECTS.len() * 3 + 4;

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    let subjects = (0..SUBJECTS.len())
      .map(|i| {
        let base = RECORD_HEAD + i * 3;
        Ok((row.get(base)?, row.get(base + 1)?, row.get(base + 2)?))
      })
      .collect::<rusqlite::Result<Vec<_>>>()?;

    let tail = RECORD_HEAD + SUBJECTS.len() * 3;
    Ok(Self {
      performance_id: row.get(0)?,
      student_id: row.get(1)?,
      school_id: row.get(2)?,
      term: row.get(3)?,
      year: row.get(4)?,
      subjects,
      total_score: row.get(tail)?,
      average_score: row.get(tail + 1)?,
      general_comment: row.get(tail + 2)?,
      recorded_at: row.get(tail + 3)?,
    })
  }

  pub fn into_record(self) -> Result<PerformanceRecord> {
    let subjects = SUBJECTS
      .iter()
      .zip(self.subjects)
      .map(|(subject, (score, reflection, comment))| {
        let score = u8::try_from(score)
          .ok()
          .filter(|s| *s <= 100)
          .ok_or_else(|| {
            Error::Decode(format!("{} score out of range: {score}", subject.key))
          })?;
        Ok(SubjectResult {
          key: subject.key.to_owned(),
          name: subject.display_name.to_owned(),
          score,
          reflection,
          comment,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(PerformanceRecord {
      performance_id: self.performance_id,
      student_id: self.student_id,
      school_id: self.school_id,
      term: decode_term(&self.term)?,
      year: self.year,
      subjects,
      total_score: u32::try_from(self.total_score)
        .map_err(|_| Error::Decode(format!("negative total: {}", self.total_score)))?,
      average_score: self.average_score,
      general_comment: self.general_comment,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

/// A performance row followed by student name, current grade and teacher
/// name.
pub struct RawPerformanceView {
  pub record:        RawPerformance,
  pub student_name:  String,
  pub current_grade: String,
  pub teacher_name:  Option<String>,
}

impl RawPerformanceView {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    let w = RawPerformance::WIDTH;
    Ok(Self {
      record:        RawPerformance::from_row(row)?,
      student_name:  row.get(w)?,
      current_grade: row.get(w + 1)?,
      teacher_name:  row.get(w + 2)?,
    })
  }

  pub fn into_view(self, as_of_year: i32) -> Result<PerformanceView> {
    let record = self.record.into_record()?;
    let current_grade = decode_grade(&self.current_grade)?;
    let historical_grade =
      HistoricalGrade::resolve(current_grade, record.year, as_of_year);

    if let HistoricalGrade::Inconsistent { grade_number, .. } = &historical_grade {
      tracing::warn!(
        performance_id = record.performance_id,
        student_id = record.student_id,
        record_year = record.year,
        %current_grade,
        grade_number,
        "historical grade outside the valid range"
      );
    }

    Ok(PerformanceView {
      record,
      student_name: self.student_name,
      current_grade,
      historical_grade,
      teacher_name: self.teacher_name,
    })
  }
}
