//! The `SchoolStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `darasa-store-sqlite`).
//! Higher layers (`darasa-api`, `darasa-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use crate::{
  grade::Grade,
  performance::{
    CountyOverview, GradeSummary, NewPerformanceRecord, PerformanceRecord,
    PerformanceView, Term,
  },
  school::{
    NewSchool, NewStaff, NewStudent, NewUser, School, Staff, StaffUpdate, Student,
    StudentQuery, StudentUpdate, User,
  },
  subject::Subject,
  transfer::{Transfer, TransferDecision, TransferSummary},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Criteria for [`SchoolStore::fetch_performance`] and
/// [`SchoolStore::grade_summary`].
///
/// Every present criterion narrows the result with an equality test; absent
/// criteria do not restrict it at all.
#[derive(Debug, Clone, Default)]
pub struct PerformanceFilter {
  pub school_id:   Option<i64>,
  /// Matched against the student's *current* grade.
  pub grade:       Option<Grade>,
  pub student_id:  Option<i64>,
  pub year:        Option<i32>,
  pub term:        Option<Term>,
  pub county:      Option<String>,
  pub sub_county:  Option<String>,
  /// Grouped views project only this subject's average when set. Holding a
  /// catalog reference keeps column names out of caller control.
  pub subject:     Option<&'static Subject>,
  /// Year historical grades are resolved against; defaults to the current
  /// calendar year.
  pub as_of_year:  Option<i32>,
}

impl PerformanceFilter {
  pub fn school(mut self, school_id: i64) -> Self {
    self.school_id = Some(school_id);
    self
  }

  pub fn grade(mut self, grade: Grade) -> Self {
    self.grade = Some(grade);
    self
  }

  pub fn student(mut self, student_id: i64) -> Self {
    self.student_id = Some(student_id);
    self
  }

  pub fn year(mut self, year: i32) -> Self {
    self.year = Some(year);
    self
  }

  pub fn term(mut self, term: Term) -> Self {
    self.term = Some(term);
    self
  }

  pub fn county(mut self, county: impl Into<String>) -> Self {
    self.county = Some(county.into());
    self
  }

  pub fn sub_county(mut self, sub_county: impl Into<String>) -> Self {
    self.sub_county = Some(sub_county.into());
    self
  }

  pub fn subject(mut self, subject: &'static Subject) -> Self {
    self.subject = Some(subject);
    self
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Backend errors expose the domain error behind them, if there is one, so
/// callers can tell a rejected request from an infrastructure failure.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&crate::Error>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Darasa store backend.
///
/// Performance records are append-only. Operations that touch more than one
/// row (grade transition, transfer decisions, staff changes) are atomic: on
/// error nothing is written.
pub trait SchoolStore: Send + Sync {
  type Error: StoreError;

  // ── Registry ──────────────────────────────────────────────────────────

  /// Create a login identity. A `Student` account is linked to every
  /// unlinked student row whose `student_email` matches.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Replace a user's username, email and role. A staff assignment is not
  /// touched.
  fn update_user(
    &self,
    user_id: i64,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Remove a user. Fails with a conflict while a staff or student row still
  /// refers to it.
  fn delete_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Register a school. Fails with a conflict if `(school_name, county)` is
  /// already taken.
  fn add_school(
    &self,
    input: NewSchool,
  ) -> impl Future<Output = Result<School, Self::Error>> + Send + '_;

  fn get_school(
    &self,
    school_id: i64,
  ) -> impl Future<Output = Result<Option<School>, Self::Error>> + Send + '_;

  /// Replace a school's details. An absent registration date keeps the stored
  /// one.
  fn update_school(
    &self,
    school_id: i64,
    input: NewSchool,
  ) -> impl Future<Output = Result<School, Self::Error>> + Send + '_;

  /// Remove a school that nothing refers to any more.
  fn delete_school(
    &self,
    school_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Distinct sub-counties with at least one school in `county`.
  fn list_sub_counties(
    &self,
    county: String,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    student_id: i64,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn update_student(
    &self,
    student_id: i64,
    input: StudentUpdate,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn list_students<'a>(
    &'a self,
    query: &'a StudentQuery,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + 'a;

  /// Assign a user to a staff role. A school has at most one head teacher and
  /// a county at most one county admin.
  fn add_staff(
    &self,
    input: NewStaff,
  ) -> impl Future<Output = Result<Staff, Self::Error>> + Send + '_;

  /// The staff assignment for a user, if any.
  fn staff_for_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Option<Staff>, Self::Error>> + Send + '_;

  fn get_staff(
    &self,
    staff_id: i64,
  ) -> impl Future<Output = Result<Option<Staff>, Self::Error>> + Send + '_;

  /// Edit a staff assignment, keeping the user's role in step with it. The
  /// head teacher and county admin limits apply as in [`Self::add_staff`].
  fn update_staff(
    &self,
    staff_id: i64,
    input: StaffUpdate,
  ) -> impl Future<Output = Result<Staff, Self::Error>> + Send + '_;

  // ── Performance ───────────────────────────────────────────────────────

  /// Validate and persist a performance record. Totals are derived here.
  /// The student must be enrolled at `input.school_id` when the row is
  /// written. A second record for the same `(student_id, term, year)` is
  /// rejected.
  fn record_performance(
    &self,
    input: NewPerformanceRecord,
  ) -> impl Future<Output = Result<PerformanceRecord, Self::Error>> + Send + '_;

  /// The report card for one student and period, or `None`.
  fn fetch_report(
    &self,
    student_id: i64,
    term: Term,
    year: i32,
  ) -> impl Future<Output = Result<Option<PerformanceView>, Self::Error>> + Send + '_;

  /// Records matching `filter`, in insertion order.
  fn fetch_performance<'a>(
    &'a self,
    filter: &'a PerformanceFilter,
  ) -> impl Future<Output = Result<Vec<PerformanceView>, Self::Error>> + Send + 'a;

  /// Per-grade subject averages over students matching `filter`, ordered by
  /// grade.
  fn grade_summary<'a>(
    &'a self,
    filter: &'a PerformanceFilter,
  ) -> impl Future<Output = Result<Vec<GradeSummary>, Self::Error>> + Send + 'a;

  fn county_overview(
    &self,
    county: String,
  ) -> impl Future<Output = Result<CountyOverview, Self::Error>> + Send + '_;

  // ── Grade transition ──────────────────────────────────────────────────

  /// Move every listed student from the teacher's assigned grade to the next
  /// one. All or nothing.
  fn transition_students(
    &self,
    teacher_user_id: i64,
    student_ids: Vec<i64>,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  // ── Transfers ─────────────────────────────────────────────────────────

  /// Open a pending transfer out of the head teacher's school.
  fn request_transfer(
    &self,
    head_teacher_user_id: i64,
    student_id: i64,
    to_school_id: i64,
  ) -> impl Future<Output = Result<Transfer, Self::Error>> + Send + '_;

  fn list_pending_transfers(
    &self,
    county: String,
  ) -> impl Future<Output = Result<Vec<TransferSummary>, Self::Error>> + Send + '_;

  /// Approve or reject a pending transfer. Approval moves the student to the
  /// receiving school in the same transaction.
  fn decide_transfer(
    &self,
    county_admin_user_id: i64,
    transfer_id: i64,
    decision: TransferDecision,
  ) -> impl Future<Output = Result<Transfer, Self::Error>> + Send + '_;
}
