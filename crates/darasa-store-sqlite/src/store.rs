//! [`SqliteStore`], the SQLite implementation of [`SchoolStore`].

use std::path::Path;

use chrono::{Datelike as _, Utc};
use darasa_core::{
  grade::Grade,
  performance::{
    CountyOverview, GradeSummary, NewPerformanceRecord, PerformanceRecord,
    PerformanceView, SubCountyAverage, SubjectAverage, Term, round2,
  },
  school::{
    NewSchool, NewStaff, NewStudent, NewUser, Role, School, Staff, StaffUpdate,
    Student, StudentQuery, StudentUpdate, User,
  },
  store::{PerformanceFilter, SchoolStore},
  subject::{SUBJECTS, Subject},
  transfer::{Transfer, TransferDecision, TransferStatus, TransferSummary},
};
use rusqlite::{OptionalExtension as _, types::Value};

use crate::{
  Error, Result,
  encode::{
    RawPerformanceView, RawSchool, RawStaff, RawStudent, RawTransfer,
    RawTransferSummary, RawUser, SCHOOL_COLUMNS, STAFF_COLUMNS, STUDENT_COLUMNS,
    TRANSFER_COLUMNS, USER_COLUMNS, decode_grade, encode_date, encode_dt,
  },
  query::{self, BuiltQuery},
  schema::schema,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Darasa store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let ddl = schema();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `work` against the connection without a transaction.
  async fn read<T, F>(&self, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(work(conn))).await?
  }

  /// Run `work` inside a single transaction. It commits only if `work`
  /// returns `Ok`; on any error the transaction is dropped and rolled back.
  async fn transact<T, F>(&self, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match work(&tx) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(e) => Ok(Err(e)),
        }
      })
      .await?
  }

  /// Run raw SQL against the connection, for tests that need to tamper with
  /// the database.
  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .read(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await
  }

  async fn query_views(
    &self,
    built: BuiltQuery,
    as_of_year: i32,
  ) -> Result<Vec<PerformanceView>> {
    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&built.sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(built.params.iter()),
            RawPerformanceView::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(|r| r.into_view(as_of_year)).collect()
  }
}

// ─── Row loaders (usable inside and outside transactions) ────────────────────

fn load_user(conn: &rusqlite::Connection, user_id: i64) -> Result<Option<User>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      rusqlite::params![user_id],
      RawUser::from_row,
    )
    .optional()?
    .map(RawUser::into_user)
    .transpose()
}

fn load_school(conn: &rusqlite::Connection, school_id: i64) -> Result<Option<School>> {
  conn
    .query_row(
      &format!("SELECT {SCHOOL_COLUMNS} FROM schools WHERE school_id = ?1"),
      rusqlite::params![school_id],
      RawSchool::from_row,
    )
    .optional()?
    .map(RawSchool::into_school)
    .transpose()
}

fn load_student(conn: &rusqlite::Connection, student_id: i64) -> Result<Option<Student>> {
  conn
    .query_row(
      &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = ?1"),
      rusqlite::params![student_id],
      RawStudent::from_row,
    )
    .optional()?
    .map(RawStudent::into_student)
    .transpose()
}

fn load_staff(conn: &rusqlite::Connection, user_id: i64) -> Result<Option<Staff>> {
  conn
    .query_row(
      &format!("SELECT {STAFF_COLUMNS} FROM staffs WHERE user_id = ?1"),
      rusqlite::params![user_id],
      RawStaff::from_row,
    )
    .optional()?
    .map(RawStaff::into_staff)
    .transpose()
}

fn load_transfer(conn: &rusqlite::Connection, transfer_id: i64) -> Result<Option<Transfer>> {
  conn
    .query_row(
      &format!("SELECT {TRANSFER_COLUMNS} FROM student_transfers WHERE transfer_id = ?1"),
      rusqlite::params![transfer_id],
      RawTransfer::from_row,
    )
    .optional()?
    .map(RawTransfer::into_transfer)
    .transpose()
}

fn load_staff_member(conn: &rusqlite::Connection, staff_id: i64) -> Result<Option<Staff>> {
  conn
    .query_row(
      &format!("SELECT {STAFF_COLUMNS} FROM staffs WHERE staff_id = ?1"),
      rusqlite::params![staff_id],
      RawStaff::from_row,
    )
    .optional()?
    .map(RawStaff::into_staff)
    .transpose()
}

/// The caller's staff row, which must carry `role`.
fn require_staff(conn: &rusqlite::Connection, user_id: i64, role: Role) -> Result<Staff> {
  let staff =
    load_staff(conn, user_id)?.ok_or(darasa_core::Error::StaffNotFound(user_id))?;
  if staff.role != role {
    return Err(darasa_core::Error::WrongRole { user_id, required: role }.into());
  }
  Ok(staff)
}

/// Fail if `role` is one a school (head teacher) or county (county admin)
/// holds at most once and someone other than `except` already holds it.
fn ensure_role_vacant(
  conn: &rusqlite::Connection,
  school: &School,
  role: Role,
  except: Option<i64>,
) -> Result<()> {
  match role {
    Role::HeadTeacher => {
      let taken: bool = conn.query_row(
        "SELECT EXISTS (
           SELECT 1 FROM staffs
           WHERE school_id = ?1 AND role = ?2 AND staff_id IS NOT ?3)",
        rusqlite::params![school.school_id, Role::HeadTeacher.as_ref(), except],
        |r| r.get(0),
      )?;
      if taken {
        return Err(darasa_core::Error::HeadTeacherExists(school.school_id).into());
      }
    }
    Role::CountyAdmin => {
      let taken: bool = conn.query_row(
        "SELECT EXISTS (
           SELECT 1 FROM staffs st
           JOIN schools sc ON sc.school_id = st.school_id
           WHERE sc.county = ?1 AND st.role = ?2 AND st.staff_id IS NOT ?3)",
        rusqlite::params![school.county, Role::CountyAdmin.as_ref(), except],
        |r| r.get(0),
      )?;
      if taken {
        return Err(darasa_core::Error::CountyAdminExists(school.county.clone()).into());
      }
    }
    _ => {}
  }
  Ok(())
}

fn is_foreign_key_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
  )
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

fn current_year() -> i32 { Utc::now().year() }

// ─── SchoolStore impl ────────────────────────────────────────────────────────

impl SchoolStore for SqliteStore {
  type Error = Error;

  // ── Registry ──────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    if input.username.trim().is_empty() {
      return Err(darasa_core::Error::Invalid("username must not be empty".into()).into());
    }
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let role_str = input.role.to_string();
    let username = input.username.clone();
    let email = input.email.clone();
    let role = input.role;

    let user_id = self
      .transact(move |tx| {
        let inserted = tx.execute(
          "INSERT INTO users (username, email, role, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![username, email, role_str, at_str],
        );
        let user_id = match inserted {
          Ok(_) => tx.last_insert_rowid(),
          Err(e) if is_unique_violation(&e) => {
            return Err(darasa_core::Error::DuplicateUsername(username).into());
          }
          Err(e) => return Err(e.into()),
        };

        // A teacher registers the student first; the account attaches later.
        if role == Role::Student {
          let linked = tx.execute(
            "UPDATE students SET user_id = ?1 WHERE student_email = ?2 AND user_id IS NULL",
            rusqlite::params![user_id, email],
          )?;
          if linked > 0 {
            tracing::info!(user_id, linked, "student account linked");
          }
        }
        Ok(user_id)
      })
      .await?;

    Ok(User {
      user_id,
      username: input.username,
      email: input.email,
      role: input.role,
      created_at,
    })
  }

  async fn update_user(&self, user_id: i64, input: NewUser) -> Result<User> {
    if input.username.trim().is_empty() {
      return Err(darasa_core::Error::Invalid("username must not be empty".into()).into());
    }

    self
      .transact(move |tx| {
        let existing =
          load_user(tx, user_id)?.ok_or(darasa_core::Error::UserNotFound(user_id))?;
        let updated = tx.execute(
          "UPDATE users SET username = ?1, email = ?2, role = ?3 WHERE user_id = ?4",
          rusqlite::params![input.username, input.email, input.role.as_ref(), user_id],
        );
        match updated {
          Ok(_) => Ok(User {
            username: input.username,
            email: input.email,
            role: input.role,
            ..existing
          }),
          Err(e) if is_unique_violation(&e) => {
            Err(darasa_core::Error::DuplicateUsername(input.username).into())
          }
          Err(e) => Err(e.into()),
        }
      })
      .await
  }

  async fn delete_user(&self, user_id: i64) -> Result<()> {
    self
      .read(move |conn| {
        let deleted =
          conn.execute("DELETE FROM users WHERE user_id = ?1", rusqlite::params![user_id]);
        match deleted {
          Ok(0) => Err(darasa_core::Error::UserNotFound(user_id).into()),
          Ok(_) => Ok(()),
          Err(e) if is_foreign_key_violation(&e) => {
            Err(darasa_core::Error::UserInUse(user_id).into())
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;
    tracing::info!(user_id, "user deleted");
    Ok(())
  }

  async fn add_school(&self, input: NewSchool) -> Result<School> {
    input.validate()?;
    let date = input
      .date_of_registration
      .unwrap_or_else(|| Utc::now().date_naive());

    let school = School {
      school_id:            0,
      school_name:          input.school_name.trim().to_owned(),
      county:               input.county.trim().to_owned(),
      sub_county:           input.sub_county.trim().to_owned(),
      ward:                 input.ward,
      registration_id:      input.registration_id,
      date_of_registration: date,
      school_level:         input.school_level,
      school_category:      input.school_category,
    };
    let row = school.clone();

    let school_id = self
      .read(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO schools (
             school_name, county, sub_county, ward, registration_id,
             date_of_registration, school_level, school_category
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            row.school_name,
            row.county,
            row.sub_county,
            row.ward,
            row.registration_id,
            encode_date(row.date_of_registration),
            row.school_level,
            row.school_category,
          ],
        );
        match inserted {
          Ok(_) => Ok(conn.last_insert_rowid()),
          Err(e) if is_unique_violation(&e) => Err(
            darasa_core::Error::DuplicateSchool { name: row.school_name, county: row.county }
              .into(),
          ),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(School { school_id, ..school })
  }

  async fn get_school(&self, school_id: i64) -> Result<Option<School>> {
    self.read(move |conn| load_school(conn, school_id)).await
  }

  async fn update_school(&self, school_id: i64, input: NewSchool) -> Result<School> {
    input.validate()?;

    self
      .transact(move |tx| {
        let existing =
          load_school(tx, school_id)?.ok_or(darasa_core::Error::SchoolNotFound(school_id))?;
        let school = School {
          school_id,
          school_name: input.school_name.trim().to_owned(),
          county: input.county.trim().to_owned(),
          sub_county: input.sub_county.trim().to_owned(),
          ward: input.ward,
          registration_id: input.registration_id,
          date_of_registration: input
            .date_of_registration
            .unwrap_or(existing.date_of_registration),
          school_level: input.school_level,
          school_category: input.school_category,
        };

        let updated = tx.execute(
          "UPDATE schools SET
             school_name = ?1, county = ?2, sub_county = ?3, ward = ?4,
             registration_id = ?5, date_of_registration = ?6, school_level = ?7,
             school_category = ?8
           WHERE school_id = ?9",
          rusqlite::params![
            school.school_name,
            school.county,
            school.sub_county,
            school.ward,
            school.registration_id,
            encode_date(school.date_of_registration),
            school.school_level,
            school.school_category,
            school_id,
          ],
        );
        match updated {
          Ok(_) => Ok(school),
          Err(e) if is_unique_violation(&e) => Err(
            darasa_core::Error::DuplicateSchool {
              name:   school.school_name,
              county: school.county,
            }
            .into(),
          ),
          Err(e) => Err(e.into()),
        }
      })
      .await
  }

  async fn delete_school(&self, school_id: i64) -> Result<()> {
    self
      .read(move |conn| {
        let deleted = conn
          .execute("DELETE FROM schools WHERE school_id = ?1", rusqlite::params![school_id]);
        match deleted {
          Ok(0) => Err(darasa_core::Error::SchoolNotFound(school_id).into()),
          Ok(_) => Ok(()),
          Err(e) if is_foreign_key_violation(&e) => {
            Err(darasa_core::Error::SchoolInUse(school_id).into())
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;
    tracing::info!(school_id, "school deleted");
    Ok(())
  }

  async fn list_sub_counties(&self, county: String) -> Result<Vec<String>> {
    self
      .read(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT sub_county FROM schools WHERE county = ?1 ORDER BY sub_county",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![county], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await
  }

  async fn add_student(&self, input: NewStudent) -> Result<Student> {
    input.validate()?;

    self
      .transact(move |tx| {
        if load_school(tx, input.school_id)?.is_none() {
          return Err(darasa_core::Error::SchoolNotFound(input.school_id).into());
        }
        // A student who signed up before being enrolled is matched by email.
        let user_id = match (input.user_id, input.student_email.as_deref()) {
          (Some(id), _) => Some(id),
          (None, Some(email)) => tx
            .query_row(
              "SELECT user_id FROM users WHERE email = ?1 AND role = ?2
               ORDER BY user_id LIMIT 1",
              rusqlite::params![email, Role::Student.as_ref()],
              |r| r.get(0),
            )
            .optional()?,
          (None, None) => None,
        };
        tx.execute(
          "INSERT INTO students (
             school_id, user_id, name, date_of_birth, gender, current_grade,
             guardian_name, guardian_phone, guardian_email, nationality, student_email
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            input.school_id,
            user_id,
            input.name,
            encode_date(input.date_of_birth),
            input.gender,
            input.current_grade.to_string(),
            input.guardian_name,
            input.guardian_phone,
            input.guardian_email,
            input.nationality,
            input.student_email,
          ],
        )?;
        Ok(Student {
          student_id:     tx.last_insert_rowid(),
          school_id:      input.school_id,
          user_id,
          name:           input.name,
          date_of_birth:  input.date_of_birth,
          gender:         input.gender,
          current_grade:  input.current_grade,
          guardian_name:  input.guardian_name,
          guardian_phone: input.guardian_phone,
          guardian_email: input.guardian_email,
          nationality:    input.nationality,
          student_email:  input.student_email,
        })
      })
      .await
  }

  async fn get_student(&self, student_id: i64) -> Result<Option<Student>> {
    self.read(move |conn| load_student(conn, student_id)).await
  }

  async fn update_student(&self, student_id: i64, input: StudentUpdate) -> Result<Student> {
    input.validate()?;

    let student = self
      .transact(move |tx| {
        let existing = load_student(tx, student_id)?
          .ok_or(darasa_core::Error::StudentNotFound(student_id))?;
        tx.execute(
          "UPDATE students SET
             name = ?1, date_of_birth = ?2, gender = ?3, current_grade = ?4,
             guardian_name = ?5, guardian_phone = ?6, guardian_email = ?7,
             nationality = ?8
           WHERE student_id = ?9",
          rusqlite::params![
            input.name,
            encode_date(input.date_of_birth),
            input.gender,
            input.current_grade.to_string(),
            input.guardian_name,
            input.guardian_phone,
            input.guardian_email,
            input.nationality,
            student_id,
          ],
        )?;
        Ok(Student {
          name: input.name,
          date_of_birth: input.date_of_birth,
          gender: input.gender,
          current_grade: input.current_grade,
          guardian_name: input.guardian_name,
          guardian_phone: input.guardian_phone,
          guardian_email: input.guardian_email,
          nationality: input.nationality,
          ..existing
        })
      })
      .await?;

    tracing::info!(student_id, grade = %student.current_grade, "student updated");
    Ok(student)
  }

  async fn list_students(&self, query: &StudentQuery) -> Result<Vec<Student>> {
    let mut conds: Vec<String> = vec![];
    let mut params: Vec<Value> = vec![];
    if let Some(id) = query.school_id {
      params.push(id.into());
      conds.push(format!("school_id = ?{}", params.len()));
    }
    if let Some(grade) = query.grade {
      params.push(grade.to_string().into());
      conds.push(format!("current_grade = ?{}", params.len()));
    }
    if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
      params.push(format!("%{name}%").into());
      conds.push(format!("name LIKE ?{}", params.len()));
    }
    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let sql = format!(
      "SELECT {STUDENT_COLUMNS} FROM students {where_clause} ORDER BY student_id"
    );

    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawStudent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStudent::into_student).collect()
  }

  async fn add_staff(&self, input: NewStaff) -> Result<Staff> {
    input.validate()?;

    self
      .transact(move |tx| {
        if load_user(tx, input.user_id)?.is_none() {
          return Err(darasa_core::Error::UserNotFound(input.user_id).into());
        }
        let school = load_school(tx, input.school_id)?
          .ok_or(darasa_core::Error::SchoolNotFound(input.school_id))?;
        if load_staff(tx, input.user_id)?.is_some() {
          return Err(darasa_core::Error::AlreadyStaff(input.user_id).into());
        }

        ensure_role_vacant(tx, &school, input.role, None)?;

        tx.execute(
          "INSERT INTO staffs (
             user_id, school_id, name, email, mobile_number, qualification,
             role, assigned_grade
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            input.user_id,
            input.school_id,
            input.name,
            input.email,
            input.mobile_number,
            input.qualification,
            input.role.as_ref(),
            input.assigned_grade.map(|g| g.to_string()),
          ],
        )?;

        Ok(Staff {
          staff_id:       tx.last_insert_rowid(),
          user_id:        input.user_id,
          school_id:      input.school_id,
          name:           input.name,
          email:          input.email,
          mobile_number:  input.mobile_number,
          qualification:  input.qualification,
          role:           input.role,
          assigned_grade: input.assigned_grade,
        })
      })
      .await
  }

  async fn staff_for_user(&self, user_id: i64) -> Result<Option<Staff>> {
    self.read(move |conn| load_staff(conn, user_id)).await
  }

  async fn get_staff(&self, staff_id: i64) -> Result<Option<Staff>> {
    self.read(move |conn| load_staff_member(conn, staff_id)).await
  }

  async fn update_staff(&self, staff_id: i64, input: StaffUpdate) -> Result<Staff> {
    input.validate()?;

    let staff = self
      .transact(move |tx| {
        let existing = load_staff_member(tx, staff_id)?
          .ok_or(darasa_core::Error::StaffMemberNotFound(staff_id))?;
        let school = load_school(tx, existing.school_id)?
          .ok_or(darasa_core::Error::SchoolNotFound(existing.school_id))?;
        ensure_role_vacant(tx, &school, input.role, Some(staff_id))?;

        tx.execute(
          "UPDATE staffs SET
             name = ?1, email = ?2, mobile_number = ?3, qualification = ?4,
             role = ?5, assigned_grade = ?6
           WHERE staff_id = ?7",
          rusqlite::params![
            input.name,
            input.email,
            input.mobile_number,
            input.qualification,
            input.role.as_ref(),
            input.assigned_grade.map(|g| g.to_string()),
            staff_id,
          ],
        )?;
        tx.execute(
          "UPDATE users SET role = ?1 WHERE user_id = ?2",
          rusqlite::params![input.role.as_ref(), existing.user_id],
        )?;

        Ok(Staff {
          name: input.name,
          email: input.email,
          mobile_number: input.mobile_number,
          qualification: input.qualification,
          role: input.role,
          assigned_grade: input.assigned_grade,
          ..existing
        })
      })
      .await?;

    tracing::info!(staff_id, role = %staff.role, school_id = staff.school_id, "staff updated");
    Ok(staff)
  }

  // ── Performance ───────────────────────────────────────────────────────────

  async fn record_performance(
    &self,
    input: NewPerformanceRecord,
  ) -> Result<PerformanceRecord> {
    let sheet = input.validate()?;
    let recorded_at = Utc::now();

    let mut columns = vec!["student_id", "school_id", "term", "year"]
      .into_iter()
      .map(str::to_owned)
      .collect::<Vec<_>>();
    let mut params: Vec<Value> = vec![
      input.student_id.into(),
      input.school_id.into(),
      input.term.to_string().into(),
      i64::from(input.year).into(),
    ];
    for (subject, result) in SUBJECTS.iter().zip(&sheet.results) {
      columns.push(subject.score_column());
      columns.push(subject.reflection_column());
      columns.push(subject.comment_column());
      params.push(i64::from(result.score).into());
      params.push(result.reflection.clone().into());
      params.push(result.comment.clone().into());
    }
    columns.extend(
      ["total_score", "average_score", "general_comment", "recorded_at"].map(str::to_owned),
    );
    params.push(i64::from(sheet.total_score).into());
    params.push(sheet.average_score.into());
    params.push(input.general_comment.clone().into());
    params.push(encode_dt(recorded_at).into());

    let placeholders = (1..=params.len())
      .map(|i| format!("?{i}"))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "INSERT INTO performance ({}) VALUES ({placeholders})",
      columns.join(", ")
    );

    let (student_id, school_id) = (input.student_id, input.school_id);
    let (term, year) = (input.term, input.year);
    let performance_id = self
      .transact(move |tx| {
        let student = load_student(tx, student_id)?
          .ok_or(darasa_core::Error::StudentNotFound(student_id))?;
        if student.school_id != school_id {
          return Err(darasa_core::Error::StudentNotEnrolled { student_id, school_id }.into());
        }
        let inserted = tx.execute(&sql, rusqlite::params_from_iter(params.iter()));
        match inserted {
          Ok(_) => Ok(tx.last_insert_rowid()),
          Err(e) if is_unique_violation(&e) => Err(
            darasa_core::Error::DuplicateRecord {
              student_id,
              term: term.to_string(),
              year,
            }
            .into(),
          ),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    tracing::info!(
      performance_id,
      student_id,
      term = %input.term,
      year = input.year,
      average_score = sheet.average_score,
      "performance recorded"
    );

    Ok(PerformanceRecord {
      performance_id,
      student_id: input.student_id,
      school_id: input.school_id,
      term: input.term,
      year: input.year,
      subjects: sheet.results,
      total_score: sheet.total_score,
      average_score: sheet.average_score,
      general_comment: input.general_comment,
      recorded_at,
    })
  }

  async fn fetch_report(
    &self,
    student_id: i64,
    term: Term,
    year: i32,
  ) -> Result<Option<PerformanceView>> {
    let filter = PerformanceFilter::default().student(student_id).term(term).year(year);
    let mut views = self
      .query_views(query::performance_rows(&filter), current_year())
      .await?;
    // The (student_id, term, year) constraint leaves at most one row.
    Ok(if views.is_empty() { None } else { Some(views.swap_remove(0)) })
  }

  async fn fetch_performance(
    &self,
    filter: &PerformanceFilter,
  ) -> Result<Vec<PerformanceView>> {
    let as_of_year = filter.as_of_year.unwrap_or_else(current_year);
    self.query_views(query::performance_rows(filter), as_of_year).await
  }

  async fn grade_summary(&self, filter: &PerformanceFilter) -> Result<Vec<GradeSummary>> {
    let built = query::grade_summary(filter);
    let projected: Vec<&'static Subject> = match filter.subject {
      Some(subject) => vec![subject],
      None => SUBJECTS.iter().collect(),
    };
    let width = projected.len();

    let rows: Vec<(String, i64, Vec<Option<f64>>)> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&built.sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(built.params.iter()), |row| {
            let averages = (0..width)
              .map(|i| row.get::<_, Option<f64>>(2 + i))
              .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok((row.get(0)?, row.get(1)?, averages))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut summaries = rows
      .into_iter()
      .map(|(grade, count, averages)| {
        Ok(GradeSummary {
          grade:         decode_grade(&grade)?,
          student_count: u32::try_from(count).unwrap_or_default(),
          averages:      projected
            .iter()
            .zip(averages)
            .map(|(s, avg)| SubjectAverage {
              key:     s.key,
              name:    s.display_name,
              average: avg.map(round2),
            })
            .collect(),
        })
      })
      .collect::<Result<Vec<_>>>()?;

    summaries.sort_by_key(|s| s.grade);
    Ok(summaries)
  }

  async fn county_overview(&self, county: String) -> Result<CountyOverview> {
    let key = county.clone();
    let (average, assessed, sub_counties) = self
      .read(move |conn| {
        let (average, assessed): (Option<f64>, i64) = conn.query_row(
          "SELECT AVG(p.average_score), COUNT(DISTINCT p.student_id)
           FROM performance p
           JOIN students s  ON s.student_id = p.student_id
           JOIN schools  sc ON sc.school_id = s.school_id
           WHERE sc.county = ?1",
          rusqlite::params![key],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let mut stmt = conn.prepare(
          "SELECT sc.sub_county, AVG(p.average_score)
           FROM performance p
           JOIN students s  ON s.student_id = p.student_id
           JOIN schools  sc ON sc.school_id = s.school_id
           WHERE sc.county = ?1
           GROUP BY sc.sub_county
           ORDER BY sc.sub_county",
        )?;
        let sub_counties = stmt
          .query_map(rusqlite::params![key], |r| {
            Ok(SubCountyAverage {
              sub_county:    r.get(0)?,
              average_score: round2(r.get(1)?),
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((average, assessed, sub_counties))
      })
      .await?;

    Ok(CountyOverview {
      county,
      average_score: average.map(round2),
      students_assessed: u32::try_from(assessed).unwrap_or_default(),
      sub_counties,
    })
  }

  // ── Grade transition ──────────────────────────────────────────────────────

  async fn transition_students(
    &self,
    teacher_user_id: i64,
    student_ids: Vec<i64>,
  ) -> Result<Vec<Student>> {
    let mut ids = student_ids;
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    if ids.is_empty() {
      return Err(darasa_core::Error::Invalid("no students to transition".into()).into());
    }

    let (from, to, moved) = self
      .transact(move |tx| {
        let teacher = require_staff(tx, teacher_user_id, Role::Teacher)?;
        let from: Grade = teacher.assigned_grade.ok_or_else(|| {
          Error::Decode(format!("teacher {teacher_user_id} has no assigned grade"))
        })?;
        let to = from.next()?;

        let mut moved = Vec::with_capacity(ids.len());
        for student_id in ids {
          let student = load_student(tx, student_id)?
            .ok_or(darasa_core::Error::StudentNotFound(student_id))?;
          if student.school_id != teacher.school_id || student.current_grade != from {
            return Err(
              darasa_core::Error::StudentNotInClass {
                student_id,
                school_id: teacher.school_id,
                grade: from.to_string(),
              }
              .into(),
            );
          }
          tx.execute(
            "UPDATE students SET current_grade = ?1 WHERE student_id = ?2",
            rusqlite::params![to.to_string(), student_id],
          )?;
          moved.push(Student { current_grade: to, ..student });
        }
        Ok((from, to, moved))
      })
      .await?;

    tracing::info!(
      teacher_user_id,
      %from,
      %to,
      count = moved.len(),
      "students transitioned"
    );
    Ok(moved)
  }

  // ── Transfers ─────────────────────────────────────────────────────────────

  async fn request_transfer(
    &self,
    head_teacher_user_id: i64,
    student_id: i64,
    to_school_id: i64,
  ) -> Result<Transfer> {
    let today = Utc::now().date_naive();

    let transfer = self
      .transact(move |tx| {
        let head = require_staff(tx, head_teacher_user_id, Role::HeadTeacher)?;
        let student = load_student(tx, student_id)?
          .ok_or(darasa_core::Error::StudentNotFound(student_id))?;
        if student.school_id != head.school_id {
          return Err(
            darasa_core::Error::StudentNotEnrolled { student_id, school_id: head.school_id }
              .into(),
          );
        }
        if to_school_id == head.school_id {
          return Err(
            darasa_core::Error::Invalid("a student cannot transfer to their own school".into())
              .into(),
          );
        }
        let from = load_school(tx, head.school_id)?
          .ok_or(darasa_core::Error::SchoolNotFound(head.school_id))?;
        let to = load_school(tx, to_school_id)?
          .ok_or(darasa_core::Error::SchoolNotFound(to_school_id))?;
        if from.county != to.county {
          return Err(
            darasa_core::Error::Invalid(format!(
              "transfers stay within {}; {} is in {}",
              from.county, to.school_name, to.county
            ))
            .into(),
          );
        }

        let pending: bool = tx.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM student_transfers WHERE student_id = ?1 AND status = ?2)",
          rusqlite::params![student_id, TransferStatus::Pending.as_ref()],
          |r| r.get(0),
        )?;
        if pending {
          return Err(darasa_core::Error::TransferPending(student_id).into());
        }

        tx.execute(
          "INSERT INTO student_transfers (
             student_id, from_school_id, to_school_id, request_date, status
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            student_id,
            head.school_id,
            to_school_id,
            encode_date(today),
            TransferStatus::Pending.as_ref(),
          ],
        )?;

        Ok(Transfer {
          transfer_id: tx.last_insert_rowid(),
          student_id,
          from_school_id: head.school_id,
          to_school_id,
          request_date: today,
          status: TransferStatus::Pending,
          approved_date: None,
        })
      })
      .await?;

    tracing::info!(
      transfer_id = transfer.transfer_id,
      student_id,
      from_school_id = transfer.from_school_id,
      to_school_id,
      "transfer requested"
    );
    Ok(transfer)
  }

  async fn list_pending_transfers(&self, county: String) -> Result<Vec<TransferSummary>> {
    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT t.transfer_id, t.student_id, t.from_school_id, t.to_school_id,
                  t.request_date, t.status, t.approved_date,
                  s.name, sf.school_name, stt.school_name
           FROM student_transfers t
           JOIN students s   ON s.student_id  = t.student_id
           JOIN schools  sf  ON sf.school_id  = t.from_school_id
           JOIN schools  stt ON stt.school_id = t.to_school_id
           WHERE sf.county = ?1 AND t.status = ?2
           ORDER BY t.transfer_id",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![county, TransferStatus::Pending.as_ref()],
            RawTransferSummary::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTransferSummary::into_summary).collect()
  }

  async fn decide_transfer(
    &self,
    county_admin_user_id: i64,
    transfer_id: i64,
    decision: TransferDecision,
  ) -> Result<Transfer> {
    let today = Utc::now().date_naive();

    let transfer = self
      .transact(move |tx| {
        let admin = require_staff(tx, county_admin_user_id, Role::CountyAdmin)?;
        let county = load_school(tx, admin.school_id)?
          .ok_or(darasa_core::Error::SchoolNotFound(admin.school_id))?
          .county;

        let transfer = load_transfer(tx, transfer_id)?
          .ok_or(darasa_core::Error::TransferNotFound(transfer_id))?;
        if transfer.status.is_terminal() {
          return Err(darasa_core::Error::TransferAlreadyDecided(transfer_id).into());
        }
        let from = load_school(tx, transfer.from_school_id)?
          .ok_or(darasa_core::Error::SchoolNotFound(transfer.from_school_id))?;
        if from.county != county {
          return Err(darasa_core::Error::OutsideCounty { transfer_id, county }.into());
        }

        let status = decision.status();
        let approved_date = (status == TransferStatus::Approved).then_some(today);
        tx.execute(
          "UPDATE student_transfers SET status = ?1, approved_date = ?2
           WHERE transfer_id = ?3",
          rusqlite::params![status.as_ref(), approved_date.map(encode_date), transfer_id],
        )?;

        if status == TransferStatus::Approved {
          let moved = tx.execute(
            "UPDATE students SET school_id = ?1 WHERE student_id = ?2",
            rusqlite::params![transfer.to_school_id, transfer.student_id],
          )?;
          if moved != 1 {
            return Err(darasa_core::Error::StudentNotFound(transfer.student_id).into());
          }
        }

        Ok(Transfer { status, approved_date, ..transfer })
      })
      .await?;

    tracing::info!(
      transfer_id,
      county_admin_user_id,
      status = %transfer.status,
      "transfer decided"
    );
    Ok(transfer)
  }
}
