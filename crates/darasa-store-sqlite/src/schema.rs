//! SQL schema for the Darasa SQLite store.
//!
//! Executed once at connection startup. The per-subject columns of the
//! `performance` table are generated from the subject catalog, so the table
//! and the catalog cannot drift apart.

use darasa_core::subject::SUBJECTS;

const PRELUDE: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    email       TEXT NOT NULL,
    role        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schools (
    school_id            INTEGER PRIMARY KEY AUTOINCREMENT,
    school_name          TEXT NOT NULL,
    county               TEXT NOT NULL,
    sub_county           TEXT NOT NULL,
    ward                 TEXT NOT NULL,
    registration_id      TEXT,
    date_of_registration TEXT NOT NULL,
    school_level         TEXT NOT NULL,
    school_category      TEXT NOT NULL,
    UNIQUE (school_name, county)
);

CREATE TABLE IF NOT EXISTS staffs (
    staff_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL UNIQUE REFERENCES users(user_id),
    school_id      INTEGER NOT NULL REFERENCES schools(school_id),
    name           TEXT NOT NULL,
    email          TEXT NOT NULL,
    mobile_number  TEXT NOT NULL,
    qualification  TEXT NOT NULL,
    role           TEXT NOT NULL,   -- 'Teacher' | 'Head Teacher' | 'County Admin'
    assigned_grade TEXT             -- 'Grade N' for teachers, else NULL
);

-- One head teacher per school. The one-admin-per-county rule spans a join
-- and is checked inside the insert transaction instead.
CREATE UNIQUE INDEX IF NOT EXISTS staffs_head_teacher_idx
    ON staffs(school_id) WHERE role = 'Head Teacher';

CREATE TABLE IF NOT EXISTS students (
    student_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    school_id      INTEGER NOT NULL REFERENCES schools(school_id),
    user_id        INTEGER REFERENCES users(user_id),
    name           TEXT NOT NULL,
    date_of_birth  TEXT NOT NULL,
    gender         TEXT NOT NULL,
    current_grade  TEXT NOT NULL CHECK (current_grade IN (
        'Grade 1', 'Grade 2', 'Grade 3', 'Grade 4', 'Grade 5',
        'Grade 6', 'Grade 7', 'Grade 8', 'Grade 9')),
    guardian_name  TEXT NOT NULL,
    guardian_phone TEXT NOT NULL,
    guardian_email TEXT,
    nationality    TEXT NOT NULL,
    student_email  TEXT
);

CREATE TABLE IF NOT EXISTS student_transfers (
    transfer_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id     INTEGER NOT NULL REFERENCES students(student_id),
    from_school_id INTEGER NOT NULL REFERENCES schools(school_id),
    to_school_id   INTEGER NOT NULL REFERENCES schools(school_id),
    request_date   TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'Pending'
                   CHECK (status IN ('Pending', 'Approved', 'Rejected')),
    approved_date  TEXT
);

CREATE INDEX IF NOT EXISTS students_class_idx   ON students(school_id, current_grade);
CREATE INDEX IF NOT EXISTS transfers_status_idx ON student_transfers(status);
";

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub fn schema() -> String {
  let subject_columns: String = SUBJECTS
    .iter()
    .map(|s| {
      format!(
        "    {score} INTEGER NOT NULL CHECK ({score} BETWEEN 0 AND 100),\n    \
         {reflection} TEXT NOT NULL DEFAULT '',\n    {comment} TEXT,\n",
        score = s.score_column(),
        reflection = s.reflection_column(),
        comment = s.comment_column(),
      )
    })
    .collect();

  format!(
    "{PRELUDE}
-- Performance records are append-only: no UPDATE or DELETE is ever issued.
CREATE TABLE IF NOT EXISTS performance (
    performance_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id      INTEGER NOT NULL REFERENCES students(student_id),
    school_id       INTEGER NOT NULL REFERENCES schools(school_id),
    term            TEXT NOT NULL CHECK (term IN ('Term 1', 'Term 2', 'Term 3')),
    year            INTEGER NOT NULL,
{subject_columns}    total_score     INTEGER NOT NULL,
    average_score   REAL NOT NULL,
    general_comment TEXT,
    recorded_at     TEXT NOT NULL,
    UNIQUE (student_id, term, year)
);

CREATE INDEX IF NOT EXISTS performance_year_term_idx ON performance(year, term);

PRAGMA user_version = 1;
"
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn schema_has_a_column_triple_per_subject() {
    let ddl = schema();
    for s in SUBJECTS {
      assert!(ddl.contains(&s.score_column()), "{}", s.key);
      assert!(ddl.contains(&s.reflection_column()), "{}", s.key);
      assert!(ddl.contains(&s.comment_column()), "{}", s.key);
    }
  }

  #[test]
  fn schema_applies_to_a_fresh_database() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch(&schema()).unwrap();
    // Idempotent.
    conn.execute_batch(&schema()).unwrap();
  }
}
