//! Grade levels and the arithmetic derived from them.
//!
//! Grades are stored as the string `"Grade N"` with `N` in `1..=9`. Every
//! value that reaches the store has been through [`Grade::new`] or
//! [`str::parse`], so the invariant holds for every persisted student.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 9;

const PREFIX: &str = "Grade ";

/// A grade level, `Grade 1` through `Grade 9`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Grade(u8);

impl Grade {
  pub fn new(level: u8) -> Result<Self> {
    if (MIN_GRADE..=MAX_GRADE).contains(&level) {
      Ok(Self(level))
    } else {
      Err(Error::InvalidGrade(level.to_string()))
    }
  }

  pub fn level(self) -> u8 { self.0 }

  /// The grade one level up, or [`Error::GradeCeiling`] from `Grade 9`.
  pub fn next(self) -> Result<Self> {
    if self.0 >= MAX_GRADE {
      return Err(Error::GradeCeiling(self.to_string()));
    }
    Ok(Self(self.0 + 1))
  }
}

impl fmt::Display for Grade {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{PREFIX}{}", self.0)
  }
}

impl FromStr for Grade {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let level = s
      .strip_prefix(PREFIX)
      .and_then(|n| n.trim().parse::<u8>().ok())
      .ok_or_else(|| Error::InvalidGrade(s.to_owned()))?;
    Self::new(level).map_err(|_| Error::InvalidGrade(s.to_owned()))
  }
}

impl TryFrom<String> for Grade {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

impl From<Grade> for String {
  fn from(g: Grade) -> Self { g.to_string() }
}

// ─── Historical grade ────────────────────────────────────────────────────────

/// The grade a student held when a past record was written, derived from
/// their current grade and the years elapsed since.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HistoricalGrade {
  Resolved {
    grade: Grade,
  },
  /// The arithmetic produced a level outside `1..=9`. The raw number is kept
  /// rather than clamped so the inconsistency stays visible.
  Inconsistent {
    grade_number: i32,
    warning:      String,
  },
}

impl HistoricalGrade {
  /// `current - (current_year - record_year)`, unclamped.
  pub fn resolve(current: Grade, record_year: i32, current_year: i32) -> Self {
    let grade_number = i32::from(current.level()) - (current_year - record_year);

    match u8::try_from(grade_number).ok().map(Grade::new) {
      Some(Ok(grade)) => Self::Resolved { grade },
      _ => Self::Inconsistent {
        grade_number,
        warning: format!(
          "record from {record_year} implies grade {grade_number} for a student \
           currently in {current}"
        ),
      },
    }
  }

  pub fn grade(&self) -> Option<Grade> {
    match self {
      Self::Resolved { grade } => Some(*grade),
      Self::Inconsistent { .. } => None,
    }
  }

  pub fn is_consistent(&self) -> bool { matches!(self, Self::Resolved { .. }) }
}
