//! Performance records: one per student per term per year.
//!
//! A record carries a score/reflection/comment triple for every subject in the
//! [catalog](crate::subject::SUBJECTS). Records are written once by a teacher
//! and never updated; totals and averages are derived at write time.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  grade::{Grade, HistoricalGrade},
  subject::{SUBJECT_COUNT, SUBJECTS},
};

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

/// Years accepted on a new record.
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 2000..=2100;

// ─── Term ────────────────────────────────────────────────────────────────────

/// One of the three academic periods in a year.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
pub enum Term {
  #[serde(rename = "Term 1")]
  #[strum(serialize = "Term 1")]
  Term1,
  #[serde(rename = "Term 2")]
  #[strum(serialize = "Term 2")]
  Term2,
  #[serde(rename = "Term 3")]
  #[strum(serialize = "Term 3")]
  Term3,
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// One subject's entry as submitted by a teacher. The score is kept wide so
/// out-of-range values reach validation instead of failing deserialisation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectEntry {
  pub score:      i64,
  #[serde(default)]
  pub reflection: String,
  pub comment:    Option<String>,
}

/// Input to [`crate::store::SchoolStore::record_performance`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPerformanceRecord {
  pub student_id:      i64,
  pub school_id:       i64,
  pub term:            Term,
  pub year:            i32,
  /// Keyed by subject key; must contain exactly the catalog subjects.
  pub subjects:        BTreeMap<String, SubjectEntry>,
  pub general_comment: Option<String>,
}

impl NewPerformanceRecord {
  /// Check every subject against the catalog and derive totals.
  ///
  /// Subjects are checked in catalog order and the first failure aborts; no
  /// partially-valid sheet is ever returned.
  pub fn validate(&self) -> Result<ScoreSheet> {
    if !YEAR_RANGE.contains(&self.year) {
      return Err(Error::InvalidYear(self.year));
    }

    if let Some(unknown) = self
      .subjects
      .keys()
      .find(|k| crate::subject::by_key(k).is_none())
    {
      return Err(Error::UnknownSubject(unknown.clone()));
    }

    let mut results = Vec::with_capacity(SUBJECT_COUNT);
    for subject in &SUBJECTS {
      let entry = self
        .subjects
        .get(subject.key)
        .ok_or(Error::MissingSubject(subject.display_name))?;

      if !(MIN_SCORE..=MAX_SCORE).contains(&entry.score) {
        return Err(Error::ScoreOutOfRange {
          subject: subject.display_name,
          score:   entry.score,
        });
      }

      results.push(SubjectResult {
        key:        subject.key.to_owned(),
        name:       subject.display_name.to_owned(),
        score:      entry.score as u8,
        reflection: entry.reflection.clone(),
        comment:    entry.comment.clone().filter(|c| !c.trim().is_empty()),
      });
    }

    let (total_score, average_score) = totals(results.iter().map(|r| r.score));
    Ok(ScoreSheet { results, total_score, average_score })
  }
}

// ─── Derived ─────────────────────────────────────────────────────────────────

/// A validated set of subject results in catalog order, with totals.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSheet {
  pub results:       Vec<SubjectResult>,
  pub total_score:   u32,
  pub average_score: f64,
}

/// Sum of the scores and the mean over the whole catalog, to 2 dp.
pub fn totals(scores: impl IntoIterator<Item = u8>) -> (u32, f64) {
  let total: u32 = scores.into_iter().map(u32::from).sum();
  (total, round2(f64::from(total) / SUBJECT_COUNT as f64))
}

pub fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }

// ─── Stored record ───────────────────────────────────────────────────────────

/// One subject's stored result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectResult {
  pub key:        String,
  pub name:       String,
  pub score:      u8,
  pub reflection: String,
  pub comment:    Option<String>,
}

/// A persisted performance record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
  pub performance_id:  i64,
  pub student_id:      i64,
  pub school_id:       i64,
  pub term:            Term,
  pub year:            i32,
  pub subjects:        Vec<SubjectResult>,
  pub total_score:     u32,
  pub average_score:   f64,
  pub general_comment: Option<String>,
  /// Server-assigned timestamp.
  pub recorded_at:     DateTime<Utc>,
}

/// A record joined with student details, the derived historical grade and
/// the name of the teacher currently assigned to the student's class.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceView {
  #[serde(flatten)]
  pub record:           PerformanceRecord,
  pub student_name:     String,
  pub current_grade:    Grade,
  pub historical_grade: HistoricalGrade,
  /// Best-effort join; `None` when no teacher is assigned to the grade.
  pub teacher_name:     Option<String>,
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Average score for one subject within a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectAverage {
  pub key:     &'static str,
  pub name:    &'static str,
  /// `None` when the group has students but no records.
  pub average: Option<f64>,
}

/// One row of the grade-grouped performance summary.
#[derive(Debug, Clone, Serialize)]
pub struct GradeSummary {
  pub grade:         Grade,
  pub student_count: u32,
  pub averages:      Vec<SubjectAverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubCountyAverage {
  pub sub_county:    String,
  pub average_score: f64,
}

/// County-wide performance statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CountyOverview {
  pub county:            String,
  pub average_score:     Option<f64>,
  pub students_assessed: u32,
  pub sub_counties:      Vec<SubCountyAverage>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn full_sheet(score: i64) -> BTreeMap<String, SubjectEntry> {
    SUBJECTS
      .iter()
      .map(|s| {
        (s.key.to_owned(), SubjectEntry {
          score,
          reflection: "Meeting expectations".into(),
          comment: None,
        })
      })
      .collect()
  }

  fn new_record(subjects: BTreeMap<String, SubjectEntry>) -> NewPerformanceRecord {
    NewPerformanceRecord {
      student_id: 1,
      school_id: 1,
      term: Term::Term1,
      year: 2024,
      subjects,
      general_comment: None,
    }
  }

  #[test]
  fn term_string_forms() {
    assert_eq!(Term::Term2.to_string(), "Term 2");
    assert_eq!("Term 3".parse::<Term>().unwrap(), Term::Term3);
    assert!("Term 4".parse::<Term>().is_err());
    assert_eq!(serde_json::to_string(&Term::Term1).unwrap(), "\"Term 1\"");
  }

  #[test]
  fn valid_sheet_totals_and_average() {
    let mut subjects = full_sheet(50);
    subjects.get_mut("maths").unwrap().score = 100;
    subjects.get_mut("music").unwrap().score = 7;

    let sheet = new_record(subjects).validate().unwrap();
    assert_eq!(sheet.results.len(), 12);
    assert_eq!(sheet.total_score, 50 * 10 + 100 + 7);
    // 607 / 12 = 50.5833...
    assert_eq!(sheet.average_score, 50.58);
  }

  #[test]
  fn results_follow_catalog_order() {
    let sheet = new_record(full_sheet(60)).validate().unwrap();
    let keys: Vec<_> = sheet.results.iter().map(|r| r.key.as_str()).collect();
    let catalog: Vec<_> = SUBJECTS.iter().map(|s| s.key).collect();
    assert_eq!(keys, catalog);
  }

  #[test]
  fn boundary_scores_are_accepted() {
    let mut subjects = full_sheet(0);
    subjects.get_mut("english").unwrap().score = 100;
    assert!(new_record(subjects).validate().is_ok());
  }

  #[test]
  fn negative_score_rejects_whole_record() {
    let mut subjects = full_sheet(70);
    subjects.get_mut("kiswahili").unwrap().score = -1;
    match new_record(subjects).validate() {
      Err(Error::ScoreOutOfRange { subject, score }) => {
        assert_eq!(subject, "Kiswahili");
        assert_eq!(score, -1);
      }
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[test]
  fn first_failing_subject_in_catalog_order_is_reported() {
    let mut subjects = full_sheet(70);
    subjects.get_mut("music").unwrap().score = 101;
    subjects.get_mut("english").unwrap().score = 101;
    assert!(matches!(
      new_record(subjects).validate(),
      Err(Error::ScoreOutOfRange { subject: "English", score: 101 })
    ));
  }

  #[test]
  fn missing_and_unknown_subjects_are_rejected() {
    let mut subjects = full_sheet(70);
    subjects.remove("pe");
    assert!(matches!(
      new_record(subjects).validate(),
      Err(Error::MissingSubject("P.E."))
    ));

    let mut subjects = full_sheet(70);
    subjects.insert("latin".into(), SubjectEntry::default());
    assert!(matches!(
      new_record(subjects).validate(),
      Err(Error::UnknownSubject(_))
    ));
  }

  #[test]
  fn year_outside_range_is_rejected() {
    let mut r = new_record(full_sheet(70));
    r.year = 1999;
    assert!(matches!(r.validate(), Err(Error::InvalidYear(1999))));
  }

  #[test]
  fn blank_comment_is_stored_as_none() {
    let mut subjects = full_sheet(70);
    subjects.get_mut("maths").unwrap().comment = Some("  ".into());
    subjects.get_mut("english").unwrap().comment = Some("Good work".into());
    let sheet = new_record(subjects).validate().unwrap();
    assert_eq!(sheet.results[0].comment, None);
    assert_eq!(sheet.results[1].comment.as_deref(), Some("Good work"));
  }

  #[test]
  fn totals_round_to_two_places() {
    assert_eq!(totals([1u8; 12]), (12, 1.0));
    assert_eq!(totals([100, 100, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]), (201, 16.75));
    assert_eq!(totals([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]), (1, 0.08));
  }
}
