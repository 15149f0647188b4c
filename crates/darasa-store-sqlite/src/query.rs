//! Dynamic query construction for filtered performance reads.
//!
//! Filter *values* are always bound parameters. The only text spliced into
//! the SQL is fixed column names and subject columns taken from the catalog.

use darasa_core::{
  store::PerformanceFilter,
  subject::{SUBJECTS, Subject},
};
use rusqlite::types::Value;

/// SQL text plus the positional parameters it references.
#[derive(Debug)]
pub struct BuiltQuery {
  pub sql:    String,
  pub params: Vec<Value>,
}

/// Accumulates `column = ?N` predicates joined with `AND`. Predicates on the
/// `performance` row are kept apart so an outer join can apply them in its
/// `ON` clause.
#[derive(Default)]
struct Predicates {
  clauses:     Vec<String>,
  performance: Vec<String>,
  params:      Vec<Value>,
}

impl Predicates {
  fn push(&mut self, column: &'static str, value: Value) {
    self.params.push(value);
    let clause = format!("{column} = ?{}", self.params.len());
    if column.starts_with("p.") {
      self.performance.push(clause);
    } else {
      self.clauses.push(clause);
    }
  }

  fn from_filter(filter: &PerformanceFilter) -> Self {
    let mut p = Self::default();
    if let Some(id) = filter.school_id {
      p.push("s.school_id", id.into());
    }
    if let Some(grade) = filter.grade {
      p.push("s.current_grade", grade.to_string().into());
    }
    if let Some(id) = filter.student_id {
      p.push("s.student_id", id.into());
    }
    if let Some(year) = filter.year {
      p.push("p.year", i64::from(year).into());
    }
    if let Some(term) = filter.term {
      p.push("p.term", term.to_string().into());
    }
    if let Some(county) = &filter.county {
      p.push("sc.county", county.clone().into());
    }
    if let Some(sub_county) = &filter.sub_county {
      p.push("sc.sub_county", sub_county.clone().into());
    }
    p
  }

  /// Every predicate, for inner joins.
  fn where_clause(&self) -> String {
    let all = self.clauses.iter().chain(&self.performance).cloned().collect::<Vec<_>>();
    if all.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", all.join(" AND "))
    }
  }

  /// Student and school predicates only.
  fn student_where_clause(&self) -> String {
    if self.clauses.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.clauses.join(" AND "))
    }
  }

  /// Join condition for `LEFT JOIN performance p`.
  fn performance_join(&self) -> String {
    std::iter::once("p.student_id = s.student_id".to_owned())
      .chain(self.performance.iter().cloned())
      .collect::<Vec<_>>()
      .join(" AND ")
  }
}

/// The `performance` columns read by [`RawPerformance`], prefixed with `p.`.
///
/// [`RawPerformance`]: crate::encode::RawPerformance
pub fn record_columns() -> String {
  let mut cols = vec![
    "p.performance_id".to_owned(),
    "p.student_id".to_owned(),
    "p.school_id".to_owned(),
    "p.term".to_owned(),
    "p.year".to_owned(),
  ];
  for s in &SUBJECTS {
    cols.push(format!("p.{}", s.score_column()));
    cols.push(format!("p.{}", s.reflection_column()));
    cols.push(format!("p.{}", s.comment_column()));
  }
  cols.extend(
    ["p.total_score", "p.average_score", "p.general_comment", "p.recorded_at"]
      .map(str::to_owned),
  );
  cols.join(", ")
}

/// Name of the teacher currently assigned to the student's grade at the
/// student's school. Correlated so that several teachers on one grade cannot
/// duplicate rows.
const TEACHER_NAME: &str = "(SELECT st.name FROM staffs st
      WHERE st.school_id = s.school_id
        AND st.role = 'Teacher'
        AND st.assigned_grade = s.current_grade
      ORDER BY st.staff_id LIMIT 1) AS teacher_name";

/// Enriched performance rows matching `filter`, in insertion order.
pub fn performance_rows(filter: &PerformanceFilter) -> BuiltQuery {
  let predicates = Predicates::from_filter(filter);
  let sql = format!(
    "SELECT {cols}, s.name, s.current_grade, {TEACHER_NAME}
     FROM performance p
     JOIN students s  ON s.student_id = p.student_id
     JOIN schools  sc ON sc.school_id = s.school_id
     {where_clause}
     ORDER BY p.performance_id",
    cols = record_columns(),
    where_clause = predicates.where_clause(),
  );
  BuiltQuery { sql, params: predicates.params }
}

/// Per-grade student counts and subject averages. Year and term narrow the
/// joined records, not the students, so students without records for the
/// period still count toward their grade; their averages come back `NULL`.
pub fn grade_summary(filter: &PerformanceFilter) -> BuiltQuery {
  let predicates = Predicates::from_filter(filter);
  let projected: Vec<&Subject> = match filter.subject {
    Some(subject) => vec![subject],
    None => SUBJECTS.iter().collect(),
  };
  let averages = projected
    .iter()
    .map(|s| format!("AVG(p.{})", s.score_column()))
    .collect::<Vec<_>>()
    .join(", ");

  let sql = format!(
    "SELECT s.current_grade, COUNT(DISTINCT s.student_id), {averages}
     FROM students s
     JOIN schools sc ON sc.school_id = s.school_id
     LEFT JOIN performance p ON {join}
     {where_clause}
     GROUP BY s.current_grade
     ORDER BY s.current_grade",
    join = predicates.performance_join(),
    where_clause = predicates.student_where_clause(),
  );
  BuiltQuery { sql, params: predicates.params }
}

#[cfg(test)]
mod tests {
  use darasa_core::{grade::Grade, performance::Term, subject};

  use super::*;

  #[test]
  fn empty_filter_binds_nothing() {
    let q = performance_rows(&PerformanceFilter::default());
    assert!(!q.sql.contains(" = ?"), "{}", q.sql);
    assert!(q.params.is_empty());
  }

  #[test]
  fn present_criteria_become_numbered_bound_parameters() {
    let filter = PerformanceFilter::default()
      .school(5)
      .grade(Grade::new(7).unwrap())
      .year(2024);
    let q = performance_rows(&filter);

    assert!(q.sql.contains("s.school_id = ?1"), "{}", q.sql);
    assert!(q.sql.contains("s.current_grade = ?2"), "{}", q.sql);
    assert!(q.sql.contains("p.year = ?3"), "{}", q.sql);
    assert!(!q.sql.contains("p.term ="), "{}", q.sql);
    assert_eq!(q.params, vec![
      Value::Integer(5),
      Value::Text("Grade 7".into()),
      Value::Integer(2024),
    ]);
  }

  #[test]
  fn filter_values_never_reach_the_sql_text() {
    let hostile = "x' OR '1'='1";
    let filter = PerformanceFilter::default()
      .county(hostile)
      .sub_county(hostile)
      .term(Term::Term2);
    let q = performance_rows(&filter);
    assert!(!q.sql.contains(hostile));
    assert!(!q.sql.contains("Term 2"));
    assert_eq!(q.params.len(), 3);
  }

  #[test]
  fn summary_projects_all_subjects_by_default() {
    let q = grade_summary(&PerformanceFilter::default().school(1));
    for s in SUBJECTS {
      assert!(q.sql.contains(&format!("AVG(p.{}_score)", s.key)));
    }
    assert!(q.sql.contains("ORDER BY s.current_grade"));
  }

  #[test]
  fn summary_projects_only_the_requested_subject() {
    let maths = subject::by_key("maths").unwrap();
    let q = grade_summary(&PerformanceFilter::default().school(1).subject(maths));
    assert!(q.sql.contains("AVG(p.maths_score)"));
    assert!(!q.sql.contains("english"));
    assert_eq!(q.params, vec![Value::Integer(1)]);
  }

  #[test]
  fn summary_narrows_the_join_not_the_students() {
    let filter = PerformanceFilter::default().school(3).year(2024).term(Term::Term1);
    let q = grade_summary(&filter);
    assert!(
      q.sql.contains("ON p.student_id = s.student_id AND p.year = ?2 AND p.term = ?3"),
      "{}",
      q.sql
    );
    assert!(q.sql.contains("WHERE s.school_id = ?1"), "{}", q.sql);
    assert!(!q.sql.contains("WHERE s.school_id = ?1 AND p."), "{}", q.sql);
  }

  #[test]
  fn record_columns_match_raw_row_width() {
    let n = record_columns().split(", ").count();
    assert_eq!(n, crate::encode::RawPerformance::WIDTH);
  }
}
