//! The subject catalog: the fixed, ordered set of subjects every performance
//! record carries.
//!
//! The catalog is the only source of column names for dynamic SQL. Adding or
//! removing an entry requires a matching schema migration.

use serde::Serialize;

/// A subject taught and assessed in every grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Subject {
  /// Stable identifier; also the column-name prefix in the `performance` table.
  pub key:          &'static str,
  pub display_name: &'static str,
}

impl Subject {
  pub fn score_column(&self) -> String { format!("{}_score", self.key) }

  pub fn reflection_column(&self) -> String {
    format!("{}_reflection", self.key)
  }

  pub fn comment_column(&self) -> String { format!("{}_comment", self.key) }
}

/// Every subject, in report-card order.
pub const SUBJECTS: [Subject; 12] = [
  Subject { key: "maths", display_name: "Maths" },
  Subject { key: "english", display_name: "English" },
  Subject { key: "kiswahili", display_name: "Kiswahili" },
  Subject { key: "cre_ire", display_name: "CRE/IRE" },
  Subject { key: "social_studies", display_name: "Social Studies" },
  Subject { key: "pe", display_name: "P.E." },
  Subject { key: "agriculture", display_name: "Agriculture" },
  Subject { key: "homescience", display_name: "Homescience" },
  Subject { key: "business_studies", display_name: "Business Studies" },
  Subject { key: "art_craft", display_name: "Art & Craft" },
  Subject { key: "science_tech", display_name: "Science & Tech" },
  Subject { key: "music", display_name: "Music" },
];

/// Number of subjects on every record; the divisor for `average_score`.
pub const SUBJECT_COUNT: usize = SUBJECTS.len();

/// Look up a subject by its key.
pub fn by_key(key: &str) -> Option<&'static Subject> {
  SUBJECTS.iter().find(|s| s.key == key)
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn catalog_has_twelve_unique_keys() {
    let keys: HashSet<_> = SUBJECTS.iter().map(|s| s.key).collect();
    assert_eq!(keys.len(), 12);
    assert_eq!(SUBJECT_COUNT, 12);
  }

  #[test]
  fn catalog_order_starts_with_maths_and_ends_with_music() {
    assert_eq!(SUBJECTS[0].key, "maths");
    assert_eq!(SUBJECTS[11].key, "music");
  }

  #[test]
  fn lookup_by_key() {
    assert_eq!(by_key("cre_ire").map(|s| s.display_name), Some("CRE/IRE"));
    assert!(by_key("latin").is_none());
    assert!(by_key("maths_score").is_none());
  }

  #[test]
  fn column_names_use_key_prefix() {
    let s = by_key("art_craft").unwrap();
    assert_eq!(s.score_column(), "art_craft_score");
    assert_eq!(s.reflection_column(), "art_craft_reflection");
    assert_eq!(s.comment_column(), "art_craft_comment");
  }

  #[test]
  fn keys_are_safe_sql_identifiers() {
    for s in SUBJECTS {
      assert!(s.key.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{}", s.key);
    }
  }
}
