//! Student transfers between schools.
//!
//! A transfer is created `Pending` by the head teacher of the sending school
//! and moves to a terminal status exactly once, by the county admin.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
pub enum TransferStatus {
  Pending,
  Approved,
  Rejected,
}

impl TransferStatus {
  pub fn is_terminal(self) -> bool { !matches!(self, Self::Pending) }
}

/// The county admin's verdict on a pending transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDecision {
  Approve,
  Reject,
}

impl TransferDecision {
  pub fn status(self) -> TransferStatus {
    match self {
      Self::Approve => TransferStatus::Approved,
      Self::Reject => TransferStatus::Rejected,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
  pub transfer_id:    i64,
  pub student_id:     i64,
  pub from_school_id: i64,
  pub to_school_id:   i64,
  pub request_date:   NaiveDate,
  pub status:         TransferStatus,
  /// Set only on approval.
  pub approved_date:  Option<NaiveDate>,
}

/// A pending transfer with the names a county admin needs to decide it.
#[derive(Debug, Clone, Serialize)]
pub struct TransferSummary {
  #[serde(flatten)]
  pub transfer:     Transfer,
  pub student_name: String,
  pub from_school:  String,
  pub to_school:    String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decision_maps_to_terminal_status() {
    assert_eq!(TransferDecision::Approve.status(), TransferStatus::Approved);
    assert_eq!(TransferDecision::Reject.status(), TransferStatus::Rejected);
    assert!(TransferDecision::Reject.status().is_terminal());
    assert!(!TransferStatus::Pending.is_terminal());
  }

  #[test]
  fn status_string_forms() {
    assert_eq!(TransferStatus::Approved.as_ref(), "Approved");
    assert_eq!("Pending".parse::<TransferStatus>().unwrap(), TransferStatus::Pending);
  }
}
