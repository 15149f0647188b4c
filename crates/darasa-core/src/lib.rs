//! Domain model for Darasa: subjects, grades, performance records, the school
//! registry, transfers, and the [`store::SchoolStore`] trait that backends
//! implement.
//!
//! Validation and grade arithmetic live here as plain functions, so they can
//! be tested without a database or an HTTP stack.

pub mod error;
pub mod grade;
pub mod performance;
pub mod school;
pub mod store;
pub mod subject;
pub mod transfer;

pub use error::{Error, Result};
