//! Data models for the inpatient module
//!
//! Rows map one-to-one onto the tables in `migrations/`. Request types carry
//! `validator` rules and are checked by the store before any write.

pub mod admission;
pub mod bed;
pub mod billing;
pub mod clinical;
pub mod discharge;
pub mod patient;
pub mod pharmacy;

pub use admission::*;
pub use bed::*;
pub use billing::*;
pub use clinical::*;
pub use discharge::*;
pub use patient::*;
pub use pharmacy::*;
