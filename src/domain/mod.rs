//! Domain logic with no database access

pub mod billing;
pub mod vitals;
