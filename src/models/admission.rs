use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AllocationStatus {
    Active,
    Discharged,
}

/// A patient's stay, linked to the bed they currently occupy
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BedAllocation {
    pub id: i64,
    pub ip_number: String,
    pub uhid: String,
    pub bed_id: i64,
    pub admitting_doctor: String,
    pub department: Option<String>,
    pub admission_reason: Option<String>,
    pub admitted_at: DateTime<Utc>,
    pub discharged_at: Option<DateTime<Utc>>,
    pub status: AllocationStatus,
}

impl BedAllocation {
    pub fn is_active(&self) -> bool {
        self.status == AllocationStatus::Active
    }
}

/// Allocation joined with patient and bed details for list views
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AllocationView {
    pub ip_number: String,
    pub uhid: String,
    pub patient_name: String,
    pub ward: String,
    pub bed_number: String,
    pub admitting_doctor: String,
    pub department: Option<String>,
    pub admitted_at: DateTime<Utc>,
    pub discharged_at: Option<DateTime<Utc>>,
    pub status: AllocationStatus,
}

/// One contiguous period of a stay on a single bed
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BedSegment {
    pub id: i64,
    pub allocation_id: i64,
    pub bed_id: i64,
    pub bed_label: String,
    /// Rate snapshot taken when the segment opened
    pub daily_rate: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAdmission {
    #[validate(length(min = 1))]
    pub uhid: String,
    pub bed_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub admitting_doctor: String,
    pub department: Option<String>,
    pub admission_reason: Option<String>,
    /// Defaults to now
    pub admitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BedTransfer {
    pub to_bed_id: i64,
    pub transferred_at: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllocationFilter {
    pub status: Option<AllocationStatus>,
    pub ward: Option<String>,
    pub uhid: Option<String>,
}
