use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    Dispensed,
    Rejected,
    Cancelled,
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::Dispensed => "dispensed",
            RecommendationStatus::Rejected => "rejected",
            RecommendationStatus::Cancelled => "cancelled",
        }
    }
}

/// Drug recommended by a doctor, waiting for the pharmacy to act on it
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PharmacyRecommendation {
    pub id: i64,
    pub allocation_id: i64,
    pub drug_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: Option<i64>,
    pub quantity: i64,
    pub recommended_by: String,
    pub notes: Option<String>,
    pub status: RecommendationStatus,
    pub unit_price: Option<i64>,
    /// Itemized charge raised when dispensed
    pub charge_id: Option<i64>,
    pub handled_by: Option<String>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub handled_at: Option<DateTime<Utc>>,
}

/// Queue entry with the stay it belongs to
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PharmacyQueueItem {
    pub id: i64,
    pub ip_number: String,
    pub patient_name: String,
    pub ward: String,
    pub bed_number: String,
    pub drug_name: String,
    pub dosage: String,
    pub frequency: String,
    pub quantity: i64,
    pub recommended_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRecommendation {
    #[validate(length(min = 1, max = 200))]
    pub drug_name: String,
    #[validate(length(min = 1))]
    pub dosage: String,
    #[validate(length(min = 1))]
    pub frequency: String,
    #[validate(range(min = 1))]
    pub duration_days: Option<i64>,
    #[validate(range(min = 1))]
    pub quantity: i64,
    #[validate(length(min = 1))]
    pub recommended_by: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Dispense {
    #[validate(range(min = 0))]
    pub unit_price: i64,
    #[validate(length(min = 1))]
    pub dispensed_by: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Rejection {
    #[validate(length(min = 1))]
    pub remarks: String,
    #[validate(length(min = 1))]
    pub rejected_by: String,
}
