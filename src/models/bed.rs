use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BedType {
    General,
    SemiPrivate,
    Private,
    Icu,
    Nicu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BedStatus {
    Vacant,
    Occupied,
    Maintenance,
}

impl BedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BedStatus::Vacant => "vacant",
            BedStatus::Occupied => "occupied",
            BedStatus::Maintenance => "maintenance",
        }
    }

    /// Manual status changes only move a bed in and out of maintenance.
    /// Occupancy is driven by admission, transfer and discharge.
    pub fn can_set_manually(self, to: BedStatus) -> bool {
        matches!(
            (self, to),
            (BedStatus::Vacant, BedStatus::Maintenance) | (BedStatus::Maintenance, BedStatus::Vacant)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bed {
    pub id: i64,
    pub ward: String,
    pub room: Option<String>,
    pub bed_number: String,
    pub bed_type: BedType,
    /// Per-day charge in minor currency units
    pub daily_rate: i64,
    pub status: BedStatus,
}

impl Bed {
    pub fn label(&self) -> String {
        format!("{}/{}", self.ward, self.bed_number)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewBed {
    #[validate(length(min = 1, max = 100))]
    pub ward: String,
    pub room: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub bed_number: String,
    pub bed_type: BedType,
    #[validate(range(min = 0))]
    pub daily_rate: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BedFilter {
    pub ward: Option<String>,
    pub status: Option<BedStatus>,
    pub bed_type: Option<BedType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BedStatusUpdate {
    pub status: BedStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BedCounts {
    pub total: i64,
    pub vacant: i64,
    pub occupied: i64,
    pub maintenance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardOccupancy {
    pub ward: String,
    #[serde(flatten)]
    pub counts: BedCounts,
}

/// Dashboard view of bed occupancy and open work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupancySummary {
    #[serde(flatten)]
    pub overall: BedCounts,
    pub occupancy_rate: f64,
    pub wards: Vec<WardOccupancy>,
    pub active_admissions: i64,
    pub pending_pharmacy: i64,
}
