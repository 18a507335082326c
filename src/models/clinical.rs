use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use validator::{Validate, ValidationError};

use crate::domain::vitals::VitalsFlag;

// ===== Case sheet =====

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CaseSheet {
    pub allocation_id: i64,
    pub chief_complaints: String,
    pub history_of_present_illness: Option<String>,
    pub past_history: Option<String>,
    pub examination_findings: Option<String>,
    pub provisional_diagnosis: Option<String>,
    pub plan: Option<String>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CaseSheetInput {
    #[validate(length(min = 1))]
    pub chief_complaints: String,
    pub history_of_present_illness: Option<String>,
    pub past_history: Option<String>,
    pub examination_findings: Option<String>,
    pub provisional_diagnosis: Option<String>,
    pub plan: Option<String>,
    #[validate(length(min = 1))]
    pub updated_by: String,
}

// ===== Doctor orders =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderType {
    Medication,
    Laboratory,
    Imaging,
    Nursing,
    Diet,
    Procedure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderPriority {
    Routine,
    Urgent,
    Stat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderStatus {
    Active,
    Completed,
    Discontinued,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Active => "active",
            OrderStatus::Completed => "completed",
            OrderStatus::Discontinued => "discontinued",
        }
    }

    pub fn can_transition_to(self, to: OrderStatus) -> bool {
        self == OrderStatus::Active && to != OrderStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DoctorOrder {
    pub id: i64,
    pub allocation_id: i64,
    pub order_type: OrderType,
    pub details: String,
    pub priority: OrderPriority,
    pub status: OrderStatus,
    pub ordered_by: String,
    pub ordered_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewOrder {
    pub order_type: OrderType,
    #[validate(length(min = 1, max = 2000))]
    pub details: String,
    pub priority: OrderPriority,
    #[validate(length(min = 1))]
    pub ordered_by: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    #[serde(default)]
    pub active_only: bool,
}

// ===== Nurse records =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Evening,
    Night,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NurseRecord {
    pub id: i64,
    pub allocation_id: i64,
    pub shift: Shift,
    pub notes: String,
    pub recorded_by: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewNurseRecord {
    pub shift: Shift,
    #[validate(length(min = 1))]
    pub notes: String,
    #[validate(length(min = 1))]
    pub recorded_by: String,
}

// ===== Vitals =====

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VitalsEntry {
    pub id: i64,
    pub allocation_id: i64,
    pub temperature_c: Option<f64>,
    pub pulse: Option<i64>,
    pub respiratory_rate: Option<i64>,
    pub systolic_bp: Option<i64>,
    pub diastolic_bp: Option<i64>,
    pub spo2: Option<i64>,
    pub blood_glucose: Option<i64>,
    pub pain_score: Option<i64>,
    pub flags: Json<Vec<VitalsFlag>>,
    pub recorded_by: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "has_measurement"))]
pub struct NewVitals {
    #[validate(range(min = 25.0, max = 45.0))]
    pub temperature_c: Option<f64>,
    #[validate(range(min = 0, max = 300))]
    pub pulse: Option<i64>,
    #[validate(range(min = 0, max = 100))]
    pub respiratory_rate: Option<i64>,
    #[validate(range(min = 0, max = 300))]
    pub systolic_bp: Option<i64>,
    #[validate(range(min = 0, max = 200))]
    pub diastolic_bp: Option<i64>,
    #[validate(range(min = 0, max = 100))]
    pub spo2: Option<i64>,
    #[validate(range(min = 0, max = 1000))]
    pub blood_glucose: Option<i64>,
    #[validate(range(min = 0, max = 10))]
    pub pain_score: Option<i64>,
    #[validate(length(min = 1))]
    pub recorded_by: String,
    pub recorded_at: Option<DateTime<Utc>>,
}

fn has_measurement(vitals: &NewVitals) -> Result<(), ValidationError> {
    let any = vitals.temperature_c.is_some()
        || vitals.pulse.is_some()
        || vitals.respiratory_rate.is_some()
        || vitals.systolic_bp.is_some()
        || vitals.diastolic_bp.is_some()
        || vitals.spo2.is_some()
        || vitals.blood_glucose.is_some()
        || vitals.pain_score.is_some();
    if any {
        Ok(())
    } else {
        Err(ValidationError::new("no_measurement"))
    }
}

// ===== Medication administration =====

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MedicationAdministration {
    pub id: i64,
    pub allocation_id: i64,
    pub order_id: Option<i64>,
    pub drug_name: String,
    pub dose: String,
    pub route: String,
    pub administered_by: String,
    pub administered_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAdministration {
    pub order_id: Option<i64>,
    #[validate(length(min = 1))]
    pub drug_name: String,
    #[validate(length(min = 1))]
    pub dose: String,
    #[validate(length(min = 1))]
    pub route: String,
    #[validate(length(min = 1))]
    pub administered_by: String,
    pub administered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}
