use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use validator::Validate;

use crate::domain::billing::{BillingSummary, Discount};
use crate::models::NewPayment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DischargeType {
    Normal,
    /// Left against medical advice
    Lama,
    Referred,
    Absconded,
    Death,
}

impl DischargeType {
    pub fn label(&self) -> &'static str {
        match self {
            DischargeType::Normal => "Normal discharge",
            DischargeType::Lama => "Left against medical advice",
            DischargeType::Referred => "Referred to higher centre",
            DischargeType::Absconded => "Absconded",
            DischargeType::Death => "Death",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DischargeMedication {
    #[validate(length(min = 1))]
    pub drug: String,
    pub dose: String,
    pub frequency: String,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DischargeSummary {
    pub allocation_id: i64,
    pub document_id: String,
    pub ip_number: String,
    pub uhid: String,
    pub discharge_type: DischargeType,
    pub final_diagnosis: String,
    pub treatment_given: Option<String>,
    pub procedures: Option<String>,
    pub condition_at_discharge: Option<String>,
    pub medications_on_discharge: Json<Vec<DischargeMedication>>,
    pub advice: Option<String>,
    pub follow_up_on: Option<NaiveDate>,
    /// Final bill as reconciled at discharge
    pub billing: Json<BillingSummary>,
    pub discharged_at: DateTime<Utc>,
    pub discharged_by: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DischargeRequest {
    pub discharge_type: DischargeType,
    #[validate(length(min = 1))]
    pub final_diagnosis: String,
    pub treatment_given: Option<String>,
    pub procedures: Option<String>,
    pub condition_at_discharge: Option<String>,
    #[serde(default)]
    #[validate]
    pub medications_on_discharge: Vec<DischargeMedication>,
    pub advice: Option<String>,
    pub follow_up_on: Option<NaiveDate>,
    /// Falls back to the discount already on the interim bill
    pub discount: Option<Discount>,
    /// Final settlement, possibly split across methods
    #[serde(default)]
    #[validate]
    pub payments: Vec<NewPayment>,
    pub discharged_at: Option<DateTime<Utc>>,
    #[validate(length(min = 1))]
    pub discharged_by: String,
}
