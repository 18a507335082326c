use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use validator::Validate;

use crate::domain::billing::{Discount, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ChargeCategory {
    Pharmacy,
    Laboratory,
    Radiology,
    Procedure,
    Consultation,
    Nursing,
    Consumables,
    Other,
}

impl ChargeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ChargeCategory::Pharmacy => "Pharmacy",
            ChargeCategory::Laboratory => "Laboratory",
            ChargeCategory::Radiology => "Radiology",
            ChargeCategory::Procedure => "Procedures",
            ChargeCategory::Consultation => "Consultation",
            ChargeCategory::Nursing => "Nursing",
            ChargeCategory::Consumables => "Consumables",
            ChargeCategory::Other => "Other charges",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    BankTransfer,
    Insurance,
}

/// Itemized charge against a stay. Amounts are in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Charge {
    pub id: i64,
    pub allocation_id: i64,
    pub category: ChargeCategory,
    pub description: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCharge {
    pub category: ChargeCategory,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(range(min = 1))]
    pub quantity: i64,
    #[validate(range(min = 0))]
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: i64,
    pub allocation_id: i64,
    pub receipt_number: String,
    pub method: PaymentMethod,
    pub amount: i64,
    pub reference: Option<String>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPayment {
    pub method: PaymentMethod,
    #[validate(range(min = 1))]
    pub amount: i64,
    /// Card slip, UPI transaction id, insurer claim number
    pub reference: Option<String>,
}

/// Row of the denormalized `ip_billing` ledger
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BillingRecord {
    pub allocation_id: i64,
    pub ip_number: String,
    pub uhid: String,
    pub bed_days: i64,
    pub bed_total: i64,
    pub item_total: i64,
    pub gross_amount: i64,
    pub discount: Json<Discount>,
    pub discount_amount: i64,
    pub net_amount: i64,
    pub paid_amount: i64,
    pub balance_due: i64,
    pub payment_status: PaymentStatus,
    pub payment_breakdown: Json<BTreeMap<PaymentMethod, i64>>,
    pub is_final: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingFilter {
    pub payment_status: Option<PaymentStatus>,
    pub is_final: Option<bool>,
}

/// Body of `POST /admissions/{ip}/bill`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillRequest {
    pub discount: Option<Discount>,
}
