//! Error types for the inpatient module

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpdError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Bed {0} is not vacant")]
    BedUnavailable(i64),

    #[error("Patient {uhid} already has an active admission ({ip_number})")]
    PatientAlreadyAdmitted { uhid: String, ip_number: String },

    #[error("Admission {0} is already discharged")]
    AllocationClosed(String),

    #[error("Bed {bed_number} already exists in ward {ward}")]
    DuplicateBed { ward: String, bed_number: String },

    #[error("Invalid {entity} status transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Discount {discount} exceeds gross amount {gross}")]
    DiscountExceedsTotal { discount: i64, gross: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, IpdError>;

impl IpdError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn transition(entity: &'static str, from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Short machine-readable kind, returned in the `error` field of API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::BedUnavailable(_) => "bed_unavailable",
            Self::PatientAlreadyAdmitted { .. } => "patient_already_admitted",
            Self::AllocationClosed(_) => "allocation_closed",
            Self::DuplicateBed { .. } => "duplicate_bed",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Validation(_) => "validation",
            Self::DiscountExceedsTotal { .. } => "discount_exceeds_total",
            Self::Database(_) => "database",
            Self::Migration(_) => "migration",
        }
    }
}

impl From<validator::ValidationErrors> for IpdError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl ResponseError for IpdError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BedUnavailable(_)
            | Self::PatientAlreadyAdmitted { .. }
            | Self::AllocationClosed(_)
            | Self::DuplicateBed { .. }
            | Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::Validation(_) | Self::DiscountExceedsTotal { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Database(_) | Self::Migration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}
