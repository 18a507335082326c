use chrono::Utc;
use tracing::{info, instrument};
use validator::Validate;

use super::{next_sequence, Database};
use crate::error::{IpdError, Result};
use crate::models::{NewPatient, Patient, PatientFilter};

const DEFAULT_PAGE_SIZE: u32 = 50;

impl Database {
    // ===== Patient Management =====

    #[instrument(skip(self, patient))]
    pub async fn register_patient(&self, patient: NewPatient) -> Result<Patient> {
        patient.validate()?;

        let mut tx = self.pool.begin().await?;
        let seq = next_sequence(&mut tx, "uhid").await?;
        let uhid = self.numbering.uhid(seq);

        let patient = sqlx::query_as::<_, Patient>(
            "INSERT INTO patients (
                uhid, full_name, gender, date_of_birth, phone, address, guardian_name, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *",
        )
        .bind(&uhid)
        .bind(patient.full_name.trim())
        .bind(patient.gender)
        .bind(patient.date_of_birth)
        .bind(&patient.phone)
        .bind(&patient.address)
        .bind(&patient.guardian_name)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(uhid = %patient.uhid, "patient registered");
        Ok(patient)
    }

    #[instrument(skip(self))]
    pub async fn get_patient(&self, uhid: &str) -> Result<Patient> {
        sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE uhid = ?")
            .bind(uhid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| IpdError::not_found("patient", uhid))
    }

    #[instrument(skip(self))]
    pub async fn search_patients(&self, filter: &PatientFilter) -> Result<Vec<Patient>> {
        let mut query = sqlx::QueryBuilder::new("SELECT * FROM patients WHERE 1 = 1");

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            query.push(" AND (lower(full_name) LIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR lower(uhid) LIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR phone LIKE ");
            query.push_bind(pattern);
            query.push(")");
        }

        query.push(" ORDER BY created_at DESC LIMIT ");
        query.push_bind(i64::from(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE)));
        query.push(" OFFSET ");
        query.push_bind(i64::from(filter.offset.unwrap_or(0)));

        let patients = query.build_query_as::<Patient>().fetch_all(&self.pool).await?;
        Ok(patients)
    }
}
