use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqliteConnection;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::{claim_active_allocation, find_allocation, Database};
use crate::domain::vitals::{assess, Severity};
use crate::error::{IpdError, Result};
use crate::models::{
    CaseSheet, CaseSheetInput, DoctorOrder, MedicationAdministration, NewAdministration, NewNurseRecord,
    NewOrder, NewVitals, NurseRecord, OrderPriority, OrderStatus, VitalsEntry,
};

impl Database {
    // ===== Case Sheets =====

    #[instrument(skip(self, input))]
    pub async fn upsert_case_sheet(&self, ip_number: &str, input: CaseSheetInput) -> Result<CaseSheet> {
        input.validate()?;
        let mut tx = self.pool.begin().await?;
        let allocation = claim_active_allocation(&mut tx, ip_number).await?;

        let sheet = sqlx::query_as::<_, CaseSheet>(
            "INSERT INTO case_sheets (
                allocation_id, chief_complaints, history_of_present_illness, past_history,
                examination_findings, provisional_diagnosis, plan, updated_by, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (allocation_id) DO UPDATE SET
                chief_complaints = excluded.chief_complaints,
                history_of_present_illness = excluded.history_of_present_illness,
                past_history = excluded.past_history,
                examination_findings = excluded.examination_findings,
                provisional_diagnosis = excluded.provisional_diagnosis,
                plan = excluded.plan,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            RETURNING *",
        )
        .bind(allocation.id)
        .bind(&input.chief_complaints)
        .bind(&input.history_of_present_illness)
        .bind(&input.past_history)
        .bind(&input.examination_findings)
        .bind(&input.provisional_diagnosis)
        .bind(&input.plan)
        .bind(&input.updated_by)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(sheet)
    }

    #[instrument(skip(self))]
    pub async fn get_case_sheet(&self, ip_number: &str) -> Result<CaseSheet> {
        let mut conn = self.pool.acquire().await?;
        let allocation = find_allocation(&mut conn, ip_number).await?;
        sqlx::query_as::<_, CaseSheet>("SELECT * FROM case_sheets WHERE allocation_id = ?")
            .bind(allocation.id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| IpdError::not_found("case sheet", ip_number))
    }

    // ===== Doctor Orders =====

    #[instrument(skip(self, order), fields(order_type = ?order.order_type, priority = ?order.priority))]
    pub async fn create_order(&self, ip_number: &str, order: NewOrder) -> Result<DoctorOrder> {
        order.validate()?;
        let mut tx = self.pool.begin().await?;
        let allocation = claim_active_allocation(&mut tx, ip_number).await?;

        let order = sqlx::query_as::<_, DoctorOrder>(
            "INSERT INTO doctor_orders (allocation_id, order_type, details, priority, status, ordered_by, ordered_at)
             VALUES (?, ?, ?, ?, 'active', ?, ?)
             RETURNING *",
        )
        .bind(allocation.id)
        .bind(order.order_type)
        .bind(&order.details)
        .bind(order.priority)
        .bind(&order.ordered_by)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        if order.priority == OrderPriority::Stat {
            warn!(ip_number, order_id = order.id, details = %order.details, "STAT order placed");
        }
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self, ip_number: &str, active_only: bool) -> Result<Vec<DoctorOrder>> {
        let mut conn = self.pool.acquire().await?;
        let allocation = find_allocation(&mut conn, ip_number).await?;

        let sql = if active_only {
            "SELECT * FROM doctor_orders WHERE allocation_id = ? AND status = 'active' ORDER BY ordered_at DESC, id DESC"
        } else {
            "SELECT * FROM doctor_orders WHERE allocation_id = ? ORDER BY ordered_at DESC, id DESC"
        };
        let orders = sqlx::query_as::<_, DoctorOrder>(sql)
            .bind(allocation.id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(orders)
    }

    /// Complete or discontinue an active order of an open stay
    #[instrument(skip(self))]
    pub async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> Result<DoctorOrder> {
        let mut tx = self.pool.begin().await?;
        if !OrderStatus::Active.can_transition_to(status) {
            return Err(unclosable_order(&mut tx, order_id, status).await);
        }

        let order = sqlx::query_as::<_, DoctorOrder>(
            "UPDATE doctor_orders SET status = ?, closed_at = ?
             WHERE id = ? AND status = 'active'
               AND allocation_id IN (SELECT id FROM bed_allocations WHERE status = 'active')
             RETURNING *",
        )
        .bind(status)
        .bind(Utc::now())
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
        let order = match order {
            Some(order) => order,
            None => return Err(unclosable_order(&mut tx, order_id, status).await),
        };
        tx.commit().await?;

        info!(order_id, status = status.as_str(), "order closed");
        Ok(order)
    }

    // ===== Nurse Records =====

    #[instrument(skip(self, record), fields(shift = ?record.shift))]
    pub async fn add_nurse_record(&self, ip_number: &str, record: NewNurseRecord) -> Result<NurseRecord> {
        record.validate()?;
        let mut tx = self.pool.begin().await?;
        let allocation = claim_active_allocation(&mut tx, ip_number).await?;

        let record = sqlx::query_as::<_, NurseRecord>(
            "INSERT INTO nurse_records (allocation_id, shift, notes, recorded_by, recorded_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(allocation.id)
        .bind(record.shift)
        .bind(&record.notes)
        .bind(&record.recorded_by)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn list_nurse_records(&self, ip_number: &str) -> Result<Vec<NurseRecord>> {
        let mut conn = self.pool.acquire().await?;
        let allocation = find_allocation(&mut conn, ip_number).await?;
        let records = sqlx::query_as::<_, NurseRecord>(
            "SELECT * FROM nurse_records WHERE allocation_id = ? ORDER BY recorded_at DESC, id DESC",
        )
        .bind(allocation.id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(records)
    }

    // ===== Vital Signs =====

    /// Store a set of vitals along with any threshold flags they raise
    #[instrument(skip(self, vitals))]
    pub async fn record_vitals(&self, ip_number: &str, vitals: NewVitals) -> Result<VitalsEntry> {
        vitals.validate()?;
        let mut tx = self.pool.begin().await?;
        let allocation = claim_active_allocation(&mut tx, ip_number).await?;

        let flags = assess(&vitals);
        for flag in flags.iter().filter(|f| f.severity == Severity::Critical) {
            warn!(ip_number, measurement = %flag.measurement, "{}", flag.message);
        }

        let entry = sqlx::query_as::<_, VitalsEntry>(
            "INSERT INTO vitals (
                allocation_id, temperature_c, pulse, respiratory_rate, systolic_bp, diastolic_bp,
                spo2, blood_glucose, pain_score, flags, recorded_by, recorded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *",
        )
        .bind(allocation.id)
        .bind(vitals.temperature_c)
        .bind(vitals.pulse)
        .bind(vitals.respiratory_rate)
        .bind(vitals.systolic_bp)
        .bind(vitals.diastolic_bp)
        .bind(vitals.spo2)
        .bind(vitals.blood_glucose)
        .bind(vitals.pain_score)
        .bind(Json(&flags))
        .bind(&vitals.recorded_by)
        .bind(vitals.recorded_at.unwrap_or_else(Utc::now))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(entry)
    }

    #[instrument(skip(self))]
    pub async fn list_vitals(&self, ip_number: &str) -> Result<Vec<VitalsEntry>> {
        let mut conn = self.pool.acquire().await?;
        let allocation = find_allocation(&mut conn, ip_number).await?;
        let entries = sqlx::query_as::<_, VitalsEntry>(
            "SELECT * FROM vitals WHERE allocation_id = ? ORDER BY recorded_at DESC, id DESC",
        )
        .bind(allocation.id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(entries)
    }

    #[instrument(skip(self))]
    pub async fn latest_vitals(&self, ip_number: &str) -> Result<Option<VitalsEntry>> {
        let mut conn = self.pool.acquire().await?;
        let allocation = find_allocation(&mut conn, ip_number).await?;
        let entry = sqlx::query_as::<_, VitalsEntry>(
            "SELECT * FROM vitals WHERE allocation_id = ? ORDER BY recorded_at DESC, id DESC LIMIT 1",
        )
        .bind(allocation.id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(entry)
    }

    // ===== Medication Administration =====

    #[instrument(skip(self, admin), fields(drug = %admin.drug_name))]
    pub async fn record_administration(
        &self,
        ip_number: &str,
        admin: NewAdministration,
    ) -> Result<MedicationAdministration> {
        admin.validate()?;
        let mut tx = self.pool.begin().await?;
        let allocation = claim_active_allocation(&mut tx, ip_number).await?;

        if let Some(order_id) = admin.order_id {
            let owner: Option<i64> = sqlx::query_scalar("SELECT allocation_id FROM doctor_orders WHERE id = ?")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;
            match owner {
                None => return Err(IpdError::not_found("order", order_id)),
                Some(owner) if owner != allocation.id => {
                    return Err(IpdError::Validation(format!(
                        "order {} does not belong to {}",
                        order_id, ip_number
                    )))
                }
                Some(_) => {}
            }
        }

        let record = sqlx::query_as::<_, MedicationAdministration>(
            "INSERT INTO medication_administrations (
                allocation_id, order_id, drug_name, dose, route, administered_by, administered_at, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *",
        )
        .bind(allocation.id)
        .bind(admin.order_id)
        .bind(&admin.drug_name)
        .bind(&admin.dose)
        .bind(&admin.route)
        .bind(&admin.administered_by)
        .bind(admin.administered_at.unwrap_or_else(Utc::now))
        .bind(&admin.notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(ip_number, drug = %record.drug_name, "medication administered");
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn list_administrations(&self, ip_number: &str) -> Result<Vec<MedicationAdministration>> {
        let mut conn = self.pool.acquire().await?;
        let allocation = find_allocation(&mut conn, ip_number).await?;
        let records = sqlx::query_as::<_, MedicationAdministration>(
            "SELECT * FROM medication_administrations WHERE allocation_id = ? ORDER BY administered_at DESC, id DESC",
        )
        .bind(allocation.id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(records)
    }
}

/// Why an order could not move to `to`
async fn unclosable_order(conn: &mut SqliteConnection, order_id: i64, to: OrderStatus) -> IpdError {
    let row = sqlx::query_as::<_, (OrderStatus, String)>(
        "SELECT o.status, a.ip_number FROM doctor_orders o
         JOIN bed_allocations a ON a.id = o.allocation_id
         WHERE o.id = ?",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await;

    match row {
        Err(e) => e.into(),
        Ok(None) => IpdError::not_found("order", order_id),
        Ok(Some((from, _))) if !from.can_transition_to(to) => IpdError::transition("order", from.as_str(), to.as_str()),
        Ok(Some((_, ip_number))) => IpdError::AllocationClosed(ip_number),
    }
}
