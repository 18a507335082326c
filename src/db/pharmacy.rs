use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{info, instrument};
use validator::Validate;

use super::billing::insert_charge;
use super::{claim_active_allocation, find_allocation, Database};
use crate::error::{IpdError, Result};
use crate::models::{
    AllocationStatus, ChargeCategory, Dispense, NewCharge, NewRecommendation, PharmacyQueueItem,
    PharmacyRecommendation, RecommendationStatus, Rejection,
};

impl Database {
    // ===== Pharmacy Recommendations =====

    #[instrument(skip(self, rec), fields(drug = %rec.drug_name))]
    pub async fn recommend(&self, ip_number: &str, rec: NewRecommendation) -> Result<PharmacyRecommendation> {
        rec.validate()?;
        let mut tx = self.pool.begin().await?;
        let allocation = claim_active_allocation(&mut tx, ip_number).await?;

        let rec = sqlx::query_as::<_, PharmacyRecommendation>(
            "INSERT INTO pharmacy_recommendations (
                allocation_id, drug_name, dosage, frequency, duration_days, quantity,
                recommended_by, notes, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
            RETURNING *",
        )
        .bind(allocation.id)
        .bind(&rec.drug_name)
        .bind(&rec.dosage)
        .bind(&rec.frequency)
        .bind(rec.duration_days)
        .bind(rec.quantity)
        .bind(&rec.recommended_by)
        .bind(&rec.notes)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(ip_number, recommendation_id = rec.id, "pharmacy recommendation raised");
        Ok(rec)
    }

    #[instrument(skip(self))]
    pub async fn list_recommendations(&self, ip_number: &str) -> Result<Vec<PharmacyRecommendation>> {
        let mut conn = self.pool.acquire().await?;
        let allocation = find_allocation(&mut conn, ip_number).await?;
        let recs = sqlx::query_as::<_, PharmacyRecommendation>(
            "SELECT * FROM pharmacy_recommendations WHERE allocation_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(allocation.id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(recs)
    }

    /// Pending recommendations across all open stays, oldest first
    #[instrument(skip(self))]
    pub async fn pharmacy_queue(&self) -> Result<Vec<PharmacyQueueItem>> {
        let queue = sqlx::query_as::<_, PharmacyQueueItem>(
            "SELECT r.id, a.ip_number, p.full_name AS patient_name, b.ward, b.bed_number,
                    r.drug_name, r.dosage, r.frequency, r.quantity, r.recommended_by, r.created_at
             FROM pharmacy_recommendations r
             JOIN bed_allocations a ON a.id = r.allocation_id
             JOIN patients p ON p.uhid = a.uhid
             JOIN beds b ON b.id = a.bed_id
             WHERE r.status = 'pending' AND a.status = 'active'
             ORDER BY r.created_at, r.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(queue)
    }

    /// Dispense a pending recommendation and bill it to the stay
    #[instrument(skip(self, dispense))]
    pub async fn dispense(&self, id: i64, dispense: Dispense) -> Result<PharmacyRecommendation> {
        dispense.validate()?;
        let mut tx = self.pool.begin().await?;

        let rec = sqlx::query_as::<_, PharmacyRecommendation>(
            "UPDATE pharmacy_recommendations
             SET status = 'dispensed', unit_price = ?, handled_by = ?, handled_at = ?
             WHERE id = ? AND status = 'pending'
             RETURNING *",
        )
        .bind(dispense.unit_price)
        .bind(&dispense.dispensed_by)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let rec = match rec {
            Some(rec) => rec,
            None => return Err(not_pending(&mut tx, id, RecommendationStatus::Dispensed).await),
        };

        let (status, ip_number): (AllocationStatus, String) =
            sqlx::query_as("SELECT status, ip_number FROM bed_allocations WHERE id = ?")
                .bind(rec.allocation_id)
                .fetch_one(&mut *tx)
                .await?;
        if status != AllocationStatus::Active {
            return Err(IpdError::AllocationClosed(ip_number));
        }

        let charge = insert_charge(
            &mut tx,
            rec.allocation_id,
            &NewCharge {
                category: ChargeCategory::Pharmacy,
                description: format!("{} {} x{}", rec.drug_name, rec.dosage, rec.quantity),
                quantity: rec.quantity,
                unit_price: dispense.unit_price,
            },
        )
        .await?;

        let rec = sqlx::query_as::<_, PharmacyRecommendation>(
            "UPDATE pharmacy_recommendations SET charge_id = ? WHERE id = ? RETURNING *",
        )
        .bind(charge.id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(ip_number, recommendation_id = id, amount = charge.amount, "recommendation dispensed");
        Ok(rec)
    }

    #[instrument(skip(self, rejection))]
    pub async fn reject(&self, id: i64, rejection: Rejection) -> Result<PharmacyRecommendation> {
        rejection.validate()?;
        let mut tx = self.pool.begin().await?;

        let rec = sqlx::query_as::<_, PharmacyRecommendation>(
            "UPDATE pharmacy_recommendations
             SET status = 'rejected', remarks = ?, handled_by = ?, handled_at = ?
             WHERE id = ? AND status = 'pending'
             RETURNING *",
        )
        .bind(&rejection.remarks)
        .bind(&rejection.rejected_by)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let rec = match rec {
            Some(rec) => rec,
            None => return Err(not_pending(&mut tx, id, RecommendationStatus::Rejected).await),
        };
        tx.commit().await?;

        info!(recommendation_id = id, "recommendation rejected");
        Ok(rec)
    }

    #[instrument(skip(self))]
    pub async fn cancel_recommendation(&self, id: i64) -> Result<PharmacyRecommendation> {
        let mut tx = self.pool.begin().await?;

        let rec = sqlx::query_as::<_, PharmacyRecommendation>(
            "UPDATE pharmacy_recommendations SET status = 'cancelled', handled_at = ?
             WHERE id = ? AND status = 'pending'
             RETURNING *",
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let rec = match rec {
            Some(rec) => rec,
            None => return Err(not_pending(&mut tx, id, RecommendationStatus::Cancelled).await),
        };
        tx.commit().await?;

        info!(recommendation_id = id, "recommendation cancelled");
        Ok(rec)
    }
}

/// Why a recommendation could not move from pending to `to`
async fn not_pending(conn: &mut SqliteConnection, id: i64, to: RecommendationStatus) -> IpdError {
    let status = sqlx::query_scalar::<_, RecommendationStatus>("SELECT status FROM pharmacy_recommendations WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await;

    match status {
        Err(e) => e.into(),
        Ok(None) => IpdError::not_found("pharmacy recommendation", id),
        Ok(Some(from)) => IpdError::transition("pharmacy recommendation", from.as_str(), to.as_str()),
    }
}
