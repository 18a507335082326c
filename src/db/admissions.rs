use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, instrument};
use validator::Validate;

use super::{claim_active_allocation, find_allocation, next_sequence, Database};
use crate::error::{IpdError, Result};
use crate::models::{
    AllocationFilter, AllocationView, Bed, BedAllocation, BedSegment, BedTransfer, NewAdmission,
};

const ALLOCATION_VIEW: &str = "SELECT a.ip_number, a.uhid, p.full_name AS patient_name, b.ward, b.bed_number,
        a.admitting_doctor, a.department, a.admitted_at, a.discharged_at, a.status
     FROM bed_allocations a
     JOIN patients p ON p.uhid = a.uhid
     JOIN beds b ON b.id = a.bed_id
     WHERE 1 = 1";

impl Database {
    // ===== Admissions =====

    /// Allocate a vacant bed to a registered patient and open the stay
    #[instrument(skip(self, admission), fields(uhid = %admission.uhid, bed_id = admission.bed_id))]
    pub async fn admit(&self, admission: NewAdmission) -> Result<BedAllocation> {
        admission.validate()?;
        let admitted_at = admission.admitted_at.unwrap_or_else(Utc::now);

        let mut tx = self.pool.begin().await?;

        // Claim the bed first so the transaction starts out holding the write lock
        let bed = occupy_bed(&mut tx, admission.bed_id).await?;

        let patient_exists: Option<String> = sqlx::query_scalar("SELECT uhid FROM patients WHERE uhid = ?")
            .bind(&admission.uhid)
            .fetch_optional(&mut *tx)
            .await?;
        if patient_exists.is_none() {
            return Err(IpdError::not_found("patient", &admission.uhid));
        }

        let open: Option<String> =
            sqlx::query_scalar("SELECT ip_number FROM bed_allocations WHERE uhid = ? AND status = 'active'")
                .bind(&admission.uhid)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(ip_number) = open {
            return Err(IpdError::PatientAlreadyAdmitted {
                uhid: admission.uhid,
                ip_number,
            });
        }

        let seq = next_sequence(&mut tx, "ip_number").await?;
        let ip_number = self.numbering.ip_number(seq);

        let allocation = sqlx::query_as::<_, BedAllocation>(
            "INSERT INTO bed_allocations (
                ip_number, uhid, bed_id, admitting_doctor, department,
                admission_reason, admitted_at, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 'active')
            RETURNING *",
        )
        .bind(&ip_number)
        .bind(&admission.uhid)
        .bind(bed.id)
        .bind(&admission.admitting_doctor)
        .bind(&admission.department)
        .bind(&admission.admission_reason)
        .bind(admitted_at)
        .fetch_one(&mut *tx)
        .await?;

        open_segment(&mut tx, allocation.id, &bed, admitted_at, Some("admission")).await?;

        tx.commit().await?;

        info!(ip_number = %allocation.ip_number, bed = %bed.label(), "patient admitted");
        Ok(allocation)
    }

    #[instrument(skip(self))]
    pub async fn get_allocation(&self, ip_number: &str) -> Result<BedAllocation> {
        let mut conn = self.pool.acquire().await?;
        find_allocation(&mut conn, ip_number).await
    }

    #[instrument(skip(self))]
    pub async fn list_allocations(&self, filter: &AllocationFilter) -> Result<Vec<AllocationView>> {
        let mut query = sqlx::QueryBuilder::new(ALLOCATION_VIEW);
        if let Some(status) = filter.status {
            query.push(" AND a.status = ");
            query.push_bind(status);
        }
        if let Some(ward) = &filter.ward {
            query.push(" AND b.ward = ");
            query.push_bind(ward.clone());
        }
        if let Some(uhid) = &filter.uhid {
            query.push(" AND a.uhid = ");
            query.push_bind(uhid.clone());
        }
        query.push(" ORDER BY a.admitted_at DESC");

        let rows = query.build_query_as::<AllocationView>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Move an active stay to another vacant bed, closing the current bed segment
    #[instrument(skip(self, transfer), fields(to_bed_id = transfer.to_bed_id))]
    pub async fn transfer_bed(&self, ip_number: &str, transfer: BedTransfer) -> Result<BedAllocation> {
        transfer.validate()?;
        let transferred_at = transfer.transferred_at.unwrap_or_else(Utc::now);

        let mut tx = self.pool.begin().await?;
        let allocation = claim_active_allocation(&mut tx, ip_number).await?;
        if allocation.bed_id == transfer.to_bed_id {
            return Err(IpdError::Validation(format!(
                "{} already occupies bed {}",
                ip_number, transfer.to_bed_id
            )));
        }

        let new_bed = occupy_bed(&mut tx, transfer.to_bed_id).await?;
        close_open_segment(&mut tx, allocation.id, transferred_at).await?;
        open_segment(&mut tx, allocation.id, &new_bed, transferred_at, transfer.reason.as_deref()).await?;
        release_bed(&mut tx, allocation.bed_id).await?;

        let allocation = sqlx::query_as::<_, BedAllocation>(
            "UPDATE bed_allocations SET bed_id = ? WHERE id = ? RETURNING *",
        )
        .bind(new_bed.id)
        .bind(allocation.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(ip_number, bed = %new_bed.label(), "bed transferred");
        Ok(allocation)
    }

    /// Bed history of a stay, oldest first
    #[instrument(skip(self))]
    pub async fn bed_segments(&self, ip_number: &str) -> Result<Vec<BedSegment>> {
        let mut conn = self.pool.acquire().await?;
        let allocation = find_allocation(&mut conn, ip_number).await?;
        load_segments(&mut conn, allocation.id).await
    }
}

/// Flip a bed from vacant to occupied. Fails if anyone else got there first.
async fn occupy_bed(conn: &mut SqliteConnection, bed_id: i64) -> Result<Bed> {
    let bed = sqlx::query_as::<_, Bed>(
        "UPDATE beds SET status = 'occupied' WHERE id = ? AND status = 'vacant' RETURNING *",
    )
    .bind(bed_id)
    .fetch_optional(&mut *conn)
    .await?;

    match bed {
        Some(bed) => Ok(bed),
        None => {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM beds WHERE id = ?")
                .bind(bed_id)
                .fetch_optional(&mut *conn)
                .await?;
            Err(match exists {
                Some(_) => IpdError::BedUnavailable(bed_id),
                None => IpdError::not_found("bed", bed_id),
            })
        }
    }
}

pub(super) async fn release_bed(conn: &mut SqliteConnection, bed_id: i64) -> Result<()> {
    sqlx::query("UPDATE beds SET status = 'vacant' WHERE id = ? AND status = 'occupied'")
        .bind(bed_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn open_segment(
    conn: &mut SqliteConnection,
    allocation_id: i64,
    bed: &Bed,
    started_at: DateTime<Utc>,
    reason: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO bed_segments (allocation_id, bed_id, daily_rate, started_at, reason)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(allocation_id)
    .bind(bed.id)
    .bind(bed.daily_rate)
    .bind(started_at)
    .bind(reason)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn close_open_segment(
    conn: &mut SqliteConnection,
    allocation_id: i64,
    ended_at: DateTime<Utc>,
) -> Result<()> {
    let started_at: Option<DateTime<Utc>> = sqlx::query_scalar(
        "SELECT started_at FROM bed_segments WHERE allocation_id = ? AND ended_at IS NULL",
    )
    .bind(allocation_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(started_at) = started_at {
        if ended_at < started_at {
            return Err(IpdError::Validation(format!(
                "{} is before the current bed segment started ({})",
                ended_at.to_rfc3339(),
                started_at.to_rfc3339()
            )));
        }
    }

    sqlx::query("UPDATE bed_segments SET ended_at = ? WHERE allocation_id = ? AND ended_at IS NULL")
        .bind(ended_at)
        .bind(allocation_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(super) async fn load_segments(conn: &mut SqliteConnection, allocation_id: i64) -> Result<Vec<BedSegment>> {
    let segments = sqlx::query_as::<_, BedSegment>(
        "SELECT s.id, s.allocation_id, s.bed_id, b.ward || '/' || b.bed_number AS bed_label,
                s.daily_rate, s.started_at, s.ended_at, s.reason
         FROM bed_segments s
         JOIN beds b ON b.id = s.bed_id
         WHERE s.allocation_id = ?
         ORDER BY s.started_at, s.id",
    )
    .bind(allocation_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(segments)
}
