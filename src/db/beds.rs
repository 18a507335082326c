use std::collections::BTreeMap;

use tracing::{info, instrument};
use validator::Validate;

use super::Database;
use crate::error::{IpdError, Result};
use crate::models::{Bed, BedCounts, BedFilter, BedStatus, NewBed, OccupancySummary, WardOccupancy};

impl Database {
    // ===== Beds =====

    #[instrument(skip(self, bed), fields(ward = %bed.ward, bed_number = %bed.bed_number))]
    pub async fn create_bed(&self, bed: NewBed) -> Result<Bed> {
        bed.validate()?;

        // The ward/bed_number unique index decides races between two creates
        let created = sqlx::query_as::<_, Bed>(
            "INSERT INTO beds (ward, room, bed_number, bed_type, daily_rate, status)
             VALUES (?, ?, ?, ?, ?, 'vacant')
             RETURNING *",
        )
        .bind(&bed.ward)
        .bind(&bed.room)
        .bind(&bed.bed_number)
        .bind(bed.bed_type)
        .bind(bed.daily_rate)
        .fetch_one(&self.pool)
        .await;

        let bed = match created {
            Ok(created) => created,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(IpdError::DuplicateBed {
                    ward: bed.ward,
                    bed_number: bed.bed_number,
                })
            }
            Err(e) => return Err(e.into()),
        };

        info!(bed_id = bed.id, "bed created");
        Ok(bed)
    }

    #[instrument(skip(self))]
    pub async fn get_bed(&self, bed_id: i64) -> Result<Bed> {
        sqlx::query_as::<_, Bed>("SELECT * FROM beds WHERE id = ?")
            .bind(bed_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| IpdError::not_found("bed", bed_id))
    }

    #[instrument(skip(self))]
    pub async fn list_beds(&self, filter: &BedFilter) -> Result<Vec<Bed>> {
        let mut query = sqlx::QueryBuilder::new("SELECT * FROM beds WHERE 1 = 1");
        if let Some(ward) = &filter.ward {
            query.push(" AND ward = ");
            query.push_bind(ward.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ");
            query.push_bind(status);
        }
        if let Some(bed_type) = filter.bed_type {
            query.push(" AND bed_type = ");
            query.push_bind(bed_type);
        }
        query.push(" ORDER BY ward, bed_number");

        let beds = query.build_query_as::<Bed>().fetch_all(&self.pool).await?;
        Ok(beds)
    }

    /// Move a bed in or out of maintenance
    #[instrument(skip(self))]
    pub async fn set_bed_status(&self, bed_id: i64, status: BedStatus) -> Result<Bed> {
        let bed = self.get_bed(bed_id).await?;
        if !bed.status.can_set_manually(status) {
            return Err(IpdError::transition("bed", bed.status.as_str(), status.as_str()));
        }

        // Guard on the status we read so a concurrent admission wins
        let updated = sqlx::query_as::<_, Bed>("UPDATE beds SET status = ? WHERE id = ? AND status = ? RETURNING *")
            .bind(status)
            .bind(bed_id)
            .bind(bed.status)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(IpdError::BedUnavailable(bed_id))?;

        info!(bed_id, status = status.as_str(), "bed status changed");
        Ok(updated)
    }

    /// Bed counts overall and per ward, with open admissions and pharmacy work
    #[instrument(skip(self))]
    pub async fn occupancy(&self) -> Result<OccupancySummary> {
        let rows: Vec<(String, BedStatus, i64)> =
            sqlx::query_as("SELECT ward, status, COUNT(*) FROM beds GROUP BY ward, status")
                .fetch_all(&self.pool)
                .await?;

        let mut overall = BedCounts::default();
        let mut wards: BTreeMap<String, BedCounts> = BTreeMap::new();
        for (ward, status, count) in rows {
            let ward_counts = wards.entry(ward).or_default();
            for counts in [&mut overall, ward_counts] {
                counts.total += count;
                match status {
                    BedStatus::Vacant => counts.vacant += count,
                    BedStatus::Occupied => counts.occupied += count,
                    BedStatus::Maintenance => counts.maintenance += count,
                }
            }
        }

        let active_admissions: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bed_allocations WHERE status = 'active'")
                .fetch_one(&self.pool)
                .await?;
        let pending_pharmacy: i64 =
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM pharmacy_recommendations r
                 JOIN bed_allocations a ON a.id = r.allocation_id
                 WHERE r.status = 'pending' AND a.status = 'active'",
            )
                .fetch_one(&self.pool)
                .await?;

        let occupancy_rate = if overall.total > 0 {
            overall.occupied as f64 / overall.total as f64
        } else {
            0.0
        };

        Ok(OccupancySummary {
            overall,
            occupancy_rate,
            wards: wards
                .into_iter()
                .map(|(ward, counts)| WardOccupancy { ward, counts })
                .collect(),
            active_admissions,
            pending_pharmacy,
        })
    }
}
