use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::SqliteConnection;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::admissions::load_segments;
use super::{claim_active_allocation, find_allocation, Database};
use crate::domain::billing::{reconcile, BillingInput, BillingPolicy, BillingSummary, Discount};
use crate::error::{IpdError, Result};
use crate::models::{BedAllocation, BillingFilter, BillingRecord, Charge, NewCharge, NewPayment, Payment};

impl Database {
    // ===== Itemized charges =====

    #[instrument(skip(self, charge), fields(category = ?charge.category))]
    pub async fn add_charge(&self, ip_number: &str, charge: NewCharge) -> Result<Charge> {
        charge.validate()?;
        let mut tx = self.pool.begin().await?;
        let allocation = claim_active_allocation(&mut tx, ip_number).await?;
        let charge = insert_charge(&mut tx, allocation.id, &charge).await?;
        tx.commit().await?;
        info!(ip_number, amount = charge.amount, "charge added");
        Ok(charge)
    }

    #[instrument(skip(self))]
    pub async fn list_charges(&self, ip_number: &str) -> Result<Vec<Charge>> {
        let mut conn = self.pool.acquire().await?;
        let allocation = find_allocation(&mut conn, ip_number).await?;
        load_charges(&mut conn, allocation.id).await
    }

    // ===== Payments =====

    /// Record an advance or part payment against an open stay
    #[instrument(skip(self, payment), fields(method = ?payment.method, amount = payment.amount))]
    pub async fn add_payment(&self, ip_number: &str, payment: NewPayment) -> Result<Payment> {
        payment.validate()?;
        let mut tx = self.pool.begin().await?;
        let allocation = claim_active_allocation(&mut tx, ip_number).await?;
        let payment = insert_payment(&mut tx, allocation.id, &payment, Utc::now()).await?;
        tx.commit().await?;
        info!(ip_number, receipt = %payment.receipt_number, "payment received");
        Ok(payment)
    }

    #[instrument(skip(self))]
    pub async fn list_payments(&self, ip_number: &str) -> Result<Vec<Payment>> {
        let mut conn = self.pool.acquire().await?;
        let allocation = find_allocation(&mut conn, ip_number).await?;
        load_payments(&mut conn, allocation.id).await
    }

    // ===== Bills =====

    /// Reconcile an open stay as of now and sync `ip_billing`. Without a
    /// discount, the one already on the ledger is kept.
    ///
    /// A discharged stay answers with the final bill written at discharge and
    /// refuses a new discount.
    #[instrument(skip(self))]
    pub async fn current_bill(&self, ip_number: &str, discount: Option<Discount>) -> Result<BillingSummary> {
        let mut tx = self.pool.begin().await?;
        let allocation = match claim_active_allocation(&mut tx, ip_number).await {
            Ok(allocation) => allocation,
            Err(IpdError::AllocationClosed(_)) if discount.is_none() => return final_bill(&mut tx, ip_number).await,
            Err(e) => return Err(e),
        };

        let summary = reconcile_and_sync(&mut tx, &allocation, discount, &self.billing, Utc::now(), false).await?;
        tx.commit().await?;
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn get_billing_record(&self, ip_number: &str) -> Result<Option<BillingRecord>> {
        let record = sqlx::query_as::<_, BillingRecord>("SELECT * FROM ip_billing WHERE ip_number = ?")
            .bind(ip_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Ledger rows for the billing desk, most recently touched first
    #[instrument(skip(self))]
    pub async fn billing_ledger(&self, filter: &BillingFilter) -> Result<Vec<BillingRecord>> {
        let mut query = sqlx::QueryBuilder::new("SELECT * FROM ip_billing WHERE 1 = 1");
        if let Some(status) = filter.payment_status {
            query.push(" AND payment_status = ");
            query.push_bind(status);
        }
        if let Some(is_final) = filter.is_final {
            query.push(" AND is_final = ");
            query.push_bind(is_final);
        }
        query.push(" ORDER BY updated_at DESC");

        let rows = query.build_query_as::<BillingRecord>().fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

pub(super) async fn insert_charge(conn: &mut SqliteConnection, allocation_id: i64, charge: &NewCharge) -> Result<Charge> {
    let amount = charge.quantity.checked_mul(charge.unit_price).ok_or_else(|| {
        IpdError::Validation(format!("{} x {} overflows the charge amount", charge.quantity, charge.unit_price))
    })?;
    let charge = sqlx::query_as::<_, Charge>(
        "INSERT INTO ip_charges (allocation_id, category, description, quantity, unit_price, amount, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(allocation_id)
    .bind(charge.category)
    .bind(&charge.description)
    .bind(charge.quantity)
    .bind(charge.unit_price)
    .bind(amount)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(charge)
}

pub(super) async fn insert_payment(
    conn: &mut SqliteConnection,
    allocation_id: i64,
    payment: &NewPayment,
    received_at: DateTime<Utc>,
) -> Result<Payment> {
    let receipt_number = format!("RCPT-{}", &Uuid::new_v4().simple().to_string()[..12]).to_uppercase();
    let payment = sqlx::query_as::<_, Payment>(
        "INSERT INTO ip_payments (allocation_id, receipt_number, method, amount, reference, received_at)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(allocation_id)
    .bind(&receipt_number)
    .bind(payment.method)
    .bind(payment.amount)
    .bind(&payment.reference)
    .bind(received_at)
    .fetch_one(&mut *conn)
    .await?;
    Ok(payment)
}

/// The bill frozen into the discharge summary
async fn final_bill(conn: &mut SqliteConnection, ip_number: &str) -> Result<BillingSummary> {
    sqlx::query_scalar::<_, Json<BillingSummary>>("SELECT billing FROM discharge_summaries WHERE ip_number = ?")
        .bind(ip_number)
        .fetch_optional(&mut *conn)
        .await?
        .map(|stored| stored.0)
        .ok_or_else(|| IpdError::not_found("discharge summary", ip_number))
}

async fn load_charges(conn: &mut SqliteConnection, allocation_id: i64) -> Result<Vec<Charge>> {
    let charges = sqlx::query_as::<_, Charge>("SELECT * FROM ip_charges WHERE allocation_id = ? ORDER BY created_at, id")
        .bind(allocation_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(charges)
}

async fn load_payments(conn: &mut SqliteConnection, allocation_id: i64) -> Result<Vec<Payment>> {
    let payments =
        sqlx::query_as::<_, Payment>("SELECT * FROM ip_payments WHERE allocation_id = ? ORDER BY received_at, id")
            .bind(allocation_id)
            .fetch_all(&mut *conn)
            .await?;
    Ok(payments)
}

/// Read the stay's billing inputs, reconcile, and upsert its `ip_billing` row
pub(super) async fn reconcile_and_sync(
    conn: &mut SqliteConnection,
    allocation: &BedAllocation,
    discount: Option<Discount>,
    policy: &BillingPolicy,
    as_of: DateTime<Utc>,
    is_final: bool,
) -> Result<BillingSummary> {
    let discount = match discount {
        Some(discount) => discount,
        None => sqlx::query_scalar::<_, Json<Discount>>("SELECT discount FROM ip_billing WHERE allocation_id = ?")
            .bind(allocation.id)
            .fetch_optional(&mut *conn)
            .await?
            .map(|stored| stored.0)
            .unwrap_or_default(),
    };

    let segments = load_segments(conn, allocation.id).await?;
    let charges = load_charges(conn, allocation.id).await?;
    let payments = load_payments(conn, allocation.id).await?;

    let summary = reconcile(
        &BillingInput {
            ip_number: &allocation.ip_number,
            segments: &segments,
            charges: &charges,
            payments: &payments,
            discount,
        },
        policy,
        as_of,
    )?;

    sqlx::query(
        "INSERT INTO ip_billing (
            allocation_id, ip_number, uhid, bed_days, bed_total, item_total, gross_amount,
            discount, discount_amount, net_amount, paid_amount, balance_due,
            payment_status, payment_breakdown, is_final, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (allocation_id) DO UPDATE SET
            bed_days = excluded.bed_days,
            bed_total = excluded.bed_total,
            item_total = excluded.item_total,
            gross_amount = excluded.gross_amount,
            discount = excluded.discount,
            discount_amount = excluded.discount_amount,
            net_amount = excluded.net_amount,
            paid_amount = excluded.paid_amount,
            balance_due = excluded.balance_due,
            payment_status = excluded.payment_status,
            payment_breakdown = excluded.payment_breakdown,
            is_final = excluded.is_final,
            updated_at = excluded.updated_at",
    )
    .bind(allocation.id)
    .bind(&allocation.ip_number)
    .bind(&allocation.uhid)
    .bind(summary.bed_days)
    .bind(summary.bed_total)
    .bind(summary.item_total)
    .bind(summary.gross)
    .bind(Json(summary.discount))
    .bind(summary.discount_amount)
    .bind(summary.net)
    .bind(summary.paid)
    .bind(summary.balance)
    .bind(summary.status)
    .bind(Json(&summary.payment_breakdown))
    .bind(is_final)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    debug!(
        ip_number = %allocation.ip_number,
        net = summary.net,
        balance = summary.balance,
        "billing ledger synced"
    );
    Ok(summary)
}
