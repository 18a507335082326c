//! Billing reconciliation for inpatient stays.
//!
//! Everything here is pure: the store loads segments, charges and payments,
//! hands them to [`reconcile`], and writes the resulting [`BillingSummary`]
//! back into the `ip_billing` ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IpdError, Result};
use crate::models::{BedSegment, Charge, ChargeCategory, Payment, PaymentMethod};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingPolicy {
    /// A stay is never charged for fewer bed days than this
    pub minimum_bed_days: i64,
    pub currency: String,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            minimum_bed_days: 1,
            currency: "INR".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discount {
    #[default]
    None,
    Flat { amount: i64 },
    Percent { percent: u8 },
}

impl Discount {
    /// Discount amount for the given gross. Percentages round half up.
    pub fn amount_for(&self, gross: i64) -> Result<i64> {
        let amount = match *self {
            Discount::None => 0,
            Discount::Flat { amount } => {
                if amount < 0 {
                    return Err(IpdError::Validation("discount must not be negative".into()));
                }
                amount
            }
            Discount::Percent { percent } => {
                if percent > 100 {
                    return Err(IpdError::Validation(format!(
                        "discount percent {} is above 100",
                        percent
                    )));
                }
                let rounded = (i128::from(gross) * i128::from(percent) + 50) / 100;
                i64::try_from(rounded).map_err(|_| overflow("discount"))?
            }
        };

        if amount > gross {
            return Err(IpdError::DiscountExceedsTotal {
                discount: amount,
                gross,
            });
        }
        Ok(amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    RefundDue,
}

impl PaymentStatus {
    pub fn from_totals(net: i64, paid: i64) -> Self {
        let balance = net - paid;
        if balance < 0 {
            PaymentStatus::RefundDue
        } else if balance == 0 {
            PaymentStatus::Paid
        } else if paid > 0 {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        }
    }
}

/// Bed-day charge for one segment of a stay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedCharge {
    pub bed_id: i64,
    pub bed_label: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub days: i64,
    pub daily_rate: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingSummary {
    pub ip_number: String,
    pub currency: String,
    pub as_of: DateTime<Utc>,
    pub bed_days: i64,
    pub bed_charges: Vec<BedCharge>,
    pub bed_total: i64,
    pub item_breakdown: BTreeMap<ChargeCategory, i64>,
    pub item_total: i64,
    pub gross: i64,
    pub discount: Discount,
    pub discount_amount: i64,
    pub net: i64,
    pub payment_breakdown: BTreeMap<PaymentMethod, i64>,
    pub paid: i64,
    pub balance: i64,
    pub status: PaymentStatus,
}

/// Everything reconciliation needs for one stay
#[derive(Debug, Clone)]
pub struct BillingInput<'a> {
    pub ip_number: &'a str,
    pub segments: &'a [BedSegment],
    pub charges: &'a [Charge],
    pub payments: &'a [Payment],
    pub discount: Discount,
}

/// Bed days between two instants: started 24h periods, zero when `to <= from`.
pub fn stay_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let seconds = (to - from).num_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }
}

/// Per-segment bed charges. Open segments run until `as_of`. If the stay
/// totals fewer than `minimum_bed_days`, the shortfall goes on the last bed.
pub fn bed_charges(segments: &[BedSegment], as_of: DateTime<Utc>, policy: &BillingPolicy) -> Result<Vec<BedCharge>> {
    let mut charges = segments
        .iter()
        .map(|segment| {
            let to = segment.ended_at.unwrap_or(as_of).max(segment.started_at);
            let days = stay_days(segment.started_at, to);
            Ok(BedCharge {
                bed_id: segment.bed_id,
                bed_label: segment.bed_label.clone(),
                from: segment.started_at,
                to,
                days,
                daily_rate: segment.daily_rate,
                amount: days.checked_mul(segment.daily_rate).ok_or_else(|| overflow("bed charge"))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let total_days: i64 = charges.iter().map(|c| c.days).sum();
    if total_days < policy.minimum_bed_days {
        if let Some(last) = charges.last_mut() {
            last.days += policy.minimum_bed_days - total_days;
            last.amount = last.days.checked_mul(last.daily_rate).ok_or_else(|| overflow("bed charge"))?;
        }
    }

    Ok(charges)
}

/// Fold bed days, itemized charges, discount and split payments into one bill.
pub fn reconcile(input: &BillingInput<'_>, policy: &BillingPolicy, as_of: DateTime<Utc>) -> Result<BillingSummary> {
    let bed_charges = bed_charges(input.segments, as_of, policy)?;
    let bed_days = bed_charges.iter().map(|c| c.days).sum();
    let bed_total = checked_total(bed_charges.iter().map(|c| c.amount), "bed total")?;

    let mut item_breakdown = BTreeMap::new();
    for charge in input.charges {
        let entry = item_breakdown.entry(charge.category).or_insert(0i64);
        *entry = entry.checked_add(charge.amount).ok_or_else(|| overflow("item total"))?;
    }
    let item_total = checked_total(item_breakdown.values().copied(), "item total")?;

    let gross = bed_total.checked_add(item_total).ok_or_else(|| overflow("gross"))?;
    let discount_amount = input.discount.amount_for(gross)?;
    let net = gross - discount_amount;

    let mut payment_breakdown = BTreeMap::new();
    for payment in input.payments {
        let entry = payment_breakdown.entry(payment.method).or_insert(0i64);
        *entry = entry.checked_add(payment.amount).ok_or_else(|| overflow("amount paid"))?;
    }
    let paid = checked_total(payment_breakdown.values().copied(), "amount paid")?;

    Ok(BillingSummary {
        ip_number: input.ip_number.to_string(),
        currency: policy.currency.clone(),
        as_of,
        bed_days,
        bed_charges,
        bed_total,
        item_breakdown,
        item_total,
        gross,
        discount: input.discount,
        discount_amount,
        net,
        payment_breakdown,
        paid,
        balance: net - paid,
        status: PaymentStatus::from_totals(net, paid),
    })
}

fn overflow(what: &str) -> IpdError {
    IpdError::Validation(format!("{} exceeds the largest amount that can be billed", what))
}

fn checked_total(amounts: impl IntoIterator<Item = i64>, what: &str) -> Result<i64> {
    amounts
        .into_iter()
        .try_fold(0i64, |total, amount| total.checked_add(amount).ok_or_else(|| overflow(what)))
}

/// Format minor units as a decimal amount, e.g. `123456` -> `1234.56`
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let minor = minor.abs();
    format!("{}{}.{:02}", sign, minor / 100, minor % 100)
}
