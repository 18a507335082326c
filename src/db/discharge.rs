use chrono::Utc;
use sqlx::types::Json;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::admissions::{close_open_segment, release_bed};
use super::billing::{insert_payment, reconcile_and_sync};
use super::{closed_or_missing, Database};
use crate::domain::billing::format_amount;
use crate::error::{IpdError, Result};
use crate::models::{BedAllocation, DischargeRequest, DischargeSummary};

impl Database {
    // ===== Discharge =====

    /// Close the stay: settle payments, reconcile the final bill, write the
    /// discharge summary and free the bed, all in one transaction.
    #[instrument(skip(self, request), fields(discharge_type = ?request.discharge_type))]
    pub async fn discharge(&self, ip_number: &str, request: DischargeRequest) -> Result<DischargeSummary> {
        request.validate()?;
        let discharged_at = request.discharged_at.unwrap_or_else(Utc::now);

        let mut tx = self.pool.begin().await?;

        // Only one discharge of a stay can flip it. This is the first statement
        // so the transaction holds the write lock before it reads anything.
        let allocation = sqlx::query_as::<_, BedAllocation>(
            "UPDATE bed_allocations SET status = 'discharged', discharged_at = ?
             WHERE ip_number = ? AND status = 'active'
             RETURNING *",
        )
        .bind(discharged_at)
        .bind(ip_number)
        .fetch_optional(&mut *tx)
        .await?;
        let allocation = match allocation {
            Some(allocation) => allocation,
            None => return Err(closed_or_missing(&mut tx, ip_number).await),
        };
        if discharged_at < allocation.admitted_at {
            return Err(IpdError::Validation(format!(
                "discharge time {} is before admission {}",
                discharged_at.to_rfc3339(),
                allocation.admitted_at.to_rfc3339()
            )));
        }

        close_open_segment(&mut tx, allocation.id, discharged_at).await?;

        for payment in &request.payments {
            insert_payment(&mut tx, allocation.id, payment, discharged_at).await?;
        }

        let billing = reconcile_and_sync(
            &mut tx,
            &allocation,
            request.discount,
            &self.billing,
            discharged_at,
            true,
        )
        .await?;

        let summary = sqlx::query_as::<_, DischargeSummary>(
            "INSERT INTO discharge_summaries (
                allocation_id, document_id, ip_number, uhid, discharge_type, final_diagnosis,
                treatment_given, procedures, condition_at_discharge, medications_on_discharge,
                advice, follow_up_on, billing, discharged_at, discharged_by
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *",
        )
        .bind(allocation.id)
        .bind(Uuid::new_v4().to_string())
        .bind(&allocation.ip_number)
        .bind(&allocation.uhid)
        .bind(request.discharge_type)
        .bind(&request.final_diagnosis)
        .bind(&request.treatment_given)
        .bind(&request.procedures)
        .bind(&request.condition_at_discharge)
        .bind(Json(&request.medications_on_discharge))
        .bind(&request.advice)
        .bind(request.follow_up_on)
        .bind(Json(&billing))
        .bind(discharged_at)
        .bind(&request.discharged_by)
        .fetch_one(&mut *tx)
        .await?;

        release_bed(&mut tx, allocation.bed_id).await?;

        tx.commit().await?;

        if billing.balance > 0 {
            warn!(ip_number, balance = billing.balance, "discharged with balance due");
        }
        info!(ip_number, net = billing.net, status = ?billing.status, "patient discharged");
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn get_discharge_summary(&self, ip_number: &str) -> Result<DischargeSummary> {
        sqlx::query_as::<_, DischargeSummary>("SELECT * FROM discharge_summaries WHERE ip_number = ?")
            .bind(ip_number)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| IpdError::not_found("discharge summary", ip_number))
    }

    /// Printable plain-text discharge summary with the final bill
    #[instrument(skip(self))]
    pub async fn render_discharge_summary(&self, ip_number: &str) -> Result<String> {
        let summary = self.get_discharge_summary(ip_number).await?;
        let allocation = self.get_allocation(ip_number).await?;
        let patient = self.get_patient(&summary.uhid).await?;
        Ok(render(&summary, &allocation, &patient.full_name))
    }
}

fn render(summary: &DischargeSummary, allocation: &BedAllocation, patient_name: &str) -> String {
    let bill = &summary.billing.0;
    let mut out = String::new();

    out.push_str("DISCHARGE SUMMARY\n");
    out.push_str(&format!("Document: {}\n\n", summary.document_id));
    out.push_str(&format!("Patient:      {} ({})\n", patient_name, summary.uhid));
    out.push_str(&format!("IP Number:    {}\n", summary.ip_number));
    out.push_str(&format!("Doctor:       {}\n", allocation.admitting_doctor));
    if let Some(department) = &allocation.department {
        out.push_str(&format!("Department:   {}\n", department));
    }
    out.push_str(&format!("Admitted:     {}\n", allocation.admitted_at.format("%Y-%m-%d %H:%M")));
    out.push_str(&format!("Discharged:   {}\n", summary.discharged_at.format("%Y-%m-%d %H:%M")));
    out.push_str(&format!("Type:         {}\n\n", summary.discharge_type.label()));

    out.push_str(&format!("Final diagnosis: {}\n", summary.final_diagnosis));
    let sections = [
        ("Treatment given", &summary.treatment_given),
        ("Procedures", &summary.procedures),
        ("Condition at discharge", &summary.condition_at_discharge),
        ("Advice", &summary.advice),
    ];
    for (title, text) in sections {
        if let Some(text) = text {
            out.push_str(&format!("{}: {}\n", title, text));
        }
    }

    if !summary.medications_on_discharge.is_empty() {
        out.push_str("\nMedications on discharge:\n");
        for med in summary.medications_on_discharge.iter() {
            out.push_str(&format!("  - {} {} {}", med.drug, med.dose, med.frequency));
            if let Some(duration) = &med.duration {
                out.push_str(&format!(" for {}", duration));
            }
            out.push('\n');
        }
    }
    if let Some(follow_up) = summary.follow_up_on {
        out.push_str(&format!("Follow up on: {}\n", follow_up));
    }

    out.push_str(&format!("\nBILL ({})\n", bill.currency));
    for charge in &bill.bed_charges {
        out.push_str(&format!(
            "  Bed {:<20} {:>3} day(s) x {:>10} = {:>12}\n",
            charge.bed_label,
            charge.days,
            format_amount(charge.daily_rate),
            format_amount(charge.amount)
        ));
    }
    for (category, amount) in &bill.item_breakdown {
        out.push_str(&format!("  {:<44} = {:>12}\n", category.label(), format_amount(*amount)));
    }
    let totals = [
        ("Gross", bill.gross),
        ("Discount", bill.discount_amount),
        ("Net payable", bill.net),
        ("Paid", bill.paid),
        ("Balance", bill.balance),
    ];
    for (label, amount) in totals {
        out.push_str(&format!("  {:<44} = {:>12}\n", label, format_amount(amount)));
    }
    out.push_str(&format!("\nDischarged by: {}\n", summary.discharged_by));

    out
}
