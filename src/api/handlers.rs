use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::{IpdError, Result};
use crate::models::{
    AllocationFilter, BedFilter, BedStatusUpdate, BedTransfer, BillRequest, BillingFilter, CaseSheetInput,
    DischargeRequest, Dispense, NewAdministration, NewAdmission, NewBed, NewCharge, NewNurseRecord, NewOrder,
    NewPatient, NewPayment, NewRecommendation, NewVitals, OrderFilter, OrderStatusUpdate, PatientFilter, Rejection,
};
use crate::Database;

type Db = web::Data<Database>;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ===== Patients =====

pub async fn register_patient(db: Db, body: web::Json<NewPatient>) -> Result<HttpResponse> {
    let patient = db.register_patient(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(patient))
}

pub async fn search_patients(db: Db, filter: web::Query<PatientFilter>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.search_patients(&filter).await?))
}

pub async fn get_patient(db: Db, uhid: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.get_patient(&uhid).await?))
}

// ===== Beds =====

pub async fn create_bed(db: Db, body: web::Json<NewBed>) -> Result<HttpResponse> {
    let bed = db.create_bed(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(bed))
}

pub async fn list_beds(db: Db, filter: web::Query<BedFilter>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.list_beds(&filter).await?))
}

pub async fn set_bed_status(db: Db, id: web::Path<i64>, body: web::Json<BedStatusUpdate>) -> Result<HttpResponse> {
    let bed = db.set_bed_status(id.into_inner(), body.status).await?;
    Ok(HttpResponse::Ok().json(bed))
}

// ===== Admissions =====

pub async fn admit(db: Db, body: web::Json<NewAdmission>) -> Result<HttpResponse> {
    let allocation = db.admit(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(allocation))
}

pub async fn list_allocations(db: Db, filter: web::Query<AllocationFilter>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.list_allocations(&filter).await?))
}

pub async fn get_allocation(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.get_allocation(&ip).await?))
}

pub async fn transfer_bed(db: Db, ip: web::Path<String>, body: web::Json<BedTransfer>) -> Result<HttpResponse> {
    let allocation = db.transfer_bed(&ip, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(allocation))
}

pub async fn bed_segments(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.bed_segments(&ip).await?))
}

// ===== Billing =====

pub async fn add_charge(db: Db, ip: web::Path<String>, body: web::Json<NewCharge>) -> Result<HttpResponse> {
    let charge = db.add_charge(&ip, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(charge))
}

pub async fn list_charges(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.list_charges(&ip).await?))
}

pub async fn add_payment(db: Db, ip: web::Path<String>, body: web::Json<NewPayment>) -> Result<HttpResponse> {
    let payment = db.add_payment(&ip, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(payment))
}

pub async fn list_payments(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.list_payments(&ip).await?))
}

pub async fn current_bill(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.current_bill(&ip, None).await?))
}

pub async fn bill_with_discount(db: Db, ip: web::Path<String>, body: web::Json<BillRequest>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.current_bill(&ip, body.discount).await?))
}

pub async fn billing_ledger(db: Db, filter: web::Query<BillingFilter>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.billing_ledger(&filter).await?))
}

// ===== Discharge =====

pub async fn discharge(db: Db, ip: web::Path<String>, body: web::Json<DischargeRequest>) -> Result<HttpResponse> {
    let summary = db.discharge(&ip, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(summary))
}

pub async fn get_discharge_summary(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.get_discharge_summary(&ip).await?))
}

pub async fn print_discharge_summary(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    let text = db.render_discharge_summary(&ip).await?;
    Ok(HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(text))
}

// ===== Clinical documentation =====

pub async fn upsert_case_sheet(db: Db, ip: web::Path<String>, body: web::Json<CaseSheetInput>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.upsert_case_sheet(&ip, body.into_inner()).await?))
}

pub async fn get_case_sheet(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.get_case_sheet(&ip).await?))
}

pub async fn create_order(db: Db, ip: web::Path<String>, body: web::Json<NewOrder>) -> Result<HttpResponse> {
    let order = db.create_order(&ip, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

pub async fn list_orders(db: Db, ip: web::Path<String>, filter: web::Query<OrderFilter>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.list_orders(&ip, filter.active_only).await?))
}

pub async fn update_order_status(
    db: Db,
    id: web::Path<i64>,
    body: web::Json<OrderStatusUpdate>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.update_order_status(id.into_inner(), body.status).await?))
}

pub async fn add_nurse_record(db: Db, ip: web::Path<String>, body: web::Json<NewNurseRecord>) -> Result<HttpResponse> {
    let record = db.add_nurse_record(&ip, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(record))
}

pub async fn list_nurse_records(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.list_nurse_records(&ip).await?))
}

pub async fn record_vitals(db: Db, ip: web::Path<String>, body: web::Json<NewVitals>) -> Result<HttpResponse> {
    let entry = db.record_vitals(&ip, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(entry))
}

pub async fn list_vitals(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.list_vitals(&ip).await?))
}

pub async fn latest_vitals(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    let entry = db
        .latest_vitals(&ip)
        .await?
        .ok_or_else(|| IpdError::not_found("vitals", ip.as_str()))?;
    Ok(HttpResponse::Ok().json(entry))
}

pub async fn record_administration(
    db: Db,
    ip: web::Path<String>,
    body: web::Json<NewAdministration>,
) -> Result<HttpResponse> {
    let record = db.record_administration(&ip, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(record))
}

pub async fn list_administrations(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.list_administrations(&ip).await?))
}

// ===== Pharmacy =====

pub async fn recommend(db: Db, ip: web::Path<String>, body: web::Json<NewRecommendation>) -> Result<HttpResponse> {
    let rec = db.recommend(&ip, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(rec))
}

pub async fn list_recommendations(db: Db, ip: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.list_recommendations(&ip).await?))
}

pub async fn pharmacy_queue(db: Db) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.pharmacy_queue().await?))
}

pub async fn dispense(db: Db, id: web::Path<i64>, body: web::Json<Dispense>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.dispense(id.into_inner(), body.into_inner()).await?))
}

pub async fn reject(db: Db, id: web::Path<i64>, body: web::Json<Rejection>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.reject(id.into_inner(), body.into_inner()).await?))
}

pub async fn cancel_recommendation(db: Db, id: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.cancel_recommendation(id.into_inner()).await?))
}

// ===== Dashboard =====

pub async fn occupancy(db: Db) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(db.occupancy().await?))
}
