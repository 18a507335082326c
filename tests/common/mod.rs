//! Shared fixtures for the integration tests
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use fake::faker::name::en::Name;
use fake::Fake;

use ipd::models::{
    Bed, BedAllocation, BedType, DischargeRequest, DischargeType, Gender, NewAdmission, NewBed, NewPatient,
    Patient,
};
use ipd::Database;

pub async fn setup() -> Database {
    Database::in_memory().await.expect("in-memory database")
}

/// 2026-03-01 08:00 UTC shifted by whole hours
pub fn at(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap() + Duration::hours(hours)
}

pub async fn register(db: &Database) -> Patient {
    db.register_patient(NewPatient {
        full_name: Name().fake(),
        gender: Gender::Female,
        date_of_birth: None,
        phone: Some("+919812345678".into()),
        address: None,
        guardian_name: None,
    })
    .await
    .expect("register patient")
}

pub async fn bed(db: &Database, ward: &str, number: &str, daily_rate: i64) -> Bed {
    db.create_bed(NewBed {
        ward: ward.into(),
        room: None,
        bed_number: number.into(),
        bed_type: BedType::General,
        daily_rate,
    })
    .await
    .expect("create bed")
}

pub fn admission(uhid: &str, bed_id: i64, admitted_at: DateTime<Utc>) -> NewAdmission {
    NewAdmission {
        uhid: uhid.into(),
        bed_id,
        admitting_doctor: "Dr. Menon".into(),
        department: Some("General Medicine".into()),
        admission_reason: Some("Fever with dehydration".into()),
        admitted_at: Some(admitted_at),
    }
}

pub async fn admit(db: &Database, uhid: &str, bed_id: i64, admitted_at: DateTime<Utc>) -> BedAllocation {
    db.admit(admission(uhid, bed_id, admitted_at)).await.expect("admit")
}

pub fn discharge_request(discharged_at: DateTime<Utc>) -> DischargeRequest {
    DischargeRequest {
        discharge_type: DischargeType::Normal,
        final_diagnosis: "Acute gastroenteritis".into(),
        treatment_given: Some("IV fluids, antiemetics".into()),
        procedures: None,
        condition_at_discharge: Some("Stable".into()),
        medications_on_discharge: Vec::new(),
        advice: Some("Oral fluids, soft diet".into()),
        follow_up_on: None,
        discount: None,
        payments: Vec::new(),
        discharged_at: Some(discharged_at),
        discharged_by: "Dr. Menon".into(),
    }
}
