mod common;

use common::{admission, at, bed, register, setup};
use ipd::models::{AllocationFilter, AllocationStatus, BedFilter, BedStatus, BedTransfer};
use ipd::IpdError;

#[tokio::test]
async fn admission_occupies_bed_and_opens_segment() {
    let db = setup().await;
    let patient = register(&db).await;
    let bed = bed(&db, "General", "G-01", 150_000).await;

    let allocation = db.admit(admission(&patient.uhid, bed.id, at(0))).await.unwrap();
    assert_eq!(allocation.ip_number, "IP000001");
    assert_eq!(allocation.status, AllocationStatus::Active);

    let bed = db.get_bed(bed.id).await.unwrap();
    assert_eq!(bed.status, BedStatus::Occupied);

    let segments = db.bed_segments(&allocation.ip_number).await.unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].daily_rate, 150_000);
    assert_eq!(segments[0].bed_label, "General/G-01");
    assert!(segments[0].ended_at.is_none());
}

#[tokio::test]
async fn ip_numbers_are_sequential() {
    let db = setup().await;
    let first = register(&db).await;
    let second = register(&db).await;
    assert_eq!(first.uhid, "UH000001");
    assert_eq!(second.uhid, "UH000002");

    let a = bed(&db, "General", "G-01", 100_000).await;
    let b = bed(&db, "General", "G-02", 100_000).await;
    let ip1 = db.admit(admission(&first.uhid, a.id, at(0))).await.unwrap();
    let ip2 = db.admit(admission(&second.uhid, b.id, at(1))).await.unwrap();
    assert_eq!(ip1.ip_number, "IP000001");
    assert_eq!(ip2.ip_number, "IP000002");
}

#[tokio::test]
async fn patient_cannot_hold_two_active_admissions() {
    let db = setup().await;
    let patient = register(&db).await;
    let a = bed(&db, "General", "G-01", 100_000).await;
    let b = bed(&db, "General", "G-02", 100_000).await;

    let first = db.admit(admission(&patient.uhid, a.id, at(0))).await.unwrap();
    let err = db.admit(admission(&patient.uhid, b.id, at(1))).await.unwrap_err();
    match err {
        IpdError::PatientAlreadyAdmitted { ip_number, .. } => assert_eq!(ip_number, first.ip_number),
        other => panic!("unexpected error: {other:?}"),
    }

    // The second bed is left alone
    assert_eq!(db.get_bed(b.id).await.unwrap().status, BedStatus::Vacant);
}

#[tokio::test]
async fn occupied_bed_is_unavailable() {
    let db = setup().await;
    let first = register(&db).await;
    let second = register(&db).await;
    let bed = bed(&db, "ICU", "I-01", 500_000).await;

    db.admit(admission(&first.uhid, bed.id, at(0))).await.unwrap();
    let err = db.admit(admission(&second.uhid, bed.id, at(1))).await.unwrap_err();
    assert!(matches!(err, IpdError::BedUnavailable(id) if id == bed.id));
}

#[tokio::test]
async fn unknown_patient_and_bed_are_not_found() {
    let db = setup().await;
    let patient = register(&db).await;
    let bed = bed(&db, "General", "G-01", 100_000).await;

    let err = db.admit(admission("UH999999", bed.id, at(0))).await.unwrap_err();
    assert!(matches!(err, IpdError::NotFound { entity: "patient", .. }));

    let err = db.admit(admission(&patient.uhid, 404, at(0))).await.unwrap_err();
    assert!(matches!(err, IpdError::NotFound { entity: "bed", .. }));
}

#[tokio::test]
async fn maintenance_bed_cannot_be_allocated() {
    let db = setup().await;
    let patient = register(&db).await;
    let bed = bed(&db, "General", "G-01", 100_000).await;

    db.set_bed_status(bed.id, BedStatus::Maintenance).await.unwrap();
    let err = db.admit(admission(&patient.uhid, bed.id, at(0))).await.unwrap_err();
    assert!(matches!(err, IpdError::BedUnavailable(_)));

    // Occupancy is never set by hand
    let err = db.set_bed_status(bed.id, BedStatus::Occupied).await.unwrap_err();
    assert!(matches!(err, IpdError::InvalidTransition { .. }));

    let bed = db.set_bed_status(bed.id, BedStatus::Vacant).await.unwrap();
    assert_eq!(bed.status, BedStatus::Vacant);
}

#[tokio::test]
async fn duplicate_bed_number_in_ward_is_rejected() {
    let db = setup().await;
    bed(&db, "General", "G-01", 100_000).await;
    let err = db
        .create_bed(ipd::models::NewBed {
            ward: "General".into(),
            room: None,
            bed_number: "G-01".into(),
            bed_type: ipd::models::BedType::General,
            daily_rate: 100_000,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, IpdError::DuplicateBed { .. }));
    assert_eq!(db.list_beds(&Default::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn transfer_moves_patient_and_splits_segments() {
    let db = setup().await;
    let patient = register(&db).await;
    let general = bed(&db, "General", "G-01", 100_000).await;
    let icu = bed(&db, "ICU", "I-01", 300_000).await;

    let allocation = db.admit(admission(&patient.uhid, general.id, at(0))).await.unwrap();
    let moved = db
        .transfer_bed(
            &allocation.ip_number,
            BedTransfer {
                to_bed_id: icu.id,
                transferred_at: Some(at(26)),
                reason: Some("Desaturation".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.bed_id, icu.id);

    assert_eq!(db.get_bed(general.id).await.unwrap().status, BedStatus::Vacant);
    assert_eq!(db.get_bed(icu.id).await.unwrap().status, BedStatus::Occupied);

    let segments = db.bed_segments(&allocation.ip_number).await.unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].ended_at, Some(at(26)));
    assert_eq!(segments[1].started_at, at(26));
    assert_eq!(segments[1].daily_rate, 300_000);
    assert_eq!(segments[1].reason.as_deref(), Some("Desaturation"));
}

#[tokio::test]
async fn transfer_to_occupied_bed_changes_nothing() {
    let db = setup().await;
    let first = register(&db).await;
    let second = register(&db).await;
    let a = bed(&db, "General", "G-01", 100_000).await;
    let b = bed(&db, "General", "G-02", 100_000).await;

    let allocation = db.admit(admission(&first.uhid, a.id, at(0))).await.unwrap();
    db.admit(admission(&second.uhid, b.id, at(0))).await.unwrap();

    let err = db
        .transfer_bed(
            &allocation.ip_number,
            BedTransfer {
                to_bed_id: b.id,
                transferred_at: Some(at(5)),
                reason: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IpdError::BedUnavailable(_)));
    assert_eq!(db.bed_segments(&allocation.ip_number).await.unwrap().len(), 1);
    assert_eq!(db.get_allocation(&allocation.ip_number).await.unwrap().bed_id, a.id);
}

#[tokio::test]
async fn lists_filter_by_ward_and_status() {
    let db = setup().await;
    let patient = register(&db).await;
    let general = bed(&db, "General", "G-01", 100_000).await;
    bed(&db, "General", "G-02", 100_000).await;
    bed(&db, "ICU", "I-01", 300_000).await;
    db.admit(admission(&patient.uhid, general.id, at(0))).await.unwrap();

    let vacant = db
        .list_beds(&BedFilter {
            status: Some(BedStatus::Vacant),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(vacant.len(), 2);

    let in_general = db
        .list_allocations(&AllocationFilter {
            ward: Some("General".into()),
            status: Some(AllocationStatus::Active),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(in_general.len(), 1);
    assert_eq!(in_general[0].patient_name, patient.full_name);

    let occupancy = db.occupancy().await.unwrap();
    assert_eq!(occupancy.overall.total, 3);
    assert_eq!(occupancy.overall.occupied, 1);
    assert_eq!(occupancy.active_admissions, 1);
    assert_eq!(occupancy.wards.len(), 2);
    assert_eq!(occupancy.wards[0].ward, "General");
    assert_eq!(occupancy.wards[0].counts.occupied, 1);
}

#[tokio::test]
async fn patient_search_matches_name_and_uhid() {
    let db = setup().await;
    let patient = register(&db).await;
    register(&db).await;

    let by_uhid = db
        .search_patients(&ipd::models::PatientFilter {
            search: Some(patient.uhid.to_lowercase()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_uhid.len(), 1);
    assert_eq!(by_uhid[0].uhid, patient.uhid);

    let all = db.search_patients(&Default::default()).await.unwrap();
    assert_eq!(all.len(), 2);
}
