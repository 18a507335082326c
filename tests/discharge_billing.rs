mod common;

use common::{admit, at, bed, discharge_request, register, setup};
use ipd::domain::billing::{Discount, PaymentStatus};
use ipd::models::{
    BedStatus, BedTransfer, BillingFilter, ChargeCategory, DischargeMedication, NewCharge, NewPayment, PaymentMethod,
};
use ipd::{Database, IpdError};

fn charge(category: ChargeCategory, quantity: i64, unit_price: i64) -> NewCharge {
    NewCharge {
        category,
        description: format!("{:?} item", category),
        quantity,
        unit_price,
    }
}

fn payment(method: PaymentMethod, amount: i64) -> NewPayment {
    NewPayment {
        method,
        amount,
        reference: None,
    }
}

/// One patient in a 1500.00/day bed with lab and pharmacy charges and a cash advance
async fn stay_with_charges(db: &Database) -> (String, i64) {
    let patient = register(db).await;
    let bed = bed(db, "General", "G-01", 150_000).await;
    let allocation = admit(db, &patient.uhid, bed.id, at(0)).await;
    let ip = allocation.ip_number;

    db.add_charge(&ip, charge(ChargeCategory::Laboratory, 1, 50_000)).await.unwrap();
    db.add_charge(&ip, charge(ChargeCategory::Pharmacy, 2, 12_500)).await.unwrap();
    db.add_payment(&ip, payment(PaymentMethod::Cash, 100_000)).await.unwrap();
    (ip, bed.id)
}

#[tokio::test]
async fn discharge_reconciles_split_payments_and_discount() {
    let db = setup().await;
    let (ip, bed_id) = stay_with_charges(&db).await;

    let mut request = discharge_request(at(71));
    request.discount = Some(Discount::Flat { amount: 25_000 });
    request.payments = vec![payment(PaymentMethod::Card, 300_000), payment(PaymentMethod::Upi, 100_000)];

    let summary = db.discharge(&ip, request).await.unwrap();
    let bill = &summary.billing.0;

    // 71h is three started days
    assert_eq!(bill.bed_days, 3);
    assert_eq!(bill.bed_total, 450_000);
    assert_eq!(bill.item_breakdown[&ChargeCategory::Laboratory], 50_000);
    assert_eq!(bill.item_breakdown[&ChargeCategory::Pharmacy], 25_000);
    assert_eq!(bill.item_total, 75_000);
    assert_eq!(bill.gross, 525_000);
    assert_eq!(bill.discount_amount, 25_000);
    assert_eq!(bill.net, 500_000);
    assert_eq!(bill.payment_breakdown[&PaymentMethod::Cash], 100_000);
    assert_eq!(bill.payment_breakdown[&PaymentMethod::Card], 300_000);
    assert_eq!(bill.payment_breakdown[&PaymentMethod::Upi], 100_000);
    assert_eq!(bill.paid, 500_000);
    assert_eq!(bill.balance, 0);
    assert_eq!(bill.status, PaymentStatus::Paid);

    let allocation = db.get_allocation(&ip).await.unwrap();
    assert!(!allocation.is_active());
    assert_eq!(allocation.discharged_at, Some(at(71)));
    assert_eq!(db.get_bed(bed_id).await.unwrap().status, BedStatus::Vacant);

    let segments = db.bed_segments(&ip).await.unwrap();
    assert_eq!(segments[0].ended_at, Some(at(71)));
}

#[tokio::test]
async fn ledger_row_tracks_interim_and_final_bills() {
    let db = setup().await;
    let (ip, _) = stay_with_charges(&db).await;

    let interim = db.current_bill(&ip, Some(Discount::Percent { percent: 10 })).await.unwrap();
    let record = db.get_billing_record(&ip).await.unwrap().expect("ledger row");
    assert!(!record.is_final);
    assert_eq!(record.net_amount, interim.net);
    assert_eq!(record.discount.0, Discount::Percent { percent: 10 });
    assert_eq!(record.payment_status, PaymentStatus::Partial);

    // Discharge without a discount keeps the one on the ledger
    let summary = db.discharge(&ip, discharge_request(at(24))).await.unwrap();
    let bill = &summary.billing.0;
    assert_eq!(bill.bed_days, 1);
    assert_eq!(bill.gross, 225_000);
    assert_eq!(bill.discount_amount, 22_500);
    assert_eq!(bill.net, 202_500);
    assert_eq!(bill.balance, 102_500);
    assert_eq!(bill.status, PaymentStatus::Partial);

    let record = db.get_billing_record(&ip).await.unwrap().expect("ledger row");
    assert!(record.is_final);
    assert_eq!(record.balance_due, 102_500);
    assert_eq!(record.paid_amount, 100_000);

    let finals = db
        .billing_ledger(&BillingFilter {
            is_final: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].ip_number, ip);

    // The bill of a closed stay stays as of discharge
    let again = db.current_bill(&ip, None).await.unwrap();
    assert_eq!(again.as_of, at(24));
    assert_eq!(again.net, 202_500);
}

#[tokio::test]
async fn overpayment_leaves_refund_due() {
    let db = setup().await;
    let (ip, _) = stay_with_charges(&db).await;

    let mut request = discharge_request(at(10));
    request.payments = vec![payment(PaymentMethod::Card, 200_000)];
    let summary = db.discharge(&ip, request).await.unwrap();

    let bill = &summary.billing.0;
    assert_eq!(bill.net, 225_000);
    assert_eq!(bill.paid, 300_000);
    assert_eq!(bill.balance, -75_000);
    assert_eq!(bill.status, PaymentStatus::RefundDue);
}

#[tokio::test]
async fn discount_above_gross_rolls_back_discharge() {
    let db = setup().await;
    let (ip, bed_id) = stay_with_charges(&db).await;

    let mut request = discharge_request(at(10));
    request.discount = Some(Discount::Flat { amount: 1_000_000 });
    request.payments = vec![payment(PaymentMethod::Card, 1_000)];
    let err = db.discharge(&ip, request).await.unwrap_err();
    assert!(matches!(err, IpdError::DiscountExceedsTotal { .. }));

    // Nothing from the failed attempt sticks
    assert!(db.get_allocation(&ip).await.unwrap().is_active());
    assert_eq!(db.get_bed(bed_id).await.unwrap().status, BedStatus::Occupied);
    assert_eq!(db.list_payments(&ip).await.unwrap().len(), 1);
    assert!(db.get_discharge_summary(&ip).await.is_err());
}

#[tokio::test]
async fn second_discharge_is_rejected() {
    let db = setup().await;
    let (ip, _) = stay_with_charges(&db).await;

    db.discharge(&ip, discharge_request(at(30))).await.unwrap();
    let err = db.discharge(&ip, discharge_request(at(31))).await.unwrap_err();
    assert!(matches!(err, IpdError::AllocationClosed(_)));

    // Closed stays accept no further billing writes
    let err = db.add_payment(&ip, payment(PaymentMethod::Cash, 1_000)).await.unwrap_err();
    assert!(matches!(err, IpdError::AllocationClosed(_)));
    let err = db
        .add_charge(&ip, charge(ChargeCategory::Other, 1, 1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, IpdError::AllocationClosed(_)));
}

#[tokio::test]
async fn discharge_before_admission_is_invalid() {
    let db = setup().await;
    let patient = register(&db).await;
    let bed = bed(&db, "General", "G-01", 100_000).await;
    let allocation = admit(&db, &patient.uhid, bed.id, at(10)).await;

    let err = db
        .discharge(&allocation.ip_number, discharge_request(at(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, IpdError::Validation(_)));
}

#[tokio::test]
async fn transferred_stay_is_charged_per_bed() {
    let db = setup().await;
    let patient = register(&db).await;
    let general = bed(&db, "General", "G-01", 100_000).await;
    let icu = bed(&db, "ICU", "I-01", 300_000).await;
    let allocation = admit(&db, &patient.uhid, general.id, at(0)).await;
    let ip = allocation.ip_number;

    db.transfer_bed(
        &ip,
        BedTransfer {
            to_bed_id: icu.id,
            transferred_at: Some(at(26)),
            reason: None,
        },
    )
    .await
    .unwrap();

    let summary = db.discharge(&ip, discharge_request(at(48))).await.unwrap();
    let bill = &summary.billing.0;

    // 26h on the general bed, 22h in ICU
    assert_eq!(bill.bed_charges.len(), 2);
    assert_eq!(bill.bed_charges[0].days, 2);
    assert_eq!(bill.bed_charges[0].amount, 200_000);
    assert_eq!(bill.bed_charges[1].days, 1);
    assert_eq!(bill.bed_charges[1].amount, 300_000);
    assert_eq!(bill.bed_days, 3);
    assert_eq!(bill.bed_total, 500_000);
    assert_eq!(bill.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn same_hour_discharge_bills_minimum_day() {
    let db = setup().await;
    let patient = register(&db).await;
    let bed = bed(&db, "General", "G-01", 100_000).await;
    let allocation = admit(&db, &patient.uhid, bed.id, at(0)).await;

    let summary = db
        .discharge(&allocation.ip_number, discharge_request(at(0)))
        .await
        .unwrap();
    assert_eq!(summary.billing.0.bed_days, 1);
    assert_eq!(summary.billing.0.bed_total, 100_000);
}

#[tokio::test]
async fn printed_summary_carries_narrative_and_bill() {
    let db = setup().await;
    let (ip, _) = stay_with_charges(&db).await;

    let mut request = discharge_request(at(71));
    request.medications_on_discharge = vec![DischargeMedication {
        drug: "Ondansetron".into(),
        dose: "4 mg".into(),
        frequency: "TID".into(),
        duration: Some("3 days".into()),
    }];
    let summary = db.discharge(&ip, request).await.unwrap();
    assert_eq!(summary.medications_on_discharge.len(), 1);

    let text = db.render_discharge_summary(&ip).await.unwrap();
    assert!(text.contains("DISCHARGE SUMMARY"));
    assert!(text.contains(&ip));
    assert!(text.contains("Acute gastroenteritis"));
    assert!(text.contains("Ondansetron 4 mg TID for 3 days"));
    assert!(text.contains("General/G-01"));
    assert!(text.contains("Laboratory"));
    assert!(text.contains("5250.00"));
    assert!(text.contains("Normal discharge"));
}

#[tokio::test]
async fn closed_stay_bill_cannot_be_rediscounted() {
    let db = setup().await;
    let (ip, _) = stay_with_charges(&db).await;
    let summary = db.discharge(&ip, discharge_request(at(24))).await.unwrap();
    assert_eq!(summary.billing.0.net, 225_000);

    let err = db
        .current_bill(&ip, Some(Discount::Percent { percent: 100 }))
        .await
        .unwrap_err();
    assert!(matches!(err, IpdError::AllocationClosed(_)));

    let record = db.get_billing_record(&ip).await.unwrap().expect("ledger row");
    assert!(record.is_final);
    assert_eq!(record.net_amount, 225_000);
    assert_eq!(record.discount.0, Discount::None);

    let bill = db.current_bill(&ip, None).await.unwrap();
    assert_eq!(bill.net, summary.billing.0.net);
    assert_eq!(bill.discount_amount, 0);
}

#[tokio::test]
async fn charge_too_large_to_bill_is_rejected() {
    let db = setup().await;
    let (ip, _) = stay_with_charges(&db).await;

    let err = db
        .add_charge(&ip, charge(ChargeCategory::Procedure, 2, i64::MAX / 2 + 1))
        .await
        .unwrap_err();
    assert!(matches!(err, IpdError::Validation(_)));
    assert_eq!(db.list_charges(&ip).await.unwrap().len(), 2);

    // Fits as a single charge but overflows the bill total
    db.add_charge(&ip, charge(ChargeCategory::Procedure, 1, i64::MAX - 10)).await.unwrap();
    let err = db.current_bill(&ip, None).await.unwrap_err();
    assert!(matches!(err, IpdError::Validation(_)));
}
