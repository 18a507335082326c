mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use ipd::api;

macro_rules! app {
    ($db:expr) => {
        test::init_service(App::new().app_data(web::Data::new($db)).configure(api::configure)).await
    };
}

#[actix_web::test]
async fn health_reports_ok() {
    let app = app!(common::setup().await);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn admission_to_printed_discharge() {
    let app = app!(common::setup().await);

    let req = test::TestRequest::post()
        .uri("/api/v1/patients")
        .set_json(json!({ "full_name": "Asha Verma", "gender": "female", "phone": "9812345678" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let patient: Value = test::read_body_json(resp).await;
    let uhid = patient["uhid"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/beds")
        .set_json(json!({ "ward": "General", "bed_number": "G-01", "bed_type": "general", "daily_rate": 120000 }))
        .to_request();
    let bed: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admissions")
        .set_json(json!({
            "uhid": uhid,
            "bed_id": bed["id"],
            "admitting_doctor": "Dr. Menon",
            "admitted_at": "2026-03-01T08:00:00Z"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let allocation: Value = test::read_body_json(resp).await;
    let ip = allocation["ip_number"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/admissions/{}/charges", ip))
        .set_json(json!({ "category": "laboratory", "description": "CBC", "quantity": 1, "unit_price": 40000 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/admissions/{}/bill", ip))
        .set_json(json!({ "discount": { "kind": "percent", "percent": 10 } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/admissions/{}/discharge", ip))
        .set_json(json!({
            "discharge_type": "normal",
            "final_diagnosis": "Viral fever",
            "payments": [{ "method": "cash", "amount": 144000 }],
            "discharged_at": "2026-03-02T07:00:00Z",
            "discharged_by": "Dr. Menon"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let summary: Value = test::read_body_json(resp).await;
    // one bed day plus CBC, less 10%
    assert_eq!(summary["billing"]["net"], 144000);
    assert_eq!(summary["billing"]["status"], "paid");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/admissions/{}/discharge-summary/print", ip))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = test::read_body(resp).await;
    let text = String::from_utf8(text.to_vec()).unwrap();
    assert!(text.contains("Viral fever"));
    assert!(text.contains("Asha Verma"));

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/admissions/{}/discharge", ip))
        .set_json(json!({ "discharge_type": "normal", "final_diagnosis": "Again", "discharged_by": "Dr. Menon" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "allocation_closed");
}

#[actix_web::test]
async fn errors_map_to_status_codes() {
    let app = app!(common::setup().await);

    let req = test::TestRequest::get().uri("/api/v1/patients/UH424242").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "not_found");

    let req = test::TestRequest::post()
        .uri("/api/v1/patients")
        .set_json(json!({ "full_name": "", "gender": "male" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::get().uri("/api/v1/admissions/IP000404/vitals/latest").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let bed = json!({ "ward": "ICU", "bed_number": "I-01", "bed_type": "icu", "daily_rate": 500000 });
    let req = test::TestRequest::post().uri("/api/v1/beds").set_json(&bed).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    let req = test::TestRequest::post().uri("/api/v1/beds").set_json(&bed).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "duplicate_bed");
}

#[actix_web::test]
async fn dashboard_counts_beds() {
    let db = common::setup().await;
    common::bed(&db, "General", "G-01", 100_000).await;
    common::bed(&db, "ICU", "I-01", 300_000).await;
    let app = app!(db);

    let req = test::TestRequest::get().uri("/api/v1/dashboard/occupancy").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["vacant"], 2);
    assert_eq!(body["wards"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get().uri("/api/v1/beds?ward=ICU").to_request();
    let beds: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(beds.as_array().unwrap().len(), 1);
}
