use actix_web::web;

use super::handlers;

/// Mount every route on the app
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health)).service(
        web::scope("/api/v1")
            // Patients
            .service(
                web::resource("/patients")
                    .route(web::post().to(handlers::register_patient))
                    .route(web::get().to(handlers::search_patients)),
            )
            .route("/patients/{uhid}", web::get().to(handlers::get_patient))
            // Beds
            .service(
                web::resource("/beds")
                    .route(web::post().to(handlers::create_bed))
                    .route(web::get().to(handlers::list_beds)),
            )
            .route("/beds/{id}/status", web::put().to(handlers::set_bed_status))
            // Admissions
            .service(
                web::resource("/admissions")
                    .route(web::post().to(handlers::admit))
                    .route(web::get().to(handlers::list_allocations)),
            )
            .route("/admissions/{ip}", web::get().to(handlers::get_allocation))
            .route("/admissions/{ip}/transfer", web::post().to(handlers::transfer_bed))
            .route("/admissions/{ip}/segments", web::get().to(handlers::bed_segments))
            // Billing
            .service(
                web::resource("/admissions/{ip}/charges")
                    .route(web::post().to(handlers::add_charge))
                    .route(web::get().to(handlers::list_charges)),
            )
            .service(
                web::resource("/admissions/{ip}/payments")
                    .route(web::post().to(handlers::add_payment))
                    .route(web::get().to(handlers::list_payments)),
            )
            .service(
                web::resource("/admissions/{ip}/bill")
                    .route(web::get().to(handlers::current_bill))
                    .route(web::post().to(handlers::bill_with_discount)),
            )
            .route("/billing", web::get().to(handlers::billing_ledger))
            // Discharge
            .route("/admissions/{ip}/discharge", web::post().to(handlers::discharge))
            .route(
                "/admissions/{ip}/discharge-summary",
                web::get().to(handlers::get_discharge_summary),
            )
            .route(
                "/admissions/{ip}/discharge-summary/print",
                web::get().to(handlers::print_discharge_summary),
            )
            // Clinical documentation
            .service(
                web::resource("/admissions/{ip}/case-sheet")
                    .route(web::put().to(handlers::upsert_case_sheet))
                    .route(web::get().to(handlers::get_case_sheet)),
            )
            .service(
                web::resource("/admissions/{ip}/orders")
                    .route(web::post().to(handlers::create_order))
                    .route(web::get().to(handlers::list_orders)),
            )
            .route("/orders/{id}/status", web::put().to(handlers::update_order_status))
            .service(
                web::resource("/admissions/{ip}/nurse-records")
                    .route(web::post().to(handlers::add_nurse_record))
                    .route(web::get().to(handlers::list_nurse_records)),
            )
            .service(
                web::resource("/admissions/{ip}/vitals")
                    .route(web::post().to(handlers::record_vitals))
                    .route(web::get().to(handlers::list_vitals)),
            )
            .route("/admissions/{ip}/vitals/latest", web::get().to(handlers::latest_vitals))
            .service(
                web::resource("/admissions/{ip}/medications")
                    .route(web::post().to(handlers::record_administration))
                    .route(web::get().to(handlers::list_administrations)),
            )
            // Pharmacy
            .service(
                web::resource("/admissions/{ip}/pharmacy")
                    .route(web::post().to(handlers::recommend))
                    .route(web::get().to(handlers::list_recommendations)),
            )
            .route("/pharmacy/queue", web::get().to(handlers::pharmacy_queue))
            .route("/pharmacy/{id}/dispense", web::post().to(handlers::dispense))
            .route("/pharmacy/{id}/reject", web::post().to(handlers::reject))
            .route("/pharmacy/{id}/cancel", web::post().to(handlers::cancel_recommendation))
            // Dashboard
            .route("/dashboard/occupancy", web::get().to(handlers::occupancy)),
    );
}
