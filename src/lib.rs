pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod rollup;
pub mod scheduling;
pub mod utils;

use actix_web::{web, HttpResponse};

use crate::errors::AppError;

/// Route table of the JSON API.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid JSON body: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid query: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::NotFound(format!("Invalid path: {}", err)).into()
    }))
    .service(
        web::resource("/api/auth/login")
            .route(web::post().to(handlers::auth::login)),
    )
    .service(
        web::resource("/api/auth/refresh")
            .route(web::post().to(handlers::auth::refresh)),
    )
    .service(
        web::resource("/api/auth/session")
            .route(web::get().to(handlers::auth::session)),
    )
    .service(
        web::resource("/api/register")
            .route(web::post().to(handlers::auth::register)),
    )
    .service(
        web::resource("/api/forgotpassword")
            .route(web::post().to(handlers::auth::forgot_password)),
    )
    .service(
        web::resource("/api/setpassword")
            .route(web::post().to(handlers::auth::set_password)),
    )
    .service(
        web::resource("/api/user")
            .route(web::get().to(handlers::user::get_users)),
    )
    .service(
        web::resource("/api/user/{id}")
            .route(web::get().to(handlers::user::get_user))
            .route(web::patch().to(handlers::user::update_user))
            .route(web::delete().to(handlers::user::delete_user)),
    )
    .service(
        web::resource("/api/employee")
            .route(web::get().to(handlers::employee::get_employees)),
    )
    .service(
        web::resource("/api/employee/{code}")
            .route(web::get().to(handlers::employee::get_employee))
            .route(web::delete().to(handlers::employee::delete_employee)),
    )
    .service(
        web::resource("/api/payroll/upload")
            .route(web::post().to(handlers::payroll::upload_payroll)),
    )
    .service(
        web::resource("/api/payroll/files")
            .route(web::get().to(handlers::payroll::get_payroll_files)),
    )
    .service(
        web::resource("/api/dashboard")
            .route(web::get().to(handlers::dashboard::get_dashboard)),
    )
    .service(
        web::resource("/api/dashboard/years")
            .route(web::get().to(handlers::dashboard::get_years)),
    )
    .service(
        web::resource("/api/dashboard/ranges")
            .route(web::get().to(handlers::dashboard::get_ranges)),
    )
    .service(
        web::resource("/api/dashboard/companies")
            .route(web::get().to(handlers::dashboard::get_company_overview)),
    )
    .service(
        web::resource("/api/appointment")
            .route(web::get().to(handlers::appointment::get_appointments))
            .route(web::post().to(handlers::appointment::create_appointment)),
    )
    .service(
        web::resource("/api/appointment/availability")
            .route(web::get().to(handlers::appointment::get_availability)),
    )
    .service(
        web::resource("/api/appointment/{id}")
            .route(web::patch().to(handlers::appointment::update_appointment))
            .route(web::delete().to(handlers::appointment::delete_appointment)),
    )
    .service(
        web::resource("/api/post")
            .route(web::get().to(handlers::post::get_posts))
            .route(web::post().to(handlers::post::create_post)),
    )
    .service(
        web::resource("/api/post/{id}")
            .route(web::get().to(handlers::post::get_post))
            .route(web::patch().to(handlers::post::update_post))
            .route(web::delete().to(handlers::post::delete_post)),
    )
    .service(
        web::resource("/api/report")
            .route(web::get().to(handlers::report::get_reports))
            .route(web::post().to(handlers::report::create_report)),
    )
    .service(
        web::resource("/api/report/{id}")
            .route(web::get().to(handlers::report::get_report))
            .route(web::patch().to(handlers::report::resolve_report)),
    )
    .service(
        web::resource("/api/chat/room")
            .route(web::get().to(handlers::chat::get_my_room)),
    )
    .service(
        web::resource("/api/chat/rooms")
            .route(web::get().to(handlers::chat::get_rooms)),
    )
    .service(
        web::resource("/api/chat/{room_id}/messages")
            .route(web::get().to(handlers::chat::get_messages))
            .route(web::post().to(handlers::chat::send_message)),
    )
    .service(
        web::resource("/api/chat/{room_id}/read")
            .route(web::patch().to(handlers::chat::mark_read)),
    )
    .service(
        web::resource("/api/upload")
            .route(web::post().to(handlers::file::upload_file)),
    )
    .default_service(web::to(|| async {
        HttpResponse::NotFound().json(serde_json::json!({ "error": "Route not found" }))
    }));
}
