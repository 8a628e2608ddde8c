use actix_web::HttpResponse;
use serde::Serialize;

/// Success envelope shared by every route: `{ "message": ..., "data": ... }`.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn ok<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse { message: message.to_string(), data: Some(data) })
}

pub fn created<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse { message: message.to_string(), data: Some(data) })
}

pub fn message(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::<()> { message: message.to_string(), data: None })
}
