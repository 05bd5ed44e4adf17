use actix_web::{post, web, HttpResponse, Responder};
use crate::server::controller::error::CustomError;
use crate::server::model::user::{LoginRequest, RegisterRequest, UserResponse};
use crate::server::service;
use crate::server::state::AppState;
use crate::server::util::time::helper::get_utc_now;

#[post("/auth/login")]
/// exchange credentials for a session token
async fn login(body: web::Json<LoginRequest>, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    let session = service::auth::login(data.store(), data.tokens(), &body).await?;
    Ok(web::Json(session))
}

#[post("/auth/registro")]
async fn register(body: web::Json<RegisterRequest>, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    let user = service::auth::register(data.store(), &body, get_utc_now()).await?;
    Ok(HttpResponse::Created().json(UserResponse {
        mensaje: "Usuario registrado exitosamente".to_string(),
        usuario: user,
    }))
}
