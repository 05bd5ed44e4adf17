use actix_web::{get, post, put, web, HttpResponse, Responder};
use crate::server::auth::extractor::AuthenticatedUser;
use crate::server::controller::error::CustomError;
use crate::server::model::bill::{BillResponse, CreateBillRequest, CreateBillResponse, UpdateBillRequest};
use crate::server::model::user::Role;
use crate::server::service;
use crate::server::state::AppState;
use crate::server::util::time::helper::get_utc_now;

const CASHIERS: [Role; 2] = [Role::Administrador, Role::Mesero];

#[get("/cuentas")]
/// newest first
async fn get_bills(user: AuthenticatedUser, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    user.require_role(&CASHIERS)?;
    Ok(web::Json(data.store().list_bills().await?))
}

#[post("/cuentas")]
async fn post_bills(
    user: AuthenticatedUser,
    body: web::Json<CreateBillRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&CASHIERS)?;
    let bills = service::billing::create_bills(data.store(), &body, get_utc_now()).await?;
    Ok(HttpResponse::Created().json(CreateBillResponse {
        mensaje: "Cuenta generada exitosamente".to_string(),
        cuentas: bills,
    }))
}

#[put("/cuentas/{id}")]
async fn put_bill(
    user: AuthenticatedUser,
    id: web::Path<i64>,
    body: web::Json<UpdateBillRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&CASHIERS)?;
    let bill = service::billing::update_bill(data.store(), id.into_inner(), &body, get_utc_now()).await?;
    Ok(web::Json(BillResponse {
        mensaje: "Cuenta actualizada exitosamente".to_string(),
        cuenta: bill,
    }))
}

#[get("/cuentas/pedido/{pedido_id}")]
async fn get_order_bill(
    user: AuthenticatedUser,
    pedido_id: web::Path<i64>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&CASHIERS)?;
    let bill = data
        .store()
        .bill_for_order(pedido_id.into_inner())
        .await?
        .ok_or_else(|| CustomError::not_found("No hay cuenta para este pedido"))?;
    Ok(web::Json(bill))
}
