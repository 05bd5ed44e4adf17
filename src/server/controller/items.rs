use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use log::info;
use rust_decimal::Decimal;
use validator::Validate;
use crate::server::auth::extractor::AuthenticatedUser;
use crate::server::controller::error::CustomError;
use crate::server::model::item::{MenuItemRequest, MenuItemResponse};
use crate::server::model::user::Role;
use crate::server::state::AppState;

fn check(body: &MenuItemRequest) -> Result<(), CustomError> {
    body.validate()?;
    if body.precio <= Decimal::ZERO {
        return Err(CustomError::bad_request("Nombre y precio son obligatorios"));
    }
    Ok(())
}

#[get("/platillos")]
/// dishes currently on offer
async fn get_items(_user: AuthenticatedUser, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    Ok(web::Json(data.store().list_available_items().await?))
}

#[post("/platillos")]
async fn post_item(
    user: AuthenticatedUser,
    body: web::Json<MenuItemRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&[Role::Administrador])?;
    check(&body)?;
    let item = data.store().create_item(body.into_inner()).await?;
    info!("dish {} created by {}", item.id, user.identificador);
    Ok(HttpResponse::Created().json(MenuItemResponse {
        mensaje: "Platillo creado exitosamente".to_string(),
        platillo: item,
    }))
}

#[put("/platillos/{id}")]
/// full replace of a dish
async fn put_item(
    user: AuthenticatedUser,
    id: web::Path<i64>,
    body: web::Json<MenuItemRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&[Role::Administrador])?;
    check(&body)?;
    let item = data
        .store()
        .update_item(id.into_inner(), body.into_inner())
        .await?
        .ok_or_else(|| CustomError::not_found("Platillo no encontrado"))?;
    Ok(web::Json(MenuItemResponse {
        mensaje: "Platillo actualizado exitosamente".to_string(),
        platillo: item,
    }))
}

#[delete("/platillos/{id}")]
/// takes the dish off the menu; past orders keep referencing it
async fn delete_item(
    user: AuthenticatedUser,
    id: web::Path<i64>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&[Role::Administrador])?;
    let item = data
        .store()
        .deactivate_item(id.into_inner())
        .await?
        .ok_or_else(|| CustomError::not_found("Platillo no encontrado"))?;
    Ok(web::Json(MenuItemResponse {
        mensaje: "Platillo eliminado exitosamente".to_string(),
        platillo: item,
    }))
}
