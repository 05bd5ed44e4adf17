use actix_web::{get, post, put, web, HttpResponse, Responder};
use validator::Validate;
use crate::server::auth::extractor::AuthenticatedUser;
use crate::server::controller::error::{unique_as, CustomError};
use crate::server::model::table::{CreateTableRequest, TableResponse, UpdateTableRequest};
use crate::server::model::user::Role;
use crate::server::state::AppState;

const DUPLICATE_NUMBER: &str = "Ya existe una mesa con ese número";

#[get("/mesas")]
/// active tables by number
async fn get_tables(_user: AuthenticatedUser, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    Ok(web::Json(data.store().list_active_tables().await?))
}

#[post("/mesas")]
async fn post_table(
    user: AuthenticatedUser,
    body: web::Json<CreateTableRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&[Role::Administrador])?;
    body.validate()?;
    let table = data
        .store()
        .create_table(body.numero, body.capacidad, body.estado.unwrap_or_default())
        .await
        .map_err(unique_as(DUPLICATE_NUMBER))?;
    Ok(HttpResponse::Created().json(TableResponse {
        mensaje: "Mesa creada exitosamente".to_string(),
        mesa: table,
    }))
}

#[put("/mesas/{id}")]
/// partial update; `activa = false` retires the table
async fn put_table(
    user: AuthenticatedUser,
    id: web::Path<i64>,
    body: web::Json<UpdateTableRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&[Role::Administrador])?;
    if body.is_empty() {
        return Err(CustomError::bad_request("No hay datos para actualizar"));
    }
    body.validate()?;
    let table = data
        .store()
        .update_table(id.into_inner(), body.into_inner())
        .await?
        .ok_or_else(|| CustomError::not_found("Mesa no encontrada"))?;
    Ok(web::Json(TableResponse {
        mensaje: "Mesa actualizada exitosamente".to_string(),
        mesa: table,
    }))
}
