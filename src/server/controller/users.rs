use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use log::info;
use crate::server::auth::extractor::AuthenticatedUser;
use crate::server::auth::password::hash_password;
use crate::server::controller::error::{unique_as, CustomError};
use crate::server::model::user::{ListUsersParams, RegisterRequest, Role, UpdateUserRequest, UserPatch, UserResponse};
use crate::server::service;
use crate::server::service::auth::DUPLICATE_IDENTIFIER;
use crate::server::state::AppState;
use crate::server::util::time::helper::get_utc_now;

fn not_found() -> CustomError {
    CustomError::not_found("Usuario no encontrado")
}

#[get("/usuarios")]
/// active and inactive staff, optionally of one role
async fn get_users(
    _user: AuthenticatedUser,
    params: web::Query<ListUsersParams>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let rol = params
        .rol
        .as_deref()
        .map(str::parse::<Role>)
        .transpose()
        .map_err(CustomError::bad_request)?;
    Ok(web::Json(data.store().list_users(rol).await?))
}

#[post("/usuarios")]
async fn post_user(
    user: AuthenticatedUser,
    body: web::Json<RegisterRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&[Role::Administrador])?;
    let created = service::auth::register(data.store(), &body, get_utc_now()).await?;
    Ok(HttpResponse::Created().json(UserResponse {
        mensaje: "Usuario creado exitosamente".to_string(),
        usuario: created,
    }))
}

#[put("/usuarios/{id}")]
/// partial update; a new password is re-hashed
async fn put_user(
    user: AuthenticatedUser,
    id: web::Path<i64>,
    body: web::Json<UpdateUserRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&[Role::Administrador])?;
    if body.is_empty() {
        return Err(CustomError::bad_request("No hay datos para actualizar"));
    }
    let UpdateUserRequest { identificador, password, nombre, rol, activo } = body.into_inner();
    if [&identificador, &password, &nombre].iter().any(|f| f.as_deref().is_some_and(|v| v.trim().is_empty())) {
        return Err(CustomError::bad_request("Los campos no pueden estar vacíos"));
    }
    let patch = UserPatch {
        identificador: identificador.map(|i| i.trim().to_string()),
        password_hash: password.as_deref().map(hash_password).transpose()?,
        nombre,
        rol: rol.as_deref().map(str::parse::<Role>).transpose().map_err(CustomError::bad_request)?,
        activo,
        updated_at: Some(get_utc_now()),
    };
    let updated = data
        .store()
        .update_user(id.into_inner(), patch)
        .await
        .map_err(unique_as(DUPLICATE_IDENTIFIER))?
        .ok_or_else(not_found)?;
    info!("user {} updated by {}", updated.id, user.identificador);
    Ok(web::Json(UserResponse {
        mensaje: "Usuario actualizado exitosamente".to_string(),
        usuario: updated,
    }))
}

#[delete("/usuarios/{id}")]
/// deactivates the account, the row stays for history
async fn delete_user(
    user: AuthenticatedUser,
    id: web::Path<i64>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&[Role::Administrador])?;
    let patch = UserPatch {
        activo: Some(false),
        updated_at: Some(get_utc_now()),
        ..Default::default()
    };
    let updated = data
        .store()
        .update_user(id.into_inner(), patch)
        .await?
        .ok_or_else(not_found)?;
    info!("user {} deactivated by {}", updated.id, user.identificador);
    Ok(web::Json(UserResponse {
        mensaje: "Usuario desactivado exitosamente".to_string(),
        usuario: updated,
    }))
}
