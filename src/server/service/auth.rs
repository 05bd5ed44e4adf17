use chrono::{DateTime, Utc};
use log::{info, warn};
use validator::Validate;
use crate::server::auth::password::{hash_password, verify_password};
use crate::server::auth::token::TokenService;
use crate::server::controller::error::{unique_as, CustomError};
use crate::server::database::store::Store;
use crate::server::model::user::{LoginRequest, LoginResponse, NewUser, RegisterRequest, Role, User};

const BAD_CREDENTIALS: &str = "Credenciales incorrectas";
pub(crate) const DUPLICATE_IDENTIFIER: &str = "El identificador ya existe";

/// Check credentials of an active account and hand out a session token.
pub(crate) async fn login(
    store: &dyn Store,
    tokens: &TokenService,
    req: &LoginRequest,
) -> Result<LoginResponse, CustomError> {
    req.validate()?;
    let identificador = req.identificador.trim();
    let Some(user) = store.find_active_user(identificador).await? else {
        warn!("login attempt for unknown or inactive user {}", identificador);
        return Err(CustomError::unauthorized(BAD_CREDENTIALS));
    };
    if !verify_password(&req.password, &user.password_hash) {
        warn!("wrong password for user {}", user.identificador);
        return Err(CustomError::unauthorized(BAD_CREDENTIALS));
    }
    let token = tokens.issue(&user)?;
    info!("user {} logged in as {}", user.identificador, user.rol);
    Ok(LoginResponse {
        mensaje: "Login exitoso".to_string(),
        usuario: user,
        token,
    })
}

/// Create an account with a hashed password.
pub(crate) async fn register(
    store: &dyn Store,
    req: &RegisterRequest,
    now: DateTime<Utc>,
) -> Result<User, CustomError> {
    req.validate()?;
    let identificador = req.identificador.trim();
    if identificador.is_empty() {
        return Err(CustomError::bad_request("Identificador, password, nombre y rol son obligatorios"));
    }
    let rol: Role = req.rol.parse().map_err(CustomError::bad_request)?;
    let user = store
        .create_user(NewUser {
            identificador: identificador.to_string(),
            nombre: req.nombre.clone(),
            rol,
            password_hash: hash_password(&req.password)?,
            created_at: now,
        })
        .await
        .map_err(unique_as(DUPLICATE_IDENTIFIER))?;
    info!("registered user {} with role {}", user.identificador, user.rol);
    Ok(user)
}
