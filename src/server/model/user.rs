use std::str::FromStr;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) const INVALID_ROLE_MSG: &str = "Rol inválido. Debe ser: administrador, mesero o cocina";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Role {
    #[display("administrador")]
    Administrador,
    #[display("mesero")]
    Mesero,
    #[display("cocina")]
    Cocina,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrador => "administrador",
            Role::Mesero => "mesero",
            Role::Cocina => "cocina",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrador" => Ok(Self::Administrador),
            "mesero" => Ok(Self::Mesero),
            "cocina" => Ok(Self::Cocina),
            _ => Err(INVALID_ROLE_MSG.to_string()),
        }
    }
}

/// Staff account. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct User {
    pub id: i64,
    pub identificador: String,
    pub nombre: String,
    pub rol: Role,
    pub activo: bool,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LoginRequest {
    #[validate(length(min = 1, message = "Identificador y contraseña son obligatorios"))]
    pub identificador: String,
    #[validate(length(min = 1, message = "Identificador y contraseña son obligatorios"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginResponse {
    pub mensaje: String,
    pub usuario: User,
    pub token: String,
}

/// Used by both self registration and admin-created accounts.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RegisterRequest {
    #[validate(length(min = 1, message = "Identificador, password, nombre y rol son obligatorios"))]
    pub identificador: String,
    #[validate(length(min = 1, message = "Identificador, password, nombre y rol son obligatorios"))]
    pub password: String,
    #[validate(length(min = 1, message = "Identificador, password, nombre y rol son obligatorios"))]
    pub nombre: String,
    pub rol: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UpdateUserRequest {
    pub identificador: Option<String>,
    pub password: Option<String>,
    pub nombre: Option<String>,
    pub rol: Option<String>,
    pub activo: Option<bool>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.identificador.is_none()
            && self.password.is_none()
            && self.nombre.is_none()
            && self.rol.is_none()
            && self.activo.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListUsersParams {
    pub rol: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub mensaje: String,
    pub usuario: User,
}

#[derive(Debug, Clone)]
pub(crate) struct NewUser {
    pub identificador: String,
    pub nombre: String,
    pub rol: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct UserPatch {
    pub identificador: Option<String>,
    pub password_hash: Option<String>,
    pub nombre: Option<String>,
    pub rol: Option<Role>,
    pub activo: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}
