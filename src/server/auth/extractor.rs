use std::future::{ready, Ready};
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use log::error;
use crate::server::auth::token::bearer;
use crate::server::controller::error::CustomError;
use crate::server::model::user::Role;
use crate::server::state::AppState;

/// Staff member behind the bearer token of the current request.
///
/// Taking it as a handler argument is what makes an endpoint private.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AuthenticatedUser {
    pub id: i64,
    pub identificador: String,
    pub rol: Role,
}

impl AuthenticatedUser {
    /// 403 unless the caller holds one of `allowed`
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), CustomError> {
        if allowed.contains(&self.rol) {
            Ok(())
        } else {
            Err(CustomError::forbidden("No tienes permisos para esta acción"))
        }
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, CustomError> {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        error!("app state is not registered");
        return Err(CustomError::ServerIsBusy);
    };
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer)
        .ok_or_else(|| CustomError::unauthorized("Token no proporcionado"))?;
    let claims = state.tokens().validate(token)?;
    Ok(AuthenticatedUser {
        id: claims.sub,
        identificador: claims.identificador,
        rol: claims.rol,
    })
}

impl FromRequest for AuthenticatedUser {
    type Error = CustomError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
