use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use crate::server::controller::error::CustomError;
use crate::server::model::user::{Role, User};

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Claims {
    /// user id
    pub sub: i64,
    pub identificador: String,
    pub rol: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks HS256 session tokens.
#[derive(Clone)]
pub(crate) struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, CustomError> {
        let now = Utc::now();
        self.encode(&Claims {
            sub: user.id,
            identificador: user.identificador.clone(),
            rol: user.rol,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        })
    }

    fn encode(&self, claims: &Claims) -> Result<String, CustomError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            error!("failed to sign token, {}", e);
            CustomError::DbError { message: "failed to sign token".to_string() }
        })
    }

    pub fn validate(&self, token: &str) -> Result<Claims, CustomError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("rejected token, {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => CustomError::unauthorized("Token expirado"),
                    _ => CustomError::unauthorized("Token inválido"),
                }
            })
    }
}

/// Pull the token out of an `Authorization: Bearer ...` header value.
pub(crate) fn bearer(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(rol: Role) -> User {
        User {
            id: 42,
            identificador: "cocina1".to_string(),
            nombre: "Luis".to_string(),
            rol,
            activo: true,
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn round_trip() {
        let service = TokenService::new("a-test-secret", Duration::hours(8));
        let token = service.issue(&user(Role::Cocina)).unwrap();
        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.rol, Role::Cocina);
        assert_eq!(claims.exp - claims.iat, 8 * 3600);
    }

    #[test]
    fn rejects_foreign_signature() {
        let token = TokenService::new("one", Duration::hours(1)).issue(&user(Role::Mesero)).unwrap();
        let err = TokenService::new("two", Duration::hours(1)).validate(&token).unwrap_err();
        assert_eq!(err.to_string(), "Token inválido");
    }

    #[test]
    fn rejects_expired() {
        let service = TokenService::new("secret", Duration::hours(1));
        let now = Utc::now().timestamp();
        let token = service
            .encode(&Claims {
                sub: 1,
                identificador: "x".to_string(),
                rol: Role::Administrador,
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert_eq!(service.validate(&token).unwrap_err().to_string(), "Token expirado");
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer("Bearer "), None);
        assert_eq!(bearer("Basic abc"), None);
    }
}
