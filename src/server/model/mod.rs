use serde::{Deserialize, Serialize};

pub(crate) mod bill;
pub(crate) mod category;
pub(crate) mod config;
pub(crate) mod item;
pub(crate) mod order;
pub(crate) mod report;
pub(crate) mod table;
pub(crate) mod user;

/// Body of every plain acknowledgement and every error response.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MessageResponse {
    pub mensaje: String,
}

impl MessageResponse {
    pub fn new(mensaje: impl Into<String>) -> Self {
        Self {
            mensaje: mensaje.into(),
        }
    }
}
