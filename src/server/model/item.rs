use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A dish on the menu. Removing a dish only flips `disponible`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct MenuItem {
    pub id: i64,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub precio: Decimal,
    pub categoria_id: Option<i64>,
    pub disponible: bool,
}

/// Body of both create and full-replace requests.
#[derive(Debug, Clone, Deserialize, Validate)]
pub(crate) struct MenuItemRequest {
    #[validate(length(min = 1, message = "Nombre y precio son obligatorios"))]
    pub nombre: String,
    pub descripcion: Option<String>,
    pub precio: Decimal,
    pub categoria_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MenuItemResponse {
    pub mensaje: String,
    pub platillo: MenuItem,
}
