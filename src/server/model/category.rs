use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Category {
    pub id: i64,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub orden: i32,
    pub activa: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CreateCategoryRequest {
    #[validate(length(min = 1, message = "El nombre es obligatorio"))]
    pub nombre: String,
    pub descripcion: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct UpdateCategoryRequest {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub orden: Option<i32>,
    pub activa: Option<bool>,
}

impl UpdateCategoryRequest {
    pub fn is_empty(&self) -> bool {
        self.nombre.is_none()
            && self.descripcion.is_none()
            && self.orden.is_none()
            && self.activa.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CategoryResponse {
    pub mensaje: String,
    pub categoria: Category,
}
