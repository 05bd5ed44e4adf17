use derive_more::Display;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TableState {
    #[default]
    #[display("disponible")]
    Disponible,
    #[display("ocupada")]
    Ocupada,
    #[display("reservada")]
    Reservada,
}

impl TableState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableState::Disponible => "disponible",
            TableState::Ocupada => "ocupada",
            TableState::Reservada => "reservada",
        }
    }
}

impl std::str::FromStr for TableState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disponible" => Ok(Self::Disponible),
            "ocupada" => Ok(Self::Ocupada),
            "reservada" => Ok(Self::Reservada),
            s => Err(format!("Estado de mesa inválido: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Table {
    pub id: i64,
    pub numero: i32,
    pub capacidad: i32,
    pub estado: TableState,
    pub activa: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CreateTableRequest {
    #[validate(range(min = 1, message = "Número y capacidad son obligatorios"))]
    pub numero: i32,
    #[validate(range(min = 1, message = "Número y capacidad son obligatorios"))]
    pub capacidad: i32,
    pub estado: Option<TableState>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub(crate) struct UpdateTableRequest {
    #[validate(range(min = 1, message = "La capacidad debe ser mayor a cero"))]
    pub capacidad: Option<i32>,
    pub estado: Option<TableState>,
    pub activa: Option<bool>,
}

impl UpdateTableRequest {
    pub fn is_empty(&self) -> bool {
        self.capacidad.is_none() && self.estado.is_none() && self.activa.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TableResponse {
    pub mensaje: String,
    pub mesa: Table,
}
