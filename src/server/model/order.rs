use std::str::FromStr;
use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lifecycle of a kitchen ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum OrderStatus {
    #[display("pendiente")]
    Pendiente,
    #[display("en_preparacion")]
    EnPreparacion,
    #[display("listo")]
    Listo,
    #[display("entregado")]
    Entregado,
    #[display("cancelado")]
    Cancelado,
}

impl OrderStatus {
    /// States that still show up on the kitchen screen of a table.
    pub const OPEN: [OrderStatus; 2] = [OrderStatus::Pendiente, OrderStatus::EnPreparacion];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pendiente => "pendiente",
            OrderStatus::EnPreparacion => "en_preparacion",
            OrderStatus::Listo => "listo",
            OrderStatus::Entregado => "entregado",
            OrderStatus::Cancelado => "cancelado",
        }
    }

    /// Targets reachable from this state in a single step.
    pub fn allowed_targets(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pendiente => &[OrderStatus::EnPreparacion, OrderStatus::Cancelado],
            OrderStatus::EnPreparacion => &[OrderStatus::Listo, OrderStatus::Cancelado],
            OrderStatus::Listo => &[OrderStatus::Entregado, OrderStatus::Cancelado],
            OrderStatus::Entregado | OrderStatus::Cancelado => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(Self::Pendiente),
            "en_preparacion" => Ok(Self::EnPreparacion),
            "listo" => Ok(Self::Listo),
            "entregado" => Ok(Self::Entregado),
            "cancelado" => Ok(Self::Cancelado),
            s => Err(format!("Estado de pedido inválido: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Order {
    pub id: i64,
    pub mesa_id: i64,
    pub mesero_id: Option<i64>,
    pub estado: OrderStatus,
    pub fecha_pedido: DateTime<Utc>,
    pub fecha_listo: Option<DateTime<Utc>>,
    pub fecha_entregado: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub detalle_pedido: Vec<LineItem>,
}

impl Order {
    pub fn subtotal(&self) -> Decimal {
        self.detalle_pedido.iter().map(|line| line.subtotal).sum()
    }
}

/// One ordered dish, with the menu price captured when the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LineItem {
    pub id: i64,
    pub pedido_id: i64,
    pub item_menu_id: i64,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
    pub subtotal: Decimal,
    pub notas_item: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CreateOrderRequest {
    pub mesa_id: i64,
    pub mesero_id: Option<i64>,
    #[validate(length(min = 1, message = "El pedido necesita al menos un platillo"), nested)]
    pub platillos: Vec<OrderLineRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct OrderLineRequest {
    pub item_menu_id: i64,
    #[validate(range(min = 1, message = "La cantidad debe ser mayor a cero"))]
    pub cantidad: i32,
    pub notas_item: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateOrderStatusRequest {
    pub estado: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListOrdersParams {
    pub incluir_cancelados: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct OrderResponse {
    pub mensaje: String,
    pub pedido: Order,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TableOrdersResponse {
    pub mesa: i32,
    pub pedidos: Vec<Order>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TableReadyResponse {
    pub mensaje: String,
    pub mesa: i32,
    pub pedidos_actualizados: usize,
    pub pedidos: Vec<Order>,
}

/// Order header and priced lines ready to be written in one unit.
#[derive(Debug, Clone)]
pub(crate) struct NewOrder {
    pub mesa_id: i64,
    pub mesero_id: Option<i64>,
    pub fecha_pedido: DateTime<Utc>,
    pub lines: Vec<NewLineItem>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewLineItem {
    pub item_menu_id: i64,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
    pub notas_item: Option<String>,
}

impl NewLineItem {
    pub fn subtotal(&self) -> Decimal {
        Decimal::from(self.cantidad) * self.precio_unitario
    }
}
