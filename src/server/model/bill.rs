use std::str::FromStr;
use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum BillStatus {
    #[default]
    #[display("pendiente")]
    Pendiente,
    #[display("pagada")]
    Pagada,
    #[display("cancelada")]
    Cancelada,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Pendiente => "pendiente",
            BillStatus::Pagada => "pagada",
            BillStatus::Cancelada => "cancelada",
        }
    }
}

impl FromStr for BillStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(Self::Pendiente),
            "pagada" => Ok(Self::Pagada),
            "cancelada" => Ok(Self::Cancelada),
            s => Err(format!("Estado de cuenta inválido: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PaymentMethod {
    #[display("efectivo")]
    Efectivo,
    #[display("tarjeta")]
    Tarjeta,
    #[display("transferencia")]
    Transferencia,
    #[display("mixto")]
    Mixto,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Efectivo => "efectivo",
            PaymentMethod::Tarjeta => "tarjeta",
            PaymentMethod::Transferencia => "transferencia",
            PaymentMethod::Mixto => "mixto",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "efectivo" => Ok(Self::Efectivo),
            "tarjeta" => Ok(Self::Tarjeta),
            "transferencia" => Ok(Self::Transferencia),
            "mixto" => Ok(Self::Mixto),
            s => Err(format!("Método de pago inválido: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Bill {
    pub id: i64,
    pub pedido_id: i64,
    pub mesa_id: i64,
    pub mesero_id: Option<i64>,
    pub subtotal: Decimal,
    pub propina: Decimal,
    pub total: Decimal,
    pub metodo_pago: Option<PaymentMethod>,
    pub estado: BillStatus,
    pub fecha_pago: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// How the tip was given at the till: a flat amount or a percentage of the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub(crate) struct TipSpec {
    pub valor: Decimal,
    #[serde(default)]
    pub es_porcentaje: bool,
}

impl TipSpec {
    pub fn flat(valor: Decimal) -> Self {
        Self { valor, es_porcentaje: false }
    }

    pub fn percentage(valor: Decimal) -> Self {
        Self { valor, es_porcentaje: true }
    }
}

/// Close one order, or several orders of the same table at once.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateBillRequest {
    pub pedido_id: Option<i64>,
    #[serde(default)]
    pub pedido_ids: Vec<i64>,
    pub propina: Option<TipSpec>,
    pub metodo_pago: Option<PaymentMethod>,
    /// settle immediately instead of leaving the bill `pendiente`
    #[serde(default)]
    pub pagar: bool,
}

impl CreateBillRequest {
    /// Requested orders, deduplicated, in the order they were given.
    pub fn order_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::with_capacity(self.pedido_ids.len() + 1);
        for id in self.pedido_id.iter().chain(self.pedido_ids.iter()) {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UpdateBillRequest {
    pub propina: Option<Decimal>,
    pub metodo_pago: Option<PaymentMethod>,
    pub estado: Option<BillStatus>,
}

impl UpdateBillRequest {
    pub fn is_empty(&self) -> bool {
        self.propina.is_none() && self.metodo_pago.is_none() && self.estado.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BillResponse {
    pub mensaje: String,
    pub cuenta: Bill,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CreateBillResponse {
    pub mensaje: String,
    pub cuentas: Vec<Bill>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewBill {
    pub pedido_id: i64,
    pub mesa_id: i64,
    pub mesero_id: Option<i64>,
    pub subtotal: Decimal,
    pub propina: Decimal,
    pub total: Decimal,
    pub metodo_pago: Option<PaymentMethod>,
    pub estado: BillStatus,
    pub fecha_pago: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Column updates for an existing bill; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub(crate) struct BillPatch {
    pub propina: Option<Decimal>,
    pub total: Option<Decimal>,
    pub metodo_pago: Option<PaymentMethod>,
    pub estado: Option<BillStatus>,
    pub fecha_pago: Option<DateTime<Utc>>,
}
