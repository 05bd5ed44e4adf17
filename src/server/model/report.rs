use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct ReportParams {
    /// `YYYY-MM-DD` or `YYYY-MM-DD,YYYY-MM-DD`
    pub fecha: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DailyReport {
    pub fecha: String,
    pub total_pedidos: i64,
    pub monto_total_vendido: Decimal,
    pub promedio_por_pedido: Decimal,
    pub total_cancelados: i64,
}
