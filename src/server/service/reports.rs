use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use log::debug;
use rust_decimal::Decimal;
use crate::server::controller::error::CustomError;
use crate::server::database::store::Store;
use crate::server::model::report::DailyReport;
use crate::server::service::billing::round_money;

/// A business day runs from 06:00 UTC to 06:00 UTC the next calendar day.
const BUSINESS_DAY_START_HOUR: u32 = 6;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse `YYYY-MM-DD` or an inclusive `YYYY-MM-DD,YYYY-MM-DD` range.
pub(crate) fn parse_days(fecha: &str) -> Result<(NaiveDate, NaiveDate), CustomError> {
    let malformed = || CustomError::bad_request("Fecha inválida, use YYYY-MM-DD o YYYY-MM-DD,YYYY-MM-DD");
    let mut parts = fecha.split(',').map(str::trim);
    let first = parts.next().ok_or_else(malformed)?;
    let start = NaiveDate::parse_from_str(first, DATE_FORMAT).map_err(|_| malformed())?;
    let end = match parts.next() {
        Some(last) => NaiveDate::parse_from_str(last, DATE_FORMAT).map_err(|_| malformed())?,
        None => start,
    };
    if parts.next().is_some() {
        return Err(malformed());
    }
    if end < start {
        return Err(CustomError::bad_request("La fecha final no puede ser anterior a la inicial"));
    }
    Ok((start, end))
}

/// Half-open UTC window covering the business days `start..=end`.
pub(crate) fn business_window(start: NaiveDate, end: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), CustomError> {
    let opening = NaiveTime::from_hms_opt(BUSINESS_DAY_START_HOUR, 0, 0)
        .ok_or_else(|| CustomError::bad_request("Hora de apertura inválida"))?;
    let after = end
        .checked_add_days(Days::new(1))
        .ok_or_else(|| CustomError::bad_request("Fecha fuera de rango"))?;
    Ok((start.and_time(opening).and_utc(), after.and_time(opening).and_utc()))
}

/// Paid sales and cancellations for one business day or a range of them.
pub(crate) async fn sales_report(store: &dyn Store, fecha: Option<&str>) -> Result<DailyReport, CustomError> {
    let fecha = fecha
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| CustomError::bad_request("La fecha es obligatoria (YYYY-MM-DD)"))?;
    let (start_day, end_day) = parse_days(fecha)?;
    let (start, end) = business_window(start_day, end_day)?;
    debug!("sales report window [{}, {})", start, end);

    let paid = store.paid_bills_between(start, end).await?;
    let cancelled = store.cancelled_orders_between(start, end).await?;
    let average = match paid.count {
        0 => Decimal::ZERO,
        n => round_money(paid.total / Decimal::from(n)),
    };
    Ok(DailyReport {
        fecha: fecha.to_string(),
        total_pedidos: paid.count,
        monto_total_vendido: round_money(paid.total),
        promedio_por_pedido: average,
        total_cancelados: cancelled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::server::database::memory::MemoryStore;
    use crate::server::model::bill::{BillStatus, NewBill};
    use crate::server::model::order::{NewOrder, OrderStatus};

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn window_starts_at_six() {
        let (start, end) = parse_days("2024-03-10").unwrap();
        let (from, to) = business_window(start, end).unwrap();
        assert_eq!(from, utc("2024-03-10T06:00:00Z"));
        assert_eq!(to, utc("2024-03-11T06:00:00Z"));

        let (start, end) = parse_days("2024-03-10, 2024-03-12").unwrap();
        let (_, to) = business_window(start, end).unwrap();
        assert_eq!(to, utc("2024-03-13T06:00:00Z"));
    }

    #[test]
    fn bad_dates() {
        assert!(parse_days("10/03/2024").is_err());
        assert!(parse_days("2024-03-12,2024-03-10").is_err());
        assert!(parse_days("2024-03-10,2024-03-11,2024-03-12").is_err());
    }

    async fn paid_bill(store: &MemoryStore, pedido_id: i64, total: Decimal, paid_at: &str) {
        store
            .create_bills(vec![NewBill {
                pedido_id,
                mesa_id: 1,
                mesero_id: None,
                subtotal: total,
                propina: Decimal::ZERO,
                total,
                metodo_pago: None,
                estado: BillStatus::Pagada,
                fecha_pago: Some(utc(paid_at)),
                created_at: utc(paid_at),
            }])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn daily_totals() {
        let store = MemoryStore::new();
        paid_bill(&store, 1, dec!(60.00), "2024-03-10T13:00:00Z").await;
        paid_bill(&store, 2, dec!(40.00), "2024-03-11T05:59:59Z").await;
        // belongs to the next business day
        paid_bill(&store, 3, dec!(500.00), "2024-03-11T06:00:00Z").await;

        let order = store
            .create_order(NewOrder { mesa_id: 1, mesero_id: None, fecha_pedido: utc("2024-03-10T20:00:00Z"), lines: vec![] })
            .await
            .unwrap();
        store
            .transition_order(order.id, OrderStatus::Pendiente, OrderStatus::Cancelado, utc("2024-03-10T20:05:00Z"))
            .await
            .unwrap();

        let report = sales_report(&store, Some("2024-03-10")).await.unwrap();
        assert_eq!(
            report,
            DailyReport {
                fecha: "2024-03-10".to_string(),
                total_pedidos: 2,
                monto_total_vendido: dec!(100.00),
                promedio_por_pedido: dec!(50.00),
                total_cancelados: 1,
            }
        );

        let empty = sales_report(&store, Some("2023-01-01")).await.unwrap();
        assert_eq!(empty.total_pedidos, 0);
        assert_eq!(empty.promedio_por_pedido, Decimal::ZERO);

        assert!(matches!(sales_report(&store, None).await.unwrap_err(), CustomError::BadRequest { .. }));
    }
}
