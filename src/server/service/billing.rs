use chrono::{DateTime, Utc};
use log::info;
use rust_decimal::{Decimal, RoundingStrategy};
use crate::server::controller::error::{unique_as, CustomError};
use crate::server::database::store::Store;
use crate::server::model::bill::{Bill, BillPatch, BillStatus, CreateBillRequest, NewBill, TipSpec, UpdateBillRequest};
use crate::server::model::order::{Order, OrderStatus};

/// Largest amount a `NUMERIC(12,2)` money column holds.
pub(crate) const MAX_MONEY: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

const TIP_OUT_OF_RANGE: &str = "Propina fuera de rango";

fn out_of_range() -> CustomError {
    CustomError::bad_request(TIP_OUT_OF_RANGE)
}

/// Round a money amount to cents, halves away from zero.
pub(crate) fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Tip owed on `subtotal`: the flat amount, or `valor` percent of the subtotal.
pub(crate) fn compute_tip(subtotal: Decimal, tip: &TipSpec) -> Result<Decimal, CustomError> {
    if tip.valor.is_sign_negative() && !tip.valor.is_zero() {
        return Err(CustomError::bad_request("La propina no puede ser negativa"));
    }
    if tip.valor > MAX_MONEY {
        return Err(out_of_range());
    }
    let propina = match tip.es_porcentaje {
        true => subtotal
            .checked_mul(tip.valor)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(out_of_range)?,
        false => tip.valor,
    };
    let propina = round_money(propina);
    match propina > MAX_MONEY {
        true => Err(out_of_range()),
        false => Ok(propina),
    }
}

/// Subtotal, tip and total of one bill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BillAmounts {
    pub subtotal: Decimal,
    pub propina: Decimal,
    pub total: Decimal,
}

impl BillAmounts {
    /// Fails when the total does not fit a money column.
    pub fn new(subtotal: Decimal, propina: Decimal) -> Result<Self, CustomError> {
        let total = subtotal
            .checked_add(propina)
            .filter(|total| *total <= MAX_MONEY)
            .ok_or_else(out_of_range)?;
        Ok(Self { subtotal, propina, total })
    }

    /// Sum line subtotals and apply `tip` to the result.
    pub fn from_lines(line_subtotals: &[Decimal], tip: &TipSpec) -> Result<Self, CustomError> {
        let subtotal = line_subtotals
            .iter()
            .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(*s))
            .ok_or_else(out_of_range)?;
        Self::new(subtotal, compute_tip(subtotal, tip)?)
    }
}

/// Spread one tip over several bills in proportion to their subtotals.
///
/// Every share is a whole number of cents, none is negative and the shares add up
/// to `tip` exactly. Leftover cents go to the largest fractional remainders.
pub(crate) fn split_tip(tip: Decimal, subtotals: &[Decimal]) -> Result<Vec<Decimal>, CustomError> {
    if subtotals.is_empty() {
        return Ok(vec![]);
    }
    let combined = subtotals
        .iter()
        .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(*s))
        .ok_or_else(out_of_range)?;
    if combined.is_zero() {
        let mut shares = vec![Decimal::ZERO; subtotals.len()];
        shares[0] = tip;
        return Ok(shares);
    }

    let exact = subtotals
        .iter()
        .map(|s| tip.checked_mul(*s).and_then(|v| v.checked_div(combined)))
        .collect::<Option<Vec<Decimal>>>()
        .ok_or_else(out_of_range)?;
    let mut shares: Vec<Decimal> = exact
        .iter()
        .map(|e| e.round_dp_with_strategy(2, RoundingStrategy::ToZero))
        .collect();

    let cent = Decimal::new(1, 2);
    let mut leftover = tip - shares.iter().sum::<Decimal>();
    let mut by_remainder: Vec<usize> = (0..shares.len()).collect();
    by_remainder.sort_by(|&a, &b| (exact[b] - shares[b]).cmp(&(exact[a] - shares[a])).then(a.cmp(&b)));
    for idx in by_remainder.into_iter().cycle() {
        if leftover < cent {
            break;
        }
        shares[idx] += cent;
        leftover -= cent;
    }
    Ok(shares)
}

/// Close delivered orders of one table into bills, one per order.
pub(crate) async fn create_bills(
    store: &dyn Store,
    req: &CreateBillRequest,
    now: DateTime<Utc>,
) -> Result<Vec<Bill>, CustomError> {
    let ids = req.order_ids();
    if ids.is_empty() {
        return Err(CustomError::bad_request("pedido_id es obligatorio"));
    }

    let mut orders = Vec::with_capacity(ids.len());
    for id in &ids {
        let order = store
            .find_order(*id)
            .await?
            .ok_or_else(|| CustomError::not_found(format!("Pedido {id} no encontrado")))?;
        if order.estado != OrderStatus::Entregado {
            return Err(CustomError::bad_request(format!(
                "El pedido {} está '{}', solo se cobran pedidos entregados",
                order.id, order.estado
            )));
        }
        if orders.first().is_some_and(|first: &Order| first.mesa_id != order.mesa_id) {
            return Err(CustomError::bad_request("Los pedidos deben ser de la misma mesa"));
        }
        orders.push(order);
    }

    let subtotals: Vec<Decimal> = orders.iter().map(|o| o.subtotal()).collect();
    let tip = req.propina.unwrap_or(TipSpec::flat(Decimal::ZERO));
    let combined = BillAmounts::from_lines(&subtotals, &tip)?;
    let shares = split_tip(combined.propina, &subtotals)?;

    let (estado, fecha_pago) = match req.pagar {
        true => (BillStatus::Pagada, Some(now)),
        false => (BillStatus::Pendiente, None),
    };
    let bills = orders
        .iter()
        .zip(subtotals.iter().zip(shares))
        .map(|(order, (subtotal, propina))| {
            let amounts = BillAmounts::new(*subtotal, propina)?;
            Ok(NewBill {
                pedido_id: order.id,
                mesa_id: order.mesa_id,
                mesero_id: order.mesero_id,
                subtotal: amounts.subtotal,
                propina: amounts.propina,
                total: amounts.total,
                metodo_pago: req.metodo_pago,
                estado,
                fecha_pago,
                created_at: now,
            })
        })
        .collect::<Result<Vec<NewBill>, CustomError>>()?;

    let created = store
        .create_bills(bills)
        .await
        .map_err(unique_as("Ya existe una cuenta para este pedido"))?;
    info!("created {} bills for orders {:?}, total={}", created.len(), ids, combined.total);
    Ok(created)
}

/// Change tip, payment method or state of a bill; a new tip recomputes the total.
pub(crate) async fn update_bill(
    store: &dyn Store,
    id: i64,
    req: &UpdateBillRequest,
    now: DateTime<Utc>,
) -> Result<Bill, CustomError> {
    if req.is_empty() {
        return Err(CustomError::bad_request("No hay datos para actualizar"));
    }
    let bill = store
        .find_bill(id)
        .await?
        .ok_or_else(|| CustomError::not_found("Cuenta no encontrada"))?;

    let mut patch = BillPatch {
        metodo_pago: req.metodo_pago,
        estado: req.estado,
        ..Default::default()
    };
    if let Some(propina) = req.propina {
        let amounts = BillAmounts::new(bill.subtotal, compute_tip(bill.subtotal, &TipSpec::flat(propina))?)?;
        patch.propina = Some(amounts.propina);
        patch.total = Some(amounts.total);
    }
    if req.estado == Some(BillStatus::Pagada) {
        patch.fecha_pago = Some(now);
    }

    store
        .update_bill(id, patch)
        .await
        .map_err(unique_as("Ya existe una cuenta activa para este pedido"))?
        .ok_or_else(|| CustomError::not_found("Cuenta no encontrada"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::server::database::memory::MemoryStore;
    use crate::server::model::order::{NewLineItem, NewOrder};

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(ts, 0).unwrap()
    }

    #[test]
    fn ten_percent_tip() {
        let amounts = BillAmounts::from_lines(&[dec!(2) * dec!(10.00), dec!(5.00)], &TipSpec::percentage(dec!(10))).unwrap();
        assert_eq!(amounts.subtotal, dec!(25.00));
        assert_eq!(amounts.propina, dec!(2.50));
        assert_eq!(amounts.total, dec!(27.50));
    }

    #[test]
    fn flat_tip_is_taken_as_is() {
        let amounts = BillAmounts::from_lines(&[dec!(25.00)], &TipSpec::flat(dec!(3))).unwrap();
        assert_eq!(amounts.propina, dec!(3));
        assert_eq!(amounts.total, amounts.subtotal + amounts.propina);
    }

    #[test]
    fn percentage_rounds_to_cents() {
        assert_eq!(compute_tip(dec!(33.33), &TipSpec::percentage(dec!(15))).unwrap(), dec!(5.00));
        assert_eq!(compute_tip(dec!(10.05), &TipSpec::percentage(dec!(10))).unwrap(), dec!(1.01));
    }

    #[test]
    fn negative_tip_rejected() {
        assert!(compute_tip(dec!(10), &TipSpec::flat(dec!(-1))).is_err());
    }

    #[test]
    fn oversized_tip_is_rejected() {
        assert_eq!(MAX_MONEY, dec!(9999999999.99));
        for tip in [TipSpec::percentage(Decimal::MAX), TipSpec::flat(Decimal::MAX), TipSpec::percentage(dec!(1000000000000000000000000000))] {
            let err = compute_tip(dec!(25), &tip).unwrap_err();
            assert_eq!(err.to_string(), "Propina fuera de rango");
        }
        let err = compute_tip(dec!(9999999999), &TipSpec::percentage(dec!(200))).unwrap_err();
        assert_eq!(err.to_string(), "Propina fuera de rango");
        assert!(BillAmounts::new(MAX_MONEY, dec!(0.01)).is_err());
        assert!(BillAmounts::from_lines(&[Decimal::MAX, Decimal::MAX], &TipSpec::flat(Decimal::ZERO)).is_err());
        assert!(split_tip(MAX_MONEY, &[Decimal::MAX, Decimal::ONE]).is_err());
    }

    #[test]
    fn split_is_pro_rata_and_exact() {
        assert_eq!(split_tip(dec!(9.00), &[dec!(60), dec!(30)]).unwrap(), vec![dec!(6.00), dec!(3.00)]);

        let shares = split_tip(dec!(0.10), &[dec!(1), dec!(1), dec!(1)]).unwrap();
        assert_eq!(shares.iter().sum::<Decimal>(), dec!(0.10));
        assert_eq!(shares, vec![dec!(0.04), dec!(0.03), dec!(0.03)]);

        let shares = split_tip(dec!(0.01), &[dec!(1), dec!(1), dec!(0)]).unwrap();
        assert!(shares.iter().all(|s| !s.is_sign_negative()));
        assert_eq!(shares.iter().sum::<Decimal>(), dec!(0.01));
    }

    #[test]
    fn split_without_subtotals() {
        assert_eq!(split_tip(dec!(5), &[dec!(0), dec!(0)]).unwrap(), vec![dec!(5), dec!(0)]);
        assert!(split_tip(dec!(5), &[]).unwrap().is_empty());
    }

    async fn delivered_order(store: &MemoryStore, mesa_id: i64, lines: &[(i32, Decimal)]) -> Order {
        let order = store
            .create_order(NewOrder {
                mesa_id,
                mesero_id: Some(7),
                fecha_pedido: at(0),
                lines: lines
                    .iter()
                    .map(|(cantidad, precio)| NewLineItem {
                        item_menu_id: 1,
                        cantidad: *cantidad,
                        precio_unitario: *precio,
                        notas_item: None,
                    })
                    .collect(),
            })
            .await
            .unwrap();
        let path = [OrderStatus::Pendiente, OrderStatus::EnPreparacion, OrderStatus::Listo, OrderStatus::Entregado];
        for step in path.windows(2) {
            store.transition_order(order.id, step[0], step[1], at(10)).await.unwrap().unwrap();
        }
        store.find_order(order.id).await.unwrap().unwrap()
    }

    fn request(ids: Vec<i64>, tip: Option<TipSpec>) -> CreateBillRequest {
        CreateBillRequest {
            pedido_id: None,
            pedido_ids: ids,
            propina: tip,
            metodo_pago: None,
            pagar: false,
        }
    }

    #[tokio::test]
    async fn bills_a_delivered_order() {
        let store = MemoryStore::new();
        let order = delivered_order(&store, 1, &[(2, dec!(10.00)), (1, dec!(5.00))]).await;

        let bills = create_bills(&store, &request(vec![order.id], Some(TipSpec::percentage(dec!(10)))), at(20))
            .await
            .unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].subtotal, dec!(25.00));
        assert_eq!(bills[0].propina, dec!(2.50));
        assert_eq!(bills[0].total, dec!(27.50));
        assert_eq!(bills[0].estado, BillStatus::Pendiente);
        assert_eq!(bills[0].mesero_id, Some(7));
        assert!(bills[0].fecha_pago.is_none());
    }

    #[tokio::test]
    async fn refuses_undelivered_and_duplicate() {
        let store = MemoryStore::new();
        let open = store
            .create_order(NewOrder { mesa_id: 1, mesero_id: None, fecha_pedido: at(0), lines: vec![] })
            .await
            .unwrap();
        let err = create_bills(&store, &request(vec![open.id], None), at(1)).await.unwrap_err();
        assert!(matches!(err, CustomError::BadRequest { .. }));

        let order = delivered_order(&store, 1, &[(1, dec!(8))]).await;
        create_bills(&store, &request(vec![order.id], None), at(1)).await.unwrap();
        let err = create_bills(&store, &request(vec![order.id], None), at(2)).await.unwrap_err();
        assert_eq!(err.to_string(), "Ya existe una cuenta para este pedido");

        let err = create_bills(&store, &request(vec![9999], None), at(2)).await.unwrap_err();
        assert!(matches!(err, CustomError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn closes_a_table_at_once() {
        let store = MemoryStore::new();
        let a = delivered_order(&store, 3, &[(1, dec!(60))]).await;
        let b = delivered_order(&store, 3, &[(1, dec!(30))]).await;
        let other_table = delivered_order(&store, 4, &[(1, dec!(30))]).await;

        let err = create_bills(&store, &request(vec![a.id, other_table.id], None), at(5)).await.unwrap_err();
        assert!(matches!(err, CustomError::BadRequest { .. }));

        let mut req = request(vec![a.id, b.id], Some(TipSpec::percentage(dec!(10))));
        req.pagar = true;
        let bills = create_bills(&store, &req, at(5)).await.unwrap();
        assert_eq!(bills.iter().map(|b| b.propina).collect::<Vec<_>>(), vec![dec!(6.00), dec!(3.00)]);
        assert_eq!(bills.iter().map(|b| b.total).sum::<Decimal>(), dec!(99.00));
        assert!(bills.iter().all(|b| b.estado == BillStatus::Pagada && b.fecha_pago == Some(at(5))));
    }

    #[tokio::test]
    async fn update_recomputes_total_and_stamps_payment() {
        let store = MemoryStore::new();
        let order = delivered_order(&store, 1, &[(1, dec!(40))]).await;
        let bill = create_bills(&store, &request(vec![order.id], None), at(1)).await.unwrap().remove(0);

        let updated = update_bill(
            &store,
            bill.id,
            &UpdateBillRequest { propina: Some(dec!(4)), estado: Some(BillStatus::Pagada), ..Default::default() },
            at(99),
        )
        .await
        .unwrap();
        assert_eq!(updated.total, dec!(44));
        assert_eq!(updated.fecha_pago, Some(at(99)));

        let err = update_bill(&store, bill.id, &UpdateBillRequest::default(), at(100)).await.unwrap_err();
        assert!(matches!(err, CustomError::BadRequest { .. }));
        let err = update_bill(&store, 12345, &UpdateBillRequest { propina: Some(dec!(1)), ..Default::default() }, at(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CustomError::ResourceNotFound { .. }));
    }
}
