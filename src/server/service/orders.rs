use chrono::{DateTime, Utc};
use log::{debug, info};
use validator::Validate;
use crate::server::auth::extractor::AuthenticatedUser;
use crate::server::controller::error::CustomError;
use crate::server::database::store::Store;
use crate::server::model::order::{CreateOrderRequest, NewLineItem, NewOrder, Order, OrderStatus};
use crate::server::model::table::Table;
use crate::server::model::user::Role;

/// Open a kitchen ticket, pricing every line at the current menu price.
pub(crate) async fn create_order(
    store: &dyn Store,
    user: &AuthenticatedUser,
    req: &CreateOrderRequest,
    now: DateTime<Utc>,
) -> Result<Order, CustomError> {
    req.validate()?;
    match store.find_table(req.mesa_id).await? {
        Some(table) if table.activa => {}
        _ => return Err(CustomError::bad_request(format!("La mesa {} no existe o no está activa", req.mesa_id))),
    }

    let mut ids: Vec<i64> = req.platillos.iter().map(|p| p.item_menu_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let items = store.find_items(&ids).await?;

    let mut lines = Vec::with_capacity(req.platillos.len());
    for platillo in &req.platillos {
        let item = items
            .iter()
            .find(|item| item.id == platillo.item_menu_id && item.disponible)
            .ok_or_else(|| {
                CustomError::bad_request(format!(
                    "El platillo {} no existe o no está disponible",
                    platillo.item_menu_id
                ))
            })?;
        lines.push(NewLineItem {
            item_menu_id: item.id,
            cantidad: platillo.cantidad,
            precio_unitario: item.precio,
            notas_item: platillo.notas_item.clone(),
        });
    }

    let mesero_id = req
        .mesero_id
        .or_else(|| (user.rol == Role::Mesero).then_some(user.id));
    let order = store
        .create_order(NewOrder {
            mesa_id: req.mesa_id,
            mesero_id,
            fecha_pedido: now,
            lines,
        })
        .await?;
    info!("order {} opened on table {} by {}", order.id, order.mesa_id, user.identificador);
    Ok(order)
}

/// Move an order one step through its lifecycle.
///
/// The write only lands if the order is still in the state it was read in; losing
/// that race reports the transition from whatever state won.
pub(crate) async fn advance(
    store: &dyn Store,
    id: i64,
    target: &str,
    now: DateTime<Utc>,
) -> Result<Order, CustomError> {
    let order = store
        .find_order(id)
        .await?
        .ok_or_else(|| CustomError::not_found("Pedido no encontrado"))?;
    let invalid = |from: OrderStatus| CustomError::InvalidTransition {
        from: from.to_string(),
        to: target.to_string(),
    };
    let Ok(target_state) = target.parse::<OrderStatus>() else {
        return Err(invalid(order.estado));
    };
    if !order.estado.can_transition_to(target_state) {
        return Err(invalid(order.estado));
    }

    match store.transition_order(id, order.estado, target_state, now).await? {
        Some(updated) => {
            debug!("order {} {} -> {}", id, order.estado, target_state);
            Ok(updated)
        }
        None => {
            let current = store
                .find_order(id)
                .await?
                .ok_or_else(|| CustomError::not_found("Pedido no encontrado"))?;
            Err(invalid(current.estado))
        }
    }
}

pub(crate) async fn find_order(store: &dyn Store, id: i64) -> Result<Order, CustomError> {
    store
        .find_order(id)
        .await?
        .ok_or_else(|| CustomError::not_found("Pedido no encontrado"))
}

async fn active_table(store: &dyn Store, numero: i32) -> Result<Table, CustomError> {
    store
        .find_active_table_by_number(numero)
        .await?
        .ok_or_else(|| CustomError::not_found(format!("La mesa {numero} no existe o no está activa")))
}

/// Open orders of the table with the given number, oldest first.
pub(crate) async fn table_orders(store: &dyn Store, numero: i32) -> Result<(Table, Vec<Order>), CustomError> {
    let table = active_table(store, numero).await?;
    let orders = store.open_orders_for_table(table.id).await?;
    Ok((table, orders))
}

/// Kitchen shortcut: every open order of a table becomes `listo`.
///
/// Orders still `pendiente` pass through `en_preparacion` first. An order that
/// changes state underneath is left alone.
pub(crate) async fn mark_table_ready(
    store: &dyn Store,
    numero: i32,
    estado: &str,
    now: DateTime<Utc>,
) -> Result<(Table, Vec<Order>), CustomError> {
    if estado != OrderStatus::Listo.as_str() {
        return Err(CustomError::bad_request("Estado inválido. Solo se permite: listo"));
    }
    let (table, open) = table_orders(store, numero).await?;

    let mut updated = Vec::with_capacity(open.len());
    for order in open {
        let path: &[OrderStatus] = match order.estado {
            OrderStatus::Pendiente => &[OrderStatus::Pendiente, OrderStatus::EnPreparacion, OrderStatus::Listo],
            _ => &[OrderStatus::EnPreparacion, OrderStatus::Listo],
        };
        let mut current = None;
        for step in path.windows(2) {
            current = store.transition_order(order.id, step[0], step[1], now).await?;
            if current.is_none() {
                break;
            }
        }
        match current {
            Some(ready) => updated.push(ready),
            None => debug!("order {} changed while marking table {} ready", order.id, numero),
        }
    }
    info!("table {} marked ready, {} orders updated", numero, updated.len());
    Ok((table, updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use crate::server::database::memory::MemoryStore;
    use crate::server::database::store::{PaidBillsSummary, StoreError};
    use crate::server::model::bill::{Bill, BillPatch, NewBill};
    use crate::server::model::category::{Category, UpdateCategoryRequest};
    use crate::server::model::item::{MenuItem, MenuItemRequest};
    use crate::server::model::order::{LineItem, OrderLineRequest};
    use crate::server::model::table::{TableState, UpdateTableRequest};
    use crate::server::model::user::{NewUser, User, UserPatch};

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(ts, 0).unwrap()
    }

    fn waiter() -> AuthenticatedUser {
        AuthenticatedUser {
            id: 5,
            identificador: "mesero1".to_string(),
            rol: Role::Mesero,
        }
    }

    /// Store where another client moves a rigged order to `rival` right before
    /// this client's conditional update runs, so that update matches nothing.
    struct ContendedStore {
        inner: MemoryStore,
        rigged: Mutex<HashMap<i64, OrderStatus>>,
    }

    impl ContendedStore {
        fn new(inner: MemoryStore) -> Self {
            Self { inner, rigged: Mutex::new(HashMap::new()) }
        }

        fn rig(&self, id: i64, rival: OrderStatus) {
            self.rigged.lock().unwrap().insert(id, rival);
        }
    }

    #[async_trait]
    impl Store for ContendedStore {
        async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
            self.inner.create_user(user).await
        }
        async fn find_active_user(&self, identificador: &str) -> Result<Option<User>, StoreError> {
            self.inner.find_active_user(identificador).await
        }
        async fn list_users(&self, rol: Option<Role>) -> Result<Vec<User>, StoreError> {
            self.inner.list_users(rol).await
        }
        async fn update_user(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError> {
            self.inner.update_user(id, patch).await
        }
        async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
            self.inner.list_categories().await
        }
        async fn create_category(&self, nombre: String, descripcion: Option<String>) -> Result<Category, StoreError> {
            self.inner.create_category(nombre, descripcion).await
        }
        async fn update_category(&self, id: i64, patch: UpdateCategoryRequest) -> Result<Option<Category>, StoreError> {
            self.inner.update_category(id, patch).await
        }
        async fn list_available_items(&self) -> Result<Vec<MenuItem>, StoreError> {
            self.inner.list_available_items().await
        }
        async fn find_items(&self, ids: &[i64]) -> Result<Vec<MenuItem>, StoreError> {
            self.inner.find_items(ids).await
        }
        async fn create_item(&self, item: MenuItemRequest) -> Result<MenuItem, StoreError> {
            self.inner.create_item(item).await
        }
        async fn update_item(&self, id: i64, item: MenuItemRequest) -> Result<Option<MenuItem>, StoreError> {
            self.inner.update_item(id, item).await
        }
        async fn deactivate_item(&self, id: i64) -> Result<Option<MenuItem>, StoreError> {
            self.inner.deactivate_item(id).await
        }
        async fn list_active_tables(&self) -> Result<Vec<Table>, StoreError> {
            self.inner.list_active_tables().await
        }
        async fn find_table(&self, id: i64) -> Result<Option<Table>, StoreError> {
            self.inner.find_table(id).await
        }
        async fn find_active_table_by_number(&self, numero: i32) -> Result<Option<Table>, StoreError> {
            self.inner.find_active_table_by_number(numero).await
        }
        async fn create_table(&self, numero: i32, capacidad: i32, estado: TableState) -> Result<Table, StoreError> {
            self.inner.create_table(numero, capacidad, estado).await
        }
        async fn update_table(&self, id: i64, patch: UpdateTableRequest) -> Result<Option<Table>, StoreError> {
            self.inner.update_table(id, patch).await
        }
        async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
            self.inner.create_order(order).await
        }
        async fn list_orders(&self, include_cancelled: bool) -> Result<Vec<Order>, StoreError> {
            self.inner.list_orders(include_cancelled).await
        }
        async fn find_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
            self.inner.find_order(id).await
        }
        async fn order_lines(&self, pedido_id: i64) -> Result<Vec<LineItem>, StoreError> {
            self.inner.order_lines(pedido_id).await
        }
        async fn open_orders_for_table(&self, mesa_id: i64) -> Result<Vec<Order>, StoreError> {
            self.inner.open_orders_for_table(mesa_id).await
        }
        async fn transition_order(
            &self,
            id: i64,
            from: OrderStatus,
            to: OrderStatus,
            at: DateTime<Utc>,
        ) -> Result<Option<Order>, StoreError> {
            let rival = self.rigged.lock().unwrap().remove(&id);
            if let Some(rival) = rival {
                let seen = self.inner.find_order(id).await?.map(|o| o.estado).unwrap_or(from);
                self.inner.transition_order(id, seen, rival, at).await?;
            }
            self.inner.transition_order(id, from, to, at).await
        }
        async fn list_bills(&self) -> Result<Vec<Bill>, StoreError> {
            self.inner.list_bills().await
        }
        async fn find_bill(&self, id: i64) -> Result<Option<Bill>, StoreError> {
            self.inner.find_bill(id).await
        }
        async fn bill_for_order(&self, pedido_id: i64) -> Result<Option<Bill>, StoreError> {
            self.inner.bill_for_order(pedido_id).await
        }
        async fn create_bills(&self, bills: Vec<NewBill>) -> Result<Vec<Bill>, StoreError> {
            self.inner.create_bills(bills).await
        }
        async fn update_bill(&self, id: i64, patch: BillPatch) -> Result<Option<Bill>, StoreError> {
            self.inner.update_bill(id, patch).await
        }
        async fn paid_bills_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<PaidBillsSummary, StoreError> {
            self.inner.paid_bills_between(start, end).await
        }
        async fn cancelled_orders_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, StoreError> {
            self.inner.cancelled_orders_between(start, end).await
        }
    }

    async fn seeded() -> (MemoryStore, i64, i64, i64) {
        let store = MemoryStore::new();
        let table = store.create_table(4, 2, TableState::Disponible).await.unwrap();
        let tacos = store
            .create_item(MenuItemRequest {
                nombre: "Tacos".to_string(),
                descripcion: None,
                precio: dec!(10.00),
                categoria_id: None,
            })
            .await
            .unwrap();
        let agua = store
            .create_item(MenuItemRequest {
                nombre: "Agua".to_string(),
                descripcion: None,
                precio: dec!(5.00),
                categoria_id: None,
            })
            .await
            .unwrap();
        (store, table.id, tacos.id, agua.id)
    }

    fn request(mesa_id: i64, lines: &[(i64, i32)]) -> CreateOrderRequest {
        CreateOrderRequest {
            mesa_id,
            mesero_id: None,
            platillos: lines
                .iter()
                .map(|(item_menu_id, cantidad)| OrderLineRequest {
                    item_menu_id: *item_menu_id,
                    cantidad: *cantidad,
                    notas_item: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn snapshots_menu_prices() {
        let (store, mesa, tacos, agua) = seeded().await;
        let order = create_order(&store, &waiter(), &request(mesa, &[(tacos, 2), (agua, 1)]), at(100))
            .await
            .unwrap();
        assert_eq!(order.estado, OrderStatus::Pendiente);
        assert_eq!(order.mesero_id, Some(5));
        assert_eq!(order.fecha_pedido, at(100));
        assert_eq!(order.subtotal(), dec!(25.00));

        store
            .update_item(tacos, MenuItemRequest {
                nombre: "Tacos".to_string(),
                descripcion: None,
                precio: dec!(99),
                categoria_id: None,
            })
            .await
            .unwrap();
        let reread = find_order(&store, order.id).await.unwrap();
        assert_eq!(reread.detalle_pedido[0].precio_unitario, dec!(10.00));
    }

    #[tokio::test]
    async fn rejects_bad_references() {
        let (store, mesa, tacos, _) = seeded().await;
        assert!(create_order(&store, &waiter(), &request(mesa, &[]), at(0)).await.is_err());
        assert!(create_order(&store, &waiter(), &request(mesa, &[(tacos, 0)]), at(0)).await.is_err());
        assert!(create_order(&store, &waiter(), &request(999, &[(tacos, 1)]), at(0)).await.is_err());
        assert!(create_order(&store, &waiter(), &request(mesa, &[(999, 1)]), at(0)).await.is_err());

        store.deactivate_item(tacos).await.unwrap();
        let err = create_order(&store, &waiter(), &request(mesa, &[(tacos, 1)]), at(0)).await.unwrap_err();
        assert!(matches!(err, CustomError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn walks_the_lifecycle() {
        let (store, mesa, tacos, _) = seeded().await;
        let order = create_order(&store, &waiter(), &request(mesa, &[(tacos, 1)]), at(0)).await.unwrap();

        let err = advance(&store, order.id, "listo", at(1)).await.unwrap_err();
        assert_eq!(err.to_string(), "Transición no válida de 'pendiente' a 'listo'");
        let err = advance(&store, order.id, "servido", at(1)).await.unwrap_err();
        assert!(matches!(err, CustomError::InvalidTransition { .. }));

        advance(&store, order.id, "en_preparacion", at(1)).await.unwrap();
        let ready = advance(&store, order.id, "listo", at(2)).await.unwrap();
        assert_eq!(ready.fecha_listo, Some(at(2)));
        let delivered = advance(&store, order.id, "entregado", at(3)).await.unwrap();
        assert_eq!(delivered.fecha_entregado, Some(at(3)));

        let err = advance(&store, order.id, "cancelado", at(4)).await.unwrap_err();
        assert_eq!(err.to_string(), "Transición no válida de 'entregado' a 'cancelado'");
        assert!(matches!(
            advance(&store, 4242, "listo", at(4)).await.unwrap_err(),
            CustomError::ResourceNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn marks_whole_table_ready() {
        let (store, mesa, tacos, _) = seeded().await;
        let fresh = create_order(&store, &waiter(), &request(mesa, &[(tacos, 1)]), at(0)).await.unwrap();
        let cooking = create_order(&store, &waiter(), &request(mesa, &[(tacos, 1)]), at(0)).await.unwrap();
        advance(&store, cooking.id, "en_preparacion", at(1)).await.unwrap();
        let cancelled = create_order(&store, &waiter(), &request(mesa, &[(tacos, 1)]), at(0)).await.unwrap();
        advance(&store, cancelled.id, "cancelado", at(1)).await.unwrap();

        assert!(mark_table_ready(&store, 4, "entregado", at(2)).await.is_err());
        assert!(matches!(
            mark_table_ready(&store, 77, "listo", at(2)).await.unwrap_err(),
            CustomError::ResourceNotFound { .. }
        ));

        let (table, updated) = mark_table_ready(&store, 4, "listo", at(5)).await.unwrap();
        assert_eq!(table.numero, 4);
        let mut ids: Vec<i64> = updated.iter().map(|o| o.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![fresh.id, cooking.id]);
        assert!(updated.iter().all(|o| o.estado == OrderStatus::Listo && o.fecha_listo == Some(at(5))));
        assert_eq!(find_order(&store, cancelled.id).await.unwrap().estado, OrderStatus::Cancelado);
        assert!(table_orders(&store, 4).await.unwrap().1.is_empty());
    }

    #[tokio::test]
    async fn lost_race_reports_the_winning_state() {
        let (store, mesa, tacos, _) = seeded().await;
        let store = ContendedStore::new(store);
        let order = create_order(&store, &waiter(), &request(mesa, &[(tacos, 1)]), at(0)).await.unwrap();

        store.rig(order.id, OrderStatus::Cancelado);
        let err = advance(&store, order.id, "en_preparacion", at(1)).await.unwrap_err();
        assert!(matches!(err, CustomError::InvalidTransition { .. }));
        assert_eq!(err.to_string(), "Transición no válida de 'cancelado' a 'en_preparacion'");
        assert_eq!(find_order(&store, order.id).await.unwrap().estado, OrderStatus::Cancelado);
    }

    #[tokio::test]
    async fn table_ready_skips_orders_changed_underneath() {
        let (store, mesa, tacos, _) = seeded().await;
        let store = ContendedStore::new(store);
        let kept = create_order(&store, &waiter(), &request(mesa, &[(tacos, 1)]), at(0)).await.unwrap();
        let cancelled = create_order(&store, &waiter(), &request(mesa, &[(tacos, 1)]), at(0)).await.unwrap();
        let cooking = create_order(&store, &waiter(), &request(mesa, &[(tacos, 1)]), at(0)).await.unwrap();
        advance(&store, cooking.id, "en_preparacion", at(1)).await.unwrap();

        store.rig(cancelled.id, OrderStatus::Cancelado);
        // the kitchen screen got there first
        store.rig(cooking.id, OrderStatus::Listo);
        let (_, updated) = mark_table_ready(&store, 4, "listo", at(5)).await.unwrap();

        assert_eq!(updated.iter().map(|o| o.id).collect::<Vec<_>>(), vec![kept.id]);
        assert_eq!(find_order(&store, cancelled.id).await.unwrap().estado, OrderStatus::Cancelado);
        assert_eq!(find_order(&store, cooking.id).await.unwrap().estado, OrderStatus::Listo);
    }
}
