use std::sync::{Mutex, MutexGuard};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::server::database::store::{PaidBillsSummary, Store, StoreError};
use crate::server::model::bill::{Bill, BillPatch, BillStatus, NewBill};
use crate::server::model::category::{Category, UpdateCategoryRequest};
use crate::server::model::item::{MenuItem, MenuItemRequest};
use crate::server::model::order::{LineItem, NewOrder, Order, OrderStatus};
use crate::server::model::table::{Table, TableState, UpdateTableRequest};
use crate::server::model::user::{NewUser, Role, User, UserPatch};

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: Vec<User>,
    categories: Vec<Category>,
    items: Vec<MenuItem>,
    tables: Vec<Table>,
    orders: Vec<Order>,
    bills: Vec<Bill>,
}

impl Tables {
    /// ids are unique across all tables, which is all callers rely on
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Process-local [`Store`]; every operation runs under one lock.
#[derive(Default)]
pub(crate) struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn unique(message: &str) -> StoreError {
    StoreError::UniqueViolation {
        message: message.to_string(),
    }
}

fn is_live(bill: &Bill) -> bool {
    bill.estado != BillStatus::Cancelada
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut t = self.tables();
        if t.users.iter().any(|u| u.identificador == user.identificador) {
            return Err(unique("usuarios_identificador_key"));
        }
        let user = User {
            id: t.next_id(),
            identificador: user.identificador,
            nombre: user.nombre,
            rol: user.rol,
            activo: true,
            password_hash: user.password_hash,
            created_at: user.created_at,
            updated_at: None,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_active_user(&self, identificador: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|u| u.activo && u.identificador == identificador)
            .cloned())
    }

    async fn list_users(&self, rol: Option<Role>) -> Result<Vec<User>, StoreError> {
        Ok(self
            .tables()
            .users
            .iter()
            .filter(|u| rol.map_or(true, |r| u.rol == r))
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut t = self.tables();
        if let Some(identificador) = &patch.identificador {
            if t.users.iter().any(|u| u.id != id && &u.identificador == identificador) {
                return Err(unique("usuarios_identificador_key"));
            }
        }
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(identificador) = patch.identificador {
            user.identificador = identificador;
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(nombre) = patch.nombre {
            user.nombre = nombre;
        }
        if let Some(rol) = patch.rol {
            user.rol = rol;
        }
        if let Some(activo) = patch.activo {
            user.activo = activo;
        }
        if patch.updated_at.is_some() {
            user.updated_at = patch.updated_at;
        }
        Ok(Some(user.clone()))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut categories = self.tables().categories.clone();
        categories.sort_by_key(|c| (c.orden, c.id));
        Ok(categories)
    }

    async fn create_category(&self, nombre: String, descripcion: Option<String>) -> Result<Category, StoreError> {
        let mut t = self.tables();
        if t.categories.iter().any(|c| c.nombre == nombre) {
            return Err(unique("categorias_menu_nombre_key"));
        }
        let category = Category {
            id: t.next_id(),
            nombre,
            descripcion,
            orden: 0,
            activa: true,
        };
        t.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, patch: UpdateCategoryRequest) -> Result<Option<Category>, StoreError> {
        let mut t = self.tables();
        if let Some(nombre) = &patch.nombre {
            if t.categories.iter().any(|c| c.id != id && &c.nombre == nombre) {
                return Err(unique("categorias_menu_nombre_key"));
            }
        }
        let Some(category) = t.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(nombre) = patch.nombre {
            category.nombre = nombre;
        }
        if patch.descripcion.is_some() {
            category.descripcion = patch.descripcion;
        }
        if let Some(orden) = patch.orden {
            category.orden = orden;
        }
        if let Some(activa) = patch.activa {
            category.activa = activa;
        }
        Ok(Some(category.clone()))
    }

    async fn list_available_items(&self) -> Result<Vec<MenuItem>, StoreError> {
        Ok(self.tables().items.iter().filter(|i| i.disponible).cloned().collect())
    }

    async fn find_items(&self, ids: &[i64]) -> Result<Vec<MenuItem>, StoreError> {
        Ok(self
            .tables()
            .items
            .iter()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect())
    }

    async fn create_item(&self, item: MenuItemRequest) -> Result<MenuItem, StoreError> {
        let mut t = self.tables();
        let item = MenuItem {
            id: t.next_id(),
            nombre: item.nombre,
            descripcion: item.descripcion,
            precio: item.precio,
            categoria_id: item.categoria_id,
            disponible: true,
        };
        t.items.push(item.clone());
        Ok(item)
    }

    async fn update_item(&self, id: i64, item: MenuItemRequest) -> Result<Option<MenuItem>, StoreError> {
        let mut t = self.tables();
        Ok(t.items.iter_mut().find(|i| i.id == id).map(|existing| {
            existing.nombre = item.nombre;
            existing.descripcion = item.descripcion;
            existing.precio = item.precio;
            existing.categoria_id = item.categoria_id;
            existing.clone()
        }))
    }

    async fn deactivate_item(&self, id: i64) -> Result<Option<MenuItem>, StoreError> {
        let mut t = self.tables();
        Ok(t.items.iter_mut().find(|i| i.id == id).map(|existing| {
            existing.disponible = false;
            existing.clone()
        }))
    }

    async fn list_active_tables(&self) -> Result<Vec<Table>, StoreError> {
        let mut tables: Vec<Table> = self.tables().tables.iter().filter(|t| t.activa).cloned().collect();
        tables.sort_by_key(|t| t.numero);
        Ok(tables)
    }

    async fn find_table(&self, id: i64) -> Result<Option<Table>, StoreError> {
        Ok(self.tables().tables.iter().find(|t| t.id == id).cloned())
    }

    async fn find_active_table_by_number(&self, numero: i32) -> Result<Option<Table>, StoreError> {
        Ok(self
            .tables()
            .tables
            .iter()
            .find(|t| t.activa && t.numero == numero)
            .cloned())
    }

    async fn create_table(&self, numero: i32, capacidad: i32, estado: TableState) -> Result<Table, StoreError> {
        let mut t = self.tables();
        if t.tables.iter().any(|table| table.numero == numero) {
            return Err(unique("mesas_numero_key"));
        }
        let table = Table {
            id: t.next_id(),
            numero,
            capacidad,
            estado,
            activa: true,
        };
        t.tables.push(table.clone());
        Ok(table)
    }

    async fn update_table(&self, id: i64, patch: UpdateTableRequest) -> Result<Option<Table>, StoreError> {
        let mut t = self.tables();
        Ok(t.tables.iter_mut().find(|table| table.id == id).map(|table| {
            if let Some(capacidad) = patch.capacidad {
                table.capacidad = capacidad;
            }
            if let Some(estado) = patch.estado {
                table.estado = estado;
            }
            if let Some(activa) = patch.activa {
                table.activa = activa;
            }
            table.clone()
        }))
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut t = self.tables();
        let id = t.next_id();
        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            lines.push(LineItem {
                id: t.next_id(),
                pedido_id: id,
                item_menu_id: line.item_menu_id,
                cantidad: line.cantidad,
                precio_unitario: line.precio_unitario,
                subtotal: line.subtotal(),
                notas_item: line.notas_item.clone(),
            });
        }
        let order = Order {
            id,
            mesa_id: order.mesa_id,
            mesero_id: order.mesero_id,
            estado: OrderStatus::Pendiente,
            fecha_pedido: order.fecha_pedido,
            fecha_listo: None,
            fecha_entregado: None,
            updated_at: order.fecha_pedido,
            detalle_pedido: lines,
        };
        t.orders.push(order.clone());
        Ok(order)
    }

    async fn list_orders(&self, include_cancelled: bool) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .tables()
            .orders
            .iter()
            .filter(|o| include_cancelled || o.estado != OrderStatus::Cancelado)
            .cloned()
            .collect();
        orders.sort_by_key(|o| (o.fecha_pedido, o.id));
        Ok(orders)
    }

    async fn find_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self.tables().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn order_lines(&self, pedido_id: i64) -> Result<Vec<LineItem>, StoreError> {
        Ok(self
            .tables()
            .orders
            .iter()
            .find(|o| o.id == pedido_id)
            .map(|o| o.detalle_pedido.clone())
            .unwrap_or_default())
    }

    async fn open_orders_for_table(&self, mesa_id: i64) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .tables()
            .orders
            .iter()
            .filter(|o| o.mesa_id == mesa_id && OrderStatus::OPEN.contains(&o.estado))
            .cloned()
            .collect();
        orders.sort_by_key(|o| (o.fecha_pedido, o.id));
        Ok(orders)
    }

    async fn transition_order(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, StoreError> {
        let mut t = self.tables();
        let Some(order) = t.orders.iter_mut().find(|o| o.id == id && o.estado == from) else {
            return Ok(None);
        };
        order.estado = to;
        order.updated_at = at;
        match to {
            OrderStatus::Listo => order.fecha_listo = Some(at),
            OrderStatus::Entregado => order.fecha_entregado = Some(at),
            _ => {}
        }
        Ok(Some(order.clone()))
    }

    async fn list_bills(&self) -> Result<Vec<Bill>, StoreError> {
        let mut bills = self.tables().bills.clone();
        bills.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(bills)
    }

    async fn find_bill(&self, id: i64) -> Result<Option<Bill>, StoreError> {
        Ok(self.tables().bills.iter().find(|b| b.id == id).cloned())
    }

    async fn bill_for_order(&self, pedido_id: i64) -> Result<Option<Bill>, StoreError> {
        Ok(self
            .tables()
            .bills
            .iter()
            .filter(|b| b.pedido_id == pedido_id)
            .max_by_key(|b| (is_live(b), b.created_at, b.id))
            .cloned())
    }

    async fn create_bills(&self, bills: Vec<NewBill>) -> Result<Vec<Bill>, StoreError> {
        let mut t = self.tables();
        for bill in &bills {
            if t.bills.iter().any(|b| b.pedido_id == bill.pedido_id && is_live(b)) {
                return Err(unique("cuentas_pedido_activa_idx"));
            }
        }
        let mut created = Vec::with_capacity(bills.len());
        for bill in bills {
            let bill = Bill {
                id: t.next_id(),
                pedido_id: bill.pedido_id,
                mesa_id: bill.mesa_id,
                mesero_id: bill.mesero_id,
                subtotal: bill.subtotal,
                propina: bill.propina,
                total: bill.total,
                metodo_pago: bill.metodo_pago,
                estado: bill.estado,
                fecha_pago: bill.fecha_pago,
                created_at: bill.created_at,
            };
            t.bills.push(bill.clone());
            created.push(bill);
        }
        Ok(created)
    }

    async fn update_bill(&self, id: i64, patch: BillPatch) -> Result<Option<Bill>, StoreError> {
        let mut t = self.tables();
        if patch.estado.is_some_and(|s| s != BillStatus::Cancelada) {
            // reviving a cancelled bill must not create a second live one
            if let Some(target) = t.bills.iter().find(|b| b.id == id) {
                let pedido_id = target.pedido_id;
                if t.bills.iter().any(|b| b.id != id && b.pedido_id == pedido_id && is_live(b)) {
                    return Err(unique("cuentas_pedido_activa_idx"));
                }
            }
        }
        Ok(t.bills.iter_mut().find(|b| b.id == id).map(|bill| {
            if let Some(propina) = patch.propina {
                bill.propina = propina;
            }
            if let Some(total) = patch.total {
                bill.total = total;
            }
            if patch.metodo_pago.is_some() {
                bill.metodo_pago = patch.metodo_pago;
            }
            if let Some(estado) = patch.estado {
                bill.estado = estado;
            }
            if patch.fecha_pago.is_some() {
                bill.fecha_pago = patch.fecha_pago;
            }
            bill.clone()
        }))
    }

    async fn paid_bills_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<PaidBillsSummary, StoreError> {
        Ok(self
            .tables()
            .bills
            .iter()
            .filter(|b| b.estado == BillStatus::Pagada)
            .filter(|b| b.fecha_pago.is_some_and(|paid| paid >= start && paid < end))
            .fold(PaidBillsSummary::default(), |acc, b| PaidBillsSummary {
                count: acc.count + 1,
                total: acc.total + b.total,
            }))
    }

    async fn cancelled_orders_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, StoreError> {
        Ok(self
            .tables()
            .orders
            .iter()
            .filter(|o| o.estado == OrderStatus::Cancelado && o.updated_at >= start && o.updated_at < end)
            .count() as i64)
    }
}
