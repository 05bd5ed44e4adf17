use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use anyhow::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use rust_decimal::Decimal;
use tokio::time;
use tokio_postgres::{Client, Row};
use crate::server::database::connection::Connection;
use crate::server::database::pool::Pool;
use crate::server::database::store::{PaidBillsSummary, Store, StoreError};
use crate::server::model::bill::{Bill, BillPatch, BillStatus, NewBill, PaymentMethod};
use crate::server::model::category::{Category, UpdateCategoryRequest};
use crate::server::model::config::ServerConfig;
use crate::server::model::item::{MenuItem, MenuItemRequest};
use crate::server::model::order::{LineItem, NewOrder, Order, OrderStatus};
use crate::server::model::table::{Table, TableState, UpdateTableRequest};
use crate::server::model::user::{NewUser, Role, User, UserPatch};

const USER_COLUMNS: &str = "id, identificador, nombre, rol, activo, password_hash, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, nombre, descripcion, orden, activa";
const ITEM_COLUMNS: &str = "id, nombre, descripcion, precio, categoria_id, disponible";
const TABLE_COLUMNS: &str = "id, numero, capacidad, estado, activa";
const ORDER_COLUMNS: &str = "id, mesa_id, mesero_id, estado, fecha_pedido, fecha_listo, fecha_entregado, updated_at";
const LINE_COLUMNS: &str = "id, pedido_id, item_menu_id, cantidad, precio_unitario, subtotal, notas_item";
const BILL_COLUMNS: &str = "id, pedido_id, mesa_id, mesero_id, subtotal, propina, total, metodo_pago, estado, fecha_pago, created_at";

/// [`Store`] backed by PostgreSQL. Reads and writes go through separate pools.
pub(crate) struct PgStore {
    read_pool: Pool<Client>,
    write_pool: Pool<Client>,
    timeout: Duration,
}

impl PgStore {
    pub fn new(read_pool: Pool<Client>, write_pool: Pool<Client>, timeout: Duration) -> Self {
        Self {
            read_pool,
            write_pool,
            timeout,
        }
    }

    pub async fn connect(config: &ServerConfig) -> Result<Self, Error> {
        let read_pool = Pool::connect("read", &config.db_read_conn_str, config.db_pool_size).await?;
        let write_pool = Pool::connect("write", &config.db_write_conn_str, config.db_pool_size).await?;
        info!("connected to postgres with {} connections per pool", config.db_pool_size);
        Ok(Self::new(read_pool, write_pool, config.db_timeout))
    }

    async fn read<T, F, Fut>(&self, query: F) -> Result<T, StoreError>
    where
        F: FnOnce(Connection<Client>) -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
    {
        with_connection(&self.read_pool, self.timeout, query).await
    }

    async fn write<T, F, Fut>(&self, query: F) -> Result<T, StoreError>
    where
        F: FnOnce(Connection<Client>) -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
    {
        with_connection(&self.write_pool, self.timeout, query).await
    }

    /// orders plus their lines, fetched in two round trips
    async fn with_lines(&self, client: &Client, rows: Vec<Row>) -> Result<Vec<Order>, StoreError> {
        let mut orders = rows.iter().map(order_from_row).collect::<Result<Vec<_>, _>>()?;
        if orders.is_empty() {
            return Ok(orders);
        }
        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let stmt = format!("SELECT {LINE_COLUMNS} FROM detalle_pedido WHERE pedido_id = ANY($1) ORDER BY id");
        let mut lines: HashMap<i64, Vec<LineItem>> = HashMap::new();
        for row in client.query(&stmt, &[&ids]).await? {
            let line = line_from_row(&row)?;
            lines.entry(line.pedido_id).or_default().push(line);
        }
        for order in orders.iter_mut() {
            order.detalle_pedido = lines.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }
}

/// Check a connection out of `pool`, then run `query` on it within `limit`.
///
/// The wait for a free connection has its own deadline, so a starved pool is
/// reported as [`StoreError::PoolExhausted`] and only the query can time out.
async fn with_connection<C, T, F, Fut>(pool: &Pool<C>, limit: Duration, query: F) -> Result<T, StoreError>
where
    C: Send + 'static,
    F: FnOnce(Connection<C>) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let conn = pool.acquire(limit).await.ok_or(StoreError::PoolExhausted)?;
    match time::timeout(limit, query(conn)).await {
        Ok(result) => result,
        Err(_) => {
            warn!("database call on pool {} exceeded {:?}", pool.name(), limit);
            Err(StoreError::Timeout)
        }
    }
}

fn parse_column<T>(row: &Row, column: &str) -> Result<T, StoreError>
where
    T: FromStr<Err = String>,
{
    let raw: &str = row.try_get(column)?;
    raw.parse().map_err(|message| StoreError::Decode { message })
}

fn user_from_row(row: &Row) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        identificador: row.try_get("identificador")?,
        nombre: row.try_get("nombre")?,
        rol: parse_column(row, "rol")?,
        activo: row.try_get("activo")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn category_from_row(row: &Row) -> Result<Category, StoreError> {
    Ok(Category {
        id: row.try_get("id")?,
        nombre: row.try_get("nombre")?,
        descripcion: row.try_get("descripcion")?,
        orden: row.try_get("orden")?,
        activa: row.try_get("activa")?,
    })
}

fn item_from_row(row: &Row) -> Result<MenuItem, StoreError> {
    Ok(MenuItem {
        id: row.try_get("id")?,
        nombre: row.try_get("nombre")?,
        descripcion: row.try_get("descripcion")?,
        precio: row.try_get("precio")?,
        categoria_id: row.try_get("categoria_id")?,
        disponible: row.try_get("disponible")?,
    })
}

fn table_from_row(row: &Row) -> Result<Table, StoreError> {
    Ok(Table {
        id: row.try_get("id")?,
        numero: row.try_get("numero")?,
        capacidad: row.try_get("capacidad")?,
        estado: parse_column(row, "estado")?,
        activa: row.try_get("activa")?,
    })
}

fn order_from_row(row: &Row) -> Result<Order, StoreError> {
    Ok(Order {
        id: row.try_get("id")?,
        mesa_id: row.try_get("mesa_id")?,
        mesero_id: row.try_get("mesero_id")?,
        estado: parse_column(row, "estado")?,
        fecha_pedido: row.try_get("fecha_pedido")?,
        fecha_listo: row.try_get("fecha_listo")?,
        fecha_entregado: row.try_get("fecha_entregado")?,
        updated_at: row.try_get("updated_at")?,
        detalle_pedido: vec![],
    })
}

fn line_from_row(row: &Row) -> Result<LineItem, StoreError> {
    Ok(LineItem {
        id: row.try_get("id")?,
        pedido_id: row.try_get("pedido_id")?,
        item_menu_id: row.try_get("item_menu_id")?,
        cantidad: row.try_get("cantidad")?,
        precio_unitario: row.try_get("precio_unitario")?,
        subtotal: row.try_get("subtotal")?,
        notas_item: row.try_get("notas_item")?,
    })
}

fn bill_from_row(row: &Row) -> Result<Bill, StoreError> {
    let metodo_pago: Option<&str> = row.try_get("metodo_pago")?;
    Ok(Bill {
        id: row.try_get("id")?,
        pedido_id: row.try_get("pedido_id")?,
        mesa_id: row.try_get("mesa_id")?,
        mesero_id: row.try_get("mesero_id")?,
        subtotal: row.try_get("subtotal")?,
        propina: row.try_get("propina")?,
        total: row.try_get("total")?,
        metodo_pago: metodo_pago
            .map(|m| m.parse::<PaymentMethod>())
            .transpose()
            .map_err(|message| StoreError::Decode { message })?,
        estado: parse_column(row, "estado")?,
        fecha_pago: row.try_get("fecha_pago")?,
        created_at: row.try_get("created_at")?,
    })
}

fn first<T>(rows: Vec<Row>, map: fn(&Row) -> Result<T, StoreError>) -> Result<Option<T>, StoreError> {
    rows.first().map(map).transpose()
}

fn all<T>(rows: Vec<Row>, map: fn(&Row) -> Result<T, StoreError>) -> Result<Vec<T>, StoreError> {
    rows.iter().map(map).collect()
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.write(move |conn| async move {
            let stmt = format!(r#"
                INSERT INTO usuarios (identificador, nombre, rol, password_hash, activo, created_at)
                VALUES ($1, $2, $3, $4, TRUE, $5)
                RETURNING {USER_COLUMNS}
            "#);
            let row = conn
                .query_one(&stmt, &[&user.identificador, &user.nombre, &user.rol.as_str(), &user.password_hash, &user.created_at])
                .await?;
            user_from_row(&row)
        })
        .await
    }

    async fn find_active_user(&self, identificador: &str) -> Result<Option<User>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!("SELECT {USER_COLUMNS} FROM usuarios WHERE identificador = $1 AND activo");
            first(conn.query(&stmt, &[&identificador]).await?, user_from_row)
        })
        .await
    }

    async fn list_users(&self, rol: Option<Role>) -> Result<Vec<User>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!("SELECT {USER_COLUMNS} FROM usuarios WHERE $1::text IS NULL OR rol = $1 ORDER BY id");
            all(conn.query(&stmt, &[&rol.map(|r| r.as_str())]).await?, user_from_row)
        })
        .await
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError> {
        self.write(move |conn| async move {
            let stmt = format!(r#"
                UPDATE usuarios SET
                    identificador = COALESCE($2::text, identificador),
                    password_hash = COALESCE($3::text, password_hash),
                    nombre = COALESCE($4::text, nombre),
                    rol = COALESCE($5::text, rol),
                    activo = COALESCE($6::boolean, activo),
                    updated_at = COALESCE($7::timestamptz, updated_at)
                WHERE id = $1
                RETURNING {USER_COLUMNS}
            "#);
            let rows = conn
                .query(&stmt, &[
                    &id,
                    &patch.identificador,
                    &patch.password_hash,
                    &patch.nombre,
                    &patch.rol.map(|r| r.as_str()),
                    &patch.activo,
                    &patch.updated_at,
                ])
                .await?;
            first(rows, user_from_row)
        })
        .await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!("SELECT {CATEGORY_COLUMNS} FROM categorias_menu ORDER BY orden, id");
            all(conn.query(&stmt, &[]).await?, category_from_row)
        })
        .await
    }

    async fn create_category(&self, nombre: String, descripcion: Option<String>) -> Result<Category, StoreError> {
        self.write(move |conn| async move {
            let stmt = format!("INSERT INTO categorias_menu (nombre, descripcion) VALUES ($1, $2) RETURNING {CATEGORY_COLUMNS}");
            category_from_row(&conn.query_one(&stmt, &[&nombre, &descripcion]).await?)
        })
        .await
    }

    async fn update_category(&self, id: i64, patch: UpdateCategoryRequest) -> Result<Option<Category>, StoreError> {
        self.write(move |conn| async move {
            let stmt = format!(r#"
                UPDATE categorias_menu SET
                    nombre = COALESCE($2::text, nombre),
                    descripcion = COALESCE($3::text, descripcion),
                    orden = COALESCE($4::integer, orden),
                    activa = COALESCE($5::boolean, activa)
                WHERE id = $1
                RETURNING {CATEGORY_COLUMNS}
            "#);
            let rows = conn
                .query(&stmt, &[&id, &patch.nombre, &patch.descripcion, &patch.orden, &patch.activa])
                .await?;
            first(rows, category_from_row)
        })
        .await
    }

    async fn list_available_items(&self) -> Result<Vec<MenuItem>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!("SELECT {ITEM_COLUMNS} FROM items_menu WHERE disponible ORDER BY id");
            all(conn.query(&stmt, &[]).await?, item_from_row)
        })
        .await
    }

    async fn find_items(&self, ids: &[i64]) -> Result<Vec<MenuItem>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!("SELECT {ITEM_COLUMNS} FROM items_menu WHERE id = ANY($1)");
            all(conn.query(&stmt, &[&ids]).await?, item_from_row)
        })
        .await
    }

    async fn create_item(&self, item: MenuItemRequest) -> Result<MenuItem, StoreError> {
        self.write(move |conn| async move {
            let stmt = format!(r#"
                INSERT INTO items_menu (nombre, descripcion, precio, categoria_id, disponible)
                VALUES ($1, $2, $3, $4, TRUE)
                RETURNING {ITEM_COLUMNS}
            "#);
            let row = conn
                .query_one(&stmt, &[&item.nombre, &item.descripcion, &item.precio, &item.categoria_id])
                .await?;
            item_from_row(&row)
        })
        .await
    }

    async fn update_item(&self, id: i64, item: MenuItemRequest) -> Result<Option<MenuItem>, StoreError> {
        self.write(move |conn| async move {
            let stmt = format!(r#"
                UPDATE items_menu
                SET nombre = $2, descripcion = $3, precio = $4, categoria_id = $5
                WHERE id = $1
                RETURNING {ITEM_COLUMNS}
            "#);
            let rows = conn
                .query(&stmt, &[&id, &item.nombre, &item.descripcion, &item.precio, &item.categoria_id])
                .await?;
            first(rows, item_from_row)
        })
        .await
    }

    async fn deactivate_item(&self, id: i64) -> Result<Option<MenuItem>, StoreError> {
        self.write(move |conn| async move {
            let stmt = format!("UPDATE items_menu SET disponible = FALSE WHERE id = $1 RETURNING {ITEM_COLUMNS}");
            first(conn.query(&stmt, &[&id]).await?, item_from_row)
        })
        .await
    }

    async fn list_active_tables(&self) -> Result<Vec<Table>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!("SELECT {TABLE_COLUMNS} FROM mesas WHERE activa ORDER BY numero");
            all(conn.query(&stmt, &[]).await?, table_from_row)
        })
        .await
    }

    async fn find_table(&self, id: i64) -> Result<Option<Table>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!("SELECT {TABLE_COLUMNS} FROM mesas WHERE id = $1");
            first(conn.query(&stmt, &[&id]).await?, table_from_row)
        })
        .await
    }

    async fn find_active_table_by_number(&self, numero: i32) -> Result<Option<Table>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!("SELECT {TABLE_COLUMNS} FROM mesas WHERE numero = $1 AND activa");
            first(conn.query(&stmt, &[&numero]).await?, table_from_row)
        })
        .await
    }

    async fn create_table(&self, numero: i32, capacidad: i32, estado: TableState) -> Result<Table, StoreError> {
        self.write(move |conn| async move {
            let stmt = format!(r#"
                INSERT INTO mesas (numero, capacidad, estado, activa)
                VALUES ($1, $2, $3, TRUE)
                RETURNING {TABLE_COLUMNS}
            "#);
            table_from_row(&conn.query_one(&stmt, &[&numero, &capacidad, &estado.as_str()]).await?)
        })
        .await
    }

    async fn update_table(&self, id: i64, patch: UpdateTableRequest) -> Result<Option<Table>, StoreError> {
        self.write(move |conn| async move {
            let stmt = format!(r#"
                UPDATE mesas SET
                    capacidad = COALESCE($2::integer, capacidad),
                    estado = COALESCE($3::text, estado),
                    activa = COALESCE($4::boolean, activa)
                WHERE id = $1
                RETURNING {TABLE_COLUMNS}
            "#);
            let rows = conn
                .query(&stmt, &[&id, &patch.capacidad, &patch.estado.map(|e| e.as_str()), &patch.activa])
                .await?;
            first(rows, table_from_row)
        })
        .await
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        self.write(move |mut conn| async move {
            // header and lines land together or not at all
            let txn = conn.transaction().await?;
            let stmt = format!(r#"
                INSERT INTO pedidos (mesa_id, mesero_id, estado, fecha_pedido, updated_at)
                VALUES ($1, $2, $3, $4, $4)
                RETURNING {ORDER_COLUMNS}
            "#);
            let row = txn
                .query_one(&stmt, &[&order.mesa_id, &order.mesero_id, &OrderStatus::Pendiente.as_str(), &order.fecha_pedido])
                .await?;
            let mut created = order_from_row(&row)?;

            let stmt = format!(r#"
                INSERT INTO detalle_pedido (pedido_id, item_menu_id, cantidad, precio_unitario, subtotal, notas_item)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {LINE_COLUMNS}
            "#);
            let stmt = txn.prepare(&stmt).await?;
            for line in &order.lines {
                let row = txn
                    .query_one(&stmt, &[
                        &created.id,
                        &line.item_menu_id,
                        &line.cantidad,
                        &line.precio_unitario,
                        &line.subtotal(),
                        &line.notas_item,
                    ])
                    .await?;
                created.detalle_pedido.push(line_from_row(&row)?);
            }
            txn.commit().await?;
            Ok(created)
        })
        .await
    }

    async fn list_orders(&self, include_cancelled: bool) -> Result<Vec<Order>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!(r#"
                SELECT {ORDER_COLUMNS} FROM pedidos
                WHERE $1 OR estado <> 'cancelado'
                ORDER BY fecha_pedido, id
            "#);
            let rows = conn.query(&stmt, &[&include_cancelled]).await?;
            self.with_lines(&conn, rows).await
        })
        .await
    }

    async fn find_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!("SELECT {ORDER_COLUMNS} FROM pedidos WHERE id = $1");
            let rows = conn.query(&stmt, &[&id]).await?;
            Ok(self.with_lines(&conn, rows).await?.pop())
        })
        .await
    }

    async fn order_lines(&self, pedido_id: i64) -> Result<Vec<LineItem>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!("SELECT {LINE_COLUMNS} FROM detalle_pedido WHERE pedido_id = $1 ORDER BY id");
            all(conn.query(&stmt, &[&pedido_id]).await?, line_from_row)
        })
        .await
    }

    async fn open_orders_for_table(&self, mesa_id: i64) -> Result<Vec<Order>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!(r#"
                SELECT {ORDER_COLUMNS} FROM pedidos
                WHERE mesa_id = $1 AND estado = ANY($2)
                ORDER BY fecha_pedido, id
            "#);
            let open: Vec<&str> = OrderStatus::OPEN.iter().map(|s| s.as_str()).collect();
            let rows = conn.query(&stmt, &[&mesa_id, &open]).await?;
            self.with_lines(&conn, rows).await
        })
        .await
    }

    async fn transition_order(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, StoreError> {
        self.write(move |conn| async move {
            // conditional on the state the caller validated against
            let stmt = format!(r#"
                UPDATE pedidos SET
                    estado = $3::text,
                    updated_at = $4::timestamptz,
                    fecha_listo = CASE WHEN $3::text = 'listo' THEN $4::timestamptz ELSE fecha_listo END,
                    fecha_entregado = CASE WHEN $3::text = 'entregado' THEN $4::timestamptz ELSE fecha_entregado END
                WHERE id = $1 AND estado = $2::text
                RETURNING {ORDER_COLUMNS}
            "#);
            let rows = conn.query(&stmt, &[&id, &from.as_str(), &to.as_str(), &at]).await?;
            let mut orders = self.with_lines(&conn, rows).await?;
            Ok(orders.pop())
        })
        .await
    }

    async fn list_bills(&self) -> Result<Vec<Bill>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!("SELECT {BILL_COLUMNS} FROM cuentas ORDER BY created_at DESC, id DESC");
            all(conn.query(&stmt, &[]).await?, bill_from_row)
        })
        .await
    }

    async fn find_bill(&self, id: i64) -> Result<Option<Bill>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!("SELECT {BILL_COLUMNS} FROM cuentas WHERE id = $1");
            first(conn.query(&stmt, &[&id]).await?, bill_from_row)
        })
        .await
    }

    async fn bill_for_order(&self, pedido_id: i64) -> Result<Option<Bill>, StoreError> {
        self.read(move |conn| async move {
            let stmt = format!(r#"
                SELECT {BILL_COLUMNS} FROM cuentas
                WHERE pedido_id = $1
                ORDER BY (estado = 'cancelada'), created_at DESC, id DESC
                LIMIT 1
            "#);
            first(conn.query(&stmt, &[&pedido_id]).await?, bill_from_row)
        })
        .await
    }

    async fn create_bills(&self, bills: Vec<NewBill>) -> Result<Vec<Bill>, StoreError> {
        self.write(move |mut conn| async move {
            // the partial unique index on live bills rejects a second charge
            let txn = conn.transaction().await?;
            let stmt = format!(r#"
                INSERT INTO cuentas (pedido_id, mesa_id, mesero_id, subtotal, propina, total, metodo_pago, estado, fecha_pago, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING {BILL_COLUMNS}
            "#);
            let stmt = txn.prepare(&stmt).await?;
            let mut created = Vec::with_capacity(bills.len());
            for bill in &bills {
                let row = txn
                    .query_one(&stmt, &[
                        &bill.pedido_id,
                        &bill.mesa_id,
                        &bill.mesero_id,
                        &bill.subtotal,
                        &bill.propina,
                        &bill.total,
                        &bill.metodo_pago.map(|m| m.as_str()),
                        &bill.estado.as_str(),
                        &bill.fecha_pago,
                        &bill.created_at,
                    ])
                    .await?;
                created.push(bill_from_row(&row)?);
            }
            txn.commit().await?;
            Ok(created)
        })
        .await
    }

    async fn update_bill(&self, id: i64, patch: BillPatch) -> Result<Option<Bill>, StoreError> {
        self.write(move |conn| async move {
            let stmt = format!(r#"
                UPDATE cuentas SET
                    propina = COALESCE($2::numeric, propina),
                    total = COALESCE($3::numeric, total),
                    metodo_pago = COALESCE($4::text, metodo_pago),
                    estado = COALESCE($5::text, estado),
                    fecha_pago = COALESCE($6::timestamptz, fecha_pago)
                WHERE id = $1
                RETURNING {BILL_COLUMNS}
            "#);
            let rows = conn
                .query(&stmt, &[
                    &id,
                    &patch.propina,
                    &patch.total,
                    &patch.metodo_pago.map(|m| m.as_str()),
                    &patch.estado.map(|s| s.as_str()),
                    &patch.fecha_pago,
                ])
                .await?;
            first(rows, bill_from_row)
        })
        .await
    }

    async fn paid_bills_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<PaidBillsSummary, StoreError> {
        self.read(move |conn| async move {
            let row = conn
                .query_one(r#"
                    SELECT COUNT(*) AS count, COALESCE(SUM(total), 0)::numeric AS total
                    FROM cuentas
                    WHERE estado = $1 AND fecha_pago >= $2 AND fecha_pago < $3
                "#, &[&BillStatus::Pagada.as_str(), &start, &end])
                .await?;
            let total: Decimal = row.try_get("total")?;
            Ok(PaidBillsSummary {
                count: row.try_get("count")?,
                total,
            })
        })
        .await
    }

    async fn cancelled_orders_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, StoreError> {
        self.read(move |conn| async move {
            let row = conn
                .query_one(r#"
                    SELECT COUNT(*) AS count
                    FROM pedidos
                    WHERE estado = $1 AND updated_at >= $2 AND updated_at < $3
                "#, &[&OrderStatus::Cancelado.as_str(), &start, &end])
                .await?;
            Ok(row.try_get("count")?)
        })
        .await
    }
}
