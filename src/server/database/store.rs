use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::{Display, Error};
use rust_decimal::Decimal;
use tokio_postgres::error::SqlState;
use crate::server::model::bill::{Bill, BillPatch, NewBill};
use crate::server::model::category::{Category, UpdateCategoryRequest};
use crate::server::model::item::{MenuItem, MenuItemRequest};
use crate::server::model::order::{LineItem, NewOrder, Order, OrderStatus};
use crate::server::model::table::{Table, TableState, UpdateTableRequest};
use crate::server::model::user::{NewUser, Role, User, UserPatch};

#[derive(Debug, Display, Error)]
pub(crate) enum StoreError {
    /// a unique index rejected the write
    #[display("{message}")]
    UniqueViolation { message: String },
    /// a CHECK constraint rejected the row
    #[display("{message}")]
    CheckViolation { message: String },
    #[display("server is busy")]
    PoolExhausted,
    #[display("timeout occurred")]
    Timeout,
    /// a stored value could not be mapped back into the model
    #[display("{message}")]
    Decode { message: String },
    #[display("{source}")]
    Database { source: tokio_postgres::Error },
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        let message = || {
            e.as_db_error()
                .map(|db| db.message().to_string())
                .unwrap_or_else(|| e.to_string())
        };
        match e.code() {
            Some(code) if *code == SqlState::UNIQUE_VIOLATION => StoreError::UniqueViolation { message: message() },
            Some(code) if *code == SqlState::CHECK_VIOLATION => StoreError::CheckViolation { message: message() },
            _ => StoreError::Database { source: e },
        }
    }
}

/// Aggregates of paid bills inside a time window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct PaidBillsSummary {
    pub count: i64,
    pub total: Decimal,
}

/// Persistence seam of the server.
///
/// Every multi-row write is atomic: either all rows land or none do.
/// `transition_order` only applies when the order is still in `from`.
#[async_trait]
pub(crate) trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_active_user(&self, identificador: &str) -> Result<Option<User>, StoreError>;
    async fn list_users(&self, rol: Option<Role>) -> Result<Vec<User>, StoreError>;
    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError>;

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn create_category(&self, nombre: String, descripcion: Option<String>) -> Result<Category, StoreError>;
    async fn update_category(&self, id: i64, patch: UpdateCategoryRequest) -> Result<Option<Category>, StoreError>;

    async fn list_available_items(&self) -> Result<Vec<MenuItem>, StoreError>;
    async fn find_items(&self, ids: &[i64]) -> Result<Vec<MenuItem>, StoreError>;
    async fn create_item(&self, item: MenuItemRequest) -> Result<MenuItem, StoreError>;
    async fn update_item(&self, id: i64, item: MenuItemRequest) -> Result<Option<MenuItem>, StoreError>;
    async fn deactivate_item(&self, id: i64) -> Result<Option<MenuItem>, StoreError>;

    async fn list_active_tables(&self) -> Result<Vec<Table>, StoreError>;
    async fn find_table(&self, id: i64) -> Result<Option<Table>, StoreError>;
    async fn find_active_table_by_number(&self, numero: i32) -> Result<Option<Table>, StoreError>;
    async fn create_table(&self, numero: i32, capacidad: i32, estado: TableState) -> Result<Table, StoreError>;
    async fn update_table(&self, id: i64, patch: UpdateTableRequest) -> Result<Option<Table>, StoreError>;

    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError>;
    async fn list_orders(&self, include_cancelled: bool) -> Result<Vec<Order>, StoreError>;
    async fn find_order(&self, id: i64) -> Result<Option<Order>, StoreError>;
    async fn order_lines(&self, pedido_id: i64) -> Result<Vec<LineItem>, StoreError>;
    async fn open_orders_for_table(&self, mesa_id: i64) -> Result<Vec<Order>, StoreError>;
    async fn transition_order(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, StoreError>;

    async fn list_bills(&self) -> Result<Vec<Bill>, StoreError>;
    async fn find_bill(&self, id: i64) -> Result<Option<Bill>, StoreError>;
    /// the live bill of an order, or its latest cancelled one
    async fn bill_for_order(&self, pedido_id: i64) -> Result<Option<Bill>, StoreError>;
    /// fails with [`StoreError::UniqueViolation`] if any order already has a live bill
    async fn create_bills(&self, bills: Vec<NewBill>) -> Result<Vec<Bill>, StoreError>;
    async fn update_bill(&self, id: i64, patch: BillPatch) -> Result<Option<Bill>, StoreError>;

    async fn paid_bills_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<PaidBillsSummary, StoreError>;
    async fn cancelled_orders_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, StoreError>;
}
