//! route table; every endpoint lives under `/api`

use actix_web::web;
use log::debug;
use crate::server::controller::error::CustomError;
use crate::server::controller::{auth, bills, categories, items, orders, reports, tables, users};

/// Register extractor error handlers and all endpoints.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        debug!("rejected json body, {}", err);
        CustomError::bad_request(format!("Cuerpo inválido: {err}")).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        CustomError::bad_request(format!("Parámetro inválido: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        CustomError::bad_request(format!("Consulta inválida: {err}")).into()
    }))
    .service(
        web::scope("/api")
            .service(auth::login)
            .service(auth::register)
            .service(items::get_items)
            .service(items::post_item)
            .service(items::put_item)
            .service(items::delete_item)
            .service(categories::get_categories)
            .service(categories::post_category)
            .service(categories::put_category)
            .service(tables::get_tables)
            .service(tables::post_table)
            .service(tables::put_table)
            .service(orders::get_orders)
            .service(orders::post_order)
            .service(orders::get_order_lines)
            .service(orders::get_table_orders)
            .service(orders::put_table_ready)
            .service(orders::put_order_status)
            .service(users::get_users)
            .service(users::post_user)
            .service(users::put_user)
            .service(users::delete_user)
            .service(bills::get_bills)
            .service(bills::post_bills)
            .service(bills::put_bill)
            .service(bills::get_order_bill)
            .service(reports::get_report),
    );
}
