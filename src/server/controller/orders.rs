use actix_web::{get, post, put, web, HttpResponse, Responder};
use crate::server::auth::extractor::AuthenticatedUser;
use crate::server::controller::error::CustomError;
use crate::server::model::order::{
    CreateOrderRequest, ListOrdersParams, OrderResponse, TableOrdersResponse, TableReadyResponse,
    UpdateOrderStatusRequest,
};
use crate::server::model::user::Role;
use crate::server::service;
use crate::server::state::AppState;
use crate::server::util::time::helper::get_utc_now;

#[get("/pedidos")]
/// orders with their lines, oldest first; cancelled ones only on request
async fn get_orders(
    _user: AuthenticatedUser,
    params: web::Query<ListOrdersParams>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let orders = data
        .store()
        .list_orders(params.incluir_cancelados.unwrap_or(false))
        .await?;
    Ok(web::Json(orders))
}

#[post("/pedidos")]
async fn post_order(
    user: AuthenticatedUser,
    body: web::Json<CreateOrderRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&[Role::Administrador, Role::Mesero])?;
    let order = service::orders::create_order(data.store(), &user, &body, get_utc_now()).await?;
    Ok(HttpResponse::Created().json(OrderResponse {
        mensaje: "Pedido creado exitosamente".to_string(),
        pedido: order,
    }))
}

#[put("/pedidos/{id}")]
/// advance an order through its lifecycle
async fn put_order_status(
    _user: AuthenticatedUser,
    id: web::Path<i64>,
    body: web::Json<UpdateOrderStatusRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let order = service::orders::advance(data.store(), id.into_inner(), &body.estado, get_utc_now()).await?;
    Ok(web::Json(OrderResponse {
        mensaje: "Estado del pedido actualizado".to_string(),
        pedido: order,
    }))
}

#[get("/pedidos/detallespedido/{id}")]
async fn get_order_lines(
    _user: AuthenticatedUser,
    id: web::Path<i64>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let order = service::orders::find_order(data.store(), id.into_inner()).await?;
    Ok(web::Json(order.detalle_pedido))
}

#[get("/pedidos/mesa/{numero}")]
/// what the kitchen still owes a table
async fn get_table_orders(
    _user: AuthenticatedUser,
    numero: web::Path<i32>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let (table, orders) = service::orders::table_orders(data.store(), numero.into_inner()).await?;
    Ok(web::Json(TableOrdersResponse {
        mesa: table.numero,
        pedidos: orders,
    }))
}

#[put("/pedidos/mesa/{numero}")]
async fn put_table_ready(
    _user: AuthenticatedUser,
    numero: web::Path<i32>,
    body: web::Json<UpdateOrderStatusRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let (table, orders) =
        service::orders::mark_table_ready(data.store(), numero.into_inner(), &body.estado, get_utc_now()).await?;
    Ok(web::Json(TableReadyResponse {
        mensaje: format!("Pedidos de la mesa {} marcados como listos", table.numero),
        mesa: table.numero,
        pedidos_actualizados: orders.len(),
        pedidos: orders,
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::DateTime;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use crate::server::controller::test_support::{app, bearer, state};
    use crate::server::model::item::MenuItemRequest;
    use crate::server::model::table::TableState;
    use crate::server::model::user::Role;
    use crate::server::model::MessageResponse;
    use crate::server::util::time::helper::set_mock_now;

    #[actix_web::test]
    async fn order_flow_over_http() {
        set_mock_now(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let state = state();
        let table = state.store().create_table(7, 4, TableState::Disponible).await.unwrap();
        let item = state
            .store()
            .create_item(MenuItemRequest {
                nombre: "Enchiladas".to_string(),
                descripcion: None,
                precio: dec!(12.50),
                categoria_id: None,
            })
            .await
            .unwrap();
        let app = test::init_service(app(&state)).await;
        let waiter = bearer(&state, "mesero1", Role::Mesero).await;
        let cook = bearer(&state, "cocina1", Role::Cocina).await;

        let order_body = json!({"mesa_id": table.id, "platillos": [{"item_menu_id": item.id, "cantidad": 2}]});
        let req = test::TestRequest::post()
            .uri("/api/pedidos")
            .insert_header(("Authorization", cook.as_str()))
            .set_json(&order_body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/pedidos")
            .insert_header(("Authorization", waiter.as_str()))
            .set_json(&order_body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let id = body["pedido"]["id"].as_i64().unwrap();
        assert_eq!(body["pedido"]["estado"], "pendiente");
        assert_eq!(body["pedido"]["fecha_pedido"], "2023-11-14T22:13:20Z");

        let req = test::TestRequest::put()
            .uri(&format!("/api/pedidos/{id}"))
            .insert_header(("Authorization", cook.as_str()))
            .set_json(json!({"estado": "listo"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: MessageResponse = test::read_body_json(resp).await;
        assert_eq!(body.mensaje, "Transición no válida de 'pendiente' a 'listo'");

        let req = test::TestRequest::get()
            .uri("/api/pedidos/mesa/7")
            .insert_header(("Authorization", cook.as_str()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["mesa"], 7);
        assert_eq!(body["pedidos"].as_array().map(Vec::len), Some(1));

        let req = test::TestRequest::put()
            .uri("/api/pedidos/mesa/7")
            .insert_header(("Authorization", cook.as_str()))
            .set_json(json!({"estado": "listo"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pedidos_actualizados"], 1);
        assert_eq!(body["pedidos"][0]["estado"], "listo");

        let req = test::TestRequest::put()
            .uri(&format!("/api/pedidos/{id}"))
            .insert_header(("Authorization", waiter.as_str()))
            .set_json(json!({"estado": "entregado"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/api/pedidos/detallespedido/{id}"))
            .insert_header(("Authorization", waiter.as_str()))
            .to_request();
        let lines: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["subtotal"], json!(25.0));
    }

    #[actix_web::test]
    async fn lookups_and_bad_paths() {
        let state = state();
        let app = test::init_service(app(&state)).await;
        let waiter = bearer(&state, "mesero1", Role::Mesero).await;

        let req = test::TestRequest::get()
            .uri("/api/pedidos/mesa/99")
            .insert_header(("Authorization", waiter.as_str()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/pedidos/detallespedido/abc")
            .insert_header(("Authorization", waiter.as_str()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/pedidos?incluir_cancelados=true")
            .insert_header(("Authorization", waiter.as_str()))
            .to_request();
        let listed: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert!(listed.is_empty());
    }
}
