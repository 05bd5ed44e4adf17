use actix_web::{get, post, put, web, HttpResponse, Responder};
use validator::Validate;
use crate::server::auth::extractor::AuthenticatedUser;
use crate::server::controller::error::{unique_as, CustomError};
use crate::server::model::category::{CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest};
use crate::server::model::user::Role;
use crate::server::state::AppState;

const DUPLICATE_NAME: &str = "Ya existe una categoría con ese nombre";

#[get("/categorias")]
async fn get_categories(_user: AuthenticatedUser, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    Ok(web::Json(data.store().list_categories().await?))
}

#[post("/categorias")]
async fn post_category(
    user: AuthenticatedUser,
    body: web::Json<CreateCategoryRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&[Role::Administrador])?;
    body.validate()?;
    let CreateCategoryRequest { nombre, descripcion } = body.into_inner();
    let category = data
        .store()
        .create_category(nombre, descripcion)
        .await
        .map_err(unique_as(DUPLICATE_NAME))?;
    Ok(HttpResponse::Created().json(CategoryResponse {
        mensaje: "Categoría creada exitosamente".to_string(),
        categoria: category,
    }))
}

#[put("/categorias/{id}")]
/// partial update
async fn put_category(
    user: AuthenticatedUser,
    id: web::Path<i64>,
    body: web::Json<UpdateCategoryRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&[Role::Administrador])?;
    if body.is_empty() {
        return Err(CustomError::bad_request("No hay datos para actualizar"));
    }
    if body.nombre.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(CustomError::bad_request("El nombre es obligatorio"));
    }
    let category = data
        .store()
        .update_category(id.into_inner(), body.into_inner())
        .await
        .map_err(unique_as(DUPLICATE_NAME))?
        .ok_or_else(|| CustomError::not_found("Categoría no encontrada"))?;
    Ok(web::Json(CategoryResponse {
        mensaje: "Categoría actualizada exitosamente".to_string(),
        categoria: category,
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};
    use crate::server::controller::test_support::{app, bearer, state};
    use crate::server::model::user::Role;

    #[actix_web::test]
    async fn create_rename_and_reject_duplicates() {
        let state = state();
        let app = test::init_service(app(&state)).await;
        let admin = bearer(&state, "admin", Role::Administrador).await;

        for expected in [StatusCode::CREATED, StatusCode::BAD_REQUEST] {
            let req = test::TestRequest::post()
                .uri("/api/categorias")
                .insert_header(("Authorization", admin.as_str()))
                .set_json(json!({"nombre": "Bebidas"}))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), expected);
        }

        let req = test::TestRequest::get()
            .uri("/api/categorias")
            .insert_header(("Authorization", admin.as_str()))
            .to_request();
        let listed: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        let id = listed[0]["id"].as_i64().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/api/categorias/{id}"))
            .insert_header(("Authorization", admin.as_str()))
            .set_json(json!({}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri(&format!("/api/categorias/{id}"))
            .insert_header(("Authorization", admin.as_str()))
            .set_json(json!({"nombre": "Refrescos", "orden": 2}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["categoria"]["nombre"], "Refrescos");
        assert_eq!(body["categoria"]["orden"], 2);
    }
}
