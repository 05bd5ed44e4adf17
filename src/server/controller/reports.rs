use actix_web::{get, web, Responder};
use crate::server::auth::extractor::AuthenticatedUser;
use crate::server::controller::error::CustomError;
use crate::server::model::report::ReportParams;
use crate::server::model::user::Role;
use crate::server::service;
use crate::server::state::AppState;

#[get("/reportes")]
/// paid sales of a business day or an inclusive range of them
async fn get_report(
    user: AuthenticatedUser,
    params: web::Query<ReportParams>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    user.require_role(&[Role::Administrador])?;
    let report = service::reports::sales_report(data.store(), params.fecha.as_deref()).await?;
    Ok(web::Json(report))
}
