use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::config::Config;
use crate::error::AppError;
use crate::model::badge::CopyMode;
use crate::model::month::{MonthName, MonthRecord, MonthRef};
use crate::store::month::{CreateMonthOutcome, create_month, list_months};
use crate::utils::member_cache::CacheLayer;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateMonthRequest {
    #[schema(example = "February")]
    pub month: String,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = "custom")]
    pub copy_mode: CopyMode,
    /// Only read under `copy_mode = custom`.
    #[serde(default)]
    #[schema(example = json!([1, 3]))]
    pub member_ids: Vec<u64>,
}

/// Create a new month
///
/// Seeds the new sheet from the most recent month per `copy_mode`. Creating
/// a month that already exists is a no-op success.
#[utoipa::path(
    post,
    path = "/api/v1/months",
    request_body = CreateMonthRequest,
    responses(
        (status = 200, description = "Month provisioned (or already present)", body = CreateMonthOutcome),
        (status = 400, description = "Unknown month name"),
        (status = 503, description = "Month table never became ready")
    ),
    tag = "Months"
)]
pub async fn create(
    pool: web::Data<MySqlPool>,
    cache: web::Data<CacheLayer>,
    config: web::Data<Config>,
    payload: web::Json<CreateMonthRequest>,
) -> actix_web::Result<impl Responder> {
    let name: MonthName = payload
        .month
        .parse()
        .map_err(|_| AppError::Validation(format!("unknown month name: {}", payload.month)))?;
    if !(1970..=9999).contains(&payload.year) {
        return Err(AppError::Validation(format!("bad year: {}", payload.year)).into());
    }

    let month = MonthRef::new(name, payload.year);
    let outcome = create_month(
        pool.get_ref(),
        cache.get_ref(),
        &month,
        payload.copy_mode,
        &payload.member_ids,
        config.table_ready_retries,
        config.table_ready_backoff_ms,
    )
    .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// List registered months
///
/// Oldest first: year, then calendar order. This is the navigation list.
#[utoipa::path(
    get,
    path = "/api/v1/months",
    responses(
        (status = 200, description = "Registered months", body = [MonthRecord])
    ),
    tag = "Months"
)]
pub async fn list(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let months = list_months(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(months))
}
