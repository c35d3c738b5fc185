use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use sqlx::MySqlPool;

use crate::badge::{
    BadgeSummary, ProcessGuard, ProcessReport, badge_summary, process_month,
    recompute_member_badge,
};
use crate::store::attendance::{fetch_members, month_attendance};
use crate::store::month::require_month;
use crate::utils::member_cache::CacheLayer;

/// Run badge processing for a month
///
/// Refuses when any Sunday still has no recorded entry, and when a run for
/// the same month is already in flight. Non-qualifying members are listed
/// with a reason for outreach follow-up.
#[utoipa::path(
    post,
    path = "/api/v1/months/{month}/badges/process",
    params(
        ("month", Path, description = "Month identifier, e.g. January_2026")
    ),
    responses(
        (status = 200, description = "Processing report", body = ProcessReport),
        (status = 404, description = "Month not found"),
        (status = 409, description = "Month incomplete or processing already running", body = Object, example = json!({
            "message": "month January_2026 is not complete",
            "missing_sundays": ["2026-01-25"]
        }))
    ),
    tag = "Badges"
)]
pub async fn process(
    pool: web::Data<MySqlPool>,
    cache: web::Data<CacheLayer>,
    guard: web::Data<ProcessGuard>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let month = require_month(pool.get_ref(), &path.into_inner()).await?;
    let report = process_month(pool.get_ref(), cache.get_ref(), guard.get_ref(), &month).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// Badge counts for a month
#[utoipa::path(
    get,
    path = "/api/v1/months/{month}/badges/summary",
    params(
        ("month", Path, description = "Month identifier")
    ),
    responses(
        (status = 200, description = "Per-badge member counts", body = BadgeSummary),
        (status = 404, description = "Month not found")
    ),
    tag = "Badges"
)]
pub async fn summary(
    pool: web::Data<MySqlPool>,
    cache: web::Data<CacheLayer>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let month = require_month(pool.get_ref(), &path.into_inner()).await?;

    let members = fetch_members(pool.get_ref(), cache.get_ref(), &month.table_name()).await?;
    let matrix = month_attendance(pool.get_ref(), cache.get_ref(), &month).await?;

    Ok(HttpResponse::Ok().json(badge_summary(&members, &matrix)))
}

/// Compute one member's badge
///
/// Recomputes from raw attendance and refreshes the cached value when it
/// drifted.
#[utoipa::path(
    get,
    path = "/api/v1/months/{month}/members/{member_id}/badge",
    params(
        ("month", Path, description = "Month identifier"),
        ("member_id", Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Computed badge", body = Object, example = json!({
            "badge": "regular"
        })),
        (status = 404, description = "Month or member not found")
    ),
    tag = "Badges"
)]
pub async fn member_badge(
    pool: web::Data<MySqlPool>,
    cache: web::Data<CacheLayer>,
    path: web::Path<(String, u64)>,
) -> actix_web::Result<impl Responder> {
    let (month_id, member_id) = path.into_inner();
    let month = require_month(pool.get_ref(), &month_id).await?;

    let badge = recompute_member_badge(pool.get_ref(), cache.get_ref(), &month, member_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "badge": badge })))
}
