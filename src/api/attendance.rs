use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::badge::{is_month_complete, missing_sundays, recompute_member_badge};
use crate::error::AppError;
use crate::model::badge::AttendanceStatus;
use crate::store::attendance::{
    bulk_set_attendance, fetch_members, get_attendance, list_attendance_for_date,
    month_attendance, recorded_per_date, set_attendance,
};
use crate::store::month::require_month;
use crate::utils::activity;
use crate::utils::member_cache::CacheLayer;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct MarkAttendance {
    #[schema(example = 17)]
    pub member_id: u64,
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "present")]
    pub status: AttendanceStatus,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct BulkMarkAttendance {
    #[schema(example = json!([17, 18, 19]))]
    pub member_ids: Vec<u64>,
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "present")]
    pub status: AttendanceStatus,
}

#[derive(Serialize, ToSchema)]
pub struct MemberAttendanceEntry {
    #[schema(example = 17)]
    pub member_id: u64,
    #[schema(example = "Grace Adeyemi")]
    pub name: String,
    #[schema(example = "present")]
    pub status: AttendanceStatus,
}

#[derive(Serialize, ToSchema)]
pub struct SundayOverview {
    #[schema(example = "2026-01-04", value_type = String, format = "date")]
    pub date: NaiveDate,
    /// Members with a recorded (non-unset) value for this date.
    #[schema(example = 23)]
    pub recorded: usize,
}

#[derive(Serialize, ToSchema)]
pub struct MonthOverview {
    pub sundays: Vec<SundayOverview>,
    /// True once every Sunday has at least one recorded entry.
    pub complete: bool,
    #[schema(value_type = Vec<String>, example = json!(["2026-01-25"]))]
    pub missing_sundays: Vec<NaiveDate>,
}

/// Mark attendance for one member and date
///
/// The member's cached badge is recomputed right after the write.
#[utoipa::path(
    put,
    path = "/api/v1/months/{month}/attendance",
    params(
        ("month", Path, description = "Month identifier, e.g. January_2026")
    ),
    request_body = MarkAttendance,
    responses(
        (status = 200, description = "Attendance recorded", body = Object, example = json!({
            "message": "Attendance recorded",
            "badge": "regular"
        })),
        (status = 400, description = "Date is not a Sunday of this month"),
        (status = 404, description = "Month or member not found"),
        (status = 500, description = "Field provisioning or write failure")
    ),
    tag = "Attendance"
)]
pub async fn mark(
    pool: web::Data<MySqlPool>,
    cache: web::Data<CacheLayer>,
    path: web::Path<String>,
    payload: web::Json<MarkAttendance>,
) -> actix_web::Result<impl Responder> {
    let month = require_month(pool.get_ref(), &path.into_inner()).await?;

    set_attendance(
        pool.get_ref(),
        cache.get_ref(),
        &month,
        payload.member_id,
        payload.date,
        payload.status,
    )
    .await?;

    let badge = recompute_member_badge(pool.get_ref(), cache.get_ref(), &month, payload.member_id)
        .await?;

    activity::record_detached(
        pool.get_ref().clone(),
        "mark_attendance",
        json!({
            "month": month.id(),
            "member_id": payload.member_id,
            "date": payload.date,
            "status": payload.status,
        }),
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance recorded",
        "badge": badge
    })))
}

/// Mark one date for many members
///
/// No rollback on partial failure: writes that succeeded stay and the
/// response lists the member ids that failed, so the caller retries those.
#[utoipa::path(
    post,
    path = "/api/v1/months/{month}/attendance",
    params(
        ("month", Path, description = "Month identifier")
    ),
    request_body = BulkMarkAttendance,
    responses(
        (status = 200, description = "All writes applied", body = Object, example = json!({
            "message": "Attendance recorded",
            "written": 3
        })),
        (status = 400, description = "Date is not a Sunday of this month"),
        (status = 500, description = "Some writes failed", body = Object, example = json!({
            "message": "2 attendance writes failed",
            "failed_member_ids": [18, 19]
        }))
    ),
    tag = "Attendance"
)]
pub async fn bulk_mark(
    pool: web::Data<MySqlPool>,
    cache: web::Data<CacheLayer>,
    path: web::Path<String>,
    payload: web::Json<BulkMarkAttendance>,
) -> actix_web::Result<impl Responder> {
    let month = require_month(pool.get_ref(), &path.into_inner()).await?;

    let written = bulk_set_attendance(
        pool.get_ref(),
        cache.get_ref(),
        &month,
        &payload.member_ids,
        payload.date,
        payload.status,
    )
    .await?;

    for &member_id in &payload.member_ids {
        recompute_member_badge(pool.get_ref(), cache.get_ref(), &month, member_id).await?;
    }

    activity::record_detached(
        pool.get_ref().clone(),
        "bulk_mark_attendance",
        json!({
            "month": month.id(),
            "date": payload.date,
            "status": payload.status,
            "written": written,
        }),
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance recorded",
        "written": written
    })))
}

/// Attendance of every member for one date
#[utoipa::path(
    get,
    path = "/api/v1/months/{month}/attendance/{date}",
    params(
        ("month", Path, description = "Month identifier"),
        ("date", Path, description = "Calendar date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Per-member statuses", body = [MemberAttendanceEntry]),
        (status = 400, description = "Bad date"),
        (status = 404, description = "Month not found")
    ),
    tag = "Attendance"
)]
pub async fn list_for_date(
    pool: web::Data<MySqlPool>,
    cache: web::Data<CacheLayer>,
    path: web::Path<(String, String)>,
) -> actix_web::Result<impl Responder> {
    let (month_id, date) = path.into_inner();
    let month = require_month(pool.get_ref(), &month_id).await?;
    let date: NaiveDate = date
        .parse()
        .map_err(|_| AppError::Validation(format!("bad date: {}", date)))?;

    let statuses = list_attendance_for_date(pool.get_ref(), cache.get_ref(), &month, date).await?;
    let members = fetch_members(pool.get_ref(), cache.get_ref(), &month.table_name()).await?;

    let entries: Vec<MemberAttendanceEntry> = members
        .iter()
        .map(|m| MemberAttendanceEntry {
            member_id: m.id,
            name: m.name.clone(),
            status: statuses
                .get(&m.id)
                .copied()
                .unwrap_or(AttendanceStatus::Unset),
        })
        .collect();

    Ok(HttpResponse::Ok().json(entries))
}

/// Attendance of one member for one date
///
/// A date without a provisioned column reads as `unset`; reads never
/// create columns.
#[utoipa::path(
    get,
    path = "/api/v1/months/{month}/members/{member_id}/attendance/{date}",
    params(
        ("month", Path, description = "Month identifier"),
        ("member_id", Path, description = "Member ID"),
        ("date", Path, description = "Calendar date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Attendance value", body = Object, example = json!({
            "status": "unset"
        })),
        (status = 400, description = "Bad date"),
        (status = 404, description = "Month or member not found")
    ),
    tag = "Attendance"
)]
pub async fn member_status(
    pool: web::Data<MySqlPool>,
    cache: web::Data<CacheLayer>,
    path: web::Path<(String, u64, String)>,
) -> actix_web::Result<impl Responder> {
    let (month_id, member_id, date) = path.into_inner();
    let month = require_month(pool.get_ref(), &month_id).await?;
    let date: NaiveDate = date
        .parse()
        .map_err(|_| AppError::Validation(format!("bad date: {}", date)))?;

    let status = get_attendance(pool.get_ref(), cache.get_ref(), &month, member_id, date).await?;

    Ok(HttpResponse::Ok().json(json!({ "status": status })))
}

/// Sundays of a month with recording progress
///
/// Drives the dashboard grid header and the badge-processing gate.
#[utoipa::path(
    get,
    path = "/api/v1/months/{month}/sundays",
    params(
        ("month", Path, description = "Month identifier")
    ),
    responses(
        (status = 200, description = "Sundays and completeness", body = MonthOverview),
        (status = 404, description = "Month not found")
    ),
    tag = "Attendance"
)]
pub async fn sundays_overview(
    pool: web::Data<MySqlPool>,
    cache: web::Data<CacheLayer>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let month = require_month(pool.get_ref(), &path.into_inner()).await?;

    let matrix = month_attendance(pool.get_ref(), cache.get_ref(), &month).await?;
    let counts = recorded_per_date(&matrix);

    let overview = MonthOverview {
        sundays: matrix
            .sundays
            .iter()
            .map(|&date| SundayOverview {
                date,
                recorded: counts.get(&date).copied().unwrap_or(0),
            })
            .collect(),
        complete: is_month_complete(&matrix),
        missing_sundays: missing_sundays(&matrix),
    };

    Ok(HttpResponse::Ok().json(overview))
}
