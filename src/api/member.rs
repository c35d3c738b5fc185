use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::member::{DESCRIPTIVE_COLUMNS, Member, member_select_list};
use crate::store::month::{member_to_sql_values, require_month};
use crate::utils::activity;
use crate::utils::db_utils::{build_insert_sql, build_update_sql, execute_insert, execute_statement};
use crate::utils::member_cache::CacheLayer;
use crate::utils::member_filter;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateMember {
    #[schema(example = "Grace Adeyemi")]
    pub name: String,
    #[schema(example = "female")]
    pub gender: Option<String>,
    #[schema(example = "+2348012345678")]
    pub phone: Option<String>,
    #[schema(example = 12)]
    pub age: Option<u16>,
    #[schema(example = "Primary 6")]
    pub level: Option<String>,
    #[schema(example = "Mrs. Adeyemi")]
    pub parent_name: Option<String>,
    #[schema(example = "+2348098765432")]
    pub parent_phone: Option<String>,
    #[schema(example = "choir")]
    pub ministry: Option<String>,
    #[serde(default)]
    pub is_visitor: bool,
    #[schema(example = "member")]
    pub badge_override: Option<String>,
    #[schema(example = "2025-11-02", format = "date", value_type = String)]
    pub joined_on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MemberQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub ministry: Option<String>,
    pub visitor: Option<bool>,
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MemberListResponse {
    pub data: Vec<Member>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Add a member to a month
#[utoipa::path(
    post,
    path = "/api/v1/months/{month}/members",
    params(
        ("month", Path, description = "Month identifier, e.g. January_2026")
    ),
    request_body = CreateMember,
    responses(
        (status = 200, description = "Member added", body = Object, example = json!({
            "message": "Member added",
            "id": 17,
            "possible_duplicate": false
        })),
        (status = 400, description = "Bad month identifier"),
        (status = 404, description = "Month not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Members"
)]
pub async fn create_member(
    pool: web::Data<MySqlPool>,
    cache: web::Data<CacheLayer>,
    path: web::Path<String>,
    payload: web::Json<CreateMember>,
) -> actix_web::Result<impl Responder> {
    let month = require_month(pool.get_ref(), &path.into_inner()).await?;
    let table = month.table_name();

    // Name already on some sheet? Advisory only, false positives possible.
    let possible_duplicate = member_filter::might_exist(&payload.name);

    let member = Member {
        id: 0,
        name: payload.name.clone(),
        gender: payload.gender.clone(),
        phone: payload.phone.clone(),
        age: payload.age,
        level: payload.level.clone(),
        parent_name: payload.parent_name.clone(),
        parent_phone: payload.parent_phone.clone(),
        ministry: payload.ministry.clone(),
        is_visitor: payload.is_visitor,
        badge: None,
        badge_override: payload.badge_override.clone(),
        joined_on: payload.joined_on,
    };

    let stmt = build_insert_sql(&table, DESCRIPTIVE_COLUMNS, member_to_sql_values(&member))?;
    let id = execute_insert(pool.get_ref(), stmt).await.map_err(|e| {
        error!(error = %e, table = %table, "Failed to add member");
        AppError::Store(e)
    })?;

    member_filter::insert(&payload.name);
    cache.invalidate_month(&table).await;
    activity::record_detached(
        pool.get_ref().clone(),
        "create_member",
        json!({ "month": month.id(), "member_id": id }),
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Member added",
        "id": id,
        "possible_duplicate": possible_duplicate
    })))
}

/// List members of a month
#[utoipa::path(
    get,
    path = "/api/v1/months/{month}/members",
    params(
        ("month", Path, description = "Month identifier, e.g. January_2026"),
        ("page", Query, description = "Page number"),
        ("per_page", Query, description = "Items per page"),
        ("ministry", Query, description = "Filter by ministry tag"),
        ("visitor", Query, description = "Filter by visitor flag"),
        ("search", Query, description = "Search by name or phone")
    ),
    responses(
        (status = 200, description = "Paginated member list", body = MemberListResponse),
        (status = 404, description = "Month not found")
    ),
    tag = "Members"
)]
pub async fn list_members(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    query: web::Query<MemberQuery>,
) -> actix_web::Result<impl Responder> {
    let month = require_month(pool.get_ref(), &path.into_inner()).await?;
    let table = month.table_name();

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(ministry) = &query.ministry {
        conditions.push("ministry LIKE ?");
        bindings.push(format!("%{}%", ministry));
    }

    if let Some(visitor) = query.visitor {
        conditions.push(if visitor {
            "is_visitor = 1"
        } else {
            "is_visitor = 0"
        });
    }

    if let Some(search) = &query.search {
        conditions.push("(name LIKE ? OR phone LIKE ?)");
        let like = format!("%{}%", search);
        bindings.push(like.clone());
        bindings.push(like);
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM `{}` {}", table, where_clause);
    debug!(sql = %count_sql, "Counting members");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }

    let total = count_query
        .fetch_one(pool.get_ref())
        .await
        .map_err(AppError::Store)?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {} FROM `{}` {} ORDER BY name LIMIT ? OFFSET ?",
        member_select_list(),
        table,
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching members");

    let mut data_query = sqlx::query_as::<_, Member>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let members = data_query
        .fetch_all(pool.get_ref())
        .await
        .map_err(AppError::Store)?;

    Ok(HttpResponse::Ok().json(MemberListResponse {
        data: members,
        page,
        per_page,
        total,
    }))
}

/// Get one member
#[utoipa::path(
    get,
    path = "/api/v1/months/{month}/members/{member_id}",
    params(
        ("month", Path, description = "Month identifier"),
        ("member_id", Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member found", body = Member),
        (status = 404, description = "Member not found")
    ),
    tag = "Members"
)]
pub async fn get_member(
    pool: web::Data<MySqlPool>,
    path: web::Path<(String, u64)>,
) -> actix_web::Result<impl Responder> {
    let (month_id, member_id) = path.into_inner();
    let month = require_month(pool.get_ref(), &month_id).await?;

    let sql = format!(
        "SELECT {} FROM `{}` WHERE id = ?",
        member_select_list(),
        month.table_name()
    );
    let member = sqlx::query_as::<_, Member>(&sql)
        .bind(member_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(AppError::Store)?
        .ok_or_else(|| AppError::NotFound(format!("member {}", member_id)))?;

    Ok(HttpResponse::Ok().json(member))
}

/// Update member fields
#[utoipa::path(
    put,
    path = "/api/v1/months/{month}/members/{member_id}",
    params(
        ("month", Path, description = "Month identifier"),
        ("member_id", Path, description = "Member ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Member updated", body = Object, example = json!({
            "message": "Member updated"
        })),
        (status = 400, description = "Unknown field in payload"),
        (status = 404, description = "Member not found")
    ),
    tag = "Members"
)]
pub async fn update_member(
    pool: web::Data<MySqlPool>,
    cache: web::Data<CacheLayer>,
    path: web::Path<(String, u64)>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let (month_id, member_id) = path.into_inner();
    let month = require_month(pool.get_ref(), &month_id).await?;
    let table = month.table_name();

    // Attendance cells have their own endpoint; only descriptive columns
    // are writable here.
    let update = build_update_sql(&table, &body, DESCRIPTIVE_COLUMNS, "id", member_id)?;

    let affected = execute_statement(pool.get_ref(), update)
        .await
        .map_err(AppError::Store)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Member not found" })));
    }

    if let Some(name) = body.get("name").and_then(|v| v.as_str()) {
        member_filter::insert(name);
    }
    cache.invalidate_month(&table).await;

    Ok(HttpResponse::Ok().json(json!({ "message": "Member updated" })))
}

/// Remove a member from a month
#[utoipa::path(
    delete,
    path = "/api/v1/months/{month}/members/{member_id}",
    params(
        ("month", Path, description = "Month identifier"),
        ("member_id", Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member removed", body = Object, example = json!({
            "message": "Member removed"
        })),
        (status = 404, description = "Member not found")
    ),
    tag = "Members"
)]
pub async fn delete_member(
    pool: web::Data<MySqlPool>,
    cache: web::Data<CacheLayer>,
    path: web::Path<(String, u64)>,
) -> actix_web::Result<impl Responder> {
    let (month_id, member_id) = path.into_inner();
    let month = require_month(pool.get_ref(), &month_id).await?;
    let table = month.table_name();

    let sql = format!("SELECT name FROM `{}` WHERE id = ?", table);
    let name = sqlx::query_scalar::<_, String>(&sql)
        .bind(member_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(AppError::Store)?;

    let Some(name) = name else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Member not found" })));
    };

    let sql = format!("DELETE FROM `{}` WHERE id = ?", table);
    sqlx::query(&sql)
        .bind(member_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, member_id, "Failed to delete member");
            AppError::Store(e)
        })?;

    member_filter::remove(&name);
    cache.invalidate_month(&table).await;
    activity::record_detached(
        pool.get_ref().clone(),
        "delete_member",
        json!({ "month": month.id(), "member_id": member_id }),
    );

    Ok(HttpResponse::Ok().json(json!({ "message": "Member removed" })))
}
