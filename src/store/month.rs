use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::badge::CopyMode;
use crate::model::member::{DESCRIPTIVE_COLUMNS, Member};
use crate::model::month::{MonthRecord, MonthRef};
use crate::store::attendance::{ensure_field, fetch_members};
use crate::utils::activity;
use crate::utils::db_utils::{SqlValue, build_insert_sql, execute_statement};
use crate::utils::member_cache::CacheLayer;
use crate::utils::member_filter;

/// Table every month sheet is cloned from.
pub const MEMBER_TEMPLATE_TABLE: &str = "member_template";

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateMonthOutcome {
    #[schema(example = "January_2026")]
    pub month: String,
    #[schema(example = "month_january_2026")]
    pub table: String,
    /// False when the month already existed and the call was a no-op.
    pub created: bool,
    #[schema(example = 34)]
    pub copied_members: usize,
}

/// Which members of the source month a copy mode takes. `custom` with an
/// empty selection degrades to `empty`.
pub fn plan_copy<'a>(
    source_members: &'a [Member],
    mode: CopyMode,
    selected_ids: &[u64],
) -> Vec<&'a Member> {
    match mode {
        CopyMode::All => source_members.iter().collect(),
        CopyMode::Custom => source_members
            .iter()
            .filter(|m| selected_ids.contains(&m.id))
            .collect(),
        CopyMode::Empty => Vec::new(),
    }
}

/// Values for inserting a copied member, aligned with
/// [`DESCRIPTIVE_COLUMNS`]. Attendance columns stay untouched (NULL = unset)
/// and the cached badge resets, since it is derived state the engine
/// recomputes; a manual override travels with the member.
pub fn member_to_sql_values(member: &Member) -> Vec<SqlValue> {
    fn opt_str(v: &Option<String>) -> SqlValue {
        v.clone().map(SqlValue::String).unwrap_or(SqlValue::Null)
    }

    vec![
        SqlValue::String(member.name.clone()),
        opt_str(&member.gender),
        opt_str(&member.phone),
        member
            .age
            .map(|a| SqlValue::I64(a as i64))
            .unwrap_or(SqlValue::Null),
        opt_str(&member.level),
        opt_str(&member.parent_name),
        opt_str(&member.parent_phone),
        opt_str(&member.ministry),
        SqlValue::Bool(member.is_visitor),
        SqlValue::Null, // badge: derived, reset on copy
        opt_str(&member.badge_override),
        member
            .joined_on
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null),
    ]
}

/// All registered months, oldest first (year, then calendar index).
pub async fn list_months(pool: &MySqlPool) -> Result<Vec<MonthRecord>, AppError> {
    let months = sqlx::query_as::<_, MonthRecord>(
        "SELECT id, month_name, year, month_index, table_name FROM months \
         ORDER BY year, month_index",
    )
    .fetch_all(pool)
    .await?;
    Ok(months)
}

/// Most recently existing month, used as the copy source for new months.
pub async fn latest_month(pool: &MySqlPool) -> Result<Option<MonthRecord>, AppError> {
    let month = sqlx::query_as::<_, MonthRecord>(
        "SELECT id, month_name, year, month_index, table_name FROM months \
         ORDER BY year DESC, month_index DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(month)
}

pub async fn month_registered(pool: &MySqlPool, month: &MonthRef) -> Result<bool, AppError> {
    let found = sqlx::query_scalar::<_, u64>("SELECT id FROM months WHERE table_name = ?")
        .bind(month.table_name())
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Resolve a `January_2026` path segment to a registered month.
pub async fn require_month(pool: &MySqlPool, id: &str) -> Result<MonthRef, AppError> {
    let month = MonthRef::parse(id)
        .ok_or_else(|| AppError::Validation(format!("bad month identifier: {}", id)))?;
    if !month_registered(pool, &month).await? {
        return Err(AppError::NotFound(format!("month {}", month.id())));
    }
    Ok(month)
}

async fn table_exists(pool: &MySqlPool, table: &str) -> Result<bool, AppError> {
    let found = sqlx::query_scalar::<_, String>(
        r#"
        SELECT table_name
        FROM information_schema.tables
        WHERE table_schema = DATABASE()
          AND table_name = ?
        "#,
    )
    .bind(table)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

/// A freshly created table is not always queryable immediately. Poll with a
/// fixed backoff; give up with `NotReady` once the budget is gone.
async fn wait_until_ready(
    pool: &MySqlPool,
    table: &str,
    retries: u32,
    backoff_ms: u64,
) -> Result<(), AppError> {
    for attempt in 0..retries {
        if table_exists(pool, table).await? {
            return Ok(());
        }
        warn!(table, attempt, "month table not queryable yet, retrying");
        actix_web::rt::time::sleep(Duration::from_millis(backoff_ms)).await;
    }
    Err(AppError::NotReady(table.to_string()))
}

/// Provision a new month: clone the template table, seed one attendance
/// column per Sunday, copy members from the most recent month per
/// `copy_mode`, then register the month for navigation. Calling it again
/// for an existing month is a no-op success, double-submission from the UI
/// happens.
pub async fn create_month(
    pool: &MySqlPool,
    cache: &CacheLayer,
    month: &MonthRef,
    copy_mode: CopyMode,
    selected_ids: &[u64],
    ready_retries: u32,
    ready_backoff_ms: u64,
) -> Result<CreateMonthOutcome, AppError> {
    let table = month.table_name();

    if month_registered(pool, month).await? {
        return Ok(CreateMonthOutcome {
            month: month.id(),
            table,
            created: false,
            copied_members: 0,
        });
    }

    let source = latest_month(pool).await?;

    let sql = format!(
        "CREATE TABLE IF NOT EXISTS `{}` LIKE `{}`",
        table, MEMBER_TEMPLATE_TABLE
    );
    sqlx::query(&sql).execute(pool).await?;

    wait_until_ready(pool, &table, ready_retries, ready_backoff_ms).await?;

    // One column per Sunday up front. The attendance adapter still
    // provisions lazily, so a partially-seeded sheet behaves the same.
    for sunday in month.sundays() {
        ensure_field(pool, cache, &table, sunday).await?;
    }

    let mut copied = 0usize;
    if copy_mode != CopyMode::Empty {
        if let Some(source) = source.as_ref().and_then(|r| r.month_ref()) {
            let source_members = fetch_members(pool, cache, &source.table_name()).await?;
            for member in plan_copy(&source_members, copy_mode, selected_ids) {
                let stmt = build_insert_sql(
                    &table,
                    DESCRIPTIVE_COLUMNS,
                    member_to_sql_values(member),
                )
                .map_err(|_| AppError::Validation("bad member copy payload".to_string()))?;
                execute_statement(pool, stmt).await?;
                member_filter::insert(&member.name);
                copied += 1;
            }
        }
    }

    sqlx::query(
        "INSERT INTO months (month_name, year, month_index, table_name) VALUES (?, ?, ?, ?)",
    )
    .bind(month.name.to_string())
    .bind(month.year)
    .bind(month.name.index())
    .bind(&table)
    .execute(pool)
    .await?;

    cache.invalidate_month(&table).await;

    info!(month = %month.id(), copied, ?copy_mode, "month provisioned");
    activity::record(
        pool,
        "create_month",
        json!({
            "month": month.id(),
            "copy_mode": copy_mode.to_string(),
            "copied_members": copied,
        }),
    )
    .await;

    Ok(CreateMonthOutcome {
        month: month.id(),
        table,
        created: true,
        copied_members: copied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: u64, name: &str) -> Member {
        Member {
            id,
            name: name.to_string(),
            gender: None,
            phone: Some("+23480".to_string()),
            age: Some(11),
            level: None,
            parent_name: None,
            parent_phone: None,
            ministry: Some("choir".to_string()),
            is_visitor: false,
            badge: Some("regular".to_string()),
            badge_override: None,
            joined_on: None,
        }
    }

    #[test]
    fn copy_plan_modes() {
        let source = vec![
            member(1, "A"),
            member(2, "B"),
            member(3, "C"),
            member(4, "D"),
        ];

        let all = plan_copy(&source, CopyMode::All, &[]);
        assert_eq!(all.len(), 4);

        let custom = plan_copy(&source, CopyMode::Custom, &[1, 3]);
        assert_eq!(
            custom.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![1, 3]
        );

        assert!(plan_copy(&source, CopyMode::Empty, &[]).is_empty());
        // Custom with nothing selected is the same as empty.
        assert!(plan_copy(&source, CopyMode::Custom, &[]).is_empty());
        // Unknown ids are ignored rather than invented.
        assert!(plan_copy(&source, CopyMode::Custom, &[99]).is_empty());
    }

    #[test]
    fn copied_member_resets_derived_badge_only() {
        let m = member(1, "A");
        let values = member_to_sql_values(&m);
        assert_eq!(values.len(), DESCRIPTIVE_COLUMNS.len());

        let badge_idx = DESCRIPTIVE_COLUMNS
            .iter()
            .position(|c| *c == "badge")
            .unwrap();
        assert!(matches!(values[badge_idx], SqlValue::Null));

        // Descriptive fields survive the copy.
        let name_idx = DESCRIPTIVE_COLUMNS
            .iter()
            .position(|c| *c == "name")
            .unwrap();
        assert!(matches!(&values[name_idx], SqlValue::String(s) if s == "A"));
        let ministry_idx = DESCRIPTIVE_COLUMNS
            .iter()
            .position(|c| *c == "ministry")
            .unwrap();
        assert!(matches!(&values[ministry_idx], SqlValue::String(s) if s == "choir"));
    }
}
