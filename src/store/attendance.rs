use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{MySqlPool, Row};
use tracing::debug;

use crate::error::AppError;
use crate::model::badge::AttendanceStatus;
use crate::model::member::{Member, member_select_list};
use crate::model::month::MonthRef;
use crate::utils::db_utils::is_safe_ident;
use crate::utils::member_cache::CacheLayer;
use crate::utils::sundays::{attendance_field_id, is_field_for_date, parse_field_id};

/// Full member × Sunday attendance picture for one month. Statuses are
/// aligned with `sundays`; a Sunday whose column was never provisioned
/// reads as `Unset` for everyone.
#[derive(Debug)]
pub struct AttendanceMatrix {
    pub sundays: Vec<NaiveDate>,
    pub by_member: HashMap<u64, Vec<AttendanceStatus>>,
}

/// Pick the existing column holding attendance for `date`, if any.
pub fn resolve_field(columns: &[String], date: NaiveDate) -> Option<String> {
    columns
        .iter()
        .find(|c| is_field_for_date(c, date))
        .cloned()
}

/// Attendance columns of a month table, via schema introspection. Cached
/// per table with the configured TTL.
pub async fn attendance_columns(
    pool: &MySqlPool,
    cache: &CacheLayer,
    table: &str,
) -> Result<Arc<Vec<String>>, AppError> {
    if let Some(cols) = cache.cached_columns(table).await {
        return Ok(cols);
    }

    let rows = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT column_name
        FROM information_schema.columns
        WHERE table_schema = DATABASE()
          AND table_name = ?
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    let cols: Vec<String> = rows
        .into_iter()
        .map(|(c,)| c)
        .filter(|c| parse_field_id(c).is_some())
        .collect();

    Ok(cache.store_columns(table, cols).await)
}

/// Members of a month, cached per table.
pub async fn fetch_members(
    pool: &MySqlPool,
    cache: &CacheLayer,
    table: &str,
) -> Result<Arc<Vec<Member>>, AppError> {
    if !is_safe_ident(table) {
        return Err(AppError::Validation(format!("bad table name: {}", table)));
    }

    if let Some(members) = cache.cached_members(table).await {
        return Ok(members);
    }

    let sql = format!(
        "SELECT {} FROM `{}` ORDER BY id",
        member_select_list(),
        table
    );
    let members = sqlx::query_as::<_, Member>(&sql).fetch_all(pool).await?;

    Ok(cache.store_members(table, members).await)
}

/// Create the attendance column for `date` if it does not exist yet and
/// return its name. Provisioning failure is its own error kind: it usually
/// means the credentials lack ALTER, not that the write was bad.
pub async fn ensure_field(
    pool: &MySqlPool,
    cache: &CacheLayer,
    table: &str,
    date: NaiveDate,
) -> Result<String, AppError> {
    let columns = attendance_columns(pool, cache, table).await?;
    if let Some(field) = resolve_field(&columns, date) {
        return Ok(field);
    }

    let field = attendance_field_id(date);
    debug!(table, field = %field, "provisioning attendance column");

    let sql = format!("ALTER TABLE `{}` ADD COLUMN `{}` TINYINT(1) NULL", table, field);
    sqlx::query(&sql)
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, table, field = %field, "attendance column provisioning failed");
            AppError::CannotCreateField(field.clone())
        })?;

    cache.invalidate_month(table).await;
    Ok(field)
}

/// Attendance value for one (member, date) cell. A date that has no column
/// yet is simply `Unset`; reads never provision.
pub async fn get_attendance(
    pool: &MySqlPool,
    cache: &CacheLayer,
    month: &MonthRef,
    member_id: u64,
    date: NaiveDate,
) -> Result<AttendanceStatus, AppError> {
    let table = month.table_name();
    let columns = attendance_columns(pool, cache, &table).await?;

    let Some(field) = resolve_field(&columns, date) else {
        return Ok(AttendanceStatus::Unset);
    };

    let sql = format!("SELECT `{}` FROM `{}` WHERE id = ?", field, table);
    let value = sqlx::query_scalar::<_, Option<bool>>(&sql)
        .bind(member_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("member {}", member_id)))?;

    Ok(AttendanceStatus::from_db(value))
}

async fn member_exists(pool: &MySqlPool, table: &str, member_id: u64) -> Result<bool, AppError> {
    let sql = format!("SELECT id FROM `{}` WHERE id = ?", table);
    let found = sqlx::query_scalar::<_, u64>(&sql)
        .bind(member_id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Write one attendance value, provisioning the column on first use.
/// Writing the same status twice is a no-op; `Unset` clears the cell.
/// Only Sundays inside the month's own range are accepted. The UI is
/// supposed to prevent anything else, but this layer does not trust it.
pub async fn set_attendance(
    pool: &MySqlPool,
    cache: &CacheLayer,
    month: &MonthRef,
    member_id: u64,
    date: NaiveDate,
    status: AttendanceStatus,
) -> Result<(), AppError> {
    if !month.sundays().contains(&date) {
        return Err(AppError::Validation(format!(
            "{} is not a Sunday of {}",
            date,
            month.id()
        )));
    }

    let table = month.table_name();
    if !member_exists(pool, &table, member_id).await? {
        return Err(AppError::NotFound(format!("member {}", member_id)));
    }

    let field = ensure_field(pool, cache, &table, date).await?;
    write_status(pool, &table, &field, member_id, status).await?;

    cache.invalidate_month(&table).await;
    Ok(())
}

async fn write_status(
    pool: &MySqlPool,
    table: &str,
    field: &str,
    member_id: u64,
    status: AttendanceStatus,
) -> Result<(), AppError> {
    let sql = format!("UPDATE `{}` SET `{}` = ? WHERE id = ?", table, field);
    sqlx::query(&sql)
        .bind(status.to_db())
        .bind(member_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// One date, many members. No rollback: writes that succeeded stay, failed
/// member ids come back as `PartialFailure` so the caller can retry those.
pub async fn bulk_set_attendance(
    pool: &MySqlPool,
    cache: &CacheLayer,
    month: &MonthRef,
    member_ids: &[u64],
    date: NaiveDate,
    status: AttendanceStatus,
) -> Result<usize, AppError> {
    if !month.sundays().contains(&date) {
        return Err(AppError::Validation(format!(
            "{} is not a Sunday of {}",
            date,
            month.id()
        )));
    }

    let table = month.table_name();
    let field = ensure_field(pool, cache, &table, date).await?;

    let mut failed = Vec::new();
    let mut written = 0usize;
    for &member_id in member_ids {
        let ok = match member_exists(pool, &table, member_id).await {
            Ok(true) => write_status(pool, &table, &field, member_id, status)
                .await
                .is_ok(),
            _ => false,
        };
        if ok {
            written += 1;
        } else {
            failed.push(member_id);
        }
    }

    cache.invalidate_month(&table).await;

    if !failed.is_empty() {
        return Err(AppError::PartialFailure { failed });
    }
    Ok(written)
}

/// Status of every member for one date.
pub async fn list_attendance_for_date(
    pool: &MySqlPool,
    cache: &CacheLayer,
    month: &MonthRef,
    date: NaiveDate,
) -> Result<HashMap<u64, AttendanceStatus>, AppError> {
    let table = month.table_name();
    let members = fetch_members(pool, cache, &table).await?;
    let columns = attendance_columns(pool, cache, &table).await?;

    let Some(field) = resolve_field(&columns, date) else {
        return Ok(members
            .iter()
            .map(|m| (m.id, AttendanceStatus::Unset))
            .collect());
    };

    let sql = format!("SELECT id, `{}` FROM `{}`", field, table);
    let rows = sqlx::query_as::<_, (u64, Option<bool>)>(&sql)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(id, v)| (id, AttendanceStatus::from_db(v)))
        .collect())
}

/// The whole month at once, for the badge engine and the dashboard grid.
pub async fn month_attendance(
    pool: &MySqlPool,
    cache: &CacheLayer,
    month: &MonthRef,
) -> Result<AttendanceMatrix, AppError> {
    let table = month.table_name();
    let sundays = month.sundays();
    let columns = attendance_columns(pool, cache, &table).await?;

    // Per-Sunday column name, where one exists at all.
    let fields: Vec<Option<String>> = sundays
        .iter()
        .map(|&d| resolve_field(&columns, d))
        .collect();

    let existing: Vec<&String> = fields.iter().flatten().collect();
    let select = if existing.is_empty() {
        "id".to_string()
    } else {
        let cols = existing
            .iter()
            .map(|c| format!("`{}`", c))
            .collect::<Vec<_>>()
            .join(", ");
        format!("id, {}", cols)
    };

    let sql = format!("SELECT {} FROM `{}`", select, table);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    let mut by_member = HashMap::with_capacity(rows.len());
    for row in rows {
        let id: u64 = row.try_get("id")?;
        let mut statuses = Vec::with_capacity(sundays.len());
        for field in &fields {
            let status = match field {
                Some(name) => AttendanceStatus::from_db(row.try_get(name.as_str())?),
                None => AttendanceStatus::Unset,
            };
            statuses.push(status);
        }
        by_member.insert(id, statuses);
    }

    Ok(AttendanceMatrix { sundays, by_member })
}

/// Per-date recorded counts, for the Sundays grid header.
pub fn recorded_per_date(matrix: &AttendanceMatrix) -> BTreeMap<NaiveDate, usize> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for (i, &date) in matrix.sundays.iter().enumerate() {
        let recorded = matrix
            .by_member
            .values()
            .filter(|s| s[i].is_recorded())
            .count();
        counts.insert(date, recorded);
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn resolve_field_matches_only_exact_date() {
        let columns = vec![
            "d_2026_01_04".to_string(),
            "d_2026_01_11".to_string(),
            "name".to_string(),
        ];
        assert_eq!(
            resolve_field(&columns, d(2026, 1, 4)),
            Some("d_2026_01_04".to_string())
        );
        assert_eq!(resolve_field(&columns, d(2026, 1, 18)), None);
        // A column from another month never matches, even on the same day
        // of month.
        assert_eq!(resolve_field(&columns, d(2026, 2, 4)), None);
    }

    #[test]
    fn recorded_counts_skip_unset() {
        use AttendanceStatus::*;
        let matrix = AttendanceMatrix {
            sundays: vec![d(2026, 1, 4), d(2026, 1, 11)],
            by_member: HashMap::from([
                (1, vec![Present, Unset]),
                (2, vec![Absent, Unset]),
                (3, vec![Unset, Unset]),
            ]),
        };
        let counts = recorded_per_date(&matrix);
        assert_eq!(counts[&d(2026, 1, 4)], 2);
        assert_eq!(counts[&d(2026, 1, 11)], 0);
    }
}
