use actix_web::error::ErrorBadRequest;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

/// ===============================
/// SQL statement container
/// ===============================
#[derive(Debug)]
pub struct SqlStatement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Month tables and attendance columns are named at runtime, so every
/// identifier that ends up inside a statement must pass this check before
/// interpolation. Lowercase ascii, digits and underscores only, the shape
/// of `month_january_2026` and `d_2026_01_04`.
pub fn is_safe_ident(ident: &str) -> bool {
    !ident.is_empty()
        && ident.len() <= 64
        && ident.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && ident
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn json_to_sql_value(value: &Value) -> Result<SqlValue, actix_web::Error> {
    match value {
        Value::String(s) => {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(SqlValue::Date(d))
            } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                Ok(SqlValue::DateTime(dt))
            } else {
                Ok(SqlValue::String(s.clone()))
            }
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::I64(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::F64(f))
            } else {
                Err(ErrorBadRequest("Unsupported numeric value"))
            }
        }
        Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        Value::Null => Ok(SqlValue::Null),
        _ => Err(ErrorBadRequest("Unsupported JSON value type")),
    }
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Only keys present in `allowed_columns` may be written; anything else in
/// the payload is rejected rather than silently dropped, so a client typo
/// never becomes a no-op.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed_columns: &[&str],
    id_column: &str,
    id_value: u64,
) -> Result<SqlStatement, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    if !is_safe_ident(table) || !is_safe_ident(id_column) {
        return Err(ErrorBadRequest("Invalid identifier"));
    }

    for key in obj.keys() {
        if !allowed_columns.contains(&key.as_str()) {
            return Err(ErrorBadRequest(format!("Unknown field: {}", key)));
        }
    }

    // Build SET clause
    let set_clause = obj
        .keys()
        .map(|k| format!("`{}` = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE `{}` SET {} WHERE `{}` = ?",
        table, set_clause, id_column
    );

    let mut values = Vec::with_capacity(obj.len() + 1);
    for value in obj.values() {
        values.push(json_to_sql_value(value)?);
    }

    // WHERE id = ?
    values.push(SqlValue::I64(id_value as i64));

    Ok(SqlStatement { sql, values })
}

/// ===============================
/// Build dynamic INSERT SQL
/// ===============================
/// Used by member create and month-copy, where the column set comes from
/// `DESCRIPTIVE_COLUMNS` rather than a struct.
pub fn build_insert_sql(
    table: &str,
    columns: &[&str],
    values: Vec<SqlValue>,
) -> Result<SqlStatement, actix_web::Error> {
    if !is_safe_ident(table) || columns.is_empty() || columns.len() != values.len() {
        return Err(ErrorBadRequest("Invalid insert statement"));
    }

    let column_list = columns
        .iter()
        .map(|c| format!("`{}`", c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");

    let sql = format!(
        "INSERT INTO `{}` ({}) VALUES ({})",
        table, column_list, placeholders
    );

    Ok(SqlStatement { sql, values })
}

/// ===============================
/// Execute a built statement
/// ===============================
/// Insert variant returns the generated row id.
pub async fn execute_insert(
    pool: &MySqlPool,
    statement: SqlStatement,
) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&statement.sql);
    for value in statement.values {
        query = bind_value(query, value);
    }
    let result = query.execute(pool).await?;
    Ok(result.last_insert_id())
}

pub async fn execute_statement(
    pool: &MySqlPool,
    statement: SqlStatement,
) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&statement.sql);

    for value in statement.values {
        query = bind_value(query, value);
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    value: SqlValue,
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    match value {
        SqlValue::String(v) => query.bind(v),
        SqlValue::I64(v) => query.bind(v),
        SqlValue::F64(v) => query.bind(v),
        SqlValue::Bool(v) => query.bind(v),
        SqlValue::Date(v) => query.bind(v),
        SqlValue::DateTime(v) => query.bind(v),
        SqlValue::Null => query.bind(None::<String>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn safe_idents() {
        assert!(is_safe_ident("month_january_2026"));
        assert!(is_safe_ident("d_2026_01_04"));
        assert!(!is_safe_ident(""));
        assert!(!is_safe_ident("2026_month"));
        assert!(!is_safe_ident("month-january"));
        assert!(!is_safe_ident("members; drop table months"));
        assert!(!is_safe_ident("Month_January"));
    }

    #[test]
    fn update_sql_covers_payload_keys() {
        let payload = json!({"name": "Grace", "phone": "+23480"});
        let stmt = build_update_sql(
            "month_january_2026",
            &payload,
            &["name", "phone"],
            "id",
            7,
        )
        .unwrap();
        assert!(stmt.sql.starts_with("UPDATE `month_january_2026` SET "));
        assert!(stmt.sql.contains("`name` = ?"));
        assert!(stmt.sql.contains("`phone` = ?"));
        assert!(stmt.sql.ends_with("WHERE `id` = ?"));
        assert_eq!(stmt.values.len(), 3);
    }

    #[test]
    fn update_sql_rejects_unknown_columns() {
        let payload = json!({"badge": "regular", "drop_me": 1});
        let err = build_update_sql("month_january_2026", &payload, &["badge"], "id", 1);
        assert!(err.is_err());
    }

    #[test]
    fn update_sql_rejects_empty_payload() {
        assert!(build_update_sql("month_january_2026", &json!({}), &["name"], "id", 1).is_err());
        assert!(build_update_sql("month_january_2026", &json!([1]), &["name"], "id", 1).is_err());
    }

    #[test]
    fn date_strings_bind_as_dates() {
        let payload = json!({"joined_on": "2025-11-02"});
        let stmt =
            build_update_sql("month_january_2026", &payload, &["joined_on"], "id", 1).unwrap();
        assert!(matches!(stmt.values[0], SqlValue::Date(_)));
    }

    #[test]
    fn insert_sql_shape() {
        let stmt = build_insert_sql(
            "month_january_2026",
            &["name", "is_visitor"],
            vec![SqlValue::String("Grace".into()), SqlValue::Bool(false)],
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO `month_january_2026` (`name`, `is_visitor`) VALUES (?, ?)"
        );
    }

    #[test]
    fn insert_sql_arity_check() {
        assert!(build_insert_sql("t", &["a", "b"], vec![SqlValue::Null]).is_err());
    }
}
