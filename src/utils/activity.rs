use serde_json::Value;
use sqlx::MySqlPool;
use uuid::Uuid;

/// Append one row to the activity log. Best-effort: a failed log write is
/// logged and swallowed, it never fails the operation that triggered it.
pub async fn record(pool: &MySqlPool, action: &str, detail: Value) {
    let id = Uuid::new_v4().to_string();
    let result = sqlx::query(
        "INSERT INTO activity_log (id, action, detail) VALUES (?, ?, ?)",
    )
    .bind(&id)
    .bind(action)
    .bind(detail.to_string())
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(error = %e, action, "failed to write activity log entry");
    }
}

/// Fire-and-forget variant for request handlers.
pub fn record_detached(pool: MySqlPool, action: &'static str, detail: Value) {
    actix_web::rt::spawn(async move {
        record(&pool, action, detail).await;
    });
}
