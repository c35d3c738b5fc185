use sqlx::MySqlPool;

pub async fn init_db(database_url: &str) -> MySqlPool {
    MySqlPool::connect(database_url)
        .await
        .expect("Failed to connect to database")
}

/// Fixed tables the service needs before any month exists: the month
/// registry, the template every month table is cloned from, and the
/// activity log. Month tables themselves are provisioned at runtime.
pub async fn bootstrap_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS months (
            id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            month_name VARCHAR(16) NOT NULL,
            year INT NOT NULL,
            month_index INT UNSIGNED NOT NULL,
            table_name VARCHAR(64) NOT NULL UNIQUE,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS member_template (
            id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(191) NOT NULL,
            gender VARCHAR(16) NULL,
            phone VARCHAR(32) NULL,
            age SMALLINT UNSIGNED NULL,
            level VARCHAR(64) NULL,
            parent_name VARCHAR(191) NULL,
            parent_phone VARCHAR(32) NULL,
            ministry VARCHAR(191) NULL,
            is_visitor TINYINT(1) NOT NULL DEFAULT 0,
            badge VARCHAR(16) NULL,
            badge_override VARCHAR(16) NULL,
            joined_on DATE NULL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activity_log (
            id CHAR(36) NOT NULL PRIMARY KEY,
            action VARCHAR(64) NOT NULL,
            detail TEXT NULL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
