use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;

use crate::model::member::{Member, member_select_list};
use crate::utils::db_utils::is_safe_ident;

/// Read-side caches keyed by month table name. Short TTL, explicitly
/// invalidated on every write to that month. Lives in actix app data, not
/// at process scope, so tests and future multi-tenant setups can own their
/// own instance.
#[derive(Clone)]
pub struct CacheLayer {
    members: Cache<String, Arc<Vec<Member>>>,
    columns: Cache<String, Arc<Vec<String>>>,
}

impl CacheLayer {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            members: Cache::builder()
                .max_capacity(256) // a few years of months
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
            columns: Cache::builder()
                .max_capacity(256)
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
        }
    }

    pub async fn cached_members(&self, table: &str) -> Option<Arc<Vec<Member>>> {
        self.members.get(table).await
    }

    pub async fn store_members(&self, table: &str, members: Vec<Member>) -> Arc<Vec<Member>> {
        let members = Arc::new(members);
        self.members.insert(table.to_string(), members.clone()).await;
        members
    }

    pub async fn cached_columns(&self, table: &str) -> Option<Arc<Vec<String>>> {
        self.columns.get(table).await
    }

    pub async fn store_columns(&self, table: &str, cols: Vec<String>) -> Arc<Vec<String>> {
        let cols = Arc::new(cols);
        self.columns.insert(table.to_string(), cols.clone()).await;
        cols
    }

    /// Drop everything known about one month. Must run before the next read
    /// after any write to that month's table.
    pub async fn invalidate_month(&self, table: &str) {
        self.members.invalidate(table).await;
        self.columns.invalidate(table).await;
    }
}

/// Pre-load the member list of the most recent month so the first dashboard
/// paint after a restart doesn't pay the cold-read cost.
pub async fn warmup_member_cache(pool: &MySqlPool, cache: &CacheLayer, table: &str) -> Result<()> {
    if !is_safe_ident(table) {
        anyhow::bail!("refusing warmup for unsafe table name: {}", table);
    }

    let sql = format!(
        "SELECT {} FROM `{}` ORDER BY id",
        member_select_list(),
        table
    );
    let mut stream = sqlx::query_as::<_, Member>(&sql).fetch(pool);

    let mut members = Vec::new();
    while let Some(row) = stream.next().await {
        members.push(row?);
    }

    let total = members.len();
    cache.store_members(table, members).await;

    log::info!("Member cache warmup complete: {} members in {}", total, table);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_member(id: u64) -> Member {
        Member {
            id,
            name: format!("Member {}", id),
            gender: None,
            phone: None,
            age: None,
            level: None,
            parent_name: None,
            parent_phone: None,
            ministry: None,
            is_visitor: false,
            badge: None,
            badge_override: None,
            joined_on: None,
        }
    }

    #[actix_web::test]
    async fn invalidation_clears_both_caches() {
        let cache = CacheLayer::new(60);
        cache
            .store_members("month_january_2026", vec![sample_member(1)])
            .await;
        cache
            .store_columns("month_january_2026", vec!["d_2026_01_04".into()])
            .await;

        assert!(cache.cached_members("month_january_2026").await.is_some());
        assert!(cache.cached_columns("month_january_2026").await.is_some());

        cache.invalidate_month("month_january_2026").await;

        assert!(cache.cached_members("month_january_2026").await.is_none());
        assert!(cache.cached_columns("month_january_2026").await.is_none());
    }

    #[actix_web::test]
    async fn months_are_cached_independently() {
        let cache = CacheLayer::new(60);
        cache
            .store_members("month_january_2026", vec![sample_member(1)])
            .await;
        cache
            .store_members("month_february_2026", vec![sample_member(2)])
            .await;

        cache.invalidate_month("month_january_2026").await;

        assert!(cache.cached_members("month_january_2026").await.is_none());
        let feb = cache.cached_members("month_february_2026").await.unwrap();
        assert_eq!(feb[0].id, 2);
    }
}
