use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

use crate::utils::db_utils::is_safe_ident;

/// Expected capacity and false-positive rate.
/// A congregation sheet rarely passes a few thousand names.
const FILTER_CAPACITY: usize = 50_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Names already on any month sheet. Lets member creation answer "have we
/// seen this name before?" without a table scan; false positives possible,
/// so the hint is advisory only.
static MEMBER_NAME_FILTER: Lazy<RwLock<CuckooFilter<String>>> = Lazy::new(|| {
    RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE))
});

#[inline]
fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Check if a member name might already exist (false positives possible)
pub fn might_exist(name: &str) -> bool {
    let name = normalize(name);
    MEMBER_NAME_FILTER
        .read()
        .expect("member name filter poisoned")
        .contains(&name)
}

/// Insert a single member name into the filter
pub fn insert(name: &str) {
    let name = normalize(name);
    MEMBER_NAME_FILTER
        .write()
        .expect("member name filter poisoned")
        .add(&name);
}

/// Remove a member name from the filter
pub fn remove(name: &str) {
    let name = normalize(name);
    MEMBER_NAME_FILTER
        .write()
        .expect("member name filter poisoned")
        .remove(&name);
}

/// Warm up the name filter from one month table using streaming + batching
pub async fn warmup_member_filter(
    pool: &MySqlPool,
    table: &str,
    batch_size: usize,
) -> Result<()> {
    if !is_safe_ident(table) {
        return Err(anyhow!("unsafe table name: {}", table));
    }

    let sql = format!("SELECT name FROM `{}`", table);
    let mut stream = sqlx::query_as::<_, (String,)>(&sql).fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (name,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&name));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("Member name filter warmup complete: {} names from {}", total, table);
    Ok(())
}

/// Insert a batch of normalized names
fn insert_batch(names: &[String]) {
    let mut filter = MEMBER_NAME_FILTER
        .write()
        .expect("member name filter poisoned");

    for name in names {
        filter.add(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_and_whitespace_insensitive() {
        insert("Grace Adeyemi");
        assert!(might_exist("grace adeyemi"));
        assert!(might_exist("  Grace Adeyemi "));
        remove("Grace Adeyemi");
    }
}
