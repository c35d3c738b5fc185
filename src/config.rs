use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,

    /// TTL for the per-month member/column caches, seconds.
    pub cache_ttl_secs: u64,

    /// Readiness polling for freshly provisioned month tables.
    pub table_ready_retries: u32,
    pub table_ready_backoff_ms: u64,

    // Rate limiting
    pub rate_write_per_min: u32,
    pub rate_read_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),

            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string()) // default 5 min
                .parse()
                .unwrap(),

            table_ready_retries: env::var("TABLE_READY_RETRIES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap(),
            table_ready_backoff_ms: env::var("TABLE_READY_BACKOFF_MS")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .unwrap(),

            rate_write_per_min: env::var("RATE_WRITE_PER_MIN")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap(),
            rate_read_per_min: env::var("RATE_READ_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
        }
    }
}
