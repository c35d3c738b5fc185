pub mod activity;
pub mod db_utils;
pub mod member_cache;
pub mod member_filter;
pub mod sundays;
