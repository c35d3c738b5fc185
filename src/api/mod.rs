pub mod attendance;
pub mod badge;
pub mod member;
pub mod month;
