use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Descriptive columns every month table shares (cloned from
/// `member_template`). Attendance columns (`d_YYYY_MM_DD`) are created per
/// Sunday on top of these. This list is the single source of truth for
/// member copy and for validating partial-update payloads.
pub const DESCRIPTIVE_COLUMNS: &[&str] = &[
    "name",
    "gender",
    "phone",
    "age",
    "level",
    "parent_name",
    "parent_phone",
    "ministry",
    "is_visitor",
    "badge",
    "badge_override",
    "joined_on",
];

/// Column list for member SELECTs (id plus descriptive fields).
pub fn member_select_list() -> String {
    let mut cols = vec!["id"];
    cols.extend_from_slice(DESCRIPTIVE_COLUMNS);
    cols.join(", ")
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Grace Adeyemi",
        "gender": "female",
        "phone": "+2348012345678",
        "age": 12,
        "level": "Primary 6",
        "parent_name": "Mrs. Adeyemi",
        "parent_phone": "+2348098765432",
        "ministry": "choir",
        "is_visitor": false,
        "badge": "regular",
        "badge_override": null,
        "joined_on": "2025-11-02"
    })
)]
pub struct Member {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Grace Adeyemi")]
    pub name: String,

    #[schema(example = "female", nullable = true)]
    pub gender: Option<String>,

    #[schema(example = "+2348012345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = 12, nullable = true)]
    pub age: Option<u16>,

    #[schema(example = "Primary 6", nullable = true)]
    pub level: Option<String>,

    #[schema(example = "Mrs. Adeyemi", nullable = true)]
    pub parent_name: Option<String>,

    #[schema(example = "+2348098765432", nullable = true)]
    pub parent_phone: Option<String>,

    /// Comma-separated ministry tags, e.g. "choir,ushering".
    #[schema(example = "choir", nullable = true)]
    pub ministry: Option<String>,

    #[schema(example = false)]
    pub is_visitor: bool,

    /// Cached computed badge. Derived state only; the badge engine can
    /// always reproduce it from raw attendance.
    #[schema(example = "regular", nullable = true)]
    pub badge: Option<String>,

    /// Manually-assigned badge, wins over any computed value.
    #[schema(example = "member", nullable = true)]
    pub badge_override: Option<String>,

    #[schema(example = "2025-11-02", value_type = String, format = "date", nullable = true)]
    pub joined_on: Option<NaiveDate>,
}
