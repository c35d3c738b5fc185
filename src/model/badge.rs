use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Tri-state attendance value for one (member, Sunday) cell.
/// Stored as a nullable TINYINT(1): NULL = unset, 1 = present, 0 = absent.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Unset,
}

impl AttendanceStatus {
    pub fn from_db(value: Option<bool>) -> Self {
        match value {
            Some(true) => AttendanceStatus::Present,
            Some(false) => AttendanceStatus::Absent,
            None => AttendanceStatus::Unset,
        }
    }

    pub fn to_db(self) -> Option<bool> {
        match self {
            AttendanceStatus::Present => Some(true),
            AttendanceStatus::Absent => Some(false),
            AttendanceStatus::Unset => None,
        }
    }

    pub fn is_recorded(self) -> bool {
        self != AttendanceStatus::Unset
    }
}

/// Derived member category. Ordering matters: `Regular` outranks `Member`
/// outranks `Newcomer`, so a cached or overridden value can be compared
/// against a freshly computed one.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    Newcomer,
    Member,
    Regular,
}

impl Badge {
    /// Parse the cached DB string, tolerating junk left by older writers.
    pub fn from_db(value: Option<&str>) -> Option<Self> {
        value.and_then(|v| v.parse().ok())
    }
}

/// How `create_month` seeds the new month from the most recent one.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    All,
    Custom,
    Empty,
}
