use crate::api::attendance::{
    BulkMarkAttendance, MarkAttendance, MemberAttendanceEntry, MonthOverview, SundayOverview,
};
use crate::api::member::{CreateMember, MemberListResponse, MemberQuery};
use crate::api::month::CreateMonthRequest;
use crate::badge::{BadgeSummary, ProcessReport, ProcessedMember};
use crate::model::badge::{AttendanceStatus, Badge, CopyMode};
use crate::model::member::Member;
use crate::model::month::{MonthName, MonthRecord};
use crate::store::month::CreateMonthOutcome;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Church Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Church Attendance & Membership Tracker

This API powers a church attendance dashboard: per-Sunday attendance over
monthly member sheets, with badges derived from attendance streaks.

### 🔹 Key Features
- **Month Sheets**
  - Each calendar month is its own sheet, seeded from the previous month (all, selected, or no members)
- **Member Management**
  - Create, update, list, and search members of a month
- **Sunday Attendance**
  - Present/absent/unset per member per Sunday, single or bulk marking
- **Badges**
  - `newcomer` / `member` / `regular`, derived from attendance; processing runs once every Sunday of the month has been recorded

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for member listings
- Partial bulk failures list the member ids that need a retry

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::month::create,
        crate::api::month::list,

        crate::api::member::create_member,
        crate::api::member::list_members,
        crate::api::member::get_member,
        crate::api::member::update_member,
        crate::api::member::delete_member,

        crate::api::attendance::mark,
        crate::api::attendance::bulk_mark,
        crate::api::attendance::list_for_date,
        crate::api::attendance::member_status,
        crate::api::attendance::sundays_overview,

        crate::api::badge::process,
        crate::api::badge::summary,
        crate::api::badge::member_badge
    ),
    components(
        schemas(
            Member,
            MonthName,
            MonthRecord,
            AttendanceStatus,
            Badge,
            CopyMode,
            CreateMonthRequest,
            CreateMonthOutcome,
            CreateMember,
            MemberQuery,
            MemberListResponse,
            MarkAttendance,
            BulkMarkAttendance,
            MemberAttendanceEntry,
            SundayOverview,
            MonthOverview,
            ProcessReport,
            ProcessedMember,
            BadgeSummary
        )
    ),
    tags(
        (name = "Months", description = "Month lifecycle APIs"),
        (name = "Members", description = "Member management APIs"),
        (name = "Attendance", description = "Sunday attendance APIs"),
        (name = "Badges", description = "Badge derivation APIs"),
    )
)]
pub struct ApiDoc;
