use std::collections::HashSet;
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::badge::{AttendanceStatus, Badge};
use crate::model::member::Member;
use crate::model::month::MonthRef;
use crate::store::attendance::{AttendanceMatrix, fetch_members, month_attendance};
use crate::utils::activity;
use crate::utils::member_cache::CacheLayer;

pub const NOT_QUALIFIED_REASON: &str = "did not attend 3 consecutive Sundays";

/// Streak rule for the `regular` badge: 3 Sundays present in a row, scanned
/// in ascending date order. Both `absent` and `unset` break the streak;
/// incomplete data never counts toward qualification.
pub fn has_three_consecutive_present(statuses: &[AttendanceStatus]) -> bool {
    let mut streak = 0u32;
    for status in statuses {
        if *status == AttendanceStatus::Present {
            streak += 1;
            if streak == 3 {
                return true;
            }
        } else {
            streak = 0;
        }
    }
    false
}

pub fn total_present(statuses: &[AttendanceStatus]) -> usize {
    statuses
        .iter()
        .filter(|s| **s == AttendanceStatus::Present)
        .count()
}

/// Badge precedence: manual override → regular (3 consecutive) → member
/// (2+ total present) → newcomer. Pure: same inputs, same badge.
pub fn compute_badge(manual_override: Option<Badge>, statuses: &[AttendanceStatus]) -> Badge {
    if let Some(badge) = manual_override {
        return badge;
    }
    if has_three_consecutive_present(statuses) {
        return Badge::Regular;
    }
    if total_present(statuses) >= 2 {
        return Badge::Member;
    }
    Badge::Newcomer
}

/// A month is complete once every Sunday in its range has at least one
/// recorded (non-unset) entry from any member. Deliberately loose: it does
/// not require every member to have a value for every date.
pub fn is_month_complete(matrix: &AttendanceMatrix) -> bool {
    missing_sundays(matrix).is_empty()
}

/// Sundays no one has an entry for yet.
pub fn missing_sundays(matrix: &AttendanceMatrix) -> Vec<NaiveDate> {
    matrix
        .sundays
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            !matrix
                .by_member
                .values()
                .any(|statuses| statuses[*i].is_recorded())
        })
        .map(|(_, &date)| date)
        .collect()
}

/// Keeps `process_month` from running twice for the same month at once.
/// Request-scoped work only, so a mutexed set is plenty.
#[derive(Default)]
pub struct ProcessGuard {
    running: Mutex<HashSet<String>>,
}

impl ProcessGuard {
    pub fn try_begin(&self, month_id: &str) -> bool {
        self.running
            .lock()
            .expect("process guard poisoned")
            .insert(month_id.to_string())
    }

    pub fn end(&self, month_id: &str) {
        self.running
            .lock()
            .expect("process guard poisoned")
            .remove(month_id);
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessedMember {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = "Grace Adeyemi")]
    pub name: String,
    /// Badge after processing.
    #[schema(example = "regular")]
    pub badge: String,
    /// Whether this run wrote a badge change for the member.
    pub upgraded: bool,
    #[schema(example = "did not attend 3 consecutive Sundays", nullable = true)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessReport {
    pub qualified: Vec<ProcessedMember>,
    pub not_qualified: Vec<ProcessedMember>,
    #[schema(example = 42)]
    pub total_processed: usize,
}

/// Recompute and persist badges for every member of the month. Refuses to
/// run before the month is complete: processing a half-recorded month
/// would mark members as non-qualifying on Sundays nobody entered yet.
/// Non-qualifying members come back with a reason for outreach follow-up.
pub async fn process_month(
    pool: &MySqlPool,
    cache: &CacheLayer,
    guard: &ProcessGuard,
    month: &MonthRef,
) -> Result<ProcessReport, AppError> {
    let month_id = month.id();
    if !guard.try_begin(&month_id) {
        return Err(AppError::ProcessingInProgress(month_id));
    }

    let result = run_process(pool, cache, month).await;
    guard.end(&month_id);
    result
}

async fn run_process(
    pool: &MySqlPool,
    cache: &CacheLayer,
    month: &MonthRef,
) -> Result<ProcessReport, AppError> {
    let matrix = month_attendance(pool, cache, month).await?;
    let missing = missing_sundays(&matrix);
    if !missing.is_empty() {
        return Err(AppError::MonthIncomplete {
            month: month.id(),
            missing: missing.iter().map(|d| d.to_string()).collect(),
        });
    }

    let table = month.table_name();
    let members = fetch_members(pool, cache, &table).await?;

    let mut report = ProcessReport {
        qualified: Vec::new(),
        not_qualified: Vec::new(),
        total_processed: members.len(),
    };
    let all_unset = vec![AttendanceStatus::Unset; matrix.sundays.len()];
    let mut upgrades = 0usize;

    for member in members.iter() {
        let statuses = matrix.by_member.get(&member.id).unwrap_or(&all_unset);
        let manual_override = Badge::from_db(member.badge_override.as_deref());
        let computed = compute_badge(manual_override, statuses);

        let cached = Badge::from_db(member.badge.as_deref());
        // Manual overrides are not ours to touch; everything else keeps the
        // cached badge in line with the computed one.
        let upgraded = if manual_override.is_none() && cached != Some(computed) {
            write_badge(pool, &table, member.id, computed).await?;
            upgrades += 1;
            true
        } else {
            false
        };

        let entry = ProcessedMember {
            id: member.id,
            name: member.name.clone(),
            badge: computed.to_string(),
            upgraded,
            reason: (computed != Badge::Regular).then(|| NOT_QUALIFIED_REASON.to_string()),
        };
        if computed == Badge::Regular {
            report.qualified.push(entry);
        } else {
            report.not_qualified.push(entry);
        }
    }

    if upgrades > 0 {
        cache.invalidate_month(&table).await;
    }

    info!(
        month = %month.id(),
        qualified = report.qualified.len(),
        not_qualified = report.not_qualified.len(),
        upgrades,
        "badge processing finished"
    );
    activity::record(
        pool,
        "process_month",
        json!({
            "month": month.id(),
            "qualified": report.qualified.len(),
            "not_qualified": report.not_qualified.len(),
        }),
    )
    .await;

    Ok(report)
}

/// Refresh one member's cached badge right after an attendance write.
pub async fn recompute_member_badge(
    pool: &MySqlPool,
    cache: &CacheLayer,
    month: &MonthRef,
    member_id: u64,
) -> Result<Badge, AppError> {
    let table = month.table_name();
    let matrix = month_attendance(pool, cache, month).await?;
    let members = fetch_members(pool, cache, &table).await?;
    let member = members
        .iter()
        .find(|m| m.id == member_id)
        .ok_or_else(|| AppError::NotFound(format!("member {}", member_id)))?;

    let all_unset = vec![AttendanceStatus::Unset; matrix.sundays.len()];
    let statuses = matrix.by_member.get(&member_id).unwrap_or(&all_unset);
    let manual_override = Badge::from_db(member.badge_override.as_deref());
    let computed = compute_badge(manual_override, statuses);

    if manual_override.is_none() && Badge::from_db(member.badge.as_deref()) != Some(computed) {
        write_badge(pool, &table, member_id, computed).await?;
        cache.invalidate_month(&table).await;
    }

    Ok(computed)
}

async fn write_badge(
    pool: &MySqlPool,
    table: &str,
    member_id: u64,
    badge: Badge,
) -> Result<(), AppError> {
    let sql = format!("UPDATE `{}` SET badge = ? WHERE id = ?", table);
    sqlx::query(&sql)
        .bind(badge.to_string())
        .bind(member_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Per-badge member counts for the analytics card.
pub fn badge_summary(members: &[Member], matrix: &AttendanceMatrix) -> BadgeSummary {
    let all_unset = vec![AttendanceStatus::Unset; matrix.sundays.len()];
    let mut summary = BadgeSummary::default();
    for member in members {
        let statuses = matrix.by_member.get(&member.id).unwrap_or(&all_unset);
        let manual_override = Badge::from_db(member.badge_override.as_deref());
        match compute_badge(manual_override, statuses) {
            Badge::Regular => summary.regular += 1,
            Badge::Member => summary.member += 1,
            Badge::Newcomer => summary.newcomer += 1,
        }
    }
    summary
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct BadgeSummary {
    #[schema(example = 12)]
    pub newcomer: usize,
    #[schema(example = 20)]
    pub member: usize,
    #[schema(example = 10)]
    pub regular: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::badge::AttendanceStatus::{Absent, Present, Unset};
    use std::collections::HashMap;

    #[test]
    fn streak_truth_table() {
        assert!(has_three_consecutive_present(&[Present, Present, Present]));
        assert!(has_three_consecutive_present(&[
            Absent, Present, Present, Present
        ]));
        // Broken by an absent in the middle.
        assert!(!has_three_consecutive_present(&[
            Present, Present, Absent, Present, Present
        ]));
        // Unset breaks the streak exactly like absent does.
        assert!(!has_three_consecutive_present(&[
            Present, Unset, Present, Present
        ]));
        assert!(!has_three_consecutive_present(&[]));
        assert!(!has_three_consecutive_present(&[Present, Present]));
    }

    #[test]
    fn badge_precedence() {
        // Override always wins, even downward.
        assert_eq!(
            compute_badge(Some(Badge::Newcomer), &[Present, Present, Present]),
            Badge::Newcomer
        );
        assert_eq!(
            compute_badge(None, &[Present, Present, Present, Absent, Unset]),
            Badge::Regular
        );
        // Two scattered presents: member, not regular.
        assert_eq!(
            compute_badge(None, &[Present, Absent, Present, Absent, Unset]),
            Badge::Member
        );
        assert_eq!(compute_badge(None, &[Present, Unset, Unset]), Badge::Newcomer);
        assert_eq!(compute_badge(None, &[]), Badge::Newcomer);
    }

    #[test]
    fn compute_badge_is_idempotent() {
        let statuses = [Present, Absent, Present, Present, Present];
        let first = compute_badge(None, &statuses);
        let second = compute_badge(None, &statuses);
        assert_eq!(first, second);
        assert_eq!(first, Badge::Regular);
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, day).unwrap()
    }

    fn matrix(rows: &[(u64, Vec<AttendanceStatus>)]) -> AttendanceMatrix {
        AttendanceMatrix {
            sundays: vec![d(3), d(10), d(17), d(24), d(31)],
            by_member: rows.iter().cloned().collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn month_complete_needs_every_sunday_touched() {
        // Last Sunday has no entry from anyone.
        let incomplete = matrix(&[
            (1, vec![Present, Present, Present, Absent, Unset]),
            (2, vec![Absent, Absent, Present, Present, Unset]),
        ]);
        assert!(!is_month_complete(&incomplete));
        assert_eq!(missing_sundays(&incomplete), vec![d(31)]);

        // One member covering a date is enough; nobody needs full coverage.
        let complete = matrix(&[
            (1, vec![Present, Present, Present, Absent, Unset]),
            (2, vec![Absent, Absent, Present, Present, Present]),
        ]);
        assert!(is_month_complete(&complete));

        // Adding more entries keeps a complete month complete.
        let mut fuller = complete;
        fuller
            .by_member
            .insert(3, vec![Present, Present, Present, Present, Present]);
        assert!(is_month_complete(&fuller));
    }

    #[test]
    fn empty_month_with_no_members_is_incomplete() {
        let empty = matrix(&[]);
        assert!(!is_month_complete(&empty));
        assert_eq!(missing_sundays(&empty).len(), 5);
    }

    #[test]
    fn five_sunday_qualification_scenario() {
        // Member A qualifies on Sundays 1-3, B on Sundays 3-5.
        let a = [Present, Present, Present, Absent, Unset];
        let b = [Absent, Absent, Present, Present, Present];
        // C has 3 scattered presents: member tier, no streak.
        let c = [Present, Absent, Present, Absent, Present];

        assert_eq!(compute_badge(None, &a), Badge::Regular);
        assert_eq!(compute_badge(None, &b), Badge::Regular);
        assert_eq!(compute_badge(None, &c), Badge::Member);
        assert!(!has_three_consecutive_present(&c));
        assert_eq!(total_present(&c), 3);
    }

    #[test]
    fn guard_blocks_reentrant_runs() {
        let guard = ProcessGuard::default();
        assert!(guard.try_begin("January_2026"));
        assert!(!guard.try_begin("January_2026"));
        // A different month is unaffected.
        assert!(guard.try_begin("February_2026"));
        guard.end("January_2026");
        assert!(guard.try_begin("January_2026"));
    }
}
