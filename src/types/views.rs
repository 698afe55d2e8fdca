use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::db::models::{
    ActivityLog, Client, FollowUp, FollowUpWithClient, Note, OpenTask, Project, ProjectTask,
    Proposal,
};
use crate::error::CrmError;

/// Everything the client page shows.
#[derive(Debug, Clone, Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub proposals: Vec<Proposal>,
    pub projects: Vec<Project>,
    pub follow_ups: Vec<FollowUp>,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub tasks: Vec<ProjectTask>,
    pub progress: TaskProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaskProgress {
    pub completed: i64,
    pub total: i64,
    /// Whole percent, 0 when the project has no tasks.
    pub percent: i64,
}

impl TaskProgress {
    pub fn from_tasks(tasks: &[ProjectTask]) -> Self {
        let total = tasks.len() as i64;
        let completed = tasks.iter().filter(|t| t.completed).count() as i64;
        let percent = if total == 0 {
            0
        } else {
            completed * 100 / total
        };
        Self {
            completed,
            total,
            percent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub proposal: Proposal,
    pub project: Project,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub month: String,
    pub pending: PendingWork,
    pub kpis: MonthlyKpis,
    pub recent_activity: Vec<ActivityLog>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingWork {
    pub overdue_follow_ups: Vec<FollowUpWithClient>,
    pub upcoming_follow_ups: Vec<FollowUpWithClient>,
    pub open_tasks: Vec<OpenTask>,
    pub open_task_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyKpis {
    pub new_clients: i64,
    pub proposals_created: i64,
    pub proposals_sent: i64,
    pub proposals_approved: i64,
    pub proposals_rejected: i64,
    /// Approved / (approved + rejected) decided in the month, as a percentage.
    pub approval_rate: f64,
    pub approved_amount: f64,
    pub projects_started: i64,
    pub projects_completed: i64,
    pub active_clients: i64,
    pub active_projects: i64,
    pub pending_follow_ups: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReminderScan {
    pub fired: usize,
}

/// Half-open UTC window `[start, end)` covering one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    pub fn containing(at: DateTime<Utc>) -> Self {
        let first = NaiveDate::from_ymd_opt(at.year(), at.month(), 1)
            .unwrap_or(at.date_naive());
        Self::starting(first)
    }

    /// Parse `YYYY-MM`.
    pub fn parse(month: &str) -> Result<Self, CrmError> {
        let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
            .map_err(|_| CrmError::BadRequest(format!("invalid month `{month}`, expected YYYY-MM")))?;
        Ok(Self::starting(first))
    }

    fn starting(first: NaiveDate) -> Self {
        let next = first
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        Self {
            start: Utc.from_utc_datetime(&first.and_time(chrono::NaiveTime::MIN)),
            end: Utc.from_utc_datetime(&next.and_time(chrono::NaiveTime::MIN)),
        }
    }

    pub fn label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn december_rolls_into_next_year() {
        let window = MonthWindow::parse("2025-12").unwrap();
        assert_eq!(window.start.to_rfc3339(), "2025-12-01T00:00:00+00:00");
        assert_eq!(window.end.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert_eq!(window.label(), "2025-12");
    }

    #[test]
    fn containing_uses_the_calendar_month() {
        let at = Utc.with_ymd_and_hms(2026, 2, 28, 23, 59, 59).unwrap();
        let window = MonthWindow::containing(at);
        assert_eq!(window.label(), "2026-02");
        assert_eq!(window.end.to_rfc3339(), "2026-03-01T00:00:00+00:00");
    }

    #[test]
    fn bad_month_is_a_bad_request() {
        assert!(matches!(
            MonthWindow::parse("2026-13"),
            Err(CrmError::BadRequest(_))
        ));
        assert!(MonthWindow::parse("octubre").is_err());
    }

    #[test]
    fn progress_rounds_down() {
        let now = Utc::now();
        let task = |completed| ProjectTask {
            id: 1,
            project_id: 1,
            title: "t".into(),
            completed,
            due_date: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        let progress = TaskProgress::from_tasks(&[task(true), task(false), task(false)]);
        assert_eq!(progress.percent, 33);
        assert_eq!(TaskProgress::from_tasks(&[]).percent, 0);
    }
}
