use chrono::{DateTime, Duration, Utc};

use crate::config::DashboardConfig;
use crate::db::models::{FollowUpWithClient, OpenTask};
use crate::db::sqlite::CrmStorage;
use crate::error::CrmError;
use crate::types::forms::ActivityQuery;
use crate::types::status::{ClientStatus, ProjectStatus, ProposalStatus};
use crate::types::views::{Dashboard, MonthWindow, MonthlyKpis, PendingWork};

const FOLLOW_UP_WITH_CLIENT: &str = r#"SELECT f.id, f.client_id, c.name AS client_name, f.subject, f.due_at
    FROM follow_ups f JOIN clients c ON c.id = f.client_id
    WHERE f.completed = 0"#;

impl CrmStorage {
    /// Pending work as of `now` plus KPIs for `window`.
    pub async fn dashboard(
        &self,
        window: MonthWindow,
        now: DateTime<Utc>,
        cfg: &DashboardConfig,
    ) -> Result<Dashboard, CrmError> {
        let pending = self.pending_work(now, cfg).await?;
        let kpis = self.monthly_kpis(window).await?;
        let recent_activity = self
            .list_activity(&ActivityQuery {
                entity: None,
                limit: Some(cfg.recent_activity_limit),
            })
            .await?;

        Ok(Dashboard {
            month: window.label(),
            pending,
            kpis,
            recent_activity,
        })
    }

    async fn pending_work(
        &self,
        now: DateTime<Utc>,
        cfg: &DashboardConfig,
    ) -> Result<PendingWork, CrmError> {
        let horizon = now + Duration::days(cfg.upcoming_days.max(0));

        let overdue_follow_ups = sqlx::query_as::<_, FollowUpWithClient>(&format!(
            "{FOLLOW_UP_WITH_CLIENT} AND f.due_at < ? ORDER BY f.due_at, f.id"
        ))
        .bind(now)
        .fetch_all(self.pool())
        .await?;

        let upcoming_follow_ups = sqlx::query_as::<_, FollowUpWithClient>(&format!(
            "{FOLLOW_UP_WITH_CLIENT} AND f.due_at >= ? AND f.due_at <= ? ORDER BY f.due_at, f.id"
        ))
        .bind(now)
        .bind(horizon)
        .fetch_all(self.pool())
        .await?;

        let open_tasks = sqlx::query_as::<_, OpenTask>(
            r#"SELECT t.id, t.project_id, p.name AS project_name, t.title, t.due_date
               FROM project_tasks t JOIN projects p ON p.id = t.project_id
               WHERE t.completed = 0
               ORDER BY t.due_date IS NULL, t.due_date, t.id
               LIMIT ?"#,
        )
        .bind(cfg.open_task_limit.max(0))
        .fetch_all(self.pool())
        .await?;

        let (open_task_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM project_tasks WHERE completed = 0")
                .fetch_one(self.pool())
                .await?;

        Ok(PendingWork {
            overdue_follow_ups,
            upcoming_follow_ups,
            open_tasks,
            open_task_count,
        })
    }

    /// Counts within `[window.start, window.end)` plus point-in-time totals.
    pub async fn monthly_kpis(&self, window: MonthWindow) -> Result<MonthlyKpis, CrmError> {
        let new_clients = self
            .count_in_window("SELECT COUNT(*) FROM clients WHERE created_at >= ? AND created_at < ?", window)
            .await?;
        let proposals_created = self
            .count_in_window("SELECT COUNT(*) FROM proposals WHERE created_at >= ? AND created_at < ?", window)
            .await?;
        let proposals_sent = self
            .count_in_window("SELECT COUNT(*) FROM proposals WHERE sent_at >= ? AND sent_at < ?", window)
            .await?;
        let projects_started = self
            .count_in_window("SELECT COUNT(*) FROM projects WHERE created_at >= ? AND created_at < ?", window)
            .await?;
        let projects_completed = self
            .count_in_window(
                "SELECT COUNT(*) FROM projects WHERE completed_at >= ? AND completed_at < ?",
                window,
            )
            .await?;

        let (proposals_approved, approved_amount): (i64, f64) = sqlx::query_as(
            r#"SELECT COUNT(*), COALESCE(SUM(amount), 0.0) FROM proposals
               WHERE status = ? AND decided_at >= ? AND decided_at < ?"#,
        )
        .bind(ProposalStatus::Approved)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(self.pool())
        .await?;

        let (proposals_rejected,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM proposals
               WHERE status = ? AND decided_at >= ? AND decided_at < ?"#,
        )
        .bind(ProposalStatus::Rejected)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(self.pool())
        .await?;

        let decided = proposals_approved + proposals_rejected;
        let approval_rate = if decided > 0 {
            (proposals_approved as f64 / decided as f64) * 100.0
        } else {
            0.0
        };

        let active_clients = self.count_clients_with_status(ClientStatus::Active).await?;
        let (active_projects,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM projects WHERE status = ?")
                .bind(ProjectStatus::InProgress)
                .fetch_one(self.pool())
                .await?;
        let (pending_follow_ups,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM follow_ups WHERE completed = 0")
                .fetch_one(self.pool())
                .await?;

        Ok(MonthlyKpis {
            new_clients,
            proposals_created,
            proposals_sent,
            proposals_approved,
            proposals_rejected,
            approval_rate,
            approved_amount,
            projects_started,
            projects_completed,
            active_clients,
            active_projects,
            pending_follow_ups,
        })
    }

    async fn count_in_window(&self, sql: &str, window: MonthWindow) -> Result<i64, CrmError> {
        let (n,): (i64,) = sqlx::query_as(sql)
            .bind(window.start)
            .bind(window.end)
            .fetch_one(self.pool())
            .await?;
        Ok(n)
    }
}
