use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use crate::db::models::{FollowUp, FollowUpWithClient};
use crate::db::sqlite::{CrmStorage, delete_logged, ensure_parent, log_activity, non_blank};
use crate::error::CrmError;
use crate::types::forms::{FollowUpForm, FollowUpQuery};
use crate::types::status::{ActivityAction, EntityKind, FollowUpFilter};
use crate::validation::ValidationErrors;

impl CrmStorage {
    pub async fn list_follow_ups(&self, query: &FollowUpQuery) -> Result<Vec<FollowUp>, CrmError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM follow_ups WHERE 1 = 1");
        if let Some(client_id) = query.client_id {
            qb.push(" AND client_id = ").push_bind(client_id);
        }
        match query.status {
            Some(FollowUpFilter::Pending) => {
                qb.push(" AND completed = 0");
            }
            Some(FollowUpFilter::Completed) => {
                qb.push(" AND completed = 1");
            }
            Some(FollowUpFilter::Overdue) => {
                qb.push(" AND completed = 0 AND due_at < ").push_bind(Utc::now());
            }
            None => {}
        }
        qb.push(" ORDER BY due_at, id");

        Ok(qb.build_query_as::<FollowUp>().fetch_all(self.pool()).await?)
    }

    pub async fn get_follow_up(&self, id: i64) -> Result<FollowUp, CrmError> {
        sqlx::query_as::<_, FollowUp>("SELECT * FROM follow_ups WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(CrmError::NotFound {
                entity: EntityKind::FollowUp,
                id,
            })
    }

    pub async fn create_follow_up(&self, form: &FollowUpForm) -> Result<FollowUp, CrmError> {
        let due_at = required_due_at(form)?;
        let now = Utc::now();
        let mut tx = self.pool().begin().await?;
        ensure_parent(&mut tx, EntityKind::Client, "client_id", form.client_id).await?;

        let id = sqlx::query(
            r#"INSERT INTO follow_ups (
                client_id, subject, details, due_at, completed, completed_at,
                notified_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, 0, NULL, NULL, ?, ?)"#,
        )
        .bind(form.client_id)
        .bind(form.subject.trim())
        .bind(non_blank(form.details.as_deref()))
        .bind(due_at)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        log_activity(
            &mut tx,
            EntityKind::FollowUp,
            id,
            ActivityAction::Created,
            format!(
                "Follow-up \"{}\" scheduled for {}",
                form.subject.trim(),
                due_at.format("%Y-%m-%d %H:%M")
            ),
        )
        .await?;
        tx.commit().await?;

        self.get_follow_up(id).await
    }

    /// Full edit. Moving `due_at` re-arms the reminder.
    pub async fn update_follow_up(
        &self,
        id: i64,
        form: &FollowUpForm,
    ) -> Result<FollowUp, CrmError> {
        let due_at = required_due_at(form)?;
        let current = self.get_follow_up(id).await?;
        let notified_at = if due_at == current.due_at {
            current.notified_at
        } else {
            None
        };
        let mut tx = self.pool().begin().await?;
        ensure_parent(&mut tx, EntityKind::Client, "client_id", form.client_id).await?;

        sqlx::query(
            r#"UPDATE follow_ups SET
                client_id = ?, subject = ?, details = ?, due_at = ?, notified_at = ?, updated_at = ?
              WHERE id = ?"#,
        )
        .bind(form.client_id)
        .bind(form.subject.trim())
        .bind(non_blank(form.details.as_deref()))
        .bind(due_at)
        .bind(notified_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        log_activity(
            &mut tx,
            EntityKind::FollowUp,
            id,
            ActivityAction::Updated,
            format!("Follow-up \"{}\" updated", form.subject.trim()),
        )
        .await?;
        tx.commit().await?;

        self.get_follow_up(id).await
    }

    /// Mark done. Completing an already completed follow-up is a no-op.
    pub async fn complete_follow_up(&self, id: i64) -> Result<FollowUp, CrmError> {
        let current = self.get_follow_up(id).await?;
        if current.completed {
            return Ok(current);
        }
        let now = Utc::now();
        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "UPDATE follow_ups SET completed = 1, completed_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        log_activity(
            &mut tx,
            EntityKind::FollowUp,
            id,
            ActivityAction::Completed,
            format!("Follow-up \"{}\" completed", current.subject),
        )
        .await?;
        tx.commit().await?;

        self.get_follow_up(id).await
    }

    pub async fn delete_follow_up(&self, id: i64) -> Result<(), CrmError> {
        let follow_up = self.get_follow_up(id).await?;
        delete_logged(
            self.pool(),
            EntityKind::FollowUp,
            id,
            format!("Follow-up \"{}\" deleted", follow_up.subject),
        )
        .await
    }

    /// Pending follow-ups due at or before `now` that have not been reminded yet.
    pub async fn due_unreminded_follow_ups(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<FollowUpWithClient>, CrmError> {
        Ok(sqlx::query_as::<_, FollowUpWithClient>(
            r#"SELECT f.id, f.client_id, c.name AS client_name, f.subject, f.due_at
               FROM follow_ups f JOIN clients c ON c.id = f.client_id
               WHERE f.completed = 0 AND f.notified_at IS NULL AND f.due_at <= ?
               ORDER BY f.due_at, f.id"#,
        )
        .bind(now)
        .fetch_all(self.pool())
        .await?)
    }

    /// Stamp `notified_at` and log a reminder. Returns false if the row was
    /// completed, rescheduled or reminded in the meantime.
    pub async fn mark_follow_up_reminded(
        &self,
        follow_up: &FollowUpWithClient,
        now: DateTime<Utc>,
    ) -> Result<bool, CrmError> {
        let mut tx = self.pool().begin().await?;
        let done = sqlx::query(
            r#"UPDATE follow_ups SET notified_at = ?
               WHERE id = ? AND completed = 0 AND notified_at IS NULL AND due_at <= ?"#,
        )
        .bind(now)
        .bind(follow_up.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        if done.rows_affected() == 0 {
            return Ok(false);
        }
        log_activity(
            &mut tx,
            EntityKind::FollowUp,
            follow_up.id,
            ActivityAction::Reminded,
            format!(
                "Reminder: \"{}\" with {} was due {}",
                follow_up.subject,
                follow_up.client_name,
                follow_up.due_at.format("%Y-%m-%d %H:%M")
            ),
        )
        .await?;
        tx.commit().await?;
        Ok(true)
    }
}

fn required_due_at(form: &FollowUpForm) -> Result<DateTime<Utc>, CrmError> {
    form.due_at
        .ok_or_else(|| ValidationErrors::single("due_at", "is required").into())
}
