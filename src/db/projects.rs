use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use crate::db::models::{Project, ProjectTask};
use crate::db::sqlite::{CrmStorage, delete_logged, ensure_parent, log_activity, non_blank};
use crate::error::CrmError;
use crate::types::forms::{ProjectForm, ProjectQuery, TaskForm};
use crate::types::status::{ActivityAction, EntityKind, ProjectStatus};
use crate::types::views::{ProjectDetail, TaskProgress};

fn check_transition(current: ProjectStatus, next: ProjectStatus) -> Result<(), CrmError> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(CrmError::InvalidTransition {
            entity: EntityKind::Project,
            from: current.to_string(),
            to: next.to_string(),
        })
    }
}

fn completed_stamp(
    current: &Project,
    next: ProjectStatus,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (next == ProjectStatus::Completed, current.status == next) {
        (true, true) => current.completed_at,
        (true, false) => Some(now),
        (false, _) => None,
    }
}

impl CrmStorage {
    pub async fn list_projects(&self, query: &ProjectQuery) -> Result<Vec<Project>, CrmError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM projects WHERE 1 = 1");
        if let Some(client_id) = query.client_id {
            qb.push(" AND client_id = ").push_bind(client_id);
        }
        if let Some(status) = query.status {
            qb.push(" AND status = ").push_bind(status);
        }
        let page = query.page();
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        Ok(qb.build_query_as::<Project>().fetch_all(self.pool()).await?)
    }

    pub async fn get_project(&self, id: i64) -> Result<Project, CrmError> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(CrmError::NotFound {
                entity: EntityKind::Project,
                id,
            })
    }

    pub async fn project_detail(&self, id: i64) -> Result<ProjectDetail, CrmError> {
        let project = self.get_project(id).await?;
        let tasks = self.list_tasks(id).await?;
        let progress = TaskProgress::from_tasks(&tasks);
        Ok(ProjectDetail {
            project,
            tasks,
            progress,
        })
    }

    pub async fn create_project(&self, form: &ProjectForm) -> Result<Project, CrmError> {
        let now = Utc::now();
        let status = form.status.unwrap_or_default();
        let completed_at = (status == ProjectStatus::Completed).then_some(now);
        let mut tx = self.pool().begin().await?;
        ensure_parent(&mut tx, EntityKind::Client, "client_id", form.client_id).await?;

        let id = sqlx::query(
            r#"INSERT INTO projects (
                client_id, proposal_id, name, description, budget, status,
                start_date, due_date, completed_at, created_at, updated_at
            ) VALUES (?, NULL, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(form.client_id)
        .bind(form.name.trim())
        .bind(non_blank(form.description.as_deref()))
        .bind(form.budget)
        .bind(status)
        .bind(form.start_date)
        .bind(form.due_date)
        .bind(completed_at)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        log_activity(
            &mut tx,
            EntityKind::Project,
            id,
            ActivityAction::Created,
            format!("Project \"{}\" created", form.name.trim()),
        )
        .await?;
        tx.commit().await?;

        self.get_project(id).await
    }

    pub async fn update_project(&self, id: i64, form: &ProjectForm) -> Result<Project, CrmError> {
        let current = self.get_project(id).await?;
        let next = form.status.unwrap_or(current.status);
        check_transition(current.status, next)?;

        let now = Utc::now();
        let completed_at = completed_stamp(&current, next, now);
        let mut tx = self.pool().begin().await?;
        ensure_parent(&mut tx, EntityKind::Client, "client_id", form.client_id).await?;

        let done = sqlx::query(
            r#"UPDATE projects SET
                client_id = ?, name = ?, description = ?, budget = ?, status = ?,
                start_date = ?, due_date = ?, completed_at = ?, updated_at = ?
              WHERE id = ? AND status = ?"#,
        )
        .bind(form.client_id)
        .bind(form.name.trim())
        .bind(non_blank(form.description.as_deref()))
        .bind(form.budget)
        .bind(next)
        .bind(form.start_date)
        .bind(form.due_date)
        .bind(completed_at)
        .bind(now)
        .bind(id)
        .bind(current.status)
        .execute(&mut *tx)
        .await?;
        if done.rows_affected() == 0 {
            drop(tx);
            return Err(self.project_status_conflict(id, next).await);
        }

        log_activity(
            &mut tx,
            EntityKind::Project,
            id,
            ActivityAction::Updated,
            format!("Project \"{}\" updated", form.name.trim()),
        )
        .await?;
        if next != current.status {
            log_activity(
                &mut tx,
                EntityKind::Project,
                id,
                ActivityAction::StatusChanged,
                format!("Project status {} -> {}", current.status, next),
            )
            .await?;
        }
        tx.commit().await?;

        self.get_project(id).await
    }

    pub async fn change_project_status(
        &self,
        id: i64,
        next: ProjectStatus,
    ) -> Result<Project, CrmError> {
        let current = self.get_project(id).await?;
        check_transition(current.status, next)?;
        if current.status == next {
            return Ok(current);
        }

        let now = Utc::now();
        let completed_at = completed_stamp(&current, next, now);
        let mut tx = self.pool().begin().await?;
        let done = sqlx::query(
            r#"UPDATE projects SET status = ?, completed_at = ?, updated_at = ?
               WHERE id = ? AND status = ?"#,
        )
        .bind(next)
        .bind(completed_at)
        .bind(now)
        .bind(id)
        .bind(current.status)
        .execute(&mut *tx)
        .await?;
        if done.rows_affected() == 0 {
            drop(tx);
            let latest = self.get_project(id).await?;
            if latest.status == next {
                return Ok(latest);
            }
            return Err(self.project_status_conflict(id, next).await);
        }
        log_activity(
            &mut tx,
            EntityKind::Project,
            id,
            ActivityAction::StatusChanged,
            format!("Project \"{}\" status {} -> {}", current.name, current.status, next),
        )
        .await?;
        tx.commit().await?;

        info!(project_id = id, from = %current.status, to = %next, "project status changed");
        self.get_project(id).await
    }

    /// Error for a write that lost a race: the row left the status it was read in.
    async fn project_status_conflict(&self, id: i64, next: ProjectStatus) -> CrmError {
        match self.get_project(id).await {
            Ok(latest) => CrmError::InvalidTransition {
                entity: EntityKind::Project,
                from: latest.status.to_string(),
                to: next.to_string(),
            },
            Err(e) => e,
        }
    }

    /// Deletes the project; its tasks cascade.
    pub async fn delete_project(&self, id: i64) -> Result<(), CrmError> {
        let project = self.get_project(id).await?;
        delete_logged(
            self.pool(),
            EntityKind::Project,
            id,
            format!("Project \"{}\" deleted", project.name),
        )
        .await
    }

    pub async fn list_tasks(&self, project_id: i64) -> Result<Vec<ProjectTask>, CrmError> {
        self.get_project(project_id).await?;
        Ok(sqlx::query_as::<_, ProjectTask>(
            r#"SELECT * FROM project_tasks WHERE project_id = ?
               ORDER BY completed, due_date IS NULL, due_date, id"#,
        )
        .bind(project_id)
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn get_task(&self, id: i64) -> Result<ProjectTask, CrmError> {
        sqlx::query_as::<_, ProjectTask>("SELECT * FROM project_tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(CrmError::NotFound {
                entity: EntityKind::Task,
                id,
            })
    }

    pub async fn create_task(
        &self,
        project_id: i64,
        form: &TaskForm,
    ) -> Result<ProjectTask, CrmError> {
        self.get_project(project_id).await?;
        let now = Utc::now();
        let completed = form.completed.unwrap_or(false);
        let mut tx = self.pool().begin().await?;

        let id = sqlx::query(
            r#"INSERT INTO project_tasks (
                project_id, title, completed, due_date, completed_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(project_id)
        .bind(form.title.trim())
        .bind(completed)
        .bind(form.due_date)
        .bind(completed.then_some(now))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        log_activity(
            &mut tx,
            EntityKind::Task,
            id,
            ActivityAction::Created,
            format!("Task \"{}\" added to project {project_id}", form.title.trim()),
        )
        .await?;
        tx.commit().await?;

        self.get_task(id).await
    }

    pub async fn update_task(&self, id: i64, form: &TaskForm) -> Result<ProjectTask, CrmError> {
        let current = self.get_task(id).await?;
        let completed = form.completed.unwrap_or(current.completed);
        let completed_at = match (completed, current.completed) {
            (true, true) => current.completed_at,
            (true, false) => Some(Utc::now()),
            (false, _) => None,
        };
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"UPDATE project_tasks SET
                title = ?, due_date = ?, completed = ?, completed_at = ?, updated_at = ?
              WHERE id = ?"#,
        )
        .bind(form.title.trim())
        .bind(form.due_date)
        .bind(completed)
        .bind(completed_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        log_activity(
            &mut tx,
            EntityKind::Task,
            id,
            ActivityAction::Updated,
            format!("Task \"{}\" updated", form.title.trim()),
        )
        .await?;
        tx.commit().await?;

        self.get_task(id).await
    }

    /// Flip completion; stamps `completed_at` when completing, clears it when reopening.
    pub async fn toggle_task(&self, id: i64) -> Result<ProjectTask, CrmError> {
        let current = self.get_task(id).await?;
        let now = Utc::now();
        let completed = !current.completed;
        let (completed_at, action) = if completed {
            (Some(now), ActivityAction::Completed)
        } else {
            (None, ActivityAction::Reopened)
        };
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "UPDATE project_tasks SET completed = ?, completed_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(completed)
        .bind(completed_at)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        log_activity(
            &mut tx,
            EntityKind::Task,
            id,
            action,
            format!("Task \"{}\" {action}", current.title),
        )
        .await?;
        tx.commit().await?;

        self.get_task(id).await
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), CrmError> {
        let task = self.get_task(id).await?;
        delete_logged(
            self.pool(),
            EntityKind::Task,
            id,
            format!("Task \"{}\" deleted", task.title),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completing_stamps_and_reopening_clears() {
        let now = Utc::now();
        let mut project = Project {
            id: 1,
            client_id: 1,
            proposal_id: None,
            name: "Tienda online".into(),
            description: None,
            budget: None,
            status: ProjectStatus::InProgress,
            start_date: None,
            due_date: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(completed_stamp(&project, ProjectStatus::Completed, now), Some(now));

        project.status = ProjectStatus::Completed;
        project.completed_at = Some(now);
        assert_eq!(completed_stamp(&project, ProjectStatus::InProgress, Utc::now()), None);
        assert!(check_transition(ProjectStatus::Completed, ProjectStatus::Paused).is_err());
    }
}
