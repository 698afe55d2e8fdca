use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use crate::db::models::{Client, Project, Proposal};
use crate::db::sqlite::{CrmStorage, delete_logged, ensure_parent, log_activity, non_blank};
use crate::error::CrmError;
use crate::types::forms::{ProposalForm, ProposalQuery};
use crate::types::status::{ActivityAction, EntityKind, ProjectStatus, ProposalStatus};
use crate::types::views::Conversion;
use crate::validation::ValidationErrors;

/// `sent_at` / `decided_at` after moving `current` into `next`.
fn stamps(
    current: &Proposal,
    next: ProposalStatus,
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let changed = current.status != next;
    let sent_at = if changed && next == ProposalStatus::Sent {
        Some(now)
    } else {
        current.sent_at
    };
    let decided_at = match (next.is_decided(), changed) {
        (true, true) => Some(now),
        (true, false) => current.decided_at,
        (false, _) => None,
    };
    (sent_at, decided_at)
}

fn check_transition(current: &Proposal, next: ProposalStatus) -> Result<(), CrmError> {
    if current.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(CrmError::InvalidTransition {
            entity: EntityKind::Proposal,
            from: current.status.to_string(),
            to: next.to_string(),
        })
    }
}

impl CrmStorage {
    pub async fn list_proposals(&self, query: &ProposalQuery) -> Result<Vec<Proposal>, CrmError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM proposals WHERE 1 = 1");
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

        Ok(qb.build_query_as::<Proposal>().fetch_all(self.pool()).await?)
    }

    pub async fn get_proposal(&self, id: i64) -> Result<Proposal, CrmError> {
        sqlx::query_as::<_, Proposal>("SELECT * FROM proposals WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(CrmError::NotFound {
                entity: EntityKind::Proposal,
                id,
            })
    }

    /// Proposal plus its client, as needed for the exported document.
    pub async fn proposal_with_client(&self, id: i64) -> Result<(Proposal, Client), CrmError> {
        let proposal = self.get_proposal(id).await?;
        let client = self.get_client(proposal.client_id).await?;
        Ok((proposal, client))
    }

    /// New proposals start as `draft` (default) or go straight to `sent`.
    pub async fn create_proposal(&self, form: &ProposalForm) -> Result<Proposal, CrmError> {
        let status = form.status.unwrap_or_default();
        if !matches!(status, ProposalStatus::Draft | ProposalStatus::Sent) {
            return Err(ValidationErrors::single(
                "status",
                "a new proposal must be draft or sent",
            )
            .into());
        }

        let now = Utc::now();
        let sent_at = (status == ProposalStatus::Sent).then_some(now);
        let mut tx = self.pool().begin().await?;
        ensure_parent(&mut tx, EntityKind::Client, "client_id", form.client_id).await?;

        let id = sqlx::query(
            r#"INSERT INTO proposals (
                client_id, title, description, amount, valid_until, status,
                sent_at, decided_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)"#,
        )
        .bind(form.client_id)
        .bind(form.title.trim())
        .bind(non_blank(form.description.as_deref()))
        .bind(form.amount)
        .bind(form.valid_until)
        .bind(status)
        .bind(sent_at)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        log_activity(
            &mut tx,
            EntityKind::Proposal,
            id,
            ActivityAction::Created,
            format!("Proposal \"{}\" created as {status}", form.title.trim()),
        )
        .await?;
        tx.commit().await?;

        self.get_proposal(id).await
    }

    /// Full edit. Approved proposals are locked; a `status` in the form goes
    /// through the transition table.
    pub async fn update_proposal(
        &self,
        id: i64,
        form: &ProposalForm,
    ) -> Result<Proposal, CrmError> {
        let current = self.get_proposal(id).await?;
        if !current.status.is_editable() {
            return Err(CrmError::Locked {
                entity: EntityKind::Proposal,
                id,
                status: current.status.to_string(),
            });
        }
        let next = form.status.unwrap_or(current.status);
        check_transition(&current, next)?;

        let now = Utc::now();
        let (sent_at, decided_at) = stamps(&current, next, now);
        let mut tx = self.pool().begin().await?;
        ensure_parent(&mut tx, EntityKind::Client, "client_id", form.client_id).await?;

        let done = sqlx::query(
            r#"UPDATE proposals SET
                client_id = ?, title = ?, description = ?, amount = ?, valid_until = ?,
                status = ?, sent_at = ?, decided_at = ?, updated_at = ?
              WHERE id = ? AND status = ?"#,
        )
        .bind(form.client_id)
        .bind(form.title.trim())
        .bind(non_blank(form.description.as_deref()))
        .bind(form.amount)
        .bind(form.valid_until)
        .bind(next)
        .bind(sent_at)
        .bind(decided_at)
        .bind(now)
        .bind(id)
        .bind(current.status)
        .execute(&mut *tx)
        .await?;
        if done.rows_affected() == 0 {
            drop(tx);
            return Err(self.proposal_status_conflict(id, next).await);
        }

        log_activity(
            &mut tx,
            EntityKind::Proposal,
            id,
            ActivityAction::Updated,
            format!("Proposal \"{}\" updated", form.title.trim()),
        )
        .await?;
        if next != current.status {
            log_activity(
                &mut tx,
                EntityKind::Proposal,
                id,
                ActivityAction::StatusChanged,
                format!("Proposal status {} -> {}", current.status, next),
            )
            .await?;
        }
        tx.commit().await?;

        self.get_proposal(id).await
    }

    pub async fn change_proposal_status(
        &self,
        id: i64,
        next: ProposalStatus,
    ) -> Result<Proposal, CrmError> {
        let current = self.get_proposal(id).await?;
        check_transition(&current, next)?;
        if current.status == next {
            return Ok(current);
        }

        let now = Utc::now();
        let (sent_at, decided_at) = stamps(&current, next, now);
        let mut tx = self.pool().begin().await?;
        let done = sqlx::query(
            r#"UPDATE proposals SET status = ?, sent_at = ?, decided_at = ?, updated_at = ?
               WHERE id = ? AND status = ?"#,
        )
        .bind(next)
        .bind(sent_at)
        .bind(decided_at)
        .bind(now)
        .bind(id)
        .bind(current.status)
        .execute(&mut *tx)
        .await?;
        if done.rows_affected() == 0 {
            drop(tx);
            let latest = self.get_proposal(id).await?;
            if latest.status == next {
                return Ok(latest);
            }
            return Err(self.proposal_status_conflict(id, next).await);
        }
        log_activity(
            &mut tx,
            EntityKind::Proposal,
            id,
            ActivityAction::StatusChanged,
            format!(
                "Proposal \"{}\" status {} -> {}",
                current.title, current.status, next
            ),
        )
        .await?;
        tx.commit().await?;

        info!(proposal_id = id, from = %current.status, to = %next, "proposal status changed");
        self.get_proposal(id).await
    }

    /// Error for a write that lost a race: the row left the status it was read in.
    async fn proposal_status_conflict(&self, id: i64, next: ProposalStatus) -> CrmError {
        match self.get_proposal(id).await {
            Ok(latest) if !latest.status.is_editable() => CrmError::Locked {
                entity: EntityKind::Proposal,
                id,
                status: latest.status.to_string(),
            },
            Ok(latest) => CrmError::InvalidTransition {
                entity: EntityKind::Proposal,
                from: latest.status.to_string(),
                to: next.to_string(),
            },
            Err(e) => e,
        }
    }

    /// Deletes the proposal; a project converted from it cascades.
    pub async fn delete_proposal(&self, id: i64) -> Result<(), CrmError> {
        let proposal = self.get_proposal(id).await?;
        delete_logged(
            self.pool(),
            EntityKind::Proposal,
            id,
            format!("Proposal \"{}\" deleted", proposal.title),
        )
        .await
    }

    async fn project_for_proposal(&self, proposal_id: i64) -> Result<Option<Project>, CrmError> {
        Ok(
            sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE proposal_id = ?")
                .bind(proposal_id)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    /// Turn an approved proposal into a project, once.
    pub async fn convert_proposal(&self, id: i64) -> Result<Conversion, CrmError> {
        let proposal = self.get_proposal(id).await?;
        if proposal.status != ProposalStatus::Approved {
            return Err(CrmError::InvalidTransition {
                entity: EntityKind::Proposal,
                from: proposal.status.to_string(),
                to: "converted".to_string(),
            });
        }
        if let Some(existing) = self.project_for_proposal(id).await? {
            return Err(CrmError::AlreadyConverted {
                proposal_id: id,
                project_id: existing.id,
            });
        }

        let now = Utc::now();
        let mut tx = self.pool().begin().await?;
        let inserted = sqlx::query(
            r#"INSERT INTO projects (
                client_id, proposal_id, name, description, budget, status,
                start_date, due_date, completed_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, NULL, NULL, NULL, ?, ?)"#,
        )
        .bind(proposal.client_id)
        .bind(id)
        .bind(&proposal.title)
        .bind(&proposal.description)
        .bind(proposal.amount)
        .bind(ProjectStatus::NotStarted)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await;

        let project_id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                drop(tx);
                let existing = self.project_for_proposal(id).await?.ok_or(CrmError::NotFound {
                    entity: EntityKind::Project,
                    id,
                })?;
                return Err(CrmError::AlreadyConverted {
                    proposal_id: id,
                    project_id: existing.id,
                });
            }
            Err(e) => return Err(e.into()),
        };

        log_activity(
            &mut tx,
            EntityKind::Proposal,
            id,
            ActivityAction::Converted,
            format!("Proposal \"{}\" converted into project {project_id}", proposal.title),
        )
        .await?;
        log_activity(
            &mut tx,
            EntityKind::Project,
            project_id,
            ActivityAction::Created,
            format!("Project \"{}\" created from proposal {id}", proposal.title),
        )
        .await?;
        tx.commit().await?;

        info!(proposal_id = id, project_id, "proposal converted into project");
        let project = self.get_project(project_id).await?;
        Ok(Conversion { proposal, project })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(status: ProposalStatus) -> Proposal {
        let now = Utc::now();
        Proposal {
            id: 1,
            client_id: 1,
            title: "Web".into(),
            description: None,
            amount: 1200.0,
            valid_until: None,
            status,
            sent_at: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn sending_stamps_sent_at() {
        let now = Utc::now();
        let (sent_at, decided_at) = stamps(&proposal(ProposalStatus::Draft), ProposalStatus::Sent, now);
        assert_eq!(sent_at, Some(now));
        assert_eq!(decided_at, None);
    }

    #[test]
    fn deciding_stamps_and_reopening_clears_decided_at() {
        let now = Utc::now();
        let (_, decided_at) = stamps(&proposal(ProposalStatus::Sent), ProposalStatus::Rejected, now);
        assert_eq!(decided_at, Some(now));

        let mut rejected = proposal(ProposalStatus::Rejected);
        rejected.decided_at = Some(now);
        let (_, decided_at) = stamps(&rejected, ProposalStatus::Negotiating, Utc::now());
        assert_eq!(decided_at, None);
    }

    #[test]
    fn draft_cannot_jump_to_approved() {
        let err = check_transition(&proposal(ProposalStatus::Draft), ProposalStatus::Approved)
            .unwrap_err();
        assert_eq!(err.to_string(), "proposal cannot move from draft to approved");
    }
}
