use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};

use crate::db::models::{Client, FollowUp, Note, Project, Proposal};
use crate::db::sqlite::{CrmStorage, delete_logged, log_activity, non_blank};
use crate::error::CrmError;
use crate::types::forms::{ClientForm, ClientQuery};
use crate::types::status::{ActivityAction, ClientStatus, EntityKind};
use crate::types::views::ClientDetail;

const CLIENT_COLUMNS: &str =
    "id, name, company, email, phone, address, status, created_at, updated_at";

/// Unicode-lowercased name, company and email, one per line.
fn search_text(form: &ClientForm) -> String {
    [Some(form.name.as_str()), form.company.as_deref(), form.email.as_deref()]
        .into_iter()
        .flatten()
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

impl CrmStorage {
    pub async fn list_clients(&self, query: &ClientQuery) -> Result<Vec<Client>, CrmError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE 1 = 1"));

        if let Some(search) = non_blank(query.search.as_deref()) {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            qb.push(" AND search_text LIKE ")
                .push_bind(pattern)
                .push(r" ESCAPE '\'");
        }
        if let Some(status) = query.status {
            qb.push(" AND status = ").push_bind(status);
        }

        let page = query.page();
        qb.push(" ORDER BY name COLLATE NOCASE, id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb.build_query_as::<Client>().fetch_all(self.pool()).await?;
        Ok(rows)
    }

    pub async fn get_client(&self, id: i64) -> Result<Client, CrmError> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?");
        sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(CrmError::NotFound {
                entity: EntityKind::Client,
                id,
            })
    }

    /// Client with its proposals, projects, follow-ups and notes.
    pub async fn client_detail(&self, id: i64) -> Result<ClientDetail, CrmError> {
        let client = self.get_client(id).await?;

        let proposals = sqlx::query_as::<_, Proposal>(
            "SELECT * FROM proposals WHERE client_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE client_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        let follow_ups = sqlx::query_as::<_, FollowUp>(
            "SELECT * FROM follow_ups WHERE client_id = ? ORDER BY completed, due_at",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        let notes = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes WHERE client_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        Ok(ClientDetail {
            client,
            proposals,
            projects,
            follow_ups,
            notes,
        })
    }

    pub async fn create_client(&self, form: &ClientForm) -> Result<Client, CrmError> {
        let now = Utc::now();
        let status = form.status.unwrap_or_default();
        let mut tx = self.pool().begin().await?;

        let id = sqlx::query(
            r#"INSERT INTO clients (
                name, company, email, phone, address, status, search_text, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(form.name.trim())
        .bind(non_blank(form.company.as_deref()))
        .bind(non_blank(form.email.as_deref()))
        .bind(non_blank(form.phone.as_deref()))
        .bind(non_blank(form.address.as_deref()))
        .bind(status)
        .bind(search_text(form))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        log_activity(
            &mut tx,
            EntityKind::Client,
            id,
            ActivityAction::Created,
            format!("Client \"{}\" created", form.name.trim()),
        )
        .await?;
        tx.commit().await?;

        self.get_client(id).await
    }

    pub async fn update_client(&self, id: i64, form: &ClientForm) -> Result<Client, CrmError> {
        let current = self.get_client(id).await?;
        let status = form.status.unwrap_or(current.status);
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"UPDATE clients SET
                name = ?, company = ?, email = ?, phone = ?, address = ?,
                status = ?, search_text = ?, updated_at = ?
              WHERE id = ?"#,
        )
        .bind(form.name.trim())
        .bind(non_blank(form.company.as_deref()))
        .bind(non_blank(form.email.as_deref()))
        .bind(non_blank(form.phone.as_deref()))
        .bind(non_blank(form.address.as_deref()))
        .bind(status)
        .bind(search_text(form))
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let summary = if status != current.status {
            format!(
                "Client \"{}\" updated, status {} -> {}",
                form.name.trim(),
                current.status,
                status
            )
        } else {
            format!("Client \"{}\" updated", form.name.trim())
        };
        log_activity(&mut tx, EntityKind::Client, id, ActivityAction::Updated, summary).await?;
        tx.commit().await?;

        self.get_client(id).await
    }

    /// Deletes the client; proposals, projects, tasks, follow-ups and notes cascade.
    pub async fn delete_client(&self, id: i64) -> Result<(), CrmError> {
        let client = self.get_client(id).await?;
        delete_logged(
            self.pool(),
            EntityKind::Client,
            id,
            format!("Client \"{}\" deleted", client.name),
        )
        .await
    }

    pub async fn count_clients_with_status(&self, status: ClientStatus) -> Result<i64, CrmError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clients WHERE status = ?")
            .bind(status)
            .fetch_one(self.pool())
            .await?;
        Ok(n)
    }
}
