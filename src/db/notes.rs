use chrono::Utc;

use crate::db::models::Note;
use crate::db::sqlite::{CrmStorage, delete_logged, ensure_parent, log_activity};
use crate::error::CrmError;
use crate::types::forms::{NoteForm, NoteQuery};
use crate::types::status::{ActivityAction, EntityKind};

const SUMMARY_CHARS: usize = 60;

/// First line of the note, shortened for the activity log.
fn excerpt(body: &str) -> String {
    let line = body.trim().lines().next().unwrap_or_default();
    if line.chars().count() > SUMMARY_CHARS {
        let cut: String = line.chars().take(SUMMARY_CHARS).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}

impl CrmStorage {
    /// Client timeline, newest first.
    pub async fn list_notes(&self, query: &NoteQuery) -> Result<Vec<Note>, CrmError> {
        let rows = match query.client_id {
            Some(client_id) => {
                sqlx::query_as::<_, Note>(
                    "SELECT * FROM notes WHERE client_id = ? ORDER BY created_at DESC, id DESC",
                )
                .bind(client_id)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, Note>("SELECT * FROM notes ORDER BY created_at DESC, id DESC")
                    .fetch_all(self.pool())
                    .await?
            }
        };
        Ok(rows)
    }

    pub async fn get_note(&self, id: i64) -> Result<Note, CrmError> {
        sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(CrmError::NotFound {
                entity: EntityKind::Note,
                id,
            })
    }

    pub async fn create_note(&self, form: &NoteForm) -> Result<Note, CrmError> {
        let now = Utc::now();
        let mut tx = self.pool().begin().await?;
        ensure_parent(&mut tx, EntityKind::Client, "client_id", form.client_id).await?;

        let id = sqlx::query(
            "INSERT INTO notes (client_id, body, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(form.client_id)
        .bind(form.body.trim())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        log_activity(
            &mut tx,
            EntityKind::Note,
            id,
            ActivityAction::Created,
            format!("Note added: {}", excerpt(&form.body)),
        )
        .await?;
        tx.commit().await?;

        self.get_note(id).await
    }

    pub async fn update_note(&self, id: i64, form: &NoteForm) -> Result<Note, CrmError> {
        self.get_note(id).await?;
        let mut tx = self.pool().begin().await?;
        ensure_parent(&mut tx, EntityKind::Client, "client_id", form.client_id).await?;

        sqlx::query("UPDATE notes SET client_id = ?, body = ?, updated_at = ? WHERE id = ?")
            .bind(form.client_id)
            .bind(form.body.trim())
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        log_activity(
            &mut tx,
            EntityKind::Note,
            id,
            ActivityAction::Updated,
            format!("Note edited: {}", excerpt(&form.body)),
        )
        .await?;
        tx.commit().await?;

        self.get_note(id).await
    }

    pub async fn delete_note(&self, id: i64) -> Result<(), CrmError> {
        let note = self.get_note(id).await?;
        delete_logged(
            self.pool(),
            EntityKind::Note,
            id,
            format!("Note deleted: {}", excerpt(&note.body)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::excerpt;

    #[test]
    fn excerpt_takes_first_line_and_shortens() {
        assert_eq!(excerpt("  Llamó el cliente\nsegunda línea"), "Llamó el cliente");
        let long = "á".repeat(80);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), 61);
        assert!(cut.ends_with('…'));
    }
}
