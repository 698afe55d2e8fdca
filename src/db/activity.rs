use crate::db::models::ActivityLog;
use crate::db::sqlite::CrmStorage;
use crate::error::CrmError;
use crate::types::forms::ActivityQuery;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

impl CrmStorage {
    /// Latest activity first, optionally restricted to one entity kind.
    pub async fn list_activity(&self, query: &ActivityQuery) -> Result<Vec<ActivityLog>, CrmError> {
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let rows = match query.entity {
            Some(entity) => {
                sqlx::query_as::<_, ActivityLog>(
                    "SELECT * FROM activity_logs WHERE entity = ? ORDER BY id DESC LIMIT ?",
                )
                .bind(entity)
                .bind(limit)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, ActivityLog>(
                    "SELECT * FROM activity_logs ORDER BY id DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(self.pool())
                .await?
            }
        };
        Ok(rows)
    }
}
