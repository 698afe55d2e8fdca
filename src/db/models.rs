use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::status::{
    ActivityAction, ClientStatus, EntityKind, ProjectStatus, ProposalStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Proposal {
    pub id: i64,
    pub client_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub amount: f64,
    pub valid_until: Option<NaiveDate>,
    pub status: ProposalStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Project {
    pub id: i64,
    pub client_id: i64,
    pub proposal_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct ProjectTask {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub completed: bool,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct FollowUp {
    pub id: i64,
    pub client_id: i64,
    pub subject: String,
    pub details: Option<String>,
    pub due_at: DateTime<Utc>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Note {
    pub id: i64,
    pub client_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct ActivityLog {
    pub id: i64,
    pub entity: EntityKind,
    pub entity_id: i64,
    pub action: ActivityAction,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Follow-up joined with its client's name, for dashboard and reminder views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct FollowUpWithClient {
    pub id: i64,
    pub client_id: i64,
    pub client_name: String,
    pub subject: String,
    pub due_at: DateTime<Utc>,
}

/// Open task joined with its project's name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct OpenTask {
    pub id: i64,
    pub project_id: i64,
    pub project_name: String,
    pub title: String,
    pub due_date: Option<NaiveDate>,
}
