//! Request payloads and query strings.
//!
//! Forms derive `Default` with `#[serde(default)]` so a missing field reaches
//! validation and comes back as a per-field message instead of a parse error.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{DeserializeOwned, IntoDeserializer, value::StrDeserializer};
use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

use crate::types::status::{
    ClientStatus, EntityKind, FollowUpFilter, ProjectStatus, ProposalStatus,
};
use crate::validation::{
    NAME_MAX, TEXT_MAX, TITLE_MAX, Validate, ValidationErrors,
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientForm {
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<ClientStatus>,
}

impl Validate for ClientForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.required("name", &self.name, NAME_MAX);
        errors.optional("company", self.company.as_deref(), NAME_MAX);
        errors.email("email", self.email.as_deref());
        errors.phone("phone", self.phone.as_deref());
        errors.optional("address", self.address.as_deref(), TITLE_MAX);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProposalForm {
    pub client_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub amount: f64,
    pub valid_until: Option<NaiveDate>,
    pub status: Option<ProposalStatus>,
}

impl Validate for ProposalForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.positive_id("client_id", self.client_id);
        errors.required("title", &self.title, TITLE_MAX);
        errors.optional("description", self.description.as_deref(), TEXT_MAX);
        errors.amount("amount", Some(self.amount));
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectForm {
    pub client_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

impl Validate for ProjectForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.positive_id("client_id", self.client_id);
        errors.required("name", &self.name, TITLE_MAX);
        errors.optional("description", self.description.as_deref(), TEXT_MAX);
        errors.amount("budget", self.budget);
        errors.date_order("due_date", self.start_date, self.due_date);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskForm {
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub completed: Option<bool>,
}

impl Validate for TaskForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.required("title", &self.title, TITLE_MAX);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FollowUpForm {
    pub client_id: i64,
    pub subject: String,
    pub details: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
}

impl Validate for FollowUpForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.positive_id("client_id", self.client_id);
        errors.required("subject", &self.subject, TITLE_MAX);
        errors.optional("details", self.details.as_deref(), TEXT_MAX);
        if self.due_at.is_none() {
            errors.add("due_at", "is required");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NoteForm {
    pub client_id: i64,
    pub body: String,
}

impl Validate for NoteForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.positive_id("client_id", self.client_id);
        errors.required("body", &self.body, TEXT_MAX);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProposalStatusChange {
    pub status: ProposalStatus,
}

impl Validate for ProposalStatusChange {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectStatusChange {
    pub status: ProjectStatus,
}

impl Validate for ProjectStatusChange {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

/// Query-string enum filter where a blank value (`?status=`) means no filter.
fn blank_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let value: StrDeserializer<'_, D::Error> = value.into_deserializer();
            T::deserialize(value).map(Some)
        }
    }
}

/// Numeric counterpart of `blank_as_none`.
fn blank_number<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid number `{value}`: {e}"))),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientQuery {
    pub search: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub status: Option<ClientStatus>,
    #[serde(deserialize_with = "blank_number")]
    pub limit: Option<i64>,
    #[serde(deserialize_with = "blank_number")]
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProposalQuery {
    #[serde(deserialize_with = "blank_number")]
    pub client_id: Option<i64>,
    #[serde(deserialize_with = "blank_as_none")]
    pub status: Option<ProposalStatus>,
    #[serde(deserialize_with = "blank_number")]
    pub limit: Option<i64>,
    #[serde(deserialize_with = "blank_number")]
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectQuery {
    #[serde(deserialize_with = "blank_number")]
    pub client_id: Option<i64>,
    #[serde(deserialize_with = "blank_as_none")]
    pub status: Option<ProjectStatus>,
    #[serde(deserialize_with = "blank_number")]
    pub limit: Option<i64>,
    #[serde(deserialize_with = "blank_number")]
    pub offset: Option<i64>,
}

macro_rules! paged {
    ($($query:ty),+) => {
        $(impl $query {
            pub fn page(&self) -> Page {
                Page {
                    limit: self.limit,
                    offset: self.offset,
                }
            }
        })+
    };
}

paged!(ClientQuery, ProposalQuery, ProjectQuery);

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FollowUpQuery {
    #[serde(deserialize_with = "blank_number")]
    pub client_id: Option<i64>,
    #[serde(deserialize_with = "blank_as_none")]
    pub status: Option<FollowUpFilter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NoteQuery {
    #[serde(deserialize_with = "blank_number")]
    pub client_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivityQuery {
    #[serde(deserialize_with = "blank_as_none")]
    pub entity: Option<EntityKind>,
    #[serde(deserialize_with = "blank_number")]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardQuery {
    /// `YYYY-MM`; defaults to the current UTC month.
    pub month: Option<String>,
}
