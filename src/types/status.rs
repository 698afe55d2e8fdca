use serde::{Deserialize, Serialize};
use std::fmt;

/// Client lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ClientStatus {
    #[default]
    #[serde(alias = "activo")]
    Active,
    #[serde(alias = "inactivo")]
    Inactive,
}

/// Commercial proposal lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProposalStatus {
    #[default]
    #[serde(alias = "borrador")]
    Draft,
    #[serde(alias = "enviada")]
    Sent,
    #[serde(alias = "aprobada")]
    Approved,
    #[serde(alias = "rechazada")]
    Rejected,
    #[serde(alias = "negociacion")]
    Negotiating,
}

impl ProposalStatus {
    /// Statuses reachable in one step. `Approved` is terminal.
    pub fn next_allowed(self) -> &'static [ProposalStatus] {
        use ProposalStatus::*;
        match self {
            Draft => &[Sent],
            Sent => &[Approved, Rejected, Negotiating],
            Negotiating => &[Sent, Approved, Rejected],
            Rejected => &[Negotiating],
            Approved => &[],
        }
    }

    pub fn can_transition_to(self, next: ProposalStatus) -> bool {
        self == next || self.next_allowed().contains(&next)
    }

    /// A proposal has been decided once it is approved or rejected.
    pub fn is_decided(self) -> bool {
        matches!(self, ProposalStatus::Approved | ProposalStatus::Rejected)
    }

    /// Content (title, amount, ...) may be edited.
    pub fn is_editable(self) -> bool {
        self != ProposalStatus::Approved
    }

    pub fn label_es(self) -> &'static str {
        match self {
            ProposalStatus::Draft => "Borrador",
            ProposalStatus::Sent => "Enviada",
            ProposalStatus::Approved => "Aprobada",
            ProposalStatus::Rejected => "Rechazada",
            ProposalStatus::Negotiating => "En negociación",
        }
    }
}

/// Project lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    #[serde(alias = "pendiente", alias = "no_iniciado")]
    NotStarted,
    #[serde(alias = "en_progreso")]
    InProgress,
    #[serde(alias = "pausado")]
    Paused,
    #[serde(alias = "completado")]
    Completed,
}

impl ProjectStatus {
    pub fn next_allowed(self) -> &'static [ProjectStatus] {
        use ProjectStatus::*;
        match self {
            NotStarted => &[InProgress],
            InProgress => &[Paused, Completed],
            Paused => &[InProgress, Completed],
            Completed => &[InProgress],
        }
    }

    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        self == next || self.next_allowed().contains(&next)
    }
}

/// Listing filter for follow-ups. `Overdue` is pending with `due_at` in the past.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpFilter {
    #[serde(alias = "pendiente")]
    Pending,
    #[serde(alias = "completado")]
    Completed,
    #[serde(alias = "vencido")]
    Overdue,
}

/// Kind of record an activity row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Proposal,
    Project,
    Task,
    FollowUp,
    Note,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
    Converted,
    Completed,
    Reopened,
    Reminded,
}

macro_rules! snake_display {
    ($ty:ty { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

snake_display!(ClientStatus { Active => "active", Inactive => "inactive" });
snake_display!(ProposalStatus {
    Draft => "draft",
    Sent => "sent",
    Approved => "approved",
    Rejected => "rejected",
    Negotiating => "negotiating",
});
snake_display!(ProjectStatus {
    NotStarted => "not_started",
    InProgress => "in_progress",
    Paused => "paused",
    Completed => "completed",
});
snake_display!(EntityKind {
    Client => "client",
    Proposal => "proposal",
    Project => "project",
    Task => "task",
    FollowUp => "follow_up",
    Note => "note",
});
snake_display!(ActivityAction {
    Created => "created",
    Updated => "updated",
    Deleted => "deleted",
    StatusChanged => "status_changed",
    Converted => "converted",
    Completed => "completed",
    Reopened => "reopened",
    Reminded => "reminded",
});
