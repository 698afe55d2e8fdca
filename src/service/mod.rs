pub mod proposal_export;
pub mod reminder_actor;
