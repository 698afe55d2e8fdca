pub mod activity;
pub mod clients;
pub mod dashboard;
pub mod follow_ups;
pub mod health;
pub mod notes;
pub mod projects;
pub mod proposals;
