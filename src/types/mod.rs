pub mod forms;
pub mod status;
pub mod views;
