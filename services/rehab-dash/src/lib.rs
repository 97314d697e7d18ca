// services/rehab-dash/src/lib.rs
//
// Doctor-side dashboard for rehabilitation machines

pub mod api;
pub mod app;
pub mod config;
pub mod controller;
pub mod gate;
pub mod mock;
pub mod poller;
pub mod state;
pub mod store;
pub mod submit;
pub mod ui;

pub use api::{ClinicApi, HttpClinicApi};
pub use controller::Dashboard;
