//! PPDB server: student, parent and enrollment batch administration plus public
//! admissions registration over a REST/JSON API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod i18n;
pub mod logging;
pub mod models;
pub mod services;
pub mod session;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
